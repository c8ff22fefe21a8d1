use std::{
    fs::File,
    io::{self, BufReader, BufWriter, StdoutLock, Write},
    path::{Path, PathBuf},
};

use anyhow::Context;
use ehrkit_analysis::dataset::Dataset;

/// Destination of a JSON document: stdout, or a file when a path is given
#[derive(Debug)]
pub enum Output {
    Stdout(StdoutLock<'static>),
    File {
        writer: BufWriter<File>,
        path: PathBuf,
    },
}

impl Output {
    /// Write `value` as pretty-printed JSON to `output_path`, or to stdout
    pub fn save_json<T>(value: &T, output_path: Option<PathBuf>) -> anyhow::Result<()>
    where
        T: serde::Serialize,
    {
        let mut output = match output_path {
            Some(path) => {
                let file = File::create(&path)
                    .with_context(|| format!("Failed to create output file: {}", path.display()))?;
                Output::File {
                    writer: BufWriter::new(file),
                    path,
                }
            }
            None => Output::Stdout(io::stdout().lock()),
        };
        output
            .write_json(value)
            .with_context(|| format!("Failed to write JSON to {}", output.target()))
    }

    fn target(&self) -> String {
        match self {
            Output::Stdout(_) => "stdout".to_owned(),
            Output::File { path, .. } => path.display().to_string(),
        }
    }

    fn write_json<T>(&mut self, value: &T) -> io::Result<()>
    where
        T: serde::Serialize,
    {
        serde_json::to_writer_pretty(&mut *self, value)?;
        writeln!(self)?;
        self.flush()
    }
}

impl Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Output::Stdout(writer) => writer.write(buf),
            Output::File { writer, .. } => writer.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Output::Stdout(writer) => writer.flush(),
            Output::File { writer, .. } => writer.flush(),
        }
    }
}

/// Read and deserialize a JSON file, naming `file_kind` in errors
pub fn read_json_file<T>(file_kind: &str, path: &Path) -> anyhow::Result<T>
where
    T: serde::de::DeserializeOwned,
{
    let file = File::open(path)
        .with_context(|| format!("Failed to open {file_kind} file: {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse {file_kind} JSON file: {}", path.display()))
}

/// Read a dataset from a JSON file and check its column lengths
///
/// # Errors
///
/// Returns error if the file cannot be opened or parsed, or if the dataset
/// is inconsistent
pub fn read_dataset_file<P>(path: P) -> anyhow::Result<Dataset>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let dataset: Dataset = read_json_file("dataset", path)?;
    dataset
        .validate()
        .with_context(|| format!("Invalid dataset: {}", path.display()))?;
    tracing::info!(
        path = %path.display(),
        observations = dataset.n_obs(),
        features = dataset.features.len(),
        "loaded dataset"
    );
    Ok(dataset)
}

/// Split comma-separated values, dropping empty entries
pub fn split_list(values: &[String]) -> Vec<String> {
    values
        .iter()
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_list() {
        let values = vec!["icu, ward".to_owned(), "home".to_owned(), ",".to_owned()];
        assert_eq!(split_list(&values), ["icu", "ward", "home"]);
    }

    #[test]
    fn test_save_json_to_file_reads_back() {
        let path = std::env::temp_dir().join(format!("ehrkit-util-{}.json", std::process::id()));
        let value = serde_json::json!({ "key": "rank", "groups": ["icu", "ward"] });
        Output::save_json(&value, Some(path.clone())).unwrap();

        let back: serde_json::Value = read_json_file("report", &path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn test_read_json_file_names_kind_in_error() {
        let path = std::env::temp_dir().join("ehrkit-util-missing.json");
        let err = read_json_file::<serde_json::Value>("dataset", &path).unwrap_err();
        assert!(err.to_string().contains("Failed to open dataset file"));
    }
}
