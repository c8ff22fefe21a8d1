//! Comparison group selection
//!
//! Group comparisons are restricted to a subset of the categories of a
//! grouping column and compare each selected group against a reference.
//! This module turns the caller's request into the canonical, validated
//! group order used by every downstream result table.
//!
//! # Rules
//!
//! - `"all"` selects every known group, in the known order.
//! - An explicit list keeps its order; integer identifiers become strings and
//!   repeated identifiers are kept once.
//! - A specific reference group missing from an explicit list is appended at
//!   the end, so the reference participates in the comparisons.
//! - The reference is either [`Reference::Rest`] (every other selected group)
//!   or a known group name.
//!
//! # Examples
//!
//! ```
//! use ehrkit_analysis::groups::{GroupSpec, Reference, select_groups};
//!
//! let known = ["home", "icu", "ward"].map(String::from);
//! let order = select_groups(
//!     &GroupSpec::list(["icu"]),
//!     &known,
//!     &Reference::group("ward"),
//! )
//! .unwrap();
//! assert_eq!(order, ["icu", "ward"]);
//! ```

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Sentinel accepted in place of a group list to select every group.
pub const ALL_GROUPS: &str = "all";

/// Sentinel reference meaning "all other selected groups".
pub const REST: &str = "rest";

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum GroupSelectionError {
    #[display("specify a sequence of groups instead of the single value '{value}'")]
    InvalidGroupSpecification { value: String },
    #[display("reference = {reference} needs to be one of the groups {known:?}")]
    UnknownReferenceGroup {
        reference: String,
        known: Vec<String>,
    },
    #[display("group '{group}' is not one of the groups {known:?}")]
    UnknownGroup { group: String, known: Vec<String> },
}

/// A group identifier as supplied by a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GroupId {
    Name(String),
    Index(i64),
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => fmt::Display::fmt(name, f),
            Self::Index(index) => fmt::Display::fmt(index, f),
        }
    }
}

impl From<&str> for GroupId {
    fn from(value: &str) -> Self {
        Self::Name(value.to_owned())
    }
}

impl From<String> for GroupId {
    fn from(value: String) -> Self {
        Self::Name(value)
    }
}

impl From<i64> for GroupId {
    fn from(value: i64) -> Self {
        Self::Index(value)
    }
}

/// The requested subset of comparison groups.
///
/// Deserializes from either a JSON array (explicit groups) or a single
/// scalar. The only valid scalar is `"all"`; any other scalar is rejected by
/// [`select_groups`] because a sequence is required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GroupSpec {
    Sequence(Vec<GroupId>),
    Scalar(GroupId),
}

impl Default for GroupSpec {
    fn default() -> Self {
        Self::all()
    }
}

impl GroupSpec {
    #[must_use]
    pub fn all() -> Self {
        Self::Scalar(GroupId::Name(ALL_GROUPS.to_owned()))
    }

    #[must_use]
    pub fn list<I, G>(groups: I) -> Self
    where
        I: IntoIterator<Item = G>,
        G: Into<GroupId>,
    {
        Self::Sequence(groups.into_iter().map(Into::into).collect())
    }

    #[must_use]
    pub fn is_all(&self) -> bool {
        matches!(self, Self::Scalar(GroupId::Name(name)) if name == ALL_GROUPS)
    }
}

/// The group each selected group is compared against.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Reference {
    /// Compare against the union of the other selected groups.
    #[default]
    Rest,
    /// Compare against one specific group.
    Group(String),
}

impl Reference {
    #[must_use]
    pub fn group(name: impl Into<String>) -> Self {
        Self::from(name.into())
    }

    #[must_use]
    pub fn as_group(&self) -> Option<&str> {
        match self {
            Self::Rest => None,
            Self::Group(name) => Some(name),
        }
    }
}

impl From<String> for Reference {
    fn from(value: String) -> Self {
        if value == REST {
            Self::Rest
        } else {
            Self::Group(value)
        }
    }
}

impl From<Reference> for String {
    fn from(value: Reference) -> Self {
        match value {
            Reference::Rest => REST.to_owned(),
            Reference::Group(name) => name,
        }
    }
}

impl FromStr for Reference {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s.to_owned()))
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rest => fmt::Display::fmt(REST, f),
            Self::Group(name) => fmt::Display::fmt(name, f),
        }
    }
}

/// Resolves a group request into the canonical ordered group list.
///
/// # Errors
///
/// - [`GroupSelectionError::InvalidGroupSpecification`] if `spec` is a
///   scalar other than `"all"`, or an empty list
/// - [`GroupSelectionError::UnknownReferenceGroup`] if `reference` names a
///   group not in `group_names`
/// - [`GroupSelectionError::UnknownGroup`] if an explicit group is not in
///   `group_names`
pub fn select_groups(
    spec: &GroupSpec,
    group_names: &[String],
    reference: &Reference,
) -> Result<Vec<String>, GroupSelectionError> {
    let requested = match spec {
        GroupSpec::Scalar(GroupId::Name(name)) if name == ALL_GROUPS => None,
        GroupSpec::Scalar(value) => {
            return Err(GroupSelectionError::InvalidGroupSpecification {
                value: value.to_string(),
            });
        }
        GroupSpec::Sequence(groups) if groups.is_empty() => {
            return Err(GroupSelectionError::InvalidGroupSpecification {
                value: "[]".to_owned(),
            });
        }
        GroupSpec::Sequence(groups) => Some(groups),
    };

    if let Some(reference) = reference
        .as_group()
        .filter(|reference| !group_names.iter().any(|name| name == reference))
    {
        return Err(GroupSelectionError::UnknownReferenceGroup {
            reference: reference.to_owned(),
            known: group_names.to_vec(),
        });
    }

    let Some(requested) = requested else {
        return Ok(group_names.to_vec());
    };

    let mut order = Vec::with_capacity(requested.len() + 1);
    for group in requested {
        let group = group.to_string();
        if !group_names.contains(&group) {
            return Err(GroupSelectionError::UnknownGroup {
                group,
                known: group_names.to_vec(),
            });
        }
        if !order.contains(&group) {
            order.push(group);
        }
    }
    if let Some(reference) = reference
        .as_group()
        .filter(|reference| !order.iter().any(|group| group == reference))
    {
        order.push(reference.to_owned());
    }

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn known() -> Vec<String> {
        ["home", "icu", "ward"].map(String::from).to_vec()
    }

    #[test]
    fn test_all_keeps_known_order() {
        let order = select_groups(&GroupSpec::all(), &known(), &Reference::Rest).unwrap();
        assert_eq!(order, known());

        let order = select_groups(&GroupSpec::all(), &known(), &Reference::group("icu")).unwrap();
        assert_eq!(order, known());
    }

    #[test]
    fn test_reference_appended_once() {
        let spec = GroupSpec::list(["ward", "home"]);
        let order = select_groups(&spec, &known(), &Reference::group("icu")).unwrap();
        assert_eq!(order, ["ward", "home", "icu"]);

        let spec = GroupSpec::list(["icu", "ward"]);
        let order = select_groups(&spec, &known(), &Reference::group("icu")).unwrap();
        assert_eq!(order, ["icu", "ward"]);
    }

    #[test]
    fn test_rest_reference_is_not_appended() {
        let spec = GroupSpec::list(["ward"]);
        let order = select_groups(&spec, &known(), &Reference::Rest).unwrap();
        assert_eq!(order, ["ward"]);
    }

    #[test]
    fn test_integer_groups_are_coerced() {
        let names = ["1", "2", "3"].map(String::from).to_vec();
        let spec = GroupSpec::list([3_i64, 1]);
        let order = select_groups(&spec, &names, &Reference::group("2")).unwrap();
        assert_eq!(order, ["3", "1", "2"]);
    }

    #[test]
    fn test_duplicates_are_removed() {
        let spec = GroupSpec::list(["icu", "ward", "icu"]);
        let order = select_groups(&spec, &known(), &Reference::Rest).unwrap();
        assert_eq!(order, ["icu", "ward"]);
    }

    #[test]
    fn test_scalar_is_rejected() {
        let err = select_groups(
            &GroupSpec::Scalar(GroupId::from("icu")),
            &known(),
            &Reference::Rest,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            GroupSelectionError::InvalidGroupSpecification { .. }
        ));

        let err = select_groups(
            &GroupSpec::Scalar(GroupId::from(3)),
            &known(),
            &Reference::Rest,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            GroupSelectionError::InvalidGroupSpecification { .. }
        ));
    }

    #[test]
    fn test_empty_list_is_rejected() {
        let err = select_groups(&GroupSpec::Sequence(vec![]), &known(), &Reference::Rest)
            .unwrap_err();
        assert!(matches!(
            err,
            GroupSelectionError::InvalidGroupSpecification { .. }
        ));
    }

    #[test]
    fn test_unknown_reference() {
        for spec in [GroupSpec::all(), GroupSpec::list(["icu"])] {
            let err = select_groups(&spec, &known(), &Reference::group("er")).unwrap_err();
            assert!(matches!(
                err,
                GroupSelectionError::UnknownReferenceGroup { ref reference, .. } if reference == "er"
            ));
        }
    }

    #[test]
    fn test_unknown_group() {
        let err = select_groups(&GroupSpec::list(["er"]), &known(), &Reference::Rest).unwrap_err();
        assert!(matches!(err, GroupSelectionError::UnknownGroup { .. }));
    }

    #[test]
    fn test_spec_deserialization() {
        let spec: GroupSpec = serde_json::from_str(r#""all""#).unwrap();
        assert!(spec.is_all());
        let spec: GroupSpec = serde_json::from_str(r#"["icu", 2]"#).unwrap();
        assert_eq!(
            spec,
            GroupSpec::Sequence(vec![GroupId::from("icu"), GroupId::from(2)])
        );
        let spec: GroupSpec = serde_json::from_str("7").unwrap();
        assert_eq!(spec, GroupSpec::Scalar(GroupId::Index(7)));
    }

    #[test]
    fn test_reference_serde() {
        let rest: Reference = serde_json::from_str(r#""rest""#).unwrap();
        assert_eq!(rest, Reference::Rest);
        let icu: Reference = serde_json::from_str(r#""icu""#).unwrap();
        assert_eq!(icu, Reference::group("icu"));
        assert_eq!(serde_json::to_string(&Reference::Rest).unwrap(), r#""rest""#);
    }
}
