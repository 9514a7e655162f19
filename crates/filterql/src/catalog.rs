//! Variable metadata provider
//!
//! The resolver only sees the [`VariableLookup`] trait. [`Catalog`] is an
//! in-memory provider that can also be loaded from JSON:
//!
//! ```json
//! {"variables": [
//!     {"alias": "age", "address": "https://.../variables/001/"},
//!     {"alias": "Q2", "address": "https://.../variables/002/",
//!      "subvariables": [{"alias": "Q2_1", "address": "https://.../subvariables/a/"}]}
//! ]}
//! ```

use std::sync::Arc;

use indexmap::IndexMap;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Subvariable {
    pub alias: String,
    pub address: String,
}

impl Subvariable {
    pub fn new(alias: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            address: address.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariableKind {
    Scalar,
    /// Ordered sub-elements, in declaration order
    Array(Arc<[Subvariable]>),
    /// A sub-element of the named array; already scalar-level
    Subvariable { parent: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableMetadata {
    pub address: String,
    pub kind: VariableKind,
}

impl VariableMetadata {
    pub fn scalar(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            kind: VariableKind::Scalar,
        }
    }

    pub fn array(
        address: impl Into<String>,
        subvariables: impl Into<Arc<[Subvariable]>>,
    ) -> Self {
        Self {
            address: address.into(),
            kind: VariableKind::Array(subvariables.into()),
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self.kind, VariableKind::Array(_))
    }
}

#[derive(Error, Debug)]
pub enum LookupError {
    #[error("no variable named `{0}`")]
    NotFound(String),

    #[error("variable lookup failed: {0}")]
    Provider(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Source of variable metadata, keyed by alias
pub trait VariableLookup {
    fn lookup(&self, name: &str) -> Result<VariableMetadata, LookupError>;
}

impl<F> VariableLookup for F
where
    F: Fn(&str) -> Result<VariableMetadata, LookupError>,
{
    fn lookup(&self, name: &str) -> Result<VariableMetadata, LookupError> {
        self(name)
    }
}

#[derive(Debug, Clone)]
struct CatalogEntry {
    address: String,
    /// Shared with every lookup result
    subvariables: Option<Arc<[Subvariable]>>,
}

#[derive(Debug, Clone)]
struct SubvariableEntry {
    parent: String,
    address: String,
}

/// In-memory variable catalog
///
/// Sub-element aliases are looked up before top-level aliases.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(from = "CatalogConfig")]
pub struct Catalog {
    variables: IndexMap<String, CatalogEntry>,
    subvariables: IndexMap<String, SubvariableEntry>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scalar(mut self, alias: impl Into<String>, address: impl Into<String>) -> Self {
        self.insert(alias.into(), address.into(), None);
        self
    }

    pub fn with_array<I>(
        mut self,
        alias: impl Into<String>,
        address: impl Into<String>,
        subvariables: I,
    ) -> Self
    where
        I: IntoIterator<Item = Subvariable>,
    {
        self.insert(
            alias.into(),
            address.into(),
            Some(subvariables.into_iter().collect()),
        );
        self
    }

    /// Number of top-level variables
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Top-level aliases in declaration order
    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.variables.keys().map(String::as_str)
    }

    fn insert(&mut self, alias: String, address: String, subvariables: Option<Vec<Subvariable>>) {
        if let Some(previous) = self.variables.get(&alias)
            && previous.subvariables.is_some()
        {
            self.subvariables.retain(|_, entry| entry.parent != alias);
        }
        if self.subvariables.contains_key(&alias) {
            log::warn!("Variable `{alias}` is shadowed by a subvariable with the same alias");
        }

        for sub in subvariables.iter().flatten() {
            if self.variables.contains_key(&sub.alias) || sub.alias == alias {
                log::warn!(
                    "Subvariable `{}` of `{alias}` shadows a variable with the same alias",
                    sub.alias
                );
            }
            let replaced = self.subvariables.insert(
                sub.alias.clone(),
                SubvariableEntry {
                    parent: alias.clone(),
                    address: sub.address.clone(),
                },
            );
            if let Some(replaced) = replaced
                && replaced.parent != alias
            {
                log::warn!(
                    "Subvariable `{}` of `{alias}` replaces the one declared under `{}`",
                    sub.alias,
                    replaced.parent
                );
            }
        }

        self.variables.insert(
            alias,
            CatalogEntry {
                address,
                subvariables: subvariables.map(Arc::from),
            },
        );
    }
}

impl VariableLookup for Catalog {
    fn lookup(&self, name: &str) -> Result<VariableMetadata, LookupError> {
        if let Some(sub) = self.subvariables.get(name) {
            return Ok(VariableMetadata {
                address: sub.address.clone(),
                kind: VariableKind::Subvariable {
                    parent: sub.parent.clone(),
                },
            });
        }

        let entry = self
            .variables
            .get(name)
            .ok_or_else(|| LookupError::NotFound(name.to_string()))?;
        let kind = match &entry.subvariables {
            Some(subs) => VariableKind::Array(Arc::clone(subs)),
            None => VariableKind::Scalar,
        };
        Ok(VariableMetadata {
            address: entry.address.clone(),
            kind,
        })
    }
}

// ============ JSON configuration ============

#[derive(Debug, Deserialize)]
struct CatalogConfig {
    #[serde(default)]
    variables: Vec<VariableConfig>,
}

#[derive(Debug, Deserialize)]
struct VariableConfig {
    alias: String,
    address: String,
    /// Present (even empty) for array variables
    #[serde(default)]
    subvariables: Option<Vec<Subvariable>>,
}

impl From<CatalogConfig> for Catalog {
    fn from(config: CatalogConfig) -> Self {
        let mut catalog = Catalog::new();
        for var in config.variables {
            catalog.insert(var.alias, var.address, var.subvariables);
        }
        catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn survey() -> Catalog {
        Catalog::new().with_scalar("age", "var/age").with_array(
            "Q2",
            "var/q2",
            [
                Subvariable::new("Q2_1", "var/q2/sub/1"),
                Subvariable::new("Q2_2", "var/q2/sub/2"),
            ],
        )
    }

    #[test]
    fn lookup_kinds() {
        let catalog = survey();
        assert_eq!(
            catalog.lookup("age").unwrap(),
            VariableMetadata::scalar("var/age")
        );

        let q2 = catalog.lookup("Q2").unwrap();
        assert!(q2.is_array());
        let VariableKind::Array(subs) = q2.kind else {
            panic!("Expected array");
        };
        assert_eq!(subs[0].alias, "Q2_1");
        assert_eq!(subs[1].alias, "Q2_2");

        assert_eq!(
            catalog.lookup("Q2_2").unwrap(),
            VariableMetadata {
                address: "var/q2/sub/2".into(),
                kind: VariableKind::Subvariable {
                    parent: "Q2".into()
                },
            }
        );
    }

    #[test]
    fn array_lookups_share_subvariables() {
        let catalog = survey();
        let (VariableKind::Array(first), VariableKind::Array(second)) =
            (catalog.lookup("Q2").unwrap().kind, catalog.lookup("Q2").unwrap().kind)
        else {
            panic!("Expected arrays");
        };
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn lookup_unknown_is_not_found() {
        let err = survey().lookup("nope").unwrap_err();
        assert!(matches!(err, LookupError::NotFound(ref name) if name == "nope"));
    }

    #[test]
    fn subvariable_alias_wins_over_variable() {
        let catalog = Catalog::new()
            .with_scalar("dup", "var/dup")
            .with_array("arr", "var/arr", [Subvariable::new("dup", "var/arr/sub/dup")]);
        assert_eq!(catalog.lookup("dup").unwrap().address, "var/arr/sub/dup");
    }

    #[test]
    fn redeclaring_array_drops_old_subvariables() {
        let catalog = survey().with_scalar("Q2", "var/q2-flat");
        assert!(matches!(
            catalog.lookup("Q2_1"),
            Err(LookupError::NotFound(_))
        ));
        assert_eq!(catalog.lookup("Q2").unwrap(), VariableMetadata::scalar("var/q2-flat"));
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn loads_from_json() {
        let catalog: Catalog = serde_json::from_str(
            r#"{"variables": [
                {"alias": "gender", "address": "var/gender"},
                {"alias": "grid", "address": "var/grid", "subvariables": [
                    {"alias": "grid_a", "address": "var/grid/a"},
                    {"alias": "grid_b", "address": "var/grid/b"}
                ]},
                {"alias": "empty", "address": "var/empty", "subvariables": []}
            ]}"#,
        )
        .unwrap();

        assert_eq!(
            catalog.aliases().collect::<Vec<_>>(),
            vec!["gender", "grid", "empty"]
        );
        assert!(catalog.lookup("grid").unwrap().is_array());
        assert!(catalog.lookup("empty").unwrap().is_array());
        assert!(!catalog.lookup("gender").unwrap().is_array());
        assert_eq!(catalog.lookup("grid_b").unwrap().address, "var/grid/b");
    }

    #[test]
    fn closures_are_lookups() {
        let lookup = |name: &str| -> Result<VariableMetadata, LookupError> {
            Ok(VariableMetadata::scalar(format!("var/{name}")))
        };
        assert_eq!(lookup.lookup("x").unwrap().address, "var/x");
    }
}
