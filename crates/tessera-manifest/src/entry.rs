use std::fmt;

use serde::{Deserialize, Serialize};
use tessera_types::{EffectiveDate, EntryId, EntryKind};

/// Opaque pointer to an entry's serialized payload.
///
/// The manifest never interprets locators; they are handed unchanged to the
/// payload reader that materializes the entry.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PayloadLocator(String);

impl PayloadLocator {
    pub fn new(locator: impl Into<String>) -> Self {
        Self(locator.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PayloadLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PayloadLocator({})", self.0)
    }
}

impl fmt::Display for PayloadLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single entry in the table of contents.
///
/// Which optional fields are required depends on [`EntryKind`]:
///
/// | kind | required |
/// |---|---|
/// | `component` | `kindId`, `versionId` |
/// | `generation` | `parentId` (a component), `validFrom` |
/// | `table`, `enum-content` | `typeName` |
///
/// The checks themselves run in [`Manifest::from_entries`](crate::Manifest::from_entries).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    /// Unique id within the manifest.
    pub id: EntryId,
    /// Fully qualified, human-readable name.
    pub qualified_name: String,
    /// Entry kind tag.
    pub kind: EntryKind,
    /// Owning entry, for child entries such as generations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<EntryId>,
    /// Where the serialized payload lives.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<PayloadLocator>,
    /// Implementation type name (the "class" of the materialized object).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    /// Component kind id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind_id: Option<String>,
    /// Component version id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,
    /// Generation validity start (inclusive).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_from: Option<EffectiveDate>,
    /// Component validity end (exclusive).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_to: Option<EffectiveDate>,
}

impl ManifestEntry {
    fn bare(id: impl Into<EntryId>, qualified_name: impl Into<String>, kind: EntryKind) -> Self {
        Self {
            id: id.into(),
            qualified_name: qualified_name.into(),
            kind,
            parent_id: None,
            payload: None,
            type_name: None,
            kind_id: None,
            version_id: None,
            valid_from: None,
            valid_to: None,
        }
    }

    /// A component entry identified by `(kind_id, version_id)`.
    pub fn component(
        id: impl Into<EntryId>,
        qualified_name: impl Into<String>,
        kind_id: impl Into<String>,
        version_id: impl Into<String>,
    ) -> Self {
        Self {
            kind_id: Some(kind_id.into()),
            version_id: Some(version_id.into()),
            ..Self::bare(id, qualified_name, EntryKind::Component)
        }
    }

    /// A generation entry owned by `component`.
    pub fn generation(
        id: impl Into<EntryId>,
        component: impl Into<EntryId>,
        valid_from: EffectiveDate,
    ) -> Self {
        let id = id.into();
        let name = id.to_string();
        Self {
            parent_id: Some(component.into()),
            valid_from: Some(valid_from),
            ..Self::bare(id, name, EntryKind::Generation)
        }
    }

    /// A table entry holding rows of `type_name`.
    pub fn table(
        id: impl Into<EntryId>,
        qualified_name: impl Into<String>,
        type_name: impl Into<String>,
    ) -> Self {
        Self {
            type_name: Some(type_name.into()),
            ..Self::bare(id, qualified_name, EntryKind::Table)
        }
    }

    /// An entry holding the enumerated values of `type_name`.
    pub fn enum_content(
        id: impl Into<EntryId>,
        qualified_name: impl Into<String>,
        type_name: impl Into<String>,
    ) -> Self {
        Self {
            type_name: Some(type_name.into()),
            ..Self::bare(id, qualified_name, EntryKind::EnumContent)
        }
    }

    /// A custom object entry.
    pub fn custom(id: impl Into<EntryId>, qualified_name: impl Into<String>) -> Self {
        Self::bare(id, qualified_name, EntryKind::Custom)
    }

    /// A test case entry.
    pub fn test_case(id: impl Into<EntryId>, qualified_name: impl Into<String>) -> Self {
        Self::bare(id, qualified_name, EntryKind::TestCase)
    }

    pub fn with_payload(mut self, locator: impl Into<String>) -> Self {
        self.payload = Some(PayloadLocator::new(locator));
        self
    }

    pub fn with_type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    pub fn with_valid_to(mut self, valid_to: EffectiveDate) -> Self {
        self.valid_to = Some(valid_to);
        self
    }

    pub fn with_parent(mut self, parent: impl Into<EntryId>) -> Self {
        self.parent_id = Some(parent.into());
        self
    }

    /// Returns `true` if the entry has no parent.
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_constructor_sets_version_pair() {
        let e = ManifestEntry::component("c1", "motor.Policy", "Policy", "2006-01");
        assert_eq!(e.kind, EntryKind::Component);
        assert_eq!(e.kind_id.as_deref(), Some("Policy"));
        assert_eq!(e.version_id.as_deref(), Some("2006-01"));
        assert!(e.is_root());
    }

    #[test]
    fn generation_constructor_links_parent() {
        let from = EffectiveDate::ymd(2006, 1, 1).unwrap();
        let g = ManifestEntry::generation("c1@2006", "c1", from);
        assert_eq!(g.parent_id, Some(EntryId::new("c1")));
        assert_eq!(g.valid_from, Some(from));
        assert_eq!(g.qualified_name, "c1@2006");
    }

    #[test]
    fn deserializes_camel_case_fields() {
        let json = r#"{
            "id": "c1",
            "qualifiedName": "motor.Policy",
            "kind": "component",
            "kindId": "Policy",
            "versionId": "A",
            "validTo": "2010-01-01",
            "payload": "c1.json"
        }"#;
        let e: ManifestEntry = serde_json::from_str(json).unwrap();
        assert_eq!(e.valid_to, Some(EffectiveDate::ymd(2010, 1, 1).unwrap()));
        assert_eq!(e.payload, Some(PayloadLocator::new("c1.json")));
        assert!(e.type_name.is_none());
    }

    #[test]
    fn missing_required_serde_field_is_an_error() {
        let json = r#"{ "id": "c1", "kind": "component" }"#;
        assert!(serde_json::from_str::<ManifestEntry>(json).is_err());
    }
}
