//! The validated, indexed table of contents.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tessera_types::{EntryId, EntryKind};
use tracing::{debug, info};

use crate::entry::ManifestEntry;
use crate::error::{ManifestError, ManifestResult};
use crate::source::ManifestSource;

/// The manifest format version this crate reads and writes.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct ManifestDocument {
    version: u32,
    entries: Vec<ManifestEntry>,
}

/// Immutable index over the entries of one repository.
///
/// Construction validates the whole entry set (required fields, unique ids,
/// parent linkage, generation ordering) and builds every lookup index up
/// front; afterwards the manifest is read-only and can be shared freely
/// between threads.
#[derive(Clone, Debug, Default)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
    by_id: HashMap<EntryId, usize>,
    by_kind: HashMap<EntryKind, Vec<usize>>,
    children: HashMap<EntryId, Vec<usize>>,
    by_version: HashMap<(String, String), usize>,
    by_qualified_name: HashMap<(EntryKind, String), usize>,
    by_type_name: HashMap<(EntryKind, String), Vec<usize>>,
}

impl Manifest {
    /// An empty manifest.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Read and parse a manifest from `source`.
    pub fn load(source: &dyn ManifestSource) -> ManifestResult<Self> {
        let bytes = source.read_manifest()?;
        let manifest = Self::from_json_slice(&bytes)?;
        info!(source = %source.describe(), entries = manifest.len(), "manifest loaded");
        Ok(manifest)
    }

    /// Parse a JSON manifest document.
    pub fn from_json_slice(bytes: &[u8]) -> ManifestResult<Self> {
        let doc: ManifestDocument = serde_json::from_slice(bytes)?;
        if doc.version != FORMAT_VERSION {
            return Err(ManifestError::UnsupportedVersion(doc.version));
        }
        Self::from_entries(doc.entries)
    }

    /// Serialize to a JSON manifest document.
    pub fn to_json_vec(&self) -> ManifestResult<Vec<u8>> {
        let doc = ManifestDocument {
            version: FORMAT_VERSION,
            entries: self.entries.clone(),
        };
        Ok(serde_json::to_vec_pretty(&doc)?)
    }

    /// Validate `entries` and build the lookup indexes.
    ///
    /// Entry order is preserved and determines the order of every sequence
    /// this manifest hands out.
    pub fn from_entries(entries: Vec<ManifestEntry>) -> ManifestResult<Self> {
        let mut manifest = Self {
            entries,
            ..Self::default()
        };

        for (pos, entry) in manifest.entries.iter().enumerate() {
            check_required_fields(entry)?;
            if manifest.by_id.insert(entry.id.clone(), pos).is_some() {
                return Err(ManifestError::DuplicateId(entry.id.clone()));
            }
            manifest.by_kind.entry(entry.kind).or_default().push(pos);

            if let (Some(kind_id), Some(version_id)) = (&entry.kind_id, &entry.version_id) {
                if entry.kind == EntryKind::Component {
                    let key = (kind_id.clone(), version_id.clone());
                    if manifest.by_version.insert(key, pos).is_some() {
                        return Err(ManifestError::DuplicateComponentVersion {
                            kind_id: kind_id.clone(),
                            version_id: version_id.clone(),
                        });
                    }
                }
            }

            if matches!(entry.kind, EntryKind::Table | EntryKind::EnumContent) {
                let key = (entry.kind, entry.qualified_name.clone());
                if manifest.by_qualified_name.insert(key, pos).is_some() {
                    return Err(ManifestError::DuplicateQualifiedName {
                        kind: entry.kind,
                        name: entry.qualified_name.clone(),
                    });
                }
            }

            if let Some(type_name) = &entry.type_name {
                manifest
                    .by_type_name
                    .entry((entry.kind, type_name.clone()))
                    .or_default()
                    .push(pos);
            }
        }

        manifest.link_children()?;
        debug!(entries = manifest.entries.len(), "manifest validated");
        Ok(manifest)
    }

    fn link_children(&mut self) -> ManifestResult<()> {
        let mut seen_valid_from = HashSet::new();

        for (pos, entry) in self.entries.iter().enumerate() {
            let Some(parent_id) = &entry.parent_id else {
                continue;
            };
            let parent = self
                .by_id
                .get(parent_id)
                .map(|&p| &self.entries[p])
                .ok_or_else(|| ManifestError::BrokenParent {
                    entry: entry.id.clone(),
                    parent: parent_id.clone(),
                })?;

            if entry.kind == EntryKind::Generation {
                if parent.kind != EntryKind::Component {
                    return Err(ManifestError::InvalidParent {
                        entry: entry.id.clone(),
                        parent: parent_id.clone(),
                        parent_kind: parent.kind,
                    });
                }
                if let Some(valid_from) = entry.valid_from {
                    if !seen_valid_from.insert((parent_id.clone(), valid_from)) {
                        return Err(ManifestError::DuplicateValidFrom {
                            component: parent_id.clone(),
                            valid_from,
                        });
                    }
                }
            }

            self.children.entry(parent_id.clone()).or_default().push(pos);
        }
        Ok(())
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the manifest has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries, in manifest order.
    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    /// Look up an entry by id.
    pub fn entry_by_id(&self, id: &str) -> Option<&ManifestEntry> {
        self.by_id.get(id).map(|&pos| &self.entries[pos])
    }

    /// All entries of one kind, in manifest order.
    pub fn entries_of_kind(&self, kind: EntryKind) -> impl Iterator<Item = &ManifestEntry> + '_ {
        self.positions(self.by_kind.get(&kind))
    }

    /// The direct children of `parent_id`, in manifest order.
    pub fn child_entries(&self, parent_id: &str) -> impl Iterator<Item = &ManifestEntry> + '_ {
        self.positions(self.children.get(parent_id))
    }

    /// The component entry with the given `(kind_id, version_id)`.
    pub fn component_entry(&self, kind_id: &str, version_id: &str) -> Option<&ManifestEntry> {
        self.by_version
            .get(&(kind_id.to_string(), version_id.to_string()))
            .map(|&pos| &self.entries[pos])
    }

    /// The table or enum-content entry with the given qualified name.
    pub fn entry_by_qualified_name(&self, kind: EntryKind, name: &str) -> Option<&ManifestEntry> {
        self.by_qualified_name
            .get(&(kind, name.to_string()))
            .map(|&pos| &self.entries[pos])
    }

    /// All entries of `kind` whose implementation type is `type_name`.
    pub fn entries_of_type(
        &self,
        kind: EntryKind,
        type_name: &str,
    ) -> impl Iterator<Item = &ManifestEntry> + '_ {
        self.positions(self.by_type_name.get(&(kind, type_name.to_string())))
    }

    fn positions<'a>(
        &'a self,
        positions: Option<&'a Vec<usize>>,
    ) -> impl Iterator<Item = &'a ManifestEntry> + 'a {
        positions
            .into_iter()
            .flatten()
            .map(move |&pos| &self.entries[pos])
    }
}

fn check_required_fields(entry: &ManifestEntry) -> ManifestResult<()> {
    let missing = |field: &'static str| ManifestError::MissingField {
        entry: entry.id.to_string(),
        field,
    };

    if entry.id.is_blank() {
        return Err(missing("id"));
    }
    if entry.qualified_name.trim().is_empty() {
        return Err(missing("qualifiedName"));
    }
    match entry.kind {
        EntryKind::Component => {
            if is_blank(&entry.kind_id) {
                return Err(missing("kindId"));
            }
            if is_blank(&entry.version_id) {
                return Err(missing("versionId"));
            }
        }
        EntryKind::Generation => {
            if entry.parent_id.is_none() {
                return Err(missing("parentId"));
            }
            if entry.valid_from.is_none() {
                return Err(missing("validFrom"));
            }
        }
        EntryKind::Table | EntryKind::EnumContent => {
            if is_blank(&entry.type_name) {
                return Err(missing("typeName"));
            }
        }
        EntryKind::Custom | EntryKind::TestCase => {}
    }
    Ok(())
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::BytesSource;
    use tessera_types::EffectiveDate;

    fn date(y: i32, m: u32, d: u32) -> EffectiveDate {
        EffectiveDate::ymd(y, m, d).unwrap()
    }

    fn sample_entries() -> Vec<ManifestEntry> {
        vec![
            ManifestEntry::component("mainPc", "motor.MainPolicy", "MainPolicy", "2006-01")
                .with_type_name("motor.Policy")
                .with_payload("mainPc.json"),
            ManifestEntry::generation("mainPc@2006", "mainPc", date(2006, 1, 1)),
            ManifestEntry::generation("mainPc@2008", "mainPc", date(2008, 1, 1)),
            ManifestEntry::table("rates", "motor.Rates", "motor.RateTable"),
            ManifestEntry::enum_content("colors", "motor.Colors", "motor.Color"),
            ManifestEntry::test_case("tc1", "motor.tests.Basic"),
        ]
    }

    // -----------------------------------------------------------------------
    // Lookups
    // -----------------------------------------------------------------------

    #[test]
    fn lookups_by_id_kind_and_parent() {
        let m = Manifest::from_entries(sample_entries()).unwrap();
        assert_eq!(m.len(), 6);
        assert_eq!(m.entry_by_id("rates").unwrap().kind, EntryKind::Table);
        assert!(m.entry_by_id("nope").is_none());

        let gens: Vec<_> = m.child_entries("mainPc").map(|e| e.id.as_str()).collect();
        assert_eq!(gens, vec!["mainPc@2006", "mainPc@2008"]);
        assert_eq!(m.entries_of_kind(EntryKind::Generation).count(), 2);
        assert_eq!(m.entries_of_kind(EntryKind::Custom).count(), 0);
        assert_eq!(m.child_entries("rates").count(), 0);
    }

    #[test]
    fn lookups_by_version_name_and_type() {
        let m = Manifest::from_entries(sample_entries()).unwrap();
        assert_eq!(
            m.component_entry("MainPolicy", "2006-01").unwrap().id,
            EntryId::new("mainPc")
        );
        assert!(m.component_entry("MainPolicy", "2007-01").is_none());
        assert_eq!(
            m.entry_by_qualified_name(EntryKind::Table, "motor.Rates").unwrap().id,
            EntryId::new("rates")
        );
        assert_eq!(m.entries_of_type(EntryKind::Component, "motor.Policy").count(), 1);
        assert_eq!(m.entries_of_type(EntryKind::EnumContent, "motor.Color").count(), 1);
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    #[test]
    fn rejects_duplicate_ids() {
        let mut entries = sample_entries();
        entries.push(ManifestEntry::custom("rates", "other"));
        let err = Manifest::from_entries(entries).unwrap_err();
        assert!(matches!(err, ManifestError::DuplicateId(id) if id == "rates"));
    }

    #[test]
    fn rejects_broken_parent() {
        let entries = vec![ManifestEntry::generation("g", "ghost", date(2006, 1, 1))];
        let err = Manifest::from_entries(entries).unwrap_err();
        assert!(matches!(err, ManifestError::BrokenParent { .. }));
        assert!(err.is_corrupt());
    }

    #[test]
    fn rejects_generation_under_non_component() {
        let entries = vec![
            ManifestEntry::custom("x", "x"),
            ManifestEntry::generation("g", "x", date(2006, 1, 1)),
        ];
        let err = Manifest::from_entries(entries).unwrap_err();
        assert!(matches!(
            err,
            ManifestError::InvalidParent { parent_kind: EntryKind::Custom, .. }
        ));
    }

    #[test]
    fn rejects_duplicate_valid_from() {
        let mut entries = sample_entries();
        entries.push(ManifestEntry::generation("mainPc@dup", "mainPc", date(2006, 1, 1)));
        let err = Manifest::from_entries(entries).unwrap_err();
        assert!(matches!(err, ManifestError::DuplicateValidFrom { .. }));
    }

    #[test]
    fn rejects_missing_component_version() {
        let mut entry = ManifestEntry::component("c", "c", "K", "V");
        entry.version_id = Some("  ".into());
        let err = Manifest::from_entries(vec![entry]).unwrap_err();
        assert!(matches!(err, ManifestError::MissingField { field: "versionId", .. }));
    }

    #[test]
    fn rejects_duplicate_component_version() {
        let entries = vec![
            ManifestEntry::component("a", "a", "K", "V"),
            ManifestEntry::component("b", "b", "K", "V"),
        ];
        let err = Manifest::from_entries(entries).unwrap_err();
        assert!(matches!(err, ManifestError::DuplicateComponentVersion { .. }));
    }

    #[test]
    fn rejects_table_without_type() {
        let mut table = ManifestEntry::table("t", "t", "T");
        table.type_name = None;
        let err = Manifest::from_entries(vec![table]).unwrap_err();
        assert!(matches!(err, ManifestError::MissingField { field: "typeName", .. }));
    }

    // -----------------------------------------------------------------------
    // JSON documents
    // -----------------------------------------------------------------------

    #[test]
    fn load_from_source() {
        let original = Manifest::from_entries(sample_entries()).unwrap();
        let bytes = original.to_json_vec().unwrap();

        let loaded = Manifest::load(&BytesSource::new(bytes)).unwrap();
        assert_eq!(loaded.entries(), original.entries());
    }

    #[test]
    fn rejects_unsupported_version() {
        let bytes = br#"{ "version": 7, "entries": [] }"#;
        let err = Manifest::from_json_slice(bytes).unwrap_err();
        assert!(matches!(err, ManifestError::UnsupportedVersion(7)));
    }

    #[test]
    fn rejects_malformed_json() {
        let err = Manifest::from_json_slice(b"{ not json").unwrap_err();
        assert!(matches!(err, ManifestError::Parse(_)));
    }

    #[test]
    fn empty_manifest() {
        let m = Manifest::from_json_slice(br#"{ "version": 1, "entries": [] }"#).unwrap();
        assert!(m.is_empty());
        assert!(Manifest::empty().is_empty());
    }
}
