//! Lazy materialization of manifest entries.
//!
//! A [`Materializer`] combines a [`PayloadStore`] (where the serialized bytes
//! live) with a [`PayloadReader`] (how to decode them). Dispatch is a match
//! on [`EntryKind`]; each kind has its own reader method.

use std::collections::HashMap;
use std::io;
use std::path::{Component as PathComponent, Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Deserialize;
use serde_json::Value;
use tessera_manifest::{Manifest, ManifestEntry, PayloadLocator};
use tessera_types::EntryKind;
use tracing::{debug, warn};

use crate::error::{RepoError, RepoResult};
use crate::generation::{GenerationIndex, GenerationRef};
use crate::model::{
    Component, CustomObject, EnumContent, EnumValue, Generation, Properties, RuntimeObject, Table,
};

// ---------------------------------------------------------------------------
// Payload stores
// ---------------------------------------------------------------------------

/// Source of serialized payload bytes.
pub trait PayloadStore: Send + Sync {
    /// Read the payload at `locator`.
    ///
    /// A missing payload is an `io::ErrorKind::NotFound` error.
    fn read(&self, locator: &PayloadLocator) -> io::Result<Vec<u8>>;
}

/// Payloads held in memory, keyed by locator.
#[derive(Default)]
pub struct InMemoryPayloads {
    payloads: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryPayloads {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, locator: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.payloads.write().insert(locator.into(), bytes.into());
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(self, locator: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(locator, bytes);
        self
    }

    pub fn len(&self) -> usize {
        self.payloads.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.payloads.read().is_empty()
    }
}

impl PayloadStore for InMemoryPayloads {
    fn read(&self, locator: &PayloadLocator) -> io::Result<Vec<u8>> {
        self.payloads
            .read()
            .get(locator.as_str())
            .cloned()
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::NotFound, format!("no payload at {locator}"))
            })
    }
}

impl std::fmt::Debug for InMemoryPayloads {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryPayloads")
            .field("payload_count", &self.len())
            .finish()
    }
}

/// Payloads stored as files below a root directory.
///
/// Locators are relative paths. Absolute locators and locators that climb
/// out of the root are rejected.
#[derive(Clone, Debug)]
pub struct DirectoryPayloads {
    root: PathBuf,
}

impl DirectoryPayloads {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, locator: &PayloadLocator) -> io::Result<PathBuf> {
        let relative = Path::new(locator.as_str());
        let escapes = relative
            .components()
            .any(|c| !matches!(c, PathComponent::Normal(_) | PathComponent::CurDir));
        if escapes {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("payload locator {locator} leaves the payload root"),
            ));
        }
        Ok(self.root.join(relative))
    }
}

impl PayloadStore for DirectoryPayloads {
    fn read(&self, locator: &PayloadLocator) -> io::Result<Vec<u8>> {
        let path = self.resolve(locator)?;
        std::fs::read(path)
    }
}

// ---------------------------------------------------------------------------
// Payload readers
// ---------------------------------------------------------------------------

/// Decodes payload bytes into runtime objects, one method per entry kind.
///
/// `payload` is `None` for entries without a locator. Errors are plain
/// messages; the materializer attaches the entry id and kind.
pub trait PayloadReader: Send + Sync {
    fn component(
        &self,
        entry: &ManifestEntry,
        payload: Option<&[u8]>,
        generations: GenerationIndex,
    ) -> Result<Component, String>;

    fn generation(&self, entry: &ManifestEntry, payload: Option<&[u8]>)
        -> Result<Generation, String>;

    fn table(&self, entry: &ManifestEntry, payload: Option<&[u8]>) -> Result<Table, String>;

    fn enum_content(
        &self,
        entry: &ManifestEntry,
        payload: Option<&[u8]>,
    ) -> Result<EnumContent, String>;

    fn custom(&self, entry: &ManifestEntry, payload: Option<&[u8]>)
        -> Result<CustomObject, String>;

    /// Test cases decode like custom objects unless overridden.
    fn test_case(
        &self,
        entry: &ManifestEntry,
        payload: Option<&[u8]>,
    ) -> Result<CustomObject, String> {
        self.custom(entry, payload)
    }
}

/// The default reader: every payload is a JSON document.
///
/// | kind | payload |
/// |---|---|
/// | component, generation | object of properties |
/// | table | `{ "columns": [..], "rows": [[..], ..] }` |
/// | enum content | `{ "values": [{ "id": .., ..properties }, ..] }` |
/// | custom, test case | any JSON value |
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonPayloadReader;

#[derive(Deserialize)]
struct TablePayload {
    #[serde(default)]
    columns: Vec<String>,
    #[serde(default)]
    rows: Vec<Vec<Value>>,
}

#[derive(Deserialize)]
struct EnumPayload {
    #[serde(default)]
    values: Vec<Properties>,
}

fn properties(payload: Option<&[u8]>) -> Result<Properties, String> {
    match payload {
        None => Ok(Properties::new()),
        Some(bytes) => match serde_json::from_slice::<Value>(bytes).map_err(|e| e.to_string())? {
            Value::Object(map) => Ok(map),
            Value::Null => Ok(Properties::new()),
            other => Err(format!("expected a JSON object, found {other}")),
        },
    }
}

fn required<'e>(value: Option<&'e String>, field: &str) -> Result<&'e str, String> {
    value
        .map(String::as_str)
        .ok_or_else(|| format!("entry has no {field}"))
}

impl PayloadReader for JsonPayloadReader {
    fn component(
        &self,
        entry: &ManifestEntry,
        payload: Option<&[u8]>,
        generations: GenerationIndex,
    ) -> Result<Component, String> {
        Ok(Component {
            id: entry.id.clone(),
            qualified_name: entry.qualified_name.clone(),
            kind_id: required(entry.kind_id.as_ref(), "kindId")?.to_string(),
            version_id: required(entry.version_id.as_ref(), "versionId")?.to_string(),
            type_name: entry.type_name.clone(),
            valid_to: entry.valid_to,
            properties: properties(payload)?,
            generations,
        })
    }

    fn generation(
        &self,
        entry: &ManifestEntry,
        payload: Option<&[u8]>,
    ) -> Result<Generation, String> {
        let component_id = entry
            .parent_id
            .clone()
            .ok_or_else(|| "generation has no parent".to_string())?;
        let valid_from = entry
            .valid_from
            .ok_or_else(|| "generation has no validFrom".to_string())?;
        Ok(Generation {
            id: entry.id.clone(),
            component_id,
            valid_from,
            properties: properties(payload)?,
        })
    }

    fn table(&self, entry: &ManifestEntry, payload: Option<&[u8]>) -> Result<Table, String> {
        let type_name = required(entry.type_name.as_ref(), "typeName")?;
        let body: TablePayload = match payload {
            Some(bytes) => serde_json::from_slice(bytes).map_err(|e| e.to_string())?,
            None => return Err("table has no payload".into()),
        };
        if let Some(pos) = body.rows.iter().position(|r| r.len() != body.columns.len()) {
            return Err(format!(
                "row {pos} has {} cells, expected {}",
                body.rows[pos].len(),
                body.columns.len()
            ));
        }
        Ok(Table {
            qualified_name: entry.qualified_name.clone(),
            type_name: type_name.to_string(),
            columns: body.columns,
            rows: body.rows,
        })
    }

    fn enum_content(
        &self,
        entry: &ManifestEntry,
        payload: Option<&[u8]>,
    ) -> Result<EnumContent, String> {
        let type_name = required(entry.type_name.as_ref(), "typeName")?;
        let body: EnumPayload = match payload {
            Some(bytes) => serde_json::from_slice(bytes).map_err(|e| e.to_string())?,
            None => EnumPayload { values: Vec::new() },
        };
        let values = body
            .values
            .into_iter()
            .enumerate()
            .map(|(pos, mut props)| match props.remove("id") {
                Some(Value::String(id)) => Ok(EnumValue {
                    id,
                    type_name: type_name.to_string(),
                    properties: props,
                }),
                _ => Err(format!("value {pos} has no string id")),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(EnumContent {
            qualified_name: entry.qualified_name.clone(),
            type_name: type_name.to_string(),
            values,
        })
    }

    fn custom(
        &self,
        entry: &ManifestEntry,
        payload: Option<&[u8]>,
    ) -> Result<CustomObject, String> {
        let data = match payload {
            Some(bytes) => serde_json::from_slice(bytes).map_err(|e| e.to_string())?,
            None => Value::Null,
        };
        Ok(CustomObject {
            id: entry.id.clone(),
            qualified_name: entry.qualified_name.clone(),
            type_name: entry.type_name.clone(),
            data,
        })
    }
}

// ---------------------------------------------------------------------------
// Materializer
// ---------------------------------------------------------------------------

/// Turns manifest entries into [`RuntimeObject`]s.
///
/// Stateless apart from its collaborators: materializing the same entry
/// twice yields two equal, independent objects. Caching is the caller's
/// concern.
#[derive(Clone)]
pub struct Materializer {
    payloads: Arc<dyn PayloadStore>,
    reader: Arc<dyn PayloadReader>,
}

impl Materializer {
    pub fn new(payloads: Arc<dyn PayloadStore>, reader: Arc<dyn PayloadReader>) -> Self {
        Self { payloads, reader }
    }

    /// A materializer reading JSON payloads from `payloads`.
    pub fn json(payloads: Arc<dyn PayloadStore>) -> Self {
        Self::new(payloads, Arc::new(JsonPayloadReader))
    }

    /// Materialize `entry`, which must belong to `manifest`.
    ///
    /// Components get their generation index from the manifest's child
    /// entries; the generations themselves stay unmaterialized.
    pub fn materialize(&self, manifest: &Manifest, entry: &ManifestEntry) -> RepoResult<RuntimeObject> {
        let result = self.dispatch(manifest, entry);
        match &result {
            Ok(_) => debug!(id = %entry.id, kind = %entry.kind, "materialized entry"),
            Err(e) => warn!(id = %entry.id, kind = %entry.kind, error = %e, "materialization failed"),
        }
        result
    }

    fn dispatch(&self, manifest: &Manifest, entry: &ManifestEntry) -> RepoResult<RuntimeObject> {
        let fail = |reason: String| RepoError::Materialization {
            id: entry.id.clone(),
            kind: entry.kind,
            reason,
        };

        let bytes = match &entry.payload {
            Some(locator) => Some(
                self.payloads
                    .read(locator)
                    .map_err(|e| fail(format!("cannot read payload {locator}: {e}")))?,
            ),
            None => None,
        };
        let payload = bytes.as_deref();

        let object = match entry.kind {
            EntryKind::Component => {
                let generations = manifest
                    .child_entries(entry.id.as_str())
                    .filter(|child| child.kind == EntryKind::Generation)
                    .filter_map(|child| {
                        child
                            .valid_from
                            .map(|from| GenerationRef::new(child.id.clone(), from))
                    })
                    .collect();
                let index = GenerationIndex::build(&entry.id, generations, entry.valid_to)?;
                RuntimeObject::Component(Arc::new(
                    self.reader.component(entry, payload, index).map_err(fail)?,
                ))
            }
            EntryKind::Generation => RuntimeObject::Generation(Arc::new(
                self.reader.generation(entry, payload).map_err(fail)?,
            )),
            EntryKind::Table => {
                RuntimeObject::Table(Arc::new(self.reader.table(entry, payload).map_err(fail)?))
            }
            EntryKind::EnumContent => RuntimeObject::EnumContent(Arc::new(
                self.reader.enum_content(entry, payload).map_err(fail)?,
            )),
            EntryKind::Custom => {
                RuntimeObject::Custom(Arc::new(self.reader.custom(entry, payload).map_err(fail)?))
            }
            EntryKind::TestCase => RuntimeObject::TestCase(Arc::new(
                self.reader.test_case(entry, payload).map_err(fail)?,
            )),
        };
        Ok(object)
    }
}

impl std::fmt::Debug for Materializer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Materializer").finish_non_exhaustive()
    }
}
