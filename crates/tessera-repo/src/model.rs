//! Runtime objects produced by materialization.
//!
//! All objects are immutable once built and shared as `Arc`s. Collections
//! are exposed as slices, never as mutable handles into the repository.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tessera_types::{EffectiveDate, EntryId, EntryKind};

use crate::generation::GenerationIndex;

/// Property bag of a materialized object, in payload order.
pub type Properties = Map<String, Value>;

/// A versioned product component.
#[derive(Clone, Debug, PartialEq)]
pub struct Component {
    pub id: EntryId,
    pub qualified_name: String,
    pub kind_id: String,
    pub version_id: String,
    pub type_name: Option<String>,
    pub valid_to: Option<EffectiveDate>,
    pub properties: Properties,
    pub generations: GenerationIndex,
}

impl Component {
    pub fn new(
        id: impl Into<EntryId>,
        qualified_name: impl Into<String>,
        kind_id: impl Into<String>,
        version_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            qualified_name: qualified_name.into(),
            kind_id: kind_id.into(),
            version_id: version_id.into(),
            type_name: None,
            valid_to: None,
            properties: Properties::new(),
            generations: GenerationIndex::default(),
        }
    }

    pub fn with_type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    pub fn with_valid_to(mut self, valid_to: EffectiveDate) -> Self {
        self.valid_to = Some(valid_to);
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    pub fn generation_count(&self) -> usize {
        self.generations.len()
    }
}

/// One time slice of a component.
#[derive(Clone, Debug, PartialEq)]
pub struct Generation {
    pub id: EntryId,
    pub component_id: EntryId,
    pub valid_from: EffectiveDate,
    pub properties: Properties,
}

impl Generation {
    pub fn new(
        id: impl Into<EntryId>,
        component_id: impl Into<EntryId>,
        valid_from: EffectiveDate,
    ) -> Self {
        Self {
            id: id.into(),
            component_id: component_id.into(),
            valid_from,
            properties: Properties::new(),
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }
}

/// An immutable rowset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub qualified_name: String,
    pub type_name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(qualified_name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            qualified_name: qualified_name.into(),
            type_name: type_name.into(),
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_row(mut self, row: Vec<Value>) -> Self {
        self.rows.push(row);
        self
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Rows whose `column` equals `value`.
    pub fn rows_where<'a>(
        &'a self,
        column: &str,
        value: &'a Value,
    ) -> impl Iterator<Item = &'a [Value]> + 'a {
        let idx = self.column_index(column);
        self.rows
            .iter()
            .filter(move |row| idx.is_some_and(|i| row.get(i) == Some(value)))
            .map(Vec::as_slice)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// One enumerated value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnumValue {
    pub id: String,
    pub type_name: String,
    #[serde(default)]
    pub properties: Properties,
}

impl EnumValue {
    pub fn new(type_name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            type_name: type_name.into(),
            properties: Properties::new(),
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }
}

/// The enumerated values of one type held in a manifest.
#[derive(Clone, Debug, PartialEq)]
pub struct EnumContent {
    pub qualified_name: String,
    pub type_name: String,
    pub values: Vec<EnumValue>,
}

impl EnumContent {
    pub fn new(qualified_name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            qualified_name: qualified_name.into(),
            type_name: type_name.into(),
            values: Vec::new(),
        }
    }

    /// Append a value with the given id.
    pub fn with_value(mut self, id: impl Into<String>) -> Self {
        let value = EnumValue::new(self.type_name.clone(), id);
        self.values.push(value);
        self
    }

    pub fn value(&self, id: &str) -> Option<&EnumValue> {
        self.values.iter().find(|v| v.id == id)
    }
}

/// A manifest object of a kind the repository does not interpret: custom
/// objects and test cases.
#[derive(Clone, Debug, PartialEq)]
pub struct CustomObject {
    pub id: EntryId,
    pub qualified_name: String,
    pub type_name: Option<String>,
    pub data: Value,
}

impl CustomObject {
    pub fn new(id: impl Into<EntryId>, qualified_name: impl Into<String>, data: Value) -> Self {
        Self {
            id: id.into(),
            qualified_name: qualified_name.into(),
            type_name: None,
            data,
        }
    }
}

/// Any materialized object, tagged by entry kind.
#[derive(Clone, Debug)]
pub enum RuntimeObject {
    Component(Arc<Component>),
    Generation(Arc<Generation>),
    Table(Arc<Table>),
    EnumContent(Arc<EnumContent>),
    Custom(Arc<CustomObject>),
    TestCase(Arc<CustomObject>),
}

impl RuntimeObject {
    pub fn kind(&self) -> EntryKind {
        match self {
            Self::Component(_) => EntryKind::Component,
            Self::Generation(_) => EntryKind::Generation,
            Self::Table(_) => EntryKind::Table,
            Self::EnumContent(_) => EntryKind::EnumContent,
            Self::Custom(_) => EntryKind::Custom,
            Self::TestCase(_) => EntryKind::TestCase,
        }
    }

    pub fn into_component(self) -> Option<Arc<Component>> {
        match self {
            Self::Component(c) => Some(c),
            _ => None,
        }
    }

    pub fn into_generation(self) -> Option<Arc<Generation>> {
        match self {
            Self::Generation(g) => Some(g),
            _ => None,
        }
    }

    pub fn into_table(self) -> Option<Arc<Table>> {
        match self {
            Self::Table(t) => Some(t),
            _ => None,
        }
    }

    pub fn into_enum_content(self) -> Option<Arc<EnumContent>> {
        match self {
            Self::EnumContent(e) => Some(e),
            _ => None,
        }
    }

    pub fn into_custom(self) -> Option<Arc<CustomObject>> {
        match self {
            Self::Custom(c) => Some(c),
            _ => None,
        }
    }

    pub fn into_test_case(self) -> Option<Arc<CustomObject>> {
        match self {
            Self::TestCase(t) => Some(t),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn table_rows_where() {
        let table = Table::new("rates", "RateTable")
            .with_columns(["age", "rate"])
            .with_row(vec![json!(30), json!(1.5)])
            .with_row(vec![json!(40), json!(2.0)])
            .with_row(vec![json!(30), json!(1.7)]);
        let thirty = json!(30);
        assert_eq!(table.rows_where("age", &thirty).count(), 2);
        assert_eq!(table.rows_where("missing", &thirty).count(), 0);
        assert_eq!(table.row_count(), 3);
    }

    #[test]
    fn enum_content_lookup() {
        let content = EnumContent::new("gender", "Gender").with_value("m").with_value("f");
        assert_eq!(content.value("f").unwrap().type_name, "Gender");
        assert!(content.value("x").is_none());
    }

    #[test]
    fn runtime_object_projections() {
        let obj = RuntimeObject::Table(Arc::new(Table::new("t", "T")));
        assert_eq!(obj.kind(), EntryKind::Table);
        assert!(obj.clone().into_component().is_none());
        assert!(obj.into_table().is_some());
    }
}
