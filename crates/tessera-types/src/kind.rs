use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// The kind of a manifest entry.
///
/// The set is closed: materialization dispatches on this tag instead of on
/// runtime type information.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntryKind {
    /// A versioned business object identified by `(kind_id, version_id)`.
    Component,
    /// A time slice of a component, valid from a given date.
    Generation,
    /// An immutable rowset identified by its qualified name.
    Table,
    /// The enumerated values of one value type.
    EnumContent,
    /// Any other object the manifest producer chose to publish.
    Custom,
    /// A stored test case.
    TestCase,
}

impl EntryKind {
    /// All kinds, in declaration order.
    pub const ALL: [EntryKind; 6] = [
        EntryKind::Component,
        EntryKind::Generation,
        EntryKind::Table,
        EntryKind::EnumContent,
        EntryKind::Custom,
        EntryKind::TestCase,
    ];

    /// The kebab-case tag used in manifests.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Component => "component",
            Self::Generation => "generation",
            Self::Table => "table",
            Self::EnumContent => "enum-content",
            Self::Custom => "custom",
            Self::TestCase => "test-case",
        }
    }

    /// Returns `true` for kinds that must name a parent entry.
    pub fn requires_parent(&self) -> bool {
        matches!(self, Self::Generation)
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryKind {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| TypeError::UnknownKind(s.to_string()))
    }
}
