//! Helpers for writing repositories to disk in tests.

use std::path::Path;

use serde_json::{json, Value};

/// Write `<root>/<name>/manifest.json` holding `entries`, plus the given
/// payload files next to it.
pub(crate) fn write_repository(root: &Path, name: &str, entries: Value, payloads: &[(&str, Value)]) {
    let dir = root.join(name);
    std::fs::create_dir_all(&dir).unwrap();
    let manifest = json!({ "version": 1, "entries": entries });
    std::fs::write(dir.join("manifest.json"), manifest.to_string()).unwrap();
    for (locator, body) in payloads {
        std::fs::write(dir.join(locator), body.to_string()).unwrap();
    }
}
