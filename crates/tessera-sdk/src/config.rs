//! Chain configuration.
//!
//! ```toml
//! [[repository]]
//! name = "base"
//! manifest = "base/manifest.json"
//! payloads = "base/payloads"
//!
//! [[repository]]
//! name = "product"
//! manifest = "product/manifest.json"
//! references = ["base"]
//! negative_caching = false
//! ```
//!
//! Repositories may only reference repositories declared above them, so a
//! valid file never describes a cycle. The last repository is the root of
//! the chain unless another one is named explicitly.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tessera_repo::RepositoryConfig;

use crate::error::{SdkError, SdkResult};

fn default_true() -> bool {
    true
}

/// One `[[repository]]` table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryEntry {
    pub name: String,
    /// Path of the manifest document.
    pub manifest: PathBuf,
    /// Directory holding the payload files. Defaults to the manifest's
    /// directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payloads: Option<PathBuf>,
    /// Directly referenced repositories, in precedence order.
    #[serde(default)]
    pub references: Vec<String>,
    #[serde(default = "default_true")]
    pub negative_caching: bool,
}

impl RepositoryEntry {
    pub fn new(name: impl Into<String>, manifest: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            manifest: manifest.into(),
            payloads: None,
            references: Vec::new(),
            negative_caching: true,
        }
    }

    pub fn with_payloads(mut self, payloads: impl Into<PathBuf>) -> Self {
        self.payloads = Some(payloads.into());
        self
    }

    pub fn with_reference(mut self, name: impl Into<String>) -> Self {
        self.references.push(name.into());
        self
    }

    /// The payload directory, falling back to the manifest's directory.
    pub fn payload_dir(&self) -> PathBuf {
        match &self.payloads {
            Some(dir) => dir.clone(),
            None => self
                .manifest
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default(),
        }
    }

    pub fn repository_config(&self) -> RepositoryConfig {
        RepositoryConfig {
            name: self.name.clone(),
            negative_caching: self.negative_caching,
        }
    }
}

/// A whole repository chain.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    #[serde(rename = "repository", default)]
    pub repositories: Vec<RepositoryEntry>,
}

impl ChainConfig {
    pub fn new(repositories: Vec<RepositoryEntry>) -> SdkResult<Self> {
        let config = Self { repositories };
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a TOML document. Paths are taken as written.
    pub fn from_toml(s: &str) -> SdkResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| SdkError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML file. Relative paths inside it are resolved against the
    /// file's directory.
    pub fn load(path: impl AsRef<Path>) -> SdkResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SdkError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml(&text)?;
        if let Some(base) = path.parent() {
            config.resolve_relative_to(base);
        }
        Ok(config)
    }

    fn resolve_relative_to(&mut self, base: &Path) {
        for repo in &mut self.repositories {
            if repo.manifest.is_relative() {
                repo.manifest = base.join(&repo.manifest);
            }
            if let Some(dir) = &mut repo.payloads {
                if dir.is_relative() {
                    *dir = base.join(&*dir);
                }
            }
        }
    }

    /// Check names and references.
    ///
    /// Rejects empty configurations, blank or duplicate names, and
    /// references that are unknown, self-referential, repeated, or point
    /// forward.
    pub fn validate(&self) -> SdkResult<()> {
        if self.repositories.is_empty() {
            return Err(SdkError::InvalidConfig("no repositories configured".into()));
        }
        let mut declared: HashSet<&str> = HashSet::new();
        let all: HashSet<&str> = self.repositories.iter().map(|r| r.name.as_str()).collect();
        for repo in &self.repositories {
            let name = repo.name.as_str();
            if name.trim().is_empty() {
                return Err(SdkError::InvalidConfig("repository with blank name".into()));
            }
            let mut seen: HashSet<&str> = HashSet::new();
            for reference in &repo.references {
                let reference = reference.as_str();
                if reference == name {
                    return Err(SdkError::InvalidConfig(format!(
                        "repository {name} references itself"
                    )));
                }
                if !seen.insert(reference) {
                    return Err(SdkError::InvalidConfig(format!(
                        "repository {name} references {reference} twice"
                    )));
                }
                if !declared.contains(reference) {
                    let reason = if all.contains(reference) {
                        "is declared later"
                    } else {
                        "is not declared"
                    };
                    return Err(SdkError::InvalidConfig(format!(
                        "repository {name} references {reference}, which {reason}"
                    )));
                }
            }
            if !declared.insert(name) {
                return Err(SdkError::InvalidConfig(format!(
                    "repository {name} declared twice"
                )));
            }
        }
        Ok(())
    }

    pub fn repository(&self, name: &str) -> Option<&RepositoryEntry> {
        self.repositories.iter().find(|r| r.name == name)
    }

    /// Name of the last declared repository.
    pub fn default_root(&self) -> Option<&str> {
        self.repositories.last().map(|r| r.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHAIN: &str = r#"
        [[repository]]
        name = "base"
        manifest = "base/manifest.json"
        payloads = "base/payloads"

        [[repository]]
        name = "product"
        manifest = "product/manifest.json"
        references = ["base"]
        negative_caching = false
    "#;

    fn rejects(toml: &str) -> String {
        match ChainConfig::from_toml(toml) {
            Err(SdkError::InvalidConfig(reason)) => reason,
            other => panic!("expected InvalidConfig, got {other:?}"),
        }
    }

    // -----------------------------------------------------------------------
    // Parsing
    // -----------------------------------------------------------------------

    #[test]
    fn parse_chain() {
        let config = ChainConfig::from_toml(CHAIN).unwrap();
        assert_eq!(config.repositories.len(), 2);
        assert_eq!(config.default_root(), Some("product"));

        let base = config.repository("base").unwrap();
        assert!(base.negative_caching);
        assert_eq!(base.payload_dir(), PathBuf::from("base/payloads"));

        let product = config.repository("product").unwrap();
        assert_eq!(product.references, vec!["base"]);
        assert!(!product.repository_config().negative_caching);
        assert_eq!(product.payload_dir(), PathBuf::from("product"));
    }

    #[test]
    fn load_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chain.toml");
        std::fs::write(&path, CHAIN).unwrap();

        let config = ChainConfig::load(&path).unwrap();
        let base = config.repository("base").unwrap();
        assert_eq!(base.manifest, dir.path().join("base/manifest.json"));
        assert_eq!(base.payload_dir(), dir.path().join("base/payloads"));
    }

    #[test]
    fn load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            ChainConfig::load(dir.path().join("absent.toml")),
            Err(SdkError::Io { .. })
        ));
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    #[test]
    fn invalid_references_rejected() {
        let unknown = rejects(
            r#"
            [[repository]]
            name = "a"
            manifest = "a.json"
            references = ["ghost"]
            "#,
        );
        assert!(unknown.contains("not declared"));

        let forward = rejects(
            r#"
            [[repository]]
            name = "a"
            manifest = "a.json"
            references = ["b"]

            [[repository]]
            name = "b"
            manifest = "b.json"
            "#,
        );
        assert!(forward.contains("declared later"));

        let own = rejects(
            r#"
            [[repository]]
            name = "a"
            manifest = "a.json"
            references = ["a"]
            "#,
        );
        assert!(own.contains("itself"));

        let twice = rejects(
            r#"
            [[repository]]
            name = "a"
            manifest = "a.json"

            [[repository]]
            name = "b"
            manifest = "b.json"
            references = ["a", "a"]
            "#,
        );
        assert!(twice.contains("twice"));
    }

    #[test]
    fn duplicate_and_empty_rejected() {
        let dup = rejects(
            r#"
            [[repository]]
            name = "a"
            manifest = "a.json"

            [[repository]]
            name = "a"
            manifest = "b.json"
            "#,
        );
        assert!(dup.contains("declared twice"));
        assert!(rejects("").contains("no repositories"));
    }

    #[test]
    fn programmatic_construction() {
        let config = ChainConfig::new(vec![
            RepositoryEntry::new("base", "/data/base.json").with_payloads("/data/payloads"),
            RepositoryEntry::new("top", "/data/top.json").with_reference("base"),
        ])
        .unwrap();
        assert_eq!(config.default_root(), Some("top"));
        assert!(ChainConfig::new(vec![RepositoryEntry::new("x", "x.json").with_reference("y")]).is_err());
    }
}
