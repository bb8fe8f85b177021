use crate::Result;
use crate::catalog::{ColumnDeclaration, Role};
use camino::{Utf8Path, Utf8PathBuf};
use ohno::IntoAppError;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::sync::{Arc, Mutex, PoisonError};

const LOG_TARGET: &str = " extension";

/// One column entry of an extension document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtensionColumn {
    pub usage: Role,

    #[serde(default)]
    pub description: String,
}

/// One view entry of an extension document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtensionNamespace {
    #[serde(default)]
    pub query: Option<String>,

    #[serde(default)]
    pub metrics: Vec<BTreeMap<String, ExtensionColumn>>,
}

/// Additional declarations supplied in a YAML document.
///
/// Only a role and a description can be given per column; value tables and version
/// ranges are not accepted from this source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct ExtensionDocument {
    namespaces: BTreeMap<String, ExtensionNamespace>,
}

impl ExtensionDocument {
    pub fn parse(text: &str) -> Result<Self> {
        let doc: Self = serde_yaml::from_str(text).into_app_err("parsing extension document")?;
        Ok(doc)
    }

    /// Column declarations per view, for views that declare metrics.
    #[must_use]
    pub fn namespaces(&self) -> Vec<(String, Vec<ColumnDeclaration>)> {
        self.namespaces
            .iter()
            .filter(|(_, ns)| !ns.metrics.is_empty())
            .map(|(name, ns)| {
                log::debug!(target: LOG_TARGET, "New user metric namespace from extension document: {name}");
                let columns = ns
                    .metrics
                    .iter()
                    .flat_map(|entry| entry.iter())
                    .map(|(column, decl)| ColumnDeclaration::new(column.as_str(), decl.usage, decl.description.as_str()))
                    .collect();
                (name.clone(), columns)
            })
            .collect()
    }

    /// Query overrides per view, for views that declare a query.
    pub fn queries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.namespaces
            .iter()
            .filter_map(|(name, ns)| ns.query.as_deref().map(|q| (name.as_str(), q)))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty()
    }
}

/// Outcome of the most recent load, reported as the `user_queries_load_error` indicator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadStatus {
    pub path: Utf8PathBuf,

    /// Lowercase hex SHA-256 of the document, empty when it could not be read.
    pub hashsum: String,
    pub failed: bool,
}

/// The raw content of the document as last read from disk.
#[derive(Debug, Clone)]
pub struct ExtensionContent {
    text: Option<String>,
    hashsum: Option<String>,
}

impl ExtensionContent {
    /// The content hash, or `None` if the file could not be read.
    #[must_use]
    pub fn hashsum(&self) -> Option<&str> {
        self.hashsum.as_deref()
    }
}

#[derive(Debug, Default)]
struct LoaderState {
    last_good: Option<Arc<ExtensionDocument>>,
    status: Option<LoadStatus>,
}

/// Loads the extension document and remembers the last version that parsed.
#[derive(Debug)]
pub struct ExtensionLoader {
    path: Utf8PathBuf,
    state: Mutex<LoaderState>,
}

impl ExtensionLoader {
    #[must_use]
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: Mutex::new(LoaderState::default()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Read the document and compute its content hash. Read failures are logged and yield no content.
    #[must_use]
    pub fn read(&self) -> ExtensionContent {
        match fs::read(&self.path) {
            Ok(bytes) => {
                let hashsum = hashsum(&bytes);
                let text = String::from_utf8(bytes).ok();
                ExtensionContent {
                    text,
                    hashsum: Some(hashsum),
                }
            }
            Err(e) => {
                log::error!(target: LOG_TARGET, "Failed to read extension document '{}': {e}", self.path);
                ExtensionContent { text: None, hashsum: None }
            }
        }
    }

    /// Parse previously read content, updating the load indicator.
    ///
    /// On any failure the last document that parsed is returned, so entries that were
    /// active are never partially replaced.
    pub fn load(&self, content: &ExtensionContent) -> Option<Arc<ExtensionDocument>> {
        let parsed = match (&content.text, &content.hashsum) {
            (Some(text), Some(_)) => ExtensionDocument::parse(text).map(Arc::new),
            (None, Some(_)) => Err(ohno::app_err!("extension document '{}' is not valid UTF-8", self.path)),
            _ => Err(ohno::app_err!("extension document '{}' could not be read", self.path)),
        };

        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let failed = match parsed {
            Ok(doc) => {
                state.last_good = Some(doc);
                false
            }
            Err(e) => {
                log::error!(target: LOG_TARGET, "Failed to reload extension document '{}': {e}", self.path);
                true
            }
        };

        state.status = Some(LoadStatus {
            path: self.path.clone(),
            hashsum: content.hashsum.clone().unwrap_or_default(),
            failed,
        });

        state.last_good.clone()
    }

    /// Outcome of the most recent [`load`](Self::load), if any.
    #[must_use]
    pub fn status(&self) -> Option<LoadStatus> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).status.clone()
    }
}

/// Lowercase hex SHA-256 of `bytes`.
#[must_use]
pub fn hashsum(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
