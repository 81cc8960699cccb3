use std::collections::HashMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Result;
use crate::models::{LatencyConfig, Node, Subscription};

/// File name of the registry document inside the data directory
pub const DOCUMENT_FILE: &str = "store.json";

/// Owned form of the persisted registry document
#[derive(Debug, Default, Deserialize)]
pub struct StoreDocument {
    #[serde(default)]
    pub subscriptions: HashMap<String, Subscription>,
    #[serde(default)]
    pub node_states: HashMap<String, Node>,
    #[serde(default)]
    pub latency_config: Option<LatencyConfig>,
}

/// Borrowed view written on every save
#[derive(Debug, Serialize)]
pub struct StoreDocumentRef<'a> {
    pub subscriptions: &'a HashMap<String, Subscription>,
    pub node_states: &'a HashMap<String, Node>,
    pub latency_config: &'a LatencyConfig,
}

/// Whole-document JSON persistence for the registry
///
/// Without a data directory every operation is a no-op and the registry
/// lives in memory only.
#[derive(Debug, Clone, Default)]
pub struct DocumentStore {
    path: Option<PathBuf>,
}

impl DocumentStore {
    /// Store backed by `<data_dir>/store.json`, creating the directory
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        fs::create_dir_all(data_dir)?;

        let path = data_dir.join(DOCUMENT_FILE);
        info!(path = %path.display(), "Using registry document");

        Ok(Self { path: Some(path) })
    }

    pub fn in_memory() -> Self {
        Self { path: None }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_persistent(&self) -> bool {
        self.path.is_some()
    }

    /// Read the document; a missing file yields `None`, a malformed one an error
    pub fn load(&self) -> Result<Option<StoreDocument>> {
        let Some(path) = &self.path else {
            return Ok(None);
        };

        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "No registry document yet");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let document: StoreDocument = serde_json::from_slice(&bytes)?;
        Ok(Some(document))
    }

    /// Write the document via a temp file renamed over the target
    pub fn save(&self, document: &StoreDocumentRef<'_>) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let json = serde_json::to_vec_pretty(document)?;
        let tmp_path = path.with_extension("json.tmp");

        {
            let mut file = fs::File::create(&tmp_path)?;
            file.write_all(&json)?;
            file.sync_all()?;
        }

        fs::rename(&tmp_path, path)?;
        debug!(path = %path.display(), bytes = json.len(), "Registry document written");
        Ok(())
    }
}
