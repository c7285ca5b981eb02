//! Persisted configuration (`.enlite.json`)
//!
//! ```json
//! {
//!   "wsun": {
//!     "adaptor": "BP35A1",
//!     "id": { "id": "0123456789ABCDEF0123456789ABCDEF", "password": "ABCDEFGHIJKL" },
//!     "config": { "device": "/dev/ttyUSB0" },
//!     "cache": { "channel": 33, "panId": 4660, "addr": "FE80:0000:0000:0000:021D:1290:0003:C890" }
//!   }
//! }
//! ```

use enlite_core::{EnliteError, EnliteResult};
use enlite_transport::{PanDescriptor, WsunCache, WsunConfig, WsunId};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// Default configuration file name, looked up in the working directory
pub const CONFIG_FILE_NAME: &str = ".enlite.json";

/// Configuration document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnliteConfig {
    pub wsun: WsunSection,
}

/// Network session settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WsunSection {
    /// Model name of the adaptor
    pub adaptor: String,
    /// Route-B credentials
    pub id: WsunId,
    /// Adaptor-specific parameters
    pub config: WsunConfig,
    /// PAN descriptor of the last session
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache: Option<WsunCache>,
}

/// Configuration together with the file it lives in
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    config: RwLock<EnliteConfig>,
}

impl ConfigStore {
    /// Create a store for `config` backed by `path`; nothing is written yet
    pub fn new(path: impl Into<PathBuf>, config: EnliteConfig) -> Self {
        Self {
            path: path.into(),
            config: RwLock::new(config),
        }
    }

    /// Load the configuration from a file
    ///
    /// # Errors
    /// * `EnliteError::Config` if the file cannot be read
    /// * `EnliteError::Json` if it is not a valid configuration document
    pub fn load(path: impl AsRef<Path>) -> EnliteResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| EnliteError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        let config: EnliteConfig = serde_json::from_str(&text)?;
        log::debug!("config: loaded {}", path.display());
        Ok(Self::new(path, config))
    }

    /// Load `.enlite.json` from the working directory
    pub fn load_default() -> EnliteResult<Self> {
        let dir = std::env::current_dir()
            .map_err(|e| EnliteError::Config(format!("cannot get working directory: {}", e)))?;
        Self::load(dir.join(CONFIG_FILE_NAME))
    }

    /// Get the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get a snapshot of the configuration
    pub async fn config(&self) -> EnliteConfig {
        self.config.read().await.clone()
    }

    /// Remember the PAN descriptor of a new session and rewrite the file
    ///
    /// Only channel, PAN ID and address are kept.
    pub async fn update_cache(&self, descriptor: &PanDescriptor) -> EnliteResult<()> {
        let text = {
            let mut config = self.config.write().await;
            config.wsun.cache = Some(descriptor.cache());
            serde_json::to_string_pretty(&*config)?
        };
        tokio::fs::write(&self.path, text).await?;
        log::debug!("config: cache written to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"{
  "wsun": {
    "adaptor": "BP35A1",
    "id": { "id": "0123456789ABCDEF0123456789ABCDEF", "password": "ABCDEFGHIJKL" },
    "config": { "device": "/dev/ttyUSB0" }
  }
}"#;

    fn sample_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_load() {
        let file = sample_file();
        let store = ConfigStore::load(file.path()).unwrap();
        let config = store.config().await;
        assert_eq!(config.wsun.adaptor, "BP35A1");
        assert_eq!(config.wsun.id.password, "ABCDEFGHIJKL");
        assert_eq!(config.wsun.config.device, "/dev/ttyUSB0");
        assert_eq!(config.wsun.cache, None);
        assert_eq!(store.path(), file.path());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            ConfigStore::load(dir.path().join(CONFIG_FILE_NAME)),
            Err(EnliteError::Config(_))
        ));
    }

    #[test]
    fn test_load_invalid_document() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"wsun": {"adaptor": "BP35A1"}}"#).unwrap();
        assert!(matches!(ConfigStore::load(file.path()), Err(EnliteError::Json(_))));
    }

    #[tokio::test]
    async fn test_update_cache() {
        let file = sample_file();
        let store = ConfigStore::load(file.path()).unwrap();
        let mut descriptor = PanDescriptor::new(0x21, 0x1234, "FE80:0000:0000:0000:021D:1290:0003:C890");
        descriptor.lqi = Some(0x9c);
        descriptor.page = Some(9);

        store.update_cache(&descriptor).await.unwrap();

        let text = std::fs::read_to_string(file.path()).unwrap();
        assert!(text.contains(r#""panId": 4660"#));
        assert!(!text.contains("LQI"));
        assert!(!text.contains("page"));
        let reloaded = ConfigStore::load(file.path()).unwrap();
        assert_eq!(reloaded.config().await, store.config().await);
        assert_eq!(reloaded.config().await.wsun.cache, Some(descriptor.cache()));
    }
}
