use std::path::PathBuf;

use crate::StorageError;

/// Browser storage allows roughly this much per origin.
pub const DEFAULT_QUOTA_BYTES: usize = 5 * 1024 * 1024;

const DIR_ENV: &str = "TETHER_STORAGE_DIR";
const QUOTA_ENV: &str = "TETHER_STORAGE_QUOTA";

/// Where a [`FileStorage`](crate::FileStorage) lives and how much it may hold.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageConfig {
    pub dir: PathBuf,
    pub file_name: String,
    /// `None` disables the quota.
    pub quota_bytes: Option<usize>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("tether"),
            file_name: "storage.json".to_string(),
            quota_bytes: Some(DEFAULT_QUOTA_BYTES),
        }
    }
}

impl StorageConfig {
    /// Defaults overridden by `TETHER_STORAGE_DIR` and `TETHER_STORAGE_QUOTA`
    /// (bytes, `0` for unlimited).
    pub fn from_env() -> Result<Self, StorageError> {
        let mut config = Self::default();
        if let Ok(dir) = std::env::var(DIR_ENV)
            && !dir.is_empty()
        {
            config.dir = PathBuf::from(dir);
        }
        if let Ok(raw) = std::env::var(QUOTA_ENV) {
            config.quota_bytes = parse_quota(&raw)?;
        }
        log::debug!("storage config: {config:?}");
        Ok(config)
    }

    pub fn dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = dir.into();
        self
    }

    pub fn file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = name.into();
        self
    }

    pub fn quota_bytes(mut self, quota: Option<usize>) -> Self {
        self.quota_bytes = quota;
        self
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.file_name)
    }
}

fn parse_quota(raw: &str) -> Result<Option<usize>, StorageError> {
    match raw.trim().parse::<usize>() {
        Ok(0) => Ok(None),
        Ok(n) => Ok(Some(n)),
        Err(_) => Err(StorageError::InvalidConfig {
            name: QUOTA_ENV,
            value: raw.to_string(),
        }),
    }
}
