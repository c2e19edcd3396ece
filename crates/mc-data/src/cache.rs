//! Durable per-mode calibration cache.
//!
//! One JSON file per mode under a configured root:
//! `{"version": 1, "parameters": [k, bias, smooth, regress]}`.
//! Writes go to a temporary file in the same directory and are renamed over
//! the target, so readers only ever see a complete entry.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use mc_types::{Bounds, CalError, CalResult, Mode, ParameterVector};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Bump when the parameter layout changes; older entries then read as absent.
pub const CACHE_FORMAT_VERSION: u32 = 1;

/// Environment variable overriding the default cache root.
pub const CACHE_DIR_ENV: &str = "MC_CACHE_DIR";

/// Serialized cache record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct CacheEntry {
    version: u32,
    parameters: Vec<f64>,
}

/// Why a cache file could not be used.
#[derive(Error, Debug)]
enum EntryError {
    #[error("unreadable: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("format version {found}, expected {}", CACHE_FORMAT_VERSION)]
    Version { found: u32 },

    #[error("invalid parameters: {0}")]
    Parameters(String),

    #[error("parameters {0} outside the mode's bounds")]
    OutOfBounds(ParameterVector),
}

/// Calibration cache rooted at an injected directory.
#[derive(Debug)]
pub struct CalibrationCache {
    root: PathBuf,
    locks: DashMap<Mode, Arc<Mutex<()>>>,
}

impl CalibrationCache {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            locks: DashMap::new(),
        }
    }

    /// Resolve the process-wide default root: `MC_CACHE_DIR`, then the
    /// platform cache directory, then `./.cache`.
    pub fn default_root() -> PathBuf {
        if let Some(dir) = std::env::var_os(CACHE_DIR_ENV) {
            return PathBuf::from(dir);
        }
        dirs::cache_dir()
            .map(|dir| dir.join("margin-calibrate"))
            .unwrap_or_else(|| PathBuf::from(".cache"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of the entry for `mode`, keyed by the lowercased mode name.
    pub fn entry_path(&self, mode: Mode) -> PathBuf {
        self.root.join(format!("{}.json", mode.cache_key()))
    }

    /// Read the entry for `mode`. Missing and corrupt entries both read as
    /// `None`; corruption is logged.
    pub fn load(&self, mode: Mode) -> Option<ParameterVector> {
        self.read_checked(mode, None)
    }

    /// Like [`CalibrationCache::load`], additionally treating entries that
    /// fall outside `bounds` as corrupt.
    pub fn load_within(&self, mode: Mode, bounds: &Bounds) -> Option<ParameterVector> {
        self.read_checked(mode, Some(bounds))
    }

    fn read_checked(&self, mode: Mode, bounds: Option<&Bounds>) -> Option<ParameterVector> {
        let path = self.entry_path(mode);
        if !path.exists() {
            tracing::debug!("No cached calibration for {} at {}", mode, path.display());
            return None;
        }

        match Self::read_entry(&path, bounds) {
            Ok(params) => {
                tracing::info!("Loaded cached calibration for {}: {}", mode, params);
                Some(params)
            }
            Err(e) => {
                let error = CalError::CacheCorrupt {
                    mode: mode.to_string(),
                    message: format!("{}: {}", path.display(), e),
                };
                tracing::warn!("{}; treating as cache miss", error);
                None
            }
        }
    }

    fn read_entry(path: &Path, bounds: Option<&Bounds>) -> Result<ParameterVector, EntryError> {
        let bytes = std::fs::read(path)?;
        let entry: CacheEntry = serde_json::from_slice(&bytes)?;

        if entry.version != CACHE_FORMAT_VERSION {
            return Err(EntryError::Version {
                found: entry.version,
            });
        }

        let params = ParameterVector::from_slice(&entry.parameters)
            .map_err(|e| EntryError::Parameters(e.to_string()))?;

        match bounds {
            Some(bounds) if !bounds.contains(&params.to_array()) => {
                Err(EntryError::OutOfBounds(params))
            }
            _ => Ok(params),
        }
    }

    /// Atomically write or replace the entry for `mode`.
    ///
    /// Concurrent stores for the same mode are serialized; different modes
    /// do not contend. Failures are returned, never swallowed.
    pub fn store(&self, mode: Mode, params: &ParameterVector) -> CalResult<()> {
        let lock = self.lock_for(mode);
        let _guard = lock.lock();

        std::fs::create_dir_all(&self.root)?;

        let entry = CacheEntry {
            version: CACHE_FORMAT_VERSION,
            parameters: params.to_array().to_vec(),
        };
        let json = serde_json::to_vec_pretty(&entry)?;

        // The temp file lives next to the target so the rename stays on one
        // filesystem. Dropping it on any early return removes it.
        let mut tmp = tempfile::Builder::new()
            .prefix(&format!(".{}.", mode.cache_key()))
            .suffix(".tmp")
            .tempfile_in(&self.root)?;
        tmp.write_all(&json)?;
        tmp.as_file().sync_all()?;

        let path = self.entry_path(mode);
        tmp.persist(&path).map_err(|e| CalError::Io(e.error))?;

        tracing::info!("Stored calibration for {} at {}: {}", mode, path.display(), params);
        Ok(())
    }

    /// Remove the entry for `mode`. A missing entry is not an error.
    pub fn invalidate(&self, mode: Mode) -> CalResult<()> {
        let lock = self.lock_for(mode);
        let _guard = lock.lock();

        match std::fs::remove_file(self.entry_path(mode)) {
            Ok(()) => {
                tracing::info!("Invalidated cached calibration for {}", mode);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn lock_for(&self, mode: Mode) -> Arc<Mutex<()>> {
        self.locks
            .entry(mode)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
