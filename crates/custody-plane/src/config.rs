//! Service configuration
//!
//! Configuration is an explicit value passed into the service rather
//! than ambient process state, so multiple service instances can
//! coexist in tests without filesystem or port collisions.

use std::env;
use std::path::PathBuf;

/// Configuration for one custody service instance
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Port the HTTP server listens on
    pub port: u16,
    /// Directory holding the instance key and lifecycle records
    pub storage_dir: PathBuf,
    /// Root every workload persist directory must fall under
    pub persist_root: PathBuf,
}

impl ServiceConfig {
    /// Build a configuration from environment variables
    ///
    /// `CUSTODY_PORT`, `CUSTODY_STORAGE_DIR`, and
    /// `CUSTODY_PERSIST_ROOT`, each falling back to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port = env::var("CUSTODY_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(defaults.port);
        let storage_dir = env::var("CUSTODY_STORAGE_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.storage_dir);
        let persist_root = env::var("CUSTODY_PERSIST_ROOT")
            .map(PathBuf::from)
            .unwrap_or(defaults.persist_root);

        Self {
            port,
            storage_dir,
            persist_root,
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            storage_dir: PathBuf::from("/mnt"),
            // Persist dirs name container-interior paths, so the whole
            // container filesystem is the default allowed root.
            persist_root: PathBuf::from("/"),
        }
    }
}
