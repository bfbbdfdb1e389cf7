use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::config::{app::DEFAULT_PROFILE_PHOTO_DISK, AppConfig};

/// Resolves a file stored on a named disk to a publicly servable URL.
pub trait StorageResolver: Send + Sync {
    fn url(&self, disk: &str, path: &str) -> String;
}

/// Disk table mapping each disk name to its public base URL. Disks that are
/// backed by a local directory also carry that root; the public disk is one.
#[derive(Debug, Clone)]
pub struct Disks {
    bases: HashMap<String, String>,
    roots: HashMap<String, PathBuf>,
}

impl Disks {
    pub fn new(bases: HashMap<String, String>) -> Self {
        Self {
            bases,
            roots: HashMap::new(),
        }
    }

    /// Back `disk` with a local directory.
    pub fn with_root(mut self, disk: &str, root: impl Into<PathBuf>) -> Self {
        self.roots.insert(disk.to_string(), root.into());
        self
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.storage_disks.clone())
            .with_root(DEFAULT_PROFILE_PHOTO_DISK, &config.storage_root)
    }

    /// Local directory backing `disk`, if it has one.
    pub fn root(&self, disk: &str) -> Option<&Path> {
        self.roots.get(disk).map(PathBuf::as_path)
    }

    /// Local filesystem location for a relative path on `disk`. `None` when
    /// the disk is not local or the path has parent-directory components.
    pub fn local_path(&self, disk: &str, path: &str) -> Option<PathBuf> {
        let root = self.root(disk)?;
        let relative = Path::new(path.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, std::path::Component::Normal(_)))
        {
            return None;
        }
        Some(root.join(relative))
    }
}

impl StorageResolver for Disks {
    fn url(&self, disk: &str, path: &str) -> String {
        let path = path.trim_start_matches('/');
        match self.bases.get(disk) {
            Some(base) => format!("{}/{}", base.trim_end_matches('/'), path),
            None => {
                tracing::warn!("Unknown storage disk '{}', serving '{}' root-relative", disk, path);
                format!("/{}", path)
            }
        }
    }
}
