//! TOML-file persistence for the device registry.
//!
//! The registry lives at:
//! - Windows:  `%APPDATA%\adbwifi\devices.toml`
//! - Linux:    `~/.local/share/adbwifi/devices.toml`
//! - macOS:    `~/Library/Application Support/adbwifi/devices.toml`
//!
//! ```toml
//! [[devices]]
//! label = "Pixel 7 (ABC123)"
//! serial = "ABC123"
//! address = "192.168.1.20:5555"
//! ```
//!
//! Writes go to a sibling `.tmp` file that is then renamed over the target, so
//! a crash mid-write leaves either the old or the new list, never a truncated
//! one.  An in-process mutex serialises read-modify-write cycles.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use adbwifi_core::SavedDevice;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::registry::{upsert, DeviceRegistry, StorageError};

const REGISTRY_FILE_NAME: &str = "devices.toml";

/// On-disk document.
#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    devices: Vec<SavedDevice>,
}

/// Resolves the default registry path in the platform data directory.
///
/// # Errors
///
/// Returns [`StorageError::NoPlatformDataDir`] when the data directory cannot
/// be determined from the environment.
pub fn default_registry_path() -> Result<PathBuf, StorageError> {
    dirs::data_dir()
        .map(|dir| dir.join("adbwifi").join(REGISTRY_FILE_NAME))
        .ok_or(StorageError::NoPlatformDataDir)
}

/// [`DeviceRegistry`] stored as a TOML file.
pub struct FileDeviceRegistry {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileDeviceRegistry {
    /// Creates a registry backed by `path`.  The file is not touched until
    /// the first operation; a missing file reads as an empty registry.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Vec<SavedDevice>, StorageError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StorageError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let file: RegistryFile = toml::from_str(&content).map_err(|source| StorageError::Parse {
            path: self.path.clone(),
            source,
        })?;
        Ok(file.devices)
    }

    fn write(&self, devices: Vec<SavedDevice>) -> Result<(), StorageError> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir).map_err(|source| StorageError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        let content = toml::to_string_pretty(&RegistryFile { devices })?;
        let tmp = self.path.with_extension("toml.tmp");
        std::fs::write(&tmp, content).map_err(|source| StorageError::Io {
            path: tmp.clone(),
            source,
        })?;
        std::fs::rename(&tmp, &self.path).map_err(|source| StorageError::Io {
            path: self.path.clone(),
            source,
        })?;
        debug!("wrote device registry {}", self.path.display());
        Ok(())
    }

    fn guard(&self) -> std::sync::MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl DeviceRegistry for FileDeviceRegistry {
    fn list(&self) -> Result<Vec<SavedDevice>, StorageError> {
        let _guard = self.guard();
        self.read()
    }

    fn save(&self, device: SavedDevice) -> Result<(), StorageError> {
        let _guard = self.guard();
        let mut devices = self.read()?;
        upsert(&mut devices, device);
        self.write(devices)
    }

    fn remove(&self, label: &str) -> Result<bool, StorageError> {
        let _guard = self.guard();
        let mut devices = self.read()?;
        let before = devices.len();
        devices.retain(|d| d.label != label);
        let removed = devices.len() != before;
        if removed {
            self.write(devices)?;
        }
        Ok(removed)
    }

    fn clear(&self) -> Result<(), StorageError> {
        let _guard = self.guard();
        // Overwrite without reading so a corrupt file can still be reset.
        self.write(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(label: &str, address: &str) -> SavedDevice {
        SavedDevice {
            label: label.to_string(),
            serial: "ABC123".to_string(),
            address: address.to_string(),
        }
    }

    fn temp_registry() -> (tempfile::TempDir, FileDeviceRegistry) {
        let dir = tempfile::tempdir().expect("tempdir");
        let registry = FileDeviceRegistry::new(dir.path().join("nested").join(REGISTRY_FILE_NAME));
        (dir, registry)
    }

    #[test]
    fn test_missing_file_lists_as_empty() {
        let (_dir, registry) = temp_registry();
        assert!(registry.list().unwrap().is_empty());
    }

    #[test]
    fn test_save_creates_parent_directories_and_file() {
        let (_dir, registry) = temp_registry();
        registry.save(device("a", "10.0.0.1:5555")).unwrap();
        assert!(registry.path().exists());
        assert!(!registry.path().with_extension("toml.tmp").exists());
    }

    #[test]
    fn test_saved_file_uses_array_of_tables_layout() {
        let (_dir, registry) = temp_registry();
        registry.save(device("Pixel 7 (ABC123)", "192.168.1.20:5555")).unwrap();

        let content = std::fs::read_to_string(registry.path()).unwrap();
        assert!(content.contains("[[devices]]"));
        assert!(content.contains("label = \"Pixel 7 (ABC123)\""));
        assert!(content.contains("address = \"192.168.1.20:5555\""));
    }

    #[test]
    fn test_corrupt_file_fails_loudly() {
        let (_dir, registry) = temp_registry();
        std::fs::create_dir_all(registry.path().parent().unwrap()).unwrap();
        std::fs::write(registry.path(), "[[[ not toml").unwrap();

        let result = registry.list();

        assert!(matches!(result, Err(StorageError::Parse { .. })));
    }

    #[test]
    fn test_save_on_corrupt_file_does_not_overwrite_it() {
        let (_dir, registry) = temp_registry();
        std::fs::create_dir_all(registry.path().parent().unwrap()).unwrap();
        std::fs::write(registry.path(), "devices = 7").unwrap();

        assert!(registry.save(device("a", "10.0.0.1:5555")).is_err());
        assert_eq!(std::fs::read_to_string(registry.path()).unwrap(), "devices = 7");
    }

    #[test]
    fn test_clear_resets_corrupt_file() {
        let (_dir, registry) = temp_registry();
        std::fs::create_dir_all(registry.path().parent().unwrap()).unwrap();
        std::fs::write(registry.path(), "garbage ===").unwrap();

        registry.clear().unwrap();

        assert!(registry.list().unwrap().is_empty());
    }

    #[test]
    fn test_remove_missing_label_leaves_file_untouched() {
        let (_dir, registry) = temp_registry();
        assert!(!registry.remove("a").unwrap());
        assert!(!registry.path().exists());
    }

    #[test]
    fn test_default_registry_path_ends_with_devices_toml() {
        // NoPlatformDataDir is acceptable in a stripped environment.
        if let Ok(path) = default_registry_path() {
            assert!(path.ends_with("adbwifi/devices.toml"), "got {path:?}");
        }
    }
}
