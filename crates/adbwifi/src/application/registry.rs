//! DeviceRegistry: the persisted list of saved devices.
//!
//! The registry is the only state that outlives a single operation.  It maps
//! a device label to the network address the device was last reached at.
//!
//! # Upsert policy
//!
//! `save` replaces an existing entry in place (keeping its position) and
//! appends anything new.  An entry is the same device when its label matches,
//! or when both carry the same non-empty serial.  The serial rule covers a
//! device whose label changed between cycles (model lookup failed once), so
//! repeated USB connect cycles never produce duplicate entries.

use std::path::PathBuf;
use std::sync::Mutex;

use adbwifi_core::SavedDevice;
use thiserror::Error;

/// Error type for registry storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The platform data directory could not be determined.
    #[error("could not determine platform data directory")]
    NoPlatformDataDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing device registry at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The registry file exists but is not a valid device list.
    #[error("device registry at {path} is corrupt: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// The device list could not be serialized.
    #[error("failed to serialize device registry: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Durable store of saved devices, ordered by first insertion.
///
/// Implementations must serialise their own accesses: two concurrent `save`
/// calls may not lose either write.
pub trait DeviceRegistry: Send + Sync {
    /// Every saved device, re-read from storage.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the store cannot be read or is corrupt.
    fn list(&self) -> Result<Vec<SavedDevice>, StorageError>;

    /// Inserts `device`, replacing any entry with the same label.
    fn save(&self, device: SavedDevice) -> Result<(), StorageError>;

    /// Removes the entry labelled `label`.  Returns whether it existed.
    fn remove(&self, label: &str) -> Result<bool, StorageError>;

    /// Removes every entry.
    fn clear(&self) -> Result<(), StorageError>;

    /// Looks up a single entry by label.
    fn find(&self, label: &str) -> Result<Option<SavedDevice>, StorageError> {
        Ok(self.list()?.into_iter().find(|d| d.label == label))
    }
}

fn same_device(existing: &SavedDevice, device: &SavedDevice) -> bool {
    existing.label == device.label
        || (!device.serial.is_empty() && existing.serial == device.serial)
}

/// Applies the upsert policy to an in-memory list.
///
/// The first matching entry is replaced; any later matches are dropped.
pub fn upsert(devices: &mut Vec<SavedDevice>, device: SavedDevice) {
    let Some(index) = devices.iter().position(|d| same_device(d, &device)) else {
        devices.push(device);
        return;
    };

    let mut position = 0;
    devices.retain(|d| {
        let keep = position <= index || !same_device(d, &device);
        position += 1;
        keep
    });
    devices[index] = device;
}

/// Non-persistent registry used where no file should be touched.
#[derive(Default)]
pub struct MemoryDeviceRegistry {
    devices: Mutex<Vec<SavedDevice>>,
}

impl MemoryDeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry pre-populated with `devices`, in order.
    pub fn with_devices(devices: impl IntoIterator<Item = SavedDevice>) -> Self {
        let registry = Self::new();
        for device in devices {
            upsert(&mut registry.lock(), device);
        }
        registry
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<SavedDevice>> {
        // A panic while holding the lock cannot leave the Vec half-written.
        self.devices.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl DeviceRegistry for MemoryDeviceRegistry {
    fn list(&self) -> Result<Vec<SavedDevice>, StorageError> {
        Ok(self.lock().clone())
    }

    fn save(&self, device: SavedDevice) -> Result<(), StorageError> {
        upsert(&mut self.lock(), device);
        Ok(())
    }

    fn remove(&self, label: &str) -> Result<bool, StorageError> {
        let mut devices = self.lock();
        let before = devices.len();
        devices.retain(|d| d.label != label);
        Ok(devices.len() != before)
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.lock().clear();
        Ok(())
    }
}
