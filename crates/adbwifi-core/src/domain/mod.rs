//! Domain entities for adbwifi.
//!
//! Pure data types with no infrastructure dependencies.  Devices are carried
//! as structured records; the `"Model (serial) [saved]"` strings shown to
//! users are produced from these fields, never parsed back into them.

/// Saved devices, USB observations and connect targets.
pub mod device;
