//! Parsers for the bridge tool's text output.
//!
//! The bridge is an external program; everything it tells us arrives as
//! loosely formatted text on stdout.  These parsers are deliberately lenient
//! about whitespace and line endings (`\r\n` from Windows builds of the tool)
//! and strict about the shape of the values they extract.

pub mod address;
pub mod devices;
pub mod reply;
