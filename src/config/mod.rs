//! Configuration persistence primitives.
//!
//! touchmap stores calibration data and mapping profiles as INI files. The
//! [`IniFile`] store underneath is deliberately small: ordered sections of
//! ordered `key=value` pairs, so that a loaded file saves back byte-for-byte
//! identical modulo whitespace, including keys this version of the tool does
//! not understand.

mod ini;

pub use ini::IniFile;

use thiserror::Error;

/// Result type for configuration file operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Configuration store error types.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File could not be read or written.
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),
}
