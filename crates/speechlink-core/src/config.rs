//! Connection parameters and their validation rules.
//!
//! The same rules back the command-line arguments and the interactive
//! prompt, so a value rejected in one place is rejected in the other.

use thiserror::Error;

/// Default relay server port.
pub const DEFAULT_PORT: u16 = 6837;

/// Longest accepted host, matching the DNS name length limit.
pub const MAX_HOST_LENGTH: usize = 253;

/// Longest accepted connection key.
pub const MAX_KEY_LENGTH: usize = 256;

/// Errors produced by connection-parameter validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("host cannot be empty")]
    EmptyHost,
    #[error("host must be at most {MAX_HOST_LENGTH} characters")]
    HostTooLong,
    #[error("host must not contain spaces or control characters")]
    HostWhitespace,
    #[error("port must be between 1 and 65535")]
    PortOutOfRange,
    #[error("port is not a valid number")]
    PortNotANumber,
    #[error("connection key cannot be empty")]
    EmptyKey,
    #[error("connection key must be at most {MAX_KEY_LENGTH} characters")]
    KeyTooLong,
}

/// Validated parameters for one relay session.  Immutable after the session
/// starts; the supervisor reuses the same set across reconnect attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    pub host: String,
    pub port: u16,
    pub key: String,
    pub shortcut: Option<String>,
}

impl ConnectionParams {
    /// Trims and validates the individual fields, then assembles the set.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] encountered, checking host, then
    /// port, then key.
    pub fn new(
        host: &str,
        port: u16,
        key: &str,
        shortcut: Option<String>,
    ) -> Result<Self, ConfigError> {
        let host = host.trim();
        let key = key.trim();
        validate_host(host)?;
        validate_port(port)?;
        validate_key(key)?;
        Ok(Self { host: host.to_string(), port, key: key.to_string(), shortcut })
    }
}

/// Checks that a host is non-empty, within the DNS length limit, and free of
/// whitespace.
pub fn validate_host(host: &str) -> Result<(), ConfigError> {
    if host.is_empty() {
        return Err(ConfigError::EmptyHost);
    }
    if host.len() > MAX_HOST_LENGTH {
        return Err(ConfigError::HostTooLong);
    }
    if host.chars().any(|c| c.is_whitespace()) {
        return Err(ConfigError::HostWhitespace);
    }
    Ok(())
}

/// Checks that a port is in 1–65535.  The type excludes values above 65535;
/// zero is the one representable invalid value.
pub fn validate_port(port: u16) -> Result<(), ConfigError> {
    if port == 0 {
        return Err(ConfigError::PortOutOfRange);
    }
    Ok(())
}

/// Parses a port from user input, distinguishing non-numeric text from
/// out-of-range numbers so prompts can report the right problem.
pub fn parse_port(input: &str) -> Result<u16, ConfigError> {
    let n: u32 = input.trim().parse().map_err(|_| ConfigError::PortNotANumber)?;
    let port = u16::try_from(n).map_err(|_| ConfigError::PortOutOfRange)?;
    validate_port(port)?;
    Ok(port)
}

/// Checks that a connection key is non-empty and within the length limit.
pub fn validate_key(key: &str) -> Result<(), ConfigError> {
    if key.is_empty() {
        return Err(ConfigError::EmptyKey);
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(ConfigError::KeyTooLong);
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
