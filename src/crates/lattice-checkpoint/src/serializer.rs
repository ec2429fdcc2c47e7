//! Pluggable serialization for checkpoint persistence.
//!
//! Savers that persist beyond process memory encode checkpoints through a
//! [`SerializerProtocol`] rather than hard-coding a format. [`JsonSerializer`]
//! is the default and the only format the file saver ships with; it keeps
//! stored documents inspectable with standard tools. [`BincodeSerializer`]
//! trades that for compactness where payloads avoid dynamic JSON values.

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Encoding strategy used by persistent savers.
pub trait SerializerProtocol: Send + Sync {
    /// Encode a value to bytes.
    fn dumps<T: Serialize>(&self, value: &T) -> Result<Vec<u8>>;

    /// Decode a value from bytes.
    fn loads<T: for<'de> Deserialize<'de>>(&self, data: &[u8]) -> Result<T>;

    /// Encode to an in-memory JSON value.
    fn dumps_json<T: Serialize>(&self, value: &T) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(value)?)
    }

    /// Decode from an in-memory JSON value.
    fn loads_json<T: for<'de> Deserialize<'de>>(&self, value: &serde_json::Value) -> Result<T> {
        Ok(serde_json::from_value(value.clone())?)
    }
}

/// UTF-8 JSON encoding. The default.
#[derive(Debug, Clone, Default)]
pub struct JsonSerializer;

impl JsonSerializer {
    pub fn new() -> Self {
        Self
    }
}

impl SerializerProtocol for JsonSerializer {
    fn dumps<T: Serialize>(&self, value: &T) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(value)?)
    }

    fn loads<T: for<'de> Deserialize<'de>>(&self, data: &[u8]) -> Result<T> {
        Ok(serde_json::from_slice(data)?)
    }
}

/// Compact binary encoding via bincode.
///
/// Bincode is not self-describing, so payloads containing untyped
/// `serde_json::Value` fields will not decode through it. Use it for typed
/// structures only.
#[derive(Debug, Clone, Default)]
pub struct BincodeSerializer;

impl BincodeSerializer {
    pub fn new() -> Self {
        Self
    }
}

impl SerializerProtocol for BincodeSerializer {
    fn dumps<T: Serialize>(&self, value: &T) -> Result<Vec<u8>> {
        Ok(bincode::serialize(value)?)
    }

    fn loads<T: for<'de> Deserialize<'de>>(&self, data: &[u8]) -> Result<T> {
        Ok(bincode::deserialize(data)?)
    }
}
