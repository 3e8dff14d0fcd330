use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Error, Result};

/// Deserialize `T` from a JSON string.
pub fn from_json<T: DeserializeOwned>(input: &str) -> Result<T> {
    sonic_rs::from_str(input).map_err(|err| Error::invalid_version("<json>", err.to_string()))
}

/// Deserialize `T` from raw JSON bytes.
pub fn from_json_slice<T: DeserializeOwned>(input: &[u8]) -> Result<T> {
    sonic_rs::from_slice(input).map_err(|err| Error::invalid_version("<json>", err.to_string()))
}

/// Serialize `T` to a compact JSON string.
pub fn to_json<T: Serialize>(value: &T) -> Result<String> {
    sonic_rs::to_string(value).map_err(|err| Error::invalid_version("<json>", err.to_string()))
}

/// Serialize `T` to a pretty-printed JSON string.
pub fn to_json_pretty<T: Serialize>(value: &T) -> Result<String> {
    sonic_rs::to_string_pretty(value)
        .map_err(|err| Error::invalid_version("<json>", err.to_string()))
}
