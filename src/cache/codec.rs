//! Value encoding at the facade boundary.
//!
//! The registry and the store only see bytes. Values are JSON so that dump
//! files stay readable and portable.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

pub(crate) fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

pub(crate) fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(serde_json::from_slice(bytes)?)
}
