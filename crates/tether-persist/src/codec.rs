use std::error::Error as StdError;
use std::fmt;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Failure to turn a value into its stored form or back.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct CodecError {
    message: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl CodecError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl Into<Box<dyn StdError + Send + Sync>>,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

impl From<serde_json::Error> for CodecError {
    fn from(e: serde_json::Error) -> Self {
        Self::with_source(e.to_string(), e)
    }
}

/// Serialize/deserialize pair between `T` and a stored string.
pub trait Codec<T> {
    fn encode(&self, value: &T) -> Result<String, CodecError>;
    fn decode(&self, raw: &str) -> Result<T, CodecError>;
}

/// The default pair: a serde_json round trip.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonCodec;

impl<T: Serialize + DeserializeOwned> Codec<T> for JsonCodec {
    fn encode(&self, value: &T) -> Result<String, CodecError> {
        Ok(serde_json::to_string(value)?)
    }

    fn decode(&self, raw: &str) -> Result<T, CodecError> {
        Ok(serde_json::from_str(raw)?)
    }
}

type EncodeFn<T> = Box<dyn Fn(&T) -> Result<String, CodecError>>;
type DecodeFn<T> = Box<dyn Fn(&str) -> Result<T, CodecError>>;

/// A codec built from two closures, for types serde can't or shouldn't handle.
///
/// ```rust
/// use tether_persist::{Codec, CodecError, FnCodec};
///
/// let csv = FnCodec::new(
///     |v: &Vec<u32>| Ok(v.iter().map(u32::to_string).collect::<Vec<_>>().join(",")),
///     |raw| {
///         raw.split(',')
///             .map(|p| p.parse().map_err(|e| CodecError::with_source("bad number", e)))
///             .collect()
///     },
/// );
/// assert_eq!(csv.encode(&vec![1, 2, 3]).unwrap(), "1,2,3");
/// assert_eq!(csv.decode("4,5").unwrap(), vec![4, 5]);
/// ```
pub struct FnCodec<T> {
    encode: EncodeFn<T>,
    decode: DecodeFn<T>,
}

impl<T> FnCodec<T> {
    pub fn new(
        encode: impl Fn(&T) -> Result<String, CodecError> + 'static,
        decode: impl Fn(&str) -> Result<T, CodecError> + 'static,
    ) -> Self {
        Self {
            encode: Box::new(encode),
            decode: Box::new(decode),
        }
    }
}

impl<T> Codec<T> for FnCodec<T> {
    fn encode(&self, value: &T) -> Result<String, CodecError> {
        (self.encode)(value)
    }

    fn decode(&self, raw: &str) -> Result<T, CodecError> {
        (self.decode)(raw)
    }
}

impl<T> fmt::Debug for FnCodec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnCodec").finish_non_exhaustive()
    }
}
