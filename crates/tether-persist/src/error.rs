use tether_storage::StorageError;
use thiserror::Error;

use crate::CodecError;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("stored value at '{key}' could not be decoded: {source}")]
    Decode {
        key: String,
        #[source]
        source: CodecError,
    },

    #[error("value for '{key}' could not be encoded: {source}")]
    Encode {
        key: String,
        #[source]
        source: CodecError,
    },

    #[error("no storage provided to this composition; wrap it in `with_storage`")]
    NoStorage,
}
