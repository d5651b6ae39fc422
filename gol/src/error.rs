// error.rs - Error taxonomy shared by the engine, the RPC layer and the I/O actor

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GolError {
    /// Thread count or grid dimensions cannot be used for a run.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// A Calculate request whose band or grid is inconsistent.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The RPC service could not be reached or answered garbage.
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("i/o failure on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The image file was readable but is not a usable PGM for this run.
    #[error("bad image: {0}")]
    Image(String),

    /// A band worker panicked; the generation being written is unusable.
    #[error("step failed: {0}")]
    StepFailed(String),

    #[error("{0} channel closed")]
    ChannelClosed(&'static str),
}

pub type Result<T, E = GolError> = std::result::Result<T, E>;
