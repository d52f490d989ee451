// error.rs — Loader and trace error types

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("couldn't open {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("bad BSP magic {found:?} (expected \"IBSP\")")]
    BadMagic { found: [u8; 4] },

    #[error("unsupported BSP version {found} (should be {expected})")]
    UnsupportedVersion { found: i32, expected: i32 },

    #[error("{what} runs past end of file: offset {offset}, length {len}, file size {file_len}")]
    TruncatedRead {
        what: &'static str,
        offset: i64,
        len: i64,
        file_len: usize,
    },

    #[error("{lump} record {index} references {field} {value} out of range")]
    BadIndex {
        lump: &'static str,
        index: usize,
        field: &'static str,
        value: i64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TraceError {
    #[error("invalid trace bounds: {reason}")]
    InvalidBoundsConfiguration { reason: &'static str },
}
