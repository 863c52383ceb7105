use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("reference to undeclared id {id} at offset {offset}")]
    DanglingReference { id: u64, offset: usize },

    #[error("unsupported tag {tag} at offset {offset}")]
    UnsupportedTag { tag: u32, offset: usize },

    #[error("truncated input at offset {offset}: needed {needed} bytes, {available} available")]
    Truncated {
        offset: usize,
        needed: u64,
        available: usize,
    },

    #[error("declaration ids from {offset} overflow u64 for {count} declarations")]
    IdOverflow { offset: u64, count: usize },

    #[error("stream contains no declarations")]
    EmptyStream,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type CodecResult<T> = Result<T, CodecError>;
