/// Size in bytes of a declaration id or reference id.
pub const ID_SIZE: usize = 8;

/// Size in bytes of an expression tag.
pub const TAG_SIZE: usize = 4;

/// Size in bytes of a blob length or list count.
pub const LENGTH_SIZE: usize = 8;

/// Blob payloads are zero-padded to a multiple of this many bytes.
pub const BLOB_ALIGNMENT: usize = 4;

/// Expression tag at the head of every encoded expression.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Tag {
    /// Inline blob: length, bytes, padding.
    Blob,
    /// Inline list: count, then that many expressions.
    List,
    /// Back-reference to an earlier declaration.
    Reference,
}

impl Tag {
    /// The on-wire tag value.
    pub const fn to_u32(self) -> u32 {
        match self {
            Self::Blob => 1,
            Self::List => 3,
            Self::Reference => 4,
        }
    }

    /// Parse an on-wire tag value.
    pub const fn from_u32(value: u32) -> Option<Self> {
        match value {
            1 => Some(Self::Blob),
            3 => Some(Self::List),
            4 => Some(Self::Reference),
            _ => None,
        }
    }

    /// Big-endian encoding of the tag.
    pub const fn to_be_bytes(self) -> [u8; TAG_SIZE] {
        self.to_u32().to_be_bytes()
    }
}

/// Number of zero bytes that follow a blob of `len` bytes.
pub const fn padding_len(len: usize) -> usize {
    (BLOB_ALIGNMENT - len % BLOB_ALIGNMENT) % BLOB_ALIGNMENT
}
