use std::collections::HashMap;

use bytes::Bytes;
use tracing::debug;
use vale_types::{Declaration, Value};

use crate::error::{CodecError, CodecResult};
use crate::tag::{padding_len, Tag, ID_SIZE, LENGTH_SIZE, TAG_SIZE};

/// Decode every declaration in `data`, in stream order.
pub fn decode_sequence(data: &[u8]) -> CodecResult<Vec<Declaration>> {
    Decoder::new().decode_fragment(data)
}

/// Decode `data` and return its root, the last declaration.
pub fn decode_root(data: &[u8]) -> CodecResult<Value> {
    decode_sequence(data)?
        .pop()
        .map(|declaration| declaration.value)
        .ok_or(CodecError::EmptyStream)
}

/// Stateful decoder whose id table outlives a single buffer.
///
/// Fragments produced by encoding several roots into one id space (each with
/// the previous call's `next_id` as offset) can be fed one after another;
/// references in later fragments resolve against declarations from earlier
/// ones.
#[derive(Debug, Default)]
pub struct Decoder {
    declarations: HashMap<u64, Value>,
    last: Option<Declaration>,
}

impl Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode all declarations in `data`, which must end on a declaration
    /// boundary. Declarations decoded before an error stay in the table.
    pub fn decode_fragment(&mut self, data: &[u8]) -> CodecResult<Vec<Declaration>> {
        let mut cursor = Cursor::new(data);
        let mut decoded = Vec::new();
        while !cursor.is_empty() {
            let id = cursor.read_u64()?;
            let value = decode_expression(&mut cursor, &self.declarations)?;
            self.declarations.insert(id, value.clone());
            let declaration = Declaration::new(id, value);
            self.last = Some(declaration.clone());
            decoded.push(declaration);
        }
        debug!(count = decoded.len(), bytes = data.len(), "decoded fragment");
        Ok(decoded)
    }

    /// Value of a declaration seen so far.
    pub fn resolve(&self, id: u64) -> Option<&Value> {
        self.declarations.get(&id)
    }

    /// The most recently decoded declaration.
    pub fn last(&self) -> Option<&Declaration> {
        self.last.as_ref()
    }

    /// Number of declarations in the table.
    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }
}

/// A list whose elements are still being decoded.
struct PendingList {
    remaining: u64,
    items: Vec<Value>,
}

fn decode_expression(cursor: &mut Cursor<'_>, declarations: &HashMap<u64, Value>) -> CodecResult<Value> {
    let mut pending: Vec<PendingList> = Vec::new();
    loop {
        let tag_offset = cursor.offset();
        let raw_tag = cursor.read_u32()?;
        let tag = Tag::from_u32(raw_tag).ok_or(CodecError::UnsupportedTag {
            tag: raw_tag,
            offset: tag_offset,
        })?;

        let mut completed = match tag {
            Tag::Blob => {
                let len = cursor.read_u64()?;
                let bytes = cursor.read_bytes(len)?;
                cursor.skip(padding_len(bytes.len()) as u64)?;
                Value::blob(Bytes::copy_from_slice(bytes))
            }
            Tag::Reference => {
                let id = cursor.read_u64()?;
                declarations
                    .get(&id)
                    .cloned()
                    .ok_or(CodecError::DanglingReference {
                        id,
                        offset: tag_offset,
                    })?
            }
            Tag::List => {
                let count = cursor.read_u64()?;
                if count > 0 {
                    // Every element takes at least a tag and an 8-byte field.
                    let bound = cursor.remaining() / (TAG_SIZE + ID_SIZE);
                    let capacity = usize::try_from(count).unwrap_or(usize::MAX).min(bound);
                    pending.push(PendingList {
                        remaining: count,
                        items: Vec::with_capacity(capacity),
                    });
                    continue;
                }
                Value::empty_list()
            }
        };

        loop {
            let Some(mut list) = pending.pop() else {
                return Ok(completed);
            };
            list.items.push(completed);
            list.remaining -= 1;
            if list.remaining > 0 {
                pending.push(list);
                break;
            }
            completed = Value::list(list.items);
        }
    }
}

/// Bounds-checked big-endian reader.
struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn offset(&self) -> usize {
        self.pos
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn read_bytes(&mut self, len: u64) -> CodecResult<&'a [u8]> {
        let available = self.remaining();
        let n = usize::try_from(len)
            .ok()
            .filter(|n| *n <= available)
            .ok_or(CodecError::Truncated {
                offset: self.pos,
                needed: len,
                available,
            })?;
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn skip(&mut self, len: u64) -> CodecResult<()> {
        self.read_bytes(len).map(|_| ())
    }

    fn read_u32(&mut self) -> CodecResult<u32> {
        let mut buf = [0u8; TAG_SIZE];
        buf.copy_from_slice(self.read_bytes(TAG_SIZE as u64)?);
        Ok(u32::from_be_bytes(buf))
    }

    fn read_u64(&mut self) -> CodecResult<u64> {
        let mut buf = [0u8; LENGTH_SIZE];
        buf.copy_from_slice(self.read_bytes(LENGTH_SIZE as u64)?);
        Ok(u64::from_be_bytes(buf))
    }
}
