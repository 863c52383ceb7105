use std::collections::{HashMap, HashSet};
use std::io::Write;

use tracing::debug;
use vale_types::{Content, Value};

use crate::error::{CodecError, CodecResult};
use crate::tag::{padding_len, Tag, LENGTH_SIZE, TAG_SIZE};

const PADDING: [u8; 3] = [0; 3];

/// What an encoding call wrote.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EncodeSummary {
    /// Number of declarations written, including the root.
    pub declaration_count: usize,
    /// First id not used by this stream; pass it as the offset of the next
    /// stream to keep one shared id space. `None` once the stream used
    /// `u64::MAX`.
    pub next_id: Option<u64>,
}

/// Encode `root` into a new buffer, numbering declarations from 0.
pub fn encode(root: &Value) -> Vec<u8> {
    emit_stream(&declaration_order(root), 0)
}

/// Encode `root` into a new buffer, numbering declarations from `id_offset`.
///
/// Fails if the last declaration's id would exceed `u64::MAX`.
pub fn encode_with_offset(root: &Value, id_offset: u64) -> CodecResult<Vec<u8>> {
    let order = declaration_order(root);
    check_id_range(id_offset, order.len())?;
    Ok(emit_stream(&order, id_offset))
}

/// Encode `root` into `writer`, numbering declarations from `id_offset`.
///
/// Each declaration is written with a single `write_all` call. Nothing is
/// written if the ids would not fit in a `u64`.
pub fn encode_to<W: Write>(writer: &mut W, root: &Value, id_offset: u64) -> CodecResult<EncodeSummary> {
    let order = declaration_order(root);
    let declaration_count = order.len();
    check_id_range(id_offset, declaration_count)?;
    let mut table = HashMap::with_capacity(declaration_count);
    let mut buf = Vec::new();
    for (index, declaration) in order.into_iter().enumerate() {
        let id = id_offset + index as u64;
        buf.clear();
        emit_declaration(&mut buf, id, &declaration, &table);
        writer.write_all(&buf)?;
        table.insert(declaration, id);
    }
    Ok(EncodeSummary {
        declaration_count,
        next_id: id_offset.checked_add(declaration_count as u64),
    })
}

fn check_id_range(id_offset: u64, count: usize) -> CodecResult<()> {
    let last = (count as u64).saturating_sub(1);
    match id_offset.checked_add(last) {
        Some(_) => Ok(()),
        None => Err(CodecError::IdOverflow {
            offset: id_offset,
            count,
        }),
    }
}

/// Callers check the id range first.
fn emit_stream(order: &[Value], id_offset: u64) -> Vec<u8> {
    let mut out = Vec::new();
    let mut table = HashMap::with_capacity(order.len());
    for (index, declaration) in order.iter().enumerate() {
        let id = id_offset + index as u64;
        emit_declaration(&mut out, id, declaration, &table);
        table.insert(declaration.clone(), id);
    }
    out
}

/// Values reached through two or more edges from `root`, in declaration order:
/// blobs by ascending byte length, then lists by ascending node count. Ties are
/// broken by height, then by ascending digest bytes.
///
/// Node counts saturate, so two nested lists can report the same count; the
/// height tie-break keeps every child ahead of its parents regardless.
pub fn shared_values(root: &Value) -> Vec<Value> {
    let mut seen_once: HashSet<Value> = HashSet::new();
    let mut seen_twice: HashSet<Value> = HashSet::new();
    let mut stack = vec![root.clone()];

    while let Some(value) = stack.pop() {
        if seen_once.contains(&value) {
            seen_twice.insert(value);
            continue;
        }
        if let Content::List(items) = value.content() {
            stack.extend(items.iter().cloned());
        }
        seen_once.insert(value);
    }

    let (mut blobs, mut lists): (Vec<Value>, Vec<Value>) =
        seen_twice.into_iter().partition(Value::is_blob);
    blobs.sort_by_key(|v| (v.size(), v.hash()));
    lists.sort_by_key(|v| (v.size(), v.height(), v.hash()));

    debug!(
        distinct = seen_once.len(),
        shared_blobs = blobs.len(),
        shared_lists = lists.len(),
        "dedup pass complete"
    );

    blobs.extend(lists);
    blobs
}

/// Shared values followed by the root.
fn declaration_order(root: &Value) -> Vec<Value> {
    let mut order = shared_values(root);
    order.push(root.clone());
    order
}

fn emit_declaration(out: &mut Vec<u8>, id: u64, value: &Value, table: &HashMap<Value, u64>) {
    out.extend_from_slice(&id.to_be_bytes());
    // The declared value itself is not in the table yet, so its top level is
    // always written inline.
    emit_inline(out, value, table);
}

fn emit_inline(out: &mut Vec<u8>, value: &Value, table: &HashMap<Value, u64>) {
    emit_head(out, value);
    let Content::List(items) = value.content() else {
        return;
    };
    let mut stack: Vec<&Value> = items.iter().rev().collect();
    while let Some(item) = stack.pop() {
        if let Some(id) = table.get(item) {
            out.extend_from_slice(&Tag::Reference.to_be_bytes());
            out.extend_from_slice(&id.to_be_bytes());
            continue;
        }
        emit_head(out, item);
        if let Content::List(children) = item.content() {
            stack.extend(children.iter().rev());
        }
    }
}

/// Write a blob completely, or a list's tag and count.
fn emit_head(out: &mut Vec<u8>, value: &Value) {
    match value.content() {
        Content::Blob(bytes) => {
            out.reserve(TAG_SIZE + LENGTH_SIZE + bytes.len() + 3);
            out.extend_from_slice(&Tag::Blob.to_be_bytes());
            out.extend_from_slice(&(bytes.len() as u64).to_be_bytes());
            out.extend_from_slice(bytes);
            out.extend_from_slice(&PADDING[..padding_len(bytes.len())]);
        }
        Content::List(items) => {
            out.extend_from_slice(&Tag::List.to_be_bytes());
            out.extend_from_slice(&(items.len() as u64).to_be_bytes());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag::ID_SIZE;

    const DECLARATION_HEADER: usize = ID_SIZE + TAG_SIZE + LENGTH_SIZE;

    fn blob(s: &str) -> Value {
        Value::from_string(s)
    }

    #[test]
    fn empty_blob_encoding_is_exact() {
        let bytes = encode(&Value::empty_blob());
        let mut expected = vec![0u8; 8];
        expected.extend_from_slice(&[0, 0, 0, 1]);
        expected.extend_from_slice(&[0u8; 8]);
        assert_eq!(bytes, expected);
    }

    #[test]
    fn blob_encoding_is_padded() {
        let bytes = encode(&blob("abcde"));
        assert_eq!(bytes.len(), DECLARATION_HEADER + 5 + 3);
        assert_eq!(&bytes[20..25], b"abcde");
        assert_eq!(&bytes[25..], &[0, 0, 0]);
    }

    #[test]
    fn unshared_values_are_inlined() {
        let root = Value::list(vec![blob("a"), blob("b")]);
        assert!(shared_values(&root).is_empty());
        let bytes = encode(&root);
        // id + list head + two padded one-byte blobs
        assert_eq!(bytes.len(), ID_SIZE + 12 + 2 * (12 + 4));
        assert_eq!(&bytes[..8], &0u64.to_be_bytes());
    }

    #[test]
    fn repeated_blob_is_declared_once() {
        let root = Value::list(vec![blob("A"), blob("A"), blob("B")]);
        let shared = shared_values(&root);
        assert_eq!(shared, vec![blob("A")]);

        let bytes = encode(&root);
        let mut expected = Vec::new();
        // declaration 0: "A"
        expected.extend_from_slice(&0u64.to_be_bytes());
        expected.extend_from_slice(&[0, 0, 0, 1]);
        expected.extend_from_slice(&1u64.to_be_bytes());
        expected.extend_from_slice(&[b'A', 0, 0, 0]);
        // declaration 1: root list
        expected.extend_from_slice(&1u64.to_be_bytes());
        expected.extend_from_slice(&[0, 0, 0, 3]);
        expected.extend_from_slice(&3u64.to_be_bytes());
        for _ in 0..2 {
            expected.extend_from_slice(&[0, 0, 0, 4]);
            expected.extend_from_slice(&0u64.to_be_bytes());
        }
        expected.extend_from_slice(&[0, 0, 0, 1]);
        expected.extend_from_slice(&1u64.to_be_bytes());
        expected.extend_from_slice(&[b'B', 0, 0, 0]);
        assert_eq!(bytes, expected);
    }

    #[test]
    fn blobs_precede_lists_and_sort_by_size() {
        let small_list = Value::list(vec![blob("x")]);
        let big_list = Value::list(vec![blob("y"), blob("z"), Value::empty_list()]);
        let long_blob = blob("a much longer blob");
        let root = Value::list(vec![
            big_list.clone(),
            big_list.clone(),
            long_blob.clone(),
            long_blob.clone(),
            small_list.clone(),
            small_list.clone(),
            blob("s"),
            blob("s"),
        ]);
        let shared = shared_values(&root);
        assert_eq!(shared, vec![blob("s"), long_blob, small_list, big_list]);
    }

    #[test]
    fn ties_break_by_digest() {
        let (p, q) = (blob("p"), blob("q"));
        let root = Value::list(vec![p.clone(), q.clone(), q.clone(), p.clone()]);
        let shared = shared_values(&root);
        let mut expected = vec![p, q];
        expected.sort_by_key(Value::hash);
        assert_eq!(shared, expected);
    }

    #[test]
    fn nested_sharing_is_detected_once_per_value() {
        let leaf = blob("leaf");
        let mid = Value::list(vec![leaf.clone(), leaf.clone()]);
        let root = Value::list(vec![mid.clone(), mid.clone()]);
        assert_eq!(shared_values(&root), vec![leaf, mid]);
    }

    #[test]
    fn offset_shifts_every_id() {
        let root = Value::list(vec![blob("A"), blob("A")]);
        let bytes = encode_with_offset(&root, 100).unwrap();
        assert_eq!(&bytes[..8], &100u64.to_be_bytes());
        let root_decl = 8 + 12 + 4;
        assert_eq!(&bytes[root_decl..root_decl + 8], &101u64.to_be_bytes());
        // references carry the shifted id
        assert_eq!(&bytes[root_decl + 20..root_decl + 24], &[0, 0, 0, 4]);
        assert_eq!(&bytes[root_decl + 24..root_decl + 32], &100u64.to_be_bytes());
    }

    #[test]
    fn encode_to_matches_in_memory_encoding() {
        let shared = Value::list(vec![blob("q"), blob("r")]);
        let root = Value::list(vec![shared.clone(), shared, blob("t")]);
        let mut sink = Vec::new();
        let summary = encode_to(&mut sink, &root, 7).unwrap();
        assert_eq!(sink, encode_with_offset(&root, 7).unwrap());
        assert_eq!(summary.declaration_count, 2);
        assert_eq!(summary.next_id, Some(9));
    }

    #[test]
    fn last_id_may_be_u64_max() {
        let bytes = encode_with_offset(&blob("x"), u64::MAX).unwrap();
        assert_eq!(&bytes[..8], &u64::MAX.to_be_bytes());

        let root = Value::list(vec![blob("A"), blob("A")]);
        let mut sink = Vec::new();
        let summary = encode_to(&mut sink, &root, u64::MAX - 1).unwrap();
        assert_eq!(summary.declaration_count, 2);
        assert_eq!(summary.next_id, None);
    }

    #[test]
    fn ids_past_u64_max_are_rejected() {
        let root = Value::list(vec![blob("A"), blob("A")]);
        let err = encode_with_offset(&root, u64::MAX).unwrap_err();
        assert!(matches!(
            err,
            CodecError::IdOverflow {
                offset: u64::MAX,
                count: 2
            }
        ));

        let mut sink = Vec::new();
        assert!(encode_to(&mut sink, &root, u64::MAX).is_err());
        assert!(sink.is_empty());
    }

    #[test]
    fn sink_errors_propagate() {
        struct FailingSink;
        impl Write for FailingSink {
            fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::other("sink closed"))
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }
        let err = encode_to(&mut FailingSink, &blob("x"), 0).unwrap_err();
        assert!(matches!(err, CodecError::Io(_)));
    }
}
