use crate::value::Value;

/// A value bound to a stream-wide id.
///
/// Declarations are the append-only unit of the encoded stream. Ids are
/// assigned once, in increasing order, and a later declaration may refer to an
/// earlier one by id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Declaration {
    pub id: u64,
    pub value: Value,
}

impl Declaration {
    pub fn new(id: u64, value: Value) -> Self {
        Self { id, value }
    }
}
