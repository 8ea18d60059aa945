//! Record shaping: how an ordered list of decoded fields becomes a record.

use indexmap::IndexMap;

use super::models::Value;

/// The default record: field name to value, in schema order.
pub type Record = IndexMap<String, Value>;

/// Builds the user-visible record from the decoded fields of one row.
///
/// `fields` is always in descriptor order and covers every field of the
/// schema. Records must be `Clone` so a preloaded table can replay them.
///
/// Closures of type `Fn(Vec<(String, Value)>) -> R` implement this trait.
pub trait RecordFactory {
    type Record: Clone;

    fn build(&self, fields: Vec<(String, Value)>) -> Self::Record;
}

/// Zero-cost factory producing a [`Record`] (an ordered map).
#[derive(Debug, Clone, Copy, Default)]
pub struct MapFactory;

impl RecordFactory for MapFactory {
    type Record = Record;

    fn build(&self, fields: Vec<(String, Value)>) -> Self::Record {
        fields.into_iter().collect()
    }
}

/// Zero-cost factory that keeps the `(name, value)` pairs as they are.
#[derive(Debug, Clone, Copy, Default)]
pub struct PairsFactory;

impl RecordFactory for PairsFactory {
    type Record = Vec<(String, Value)>;

    fn build(&self, fields: Vec<(String, Value)>) -> Self::Record {
        fields
    }
}

impl<F, R> RecordFactory for F
where
    F: Fn(Vec<(String, Value)>) -> R,
    R: Clone,
{
    type Record = R;

    fn build(&self, fields: Vec<(String, Value)>) -> Self::Record {
        self(fields)
    }
}
