//! Row structure: a record with a unique integer id plus named fields.

use crate::value::Value;
use alloc::collections::BTreeMap;
use alloc::string::String;

/// Unique identifier for a row within a table. Matches the row store's
/// signed 64-bit rowid type.
pub type RowId = i64;

/// Sentinel for rows that have not been assigned an id by the row store yet
/// (e.g. a row about to be inserted). The store's ids start at 1.
pub const UNASSIGNED_ROW_ID: RowId = 0;

/// A row in a table: a unique integer `id` plus arbitrary named fields.
///
/// The id doubles as the `"id"` field so filters and SQL can reference it
/// by column name; `set_id`/`set` keep the two in sync. Field layout is
/// otherwise open; filters must tolerate rows that lack a column they
/// reference.
#[derive(Clone, Debug, PartialEq)]
pub struct Row {
    id: RowId,
    fields: BTreeMap<String, Value>,
}

impl Row {
    /// Creates a row with the given id and no other fields.
    pub fn new(id: RowId) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert("id".into(), Value::Int(id));
        Self { id, fields }
    }

    /// Creates a row that has not been assigned an id yet. The `"id"`
    /// field is absent until the store assigns one.
    pub fn unassigned() -> Self {
        Self {
            id: UNASSIGNED_ROW_ID,
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field insertion.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Returns the row id.
    #[inline]
    pub fn id(&self) -> RowId {
        self.id
    }

    /// Sets the row id (used after the store assigns one on insert).
    pub fn set_id(&mut self, id: RowId) {
        self.id = id;
        self.fields.insert("id".into(), Value::Int(id));
    }

    /// Returns true once the store has assigned an id.
    #[inline]
    pub fn is_assigned(&self) -> bool {
        self.id != UNASSIGNED_ROW_ID
    }

    /// Gets a field by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Sets a field by name. Setting `"id"` to an integer also updates the
    /// row id.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        if name == "id" {
            if let Value::Int(id) = value {
                self.id = id;
            }
        }
        self.fields.insert(name, value);
    }

    /// Removes a field by name, returning its previous value. The row id
    /// itself is untouched.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.fields.remove(name)
    }

    /// Returns true if the row carries the named field.
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Iterates fields in name order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the number of fields.
    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the row has no fields.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
