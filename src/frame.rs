//! In-memory table shared by every pipeline stage.
//!
//! A [`Table`] is an ordered list of column names plus rows of optional
//! [`Value`] cells. Every row has exactly one cell per column; `None` marks a
//! missing value. Stages never mutate a table in place, they build a new one.

use serde::{
    Serialize, Serializer,
    ser::{SerializeMap, SerializeSeq},
};

use crate::data::Value;

pub type Row = Vec<Option<Value>>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    /// Builds a table, padding short rows with missing cells and truncating
    /// long ones so every row matches the header width.
    pub fn new(headers: Vec<String>, rows: Vec<Row>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, None);
                row
            })
            .collect();
        Self { headers, rows }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a table from raw text fields. Empty fields become missing.
    pub fn from_text(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let rows = rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|field| {
                        let trimmed = field.trim();
                        (!trimmed.is_empty()).then(|| Value::Text(trimmed.to_string()))
                    })
                    .collect()
            })
            .collect();
        Self::new(headers, rows)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// A table with no rows or no columns carries no data.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.headers.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Iterates the cells of one column, or `None` when the column is absent.
    pub fn column<'a>(
        &'a self,
        name: &str,
    ) -> Option<impl Iterator<Item = Option<&'a Value>> + use<'a>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(move |row| row[idx].as_ref()))
    }

    /// Numeric cells of one column; missing and textual cells are skipped.
    pub fn numbers(&self, name: &str) -> Vec<f64> {
        self.column(name)
            .map(|cells| cells.flatten().filter_map(Value::as_number).collect())
            .unwrap_or_default()
    }

    pub fn cell<'a>(&self, row: &'a Row, name: &str) -> Option<&'a Value> {
        self.column_index(name).and_then(|idx| row[idx].as_ref())
    }

    /// New table with the same headers holding the rows at `indices`, in the
    /// order given.
    pub fn take(&self, indices: &[usize]) -> Table {
        Table {
            headers: self.headers.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }

    pub fn with_headers(&self, headers: Vec<String>) -> Table {
        Table::new(headers, self.rows.clone())
    }

    pub fn map_column<F>(&self, name: &str, mut f: F) -> Table
    where
        F: FnMut(Option<&Value>) -> Option<Value>,
    {
        let Some(idx) = self.column_index(name) else {
            return self.clone();
        };
        let rows = self
            .rows
            .iter()
            .map(|row| {
                let mut row = row.clone();
                row[idx] = f(row[idx].as_ref());
                row
            })
            .collect();
        Table {
            headers: self.headers.clone(),
            rows,
        }
    }
}

/// Serializes as a list of records keyed by column name.
impl Serialize for Table {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.rows.len()))?;
        for row in &self.rows {
            seq.serialize_element(&Record {
                headers: &self.headers,
                row,
            })?;
        }
        seq.end()
    }
}

struct Record<'a> {
    headers: &'a [String],
    row: &'a Row,
}

impl Serialize for Record<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.headers.len()))?;
        for (header, cell) in self.headers.iter().zip(self.row) {
            map.serialize_entry(header, cell)?;
        }
        map.end()
    }
}
