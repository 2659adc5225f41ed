//! The owned table returned to callers.
//!
//! A `DataFrame` holds its own copy of every column and value; nothing in it
//! refers back to the connection that produced it.

use crate::db::{ColumnInfo, QueryResult, Row, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum width for any column in text rendering.
const MAX_COLUMN_WIDTH: usize = 40;

/// Minimum width for any column in text rendering.
const MIN_COLUMN_WIDTH: usize = 4;

/// An in-memory table of query results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataFrame {
    columns: Vec<ColumnInfo>,
    rows: Vec<Row>,
}

impl DataFrame {
    /// Creates a frame from column metadata and rows.
    pub fn new(columns: Vec<ColumnInfo>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    /// Takes ownership of a driver result.
    pub fn materialize(result: QueryResult) -> Self {
        Self {
            columns: result.columns,
            rows: result.rows,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Returns `(rows, columns)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.row_count(), self.column_count())
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Returns every value of the first column named `name`.
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let index = self.columns.iter().position(|c| c.name == name)?;
        Some(self.rows.iter().filter_map(|row| row.get(index)).collect())
    }

    /// Returns the value at `row`, `col`.
    pub fn get(&self, row: usize, col: usize) -> Option<&Value> {
        self.rows.get(row)?.get(col)
    }

    /// Renders the frame as a JSON array of objects keyed by column name.
    pub fn to_json(&self) -> serde_json::Value {
        let records = self
            .rows
            .iter()
            .map(|row| {
                let record = self
                    .columns
                    .iter()
                    .zip(row)
                    .map(|(column, value)| (column.name.clone(), value.to_json()))
                    .collect::<serde_json::Map<_, _>>();
                serde_json::Value::Object(record)
            })
            .collect();
        serde_json::Value::Array(records)
    }

    /// Calculates the display width of each column.
    fn column_widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self
            .columns
            .iter()
            .map(|col| col.name.chars().count().max(MIN_COLUMN_WIDTH))
            .collect();

        for row in &self.rows {
            for (width, value) in widths.iter_mut().zip(row) {
                *width = (*width).max(value.to_display_string().chars().count());
            }
        }

        widths.iter().map(|&w| w.min(MAX_COLUMN_WIDTH)).collect()
    }
}

impl From<QueryResult> for DataFrame {
    fn from(result: QueryResult) -> Self {
        Self::materialize(result)
    }
}

/// Truncates a string to fit within the given width, adding ellipsis if needed.
fn truncate(s: &str, max_width: usize) -> String {
    if s.chars().count() <= max_width {
        s.to_string()
    } else if max_width <= 3 {
        s.chars().take(max_width).collect()
    } else {
        let head: String = s.chars().take(max_width - 3).collect();
        format!("{head}...")
    }
}

impl fmt::Display for DataFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.columns.is_empty() {
            return writeln!(f, "(empty result)");
        }

        let widths = self.column_widths();

        let header = self
            .columns
            .iter()
            .zip(&widths)
            .map(|(col, &w)| format!("{:<w$}", truncate(&col.name, w)))
            .collect::<Vec<_>>()
            .join(" | ");
        writeln!(f, "{}", header.trim_end())?;

        let separator = widths
            .iter()
            .map(|&w| "-".repeat(w))
            .collect::<Vec<_>>()
            .join("-+-");
        writeln!(f, "{separator}")?;

        for row in &self.rows {
            let line = row
                .iter()
                .zip(&widths)
                .map(|(value, &w)| format!("{:<w$}", truncate(&value.to_display_string(), w)))
                .collect::<Vec<_>>()
                .join(" | ");
            writeln!(f, "{}", line.trim_end())?;
        }

        let rows = self.row_count();
        writeln!(f, "({} row{})", rows, if rows == 1 { "" } else { "s" })
    }
}
