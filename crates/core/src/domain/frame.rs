// Frame - CSV-shaped table of string cells
//
// Benchmark tables carry arbitrary extra columns (target metadata, chain ids,
// prediction bookkeeping) that must survive every merge and be written back
// out, so cells stay as strings and are parsed at the point of use.

use super::error::{DomainError, Result};
use std::collections::HashMap;

/// Cell values treated as missing (pandas' default NA markers)
const MISSING_MARKERS: [&str; 8] = ["", "nan", "NaN", "NA", "N/A", "None", "null", "<NA>"];

/// True if a cell holds no value
pub fn is_missing(cell: &str) -> bool {
    MISSING_MARKERS.contains(&cell.trim())
}

/// Ordered column -> value record, used to build output rows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    cells: Vec<(String, String)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a cell, replacing an existing column in place or appending a new one
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<String>) {
        let column = column.into();
        let value = value.into();
        match self.cells.iter_mut().find(|(c, _)| *c == column) {
            Some(cell) => cell.1 = value,
            None => self.cells.push((column, value)),
        }
    }

    /// Set an optional numeric cell; `None` becomes an empty cell
    pub fn set_opt_f64(&mut self, column: impl Into<String>, value: Option<f64>) {
        self.set(column, value.map(format_f64).unwrap_or_default());
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| v.as_str())
            .filter(|v| !is_missing(v))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cells.iter().map(|(c, v)| (c.as_str(), v.as_str()))
    }
}

/// Format a float the way it is written to result tables
pub fn format_f64(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else {
        value.to_string()
    }
}

/// In-memory table with ordered columns
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

/// Borrowed view of one frame row
#[derive(Debug, Clone, Copy)]
pub struct RowRef<'a> {
    frame: &'a Frame,
    index: usize,
}

impl<'a> RowRef<'a> {
    pub fn index(&self) -> usize {
        self.index
    }

    /// Cell value, `None` when the column is absent or the cell is missing
    pub fn get(&self, column: &str) -> Option<&'a str> {
        let idx = self.frame.column_index(column)?;
        let cell = self.frame.rows[self.index][idx].as_str();
        if is_missing(cell) {
            None
        } else {
            Some(cell)
        }
    }

    /// Cell parsed as a float; unparsable or NaN cells count as missing
    pub fn get_f64(&self, column: &str) -> Option<f64> {
        self.get(column)
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|v| !v.is_nan())
    }

    pub fn to_record(&self) -> Record {
        let mut record = Record::new();
        for (column, value) in self.frame.columns.iter().zip(&self.frame.rows[self.index]) {
            record.set(column.clone(), value.clone());
        }
        record
    }
}

impl Frame {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Build a frame from raw rows; every row must match the header width
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self> {
        if let Some((line, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != columns.len())
        {
            return Err(DomainError::ValidationError(format!(
                "row {} has {} cells, expected {}",
                line,
                row.len(),
                columns.len()
            )));
        }
        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn raw_rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.column_index(column).is_some()
    }

    pub fn row(&self, index: usize) -> Option<RowRef<'_>> {
        (index < self.rows.len()).then_some(RowRef { frame: self, index })
    }

    pub fn rows(&self) -> impl Iterator<Item = RowRef<'_>> {
        (0..self.rows.len()).map(move |index| RowRef { frame: self, index })
    }

    /// Append a record, growing the column set with any unseen columns
    pub fn push_record(&mut self, record: &Record) {
        for (column, _) in record.iter() {
            if !self.has_column(column) {
                self.columns.push(column.to_string());
                for row in &mut self.rows {
                    row.push(String::new());
                }
            }
        }
        let mut row = vec![String::new(); self.columns.len()];
        for (column, value) in record.iter() {
            if let Some(idx) = self.column_index(column) {
                row[idx] = value.to_string();
            }
        }
        self.rows.push(row);
    }

    /// Rename columns that exist; absent sources are ignored
    pub fn rename_columns(&mut self, renames: &[(&str, &str)]) {
        for (from, to) in renames {
            if let Some(idx) = self.column_index(from) {
                self.columns[idx] = to.to_string();
            }
        }
    }

    /// Keep rows matching the predicate
    pub fn filter<F>(&self, predicate: F) -> Frame
    where
        F: Fn(&RowRef<'_>) -> bool,
    {
        let rows = self
            .rows()
            .filter(|row| predicate(row))
            .map(|row| self.rows[row.index].clone())
            .collect();
        Frame {
            columns: self.columns.clone(),
            rows,
        }
    }

    /// Left join on a single key column
    ///
    /// Every left row survives. A left row matching N right rows is emitted
    /// N times; an unmatched row gets empty right-hand cells. Shared non-key
    /// columns are suffixed `_x` (left) and `_y` (right).
    pub fn left_join(&self, right: &Frame, key: &str) -> Result<Frame> {
        let left_key = self
            .column_index(key)
            .ok_or_else(|| DomainError::ValidationError(format!("left table has no '{}'", key)))?;
        let right_key = right
            .column_index(key)
            .ok_or_else(|| DomainError::ValidationError(format!("right table has no '{}'", key)))?;

        let right_value_cols: Vec<usize> =
            (0..right.columns.len()).filter(|i| *i != right_key).collect();

        let mut columns: Vec<String> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| {
                if i != left_key && right.has_column(c) {
                    format!("{}_x", c)
                } else {
                    c.clone()
                }
            })
            .collect();
        for &i in &right_value_cols {
            let c = &right.columns[i];
            if self.has_column(c) {
                columns.push(format!("{}_y", c));
            } else {
                columns.push(c.clone());
            }
        }

        let mut index: HashMap<&str, Vec<usize>> = HashMap::new();
        for (i, row) in right.rows.iter().enumerate() {
            let k = row[right_key].as_str();
            if !is_missing(k) {
                index.entry(k).or_default().push(i);
            }
        }

        let mut rows = Vec::with_capacity(self.rows.len());
        for row in &self.rows {
            let matches = index.get(row[left_key].as_str());
            match matches {
                Some(hits) => {
                    for &hit in hits {
                        let mut out = row.clone();
                        out.extend(right_value_cols.iter().map(|&i| right.rows[hit][i].clone()));
                        rows.push(out);
                    }
                }
                None => {
                    let mut out = row.clone();
                    out.extend(std::iter::repeat(String::new()).take(right_value_cols.len()));
                    rows.push(out);
                }
            }
        }

        Ok(Frame { columns, rows })
    }
}
