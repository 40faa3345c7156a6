//! Evaluated states of the world

use super::query::Query;
use crate::error::{RdmError, Result};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// Named values of one SOW, in insertion order
pub type Record = IndexMap<String, f64>;

/// Ordered collection of records
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataSet {
    rows: Vec<Record>,
}

/// Min, max and mean of one column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColumnSummary {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

impl DataSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<Record>) -> Self {
        Self { rows }
    }

    pub fn push(&mut self, record: Record) {
        self.rows.push(record);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Record> {
        self.rows
    }

    pub fn get(&self, index: usize) -> Option<&Record> {
        self.rows.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.rows.iter()
    }

    /// Union of column names in first-seen order
    pub fn columns(&self) -> Vec<String> {
        let mut names: IndexSet<&str> = IndexSet::new();
        for row in &self.rows {
            for key in row.keys() {
                names.insert(key);
            }
        }
        names.into_iter().map(str::to_string).collect()
    }

    /// All values of a column; every row must have it
    pub fn column(&self, name: &str) -> Result<Vec<f64>> {
        self.rows
            .iter()
            .map(|row| {
                row.get(name)
                    .copied()
                    .ok_or_else(|| RdmError::UnknownColumn(name.to_string()))
            })
            .collect()
    }

    /// `None` for an empty data set
    pub fn summary(&self, name: &str) -> Result<Option<ColumnSummary>> {
        let values = self.column(name)?;
        if values.is_empty() {
            return Ok(None);
        }
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        Ok(Some(ColumnSummary {
            count: values.len(),
            min,
            max,
            mean,
        }))
    }

    /// Rows matching a filter expression, e.g. `"NPV_invest > 0"`
    pub fn find(&self, expr: &str) -> Result<DataSet> {
        let query = self.compile(expr)?;
        let mut rows = Vec::new();
        for row in &self.rows {
            if query.matches(row)? {
                rows.push(row.clone());
            }
        }
        Ok(Self { rows })
    }

    /// Number of rows matching a filter expression
    pub fn count(&self, expr: &str) -> Result<usize> {
        let query = self.compile(expr)?;
        let mut n = 0;
        for row in &self.rows {
            if query.matches(row)? {
                n += 1;
            }
        }
        Ok(n)
    }

    /// Parse `expr` and reject columns this data set does not have, even
    /// when no row would reach the comparison
    fn compile(&self, expr: &str) -> Result<Query> {
        let query = Query::parse(expr)?;
        let known = self.columns();
        if let Some(name) = query.columns().into_iter().find(|c| !known.iter().any(|k| k == c)) {
            return Err(RdmError::UnknownColumn(name.to_string()));
        }
        Ok(query)
    }

    /// Rows for which the closure returns true
    pub fn filter<F>(&self, mut predicate: F) -> DataSet
    where
        F: FnMut(&Record) -> bool,
    {
        Self {
            rows: self.rows.iter().filter(|r| predicate(r)).cloned().collect(),
        }
    }

    /// Label every row by whether it matches `expr`
    pub fn apply(&self, expr: &str, if_true: &str, if_false: &str) -> Result<Vec<String>> {
        let query = self.compile(expr)?;
        self.rows
            .iter()
            .map(|row| {
                Ok(if query.matches(row)? {
                    if_true.to_string()
                } else {
                    if_false.to_string()
                })
            })
            .collect()
    }

    /// Set `values` on every row, overwriting existing entries
    pub fn update(&mut self, values: &Record) {
        for row in &mut self.rows {
            for (k, v) in values {
                row.insert(k.clone(), *v);
            }
        }
    }
}

impl<'a> IntoIterator for &'a DataSet {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

impl FromIterator<Record> for DataSet {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}
