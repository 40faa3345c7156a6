//! CSV persistence for data sets
//!
//! The header is the union of all columns in first-seen order. A row without
//! a column writes an empty cell, and empty cells are skipped on reading, so
//! ragged data sets survive a round trip.

use crate::domain::{DataSet, Record};
use crate::error::{RdmError, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

pub fn save_csv(data: &DataSet, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);
    write_csv(data, &mut writer)?;
    writer.flush()?;
    tracing::debug!(path = %path.display(), rows = data.len(), "saved data set");
    Ok(())
}

pub fn load_csv(path: impl AsRef<Path>) -> Result<DataSet> {
    read_csv(BufReader::new(File::open(path)?))
}

pub fn write_csv<W: Write>(data: &DataSet, writer: &mut W) -> Result<()> {
    let columns = data.columns();
    let rows = data.iter().map(|row| {
        columns
            .iter()
            .map(|c| row.get(c).map(|v| v.to_string()).unwrap_or_default())
            .collect::<Vec<_>>()
    });
    write_table(writer, &columns, rows)
}

/// Write a header and rows of preformatted cells
pub fn write_table<W, I>(writer: &mut W, header: &[String], rows: I) -> Result<()>
where
    W: Write,
    I: IntoIterator<Item = Vec<String>>,
{
    write_line(writer, header)?;
    for row in rows {
        write_line(writer, &row)?;
    }
    Ok(())
}

fn write_line<W: Write>(writer: &mut W, cells: &[String]) -> Result<()> {
    let line = cells.iter().map(|c| escape(c)).collect::<Vec<_>>().join(",");
    writeln!(writer, "{line}")?;
    Ok(())
}

fn escape(cell: &str) -> String {
    if cell.contains([',', '"', '\n']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

pub fn read_csv<R: BufRead>(reader: R) -> Result<DataSet> {
    let mut lines = reader.lines();
    let header = match lines.next() {
        Some(line) => split_line(&line?, 1)?,
        None => return Ok(DataSet::new()),
    };

    let mut data = DataSet::new();
    for (i, line) in lines.enumerate() {
        let line = line?;
        let number = i + 2;
        if line.trim().is_empty() {
            continue;
        }
        let cells = split_line(&line, number)?;
        if cells.len() != header.len() {
            return Err(RdmError::Csv {
                line: number,
                message: format!("expected {} cells, found {}", header.len(), cells.len()),
            });
        }

        let mut record = Record::with_capacity(header.len());
        for (name, cell) in header.iter().zip(cells) {
            let cell = cell.trim();
            if cell.is_empty() {
                continue;
            }
            let value = cell.parse::<f64>().map_err(|_| RdmError::Csv {
                line: number,
                message: format!("{name}: '{cell}' is not a number"),
            })?;
            record.insert(name.clone(), value);
        }
        data.push(record);
    }
    Ok(data)
}

/// Split one line, honouring double-quoted cells
fn split_line(line: &str, number: usize) -> Result<Vec<String>> {
    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match (c, quoted) {
            ('"', true) if chars.peek() == Some(&'"') => {
                cell.push('"');
                chars.next();
            }
            ('"', true) => quoted = false,
            ('"', false) if cell.is_empty() => quoted = true,
            (',', false) => cells.push(std::mem::take(&mut cell)),
            (c, _) => cell.push(c),
        }
    }
    if quoted {
        return Err(RdmError::Csv {
            line: number,
            message: "unterminated quote".to_string(),
        });
    }
    cells.push(cell);
    Ok(cells)
}
