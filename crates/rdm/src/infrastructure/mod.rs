//! Infrastructure layer: persistence of data sets

pub mod csv;

pub use csv::{load_csv, read_csv, save_csv, write_csv, write_table};
