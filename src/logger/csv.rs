use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use super::{check_columns, format_value, LogSink, Record};
use crate::error::Result;

/// One row per record, columns fixed by the first record.
#[derive(Debug)]
pub struct CsvSink<W: Write = BufWriter<File>> {
    writer: W,
    columns: Option<Vec<String>>,
}

impl CsvSink<BufWriter<File>> {
    /// Create (or truncate) the CSV file at `path`
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        Ok(CsvSink::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write> CsvSink<W> {
    pub fn new(writer: W) -> Self {
        CsvSink { writer, columns: None }
    }

    pub fn columns(&self) -> Option<&[String]> {
        self.columns.as_deref()
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }
}

impl<W: Write> LogSink for CsvSink<W> {
    fn check(&self, record: &Record) -> Result<()> {
        match &self.columns {
            Some(columns) => check_columns(columns.iter().map(String::as_str), record),
            None => Ok(()),
        }
    }

    fn write(&mut self, record: &Record) -> Result<()> {
        let columns = match &self.columns {
            Some(columns) => {
                check_columns(columns.iter().map(String::as_str), record)?;
                columns.len()
            }
            None => {
                let columns: Vec<String> = record.keys().map(str::to_string).collect();
                writeln!(self.writer, "{}", columns.join(","))?;
                let n = columns.len();
                self.columns = Some(columns);
                n
            }
        };

        // trailing columns missing from this record stay empty
        let mut cells: Vec<String> = record.iter().map(|(_, v)| format_value(v)).collect();
        cells.resize(columns, String::new());
        writeln!(self.writer, "{}", cells.join(","))?;
        self.writer.flush()?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
