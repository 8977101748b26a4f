use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use super::{check_columns, format_value, LogSink, Record};
use crate::error::Result;

const MIN_WIDTH: usize = 15;

/// Human readable table, printed to stdout and appended to a log file.
#[derive(Debug)]
pub struct StdoutSink<W: Write = BufWriter<File>> {
    log: W,
    echo: bool,
    columns: Option<Vec<(String, usize)>>,
}

impl StdoutSink<BufWriter<File>> {
    /// Echo to stdout and append to the file at `path`
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(StdoutSink::new(BufWriter::new(file), true))
    }
}

impl<W: Write> StdoutSink<W> {
    pub fn new(log: W, echo: bool) -> Self {
        StdoutSink { log, echo, columns: None }
    }

    pub fn get_ref(&self) -> &W {
        &self.log
    }

    fn emit(&mut self, line: &str) -> Result<()> {
        if self.echo {
            let mut out = io::stdout().lock();
            writeln!(out, "{}", line)?;
        }
        writeln!(self.log, "{}", line)?;
        Ok(())
    }
}

fn row<'a>(cells: impl Iterator<Item = (&'a str, usize)>) -> String {
    cells
        .map(|(cell, width)| format!("{:<width$}", cell, width = width))
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end()
        .to_string()
}

impl<W: Write> LogSink for StdoutSink<W> {
    fn check(&self, record: &Record) -> Result<()> {
        match &self.columns {
            Some(columns) => check_columns(columns.iter().map(|(k, _)| k.as_str()), record),
            None => Ok(()),
        }
    }

    fn write(&mut self, record: &Record) -> Result<()> {
        if self.columns.is_none() {
            let columns: Vec<(String, usize)> = record
                .keys()
                .map(|k| (k.to_string(), k.len().max(MIN_WIDTH)))
                .collect();
            let header = row(columns.iter().map(|(k, w)| (k.as_str(), *w)));
            self.columns = Some(columns);
            self.emit(&header)?;
        }

        self.check(record)?;
        let columns = self.columns.as_deref().unwrap_or_default();

        let values: Vec<(String, usize)> = columns
            .iter()
            .map(|(key, width)| (record.get(key).map(format_value).unwrap_or_default(), *width))
            .collect();
        let line = row(values.iter().map(|(v, w)| (v.as_str(), *w)));
        self.emit(&line)?;
        self.log.flush()?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.log.flush()?;
        Ok(())
    }
}
