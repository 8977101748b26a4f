//! Metric logging for training runs.
//!
//! A [`Logger`] fans every [`Record`] out to its sinks. Sinks write into the
//! run's log directory:
//!
//! - `csv` writes `train.csv`, one column per metric
//! - `stdout` prints an aligned table and mirrors it to `train.log`
//! - `scalars` writes `scalars.csv` as `step,tag,value,wall_time` rows for
//!   time-series viewers
//!
//! The `csv` and `stdout` sinks fix their columns from the first record they
//! see and afterwards reject unknown keys or keys in a different position.
//! The `scalars` sink accepts any key but needs a `timestep` entry. A
//! [`Logger`] checks a record against every sink before writing it anywhere,
//! so a rejected record leaves all files untouched.

use std::fmt;
use std::fs::create_dir_all;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TycheError};

mod csv;
mod scalars;
mod stdout;

pub use self::csv::CsvSink;
pub use self::scalars::ScalarSink;
pub use self::stdout::StdoutSink;

/// Named scalar metrics for one logging step, kept in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    entries: Vec<(String, f64)>,
}

impl Record {
    pub fn new() -> Self {
        Record::default()
    }

    /// Append an entry, builder style
    pub fn with(mut self, key: impl Into<String>, value: f64) -> Self {
        self.push(key, value);
        self
    }

    /// Append an entry, replacing the value if `key` is already present
    pub fn push(&mut self, key: impl Into<String>, value: f64) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.entries.iter().find(|(k, _)| k == key).map(|&(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Destination for metric records.
pub trait LogSink {
    /// Whether `record` would be accepted by [`LogSink::write`], without writing
    fn check(&self, record: &Record) -> Result<()> {
        let _ = record;
        Ok(())
    }

    fn write(&mut self, record: &Record) -> Result<()>;

    fn flush(&mut self) -> Result<()>;
}

/// Available sinks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Csv,
    Stdout,
    Scalars,
}

impl FromStr for LogFormat {
    type Err = TycheError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "csv" => Ok(LogFormat::Csv),
            "stdout" => Ok(LogFormat::Stdout),
            "scalars" => Ok(LogFormat::Scalars),
            other => Err(TycheError::UnknownLogFormat(other.to_string())),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogFormat::Csv => "csv",
            LogFormat::Stdout => "stdout",
            LogFormat::Scalars => "scalars",
        };
        f.write_str(name)
    }
}

/// Fan-out over a set of sinks
pub struct Logger {
    dir: Option<PathBuf>,
    sinks: Vec<Box<dyn LogSink>>,
}

impl Logger {
    /// Open one sink per format inside `dir`, creating the directory
    pub fn new(dir: impl AsRef<Path>, formats: &[LogFormat]) -> Result<Self> {
        let dir = dir.as_ref();
        create_dir_all(dir)?;

        let mut sinks: Vec<Box<dyn LogSink>> = Vec::with_capacity(formats.len());
        for format in formats {
            let sink: Box<dyn LogSink> = match format {
                LogFormat::Csv => Box::new(CsvSink::create(dir.join("train.csv"))?),
                LogFormat::Stdout => Box::new(StdoutSink::create(dir.join("train.log"))?),
                LogFormat::Scalars => Box::new(ScalarSink::create(dir.join("scalars.csv"))?),
            };
            sinks.push(sink);
        }

        Ok(Logger {
            dir: Some(dir.to_path_buf()),
            sinks,
        })
    }

    /// Like [`Logger::new`] with formats given by name
    pub fn from_names<S: AsRef<str>>(dir: impl AsRef<Path>, names: &[S]) -> Result<Self> {
        let formats = names
            .iter()
            .map(|name| name.as_ref().parse())
            .collect::<Result<Vec<LogFormat>>>()?;
        Logger::new(dir, &formats)
    }

    /// A logger over caller-supplied sinks
    pub fn from_sinks(sinks: Vec<Box<dyn LogSink>>) -> Self {
        Logger { dir: None, sinks }
    }

    /// A logger that drops everything
    pub fn disabled() -> Self {
        Logger::from_sinks(Vec::new())
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// Write `record` to every sink, or to none if any sink rejects it
    pub fn write(&mut self, record: &Record) -> Result<()> {
        for sink in &self.sinks {
            sink.check(record)?;
        }
        for sink in &mut self.sinks {
            sink.write(record)?;
        }
        Ok(())
    }

    /// Flush every sink
    pub fn close(&mut self) -> Result<()> {
        for sink in &mut self.sinks {
            sink.flush()?;
        }
        Ok(())
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("dir", &self.dir)
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

/// Every key of `record` must be registered in `columns` at the same position.
pub(crate) fn check_columns<'a>(columns: impl IntoIterator<Item = &'a str>, record: &Record) -> Result<()> {
    let columns: Vec<&str> = columns.into_iter().collect();
    for (position, key) in record.keys().enumerate() {
        match columns.iter().position(|c| *c == key) {
            None => return Err(TycheError::UnregisteredMetric(key.to_string())),
            Some(expected) if expected != position => {
                return Err(TycheError::MetricOrder {
                    key: key.to_string(),
                    expected,
                    actual: position,
                })
            }
            Some(_) => {}
        }
    }
    Ok(())
}

/// Integers print without a fractional part, everything else with six digits
pub(crate) fn format_value(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{:.6}", value)
    }
}
