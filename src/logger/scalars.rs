use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use super::{format_value, LogSink, Record};
use crate::error::{Result, TycheError};

/// Key that carries the step of each record
pub const STEP_KEY: &str = "timestep";

/// Long-format scalar log (`step,tag,value,wall_time`), one row per metric.
#[derive(Debug)]
pub struct ScalarSink<W: Write = BufWriter<File>> {
    writer: W,
}

impl ScalarSink<BufWriter<File>> {
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        ScalarSink::new(BufWriter::new(File::create(path)?))
    }
}

impl<W: Write> ScalarSink<W> {
    /// Wrap `writer` and write the header
    pub fn new(mut writer: W) -> Result<Self> {
        writeln!(writer, "step,tag,value,wall_time")?;
        Ok(ScalarSink { writer })
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    /// Log one scalar
    pub fn add_scalar(&mut self, step: u64, tag: &str, value: f64) -> Result<()> {
        writeln!(self.writer, "{},{},{},{:.3}", step, tag, format_value(value), wall_time())?;
        Ok(())
    }
}

fn wall_time() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

fn step_of(record: &Record) -> Result<f64> {
    let step = record
        .get(STEP_KEY)
        .ok_or_else(|| TycheError::MissingMetric(STEP_KEY.to_string()))?;
    if !(step.is_finite() && step >= 0.0) {
        return Err(TycheError::invalid_parameter(STEP_KEY.to_string(), format!("invalid step {}", step)));
    }
    Ok(step)
}

impl<W: Write> LogSink for ScalarSink<W> {
    fn check(&self, record: &Record) -> Result<()> {
        step_of(record).map(|_| ())
    }

    fn write(&mut self, record: &Record) -> Result<()> {
        let step = step_of(record)?;

        for (tag, value) in record.iter().filter(|(k, _)| *k != STEP_KEY) {
            self.add_scalar(step as u64, tag, value)?;
        }
        self.writer.flush()?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
