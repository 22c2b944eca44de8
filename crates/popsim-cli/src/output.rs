//! Step record writers.
//!
//! Both sinks write one line per step. [`CsvSink`] prefixes the stream with
//! a `#` banner carrying the run date and the column header; [`JsonLinesSink`]
//! writes one JSON object per line with snake-case field names.

use std::io::Write;

use chrono::{DateTime, Local};
use clap::ValueEnum;
use popsim_core::StepSink;
use popsim_types::StepStatistics;

/// Date layout of the CSV banner line.
const BANNER_DATE: &str = "%a %b %e %H:%M:%S %Z %Y";

/// Output encodings selectable on the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Comma-separated values with a banner and header line.
    #[default]
    Csv,
    /// One JSON object per line.
    Json,
}

/// Errors raised while writing records.
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// Writing to the destination failed.
    #[error("failed to write output: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// A record could not be encoded as JSON.
    #[error("failed to encode record: {source}")]
    Json {
        /// The underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

/// CSV writer.
pub struct CsvSink<W: Write> {
    writer: W,
}

impl<W: Write> CsvSink<W> {
    /// Write the banner and header, then return a sink for the records.
    pub fn new(mut writer: W, started: DateTime<Local>) -> Result<Self, OutputError> {
        writeln!(
            writer,
            "# population simulation run on {}",
            started.format(BANNER_DATE)
        )?;
        writeln!(writer, "{}", StepStatistics::HEADER)?;
        Ok(Self { writer })
    }

    /// Flush and hand back the destination.
    pub fn finish(mut self) -> Result<W, OutputError> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

impl<W: Write> StepSink for CsvSink<W> {
    type Error = OutputError;

    fn on_step(&mut self, stats: &StepStatistics) -> Result<(), Self::Error> {
        writeln!(self.writer, "{stats}")?;
        Ok(())
    }
}

/// JSON lines writer.
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    /// Wrap `writer`.
    pub const fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Flush and hand back the destination.
    pub fn finish(mut self) -> Result<W, OutputError> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

impl<W: Write> StepSink for JsonLinesSink<W> {
    type Error = OutputError;

    fn on_step(&mut self, stats: &StepStatistics) -> Result<(), Self::Error> {
        serde_json::to_writer(&mut self.writer, stats)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn record(time: u64) -> StepStatistics {
        StepStatistics {
            time,
            population_female: 10,
            population_male: 9,
            births_female: 1,
            deaths_male: 2,
            ..StepStatistics::default()
        }
    }

    #[test]
    fn csv_starts_with_banner_and_header() {
        let mut sink = CsvSink::new(Vec::new(), Local::now()).unwrap();
        sink.on_step(&record(1)).unwrap();
        sink.on_step(&record(2)).unwrap();
        let text = String::from_utf8(sink.finish().unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("# population simulation run on "));
        assert_eq!(lines[1], StepStatistics::HEADER);
        assert_eq!(lines[2], "1, 10, 9, 1, 0, 0, 2, 0, 0, 0, 0");
        assert!(lines[3].starts_with("2, "));
    }

    #[test]
    fn json_lines_round_trip() {
        let mut sink = JsonLinesSink::new(Vec::new());
        sink.on_step(&record(3)).unwrap();
        sink.on_step(&record(4)).unwrap();
        let text = String::from_utf8(sink.finish().unwrap()).unwrap();
        let parsed: Vec<StepStatistics> = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(parsed, vec![record(3), record(4)]);
        assert!(text.contains("\"population_female\":10"));
    }

    #[test]
    fn csv_is_the_default_format() {
        assert_eq!(OutputFormat::default(), OutputFormat::Csv);
    }
}
