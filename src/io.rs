//! Flat-file boundary: iteration logs and rating triples.
//!
//! Everything is tab-separated text without quoting. Iteration logs start
//! with a header naming the metrics, then hold one row per iteration:
//! `iteration uidx iidx <metric values...> elapsed_ms`.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use tracing::warn;

use crate::error::{Result, SimError};
use crate::simulation::IterationRecord;

fn reader_builder() -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .quoting(false);
    builder
}

/// Writes iteration logs.
pub struct IterationLogWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl IterationLogWriter<File> {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(File::create(path)?))
    }
}

impl<W: Write> IterationLogWriter<W> {
    pub fn new(inner: W) -> Self {
        let writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .flexible(true)
            .quote_style(csv::QuoteStyle::Never)
            .from_writer(inner);
        Self { writer }
    }

    pub fn write_header<'a, I>(&mut self, metric_names: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut header = vec!["iteration", "uidx", "iidx"];
        header.extend(metric_names);
        header.push("elapsed_ms");
        self.writer.write_record(&header)?;
        Ok(())
    }

    pub fn write(&mut self, record: &IterationRecord) -> Result<()> {
        let mut row = Vec::with_capacity(record.metrics.len() + 4);
        row.push(record.iteration.to_string());
        row.push(record.uidx.to_string());
        row.push(record.iidx.to_string());
        row.extend(record.metrics.iter().map(f64::to_string));
        row.push(record.elapsed_ms.to_string());
        self.writer.write_record(&row)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Flushes and hands back the underlying writer.
    pub fn close(mut self) -> Result<W> {
        self.writer.flush()?;
        self.writer.into_inner().map_err(|err| {
            SimError::Io(std::io::Error::new(err.error().kind(), err.to_string()))
        })
    }
}

/// A `(uidx, iidx, timestamp)` triple recovered from an iteration log.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoggedPair {
    pub uidx: usize,
    pub iidx: usize,
    pub timestamp: u128,
}

/// Reads back the pairs of an iteration log for resuming.
///
/// The header fixes the number of columns. Reading stops at the first row
/// with a different length or an unparsable field; every well-formed row
/// before it is returned.
pub fn read_iteration_log<R: Read>(reader: R) -> Vec<LoggedPair> {
    let mut pairs = Vec::new();
    let mut records = reader_builder().from_reader(reader).into_records();
    let width = match records.next() {
        Some(Ok(header)) if header.len() >= 4 => header.len(),
        _ => {
            warn!("iteration log has no usable header, nothing to resume");
            return pairs;
        }
    };
    for (line, result) in records.enumerate() {
        let parsed = result.ok().filter(|row| row.len() == width).and_then(|row| {
            Some(LoggedPair {
                uidx: row.get(1)?.parse().ok()?,
                iidx: row.get(2)?.parse().ok()?,
                timestamp: row.get(width - 1)?.parse().ok()?,
            })
        });
        match parsed {
            Some(pair) => pairs.push(pair),
            None => {
                warn!(line = line + 2, kept = pairs.len(), "malformed log row, stopping resume");
                break;
            }
        }
    }
    pairs
}

/// Reads an iteration log from disk; a missing file yields no pairs.
pub fn read_iteration_log_file<P: AsRef<Path>>(path: P) -> Result<Vec<LoggedPair>> {
    match File::open(path) {
        Ok(file) => Ok(read_iteration_log(file)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(err) => Err(err.into()),
    }
}

/// Loads `user<TAB>item<TAB>value` triples.
///
/// A missing value column counts as 1 (implicit feedback).
pub fn load_triples<R: Read>(reader: R) -> Result<Vec<(String, String, f64)>> {
    let mut triples = Vec::new();
    for (line, result) in reader_builder().from_reader(reader).records().enumerate() {
        let row = result?;
        if row.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        let (Some(user), Some(item)) = (row.get(0), row.get(1)) else {
            return Err(SimError::invalid(format!("line {} has fewer than two columns", line + 1)));
        };
        let value = match row.get(2) {
            Some(raw) => raw.trim().parse::<f64>().map_err(|_| {
                SimError::invalid(format!("line {}: '{raw}' is not a number", line + 1))
            })?,
            None => 1.0,
        };
        triples.push((user.trim().to_string(), item.trim().to_string(), value));
    }
    Ok(triples)
}

pub fn load_triples_file<P: AsRef<Path>>(path: P) -> Result<Vec<(String, String, f64)>> {
    load_triples(File::open(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(iteration: usize, uidx: usize, iidx: usize, recall: f64) -> IterationRecord {
        IterationRecord {
            iteration,
            uidx,
            iidx,
            metrics: vec![recall],
            elapsed_ms: 3,
        }
    }

    #[test]
    fn test_write_and_resume_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("club.txt");

        let mut writer = IterationLogWriter::create(&path).unwrap();
        writer.write_header(["recall"]).unwrap();
        writer.write(&record(1, 0, 2, 0.0)).unwrap();
        writer.write(&record(2, 1, 0, 0.5)).unwrap();
        writer.close().unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("iteration\tuidx\tiidx\trecall\telapsed_ms"));
        assert_eq!(lines.next(), Some("1\t0\t2\t0\t3"));

        let pairs = read_iteration_log_file(&path).unwrap();
        assert_eq!(
            pairs,
            vec![
                LoggedPair { uidx: 0, iidx: 2, timestamp: 3 },
                LoggedPair { uidx: 1, iidx: 0, timestamp: 3 },
            ]
        );
        assert!(read_iteration_log_file(dir.path().join("missing.txt")).unwrap().is_empty());
    }

    #[test]
    fn test_resume_stops_at_malformed_row() {
        let log = "iteration\tuidx\tiidx\telapsed_ms\n1\t0\t1\t5\n2\t3\n3\t1\t1\t4\n";
        let pairs = read_iteration_log(log.as_bytes());
        assert_eq!(pairs, vec![LoggedPair { uidx: 0, iidx: 1, timestamp: 5 }]);

        let log = "iteration\tuidx\tiidx\telapsed_ms\n1\tx\t1\t5\n";
        assert!(read_iteration_log(log.as_bytes()).is_empty());

        // a row cut before its last column must not pass a metric off as time
        let log = "iteration\tuidx\tiidx\trecall\tgini\telapsed_ms\n\
                   1\t0\t1\t0.5\t0.1\t7\n\
                   2\t1\t2\t1\n\
                   3\t2\t0\t1\t0.2\t4\n";
        let pairs = read_iteration_log(log.as_bytes());
        assert_eq!(pairs, vec![LoggedPair { uidx: 0, iidx: 1, timestamp: 7 }]);

        assert!(read_iteration_log("".as_bytes()).is_empty());
    }

    #[test]
    fn test_load_triples() {
        let data = "u1\ti1\t4\nu2\ti1\n\nu2\ti3\t1.5\n";
        let triples = load_triples(data.as_bytes()).unwrap();
        assert_eq!(
            triples,
            vec![
                ("u1".to_string(), "i1".to_string(), 4.0),
                ("u2".to_string(), "i1".to_string(), 1.0),
                ("u2".to_string(), "i3".to_string(), 1.5),
            ]
        );

        let err = load_triples("u1\ti1\tfive\n".as_bytes()).unwrap_err();
        assert!(matches!(err, SimError::InvalidParameter { .. }));
        let err = load_triples("u1\n".as_bytes()).unwrap_err();
        assert!(matches!(err, SimError::InvalidParameter { .. }));
    }
}
