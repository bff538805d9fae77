use std::{
    collections::HashMap,
    fmt,
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use logos::Logos;

mod error;

pub use error::{Error, LineError, ParseError};

/// Capacity of the buffered reader used by [`aggregate_file`].
pub const BUF_CAPACITY: usize = 1024 * 1024;

/// Decimal places printed for each value of a [`Report`] when the formatter
/// doesn't ask for a precision.
pub const DEFAULT_PRECISION: usize = 1;

#[derive(Logos, Debug, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")] // Whitespace around the reading is tolerated
enum Token {
    #[regex(r"[+-]?([0-9]+(\.[0-9]*)?|\.[0-9]+)")]
    Number,
}

/// Parse the reading field of a record. The field must hold exactly one
/// decimal number, so `nan`, `inf` and exponents are rejected even though
/// `f64::from_str` would take them. Numbers too large for an `f64` are
/// rejected too instead of becoming infinite.
fn parse_reading(field: &str) -> Option<f64> {
    let mut lexer = Token::lexer(field);
    let reading = match lexer.next() {
        Some(Ok(Token::Number)) => lexer
            .slice()
            .parse()
            .ok()
            .filter(|reading: &f64| reading.is_finite())?,
        _ => return None,
    };

    match lexer.next() {
        None => Some(reading),
        Some(_) => None,
    }
}

/// Running statistic of one station.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StationStat {
    pub min: f64,
    pub max: f64,
    pub sum: f64,
    pub count: u64,
}

impl StationStat {
    pub fn new(reading: f64) -> Self {
        Self {
            min: reading,
            max: reading,
            sum: reading,
            count: 1,
        }
    }

    pub fn add_reading(&mut self, reading: f64) {
        self.min = self.min.min(reading);
        self.max = self.max.max(reading);
        self.sum += reading;
        self.count += 1;
    }

    /// Fold the statistic of the same station computed over another part of
    /// the input.
    pub fn merge(&mut self, other: &Self) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
        self.sum += other.sum;
        self.count += other.count;
    }

    /// Mean of every reading folded in so far.
    ///
    /// Rounding in `sum` can push the quotient one ulp outside of the
    /// observed range, so it is clamped back into `min..=max`.
    pub fn mean(&self) -> f64 {
        (self.sum / self.count as f64).clamp(self.min, self.max)
    }
}

/// Per station statistics of one aggregation run.
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    stations: HashMap<String, StationStat>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a single `<station>;<temperature>` record into the statistics.
    /// Nothing is recorded when the line is rejected.
    pub fn ingest(&mut self, line: &str) -> Result<(), LineError> {
        let delimiter =
            memchr::memchr(b';', line.as_bytes()).ok_or(LineError::MissingDelimiter)?;
        let (name, field) = (&line[..delimiter], &line[delimiter + 1..]);
        if name.is_empty() {
            return Err(LineError::EmptyStation);
        }

        let reading = parse_reading(field).ok_or_else(|| {
            let reading = field.trim_end_matches(['\r', '\n']);
            LineError::InvalidReading {
                reading: reading.to_string(),
                span: delimiter + 1..delimiter + 1 + reading.len(),
            }
        })?;

        match self.stations.get_mut(name) {
            Some(stat) => stat.add_reading(reading),
            None => {
                log::trace!("new station `{name}`");
                self.stations.insert(name.to_string(), StationStat::new(reading));
            }
        }

        Ok(())
    }

    /// Fold the statistics gathered by another aggregator, typically over a
    /// different chunk of the same input, into this one.
    pub fn merge(&mut self, other: Aggregator) {
        for (name, stat) in other.stations {
            match self.stations.get_mut(&name) {
                Some(existing) => existing.merge(&stat),
                None => {
                    self.stations.insert(name, stat);
                }
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&StationStat> {
        self.stations.get(name)
    }

    /// Number of distinct stations seen.
    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    /// Build the sorted report. The statistics are left untouched, calling it
    /// twice gives the same report.
    pub fn finalize(&self) -> Report {
        let mut summaries: Vec<Summary> = self
            .stations
            .iter()
            .map(|(name, stat)| Summary {
                name: name.clone(),
                min: stat.min,
                mean: stat.mean(),
                max: stat.max,
            })
            .collect();
        summaries.sort_unstable_by(|left, right| left.name.cmp(&right.name));

        Report { summaries }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub name: String,
    pub min: f64,
    pub mean: f64,
    pub max: f64,
}

/// Final min/mean/max of every station, sorted by station name.
///
/// Displays as `{a=min/mean/max, b=min/mean/max}` with [`DEFAULT_PRECISION`]
/// decimal places, or with the precision of the formatter: `{:.3}`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Report {
    // Sorted by name, names are unique
    pub summaries: Vec<Summary>,
}

impl Report {
    pub fn is_empty(&self) -> bool {
        self.summaries.is_empty()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let precision = f.precision().unwrap_or(DEFAULT_PRECISION);

        f.write_str("{")?;
        for (i, summary) in self.summaries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(
                f,
                "{}={:.*}/{:.*}/{:.*}",
                summary.name,
                precision,
                summary.min,
                precision,
                summary.mean,
                precision,
                summary.max
            )?;
        }
        f.write_str("}")
    }
}

/// Read every record of `reader` in a single pass.
///
/// Empty lines are skipped. The first malformed record aborts the whole run,
/// `source` only names the input in the diagnostics.
pub fn aggregate(mut reader: impl BufRead, source: &Path) -> Result<Aggregator, Error> {
    log::debug!("reading records from `{}`", source.display());

    let mut aggregator = Aggregator::new();
    let mut buffer = Vec::new();
    let mut line_number = 0;

    loop {
        buffer.clear();
        let read = reader
            .read_until(b'\n', &mut buffer)
            .map_err(|source_error| Error::Io {
                path: source.to_path_buf(),
                source: source_error,
            })?;
        if read == 0 {
            break;
        }
        line_number += 1;

        let raw = buffer.strip_suffix(b"\n").unwrap_or(&buffer[..]);
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        if raw.is_empty() {
            continue;
        }

        let result = match std::str::from_utf8(raw) {
            Ok(line) => aggregator.ingest(line),
            Err(e) => Err(LineError::InvalidUtf8 {
                valid_up_to: e.valid_up_to(),
            }),
        };

        if let Err(kind) = result {
            let text = String::from_utf8_lossy(raw).into_owned();
            let name = source.display().to_string();
            return Err(ParseError::new(&name, line_number, text, kind).into());
        }
    }

    log::debug!(
        "ingested {line_number} lines into {} stations",
        aggregator.len()
    );

    Ok(aggregator)
}

/// Open `path` and [`aggregate`] it through a [`BUF_CAPACITY`] buffer.
pub fn aggregate_file(path: &Path) -> Result<Aggregator, Error> {
    let file = File::open(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;

    aggregate(BufReader::with_capacity(BUF_CAPACITY, file), path)
}
