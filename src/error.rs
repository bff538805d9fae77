use std::{io, ops::Range, path::PathBuf};

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Why a single record could not be ingested.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LineError {
    #[error("missing `;` delimiter")]
    MissingDelimiter,
    #[error("empty station name")]
    EmptyStation,
    #[error("invalid reading `{reading}`")]
    InvalidReading {
        reading: String,
        // Byte range of the reading inside the line
        span: Range<usize>,
    },
    #[error("line is not valid UTF-8")]
    InvalidUtf8 { valid_up_to: usize },
}

impl LineError {
    fn span(&self, line: &str) -> SourceSpan {
        match self {
            Self::MissingDelimiter => (0, line.len()).into(),
            Self::EmptyStation => (0, line.len().min(1)).into(),
            Self::InvalidReading { span, .. } => (span.start, span.len()).into(),
            // The lossy source shows the first bad byte as U+FFFD
            Self::InvalidUtf8 { valid_up_to } => (*valid_up_to, '\u{FFFD}'.len_utf8()).into(),
        }
    }
}

/// A malformed record, located by its line number in the input.
#[derive(Debug, Error, Diagnostic)]
#[error("malformed record on line {line}")]
#[diagnostic(
    code(station_stats::parse),
    help("every line must look like `<station>;<temperature>`")
)]
pub struct ParseError {
    pub line: usize,
    #[source]
    pub kind: LineError,
    #[source_code]
    src: NamedSource<String>,
    #[label("here")]
    span: SourceSpan,
}

impl ParseError {
    pub fn new(source_name: &str, line: usize, text: String, kind: LineError) -> Self {
        let span = kind.span(&text);
        Self {
            line,
            kind,
            src: NamedSource::new(format!("{source_name}:{line}"), text),
            span,
        }
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("missing input file argument")]
    #[diagnostic(
        code(station_stats::usage),
        help("usage: station-stats <measurements-file>")
    )]
    Usage,
    #[error("could not read `{}`", .path.display())]
    #[diagnostic(code(station_stats::io))]
    Io { path: PathBuf, source: io::Error },
    #[error("could not write the report")]
    #[diagnostic(code(station_stats::output))]
    Output(#[source] io::Error),
    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] ParseError),
}

impl Error {
    /// Process exit status, following the sysexits convention.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Usage => 64,
            Self::Parse(_) => 65,
            Self::Io { .. } | Self::Output(_) => 74,
        }
    }
}
