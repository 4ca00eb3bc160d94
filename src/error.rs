use std::fmt;
use std::io;

/// Crate-wide error type.
///
/// Variants:
/// - `Format`  — malformed source data (CSV row, IDX header, column counts)
/// - `Shape`   — width mismatch between layers, examples, or answers
/// - `Numeric` — NaN/Inf detected in a loss or an optimizer step
/// - `Config`  — invalid call ordering or hyperparameter (frozen model,
///               missing head, bad SGD percentage)
/// - `Io`      — file access during dataset load or checkpointing
#[derive(Debug)]
pub enum Error {
    Format(String),
    Shape(String),
    Numeric(String),
    Config(String),
    Io(io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Format(msg) => write!(f, "format error: {msg}"),
            Error::Shape(msg) => write!(f, "shape error: {msg}"),
            Error::Numeric(msg) => write!(f, "numeric instability: {msg}"),
            Error::Config(msg) => write!(f, "config error: {msg}"),
            Error::Io(err) => write!(f, "io error: {err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_the_message() {
        let err = Error::Format("row 3: expected 6 columns, got 4".into());
        assert_eq!(
            err.to_string(),
            "format error: row 3: expected 6 columns, got 4"
        );
    }

    #[test]
    fn io_errors_convert() {
        let err: Error = io::Error::new(io::ErrorKind::NotFound, "missing").into();
        assert!(matches!(err, Error::Io(_)));
    }
}
