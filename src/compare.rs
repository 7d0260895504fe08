use serde_json::Value;
use std::{fmt, fs, io, path::Path};
use tracing::debug;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error("File {0} not found")]
    FileNotFound(String),

    #[error("Parsing error in {path}: {message}")]
    ParsingError { path: String, message: String },

    #[error("Unknown error occurred: {0}")]
    Unknown(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return match self {
            Verdict::Pass => write!(f, "PASS"),
            Verdict::Fail => write!(f, "FAIL"),
        };
    }
}

/// Compares two JSON documents by value. Key order and formatting do not
/// matter; no diff is produced.
pub fn compare(left: &Path, right: &Path) -> Result<Verdict, Error> {
    let left_document = load(left)?;
    let right_document = load(right)?;

    let verdict = if left_document == right_document {
        Verdict::Pass
    } else {
        Verdict::Fail
    };
    debug!(
        "compared {} with {}: {}",
        left.display(),
        right.display(),
        verdict
    );

    return Ok(verdict);
}

fn load(path: &Path) -> Result<Value, Error> {
    let contents = match fs::read_to_string(path) {
        Ok(raw_contents) => Ok(raw_contents),
        Err(error) => match error.kind() {
            io::ErrorKind::NotFound => Err(Error::FileNotFound(path.display().to_string())),
            _ => Err(Error::Unknown(error.to_string())),
        },
    }?;

    return match serde_json::from_str(&contents) {
        Ok(document) => Ok(document),
        Err(error) => Err(Error::ParsingError {
            path: path.display().to_string(),
            message: error.to_string(),
        }),
    };
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::{compare, Error, Verdict};
    use tempfile::tempdir;

    #[test]
    fn key_order_is_irrelevant() {
        let dir = tempdir().unwrap();
        let left = dir.path().join("left.json");
        let right = dir.path().join("right.json");
        fs::write(&left, r#"{"a":1,"b":2}"#).unwrap();
        fs::write(&right, "{\n    \"b\": 2,\n    \"a\": 1\n}").unwrap();

        assert_eq!(Verdict::Pass, compare(&left, &right).unwrap());
    }

    #[test]
    fn different_values_fail() {
        let dir = tempdir().unwrap();
        let left = dir.path().join("left.json");
        let right = dir.path().join("right.json");
        fs::write(&left, r#"{"a":1}"#).unwrap();
        fs::write(&right, r#"{"a":2}"#).unwrap();

        let verdict = compare(&left, &right).unwrap();
        assert_eq!(Verdict::Fail, verdict);
        assert_eq!("FAIL", verdict.to_string());
    }

    #[test]
    fn malformed_file_propagates_parsing_error() {
        let dir = tempdir().unwrap();
        let left = dir.path().join("left.json");
        let right = dir.path().join("right.json");
        fs::write(&left, r#"{"a":1}"#).unwrap();
        fs::write(&right, "{\"a\":").unwrap();

        match compare(&left, &right).err().unwrap() {
            Error::ParsingError { path, .. } => assert!(path.ends_with("right.json")),
            other => panic!("Expected `ParsingError` error, got {:?}", other),
        }
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempdir().unwrap();
        let left = dir.path().join("left.json");
        fs::write(&left, r#"{"a":1}"#).unwrap();

        let result = compare(&left, &dir.path().join("absent.json"));
        assert_eq!(true, result.is_err());
        match result.err().unwrap() {
            Error::FileNotFound(_) => {}
            _ => panic!("Expected `FileNotFound` error"),
        }
    }
}
