//! Common errors across the um-atmos crate
use std::{fmt::Display, path::{Path, PathBuf}};

/// Where in an input a problem was found.
///
/// Most readers take a path, but the parsing functions also accept plain text
/// (e.g. in tests), so the location can be either a file, optionally with a
/// 1-based line number, or a snippet of the offending text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileLocation {
    File { path: PathBuf, line: Option<usize> },
    Text(String),
}

impl FileLocation {
    pub fn with_line(self, line: usize) -> Self {
        match self {
            Self::File { path, .. } => Self::File { path, line: Some(line) },
            Self::Text(s) => Self::Text(format!("{s}, line {line}")),
        }
    }
}

impl Display for FileLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File { path, line: Some(line) } => write!(f, "{}, line {line}", path.display()),
            Self::File { path, line: None } => write!(f, "{}", path.display()),
            Self::Text(s) => write!(f, "'{s}'"),
        }
    }
}

impl From<PathBuf> for FileLocation {
    fn from(value: PathBuf) -> Self {
        Self::File { path: value, line: None }
    }
}

impl From<&Path> for FileLocation {
    fn from(value: &Path) -> Self {
        Self::File { path: value.to_path_buf(), line: None }
    }
}

impl From<&str> for FileLocation {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// Errors related to reading the body (data or tagged values) of an input file
#[derive(Debug, thiserror::Error)]
pub enum BodyError {
    /// The start or end of a data table could not be located.
    #[error("Cannot identify data lines in {location}: {cause}")]
    DataBoundary { location: FileLocation, cause: String },
    #[error("Could not read {location}: {cause}")]
    CouldNotRead { location: FileLocation, cause: String },
    #[error("Error parsing {location}: {cause}")]
    ParseError { location: FileLocation, cause: String },
    #[error("{0}")]
    Custom(String),
}

impl BodyError {
    pub fn data_boundary<L: Into<FileLocation>, S: ToString>(location: L, cause: S) -> Self {
        Self::DataBoundary { location: location.into(), cause: cause.to_string() }
    }

    pub fn could_not_read<L: Into<FileLocation>, S: ToString>(location: L, cause: S) -> Self {
        Self::CouldNotRead { location: location.into(), cause: cause.to_string() }
    }

    pub fn parse_error<L: Into<FileLocation>, S: ToString>(location: L, cause: S) -> Self {
        Self::ParseError { location: location.into(), cause: cause.to_string() }
    }

    pub fn custom<S: ToString>(msg: S) -> Self {
        Self::Custom(msg.to_string())
    }
}

/// Errors related to writing output files
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("Could not write to {}: {cause}", .path.display())]
    CouldNotWrite { path: PathBuf, cause: String },
    #[error("Could not move {} to {}: {cause}", .from.display(), .to.display())]
    CouldNotRename { from: PathBuf, to: PathBuf, cause: String },
    #[error("Error converting data for output: {0}")]
    ConvertError(String),
}

impl WriteError {
    pub fn could_not_write<S: ToString>(path: &Path, cause: S) -> Self {
        Self::CouldNotWrite { path: path.to_path_buf(), cause: cause.to_string() }
    }

    pub fn convert_error<S: ToString>(cause: S) -> Self {
        Self::ConvertError(cause.to_string())
    }
}
