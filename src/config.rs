//! Locations of the input data, read from a small TOML file.
//!
//! ```toml
//! # Planetary constants, one <case>.json per case
//! const_dir = "const"
//! # Per-case PSG/MALBEC inputs, laid out as <data_dir>/<case>/<case>_malbec.txt
//! data_dir = "../cases"
//! # UM start dumps
//! start_dump_dir = "/home/user/start_dumps/malbec"
//! ```
//!
//! Every key is optional. Relative paths are interpreted relative to the directory
//! containing the configuration file.
use std::path::{Path, PathBuf};

use error_stack::ResultExt;
use serde::Deserialize;

use crate::utils;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not read paths configuration {}", .0.display())]
    CouldNotRead(PathBuf),
    #[error("Could not parse paths configuration {}", .0.display())]
    ParseError(PathBuf),
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPathsConfig {
    const_dir: Option<PathBuf>,
    data_dir: Option<PathBuf>,
    start_dump_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathsConfig {
    pub const_dir: PathBuf,
    pub data_dir: PathBuf,
    pub start_dump_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_default();
        Self {
            const_dir: PathBuf::from("const"),
            data_dir: PathBuf::from("cases"),
            start_dump_dir: home.join("start_dumps").join("malbec"),
        }
    }
}

impl PathsConfig {
    pub fn load(path: &Path) -> error_stack::Result<Self, ConfigError> {
        let text = utils::read_text_file(path)
            .change_context_lazy(|| ConfigError::CouldNotRead(path.to_path_buf()))?;
        let base = path.parent().unwrap_or(Path::new("."));
        Self::from_toml_str(&text, base)
            .change_context_lazy(|| ConfigError::ParseError(path.to_path_buf()))
    }

    /// Parse configuration text, resolving relative paths against `base_dir`.
    pub fn from_toml_str(text: &str, base_dir: &Path) -> Result<Self, toml::de::Error> {
        let raw: RawPathsConfig = toml::from_str(text)?;
        let defaults = Self::default();
        let resolve = |p: Option<PathBuf>, default: PathBuf| match p {
            Some(p) if p.is_relative() => base_dir.join(p),
            Some(p) => p,
            None => default,
        };

        Ok(Self {
            const_dir: resolve(raw.const_dir, defaults.const_dir),
            data_dir: resolve(raw.data_dir, defaults.data_dir),
            start_dump_dir: resolve(raw.start_dump_dir, defaults.start_dump_dir),
        })
    }

    /// Load from `path` if given, otherwise use the defaults.
    pub fn load_or_default(path: Option<&Path>) -> error_stack::Result<Self, ConfigError> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }
}
