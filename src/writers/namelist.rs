//! Fortran namelist output.
//!
//! Two layouts are available. [`NamelistStyle::Free`] is the usual list-directed
//! layout (lower case group name, four space indent, shortest round-trip floats,
//! arrays wrapped at 72 columns). [`NamelistStyle::FixedWidth`] writes every real
//! number as a 16 character `.7e` field with a fixed number of values per line,
//! which is the layout the UM vertical level files have traditionally used.
use std::{io::Write, path::Path};

use indexmap::IndexMap;
use itertools::Itertools;

use crate::{error::WriteError, utils};

/// Width of one formatted real value in the fixed-width layout
pub const FIXED_FIELD_WIDTH: usize = 16;
/// Digits after the decimal point in the fixed-width layout
pub const FIXED_PRECISION: usize = 7;
pub const VALUES_PER_LINE: usize = 5;
/// Maximum width of the values on one fixed-width continuation line
pub const LINE_LENGTH: usize = 85;
/// Column at which free-form array values wrap
pub const FREE_COLUMN_WIDTH: usize = 72;
const FREE_INDENT: &str = "    ";

#[derive(Debug, thiserror::Error)]
pub enum NamelistError {
    #[error("Line is too long ({len} > {limit}). Reduce precision or the number of values per line.")]
    LineTooLong { len: usize, limit: usize },
    #[error("Namelist group '{0}' has no values")]
    EmptyGroup(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum NmlValue {
    Integer(i64),
    Real(f64),
    RealArray(Vec<f64>),
    Text(String),
}

impl From<i64> for NmlValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for NmlValue {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<Vec<f64>> for NmlValue {
    fn from(value: Vec<f64>) -> Self {
        Self::RealArray(value)
    }
}

impl From<&str> for NmlValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum NamelistStyle {
    #[default]
    Free,
    FixedWidth,
}

/// One `&NAME ... /` group
#[derive(Debug, Clone, PartialEq)]
pub struct NamelistGroup {
    pub name: String,
    values: IndexMap<String, NmlValue>,
}

impl NamelistGroup {
    pub fn new(name: &str) -> Self {
        Self { name: name.to_string(), values: IndexMap::new() }
    }

    pub fn with<V: Into<NmlValue>>(mut self, key: &str, value: V) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert<V: Into<NmlValue>>(&mut self, key: &str, value: V) {
        self.values.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&NmlValue> {
        self.values.get(key)
    }

    /// Format the group in the list-directed layout.
    ///
    /// If `sort` is true, keys are written in sorted order, otherwise in insertion order.
    pub fn to_free_form(&self, sort: bool) -> String {
        let mut lines = vec![format!("&{}", self.name.to_lowercase())];
        let keys = if sort {
            self.values.keys().sorted().collect_vec()
        } else {
            self.values.keys().collect_vec()
        };

        for key in keys {
            let header = format!("{FREE_INDENT}{} = ", key.to_lowercase());
            match &self.values[key.as_str()] {
                NmlValue::Integer(i) => lines.push(format!("{header}{i}")),
                NmlValue::Real(v) => lines.push(format!("{header}{}", utils::python_float_repr(*v))),
                NmlValue::Text(s) => lines.push(format!("{header}{}", quote_string(s))),
                NmlValue::RealArray(arr) => {
                    let strs = arr.iter().map(|v| utils::python_float_repr(*v)).collect_vec();
                    lines.extend(wrap_free_form_values(&header, &strs));
                }
            }
        }

        lines.push("/".to_string());
        let mut out = lines.join("\n");
        out.push('\n');
        out
    }

    /// Format the group in the fixed-width layout.
    ///
    /// Scalars are written as `key = value,` with the keys padded to a common width,
    /// reals as 16.7e fields. Arrays are written as a ` key = ` declaration line followed
    /// by continuation lines from [`write_1d_data_to_namelist_format`]. Entries keep
    /// insertion order. The final `/` is not followed by a newline.
    pub fn to_fixed_width(&self) -> Result<String, NamelistError> {
        if self.values.is_empty() {
            return Err(NamelistError::EmptyGroup(self.name.clone()));
        }

        let key_width = self.values.iter()
            .filter(|(_, v)| !matches!(v, NmlValue::RealArray(_)))
            .map(|(k, _)| k.len())
            .max()
            .unwrap_or(0);

        let mut lines = vec![format!("&{}", self.name.to_uppercase())];
        for (key, value) in self.values.iter() {
            match value {
                NmlValue::Integer(i) => lines.push(format!(" {key:<key_width$} = {i},")),
                NmlValue::Real(v) => lines.push(format!(" {key:<key_width$} = {},", fixed_width_real(*v))),
                NmlValue::Text(s) => lines.push(format!(" {key:<key_width$} = {},", quote_string(s))),
                NmlValue::RealArray(arr) => {
                    let decl_line = format!(" {key} = ");
                    lines.extend(write_1d_data_to_namelist_format(arr, &decl_line, VALUES_PER_LINE, LINE_LENGTH)?);
                }
            }
        }
        lines.push("/".to_string());
        Ok(lines.join("\n"))
    }

    /// Write the group to `path` in the given style, replacing any existing file.
    pub fn write(&self, path: &Path, style: NamelistStyle) -> error_stack::Result<(), WriteError> {
        let contents = match style {
            NamelistStyle::Free => self.to_free_form(true),
            NamelistStyle::FixedWidth => self.to_fixed_width()
                .map_err(WriteError::convert_error)?,
        };
        utils::write_atomically(path, |w| w.write_all(contents.as_bytes()))
    }
}

/// Format one real value as a right-aligned 16 character `.7e` field
pub fn fixed_width_real(value: f64) -> String {
    format!("{:>width$}", utils::python_sci(value, FIXED_PRECISION), width = FIXED_FIELD_WIDTH)
}

/// Format a 1D array as fixed-width Fortran namelist continuation lines.
///
/// The first element of the returned vector is `decl_line` unchanged. Values are then
/// grouped `values_per_line` at a time; each group is joined with commas, checked against
/// `line_length`, and written as a leading space plus the group and a trailing comma,
/// padded on the right to `line_length - 1` characters.
///
/// # Errors
/// [`NamelistError::LineTooLong`] if the joined values of any line are longer than
/// `line_length`. Reduce the precision or the number of values per line in that case.
pub fn write_1d_data_to_namelist_format(
    values: &[f64],
    decl_line: &str,
    values_per_line: usize,
    line_length: usize,
) -> Result<Vec<String>, NamelistError> {
    let mut lines = vec![decl_line.to_string()];
    let pad_to = line_length.saturating_sub(1);
    for chunk in values.chunks(values_per_line.max(1)) {
        let line = chunk.iter().map(|v| fixed_width_real(*v)).join(",");
        if line.len() > line_length {
            return Err(NamelistError::LineTooLong { len: line.len(), limit: line_length });
        }
        lines.push(format!(" {:<pad_to$}", format!("{line},")));
    }
    Ok(lines)
}

/// Lay out array values after `header`, breaking the line before any value that would
/// take it (with its trailing comma) past [`FREE_COLUMN_WIDTH`]. Continuation lines are
/// indented to line up with the first value. No line is longer than the column width
/// unless a single value does not fit on its own.
fn wrap_free_form_values(header: &str, values: &[String]) -> Vec<String> {
    let continuation = " ".repeat(header.len());
    let mut lines = vec![];
    let mut current = header.to_string();
    let mut n_on_line = 0;
    for (i, v) in values.iter().enumerate() {
        let is_last = i + 1 == values.len();
        // +2 for the ", " separator, or the trailing comma on a wrapped line
        if n_on_line > 0 && current.len() + 2 + v.len() + 1 > FREE_COLUMN_WIDTH {
            current.push(',');
            lines.push(current);
            current = continuation.clone();
            n_on_line = 0;
        }
        if n_on_line > 0 {
            current.push_str(", ");
        }
        current.push_str(v);
        n_on_line += 1;
        if is_last {
            lines.push(std::mem::take(&mut current));
        }
    }

    if values.is_empty() {
        lines.push(header.trim_end().to_string());
    }
    lines
}

fn quote_string(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}
