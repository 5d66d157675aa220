use indexmap::IndexMap;
use itertools::Itertools;
use ndarray::Array1;

use crate::error::{BodyError, FileLocation};

pub mod psg_files;
pub mod malbec_files;

/// A table of atmospheric profiles, one row per vertical level.
///
/// Columns keep the order they had in the source file. One column is designated
/// the index (the vertical coordinate); it is stored alongside the other columns
/// and also counted by [`ProfileTable::shape`].
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileTable {
    index_name: String,
    columns: IndexMap<String, Array1<f64>>,
}

impl ProfileTable {
    /// Build a table from column names and row-major values.
    ///
    /// Every row must have exactly one value per column, column names must be unique,
    /// and `index_name` must be one of the columns.
    pub fn from_rows(column_names: Vec<String>, rows: Vec<Vec<f64>>, index_name: &str) -> Result<Self, BodyError> {
        if let Some(dup) = column_names.iter().duplicates().next() {
            return Err(BodyError::custom(format!(
                "column '{dup}' appears more than once in the header ({})",
                column_names.join(", ")
            )));
        }

        if !column_names.iter().any(|c| c == index_name) {
            return Err(BodyError::custom(format!(
                "index column '{index_name}' is not one of the table columns ({})",
                column_names.join(", ")
            )));
        }

        let nrow = rows.len();
        let mut columns: IndexMap<String, Array1<f64>> = IndexMap::new();
        for name in column_names.iter() {
            columns.insert(name.clone(), Array1::from_elem(nrow, f64::NAN));
        }

        for (irow, row) in rows.into_iter().enumerate() {
            if row.len() != column_names.len() {
                return Err(BodyError::custom(format!(
                    "row {} has {} values but the table has {} columns",
                    irow + 1, row.len(), column_names.len()
                )));
            }
            for (value, arr) in row.into_iter().zip(columns.values_mut()) {
                arr[irow] = value;
            }
        }

        Ok(Self { index_name: index_name.to_string(), columns })
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    /// The index (vertical coordinate) column
    pub fn index(&self) -> &Array1<f64> {
        // from_rows guarantees that the index is one of the columns
        &self.columns[self.index_name.as_str()]
    }

    pub fn column(&self, name: &str) -> Option<&Array1<f64>> {
        self.columns.get(name)
    }

    /// All column names, index included, in file order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(|k| k.as_str())
    }

    pub fn nrows(&self) -> usize {
        self.columns.values().next().map(|c| c.len()).unwrap_or(0)
    }

    /// Number of rows and number of columns (index included)
    pub fn shape(&self) -> (usize, usize) {
        (self.nrows(), self.columns.len())
    }
}

/// Markers used to find a data block embedded in a larger text file.
///
/// The data block is taken to run from `start_offset` lines after the *last* line
/// containing `start_marker` through `end_offset` lines before the *last* line
/// containing `end_marker`, inclusive.
#[derive(Debug, Clone, Copy)]
pub struct TableBoundaries {
    pub start_marker: &'static str,
    pub start_offset: usize,
    pub end_marker: &'static str,
    pub end_offset: usize,
}

/// The located data block: 0-based line indices into the file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataBlock {
    /// Line containing the start marker
    pub marker_line: usize,
    /// First data line
    pub first: usize,
    /// Last data line (inclusive)
    pub last: usize,
}

impl TableBoundaries {
    pub fn locate(&self, lines: &[&str], location: &FileLocation) -> Result<DataBlock, BodyError> {
        let marker_line = lines.iter().rposition(|l| l.contains(self.start_marker))
            .ok_or_else(|| BodyError::data_boundary(
                location.clone(),
                format!("no line contains the start-of-table marker '{}'", self.start_marker)
            ))?;
        let end_line = lines.iter().rposition(|l| l.contains(self.end_marker))
            .ok_or_else(|| BodyError::data_boundary(
                location.clone(),
                format!("no line contains the end-of-table marker '{}'", self.end_marker)
            ))?;

        let first = marker_line + self.start_offset;
        let last = end_line.checked_sub(self.end_offset);
        match last {
            Some(last) if last >= first => Ok(DataBlock { marker_line, first, last }),
            _ => Err(BodyError::data_boundary(
                location.clone(),
                format!(
                    "the '{}' marker (line {}) and '{}' marker (line {}) do not enclose any data lines",
                    self.start_marker, marker_line + 1, self.end_marker, end_line + 1
                )
            )),
        }
    }
}

/// Split a data line on whitespace and parse each field as a float.
///
/// `line_num` is the 0-based line index, errors report it 1-based.
pub(crate) fn parse_numeric_row(line: &str, ncol: usize, location: &FileLocation, line_num: usize) -> Result<Vec<f64>, BodyError> {
    let values: Vec<f64> = line.split_whitespace()
        .enumerate()
        .map(|(i, s)| s.parse::<f64>().map_err(|_| BodyError::parse_error(
            location.clone().with_line(line_num + 1),
            format!("could not parse value {} ('{s}') as a number", i + 1)
        )))
        .collect::<Result<_, _>>()?;

    if values.len() != ncol {
        return Err(BodyError::parse_error(
            location.clone().with_line(line_num + 1),
            format!("expected {ncol} values, found {}", values.len())
        ));
    }

    Ok(values)
}

/// Generate placeholder column names, `col00`, `col01`, ..., for files without a column list.
pub(crate) fn synthesize_column_names(ncol: usize) -> Vec<String> {
    (0..ncol).map(|i| format!("col{i:02}")).collect_vec()
}
