//! Reader for the `*_malbec.txt` atmospheric profile files.
use std::path::Path;

use error_stack::ResultExt;
use itertools::Itertools;

use crate::{error::{BodyError, FileLocation}, utils};

use super::{parse_numeric_row, synthesize_column_names, ProfileTable};

/// Prefix of the comment line that lists the column names
pub const MALBEC_COLUMNS_LABEL: &str = "# Atmosphere-columns: ";
/// Position of the altitude column, used as the table index
pub const MALBEC_INDEX_COLUMN: usize = 3;

/// Read atmospheric profiles from a MALBEC text file.
///
/// The table is indexed by the fourth column, which is the altitude in kilometers.
pub fn read_malbec_profiles(path: &Path) -> error_stack::Result<ProfileTable, BodyError> {
    let text = utils::read_text_file(path)?;
    parse_malbec_profiles(&text, path.into())
        .attach_printable_lazy(|| format!("while reading MALBEC profiles from {}", path.display()))
}

/// Parse the text of a MALBEC profile file. `location` is only used in error messages.
///
/// Lines starting with `#` are comments, except for the one starting with
/// [`MALBEC_COLUMNS_LABEL`], which gives the space-separated column names. If there is
/// no such line, names of the form `col00`, `col01`, ... are generated from the number
/// of values in the first data row.
pub fn parse_malbec_profiles(text: &str, location: FileLocation) -> Result<ProfileTable, BodyError> {
    let mut column_names = None;
    let mut data_lines = vec![];
    for (iline, line) in text.lines().enumerate() {
        if let Some(names) = line.strip_prefix(MALBEC_COLUMNS_LABEL) {
            column_names = Some(names.split_whitespace().map(|s| s.to_string()).collect_vec());
        } else if !line.starts_with('#') {
            let data = line.split('#').next().unwrap_or_default().trim();
            if !data.is_empty() {
                data_lines.push((iline, data));
            }
        }
    }

    let column_names = match column_names {
        Some(names) => names,
        None => {
            let ncol = data_lines.first()
                .map(|(_, l)| l.split_whitespace().count())
                .unwrap_or(0);
            synthesize_column_names(ncol)
        }
    };

    if column_names.len() <= MALBEC_INDEX_COLUMN {
        return Err(BodyError::parse_error(
            location,
            format!(
                "expected at least {} columns (altitude is column {}), found {}",
                MALBEC_INDEX_COLUMN + 1, MALBEC_INDEX_COLUMN + 1, column_names.len()
            )
        ));
    }

    let rows: Vec<Vec<f64>> = data_lines.into_iter()
        .map(|(iline, line)| parse_numeric_row(line, column_names.len(), &location, iline))
        .collect::<Result<_, _>>()?;

    let index_name = column_names[MALBEC_INDEX_COLUMN].clone();
    ProfileTable::from_rows(column_names, rows, &index_name)
}
