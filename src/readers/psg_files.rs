//! Readers for files produced by the NASA-GSFC Planetary Spectrum Generator (PSG).
//!
//! Two formats are supported: the `<TAG>value` configuration files, and the
//! layer-by-layer atmospheric profile (`lyr`) files.
use std::{fmt::Display, path::Path, sync::OnceLock};

use error_stack::ResultExt;
use indexmap::IndexMap;
use itertools::Itertools;

use crate::{error::{BodyError, FileLocation}, utils};

use super::{parse_numeric_row, ProfileTable, TableBoundaries};

static PSG_CFG_REGEX: OnceLock<regex::Regex> = OnceLock::new();

/// Markers that bracket the profile table in a PSG layer file.
///
/// The column names are on the line with "Alt[km]", the data start three lines
/// below it and end two lines above the "Curtis-Godson" block.
pub const PSG_LYR_BOUNDARIES: TableBoundaries = TableBoundaries {
    start_marker: "Alt[km]",
    start_offset: 3,
    end_marker: "Curtis-Godson",
    end_offset: 2,
};

/// A single value from a PSG configuration file.
///
/// Values are typed opportunistically: anything that parses as an integer is an
/// integer, otherwise anything that parses as a float is a float, and everything
/// else is kept as the literal text.
#[derive(Debug, Clone, PartialEq)]
pub enum CfgValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl CfgValue {
    /// Coerce the raw text following a tag into a value.
    ///
    /// Surrounding whitespace is ignored for the numeric conversions, but text values
    /// are kept exactly as given.
    pub fn coerce(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Ok(i) = trimmed.parse::<i64>() {
            Self::Integer(i)
        } else if let Ok(f) = trimmed.parse::<f64>() {
            Self::Float(f)
        } else {
            Self::Text(raw.to_string())
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        if let Self::Integer(i) = self { Some(*i) } else { None }
    }

    /// Return the value as a float; integers are converted.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            Self::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        if let Self::Text(s) = self { Some(s) } else { None }
    }
}

impl Display for CfgValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CfgValue::Integer(i) => write!(f, "{i}"),
            CfgValue::Float(v) => write!(f, "{}", utils::python_float_repr(*v)),
            CfgValue::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for CfgValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for CfgValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for CfgValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// How to treat lines in a configuration file that are not `<TAG>value` pairs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CfgParseMode {
    /// Skip them (logged at debug level)
    #[default]
    Lenient,
    /// Return an error on the first non-blank line without a tag
    Strict,
}

/// A parsed PSG configuration file: tags and values in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PsgConfig {
    entries: IndexMap<String, CfgValue>,
}

impl PsgConfig {
    pub fn get(&self, key: &str) -> Option<&CfgValue> {
        self.entries.get(key)
    }

    /// Set a value. An existing key keeps its position, a new key goes at the end.
    pub fn insert<V: Into<CfgValue>>(&mut self, key: &str, value: V) -> Option<CfgValue> {
        self.entries.insert(key.to_string(), value.into())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CfgValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, CfgValue)> for PsgConfig {
    fn from_iter<T: IntoIterator<Item = (K, CfgValue)>>(iter: T) -> Self {
        let entries = iter.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Self { entries }
    }
}

/// Read a NASA-GSFC PSG configuration file.
///
/// See [`parse_psg_cfg`] for the format details.
pub fn read_psg_cfg(path: &Path, mode: CfgParseMode) -> error_stack::Result<PsgConfig, BodyError> {
    let text = utils::read_text_file(path)?;
    parse_psg_cfg(&text, path.into(), mode)
        .attach_printable_lazy(|| format!("while parsing PSG config file {}", path.display()))
}

/// Parse the text of a PSG configuration file.
///
/// Each meaningful line contains `<TAG>value`. The tag is everything between the first
/// `<` and the following `>`, the value is the rest of the line, coerced by
/// [`CfgValue::coerce`]. A tag repeated later in the file overwrites the earlier value.
/// `location` is only used in error messages.
pub fn parse_psg_cfg(text: &str, location: FileLocation, mode: CfgParseMode) -> Result<PsgConfig, BodyError> {
    let re = PSG_CFG_REGEX.get_or_init(|| {
        regex::Regex::new(r"<(.+?)>(.*)").expect("Could not compile PSG config regex")
    });

    let mut cfg = PsgConfig::default();
    for (iline, line) in text.lines().enumerate() {
        if let Some(caps) = re.captures(line) {
            cfg.entries.insert(caps[1].to_string(), CfgValue::coerce(&caps[2]));
        } else if mode == CfgParseMode::Strict && !line.trim().is_empty() {
            return Err(BodyError::parse_error(
                location.with_line(iline + 1),
                format!("line does not contain a <TAG>value pair: '{line}'")
            ));
        } else if !line.trim().is_empty() {
            log::debug!("Skipping untagged line {} in PSG config: {line}", iline + 1);
        }
    }

    Ok(cfg)
}

/// Read a NASA-GSFC PSG layer-by-layer atmospheric profile.
///
/// The returned table is indexed by the first column (altitude, normally `Alt[km]`).
pub fn read_psg_lyr_atm_prof(path: &Path) -> error_stack::Result<ProfileTable, BodyError> {
    let text = utils::read_text_file(path)?;
    parse_psg_lyr_atm_prof(&text, path.into())
        .attach_printable_lazy(|| format!("while reading PSG layer profile {}", path.display()))
}

/// Parse the text of a PSG layer-by-layer profile. `location` is only used in error messages.
pub fn parse_psg_lyr_atm_prof(text: &str, location: FileLocation) -> Result<ProfileTable, BodyError> {
    let lines = text.lines().collect_vec();
    let block = PSG_LYR_BOUNDARIES.locate(&lines, &location)?;
    log::debug!("PSG layer data block spans lines {} to {}", block.first + 1, block.last + 1);

    let column_names = lines[block.marker_line]
        .trim_start()
        .trim_start_matches('#')
        .split_whitespace()
        .map(|s| s.to_string())
        .collect_vec();
    if column_names.is_empty() {
        return Err(BodyError::parse_error(location.with_line(block.marker_line + 1), "no column names found"));
    }

    let last = block.last.min(lines.len().saturating_sub(1));
    let mut rows = vec![];
    for (iline, line) in lines.iter().enumerate().take(last + 1).skip(block.first) {
        if let Some(data) = normalize_lyr_line(line) {
            rows.push(parse_numeric_row(data, column_names.len(), &location, iline)?);
        }
    }

    if rows.is_empty() {
        return Err(BodyError::data_boundary(location, "the data block contains no numeric rows"));
    }

    let index_name = column_names[0].clone();
    ProfileTable::from_rows(column_names, rows, &index_name)
}

/// Undo the comment decoration PSG puts on data lines.
///
/// Returns `None` for lines that carry no data: blank lines, separators made only of
/// dashes, and comments. A leading "# " is removed first, so commented-out rows are still read.
fn normalize_lyr_line(line: &str) -> Option<&str> {
    let line = line.strip_prefix("# ").unwrap_or(line);
    if line.trim().chars().all(|c| c == '-') {
        return None;
    }
    let line = line.split('#').next().unwrap_or_default().trim();
    if line.is_empty() {
        None
    } else {
        Some(line)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::test_utils::test_data_dir;
    use approx::assert_abs_diff_eq;
    use rstest::{fixture, rstest};

    #[fixture]
    fn psg_inputs_dir() -> PathBuf {
        test_data_dir().join("inputs").join("psg")
    }

    #[test]
    fn test_cfg_coercion() {
        let cfg = parse_psg_cfg("<NLEV>42\n<DIST>Uniform\n", "test".into(), CfgParseMode::Lenient).unwrap();
        let expected: PsgConfig = [("NLEV", CfgValue::Integer(42)), ("DIST", CfgValue::Text("Uniform".into()))]
            .into_iter()
            .collect();
        assert_eq!(cfg, expected);
    }

    #[test]
    fn test_cfg_values() {
        let text = "<A>1.5e3\n<B> 7 \n<C>  spaced text \n<D>1,2,3\n<E>\n";
        let cfg = parse_psg_cfg(text, "test".into(), CfgParseMode::Lenient).unwrap();
        assert_eq!(cfg.get("A"), Some(&CfgValue::Float(1500.0)));
        assert_eq!(cfg.get("B"), Some(&CfgValue::Integer(7)));
        assert_eq!(cfg.get("C"), Some(&CfgValue::Text("  spaced text ".into())));
        assert_eq!(cfg.get("D"), Some(&CfgValue::Text("1,2,3".into())));
        assert_eq!(cfg.get("E"), Some(&CfgValue::Text("".into())));
    }

    #[test]
    fn test_cfg_duplicates_and_order() {
        let text = "<X>1\n<Y>2\n<X>3\n";
        let cfg = parse_psg_cfg(text, "test".into(), CfgParseMode::Lenient).unwrap();
        assert_eq!(cfg.keys().collect_vec(), vec!["X", "Y"]);
        assert_eq!(cfg.get("X").and_then(|v| v.as_i64()), Some(3));
    }

    #[test]
    fn test_cfg_modes() {
        let text = "<X>1\nfree-form comment\n\n<Y>2\n";
        let cfg = parse_psg_cfg(text, "test".into(), CfgParseMode::Lenient).unwrap();
        assert_eq!(cfg.len(), 2);

        let err = parse_psg_cfg(text, "test".into(), CfgParseMode::Strict).unwrap_err();
        match err {
            BodyError::ParseError { location, .. } => {
                assert_eq!(location, FileLocation::Text("test, line 2".to_string()));
            },
            _ => panic!("Expected a ParseError, got {err:?}"),
        }
    }

    #[rstest]
    fn test_read_cfg_file(psg_inputs_dir: PathBuf) {
        let cfg = read_psg_cfg(&psg_inputs_dir.join("T1A_psg_cfg.txt"), CfgParseMode::Lenient).unwrap();
        assert_eq!(cfg.get("OBJECT"), Some(&CfgValue::Text("Exoplanet".into())));
        assert_eq!(cfg.get("ATMOSPHERE-LAYERS").and_then(|v| v.as_i64()), Some(5));
        assert_abs_diff_eq!(cfg.get("ATMOSPHERE-PRESSURE").and_then(|v| v.as_f64()).unwrap(), 1.0);
        assert_abs_diff_eq!(cfg.get("OBJECT-GRAVITY").and_then(|v| v.as_f64()).unwrap(), 9.12);
    }

    #[test]
    fn test_lyr_scenario() {
        let text = "\
# PSG layer-by-layer profile
# Alt[km] Temp[K] Pressure[bar] H2O
# ---------------------------------
#
 0.0 288.0 1.00 1.0e-2
 1.0 281.5 0.89 8.0e-3
 2.0 275.0 0.79 5.0e-3
# ---------------------------------
# Curtis-Godson averaged layers
";
        let table = parse_psg_lyr_atm_prof(text, "test".into()).unwrap();
        assert_eq!(table.shape(), (3, 4));
        assert_eq!(table.index_name(), "Alt[km]");
        assert_eq!(table.column_names().collect_vec(), vec!["Alt[km]", "Temp[K]", "Pressure[bar]", "H2O"]);
        assert_eq!(table.index().to_vec(), vec![0.0, 1.0, 2.0]);
        assert_abs_diff_eq!(table.column("Temp[K]").unwrap()[1], 281.5);
        assert_abs_diff_eq!(table.column("H2O").unwrap()[2], 5.0e-3);
    }

    #[test]
    fn test_lyr_commented_rows() {
        let text = "\
# Alt[km] Pressure[bar] Temperature[K]
# -----------------------------
# -----------------------------
# 0.0 1.0 300.0
# 5.0 0.5 250.0
# -----------------------------
# Curtis-Godson
";
        let table = parse_psg_lyr_atm_prof(text, "test".into()).unwrap();
        assert_eq!(table.shape(), (2, 3));
        assert_eq!(table.column("Temperature[K]").unwrap().to_vec(), vec![300.0, 250.0]);
    }

    #[test]
    fn test_lyr_negative_first_value() {
        let text = "\
# Alt[km] Pressure[bar] Temperature[K]
# -----------------------------
#
-0.5 1.05 290.0
0.0 1.0 288.0
-----------------------------
# Curtis-Godson
";
        let table = parse_psg_lyr_atm_prof(text, "test".into()).unwrap();
        assert_eq!(table.shape(), (2, 3));
        assert_eq!(table.index().to_vec(), vec![-0.5, 0.0]);
        assert_abs_diff_eq!(table.column("Temperature[K]").unwrap()[0], 290.0);
    }

    #[test]
    fn test_lyr_repeated_column() {
        let text = "\
# Alt[km] H2O Pressure[bar] H2O Temp[K]
# -----------------------------
#
0.0 1e-2 1.0 2e-2 300.0
1.0 1e-3 0.5 2e-3 250.0
# -----------------------------
# Curtis-Godson
";
        let err = parse_psg_lyr_atm_prof(text, "test".into()).unwrap_err();
        assert!(matches!(err, BodyError::Custom(_)), "Expected a Custom error, got {err:?}");
    }

    #[test]
    fn test_lyr_missing_markers() {
        let err = parse_psg_lyr_atm_prof("# just a header\n1 2 3\n", "test".into()).unwrap_err();
        assert!(matches!(err, BodyError::DataBoundary { .. }), "Expected a DataBoundary error, got {err:?}");

        let err = parse_psg_lyr_atm_prof("# Alt[km] T\n#\n#\n0 1\n", "test".into()).unwrap_err();
        assert!(matches!(err, BodyError::DataBoundary { .. }), "Expected a DataBoundary error, got {err:?}");
    }

    #[test]
    fn test_read_lyr_file() {
        let lyr_file = test_data_dir().join("inputs").join("psg_cases").join("T1A").join("T1A_psg_lyr.txt");
        let table = read_psg_lyr_atm_prof(&lyr_file).unwrap();
        assert_eq!(table.shape(), (6, 5));
        assert_eq!(table.index_name(), "Alt[km]");
        assert_abs_diff_eq!(table.index()[5], 100.0);
        assert_abs_diff_eq!(table.column("Pressure[bar]").unwrap()[0], 1.0);
    }
}
