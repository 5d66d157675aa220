//! Unit lookup and conversion for the quantities found in atmospheric profiles.
//!
//! This is deliberately a table of known units rather than a general unit algebra:
//! each recognized unit string maps to a physical dimension plus a linear transform
//! to the SI unit of that dimension. Two units are commensurable if they share a
//! dimension.
use std::fmt::Display;

/// The physical dimensions that can appear in profile files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Length,
    Pressure,
    Temperature,
    MolarMass,
    /// Pure numbers and ratios: mole fractions, mass mixing ratios, the Exner function.
    Dimensionless,
    SpecificHeat,
}

impl Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Dimension::Length => "length",
            Dimension::Pressure => "pressure",
            Dimension::Temperature => "temperature",
            Dimension::MolarMass => "molar mass",
            Dimension::Dimensionless => "dimensionless",
            Dimension::SpecificHeat => "specific heat",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown unit '{unit}'")]
pub struct UnknownUnitError {
    pub unit: String,
}

/// Error returned when a value cannot be expressed in the requested unit.
#[derive(Debug, thiserror::Error)]
pub enum UnitConversionError {
    #[error(transparent)]
    Unknown(#[from] UnknownUnitError),
    #[error("Cannot convert from '{from}' ({from_dim}) to '{to}' ({to_dim})")]
    Incommensurable { from: String, to: String, from_dim: Dimension, to_dim: Dimension },
}

/// A recognized unit: a value `v` in this unit equals `v * scale + offset` in SI units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Unit {
    pub dimension: Dimension,
    scale: f64,
    offset: f64,
}

impl Unit {
    const fn new(dimension: Dimension, scale: f64) -> Self {
        Self { dimension, scale, offset: 0.0 }
    }

    /// Look up a unit string.
    ///
    /// Matching ignores surrounding whitespace. Both the `a/b` and `a b-1` spellings
    /// are accepted for the compound units.
    pub fn parse(unit: &str) -> Result<Self, UnknownUnitError> {
        use Dimension::*;
        let u = match unit.trim() {
            "m" => Self::new(Length, 1.0),
            "km" => Self::new(Length, 1e3),
            "cm" => Self::new(Length, 1e-2),

            "Pa" => Self::new(Pressure, 1.0),
            "hPa" | "mbar" => Self::new(Pressure, 1e2),
            "kPa" => Self::new(Pressure, 1e3),
            "bar" => Self::new(Pressure, 1e5),
            "atm" => Self::new(Pressure, 101325.0),

            "K" => Self::new(Temperature, 1.0),
            "degC" | "C" => Self { dimension: Temperature, scale: 1.0, offset: 273.15 },

            "kg/mol" | "kg mol-1" => Self::new(MolarMass, 1.0),
            "g/mol" | "g mol-1" => Self::new(MolarMass, 1e-3),

            "1" | "mol/mol" | "mol mol-1" | "kg/kg" | "kg kg-1" | "VMR" => Self::new(Dimensionless, 1.0),
            "%" => Self::new(Dimensionless, 1e-2),
            "ppm" | "ppmv" => Self::new(Dimensionless, 1e-6),
            "ppb" | "ppbv" => Self::new(Dimensionless, 1e-9),
            "ppt" | "pptv" => Self::new(Dimensionless, 1e-12),

            "J kg-1 K-1" | "J/kg/K" | "m2 s-2 K-1" => Self::new(SpecificHeat, 1.0),

            other => return Err(UnknownUnitError { unit: other.to_string() }),
        };
        Ok(u)
    }

    pub fn to_si(&self, value: f64) -> f64 {
        value * self.scale + self.offset
    }

    pub fn from_si(&self, value: f64) -> f64 {
        (value - self.offset) / self.scale
    }
}

/// Return a function converting values from unit `from` to unit `to`.
///
/// The returned closure can be mapped over an array; building it once does the
/// lookups and the commensurability check only once per column.
pub fn converter(from: &str, to: &str) -> Result<impl Fn(f64) -> f64, UnitConversionError> {
    let from_unit = Unit::parse(from)?;
    let to_unit = Unit::parse(to)?;
    if from_unit.dimension != to_unit.dimension {
        return Err(UnitConversionError::Incommensurable {
            from: from.to_string(),
            to: to.to_string(),
            from_dim: from_unit.dimension,
            to_dim: to_unit.dimension,
        });
    }
    Ok(move |v| to_unit.from_si(from_unit.to_si(v)))
}

/// Convert a single value from unit `from` to unit `to`.
pub fn convert(value: f64, from: &str, to: &str) -> Result<f64, UnitConversionError> {
    let conv = converter(from, to)?;
    Ok(conv(value))
}

/// Extract a unit given in square brackets at the end of a column name.
///
/// PSG labels its columns like `Temperature[K]` or `Alt[km]`; this returns `Some("K")`
/// or `Some("km")` for those, and `None` for names without a bracketed suffix.
pub fn bracketed_unit(column_name: &str) -> Option<&str> {
    let name = column_name.trim_end();
    let inner = name.strip_suffix(']')?;
    let start = inner.rfind('[')?;
    let unit = &inner[start + 1..];
    if unit.is_empty() {
        None
    } else {
        Some(unit)
    }
}

/// Return the column name with any bracketed unit suffix removed, e.g. `Alt[km]` -> `Alt`.
pub fn strip_bracketed_unit(column_name: &str) -> &str {
    match column_name.rfind('[') {
        Some(i) if bracketed_unit(column_name).is_some() => &column_name[..i],
        _ => column_name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rstest::rstest;

    #[rstest]
    #[case("bar", "Pa", 1.0, 1e5)]
    #[case("km", "m", 2.5, 2500.0)]
    #[case("g/mol", "kg mol-1", 28.0, 0.028)]
    #[case("mol/mol", "kg kg-1", 0.01, 0.01)]
    #[case("degC", "K", 0.0, 273.15)]
    #[case("ppm", "1", 400.0, 4e-4)]
    fn test_convert(#[case] from: &str, #[case] to: &str, #[case] value: f64, #[case] expected: f64) {
        let out = convert(value, from, to).unwrap();
        assert_abs_diff_eq!(out, expected, epsilon = 1e-12 * expected.abs().max(1.0));
    }

    #[rstest]
    #[case("bar", "hPa")]
    #[case("K", "degC")]
    #[case("km", "cm")]
    #[case("ppb", "mol/mol")]
    fn test_round_trip(#[case] a: &str, #[case] b: &str) {
        for v in [0.0, 1.0, 287.05, 1.0e-6, 12345.678] {
            let there = convert(v, a, b).unwrap();
            let back = convert(there, b, a).unwrap();
            assert_abs_diff_eq!(back, v, epsilon = 1e-9 * v.abs().max(1.0));
        }
    }

    #[test]
    fn test_incommensurable() {
        let err = convert(1.0, "bar", "K").unwrap_err();
        assert!(matches!(err, UnitConversionError::Incommensurable { from_dim: Dimension::Pressure, to_dim: Dimension::Temperature, .. }));

        let err = convert(1.0, "furlong", "m").unwrap_err();
        assert!(matches!(err, UnitConversionError::Unknown(_)));
    }

    #[test]
    fn test_bracketed_unit() {
        assert_eq!(bracketed_unit("Temp[K]"), Some("K"));
        assert_eq!(bracketed_unit("Alt[km]"), Some("km"));
        assert_eq!(bracketed_unit("Pressure[bar]"), Some("bar"));
        assert_eq!(bracketed_unit("H2O"), None);
        assert_eq!(bracketed_unit("Odd[]"), None);
        assert_eq!(strip_bracketed_unit("Temperature[K]"), "Temperature");
        assert_eq!(strip_bracketed_unit("H2O"), "H2O");
    }
}
