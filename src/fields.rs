//! Named, unit-tagged vertical profiles.
use ndarray::Array1;

use crate::{readers::ProfileTable, units::{self, UnitConversionError}};

/// Unit assumed for columns with neither a bracketed unit nor an entry in the lookup table
pub const DEFAULT_COLUMN_UNITS: &str = "mol/mol";
/// Unit of the altitude index in both PSG and MALBEC files
pub const TABLE_INDEX_UNITS: &str = "km";

#[derive(Debug, thiserror::Error)]
pub enum FieldError {
    #[error("Column '{0}' not found in the profile table")]
    MissingColumn(String),
    #[error(transparent)]
    Units(#[from] UnitConversionError),
    #[error("Fields '{0}' and '{1}' are not defined on the same vertical levels")]
    CoordMismatch(String, String),
}

/// The vertical coordinate a field is defined on.
#[derive(Debug, Clone, PartialEq)]
pub struct VerticalCoord {
    pub name: String,
    pub units: String,
    pub points: Array1<f64>,
}

impl VerticalCoord {
    pub fn convert_units(&mut self, new_units: &str) -> Result<(), UnitConversionError> {
        let conv = units::converter(&self.units, new_units)?;
        self.points.mapv_inplace(conv);
        self.units = new_units.to_string();
        Ok(())
    }
}

/// A one-dimensional physical quantity along a vertical coordinate.
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicalField {
    pub name: String,
    pub units: String,
    pub data: Array1<f64>,
    pub coord: VerticalCoord,
}

impl PhysicalField {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn rename(&mut self, name: &str) {
        self.name = name.to_string();
    }

    /// Convert the data in place to `new_units`.
    pub fn convert_units(&mut self, new_units: &str) -> Result<(), UnitConversionError> {
        let conv = units::converter(&self.units, new_units)?;
        self.data.mapv_inplace(conv);
        self.units = new_units.to_string();
        Ok(())
    }

    /// Return a new field on the same coordinate with `f` applied to each value.
    pub fn map_values<F: Fn(f64) -> f64>(&self, name: &str, units: &str, f: F) -> Self {
        Self {
            name: name.to_string(),
            units: units.to_string(),
            data: self.data.mapv(f),
            coord: self.coord.clone(),
        }
    }

    /// Combine two fields on the same coordinate element-by-element.
    pub fn zip_with<F: Fn(f64, f64) -> f64>(&self, other: &Self, name: &str, units: &str, f: F) -> Result<Self, FieldError> {
        if self.coord.points.len() != other.coord.points.len() || self.coord.name != other.coord.name {
            return Err(FieldError::CoordMismatch(self.name.clone(), other.name.clone()));
        }
        let data = self.data.iter()
            .zip(other.data.iter())
            .map(|(&a, &b)| f(a, b))
            .collect::<Array1<f64>>();
        Ok(Self { name: name.to_string(), units: units.to_string(), data, coord: self.coord.clone() })
    }

    /// Return a copy with the vertical axis flipped (top of atmosphere first).
    pub fn reversed(&self) -> Self {
        let mut out = self.clone();
        out.data.invert_axis(ndarray::Axis(0));
        out.coord.points.invert_axis(ndarray::Axis(0));
        out
    }
}

/// Work out the units of a table column.
///
/// A bracketed suffix (`Temp[K]`) takes precedence, then `lookup`, then [`DEFAULT_COLUMN_UNITS`].
pub fn infer_column_units(column_name: &str, lookup: fn(&str) -> Option<&'static str>) -> String {
    units::bracketed_unit(column_name)
        .or_else(|| lookup(column_name))
        .unwrap_or(DEFAULT_COLUMN_UNITS)
        .to_string()
}

/// Convert one column of a profile table into a [`PhysicalField`].
///
/// The column's units are inferred by [`infer_column_units`] and the data converted to
/// `si_units`. The table index becomes the vertical coordinate, named `z_name` and
/// converted from kilometers to meters.
pub fn series_to_field(
    table: &ProfileTable,
    column_name: &str,
    field_name: &str,
    si_units: &str,
    z_name: &str,
    lookup: fn(&str) -> Option<&'static str>,
) -> Result<PhysicalField, FieldError> {
    let data = table.column(column_name)
        .ok_or_else(|| FieldError::MissingColumn(column_name.to_string()))?
        .clone();

    let mut coord = VerticalCoord {
        name: z_name.to_string(),
        units: TABLE_INDEX_UNITS.to_string(),
        points: table.index().clone(),
    };
    coord.convert_units("m")?;

    let mut field = PhysicalField {
        name: field_name.to_string(),
        units: infer_column_units(column_name, lookup),
        data,
        coord,
    };
    field.convert_units(si_units)?;
    Ok(field)
}
