//! Planetary and atmospheric constants for a simulation case.
//!
//! Constants live in `<const_dir>/<case>.json` as a list of objects:
//!
//! ```json
//! [
//!   {"name": "reference_surface_pressure", "units": "Pa", "value": 100000.0},
//!   {"name": "dry_air_gas_constant", "units": "J kg-1 K-1", "value": 287.05},
//!   {"name": "dry_air_spec_heat_press", "units": "J kg-1 K-1", "value": 1005.0}
//! ]
//! ```
//!
//! Any other constants in the file are kept and can be retrieved by name.
use std::path::{Path, PathBuf};

use error_stack::ResultExt;
use indexmap::IndexMap;
use serde::Deserialize;

use crate::{units, utils};

pub const REFERENCE_SURFACE_PRESSURE: &str = "reference_surface_pressure";
pub const DRY_AIR_GAS_CONSTANT: &str = "dry_air_gas_constant";
pub const DRY_AIR_SPEC_HEAT_PRESS: &str = "dry_air_spec_heat_press";

#[derive(Debug, thiserror::Error)]
pub enum ConstantsError {
    #[error("Could not read constants for case '{case}' from {}", .path.display())]
    CouldNotRead { case: String, path: PathBuf },
    #[error("Constants file {} is not a valid list of constants", .0.display())]
    InvalidFormat(PathBuf),
    #[error("Required constant '{0}' is missing")]
    Missing(&'static str),
    #[error("Constant '{name}' has unusable units or value: {cause}")]
    BadValue { name: String, cause: String },
}

/// One named constant as stored in the JSON file
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Constant {
    pub name: String,
    #[serde(default = "dimensionless")]
    pub units: String,
    pub value: f64,
}

fn dimensionless() -> String {
    "1".to_string()
}

/// The constants needed to derive thermodynamic quantities for one planet/case.
#[derive(Debug, Clone)]
pub struct PlanetConstants {
    pub case: String,
    /// Reference surface pressure in Pa
    pub reference_surface_pressure: f64,
    /// Specific gas constant of dry air, J kg-1 K-1
    pub dry_air_gas_constant: f64,
    /// Specific heat of dry air at constant pressure, J kg-1 K-1
    pub dry_air_spec_heat_press: f64,
    /// `dry_air_gas_constant / dry_air_spec_heat_press`
    pub kappa: f64,
    all: IndexMap<String, Constant>,
}

impl PlanetConstants {
    /// Load the constants for `case` from `<const_dir>/<case>.json`.
    pub fn load(case: &str, const_dir: &Path) -> error_stack::Result<Self, ConstantsError> {
        let path = const_dir.join(format!("{case}.json"));
        let text = utils::read_text_file(&path)
            .change_context_lazy(|| ConstantsError::CouldNotRead { case: case.to_string(), path: path.clone() })?;
        let list: Vec<Constant> = serde_json::from_str(&text)
            .change_context_lazy(|| ConstantsError::InvalidFormat(path.clone()))?;
        let consts = Self::from_constants(case, list)
            .attach_printable_lazy(|| format!("in constants file {}", path.display()))?;
        log::debug!("Loaded {} constants for case {case}, kappa = {}", consts.all.len(), consts.kappa);
        Ok(consts)
    }

    /// Build the constants from an already-parsed list.
    ///
    /// The reference pressure is converted to Pa. Later entries with a repeated name
    /// replace earlier ones.
    pub fn from_constants<I: IntoIterator<Item = Constant>>(case: &str, constants: I) -> Result<Self, ConstantsError> {
        let all: IndexMap<String, Constant> = constants.into_iter()
            .map(|c| (c.name.clone(), c))
            .collect();

        let get = |name: &'static str| all.get(name).ok_or(ConstantsError::Missing(name));

        let p_ref = get(REFERENCE_SURFACE_PRESSURE)?;
        let reference_surface_pressure = units::convert(p_ref.value, &p_ref.units, "Pa")
            .map_err(|e| ConstantsError::BadValue { name: p_ref.name.clone(), cause: e.to_string() })?;
        let dry_air_gas_constant = get(DRY_AIR_GAS_CONSTANT)?.value;
        let dry_air_spec_heat_press = get(DRY_AIR_SPEC_HEAT_PRESS)?.value;

        if reference_surface_pressure <= 0.0 {
            return Err(ConstantsError::BadValue {
                name: REFERENCE_SURFACE_PRESSURE.to_string(),
                cause: format!("must be positive, got {reference_surface_pressure}"),
            });
        }
        if dry_air_spec_heat_press == 0.0 {
            return Err(ConstantsError::BadValue {
                name: DRY_AIR_SPEC_HEAT_PRESS.to_string(),
                cause: "must not be zero".to_string(),
            });
        }

        Ok(Self {
            case: case.to_string(),
            reference_surface_pressure,
            dry_air_gas_constant,
            dry_air_spec_heat_press,
            kappa: dry_air_gas_constant / dry_air_spec_heat_press,
            all,
        })
    }

    /// Look up any constant from the file by name
    pub fn get(&self, name: &str) -> Option<&Constant> {
        self.all.get(name)
    }
}
