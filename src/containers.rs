//! Containers holding the atmospheric profiles for one simulation case.
//!
//! A [`ProfileContainer`] loads the profile table for a case once, then computes
//! physical fields from it on request. Every field is computed at most once per
//! container and cached; containers are never modified after construction, so the
//! cached values can not go stale.
//!
//! The same container logic serves PSG and MALBEC inputs. What differs between the
//! two (file name, reader, column names, and units) is described by the
//! [`ProfileSource`] implementations [`PsgSource`] and [`MalbecSource`].
use std::{cell::OnceCell, marker::PhantomData, path::{Path, PathBuf}};

use error_stack::ResultExt;

use crate::{
    constants::PlanetConstants,
    dump::{self, DumpFile, PatchReport},
    error::BodyError,
    fields::{self, FieldError, PhysicalField},
    readers::{malbec_files, psg_files, ProfileTable},
    units,
    utils,
    vertlevs::{VertLevError, VertLevs},
    writers::namelist::NamelistStyle,
};

/// Name given to the vertical coordinate of every field
pub const Z_NAME: &str = "level_height";

/// The fields a container can provide.
///
/// Parses from and displays as snake case, e.g. "potential_temperature".
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::Display, strum::EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum ProfileVariable {
    Height,
    Temperature,
    Pressure,
    HumidityMixingRatio,
    Exner,
    PotentialTemperature,
}

/// Quantities read directly from a profile table column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableQuantity {
    Temperature,
    Pressure,
    Humidity,
}

/// Describes where a kind of profile file lives and how to interpret its columns.
pub trait ProfileSource {
    /// Short name of the source for messages
    const NAME: &'static str;

    /// Path to the profile file for `case` under `data_dir`
    fn profile_path(data_dir: &Path, case: &str) -> PathBuf;

    fn read_table(path: &Path) -> error_stack::Result<ProfileTable, BodyError>;

    /// Units of a column that does not have them in brackets in its name
    fn column_units(column: &str) -> Option<&'static str>;

    /// Column names (without any bracketed unit) that may hold `quantity`, in order of preference
    fn column_candidates(quantity: TableQuantity) -> &'static [&'static str];
}

/// Inputs from NASA-GSFC PSG layer-by-layer profiles (`<case>/<case>_psg_lyr.txt`)
#[derive(Debug, Clone, Copy)]
pub struct PsgSource;

impl ProfileSource for PsgSource {
    const NAME: &'static str = "PSG";

    fn profile_path(data_dir: &Path, case: &str) -> PathBuf {
        data_dir.join(case).join(format!("{case}_psg_lyr.txt"))
    }

    fn read_table(path: &Path) -> error_stack::Result<ProfileTable, BodyError> {
        psg_files::read_psg_lyr_atm_prof(path)
    }

    fn column_units(column: &str) -> Option<&'static str> {
        match column {
            "Alt" => Some("km"),
            "Pressure" => Some("bar"),
            "Temperature" | "Temp" => Some("K"),
            _ => None,
        }
    }

    fn column_candidates(quantity: TableQuantity) -> &'static [&'static str] {
        match quantity {
            TableQuantity::Temperature => &["Temperature", "Temp", "T"],
            TableQuantity::Pressure => &["Pressure", "P"],
            TableQuantity::Humidity => &["H2O"],
        }
    }
}

/// Inputs from MALBEC profile files (`<case>/<case>_malbec.txt`)
#[derive(Debug, Clone, Copy)]
pub struct MalbecSource;

impl ProfileSource for MalbecSource {
    const NAME: &'static str = "MALBEC";

    fn profile_path(data_dir: &Path, case: &str) -> PathBuf {
        data_dir.join(case).join(format!("{case}_malbec.txt"))
    }

    fn read_table(path: &Path) -> error_stack::Result<ProfileTable, BodyError> {
        malbec_files::read_malbec_profiles(path)
    }

    fn column_units(column: &str) -> Option<&'static str> {
        match column {
            "Alt" => Some("km"),
            "P" => Some("bar"),
            "T" => Some("K"),
            "MMW" => Some("g/mol"),
            _ => None,
        }
    }

    fn column_candidates(quantity: TableQuantity) -> &'static [&'static str] {
        match quantity {
            TableQuantity::Temperature => &["T"],
            TableQuantity::Pressure => &["P"],
            TableQuantity::Humidity => &["H2O"],
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    #[error("Could not load the {source_name} profiles for case '{case}'")]
    LoadProfiles { source_name: &'static str, case: String },
    #[error("Could not load the constants for case '{0}'")]
    Constants(String),
    #[error("Could not compute the {variable} field: {cause}")]
    Field { variable: ProfileVariable, cause: FieldError },
    #[error("Could not compute vertical levels: {0}")]
    VertLevs(#[from] VertLevError),
    #[error("Could not write {}", .0.display())]
    Write(PathBuf),
    #[error("Could not read or write the dump {}", .0.display())]
    Dump(PathBuf),
}

pub type MalbecContainer = ProfileContainer<MalbecSource>;
pub type PsgContainer = ProfileContainer<PsgSource>;

/// Atmospheric profiles for one simulation case, with lazily computed fields.
#[derive(Debug)]
pub struct ProfileContainer<S: ProfileSource> {
    sim_case: String,
    data_dir: PathBuf,
    constants: PlanetConstants,
    table: ProfileTable,
    height: OnceCell<PhysicalField>,
    temperature: OnceCell<PhysicalField>,
    pressure: OnceCell<PhysicalField>,
    humidity_mixing_ratio: OnceCell<PhysicalField>,
    exner: OnceCell<PhysicalField>,
    potential_temperature: OnceCell<PhysicalField>,
    source: PhantomData<S>,
}

impl<S: ProfileSource> ProfileContainer<S> {
    /// Load the profiles for `sim_case` from `data_dir` and its constants from `const_dir`.
    pub fn new(sim_case: &str, const_dir: &Path, data_dir: &Path) -> error_stack::Result<Self, ContainerError> {
        let constants = PlanetConstants::load(sim_case, const_dir)
            .change_context_lazy(|| ContainerError::Constants(sim_case.to_string()))?;

        let path = S::profile_path(data_dir, sim_case);
        log::info!("Loading {} profiles from {}", S::NAME, path.display());
        let table = S::read_table(&path)
            .change_context_lazy(|| ContainerError::LoadProfiles { source_name: S::NAME, case: sim_case.to_string() })?;

        Ok(Self::from_parts(sim_case, data_dir, constants, table))
    }

    /// Build a container from an already loaded table and constants.
    pub fn from_parts(sim_case: &str, data_dir: &Path, constants: PlanetConstants, table: ProfileTable) -> Self {
        Self {
            sim_case: sim_case.to_string(),
            data_dir: data_dir.to_path_buf(),
            constants,
            table,
            height: OnceCell::new(),
            temperature: OnceCell::new(),
            pressure: OnceCell::new(),
            humidity_mixing_ratio: OnceCell::new(),
            exner: OnceCell::new(),
            potential_temperature: OnceCell::new(),
            source: PhantomData,
        }
    }

    pub fn sim_case(&self) -> &str {
        &self.sim_case
    }

    pub fn constants(&self) -> &PlanetConstants {
        &self.constants
    }

    pub fn table(&self) -> &ProfileTable {
        &self.table
    }

    /// Default output directory: `<data_dir>/<case>`
    pub fn case_dir(&self) -> PathBuf {
        self.data_dir.join(&self.sim_case)
    }

    /// Return any of the container's fields by name
    pub fn variable(&self, variable: ProfileVariable) -> Result<&PhysicalField, ContainerError> {
        let res = match variable {
            ProfileVariable::Height => self.height(),
            ProfileVariable::Temperature => self.temperature(),
            ProfileVariable::Pressure => self.pressure(),
            ProfileVariable::HumidityMixingRatio => self.humidity_mixing_ratio(),
            ProfileVariable::Exner => self.exner(),
            ProfileVariable::PotentialTemperature => self.potential_temperature(),
        };
        res.map_err(|cause| ContainerError::Field { variable, cause })
    }

    /// Theta level heights in meters
    pub fn height(&self) -> Result<&PhysicalField, FieldError> {
        cached(&self.height, ProfileVariable::Height, || {
            fields::series_to_field(&self.table, self.table.index_name(), Z_NAME, "m", Z_NAME, S::column_units)
        })
    }

    /// Air temperature in K
    pub fn temperature(&self) -> Result<&PhysicalField, FieldError> {
        cached(&self.temperature, ProfileVariable::Temperature, || {
            self.table_field(TableQuantity::Temperature, "air_temperature", "K")
        })
    }

    /// Air pressure in Pa
    pub fn pressure(&self) -> Result<&PhysicalField, FieldError> {
        cached(&self.pressure, ProfileVariable::Pressure, || {
            self.table_field(TableQuantity::Pressure, "air_pressure", "Pa")
        })
    }

    /// Water vapour mixing ratio in kg kg-1
    pub fn humidity_mixing_ratio(&self) -> Result<&PhysicalField, FieldError> {
        cached(&self.humidity_mixing_ratio, ProfileVariable::HumidityMixingRatio, || {
            self.table_field(TableQuantity::Humidity, "humidity_mixing_ratio", "kg kg-1")
        })
    }

    /// Exner function, `(p / p_ref) ^ kappa`
    pub fn exner(&self) -> Result<&PhysicalField, FieldError> {
        cached(&self.exner, ProfileVariable::Exner, || {
            let p_ref = self.constants.reference_surface_pressure;
            let kappa = self.constants.kappa;
            let pressure = self.pressure()?;
            Ok(pressure.map_values("dimensionless_exner_function", "1", |p| (p / p_ref).powf(kappa)))
        })
    }

    /// Potential temperature in K, `T / exner`
    pub fn potential_temperature(&self) -> Result<&PhysicalField, FieldError> {
        cached(&self.potential_temperature, ProfileVariable::PotentialTemperature, || {
            let temperature = self.temperature()?;
            let exner = self.exner()?;
            temperature.zip_with(exner, "air_potential_temperature", "K", |t, pi| t / pi)
        })
    }

    fn table_field(&self, quantity: TableQuantity, field_name: &str, si_units: &str) -> Result<PhysicalField, FieldError> {
        let candidates = S::column_candidates(quantity);
        let column = self.table.column_names()
            .find(|c| candidates.contains(&units::strip_bracketed_unit(c)))
            .ok_or_else(|| FieldError::MissingColumn(candidates.join("/")))?;
        fields::series_to_field(&self.table, column, field_name, si_units, Z_NAME, S::column_units)
    }

    /// Compute the vertical levels from the height profile.
    pub fn vert_levs(&self, first_constant_r_rho_level: i64) -> error_stack::Result<VertLevs, ContainerError> {
        let height = self.variable(ProfileVariable::Height)?;
        let levs = VertLevs::from_heights(&height.data.to_vec(), first_constant_r_rho_level)
            .map_err(ContainerError::from)?;
        Ok(levs)
    }

    /// Write `vertlevs_<case>` to `outdir` (default: [`ProfileContainer::case_dir`]).
    ///
    /// Returns the path written.
    pub fn mk_vert_lev_file(
        &self,
        first_constant_r_rho_level: i64,
        outdir: Option<&Path>,
        style: NamelistStyle,
    ) -> error_stack::Result<PathBuf, ContainerError> {
        let outdir = outdir.map(|p| p.to_path_buf()).unwrap_or_else(|| self.case_dir());
        let out_path = outdir.join(format!("vertlevs_{}", self.sim_case));
        self.vert_levs(first_constant_r_rho_level)?
            .write(&out_path, style)
            .change_context_lazy(|| ContainerError::Write(out_path.clone()))?;
        Ok(out_path)
    }

    /// Save the P-T profile as netCDF for the idealised reconfiguration in the UM.
    ///
    /// Writes `<case>_p_t_profile.nc` to `outdir` (default: [`ProfileContainer::case_dir`])
    /// with `temperature` and `pressure_si` ordered from the top down on an `altitude`
    /// coordinate. Returns the path written.
    #[cfg(feature = "netcdf")]
    pub fn save_p_t_profile(&self, outdir: Option<&Path>) -> error_stack::Result<PathBuf, ContainerError> {
        let outdir = outdir.map(|p| p.to_path_buf()).unwrap_or_else(|| self.case_dir());
        let out_path = outdir.join(format!("{}_p_t_profile.nc", self.sim_case));

        let mut fields_out = vec![];
        for (variable, new_name) in [(ProfileVariable::Temperature, "temperature"), (ProfileVariable::Pressure, "pressure_si")] {
            let mut field = self.variable(variable)?.reversed();
            field.rename(new_name);
            field.coord.name = "altitude".to_string();
            fields_out.push(field);
        }

        let tmp_path = utils::temporary_sibling(&out_path);
        if let Err(e) = write_netcdf_profiles(&tmp_path, &fields_out) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(error_stack::Report::new(e).change_context(ContainerError::Write(out_path)));
        }
        utils::rename_file(&tmp_path, &out_path)
            .change_context_lazy(|| ContainerError::Write(out_path.clone()))?;
        Ok(out_path)
    }

    /// Set a field in a dump to the horizontally uniform values of one of this container's profiles.
    ///
    /// The patched dump is written beside the original as `<name>_mod_<stash_item:03>_<variable>`.
    /// If `inplace` is true, that file then replaces the original and `None` is returned;
    /// otherwise the path to the new file is returned. Either way, the dump is first written
    /// to a temporary file and only renamed into place once complete.
    pub fn replace_profile_in_dump<D: DumpFile>(
        &self,
        path_to_dump: &Path,
        stash_item: i32,
        variable: ProfileVariable,
        inplace: bool,
    ) -> error_stack::Result<(Option<PathBuf>, PatchReport), ContainerError> {
        let profile = self.variable(variable)?;
        let mut ff_dump = D::from_file(path_to_dump)
            .change_context_lazy(|| ContainerError::Dump(path_to_dump.to_path_buf()))?;

        let profile_values = profile.data.to_vec();
        let report = dump::set_fields_to_real(ff_dump.fields_mut(), &profile_values, stash_item);
        log::info!(
            "Replaced {} fields with STASH code {stash_item} using {variable} for case {}",
            report.replaced, self.sim_case
        );

        let mut new_name = path_to_dump.file_name().unwrap_or_default().to_os_string();
        new_name.push(format!("_mod_{stash_item:03}_{variable}"));
        let new_name_full = path_to_dump.with_file_name(new_name);

        let tmp_path = utils::temporary_sibling(&new_name_full);
        if let Err(e) = ff_dump.to_file(&tmp_path) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(e.change_context(ContainerError::Dump(new_name_full)));
        }
        utils::rename_file(&tmp_path, &new_name_full)
            .change_context_lazy(|| ContainerError::Write(new_name_full.clone()))?;

        if inplace {
            utils::rename_file(&new_name_full, path_to_dump)
                .change_context_lazy(|| ContainerError::Write(path_to_dump.to_path_buf()))?;
            Ok((None, report))
        } else {
            Ok((Some(new_name_full), report))
        }
    }
}

/// Return the value in `slot`, computing and storing it first if the slot is empty.
///
/// A failed computation leaves the slot empty.
fn cached<F>(slot: &OnceCell<PhysicalField>, variable: ProfileVariable, compute: F) -> Result<&PhysicalField, FieldError>
where F: FnOnce() -> Result<PhysicalField, FieldError>
{
    if let Some(field) = slot.get() {
        return Ok(field);
    }
    log::debug!("Computing {variable}");
    let field = compute()?;
    Ok(slot.get_or_init(|| field))
}

#[cfg(feature = "netcdf")]
fn write_netcdf_profiles(path: &Path, fields_out: &[PhysicalField]) -> Result<(), netcdf::Error> {
    let mut file = netcdf::create(path)?;
    let Some(first) = fields_out.first() else {
        return Ok(());
    };
    let coord = &first.coord;
    let dim_name = coord.name.as_str();
    file.add_dimension(dim_name, coord.points.len())?;

    let mut var = file.add_variable::<f64>(dim_name, &[dim_name])?;
    var.put_attribute("units", coord.units.as_str())?;
    var.put_values(coord.points.to_vec().as_slice(), netcdf::Extents::All)?;

    for field in fields_out {
        let mut var = file.add_variable::<f64>(&field.name, &[dim_name])?;
        var.put_attribute("units", field.units.as_str())?;
        var.put_values(field.data.to_vec().as_slice(), netcdf::Extents::All)?;
    }
    Ok(())
}
