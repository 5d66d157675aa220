use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use error_stack::ResultExt;
use um_atmos::{
    config::PathsConfig,
    containers::{MalbecSource, ProfileSource},
    fields::{self, TABLE_INDEX_UNITS},
    logging::init_logging,
    readers::malbec_files,
    vertlevs::VertLevs,
    writers::namelist::NamelistStyle,
};

fn main() -> ExitCode {
    let clargs = Cli::parse();
    if let Err(e) = init_logging(clargs.verbosity.log_level_filter(), None) {
        eprintln!("WARNING: could not set up logging: {e}");
    }

    if let Err(e) = driver(clargs) {
        eprintln!("ERROR: {e:?}");
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn driver(clargs: Cli) -> error_stack::Result<(), CliError> {
    let levs = match clargs.level_type {
        LevelType::Uniform => {
            let nlevs = clargs.nlevs.ok_or(CliError::MissingArgument("--nlevs"))?;
            let z_top = clargs.z_top_of_model.ok_or(CliError::MissingArgument("--z_top_of_model"))?;
            VertLevs::uniform(nlevs, z_top, clargs.first_const_r_rho_lev)
                .change_context(CliError::Levels)?
        },
        LevelType::Malbec => {
            let data_dir = match clargs.data_dir {
                Some(dir) => dir,
                None => PathsConfig::load_or_default(clargs.paths_config.as_deref())
                    .change_context(CliError::Config)?
                    .data_dir,
            };
            malbec_levels(&data_dir, &clargs.case, clargs.first_const_r_rho_lev)?
        },
    };

    let style = if clargs.fixed_width { NamelistStyle::FixedWidth } else { clargs.style };
    levs.write(&clargs.outfile, style)
        .change_context_lazy(|| CliError::Write(clargs.outfile.clone()))?;
    log::info!("Wrote {}", clargs.outfile.display());
    Ok(())
}

/// Levels at the altitudes of a MALBEC case's profiles. Only the profile file is read,
/// the case's constants are not needed.
fn malbec_levels(data_dir: &std::path::Path, case: &str, first_const_r_rho_lev: i64) -> error_stack::Result<VertLevs, CliError> {
    let profile_file = MalbecSource::profile_path(data_dir, case);
    let table = malbec_files::read_malbec_profiles(&profile_file)
        .change_context_lazy(|| CliError::Read(profile_file.clone()))?;

    let mut heights = fields::VerticalCoord {
        name: table.index_name().to_string(),
        units: TABLE_INDEX_UNITS.to_string(),
        points: table.index().clone(),
    };
    heights.convert_units("m")
        .change_context_lazy(|| CliError::Read(profile_file.clone()))?;

    VertLevs::from_heights(&heights.points.to_vec(), first_const_r_rho_lev)
        .change_context(CliError::Levels)
}

/// Create a VERTLEVS namelist file for the UM, either with uniformly spaced levels
/// or with levels at the altitudes of a MALBEC profile.
///
/// Examples:
///
///     mk_vert_lev_file -o vertlevs_L42_85km -t uniform -c T1A -n 42 -r 1 -z 85000
///
///     mk_vert_lev_file -o vertlevs_L58_99km -t malbec -c T1A -r 1
#[derive(Debug, Parser)]
struct Cli {
    /// Output file
    #[clap(short, long)]
    outfile: PathBuf,

    /// Type of vertical levels
    #[clap(short = 't', long = "type", value_enum)]
    level_type: LevelType,

    /// MALBEC case
    #[clap(short, long)]
    case: String,

    /// Number of levels, required for uniform levels
    #[clap(short, long, required_if_eq("level_type", "uniform"))]
    nlevs: Option<usize>,

    /// First constant R rho level
    #[clap(short = 'r', long = "first_const_r_rho_lev", default_value_t = 1)]
    first_const_r_rho_lev: i64,

    /// Model lid height in metres, required for uniform levels
    #[clap(short = 'z', long = "z_top_of_model", required_if_eq("level_type", "uniform"))]
    z_top_of_model: Option<f64>,

    /// Layout of the namelist: list-directed ("free") or 16 character .7e values,
    /// 5 per line ("fixed-width").
    #[clap(short, long, value_enum, default_value_t = NamelistStyle::Free)]
    style: NamelistStyle,

    /// Shorthand for --style fixed-width
    #[clap(long, conflicts_with = "style")]
    fixed_width: bool,

    /// TOML file giving the data directories. See the `config` module documentation
    /// for the keys.
    #[clap(long)]
    paths_config: Option<PathBuf>,

    /// Directory containing the per-case MALBEC inputs. Overrides --paths-config.
    #[clap(long)]
    data_dir: Option<PathBuf>,

    #[command(flatten)]
    verbosity: Verbosity<InfoLevel>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum LevelType {
    Uniform,
    Malbec,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("{0} is required for uniform levels")]
    MissingArgument(&'static str),
    #[error("Could not load the paths configuration")]
    Config,
    #[error("Could not read MALBEC profiles from {}", .0.display())]
    Read(PathBuf),
    #[error("Could not compute the vertical levels")]
    Levels,
    #[error("Could not write the vertical levels to {}", .0.display())]
    Write(PathBuf),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_option() {
        let clargs = Cli::try_parse_from(["mk_vert_lev_file", "-o", "out", "-t", "malbec", "-c", "T1A"]).unwrap();
        assert_eq!(clargs.style, NamelistStyle::Free);
        assert!(!clargs.fixed_width);

        let clargs = Cli::try_parse_from([
            "mk_vert_lev_file", "-o", "out", "-t", "uniform", "-c", "T1A", "-n", "42", "-z", "85000", "--style", "fixed-width",
        ]).unwrap();
        assert_eq!(clargs.style, NamelistStyle::FixedWidth);
        assert_eq!(clargs.nlevs, Some(42));

        let res = Cli::try_parse_from(["mk_vert_lev_file", "-o", "out", "-t", "malbec", "-c", "T1A", "--style", "free", "--fixed-width"]);
        assert!(res.is_err(), "--style and --fixed-width should conflict");
    }

    #[test]
    fn test_uniform_needs_levels() {
        let res = Cli::try_parse_from(["mk_vert_lev_file", "-o", "out", "-t", "uniform", "-c", "T1A", "-z", "85000"]);
        assert!(res.is_err(), "uniform levels without --nlevs should be rejected");
    }
}
