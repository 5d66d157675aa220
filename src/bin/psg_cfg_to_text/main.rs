use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use clap_verbosity_flag::{Verbosity, WarnLevel};
use error_stack::ResultExt;
use um_atmos::{
    logging::init_logging,
    readers::psg_files::{read_psg_cfg, CfgParseMode},
    writers::cfg_files::{write_cfg_file, CfgLayout},
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
    let mode = if clargs.strict { CfgParseMode::Strict } else { CfgParseMode::Lenient };
    let cfg = read_psg_cfg(&clargs.config, mode)
        .change_context_lazy(|| CliError::Read(clargs.config.clone()))?;
    log::info!("Read {} entries from {}", cfg.len(), clargs.config.display());

    let layout = if clargs.tagged { CfgLayout::Tagged } else { CfgLayout::KeyValue };
    let keys = if clargs.keys.is_empty() { None } else { Some(clargs.keys.as_slice()) };
    write_cfg_file(&clargs.output, &cfg, layout, keys)
        .change_context_lazy(|| CliError::Write(clargs.output.clone()))?;
    Ok(())
}

/// Rewrite a PSG configuration file as "KEY = value" lines.
///
/// Values are typed as they are read (integer, then float, then text), so numbers
/// are written back in a normalized form.
#[derive(Debug, Parser)]
struct Cli {
    /// The PSG configuration file to read
    config: PathBuf,

    /// Where to write the converted configuration
    output: PathBuf,

    /// Only write these keys, in the order given. By default all keys are
    /// written in file order. Cannot be combined with --tagged.
    #[clap(short, long, num_args = 1.., conflicts_with = "tagged")]
    keys: Vec<String>,

    /// Fail on lines that are not <KEY>value pairs instead of skipping them
    #[clap(long)]
    strict: bool,

    /// Write <KEY>value lines (the PSG layout) instead of KEY = value
    #[clap(long)]
    tagged: bool,

    #[command(flatten)]
    verbosity: Verbosity<WarnLevel>,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("Could not read PSG configuration {}", .0.display())]
    Read(PathBuf),
    #[error("Could not write {}", .0.display())]
    Write(PathBuf),
}
