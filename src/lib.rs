//! Conversion of PSG and MALBEC atmospheric profiles into Unified Model inputs.
//!
//! Profiles are read into [`readers::ProfileTable`]s, wrapped in a
//! [`containers::ProfileContainer`] that derives physical fields from them, and
//! written out as `VERTLEVS` namelists ([`vertlevs`]) or patched into model dumps
//! ([`dump`]).
pub mod error;
pub mod utils;
pub mod units;
pub mod readers;
pub mod fields;
pub mod constants;
pub mod config;
pub mod writers;
pub mod vertlevs;
pub mod dump;
pub mod containers;
pub mod logging;

#[cfg(test)]
mod test_utils;
