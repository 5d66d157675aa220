//! Vertical level definitions (`VERTLEVS` namelists) for the UM.
use std::path::Path;

use itertools::Itertools;

use crate::{error::WriteError, writers::namelist::{NamelistGroup, NamelistStyle}};

pub const VERTLEVS_GROUP: &str = "VERTLEVS";

#[derive(Debug, thiserror::Error)]
pub enum VertLevError {
    #[error("At least one level is required")]
    NoLevels,
    #[error("The model top must be a finite, non-zero height, got {0}")]
    InvalidTop(f64),
}

/// Normalized theta and rho level heights plus the model lid height.
#[derive(Debug, Clone, PartialEq)]
pub struct VertLevs {
    /// Height of the model lid in meters
    pub z_top_of_model: f64,
    pub first_constant_r_rho_level: i64,
    /// Theta level heights as a fraction of `z_top_of_model`
    pub eta_theta: Vec<f64>,
    /// Rho level heights, halfway between consecutive theta levels; always one shorter than `eta_theta`
    pub eta_rho: Vec<f64>,
}

impl VertLevs {
    /// Compute levels from theta level heights in meters, lowest first.
    ///
    /// The last height is taken as the top of the model.
    pub fn from_heights(heights: &[f64], first_constant_r_rho_level: i64) -> Result<Self, VertLevError> {
        let z_top = *heights.last().ok_or(VertLevError::NoLevels)?;
        if z_top == 0.0 || !z_top.is_finite() {
            return Err(VertLevError::InvalidTop(z_top));
        }

        if heights.iter().tuple_windows().any(|(a, b)| b < a) {
            log::warn!("Level heights are not in ascending order, the eta values will not be monotonic");
        }

        let eta_theta = heights.iter().map(|h| h / z_top).collect_vec();
        Ok(Self::from_eta_theta(z_top, eta_theta, first_constant_r_rho_level))
    }

    /// Evenly spaced levels from the surface to `z_top_of_model`.
    pub fn uniform(nlevs: usize, z_top_of_model: f64, first_constant_r_rho_level: i64) -> Result<Self, VertLevError> {
        if nlevs == 0 {
            return Err(VertLevError::NoLevels);
        }
        if z_top_of_model == 0.0 || !z_top_of_model.is_finite() {
            return Err(VertLevError::InvalidTop(z_top_of_model));
        }

        let eta_theta = if nlevs == 1 {
            vec![0.0]
        } else {
            ndarray::Array1::linspace(0.0, 1.0, nlevs).to_vec()
        };
        Ok(Self::from_eta_theta(z_top_of_model, eta_theta, first_constant_r_rho_level))
    }

    fn from_eta_theta(z_top_of_model: f64, eta_theta: Vec<f64>, first_constant_r_rho_level: i64) -> Self {
        let eta_rho = eta_theta.iter()
            .tuple_windows()
            .map(|(a, b)| 0.5 * (a + b))
            .collect_vec();
        Self { z_top_of_model, first_constant_r_rho_level, eta_theta, eta_rho }
    }

    pub fn nlevs(&self) -> usize {
        self.eta_theta.len()
    }

    pub fn to_namelist(&self) -> NamelistGroup {
        NamelistGroup::new(VERTLEVS_GROUP)
            .with("z_top_of_model", self.z_top_of_model)
            .with("first_constant_r_rho_level", self.first_constant_r_rho_level)
            .with("eta_theta", self.eta_theta.clone())
            .with("eta_rho", self.eta_rho.clone())
    }

    /// Write the levels as a `VERTLEVS` namelist file, replacing any existing file.
    pub fn write(&self, path: &Path, style: NamelistStyle) -> error_stack::Result<(), WriteError> {
        log::info!("Writing {} vertical levels (lid at {} m) to {}", self.nlevs(), self.z_top_of_model, path.display());
        self.to_namelist().write(path, style)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::scratch_dir;
    use approx::assert_abs_diff_eq;

    fn check_invariants(levs: &VertLevs) {
        assert_eq!(levs.eta_rho.len(), levs.eta_theta.len() - 1);
        for (a, b) in levs.eta_theta.iter().tuple_windows() {
            assert!(b >= a, "eta_theta must be non-decreasing");
        }
        for v in levs.eta_theta.iter().chain(levs.eta_rho.iter()) {
            assert!((0.0..=1.0).contains(v), "eta value {v} out of [0, 1]");
        }
    }

    #[test]
    fn test_from_heights() {
        let levs = VertLevs::from_heights(&[0.0, 1000.0, 3000.0, 4000.0], 1).unwrap();
        check_invariants(&levs);
        assert_abs_diff_eq!(levs.z_top_of_model, 4000.0);
        assert_eq!(levs.eta_theta, vec![0.0, 0.25, 0.75, 1.0]);
        assert_eq!(levs.eta_rho, vec![0.125, 0.5, 0.875]);
    }

    #[test]
    fn test_uniform() {
        let levs = VertLevs::uniform(5, 85000.0, 2).unwrap();
        check_invariants(&levs);
        assert_eq!(levs.eta_theta, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(levs.first_constant_r_rho_level, 2);
        assert_abs_diff_eq!(levs.eta_rho[3], 0.875);

        let levs = VertLevs::uniform(1, 85000.0, 1).unwrap();
        assert_eq!(levs.eta_theta, vec![0.0]);
        assert!(levs.eta_rho.is_empty());
    }

    #[test]
    fn test_errors() {
        assert!(matches!(VertLevs::from_heights(&[], 1), Err(VertLevError::NoLevels)));
        assert!(matches!(VertLevs::from_heights(&[0.0, 0.0], 1), Err(VertLevError::InvalidTop(_))));
        assert!(matches!(VertLevs::uniform(0, 1000.0, 1), Err(VertLevError::NoLevels)));
        assert!(matches!(VertLevs::uniform(10, f64::NAN, 1), Err(VertLevError::InvalidTop(_))));
    }

    #[test]
    fn test_write_both_styles() {
        let dir = scratch_dir("vertlevs");
        let levs = VertLevs::uniform(3, 1000.0, 1).unwrap();

        let free = dir.join("vertlevs_free");
        levs.write(&free, NamelistStyle::Free).unwrap();
        let text = std::fs::read_to_string(&free).unwrap();
        assert_eq!(text, "&vertlevs\n    eta_rho = 0.25, 0.75\n    eta_theta = 0.0, 0.5, 1.0\n    first_constant_r_rho_level = 1\n    z_top_of_model = 1000.0\n/\n");

        let fixed = dir.join("vertlevs_fixed");
        levs.write(&fixed, NamelistStyle::FixedWidth).unwrap();
        let text = std::fs::read_to_string(&fixed).unwrap();
        assert!(text.starts_with("&VERTLEVS\n z_top_of_model             =    1.0000000e+03,\n"));
        assert!(text.ends_with("\n/"));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
