//! Modifying fields in UM dumps (fields files).
//!
//! This crate does not read or write the binary dump format itself. Anything that can
//! load a dump into a list of [`Field`]s and save it back can implement [`DumpFile`]
//! and be used with [`set_fields_to_real`] or
//! [`crate::containers::ProfileContainer::replace_profile_in_dump`].
use std::path::Path;

use ndarray::Array2;

/// One 2D field of a dump.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// STASH code identifying the variable this field holds
    pub lbuser4: i32,
    /// Model level this field belongs to, as recorded in the field header
    pub lblev: i32,
    pub data: Array2<f64>,
}

impl Field {
    pub fn new(lbuser4: i32, lblev: i32, data: Array2<f64>) -> Self {
        Self { lbuser4, lblev, data }
    }
}

/// An in-memory dump: an ordered list of fields that can be loaded from and saved to disk.
pub trait DumpFile: Sized {
    type Error: error_stack::Context;

    fn from_file(path: &Path) -> error_stack::Result<Self, Self::Error>;

    fn to_file(&self, path: &Path) -> error_stack::Result<(), Self::Error>;

    fn fields(&self) -> &[Field];

    fn fields_mut(&mut self) -> &mut [Field];
}

/// A transformation producing a new field from an existing one.
pub trait FieldOperator {
    fn transform(&self, source: &Field) -> Array2<f64>;

    /// Apply the operator, returning a new field with the same header.
    fn apply(&self, field: &Field) -> Field {
        Field { data: self.transform(field), ..field.clone() }
    }
}

/// Multiplies every point of a field by a constant.
#[derive(Debug, Clone, Copy)]
pub struct ScaleFactorOperator(pub f64);

impl FieldOperator for ScaleFactorOperator {
    fn transform(&self, source: &Field) -> Array2<f64> {
        source.data.mapv(|v| v * self.0)
    }
}

/// Adds a constant to every point of a field.
#[derive(Debug, Clone, Copy)]
pub struct AddScalarOperator(pub f64);

impl FieldOperator for AddScalarOperator {
    fn transform(&self, source: &Field) -> Array2<f64> {
        source.data.mapv(|v| v + self.0)
    }
}

/// The outcome of [`set_fields_to_real`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchReport {
    /// Number of fields whose data were replaced
    pub replaced: usize,
    /// 0-based levels that matched the STASH code but had no value in the profile
    pub skipped_levels: Vec<usize>,
}

/// Set fields to horizontally uniform values taken from a 1D profile.
///
/// Fields are visited in file order; the n-th field whose `lbuser4` equals `lbuser4`
/// is replaced by `profile[n]` everywhere. This lets a 3D variable, stored as one 2D
/// field per level, be initialised from a profile with one value per level. The
/// replacement zeroes the field then adds the value, so the original data do not
/// contribute.
///
/// If the profile has fewer values than there are matching fields, the extra fields are
/// left unchanged, a warning is logged for each, and their levels are listed in
/// [`PatchReport::skipped_levels`]. This is not treated as an error.
pub fn set_fields_to_real(fields: &mut [Field], profile: &[f64], lbuser4: i32) -> PatchReport {
    let zero_operator = ScaleFactorOperator(0.0);
    let mut report = PatchReport::default();
    let mut ilev = 0;
    for field in fields.iter_mut().filter(|f| f.lbuser4 == lbuser4) {
        if let Some(&value) = profile.get(ilev) {
            let value_operator = AddScalarOperator(value);
            *field = value_operator.apply(&zero_operator.apply(field));
            report.replaced += 1;
        } else {
            log::warn!("Skipping level {ilev:>3}");
            report.skipped_levels.push(ilev);
        }
        ilev += 1;
    }
    report
}

#[cfg(test)]
pub(crate) mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::test_utils::scratch_dir;
    use ndarray::array;

    #[derive(Debug, thiserror::Error)]
    #[error("test dump I/O failed for {0}")]
    pub(crate) struct TestDumpError(pub PathBuf);

    /// A stand-in dump format: one line per field, "lbuser4 lblev nrow ncol v1 v2 ..."
    #[derive(Debug, Clone, PartialEq)]
    pub(crate) struct TextDump {
        pub fields: Vec<Field>,
    }

    impl DumpFile for TextDump {
        type Error = TestDumpError;

        fn from_file(path: &Path) -> error_stack::Result<Self, Self::Error> {
            let err = || TestDumpError(path.to_path_buf());
            let text = std::fs::read_to_string(path).map_err(|_| err())?;
            let mut fields = vec![];
            for line in text.lines() {
                let parts: Vec<f64> = line.split_whitespace()
                    .map(|s| s.parse::<f64>())
                    .collect::<Result<_, _>>()
                    .map_err(|_| err())?;
                if parts.len() < 4 {
                    return Err(err().into());
                }
                let (nrow, ncol) = (parts[2] as usize, parts[3] as usize);
                let data = Array2::from_shape_vec((nrow, ncol), parts[4..].to_vec()).map_err(|_| err())?;
                fields.push(Field::new(parts[0] as i32, parts[1] as i32, data));
            }
            Ok(Self { fields })
        }

        fn to_file(&self, path: &Path) -> error_stack::Result<(), Self::Error> {
            let mut out = String::new();
            for f in &self.fields {
                let (nrow, ncol) = f.data.dim();
                out.push_str(&format!("{} {} {nrow} {ncol}", f.lbuser4, f.lblev));
                for v in f.data.iter() {
                    out.push_str(&format!(" {v}"));
                }
                out.push('\n');
            }
            std::fs::write(path, out).map_err(|_| TestDumpError(path.to_path_buf()).into())
        }

        fn fields(&self) -> &[Field] {
            &self.fields
        }

        fn fields_mut(&mut self) -> &mut [Field] {
            &mut self.fields
        }
    }

    fn field(lbuser4: i32, lblev: i32, fill: f64) -> Field {
        Field::new(lbuser4, lblev, Array2::from_elem((2, 3), fill))
    }

    #[test]
    fn test_operators_compose() {
        let f = Field::new(4, 1, array![[1.0, -2.0], [3.5, 100.0]]);
        let out = AddScalarOperator(7.0).apply(&ScaleFactorOperator(0.0).apply(&f));
        assert_eq!(out.data, Array2::from_elem((2, 2), 7.0));
        assert_eq!(out.lbuser4, 4);
        assert_eq!(out.lblev, 1);
    }

    #[test]
    fn test_short_profile() {
        let mut fields = (1..=5).map(|lev| field(4, lev, -1.0)).collect::<Vec<_>>();
        let report = set_fields_to_real(&mut fields, &[300.0, 290.0, 280.0], 4);

        assert_eq!(report.replaced, 3);
        assert_eq!(report.skipped_levels, vec![3, 4]);
        assert_eq!(fields[0].data, Array2::from_elem((2, 3), 300.0));
        assert_eq!(fields[2].data, Array2::from_elem((2, 3), 280.0));
        assert_eq!(fields[3].data, Array2::from_elem((2, 3), -1.0));
        assert_eq!(fields[4].data, Array2::from_elem((2, 3), -1.0));
    }

    #[test]
    fn test_only_matching_codes() {
        let mut fields = vec![field(2, 1, 5.0), field(4, 1, 5.0), field(3, 1, 5.0), field(4, 2, 5.0)];
        let report = set_fields_to_real(&mut fields, &[10.0, 20.0, 30.0], 4);
        assert_eq!(report, PatchReport { replaced: 2, skipped_levels: vec![] });
        assert_eq!(fields[0].data, Array2::from_elem((2, 3), 5.0));
        assert_eq!(fields[1].data, Array2::from_elem((2, 3), 10.0));
        assert_eq!(fields[2].data, Array2::from_elem((2, 3), 5.0));
        assert_eq!(fields[3].data, Array2::from_elem((2, 3), 20.0));
    }

    #[test]
    fn test_text_dump_io() {
        let dir = scratch_dir("dump");
        let path = dir.join("dump.txt");
        let dump = TextDump { fields: vec![field(4, 1, 1.5), field(10, 1, 0.25)] };
        dump.to_file(&path).unwrap();
        let back = TextDump::from_file(&path).unwrap();
        assert_eq!(back, dump);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
