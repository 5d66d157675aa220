//! General utilities, not particular to any file format or conversion step.
use std::ffi::OsString;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use error_stack::ResultExt;

use crate::error::{BodyError, WriteError};

/// Read an entire text file into memory.
///
/// All of the readers in this crate work on whole files, so this is the single
/// point where input files are opened. The returned error will indicate which
/// file could not be read and why.
pub fn read_text_file(path: &Path) -> error_stack::Result<String, BodyError> {
    std::fs::read_to_string(path)
        .map_err(|e| BodyError::could_not_read(path, e))
        .attach_printable_lazy(|| format!("while reading {}", path.display()))
}

/// Return the path of the temporary file used while writing `path`.
///
/// The temporary file lives in the same directory as the final file so that the
/// closing rename never crosses a filesystem boundary.
pub fn temporary_sibling(path: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(path.file_name().unwrap_or_default());
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write a file by first writing a temporary sibling, then renaming it over `path`.
///
/// `write_fn` receives a buffered writer to the temporary file. If it (or the final
/// flush) fails, the temporary file is removed and `path` is left untouched. Any existing
/// file at `path` is replaced only once the complete contents are on disk.
pub fn write_atomically<F>(path: &Path, write_fn: F) -> error_stack::Result<(), WriteError>
where
    F: FnOnce(&mut BufWriter<File>) -> std::io::Result<()>,
{
    let tmp_path = temporary_sibling(path);
    let result = write_to_new_file(&tmp_path, write_fn);
    if let Err(e) = result {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(e.attach_printable(format!("while writing {}", path.display())));
    }

    rename_file(&tmp_path, path)
}

fn write_to_new_file<F>(path: &Path, write_fn: F) -> error_stack::Result<(), WriteError>
where
    F: FnOnce(&mut BufWriter<File>) -> std::io::Result<()>,
{
    let f = File::create(path).map_err(|e| WriteError::could_not_write(path, e))?;
    let mut writer = BufWriter::new(f);
    write_fn(&mut writer).map_err(|e| WriteError::could_not_write(path, e))?;
    writer.flush().map_err(|e| WriteError::could_not_write(path, e))?;
    writer
        .get_ref()
        .sync_all()
        .map_err(|e| WriteError::could_not_write(path, e))?;
    Ok(())
}

/// Move `from` to `to`, replacing `to` if it exists.
pub fn rename_file(from: &Path, to: &Path) -> error_stack::Result<(), WriteError> {
    std::fs::rename(from, to).map_err(|e| {
        WriteError::CouldNotRename { from: from.to_path_buf(), to: to.to_path_buf(), cause: e.to_string() }
            .into()
    })
}

/// Format a float the way Python's `repr` does.
///
/// This is the shortest string that round-trips to the same value, in positional notation
/// when the decimal exponent is in `-4..16` and scientific notation (with a signed, at least
/// two digit exponent) otherwise. Rust's `Display` differs for large and small magnitudes.
pub fn python_float_repr(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf".to_string() } else { "-inf".to_string() };
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0.0".to_string() } else { "0.0".to_string() };
    }

    // LowerExp gives the shortest round-trip digits, e.g. "-1.25e-7"
    let sci = format!("{value:e}");
    let (mantissa, exponent) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let sign = if mantissa.starts_with('-') { "-" } else { "" };
    let digits: String = mantissa.chars().filter(|c| c.is_ascii_digit()).collect();

    if (-4..16).contains(&exponent) {
        if exponent >= 0 {
            let n_int = exponent as usize + 1;
            if digits.len() > n_int {
                format!("{sign}{}.{}", &digits[..n_int], &digits[n_int..])
            } else {
                let zeros = "0".repeat(n_int - digits.len());
                format!("{sign}{digits}{zeros}.0")
            }
        } else {
            let zeros = "0".repeat((-exponent - 1) as usize);
            format!("{sign}0.{zeros}{digits}")
        }
    } else {
        let mantissa = if digits.len() > 1 {
            format!("{}.{}", &digits[..1], &digits[1..])
        } else {
            digits
        };
        let exp_sign = if exponent < 0 { '-' } else { '+' };
        format!("{sign}{mantissa}e{exp_sign}{:02}", exponent.abs())
    }
}

/// Format a float in scientific notation with `precision` decimals, Python style.
///
/// Equivalent to Python's `f"{value:.{precision}e}"`: the exponent always carries a sign and
/// at least two digits (`1.0000000e+00`), which Rust's `LowerExp` does not do on its own.
pub fn python_sci(value: f64, precision: usize) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf".to_string() } else { "-inf".to_string() };
    }

    let s = format!("{value:.precision$e}");
    let (mantissa, exponent) = s.split_once('e').unwrap_or((s.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let exp_sign = if exponent < 0 { '-' } else { '+' };
    format!("{mantissa}e{exp_sign}{:02}", exponent.abs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::scratch_dir;

    #[test]
    fn test_python_float_repr() {
        assert_eq!(python_float_repr(85000.0), "85000.0");
        assert_eq!(python_float_repr(0.5), "0.5");
        assert_eq!(python_float_repr(0.0125), "0.0125");
        assert_eq!(python_float_repr(-3.25), "-3.25");
        assert_eq!(python_float_repr(1e-5), "1e-05");
        assert_eq!(python_float_repr(1.5e-7), "1.5e-07");
        assert_eq!(python_float_repr(1e16), "1e+16");
        assert_eq!(python_float_repr(0.1), "0.1");
        assert_eq!(python_float_repr(0.0001), "0.0001");
        assert_eq!(python_float_repr(0.0), "0.0");
    }

    #[test]
    fn test_python_sci() {
        assert_eq!(python_sci(1.0, 7), "1.0000000e+00");
        assert_eq!(python_sci(85000.0, 7), "8.5000000e+04");
        assert_eq!(python_sci(-0.125, 7), "-1.2500000e-01");
        assert_eq!(python_sci(0.0, 7), "0.0000000e+00");
        assert_eq!(python_sci(1.5e-120, 2), "1.50e-120");
    }

    #[test]
    fn test_write_atomically() {
        let dir = scratch_dir("utils");
        let path = dir.join("atomic.txt");
        std::fs::write(&path, "old contents").unwrap();

        write_atomically(&path, |w| write!(w, "new contents")).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new contents");
        assert!(!temporary_sibling(&path).exists(), "temporary file should be gone after the rename");

        let res = write_atomically(&path, |_| Err(std::io::Error::other("simulated failure")));
        assert!(res.is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new contents", "failed write must not touch the target");
        assert!(!temporary_sibling(&path).exists());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
