//! Writing PSG configuration values back out as text.
use std::{io::Write, path::Path};

use error_stack::ResultExt;

use crate::{error::WriteError, readers::psg_files::PsgConfig, utils};

/// Write a configuration in the tagged `<KEY>value` layout, one entry per line.
///
/// Reading the output with [`crate::readers::psg_files::parse_psg_cfg`] gives back the
/// same configuration.
pub fn write_cfg_tagged<W: Write>(mut f: W, cfg: &PsgConfig) -> error_stack::Result<(), WriteError> {
    for (key, value) in cfg.iter() {
        writeln!(f, "<{key}>{value}")
            .change_context_lazy(|| WriteError::convert_error(format!("could not write config key {key}")))?;
    }
    Ok(())
}

/// Write a configuration as `key = value` lines.
///
/// If `keys` is given, only those keys are written, in the order given. Asking for a key
/// that is not in the configuration is an error.
pub fn write_cfg_key_values<W: Write>(mut f: W, cfg: &PsgConfig, keys: Option<&[String]>) -> error_stack::Result<(), WriteError> {
    match keys {
        Some(keys) => {
            for key in keys {
                let value = cfg.get(key)
                    .ok_or_else(|| WriteError::convert_error(format!("key '{key}' is not in the configuration")))?;
                writeln!(f, "{key} = {value}")
                    .change_context_lazy(|| WriteError::convert_error(format!("could not write config key {key}")))?;
            }
        },
        None => {
            for (key, value) in cfg.iter() {
                writeln!(f, "{key} = {value}")
                    .change_context_lazy(|| WriteError::convert_error(format!("could not write config key {key}")))?;
            }
        }
    }
    Ok(())
}

/// Output layouts for [`write_cfg_file`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CfgLayout {
    Tagged,
    KeyValue,
}

/// Write a configuration to `path`, replacing any existing file.
pub fn write_cfg_file(path: &Path, cfg: &PsgConfig, layout: CfgLayout, keys: Option<&[String]>) -> error_stack::Result<(), WriteError> {
    let mut buf = vec![];
    match layout {
        CfgLayout::Tagged => write_cfg_tagged(&mut buf, cfg)?,
        CfgLayout::KeyValue => write_cfg_key_values(&mut buf, cfg, keys)?,
    }
    log::debug!("Writing {} bytes of configuration to {}", buf.len(), path.display());
    utils::write_atomically(path, |w| w.write_all(&buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::scratch_dir;
    use crate::readers::psg_files::{parse_psg_cfg, CfgParseMode, CfgValue};

    fn example_cfg() -> PsgConfig {
        [
            ("OBJECT", CfgValue::Text("Exoplanet".into())),
            ("ATMOSPHERE-LAYERS", CfgValue::Integer(5)),
            ("ATMOSPHERE-PRESSURE", CfgValue::Float(1.0)),
            ("GENERATOR-RANGE1", CfgValue::Float(1.5e-5)),
            ("ATMOSPHERE-GAS", CfgValue::Text(" H2O,CO2".into())),
        ].into_iter().collect()
    }

    #[test]
    fn test_tagged_round_trip() {
        let cfg = example_cfg();
        let mut buf = vec![];
        write_cfg_tagged(&mut buf, &cfg).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("<OBJECT>Exoplanet\n<ATMOSPHERE-LAYERS>5\n<ATMOSPHERE-PRESSURE>1.0\n"));

        let reparsed = parse_psg_cfg(&text, "test".into(), CfgParseMode::Strict).unwrap();
        assert_eq!(reparsed, cfg);

        let mut buf2 = vec![];
        write_cfg_tagged(&mut buf2, &reparsed).unwrap();
        assert_eq!(String::from_utf8(buf2).unwrap(), text);
    }

    #[test]
    fn test_key_values() {
        let cfg = example_cfg();
        let mut buf = vec![];
        let keys = vec!["ATMOSPHERE-PRESSURE".to_string(), "OBJECT".to_string()];
        write_cfg_key_values(&mut buf, &cfg, Some(keys.as_slice())).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "ATMOSPHERE-PRESSURE = 1.0\nOBJECT = Exoplanet\n");

        let mut buf = vec![];
        write_cfg_key_values(&mut buf, &cfg, None).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap().lines().count(), 5);

        let mut buf = vec![];
        let missing = vec!["NOPE".to_string()];
        assert!(write_cfg_key_values(&mut buf, &cfg, Some(missing.as_slice())).is_err());
    }

    #[test]
    fn test_write_cfg_file() {
        let dir = scratch_dir("cfg");
        let path = dir.join("cfg.txt");
        write_cfg_file(&path, &example_cfg(), CfgLayout::Tagged, None).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 5);
        assert!(!utils::temporary_sibling(&path).exists());
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
