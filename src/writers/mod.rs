pub mod namelist;
pub mod cfg_files;
