use anyhow::{Context, Result};
use std::env;
use std::fs;
use std::path::PathBuf;

const APP_DIR: &str = "scrobsync";
const STORE_FILE: &str = "playcounts.json";

pub fn data_root() -> Result<PathBuf> {
    if let Ok(override_dir) = env::var("SCROBSYNC_DATA_DIR") {
        return Ok(PathBuf::from(override_dir));
    }

    let home = env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".config").join(APP_DIR))
}

pub fn playcounts_path() -> Result<PathBuf> {
    Ok(data_root()?.join(STORE_FILE))
}

pub fn ensure_data_dir() -> Result<PathBuf> {
    let root = data_root()?;
    fs::create_dir_all(&root).with_context(|| format!("failed to create {}", root.display()))?;
    Ok(root)
}
