use std::{
    fs,
    path::{
        Path,
        PathBuf,
    },
};

use serde::{
    Deserialize,
    Serialize,
};
use tracing::{
    debug,
    warn,
};

use crate::core::TuneDeckError;

const APP_NAME: &str = "tunedeck";

pub const SETTINGS_FILE: &str = "settings.json";

/// Where `filename` lives: the platform local data directory under `tunedeck/`,
/// or the working directory when the platform has none.
pub fn settings_path(filename: &str) -> Result<PathBuf, TuneDeckError> {
    let Some(data_dir) = dirs::data_local_dir() else {
        return Ok(PathBuf::from(filename));
    };
    let app_dir = data_dir.join(APP_NAME);
    fs::create_dir_all(&app_dir)?;
    Ok(app_dir.join(filename))
}

pub fn save_json_to<T: Serialize>(data: &T, file_path: &Path) -> Result<(), TuneDeckError> {
    if let Some(parent) = file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(data)?;
    fs::write(file_path, json)?;
    debug!("Data saved to: {}", file_path.display());
    Ok(())
}

/// Missing files load as `T::default()`.
pub fn load_json_from<T: for<'de> Deserialize<'de> + Default>(
    file_path: &Path,
) -> Result<T, TuneDeckError> {
    if !file_path.exists() {
        return Ok(T::default());
    }

    let json = fs::read_to_string(file_path)?;
    let data: T = serde_json::from_str(&json)?;
    debug!("Data loaded from: {}", file_path.display());
    Ok(data)
}

pub fn save_json<T: Serialize>(data: &T, filename: &str) -> Result<(), TuneDeckError> {
    save_json_to(data, &settings_path(filename)?)
}

pub fn load_json<T: for<'de> Deserialize<'de> + Default>(filename: &str) -> Result<T, TuneDeckError> {
    load_json_from(&settings_path(filename)?)
}

pub fn load_json_or_default<T: for<'de> Deserialize<'de> + Default>(filename: &str) -> T {
    match load_json::<T>(filename) {
        Ok(data) => data,
        Err(e) => {
            warn!("Failed to load {}: {}. Using defaults.", filename, e);
            T::default()
        }
    }
}
