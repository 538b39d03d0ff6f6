use std::env;
use std::path::PathBuf;

/// Environment variable that overrides the config directory.
pub const CONFIG_DIR_ENV: &str = "CONTENTAI_CONFIG_DIR";

/// Return the user's home directory path.
///
/// Uses HOME on Unix-like systems and USERPROFILE on Windows.
pub fn get_home_dir() -> Result<String, String> {
    non_empty_var("HOME")
        .or_else(|| non_empty_var("USERPROFILE"))
        .ok_or_else(|| "Home directory not set".to_string())
}

/// Return the directory holding `config.json` and `credentials.json`.
///
/// `$CONTENTAI_CONFIG_DIR` wins; otherwise `~/.config/contentai`.
pub fn config_dir() -> Result<PathBuf, String> {
    if let Some(dir) = non_empty_var(CONFIG_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }
    let home = get_home_dir()?;
    Ok(PathBuf::from(home).join(".config").join("contentai"))
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.is_empty())
}
