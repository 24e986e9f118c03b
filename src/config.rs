use std::{
    env, fs,
    path::{Path, PathBuf},
};

use crate::types::AppConfig;

pub fn repo_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

pub fn resolve_repo_path(raw: &str) -> PathBuf {
    let path = PathBuf::from(raw);
    if path.is_absolute() {
        path
    } else {
        repo_root().join(path)
    }
}

pub fn config_path() -> PathBuf {
    repo_root().join("config.json")
}

pub fn env_default(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Environment variables fill in whatever the config file left blank.
pub fn apply_env_defaults(mut config: AppConfig) -> AppConfig {
    if let Some(value) = env_default("BAGAN_BIND_ADDR") {
        config.bind_addr = value;
    }
    if config.static_dir.trim().is_empty() {
        if let Some(value) = env_default("BAGAN_STATIC_DIR") {
            config.static_dir = value;
        }
    }
    if let Some(value) = env_default("BAGAN_DATA_PATH") {
        config.data_path = value;
    }
    config
}

pub fn load_config_inner() -> Result<AppConfig, String> {
    let path = config_path();
    if !path.is_file() {
        return Ok(apply_env_defaults(AppConfig::default()));
    }
    let data =
        fs::read_to_string(&path).map_err(|e| format!("read config {}: {e}", path.display()))?;
    let config = serde_json::from_str::<AppConfig>(&data)
        .map_err(|e| format!("parse config {}: {e}", path.display()))?;
    Ok(apply_env_defaults(config))
}

pub fn data_file_path(config: &AppConfig) -> PathBuf {
    resolve_repo_path(&config.data_path)
}

pub fn static_dir(config: &AppConfig) -> Option<PathBuf> {
    let trimmed = config.static_dir.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(resolve_repo_path(trimmed))
}

pub fn load_env_file() {
    let env_path = repo_root().join(".env");
    load_env_file_from(&env_path);
}

fn load_env_file_from(env_path: &Path) {
    if !env_path.is_file() {
        return;
    }
    let contents = match fs::read_to_string(env_path) {
        Ok(data) => data,
        Err(_) => return,
    };
    for line in contents.lines() {
        if let Some((key, value)) = parse_env_line(line) {
            if env::var_os(&key).is_none() {
                env::set_var(key, value);
            }
        }
    }
}

pub fn parse_env_line(line: &str) -> Option<(String, String)> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }
    let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
    let (key, raw_value) = trimmed.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    let mut value = raw_value.trim();
    if value.starts_with('"') && value.ends_with('"') && value.len() >= 2 {
        value = &value[1..value.len() - 1];
    } else if value.starts_with('\'') && value.ends_with('\'') && value.len() >= 2 {
        value = &value[1..value.len() - 1];
    } else if let Some(idx) = value.find('#') {
        value = value[..idx].trim_end();
    }
    Some((key.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_env_line_handles_quotes_and_comments() {
        assert_eq!(
            parse_env_line("BAGAN_BIND_ADDR=0.0.0.0:9000"),
            Some(("BAGAN_BIND_ADDR".to_string(), "0.0.0.0:9000".to_string()))
        );
        assert_eq!(
            parse_env_line("export BAGAN_DATA_PATH=\"data/bagan.json\""),
            Some(("BAGAN_DATA_PATH".to_string(), "data/bagan.json".to_string()))
        );
        assert_eq!(
            parse_env_line("BAGAN_STATIC_DIR=public # serve the exported UI"),
            Some(("BAGAN_STATIC_DIR".to_string(), "public".to_string()))
        );
        assert_eq!(parse_env_line("# comment"), None);
        assert_eq!(parse_env_line("   "), None);
        assert_eq!(parse_env_line("=value"), None);
    }

    #[test]
    fn resolve_repo_path_keeps_absolute_paths() {
        let abs = if cfg!(windows) { "C:\\data" } else { "/data" };
        assert_eq!(resolve_repo_path(abs), PathBuf::from(abs));
        assert_eq!(
            resolve_repo_path("bagan_data.json"),
            repo_root().join("bagan_data.json")
        );
    }

    #[test]
    fn defaults_survive_a_missing_config_file() {
        let config = AppConfig::default();
        assert_eq!(config.bind_addr, "127.0.0.1:8970");
        assert_eq!(config.data_path, "bagan_data.json");
        assert!(static_dir(&config).is_none());
    }
}
