use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

pub const OCR_URL_ENV: &str = "CLOVA_OCR_URL";
pub const OCR_SECRET_ENV: &str = "CLOVA_OCR_SECRET";
pub const DATA_PATH_ENV: &str = "SNAPSOLVE_DATA_PATH";

#[derive(Debug, Clone)]
pub struct Settings {
    pub server_addr: String,
    pub data_path: Option<String>,
    pub ocr_url: Option<String>,
    pub ocr_secret: Option<String>,
    pub ocr_timeout_secs: u64,
    pub preview_ttl_secs: u64,
    pub preview_capacity: usize,
    pub history_limit: usize,
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:8000".to_string(),
            data_path: None,
            ocr_url: None,
            ocr_secret: None,
            ocr_timeout_secs: 30,
            preview_ttl_secs: 30 * 60,
            preview_capacity: 1024,
            history_limit: 10,
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    server: Option<ServerSettings>,
    ocr: Option<OcrSettings>,
    preview: Option<PreviewSettings>,
    history: Option<HistorySettings>,
    log: Option<LogSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerSettings {
    addr: Option<String>,
    data_path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OcrSettings {
    url: Option<String>,
    secret: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct PreviewSettings {
    ttl_secs: Option<u64>,
    capacity: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct HistorySettings {
    limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct LogSettings {
    level: Option<String>,
}

/// Built-in defaults, then `snapsolve.toml` and `snapsolve.local.toml` in the
/// working directory, then `~/.snapsolve/settings.toml`, then `extra_path`.
/// Environment variables win over every file.
pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();
    let defaults: SettingsFile =
        toml::from_str(DEFAULT_SETTINGS_TOML).with_context(|| "failed to parse default settings")?;
    settings.merge(defaults);

    let mut ordered_paths = vec![
        PathBuf::from("snapsolve.toml"),
        PathBuf::from("snapsolve.local.toml"),
    ];
    if let Some(home) = home_dir() {
        ordered_paths.push(home.join("settings.toml"));
    }
    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            let parsed: SettingsFile = toml::from_str(&content)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?;
            settings.merge(parsed);
        }
    }

    settings.apply_env(|key| std::env::var(key).ok());
    Ok(settings)
}

impl Settings {
    pub fn ocr_timeout(&self) -> Duration {
        Duration::from_secs(self.ocr_timeout_secs)
    }

    pub fn preview_ttl(&self) -> Duration {
        Duration::from_secs(self.preview_ttl_secs)
    }

    fn merge(&mut self, incoming: SettingsFile) {
        if let Some(server) = incoming.server {
            if let Some(addr) = non_blank(server.addr) {
                self.server_addr = addr;
            }
            if let Some(path) = non_blank(server.data_path) {
                self.data_path = Some(path);
            }
        }
        if let Some(ocr) = incoming.ocr {
            if let Some(url) = non_blank(ocr.url) {
                self.ocr_url = Some(url);
            }
            if let Some(secret) = non_blank(ocr.secret) {
                self.ocr_secret = Some(secret);
            }
            if let Some(timeout) = ocr.timeout_secs {
                if timeout > 0 {
                    self.ocr_timeout_secs = timeout;
                }
            }
        }
        if let Some(preview) = incoming.preview {
            if let Some(ttl) = preview.ttl_secs {
                if ttl > 0 {
                    self.preview_ttl_secs = ttl;
                }
            }
            if let Some(capacity) = preview.capacity {
                if capacity > 0 {
                    self.preview_capacity = capacity;
                }
            }
        }
        if let Some(history) = incoming.history {
            if let Some(limit) = history.limit {
                if limit > 0 {
                    self.history_limit = limit;
                }
            }
        }
        if let Some(log) = incoming.log {
            if let Some(level) = non_blank(log.level) {
                self.log_level = level;
            }
        }
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = non_blank(lookup(OCR_URL_ENV)) {
            self.ocr_url = Some(url);
        }
        if let Some(secret) = non_blank(lookup(OCR_SECRET_ENV)) {
            self.ocr_secret = Some(secret);
        }
        if let Some(path) = non_blank(lookup(DATA_PATH_ENV)) {
            self.data_path = Some(path);
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().and_then(|home| {
        let home = home.trim();
        if home.is_empty() {
            None
        } else {
            Some(Path::new(home).join(".snapsolve"))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::with_temp_home;
    use std::collections::HashMap;

    #[test]
    fn embedded_defaults_parse() {
        let parsed: SettingsFile = toml::from_str(DEFAULT_SETTINGS_TOML).unwrap();
        let mut settings = Settings::default();
        settings.merge(parsed);
        assert_eq!(settings.history_limit, 10);
        assert_eq!(settings.preview_ttl(), Duration::from_secs(1800));
    }

    #[test]
    fn home_and_extra_files_layer_in_order() {
        with_temp_home(|home| {
            let dir = home.join(".snapsolve");
            fs::create_dir_all(&dir).unwrap();
            fs::write(
                dir.join("settings.toml"),
                "[ocr]\nurl = \"https://home.example/ocr\"\ntimeout_secs = 5\n",
            )
            .unwrap();
            let extra = home.join("extra.toml");
            fs::write(&extra, "[ocr]\ntimeout_secs = 9\n[preview]\ncapacity = 3\n").unwrap();

            let settings = load_settings(Some(&extra)).unwrap();
            assert_eq!(settings.ocr_url.as_deref(), Some("https://home.example/ocr"));
            assert_eq!(settings.ocr_timeout_secs, 9);
            assert_eq!(settings.preview_capacity, 3);
        });
    }

    #[test]
    fn missing_extra_file_is_an_error() {
        with_temp_home(|home| {
            let err = load_settings(Some(&home.join("absent.toml"))).unwrap_err();
            assert!(err.to_string().contains("settings file not found"));
        });
    }

    #[test]
    fn env_overrides_files_and_ignores_blank_values() {
        let mut settings = Settings {
            ocr_url: Some("https://file.example".to_string()),
            ..Settings::default()
        };
        let env = HashMap::from([
            (OCR_URL_ENV, "https://env.example".to_string()),
            (OCR_SECRET_ENV, "   ".to_string()),
            (DATA_PATH_ENV, "/tmp/snapsolve.json".to_string()),
        ]);
        settings.apply_env(|key| env.get(key).cloned());
        assert_eq!(settings.ocr_url.as_deref(), Some("https://env.example"));
        assert_eq!(settings.ocr_secret, None);
        assert_eq!(settings.data_path.as_deref(), Some("/tmp/snapsolve.json"));
    }

    #[test]
    fn zero_values_keep_defaults() {
        let mut settings = Settings::default();
        let parsed: SettingsFile =
            toml::from_str("[preview]\nttl_secs = 0\ncapacity = 0\n[history]\nlimit = 0\n").unwrap();
        settings.merge(parsed);
        assert_eq!(settings.preview_ttl_secs, 30 * 60);
        assert_eq!(settings.preview_capacity, 1024);
        assert_eq!(settings.history_limit, 10);
    }
}
