use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::conversation::DEFAULT_PERSIST_EVERY;
use crate::core::dispatcher::{DEFAULT_ENDPOINT, DEFAULT_REQUEST_TIMEOUT};
use crate::core::reveal::DEFAULT_TICK;

/// Settings read from `config.toml`. Every field is optional; accessors
/// supply the defaults.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct Config {
    /// URL of the answering endpoint
    pub endpoint: Option<String>,
    pub request_timeout_secs: Option<u64>,
    /// Delay between revealed characters, in milliseconds (0 = no typing effect)
    pub reveal_tick_ms: Option<u64>,
    /// Streamed characters between conversation writes
    pub persist_every: Option<usize>,
    /// Keep the previous conversation instead of starting fresh
    pub resume_history: Option<bool>,
    /// Where the conversation and theme flag are stored
    pub data_dir: Option<PathBuf>,
}

/// Get a user-friendly display string for a path
/// Converts absolute paths to use ~ notation on Unix-like systems when possible
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}

impl Config {
    pub fn endpoint(&self) -> &str {
        self.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT)
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn reveal_tick(&self) -> Duration {
        self.reveal_tick_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_TICK)
    }

    pub fn persist_every(&self) -> usize {
        self.persist_every.unwrap_or(DEFAULT_PERSIST_EVERY).max(1)
    }

    pub fn resume_history(&self) -> bool {
        self.resume_history.unwrap_or(false)
    }

    /// Sets a value from its command-line spelling (`endpoint`,
    /// `request-timeout`, `reveal-tick`, `persist-every`, `resume-history`,
    /// `data-dir`).
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), String> {
        match key {
            "endpoint" => {
                if !value.starts_with("http://") && !value.starts_with("https://") {
                    return Err(format!("endpoint must be an http(s) URL, got '{value}'"));
                }
                self.endpoint = Some(value.to_string());
            }
            "request-timeout" => self.request_timeout_secs = Some(parse_number(key, value)?),
            "reveal-tick" => self.reveal_tick_ms = Some(parse_number(key, value)?),
            "persist-every" => {
                let every: usize = parse_number(key, value)?;
                if every == 0 {
                    return Err("persist-every must be at least 1".to_string());
                }
                self.persist_every = Some(every);
            }
            "resume-history" => {
                self.resume_history = Some(match value {
                    "on" | "true" | "yes" => true,
                    "off" | "false" | "no" => false,
                    _ => return Err(format!("resume-history expects on/off, got '{value}'")),
                })
            }
            "data-dir" => self.data_dir = Some(PathBuf::from(value)),
            _ => return Err(format!("Unknown config key: {key}")),
        }
        Ok(())
    }

    pub fn unset_value(&mut self, key: &str) -> Result<(), String> {
        match key {
            "endpoint" => self.endpoint = None,
            "request-timeout" => self.request_timeout_secs = None,
            "reveal-tick" => self.reveal_tick_ms = None,
            "persist-every" => self.persist_every = None,
            "resume-history" => self.resume_history = None,
            "data-dir" => self.data_dir = None,
            _ => return Err(format!("Unknown config key: {key}")),
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, String> {
    value
        .trim()
        .parse()
        .map_err(|_| format!("{key} expects a whole number, got '{value}'"))
}
