use std::{collections::HashMap, fs, time::Duration};

use shared::domain::Role;
use tracing::warn;

const CONFIG_FILE: &str = "exam.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_url: String,
    pub token: Option<String>,
    pub role: Role,
    pub enforce_time_limit: bool,
    pub request_timeout_seconds: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:5000".into(),
            token: None,
            role: Role::Student,
            enforce_time_limit: false,
            request_timeout_seconds: 15,
        }
    }
}

impl Settings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();
    if let Ok(raw) = fs::read_to_string(CONFIG_FILE) {
        apply_file(&mut settings, &raw);
    }
    apply_env(&mut settings, |key| std::env::var(key).ok());
    settings
}

pub(crate) fn apply_file(settings: &mut Settings, raw: &str) {
    let file_cfg = match toml::from_str::<HashMap<String, toml::Value>>(raw) {
        Ok(file_cfg) => file_cfg,
        Err(err) => {
            warn!(file = CONFIG_FILE, error = %err, "ignoring unreadable config file");
            return;
        }
    };

    if let Some(v) = file_cfg.get("api_url").and_then(toml::Value::as_str) {
        settings.api_url = v.to_string();
    }
    if let Some(v) = file_cfg.get("token").and_then(toml::Value::as_str) {
        settings.token = Some(v.to_string());
    }
    if let Some(v) = file_cfg.get("role").and_then(toml::Value::as_str) {
        set_role(settings, "role", v);
    }
    if let Some(v) = file_cfg.get("enforce_time_limit") {
        match v.as_bool() {
            Some(enforce) => settings.enforce_time_limit = enforce,
            None => warn!(key = "enforce_time_limit", "expected a boolean; keeping default"),
        }
    }
    if let Some(v) = file_cfg.get("request_timeout_seconds") {
        match v.as_integer().and_then(|secs| u64::try_from(secs).ok()) {
            Some(secs) if secs > 0 => settings.request_timeout_seconds = secs,
            _ => warn!(
                key = "request_timeout_seconds",
                "expected a positive integer; keeping default"
            ),
        }
    }
}

pub(crate) fn apply_env(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("EXAM_API_URL") {
        settings.api_url = v;
    }
    if let Some(v) = var("APP__API_URL") {
        settings.api_url = v;
    }

    if let Some(v) = var("EXAM_TOKEN") {
        settings.token = Some(v);
    }
    if let Some(v) = var("APP__TOKEN") {
        settings.token = Some(v);
    }

    if let Some(v) = var("EXAM_ROLE") {
        set_role(settings, "EXAM_ROLE", &v);
    }
    if let Some(v) = var("APP__ROLE") {
        set_role(settings, "APP__ROLE", &v);
    }

    if let Some(v) = var("APP__ENFORCE_TIME_LIMIT") {
        match v.trim().parse::<bool>() {
            Ok(enforce) => settings.enforce_time_limit = enforce,
            Err(_) => warn!(key = "APP__ENFORCE_TIME_LIMIT", value = %v, "expected true or false"),
        }
    }

    if let Some(v) = var("APP__REQUEST_TIMEOUT_SECONDS") {
        match v.trim().parse::<u64>() {
            Ok(secs) if secs > 0 => settings.request_timeout_seconds = secs,
            _ => warn!(
                key = "APP__REQUEST_TIMEOUT_SECONDS",
                value = %v,
                "expected a positive integer"
            ),
        }
    }
}

fn set_role(settings: &mut Settings, key: &str, raw: &str) {
    match raw.parse::<Role>() {
        Ok(role) => settings.role = role,
        Err(err) => warn!(key, error = %err, "keeping role {}", settings.role.as_str()),
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
