use crate::domain::models::TimerConfig;
use crate::infrastructure::error::InfraError;
use chrono_tz::Tz;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

const APP_JSON: &str = "app.json";
const TIMER_JSON: &str = "timer.json";

fn default_files() -> HashMap<&'static str, serde_json::Value> {
    HashMap::from([
        (
            APP_JSON,
            serde_json::json!({
                "schema": 1,
                "appName": "FocusTrack",
                "timezone": "UTC"
            }),
        ),
        (
            TIMER_JSON,
            serde_json::json!({
                "schema": 1,
                "workMinutes": 25,
                "breakMinutes": 5,
                "longBreakMinutes": 15,
                "sessionsBeforeLongBreak": 4
            }),
        ),
    ])
}

pub fn ensure_default_configs(config_dir: &Path) -> Result<(), InfraError> {
    for (name, value) in default_files() {
        let path = config_dir.join(name);
        if !path.exists() {
            let formatted = serde_json::to_string_pretty(&value)?;
            fs::write(path, format!("{formatted}\n"))?;
        }
    }
    Ok(())
}

fn read_config(path: &Path) -> Result<serde_json::Value, InfraError> {
    let raw = fs::read_to_string(path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    Ok(parsed)
}

/// Countdown durations from `timer.json`. Unreadable files or missing keys
/// fall back to the defaults; zero values are bumped to one minute.
pub fn load_timer_config(config_dir: &Path) -> TimerConfig {
    let mut config = TimerConfig::default();
    let Ok(parsed) = read_config(&config_dir.join(TIMER_JSON)) else {
        return config;
    };

    if let Some(value) = parsed.get("workMinutes").and_then(serde_json::Value::as_u64) {
        config.work_minutes = value.max(1) as u32;
    }
    if let Some(value) = parsed.get("breakMinutes").and_then(serde_json::Value::as_u64) {
        config.break_minutes = value.max(1) as u32;
    }
    if let Some(value) = parsed
        .get("longBreakMinutes")
        .and_then(serde_json::Value::as_u64)
    {
        config.long_break_minutes = value.max(1) as u32;
    }
    if let Some(value) = parsed
        .get("sessionsBeforeLongBreak")
        .and_then(serde_json::Value::as_u64)
    {
        config.sessions_before_long_break = value.max(1) as u32;
    }

    config
}

/// Reporting timezone from `app.json`; unknown names fall back to UTC.
pub fn load_timezone(config_dir: &Path) -> Tz {
    let Ok(parsed) = read_config(&config_dir.join(APP_JSON)) else {
        return chrono_tz::UTC;
    };
    parsed
        .get("timezone")
        .and_then(serde_json::Value::as_str)
        .and_then(|name| name.trim().parse::<Tz>().ok())
        .unwrap_or(chrono_tz::UTC)
}

pub fn persist_timer_config(config_dir: &Path, config: &TimerConfig) -> Result<(), InfraError> {
    let value = serde_json::json!({
        "schema": 1,
        "workMinutes": config.work_minutes,
        "breakMinutes": config.break_minutes,
        "longBreakMinutes": config.long_break_minutes,
        "sessionsBeforeLongBreak": config.sessions_before_long_break,
    });
    let formatted = serde_json::to_string_pretty(&value)?;
    fs::write(config_dir.join(TIMER_JSON), format!("{formatted}\n"))?;
    Ok(())
}
