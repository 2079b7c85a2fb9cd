use std::{env, fs, net::SocketAddr, path::Path};

use crate::{errors::Error, logging::LogFormat, Result};

/// Typed runtime configuration, constructed once at startup and shared by
/// reference with every component that needs it. Any missing required
/// parameter aborts startup; there is no partial configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub telegram_bot_token: String,
    /// Chat ids permitted to use the bot. Membership in this list is the sole
    /// gate for non-private chats continuing past access control.
    pub allowed_chat_ids: Vec<i64>,
    pub openai_api_key: String,
    pub system_prompt: String,

    pub log_format: LogFormat,
    /// Listen address for push-mode update delivery (`serve`).
    pub bind_addr: SocketAddr,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let telegram_bot_token = require("TELEGRAM_BOT_TOKEN")?;
        let allowed_chat_ids = parse_csv_i64(&require("TELEGRAM_BOT_SUPPORTED_CHAT_IDS")?);
        if allowed_chat_ids.is_empty() {
            return Err(Error::Config(
                "TELEGRAM_BOT_SUPPORTED_CHAT_IDS must contain at least one chat id".to_string(),
            ));
        }

        let openai_api_key = require("OPEN_AI_API_KEY")?;
        let system_prompt = require("OPEN_AI_SYSTEM_MESSAGE")?;

        let log_format = LogFormat::from_config(&resolve("LOG_FORMAT", "plain"));
        let bind_addr = resolve("BIND_ADDR", "0.0.0.0:8080")
            .parse::<SocketAddr>()
            .map_err(|e| Error::Config(format!("BIND_ADDR is not a valid socket address: {e}")))?;

        Ok(Self {
            telegram_bot_token,
            allowed_chat_ids,
            openai_api_key,
            system_prompt,
            log_format,
            bind_addr,
        })
    }
}

/// Reads a required environment parameter; absence is fatal and names the
/// offending variable.
pub fn require(key: &str) -> Result<String> {
    env_str(key)
        .and_then(non_empty)
        .ok_or_else(|| Error::Config(format!("{key} environment variable is required")))
}

/// Reads an optional environment parameter, substituting the default when the
/// variable is absent or empty.
pub fn resolve(key: &str, default: &str) -> String {
    env_str(key)
        .and_then(non_empty)
        .unwrap_or_else(|| default.to_string())
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

pub fn parse_csv_i64(value: &str) -> Vec<i64> {
    value
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<i64>().ok())
        .collect()
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
