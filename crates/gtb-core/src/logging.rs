use tracing_subscriber::{fmt, EnvFilter};

/// Output format for the process-wide log sink, chosen once at startup.
///
/// `Plain` is the local/dev console backend; `Json` emits one structured
/// record per line (message + level + fields), the shape cloud log ingestion
/// expects.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Plain,
    Json,
}

impl LogFormat {
    /// Parses the `LOG_FORMAT` configuration value. Unknown values fall back
    /// to the plain console backend.
    pub fn from_config(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Plain,
        }
    }
}

/// Initialize logging for the bot.
///
/// Default: info for our crates, overridable with `RUST_LOG`.
pub fn init(service_name: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("info,{service_name}=info")));

    match format {
        LogFormat::Plain => fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_ansi(true)
            .init(),
        LogFormat::Json => fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(false)
            .init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_parsing_defaults_to_plain() {
        assert_eq!(LogFormat::from_config("json"), LogFormat::Json);
        assert_eq!(LogFormat::from_config("JSON "), LogFormat::Json);
        assert_eq!(LogFormat::from_config("plain"), LogFormat::Plain);
        assert_eq!(LogFormat::from_config(""), LogFormat::Plain);
        assert_eq!(LogFormat::from_config("yaml"), LogFormat::Plain);
    }
}
