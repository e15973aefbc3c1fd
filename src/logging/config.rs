use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level: {}", other)),
        }
    }
}

/// How and where the process logs.
#[derive(Debug, Clone)]
pub struct LogSettings {
    pub environment: String,
    pub level: LogLevel,
    pub directory: PathBuf,
    /// JSON lines instead of the pretty console format
    pub json: bool,
}

impl LogSettings {
    pub fn for_environment(environment: &str) -> Self {
        let production = environment == "production";
        Self {
            environment: environment.to_string(),
            level: if production {
                LogLevel::Info
            } else {
                LogLevel::Debug
            },
            directory: PathBuf::from("logs"),
            json: production,
        }
    }

    /// ENVIRONMENT, LOG_LEVEL and LOG_DIR; unknown levels keep the default.
    pub fn from_env() -> Self {
        let environment =
            std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
        let mut settings = Self::for_environment(&environment);
        if let Ok(raw) = std::env::var("LOG_LEVEL") {
            match raw.parse() {
                Ok(level) => settings.level = level,
                Err(e) => eprintln!("Ignoring LOG_LEVEL: {}", e),
            }
        }
        if let Ok(dir) = std::env::var("LOG_DIR") {
            settings.directory = PathBuf::from(dir);
        }
        settings
    }

    /// Filter used when RUST_LOG is not set.
    pub fn filter_directive(&self) -> String {
        format!(
            "portfolio_site={},tower_http=debug,axum=debug",
            self.level
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_defaults() {
        let prod = LogSettings::for_environment("production");
        assert_eq!(prod.level, LogLevel::Info);
        assert!(prod.json);

        let dev = LogSettings::for_environment("development");
        assert_eq!(dev.level, LogLevel::Debug);
        assert!(!dev.json);
        assert_eq!(
            dev.filter_directive(),
            "portfolio_site=debug,tower_http=debug,axum=debug"
        );
    }

    #[test]
    fn test_parse_level() {
        assert_eq!("WARNING".parse::<LogLevel>(), Ok(LogLevel::Warn));
        assert_eq!(" error ".parse::<LogLevel>(), Ok(LogLevel::Error));
        assert!("loud".parse::<LogLevel>().is_err());
    }
}
