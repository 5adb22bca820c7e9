//! Runtime configuration read from the environment (`.env` supported)

use std::env;
use std::path::PathBuf;

use crate::classifier::KeywordTables;
use crate::error::TrackerError;
use crate::Result;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_MODEL: &str = "gemini-2.0-flash";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub gemini_api_key: String,
    pub gemini_model: String,
    /// JSON file replacing the built-in keyword tables
    pub keyword_tables_path: Option<PathBuf>,
    pub log_level: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let port = match lookup("PORT").or_else(|| lookup("API_PORT")) {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| TrackerError::Config(format!("Invalid port: {}", raw)))?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            port,
            gemini_api_key: lookup("GEMINI_API_KEY").unwrap_or_default(),
            gemini_model: lookup("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            keyword_tables_path: lookup("KEYWORD_TABLES_PATH")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    pub fn keyword_tables(&self) -> Result<KeywordTables> {
        match &self.keyword_tables_path {
            Some(path) => KeywordTables::load(path),
            None => Ok(KeywordTables::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<AppConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.port, 8080);
        assert!(config.gemini_api_key.is_empty());
        assert_eq!(config.gemini_model, "gemini-2.0-flash");
        assert!(config.keyword_tables_path.is_none());
        assert_eq!(config.keyword_tables().unwrap(), KeywordTables::default());
    }

    #[test]
    fn test_port_fallback_and_validation() {
        assert_eq!(config_from(&[("API_PORT", "9000")]).unwrap().port, 9000);
        assert_eq!(
            config_from(&[("PORT", "7000"), ("API_PORT", "9000")]).unwrap().port,
            7000
        );
        assert!(matches!(
            config_from(&[("PORT", "eighty")]),
            Err(TrackerError::Config(_))
        ));
    }

    #[test]
    fn test_missing_keyword_file_is_an_error() {
        let config = config_from(&[("KEYWORD_TABLES_PATH", "/nonexistent/keywords.json")]).unwrap();
        assert!(matches!(config.keyword_tables(), Err(TrackerError::IoError(_))));
    }
}
