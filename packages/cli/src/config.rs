use anyhow::{anyhow, Context};
use scissors_workspace::ServerConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_CONFIG_NAME: &str = "scissors.config.json";

/// Scissors configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory that sheet file names resolve against
    #[serde(default = "default_root_dir")]
    pub root_dir: String,

    /// Only sheets matching this pattern are watched. The first capture
    /// group, if any, is the file name under `rootDir`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheet_filter: Option<String>,

    #[serde(default = "default_watch")]
    pub watch: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3219
}

fn default_root_dir() -> String {
    ".".to_string()
}

fn default_watch() -> bool {
    true
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &str) -> anyhow::Result<Self> {
        let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)
                .with_context(|| format!("Invalid {}", config_path.display()))?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Apply `HOST` and `PORT` overrides
    pub fn with_env(mut self, var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        if let Some(host) = var("HOST") {
            self.host = host;
        }
        if let Some(port) = var("PORT") {
            self.port = port
                .parse()
                .map_err(|_| anyhow!("Invalid PORT: {}", port))?;
        }
        Ok(self)
    }

    /// Get absolute path to the sheet root
    pub fn get_root_dir(&self, cwd: &str) -> PathBuf {
        PathBuf::from(cwd).join(&self.root_dir)
    }

    pub fn server_config(&self, cwd: &str) -> ServerConfig {
        ServerConfig {
            host: self.host.clone(),
            port: self.port,
            root_dir: self.get_root_dir(cwd),
            sheet_filter: self.sheet_filter.clone(),
            watch: self.watch,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            root_dir: default_root_dir(),
            sheet_filter: None,
            watch: default_watch(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "host": "127.0.0.1",
            "port": 4000,
            "rootDir": "public",
            "sheetFilter": "^http://localhost:\\d+/(.*)$",
            "watch": false,
            "somethingElse": 1
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 4000);
        assert_eq!(config.root_dir, "public");
        assert_eq!(config.sheet_filter.as_deref(), Some(r"^http://localhost:\d+/(.*)$"));
        assert!(!config.watch);
    }

    #[test]
    fn test_default_config() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3219);
        assert!(config.watch);
    }

    #[test]
    fn test_load_from_directory() {
        let dir = tempdir().unwrap();
        let cwd = dir.path().to_str().unwrap();
        assert_eq!(Config::load(cwd).unwrap(), Config::default());

        std::fs::write(dir.path().join(DEFAULT_CONFIG_NAME), r#"{"rootDir": "css"}"#).unwrap();
        let config = Config::load(cwd).unwrap();
        assert_eq!(config.get_root_dir(cwd), dir.path().join("css"));

        std::fs::write(dir.path().join(DEFAULT_CONFIG_NAME), r#"{"port": "x"}"#).unwrap();
        assert!(Config::load(cwd).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env = |name: &str| match name {
            "HOST" => Some("localhost".to_string()),
            "PORT" => Some("8080".to_string()),
            _ => None,
        };
        let config = Config::default().with_env(env).unwrap();
        assert_eq!(config.server_config(".").address(), "localhost:8080");

        let bad_port = |name: &str| (name == "PORT").then(|| "http".to_string());
        assert!(Config::default().with_env(bad_port).is_err());
    }
}
