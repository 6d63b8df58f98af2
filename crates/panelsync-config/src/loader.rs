//! Configuration file loading and error types.

use std::{fs, path::Path};

use crate::Config;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("toml: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("unsupported config format")]
    UnsupportedFormat,
    #[error("validation: {0}")]
    Validation(String),
}

/// Load a config file, picking the parser from the file extension.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let data = fs::read_to_string(path)?;
    match path.extension().and_then(|s| s.to_str()).unwrap_or("") {
        "json" | "jsonc" => {
            let stripped = json_comments::StripComments::new(data.as_bytes());
            Ok(serde_json::from_reader(stripped)?)
        }
        "yaml" | "yml" => Ok(serde_yaml::from_str(&data)?),
        "toml" => Ok(toml::from_str(&data)?),
        _ => Err(ConfigError::UnsupportedFormat),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_temp(suffix: &str, body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[test]
    fn load_toml() {
        let file = write_temp(
            ".toml",
            r#"
[panel]
username = "admin"
password = "secret"

[[servers]]
name = "de-1"
address = "https://de1.example.com:2053"
panel_path = "/xui/"
inbounds = [1, 2]
"#,
        );
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.servers.len(), 1);
        assert_eq!(config.servers[0].inbounds, vec![1, 2]);
        assert_eq!(config.sync.interval_secs, 120);
        assert_eq!(config.subscription.dir, "sub");
    }

    #[test]
    fn load_jsonc_with_comments() {
        let file = write_temp(
            ".jsonc",
            r#"{
  // shared credentials
  "panel": {"username": "admin", "password": "pw"},
  "servers": [
    {"name": "a", "address": "http://10.0.0.1:54321", "inbounds": [3]}
  ]
}"#,
        );
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.servers[0].panel_path, "/");
        assert_eq!(config.panel.username, "admin");
    }

    #[test]
    fn load_yaml_accepts_inbound_alias() {
        let file = write_temp(
            ".yaml",
            r#"
panel:
  username: admin
  password: pw
servers:
  - name: nl
    address: https://nl.example.com
    inbound: [7]
"#,
        );
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.servers[0].inbounds, vec![7]);
    }

    #[test]
    fn unknown_extension_rejected() {
        let file = write_temp(".ini", "x=1");
        assert!(matches!(
            load_config(file.path()),
            Err(ConfigError::UnsupportedFormat)
        ));
    }
}
