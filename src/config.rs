use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub redirect: RedirectConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// TLS is terminated upstream; full URLs are rebuilt with https.
    #[serde(default)]
    pub tls_terminated: bool,
    #[serde(with = "duration_serde", default = "default_request_timeout")]
    pub request_timeout: Duration,
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RedirectConfig {
    /// Currently installed application version, e.g. "7.5.0".
    pub current_version: String,
    /// Directory the web server resolves request paths against.
    pub document_root: String,
    /// Token immediately preceding the version number in a path.
    #[serde(default = "default_version_marker")]
    pub version_marker: String,
    /// Contact address shown on the not-found page.
    pub contact_email: String,
    /// Target of the "return home" link on the not-found page.
    #[serde(default = "default_home_url")]
    pub home_url: String,
}

fn default_version_marker() -> String {
    "_v".to_string()
}

fn default_home_url() -> String {
    "/".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub access_log: AccessLogConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccessLogConfig {
    pub enabled: bool,
    pub output: String,
    pub file_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
    pub path: String,
}

impl Config {
    /// Load configuration from file
    pub async fn load(path: &str) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Server port cannot be zero");
        }

        let version_re = Regex::new(r"^\d+\.\d+\.\d+$").expect("static pattern");
        if !version_re.is_match(&self.redirect.current_version) {
            anyhow::bail!(
                "current_version must be a dotted three-component version, got '{}'",
                self.redirect.current_version
            );
        }

        if self.redirect.document_root.is_empty() {
            anyhow::bail!("document_root cannot be empty");
        }

        if self.redirect.version_marker.is_empty() {
            anyhow::bail!("version_marker cannot be empty");
        }

        if !self.redirect.contact_email.contains('@') {
            anyhow::bail!(
                "contact_email does not look like an email address: '{}'",
                self.redirect.contact_email
            );
        }

        if self.metrics.enabled && self.metrics.port == self.server.port {
            anyhow::bail!("Metrics port must differ from the server port");
        }

        Ok(())
    }
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let secs = duration.as_secs();
        serializer.serialize_str(&format!("{}s", secs))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    fn parse_duration(s: &str) -> std::result::Result<Duration, Box<dyn std::error::Error + Send + Sync>> {
        if s.ends_with("s") {
            let num: u64 = s.trim_end_matches("s").parse()?;
            Ok(Duration::from_secs(num))
        } else if s.ends_with("m") {
            let num: u64 = s.trim_end_matches("m").parse()?;
            Ok(Duration::from_secs(num * 60))
        } else {
            let num: u64 = s.parse()?;
            Ok(Duration::from_secs(num))
        }
    }
}
