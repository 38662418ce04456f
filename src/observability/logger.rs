use std::sync::Arc;
use std::time::Duration;
use anyhow::Result;
use chrono::{DateTime, Utc};
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{error, warn};

use crate::config::LoggingConfig;
use crate::error::{RedirectError, Result as RedirectResult};

/// Access log entry, one per decided request.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AccessLogEntry {
    pub timestamp: DateTime<Utc>,
    pub client_ip: String,
    pub method: String,
    pub uri: String,
    pub status: u16,
    pub duration_ms: u64,
    /// "redirect" or the not-found reason label.
    pub outcome: String,
    pub location: Option<String>,
}

/// Writes structured access log entries for every redirect decision.
pub struct AccessLogger {
    config: Arc<LoggingConfig>,
    writer: Option<Arc<RwLock<tokio::fs::File>>>,
}

impl AccessLogger {
    pub fn new(config: &LoggingConfig) -> Result<Self> {
        let writer = if config.access_log.enabled && config.access_log.output == "file" {
            match &config.access_log.file_path {
                Some(path) => match Self::create_log_writer(path) {
                    Ok(file) => Some(Arc::new(RwLock::new(file))),
                    Err(e) => {
                        error!("Failed to create access log writer: {}", e);
                        None
                    }
                },
                None => {
                    warn!("Access log output is 'file' but file_path is not set");
                    None
                }
            }
        } else {
            None
        };

        Ok(Self {
            config: Arc::new(config.clone()),
            writer,
        })
    }

    fn create_log_writer(output_path: &str) -> Result<tokio::fs::File> {
        std::fs::create_dir_all(
            std::path::Path::new(output_path)
                .parent()
                .unwrap_or(std::path::Path::new(".")),
        )?;

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(output_path)?;

        Ok(tokio::fs::File::from_std(file))
    }

    /// Log a decided request
    #[allow(clippy::too_many_arguments)]
    pub async fn log_request(
        &self,
        method: &str,
        uri: &str,
        status: u16,
        duration: Duration,
        client_ip: &std::net::IpAddr,
        outcome: &str,
        location: Option<&str>,
    ) -> RedirectResult<()> {
        if !self.config.access_log.enabled {
            return Ok(());
        }

        let entry = AccessLogEntry {
            timestamp: Utc::now(),
            client_ip: client_ip.to_string(),
            method: method.to_string(),
            uri: uri.to_string(),
            status,
            duration_ms: duration.as_millis() as u64,
            outcome: outcome.to_string(),
            location: location.map(|s| s.to_string()),
        };

        let line = self.format_entry(&entry);

        match self.config.access_log.output.as_str() {
            "stdout" => {
                print!("{}", line);
                Ok(())
            }
            "file" => {
                if let Some(writer) = &self.writer {
                    let mut file = writer.write().await;
                    file.write_all(line.as_bytes())
                        .await
                        .map_err(RedirectError::Io)?;
                    file.flush().await.map_err(RedirectError::Io)?;
                }
                Ok(())
            }
            other => {
                warn!("Unknown access log output: {}", other);
                Ok(())
            }
        }
    }

    fn format_entry(&self, entry: &AccessLogEntry) -> String {
        match self.config.format.as_str() {
            "common" => {
                format!(
                    "{} - - [{}] \"{} {} HTTP/1.1\" {} - {}\n",
                    entry.client_ip,
                    entry.timestamp.format("%d/%b/%Y:%H:%M:%S %z"),
                    entry.method,
                    entry.uri,
                    entry.status,
                    entry.outcome,
                )
            }
            // json and anything unrecognized
            _ => format!("{}\n", serde_json::to_string(entry).unwrap_or_default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AccessLogConfig, LoggingConfig};

    fn logging_config(format: &str) -> LoggingConfig {
        LoggingConfig {
            level: "info".to_string(),
            format: format.to_string(),
            access_log: AccessLogConfig {
                enabled: true,
                output: "stdout".to_string(),
                file_path: None,
            },
        }
    }

    fn entry() -> AccessLogEntry {
        AccessLogEntry {
            timestamp: Utc::now(),
            client_ip: "198.51.100.7".to_string(),
            method: "GET".to_string(),
            uri: "/app_v7.3.0/index.php?pid=22".to_string(),
            status: 302,
            duration_ms: 1,
            outcome: "redirect".to_string(),
            location: Some("/app_v7.5.0/index.php?pid=22".to_string()),
        }
    }

    #[test]
    fn json_format_is_one_parseable_line() {
        let logger = AccessLogger::new(&logging_config("json")).unwrap();
        let line = logger.format_entry(&entry());

        assert!(line.ends_with('\n'));
        let value: serde_json::Value = serde_json::from_str(line.trim_end()).unwrap();
        assert_eq!(value["status"], 302);
        assert_eq!(value["outcome"], "redirect");
        assert_eq!(value["uri"], "/app_v7.3.0/index.php?pid=22");
    }

    #[test]
    fn common_format_includes_request_line_and_status() {
        let logger = AccessLogger::new(&logging_config("common")).unwrap();
        let line = logger.format_entry(&entry());

        assert!(line.contains("\"GET /app_v7.3.0/index.php?pid=22 HTTP/1.1\" 302"));
        assert!(line.starts_with("198.51.100.7"));
    }

    #[tokio::test]
    async fn file_output_appends_entries() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("access.log");

        let config = LoggingConfig {
            level: "info".to_string(),
            format: "json".to_string(),
            access_log: AccessLogConfig {
                enabled: true,
                output: "file".to_string(),
                file_path: Some(path.to_string_lossy().to_string()),
            },
        };

        let logger = AccessLogger::new(&config).unwrap();
        let ip: std::net::IpAddr = "127.0.0.1".parse().unwrap();
        logger
            .log_request("GET", "/about.html", 404, Duration::from_millis(2), &ip, "no_match", None)
            .await
            .unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("\"/about.html\""));
        assert!(contents.contains("no_match"));
    }
}
