//! Configuration types for gamma-export.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::export::PipelineOptions;
use crate::http::validate_url;
use crate::profile::IdWidth;

/// Main export configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Table to read.
    pub source: SourceConfig,
    /// Where documents go.
    pub sink: SinkConfig,
    /// Pipeline options.
    #[serde(default)]
    pub options: ExportOptions,
}

/// Location of the gamma table on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Gamma data directory (parent of the table directory).
    pub path: PathBuf,
    /// Table directory name, usually numeric.
    #[serde(default = "default_table")]
    pub table: String,
    /// Set when the store was built with 64-bit string offsets.
    #[serde(default)]
    pub wide_ids: bool,
}

impl SourceConfig {
    /// String reference width of the table.
    #[must_use]
    pub const fn id_width(&self) -> IdWidth {
        IdWidth::from_wide(self.wide_ids)
    }
}

/// Export destination.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SinkConfig {
    /// Line-delimited JSON file.
    #[serde(rename = "file")]
    File {
        /// Output file path (truncated if it exists).
        path: PathBuf,
    },
    /// Bulk endpoint of a remote index service (`<url>/_bulk`).
    #[serde(rename = "bulk")]
    Bulk {
        /// Base URL of the target space.
        url: String,
    },
    /// One request per document (`<url>/<id>`).
    #[serde(rename = "document")]
    Document {
        /// Base URL of the target space.
        url: String,
    },
}

/// Pipeline options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportOptions {
    /// Documents per bulk request.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Number of batcher workers.
    #[serde(default = "default_batchers")]
    pub batchers: usize,
    /// Maximum concurrent bulk requests.
    #[serde(default = "default_uploaders")]
    pub uploaders: usize,
    /// Capacity of the document queue.
    #[serde(default = "default_document_queue_capacity")]
    pub document_queue_capacity: usize,
    /// Capacity of the batch queue.
    #[serde(default = "default_batch_queue_capacity")]
    pub batch_queue_capacity: usize,
    /// Seconds a worker waits on an empty queue before the run fails.
    #[serde(default = "default_queue_timeout_secs")]
    pub queue_timeout_secs: u64,
    /// HTTP request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            batchers: default_batchers(),
            uploaders: default_uploaders(),
            document_queue_capacity: default_document_queue_capacity(),
            batch_queue_capacity: default_batch_queue_capacity(),
            queue_timeout_secs: default_queue_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_table() -> String {
    "1".to_string()
}

fn default_batch_size() -> usize {
    50
}

fn default_batchers() -> usize {
    10
}

fn default_uploaders() -> usize {
    16
}

fn default_document_queue_capacity() -> usize {
    2000
}

fn default_batch_queue_capacity() -> usize {
    100
}

fn default_queue_timeout_secs() -> u64 {
    100
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl ExportConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.source.table.is_empty() {
            return Err(crate::error::Error::Config(
                "table name cannot be empty".to_string(),
            ));
        }
        match &self.sink {
            SinkConfig::Bulk { url } | SinkConfig::Document { url } => validate_url(url)?,
            SinkConfig::File { path } => {
                if path.as_os_str().is_empty() {
                    return Err(crate::error::Error::Config(
                        "output path cannot be empty".to_string(),
                    ));
                }
            }
        }

        PipelineOptions::from(&self.options).validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(sink: SinkConfig) -> ExportConfig {
        ExportConfig {
            source: SourceConfig {
                path: PathBuf::from("./data"),
                table: "1".to_string(),
                wide_ids: false,
            },
            sink,
            options: ExportOptions::default(),
        }
    }

    #[test]
    fn test_config_defaults() {
        let options = ExportOptions::default();
        assert_eq!(options.batch_size, 50);
        assert_eq!(options.batchers, 10);
        assert_eq!(options.document_queue_capacity, 2000);
        assert_eq!(options.queue_timeout_secs, 100);
    }

    #[test]
    fn test_config_yaml_parse() {
        let yaml = r#"
source:
  path: /var/gamma/data
  table: "7"
  wide_ids: true
sink:
  type: bulk
  url: http://router:9001/db/space
options:
  batch_size: 100
  uploaders: 4
"#;
        let config: ExportConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.source.table, "7");
        assert_eq!(config.source.id_width(), IdWidth::Wide);
        assert!(matches!(config.sink, SinkConfig::Bulk { ref url } if url.ends_with("/space")));
        assert_eq!(config.options.batch_size, 100);
        assert_eq!(config.options.batchers, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_yaml_file_sink() {
        let yaml = r#"
source:
  path: ./data
sink:
  type: file
  path: ./out/docs.txt
"#;
        let config: ExportConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.source.table, "1");
        assert!(!config.source.wide_ids);
        assert!(matches!(config.sink, SinkConfig::File { .. }));
    }

    #[test]
    fn test_config_validate_rejects_zero_batch() {
        let mut config = config(SinkConfig::File {
            path: PathBuf::from("out.txt"),
        });
        config.options.batch_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validate_rejects_zero_uploaders_and_timeout() {
        let mut config = config(SinkConfig::File {
            path: PathBuf::from("out.txt"),
        });
        config.options.uploaders = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("uploaders"));

        config.options.uploaders = 1;
        config.options.queue_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validate_rejects_bad_url() {
        let config = config(SinkConfig::Bulk {
            url: "ftp://router/db".to_string(),
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.yaml");
        std::fs::write(
            &path,
            "source:\n  path: ./data\nsink:\n  type: document\n  url: http://localhost:9001/db/s\n",
        )
        .unwrap();
        let config = ExportConfig::from_file(&path).unwrap();
        assert!(matches!(config.sink, SinkConfig::Document { .. }));
    }
}
