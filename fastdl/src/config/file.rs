//! INI configuration file.
//!
//! ```ini
//! [download]
//! threads = 8
//! chunk_size_mb = 4
//! connect_timeout = 30
//! request_timeout = 600
//! accept_invalid_certs = false
//! report_interval_ms = 250
//!
//! [notify]
//! endpoint = 127.0.0.1:9000
//! transport = socket
//!
//! [logging]
//! level = info
//! file = /var/log/fastdl.log
//! ```
//!
//! Every key is optional. Unknown keys and sections are ignored.

use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::{Ini, Properties};
use thiserror::Error;

use super::settings::{DownloadConfig, NotifyConfig, Transport};

/// Errors raised while loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config syntax: {0}")]
    Syntax(#[from] ini::ParseError),

    #[error("invalid value '{value}' for {section}.{key}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
    },
}

/// `[download]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadSection {
    pub threads: Option<usize>,
    pub chunk_size_mb: Option<u64>,
    pub connect_timeout: Option<u64>,
    /// Seconds; zero disables the limit.
    pub request_timeout: Option<u64>,
    pub accept_invalid_certs: Option<bool>,
    pub report_interval_ms: Option<u64>,
}

/// `[notify]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotifySection {
    pub endpoint: Option<String>,
    pub transport: Option<Transport>,
}

/// `[logging]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoggingSection {
    pub level: Option<String>,
    pub file: Option<PathBuf>,
}

/// Parsed configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub download: DownloadSection,
    pub notify: NotifySection,
    pub logging: LoggingSection,
}

impl ConfigFile {
    /// Default location: `<config dir>/fastdl/config.ini`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("fastdl").join("config.ini"))
    }

    /// Load and parse a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&content)
    }

    /// Load a configuration file, falling back to defaults if it does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse configuration from INI text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(content)?;
        let mut config = Self::default();

        if let Some(props) = ini.section(Some("download")) {
            config.download = DownloadSection {
                threads: parse_key(props, "download", "threads")?,
                chunk_size_mb: parse_key(props, "download", "chunk_size_mb")?,
                connect_timeout: parse_key(props, "download", "connect_timeout")?,
                request_timeout: parse_key(props, "download", "request_timeout")?,
                accept_invalid_certs: parse_bool(props, "download", "accept_invalid_certs")?,
                report_interval_ms: parse_key(props, "download", "report_interval_ms")?,
            };
        }

        if let Some(props) = ini.section(Some("notify")) {
            config.notify = NotifySection {
                endpoint: props
                    .get("endpoint")
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from),
                transport: parse_key(props, "notify", "transport")?,
            };
        }

        if let Some(props) = ini.section(Some("logging")) {
            config.logging = LoggingSection {
                level: props.get("level").map(|s| s.trim().to_string()),
                file: props
                    .get("file")
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(PathBuf::from),
            };
        }

        Ok(config)
    }

    /// Apply file values on top of `config`'s built-in defaults.
    ///
    /// Values set here are meant to be overridden afterwards by explicit
    /// command-line flags.
    pub fn apply(&self, mut config: DownloadConfig) -> DownloadConfig {
        let dl = &self.download;
        if let Some(threads) = dl.threads {
            config = config.with_threads(threads);
        }
        if let Some(mb) = dl.chunk_size_mb {
            config = config.with_chunk_size_mb(mb);
        }
        if let Some(secs) = dl.connect_timeout {
            config = config.with_connect_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = dl.request_timeout {
            config = config.with_request_timeout((secs > 0).then(|| Duration::from_secs(secs)));
        }
        if let Some(accept) = dl.accept_invalid_certs {
            config = config.with_accept_invalid_certs(accept);
        }
        if let Some(ms) = dl.report_interval_ms {
            config = config.with_report_interval((ms > 0).then(|| Duration::from_millis(ms)));
        }
        if let Some(endpoint) = &self.notify.endpoint {
            let transport = self.notify.transport.unwrap_or(Transport::Socket);
            config = config.with_notify(Some(NotifyConfig::new(endpoint.clone(), transport)));
        }
        config
    }
}

fn parse_key<T: FromStr>(
    props: &Properties,
    section: &str,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    match props.get(key).map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                section: section.to_string(),
                key: key.to_string(),
                value: value.to_string(),
            }),
    }
}

fn parse_bool(props: &Properties, section: &str, key: &str) -> Result<Option<bool>, ConfigError> {
    match props.get(key).map(|s| s.trim().to_lowercase()) {
        None => Ok(None),
        Some(v) if v.is_empty() => Ok(None),
        Some(v) => match v.as_str() {
            "true" | "yes" | "on" | "1" => Ok(Some(true)),
            "false" | "no" | "off" | "0" => Ok(Some(false)),
            _ => Err(ConfigError::InvalidValue {
                section: section.to_string(),
                key: key.to_string(),
                value: v,
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = "\
[download]
threads = 8
chunk_size_mb = 4
connect_timeout = 10
request_timeout = 600
accept_invalid_certs = yes
report_interval_ms = 250

[notify]
endpoint = 127.0.0.1:9000
transport = websocket

[logging]
level = debug
file = /tmp/fastdl.log
";

    #[test]
    fn test_parse_full() {
        let config = ConfigFile::parse(SAMPLE).unwrap();
        assert_eq!(config.download.threads, Some(8));
        assert_eq!(config.download.chunk_size_mb, Some(4));
        assert_eq!(config.download.connect_timeout, Some(10));
        assert_eq!(config.download.request_timeout, Some(600));
        assert_eq!(config.download.accept_invalid_certs, Some(true));
        assert_eq!(config.download.report_interval_ms, Some(250));
        assert_eq!(config.notify.endpoint.as_deref(), Some("127.0.0.1:9000"));
        assert_eq!(config.notify.transport, Some(Transport::WebSocket));
        assert_eq!(config.logging.level.as_deref(), Some("debug"));
        assert_eq!(config.logging.file, Some(PathBuf::from("/tmp/fastdl.log")));
    }

    #[test]
    fn test_parse_empty() {
        let config = ConfigFile::parse("").unwrap();
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_parse_invalid_number() {
        let err = ConfigFile::parse("[download]\nthreads = many\n").unwrap_err();
        match err {
            ConfigError::InvalidValue {
                section,
                key,
                value,
            } => {
                assert_eq!(section, "download");
                assert_eq!(key, "threads");
                assert_eq!(value, "many");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_parse_invalid_transport() {
        assert!(ConfigFile::parse("[notify]\ntransport = fax\n").is_err());
    }

    #[test]
    fn test_apply_overrides_defaults() {
        let file = ConfigFile::parse(SAMPLE).unwrap();
        let config = file.apply(DownloadConfig::new(vec![], vec![]));

        assert_eq!(config.threads, 8);
        assert_eq!(config.chunk_size, 4 * 1024 * 1024);
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.request_timeout, Some(Duration::from_secs(600)));
        assert!(config.accept_invalid_certs);
        assert_eq!(config.report_interval, Some(Duration::from_millis(250)));
        assert_eq!(
            config.notify,
            Some(NotifyConfig::new("127.0.0.1:9000", Transport::WebSocket))
        );
    }

    #[test]
    fn test_zero_request_timeout_disables_limit() {
        let file = ConfigFile::parse("[download]\nrequest_timeout = 0\n").unwrap();
        let defaults =
            DownloadConfig::new(vec![], vec![]).with_request_timeout(Some(Duration::from_secs(5)));
        let config = file.apply(defaults);
        assert_eq!(config.request_timeout, None);
    }

    #[test]
    fn test_apply_endpoint_defaults_to_socket() {
        let file = ConfigFile::parse("[notify]\nendpoint = localhost:7000\n").unwrap();
        let config = file.apply(DownloadConfig::new(vec![], vec![]));
        assert_eq!(config.notify.unwrap().transport, Transport::Socket);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let config = ConfigFile::load_or_default(&temp.path().join("absent.ini")).unwrap();
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_load_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = ConfigFile::load(file.path()).unwrap();
        assert_eq!(config.download.threads, Some(8));
    }

    #[test]
    fn test_default_path_file_name() {
        if let Some(path) = ConfigFile::default_path() {
            assert!(path.ends_with("fastdl/config.ini"));
        }
    }
}
