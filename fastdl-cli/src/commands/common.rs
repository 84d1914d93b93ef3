//! Types shared across CLI commands.

use std::path::PathBuf;

use clap::ValueEnum;
use fastdl::config::Transport;

use crate::error::CliError;

/// Notification transport selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum TransportArg {
    /// Newline-delimited JSON over TCP
    Socket,
    /// JSON text frames over a WebSocket
    Websocket,
}

impl From<TransportArg> for Transport {
    fn from(arg: TransportArg) -> Self {
        match arg {
            TransportArg::Socket => Transport::Socket,
            TransportArg::Websocket => Transport::WebSocket,
        }
    }
}

/// File name to save `url` under when no output path is given.
///
/// Uses the last path segment, ignoring any query or fragment.
pub fn file_name_from_url(url: &str) -> Result<PathBuf, CliError> {
    let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    let path = without_scheme
        .split(['?', '#'])
        .next()
        .unwrap_or_default();

    match path.split_once('/') {
        Some((_, path)) => path
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty() && *name != "." && *name != "..")
            .map(PathBuf::from)
            .ok_or_else(|| no_file_name(url)),
        None => Err(no_file_name(url)),
    }
}

fn no_file_name(url: &str) -> CliError {
    CliError::Config(format!(
        "cannot derive a file name from '{}'; use --output",
        url
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_file_name_from_url() {
        assert_eq!(
            file_name_from_url("https://example.com/isos/big.iso").unwrap(),
            PathBuf::from("big.iso")
        );
        assert_eq!(
            file_name_from_url("http://example.com/a/b.tar.gz?token=1#frag").unwrap(),
            PathBuf::from("b.tar.gz")
        );
    }

    #[test]
    fn test_file_name_requires_path_segment() {
        assert!(file_name_from_url("https://example.com").is_err());
        assert!(file_name_from_url("https://example.com/").is_err());
        assert!(file_name_from_url("https://example.com/dir/").is_err());
    }

    #[test]
    fn test_transport_arg_conversion() {
        assert_eq!(Transport::from(TransportArg::Socket), Transport::Socket);
        assert_eq!(Transport::from(TransportArg::Websocket), Transport::WebSocket);
    }

    proptest! {
        #[test]
        fn test_last_segment_is_file_name(
            dirs in proptest::collection::vec("[a-z0-9]{1,8}", 0..4),
            name in "[A-Za-z0-9_-]{1,16}\\.[a-z]{1,4}",
        ) {
            let mut url = String::from("https://example.com/");
            for dir in &dirs {
                url.push_str(dir);
                url.push('/');
            }
            url.push_str(&name);
            prop_assert_eq!(file_name_from_url(&url).unwrap(), PathBuf::from(&name));
        }
    }
}
