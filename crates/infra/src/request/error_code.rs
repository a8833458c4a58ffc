//! Transport error codes
//!
//! Network failures are reported with the POSIX style codes operators know from
//! other tooling, so a retry policy can name them (`ETIMEDOUT`, `ECONNRESET`...).

use std::error::Error as _;

use serde::Serialize;

/// Code of a transport level failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display, strum::EnumString)]
pub enum ErrorCode {
    /// No response within the per-attempt timeout
    #[serde(rename = "ETIMEDOUT")]
    #[strum(serialize = "ETIMEDOUT")]
    Timeout,

    #[serde(rename = "ECONNRESET")]
    #[strum(serialize = "ECONNRESET")]
    ConnectionReset,

    #[serde(rename = "ECONNREFUSED")]
    #[strum(serialize = "ECONNREFUSED")]
    ConnectionRefused,

    /// Host name did not resolve
    #[serde(rename = "ENOTFOUND")]
    #[strum(serialize = "ENOTFOUND")]
    HostNotFound,

    #[serde(rename = "EPIPE")]
    #[strum(serialize = "EPIPE")]
    BrokenPipe,

    #[serde(rename = "EUNKNOWN")]
    #[strum(serialize = "EUNKNOWN")]
    Unknown,
}

impl ErrorCode {
    /// Classifies a reqwest error
    ///
    /// Timeouts are reported by reqwest directly. Other causes are found by
    /// walking the source chain down to the underlying `io::Error`.
    pub fn classify(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::Timeout;
        }

        let mut source = err.source();
        while let Some(cause) = source {
            if let Some(code) = cause
                .downcast_ref::<std::io::Error>()
                .and_then(|io| Self::from_io_kind(io.kind()))
            {
                return code;
            }
            if cause.to_string().contains("dns error") {
                return Self::HostNotFound;
            }
            source = cause.source();
        }

        if err.is_connect() {
            Self::ConnectionRefused
        } else {
            Self::Unknown
        }
    }

    fn from_io_kind(kind: std::io::ErrorKind) -> Option<Self> {
        use std::io::ErrorKind;

        match kind {
            ErrorKind::TimedOut => Some(Self::Timeout),
            ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted => {
                Some(Self::ConnectionReset)
            }
            ErrorKind::ConnectionRefused => Some(Self::ConnectionRefused),
            ErrorKind::BrokenPipe => Some(Self::BrokenPipe),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::ErrorKind;

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(ErrorCode::Timeout, "ETIMEDOUT")]
    #[case(ErrorCode::ConnectionReset, "ECONNRESET")]
    #[case(ErrorCode::ConnectionRefused, "ECONNREFUSED")]
    #[case(ErrorCode::HostNotFound, "ENOTFOUND")]
    #[case(ErrorCode::BrokenPipe, "EPIPE")]
    #[case(ErrorCode::Unknown, "EUNKNOWN")]
    fn test_display_serialize_and_parse_agree(#[case] code: ErrorCode, #[case] expected: &str) {
        assert_eq!(code.to_string(), expected);
        assert_eq!(serde_json::to_value(code).unwrap(), serde_json::json!(expected));
        assert_eq!(expected.parse::<ErrorCode>().unwrap(), code);
    }

    #[rstest]
    #[case(ErrorKind::TimedOut, Some(ErrorCode::Timeout))]
    #[case(ErrorKind::ConnectionReset, Some(ErrorCode::ConnectionReset))]
    #[case(ErrorKind::ConnectionAborted, Some(ErrorCode::ConnectionReset))]
    #[case(ErrorKind::ConnectionRefused, Some(ErrorCode::ConnectionRefused))]
    #[case(ErrorKind::BrokenPipe, Some(ErrorCode::BrokenPipe))]
    #[case(ErrorKind::PermissionDenied, None)]
    fn test_from_io_kind(#[case] kind: ErrorKind, #[case] expected: Option<ErrorCode>) {
        assert_eq!(ErrorCode::from_io_kind(kind), expected);
    }

    #[tokio::test]
    async fn test_classify_refused_connection() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let err = reqwest::Client::new()
            .get(format!("http://127.0.0.1:{port}/"))
            .send()
            .await
            .unwrap_err();

        assert_eq!(ErrorCode::classify(&err), ErrorCode::ConnectionRefused);
    }
}
