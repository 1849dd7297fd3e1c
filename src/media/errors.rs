use thiserror::Error;

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("http client setup failed: {0}")]
    Client(String),

    #[error("connect timeout")]
    ConnectTimeout,

    #[error("request timeout")]
    RequestTimeout,

    #[error("http error {status}")]
    Http {
        status: reqwest::StatusCode,
        retriable: bool,
    },

    #[error("media too large ({0} bytes)")]
    BodyTooLarge(u64),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("network error: {0}")]
    Network(String),
}

impl MediaError {
    pub fn should_retry(&self) -> bool {
        match self {
            Self::Client(_) => false,
            Self::BodyTooLarge(_) => false,
            Self::Io(_) => false,
            Self::Http { retriable, .. } => *retriable,

            Self::ConnectTimeout => true,
            Self::RequestTimeout => true,
            Self::Network(_) => true,
        }
    }

    pub fn from_reqwest_error(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            if err.is_connect() {
                Self::ConnectTimeout
            } else {
                Self::RequestTimeout
            }
        } else if let Some(status) = err.status() {
            Self::Http {
                status,
                retriable: status.is_server_error() || status.as_u16() == 429,
            }
        } else {
            Self::Network(err.to_string())
        }
    }
}
