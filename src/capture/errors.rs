use thiserror::Error;

#[derive(Error, Debug)]
pub enum DriverError {
    #[error("browser session lost: {0}")]
    SessionLost(String),

    #[error("driver operation timed out")]
    Timeout,

    #[error("script error: {0}")]
    Script(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid page location: {0}")]
    Parse(#[from] url::ParseError),
}

impl DriverError {
    /// Whether the underlying session is gone for good.
    pub fn is_session_fatal(&self) -> bool {
        match self {
            Self::SessionLost(_) => true,
            Self::Io(_) => true,

            Self::Timeout => false,
            Self::Script(_) => false,
            Self::Parse(_) => false,
        }
    }
}
