use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrailbusterError {
    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Navigation to {url} failed after {attempts} attempt(s): {message}")]
    Navigation {
        url: String,
        attempts: u32,
        message: String,
    },

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Invalid selector: {0}")]
    Selector(String),

    #[error("Mail error: {0}")]
    Mail(String),

    #[error("Mail credentials unavailable: {0}")]
    MailCredentials(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Login(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, TrailbusterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigation_error_message() {
        let err = TrailbusterError::Navigation {
            url: "https://example.com".into(),
            attempts: 3,
            message: "timed out".into(),
        };
        assert_eq!(
            err.to_string(),
            "Navigation to https://example.com failed after 3 attempt(s): timed out"
        );
    }

    #[test]
    fn test_login_error_is_bare_reason() {
        let err = TrailbusterError::Login("Login verification failed".into());
        assert_eq!(err.to_string(), "Login verification failed");
    }
}
