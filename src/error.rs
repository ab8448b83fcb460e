/// Error types shared across the descriptor pipeline

/// Result type for ani-strm operations
pub type Result<T> = std::result::Result<T, StrmError>;

/// Top-level error for pipeline operations
#[derive(thiserror::Error, Debug)]
pub enum StrmError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Malformed feed: {0}")]
    Feed(#[from] quick_xml::Error),

    #[error("Incomplete feed: {0}")]
    IncompleteFeed(String),

    #[error("Invalid schedule '{expression}': {source}")]
    Schedule {
        expression: String,
        #[source]
        source: cron::error::Error,
    },

    #[error("Page renderer unavailable")]
    RendererUnavailable,
}

/// Errors raised by the remote retrieval capabilities
#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Invalid proxy '{proxy}': {source}")]
    Proxy {
        proxy: String,
        #[source]
        source: reqwest::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_display() {
        let err = StrmError::from(FetchError::Status {
            status: 503,
            url: "https://openani.an-i.workers.dev/2025-7/".to_string(),
        });
        assert_eq!(
            err.to_string(),
            "Fetch error: HTTP status 503 for https://openani.an-i.workers.dev/2025-7/"
        );
    }

    #[test]
    fn test_renderer_unavailable_display() {
        assert_eq!(StrmError::RendererUnavailable.to_string(), "Page renderer unavailable");
    }
}
