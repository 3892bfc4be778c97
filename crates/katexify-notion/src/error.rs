use miette::Diagnostic;
use thiserror::Error;

/// Errors from talking to the Notion API
#[derive(Debug, Error, Diagnostic)]
pub enum NotionError {
    #[error("request to {url} failed")]
    #[diagnostic(code(notion::http), help("check network access to the Notion API"))]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Notion API returned {status} ({code}): {message}")]
    #[diagnostic(code(notion::api))]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("failed to decode response from {url}: {message}")]
    #[diagnostic(code(notion::decode))]
    Decode { url: String, message: String },
}

impl NotionError {
    /// Short form used when the error is folded into a store failure.
    pub fn summary(&self) -> String {
        match self {
            NotionError::Http { source, .. } => source.to_string(),
            NotionError::Api {
                status,
                code,
                message,
            } => format!("{status} {code}: {message}"),
            NotionError::Decode { message, .. } => message.clone(),
        }
    }
}

/// Configuration errors
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("missing required environment variable: {var}")]
    #[diagnostic(
        code(config::missing_env),
        help("Set the {var} environment variable or add it to your .env file")
    )]
    MissingEnv { var: &'static str },

    #[error("{var} is still set to the placeholder value")]
    #[diagnostic(
        code(config::placeholder),
        help("Replace the placeholder for {var} in your .env file with a real value")
    )]
    Placeholder { var: &'static str },

    #[error("not a Notion page id: {input}")]
    #[diagnostic(
        code(config::page_id),
        help("Use the 32 hex digit id at the end of the page URL, with or without dashes")
    )]
    InvalidPageId { input: String },

    #[error("failed to parse URL: {url}")]
    #[diagnostic(code(config::url_parse))]
    UrlParse { url: String, message: String },
}
