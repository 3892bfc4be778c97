use std::fmt;
use std::sync::LazyLock;

use katexify_core::BlockId;
use regex::Regex;
use url::Url;

use crate::error::ConfigError;

pub const DEFAULT_API_BASE: &str = "https://api.notion.com/v1/";
pub const NOTION_VERSION: &str = "2022-06-28";
/// Largest page the children endpoint hands out.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

const TOKEN_PLACEHOLDER: &str = "your_integration_secret_here";
const PAGE_ID_PLACEHOLDER: &str = "your_page_id_here";

/// A page id at the end of the input, plain or dashed, optionally after a
/// `-` that separates it from a page title slug.
static PAGE_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:^|-)([0-9a-f]{32}|[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12})$",
    )
    .unwrap()
});

/// Connection settings for one run against a Notion page.
#[derive(Clone)]
pub struct NotionConfig {
    pub token: String,
    pub root: BlockId,
    pub api_base: Url,
    pub notion_version: String,
    pub page_size: u32,
}

impl NotionConfig {
    /// Validates the integration token and page id. Empty and placeholder
    /// values are rejected.
    pub fn new(token: &str, page_id: &str) -> Result<Self, ConfigError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(ConfigError::MissingEnv {
                var: "NOTION_API_KEY",
            });
        }
        if token == TOKEN_PLACEHOLDER {
            return Err(ConfigError::Placeholder {
                var: "NOTION_API_KEY",
            });
        }

        let page_id = page_id.trim();
        if page_id.is_empty() {
            return Err(ConfigError::MissingEnv {
                var: "PAGE_ID_TO_PROCESS",
            });
        }
        if page_id == PAGE_ID_PLACEHOLDER {
            return Err(ConfigError::Placeholder {
                var: "PAGE_ID_TO_PROCESS",
            });
        }

        Ok(Self {
            token: token.to_string(),
            root: parse_page_id(page_id)?,
            api_base: parse_api_base(DEFAULT_API_BASE)?,
            notion_version: NOTION_VERSION.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
        })
    }

    pub fn with_api_base(mut self, base: &str) -> Result<Self, ConfigError> {
        self.api_base = parse_api_base(base)?;
        Ok(self)
    }
}

impl fmt::Debug for NotionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotionConfig")
            .field("token", &"<redacted>")
            .field("root", &self.root)
            .field("api_base", &self.api_base.as_str())
            .field("notion_version", &self.notion_version)
            .field("page_size", &self.page_size)
            .finish()
    }
}

/// Accepts a bare page id (32 hex digits, dashed or not) or a page URL
/// ending in one, and returns the dashed lowercase form.
pub fn parse_page_id(input: &str) -> Result<BlockId, ConfigError> {
    let input = input.trim();
    let invalid = || ConfigError::InvalidPageId {
        input: input.to_string(),
    };

    let candidate = if input.starts_with("http://") || input.starts_with("https://") {
        let url = Url::parse(input).map_err(|e| ConfigError::UrlParse {
            url: input.to_string(),
            message: e.to_string(),
        })?;
        url.path_segments()
            .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
            .map(str::to_string)
            .ok_or_else(invalid)?
    } else {
        input.to_string()
    };

    let captures = PAGE_ID_RE.captures(&candidate).ok_or_else(invalid)?;
    let hex: String = captures[1]
        .chars()
        .filter(|c| *c != '-')
        .map(|c| c.to_ascii_lowercase())
        .collect();

    Ok(BlockId::new(format!(
        "{}-{}-{}-{}-{}",
        &hex[..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..]
    )))
}

fn parse_api_base(base: &str) -> Result<Url, ConfigError> {
    let mut base = base.trim().to_string();
    if !base.ends_with('/') {
        base.push('/');
    }
    Url::parse(&base).map_err(|e| ConfigError::UrlParse {
        url: base,
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const DASHED: &str = "0123abcd-4567-89ef-0123-456789abcdef";

    #[test]
    fn page_ids_are_normalized() {
        for input in [
            "0123abcd456789ef0123456789abcdef",
            "0123ABCD-4567-89EF-0123-456789ABCDEF",
            "  0123abcd456789ef0123456789abcdef\n",
        ] {
            assert_eq!(parse_page_id(input).unwrap().as_str(), DASHED, "{input:?}");
        }
    }

    #[test]
    fn page_urls_yield_their_trailing_id() {
        for input in [
            "https://www.notion.so/My-Notes-0123abcd456789ef0123456789abcdef",
            "https://www.notion.so/team/0123abcd456789ef0123456789abcdef?v=1",
            "https://notion.so/Title-0123abcd456789ef0123456789abcdef/",
        ] {
            assert_eq!(parse_page_id(input).unwrap().as_str(), DASHED, "{input:?}");
        }
    }

    #[test]
    fn malformed_ids_are_rejected() {
        for input in [
            "0123abcd456789ef0123456789abcde",
            "0123abcd456789ef0123456789abcdefg",
            "xyz0123abcd456789ef0123456789abcdef",
            "https://www.notion.so/",
        ] {
            assert!(
                matches!(parse_page_id(input), Err(ConfigError::InvalidPageId { .. })),
                "{input:?}"
            );
        }
    }

    #[test]
    fn placeholders_are_rejected() {
        let err = NotionConfig::new("your_integration_secret_here", DASHED).unwrap_err();
        assert!(matches!(err, ConfigError::Placeholder { var: "NOTION_API_KEY" }));

        let err = NotionConfig::new("secret_abc", "your_page_id_here").unwrap_err();
        assert!(matches!(err, ConfigError::Placeholder { var: "PAGE_ID_TO_PROCESS" }));

        let err = NotionConfig::new("  ", DASHED).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnv { var: "NOTION_API_KEY" }));
    }

    #[test]
    fn api_base_always_ends_in_a_slash() {
        let config = NotionConfig::new("secret_abc", DASHED)
            .unwrap()
            .with_api_base("http://localhost:8080/v1")
            .unwrap();
        assert_eq!(config.api_base.as_str(), "http://localhost:8080/v1/");
        assert_eq!(config.root.as_str(), DASHED);
        assert!(!format!("{config:?}").contains("secret_abc"));
    }
}
