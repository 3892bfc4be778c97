//! [`TreeStore`] over the Notion REST API.
//!
//! Calls are made exactly once; failures come back as [`StoreError`]s for the
//! walker to record.

use katexify_core::error::Operation;
use katexify_core::store::ChildPage;
use katexify_core::{Block, BlockId, BlockUpdate, NewBlock, StoreError, TreeStore};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use url::Url;

use crate::config::NotionConfig;
use crate::error::NotionError;

/// Body of `PATCH blocks/{id}/children`.
#[derive(Debug, Serialize)]
struct AppendBody<'a> {
    children: [&'a NewBlock; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    after: Option<&'a BlockId>,
}

#[derive(Debug, Deserialize)]
struct AppendResponse {
    results: Vec<Block>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: String,
    message: String,
}

#[derive(Debug, Deserialize)]
struct Ignored {}

pub struct NotionClient {
    http: reqwest::Client,
    config: NotionConfig,
}

impl NotionClient {
    pub fn new(config: NotionConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &NotionConfig {
        &self.config
    }

    pub fn endpoint(&self, path: &str) -> Result<Url, NotionError> {
        self.config
            .api_base
            .join(path)
            .map_err(|e| NotionError::Decode {
                url: format!("{}{path}", self.config.api_base),
                message: e.to_string(),
            })
    }

    pub fn children_url(&self, parent: &BlockId, cursor: Option<&str>) -> Result<Url, NotionError> {
        let mut url = self.endpoint(&format!("blocks/{parent}/children"))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("page_size", &self.config.page_size.to_string());
            if let Some(cursor) = cursor {
                query.append_pair("start_cursor", cursor);
            }
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.http
            .request(method, url)
            .bearer_auth(&self.config.token)
            .header("Notion-Version", &self.config.notion_version)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, NotionError> {
        let response = request.send().await.map_err(|source| NotionError::Http {
            url: source.url().map(Url::to_string).unwrap_or_default(),
            source,
        })?;
        let url = response.url().to_string();
        let status = response.status();
        let body = response.text().await.map_err(|source| NotionError::Http {
            url: url.clone(),
            source,
        })?;
        trace!(%url, status = status.as_u16(), "notion response");

        if !status.is_success() {
            return Err(api_error(status.as_u16(), &body));
        }
        serde_json::from_str(&body).map_err(|e| NotionError::Decode {
            url,
            message: e.to_string(),
        })
    }
}

/// Builds an API error from a non-2xx response body.
fn api_error(status: u16, body: &str) -> NotionError {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody { code, message }) => NotionError::Api {
            status,
            code,
            message,
        },
        Err(_) => NotionError::Api {
            status,
            code: "unknown".to_string(),
            message: body.trim().chars().take(200).collect(),
        },
    }
}

impl TreeStore for NotionClient {
    async fn list_children(
        &self,
        parent: &BlockId,
        cursor: Option<&str>,
    ) -> Result<ChildPage, StoreError> {
        let fetch = async {
            let url = self.children_url(parent, cursor)?;
            self.send::<ChildPage>(self.request(Method::GET, url)).await
        };
        let page = fetch
            .await
            .map_err(|e| StoreError::read(parent, e.summary()))?;
        debug!(%parent, count = page.results.len(), more = page.next_cursor.is_some(), "listed children");
        Ok(page)
    }

    async fn append_child(
        &self,
        parent: &BlockId,
        block: &NewBlock,
        after: Option<&BlockId>,
    ) -> Result<Block, StoreError> {
        let fetch = async {
            let url = self.endpoint(&format!("blocks/{parent}/children"))?;
            let body = AppendBody {
                children: [block],
                after,
            };
            self.send::<AppendResponse>(self.request(Method::PATCH, url).json(&body))
                .await
        };
        let response = fetch
            .await
            .map_err(|e| StoreError::write(Operation::Append, parent, e.summary()))?;
        response.results.into_iter().next().ok_or_else(|| {
            StoreError::write(Operation::Append, parent, "response listed no created block")
        })
    }

    async fn update_block(&self, id: &BlockId, update: &BlockUpdate) -> Result<(), StoreError> {
        let fetch = async {
            let url = self.endpoint(&format!("blocks/{id}"))?;
            self.send::<Ignored>(self.request(Method::PATCH, url).json(update))
                .await
        };
        fetch
            .await
            .map(|_| ())
            .map_err(|e| StoreError::write(Operation::Update, id, e.summary()))
    }

    async fn delete_block(&self, id: &BlockId) -> Result<(), StoreError> {
        let fetch = async {
            let url = self.endpoint(&format!("blocks/{id}"))?;
            self.send::<Ignored>(self.request(Method::DELETE, url)).await
        };
        fetch
            .await
            .map(|_| ())
            .map_err(|e| StoreError::write(Operation::Delete, id, e.summary()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use katexify_core::RichText;
    use serde_json::json;

    fn client() -> NotionClient {
        let config = NotionConfig::new("secret_abc", "0123abcd456789ef0123456789abcdef")
            .unwrap()
            .with_api_base("http://localhost:9999/v1")
            .unwrap();
        NotionClient::new(config)
    }

    #[test]
    fn children_urls_carry_paging() {
        let client = client();
        let parent = client.config().root.clone();
        assert_eq!(
            client.children_url(&parent, None).unwrap().as_str(),
            "http://localhost:9999/v1/blocks/0123abcd-4567-89ef-0123-456789abcdef/children?page_size=100"
        );
        assert_eq!(
            client
                .children_url(&parent, Some("abc-123"))
                .unwrap()
                .as_str(),
            "http://localhost:9999/v1/blocks/0123abcd-4567-89ef-0123-456789abcdef/children?page_size=100&start_cursor=abc-123"
        );
    }

    #[test]
    fn append_body_anchors_after_a_sibling() {
        let block = NewBlock::Paragraph(vec![RichText::text("a")]);
        let after = BlockId::new("prev");
        let body = AppendBody {
            children: [&block],
            after: Some(&after),
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "children": [{
                    "object": "block",
                    "type": "paragraph",
                    "paragraph": { "rich_text": [{ "type": "text", "text": { "content": "a" } }] }
                }],
                "after": "prev"
            })
        );

        let body = AppendBody {
            children: [&block],
            after: None,
        };
        assert!(serde_json::to_value(&body).unwrap().get("after").is_none());
    }

    #[test]
    fn error_bodies_are_decoded() {
        let err = api_error(
            400,
            r#"{"object":"error","status":400,"code":"validation_error","message":"body failed validation"}"#,
        );
        assert_eq!(err.summary(), "400 validation_error: body failed validation");

        let err = api_error(502, "<html>Bad Gateway</html>\n");
        assert_eq!(err.summary(), "502 unknown: <html>Bad Gateway</html>");
    }

    #[tokio::test]
    async fn unreachable_api_is_a_read_error() {
        let config = NotionConfig::new("secret_abc", "0123abcd456789ef0123456789abcdef")
            .unwrap()
            .with_api_base("http://127.0.0.1:1/v1")
            .unwrap();
        let client = NotionClient::new(config);
        let root = client.config().root.clone();
        let err = client.list_children(&root, None).await.unwrap_err();
        assert_eq!(err.operation(), Operation::ListChildren);
        assert_eq!(err.block_id(), &root);
    }
}
