// src/api/confluence.rs
//! Confluence REST client: page reads, listings and writes.

use super::client::AtlassianHttpClient;
use super::responses::{ContentEntity, ContentList};
use super::{BatchRequest, BatchScope, WikiRepository};
use crate::constants::CONFLUENCE_PAGE_EXPAND;
use crate::error::AppError;
use crate::model::{PageBatch, PageDraft, PageRecord, PageUpdate};
use crate::types::{ApiToken, PageId, SiteUrl, SpaceKey};
use serde_json::{json, Value};

/// Confluence client rooted at the site's `/wiki/` path.
#[derive(Debug, Clone)]
pub struct ConfluenceClient {
    http: AtlassianHttpClient,
}

impl ConfluenceClient {
    /// Connects to a site, appending `/wiki` to the base URL unless present.
    pub fn connect(site: &SiteUrl, email: &str, token: ApiToken) -> Result<Self, AppError> {
        let http = AtlassianHttpClient::new(site.with_segment("wiki"), email, token)?;
        Ok(Self::new(http))
    }

    pub fn new(http: AtlassianHttpClient) -> Self {
        Self { http }
    }

    fn expand() -> (&'static str, String) {
        ("expand", CONFLUENCE_PAGE_EXPAND.to_string())
    }

    fn storage_body(body: &str) -> Value {
        json!({ "storage": { "value": body, "representation": "storage" } })
    }
}

#[async_trait::async_trait]
impl WikiRepository for ConfluenceClient {
    async fn fetch_page(&self, id: &PageId) -> Result<PageRecord, AppError> {
        let endpoint = format!("rest/api/content/{}", id);
        let entity: ContentEntity = self.http.get_json(&endpoint, &[Self::expand()]).await?;
        entity.into_record(None)
    }

    async fn fetch_page_by_title(&self, space: &SpaceKey, title: &str) -> Result<PageRecord, AppError> {
        let query = [
            ("spaceKey", space.to_string()),
            ("title", title.to_string()),
            ("type", "page".to_string()),
            Self::expand(),
        ];
        let list: ContentList = self.http.get_json("rest/api/content", &query).await?;
        let entity = list.results.into_iter().next().ok_or_else(|| {
            AppError::NotFound(format!("Page '{}' not found in space {}", title, space))
        })?;
        entity.into_record(Some(space))
    }

    async fn fetch_batch(&self, request: &BatchRequest) -> Result<PageBatch, AppError> {
        let start = request.token.as_ref().map(|t| t.offset()).unwrap_or(0);
        let mut query = vec![
            ("start", start.to_string()),
            ("limit", request.limit.to_string()),
            Self::expand(),
        ];

        let endpoint = match &request.scope {
            BatchScope::Root => {
                query.push(("depth", "root".to_string()));
                format!("rest/api/space/{}/content/page", request.space)
            }
            BatchScope::Children(parent) => format!("rest/api/content/{}/child/page", parent),
            BatchScope::Space => format!("rest/api/space/{}/content/page", request.space),
        };

        log::debug!(
            "Fetching {:?} batch for space {} at offset {}",
            request.scope,
            request.space,
            start
        );
        let list: ContentList = self.http.get_json(&endpoint, &query).await?;
        list.into_batch(&request.space)
    }

    async fn create_page(&self, draft: &PageDraft) -> Result<PageRecord, AppError> {
        let mut body = json!({
            "type": "page",
            "title": draft.title,
            "space": { "key": draft.space_key.as_str() },
            "body": Self::storage_body(&draft.body),
        });
        if let Some(parent) = &draft.parent_id {
            body["ancestors"] = json!([{ "id": parent.as_str() }]);
        }

        let entity: ContentEntity = self.http.post_json("rest/api/content", &body).await?;
        log::info!("Created page {} in space {}", entity.id, draft.space_key);
        entity.into_record(Some(&draft.space_key))
    }

    async fn update_page(&self, update: &PageUpdate) -> Result<PageRecord, AppError> {
        let body = json!({
            "id": update.id.as_str(),
            "type": "page",
            "title": update.title,
            "version": { "number": update.version + 1 },
            "body": Self::storage_body(&update.body),
        });

        let endpoint = format!("rest/api/content/{}", update.id);
        let entity: ContentEntity = self.http.put_json(&endpoint, &body).await?;
        log::info!("Updated page {} to version {}", update.id, update.version + 1);
        entity.into_record(Some(&update.space_key))
    }

    async fn current_user(&self) -> Result<Value, AppError> {
        self.http.get_json("rest/api/user/current", &[]).await
    }
}
