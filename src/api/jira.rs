// src/api/jira.rs
//! Jira REST client (API v2, wiki-markup bodies).

use super::client::AtlassianHttpClient;
use super::responses::{RemoteLinkEntity, SearchResponse, TransitionList};
use super::IssueTracker;
use crate::constants::JIRA_API_PREFIX;
use crate::error::AppError;
use crate::model::{IssueDraft, IssueUpdate, RemoteLink, Transition};
use crate::types::{ApiToken, IssueKey, SiteUrl};
use serde_json::{json, Map, Value};

#[derive(Debug, Clone)]
pub struct JiraClient {
    http: AtlassianHttpClient,
}

impl JiraClient {
    pub fn connect(site: &SiteUrl, email: &str, token: ApiToken) -> Result<Self, AppError> {
        let http = AtlassianHttpClient::new(site.clone(), email, token)?;
        Ok(Self::new(http))
    }

    pub fn new(http: AtlassianHttpClient) -> Self {
        Self { http }
    }

    fn endpoint(path: &str) -> String {
        format!("{}/{}", JIRA_API_PREFIX, path)
    }
}

#[async_trait::async_trait]
impl IssueTracker for JiraClient {
    async fn get_issue(&self, key: &IssueKey) -> Result<Value, AppError> {
        self.http
            .get_json(&Self::endpoint(&format!("issue/{}", key)), &[])
            .await
    }

    async fn search(&self, jql: &str, max_results: usize) -> Result<Vec<Value>, AppError> {
        let query = [
            ("jql", jql.to_string()),
            ("maxResults", max_results.to_string()),
        ];
        let response: SearchResponse = self.http.get_json(&Self::endpoint("search"), &query).await?;
        log::debug!("JQL '{}' matched {} issue(s)", jql, response.issues.len());
        Ok(response.issues)
    }

    async fn create_issue(&self, draft: &IssueDraft) -> Result<Value, AppError> {
        let body = json!({
            "fields": {
                "project": { "key": draft.project_key },
                "summary": draft.summary,
                "description": draft.description,
                "issuetype": { "name": draft.issue_type },
            }
        });
        let created: Value = self.http.post_json(&Self::endpoint("issue"), &body).await?;
        log::info!(
            "Created issue {}",
            created.get("key").and_then(Value::as_str).unwrap_or("?")
        );
        Ok(created)
    }

    async fn update_issue(&self, key: &IssueKey, update: &IssueUpdate) -> Result<(), AppError> {
        let mut fields = Map::new();
        if let Some(summary) = &update.summary {
            fields.insert("summary".to_string(), json!(summary));
        }
        if let Some(description) = &update.description {
            fields.insert("description".to_string(), json!(description));
        }
        let body = json!({ "fields": fields });
        self.http
            .put_no_content(&Self::endpoint(&format!("issue/{}", key)), &body)
            .await
    }

    async fn add_comment(&self, key: &IssueKey, body: &str) -> Result<Value, AppError> {
        let payload = json!({ "body": body });
        self.http
            .post_json(&Self::endpoint(&format!("issue/{}/comment", key)), &payload)
            .await
    }

    async fn transitions(&self, key: &IssueKey) -> Result<Vec<Transition>, AppError> {
        let list: TransitionList = self
            .http
            .get_json(&Self::endpoint(&format!("issue/{}/transitions", key)), &[])
            .await?;
        Ok(list.transitions)
    }

    async fn transition_issue(&self, key: &IssueKey, transition_id: &str) -> Result<(), AppError> {
        let body = json!({ "transition": { "id": transition_id } });
        self.http
            .post_no_content(&Self::endpoint(&format!("issue/{}/transitions", key)), &body)
            .await
    }

    async fn remote_links(&self, key: &IssueKey) -> Result<Vec<RemoteLink>, AppError> {
        let entities: Vec<RemoteLinkEntity> = self
            .http
            .get_json(&Self::endpoint(&format!("issue/{}/remotelink", key)), &[])
            .await?;
        Ok(entities.into_iter().map(|e| e.into_link(key)).collect())
    }

    async fn myself(&self) -> Result<Value, AppError> {
        self.http.get_json(&Self::endpoint("myself"), &[]).await
    }
}
