// src/types/domain_types.rs
//! Domain-specific newtypes for type safety and validation.

use super::ValidationError;
use crate::constants::DEFAULT_CONTENT_PURPOSE;
use std::fmt;
use url::Url;

/// Atlassian API token used with basic authentication.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiToken(String);

impl ApiToken {
    pub fn new(token: impl Into<String>) -> Result<Self, ValidationError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(ValidationError::InvalidApiToken {
                reason: "API token cannot be empty".to_string(),
            });
        }
        if token.chars().any(char::is_whitespace) {
            return Err(ValidationError::InvalidApiToken {
                reason: "API token cannot contain whitespace".to_string(),
            });
        }
        Ok(Self(token))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "****")
    }
}

impl fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ApiToken").field(&"****").finish()
    }
}

/// Base URL of an Atlassian site, always ending in `/` so relative API
/// paths join underneath it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteUrl(Url);

impl SiteUrl {
    pub fn parse(url: &str) -> Result<Self, ValidationError> {
        let mut parsed = Url::parse(url.trim()).map_err(|e| ValidationError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(ValidationError::InvalidUrl {
                url: url.to_string(),
                reason: "Only HTTP and HTTPS URLs are supported".to_string(),
            });
        }

        if !parsed.path().ends_with('/') {
            let path = format!("{}/", parsed.path());
            parsed.set_path(&path);
        }
        Ok(Self(parsed))
    }

    /// Returns the URL with `segment/` appended unless the path already
    /// contains it (Confluence Cloud lives under `/wiki`).
    pub fn with_segment(&self, segment: &str) -> Self {
        let already_present = self
            .0
            .path_segments()
            .map(|mut segments| segments.any(|s| s == segment))
            .unwrap_or(false);
        if already_present {
            return self.clone();
        }
        let mut url = self.0.clone();
        let path = format!("{}{}/", url.path(), segment);
        url.set_path(&path);
        Self(url)
    }

    /// Joins a relative endpoint onto the base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.0.as_str(), path.trim_start_matches('/'))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for SiteUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Purpose tag of a content file, embedded in its file name.
///
/// Any input is accepted; characters outside `[a-z0-9_-]` collapse to `-`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentPurpose(String);

impl ContentPurpose {
    pub fn new(purpose: &str) -> Self {
        let mut slug = String::with_capacity(purpose.len());
        for c in purpose.trim().chars() {
            if c.is_ascii_alphanumeric() || c == '_' {
                slug.push(c.to_ascii_lowercase());
            } else if !slug.ends_with('-') {
                slug.push('-');
            }
        }
        let slug = slug.trim_matches('-');
        if slug.is_empty() {
            Self(DEFAULT_CONTENT_PURPOSE.to_string())
        } else {
            Self(slug.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_token_is_redacted() {
        let token = ApiToken::new("ATATT3xFfGF0secret").unwrap();
        assert_eq!(token.to_string(), "****");
        assert!(!format!("{:?}", token).contains("secret"));
        assert!(ApiToken::new("  ").is_err());
    }

    #[test]
    fn site_url_gains_trailing_slash_and_wiki_segment() {
        let site = SiteUrl::parse("https://acme.atlassian.net").unwrap();
        assert_eq!(site.as_str(), "https://acme.atlassian.net/");

        let wiki = site.with_segment("wiki");
        assert_eq!(wiki.as_str(), "https://acme.atlassian.net/wiki/");
        assert_eq!(wiki.with_segment("wiki"), wiki);
        assert_eq!(
            wiki.endpoint("/rest/api/content"),
            "https://acme.atlassian.net/wiki/rest/api/content"
        );
    }

    #[test]
    fn site_url_rejects_other_schemes() {
        assert!(SiteUrl::parse("ftp://acme.atlassian.net").is_err());
        assert!(SiteUrl::parse("not a url").is_err());
    }

    #[test]
    fn content_purpose_is_slugged() {
        assert_eq!(ContentPurpose::new("comment").as_str(), "comment");
        assert_eq!(ContentPurpose::new("Issue Description").as_str(), "issue-description");
        assert_eq!(ContentPurpose::new("../../etc").as_str(), "etc");
        assert_eq!(ContentPurpose::new("").as_str(), "content");
    }
}
