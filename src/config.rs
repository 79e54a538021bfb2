// src/config.rs
use crate::commands::Command;
use crate::constants::{CONFIG_RELATIVE_PATH, CONTENT_DIR_RELATIVE_PATH, DEFAULT_SITE_ALIAS};
use crate::content::ContentFileManager;
use crate::error::AppError;
use crate::types::{ApiToken, SiteUrl};
use clap::Parser;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt::{self, Write as _};
use std::path::{Path, PathBuf};

/// Parsed command-line input.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Unified Jira and Confluence client with AI-friendly markdown output",
    long_about = None
)]
pub struct CommandLineInput {
    /// Site configuration file (defaults to ~/.config/conduit/config.yaml)
    #[arg(long, global = true, env = "CONDUIT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// The two platforms a site can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Platform {
    Jira,
    Confluence,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Jira => write!(f, "jira"),
            Platform::Confluence => write!(f, "confluence"),
        }
    }
}

/// Credentials for one Atlassian site, as written in the config file.
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    pub url: String,
    pub email: String,
    pub api_token: String,
}

/// The sites configured for one platform.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PlatformConfig {
    #[serde(default, alias = "default_site_alias")]
    pub default_site_alias: Option<String>,
    #[serde(default)]
    pub sites: BTreeMap<String, SiteConfig>,
}

impl PlatformConfig {
    fn default_alias(&self) -> &str {
        self.default_site_alias
            .as_deref()
            .unwrap_or(DEFAULT_SITE_ALIAS)
    }
}

/// A site picked from the configuration, validated and ready to connect.
#[derive(Debug, Clone)]
pub struct ResolvedSite {
    pub platform: Platform,
    pub alias: String,
    pub url: SiteUrl,
    pub email: String,
    pub token: ApiToken,
}

/// The whole configuration file, read once per invocation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConduitConfig {
    #[serde(default)]
    pub jira: Option<PlatformConfig>,
    #[serde(default)]
    pub confluence: Option<PlatformConfig>,
    #[serde(default)]
    content_dir: Option<String>,
}

impl ConduitConfig {
    /// `~/.config/conduit/config.yaml`
    pub fn default_path() -> Result<PathBuf, AppError> {
        dirs::home_dir()
            .map(|home| home.join(CONFIG_RELATIVE_PATH))
            .ok_or_else(|| {
                AppError::MissingConfiguration("Could not determine home directory".to_string())
            })
    }

    /// Reads and parses the configuration file.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        if !path.exists() {
            return Err(AppError::MissingConfiguration(format!(
                "Config file not found at {}",
                path.display()
            )));
        }
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_yaml(&text).map_err(|source| AppError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Like `load`, but a missing file yields the empty configuration.
    pub fn load_or_default(path: &Path) -> Result<Self, AppError> {
        if path.exists() {
            Self::load(path)
        } else {
            log::debug!("No configuration at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        // An empty file deserializes to unit, not to a mapping.
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }

    pub fn platform(&self, platform: Platform) -> Option<&PlatformConfig> {
        match platform {
            Platform::Jira => self.jira.as_ref(),
            Platform::Confluence => self.confluence.as_ref(),
        }
    }

    /// Picks a site by alias, falling back to the platform's default alias
    /// and then to the only site when just one is configured.
    pub fn site(&self, platform: Platform, alias: Option<&str>) -> Result<ResolvedSite, AppError> {
        let section = self.platform(platform).ok_or_else(|| {
            AppError::MissingConfiguration(format!("No {} section in configuration", platform))
        })?;

        let wanted = alias.unwrap_or_else(|| section.default_alias());
        let (name, site) = match section.sites.get_key_value(wanted) {
            Some(found) => found,
            None => match (alias, section.sites.iter().next()) {
                (None, Some(only)) if section.sites.len() == 1 => only,
                _ => {
                    return Err(AppError::UnknownSite {
                        platform: platform.to_string(),
                        alias: wanted.to_string(),
                    })
                }
            },
        };

        Ok(ResolvedSite {
            platform,
            alias: name.clone(),
            url: SiteUrl::parse(&site.url)?,
            email: site.email.clone(),
            token: ApiToken::new(site.api_token.clone())?,
        })
    }

    /// The scratch directory for content files, with `~` expanded.
    pub fn content_dir(&self) -> PathBuf {
        match self.content_dir.as_deref() {
            Some(dir) => expand_home(dir),
            None => dirs::home_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join(CONTENT_DIR_RELATIVE_PATH),
        }
    }

    pub fn content_manager(&self) -> ContentFileManager {
        ContentFileManager::new(self.content_dir())
    }

    /// Every configured site with its token masked, for `config list`.
    pub fn masked_summary(&self) -> String {
        let mut out = String::new();
        for platform in [Platform::Jira, Platform::Confluence] {
            let Some(section) = self.platform(platform) else {
                continue;
            };
            let _ = writeln!(out, "{}:", platform);
            let _ = writeln!(out, "  default-site-alias: {}", section.default_alias());
            for (alias, site) in &section.sites {
                let _ = writeln!(out, "  {}:", alias);
                let _ = writeln!(out, "    url: {}", site.url);
                let _ = writeln!(out, "    email: {}", site.email);
                let _ = writeln!(out, "    api_token: {}", mask_token(&site.api_token));
            }
        }
        let _ = write!(out, "content_dir: {}", self.content_dir().display());
        out
    }
}

/// Keeps only the last four characters of long tokens.
fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{}", tail)
}

fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ if path == "~" => dirs::home_dir().unwrap_or_else(|| PathBuf::from(path)),
        _ => PathBuf::from(path),
    }
}
