// tests/cli_config.rs
//! Command-line parsing and configuration loading from disk.

use clap::{CommandFactory, Parser};
use conduit::commands::{Command, ConfluenceCommand, IssueCommand, JiraCommand, PagesCommand};
use conduit::{AppError, CommandLineInput, ConduitConfig, DepthPolicy, Platform};
use pretty_assertions::assert_eq;
use std::fs;
use tempfile::TempDir;

const CONFIG: &str = r#"
content_dir: /tmp/conduit-test-content
jira:
  default-site-alias: work
  sites:
    work:
      url: https://work.atlassian.net
      email: me@work.example
      api_token: abcdefghijklmnop
confluence:
  sites:
    wiki:
      url: https://wiki.atlassian.net
      email: me@wiki.example
      api_token: short
"#;

#[test]
fn command_definitions_are_consistent() {
    CommandLineInput::command().debug_assert();
}

#[test]
fn jira_create_parses_type_and_site() {
    let cli = CommandLineInput::try_parse_from([
        "conduit",
        "jira",
        "--site",
        "work",
        "issue",
        "create",
        "OPS",
        "--summary",
        "Ship it",
        "--content-file",
        "/tmp/desc.md",
        "--type",
        "Bug",
    ])
    .unwrap();

    let Command::Jira(args) = cli.command else {
        panic!("expected a jira command");
    };
    assert_eq!(args.site.as_deref(), Some("work"));
    match args.command {
        JiraCommand::Issue(IssueCommand::Create {
            project,
            summary,
            issue_type,
            ..
        }) => {
            assert_eq!(project, "OPS");
            assert_eq!(summary, "Ship it");
            assert_eq!(issue_type, "Bug");
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn confluence_content_defaults() {
    let cli =
        CommandLineInput::try_parse_from(["conduit", "confluence", "pages", "content", "DOCS"])
            .unwrap();
    assert!(!cli.verbose);

    let Command::Confluence(args) = cli.command else {
        panic!("expected a confluence command");
    };
    match args.command {
        ConfluenceCommand::Pages(PagesCommand::Content {
            space,
            depth,
            parent,
            output,
            ..
        }) => {
            assert_eq!(space, "DOCS");
            assert_eq!(depth, DepthPolicy::Root);
            assert_eq!(parent, None);
            assert_eq!(output, None);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn unknown_depth_is_rejected() {
    let result = CommandLineInput::try_parse_from([
        "conduit", "confluence", "pages", "content", "DOCS", "--depth", "deep",
    ]);
    assert!(result.is_err());
}

#[test]
fn config_file_resolves_sites() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.yaml");
    fs::write(&path, CONFIG).unwrap();

    let config = ConduitConfig::load(&path).unwrap();

    let jira = config.site(Platform::Jira, None).unwrap();
    assert_eq!(jira.alias, "work");
    assert_eq!(jira.url.as_str(), "https://work.atlassian.net/");

    let wiki = config.site(Platform::Confluence, None).unwrap();
    assert_eq!(wiki.alias, "wiki");
    assert_eq!(wiki.email, "me@wiki.example");

    assert!(matches!(
        config.site(Platform::Jira, Some("home")),
        Err(AppError::UnknownSite { .. })
    ));

    let summary = config.masked_summary();
    assert!(summary.contains("****mnop"));
    assert!(!summary.contains("abcdefghijklmnop"));
    assert!(!summary.contains("short"));
}

#[test]
fn missing_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.yaml");

    assert!(matches!(
        ConduitConfig::load(&path),
        Err(AppError::MissingConfiguration(_))
    ));
    let fallback = ConduitConfig::load_or_default(&path).unwrap();
    assert!(fallback.jira.is_none());
    assert!(fallback.site(Platform::Confluence, None).is_err());
}

#[test]
fn broken_yaml_names_the_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.yaml");
    fs::write(&path, "jira: [unclosed").unwrap();

    match ConduitConfig::load(&path) {
        Err(AppError::ConfigParse { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("unexpected result: {other:?}"),
    }
}
