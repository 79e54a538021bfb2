// tests/normalization.rs
//! End-to-end tests for storage-format normalization: raw page bodies in,
//! markdown out.

use chrono::{TimeZone, Utc};
use conduit::constants::STORAGE_MAX_NESTING_DEPTH;
use conduit::{
    markdown_to_storage, parse, parse_with_diagnostics, render, render_page, render_page_as,
    render_storage, BodyFormat, MarkupIssue, PageId, PageRecord, SpaceKey, StructuralNode,
};
use pretty_assertions::assert_eq;

const RELEASE_PAGE: &str = concat!(
    "<h2>Overview</h2>",
    "<p>The <strong>deploy</strong> service ships <em>nightly</em>. ",
    "See <a href=\"https://example.com/runbook\">the runbook</a>.</p>",
    "<ac:structured-macro ac:name=\"info\"><ac:rich-text-body>",
    "<p>Freeze starts Friday.</p>",
    "</ac:rich-text-body></ac:structured-macro>",
    "<ul><li>Build</li><li>Test</li></ul>",
    "<ac:structured-macro ac:name=\"code\">",
    "<ac:parameter ac:name=\"language\">bash</ac:parameter>",
    "<ac:plain-text-body><![CDATA[make  release\n]]></ac:plain-text-body>",
    "</ac:structured-macro>",
    "<table><tbody><tr><th>Env</th><th>Owner</th></tr>",
    "<tr><td>prod</td><td>ops</td></tr></tbody></table>",
);

#[test]
fn heading_and_list_scenario() {
    let markdown = render_storage("<h1>Title</h1><ul><li>a</li><li>b</li></ul>");
    assert_eq!(markdown, "# Title\n- a\n- b");
}

#[test]
fn release_page_renders_to_markdown() {
    insta::assert_snapshot!(render_storage(RELEASE_PAGE), @r#"
    ## Overview
    The **deploy** service ships *nightly*. See [the runbook](https://example.com/runbook).
    > **Info:** Freeze starts Friday.

    - Build
    - Test
    ```bash
    make  release
    ```
    | Env | Owner |
    | --- | --- |
    | prod | ops |
    "#);
}

/// Depth of the deepest node, counting the root as 1.
fn tree_depth(root: &StructuralNode) -> usize {
    let mut deepest = 0;
    let mut pending = vec![(root, 1)];
    while let Some((node, depth)) = pending.pop() {
        deepest = deepest.max(depth);
        pending.extend(node.children().iter().map(|child| (child, depth + 1)));
    }
    deepest
}

#[test]
fn rendering_is_deterministic() {
    let tree = parse(RELEASE_PAGE);
    assert_eq!(render(&tree), render(&tree));
    assert_eq!(render(&tree), render_storage(RELEASE_PAGE));
}

#[test]
fn code_bodies_survive_byte_for_byte() {
    let body = "if a < b && c > d {\n\treturn \"&amp;\";\n}\n\n   trailing   \n";
    let raw = format!(
        "<ac:structured-macro ac:name=\"code\"><ac:plain-text-body><![CDATA[{body}]]></ac:plain-text-body></ac:structured-macro>"
    );

    match &parse(&raw).children()[0] {
        StructuralNode::CodeBlock { text, language } => {
            assert_eq!(text, body);
            assert_eq!(language, &None);
        }
        other => panic!("expected a code block, got {other:?}"),
    }
    assert!(render_storage(&raw).contains(body));
}

#[test]
fn malformed_markup_still_renders() {
    let (tree, issues) = parse_with_diagnostics("<p>unclosed <strong>bold");
    assert!(!issues.is_empty());
    assert_eq!(render(&tree), "unclosed **bold**");

    for raw in ["", "<", "</p></p>", "<ac:structured-macro", "&bogus; & text", "<![CDATA["] {
        // Must never panic, whatever the input.
        let _ = render_storage(raw);
    }
}

#[test]
fn entities_and_unknown_macros() {
    let raw = concat!(
        "<p>Fish &amp; chips &lt;3</p>",
        "<ac:structured-macro ac:name=\"gliffy\"><ac:parameter ac:name=\"name\">arch</ac:parameter></ac:structured-macro>",
        "<p>after</p>",
    );
    assert_eq!(render_storage(raw), "Fish & chips <3\n\nafter");
}

#[test]
fn page_document_has_details_header() {
    let record = PageRecord::new(
        PageId::parse("98765").unwrap(),
        "Release Notes",
        SpaceKey::new("ENG").unwrap(),
        3,
        "<p>Shipped <em>everything</em>.</p>",
    )
    .with_last_updated(Some(Utc.with_ymd_and_hms(2024, 5, 2, 9, 30, 0).unwrap()));

    insta::assert_snapshot!(render_page(&record), @r"
    # Release Notes

    **Page Details:**
    - ID: 98765
    - Space: ENG
    - Version: 3
    - Last Updated: 2024-05-02T09:30:00+00:00

    **Content:**
    Shipped *everything*.
    ");

    let storage = render_page_as(&record, BodyFormat::Storage);
    assert!(storage.ends_with("**Content:**\n<p>Shipped <em>everything</em>.</p>"));
}

#[test]
fn normalized_body_is_cached_on_the_record() {
    let record = PageRecord::new(
        PageId::parse("1").unwrap(),
        "Cached",
        SpaceKey::new("ENG").unwrap(),
        1,
        "<h3>Once</h3>",
    );
    assert!(!record.is_normalized());
    assert_eq!(record.normalized_body(), "### Once");
    assert!(record.is_normalized());
    assert_eq!(record.raw_body(), "<h3>Once</h3>");
}

#[test]
fn deeply_nested_lists_are_folded() {
    let raw = "<ul><li>x".repeat(50_000);
    let (tree, issues) = parse_with_diagnostics(&raw);

    assert!(issues
        .iter()
        .any(|issue| matches!(issue, MarkupIssue::NestingTooDeep { .. })));
    assert!(tree_depth(&tree) <= STORAGE_MAX_NESTING_DEPTH + 1);
    assert_eq!(tree.plain_text().len(), 50_000);

    let markdown = render(&tree);
    assert!(markdown.starts_with("- x\n  - x"));
    drop(tree);
}

#[test]
fn deeply_nested_quotes_render() {
    let raw = format!("{}deep", "<blockquote>".repeat(4_000));
    let tree = parse(&raw);
    assert!(tree_depth(&tree) <= STORAGE_MAX_NESTING_DEPTH + 1);

    let markdown = render(&tree);
    assert!(markdown.starts_with("> > "));
    assert!(markdown.ends_with("deep"));
}

#[test]
fn rendered_markdown_is_stable_through_authoring() {
    let raw = concat!(
        "<h1>Runbook</h1>",
        "<p>Read <a href=\"https://example.com/docs\">the docs</a> first.</p>",
        "<ul><li>alpha<ul><li>beta</li></ul></li><li>gamma</li></ul>",
        "<h2>Tasks</h2>",
        "<ac:task-list>",
        "<ac:task><ac:task-status>complete</ac:task-status><ac:task-body>build</ac:task-body></ac:task>",
        "<ac:task><ac:task-status>incomplete</ac:task-status><ac:task-body>ship</ac:task-body></ac:task>",
        "</ac:task-list>",
        "<table><tbody><tr><th>Env</th><th>Owner</th></tr>",
        "<tr><td>prod</td><td>ops</td></tr></tbody></table>",
        "<ac:structured-macro ac:name=\"code\">",
        "<ac:parameter ac:name=\"language\">rust</ac:parameter>",
        "<ac:plain-text-body><![CDATA[fn main() {}\n]]></ac:plain-text-body>",
        "</ac:structured-macro>",
    );
    let markdown = render_storage(raw);
    assert!(markdown.contains("- alpha\n  - beta\n- gamma"));
    assert!(markdown.contains("- [x] build\n- [ ] ship"));
    assert!(markdown.contains("```rust\nfn main() {}\n```"));

    let again = render_storage(&markdown_to_storage(&markdown));
    assert_eq!(again, markdown);
}
