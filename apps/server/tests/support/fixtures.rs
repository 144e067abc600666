use std::fs;
use std::path::Path;

use anyhow::Context as _;
use quarry_server::Config;
use serde_json::{json, Value};

pub const ALICE: &str = "alice";
pub const ADMIN: &str = "admin";

/// Index documents. `alice` belongs to `team`; `/content/old` is pending
/// deletion and `/content/draft` is excluded from search.
pub fn documents() -> Value {
    json!([
        {"path": "/content/report", "type": "doc", "readers": ["alice"], "viewer": ["alice"], "created": 3},
        {"path": "/content/plan", "type": "doc", "readers": ["team"], "viewer": ["team"], "created": 1},
        {"path": "/content/welcome", "type": "doc", "readers": ["anonymous"], "created": 2},
        {"path": "/content/logo", "type": "img", "readers": ["alice"], "created": 4},
        {"path": "/content/draft", "type": "doc", "readers": ["alice"], "exclude": true, "created": 5},
        {"path": "/content/old", "type": "doc", "readers": ["alice"], "created": 6}
    ])
}

pub fn templates() -> Vec<(&'static str, Value)> {
    vec![
        (
            "search/docs.json",
            json!({
                "query_template": "type:${type}",
                "options": {"sort": "created desc"}
            }),
        ),
        (
            "search/all.json",
            json!({
                "query_template": "*:*",
                "options": {"sort": "created asc", "facet.field": "type"},
                "result_writer": "Path",
                "decorators": ["Timestamp"]
            }),
        ),
        (
            "search/mine.json",
            json!({
                "query_template": "type:doc${_meViewerGroups}",
                "property_providers": "MyGroups",
                "options": {"sort": "created desc"},
                "result_writer": "Path"
            }),
        ),
        (
            "search/paged.json",
            json!({
                "query_template": "*:*",
                "defaults": {"items": "2"},
                "options": {"sort": "created asc"},
                "result_writer": "FullResource"
            }),
        ),
        (
            "search/repo.json",
            json!({
                "query_template": "type:doc",
                "resource_type": "quarry/repository-search",
                "result_writer": "Path"
            }),
        ),
        ("private/audit.json", json!({"query_template": "*:*"})),
    ]
}

/// Write templates and fixture files below `root` and return a config
/// pointing at them.
pub fn write_workspace(root: &Path) -> anyhow::Result<Config> {
    let template_dir = root.join("templates");
    for (relative, document) in templates() {
        let file = template_dir.join(relative);
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent).context("create template directory")?;
        }
        fs::write(&file, serde_json::to_vec_pretty(&document)?).context("write template")?;
    }

    let documents_file = root.join("documents.json");
    fs::write(&documents_file, serde_json::to_vec(&documents())?)?;
    let memberships_file = root.join("memberships.json");
    fs::write(&memberships_file, serde_json::to_vec(&json!({"alice": ["team"]}))?)?;
    let deleted_file = root.join("deleted.json");
    fs::write(&deleted_file, serde_json::to_vec(&json!(["/content/old"]))?)?;

    let mut config = Config::default();
    config.templates.directory = template_dir;
    config.fixtures.documents = Some(documents_file);
    config.fixtures.memberships = Some(memberships_file);
    config.fixtures.deleted_paths = Some(deleted_file);
    Ok(config)
}
