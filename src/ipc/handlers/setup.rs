use crate::db;
use crate::extract::ColumnLayout;
use crate::ipc::error::{err, no_workspace, ok};
use crate::ipc::helpers::{load_corpora, with_diagnostics};
use crate::ipc::types::{AppState, Request};
use crate::source::scan_folder;
use crate::walker::summarize;
use serde_json::{json, Map, Value};
use std::path::Path;

fn handle_setup_status(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return no_workspace(&req.id);
    };
    let categories = match db::categories_list(conn) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let mut issues: Vec<String> = Vec::new();
    if categories.is_empty() {
        issues.push("no categories configured".to_string());
    }

    let mut folders = Map::new();
    for cat in &categories {
        if let Some(layout) = cat.layout.as_deref() {
            if ColumnLayout::by_name(layout).is_none() {
                issues.push(format!("category {} uses unknown layout {}", cat.name, layout));
            }
        }
        let entry = match scan_folder(Path::new(&cat.folder)) {
            Ok(scan) => json!({
                "accessible": true,
                "folder": cat.folder,
                "fileCount": scan.entries,
                "spreadsheetCount": scan.spreadsheets.len(),
            }),
            Err(e) => {
                log::warn!("category {} folder {} not accessible: {e:#}", cat.name, cat.folder);
                issues.push(format!("folder for {} not accessible", cat.name));
                json!({
                    "accessible": false,
                    "folder": cat.folder,
                    "error": e.to_string(),
                })
            }
        };
        folders.insert(cat.name.clone(), entry);
    }

    let all_accessible = folders
        .values()
        .all(|f| f.get("accessible").and_then(|v| v.as_bool()).unwrap_or(false));
    let ready = !categories.is_empty() && all_accessible && issues.is_empty();

    ok(
        &req.id,
        json!({
            "checkedAt": chrono::Utc::now().to_rfc3339(),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
            "folders": Value::Object(folders),
            "summary": {
                "ready": ready,
                "issues": issues,
            },
        }),
    )
}

fn handle_stats_summary(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (corpora, diag) = match load_corpora(state, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let summary = summarize(&corpora);
    let per_category: Vec<_> = corpora
        .iter()
        .map(|c| {
            json!({
                "label": c.label,
                "layout": c.layout.name,
                "workbooks": c.workbooks.len(),
            })
        })
        .collect();

    let mut result = summary.to_json();
    result["categories"] = json!(per_category);
    ok(&req.id, with_diagnostics(result, &diag))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "setup.status" => Some(handle_setup_status(state, req)),
        "stats.summary" => Some(handle_stats_summary(state, req)),
        _ => None,
    }
}
