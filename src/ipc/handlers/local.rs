use crate::extract::{ColumnLayout, CURRENT_LAYOUT};
use crate::ipc::error::{bad_params, ok};
use crate::ipc::helpers::{
    param_str, parse_search_params, resolve_layout, students_json, with_diagnostics,
    workspace_default_layout,
};
use crate::ipc::types::{AppState, Request};
use crate::model::{Diagnostics, Workbook};
use crate::walker::{search_workbooks, summarize_workbooks};
use serde_json::json;
use std::path::PathBuf;

fn requested_layout(state: &AppState, req: &Request) -> &'static ColumnLayout {
    let fallback = state
        .db
        .as_ref()
        .map(workspace_default_layout)
        .unwrap_or(&CURRENT_LAYOUT);
    resolve_layout(param_str(req, "layout"), fallback)
}

fn handle_local_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(raw_paths) = req.params.get("paths").and_then(|v| v.as_array()) else {
        return bad_params(&req.id, "paths must be an array");
    };
    let mut paths = Vec::with_capacity(raw_paths.len());
    for v in raw_paths {
        match v.as_str() {
            Some(s) if !s.trim().is_empty() => paths.push(PathBuf::from(s)),
            _ => return bad_params(&req.id, "paths must contain file paths"),
        }
    }
    if paths.is_empty() {
        return bad_params(&req.id, "paths must not be empty");
    }

    let layout = requested_layout(state, req);
    let stale: Vec<PathBuf> = state
        .local
        .paths
        .iter()
        .filter(|p| !paths.contains(*p))
        .cloned()
        .collect();
    state.cache.evict_paths(&stale);
    let mut diag = Diagnostics::default();
    let workbooks = state.cache.load_paths(&paths, &mut diag);
    let summary = summarize_workbooks(&workbooks, layout);
    log::info!(
        "local corpus: {} files, {} students, {} grades",
        summary.files,
        summary.students,
        summary.total_grades
    );
    state.local.paths = paths;
    state.local.workbooks = workbooks;
    state.local.layout = layout;

    let mut result = summary.to_json();
    result["layout"] = json!(layout.name);
    ok(&req.id, with_diagnostics(result, &diag))
}

fn handle_local_search(state: &mut AppState, req: &Request) -> serde_json::Value {
    let params = match parse_search_params(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let inline: Option<Vec<Workbook>> = match req.params.get("workbooks") {
        None | Some(serde_json::Value::Null) => None,
        Some(v) => match serde_json::from_value(v.clone()) {
            Ok(books) => Some(books),
            Err(e) => return bad_params(&req.id, format!("invalid workbooks: {}", e)),
        },
    };

    let students = match inline {
        Some(books) => {
            let layout = requested_layout(state, req);
            search_workbooks(&books, layout, params.mode, &params.query, params.term)
        }
        None => search_workbooks(
            &state.local.workbooks,
            state.local.layout,
            params.mode,
            &params.query,
            params.term,
        ),
    };
    ok(&req.id, json!({ "students": students_json(&students) }))
}

fn handle_local_clear(state: &mut AppState, req: &Request) -> serde_json::Value {
    let dropped = state.local.workbooks.len();
    let paths = std::mem::take(&mut state.local.paths);
    let evicted = state.cache.evict_paths(&paths);
    state.local.workbooks.clear();
    ok(
        &req.id,
        json!({ "ok": true, "dropped": dropped, "evicted": evicted }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "local.open" => Some(handle_local_open(state, req)),
        "local.search" => Some(handle_local_search(state, req)),
        "local.clear" => Some(handle_local_clear(state, req)),
        _ => None,
    }
}
