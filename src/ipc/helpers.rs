use crate::db;
use crate::extract::{ColumnLayout, CURRENT_LAYOUT};
use crate::ipc::error::{bad_params, err, no_workspace};
use crate::ipc::types::{AppState, Request};
use crate::model::{Diagnostics, StudentRecord, TermFilter};
use crate::walker::{CategoryCorpus, SearchMode};
use rusqlite::Connection;
use serde_json::json;
use std::path::Path;

pub fn param_str<'a>(req: &'a Request, key: &str) -> Option<&'a str> {
    req.params.get(key).and_then(|v| v.as_str())
}

pub struct SearchParams {
    pub mode: SearchMode,
    pub query: String,
    pub term: TermFilter,
}

/// Validates `mode`, `q` and `term`. An empty query is the only caller-facing
/// error a search can produce.
pub fn parse_search_params(req: &Request) -> Result<SearchParams, serde_json::Value> {
    let mode_raw = param_str(req, "mode").unwrap_or("student");
    let Some(mode) = SearchMode::parse(mode_raw) else {
        return Err(bad_params(
            &req.id,
            format!("unknown mode: {} (expected student or course)", mode_raw),
        ));
    };
    let query = param_str(req, "q").unwrap_or("");
    if query.trim().is_empty() {
        return Err(bad_params(&req.id, "missing params.q"));
    }
    let term_raw = param_str(req, "term").unwrap_or("all");
    let Some(term) = TermFilter::parse(term_raw) else {
        return Err(bad_params(
            &req.id,
            format!("unknown term: {} (expected all, 1st, 2nd or final)", term_raw),
        ));
    };
    Ok(SearchParams {
        mode,
        query: query.to_string(),
        term,
    })
}

/// Unknown names fall back to the canonical layout rather than failing a search.
pub fn resolve_layout(
    name: Option<&str>,
    fallback: &'static ColumnLayout,
) -> &'static ColumnLayout {
    match name {
        Some(n) => ColumnLayout::by_name(n).unwrap_or_else(|| {
            log::warn!("unknown column layout {:?}; using {}", n, fallback.name);
            fallback
        }),
        None => fallback,
    }
}

pub fn workspace_default_layout(conn: &Connection) -> &'static ColumnLayout {
    match db::default_layout(conn) {
        Ok(name) => resolve_layout(Some(name.as_str()), &CURRENT_LAYOUT),
        Err(e) => {
            log::warn!("default layout unreadable: {e:#}");
            &CURRENT_LAYOUT
        }
    }
}

/// Loads every configured category folder. Unreadable folders and files
/// end up in the returned diagnostics.
pub fn load_corpora(
    state: &mut AppState,
    req: &Request,
) -> Result<(Vec<CategoryCorpus>, Diagnostics), serde_json::Value> {
    let AppState { db, cache, .. } = state;
    let Some(conn) = db.as_ref() else {
        return Err(no_workspace(&req.id));
    };
    let categories = db::categories_list(conn)
        .map_err(|e| err(&req.id, "db_query_failed", e.to_string(), None))?;
    let default_layout = workspace_default_layout(conn);

    let mut diag = Diagnostics::default();
    let mut corpora = Vec::with_capacity(categories.len());
    for cat in categories {
        log::info!("loading category {} from {}", cat.name, cat.folder);
        let workbooks = cache.load_folder(Path::new(&cat.folder), &mut diag);
        corpora.push(CategoryCorpus {
            label: cat.display_label(),
            layout: resolve_layout(cat.layout.as_deref(), default_layout),
            workbooks,
        });
    }
    log::info!(
        "corpus loaded: {} ok, {} errors, {} skipped",
        diag.success_count,
        diag.error_count,
        diag.skipped_count
    );
    Ok((corpora, diag))
}

pub fn students_json(students: &[StudentRecord]) -> serde_json::Value {
    serde_json::Value::Array(
        students
            .iter()
            .map(|s| {
                json!({
                    "name": s.name,
                    "grades": s.grades,
                    "stats": s.stats(),
                })
            })
            .collect(),
    )
}

pub fn with_diagnostics(mut result: serde_json::Value, diag: &Diagnostics) -> serde_json::Value {
    result["stats"] = diag.stats_json();
    if let Some(errors) = diag.reported_errors() {
        result["errors"] = json!(errors);
    }
    result
}
