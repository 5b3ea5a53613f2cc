use std::path::PathBuf;

use rusqlite::Connection;
use serde::Deserialize;

use crate::extract::{ColumnLayout, CURRENT_LAYOUT};
use crate::model::Workbook;
use crate::source::WorkbookCache;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Workbooks opened from the user's own files; never written anywhere.
pub struct LocalCorpus {
    pub paths: Vec<PathBuf>,
    pub workbooks: Vec<Workbook>,
    pub layout: &'static ColumnLayout,
}

impl Default for LocalCorpus {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            workbooks: Vec::new(),
            layout: &CURRENT_LAYOUT,
        }
    }
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    pub cache: WorkbookCache,
    pub local: LocalCorpus,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            workspace: None,
            db: None,
            cache: WorkbookCache::new(),
            local: LocalCorpus::default(),
        }
    }
}
