use crate::model::{CellValue, Diagnostics, Workbook, Worksheet};
use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};

const SPREADSHEET_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xlsb", "xls", "ods"];

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("{path}: cannot read file: {source}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{path}: not a readable workbook: {message}")]
    Undecodable { path: String, message: String },
    #[error("{path}: worksheet {sheet:?} skipped: {message}")]
    WorksheetUnreadable {
        path: String,
        sheet: String,
        message: String,
    },
}

/// Spreadsheet files only; office lock files ("~$...") and dotfiles are not.
pub fn is_spreadsheet(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|s| s.to_str()) else {
        return false;
    };
    if name.starts_with("~$") || name.starts_with('.') {
        return false;
    }
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            SPREADSHEET_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

pub fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Clone, Default)]
pub struct FolderScan {
    pub entries: usize,
    pub spreadsheets: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
}

/// Lists a category folder (non-recursive) in a stable, name-sorted order.
pub fn scan_folder(folder: &Path) -> anyhow::Result<FolderScan> {
    let mut paths = Vec::new();
    for ent in std::fs::read_dir(folder)? {
        let p = ent?.path();
        if p.is_file() {
            paths.push(p);
        }
    }
    paths.sort();

    let mut scan = FolderScan {
        entries: paths.len(),
        ..FolderScan::default()
    };
    for p in paths {
        if is_spreadsheet(&p) {
            scan.spreadsheets.push(p);
        } else {
            scan.skipped.push(p);
        }
    }
    Ok(scan)
}

/// A decoded workbook plus the worksheets that could not be read.
#[derive(Debug, Clone)]
pub struct Decoded {
    pub workbook: Workbook,
    pub sheet_errors: Vec<String>,
}

pub fn decode_workbook(
    path: &Path,
    display_name: &str,
    bytes: Vec<u8>,
) -> Result<Decoded, SourceError> {
    let path_str = path.to_string_lossy().to_string();
    let mut sheets =
        open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(|e| SourceError::Undecodable {
            path: path_str.clone(),
            message: e.to_string(),
        })?;

    let mut worksheets = Vec::new();
    let mut sheet_errors = Vec::new();
    for sheet_name in sheets.sheet_names().to_owned() {
        match sheets.worksheet_range(&sheet_name) {
            Ok(range) => worksheets.push(Worksheet::new(sheet_name, range_to_grid(&range))),
            Err(e) => {
                let err = SourceError::WorksheetUnreadable {
                    path: path_str.clone(),
                    sheet: sheet_name,
                    message: e.to_string(),
                };
                log::warn!("{}", err);
                sheet_errors.push(err.to_string());
            }
        }
    }

    Ok(Decoded {
        workbook: Workbook {
            display_name: display_name.to_string(),
            worksheets,
        },
        sheet_errors,
    })
}

/// calamine ranges start at the first used cell; pad so grid indices are
/// absolute sheet coordinates.
fn range_to_grid(range: &Range<Data>) -> Vec<Vec<CellValue>> {
    let Some((row_offset, col_offset)) = range.start() else {
        return Vec::new();
    };
    let row_offset = row_offset as usize;
    let col_offset = col_offset as usize;

    let mut grid: Vec<Vec<CellValue>> = vec![Vec::new(); row_offset];
    for row in range.rows() {
        let mut cells = vec![CellValue::Empty; col_offset];
        cells.extend(row.iter().map(data_to_cell));
        while matches!(cells.last(), Some(CellValue::Empty)) {
            cells.pop();
        }
        grid.push(cells);
    }
    grid
}

fn data_to_cell(d: &Data) -> CellValue {
    match d {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Text(b.to_string()),
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        other => CellValue::Text(other.to_string()),
    }
}

fn display_name_of(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

struct CacheEntry {
    fingerprint: String,
    decoded: Decoded,
}

/// Decoded workbooks by path. A file is decoded again only when its
/// content hash changes.
#[derive(Default)]
pub struct WorkbookCache {
    entries: HashMap<PathBuf, CacheEntry>,
}

impl WorkbookCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn load_file(&mut self, path: &Path) -> Result<Decoded, SourceError> {
        let bytes = std::fs::read(path).map_err(|source| SourceError::Unreadable {
            path: path.to_string_lossy().to_string(),
            source,
        })?;
        let fp = fingerprint(&bytes);
        if let Some(hit) = self.entries.get(path) {
            if hit.fingerprint == fp {
                log::debug!("cache hit {}", path.to_string_lossy());
                return Ok(hit.decoded.clone());
            }
        }

        let decoded = decode_workbook(path, &display_name_of(path), bytes)?;
        self.entries.insert(
            path.to_path_buf(),
            CacheEntry {
                fingerprint: fp,
                decoded: decoded.clone(),
            },
        );
        Ok(decoded)
    }

    /// Loads every path it can; failures are tallied in `diag` and skipped.
    pub fn load_paths(&mut self, paths: &[PathBuf], diag: &mut Diagnostics) -> Vec<Workbook> {
        let mut out = Vec::new();
        for p in paths {
            match self.load_file(p) {
                Ok(decoded) => {
                    log::info!(
                        "loaded {} ({} worksheets)",
                        p.to_string_lossy(),
                        decoded.workbook.worksheets.len()
                    );
                    diag.success_count += 1;
                    for e in decoded.sheet_errors {
                        diag.record_error(e);
                    }
                    out.push(decoded.workbook);
                }
                Err(e) => {
                    log::warn!("{}", e);
                    self.entries.remove(p.as_path());
                    diag.record_error(e.to_string());
                }
            }
        }
        out
    }

    pub fn load_folder(&mut self, folder: &Path, diag: &mut Diagnostics) -> Vec<Workbook> {
        let scan = match scan_folder(folder) {
            Ok(v) => v,
            Err(e) => {
                log::warn!("folder {} unavailable: {e:#}", folder.to_string_lossy());
                diag.record_error(format!("folder {}: {}", folder.to_string_lossy(), e));
                self.evict_folder(folder);
                return Vec::new();
            }
        };
        for p in &scan.skipped {
            log::debug!("skipped non-spreadsheet {}", p.to_string_lossy());
        }
        diag.skipped_count += scan.skipped.len();
        // Files deleted or renamed since the last scan.
        self.entries
            .retain(|p, _| p.parent() != Some(folder) || scan.spreadsheets.contains(p));
        self.load_paths(&scan.spreadsheets, diag)
    }

    /// Drops every cached workbook that lives directly in `folder`.
    pub fn evict_folder(&mut self, folder: &Path) -> usize {
        let before = self.entries.len();
        self.entries.retain(|p, _| p.parent() != Some(folder));
        before - self.entries.len()
    }

    pub fn evict_paths(&mut self, paths: &[PathBuf]) -> usize {
        let before = self.entries.len();
        for p in paths {
            self.entries.remove(p.as_path());
        }
        before - self.entries.len()
    }
}
