use crate::extract::DEFAULT_LAYOUT;
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use uuid::Uuid;

pub const DB_FILE: &str = "grades.sqlite3";
const DEFAULT_LAYOUT_KEY: &str = "extraction.defaultLayout";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE);
    let conn = Connection::open(db_path)?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS categories(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            label TEXT,
            folder TEXT NOT NULL,
            layout TEXT,
            sort_order INTEGER NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings(
            key TEXT PRIMARY KEY,
            value_json TEXT NOT NULL
        )",
        [],
    )?;

    Ok(conn)
}

pub fn settings_get_json(
    conn: &Connection,
    key: &str,
) -> anyhow::Result<Option<serde_json::Value>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT value_json FROM settings WHERE key = ?",
            [key],
            |r| r.get(0),
        )
        .optional()?;
    match raw {
        Some(s) => Ok(Some(serde_json::from_str(&s)?)),
        None => Ok(None),
    }
}

pub fn settings_set_json(
    conn: &Connection,
    key: &str,
    value: &serde_json::Value,
) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value_json) VALUES(?, ?)
         ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json",
        (key, serde_json::to_string(value)?),
    )?;
    Ok(())
}

pub fn default_layout(conn: &Connection) -> anyhow::Result<String> {
    Ok(settings_get_json(conn, DEFAULT_LAYOUT_KEY)?
        .and_then(|v| v.as_str().map(|s| s.to_string()))
        .unwrap_or_else(|| DEFAULT_LAYOUT.to_string()))
}

pub fn set_default_layout(conn: &Connection, layout: &str) -> anyhow::Result<()> {
    settings_set_json(conn, DEFAULT_LAYOUT_KEY, &serde_json::json!(layout))
}

/// A named source folder of gradebooks (one per school specialty).
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub label: Option<String>,
    pub folder: String,
    pub layout: Option<String>,
}

impl Category {
    /// Shown next to course labels: explicit label, else "ciclo-basico" -> "CICLO BASICO".
    pub fn display_label(&self) -> String {
        match self.label.as_deref().map(str::trim) {
            Some(l) if !l.is_empty() => l.to_string(),
            _ => self.name.replace('-', " ").to_uppercase(),
        }
    }
}

pub fn categories_list(conn: &Connection) -> anyhow::Result<Vec<Category>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, label, folder, layout
         FROM categories
         ORDER BY sort_order, name",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(Category {
                id: row.get(0)?,
                name: row.get(1)?,
                label: row.get(2)?,
                folder: row.get(3)?,
                layout: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Inserts or updates by name; returns the category id.
pub fn category_upsert(
    conn: &Connection,
    name: &str,
    folder: &str,
    label: Option<&str>,
    layout: Option<&str>,
) -> anyhow::Result<String> {
    let existing: Option<String> = conn
        .query_row("SELECT id FROM categories WHERE name = ?", [name], |r| {
            r.get(0)
        })
        .optional()?;
    if let Some(id) = existing {
        conn.execute(
            "UPDATE categories SET folder = ?, label = ?, layout = ? WHERE id = ?",
            (folder, label, layout, &id),
        )?;
        return Ok(id);
    }

    let next_order: i64 = conn.query_row(
        "SELECT COALESCE(MAX(sort_order), -1) + 1 FROM categories",
        [],
        |r| r.get(0),
    )?;
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO categories(id, name, label, folder, layout, sort_order)
         VALUES(?, ?, ?, ?, ?, ?)",
        (&id, name, label, folder, layout, next_order),
    )?;
    Ok(id)
}

pub fn category_delete(conn: &Connection, name: &str) -> anyhow::Result<bool> {
    let n = conn.execute("DELETE FROM categories WHERE name = ?", [name])?;
    Ok(n > 0)
}
