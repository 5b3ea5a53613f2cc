#![allow(dead_code)]

use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

pub fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

pub fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_gradesd");
    let mut child = Command::new(exe)
        .env_remove("GRADESD_WORKSPACE")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn gradesd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

pub fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

pub fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(true),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or(json!({}))
}

pub fn error_code(resp: &serde_json::Value) -> Option<&str> {
    resp.get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
}

/// One cell in a student's term columns.
#[derive(Clone, Copy)]
pub enum Mark<'a> {
    Num(f64),
    Text(&'a str),
    Blank,
}

/// One subject tab: optional "AÑO:"/"SECCIÓN:" header and student rows
/// with first term, second term and final marks.
pub struct SheetFixture<'a> {
    pub subject: &'a str,
    pub header: Option<(&'a str, &'a str)>,
    pub rows: Vec<(&'a str, [Mark<'a>; 3])>,
}

// Columns J, R and W; names in column B from row 11.
const TERM_COLUMNS: [u16; 3] = [9, 17, 22];
const FIRST_DATA_ROW: u32 = 10;

pub fn write_gradebook(path: &Path, sheets: &[SheetFixture]) {
    let mut workbook = rust_xlsxwriter::Workbook::new();
    for sheet in sheets {
        let ws = workbook.add_worksheet();
        ws.set_name(sheet.subject).expect("sheet name");
        ws.write_string(0, 0, "PLANILLA DE CALIFICACIONES")
            .expect("title");
        if let Some((year, section)) = sheet.header {
            ws.write_string(6, 0, format!("AÑO: {}", year))
                .expect("year");
            ws.write_string(6, 1, format!("SECCIÓN: {}", section))
                .expect("section");
        }
        ws.write_string(9, 1, "APELLIDO Y NOMBRE").expect("name header");
        for (i, (name, marks)) in sheet.rows.iter().enumerate() {
            let row = FIRST_DATA_ROW + i as u32;
            ws.write_string(row, 1, *name).expect("name");
            for (col, mark) in TERM_COLUMNS.iter().zip(marks.iter()) {
                match mark {
                    Mark::Num(v) => {
                        ws.write_number(row, *col, *v).expect("number");
                    }
                    Mark::Text(s) => {
                        ws.write_string(row, *col, *s).expect("text");
                    }
                    Mark::Blank => {}
                }
            }
        }
    }
    workbook.save(path).expect("save workbook");
}

pub fn student<'a>(students: &'a serde_json::Value, name: &str) -> &'a serde_json::Value {
    students
        .as_array()
        .expect("students array")
        .iter()
        .find(|s| s.get("name").and_then(|v| v.as_str()) == Some(name))
        .unwrap_or_else(|| panic!("student {} missing from {}", name, students))
}
