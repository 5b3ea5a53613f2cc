use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// One spreadsheet cell as delivered by a sheet source.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Number(f64),
    Text(String),
}

static EMPTY_CELL: CellValue = CellValue::Empty;

impl CellValue {
    /// Blank means absent or an empty string. Whitespace-only text is not blank here.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.is_empty(),
            CellValue::Number(_) => false,
        }
    }

    /// Text rendering of the cell, `None` when absent.
    pub fn to_text(&self) -> Option<String> {
        match self {
            CellValue::Empty => None,
            CellValue::Number(n) => Some(format!("{}", n)),
            CellValue::Text(s) => Some(s.clone()),
        }
    }

    pub fn from_json(v: &serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => CellValue::Empty,
            serde_json::Value::Number(n) => n
                .as_f64()
                .map(CellValue::Number)
                .unwrap_or(CellValue::Empty),
            serde_json::Value::String(s) => CellValue::Text(s.clone()),
            serde_json::Value::Bool(b) => CellValue::Text(b.to_string()),
            // Nested values never appear in a sheet grid; keep their text so nothing panics.
            other => CellValue::Text(other.to_string()),
        }
    }
}

impl<'de> Deserialize<'de> for CellValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let v = serde_json::Value::deserialize(deserializer)?;
        Ok(CellValue::from_json(&v))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Worksheet {
    pub name: String,
    #[serde(default)]
    pub grid: Vec<Vec<CellValue>>,
}

impl Worksheet {
    pub fn new(name: impl Into<String>, grid: Vec<Vec<CellValue>>) -> Self {
        Self {
            name: name.into(),
            grid,
        }
    }

    /// Ragged rows are common; anything past the end of a row reads as empty.
    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        self.grid
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY_CELL)
    }
}

/// Ragged-row read for a single row slice.
pub fn row_cell(row: &[CellValue], col: usize) -> &CellValue {
    row.get(col).unwrap_or(&EMPTY_CELL)
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workbook {
    pub display_name: String,
    #[serde(default)]
    pub worksheets: Vec<Worksheet>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TermTag {
    FirstTerm,
    SecondTerm,
    Final,
}

impl TermTag {
    pub const ALL: [TermTag; 3] = [TermTag::FirstTerm, TermTag::SecondTerm, TermTag::Final];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermFilter {
    All,
    Only(TermTag),
}

impl TermFilter {
    /// Accepts both the daemon's own spellings and the ones the school's
    /// front-ends have always sent.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "" | "all" | "todos" => Some(Self::All),
            "1st" | "1º" | "first" | "firstTerm" => Some(Self::Only(TermTag::FirstTerm)),
            "2nd" | "2º" | "second" | "secondTerm" => Some(Self::Only(TermTag::SecondTerm)),
            "final" | "Final" => Some(Self::Only(TermTag::Final)),
            _ => None,
        }
    }

    pub fn accepts(self, term: TermTag) -> bool {
        match self {
            TermFilter::All => true,
            TermFilter::Only(t) => t == term,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GradeValue {
    Score(f64),
    Ungraded,
}

impl Serialize for GradeValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            GradeValue::Score(v) => serializer.serialize_f64(*v),
            GradeValue::Ungraded => serializer.serialize_str("ungraded"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeRecord {
    pub subject: String,
    pub course: String,
    pub term: TermTag,
    pub grade: GradeValue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentRecord {
    pub name: String,
    pub grades: Vec<GradeRecord>,
}

pub const PASSING_GRADE: f64 = 7.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeStats {
    pub approved: usize,
    pub failed: usize,
    pub pending: usize,
    pub total: usize,
}

impl StudentRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            grades: Vec::new(),
        }
    }

    pub fn stats(&self) -> GradeStats {
        let mut out = GradeStats {
            total: self.grades.len(),
            ..GradeStats::default()
        };
        for g in &self.grades {
            match g.grade {
                GradeValue::Score(v) if v >= PASSING_GRADE => out.approved += 1,
                GradeValue::Score(_) => out.failed += 1,
                GradeValue::Ungraded => out.pending += 1,
            }
        }
        out
    }
}

/// Outcome tally for a corpus-wide operation. Problems are counted, never raised.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    pub success_count: usize,
    pub error_count: usize,
    pub skipped_count: usize,
    pub errors: Vec<String>,
}

/// Responses only carry the first few messages.
pub const MAX_REPORTED_ERRORS: usize = 5;

impl Diagnostics {
    pub fn record_error(&mut self, message: impl Into<String>) {
        self.error_count += 1;
        self.errors.push(message.into());
    }

    pub fn stats_json(&self) -> serde_json::Value {
        serde_json::json!({
            "successCount": self.success_count,
            "errorCount": self.error_count,
            "skippedCount": self.skipped_count,
        })
    }

    pub fn reported_errors(&self) -> Option<Vec<String>> {
        if self.errors.is_empty() {
            return None;
        }
        Some(
            self.errors
                .iter()
                .take(MAX_REPORTED_ERRORS)
                .cloned()
                .collect(),
        )
    }
}
