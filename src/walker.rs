use crate::extract::{extract_course_label, extract_grades, ColumnLayout};
use crate::model::{GradeRecord, StudentRecord, TermFilter, Workbook, Worksheet};
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    Student,
    Course,
}

impl SearchMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "student" | "alumno" => Some(Self::Student),
            "course" | "curso" => Some(Self::Course),
            _ => None,
        }
    }
}

/// Result accumulator keyed by the exact printed student name.
///
/// Two different students whose names print identically end up in one
/// record. Gradebooks carry no student id, so there is nothing better to
/// key on.
#[derive(Debug, Default)]
pub struct StudentSet {
    students: Vec<StudentRecord>,
    index: HashMap<String, usize>,
}

impl StudentSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(&mut self, name: &str) -> &mut StudentRecord {
        let idx = match self.index.get(name) {
            Some(&i) => i,
            None => {
                self.students.push(StudentRecord::new(name));
                let i = self.students.len() - 1;
                self.index.insert(name.to_string(), i);
                i
            }
        };
        &mut self.students[idx]
    }

    pub fn append(&mut self, name: &str, grades: Vec<GradeRecord>) {
        self.entry(name).grades.extend(grades);
    }

    /// Fan-in for per-workbook results; keeps first-seen order.
    pub fn merge(&mut self, other: Vec<StudentRecord>) {
        for s in other {
            self.append(&s.name, s.grades);
        }
    }

    pub fn into_vec(self) -> Vec<StudentRecord> {
        self.students
    }
}

/// File name without a spreadsheet suffix, used when no sheet has a header.
pub fn fallback_course_label(display_name: &str) -> String {
    for ext in [".xlsx", ".xls"] {
        let Some(split) = display_name.len().checked_sub(ext.len()) else {
            continue;
        };
        if let (Some(stem), Some(tail)) = (display_name.get(..split), display_name.get(split..)) {
            if tail.eq_ignore_ascii_case(ext) {
                return stem.to_string();
            }
        }
    }
    display_name.to_string()
}

/// Workbook-wide label: the first worksheet's header, else the file name.
pub fn workbook_course_label(wb: &Workbook) -> String {
    wb.worksheets
        .first()
        .and_then(extract_course_label)
        .unwrap_or_else(|| fallback_course_label(&wb.display_name))
}

fn worksheet_course_label(ws: &Worksheet, workbook_label: &str) -> String {
    extract_course_label(ws).unwrap_or_else(|| workbook_label.to_string())
}

pub fn course_matches(wb: &Workbook, pattern: &str) -> bool {
    let needle = pattern.to_lowercase();
    wb.display_name.to_lowercase().contains(&needle)
        || workbook_course_label(wb).to_lowercase().contains(&needle)
}

/// Walks every worksheet's data rows into `out`. With a name filter only
/// rows whose student name contains it (case-insensitive) are taken.
pub fn walk_workbook(
    wb: &Workbook,
    name_filter: Option<&str>,
    term: TermFilter,
    layout: &ColumnLayout,
    out: &mut StudentSet,
) {
    let workbook_label = workbook_course_label(wb);
    let needle = name_filter.map(|s| s.to_lowercase());

    for ws in &wb.worksheets {
        let course = worksheet_course_label(ws, &workbook_label);
        let mut taken = 0usize;
        for row in ws.grid.iter().skip(layout.header_rows) {
            let Some(name) = row.get(layout.name_column).and_then(|c| c.to_text()) else {
                continue;
            };
            if name.trim().is_empty() {
                continue;
            }
            if let Some(needle) = needle.as_deref() {
                if !name.to_lowercase().contains(needle) {
                    continue;
                }
            }
            let grades = extract_grades(row, &ws.name, &course, term, layout);
            out.append(&name, grades);
            taken += 1;
        }
        log::debug!(
            "{}: sheet {:?} ({}) yielded {} rows",
            wb.display_name,
            ws.name,
            course,
            taken
        );
    }
}

pub fn search_by_student(
    wb: &Workbook,
    name_pattern: &str,
    term: TermFilter,
    layout: &ColumnLayout,
) -> Vec<StudentRecord> {
    let mut out = StudentSet::new();
    walk_workbook(wb, Some(name_pattern), term, layout, &mut out);
    out.into_vec()
}

pub fn search_by_course(
    wb: &Workbook,
    course_pattern: &str,
    term: TermFilter,
    layout: &ColumnLayout,
) -> Vec<StudentRecord> {
    if !course_matches(wb, course_pattern) {
        return Vec::new();
    }
    let mut out = StudentSet::new();
    walk_workbook(wb, None, term, layout, &mut out);
    out.into_vec()
}

/// Workbooks from one category folder, with the layout that folder uses.
#[derive(Debug, Clone)]
pub struct CategoryCorpus {
    pub label: String,
    pub layout: &'static ColumnLayout,
    pub workbooks: Vec<Workbook>,
}

/// Runs one search over a set of workbooks that share a layout.
pub fn search_workbooks(
    workbooks: &[Workbook],
    layout: &ColumnLayout,
    mode: SearchMode,
    query: &str,
    term: TermFilter,
) -> Vec<StudentRecord> {
    let mut all = StudentSet::new();
    for wb in workbooks {
        let found = match mode {
            SearchMode::Student => search_by_student(wb, query, term, layout),
            SearchMode::Course => search_by_course(wb, query, term, layout),
        };
        all.merge(found);
    }
    all.into_vec()
}

pub fn search_corpora(
    corpora: &[CategoryCorpus],
    mode: SearchMode,
    query: &str,
    term: TermFilter,
) -> Vec<StudentRecord> {
    let mut all = StudentSet::new();
    for corpus in corpora {
        all.merge(search_workbooks(&corpus.workbooks, corpus.layout, mode, query, term));
    }
    all.into_vec()
}

/// "{course label} - {CATEGORY LABEL}" for every workbook, sorted.
pub fn list_courses(corpora: &[CategoryCorpus]) -> Vec<String> {
    let mut out: Vec<String> = corpora
        .iter()
        .flat_map(|c| {
            c.workbooks
                .iter()
                .map(move |wb| format!("{} - {}", workbook_course_label(wb), c.label))
        })
        .collect();
    out.sort();
    out
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorpusSummary {
    pub files: usize,
    pub students: usize,
    pub student_rows: usize,
    pub total_grades: usize,
    pub courses: Vec<String>,
    pub subjects: Vec<String>,
}

#[derive(Default)]
struct SummaryBuilder {
    set: StudentSet,
    courses: BTreeSet<String>,
    subjects: BTreeSet<String>,
    files: usize,
    student_rows: usize,
}

impl SummaryBuilder {
    fn add(&mut self, wb: &Workbook, layout: &ColumnLayout) {
        self.files += 1;
        self.courses.insert(workbook_course_label(wb));
        for ws in &wb.worksheets {
            self.subjects.insert(ws.name.clone());
        }
        self.student_rows += rows_with_names(wb, layout);
        walk_workbook(wb, None, TermFilter::All, layout, &mut self.set);
    }

    fn finish(self) -> CorpusSummary {
        let students = self.set.into_vec();
        CorpusSummary {
            files: self.files,
            students: students.len(),
            student_rows: self.student_rows,
            total_grades: students.iter().map(|s| s.grades.len()).sum(),
            courses: self.courses.into_iter().collect(),
            subjects: self.subjects.into_iter().collect(),
        }
    }
}

pub fn summarize(corpora: &[CategoryCorpus]) -> CorpusSummary {
    let mut b = SummaryBuilder::default();
    for corpus in corpora {
        for wb in &corpus.workbooks {
            b.add(wb, corpus.layout);
        }
    }
    b.finish()
}

pub fn summarize_workbooks(workbooks: &[Workbook], layout: &ColumnLayout) -> CorpusSummary {
    let mut b = SummaryBuilder::default();
    for wb in workbooks {
        b.add(wb, layout);
    }
    b.finish()
}

impl CorpusSummary {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "files": self.files,
            "students": self.students,
            "studentRows": self.student_rows,
            "totalGrades": self.total_grades,
            "courses": self.courses,
            "subjects": self.subjects,
        })
    }
}

fn rows_with_names(wb: &Workbook, layout: &ColumnLayout) -> usize {
    wb.worksheets
        .iter()
        .flat_map(|ws| ws.grid.iter().skip(layout.header_rows))
        .filter(|row| {
            row.get(layout.name_column)
                .and_then(|c| c.to_text())
                .map(|n| !n.trim().is_empty())
                .unwrap_or(false)
        })
        .count()
}
