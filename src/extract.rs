use crate::model::{row_cell, CellValue, GradeRecord, GradeValue, TermFilter, TermTag, Worksheet};
use serde::Serialize;

/// Row holding the "AÑO:" / "SECCIÓN:" header cells (7th row).
pub const COURSE_HEADER_ROW: usize = 6;
const YEAR_PREFIX: &str = "AÑO:";
const SECTION_PREFIX: &str = "SECCIÓN:";

/// Rows 0..10 are titles and column headers; student data starts at row 10.
pub const HEADER_ROW_COUNT: usize = 10;
pub const NAME_COLUMN: usize = 1;

const UNGRADED_MARKERS: [&str; 4] = ["s/e", "sin evaluar", "null", ""];
const MIN_GRADE: f64 = 0.0;
const MAX_GRADE: f64 = 10.0;

/// Where a gradebook vintage keeps its student names and term grades.
///
/// Each term reads a window of columns; the first cell in the window that
/// normalizes to something wins. Single-column windows are plain lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnLayout {
    pub name: &'static str,
    pub description: &'static str,
    pub header_rows: usize,
    pub name_column: usize,
    pub first_term: &'static [usize],
    pub second_term: &'static [usize],
    pub final_term: &'static [usize],
}

pub const CURRENT_LAYOUT: ColumnLayout = ColumnLayout {
    name: "current",
    description: "Columns J, R and W",
    header_rows: HEADER_ROW_COUNT,
    name_column: NAME_COLUMN,
    first_term: &[9],
    second_term: &[17],
    final_term: &[22],
};

pub const WINDOWED_LAYOUT: ColumnLayout = ColumnLayout {
    name: "windowed",
    description: "First value in E-H, I-L and M-P",
    header_rows: HEADER_ROW_COUNT,
    name_column: NAME_COLUMN,
    first_term: &[4, 5, 6, 7],
    second_term: &[8, 9, 10, 11],
    final_term: &[12, 13, 14, 15],
};

pub const EARLY_LAYOUT: ColumnLayout = ColumnLayout {
    name: "early",
    description: "Columns E, K and Q",
    header_rows: HEADER_ROW_COUNT,
    name_column: NAME_COLUMN,
    first_term: &[4],
    second_term: &[10],
    final_term: &[16],
};

pub const DEFAULT_LAYOUT: &str = "current";

pub static LAYOUTS: &[ColumnLayout] = &[CURRENT_LAYOUT, WINDOWED_LAYOUT, EARLY_LAYOUT];

impl ColumnLayout {
    pub fn by_name(name: &str) -> Option<&'static ColumnLayout> {
        LAYOUTS.iter().find(|l| l.name == name)
    }

    pub fn columns(&self, term: TermTag) -> &'static [usize] {
        match term {
            TermTag::FirstTerm => self.first_term,
            TermTag::SecondTerm => self.second_term,
            TermTag::Final => self.final_term,
        }
    }
}

/// Builds "{year} {section}" from the header row, or `None` when the sheet
/// has no usable header. Callers fall back to the file name.
pub fn extract_course_label(ws: &Worksheet) -> Option<String> {
    if ws.grid.len() <= COURSE_HEADER_ROW {
        return None;
    }
    let year = header_value(ws.cell(COURSE_HEADER_ROW, 0), YEAR_PREFIX);
    let section = header_value(ws.cell(COURSE_HEADER_ROW, 1), SECTION_PREFIX);
    if year.is_empty() || section.is_empty() {
        return None;
    }
    Some(format!("{} {}", year, section))
}

fn header_value(cell: &CellValue, prefix: &str) -> String {
    let Some(text) = cell.to_text() else {
        return String::new();
    };
    let t = text.trim_start();
    t.strip_prefix(prefix).unwrap_or(t).trim().to_string()
}

/// Classifies one raw cell: a grade in [0, 10], an explicit "ungraded"
/// marker, or nothing at all.
pub fn normalize_grade(raw: &CellValue) -> Option<GradeValue> {
    if raw.is_blank() {
        return None;
    }
    let s = raw.to_text()?.trim().to_lowercase();
    if UNGRADED_MARKERS.contains(&s.as_str()) {
        return Some(GradeValue::Ungraded);
    }
    let n = parse_leading_float(&s)?;
    if !(MIN_GRADE..=MAX_GRADE).contains(&n) {
        return None;
    }
    // -0 parses fine but should never leak into responses.
    Some(GradeValue::Score(if n == 0.0 { 0.0 } else { n }))
}

/// Parses the longest decimal prefix of `s` ("7,5" reads as 7, "8 (rec)" as 8).
/// Gradebooks are typed by hand and the web front-ends always accepted this.
pub fn parse_leading_float(s: &str) -> Option<f64> {
    fast_float2::parse_partial::<f64, _>(s)
        .ok()
        .filter(|(_, consumed)| *consumed > 0)
        .map(|(v, _)| v)
}

/// Reads the term columns of one student row. Records come out in
/// first, second, final order; cells that normalize to nothing are dropped.
pub fn extract_grades(
    row: &[CellValue],
    subject: &str,
    course: &str,
    filter: TermFilter,
    layout: &ColumnLayout,
) -> Vec<GradeRecord> {
    let mut out = Vec::new();
    for term in TermTag::ALL {
        if !filter.accepts(term) {
            continue;
        }
        let grade = layout
            .columns(term)
            .iter()
            .find_map(|&col| normalize_grade(row_cell(row, col)));
        if let Some(grade) = grade {
            out.push(GradeRecord {
                subject: subject.to_string(),
                course: course.to_string(),
                term,
                grade,
            });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    fn header_sheet(year: CellValue, section: CellValue) -> Worksheet {
        let mut grid = vec![Vec::new(); 7];
        grid[6] = vec![year, section];
        Worksheet::new("Matemática", grid)
    }

    fn row_with(cells: &[(usize, CellValue)]) -> Vec<CellValue> {
        let mut row = vec![CellValue::Empty; 23];
        row[1] = text("GOMEZ, ANA");
        for (col, v) in cells {
            row[*col] = v.clone();
        }
        row
    }

    #[test]
    fn course_label_strips_header_prefixes() {
        let ws = header_sheet(text("AÑO: 5"), text("SECCIÓN: A"));
        assert_eq!(extract_course_label(&ws).as_deref(), Some("5 A"));
    }

    #[test]
    fn course_label_accepts_numeric_year_without_prefix() {
        let ws = header_sheet(CellValue::Number(3.0), text("B"));
        assert_eq!(extract_course_label(&ws).as_deref(), Some("3 B"));
    }

    #[test]
    fn course_label_needs_both_parts() {
        let ws = header_sheet(text("AÑO: 5"), text("SECCIÓN:   "));
        assert_eq!(extract_course_label(&ws), None);
        let ws = header_sheet(CellValue::Empty, text("SECCIÓN: A"));
        assert_eq!(extract_course_label(&ws), None);
    }

    #[test]
    fn course_label_prefix_is_case_sensitive() {
        let ws = header_sheet(text("año: 5"), text("SECCIÓN: A"));
        assert_eq!(extract_course_label(&ws).as_deref(), Some("año: 5 A"));
    }

    #[test]
    fn course_label_absent_on_short_sheet() {
        let ws = Worksheet::new("Lengua", vec![vec![text("AÑO: 5"), text("SECCIÓN: A")]; 6]);
        assert_eq!(extract_course_label(&ws), None);
    }

    #[test]
    fn normalize_range_boundaries() {
        assert_eq!(normalize_grade(&text("10")), Some(GradeValue::Score(10.0)));
        assert_eq!(normalize_grade(&text("10.1")), None);
        assert_eq!(normalize_grade(&text("-0.1")), None);
        assert_eq!(normalize_grade(&text("0")), Some(GradeValue::Score(0.0)));
        assert_eq!(normalize_grade(&CellValue::Number(7.5)), Some(GradeValue::Score(7.5)));
        assert_eq!(normalize_grade(&CellValue::Number(11.0)), None);
    }

    #[test]
    fn normalize_sentinels_and_blanks() {
        assert_eq!(normalize_grade(&CellValue::Empty), None);
        assert_eq!(normalize_grade(&text("")), None);
        assert_eq!(normalize_grade(&text("S/E")), Some(GradeValue::Ungraded));
        assert_eq!(normalize_grade(&text("  Sin Evaluar ")), Some(GradeValue::Ungraded));
        assert_eq!(normalize_grade(&text("NULL")), Some(GradeValue::Ungraded));
        // Whitespace-only is present but trims to the empty marker.
        assert_eq!(normalize_grade(&text("   ")), Some(GradeValue::Ungraded));
    }

    #[test]
    fn normalize_is_total_over_junk() {
        for raw in ["abc", "ausente", ".", "-", "e5", "#DIV/0!", "nan", "Infinity"] {
            assert_eq!(normalize_grade(&text(raw)), None, "{raw}");
        }
        for n in -5..=15 {
            let got = normalize_grade(&text(&n.to_string()));
            if (0..=10).contains(&n) {
                assert_eq!(got, Some(GradeValue::Score(n as f64)));
            } else {
                assert_eq!(got, None);
            }
        }
    }

    #[test]
    fn leading_float_prefix_rules() {
        assert_eq!(parse_leading_float("7,5"), Some(7.0));
        assert_eq!(parse_leading_float("8 (recuperó)"), Some(8.0));
        assert_eq!(parse_leading_float(".5"), Some(0.5));
        assert_eq!(parse_leading_float("6."), Some(6.0));
        assert_eq!(parse_leading_float("1e1"), Some(10.0));
        assert_eq!(parse_leading_float("9e"), Some(9.0));
        assert_eq!(parse_leading_float("-"), None);
        assert_eq!(parse_leading_float("x7"), None);
        assert_eq!(parse_leading_float("abc"), None);
        assert_eq!(parse_leading_float("10.1"), Some(10.1));
    }

    #[test]
    fn extract_reads_canonical_columns_in_order() {
        let row = row_with(&[(9, text("8")), (17, text("S/E")), (22, text("7.5"))]);
        let got = extract_grades(&row, "Matemática", "1 B", TermFilter::All, &CURRENT_LAYOUT);
        let terms: Vec<_> = got.iter().map(|g| (g.term, g.grade)).collect();
        assert_eq!(
            terms,
            vec![
                (TermTag::FirstTerm, GradeValue::Score(8.0)),
                (TermTag::SecondTerm, GradeValue::Ungraded),
                (TermTag::Final, GradeValue::Score(7.5)),
            ]
        );
        assert!(got.iter().all(|g| g.subject == "Matemática" && g.course == "1 B"));
    }

    #[test]
    fn extract_honors_term_filter() {
        let row = row_with(&[(9, text("8")), (17, text("6")), (22, text("7"))]);
        for term in TermTag::ALL {
            let got = extract_grades(
                &row,
                "Física",
                "2 A",
                TermFilter::Only(term),
                &CURRENT_LAYOUT,
            );
            assert_eq!(got.len(), 1);
            assert_eq!(got[0].term, term);
        }
    }

    #[test]
    fn extract_is_repeatable() {
        let row = row_with(&[(9, text("4")), (22, text("junk"))]);
        let a = extract_grades(&row, "Química", "4 C", TermFilter::All, &CURRENT_LAYOUT);
        let b = extract_grades(&row, "Química", "4 C", TermFilter::All, &CURRENT_LAYOUT);
        assert_eq!(a, b);
        assert_eq!(a.len(), 1);
    }

    #[test]
    fn extract_survives_short_rows() {
        let row = vec![CellValue::Empty, text("LOPEZ, EVA")];
        let got = extract_grades(&row, "Inglés", "1 A", TermFilter::All, &CURRENT_LAYOUT);
        assert!(got.is_empty());
    }

    #[test]
    fn windowed_layout_takes_first_value_in_window() {
        let row = row_with(&[
            (5, text("junk")),
            (6, text("9")),
            (7, text("3")),
            (11, text("s/e")),
        ]);
        let got = extract_grades(&row, "Taller", "5 A", TermFilter::All, &WINDOWED_LAYOUT);
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].grade, GradeValue::Score(9.0));
        assert_eq!(got[1].term, TermTag::SecondTerm);
        assert_eq!(got[1].grade, GradeValue::Ungraded);
    }

    #[test]
    fn layouts_resolve_by_name() {
        assert_eq!(ColumnLayout::by_name(DEFAULT_LAYOUT), Some(&CURRENT_LAYOUT));
        assert_eq!(ColumnLayout::by_name("early").map(|l| l.second_term), Some(&[10usize][..]));
        assert!(ColumnLayout::by_name("missing").is_none());
    }
}
