//! Raw rectangular input table.
//!
//! This is the boundary between file loading (`io::ingest`) and validation
//! (`data::dataset`): every cell is still an untyped string, and header lookup
//! is case-insensitive so `ID`, `id` and `Id` all resolve to the same column.

/// One untyped input row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    /// 1-based line number in the source (the header is line 1).
    pub line: usize,
    pub cells: Vec<String>,
}

/// Untyped table: headers plus rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    headers: Vec<String>,
    rows: Vec<RawRow>,
}

impl RawTable {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row. Line numbers continue from the previous row.
    pub fn push_row<I, S>(&mut self, cells: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let line = self.rows.last().map(|r| r.line + 1).unwrap_or(2);
        self.push_row_at(line, cells);
    }

    /// Append a row with an explicit source line number.
    pub fn push_row_at<I, S>(&mut self, line: usize, cells: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows.push(RawRow {
            line,
            cells: cells.into_iter().map(Into::into).collect(),
        });
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[RawRow] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of a column by case-insensitive name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let wanted = normalize_header_name(name);
        self.headers
            .iter()
            .position(|h| normalize_header_name(h) == wanted)
    }

    /// Trimmed cell value, or `None` if the cell is absent or blank.
    pub fn cell<'a>(&self, row: &'a RawRow, idx: usize) -> Option<&'a str> {
        row.cells.get(idx).map(|s| s.trim()).filter(|s| !s.is_empty())
    }
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports sometimes prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}
