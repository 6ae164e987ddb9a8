/// Rows as they come out of a source, before any typing.
///
/// `origin` identifies the source (file path or a label) in error messages.
/// A `None` cell is a value the source did not provide (short CSV row, SQL NULL).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub origin: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl RawTable {
    pub fn new(origin: impl Into<String>, headers: Vec<String>) -> Self {
        Self {
            origin: origin.into(),
            headers,
            rows: Vec::new(),
        }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn push_row(&mut self, row: Vec<Option<String>>) {
        self.rows.push(row);
    }

    /// Cell lookup that tolerates rows shorter than the header.
    pub fn cell(row: &[Option<String>], column: usize) -> Option<&str> {
        row.get(column).and_then(|c| c.as_deref())
    }
}
