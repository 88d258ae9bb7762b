//! Core data structures for XER processing.
//!
//! Every value stays text end to end. A [`Table`] owns its rows, keeps them
//! exactly as wide as its header, and resolves column names
//! case-insensitively. A [`DataStore`] is a case-insensitive collection of
//! tables, either one parsed file or the merge of many.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// Shared text field
pub type Field = Arc<str>;

/// One record of a table plus the file it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataRow {
    fields: Vec<Field>,
    file_name: Field,
}

impl DataRow {
    pub fn new(fields: Vec<Field>, file_name: Field) -> Self {
        Self { fields, file_name }
    }

    /// Build a row from owned or borrowed strings
    pub fn from_values<I, S>(values: I, file_name: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            fields: values.into_iter().map(|v| Arc::from(v.as_ref())).collect(),
            file_name: Arc::from(file_name),
        }
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(|f| f.as_ref())
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn file_name_field(&self) -> &Field {
        &self.file_name
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Truncate or right-pad with empty strings to exactly `width` fields
    fn fit_to(&mut self, width: usize) {
        if self.fields.len() != width {
            let empty: Field = Arc::from("");
            self.fields.resize(width, empty);
        }
    }
}

/// A named relation of rows sharing one header
#[derive(Debug, Clone, Default)]
pub struct Table {
    name: Field,
    headers: Vec<Field>,
    index: HashMap<String, usize>,
    rows: Vec<DataRow>,
}

impl Table {
    /// Create a table with no header; rows cannot be added until one is set
    pub fn new(name: impl Into<Field>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_headers(name: impl Into<Field>, headers: Vec<Field>) -> Self {
        let mut table = Self::new(name);
        table.set_headers(headers);
        table
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn headers(&self) -> &[Field] {
        &self.headers
    }

    pub fn has_headers(&self) -> bool {
        !self.headers.is_empty()
    }

    /// Replace the header and rebuild the column index.
    ///
    /// Lookups are case-insensitive and the first occurrence of a repeated
    /// name wins. Existing rows are refitted to the new width.
    pub fn set_headers(&mut self, headers: Vec<Field>) {
        self.index.clear();
        for (position, header) in headers.iter().enumerate() {
            self.index
                .entry(header.to_ascii_lowercase())
                .or_insert(position);
        }
        self.headers = headers;
        let width = self.headers.len();
        for row in &mut self.rows {
            row.fit_to(width);
        }
    }

    /// Column position for a header name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.index.get(&name.to_ascii_lowercase()).copied()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Append a row, repairing its width to match the header.
    ///
    /// # Panics
    ///
    /// Panics if the table has no header. Callers must set one first.
    pub fn add_row(&mut self, mut row: DataRow) {
        assert!(
            self.has_headers(),
            "row added to table '{}' before its header was set",
            self.name
        );
        row.fit_to(self.headers.len());
        self.rows.push(row);
    }

    /// Append many rows at once
    pub fn extend_rows(&mut self, rows: impl IntoIterator<Item = DataRow>) {
        for row in rows {
            self.add_row(row);
        }
    }

    pub fn rows(&self) -> &[DataRow] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Value of a named column in a row of this table, or "" when absent
    pub fn value<'a>(&self, row: &'a DataRow, column: &str) -> &'a str {
        self.column_index(column)
            .and_then(|index| row.get(index))
            .unwrap_or("")
    }

    /// Move every row of `other` to the end of this table.
    ///
    /// When the two headers differ, columns only `other` has are added at
    /// the end and its rows are realigned by column name.
    fn append(&mut self, other: Table) {
        if !self.has_headers() {
            self.set_headers(other.headers);
            self.extend_rows(other.rows);
            return;
        }
        if self.same_columns(&other) {
            self.extend_rows(other.rows);
            return;
        }

        warn!(
            "Table {} has different columns across files; aligning rows by column name",
            self.name
        );
        let added: Vec<Field> = other
            .headers
            .iter()
            .filter(|header| !self.has_column(header))
            .cloned()
            .collect();
        if !added.is_empty() {
            let mut headers = self.headers.clone();
            headers.extend(added);
            self.set_headers(headers);
        }

        let sources: Vec<Option<usize>> = self
            .headers
            .iter()
            .map(|header| other.column_index(header))
            .collect();
        let empty: Field = Arc::from("");
        for row in other.rows {
            let fields = sources
                .iter()
                .map(|source| {
                    source
                        .and_then(|index| row.fields.get(index).cloned())
                        .unwrap_or_else(|| empty.clone())
                })
                .collect();
            self.add_row(DataRow::new(fields, row.file_name));
        }
    }

    fn same_columns(&self, other: &Table) -> bool {
        self.headers.len() == other.headers.len()
            && self
                .headers
                .iter()
                .zip(&other.headers)
                .all(|(a, b)| a.eq_ignore_ascii_case(b))
    }
}

/// Case-insensitive name to table map
#[derive(Debug, Clone, Default)]
pub struct DataStore {
    tables: HashMap<String, Table>,
}

impl DataStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(name: &str) -> String {
        name.trim().to_ascii_uppercase()
    }

    pub fn get(&self, name: &str) -> Option<&Table> {
        self.tables.get(&Self::key(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(&Self::key(name))
    }

    /// Table by name, only when it holds at least one row
    pub fn non_empty(&self, name: &str) -> Option<&Table> {
        self.get(name).filter(|table| !table.is_empty())
    }

    /// Insert a table, appending to any existing table of the same name
    pub fn insert(&mut self, table: Table) {
        match self.tables.get_mut(&Self::key(table.name())) {
            Some(existing) => existing.append(table),
            None => {
                self.tables.insert(Self::key(table.name()), table);
            }
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Table> {
        self.tables.remove(&Self::key(name))
    }

    /// Fold another store into this one.
    ///
    /// Tables missing here are moved in; tables present in both keep this
    /// store's rows first, followed by the other store's rows.
    pub fn merge(&mut self, other: DataStore) {
        for (_, table) in other.tables {
            self.insert(table);
        }
    }

    /// Table names, sorted
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .tables
            .values()
            .map(|table| table.name().to_string())
            .collect();
        names.sort();
        names
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }

    pub fn total_rows(&self) -> usize {
        self.tables.values().map(Table::row_count).sum()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<Field> {
        names.iter().map(|n| Arc::from(*n)).collect()
    }

    #[test]
    fn test_rows_are_fitted_to_header_width() {
        let mut table = Table::with_headers("TASK", headers(&["a", "b", "c"]));
        table.add_row(DataRow::from_values(["1"], "f.xer"));
        table.add_row(DataRow::from_values(["1", "2", "3", "4", "5"], "f.xer"));
        table.add_row(DataRow::from_values(["1", "2", "3"], "f.xer"));

        for row in table.rows() {
            assert_eq!(row.len(), 3);
        }
        assert_eq!(table.rows()[0].get(1), Some(""));
        assert_eq!(table.rows()[0].get(2), Some(""));
        assert_eq!(table.rows()[1].get(2), Some("3"));
    }

    #[test]
    #[should_panic(expected = "before its header was set")]
    fn test_headerless_table_rejects_rows() {
        let mut table = Table::new("TASK");
        table.add_row(DataRow::from_values(["1"], "f.xer"));
    }

    #[test]
    fn test_header_lookup_is_case_insensitive_first_wins() {
        let table = Table::with_headers("TASK", headers(&["Task_ID", "name", "TASK_id"]));
        assert_eq!(table.column_index("task_id"), Some(0));
        assert_eq!(table.column_index("NAME"), Some(1));
        assert_eq!(table.column_index("missing"), None);
    }

    #[test]
    fn test_value_lookup_defaults_to_empty() {
        let mut table = Table::with_headers("TASK", headers(&["task_id", "status_code"]));
        table.add_row(DataRow::from_values(["7", "TK_Active"], "f.xer"));
        let row = &table.rows()[0];
        assert_eq!(table.value(row, "STATUS_CODE"), "TK_Active");
        assert_eq!(table.value(row, "nope"), "");
        assert_eq!(row.file_name(), "f.xer");
    }

    #[test]
    fn test_merge_appends_rows_in_order() {
        let mut a = DataStore::new();
        let mut x = Table::with_headers("X", headers(&["id"]));
        x.add_row(DataRow::from_values(["r1"], "a.xer"));
        a.insert(x);

        let mut b = DataStore::new();
        let mut x = Table::with_headers("x", headers(&["id"]));
        x.add_row(DataRow::from_values(["r2"], "b.xer"));
        b.insert(x);
        let mut y = Table::with_headers("Y", headers(&["id"]));
        y.add_row(DataRow::from_values(["y1"], "b.xer"));
        b.insert(y);

        a.merge(b);

        let merged = a.get("X").unwrap();
        let ids: Vec<&str> = merged.rows().iter().map(|r| r.get(0).unwrap()).collect();
        assert_eq!(ids, vec!["r1", "r2"]);
        assert_eq!(merged.rows()[0].file_name(), "a.xer");
        assert_eq!(merged.rows()[1].file_name(), "b.xer");
        assert!(a.contains("y"));
        assert_eq!(a.total_rows(), 3);
        assert_eq!(a.table_names(), vec!["X".to_string(), "Y".to_string()]);
    }

    #[test]
    fn test_merge_aligns_differing_columns_by_name() {
        let mut a = DataStore::new();
        let mut task = Table::with_headers("TASK", headers(&["task_id", "task_name"]));
        task.add_row(DataRow::from_values(["1", "Dig"], "a.xer"));
        a.insert(task);

        let mut b = DataStore::new();
        let mut task = Table::with_headers("TASK", headers(&["TASK_NAME", "wbs_id", "task_id"]));
        task.add_row(DataRow::from_values(["Pour", "100", "2"], "b.xer"));
        b.insert(task);

        a.merge(b);

        let merged = a.get("TASK").unwrap();
        let names: Vec<&str> = merged.headers().iter().map(|h| h.as_ref()).collect();
        assert_eq!(names, vec!["task_id", "task_name", "wbs_id"]);

        let first = &merged.rows()[0];
        assert_eq!(merged.value(first, "task_name"), "Dig");
        assert_eq!(merged.value(first, "wbs_id"), "");

        let second = &merged.rows()[1];
        assert_eq!(merged.value(second, "task_id"), "2");
        assert_eq!(merged.value(second, "task_name"), "Pour");
        assert_eq!(merged.value(second, "wbs_id"), "100");
        assert_eq!(second.file_name(), "b.xer");
    }

    #[test]
    fn test_non_empty_filters_tables_without_rows() {
        let mut store = DataStore::new();
        store.insert(Table::with_headers("EMPTY", headers(&["id"])));
        assert!(store.get("EMPTY").is_some());
        assert!(store.non_empty("EMPTY").is_none());
    }
}
