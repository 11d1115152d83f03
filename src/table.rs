//! Tabular display with role-gated selection, sorting and pagination.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::models::{Assignment, Capabilities, CourseAssignment, Submission};

pub const PAGE_SIZE_OPTIONS: [usize; 4] = [10, 25, 50, 100];
const NO_ROWS: &str = "No rows";

pub trait TableRow {
    fn row_id(&self) -> i64;
}

impl TableRow for Assignment {
    fn row_id(&self) -> i64 {
        self.id
    }
}

impl TableRow for CourseAssignment {
    fn row_id(&self) -> i64 {
        self.id
    }
}

impl TableRow for Submission {
    fn row_id(&self) -> i64 {
        self.id
    }
}

pub struct Column<R> {
    pub header: &'static str,
    render: Box<dyn Fn(&R) -> String + Send + Sync>,
}

impl<R> Column<R> {
    pub fn new(header: &'static str, render: impl Fn(&R) -> String + Send + Sync + 'static) -> Self {
        Self {
            header,
            render: Box::new(render),
        }
    }

    pub fn cell(&self, row: &R) -> String {
        (self.render)(row)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

pub struct DataTable<R> {
    columns: Vec<Column<R>>,
    capabilities: Capabilities,
    selection: BTreeSet<i64>,
    sort: Option<(usize, SortDirection)>,
    page: usize,
    page_size: usize,
}

impl<R: TableRow> DataTable<R> {
    pub fn new(columns: Vec<Column<R>>, capabilities: Capabilities) -> Self {
        Self {
            columns,
            capabilities,
            selection: BTreeSet::new(),
            sort: None,
            page: 0,
            page_size: PAGE_SIZE_OPTIONS[0],
        }
    }

    pub fn set_capabilities(&mut self, capabilities: Capabilities) {
        self.capabilities = capabilities;
        if !capabilities.can_select {
            self.selection.clear();
        }
    }

    pub fn selection_enabled(&self) -> bool {
        self.capabilities.can_select
    }

    /// The bulk-action toolbar is shown only to roles that can select.
    pub fn toolbar_visible(&self) -> bool {
        self.capabilities.can_select && (self.capabilities.can_delete || self.capabilities.can_update)
    }

    pub fn toggle(&mut self, id: i64) {
        if !self.capabilities.can_select {
            return;
        }
        if !self.selection.remove(&id) {
            self.selection.insert(id);
        }
    }

    pub fn select(&mut self, ids: impl IntoIterator<Item = i64>) {
        if !self.capabilities.can_select {
            return;
        }
        self.selection = ids.into_iter().collect();
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn selection(&self) -> Vec<i64> {
        self.selection.iter().copied().collect()
    }

    /// Drops selected ids that are no longer among `rows`.
    pub fn retain_rows(&mut self, rows: &[R]) {
        self.selection.retain(|id| rows.iter().any(|r| r.row_id() == *id));
        self.page = self.page.min(self.page_count(rows.len()).saturating_sub(1));
    }

    /// Calls `on_delete` with the selection. Returns whether it was called.
    pub fn delete_selected(&self, on_delete: impl FnOnce(Vec<i64>)) -> bool {
        if !(self.capabilities.can_select && self.capabilities.can_delete) || self.selection.is_empty() {
            return false;
        }
        on_delete(self.selection());
        true
    }

    /// Calls `on_update` with the single selected row.
    pub fn update_selected<'a>(&self, rows: &'a [R], on_update: impl FnOnce(&'a R)) -> bool {
        if !(self.capabilities.can_select && self.capabilities.can_update) || self.selection.len() != 1 {
            return false;
        }
        let Some(id) = self.selection.iter().next() else {
            return false;
        };
        match rows.iter().find(|r| r.row_id() == *id) {
            Some(row) => {
                on_update(row);
                true
            }
            None => false,
        }
    }

    /// Sorts by `column`; repeating the same column flips the direction.
    pub fn sort_by(&mut self, column: usize) {
        if column >= self.columns.len() {
            return;
        }
        self.sort = match self.sort {
            Some((c, SortDirection::Ascending)) if c == column => Some((column, SortDirection::Descending)),
            _ => Some((column, SortDirection::Ascending)),
        };
    }

    pub fn set_page_size(&mut self, size: usize) -> bool {
        if !PAGE_SIZE_OPTIONS.contains(&size) {
            return false;
        }
        self.page_size = size;
        self.page = 0;
        true
    }

    pub fn set_page(&mut self, page: usize, total_rows: usize) {
        self.page = page.min(self.page_count(total_rows).saturating_sub(1));
    }

    pub fn page_count(&self, total_rows: usize) -> usize {
        total_rows.div_ceil(self.page_size).max(1)
    }

    /// Rows of the current page, sorted.
    pub fn visible<'a>(&self, rows: &'a [R]) -> Vec<&'a R> {
        let mut ordered: Vec<&R> = rows.iter().collect();
        if let Some((col, direction)) = self.sort {
            let column = &self.columns[col];
            ordered.sort_by(|a, b| {
                let ord = compare_cells(&column.cell(a), &column.cell(b));
                match direction {
                    SortDirection::Ascending => ord,
                    SortDirection::Descending => ord.reverse(),
                }
            });
        }
        ordered
            .into_iter()
            .skip(self.page * self.page_size)
            .take(self.page_size)
            .collect()
    }

    pub fn render(&self, rows: &[R]) -> String {
        let page = self.visible(rows);
        if page.is_empty() {
            return NO_ROWS.to_string();
        }

        let select = self.capabilities.can_select;
        let mut grid: Vec<Vec<String>> = Vec::with_capacity(page.len() + 1);
        let mut header: Vec<String> = self.columns.iter().map(|c| c.header.to_string()).collect();
        if select {
            header.insert(0, String::new());
        }
        grid.push(header);
        for row in &page {
            let mut cells: Vec<String> = self.columns.iter().map(|c| c.cell(row)).collect();
            if select {
                let mark = if self.selection.contains(&row.row_id()) { "[x]" } else { "[ ]" };
                cells.insert(0, mark.to_string());
            }
            grid.push(cells);
        }

        let widths: Vec<usize> = (0..grid[0].len())
            .map(|i| grid.iter().map(|r| r[i].chars().count()).max().unwrap_or(0))
            .collect();

        let mut out = String::new();
        for (n, row) in grid.iter().enumerate() {
            let line: Vec<String> = row
                .iter()
                .zip(&widths)
                .map(|(cell, w)| format!("{:<width$}", cell, width = *w))
                .collect();
            out.push_str(line.join("  ").trim_end());
            out.push('\n');
            if n == 0 {
                let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
                out.push_str(&rule.join("  "));
                out.push('\n');
            }
        }

        let first = self.page * self.page_size + 1;
        let last = first + page.len() - 1;
        out.push_str(&format!("Rows {}-{} of {}", first, last, rows.len()));
        if select && !self.selection.is_empty() {
            out.push_str(&format!(" | {} selected", self.selection.len()));
        }
        out
    }
}

fn compare_cells(a: &str, b: &str) -> Ordering {
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => a.to_lowercase().cmp(&b.to_lowercase()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Debug)]
    struct Row {
        id: i64,
        name: &'static str,
        score: u32,
    }

    impl TableRow for Row {
        fn row_id(&self) -> i64 {
            self.id
        }
    }

    fn table(caps: Capabilities) -> DataTable<Row> {
        DataTable::new(
            vec![
                Column::new("Name", |r: &Row| r.name.to_string()),
                Column::new("Score", |r: &Row| r.score.to_string()),
            ],
            caps,
        )
    }

    fn rows() -> Vec<Row> {
        vec![
            Row { id: 1, name: "carmel", score: 9 },
            Row { id: 2, name: "arbel", score: 70 },
            Row { id: 3, name: "Betzet", score: 100 },
        ]
    }

    #[test]
    fn test_student_never_triggers_callbacks() {
        let rows = rows();
        let mut t = table(Capabilities::STUDENT);
        t.toggle(1);
        t.select([1, 2, 3]);
        assert!(t.selection().is_empty());

        let calls = Cell::new(0);
        assert!(!t.delete_selected(|_| calls.set(calls.get() + 1)));
        assert!(!t.update_selected(&rows, |_| calls.set(calls.get() + 1)));
        assert_eq!(calls.get(), 0);
        assert!(!t.toolbar_visible());
        assert!(!t.render(&rows).contains("[ ]"));
    }

    #[test]
    fn test_teacher_delete_receives_selection() {
        let mut t = table(Capabilities::TEACHER);
        t.toggle(3);
        t.toggle(1);
        let mut got = Vec::new();
        assert!(t.delete_selected(|ids| got = ids));
        assert_eq!(got, vec![1, 3]);
    }

    #[test]
    fn test_update_requires_exactly_one_row() {
        let rows = rows();
        let mut t = table(Capabilities::TEACHER);
        t.select([1, 2]);
        assert!(!t.update_selected(&rows, |_| {}));

        t.select([2]);
        let mut name = "";
        assert!(t.update_selected(&rows, |r| name = r.name));
        assert_eq!(name, "arbel");
    }

    #[test]
    fn test_sorting_is_numeric_aware_and_toggles() {
        let rows = rows();
        let mut t = table(Capabilities::TEACHER);
        t.sort_by(1);
        let ids: Vec<i64> = t.visible(&rows).iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);

        t.sort_by(1);
        let ids: Vec<i64> = t.visible(&rows).iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);

        t.sort_by(0);
        let ids: Vec<i64> = t.visible(&rows).iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn test_pagination() {
        let many: Vec<Row> = (1..=23).map(|id| Row { id, name: "r", score: 0 }).collect();
        let mut t = table(Capabilities::TEACHER);
        assert_eq!(t.page_count(many.len()), 3);

        t.set_page(2, many.len());
        assert_eq!(t.visible(&many).len(), 3);
        assert!(t.render(&many).ends_with("Rows 21-23 of 23"));

        assert!(!t.set_page_size(7));
        assert!(t.set_page_size(25));
        assert_eq!(t.visible(&many).len(), 23);
    }

    #[test]
    fn test_empty_renders_overlay() {
        let t = table(Capabilities::TEACHER);
        assert_eq!(t.render(&[]), "No rows");
    }
}
