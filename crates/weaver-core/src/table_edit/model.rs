//! Header + row/cell grid representation of an HTML table.

use crate::markup::{self, Element};

use super::EditError;

/// Largest body row an edit may address.
pub const MAX_EDIT_ROWS: usize = 500;
/// Largest column an edit may address.
pub const MAX_EDIT_COLS: usize = 100;

/// Opening tag used when the source markup has no `<table>` element.
pub const DEFAULT_OPEN_TAG: &str = "<table class=\"llm-table\">";

/// Canonical grid form of a table.
///
/// Cell strings hold the cell's inner markup verbatim (trimmed). After any
/// mutation every row has exactly `column_count` cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableModel {
    /// Header cells; empty when the table has no header section.
    pub header: Vec<String>,
    /// Body rows.
    pub rows: Vec<Vec<String>>,
    pub column_count: usize,
    /// The original `<table ...>` opening tag, re-emitted verbatim.
    pub open_tag: String,
}

impl TableModel {
    /// Build a model from table markup.
    ///
    /// - Header cells come from the first row inside `<thead>`.
    /// - Body rows come from `<tbody>` sections if present, otherwise from
    ///   every row outside `<thead>`.
    /// - A row's cells are its `<td>` cells, or its `<th>` cells if it has
    ///   no `<td>`.
    /// - A first body row whose text repeats the header is dropped.
    pub fn parse(html: &str) -> Self {
        let (open_tag, body) = match markup::find_element(html, "table") {
            Some(table) => (table.open_tag(html).to_owned(), &html[table.inner]),
            None => (DEFAULT_OPEN_TAG.to_owned(), html),
        };

        let thead = markup::find_element(body, "thead");
        let header = thead
            .as_ref()
            .and_then(|head| {
                let head_html = &body[head.inner.clone()];
                markup::find_element(head_html, "tr")
                    .map(|tr| row_cells(&head_html[tr.inner], "th", "td"))
            })
            .unwrap_or_default();

        let tbodies = markup::find_all(body, "tbody");
        let rows_source: String = if !tbodies.is_empty() {
            tbodies.iter().map(|b| &body[b.inner.clone()]).collect()
        } else if let Some(head) = &thead {
            format!("{}{}", &body[..head.outer.start], &body[head.outer.end..])
        } else {
            body.to_owned()
        };

        let mut rows: Vec<Vec<String>> = markup::find_all(&rows_source, "tr")
            .into_iter()
            .map(|tr: Element| row_cells(&rows_source[tr.inner], "td", "th"))
            .collect();

        if let Some(first) = rows.first() {
            if !header.is_empty() && same_text(first, &header) {
                rows.remove(0);
            }
        }

        let column_count = rows
            .iter()
            .map(Vec::len)
            .max()
            .unwrap_or(header.len());

        Self {
            header,
            rows,
            column_count,
            open_tag,
        }
    }

    /// Render back to markup: the original opening tag, a header section
    /// only when the header spans every column, then one `<tr>` per body
    /// row with exactly `column_count` cells.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(64 * (self.rows.len() + 1));
        out.push_str(&self.open_tag);

        if !self.header.is_empty() && self.header.len() == self.column_count {
            out.push_str("<thead><tr>");
            for cell in &self.header {
                out.push_str(&format!("<th>{cell}</th>"));
            }
            out.push_str("</tr></thead>");
        }

        out.push_str("<tbody>");
        for row in &self.rows {
            out.push_str("<tr>");
            for i in 0..self.column_count {
                let cell = row.get(i).map(String::as_str).unwrap_or_default();
                out.push_str(&format!("<td>{cell}</td>"));
            }
            out.push_str("</tr>");
        }
        out.push_str("</tbody></table>");
        out
    }

    /// Overwrite the cell at 1-based (`row`, `col`), growing the grid as
    /// needed. Every other cell is left untouched.
    ///
    /// Coordinates beyond [`MAX_EDIT_ROWS`] x [`MAX_EDIT_COLS`] are rejected
    /// before anything is allocated.
    pub fn set_cell(&mut self, row: usize, col: usize, value: String) -> Result<(), EditError> {
        if row == 0 || col == 0 {
            return Err(EditError::InvalidCoordinate { row, col });
        }
        if row > MAX_EDIT_ROWS || col > MAX_EDIT_COLS {
            return Err(EditError::OutOfRange { row, col });
        }

        let width = self.column_count.max(1);
        while self.rows.len() < row {
            self.rows.push(vec![String::new(); width]);
        }

        self.column_count = self.column_count.max(col);
        for cells in &mut self.rows {
            cells.resize(self.column_count, String::new());
        }

        self.rows[row - 1][col - 1] = value;
        Ok(())
    }
}

fn row_cells(row_html: &str, primary: &str, fallback: &str) -> Vec<String> {
    let mut cells = markup::find_all(row_html, primary);
    if cells.is_empty() {
        cells = markup::find_all(row_html, fallback);
    }
    cells
        .into_iter()
        .map(|cell| row_html[cell.inner].trim().to_owned())
        .collect()
}

fn same_text(a: &[String], b: &[String]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| normalize(x) == normalize(y))
}

fn normalize(cell: &str) -> String {
    markup::strip_tags(cell).trim().to_lowercase()
}
