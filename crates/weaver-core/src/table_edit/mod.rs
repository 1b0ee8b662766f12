//! Deterministic table-edit engine.
//!
//! ```text
//! Detect -> Extract -> Parse -> Mutate -> Render -> Emit
//! ```
//!
//! When a prior table and an edit-shaped instruction are both present, the
//! targeted cell is rewritten without any completion call, so no other cell
//! can change. Only an instruction whose coordinates or value cannot be
//! extracted falls back to [`generative_edit`].

pub mod instruction;
pub mod model;

use serde_json::json;

use crate::completion::{Completion, CompletionError};
use crate::executor::sanitize::coerce_table;
use crate::markup;
use crate::prompts::{PromptLibrary, PromptName};

pub use instruction::{EditInstruction, extract_edit_instruction, looks_like_table_edit};
pub use model::{MAX_EDIT_COLS, MAX_EDIT_ROWS, TableModel};

/// Errors from applying a deterministic edit.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EditError {
    #[error("cell coordinates are 1-based, got row {row} column {col}")]
    InvalidCoordinate { row: usize, col: usize },
    #[error("cell row {row} column {col} is outside the editable range")]
    OutOfRange { row: usize, col: usize },
}

/// Apply `edit` to the table inside `prior` and return the updated artifact.
///
/// The new value is HTML-escaped. Markup around the table (such as a title
/// heading) is kept; only the table element itself is replaced.
pub fn apply_edit(prior: &str, edit: &EditInstruction) -> Result<String, EditError> {
    let mut model = TableModel::parse(prior);
    model.set_cell(edit.row, edit.col, markup::escape_html(&edit.value))?;
    let rendered = model.render();

    tracing::info!(row = edit.row, col = edit.col, "applied deterministic table edit");

    Ok(match markup::find_element(prior, "table") {
        Some(table) => format!(
            "{}{}{}",
            &prior[..table.outer.start],
            rendered,
            &prior[table.outer.end..]
        ),
        None => rendered,
    })
}

/// Ask the completion service to apply a free-form edit to `prior`.
///
/// The reply is reduced with the table sanitizer.
pub async fn generative_edit(
    completion: &dyn Completion,
    prompts: &PromptLibrary,
    prior: &str,
    instruction: &str,
) -> Result<String, CompletionError> {
    let payload = json!({
        "previous_table": prior,
        "instruction": instruction,
    })
    .to_string();

    let reply = completion
        .generate(&payload, prompts.get(PromptName::TableEdit))
        .await?;
    tracing::info!("applied generative table edit");
    Ok(coerce_table(&crate::executor::strip_placeholder_leaks(&reply)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edit(row: usize, col: usize, value: &str) -> EditInstruction {
        EditInstruction {
            row,
            col,
            value: value.into(),
        }
    }

    #[test]
    fn headerless_three_by_three_grows_to_five_rows() {
        let prior = "<table><tr><td>a</td><td>b</td><td>c</td></tr>\
                     <tr><td>d</td><td>e</td><td>f</td></tr>\
                     <tr><td>g</td><td>h</td><td>i</td></tr></table>";
        let updated = apply_edit(prior, &edit(5, 1, "32")).unwrap();
        let model = TableModel::parse(&updated);

        assert_eq!(model.rows.len(), 5);
        assert_eq!(model.rows[0], vec!["a", "b", "c"]);
        assert_eq!(model.rows[1], vec!["d", "e", "f"]);
        assert_eq!(model.rows[2], vec!["g", "h", "i"]);
        assert_eq!(model.rows[3], vec!["", "", ""]);
        assert_eq!(model.rows[4], vec!["32", "", ""]);
    }

    #[test]
    fn two_by_two_single_cell() {
        let prior = "<table><tr><td>A</td><td>B</td></tr><tr><td>C</td><td>D</td></tr></table>";
        let updated = apply_edit(prior, &edit(2, 1, "Z")).unwrap();
        assert_eq!(
            TableModel::parse(&updated).rows,
            vec![vec!["A", "B"], vec!["Z", "D"]]
        );
    }

    #[test]
    fn keeps_title_and_open_tag() {
        let prior = "<h3>Scores</h3><table class=\"llm-table\" id=\"s\"><thead><tr><th>Team</th><th>Pts</th></tr></thead>\
                     <tbody><tr><td>Red</td><td>3</td></tr></tbody></table>";
        let updated = apply_edit(prior, &edit(1, 2, "4")).unwrap();
        assert_eq!(
            updated,
            "<h3>Scores</h3><table class=\"llm-table\" id=\"s\"><thead><tr><th>Team</th><th>Pts</th></tr></thead>\
             <tbody><tr><td>Red</td><td>4</td></tr></tbody></table>"
        );
    }

    #[test]
    fn value_is_escaped() {
        let prior = "<table><tr><td>x</td></tr></table>";
        let updated = apply_edit(prior, &edit(1, 1, "<script>")).unwrap();
        assert!(updated.contains("<td>&lt;script&gt;</td>"));
    }

    #[test]
    fn editing_is_idempotent() {
        let prior = "<table><tr><td>1</td><td>2</td></tr></table>";
        let once = apply_edit(prior, &edit(2, 3, "v")).unwrap();
        let twice = apply_edit(&once, &edit(2, 3, "v")).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn zero_coordinates_are_rejected() {
        let prior = "<table><tr><td>1</td></tr></table>";
        assert_eq!(
            apply_edit(prior, &edit(1, 0, "x")),
            Err(EditError::InvalidCoordinate { row: 1, col: 0 })
        );
    }

    #[test]
    fn oversized_coordinates_are_rejected_without_growing() {
        let prior = "<table><tr><td>1</td></tr></table>";
        assert_eq!(
            apply_edit(prior, &edit(MAX_EDIT_ROWS + 1, 1, "x")),
            Err(EditError::OutOfRange { row: MAX_EDIT_ROWS + 1, col: 1 })
        );
        assert_eq!(
            apply_edit(prior, &edit(1, MAX_EDIT_COLS + 1, "x")),
            Err(EditError::OutOfRange { row: 1, col: MAX_EDIT_COLS + 1 })
        );
    }
}
