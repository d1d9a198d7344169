//! Application-defined SQL functions registered on every registry connection.
//!
//! SQLite's built-in `lower()` and `LIKE` only fold ASCII, so names such as
//! `JOÃO` would never match `joão`. `fold_case` lowercases with full Unicode
//! rules so search predicates can compare folded text on both sides.

use rusqlite::functions::FunctionFlags;
use rusqlite::Connection;

/// SQL name of the Unicode lowercase function.
pub const FOLD_CASE_FUNCTION: &str = "fold_case";

/// Registers registry SQL functions on `conn`.
pub(crate) fn register_functions(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        FOLD_CASE_FUNCTION,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let value: Option<String> = ctx.get(0)?;
            Ok(value.map(|text| fold_case(&text)))
        },
    )
}

/// Lowercases `text` for case-insensitive comparisons.
pub fn fold_case(text: &str) -> String {
    text.to_lowercase()
}
