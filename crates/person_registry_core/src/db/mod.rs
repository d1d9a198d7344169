//! Registry storage: connection bootstrap, SQL functions and schema migrations.
//!
//! # Responsibility
//! - Hand out connections that are ready for `SqlitePersonRepository`.
//! - Keep the `persons` schema at the version this binary understands.
//!
//! # Invariants
//! - Schema version lives in `PRAGMA user_version`.
//! - Every connection returned by `open_db*` carries `fold_case`.
//! - A database written by a newer registry is refused, never downgraded.

use std::error::Error;
use std::fmt::{Display, Formatter};

mod functions;
pub mod migrations;
mod open;

pub use functions::{fold_case, FOLD_CASE_FUNCTION};
pub use open::{open_db, open_db_in_memory, BUSY_TIMEOUT};

pub type DbResult<T> = Result<T, DbError>;

/// Registry storage failure.
#[derive(Debug)]
pub enum DbError {
    /// SQLite refused an open, pragma, migration or query (I/O, lock timeout, ...).
    Sqlite(rusqlite::Error),
    /// `fold_case` could not be installed, so search would be unavailable.
    FunctionRegistration(rusqlite::Error),
    /// Registry file was migrated by a newer release.
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "registry storage error: {err}"),
            Self::FunctionRegistration(err) => {
                write!(f, "cannot register `{FOLD_CASE_FUNCTION}` on registry connection: {err}")
            }
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "registry schema version {db_version} is newer than supported {latest_supported}; upgrade the registry binary"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) | Self::FunctionRegistration(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
