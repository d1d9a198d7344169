//! Person repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide the record store used by the person merge engine.
//! - Keep SQL details inside the core persistence boundary.
//! - Translate SQLite uniqueness failures into `RepoError::DuplicateKey`.
//!
//! # Invariants
//! - `persons.identifier` is unique at the storage level; a conflicting write
//!   is rejected even when a caller's pre-check passed.
//! - The store assigns `id`, `created_at` and `updated_at`.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Listing order is most-recently-created first.

use crate::db::{fold_case, DbError, FOLD_CASE_FUNCTION};
use crate::model::cpf::Cpf;
use crate::model::person::{FieldUpdate, Gender, NewPerson, Person, PersonChanges, PersonId};
use chrono::{NaiveDate, Utc};
use log::{debug, warn};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, ErrorCode, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const PERSON_COLUMNS: &str = "id,
    name,
    gender,
    email,
    birth_date,
    place_of_birth,
    nationality,
    identifier,
    created_at,
    updated_at";

const BIRTH_DATE_FORMAT: &str = "%Y-%m-%d";

/// Field name reported for identifier uniqueness violations.
pub const IDENTIFIER_FIELD: &str = "identifier";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for person persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    /// Storage transport or bootstrap failure.
    Db(DbError),
    /// Target row does not exist (or vanished before the write).
    NotFound(PersonId),
    /// Write rejected by a storage-level uniqueness constraint.
    DuplicateKey(&'static str),
    /// Persisted row fails domain decoding.
    InvalidData(String),
    /// Connection schema is not ready for person persistence.
    MissingRequiredTable(&'static str),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "person not found: {id}"),
            Self::DuplicateKey(field) => write!(f, "duplicate value for unique field `{field}`"),
            Self::InvalidData(message) => write!(f, "invalid persisted person data: {message}"),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Query options for listing persons.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonListQuery {
    /// Case-insensitive substring of the name or email; a term made only of
    /// digits and CPF punctuation also matches the stored identifier.
    pub search: Option<String>,
    /// Exact gender filter.
    pub gender: Option<Gender>,
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Aggregate counters over the whole registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersonStats {
    pub total: u64,
    pub male: u64,
    pub female: u64,
    pub other: u64,
    pub with_email: u64,
}

/// Record store contract consumed by `PersonService`.
pub trait PersonRepository {
    fn find_by_id(&self, id: PersonId) -> RepoResult<Option<Person>>;
    /// Finds the record holding `identifier`, ignoring `exclude_id` when set.
    fn find_by_identifier(
        &self,
        identifier: &Cpf,
        exclude_id: Option<PersonId>,
    ) -> RepoResult<Option<Person>>;
    /// Persists a new record and returns it with id and timestamps assigned.
    ///
    /// Fails with `DuplicateKey` when another row already holds the CPF.
    fn insert(&self, person: &NewPerson) -> RepoResult<Person>;
    /// Writes the supplied changes, bumps `updated_at`, returns the new state.
    ///
    /// Fails with `NotFound` when the row is gone and `DuplicateKey` on a
    /// CPF collision.
    fn save(&self, id: PersonId, changes: &PersonChanges) -> RepoResult<Person>;
    /// Deletes one record, returning it when it existed.
    fn delete(&self, id: PersonId) -> RepoResult<Option<Person>>;
    fn list(&self, query: &PersonListQuery) -> RepoResult<Vec<Person>>;
    fn stats(&self) -> RepoResult<PersonStats>;
}

/// SQLite-backed person repository.
pub struct SqlitePersonRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePersonRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    ///
    /// # Errors
    /// - `MissingRequiredTable` when the `persons` table is absent.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        if !table_exists(conn, "persons")? {
            return Err(RepoError::MissingRequiredTable("persons"));
        }
        Ok(Self { conn })
    }
}

impl PersonRepository for SqlitePersonRepository<'_> {
    fn find_by_id(&self, id: PersonId) -> RepoResult<Option<Person>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {PERSON_COLUMNS} FROM persons WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_person_row(row)?)),
            None => Ok(None),
        }
    }

    fn find_by_identifier(
        &self,
        identifier: &Cpf,
        exclude_id: Option<PersonId>,
    ) -> RepoResult<Option<Person>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PERSON_COLUMNS} FROM persons
             WHERE identifier = ?1
               AND (?2 IS NULL OR id <> ?2)
             LIMIT 1;"
        ))?;
        let mut rows = stmt.query(params![
            identifier.as_str(),
            exclude_id.map(|id| id.to_string()),
        ])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_person_row(row)?)),
            None => Ok(None),
        }
    }

    fn insert(&self, person: &NewPerson) -> RepoResult<Person> {
        let id = Uuid::new_v4();
        let now = now_epoch_ms();

        self.conn
            .execute(
                "INSERT INTO persons (
                    id,
                    name,
                    gender,
                    email,
                    birth_date,
                    place_of_birth,
                    nationality,
                    identifier,
                    created_at,
                    updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9);",
                params![
                    id.to_string(),
                    person.name.as_str(),
                    person.gender.map(Gender::as_str),
                    person.email.as_deref(),
                    format_birth_date(person.birth_date),
                    person.place_of_birth.as_deref(),
                    person.nationality.as_deref(),
                    person.identifier.as_str(),
                    now,
                ],
            )
            .map_err(|err| write_error("person_insert", err))?;

        debug!("event=person_insert module=repo status=ok");
        Ok(Person {
            id,
            name: person.name.clone(),
            gender: person.gender,
            email: person.email.clone(),
            birth_date: person.birth_date,
            place_of_birth: person.place_of_birth.clone(),
            nationality: person.nationality.clone(),
            identifier: person.identifier.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    fn save(&self, id: PersonId, changes: &PersonChanges) -> RepoResult<Person> {
        let mut assignments: Vec<&'static str> = Vec::new();
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(name) = &changes.name {
            assignments.push("name = ?");
            bind_values.push(Value::Text(name.clone()));
        }
        push_field_update(
            &mut assignments,
            &mut bind_values,
            "gender = ?",
            &changes.gender,
            |gender| gender.as_str().to_string(),
        );
        push_field_update(
            &mut assignments,
            &mut bind_values,
            "email = ?",
            &changes.email,
            Clone::clone,
        );
        if let Some(birth_date) = changes.birth_date {
            assignments.push("birth_date = ?");
            bind_values.push(Value::Text(format_birth_date(birth_date)));
        }
        push_field_update(
            &mut assignments,
            &mut bind_values,
            "place_of_birth = ?",
            &changes.place_of_birth,
            Clone::clone,
        );
        push_field_update(
            &mut assignments,
            &mut bind_values,
            "nationality = ?",
            &changes.nationality,
            Clone::clone,
        );
        if let Some(identifier) = &changes.identifier {
            assignments.push("identifier = ?");
            bind_values.push(Value::Text(identifier.as_str().to_string()));
        }

        assignments.push("updated_at = MAX(updated_at, ?)");
        bind_values.push(Value::Integer(now_epoch_ms()));
        bind_values.push(Value::Text(id.to_string()));

        let sql = format!(
            "UPDATE persons SET {} WHERE id = ? RETURNING {PERSON_COLUMNS};",
            assignments.join(", ")
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt
            .query(params_from_iter(bind_values))
            .map_err(|err| write_error("person_save", err))?;
        // RETURNING rows are produced while stepping, so constraint failures
        // surface here rather than from `query`.
        let row = rows.next().map_err(|err| write_error("person_save", err))?;
        match row {
            Some(row) => {
                let person = parse_person_row(row)?;
                debug!(
                    "event=person_save module=repo status=ok columns={}",
                    assignments.len()
                );
                Ok(person)
            }
            None => Err(RepoError::NotFound(id)),
        }
    }

    fn delete(&self, id: PersonId) -> RepoResult<Option<Person>> {
        let mut stmt = self.conn.prepare(&format!(
            "DELETE FROM persons WHERE id = ?1 RETURNING {PERSON_COLUMNS};"
        ))?;
        let mut rows = stmt.query([id.to_string()])?;
        let deleted = match rows.next()? {
            Some(row) => Some(parse_person_row(row)?),
            None => None,
        };
        debug!(
            "event=person_delete module=repo status=ok found={}",
            deleted.is_some()
        );
        Ok(deleted)
    }

    fn list(&self, query: &PersonListQuery) -> RepoResult<Vec<Person>> {
        let mut sql = format!("SELECT {PERSON_COLUMNS} FROM persons WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(term) = query.search.as_deref().map(str::trim) {
            if !term.is_empty() {
                // Both sides are folded, so LIKE's ASCII-only folding never matters.
                let pattern = like_pattern(&fold_case(term));
                sql.push_str(&format!(
                    " AND ({FOLD_CASE_FUNCTION}(name) LIKE ? ESCAPE '\\' \
                     OR {FOLD_CASE_FUNCTION}(email) LIKE ? ESCAPE '\\'"
                ));
                bind_values.push(Value::Text(pattern.clone()));
                bind_values.push(Value::Text(pattern));
                if let Some(digits) = identifier_fragment(term) {
                    sql.push_str(" OR identifier LIKE ? ESCAPE '\\'");
                    bind_values.push(Value::Text(like_pattern(&digits)));
                }
                sql.push(')');
            }
        }

        if let Some(gender) = query.gender {
            sql.push_str(" AND gender = ?");
            bind_values.push(Value::Text(gender.as_str().to_string()));
        }

        sql.push_str(" ORDER BY created_at DESC, rowid DESC");

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
            if query.offset > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(Value::Integer(i64::from(query.offset)));
            }
        } else if query.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut persons = Vec::new();
        while let Some(row) = rows.next()? {
            persons.push(parse_person_row(row)?);
        }

        Ok(persons)
    }

    fn stats(&self) -> RepoResult<PersonStats> {
        let stats = self.conn.query_row(
            "SELECT
                COUNT(*),
                COALESCE(SUM(gender = 'male'), 0),
                COALESCE(SUM(gender = 'female'), 0),
                COALESCE(SUM(gender = 'other'), 0),
                COALESCE(SUM(email IS NOT NULL), 0)
             FROM persons;",
            [],
            |row| {
                Ok(PersonStats {
                    total: count_column(row, 0)?,
                    male: count_column(row, 1)?,
                    female: count_column(row, 2)?,
                    other: count_column(row, 3)?,
                    with_email: count_column(row, 4)?,
                })
            },
        )?;
        Ok(stats)
    }
}

fn push_field_update<T>(
    assignments: &mut Vec<&'static str>,
    bind_values: &mut Vec<Value>,
    assignment: &'static str,
    update: &FieldUpdate<T>,
    to_text: impl Fn(&T) -> String,
) {
    if let Some(value) = update.as_write() {
        assignments.push(assignment);
        bind_values.push(match value {
            Some(value) => Value::Text(to_text(value)),
            None => Value::Null,
        });
    }
}

/// Maps write failures, turning unique-constraint rejections into
/// `DuplicateKey`. `identifier` is the only UNIQUE column besides the
/// primary key, which reports a different extended code.
fn write_error(event: &'static str, err: rusqlite::Error) -> RepoError {
    if let rusqlite::Error::SqliteFailure(failure, _) = &err {
        if failure.code == ErrorCode::ConstraintViolation
            && failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        {
            warn!("event={event} module=repo status=conflict error_code=duplicate_identifier");
            return RepoError::DuplicateKey(IDENTIFIER_FIELD);
        }
    }
    RepoError::from(err)
}

fn parse_person_row(row: &Row<'_>) -> RepoResult<Person> {
    let id_text: String = row.get("id")?;
    let id = Uuid::parse_str(&id_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{id_text}` in persons.id"))
    })?;

    let gender = match row.get::<_, Option<String>>("gender")? {
        Some(value) => Some(Gender::parse(&value).ok_or_else(|| {
            RepoError::InvalidData(format!("invalid gender `{value}` in persons.gender"))
        })?),
        None => None,
    };

    let birth_text: String = row.get("birth_date")?;
    let birth_date = NaiveDate::parse_from_str(&birth_text, BIRTH_DATE_FORMAT).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid date `{birth_text}` in persons.birth_date"
        ))
    })?;

    // Only the failure kind is reported; the stored CPF stays out of messages.
    let identifier_text: String = row.get("identifier")?;
    let identifier = Cpf::parse(&identifier_text).map_err(|err| {
        RepoError::InvalidData(format!("invalid cpf in persons.identifier: {err}"))
    })?;

    Ok(Person {
        id,
        name: row.get("name")?,
        gender,
        email: row.get("email")?,
        birth_date,
        place_of_birth: row.get("place_of_birth")?,
        nationality: row.get("nationality")?,
        identifier,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn count_column(row: &Row<'_>, index: usize) -> rusqlite::Result<u64> {
    let value: i64 = row.get(index)?;
    Ok(u64::try_from(value).unwrap_or_default())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn format_birth_date(date: NaiveDate) -> String {
    date.format(BIRTH_DATE_FORMAT).to_string()
}

/// Digits of `term` when it reads like a (partial) CPF: only digits, `.`,
/// `-` and spaces, with at least one digit.
fn identifier_fragment(term: &str) -> Option<String> {
    if !term
        .chars()
        .all(|ch| ch.is_ascii_digit() || matches!(ch, '.' | '-' | ' '))
    {
        return None;
    }
    let digits: String = term.chars().filter(char::is_ascii_digit).collect();
    (!digits.is_empty()).then_some(digits)
}

fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

fn now_epoch_ms() -> i64 {
    Utc::now().timestamp_millis()
}
