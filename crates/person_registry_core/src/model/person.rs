//! Person record domain model.
//!
//! # Responsibility
//! - Define the persisted `Person` shape and its store-facing write models.
//! - Model partial updates with an explicit tri-state per optional field.
//!
//! # Invariants
//! - `identifier` is always a checksum-valid 11-digit CPF.
//! - Optional text fields are `None` or non-empty trimmed text, never `""`.
//! - `created_at`/`updated_at` are assigned by the store, never by callers.

use crate::model::cpf::Cpf;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable store-assigned identifier of a person record.
pub type PersonId = Uuid;

/// Fixed set of accepted gender values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    /// Parses a gender value, ignoring case and surrounding whitespace.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "male" => Some(Self::Male),
            "female" => Some(Self::Female),
            "other" => Some(Self::Other),
            _ => None,
        }
    }

    /// Lowercase storage/wire form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
            Self::Other => "other",
        }
    }
}

/// Persisted person record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: PersonId,
    pub name: String,
    pub gender: Option<Gender>,
    pub email: Option<String>,
    /// Calendar date, serialized as `YYYY-MM-DD`.
    pub birth_date: NaiveDate,
    pub place_of_birth: Option<String>,
    pub nationality: Option<String>,
    pub identifier: Cpf,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Unix epoch milliseconds. Bumped on every successful save.
    pub updated_at: i64,
}

/// Fully normalized field set for a record that does not exist yet.
///
/// Produced by the create normalizer; the store adds id and timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPerson {
    pub name: String,
    pub gender: Option<Gender>,
    pub email: Option<String>,
    pub birth_date: NaiveDate,
    pub place_of_birth: Option<String>,
    pub nationality: Option<String>,
    pub identifier: Cpf,
}

/// Tri-state change for an optional field.
///
/// `Unchanged` and `Cleared` are deliberately distinct: the first means the
/// caller said nothing about the field, the second removes a stored value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FieldUpdate<T> {
    #[default]
    Unchanged,
    Cleared,
    Set(T),
}

impl<T> FieldUpdate<T> {
    /// Returns whether this update touches the stored value.
    pub fn is_unchanged(&self) -> bool {
        matches!(self, Self::Unchanged)
    }

    /// Value to write, or `None` for `Unchanged`.
    ///
    /// `Some(None)` means the column is written as NULL.
    pub fn as_write(&self) -> Option<Option<&T>> {
        match self {
            Self::Unchanged => None,
            Self::Cleared => Some(None),
            Self::Set(value) => Some(Some(value)),
        }
    }

    /// Converts the `Set` payload, passing `Unchanged`/`Cleared` through.
    pub fn try_map<U, E>(self, f: impl FnOnce(T) -> Result<U, E>) -> Result<FieldUpdate<U>, E> {
        Ok(match self {
            Self::Unchanged => FieldUpdate::Unchanged,
            Self::Cleared => FieldUpdate::Cleared,
            Self::Set(value) => FieldUpdate::Set(f(value)?),
        })
    }

    /// Resolves the update against the currently stored value.
    pub fn apply(self, current: Option<T>) -> Option<T> {
        match self {
            Self::Unchanged => current,
            Self::Cleared => None,
            Self::Set(value) => Some(value),
        }
    }
}

/// Normalized change set for a partial update.
///
/// Required fields use `Option` (absent = keep) because they have no clear
/// path; optional fields use `FieldUpdate`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PersonChanges {
    pub name: Option<String>,
    pub gender: FieldUpdate<Gender>,
    pub email: FieldUpdate<String>,
    pub birth_date: Option<NaiveDate>,
    pub place_of_birth: FieldUpdate<String>,
    pub nationality: FieldUpdate<String>,
    pub identifier: Option<Cpf>,
}

impl PersonChanges {
    /// Returns whether no stored column would change.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.gender.is_unchanged()
            && self.email.is_unchanged()
            && self.birth_date.is_none()
            && self.place_of_birth.is_unchanged()
            && self.nationality.is_unchanged()
            && self.identifier.is_none()
    }
}
