//! Person registry use-case service.
//!
//! # Responsibility
//! - Orchestrate create/update/remove against a `PersonRepository`.
//! - Enforce CPF uniqueness before writes and normalize store-level
//!   uniqueness rejections to the same `Conflict` error.
//! - Report failures as typed, field-scoped errors.
//!
//! # Invariants
//! - `update` and `remove` check that the target exists before any other
//!   validation runs.
//! - The record being updated never collides with itself.
//! - Storage failures pass through unchanged as `Repo` and are never retried.
//! - This layer does not log; every failure is returned to the caller.

use crate::model::person::{Person, PersonId};
use crate::repo::person_repo::{PersonListQuery, PersonRepository, PersonStats, RepoError};
use crate::service::person_input::{
    normalize_create, normalize_update, CreatePersonInput, UpdatePersonInput,
};
use chrono::{NaiveDate, Utc};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Record field named by validation and conflict errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PersonField {
    Name,
    Gender,
    Email,
    BirthDate,
    PlaceOfBirth,
    Nationality,
    Identifier,
}

impl PersonField {
    /// Wire name of the field.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Gender => "gender",
            Self::Email => "email",
            Self::BirthDate => "birthDate",
            Self::PlaceOfBirth => "placeOfBirth",
            Self::Nationality => "nationality",
            Self::Identifier => "identifier",
        }
    }
}

impl Display for PersonField {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse failure class for transport collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    BadRequest,
    Conflict,
    NotFound,
    Internal,
}

impl ErrorClass {
    /// Conventional HTTP status code for this class.
    pub fn http_status(self) -> u16 {
        match self {
            Self::BadRequest => 400,
            Self::Conflict => 409,
            Self::NotFound => 404,
            Self::Internal => 500,
        }
    }
}

/// Service error for person use-cases.
#[derive(Debug)]
pub enum PersonServiceError {
    /// Input breaks a structural or semantic rule.
    Validation { field: PersonField, reason: String },
    /// Another record already holds the unique value.
    Conflict { field: PersonField },
    /// Target record does not exist.
    NotFound(PersonId),
    /// Storage failure, passed through uninterpreted.
    Repo(RepoError),
}

impl PersonServiceError {
    pub(crate) fn validation(field: PersonField, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    /// Field the error is scoped to, when there is one.
    pub fn field(&self) -> Option<PersonField> {
        match self {
            Self::Validation { field, .. } | Self::Conflict { field } => Some(*field),
            Self::NotFound(_) | Self::Repo(_) => None,
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Validation { .. } => ErrorClass::BadRequest,
            Self::Conflict { .. } => ErrorClass::Conflict,
            Self::NotFound(_) => ErrorClass::NotFound,
            Self::Repo(_) => ErrorClass::Internal,
        }
    }
}

impl Display for PersonServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation { field, reason } => write!(f, "invalid {field}: {reason}"),
            Self::Conflict { field } => write!(f, "person with this {field} already exists"),
            Self::NotFound(id) => write!(f, "person not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for PersonServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for PersonServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            // `identifier` is the only unique column.
            RepoError::DuplicateKey(_) => Self::Conflict {
                field: PersonField::Identifier,
            },
            RepoError::NotFound(id) => Self::NotFound(id),
            other => Self::Repo(other),
        }
    }
}

/// Current UTC calendar date.
pub fn system_today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Person service facade over repository implementations.
pub struct PersonService<R: PersonRepository> {
    repo: R,
    today: fn() -> NaiveDate,
}

impl<R: PersonRepository> PersonService<R> {
    /// Creates a service that judges birth dates against the system clock.
    pub fn new(repo: R) -> Self {
        Self::with_clock(repo, system_today)
    }

    /// Creates a service with an injected "today" source.
    pub fn with_clock(repo: R, today: fn() -> NaiveDate) -> Self {
        Self { repo, today }
    }

    /// Validates, normalizes and persists a new person.
    ///
    /// # Errors
    /// - `Validation` for the first failing field.
    /// - `Conflict(identifier)` when the CPF is taken, whether detected here
    ///   or rejected by the store at insert time.
    pub fn create(&self, input: &CreatePersonInput) -> Result<Person, PersonServiceError> {
        let person = normalize_create(input, (self.today)())?;

        if self
            .repo
            .find_by_identifier(&person.identifier, None)?
            .is_some()
        {
            return Err(PersonServiceError::Conflict {
                field: PersonField::Identifier,
            });
        }

        Ok(self.repo.insert(&person)?)
    }

    /// Applies a partial update to an existing person.
    ///
    /// Absent keys keep stored values; empty optional values clear them.
    ///
    /// # Errors
    /// - `NotFound` when `id` does not exist, before any validation.
    /// - `Validation` for malformed input.
    /// - `Conflict(identifier)` when another record holds the new CPF.
    pub fn update(
        &self,
        id: PersonId,
        input: &UpdatePersonInput,
    ) -> Result<Person, PersonServiceError> {
        if self.repo.find_by_id(id)?.is_none() {
            return Err(PersonServiceError::NotFound(id));
        }

        let changes = normalize_update(input, (self.today)())?;

        if let Some(identifier) = &changes.identifier {
            if self
                .repo
                .find_by_identifier(identifier, Some(id))?
                .is_some()
            {
                return Err(PersonServiceError::Conflict {
                    field: PersonField::Identifier,
                });
            }
        }

        Ok(self.repo.save(id, &changes)?)
    }

    /// Deletes one person and returns the removed record.
    pub fn remove(&self, id: PersonId) -> Result<Person, PersonServiceError> {
        if self.repo.find_by_id(id)?.is_none() {
            return Err(PersonServiceError::NotFound(id));
        }

        // A concurrent remove may win between the check and the delete.
        self.repo
            .delete(id)?
            .ok_or(PersonServiceError::NotFound(id))
    }

    /// Gets one person by id.
    pub fn get(&self, id: PersonId) -> Result<Person, PersonServiceError> {
        self.repo
            .find_by_id(id)?
            .ok_or(PersonServiceError::NotFound(id))
    }

    /// Lists persons, most recently created first.
    pub fn list(&self, query: &PersonListQuery) -> Result<Vec<Person>, PersonServiceError> {
        Ok(self.repo.list(query)?)
    }

    /// Returns registry-wide counters.
    pub fn stats(&self) -> Result<PersonStats, PersonServiceError> {
        Ok(self.repo.stats()?)
    }
}
