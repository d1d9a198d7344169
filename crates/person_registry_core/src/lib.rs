//! Core domain logic for the person registry.
//! This crate is the single source of truth for record invariants: CPF
//! validity and uniqueness, optional-field normalization, and birth dates.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::RegistryConfig;
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::cpf::{is_valid_cpf, validate_cpf, Cpf, CpfError};
pub use model::person::{FieldUpdate, Gender, NewPerson, Person, PersonChanges, PersonId};
pub use repo::person_repo::{
    PersonListQuery, PersonRepository, PersonStats, RepoError, RepoResult, SqlitePersonRepository,
};
pub use service::person_input::{
    normalize_create, normalize_update, CreatePersonInput, UpdatePersonInput,
};
pub use service::person_service::{ErrorClass, PersonField, PersonService, PersonServiceError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
