//! Person registry domain model.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Own the CPF identifier format and its checksum validation.
//!
//! # Invariants
//! - Every record is identified by a stable store-assigned `PersonId`.
//! - A record's CPF is unique across the whole registry.

pub mod cpf;
pub mod person;
