//! Core use-case services.
//!
//! # Responsibility
//! - Normalize create/update payloads into store write models.
//! - Orchestrate repository calls into the registry's use-case APIs.
//! - Keep transport layers decoupled from storage details.

pub mod person_input;
pub mod person_service;
