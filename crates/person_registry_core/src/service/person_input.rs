//! Request models and normalization rules for person writes.
//!
//! # Responsibility
//! - Deserialize create/update payloads without losing "absent" vs "empty".
//! - Turn raw payloads into normalized `NewPerson`/`PersonChanges` values.
//!
//! # Invariants
//! - Create: an empty optional value is dropped (stored as absent).
//! - Update: a missing key leaves the field unchanged; an empty or `null`
//!   value clears it; anything else is trimmed, validated and set.
//! - Required fields (`name`, `birthDate`, `identifier`) have no clear path.
//! - Normalization is pure; the caller supplies the current date.

use crate::model::cpf::Cpf;
use crate::model::person::{FieldUpdate, Gender, NewPerson, PersonChanges};
use crate::service::person_service::{PersonField, PersonServiceError};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer};

const BIRTH_DATE_FORMAT: &str = "%Y-%m-%d";

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

/// Payload for creating one person.
///
/// Missing and `null` keys both deserialize to `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePersonInput {
    pub name: Option<String>,
    pub gender: Option<String>,
    pub email: Option<String>,
    /// `YYYY-MM-DD`.
    pub birth_date: Option<String>,
    pub place_of_birth: Option<String>,
    pub nationality: Option<String>,
    #[serde(alias = "cpf")]
    pub identifier: Option<String>,
}

/// Partial update payload.
///
/// `None` means the key was absent. A present `null` deserializes to
/// `Some("")`, which clears optional fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePersonInput {
    #[serde(default, deserialize_with = "present_value")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "present_value")]
    pub gender: Option<String>,
    #[serde(default, deserialize_with = "present_value")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "present_value")]
    pub birth_date: Option<String>,
    #[serde(default, deserialize_with = "present_value")]
    pub place_of_birth: Option<String>,
    #[serde(default, deserialize_with = "present_value")]
    pub nationality: Option<String>,
    #[serde(default, alias = "cpf", deserialize_with = "present_value")]
    pub identifier: Option<String>,
}

// Only invoked for keys that are present, so `null` becomes an empty value.
fn present_value<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Some(Option::<String>::deserialize(deserializer)?.unwrap_or_default()))
}

/// Validates and normalizes a create payload.
///
/// Checks run in order: name, birthDate, identifier, email, gender; the first
/// failure is returned.
pub fn normalize_create(
    input: &CreatePersonInput,
    today: NaiveDate,
) -> Result<NewPerson, PersonServiceError> {
    let name = non_blank(input.name.as_deref())
        .ok_or_else(|| PersonServiceError::validation(PersonField::Name, "is required"))?;

    let birth_date = match non_blank(input.birth_date.as_deref()) {
        Some(raw) => parse_birth_date(&raw, today)?,
        None => {
            return Err(PersonServiceError::validation(
                PersonField::BirthDate,
                "is required",
            ))
        }
    };

    let identifier = match non_blank(input.identifier.as_deref()) {
        Some(raw) => parse_identifier(&raw)?,
        None => {
            return Err(PersonServiceError::validation(
                PersonField::Identifier,
                "is required",
            ))
        }
    };

    let email = non_blank(input.email.as_deref())
        .map(check_email)
        .transpose()?;
    let gender = non_blank(input.gender.as_deref())
        .map(|raw| parse_gender(&raw))
        .transpose()?;

    Ok(NewPerson {
        name,
        gender,
        email,
        birth_date,
        place_of_birth: non_blank(input.place_of_birth.as_deref()),
        nationality: non_blank(input.nationality.as_deref()),
        identifier,
    })
}

/// Validates and normalizes a partial update payload.
///
/// Does not consult the store; CPF collisions are checked by the service.
pub fn normalize_update(
    input: &UpdatePersonInput,
    today: NaiveDate,
) -> Result<PersonChanges, PersonServiceError> {
    let name = match input.name.as_deref() {
        Some(raw) => Some(non_blank(Some(raw)).ok_or_else(|| {
            PersonServiceError::validation(PersonField::Name, "cannot be empty")
        })?),
        None => None,
    };

    let birth_date = match input.birth_date.as_deref() {
        Some(raw) => match non_blank(Some(raw)) {
            Some(value) => Some(parse_birth_date(&value, today)?),
            None => {
                return Err(PersonServiceError::validation(
                    PersonField::BirthDate,
                    "cannot be empty",
                ))
            }
        },
        None => None,
    };

    let identifier = input
        .identifier
        .as_deref()
        .map(parse_identifier)
        .transpose()?;

    Ok(PersonChanges {
        name,
        gender: field_update(input.gender.as_deref()).try_map(|raw| parse_gender(&raw))?,
        email: field_update(input.email.as_deref()).try_map(check_email)?,
        birth_date,
        place_of_birth: field_update(input.place_of_birth.as_deref()),
        nationality: field_update(input.nationality.as_deref()),
        identifier,
    })
}

/// Parses a `YYYY-MM-DD` birth date and rejects dates after `today`.
pub fn parse_birth_date(raw: &str, today: NaiveDate) -> Result<NaiveDate, PersonServiceError> {
    let date = NaiveDate::parse_from_str(raw.trim(), BIRTH_DATE_FORMAT).map_err(|_| {
        PersonServiceError::validation(
            PersonField::BirthDate,
            "must be a valid date in YYYY-MM-DD format",
        )
    })?;
    if date > today {
        return Err(PersonServiceError::validation(
            PersonField::BirthDate,
            "cannot be in the future",
        ));
    }
    Ok(date)
}

/// Returns whether `value` has the `local@domain.tld` shape.
pub fn is_valid_email(value: &str) -> bool {
    EMAIL_RE.is_match(value)
}

fn check_email(value: String) -> Result<String, PersonServiceError> {
    if is_valid_email(&value) {
        Ok(value)
    } else {
        Err(PersonServiceError::validation(
            PersonField::Email,
            "must be a valid email address",
        ))
    }
}

fn parse_gender(raw: &str) -> Result<Gender, PersonServiceError> {
    Gender::parse(raw).ok_or_else(|| {
        PersonServiceError::validation(PersonField::Gender, "must be one of male|female|other")
    })
}

fn parse_identifier(raw: &str) -> Result<Cpf, PersonServiceError> {
    Cpf::parse(raw).map_err(|err| {
        PersonServiceError::validation(PersonField::Identifier, format!("invalid cpf: {err}"))
    })
}

fn non_blank(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn field_update(raw: Option<&str>) -> FieldUpdate<String> {
    match raw {
        None => FieldUpdate::Unchanged,
        Some(value) => match non_blank(Some(value)) {
            Some(trimmed) => FieldUpdate::Set(trimmed),
            None => FieldUpdate::Cleared,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::{
        is_valid_email, normalize_create, normalize_update, parse_birth_date, CreatePersonInput,
        UpdatePersonInput,
    };
    use crate::model::person::{FieldUpdate, Gender};
    use crate::service::person_service::{PersonField, PersonServiceError};
    use chrono::NaiveDate;

    const VALID_CPF: &str = "12345678909";

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn minimal_create() -> CreatePersonInput {
        CreatePersonInput {
            name: Some("A".to_string()),
            birth_date: Some("1990-01-01".to_string()),
            identifier: Some(VALID_CPF.to_string()),
            ..CreatePersonInput::default()
        }
    }

    fn invalid_field(err: PersonServiceError) -> PersonField {
        match err {
            PersonServiceError::Validation { field, .. } => field,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn create_leaves_missing_optionals_absent() {
        let person = normalize_create(&minimal_create(), today()).unwrap();
        assert_eq!(person.name, "A");
        assert_eq!(person.email, None);
        assert_eq!(person.place_of_birth, None);
        assert_eq!(person.nationality, None);
        assert_eq!(person.gender, None);
    }

    #[test]
    fn create_drops_blank_optionals_and_trims_the_rest() {
        let input = CreatePersonInput {
            email: Some("   ".to_string()),
            place_of_birth: Some("  Recife, PE ".to_string()),
            nationality: Some("".to_string()),
            gender: Some(" Female".to_string()),
            ..minimal_create()
        };
        let person = normalize_create(&input, today()).unwrap();
        assert_eq!(person.email, None);
        assert_eq!(person.place_of_birth.as_deref(), Some("Recife, PE"));
        assert_eq!(person.nationality, None);
        assert_eq!(person.gender, Some(Gender::Female));
    }

    #[test]
    fn create_strips_identifier_punctuation() {
        let input = CreatePersonInput {
            identifier: Some("123.456.789-09".to_string()),
            ..minimal_create()
        };
        let person = normalize_create(&input, today()).unwrap();
        assert_eq!(person.identifier.as_str(), VALID_CPF);
    }

    #[test]
    fn create_reports_first_failing_field() {
        let missing_name = CreatePersonInput {
            name: Some("  ".to_string()),
            identifier: Some("bad".to_string()),
            ..minimal_create()
        };
        assert_eq!(
            invalid_field(normalize_create(&missing_name, today()).unwrap_err()),
            PersonField::Name
        );

        let missing_date = CreatePersonInput {
            birth_date: None,
            ..minimal_create()
        };
        assert_eq!(
            invalid_field(normalize_create(&missing_date, today()).unwrap_err()),
            PersonField::BirthDate
        );

        let bad_cpf = CreatePersonInput {
            identifier: Some("12345678900".to_string()),
            ..minimal_create()
        };
        assert_eq!(
            invalid_field(normalize_create(&bad_cpf, today()).unwrap_err()),
            PersonField::Identifier
        );

        let bad_email = CreatePersonInput {
            email: Some("not-an-email".to_string()),
            ..minimal_create()
        };
        assert_eq!(
            invalid_field(normalize_create(&bad_email, today()).unwrap_err()),
            PersonField::Email
        );

        let bad_gender = CreatePersonInput {
            gender: Some("robot".to_string()),
            ..minimal_create()
        };
        assert_eq!(
            invalid_field(normalize_create(&bad_gender, today()).unwrap_err()),
            PersonField::Gender
        );
    }

    #[test]
    fn birth_date_rejects_future_and_malformed_values() {
        assert_eq!(
            parse_birth_date("2024-06-15", today()).unwrap(),
            today()
        );
        assert!(parse_birth_date("2024-06-16", today()).is_err());
        assert!(parse_birth_date("2023-02-30", today()).is_err());
        assert!(parse_birth_date("15/06/1990", today()).is_err());
    }

    #[test]
    fn update_distinguishes_absent_empty_and_present() {
        let input = UpdatePersonInput {
            email: Some("".to_string()),
            nationality: Some("  Brasileira ".to_string()),
            ..UpdatePersonInput::default()
        };
        let changes = normalize_update(&input, today()).unwrap();
        assert_eq!(changes.email, FieldUpdate::Cleared);
        assert_eq!(
            changes.nationality,
            FieldUpdate::Set("Brasileira".to_string())
        );
        assert_eq!(changes.place_of_birth, FieldUpdate::Unchanged);
        assert_eq!(changes.gender, FieldUpdate::Unchanged);
        assert_eq!(changes.name, None);
        assert_eq!(changes.identifier, None);
    }

    #[test]
    fn update_rejects_empty_required_fields() {
        let empty_date = UpdatePersonInput {
            birth_date: Some(" ".to_string()),
            ..UpdatePersonInput::default()
        };
        match normalize_update(&empty_date, today()).unwrap_err() {
            PersonServiceError::Validation { field, reason } => {
                assert_eq!(field, PersonField::BirthDate);
                assert_eq!(reason, "cannot be empty");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let empty_name = UpdatePersonInput {
            name: Some("".to_string()),
            ..UpdatePersonInput::default()
        };
        assert_eq!(
            invalid_field(normalize_update(&empty_name, today()).unwrap_err()),
            PersonField::Name
        );

        let empty_cpf = UpdatePersonInput {
            identifier: Some("".to_string()),
            ..UpdatePersonInput::default()
        };
        assert_eq!(
            invalid_field(normalize_update(&empty_cpf, today()).unwrap_err()),
            PersonField::Identifier
        );
    }

    #[test]
    fn update_payload_null_clears_and_missing_key_keeps() {
        let input: UpdatePersonInput =
            serde_json::from_str(r#"{"email": null, "placeOfBirth": "", "cpf": "123.456.789-09"}"#)
                .unwrap();
        assert_eq!(input.email.as_deref(), Some(""));
        assert_eq!(input.place_of_birth.as_deref(), Some(""));
        assert_eq!(input.identifier.as_deref(), Some("123.456.789-09"));
        assert_eq!(input.nationality, None);

        let changes = normalize_update(&input, today()).unwrap();
        assert_eq!(changes.email, FieldUpdate::Cleared);
        assert_eq!(changes.place_of_birth, FieldUpdate::Cleared);
        assert_eq!(changes.nationality, FieldUpdate::Unchanged);
    }

    #[test]
    fn email_shape_requires_local_domain_and_tld() {
        assert!(is_valid_email("x@y.com"));
        assert!(is_valid_email("joao.silva@email.com.br"));
        assert!(!is_valid_email("x@y"));
        assert!(!is_valid_email("x y@z.com"));
        assert!(!is_valid_email("@y.com"));
    }
}
