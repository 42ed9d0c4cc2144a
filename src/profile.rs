//! Learner profile, entered as flat `key=value` form pairs.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::validation::{FieldSchema, Schema, ValidationErrors};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    pub weekly_hours: Option<u32>,
    pub learning_style: Option<String>,
    #[serde(default)]
    pub reminders: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnerProfile {
    pub name: String,
    pub email: String,
    pub id: Option<String>,
    pub website: Option<String>,
    #[serde(default)]
    pub goals: Vec<String>,
    #[serde(default)]
    pub preferences: Preferences,
}

pub fn profile_schema() -> Schema {
    Schema::new()
        .field("name", FieldSchema::string().required().min_length(2).max_length(80))
        .field("email", FieldSchema::email().required())
        .field("id", FieldSchema::uuid())
        .field("website", FieldSchema::url())
        .field("goals", FieldSchema::array(FieldSchema::string().max_length(200)))
        .field(
            "preferences",
            FieldSchema::object(
                Schema::new()
                    .field("weekly_hours", FieldSchema::integer().range(1.0, 80.0))
                    .field("learning_style", FieldSchema::string().max_length(40))
                    .field("reminders", FieldSchema::boolean()),
            ),
        )
}

/// Parses `key=value` arguments such as `preferences.weekly_hours=5` or
/// `goals[0]=Learn Rust` into a validated profile.
pub fn parse_profile<'a, I>(args: I) -> Result<LearnerProfile>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut pairs = Vec::new();
    let mut errors = ValidationErrors::default();
    for arg in args {
        match arg.split_once('=') {
            Some((key, value)) => pairs.push((key.trim(), value.to_string())),
            None => errors.push(arg, format!("{} must be written as key=value", arg)),
        }
    }
    errors.into_result()?;

    Ok(profile_schema().parse_form(pairs)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TutorError;

    fn errors_of(result: Result<LearnerProfile>) -> ValidationErrors {
        match result {
            Err(TutorError::Validation(errors)) => errors,
            other => panic!("expected validation errors, got {:?}", other),
        }
    }

    #[test]
    fn parses_nested_form() {
        let profile = parse_profile([
            "name=Ada Lovelace",
            "email=ada@example.com",
            "goals[0]=Learn Rust",
            "goals[1]=Ship a CLI",
            "preferences.weekly_hours=6",
            "preferences.learning_style=hands-on",
            "preferences.reminders=yes",
        ])
        .unwrap();

        assert_eq!(profile.name, "Ada Lovelace");
        assert_eq!(profile.goals, vec!["Learn Rust", "Ship a CLI"]);
        assert_eq!(profile.preferences.weekly_hours, Some(6));
        assert!(profile.preferences.reminders);
        assert!(profile.website.is_none());
    }

    #[test]
    fn reports_every_invalid_field() {
        let errors = errors_of(parse_profile([
            "name=A",
            "email=not-an-email",
            "id=1234",
            "preferences.weekly_hours=200",
        ]));

        assert_eq!(errors.for_field("name").len(), 1);
        assert_eq!(errors.for_field("email"), vec!["email must be a valid email address"]);
        assert_eq!(errors.for_field("id"), vec!["id must be a valid UUID"]);
        assert_eq!(errors.for_field("preferences.weekly_hours").len(), 1);
    }

    #[test]
    fn missing_required_fields() {
        let errors = errors_of(parse_profile(["website=https://example.com"]));
        assert_eq!(errors.for_field("name"), vec!["name is required"]);
        assert_eq!(errors.for_field("email"), vec!["email is required"]);
    }

    #[test]
    fn rejects_args_without_equals() {
        let errors = errors_of(parse_profile(["name"]));
        assert_eq!(errors.len(), 1);
    }
}
