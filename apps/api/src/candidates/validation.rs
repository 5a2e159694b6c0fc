//! Field validation for the candidate intake payload.
//!
//! Pure: no storage access. Every violation across the whole payload is
//! collected and reported together, keyed by field path
//! (`firstName`, `education[0].endDate`, ...), so a client can render all
//! problems at once. Success yields a normalized, typed payload — trimmed
//! strings, lowercased email, parsed dates — so no later step re-parses
//! raw input.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\p{L}]+(?:[ '\-][\p{L}]+)*$").unwrap());
static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}$").unwrap());
static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\+?[0-9(). \-]+$").unwrap());

const NAME_MIN: usize = 2;
const NAME_MAX: usize = 50;
const ADDRESS_MAX: usize = 200;
const PHONE_MIN_DIGITS: usize = 7;
const PHONE_MAX_DIGITS: usize = 15;

// ────────────────────────────────────────────────────────────────────────────
// Raw payload (as deserialized from the multipart `data` part)
// ────────────────────────────────────────────────────────────────────────────

/// Candidate payload as submitted. All fields are optional at the serde level
/// so that a missing required field surfaces as a field error, not a parse
/// failure of the whole body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidatePayload {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub linked_in: Option<String>,
    pub portfolio: Option<String>,
    #[serde(default)]
    pub educations: Vec<EducationPayload>,
    #[serde(default)]
    pub experiences: Vec<ExperiencePayload>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EducationPayload {
    pub institution: Option<String>,
    pub degree: Option<String>,
    pub field_of_study: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    #[serde(default)]
    pub current: bool,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperiencePayload {
    pub company: Option<String>,
    pub position: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    #[serde(default)]
    pub current: bool,
    pub description: Option<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Validated form
// ────────────────────────────────────────────────────────────────────────────

/// Normalized candidate ready for persistence. `email` is lowercased and is
/// the identity key.
#[derive(Debug, Clone)]
pub struct ValidCandidate {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub address: Option<String>,
    pub linked_in: Option<String>,
    pub portfolio: Option<String>,
    pub educations: Vec<ValidEducation>,
    pub experiences: Vec<ValidExperience>,
}

#[derive(Debug, Clone)]
pub struct ValidEducation {
    pub institution: String,
    pub degree: String,
    pub field_of_study: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub current: bool,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ValidExperience {
    pub company: String,
    pub position: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub current: bool,
    pub description: Option<String>,
}

/// Field-path-keyed violation map. One message per path; violations on
/// different paths accumulate.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    fn put(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.0.entry(path.into()).or_insert_with(|| message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.0.get(path).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Validation
// ────────────────────────────────────────────────────────────────────────────

/// Validates one candidate payload against all field rules.
///
/// Returns the normalized payload, or the complete set of violations.
/// Never fail-fast: every field is checked regardless of earlier errors.
pub fn validate_candidate(payload: &CandidatePayload) -> Result<ValidCandidate, FieldErrors> {
    let mut errors = FieldErrors::default();

    let first_name = check_name("firstName", payload.first_name.as_deref(), &mut errors);
    let last_name = check_name("lastName", payload.last_name.as_deref(), &mut errors);
    let email = check_email(payload.email.as_deref(), &mut errors);
    let phone = check_phone(payload.phone.as_deref(), &mut errors);

    let address = match payload.address.as_deref().map(str::trim) {
        Some(a) if !a.is_empty() => {
            if a.chars().count() > ADDRESS_MAX {
                errors.put(
                    "address",
                    format!("address must be at most {ADDRESS_MAX} characters"),
                );
                None
            } else {
                Some(a.to_string())
            }
        }
        _ => None,
    };

    let linked_in = check_url("linkedIn", payload.linked_in.as_deref(), &mut errors);
    let portfolio = check_url("portfolio", payload.portfolio.as_deref(), &mut errors);

    let mut educations = Vec::with_capacity(payload.educations.len());
    for (i, entry) in payload.educations.iter().enumerate() {
        if let Some(valid) = check_education(i, entry, &mut errors) {
            educations.push(valid);
        }
    }

    let mut experiences = Vec::with_capacity(payload.experiences.len());
    for (i, entry) in payload.experiences.iter().enumerate() {
        if let Some(valid) = check_experience(i, entry, &mut errors) {
            experiences.push(valid);
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(ValidCandidate {
        // Unwraps are safe: a None would have produced a field error above.
        first_name: first_name.unwrap(),
        last_name: last_name.unwrap(),
        email: email.unwrap(),
        phone: phone.unwrap(),
        address,
        linked_in,
        portfolio,
        educations,
        experiences,
    })
}

fn check_name(path: &str, value: Option<&str>, errors: &mut FieldErrors) -> Option<String> {
    let trimmed = value.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        errors.put(path, format!("{path} is required"));
        return None;
    }
    let len = trimmed.chars().count();
    if !(NAME_MIN..=NAME_MAX).contains(&len) {
        errors.put(
            path,
            format!("{path} must be between {NAME_MIN} and {NAME_MAX} characters"),
        );
        return None;
    }
    if !NAME_RE.is_match(trimmed) {
        errors.put(
            path,
            format!("{path} may only contain letters, spaces, hyphens and apostrophes"),
        );
        return None;
    }
    Some(trimmed.to_string())
}

fn check_email(value: Option<&str>, errors: &mut FieldErrors) -> Option<String> {
    let trimmed = value.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        errors.put("email", "email is required");
        return None;
    }
    if !EMAIL_RE.is_match(trimmed) {
        errors.put("email", "email must be a valid email address");
        return None;
    }
    // Lowercased form is the identity key everywhere downstream.
    Some(trimmed.to_lowercase())
}

fn check_phone(value: Option<&str>, errors: &mut FieldErrors) -> Option<String> {
    let trimmed = value.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        errors.put("phone", "phone is required");
        return None;
    }
    let digits = trimmed.chars().filter(char::is_ascii_digit).count();
    if !PHONE_RE.is_match(trimmed) || !(PHONE_MIN_DIGITS..=PHONE_MAX_DIGITS).contains(&digits) {
        errors.put("phone", "phone must be a valid phone number");
        return None;
    }
    Some(trimmed.to_string())
}

fn check_url(path: &str, value: Option<&str>, errors: &mut FieldErrors) -> Option<String> {
    let trimmed = value.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        return None; // optional
    }
    match Url::parse(trimmed) {
        Ok(_) => Some(trimmed.to_string()),
        Err(_) => {
            errors.put(path, format!("{path} must be a valid URL"));
            None
        }
    }
}

fn check_education(
    index: usize,
    entry: &EducationPayload,
    errors: &mut FieldErrors,
) -> Option<ValidEducation> {
    let prefix = format!("education[{index}]");
    let institution = require_text(&prefix, "institution", entry.institution.as_deref(), errors);
    let degree = require_text(&prefix, "degree", entry.degree.as_deref(), errors);
    let field_of_study = require_text(
        &prefix,
        "fieldOfStudy",
        entry.field_of_study.as_deref(),
        errors,
    );
    let dates = check_period(
        &prefix,
        entry.start_date.as_deref(),
        entry.end_date.as_deref(),
        entry.current,
        errors,
    );

    let (start_date, end_date) = dates?;
    Some(ValidEducation {
        institution: institution?,
        degree: degree?,
        field_of_study: field_of_study?,
        start_date,
        end_date,
        current: entry.current,
        description: optional_text(entry.description.as_deref()),
    })
}

fn check_experience(
    index: usize,
    entry: &ExperiencePayload,
    errors: &mut FieldErrors,
) -> Option<ValidExperience> {
    let prefix = format!("experience[{index}]");
    let company = require_text(&prefix, "company", entry.company.as_deref(), errors);
    let position = require_text(&prefix, "position", entry.position.as_deref(), errors);
    let dates = check_period(
        &prefix,
        entry.start_date.as_deref(),
        entry.end_date.as_deref(),
        entry.current,
        errors,
    );

    let (start_date, end_date) = dates?;
    Some(ValidExperience {
        company: company?,
        position: position?,
        start_date,
        end_date,
        current: entry.current,
        description: optional_text(entry.description.as_deref()),
    })
}

/// Start/end/current cross-field rules, shared by both entry types.
///
/// Policy for `current = true`: a supplied `endDate` is silently ignored and
/// the entry is persisted without one.
fn check_period(
    prefix: &str,
    start_date: Option<&str>,
    end_date: Option<&str>,
    current: bool,
    errors: &mut FieldErrors,
) -> Option<(NaiveDate, Option<NaiveDate>)> {
    let start = parse_date(&format!("{prefix}.startDate"), start_date, errors);

    if current {
        return start.map(|s| (s, None));
    }

    let end_path = format!("{prefix}.endDate");
    let end = parse_date(&end_path, end_date, errors);

    match (start, end) {
        (Some(s), Some(e)) => {
            if e < s {
                errors.put(end_path, "endDate must not be before startDate");
                None
            } else {
                Some((s, Some(e)))
            }
        }
        _ => None,
    }
}

fn parse_date(path: &str, value: Option<&str>, errors: &mut FieldErrors) -> Option<NaiveDate> {
    let field = path.rsplit('.').next().unwrap_or(path);
    let trimmed = value.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        errors.put(path, format!("{field} is required"));
        return None;
    }
    match NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(_) => {
            errors.put(path, format!("{field} must be a valid date (YYYY-MM-DD)"));
            None
        }
    }
}

fn require_text(
    prefix: &str,
    field: &str,
    value: Option<&str>,
    errors: &mut FieldErrors,
) -> Option<String> {
    let trimmed = value.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        errors.put(format!("{prefix}.{field}"), format!("{field} is required"));
        return None;
    }
    Some(trimmed.to_string())
}

fn optional_text(value: Option<&str>) -> Option<String> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Some(v.to_string()),
        _ => None,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
