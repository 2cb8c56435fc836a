use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

pub const FULL_NAME_MAX: usize = 200;
pub const EMAIL_MAX: usize = 200;
pub const PHONE_MAX: usize = 50;
pub const ADDRESS_MAX: usize = 500;

/// One row of the `students` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: i64,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub enrollment_year: Option<i32>,
    pub updated_at: Option<String>,
}

impl Student {
    /// Date of birth as `YYYY-MM-DD`, or empty.
    pub fn date_of_birth_text(&self) -> String {
        self.date_of_birth
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default()
    }

    pub fn enrollment_year_text(&self) -> String {
        self.enrollment_year
            .map(|y| y.to_string())
            .unwrap_or_default()
    }
}

/// Field values for a new record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentInput {
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub enrollment_year: Option<i32>,
}

/// Partial update. `None` leaves a column untouched; for the two nullable
/// typed columns `Some(None)` clears the value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudentPatch {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<Option<NaiveDate>>,
    pub enrollment_year: Option<Option<i32>>,
}

impl StudentPatch {
    /// Patch that overwrites every editable column, as a full form save does.
    pub fn replace_all(input: StudentInput) -> Self {
        Self {
            full_name: Some(input.full_name),
            email: Some(input.email),
            phone: Some(input.phone.unwrap_or_default()),
            address: Some(input.address.unwrap_or_default()),
            date_of_birth: Some(input.date_of_birth),
            enrollment_year: Some(input.enrollment_year),
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

pub fn normalize_full_name(raw: &str) -> String {
    raw.trim().to_string()
}

pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Trimmed optional text; blank becomes `None`.
pub fn normalize_optional(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

pub(crate) fn validate_full_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(StoreError::validation("full_name", "Full name is required."));
    }
    check_len("full_name", "Full name", name, FULL_NAME_MAX)
}

pub(crate) fn validate_email(email: &str) -> Result<()> {
    if email.is_empty() || !email.contains('@') {
        return Err(StoreError::validation("email", "A valid email is required."));
    }
    check_len("email", "Email", email, EMAIL_MAX)
}

pub(crate) fn validate_phone(phone: Option<&str>) -> Result<()> {
    match phone {
        Some(p) => check_len("phone", "Phone", p, PHONE_MAX),
        None => Ok(()),
    }
}

pub(crate) fn validate_address(address: Option<&str>) -> Result<()> {
    match address {
        Some(a) => check_len("address", "Address", a, ADDRESS_MAX),
        None => Ok(()),
    }
}

/// Normalize and validate `input` without touching the database.
pub(crate) fn check_input(input: &StudentInput) -> Result<String> {
    let email = normalize_email(&input.email);
    validate_full_name(&normalize_full_name(&input.full_name))?;
    validate_email(&email)?;
    validate_phone(normalize_optional(input.phone.as_deref()).as_deref())?;
    validate_address(normalize_optional(input.address.as_deref()).as_deref())?;
    Ok(email)
}

fn check_len(field: &'static str, label: &str, value: &str, max: usize) -> Result<()> {
    if value.chars().count() > max {
        return Err(StoreError::validation(
            field,
            format!("{label} must be at most {max} characters."),
        ));
    }
    Ok(())
}

/// Parse a user-entered date of birth. Blank is `None`.
pub fn parse_date_of_birth(text: &str) -> Result<Option<NaiveDate>> {
    let t = text.trim();
    if t.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(t, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| StoreError::validation("date_of_birth", "Date of birth must be YYYY-MM-DD."))
}

/// Parse a user-entered enrollment year. Blank is `None`; only plain digits
/// are accepted.
pub fn parse_enrollment_year(text: &str) -> Result<Option<i32>> {
    let t = text.trim();
    if t.is_empty() {
        return Ok(None);
    }
    if !t.chars().all(|c| c.is_ascii_digit()) {
        return Err(StoreError::validation(
            "enrollment_year",
            "Enrollment year must be an integer.",
        ));
    }
    t.parse::<i32>().map(Some).map_err(|_| {
        StoreError::validation("enrollment_year", "Enrollment year must be an integer.")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_is_trimmed_and_lowercased() {
        assert_eq!(normalize_email("  Ada@Example.COM "), "ada@example.com");
    }

    #[test]
    fn blank_optional_becomes_none() {
        assert_eq!(normalize_optional(Some("   ")), None);
        assert_eq!(normalize_optional(None), None);
        assert_eq!(normalize_optional(Some(" 555 ")), Some("555".to_string()));
    }

    #[test]
    fn email_requires_at_sign() {
        assert!(validate_email("nobody.example.com").is_err());
        assert!(validate_email("").is_err());
        assert!(validate_email("a@b").is_ok());
    }

    #[test]
    fn over_long_phone_rejected() {
        let long = "1".repeat(PHONE_MAX + 1);
        let err = validate_phone(Some(&long)).unwrap_err();
        assert!(err.to_string().contains("at most 50"));
    }

    #[test]
    fn date_of_birth_parsing() {
        assert_eq!(parse_date_of_birth("").unwrap(), None);
        assert_eq!(
            parse_date_of_birth(" 2001-02-03 ").unwrap(),
            NaiveDate::from_ymd_opt(2001, 2, 3)
        );
        let err = parse_date_of_birth("03/02/2001").unwrap_err();
        assert_eq!(err.to_string(), "Date of birth must be YYYY-MM-DD.");
        assert!(parse_date_of_birth("2001-02-30").is_err());
    }

    #[test]
    fn enrollment_year_parsing() {
        assert_eq!(parse_enrollment_year("").unwrap(), None);
        assert_eq!(parse_enrollment_year("2024").unwrap(), Some(2024));
        assert!(parse_enrollment_year("-2024").is_err());
        assert!(parse_enrollment_year("20x4").is_err());
        assert!(parse_enrollment_year("99999999999").is_err());
    }

    #[test]
    fn student_serializes_camel_case() {
        let s = Student {
            id: 7,
            full_name: "Ada".into(),
            email: "ada@x.org".into(),
            phone: None,
            address: None,
            date_of_birth: NaiveDate::from_ymd_opt(1990, 1, 5),
            enrollment_year: Some(2010),
            updated_at: None,
        };
        let v = serde_json::to_value(&s).unwrap();
        assert_eq!(v["fullName"], "Ada");
        assert_eq!(v["dateOfBirth"], "1990-01-05");
        assert_eq!(v["enrollmentYear"], 2010);
        assert_eq!(s.date_of_birth_text(), "1990-01-05");
    }

    #[test]
    fn replace_all_patch_clears_blank_fields() {
        let patch = StudentPatch::replace_all(StudentInput {
            full_name: "A".into(),
            email: "a@b".into(),
            ..Default::default()
        });
        assert_eq!(patch.phone.as_deref(), Some(""));
        assert_eq!(patch.date_of_birth, Some(None));
        assert!(!patch.is_empty());
        assert!(StudentPatch::default().is_empty());
    }
}
