//! Step gating and advisory field checks.
//!
//! [`can_advance`] is the only gate on forward navigation and only asks
//! whether the required fields of a step are filled in. The format checks
//! further down produce hints for the form and never block a step.

use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;

use super::documents::DocumentSlot;
use super::models::{ApplicantType, RegistrationState, Step};

static SQL_KEYWORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(SELECT|INSERT|UPDATE|DELETE|DROP|CREATE|ALTER|EXEC|EXECUTE)\b")
        .expect("static pattern")
});
static SCRIPT_MARKUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<script|<iframe|javascript:|onerror=").expect("static pattern"));
static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static pattern"));
static NIGERIAN_PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:\+234|0)8\d{9}$").expect("static pattern"));

fn blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Labels of the required fields still missing for `step`.
///
/// Fields belonging to the applicant type that is not selected are never
/// reported, even when they hold stale values from before a switch.
pub fn missing_fields(step: Step, state: &RegistrationState) -> Vec<&'static str> {
    let mut missing = Vec::new();
    let mut require = |value: &str, label: &'static str| {
        if blank(value) {
            missing.push(label);
        }
    };

    match step {
        Step::NameCheck => require(&state.selected_business_name, "Selected business name"),
        Step::ApplicantInfo => match state.applicant_type {
            ApplicantType::Individual => {
                require(&state.first_name, "First name");
                require(&state.last_name, "Last name");
                require(&state.date_of_birth, "Date of birth");
                require(state.gender.as_str(), "Gender");
                require(&state.phone, "Phone");
                require(&state.email, "Email");
                require(&state.residential_address, "Residential address");
            }
            ApplicantType::Organization => {
                require(&state.organization_name, "Organization name");
                require(&state.rc_number, "RC number");
                require(&state.organization_email, "Organization email");
                require(&state.phone, "Phone");
            }
        },
        Step::BusinessDetails => {
            require(&state.business_activity, "Business activity");
            if !state.same_as_residential {
                require(&state.business_address, "Business address");
            }
            require(&state.business_phone, "Business phone");
            require(&state.business_email, "Business email");
            require(&state.commencement_date, "Commencement date");
        }
        Step::Documents => {
            for slot in DocumentSlot::ALL {
                if state.document(slot).is_none() {
                    missing.push(slot.label());
                }
            }
        }
        Step::Review | Step::Payment | Step::Confirmation => {}
    }

    missing
}

/// Whether the wizard may move forward from `step`.
///
/// # Examples
///
/// ```
/// use bnreg::domain::{can_advance, RegistrationState, Step};
///
/// let mut state = RegistrationState::default();
/// assert!(!can_advance(Step::NameCheck, &state));
/// state.selected_business_name = "Ada Ventures".to_string();
/// assert!(can_advance(Step::NameCheck, &state));
/// assert!(can_advance(Step::Payment, &state));
/// ```
pub fn can_advance(step: Step, state: &RegistrationState) -> bool {
    missing_fields(step, state).is_empty()
}

/// Problems that stop the review step from proceeding to payment.
pub fn review_issues(state: &RegistrationState, terms_accepted: bool) -> Vec<String> {
    let mut issues = Vec::new();

    if blank(&state.selected_business_name) {
        issues.push("Business name not selected".to_string());
    }
    match state.applicant_type {
        ApplicantType::Individual => {
            if blank(&state.first_name) || blank(&state.last_name) {
                issues.push("Applicant name incomplete".to_string());
            }
        }
        ApplicantType::Organization => {
            if blank(&state.organization_name) {
                issues.push("Organization name not provided".to_string());
            }
            if blank(&state.rc_number) {
                issues.push("RC number not provided".to_string());
            }
        }
    }
    if blank(state.contact_email()) || blank(&state.phone) {
        issues.push("Contact information incomplete".to_string());
    }
    if blank(&state.business_activity) {
        issues.push("Business activity not selected".to_string());
    }
    if blank(&state.commencement_date) {
        issues.push("Business commencement date not set".to_string());
    }
    if DocumentSlot::ALL.iter().any(|slot| state.document(*slot).is_none()) {
        issues.push("Required documents not uploaded".to_string());
    }
    if !terms_accepted {
        issues.push("Terms and conditions must be accepted".to_string());
    }

    issues
}

/// Outcome of an advisory format check.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FieldCheck {
    pub errors: Vec<String>,
}

impl FieldCheck {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn fail(message: &str) -> Self {
        Self {
            errors: vec![message.to_string()],
        }
    }
}

pub fn validate_business_name(name: &str) -> FieldCheck {
    let name = name.trim();
    if name.is_empty() {
        return FieldCheck::fail("Business name is required");
    }

    let mut check = FieldCheck::default();
    let length = name.chars().count();
    if !(2..=50).contains(&length) {
        check.errors.push("Business name must be 2-50 characters".to_string());
    }
    if SQL_KEYWORDS.is_match(name) || SCRIPT_MARKUP.is_match(name) {
        check.errors.push("Invalid characters in business name".to_string());
    }
    check
}

pub fn validate_email(email: &str) -> FieldCheck {
    let normalized = email.trim().to_lowercase();
    if normalized.is_empty() {
        return FieldCheck::fail("Email is required");
    }

    let mut check = FieldCheck::default();
    if !EMAIL.is_match(&normalized) {
        check.errors.push("Invalid email format".to_string());
    }
    // Cyrillic look-alikes
    if email.chars().any(|c| ('\u{0400}'..='\u{04FF}').contains(&c)) {
        check.errors.push("Email contains invalid characters".to_string());
    }
    check
}

pub fn validate_phone(phone: &str) -> FieldCheck {
    let compact: String = phone.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return FieldCheck::fail("Phone number is required");
    }
    if NIGERIAN_PHONE.is_match(&compact) {
        FieldCheck::default()
    } else {
        FieldCheck::fail("Invalid Nigerian phone number format")
    }
}

/// Checks a `YYYY-MM-DD` birth date for an applicant of at least 18 years.
pub fn validate_date_of_birth(dob: &str, today: NaiveDate) -> FieldCheck {
    let dob = dob.trim();
    if dob.is_empty() {
        return FieldCheck::fail("Date of birth is required");
    }
    let Ok(birth) = NaiveDate::parse_from_str(dob, "%Y-%m-%d") else {
        return FieldCheck::fail("Date of birth must be YYYY-MM-DD");
    };

    let mut age = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        age -= 1;
    }
    if age < 18 {
        FieldCheck::fail("Must be 18 years or older")
    } else {
        FieldCheck::default()
    }
}

/// Advisory hints for the applicant and business steps, keyed by label.
pub fn field_hints(state: &RegistrationState, today: NaiveDate) -> Vec<(&'static str, String)> {
    let mut hints = Vec::new();
    let mut note = |label: &'static str, value: &str, check: FieldCheck| {
        if !blank(value) {
            hints.extend(check.errors.into_iter().map(|e| (label, e)));
        }
    };

    match state.current_step {
        Step::NameCheck => {
            for name in &state.preferred_names {
                note("Business name", name, validate_business_name(name));
            }
        }
        Step::ApplicantInfo => {
            note("Phone", &state.phone, validate_phone(&state.phone));
            note(
                "Email",
                state.contact_email(),
                validate_email(state.contact_email()),
            );
            if state.applicant_type == ApplicantType::Individual {
                note(
                    "Date of birth",
                    &state.date_of_birth,
                    validate_date_of_birth(&state.date_of_birth, today),
                );
            }
        }
        Step::BusinessDetails => {
            note(
                "Business phone",
                &state.business_phone,
                validate_phone(&state.business_phone),
            );
            note(
                "Business email",
                &state.business_email,
                validate_email(&state.business_email),
            );
        }
        _ => {}
    }

    hints
}
