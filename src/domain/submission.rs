//! Assembly of the registration request body.
//!
//! The registration backend has a fixed, case-sensitive multipart contract.
//! [`build_submission`] maps a [`RegistrationState`] onto it without any
//! I/O so the mapping can be checked field by field; the HTTP layer only
//! turns the resulting [`SubmissionPayload`] into a form.

use rand::Rng;
use rand::distributions::Alphanumeric;

use super::documents::DocumentSlot;
use super::errors::SubmissionError;
use super::models::RegistrationState;

/// Length of the client-generated `transactionRef`.
pub const TRANSACTION_REF_LEN: usize = 16;

/// A binary document part of the multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub field: &'static str,
    pub file_name: &'static str,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Text fields in contract order plus the decoded document attachments.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubmissionPayload {
    pub fields: Vec<(&'static str, String)>,
    pub attachments: Vec<Attachment>,
}

impl SubmissionPayload {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn attachment(&self, field: &str) -> Option<&Attachment> {
        self.attachments.iter().find(|a| a.field == field)
    }
}

/// Returns the leading numeric token of a free-text address.
///
/// # Examples
///
/// ```
/// use bnreg::domain::extract_street_number;
///
/// assert_eq!(extract_street_number("41 Limpopo Street"), "41");
/// assert_eq!(extract_street_number("Limpopo Street"), "");
/// assert_eq!(extract_street_number("   "), "");
/// ```
pub fn extract_street_number(address: &str) -> String {
    match address.split_whitespace().next() {
        Some(token) if token.starts_with(|c: char| c.is_ascii_digit()) => token.to_string(),
        _ => String::new(),
    }
}

/// Generates a fresh uppercase alphanumeric `transactionRef`.
pub fn generate_transaction_ref<R: Rng + ?Sized>(rng: &mut R) -> String {
    rng.sample_iter(&Alphanumeric)
        .take(TRANSACTION_REF_LEN)
        .map(|b| char::from(b).to_ascii_uppercase())
        .collect()
}

fn first_non_empty<'a>(candidates: impl IntoIterator<Item = &'a str>) -> String {
    candidates
        .into_iter()
        .map(str::trim)
        .find(|value| !value.is_empty())
        .unwrap_or_default()
        .to_string()
}

fn street_number(explicit: &str, address: &str) -> String {
    if explicit.trim().is_empty() {
        extract_street_number(address)
    } else {
        explicit.trim().to_string()
    }
}

/// Maps the wizard state onto the registration backend's multipart contract.
///
/// `transaction_ref` is sent as `transactionRef`; callers generate a new one
/// for every submission rather than reusing the payment reference.
///
/// # Errors
///
/// Returns [`SubmissionError::Document`] if a stored document cannot be
/// decoded back into bytes.
pub fn build_submission(
    state: &RegistrationState,
    transaction_ref: &str,
) -> Result<SubmissionPayload, SubmissionError> {
    let line_of_business = first_non_empty([
        state.business_activity.as_str(),
        state.nature_of_business.as_str(),
    ]);
    let proposed_name = first_non_empty(
        std::iter::once(state.selected_business_name.as_str())
            .chain(state.preferred_names.iter().map(String::as_str)),
    );

    let shared = state.same_as_residential;
    let company_address = if shared {
        first_non_empty([
            state.business_address.as_str(),
            state.residential_address.as_str(),
        ])
    } else {
        state.business_address.clone()
    };
    let company_city = if shared {
        first_non_empty([state.business_city.as_str(), state.residential_city.as_str()])
    } else {
        state.business_city.clone()
    };
    let company_state = if shared {
        first_non_empty([
            state.business_state.as_str(),
            state.residential_state.as_str(),
        ])
    } else {
        state.business_state.clone()
    };
    let company_street_explicit = if shared {
        first_non_empty([
            state.business_street_number.as_str(),
            state.residential_street_number.as_str(),
        ])
    } else {
        state.business_street_number.clone()
    };

    let fields = vec![
        ("lineOfBusiness", line_of_business),
        ("proprietorCity", state.residential_city.clone()),
        ("companyCity", company_city),
        ("proprietorPhonenumber", state.phone.clone()),
        ("businessCommencementDate", state.commencement_date.clone()),
        ("companyState", company_state),
        ("proprietorNationality", state.nationality.clone()),
        ("proprietorState", state.residential_state.clone()),
        ("proprietorDob", state.date_of_birth.clone()),
        ("proprietorFirstname", state.first_name.clone()),
        ("proprietorOthername", state.middle_name.clone()),
        ("proprietorSurname", state.last_name.clone()),
        ("proposedOption1", proposed_name),
        ("proprietorGender", state.gender.as_str().to_uppercase()),
        (
            "proprietorStreetNumber",
            street_number(&state.residential_street_number, &state.residential_address),
        ),
        ("proprietorServiceAddress", state.residential_address.clone()),
        ("companyEmail", state.business_email.clone()),
        (
            "companyStreetNumber",
            street_number(&company_street_explicit, &company_address),
        ),
        ("proprietorEmail", state.email.clone()),
        ("companyAddress", company_address),
        ("proprietorPostcode", state.residential_postcode.clone()),
        ("proprietorLga", state.residential_lga.clone()),
        ("transactionRef", transaction_ref.to_string()),
    ];

    let mut attachments = Vec::new();
    for slot in DocumentSlot::ALL {
        let Some(document) = state.document(slot) else {
            continue;
        };
        let bytes = document
            .decode()
            .map_err(|source| SubmissionError::Document { slot, source })?;
        attachments.push(Attachment {
            field: slot.field_name(),
            file_name: slot.file_name(),
            content_type: document.mime().to_string(),
            bytes,
        });
    }

    Ok(SubmissionPayload {
        fields,
        attachments,
    })
}
