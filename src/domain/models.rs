use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::documents::{DocumentSlot, EncodedDocument};
use super::errors::{StateError, StateResult};

/// The seven screens of the wizard, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Step {
    #[default]
    NameCheck = 1,
    ApplicantInfo = 2,
    BusinessDetails = 3,
    Documents = 4,
    Review = 5,
    Payment = 6,
    Confirmation = 7,
}

impl Step {
    pub const ALL: [Step; 7] = [
        Step::NameCheck,
        Step::ApplicantInfo,
        Step::BusinessDetails,
        Step::Documents,
        Step::Review,
        Step::Payment,
        Step::Confirmation,
    ];

    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn from_number(number: u8) -> Option<Self> {
        let index = usize::from(number.checked_sub(1)?);
        Self::ALL.get(index).copied()
    }

    /// The following step, saturating at [`Step::Confirmation`].
    pub fn next(self) -> Self {
        Self::from_number(self.number() + 1).unwrap_or(Step::Confirmation)
    }

    /// The preceding step, saturating at [`Step::NameCheck`].
    pub fn previous(self) -> Self {
        self.number()
            .checked_sub(1)
            .and_then(Self::from_number)
            .unwrap_or(Step::NameCheck)
    }

    pub fn title(self) -> &'static str {
        match self {
            Step::NameCheck => "Business Name",
            Step::ApplicantInfo => "Applicant Info",
            Step::BusinessDetails => "Business Details",
            Step::Documents => "Documents",
            Step::Review => "Review",
            Step::Payment => "Payment",
            Step::Confirmation => "Confirmation",
        }
    }
}

impl TryFrom<u8> for Step {
    type Error = StateError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_number(value).ok_or(StateError::InvalidStep(value))
    }
}

impl From<Step> for u8 {
    fn from(value: Step) -> Self {
        value.number()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicantType {
    #[default]
    Individual,
    Organization,
}

impl ApplicantType {
    pub fn toggled(self) -> Self {
        match self {
            ApplicantType::Individual => ApplicantType::Organization,
            ApplicantType::Organization => ApplicantType::Individual,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ApplicantType::Individual => "Individual",
            ApplicantType::Organization => "Organization",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "male")]
    Male,
    #[serde(rename = "female")]
    Female,
    #[default]
    #[serde(rename = "")]
    Unset,
}

impl Gender {
    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Unset => "",
        }
    }

    /// Cycles unset -> male -> female -> unset.
    pub fn cycled(self) -> Self {
        match self {
            Gender::Unset => Gender::Male,
            Gender::Male => Gender::Female,
            Gender::Female => Gender::Unset,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Initiating,
    Success,
    Failed,
}

impl PaymentStatus {
    /// Whether the payment lifecycle permits moving from `self` to `next`.
    ///
    /// Re-asserting the current status is always allowed. A failed payment
    /// may be initiated again with a new reference; success is terminal.
    pub fn can_transition_to(self, next: PaymentStatus) -> bool {
        use PaymentStatus::*;
        self == next
            || matches!(
                (self, next),
                (Pending, Initiating) | (Initiating, Success) | (Initiating, Failed) | (Failed, Initiating)
            )
    }

    /// Interprets a lowercased status string from the payment gateway.
    ///
    /// Returns `None` for statuses that mean "still in progress".
    pub fn from_gateway(status: &str) -> Option<Self> {
        match status {
            "success" | "successful" => Some(PaymentStatus::Success),
            "failed" | "declined" | "cancelled" | "abandoned" => Some(PaymentStatus::Failed),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Initiating => "initiating",
            PaymentStatus::Success => "success",
            PaymentStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every free-text field of the registration record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextField {
    Title,
    FirstName,
    MiddleName,
    LastName,
    OrganizationName,
    RcNumber,
    OrganizationEmail,
    DateOfBirth,
    Nationality,
    Phone,
    Email,
    ResidentialAddress,
    ResidentialStreetNumber,
    ResidentialCity,
    ResidentialState,
    ResidentialPostcode,
    ResidentialLga,
    SelectedBusinessName,
    BusinessActivity,
    NatureOfBusiness,
    BusinessAddress,
    BusinessStreetNumber,
    BusinessCity,
    BusinessState,
    BusinessPhone,
    BusinessEmail,
    CommencementDate,
    PaymentReference,
    ApplicationId,
    ApplicationReference,
}

impl TextField {
    pub fn label(self) -> &'static str {
        match self {
            TextField::Title => "Title",
            TextField::FirstName => "First name",
            TextField::MiddleName => "Middle name",
            TextField::LastName => "Last name",
            TextField::OrganizationName => "Organization name",
            TextField::RcNumber => "RC number",
            TextField::OrganizationEmail => "Organization email",
            TextField::DateOfBirth => "Date of birth (YYYY-MM-DD)",
            TextField::Nationality => "Nationality",
            TextField::Phone => "Phone",
            TextField::Email => "Email",
            TextField::ResidentialAddress => "Residential address",
            TextField::ResidentialStreetNumber => "Street number",
            TextField::ResidentialCity => "City",
            TextField::ResidentialState => "State",
            TextField::ResidentialPostcode => "Postcode",
            TextField::ResidentialLga => "LGA",
            TextField::SelectedBusinessName => "Selected business name",
            TextField::BusinessActivity => "Business activity",
            TextField::NatureOfBusiness => "Nature of business",
            TextField::BusinessAddress => "Business address",
            TextField::BusinessStreetNumber => "Business street number",
            TextField::BusinessCity => "Business city",
            TextField::BusinessState => "Business state",
            TextField::BusinessPhone => "Business phone",
            TextField::BusinessEmail => "Business email",
            TextField::CommencementDate => "Commencement date (YYYY-MM-DD)",
            TextField::PaymentReference => "Payment reference",
            TextField::ApplicationId => "Application ID",
            TextField::ApplicationReference => "Application reference",
        }
    }
}

/// A single whole-value replacement of one field.
///
/// This is the only way wizard data enters a [`RegistrationState`] outside
/// of the named step transitions.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
    Text(TextField, String),
    PreferredNames(Vec<String>),
    ApplicantType(ApplicantType),
    Gender(Gender),
    SameAsResidential(bool),
    Document(DocumentSlot, Option<EncodedDocument>),
    PaymentStatus(PaymentStatus),
}

/// Everything the wizard collects, plus its position and payment meta.
///
/// Serialized with the same camelCase keys the web form used so a stored
/// session is a single self-describing JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegistrationState {
    pub preferred_names: Vec<String>,
    pub selected_business_name: String,

    pub applicant_type: ApplicantType,
    pub title: String,
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub organization_name: String,
    pub rc_number: String,
    pub organization_email: String,
    pub date_of_birth: String,
    pub gender: Gender,
    pub nationality: String,
    pub phone: String,
    pub email: String,
    pub residential_address: String,
    pub residential_street_number: String,
    pub residential_city: String,
    pub residential_state: String,
    pub residential_postcode: String,
    pub residential_lga: String,

    pub business_activity: String,
    pub nature_of_business: String,
    pub business_address: String,
    pub business_street_number: String,
    pub business_city: String,
    pub business_state: String,
    pub same_as_residential: bool,
    pub business_phone: String,
    pub business_email: String,
    pub commencement_date: String,

    #[serde(rename = "supportingDocBase64")]
    pub supporting_doc: Option<EncodedDocument>,
    #[serde(rename = "signatureBase64")]
    pub signature: Option<EncodedDocument>,
    #[serde(rename = "meansOfIdBase64")]
    pub means_of_id: Option<EncodedDocument>,
    #[serde(rename = "passportBase64")]
    pub passport: Option<EncodedDocument>,

    pub payment_status: PaymentStatus,
    pub payment_reference: String,
    pub application_id: String,
    pub application_reference: String,
    pub submitted: bool,

    pub current_step: Step,
    pub completed_steps: BTreeSet<Step>,
}

impl Default for RegistrationState {
    fn default() -> Self {
        Self {
            preferred_names: vec![String::new(), String::new()],
            selected_business_name: String::new(),
            applicant_type: ApplicantType::default(),
            title: String::new(),
            first_name: String::new(),
            middle_name: String::new(),
            last_name: String::new(),
            organization_name: String::new(),
            rc_number: String::new(),
            organization_email: String::new(),
            date_of_birth: String::new(),
            gender: Gender::default(),
            nationality: String::new(),
            phone: String::new(),
            email: String::new(),
            residential_address: String::new(),
            residential_street_number: String::new(),
            residential_city: String::new(),
            residential_state: String::new(),
            residential_postcode: String::new(),
            residential_lga: String::new(),
            business_activity: String::new(),
            nature_of_business: String::new(),
            business_address: String::new(),
            business_street_number: String::new(),
            business_city: String::new(),
            business_state: String::new(),
            same_as_residential: false,
            business_phone: String::new(),
            business_email: String::new(),
            commencement_date: String::new(),
            supporting_doc: None,
            signature: None,
            means_of_id: None,
            passport: None,
            payment_status: PaymentStatus::default(),
            payment_reference: String::new(),
            application_id: String::new(),
            application_reference: String::new(),
            submitted: false,
            current_step: Step::NameCheck,
            completed_steps: BTreeSet::new(),
        }
    }
}

impl RegistrationState {
    pub fn text(&self, field: TextField) -> &str {
        match field {
            TextField::Title => &self.title,
            TextField::FirstName => &self.first_name,
            TextField::MiddleName => &self.middle_name,
            TextField::LastName => &self.last_name,
            TextField::OrganizationName => &self.organization_name,
            TextField::RcNumber => &self.rc_number,
            TextField::OrganizationEmail => &self.organization_email,
            TextField::DateOfBirth => &self.date_of_birth,
            TextField::Nationality => &self.nationality,
            TextField::Phone => &self.phone,
            TextField::Email => &self.email,
            TextField::ResidentialAddress => &self.residential_address,
            TextField::ResidentialStreetNumber => &self.residential_street_number,
            TextField::ResidentialCity => &self.residential_city,
            TextField::ResidentialState => &self.residential_state,
            TextField::ResidentialPostcode => &self.residential_postcode,
            TextField::ResidentialLga => &self.residential_lga,
            TextField::SelectedBusinessName => &self.selected_business_name,
            TextField::BusinessActivity => &self.business_activity,
            TextField::NatureOfBusiness => &self.nature_of_business,
            TextField::BusinessAddress => &self.business_address,
            TextField::BusinessStreetNumber => &self.business_street_number,
            TextField::BusinessCity => &self.business_city,
            TextField::BusinessState => &self.business_state,
            TextField::BusinessPhone => &self.business_phone,
            TextField::BusinessEmail => &self.business_email,
            TextField::CommencementDate => &self.commencement_date,
            TextField::PaymentReference => &self.payment_reference,
            TextField::ApplicationId => &self.application_id,
            TextField::ApplicationReference => &self.application_reference,
        }
    }

    fn text_mut(&mut self, field: TextField) -> &mut String {
        match field {
            TextField::Title => &mut self.title,
            TextField::FirstName => &mut self.first_name,
            TextField::MiddleName => &mut self.middle_name,
            TextField::LastName => &mut self.last_name,
            TextField::OrganizationName => &mut self.organization_name,
            TextField::RcNumber => &mut self.rc_number,
            TextField::OrganizationEmail => &mut self.organization_email,
            TextField::DateOfBirth => &mut self.date_of_birth,
            TextField::Nationality => &mut self.nationality,
            TextField::Phone => &mut self.phone,
            TextField::Email => &mut self.email,
            TextField::ResidentialAddress => &mut self.residential_address,
            TextField::ResidentialStreetNumber => &mut self.residential_street_number,
            TextField::ResidentialCity => &mut self.residential_city,
            TextField::ResidentialState => &mut self.residential_state,
            TextField::ResidentialPostcode => &mut self.residential_postcode,
            TextField::ResidentialLga => &mut self.residential_lga,
            TextField::SelectedBusinessName => &mut self.selected_business_name,
            TextField::BusinessActivity => &mut self.business_activity,
            TextField::NatureOfBusiness => &mut self.nature_of_business,
            TextField::BusinessAddress => &mut self.business_address,
            TextField::BusinessStreetNumber => &mut self.business_street_number,
            TextField::BusinessCity => &mut self.business_city,
            TextField::BusinessState => &mut self.business_state,
            TextField::BusinessPhone => &mut self.business_phone,
            TextField::BusinessEmail => &mut self.business_email,
            TextField::CommencementDate => &mut self.commencement_date,
            TextField::PaymentReference => &mut self.payment_reference,
            TextField::ApplicationId => &mut self.application_id,
            TextField::ApplicationReference => &mut self.application_reference,
        }
    }

    pub fn document(&self, slot: DocumentSlot) -> Option<&EncodedDocument> {
        match slot {
            DocumentSlot::SupportingDoc => self.supporting_doc.as_ref(),
            DocumentSlot::Signature => self.signature.as_ref(),
            DocumentSlot::MeansOfId => self.means_of_id.as_ref(),
            DocumentSlot::Passport => self.passport.as_ref(),
        }
    }

    fn document_mut(&mut self, slot: DocumentSlot) -> &mut Option<EncodedDocument> {
        match slot {
            DocumentSlot::SupportingDoc => &mut self.supporting_doc,
            DocumentSlot::Signature => &mut self.signature,
            DocumentSlot::MeansOfId => &mut self.means_of_id,
            DocumentSlot::Passport => &mut self.passport,
        }
    }

    /// Applies one field update in place.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::InvalidPaymentTransition`] when the update would
    /// move the payment status along an edge the lifecycle does not allow.
    /// The state is left untouched in that case.
    pub fn apply(&mut self, update: FieldUpdate) -> StateResult<()> {
        match update {
            FieldUpdate::Text(field, value) => *self.text_mut(field) = value,
            FieldUpdate::PreferredNames(names) => self.preferred_names = names,
            FieldUpdate::ApplicantType(kind) => self.applicant_type = kind,
            FieldUpdate::Gender(gender) => self.gender = gender,
            FieldUpdate::SameAsResidential(flag) => self.same_as_residential = flag,
            FieldUpdate::Document(slot, document) => *self.document_mut(slot) = document,
            FieldUpdate::PaymentStatus(next) => {
                if !self.payment_status.can_transition_to(next) {
                    return Err(StateError::InvalidPaymentTransition {
                        from: self.payment_status,
                        to: next,
                    });
                }
                self.payment_status = next;
            }
        }
        Ok(())
    }

    /// Moves forward one step and records the step being left as completed.
    pub fn advance(&mut self) {
        self.completed_steps.insert(self.current_step);
        self.current_step = self.current_step.next();
    }

    /// Moves back one step. Completed steps are kept.
    pub fn retreat(&mut self) {
        self.current_step = self.current_step.previous();
    }

    /// Name shown on the review and confirmation screens.
    pub fn applicant_display_name(&self) -> String {
        match self.applicant_type {
            ApplicantType::Individual => [&self.first_name, &self.middle_name, &self.last_name]
                .iter()
                .filter(|part| !part.trim().is_empty())
                .map(|part| part.trim())
                .collect::<Vec<_>>()
                .join(" "),
            ApplicantType::Organization => self.organization_name.trim().to_string(),
        }
    }

    pub fn contact_email(&self) -> &str {
        match self.applicant_type {
            ApplicantType::Individual => &self.email,
            ApplicantType::Organization => &self.organization_email,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state() {
        let state = RegistrationState::default();
        assert_eq!(state.current_step, Step::NameCheck);
        assert!(state.completed_steps.is_empty());
        assert_eq!(state.preferred_names, vec![String::new(), String::new()]);
        assert_eq!(state.applicant_type, ApplicantType::Individual);
        assert_eq!(state.gender, Gender::Unset);
        assert_eq!(state.payment_status, PaymentStatus::Pending);
        assert!(!state.submitted);
        for slot in DocumentSlot::ALL {
            assert!(state.document(slot).is_none());
        }
    }

    #[test]
    fn test_step_navigation_saturates() {
        assert_eq!(Step::Confirmation.next(), Step::Confirmation);
        assert_eq!(Step::NameCheck.previous(), Step::NameCheck);
        assert_eq!(Step::Review.next(), Step::Payment);
        assert_eq!(Step::Review.previous(), Step::Documents);
        assert_eq!(Step::from_number(0), None);
        assert_eq!(Step::from_number(8), None);
        assert_eq!(Step::from_number(4), Some(Step::Documents));
    }

    #[test]
    fn test_advance_and_retreat() {
        let mut state = RegistrationState::default();
        for _ in 0..10 {
            state.advance();
        }
        assert_eq!(state.current_step, Step::Confirmation);
        assert_eq!(state.completed_steps.len(), 7);

        for _ in 0..10 {
            state.retreat();
        }
        assert_eq!(state.current_step, Step::NameCheck);
        assert_eq!(state.completed_steps.len(), 7);
    }

    #[test]
    fn test_apply_text_and_documents() {
        let mut state = RegistrationState::default();
        state
            .apply(FieldUpdate::Text(TextField::FirstName, "Ada".to_string()))
            .unwrap();
        assert_eq!(state.first_name, "Ada");
        assert_eq!(state.text(TextField::FirstName), "Ada");

        let doc = EncodedDocument::from_bytes("image/png", b"png");
        state
            .apply(FieldUpdate::Document(DocumentSlot::Passport, Some(doc.clone())))
            .unwrap();
        assert_eq!(state.document(DocumentSlot::Passport), Some(&doc));

        state
            .apply(FieldUpdate::Document(DocumentSlot::Passport, None))
            .unwrap();
        assert!(state.passport.is_none());
    }

    #[test]
    fn test_payment_status_transitions() {
        let mut state = RegistrationState::default();
        let err = state
            .apply(FieldUpdate::PaymentStatus(PaymentStatus::Success))
            .unwrap_err();
        assert_eq!(
            err,
            StateError::InvalidPaymentTransition {
                from: PaymentStatus::Pending,
                to: PaymentStatus::Success
            }
        );
        assert_eq!(state.payment_status, PaymentStatus::Pending);

        state.apply(FieldUpdate::PaymentStatus(PaymentStatus::Initiating)).unwrap();
        state.apply(FieldUpdate::PaymentStatus(PaymentStatus::Failed)).unwrap();
        state.apply(FieldUpdate::PaymentStatus(PaymentStatus::Initiating)).unwrap();
        state.apply(FieldUpdate::PaymentStatus(PaymentStatus::Success)).unwrap();

        assert!(state.apply(FieldUpdate::PaymentStatus(PaymentStatus::Failed)).is_err());
        assert!(state.apply(FieldUpdate::PaymentStatus(PaymentStatus::Pending)).is_err());
        assert_eq!(state.payment_status, PaymentStatus::Success);
    }

    #[test]
    fn test_gateway_status_mapping() {
        assert_eq!(PaymentStatus::from_gateway("success"), Some(PaymentStatus::Success));
        assert_eq!(PaymentStatus::from_gateway("abandoned"), Some(PaymentStatus::Failed));
        assert_eq!(PaymentStatus::from_gateway("pending"), None);
        assert_eq!(PaymentStatus::from_gateway("ongoing"), None);
    }

    #[test]
    fn test_serialized_keys_match_stored_sessions() {
        let mut state = RegistrationState::default();
        state.passport = Some(EncodedDocument::from_bytes("image/png", b"x"));
        state.current_step = Step::Documents;
        let json = serde_json::to_value(&state).unwrap();

        assert_eq!(json["currentStep"], 4);
        assert_eq!(json["applicantType"], "individual");
        assert_eq!(json["gender"], "");
        assert_eq!(json["paymentStatus"], "pending");
        assert_eq!(json["passportBase64"], "data:image/png;base64,eA==");
        assert!(json["signatureBase64"].is_null());
    }

    #[test]
    fn test_deserialize_rejects_out_of_range_step() {
        let result: Result<RegistrationState, _> = serde_json::from_str(r#"{"currentStep": 9}"#);
        assert!(result.is_err());

        let partial: RegistrationState =
            serde_json::from_str(r#"{"currentStep": 3, "firstName": "Ada"}"#).unwrap();
        assert_eq!(partial.current_step, Step::BusinessDetails);
        assert_eq!(partial.first_name, "Ada");
        assert_eq!(partial.preferred_names.len(), 2);
    }

    #[test]
    fn test_display_name_by_applicant_type() {
        let mut state = RegistrationState::default();
        state.first_name = "Ada".to_string();
        state.last_name = "Obi".to_string();
        assert_eq!(state.applicant_display_name(), "Ada Obi");

        state.applicant_type = ApplicantType::Organization;
        state.organization_name = "Obi Holdings".to_string();
        assert_eq!(state.applicant_display_name(), "Obi Holdings");
    }
}
