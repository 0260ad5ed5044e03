//! Wizard controller: step gating, the payment poll and auto-submission.
//!
//! The controller owns the [`FieldStore`] and the collaborators it talks to.
//! Every backend call is a blocking request made from the UI loop; `busy` is
//! raised for the duration so navigation renders disabled.

use std::time::{Duration, Instant};

use serde_json::json;
use tracing::{debug, info, warn};

use super::store::FieldStore;
use crate::domain::{
    DocumentSlot, FieldUpdate, PaymentStatus, RegistrationState, Step, TextField, can_advance,
    generate_transaction_ref, missing_fields, review_issues, validate_business_name,
};
use crate::infrastructure::{
    ClipboardSink, NameCheckOutcome, NameCheckRequest, PaymentRequest, RegistrationApi,
    load_document,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentSettings {
    /// Amount in the currency's minor unit.
    pub amount: u64,
    pub currency: String,
    pub wallet_id: String,
}

impl Default for PaymentSettings {
    fn default() -> Self {
        Self {
            amount: 12_900,
            currency: "NGN".to_string(),
            wallet_id: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WizardSettings {
    pub poll_interval: Duration,
    pub payment: PaymentSettings,
}

impl Default for WizardSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            payment: PaymentSettings::default(),
        }
    }
}

/// User-visible failures, kept apart so each screen can show its own.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WizardErrors {
    pub name_check: Option<String>,
    pub payment: Option<String>,
    pub submission: Option<String>,
    pub review: Vec<String>,
    pub documents: [Option<String>; 4],
}

pub struct WizardController {
    store: FieldStore,
    api: Box<dyn RegistrationApi>,
    clipboard: Box<dyn ClipboardSink>,
    settings: WizardSettings,
    busy: bool,
    terms_accepted: bool,
    name_results: Vec<NameCheckOutcome>,
    errors: WizardErrors,
    authorization_url: Option<String>,
    last_poll: Option<Instant>,
    /// Payment reference whose automatic submission has already fired.
    submission_latch: Option<String>,
    status_message: Option<String>,
}

impl WizardController {
    pub fn new(
        store: FieldStore,
        api: Box<dyn RegistrationApi>,
        clipboard: Box<dyn ClipboardSink>,
        settings: WizardSettings,
    ) -> Self {
        Self {
            store,
            api,
            clipboard,
            settings,
            busy: false,
            terms_accepted: false,
            name_results: Vec::new(),
            errors: WizardErrors::default(),
            authorization_url: None,
            last_poll: None,
            submission_latch: None,
            status_message: None,
        }
    }

    /// Resumes after an external payment hand-off: a pending marker moves
    /// the wizard one step forward without validation.
    pub fn start(&mut self) {
        if self.store.take_resume_marker() {
            info!("resuming after payment hand-off");
            self.store.advance_step();
        }
    }

    pub fn state(&self) -> &RegistrationState {
        self.store.state()
    }

    pub fn store_mut(&mut self) -> &mut FieldStore {
        &mut self.store
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn terms_accepted(&self) -> bool {
        self.terms_accepted
    }

    pub fn name_results(&self) -> &[NameCheckOutcome] {
        &self.name_results
    }

    pub fn errors(&self) -> &WizardErrors {
        &self.errors
    }

    pub fn authorization_url(&self) -> Option<&str> {
        self.authorization_url.as_deref()
    }

    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    pub fn settings(&self) -> &WizardSettings {
        &self.settings
    }

    /// Marks a blocking operation as started so the next frame renders
    /// controls disabled. Cleared when the operation returns.
    pub fn begin_operation(&mut self, message: &str) {
        self.busy = true;
        self.status_message = Some(message.to_string());
    }

    pub fn next_label(&self) -> &'static str {
        match self.state().current_step {
            Step::Review => "Proceed to Payment",
            Step::Payment => "Complete Registration",
            Step::Confirmation => "Back to Home",
            _ => "Next",
        }
    }

    pub fn can_go_next(&self) -> bool {
        !self.busy && can_advance(self.state().current_step, self.state())
    }

    pub fn can_go_previous(&self) -> bool {
        !self.busy && self.state().current_step != Step::NameCheck
    }

    pub fn go_next(&mut self) {
        let step = self.state().current_step;
        match step {
            Step::Review => self.proceed_to_payment(),
            Step::Payment => self.complete_registration(),
            Step::Confirmation => self.return_home(),
            _ => {
                let missing = missing_fields(step, self.state());
                if missing.is_empty() {
                    self.store.advance_step();
                    self.status_message = None;
                } else {
                    self.status_message = Some(format!("Required: {}", missing.join(", ")));
                }
            }
        }
        self.busy = false;
    }

    pub fn go_previous(&mut self) {
        if self.can_go_previous() {
            self.store.retreat_step();
            self.status_message = None;
        }
    }

    pub fn update_field(&mut self, update: FieldUpdate) {
        if let Err(e) = self.store.update_field(update) {
            warn!(error = %e, "field update rejected");
            self.status_message = Some(e.to_string());
        }
    }

    pub fn set_preferred_name(&mut self, index: usize, value: String) {
        let mut names = self.state().preferred_names.clone();
        if index >= names.len() {
            names.resize(index + 1, String::new());
        }
        names[index] = value;
        self.update_field(FieldUpdate::PreferredNames(names));
    }

    /// Asks the registry about every non-empty preferred name.
    ///
    /// Names failing the local format check are reported without a request.
    /// The first available name is selected when nothing is selected yet.
    pub fn check_names(&mut self) {
        self.busy = true;
        self.errors.name_check = None;
        self.name_results.clear();

        let names: Vec<String> = self
            .state()
            .preferred_names
            .iter()
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect();
        if names.is_empty() {
            self.errors.name_check = Some("Please enter at least one business name".to_string());
            self.busy = false;
            return;
        }

        let line_of_business = {
            let state = self.state();
            if state.business_activity.trim().is_empty() {
                state.nature_of_business.clone()
            } else {
                state.business_activity.clone()
            }
        };

        for name in names {
            let check = validate_business_name(&name);
            if !check.is_valid() {
                self.name_results.push(NameCheckOutcome {
                    name,
                    available: false,
                    message: check.errors.join("; "),
                    recommendations: Vec::new(),
                });
                continue;
            }

            let request = NameCheckRequest {
                proposed_name: name,
                line_of_business: line_of_business.clone(),
            };
            match self.api.check_name(&request) {
                Ok(outcome) => {
                    debug!(name = %outcome.name, available = outcome.available, "name checked");
                    self.name_results.push(outcome);
                }
                Err(e) => {
                    warn!(error = %e, name = %request.proposed_name, "name check failed");
                    self.errors.name_check =
                        Some(format!("Failed to check availability: {e}"));
                }
            }
        }

        if self.state().selected_business_name.trim().is_empty() {
            let first = self
                .name_results
                .iter()
                .find(|outcome| outcome.available)
                .map(|outcome| outcome.name.clone());
            if let Some(name) = first {
                self.update_field(FieldUpdate::Text(TextField::SelectedBusinessName, name));
            }
        }

        let available = self.name_results.iter().filter(|o| o.available).count();
        self.status_message = Some(format!(
            "{available} of {} name(s) available",
            self.name_results.len()
        ));
        self.busy = false;
    }

    /// Selects the `index`th name-check result if the registry reported it
    /// available.
    pub fn select_name(&mut self, index: usize) -> bool {
        let Some(outcome) = self.name_results.get(index) else {
            return false;
        };
        if !outcome.available {
            self.status_message = Some(format!("\"{}\" is not available", outcome.name));
            return false;
        }
        let name = outcome.name.clone();
        self.update_field(FieldUpdate::Text(TextField::SelectedBusinessName, name));
        true
    }

    pub fn toggle_terms(&mut self) {
        self.terms_accepted = !self.terms_accepted;
        if self.terms_accepted {
            self.errors.review.clear();
        }
    }

    /// Reads `path` into `slot`; failures are kept per slot.
    pub fn attach_document(&mut self, slot: DocumentSlot, path: &str) {
        let path = path.trim();
        match load_document(std::path::Path::new(path), slot) {
            Ok(document) => {
                info!(slot = %slot, mime = document.mime(), "document attached");
                self.errors.documents[slot.index()] = None;
                self.update_field(FieldUpdate::Document(slot, Some(document)));
                self.status_message = Some(format!("{slot} uploaded"));
            }
            Err(e) => {
                warn!(slot = %slot, error = %e, "document rejected");
                self.errors.documents[slot.index()] = Some(e.to_string());
            }
        }
    }

    pub fn remove_document(&mut self, slot: DocumentSlot) {
        self.errors.documents[slot.index()] = None;
        self.update_field(FieldUpdate::Document(slot, None));
    }

    /// Drives the payment poll. Call regularly; at most one request is made
    /// per poll interval, the first one immediately.
    pub fn tick(&mut self, now: Instant) {
        let state = self.store.state();
        let polling = state.payment_status == PaymentStatus::Initiating
            && !state.payment_reference.trim().is_empty()
            && !state.submitted;
        if !polling {
            return;
        }
        if let Some(last) = self.last_poll {
            if now.saturating_duration_since(last) < self.settings.poll_interval {
                return;
            }
        }
        self.last_poll = Some(now);

        let reference = state.payment_reference.clone();
        let status = match self.api.payment_status(&reference) {
            Ok(status) => status,
            Err(e) => {
                warn!(%reference, error = %e, "payment poll failed, retrying");
                return;
            }
        };

        match PaymentStatus::from_gateway(&status) {
            Some(PaymentStatus::Success) => {
                info!(%reference, "payment confirmed");
                self.update_field(FieldUpdate::PaymentStatus(PaymentStatus::Success));
                self.errors.payment = None;
                self.auto_submit(&reference);
            }
            Some(PaymentStatus::Failed) => {
                info!(%reference, %status, "payment did not complete");
                self.update_field(FieldUpdate::PaymentStatus(PaymentStatus::Failed));
                self.errors.payment = Some(format!("Payment {status}. You can go back and try again."));
            }
            _ => debug!(%reference, %status, "payment still pending"),
        }
    }

    fn auto_submit(&mut self, reference: &str) {
        if self.submission_latch.as_deref() == Some(reference) {
            debug!(%reference, "submission already attempted for this payment");
            return;
        }
        self.submission_latch = Some(reference.to_string());
        self.submit_application();
    }

    fn submit_application(&mut self) -> bool {
        self.busy = true;
        let transaction_ref = generate_transaction_ref(&mut rand::thread_rng());
        let submitted = match self.store.submit(self.api.as_ref(), &transaction_ref) {
            Ok(reference) => {
                self.errors.submission = None;
                self.status_message = Some(match self.clipboard.copy_text(&reference) {
                    Ok(()) => format!("Application {reference} submitted (copied to clipboard)"),
                    Err(_) => format!("Application {reference} submitted"),
                });
                if self.state().current_step == Step::Payment {
                    self.store.advance_step();
                }
                true
            }
            Err(e) => {
                warn!(error = %e, "registration submission failed");
                self.errors.submission = Some(e.to_string());
                false
            }
        };
        self.busy = false;
        submitted
    }

    fn proceed_to_payment(&mut self) {
        let issues = review_issues(self.state(), self.terms_accepted);
        if !issues.is_empty() {
            self.status_message = Some(format!("{} issue(s) to resolve before payment", issues.len()));
            self.errors.review = issues;
            return;
        }
        self.errors.review.clear();

        let status = self.state().payment_status;
        match status {
            PaymentStatus::Success => {
                self.store.advance_step();
                return;
            }
            PaymentStatus::Initiating if !self.state().payment_reference.is_empty() => {
                self.resume_checkout();
                return;
            }
            _ => {}
        }

        let request = {
            let state = self.state();
            PaymentRequest {
                amount: self.settings.payment.amount,
                wallet_id: self.settings.payment.wallet_id.clone(),
                currency: self.settings.payment.currency.clone(),
                metadata: json!({
                    "businessName": state.selected_business_name,
                    "applicantName": state.applicant_display_name(),
                    "email": state.contact_email(),
                    "phone": state.phone,
                }),
            }
        };

        let checkout = match self.api.initialize_payment(&request) {
            Ok(checkout) => checkout,
            Err(e) => {
                warn!(error = %e, "payment initialization failed");
                self.errors.payment = Some(e.to_string());
                self.status_message = Some("Payment could not be started".to_string());
                return;
            }
        };

        self.errors.payment = None;
        self.update_field(FieldUpdate::Text(
            TextField::PaymentReference,
            checkout.reference.clone(),
        ));
        self.update_field(FieldUpdate::PaymentStatus(PaymentStatus::Initiating));
        self.last_poll = None;

        // The marker only matters if the process dies between the hand-off
        // and the step change below; a clean run clears it straight away.
        self.store.set_resume_marker();
        self.hand_off_checkout(&checkout.authorization_url);
        self.authorization_url = Some(checkout.authorization_url);
        self.store.advance_step();
        self.store.take_resume_marker();
    }

    /// Returns to the checkout already in flight instead of opening a
    /// second one, so a payment made against it is still picked up.
    fn resume_checkout(&mut self) {
        let reference = self.state().payment_reference.clone();
        info!(reference = %reference, "reusing pending checkout");
        self.errors.payment = None;
        match self.authorization_url.clone() {
            Some(url) => self.hand_off_checkout(&url),
            None => {
                self.status_message = Some(format!(
                    "Payment {reference} already started. Waiting for confirmation."
                ));
            }
        }
        self.last_poll = None;
        self.store.advance_step();
    }

    fn hand_off_checkout(&mut self, url: &str) {
        self.status_message = Some(match self.clipboard.copy_text(url) {
            Ok(()) => "Payment link copied to clipboard. Open it in your browser to pay.".to_string(),
            Err(e) => {
                debug!(error = %e, "clipboard unavailable");
                format!("Open this link to pay: {url}")
            }
        });
    }

    fn complete_registration(&mut self) {
        let state = self.state();
        if state.payment_status == PaymentStatus::Success && !state.submitted {
            self.submit_application();
        } else {
            self.store.advance_step();
        }
    }

    fn return_home(&mut self) {
        self.store.reset();
        self.terms_accepted = false;
        self.name_results.clear();
        self.errors = WizardErrors::default();
        self.authorization_url = None;
        self.last_poll = None;
        self.submission_latch = None;
        self.status_message = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::store::{RESUME_MARKER_KEY, STATE_KEY};
    use crate::domain::{ApplicantType, EncodedDocument, Gender, SubmissionPayload};
    use crate::infrastructure::{
        ApiError, ApiResult, ApplicationStatus, ClipboardError, MemoryStorage, PaymentCheckout,
        RegistrationAck, SessionStorage,
    };
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    #[derive(Default)]
    struct FakeBackend {
        poll_statuses: VecDeque<String>,
        register_failures: VecDeque<String>,
        name_checks: Vec<String>,
        payment_inits: usize,
        polls: usize,
        polled: Vec<String>,
        paid_references: Vec<String>,
        registrations: Vec<SubmissionPayload>,
    }

    #[derive(Clone, Default)]
    struct FakeApi(Rc<RefCell<FakeBackend>>);

    impl RegistrationApi for FakeApi {
        fn check_name(&self, request: &NameCheckRequest) -> ApiResult<NameCheckOutcome> {
            self.0.borrow_mut().name_checks.push(request.proposed_name.clone());
            let available = !request.proposed_name.contains("Taken");
            Ok(NameCheckOutcome {
                name: request.proposed_name.clone(),
                available,
                message: String::new(),
                recommendations: Vec::new(),
            })
        }

        fn application_status(&self, _reference: &str) -> ApiResult<ApplicationStatus> {
            Ok(ApplicationStatus::default())
        }

        fn initialize_payment(&self, _request: &PaymentRequest) -> ApiResult<PaymentCheckout> {
            let mut backend = self.0.borrow_mut();
            backend.payment_inits += 1;
            Ok(PaymentCheckout {
                authorization_url: "https://checkout.example/pay/abc".to_string(),
                reference: format!("PAY-{}", backend.payment_inits),
            })
        }

        fn payment_status(&self, reference: &str) -> ApiResult<String> {
            let mut backend = self.0.borrow_mut();
            backend.polls += 1;
            backend.polled.push(reference.to_string());
            if backend.paid_references.iter().any(|paid| paid == reference) {
                return Ok("success".to_string());
            }
            Ok(backend
                .poll_statuses
                .pop_front()
                .unwrap_or_else(|| "pending".to_string()))
        }

        fn register(&self, payload: &SubmissionPayload) -> ApiResult<RegistrationAck> {
            let mut backend = self.0.borrow_mut();
            backend.registrations.push(payload.clone());
            if let Some(message) = backend.register_failures.pop_front() {
                return Err(ApiError::Status {
                    status: 500,
                    message,
                });
            }
            Ok(RegistrationAck::from_response(
                json!({"data": {"transactionRef": "BN-2024-0001"}}),
            ))
        }
    }

    #[derive(Clone, Default)]
    struct RecordingClipboard(Rc<RefCell<Vec<String>>>);

    impl ClipboardSink for RecordingClipboard {
        fn copy_text(&mut self, text: &str) -> Result<(), ClipboardError> {
            self.0.borrow_mut().push(text.to_string());
            Ok(())
        }
    }

    struct Harness {
        wizard: WizardController,
        api: FakeApi,
        clipboard: RecordingClipboard,
        storage: MemoryStorage,
    }

    fn harness_with(storage: MemoryStorage) -> Harness {
        let api = FakeApi::default();
        let clipboard = RecordingClipboard::default();
        let store = FieldStore::open(Box::new(storage.clone()));
        let wizard = WizardController::new(
            store,
            Box::new(api.clone()),
            Box::new(clipboard.clone()),
            WizardSettings::default(),
        );
        Harness {
            wizard,
            api,
            clipboard,
            storage,
        }
    }

    fn harness() -> Harness {
        harness_with(MemoryStorage::new())
    }

    fn text(wizard: &mut WizardController, field: TextField, value: &str) {
        wizard.update_field(FieldUpdate::Text(field, value.to_string()));
    }

    fn fill_steps_one_to_four(wizard: &mut WizardController) {
        text(wizard, TextField::SelectedBusinessName, "Ada Ventures");
        wizard.go_next();

        text(wizard, TextField::FirstName, "Ada");
        text(wizard, TextField::LastName, "Obi");
        text(wizard, TextField::DateOfBirth, "1990-04-12");
        wizard.update_field(FieldUpdate::Gender(Gender::Female));
        text(wizard, TextField::Phone, "08031234567");
        text(wizard, TextField::Email, "ada@example.com");
        text(wizard, TextField::ResidentialAddress, "41 Limpopo Street");
        wizard.go_next();

        text(wizard, TextField::BusinessActivity, "Retail");
        text(wizard, TextField::BusinessPhone, "08031234567");
        text(wizard, TextField::BusinessEmail, "shop@example.com");
        text(wizard, TextField::CommencementDate, "2024-01-15");
        wizard.update_field(FieldUpdate::SameAsResidential(true));
        wizard.go_next();

        for slot in DocumentSlot::ALL {
            wizard.update_field(FieldUpdate::Document(
                slot,
                Some(EncodedDocument::from_bytes("image/png", b"img")),
            ));
        }
        wizard.go_next();
        assert_eq!(wizard.state().current_step, Step::Review);
    }

    fn reach_payment(h: &mut Harness) {
        fill_steps_one_to_four(&mut h.wizard);
        h.wizard.toggle_terms();
        h.wizard.go_next();
        assert_eq!(h.wizard.state().current_step, Step::Payment);
    }

    #[test]
    fn test_labels_and_previous_availability() {
        let mut h = harness();
        assert_eq!(h.wizard.next_label(), "Next");
        assert!(!h.wizard.can_go_previous());
        assert!(!h.wizard.can_go_next());

        fill_steps_one_to_four(&mut h.wizard);
        assert_eq!(h.wizard.next_label(), "Proceed to Payment");
        assert!(h.wizard.can_go_previous());

        h.wizard.begin_operation("Working");
        assert!(!h.wizard.can_go_previous());
        assert!(!h.wizard.can_go_next());

        h.wizard.toggle_terms();
        h.wizard.go_next();
        assert!(!h.wizard.is_busy());
        assert_eq!(h.wizard.next_label(), "Complete Registration");
    }

    #[test]
    fn test_incomplete_step_does_not_advance() {
        let mut h = harness();
        h.wizard.go_next();
        assert_eq!(h.wizard.state().current_step, Step::NameCheck);
        assert_eq!(
            h.wizard.status_message(),
            Some("Required: Selected business name")
        );

        text(&mut h.wizard, TextField::SelectedBusinessName, "Ada Ventures");
        h.wizard.go_next();
        h.wizard.update_field(FieldUpdate::ApplicantType(ApplicantType::Organization));
        text(&mut h.wizard, TextField::OrganizationName, "Obi Holdings");
        h.wizard.go_next();
        assert_eq!(h.wizard.state().current_step, Step::ApplicantInfo);
    }

    #[test]
    fn test_review_issues_block_payment() {
        let mut h = harness();
        fill_steps_one_to_four(&mut h.wizard);
        h.wizard.go_next();

        assert_eq!(h.wizard.state().current_step, Step::Review);
        assert_eq!(
            h.wizard.errors().review,
            vec!["Terms and conditions must be accepted".to_string()]
        );
        assert_eq!(h.api.0.borrow().payment_inits, 0);
    }

    #[test]
    fn test_successful_payment_submits_once_and_confirms() {
        let mut h = harness();
        reach_payment(&mut h);

        let state = h.wizard.state();
        assert_eq!(state.payment_status, PaymentStatus::Initiating);
        assert_eq!(state.payment_reference, "PAY-1");
        assert_eq!(h.wizard.authorization_url(), Some("https://checkout.example/pay/abc"));
        assert_eq!(h.clipboard.0.borrow()[0], "https://checkout.example/pay/abc");
        assert!(h.storage.snapshot(RESUME_MARKER_KEY).is_none());

        h.api.0.borrow_mut().poll_statuses.push_back("success".to_string());
        let t0 = Instant::now();
        h.wizard.tick(t0);
        h.wizard.tick(t0 + Duration::from_secs(5));
        h.wizard.tick(t0 + Duration::from_secs(10));

        let backend = h.api.0.borrow();
        assert_eq!(backend.polls, 1);
        assert_eq!(backend.registrations.len(), 1);
        assert_eq!(
            backend.registrations[0].field("companyAddress"),
            Some("41 Limpopo Street")
        );
        assert_ne!(backend.registrations[0].field("transactionRef"), Some("PAY-1"));

        let state = h.wizard.state();
        assert_eq!(state.current_step, Step::Confirmation);
        assert!(state.submitted);
        assert_eq!(state.payment_status, PaymentStatus::Success);
        assert_eq!(state.application_reference, "BN-2024-0001");
        assert_eq!(h.wizard.next_label(), "Back to Home");
    }

    #[test]
    fn test_pending_payment_keeps_polling_without_submitting() {
        let mut h = harness();
        reach_payment(&mut h);

        let t0 = Instant::now();
        h.wizard.tick(t0);
        h.wizard.tick(t0 + Duration::from_secs(1));
        h.wizard.tick(t0 + Duration::from_secs(5));
        h.wizard.tick(t0 + Duration::from_secs(7));
        h.wizard.tick(t0 + Duration::from_secs(10));

        let backend = h.api.0.borrow();
        assert_eq!(backend.polls, 3);
        assert!(backend.registrations.is_empty());
        assert_eq!(h.wizard.state().current_step, Step::Payment);
        assert_eq!(h.wizard.state().payment_status, PaymentStatus::Initiating);
    }

    #[test]
    fn test_declined_payment_stops_polling() {
        let mut h = harness();
        reach_payment(&mut h);
        h.api.0.borrow_mut().poll_statuses.push_back("declined".to_string());

        let t0 = Instant::now();
        h.wizard.tick(t0);
        h.wizard.tick(t0 + Duration::from_secs(30));

        assert_eq!(h.api.0.borrow().polls, 1);
        assert_eq!(h.wizard.state().payment_status, PaymentStatus::Failed);
        assert!(h.wizard.errors().payment.is_some());
        assert!(h.api.0.borrow().registrations.is_empty());

        h.wizard.go_previous();
        h.wizard.go_next();
        assert_eq!(h.api.0.borrow().payment_inits, 2);
        assert_eq!(h.wizard.state().payment_reference, "PAY-2");
        assert_eq!(h.wizard.state().payment_status, PaymentStatus::Initiating);
    }

    #[test]
    fn test_returning_to_review_reuses_pending_checkout() {
        let mut h = harness();
        reach_payment(&mut h);

        h.wizard.go_previous();
        assert_eq!(h.wizard.state().current_step, Step::Review);
        h.wizard.go_next();

        assert_eq!(h.wizard.state().current_step, Step::Payment);
        assert_eq!(h.api.0.borrow().payment_inits, 1);
        assert_eq!(h.wizard.state().payment_reference, "PAY-1");
        assert_eq!(h.clipboard.0.borrow().len(), 2);
        assert_eq!(h.clipboard.0.borrow()[1], "https://checkout.example/pay/abc");

        h.api.0.borrow_mut().paid_references.push("PAY-1".to_string());
        h.wizard.tick(Instant::now());

        let backend = h.api.0.borrow();
        assert_eq!(backend.polled, vec!["PAY-1".to_string()]);
        assert_eq!(backend.registrations.len(), 1);
        drop(backend);
        assert!(h.wizard.state().submitted);
        assert_eq!(h.wizard.state().current_step, Step::Confirmation);
    }

    #[test]
    fn test_pending_checkout_after_restart_is_reused_without_link() {
        let mut h = harness();
        reach_payment(&mut h);

        let mut restarted = harness_with(h.storage.clone());
        restarted.wizard.start();
        assert_eq!(restarted.wizard.state().current_step, Step::Payment);
        restarted.wizard.go_previous();
        restarted.wizard.toggle_terms();
        restarted.wizard.go_next();

        assert_eq!(restarted.api.0.borrow().payment_inits, 0);
        assert_eq!(restarted.wizard.state().payment_reference, "PAY-1");
        assert!(restarted.clipboard.0.borrow().is_empty());
        assert!(restarted.wizard.status_message().unwrap().contains("PAY-1"));
    }

    /// Records whether the resume marker was stored at the moment the
    /// checkout link was handed over.
    struct MarkerAwareClipboard {
        storage: MemoryStorage,
        marker_seen: Rc<RefCell<Vec<bool>>>,
    }

    impl ClipboardSink for MarkerAwareClipboard {
        fn copy_text(&mut self, _text: &str) -> Result<(), ClipboardError> {
            self.marker_seen
                .borrow_mut()
                .push(self.storage.snapshot(RESUME_MARKER_KEY).is_some());
            Ok(())
        }
    }

    #[test]
    fn test_resume_marker_covers_only_the_hand_off() {
        let storage = MemoryStorage::new();
        let marker_seen = Rc::new(RefCell::new(Vec::new()));
        let mut wizard = WizardController::new(
            FieldStore::open(Box::new(storage.clone())),
            Box::new(FakeApi::default()),
            Box::new(MarkerAwareClipboard {
                storage: storage.clone(),
                marker_seen: Rc::clone(&marker_seen),
            }),
            WizardSettings::default(),
        );
        fill_steps_one_to_four(&mut wizard);
        wizard.toggle_terms();
        wizard.go_next();

        assert_eq!(*marker_seen.borrow(), vec![true]);
        assert!(storage.snapshot(RESUME_MARKER_KEY).is_none());
        assert_eq!(wizard.state().current_step, Step::Payment);
    }

    #[test]
    fn test_previous_is_ignored_while_busy() {
        let mut h = harness();
        fill_steps_one_to_four(&mut h.wizard);

        h.wizard.begin_operation("Working");
        h.wizard.go_previous();
        assert_eq!(h.wizard.state().current_step, Step::Review);
        assert!(h.wizard.is_busy());
    }

    #[test]
    fn test_failed_submission_is_reported_and_retried_by_user() {
        let mut h = harness();
        reach_payment(&mut h);
        {
            let mut backend = h.api.0.borrow_mut();
            backend.poll_statuses.push_back("success".to_string());
            backend
                .register_failures
                .push_back("Proposed name exists".to_string());
        }

        let t0 = Instant::now();
        h.wizard.tick(t0);
        h.wizard.tick(t0 + Duration::from_secs(5));

        assert_eq!(h.api.0.borrow().registrations.len(), 1);
        assert_eq!(
            h.wizard.errors().submission.as_deref(),
            Some("Proposed name exists")
        );
        assert!(h.wizard.errors().payment.is_none());
        assert_eq!(h.wizard.state().current_step, Step::Payment);
        assert!(!h.wizard.state().submitted);

        h.wizard.go_next();
        assert_eq!(h.api.0.borrow().registrations.len(), 2);
        assert!(h.wizard.errors().submission.is_none());
        assert_eq!(h.wizard.state().current_step, Step::Confirmation);
    }

    #[test]
    fn test_latch_blocks_second_automatic_submission() {
        let mut h = harness();
        reach_payment(&mut h);
        h.wizard.auto_submit("PAY-1");
        h.wizard.auto_submit("PAY-1");
        assert_eq!(h.api.0.borrow().registrations.len(), 1);
    }

    #[test]
    fn test_resume_marker_advances_once_at_start() {
        let mut storage = MemoryStorage::new();
        let mut saved = RegistrationState::default();
        saved.current_step = Step::Review;
        storage
            .set(STATE_KEY, &serde_json::to_string(&saved).unwrap())
            .unwrap();
        storage.set(RESUME_MARKER_KEY, "true").unwrap();

        let mut h = harness_with(storage);
        h.wizard.start();
        assert_eq!(h.wizard.state().current_step, Step::Payment);
        assert!(h.storage.snapshot(RESUME_MARKER_KEY).is_none());

        let mut again = harness_with(h.storage.clone());
        again.wizard.start();
        assert_eq!(again.wizard.state().current_step, Step::Payment);
    }

    #[test]
    fn test_name_check_auto_selects_first_available() {
        let mut h = harness();
        h.wizard.set_preferred_name(0, "Taken Ltd".to_string());
        h.wizard.set_preferred_name(1, "Ada Ventures".to_string());
        h.wizard.set_preferred_name(2, "<script>".to_string());
        h.wizard.check_names();

        assert_eq!(
            h.api.0.borrow().name_checks,
            vec!["Taken Ltd".to_string(), "Ada Ventures".to_string()]
        );
        assert_eq!(h.wizard.name_results().len(), 3);
        assert!(!h.wizard.name_results()[2].available);
        assert_eq!(h.wizard.state().selected_business_name, "Ada Ventures");
        assert!(!h.wizard.is_busy());

        assert!(!h.wizard.select_name(0));
        assert!(h.wizard.select_name(1));
        assert!(!h.wizard.select_name(9));
    }

    #[test]
    fn test_name_check_requires_a_name() {
        let mut h = harness();
        h.wizard.check_names();
        assert!(h.wizard.errors().name_check.is_some());
        assert!(h.api.0.borrow().name_checks.is_empty());
    }

    #[test]
    fn test_back_to_home_resets_everything() {
        let mut h = harness();
        reach_payment(&mut h);
        h.api.0.borrow_mut().poll_statuses.push_back("success".to_string());
        h.wizard.tick(Instant::now());
        assert_eq!(h.wizard.state().current_step, Step::Confirmation);

        h.wizard.go_next();
        assert_eq!(h.wizard.state(), &RegistrationState::default());
        assert!(!h.wizard.terms_accepted());
        assert!(h.storage.is_empty());
    }
}
