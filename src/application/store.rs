//! The field store: single owner of the registration state.
//!
//! Every accepted mutation is written through to [`SessionStorage`] right
//! away, so a restart (or a trip to the payment page) picks up exactly where
//! the user left off. Storage problems never fail a mutation; the in-memory
//! state stays authoritative and the failure is logged.

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::{
    FieldUpdate, RegistrationState, StateError, SubmissionError, TextField, build_submission,
};
use crate::infrastructure::{ApiError, RegistrationApi, SessionStorage};

/// Storage key of the serialized state.
pub const STATE_KEY: &str = "bn-registration";
/// Storage key of the "external payment in progress" marker.
pub const RESUME_MARKER_KEY: &str = "external-payment-pending";

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Build(#[from] SubmissionError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("registration was not acknowledged with a transaction reference")]
    UnexpectedAcknowledgement,
    #[error(transparent)]
    State(#[from] StateError),
}

pub type ListenerId = usize;
type Listener = Box<dyn FnMut(&RegistrationState)>;

pub struct FieldStore {
    state: RegistrationState,
    storage: Box<dyn SessionStorage>,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener: ListenerId,
}

impl FieldStore {
    /// Opens the store over `storage`, restoring a previous session if one
    /// was saved and still parses.
    pub fn open(storage: Box<dyn SessionStorage>) -> Self {
        let state = match storage.get(STATE_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<RegistrationState>(&raw) {
                Ok(state) => {
                    info!(step = state.current_step.number(), "restored saved session");
                    state
                }
                Err(e) => {
                    warn!(error = %e, "saved session is unreadable, starting fresh");
                    RegistrationState::default()
                }
            },
            Ok(None) => RegistrationState::default(),
            Err(e) => {
                warn!(error = %e, "could not read saved session, starting fresh");
                RegistrationState::default()
            }
        };

        Self {
            state,
            storage,
            listeners: Vec::new(),
            next_listener: 0,
        }
    }

    pub fn state(&self) -> &RegistrationState {
        &self.state
    }

    /// Replaces one field.
    ///
    /// # Errors
    ///
    /// Rejected payment-status transitions leave the state unchanged.
    pub fn update_field(&mut self, update: FieldUpdate) -> Result<(), StateError> {
        self.state.apply(update)?;
        self.commit();
        Ok(())
    }

    pub fn advance_step(&mut self) {
        let from = self.state.current_step;
        self.state.advance();
        debug!(from = from.number(), to = self.state.current_step.number(), "advanced");
        self.commit();
    }

    pub fn retreat_step(&mut self) {
        self.state.retreat();
        self.commit();
    }

    /// Restores the default record and clears everything in storage.
    pub fn reset(&mut self) {
        self.state = RegistrationState::default();
        for key in [STATE_KEY, RESUME_MARKER_KEY] {
            if let Err(e) = self.storage.remove(key) {
                warn!(error = %e, key, "failed to clear session storage");
            }
        }
        info!("session reset");
        self.notify();
    }

    /// Builds the multipart payload from the current state and posts it.
    ///
    /// On acknowledgement the returned transaction reference is stored as
    /// both application ID and reference and the state is marked submitted.
    pub fn submit(
        &mut self,
        api: &dyn RegistrationApi,
        transaction_ref: &str,
    ) -> Result<String, SubmitError> {
        let payload = build_submission(&self.state, transaction_ref)?;
        let ack = api.register(&payload)?;
        let reference = ack
            .transaction_ref
            .filter(|r| !r.trim().is_empty())
            .ok_or(SubmitError::UnexpectedAcknowledgement)?;

        self.state
            .apply(FieldUpdate::Text(TextField::ApplicationId, reference.clone()))?;
        self.state.apply(FieldUpdate::Text(
            TextField::ApplicationReference,
            reference.clone(),
        ))?;
        self.state.submitted = true;
        info!(%reference, "registration submitted");
        self.commit();
        Ok(reference)
    }

    pub fn set_resume_marker(&mut self) {
        if let Err(e) = self.storage.set(RESUME_MARKER_KEY, "true") {
            warn!(error = %e, "failed to record payment redirect");
        }
    }

    /// Reads and clears the resume marker. Returns whether it was set.
    pub fn take_resume_marker(&mut self) -> bool {
        let present = match self.storage.get(RESUME_MARKER_KEY) {
            Ok(value) => value.as_deref() == Some("true"),
            Err(e) => {
                warn!(error = %e, "failed to read payment redirect marker");
                false
            }
        };
        if let Err(e) = self.storage.remove(RESUME_MARKER_KEY) {
            warn!(error = %e, "failed to clear payment redirect marker");
        }
        present
    }

    /// Registers a callback run with the new state after every mutation.
    pub fn subscribe(&mut self, listener: impl FnMut(&RegistrationState) + 'static) -> ListenerId {
        let id = self.next_listener;
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener, _)| *listener != id);
        self.listeners.len() != before
    }

    fn commit(&mut self) {
        self.persist();
        self.notify();
    }

    fn persist(&mut self) {
        let result = serde_json::to_string(&self.state)
            .map_err(|e| e.to_string())
            .and_then(|json| self.storage.set(STATE_KEY, &json).map_err(|e| e.to_string()));
        if let Err(e) = result {
            warn!(error = %e, "failed to persist session, continuing in memory");
        }
    }

    fn notify(&mut self) {
        for (_, listener) in self.listeners.iter_mut() {
            listener(&self.state);
        }
    }
}
