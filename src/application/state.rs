//! Terminal UI state for the registration wizard.
//!
//! [`App`] wraps the [`WizardController`] with what only the terminal needs:
//! which form item has focus, the edit buffer, and the help overlay.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

use super::wizard::WizardController;
use crate::domain::{ApplicantType, DocumentSlot, FieldUpdate, Step, TextField};

/// Represents the current mode of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    /// Moving between form items
    Normal,
    /// Typing into the focused text field or document path
    Editing,
    /// Help screen is displayed
    Help,
}

/// One focusable row of the current step's form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormItem {
    PreferredName(usize),
    CheckNames,
    NameResult(usize),
    ApplicantType,
    Gender,
    Text(TextField),
    SameAsResidential,
    Document(DocumentSlot),
    Terms,
}

/// Work that blocks on the network. Queued so a frame showing the busy
/// state is drawn before the request starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingAction {
    Next,
    CheckNames,
}

const INDIVIDUAL_FIELDS: [TextField; 14] = [
    TextField::Title,
    TextField::FirstName,
    TextField::MiddleName,
    TextField::LastName,
    TextField::DateOfBirth,
    TextField::Nationality,
    TextField::Phone,
    TextField::Email,
    TextField::ResidentialAddress,
    TextField::ResidentialStreetNumber,
    TextField::ResidentialCity,
    TextField::ResidentialState,
    TextField::ResidentialPostcode,
    TextField::ResidentialLga,
];

const ORGANIZATION_FIELDS: [TextField; 4] = [
    TextField::OrganizationName,
    TextField::RcNumber,
    TextField::OrganizationEmail,
    TextField::Phone,
];

const BUSINESS_ADDRESS_FIELDS: [TextField; 4] = [
    TextField::BusinessAddress,
    TextField::BusinessStreetNumber,
    TextField::BusinessCity,
    TextField::BusinessState,
];

pub struct App {
    pub wizard: WizardController,
    /// Index into [`App::form_items`]
    pub focus: usize,
    pub mode: AppMode,
    /// Edit buffer while in [`AppMode::Editing`]
    pub input: String,
    /// Cursor position within the input buffer, in characters
    pub cursor_position: usize,
    pub help_scroll: usize,
    pub pending: Option<PendingAction>,
    pub should_quit: bool,
    /// Raised by the store listener when the current step changes
    step_changed: Rc<Cell<bool>>,
}

impl App {
    pub fn new(mut wizard: WizardController) -> Self {
        let step_changed = Rc::new(Cell::new(false));
        let flag = Rc::clone(&step_changed);
        let mut shown = wizard.state().current_step;
        wizard.store_mut().subscribe(move |state| {
            if state.current_step != shown {
                shown = state.current_step;
                flag.set(true);
            }
        });

        Self {
            wizard,
            focus: 0,
            mode: AppMode::Normal,
            input: String::new(),
            cursor_position: 0,
            help_scroll: 0,
            pending: None,
            should_quit: false,
            step_changed,
        }
    }

    pub fn step(&self) -> Step {
        self.wizard.state().current_step
    }

    /// The focusable items of the current step, top to bottom.
    pub fn form_items(&self) -> Vec<FormItem> {
        let state = self.wizard.state();
        let mut items = Vec::new();
        match state.current_step {
            Step::NameCheck => {
                items.extend((0..state.preferred_names.len()).map(FormItem::PreferredName));
                items.push(FormItem::CheckNames);
                items.extend((0..self.wizard.name_results().len()).map(FormItem::NameResult));
            }
            Step::ApplicantInfo => {
                items.push(FormItem::ApplicantType);
                match state.applicant_type {
                    ApplicantType::Individual => {
                        items.extend(INDIVIDUAL_FIELDS[..5].iter().copied().map(FormItem::Text));
                        items.push(FormItem::Gender);
                        items.extend(INDIVIDUAL_FIELDS[5..].iter().copied().map(FormItem::Text));
                    }
                    ApplicantType::Organization => {
                        items.extend(ORGANIZATION_FIELDS.iter().copied().map(FormItem::Text));
                    }
                }
            }
            Step::BusinessDetails => {
                items.push(FormItem::Text(TextField::BusinessActivity));
                items.push(FormItem::Text(TextField::NatureOfBusiness));
                items.push(FormItem::SameAsResidential);
                if !state.same_as_residential {
                    items.extend(BUSINESS_ADDRESS_FIELDS.iter().copied().map(FormItem::Text));
                }
                items.push(FormItem::Text(TextField::BusinessPhone));
                items.push(FormItem::Text(TextField::BusinessEmail));
                items.push(FormItem::Text(TextField::CommencementDate));
            }
            Step::Documents => items.extend(DocumentSlot::ALL.iter().copied().map(FormItem::Document)),
            Step::Review => items.push(FormItem::Terms),
            Step::Payment | Step::Confirmation => {}
        }
        items
    }

    pub fn focused_item(&self) -> Option<FormItem> {
        self.form_items().get(self.focus).copied()
    }

    pub fn focus_next(&mut self) {
        let count = self.form_items().len();
        if count > 0 {
            self.focus = (self.focus + 1) % count;
        }
    }

    pub fn focus_previous(&mut self) {
        let count = self.form_items().len();
        if count > 0 {
            self.focus = (self.focus + count - 1) % count;
        }
    }

    /// Performs the focused item's action: edit, toggle, check or select.
    pub fn activate(&mut self) {
        let Some(item) = self.focused_item() else {
            return;
        };
        match item {
            FormItem::PreferredName(_) | FormItem::Text(_) | FormItem::Document(_) => {
                self.start_editing()
            }
            FormItem::CheckNames => self.request(PendingAction::CheckNames, "Checking availability..."),
            FormItem::NameResult(index) => {
                self.wizard.select_name(index);
            }
            FormItem::ApplicantType => {
                let next = self.wizard.state().applicant_type.toggled();
                self.wizard.update_field(FieldUpdate::ApplicantType(next));
            }
            FormItem::Gender => {
                let next = self.wizard.state().gender.cycled();
                self.wizard.update_field(FieldUpdate::Gender(next));
            }
            FormItem::SameAsResidential => {
                let next = !self.wizard.state().same_as_residential;
                self.wizard.update_field(FieldUpdate::SameAsResidential(next));
            }
            FormItem::Terms => self.wizard.toggle_terms(),
        }
        self.clamp_focus();
    }

    /// Switches to editing mode for the focused item.
    ///
    /// Text fields start from their current value; document slots start
    /// from an empty path.
    pub fn start_editing(&mut self) {
        let state = self.wizard.state();
        let current = match self.focused_item() {
            Some(FormItem::Text(field)) => state.text(field).to_string(),
            Some(FormItem::PreferredName(index)) => {
                state.preferred_names.get(index).cloned().unwrap_or_default()
            }
            Some(FormItem::Document(_)) => String::new(),
            _ => return,
        };
        self.cursor_position = current.chars().count();
        self.input = current;
        self.mode = AppMode::Editing;
    }

    /// Commits the edit buffer to the focused item.
    pub fn finish_editing(&mut self) {
        let value = std::mem::take(&mut self.input);
        match self.focused_item() {
            Some(FormItem::Text(field)) => self.wizard.update_field(FieldUpdate::Text(field, value)),
            Some(FormItem::PreferredName(index)) => self.wizard.set_preferred_name(index, value),
            Some(FormItem::Document(slot)) if !value.trim().is_empty() => {
                self.wizard.attach_document(slot, &value)
            }
            _ => {}
        }
        self.cursor_position = 0;
        self.mode = AppMode::Normal;
    }

    pub fn cancel_editing(&mut self) {
        self.input.clear();
        self.cursor_position = 0;
        self.mode = AppMode::Normal;
    }

    pub fn insert_char(&mut self, c: char) {
        let byte_index = self.byte_index();
        self.input.insert(byte_index, c);
        self.cursor_position += 1;
    }

    pub fn delete_char_before_cursor(&mut self) {
        if self.cursor_position == 0 {
            return;
        }
        self.cursor_position -= 1;
        let byte_index = self.byte_index();
        self.input.remove(byte_index);
    }

    pub fn move_cursor_left(&mut self) {
        self.cursor_position = self.cursor_position.saturating_sub(1);
    }

    pub fn move_cursor_right(&mut self) {
        self.cursor_position = (self.cursor_position + 1).min(self.input.chars().count());
    }

    fn byte_index(&self) -> usize {
        self.input
            .char_indices()
            .nth(self.cursor_position)
            .map(|(index, _)| index)
            .unwrap_or(self.input.len())
    }

    /// Clears the focused document slot.
    pub fn remove_focused_document(&mut self) {
        if let Some(FormItem::Document(slot)) = self.focused_item() {
            self.wizard.remove_document(slot);
        }
    }

    /// Queues "Next" when it can run, otherwise lets the controller report
    /// what is missing.
    pub fn request_next(&mut self) {
        if self.wizard.is_busy() {
            return;
        }
        if self.wizard.can_go_next() {
            self.request(PendingAction::Next, "Processing...");
        } else {
            self.wizard.go_next();
            self.follow_step_change();
        }
    }

    pub fn go_previous(&mut self) {
        self.wizard.go_previous();
        self.follow_step_change();
    }

    fn request(&mut self, action: PendingAction, message: &str) {
        if self.wizard.is_busy() {
            return;
        }
        self.wizard.begin_operation(message);
        self.pending = Some(action);
    }

    /// Runs the queued blocking action, if any. Returns whether one ran.
    pub fn run_pending(&mut self) -> bool {
        let Some(action) = self.pending.take() else {
            return false;
        };
        match action {
            PendingAction::Next => self.wizard.go_next(),
            PendingAction::CheckNames => self.wizard.check_names(),
        }
        self.follow_step_change();
        self.clamp_focus();
        true
    }

    pub fn tick(&mut self, now: Instant) {
        self.wizard.tick(now);
        self.follow_step_change();
    }

    /// Puts focus back on the first item after the wizard moved to another
    /// step.
    fn follow_step_change(&mut self) {
        if self.step_changed.replace(false) {
            self.focus = 0;
            self.mode = AppMode::Normal;
            self.input.clear();
        }
    }

    fn clamp_focus(&mut self) {
        let count = self.form_items().len();
        if self.focus >= count {
            self.focus = count.saturating_sub(1);
        }
    }

    pub fn show_help(&mut self) {
        self.help_scroll = 0;
        self.mode = AppMode::Help;
    }

    pub fn close_help(&mut self) {
        self.mode = AppMode::Normal;
    }
}
