//! Form state machine for mutation dialogs

use crate::errors::ConsoleError;

/// Form status
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormStatus {
    /// Accepting input
    Editing,

    /// Request in flight; further submissions are refused
    Submitting,

    /// Last submission succeeded
    Succeeded,

    /// Last submission failed with the given detail
    Failed(String),
}

/// Form event
#[derive(Debug, Clone)]
pub enum FormEvent {
    /// Submit the current payload
    Submit,

    /// The server accepted the payload
    Success,

    /// The server rejected the payload
    Failure(String),

    /// The user changed a field
    Edit,
}

/// A dialog form holding a typed payload
#[derive(Debug, Clone)]
pub struct FormState<P> {
    payload: P,
    status: FormStatus,
    open: bool,
    idle_label: &'static str,
    busy_label: &'static str,
    reset_on_success: bool,
}

impl<P: Default + Clone> FormState<P> {
    /// Create a closed creation form with default field values.
    ///
    /// A successful submission resets the fields and closes the dialog.
    pub fn new(idle_label: &'static str, busy_label: &'static str) -> Self {
        Self {
            payload: P::default(),
            status: FormStatus::Editing,
            open: false,
            idle_label,
            busy_label,
            reset_on_success: true,
        }
    }

    /// Create a closed edit form over an existing entity's fields.
    ///
    /// A successful submission keeps the fields and leaves the dialog as is.
    pub fn for_update(idle_label: &'static str, busy_label: &'static str, payload: P) -> Self {
        Self {
            reset_on_success: false,
            ..Self::new(idle_label, busy_label).with_payload(payload)
        }
    }

    /// Start from a prepared payload (e.g. an entity being edited)
    pub fn with_payload(mut self, payload: P) -> Self {
        self.payload = payload;
        self
    }

    pub fn status(&self) -> &FormStatus {
        &self.status
    }

    pub fn payload(&self) -> &P {
        &self.payload
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn is_submitting(&self) -> bool {
        self.status == FormStatus::Submitting
    }

    /// Detail of the last failed submission
    pub fn error(&self) -> Option<&str> {
        match &self.status {
            FormStatus::Failed(detail) => Some(detail),
            _ => None,
        }
    }

    /// Text of the submit button
    pub fn submit_label(&self) -> &'static str {
        if self.is_submitting() {
            self.busy_label
        } else {
            self.idle_label
        }
    }

    pub fn open(&mut self) {
        self.open = true;
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    /// Change fields; refused while a submission is in flight
    pub fn edit(&mut self, f: impl FnOnce(&mut P)) -> Result<(), ConsoleError> {
        if self.is_submitting() {
            return Err(ConsoleError::FormError(
                "Form cannot be edited while submitting".to_string(),
            ));
        }
        f(&mut self.payload);
        if self.status != FormStatus::Editing {
            self.process(FormEvent::Edit)?;
        }
        Ok(())
    }

    /// Enter `Submitting` and hand out the payload to send
    pub fn begin_submit(&mut self) -> Result<P, ConsoleError> {
        self.process(FormEvent::Submit)?;
        Ok(self.payload.clone())
    }

    pub fn resets_on_success(&self) -> bool {
        self.reset_on_success
    }

    /// The server accepted the payload; creation forms reset and close
    pub fn succeed(&mut self) -> Result<(), ConsoleError> {
        self.process(FormEvent::Success)?;
        if self.reset_on_success {
            self.payload = P::default();
            self.open = false;
        }
        Ok(())
    }

    /// The server rejected the payload; fields and dialog stay as they are
    pub fn fail(&mut self, detail: impl Into<String>) -> Result<(), ConsoleError> {
        self.process(FormEvent::Failure(detail.into()))
    }

    /// Process an event and transition state
    pub fn process(&mut self, event: FormEvent) -> Result<(), ConsoleError> {
        let new_status = match (&self.status, event) {
            (FormStatus::Submitting, FormEvent::Submit) => {
                return Err(ConsoleError::FormError(
                    "A submission is already in progress".to_string(),
                ));
            }
            (_, FormEvent::Submit) => FormStatus::Submitting,

            (FormStatus::Submitting, FormEvent::Success) => FormStatus::Succeeded,
            (FormStatus::Submitting, FormEvent::Failure(detail)) => FormStatus::Failed(detail),

            (FormStatus::Succeeded | FormStatus::Failed(_), FormEvent::Edit) => FormStatus::Editing,

            (status, event) => {
                return Err(ConsoleError::FormError(format!(
                    "Invalid transition: {:?} -> {:?}",
                    status, event
                )));
            }
        };

        self.status = new_status;
        Ok(())
    }
}
