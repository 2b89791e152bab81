//! Form state for issuing a ticket.

use std::fmt;

use tracing::warn;

use crate::error::{Error, Result};
use crate::qr::QrEncoder;
use crate::ticket::{Identity, TicketRecord};

/// One of the four input fields on the ticket form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormField {
    /// Given name.
    FirstName,
    /// Family name.
    LastName,
    /// Display nickname.
    Nickname,
    /// Contact email address.
    Email,
}

impl FormField {
    /// All fields, in display order.
    pub const ALL: [FormField; 4] = [
        FormField::FirstName,
        FormField::LastName,
        FormField::Nickname,
        FormField::Email,
    ];

    /// Human-readable label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::FirstName => "First Name",
            Self::LastName => "Last Name",
            Self::Nickname => "Nickname",
            Self::Email => "Email",
        }
    }
}

impl fmt::Display for FormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The ticket form: four text fields and the submit gate.
///
/// Submission is only possible once every field is non-empty. A successful
/// [`submit`](TicketForm::submit) clears the form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicketForm {
    first_name: String,
    last_name: String,
    nickname: String,
    email: String,
}

impl TicketForm {
    /// Create an empty form.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of a field.
    #[must_use]
    pub fn get(&self, field: FormField) -> &str {
        match field {
            FormField::FirstName => &self.first_name,
            FormField::LastName => &self.last_name,
            FormField::Nickname => &self.nickname,
            FormField::Email => &self.email,
        }
    }

    /// Replace the value of a field.
    pub fn set(&mut self, field: FormField, value: impl Into<String>) {
        let slot = match field {
            FormField::FirstName => &mut self.first_name,
            FormField::LastName => &mut self.last_name,
            FormField::Nickname => &mut self.nickname,
            FormField::Email => &mut self.email,
        };
        *slot = value.into();
    }

    /// Builder-style [`set`](TicketForm::set).
    #[must_use]
    pub fn with(mut self, field: FormField, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }

    /// Fields that are still empty, in display order.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<FormField> {
        FormField::ALL
            .into_iter()
            .filter(|f| self.get(*f).is_empty())
            .collect()
    }

    /// True iff all four fields are non-empty.
    #[must_use]
    pub fn can_submit(&self) -> bool {
        FormField::ALL.iter().all(|f| !self.get(*f).is_empty())
    }

    /// Reset every field to the empty string.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Snapshot the fields as an [`Identity`] without submitting.
    #[must_use]
    pub fn identity(&self) -> Identity {
        Identity::new(
            self.first_name.clone(),
            self.last_name.clone(),
            self.nickname.clone(),
            self.email.clone(),
        )
    }

    /// Build a ticket from the form and clear it.
    ///
    /// The QR image is generated with `encoder`; an encoding failure is
    /// logged and the ticket is issued without an image.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IncompleteForm`] (leaving the form untouched) if any
    /// field is empty.
    pub fn submit(&mut self, encoder: &dyn QrEncoder) -> Result<TicketRecord> {
        let missing = self.missing_fields();
        if !missing.is_empty() {
            return Err(Error::IncompleteForm { missing });
        }

        let identity = std::mem::take(self).identity();
        let image = match encoder.encode(&identity.qr_payload()) {
            Ok(img) => Some(img),
            Err(e) => {
                warn!("Issuing ticket without QR image: {}", e);
                None
            }
        };

        Ok(TicketRecord::new(identity, image.as_ref()))
    }

    /// Like [`submit`](TicketForm::submit) but never generates a QR image.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IncompleteForm`] if any field is empty.
    pub fn submit_without_qr(&mut self) -> Result<TicketRecord> {
        let missing = self.missing_fields();
        if !missing.is_empty() {
            return Err(Error::IncompleteForm { missing });
        }
        Ok(TicketRecord::new(std::mem::take(self).identity(), None))
    }
}
