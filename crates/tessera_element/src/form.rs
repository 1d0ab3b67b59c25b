//! Form participation
//!
//! A form-capable component supplies a [`FormParticipant`]. After every
//! commit the submission value is pushed unconditionally; validity is only
//! recomputed while connected and only pushed when a flag changed.

use tessera_host::{FormInternals, ValidityFlags};

/// Result of validating one state
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Validation {
    pub flags: ValidityFlags,
    pub message: String,
}

impl Validation {
    pub fn valid() -> Self {
        Self::default()
    }

    pub fn invalid(flags: ValidityFlags, message: impl Into<String>) -> Self {
        Self {
            flags,
            message: message.into(),
        }
    }
}

/// Derives form data from component state
pub trait FormParticipant<S> {
    /// String submitted with the owning form
    fn form_value(&self, state: &S) -> String;

    fn validate(&self, _state: &S) -> Validation {
        Validation::valid()
    }
}

/// A participant built from closures
pub struct FormFns<S> {
    value: Box<dyn Fn(&S) -> String>,
    validate: Option<Box<dyn Fn(&S) -> Validation>>,
}

impl<S> FormFns<S> {
    pub fn new<F>(value: F) -> Self
    where
        F: Fn(&S) -> String + 'static,
    {
        Self {
            value: Box::new(value),
            validate: None,
        }
    }

    pub fn validate<F>(mut self, validate: F) -> Self
    where
        F: Fn(&S) -> Validation + 'static,
    {
        self.validate = Some(Box::new(validate));
        self
    }
}

impl<S> FormParticipant<S> for FormFns<S> {
    fn form_value(&self, state: &S) -> String {
        (self.value)(state)
    }

    fn validate(&self, state: &S) -> Validation {
        match &self.validate {
            Some(validate) => validate(state),
            None => Validation::valid(),
        }
    }
}

/// Last pushed validity for one instance
#[derive(Debug, Default)]
pub struct FormSync {
    last: ValidityFlags,
}

impl FormSync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push the current state's form data; returns whether validity was pushed
    pub fn sync<S>(
        &mut self,
        participant: &dyn FormParticipant<S>,
        state: &S,
        internals: &mut FormInternals,
        connected: bool,
    ) -> bool {
        internals.set_form_value(participant.form_value(state));
        if !connected {
            return false;
        }

        let Validation { flags, message } = participant.validate(state);
        if flags == self.last {
            return false;
        }
        tracing::debug!(?flags, %message, "validity pushed");
        internals.set_validity(flags, message);
        self.last = flags;
        true
    }

    pub fn last(&self) -> ValidityFlags {
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn required() -> FormFns<String> {
        FormFns::new(|s: &String| s.clone()).validate(|s| {
            if s.is_empty() {
                Validation::invalid(ValidityFlags::VALUE_MISSING, "Please fill out this field")
            } else {
                Validation::valid()
            }
        })
    }

    #[test]
    fn test_value_pushed_even_when_disconnected() {
        let participant = required();
        let mut sync = FormSync::new();
        let mut internals = FormInternals::new();

        assert!(!sync.sync(&participant, &String::new(), &mut internals, false));
        assert_eq!(internals.value_pushes(), 1);
        assert_eq!(internals.validity_pushes(), 0);
    }

    #[test]
    fn test_validity_pushed_only_on_flag_change() {
        let participant = required();
        let mut sync = FormSync::new();
        let mut internals = FormInternals::new();

        assert!(sync.sync(&participant, &String::new(), &mut internals, true));
        assert!(!sync.sync(&participant, &String::new(), &mut internals, true));
        assert_eq!(internals.validity_pushes(), 1);
        assert_eq!(internals.validation_message(), "Please fill out this field");

        assert!(sync.sync(&participant, &"ok".to_string(), &mut internals, true));
        assert!(internals.check_validity());
        assert_eq!(internals.value_pushes(), 3);
        assert_eq!(internals.form_value(), Some("ok"));
    }

    #[test]
    fn test_valid_from_the_start_needs_no_push() {
        let participant = FormFns::new(|n: &u32| n.to_string());
        let mut sync = FormSync::new();
        let mut internals = FormInternals::new();

        assert!(!sync.sync(&participant, &7u32, &mut internals, true));
        assert_eq!(internals.validity_pushes(), 0);
        assert_eq!(sync.last(), ValidityFlags::empty());
    }
}
