//! Form-association internals
//!
//! The facility a form-capable element pushes its submission value and
//! validity into. Push counters make redundant host calls observable.

use bitflags::bitflags;

bitflags! {
    /// The ten standard constraint-validation flags
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ValidityFlags: u16 {
        const VALUE_MISSING = 1 << 0;
        const TYPE_MISMATCH = 1 << 1;
        const PATTERN_MISMATCH = 1 << 2;
        const TOO_LONG = 1 << 3;
        const TOO_SHORT = 1 << 4;
        const RANGE_UNDERFLOW = 1 << 5;
        const RANGE_OVERFLOW = 1 << 6;
        const STEP_MISMATCH = 1 << 7;
        const BAD_INPUT = 1 << 8;
        const CUSTOM_ERROR = 1 << 9;
    }
}

impl ValidityFlags {
    /// Flag names as used by the host platform
    pub const NAMED: [(&'static str, ValidityFlags); 10] = [
        ("valueMissing", ValidityFlags::VALUE_MISSING),
        ("typeMismatch", ValidityFlags::TYPE_MISMATCH),
        ("patternMismatch", ValidityFlags::PATTERN_MISMATCH),
        ("tooLong", ValidityFlags::TOO_LONG),
        ("tooShort", ValidityFlags::TOO_SHORT),
        ("rangeUnderflow", ValidityFlags::RANGE_UNDERFLOW),
        ("rangeOverflow", ValidityFlags::RANGE_OVERFLOW),
        ("stepMismatch", ValidityFlags::STEP_MISMATCH),
        ("badInput", ValidityFlags::BAD_INPUT),
        ("customError", ValidityFlags::CUSTOM_ERROR),
    ];

    /// Build from `(name, set)` pairs; absent and unknown names stay unset
    pub fn from_named<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, bool)>,
    {
        pairs
            .into_iter()
            .filter(|(_, set)| *set)
            .filter_map(|(name, _)| {
                Self::NAMED
                    .iter()
                    .find(|(known, _)| *known == name)
                    .map(|(_, flag)| *flag)
            })
            .fold(ValidityFlags::empty(), |acc, flag| acc | flag)
    }

    /// A value is valid when no flag is set
    pub fn is_valid(&self) -> bool {
        self.is_empty()
    }
}

/// Per-element form-association state
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FormInternals {
    value: Option<String>,
    validity: ValidityFlags,
    message: String,
    value_pushes: u64,
    validity_pushes: u64,
}

impl FormInternals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the submission value
    pub fn set_form_value(&mut self, value: impl Into<String>) {
        self.value = Some(value.into());
        self.value_pushes += 1;
    }

    /// Set validity flags and the validation message
    pub fn set_validity(&mut self, flags: ValidityFlags, message: impl Into<String>) {
        self.validity = flags;
        self.message = message.into();
        self.validity_pushes += 1;
    }

    pub fn form_value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn validity(&self) -> ValidityFlags {
        self.validity
    }

    pub fn validation_message(&self) -> &str {
        &self.message
    }

    pub fn check_validity(&self) -> bool {
        self.validity.is_valid()
    }

    pub fn value_pushes(&self) -> u64 {
        self.value_pushes
    }

    pub fn validity_pushes(&self) -> u64 {
        self.validity_pushes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_named_ignores_missing_and_unknown() {
        let flags = ValidityFlags::from_named([
            ("valueMissing", true),
            ("tooLong", false),
            ("bogus", true),
        ]);
        assert_eq!(flags, ValidityFlags::VALUE_MISSING);
        assert!(ValidityFlags::from_named([]).is_valid());
    }

    #[test]
    fn test_push_counters() {
        let mut internals = FormInternals::new();
        internals.set_form_value("a");
        internals.set_form_value("b");
        internals.set_validity(ValidityFlags::TOO_SHORT, "Too short");

        assert_eq!(internals.form_value(), Some("b"));
        assert_eq!(internals.value_pushes(), 2);
        assert_eq!(internals.validity_pushes(), 1);
        assert!(!internals.check_validity());
        assert_eq!(internals.validation_message(), "Too short");
    }
}
