//! Signup password rules.
//!
//! Every rule is checked so a signup form can list all of the problems at
//! once instead of revealing them one submit at a time.

use core::fmt;

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// A single password requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PasswordRule {
    MinLength,
    Uppercase,
    Lowercase,
    Digit,
    Special,
}

impl PasswordRule {
    /// Human-readable requirement text.
    #[must_use]
    pub const fn requirement(self) -> &'static str {
        match self {
            Self::MinLength => "at least 8 characters",
            Self::Uppercase => "an uppercase letter",
            Self::Lowercase => "a lowercase letter",
            Self::Digit => "a number",
            Self::Special => "a special character",
        }
    }
}

/// Password failed one or more rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordError {
    /// Failed rules, in declaration order.
    pub failed: Vec<PasswordRule>,
}

impl fmt::Display for PasswordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("password must contain ")?;
        for (i, rule) in self.failed.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(rule.requirement())?;
        }
        Ok(())
    }
}

impl std::error::Error for PasswordError {}

/// Validate a signup password.
///
/// # Errors
///
/// Returns a [`PasswordError`] listing every rule the password breaks.
pub fn validate_password(password: &str) -> Result<(), PasswordError> {
    let mut failed = Vec::new();

    if password.chars().count() < MIN_PASSWORD_LENGTH {
        failed.push(PasswordRule::MinLength);
    }
    if !password.chars().any(char::is_uppercase) {
        failed.push(PasswordRule::Uppercase);
    }
    if !password.chars().any(char::is_lowercase) {
        failed.push(PasswordRule::Lowercase);
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        failed.push(PasswordRule::Digit);
    }
    if !password
        .chars()
        .any(|c| !c.is_alphanumeric() && !c.is_whitespace())
    {
        failed.push(PasswordRule::Special);
    }

    if failed.is_empty() {
        Ok(())
    } else {
        Err(PasswordError { failed })
    }
}
