use crate::errors::AppError;

/// Collects field errors for a request body and turns them into a single
/// `AppError::Validation`.
#[derive(Debug, Default)]
pub struct FieldErrors(Vec<String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Option<String>) {
        if let Some(m) = message {
            self.0.push(m);
        }
    }

    pub fn into_result(self) -> Result<(), AppError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self.0.join("; ")))
        }
    }
}

/// 2-50 chars, alphanumeric and underscore only.
pub fn username(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.chars().count() < 2 || trimmed.chars().count() > 50 {
        return Some("Username must be between 2 and 50 characters".to_string());
    }
    if !trimmed.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Some("Username may only contain letters, numbers, and underscores".to_string());
    }
    None
}

/// Empty is allowed; otherwise must contain '@' and '.', max 254 chars.
pub fn email(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.len() > 254 || !trimmed.contains('@') || !trimmed.contains('.') {
        return Some("Email must be a valid address".to_string());
    }
    None
}

pub fn password(value: &str) -> Option<String> {
    if value.chars().count() < 8 {
        return Some("Password must be at least 8 characters".to_string());
    }
    None
}

pub fn required(value: &str, field_name: &str, max_len: usize) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Some(format!("{field_name} is required"));
    }
    max_length(trimmed, field_name, max_len)
}

pub fn max_length(value: &str, field_name: &str, max_len: usize) -> Option<String> {
    if value.chars().count() > max_len {
        return Some(format!("{field_name} must be at most {max_len} characters"));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_all_messages() {
        let mut errors = FieldErrors::new();
        errors.push(username("a"));
        errors.push(email("nope"));
        errors.push(password("longenough"));
        match errors.into_result() {
            Err(AppError::Validation(msg)) => {
                assert!(msg.contains("Username"));
                assert!(msg.contains("Email"));
                assert!(!msg.contains("Password"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn empty_collector_is_ok() {
        assert!(FieldErrors::new().into_result().is_ok());
    }

    #[test]
    fn required_trims_and_bounds() {
        assert!(required("   ", "Titre", 10).is_some());
        assert!(required("Projet", "Titre", 10).is_none());
        assert!(required("Projet trop long", "Titre", 10).is_some());
    }
}
