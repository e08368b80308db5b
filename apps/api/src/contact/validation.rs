use crate::mail_client::ContactMessage;

const MAX_FIELD_LEN: usize = 200;
const MAX_MESSAGE_LEN: usize = 5000;

/// Checks a submission and returns it with surrounding whitespace trimmed.
/// The error string is shown to the visitor as-is.
pub fn validate_contact(input: ContactMessage) -> Result<ContactMessage, String> {
    let message = ContactMessage {
        name: input.name.trim().to_string(),
        email: input.email.trim().to_string(),
        subject: input.subject.trim().to_string(),
        message: input.message.trim().to_string(),
    };

    let required = [
        ("name", &message.name),
        ("email", &message.email),
        ("subject", &message.subject),
        ("message", &message.message),
    ];
    if let Some((field, _)) = required.iter().find(|(_, v)| v.is_empty()) {
        return Err(format!("Field '{field}' is required"));
    }

    if !is_plausible_email(&message.email) {
        return Err("Please provide a valid email address".to_string());
    }

    for (field, value) in &required[..3] {
        if value.chars().count() > MAX_FIELD_LEN {
            return Err(format!(
                "Field '{field}' must be at most {MAX_FIELD_LEN} characters"
            ));
        }
    }
    if message.message.chars().count() > MAX_MESSAGE_LEN {
        return Err(format!(
            "Message must be at most {MAX_MESSAGE_LEN} characters"
        ));
    }

    Ok(message)
}

/// `local@domain` with a non-empty local part and a dot in the domain.
fn is_plausible_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && domain.contains('.')
        && !email.chars().any(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(name: &str, email: &str, subject: &str, message: &str) -> ContactMessage {
        ContactMessage {
            name: name.into(),
            email: email.into(),
            subject: subject.into(),
            message: message.into(),
        }
    }

    #[test]
    fn test_valid_submission_is_trimmed() {
        let ok = validate_contact(input(" Grace ", "grace@example.com ", "Hi", " Hello\n")).unwrap();
        assert_eq!(ok.name, "Grace");
        assert_eq!(ok.email, "grace@example.com");
        assert_eq!(ok.message, "Hello");
    }

    #[test]
    fn test_blank_fields_rejected() {
        let err = validate_contact(input("Grace", "grace@example.com", "   ", "Hello")).unwrap_err();
        assert_eq!(err, "Field 'subject' is required");
        let err = validate_contact(input("", "", "", "")).unwrap_err();
        assert_eq!(err, "Field 'name' is required");
    }

    #[test]
    fn test_email_shape_checked() {
        for bad in ["grace", "@example.com", "grace@localhost", "grace@.com", "gr ace@example.com"] {
            assert!(
                validate_contact(input("Grace", bad, "Hi", "Hello")).is_err(),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_overlong_message_rejected() {
        let long = "x".repeat(MAX_MESSAGE_LEN + 1);
        assert!(validate_contact(input("Grace", "g@example.com", "Hi", &long)).is_err());
    }
}
