//! Name and email normalisation shared by directory records.

use hrdesk_core::{DomainError, DomainResult};

/// Case-fold a unique name (department, role).
///
/// Leading/trailing whitespace is dropped; an empty result is rejected.
pub fn fold_name(kind: &str, raw: &str) -> DomainResult<String> {
    let folded = raw.trim().to_lowercase();
    if folded.is_empty() {
        return Err(DomainError::validation(format!("{kind} name cannot be empty")));
    }
    Ok(folded)
}

/// Lower-case and minimally validate an email address.
pub fn normalize_email(raw: &str) -> DomainResult<String> {
    let email = raw.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain))
            if !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.') =>
        {
            Ok(email)
        }
        _ => Err(DomainError::validation(format!("invalid email address: '{raw}'"))),
    }
}

/// Trim an optional free-text field, mapping blanks to `None`.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn names_are_case_folded() {
        assert_eq!(fold_name("department", "  Ecommerce ").unwrap(), "ecommerce");
        assert!(matches!(fold_name("role", "   "), Err(DomainError::Validation(_))));
    }

    #[test]
    fn emails_are_lowercased_and_checked() {
        assert_eq!(normalize_email(" Jane.Doe@Example.COM ").unwrap(), "jane.doe@example.com");
        assert!(normalize_email("no-at-sign").is_err());
        assert!(normalize_email("@example.com").is_err());
        assert!(normalize_email("jane@localhost").is_err());
    }

    proptest! {
        #[test]
        fn folding_is_idempotent(raw in "[A-Za-z ]{1,16}[A-Za-z]") {
            let once = fold_name("x", &raw).unwrap();
            prop_assert_eq!(fold_name("x", &once).unwrap(), once);
        }
    }
}
