//! `Authorization` header parsing.

use crate::api::VerificationError;

/// Extract the credential from an `Authorization` header value.
///
/// The scheme is matched case-insensitively. A header that is present but is
/// not a bearer credential is `Malformed`; it is never treated as anonymous.
///
/// # Errors
/// `VerificationError::Malformed` for any other scheme or an empty credential.
pub fn parse_bearer(header: &str) -> Result<&str, VerificationError> {
    let (scheme, rest) = header
        .trim()
        .split_once(' ')
        .ok_or_else(|| VerificationError::Malformed("missing authorization scheme".to_owned()))?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(VerificationError::Malformed(
            "unsupported authorization scheme".to_owned(),
        ));
    }

    let token = rest.trim();
    if token.is_empty() || token.contains(char::is_whitespace) {
        return Err(VerificationError::Malformed(
            "bearer credential is empty or contains whitespace".to_owned(),
        ));
    }
    Ok(token)
}
