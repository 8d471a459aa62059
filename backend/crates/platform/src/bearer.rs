//! `Authorization: Bearer` extraction (RFC 6750 §2.1)

use http::{HeaderMap, header};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BearerError {
    #[error("Authorization header is not valid ASCII")]
    InvalidEncoding,

    #[error("Bearer token is empty")]
    EmptyToken,
}

/// Extract the bearer credential from request headers.
///
/// - no `Authorization` header, or a different scheme ⇒ `Ok(None)`
/// - `Bearer` with an empty credential ⇒ `Err(EmptyToken)`
///
/// The scheme name is matched case-insensitively.
pub fn bearer_token(headers: &HeaderMap) -> Result<Option<&str>, BearerError> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value.to_str().map_err(|_| BearerError::InvalidEncoding)?;

    let (scheme, credential) = match value.split_once(' ') {
        Some((scheme, rest)) => (scheme, rest),
        None => (value, ""),
    };
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Ok(None);
    }

    let credential = credential.trim();
    if credential.is_empty() {
        return Err(BearerError::EmptyToken);
    }
    Ok(Some(credential))
}
