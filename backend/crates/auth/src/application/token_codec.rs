//! Token Codec
//!
//! Typed, signed, time-bounded tokens: compact JWS signed with HS256.
//! Header is `{"typ":"JWT","alg":"HS256"}`; claims are
//! `{"sub", "type", "iat", "exp"}` with `iat`/`exp` in epoch milliseconds.
//!
//! `jsonwebtoken` handles encoding and the signature. Its own `exp` check
//! works in seconds, so it is switched off and expiry is checked here.
//!
//! Verification fails closed and checks, in order: structure, signature,
//! expiry (`now >= exp`), kind.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::errors::{Error as JwtError, ErrorKind as JwtErrorKind};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use kernel::id::UserId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::config::{TokenTtls, duration_ms};
use crate::domain::value_object::token_kind::TokenKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,

    #[error("token signature does not match")]
    BadSignature,

    #[error("token has expired")]
    Expired,

    #[error("expected a {expected} token, got {actual}")]
    WrongKind { expected: TokenKind, actual: TokenKind },
}

impl From<JwtError> for TokenError {
    fn from(err: JwtError) -> Self {
        match err.kind() {
            JwtErrorKind::InvalidSignature => TokenError::BadSignature,
            _ => TokenError::Malformed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SigningKeyError {
    #[error("signing key must be at least {min} bytes (got {actual})")]
    KeyTooShort { min: usize, actual: usize },
}

/// Process-wide HMAC key. Cheap to clone; `Debug` never shows the bytes.
#[derive(Clone)]
pub struct SigningKey(Arc<[u8]>);

impl SigningKey {
    pub const MIN_LEN: usize = 32;

    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self, SigningKeyError> {
        let bytes = bytes.into();
        if bytes.len() < Self::MIN_LEN {
            return Err(SigningKeyError::KeyTooShort {
                min: Self::MIN_LEN,
                actual: bytes.len(),
            });
        }
        Ok(Self(bytes.into()))
    }

    fn encoding_key(&self) -> EncodingKey {
        EncodingKey::from_secret(&self.0)
    }

    fn decoding_key(&self) -> DecodingKey {
        DecodingKey::from_secret(&self.0)
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SigningKey").field(&"[REDACTED]").finish()
    }
}

/// Verified token contents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    pub subject: String,
    pub kind: TokenKind,
    pub issued_at_ms: i64,
    pub expires_at_ms: i64,
}

impl Claims {
    /// Subjects are always user ids.
    pub fn user_id(&self) -> Result<UserId, TokenError> {
        self.subject.parse().map_err(|_| TokenError::Malformed)
    }
}

#[derive(Serialize, Deserialize)]
struct WireClaims {
    sub: String,
    #[serde(rename = "type")]
    kind: TokenKind,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Clone)]
pub struct TokenCodec {
    key: SigningKey,
    ttls: TokenTtls,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(key: SigningKey, ttls: TokenTtls) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        Self {
            key,
            ttls,
            validation,
        }
    }

    pub fn ttls(&self) -> &TokenTtls {
        &self.ttls
    }

    pub fn issue(&self, subject: &str, kind: TokenKind, ttl: Duration) -> String {
        self.issue_at(subject, kind, ttl, Utc::now().timestamp_millis())
    }

    pub fn issue_at(&self, subject: &str, kind: TokenKind, ttl: Duration, now_ms: i64) -> String {
        let claims = WireClaims {
            sub: subject.to_string(),
            kind,
            iat: now_ms,
            exp: now_ms.saturating_add(duration_ms(ttl)),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.key.encoding_key(),
        )
        .expect("HS256 can sign any serializable claims")
    }

    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<Claims, TokenError> {
        self.verify_at(token, expected, Utc::now().timestamp_millis())
    }

    pub fn verify_at(
        &self,
        token: &str,
        expected: TokenKind,
        now_ms: i64,
    ) -> Result<Claims, TokenError> {
        let claims =
            decode::<WireClaims>(token, &self.key.decoding_key(), &self.validation)?.claims;

        if now_ms >= claims.exp {
            return Err(TokenError::Expired);
        }
        if claims.kind != expected {
            return Err(TokenError::WrongKind {
                expected,
                actual: claims.kind,
            });
        }

        Ok(Claims {
            subject: claims.sub,
            kind: claims.kind,
            issued_at_ms: claims.iat,
            expires_at_ms: claims.exp,
        })
    }

    fn issue_for(&self, user_id: &UserId, kind: TokenKind) -> String {
        self.issue(&user_id.to_string(), kind, self.ttls.for_kind(kind))
    }

    pub fn issue_access(&self, user_id: &UserId) -> String {
        self.issue_for(user_id, TokenKind::Access)
    }

    pub fn issue_refresh(&self, user_id: &UserId) -> String {
        self.issue_for(user_id, TokenKind::Refresh)
    }

    pub fn issue_verification(&self, user_id: &UserId) -> String {
        self.issue_for(user_id, TokenKind::Verification)
    }

    pub fn issue_password_reset(&self, user_id: &UserId) -> String {
        self.issue_for(user_id, TokenKind::PasswordReset)
    }
}
