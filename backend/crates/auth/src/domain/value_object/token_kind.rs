//! Token Kind
//!
//! Carried in the `type` claim. A token is only ever accepted for the kind
//! it was issued as.

use derive_more::Display;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenKind {
    #[display("ACCESS")]
    Access,
    #[display("REFRESH")]
    Refresh,
    #[display("VERIFICATION")]
    Verification,
    #[display("PASSWORD_RESET")]
    PasswordReset,
}

impl TokenKind {
    pub const ALL: [TokenKind; 4] = [
        TokenKind::Access,
        TokenKind::Refresh,
        TokenKind::Verification,
        TokenKind::PasswordReset,
    ];
}
