//! Value Object Module

pub mod authority;
pub mod email;
pub mod token_kind;
pub mod user_status;
