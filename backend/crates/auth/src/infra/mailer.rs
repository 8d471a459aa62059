//! Log Mailer
//!
//! Development mailer: records that a message would have been sent.
//! Tokens stay out of the log unless token logging is switched on, which
//! is the only way to finish verification or a password reset with it.

use crate::domain::repository::Mailer;
use crate::domain::value_object::email::Email;
use crate::error::AuthResult;

#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer {
    log_tokens: bool,
}

impl LogMailer {
    /// `log_tokens` writes each token at `debug`. Local runs only.
    pub fn new(log_tokens: bool) -> Self {
        Self { log_tokens }
    }

    pub fn logs_tokens(&self) -> bool {
        self.log_tokens
    }

    fn dispatch(&self, to: &Email, token: &str, message: &'static str) {
        tracing::info!(email = %to, "{message}");
        if self.log_tokens {
            tracing::debug!(email = %to, token = %token, "{message} (token)");
        }
    }
}

impl Mailer for LogMailer {
    async fn send_verification(&self, to: &Email, token: &str) -> AuthResult<()> {
        self.dispatch(to, token, "Verification mail dispatched");
        Ok(())
    }

    async fn send_password_reset(&self, to: &Email, token: &str) -> AuthResult<()> {
        self.dispatch(to, token, "Password reset mail dispatched");
        Ok(())
    }
}
