//! Server Configuration
//!
//! Read once at startup from the environment (after `.env` is loaded).
//! A missing or short signing key is fatal.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, bail};
use auth::{AuthConfig, SigningKey, TokenTtls};
use axum::http::HeaderValue;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
const DEFAULT_FRONTEND_ORIGINS: &str = "http://localhost:3000,http://127.0.0.1:3000";

pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub frontend_origins: Vec<HeaderValue>,
    pub signing_key: SigningKey,
    pub auth: AuthConfig,
    /// Write verification and reset tokens to the log (`MAIL_LOG_TOKENS`)
    pub log_mail_tokens: bool,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let secret = lookup("JWT_SECRET").context("JWT_SECRET must be set")?;
        let signing_key =
            SigningKey::new(secret.into_bytes()).context("JWT_SECRET is not a usable HS256 key")?;

        let database_url = lookup("DATABASE_URL").context("DATABASE_URL must be set")?;

        let bind_addr = lookup("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse()
            .context("BIND_ADDR is not a socket address")?;

        let frontend_origins = lookup("FRONTEND_ORIGINS")
            .unwrap_or_else(|| DEFAULT_FRONTEND_ORIGINS.to_string())
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(|origin| {
                HeaderValue::from_str(origin).with_context(|| {
                    format!("FRONTEND_ORIGINS entry {origin:?} is not a header value")
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        let log_mail_tokens = match lookup("MAIL_LOG_TOKENS").as_deref().map(str::trim) {
            None | Some("") | Some("false") | Some("0") => false,
            Some("true") | Some("1") => true,
            Some(other) => bail!("MAIL_LOG_TOKENS must be true or false (got {other:?})"),
        };

        let defaults = TokenTtls::default();
        let token_ttls = TokenTtls {
            access: ttl(&lookup, "ACCESS_TOKEN_TTL_MS", defaults.access)?,
            refresh: ttl(&lookup, "REFRESH_TOKEN_TTL_MS", defaults.refresh)?,
            verification: ttl(&lookup, "VERIFICATION_TOKEN_TTL_MS", defaults.verification)?,
            password_reset: ttl(&lookup, "PASSWORD_RESET_TOKEN_TTL_MS", defaults.password_reset)?,
        };

        let auth = AuthConfig {
            token_ttls,
            password_pepper: lookup("PASSWORD_PEPPER")
                .filter(|pepper| !pepper.is_empty())
                .map(String::into_bytes),
            ..AuthConfig::default()
        };

        Ok(Self {
            database_url,
            bind_addr,
            frontend_origins,
            signing_key,
            auth,
            log_mail_tokens,
        })
    }
}

fn ttl(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: Duration,
) -> anyhow::Result<Duration> {
    let Some(raw) = lookup(name) else {
        return Ok(default);
    };
    let ms: u64 = raw
        .trim()
        .parse()
        .with_context(|| format!("{name} must be a number of milliseconds"))?;
    if ms == 0 {
        bail!("{name} must be greater than zero");
    }
    Ok(Duration::from_millis(ms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn config(vars: &[(&str, &str)]) -> anyhow::Result<AppConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[("JWT_SECRET", SECRET), ("DATABASE_URL", "postgres://db")]).unwrap();

        assert_eq!(config.bind_addr, "0.0.0.0:8000".parse().unwrap());
        assert_eq!(config.frontend_origins.len(), 2);
        assert_eq!(config.auth.token_ttls, TokenTtls::default());
        assert!(config.auth.password_pepper.is_none());
        assert!(!config.log_mail_tokens);
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("JWT_SECRET", SECRET),
            ("DATABASE_URL", "postgres://db"),
            ("ACCESS_TOKEN_TTL_MS", "60000"),
            ("PASSWORD_PEPPER", "pepper"),
            ("BIND_ADDR", "127.0.0.1:9000"),
            ("MAIL_LOG_TOKENS", "true"),
        ])
        .unwrap();

        assert!(config.log_mail_tokens);

        assert_eq!(config.auth.token_ttls.access, Duration::from_secs(60));
        assert_eq!(config.auth.pepper(), Some(&b"pepper"[..]));
        assert_eq!(config.bind_addr.port(), 9000);
    }

    #[test]
    fn test_short_or_missing_key_is_fatal() {
        assert!(config(&[("DATABASE_URL", "postgres://db")]).is_err());
        assert!(config(&[("JWT_SECRET", "short"), ("DATABASE_URL", "postgres://db")]).is_err());
    }

    #[test]
    fn test_invalid_ttl() {
        for value in ["abc", "0", "-5"] {
            let result = config(&[
                ("JWT_SECRET", SECRET),
                ("DATABASE_URL", "postgres://db"),
                ("REFRESH_TOKEN_TTL_MS", value),
            ]);
            assert!(result.is_err(), "{value}");
        }
    }

    #[test]
    fn test_frontend_origins() {
        let parsed = config(&[
            ("JWT_SECRET", SECRET),
            ("DATABASE_URL", "postgres://db"),
            ("FRONTEND_ORIGINS", "https://app.example.com, ,https://admin.example.com"),
        ])
        .unwrap();
        assert_eq!(parsed.frontend_origins.len(), 2);
        assert_eq!(parsed.frontend_origins[1], "https://admin.example.com");

        let result = config(&[
            ("JWT_SECRET", SECRET),
            ("DATABASE_URL", "postgres://db"),
            ("FRONTEND_ORIGINS", "https://app.example.com,https://bad\norigin"),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_mail_log_tokens() {
        let result = config(&[
            ("JWT_SECRET", SECRET),
            ("DATABASE_URL", "postgres://db"),
            ("MAIL_LOG_TOKENS", "yes please"),
        ]);
        assert!(result.is_err());
    }
}
