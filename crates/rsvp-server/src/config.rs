use std::ops::RangeInclusive;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use tracing::info;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

const TOKEN_TTL_DAYS: RangeInclusive<i64> = 1..=3650;

pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub token_ttl_days: i64,
    pub admin_emails: Vec<String>,
    pub editor_emails: Vec<String>,
    pub mail: Option<MailConfig>,
}

pub struct MailConfig {
    pub endpoint: String,
    pub api_key: String,
    pub from: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let jwt_secret = lookup("RSVP_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("RSVP_JWT_SECRET is unset or still a placeholder");
        }

        let port: u16 = var("RSVP_PORT", "3000")
            .parse()
            .context("RSVP_PORT must be a port number")?;
        let token_ttl_days: i64 = var("RSVP_TOKEN_TTL_DAYS", "30")
            .parse()
            .context("RSVP_TOKEN_TTL_DAYS must be a whole number of days")?;
        if !TOKEN_TTL_DAYS.contains(&token_ttl_days) {
            bail!(
                "RSVP_TOKEN_TTL_DAYS must be between {} and {}",
                TOKEN_TTL_DAYS.start(),
                TOKEN_TTL_DAYS.end()
            );
        }

        let mail = match lookup("RSVP_MAIL_ENDPOINT").filter(|v| !v.is_empty()) {
            Some(endpoint) => Some(MailConfig {
                endpoint,
                api_key: lookup("RSVP_MAIL_API_KEY")
                    .context("RSVP_MAIL_API_KEY is required when RSVP_MAIL_ENDPOINT is set")?,
                from: var("RSVP_MAIL_FROM", "RSVP <noreply@localhost>"),
            }),
            None => {
                info!("RSVP_MAIL_ENDPOINT not set, confirmation mail disabled");
                None
            }
        };

        Ok(Self {
            host: var("RSVP_HOST", "0.0.0.0"),
            port,
            db_path: var("RSVP_DB_PATH", "rsvp.db").into(),
            jwt_secret,
            token_ttl_days,
            admin_emails: email_list(lookup("RSVP_ADMIN_EMAILS")),
            editor_emails: email_list(lookup("RSVP_EDITOR_EMAILS")),
            mail,
        })
    }
}

fn email_list(value: Option<String>) -> Vec<String> {
    value
        .unwrap_or_default()
        .split(',')
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply() {
        let cfg = config(&[("RSVP_JWT_SECRET", "s3cret")]).unwrap();
        assert_eq!(cfg.host, "0.0.0.0");
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.db_path, PathBuf::from("rsvp.db"));
        assert_eq!(cfg.token_ttl_days, 30);
        assert!(cfg.admin_emails.is_empty());
        assert!(cfg.mail.is_none());
    }

    #[test]
    fn placeholder_secret_is_rejected() {
        assert!(config(&[]).is_err());
        assert!(config(&[("RSVP_JWT_SECRET", "dev-secret-change-me")]).is_err());
    }

    #[test]
    fn email_lists_are_normalized() {
        let cfg = config(&[
            ("RSVP_JWT_SECRET", "s3cret"),
            ("RSVP_ADMIN_EMAILS", " Ada@Example.com, ,bea@example.com"),
        ])
        .unwrap();
        assert_eq!(cfg.admin_emails, vec!["ada@example.com", "bea@example.com"]);
    }

    #[test]
    fn mail_endpoint_needs_api_key() {
        assert!(config(&[
            ("RSVP_JWT_SECRET", "s3cret"),
            ("RSVP_MAIL_ENDPOINT", "https://mail.example.com/send"),
        ])
        .is_err());

        let cfg = config(&[
            ("RSVP_JWT_SECRET", "s3cret"),
            ("RSVP_MAIL_ENDPOINT", "https://mail.example.com/send"),
            ("RSVP_MAIL_API_KEY", "key"),
        ])
        .unwrap();
        assert_eq!(cfg.mail.unwrap().endpoint, "https://mail.example.com/send");
    }

    #[test]
    fn token_ttl_must_be_in_range() {
        for ttl in ["0", "-5", "3651", "100000000"] {
            assert!(
                config(&[("RSVP_JWT_SECRET", "s3cret"), ("RSVP_TOKEN_TTL_DAYS", ttl)]).is_err(),
                "ttl {ttl} accepted"
            );
        }
        let cfg = config(&[("RSVP_JWT_SECRET", "s3cret"), ("RSVP_TOKEN_TTL_DAYS", "3650")]).unwrap();
        assert_eq!(cfg.token_ttl_days, 3650);
    }

    #[test]
    fn bad_port_is_an_error() {
        assert!(config(&[("RSVP_JWT_SECRET", "s3cret"), ("RSVP_PORT", "http")]).is_err());
    }
}
