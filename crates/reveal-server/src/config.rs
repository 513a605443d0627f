use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, bail};
use chrono::{Duration, Utc};
use reveal_api::media::CloudinaryConfig;
use reveal_mail::{MailConfig, MailProvider, TransportConfig};

/// JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "changeme",
    "secret",
];

const DEFAULT_MAIL_ENDPOINT: &str = "https://api.resend.com/emails";
const DEFAULT_MAIL_FROM: &str = "Reveal <no-reply@reveal.app>";

pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub jwt_ttl: Duration,
    /// Empty means any origin.
    pub cors_origins: Vec<String>,
    pub reset_token_ttl: Duration,
    pub mail: MailConfig,
    pub cloudinary: Option<CloudinaryConfig>,
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let or = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());
        let parsed = |key: &str, default: &str| -> anyhow::Result<i64> {
            or(key, default)
                .parse()
                .with_context(|| format!("{key} must be an integer"))
        };

        let jwt_secret = var("REVEAL_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("REVEAL_JWT_SECRET is unset or still a placeholder");
        }

        let port: u16 = or("REVEAL_PORT", "8080")
            .parse()
            .context("REVEAL_PORT must be a port number")?;
        let jwt_ttl_hours = parsed("REVEAL_JWT_TTL_HOURS", "24")?;
        let reset_token_ttl_minutes = parsed("REVEAL_RESET_TOKEN_TTL_MINUTES", "30")?;
        let max_upload_mb = parsed("REVEAL_MAX_UPLOAD_MB", "50")?;
        if jwt_ttl_hours <= 0 || reset_token_ttl_minutes <= 0 || max_upload_mb <= 0 {
            bail!("TTL and upload limits must be positive");
        }
        // Expiry timestamps are now + ttl, so that sum must be representable too.
        let reachable = |ttl: &Duration| Utc::now().checked_add_signed(*ttl).is_some();
        let jwt_ttl = Duration::try_hours(jwt_ttl_hours)
            .filter(reachable)
            .context("REVEAL_JWT_TTL_HOURS is out of range")?;
        let reset_token_ttl = Duration::try_minutes(reset_token_ttl_minutes)
            .filter(reachable)
            .context("REVEAL_RESET_TOKEN_TTL_MINUTES is out of range")?;
        let max_upload_bytes = usize::try_from(max_upload_mb)
            .ok()
            .and_then(|mb| mb.checked_mul(1024 * 1024))
            .context("REVEAL_MAX_UPLOAD_MB is out of range")?;

        let cors_origins = var("REVEAL_CORS_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let default_transport = TransportConfig {
            endpoint: or("REVEAL_MAIL_ENDPOINT", DEFAULT_MAIL_ENDPOINT),
            api_key: or("REVEAL_MAIL_API_KEY", ""),
            from: or("REVEAL_MAIL_FROM", DEFAULT_MAIL_FROM),
        };
        let mut provider_transports = HashMap::new();
        for provider in MailProvider::ALL {
            if provider == MailProvider::Default {
                continue;
            }
            let prefix = format!("REVEAL_MAIL_{}", provider.as_str().to_ascii_uppercase());
            if let Some(api_key) = var(&format!("{prefix}_API_KEY")) {
                provider_transports.insert(
                    provider,
                    TransportConfig {
                        endpoint: or(&format!("{prefix}_ENDPOINT"), &default_transport.endpoint),
                        api_key,
                        from: or(&format!("{prefix}_FROM"), &default_transport.from),
                    },
                );
            }
        }

        let cloudinary = match (
            var("REVEAL_CLOUDINARY_CLOUD_NAME"),
            var("REVEAL_CLOUDINARY_API_KEY"),
            var("REVEAL_CLOUDINARY_API_SECRET"),
        ) {
            (Some(cloud_name), Some(api_key), Some(api_secret)) => Some(CloudinaryConfig {
                cloud_name,
                api_key,
                api_secret,
                folder: var("REVEAL_CLOUDINARY_FOLDER"),
            }),
            _ => None,
        };

        Ok(Self {
            host: or("REVEAL_HOST", "0.0.0.0"),
            port,
            db_path: or("REVEAL_DB_PATH", "reveal.db").into(),
            jwt_secret,
            jwt_ttl,
            cors_origins,
            reset_token_ttl,
            mail: MailConfig {
                frontend_url: or("REVEAL_FRONTEND_URL", "http://localhost:4200")
                    .trim_end_matches('/')
                    .to_string(),
                default_transport,
                provider_transports,
                token_ttl_minutes: reset_token_ttl_minutes,
            },
            cloudinary,
            max_upload_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(pairs: &[(&str, &str)]) -> anyhow::Result<Config> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn placeholder_secret_is_rejected() {
        assert!(config(&[]).is_err());
        assert!(config(&[("REVEAL_JWT_SECRET", "dev-secret-change-me")]).is_err());
        assert!(config(&[("REVEAL_JWT_SECRET", "   ")]).is_err());
    }

    #[test]
    fn defaults_apply() {
        let c = config(&[("REVEAL_JWT_SECRET", "a-real-secret")]).unwrap();
        assert_eq!(c.port, 8080);
        assert_eq!(c.db_path, PathBuf::from("reveal.db"));
        assert_eq!(c.jwt_ttl, Duration::hours(24));
        assert_eq!(c.reset_token_ttl, Duration::minutes(30));
        assert_eq!(c.mail.token_ttl_minutes, 30);
        assert_eq!(c.mail.frontend_url, "http://localhost:4200");
        assert_eq!(c.max_upload_bytes, 50 * 1024 * 1024);
        assert!(c.cors_origins.is_empty());
        assert!(c.cloudinary.is_none());
        assert!(c.mail.provider_transports.is_empty());
    }

    #[test]
    fn provider_transport_needs_its_own_key() {
        let c = config(&[
            ("REVEAL_JWT_SECRET", "a-real-secret"),
            ("REVEAL_MAIL_GMAIL_API_KEY", "gk"),
            ("REVEAL_MAIL_GMAIL_FROM", "gmail@reveal.app"),
            ("REVEAL_MAIL_OUTLOOK_FROM", "ignored@reveal.app"),
            ("REVEAL_CORS_ORIGINS", "http://a.com, http://b.com,"),
            ("REVEAL_FRONTEND_URL", "https://reveal.app/"),
        ])
        .unwrap();

        let gmail = &c.mail.provider_transports[&MailProvider::Gmail];
        assert_eq!(gmail.api_key, "gk");
        assert_eq!(gmail.from, "gmail@reveal.app");
        assert_eq!(gmail.endpoint, DEFAULT_MAIL_ENDPOINT);
        assert!(!c.mail.provider_transports.contains_key(&MailProvider::Outlook));
        assert_eq!(c.cors_origins, vec!["http://a.com", "http://b.com"]);
        assert_eq!(c.mail.frontend_url, "https://reveal.app");
    }

    #[test]
    fn bad_numbers_fail() {
        assert!(config(&[("REVEAL_JWT_SECRET", "s3cr3t-value"), ("REVEAL_PORT", "http")]).is_err());
        assert!(
            config(&[("REVEAL_JWT_SECRET", "s3cr3t-value"), ("REVEAL_JWT_TTL_HOURS", "0")]).is_err()
        );
    }

    #[test]
    fn oversized_values_fail_instead_of_overflowing() {
        let huge = i64::MAX.to_string();
        let far_future_hours = (i64::MAX / 3_600_000).to_string();
        let err = config(&[
            ("REVEAL_JWT_SECRET", "s3cr3t-value"),
            ("REVEAL_JWT_TTL_HOURS", far_future_hours.as_str()),
        ])
        .err()
        .unwrap_or_else(|| panic!("unreachable expiry should be rejected"));
        assert!(err.to_string().contains("REVEAL_JWT_TTL_HOURS"));

        for key in [
            "REVEAL_JWT_TTL_HOURS",
            "REVEAL_RESET_TOKEN_TTL_MINUTES",
            "REVEAL_MAX_UPLOAD_MB",
        ] {
            let err = config(&[("REVEAL_JWT_SECRET", "s3cr3t-value"), (key, huge.as_str())])
                .err()
                .unwrap_or_else(|| panic!("{key} should be rejected"));
            assert!(err.to_string().contains(key), "{err:#}");
        }
    }
}
