use std::time::Duration;

use soundshelf_core::cursor::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
use soundshelf_core::error::CoreError;

/// Development-only cursor key; production deployments set `CURSOR_SECRET`.
const DEV_CURSOR_SECRET: &str = "soundshelf-dev-cursor-secret";

/// CDN signing settings. Present only when all three values are set.
#[derive(Clone, PartialEq, Eq)]
pub struct CdnConfig {
    /// Distribution domain, e.g. `d123.cloudfront.net`.
    pub domain: String,
    pub key_pair_id: String,
    /// PEM-encoded RSA private key of the key pair.
    pub private_key_pem: String,
}

impl std::fmt::Debug for CdnConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CdnConfig")
            .field("domain", &self.domain)
            .field("key_pair_id", &self.key_pair_id)
            .finish_non_exhaustive()
    }
}

/// Library configuration loaded from environment variables.
///
/// All fields except `DATABASE_URL` have defaults suitable for local
/// development.
#[derive(Debug, Clone)]
pub struct LibraryConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    /// Key for signing pagination cursors.
    pub cursor_secret: String,
    pub page_default_limit: usize,
    pub page_max_limit: usize,
    /// Upper bound on each identity-service call.
    pub identity_timeout: Duration,
    pub identity_user_pool_id: String,
    pub media_bucket: String,
    /// Lifetime of presigned upload/download URLs.
    pub presign_ttl: Duration,
    pub cdn: Option<CdnConfig>,
    pub search_url: String,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            database_max_connections: 20,
            cursor_secret: DEV_CURSOR_SECRET.into(),
            page_default_limit: DEFAULT_PAGE_LIMIT,
            page_max_limit: MAX_PAGE_LIMIT,
            identity_timeout: Duration::from_secs(10),
            identity_user_pool_id: String::new(),
            media_bucket: "soundshelf-media".into(),
            presign_ttl: Duration::from_secs(900),
            cdn: None,
            search_url: "http://localhost:8081".into(),
        }
    }
}

impl LibraryConfig {
    /// Load configuration from the process environment (after `.env`).
    ///
    /// | Env Var                    | Default                  |
    /// |----------------------------|--------------------------|
    /// | `DATABASE_URL`             | required                 |
    /// | `DATABASE_MAX_CONNECTIONS` | `20`                     |
    /// | `CURSOR_SECRET`            | dev-only secret          |
    /// | `PAGE_DEFAULT_LIMIT`       | `20`                     |
    /// | `PAGE_MAX_LIMIT`           | `100`                    |
    /// | `IDENTITY_TIMEOUT_SECS`    | `10`                     |
    /// | `IDENTITY_USER_POOL_ID`    | empty                    |
    /// | `MEDIA_BUCKET`             | `soundshelf-media`       |
    /// | `PRESIGN_TTL_SECS`         | `900`                    |
    /// | `CDN_DOMAIN`               | empty (CDN disabled)     |
    /// | `CDN_KEY_PAIR_ID`          | empty                    |
    /// | `CDN_SIGNING_KEY`          | empty (RSA PEM)          |
    ///
    /// `CDN_SIGNING_KEY` may spell its line breaks as literal `\n`.
    /// | `SEARCH_URL`               | `http://localhost:8081`  |
    pub fn from_env() -> Result<Self, CoreError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, CoreError> {
        let defaults = Self::default();
        let text = |name: &str, default: &str| {
            lookup(name)
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| CoreError::Validation("DATABASE_URL must be set".into()))?;

        let cursor_secret = match lookup("CURSOR_SECRET").filter(|v| !v.is_empty()) {
            Some(secret) => secret,
            None => {
                tracing::warn!("CURSOR_SECRET not set; using the development cursor key");
                defaults.cursor_secret.clone()
            }
        };

        let page_default_limit = number(&lookup, "PAGE_DEFAULT_LIMIT", defaults.page_default_limit)?;
        let page_max_limit = number(&lookup, "PAGE_MAX_LIMIT", defaults.page_max_limit)?;
        if page_default_limit == 0 || page_max_limit == 0 || page_default_limit > page_max_limit {
            return Err(CoreError::Validation(format!(
                "PAGE_DEFAULT_LIMIT ({page_default_limit}) must be between 1 and PAGE_MAX_LIMIT ({page_max_limit})"
            )));
        }

        let cdn = match (
            lookup("CDN_DOMAIN").filter(|v| !v.is_empty()),
            lookup("CDN_KEY_PAIR_ID").filter(|v| !v.is_empty()),
            lookup("CDN_SIGNING_KEY").filter(|v| !v.is_empty()),
        ) {
            (Some(domain), Some(key_pair_id), Some(signing_key)) => Some(CdnConfig {
                domain,
                key_pair_id,
                private_key_pem: signing_key.replace("\\n", "\n"),
            }),
            (None, None, None) => None,
            _ => {
                return Err(CoreError::Validation(
                    "CDN_DOMAIN, CDN_KEY_PAIR_ID and CDN_SIGNING_KEY must be set together".into(),
                ))
            }
        };

        Ok(Self {
            database_url,
            database_max_connections: number(
                &lookup,
                "DATABASE_MAX_CONNECTIONS",
                defaults.database_max_connections,
            )?,
            cursor_secret,
            page_default_limit,
            page_max_limit,
            identity_timeout: Duration::from_secs(number(&lookup, "IDENTITY_TIMEOUT_SECS", 10u64)?),
            identity_user_pool_id: text("IDENTITY_USER_POOL_ID", ""),
            media_bucket: text("MEDIA_BUCKET", &defaults.media_bucket),
            presign_ttl: Duration::from_secs(number(&lookup, "PRESIGN_TTL_SECS", 900u64)?),
            cdn,
            search_url: text("SEARCH_URL", &defaults.search_url),
        })
    }
}

fn number<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T, CoreError>
where
    T: std::str::FromStr,
{
    match lookup(name).filter(|v| !v.is_empty()) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| CoreError::Validation(format!("{name} must be a number, got '{raw}'"))),
    }
}
