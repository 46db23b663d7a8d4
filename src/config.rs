use std::env;

/// Subdomains that must never resolve to a tenant. Checked at registration
/// time and re-validated by the host router as defense in depth.
pub const RESERVED_SLUGS: &[&str] = &[
    "www", "api", "app", "admin", "mail", "login", "signup", "register",
    "support", "billing", "status", "docs", "hilfe", "impressum", "datenschutz",
];

/// Name of the session cookie carrying the opaque credential.
pub const SESSION_COOKIE: &str = "khsession";

/// Immutable process configuration, read once at startup and injected into
/// the router state. Never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    /// Production root domain, e.g. "kanzleihub.de". Tenants live on
    /// `{slug}.{root_domain}`.
    pub root_domain: String,
    /// Root token recognized in local-development hosts, e.g. "localhost"
    /// in "mueller.localhost:3000".
    pub dev_root_token: String,
    pub reserved_slugs: Vec<String>,
    pub session_max_age_days: i64,
    /// Controls the `Secure` attribute on the session cookie.
    pub production: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: required("DATABASE_URL")?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()?,
            root_domain: env::var("ROOT_DOMAIN").unwrap_or_else(|_| "kanzleihub.de".into()),
            dev_root_token: env::var("DEV_ROOT_TOKEN").unwrap_or_else(|_| "localhost".into()),
            reserved_slugs: env::var("RESERVED_SLUGS")
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_lowercase())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_else(|_| RESERVED_SLUGS.iter().map(|s| s.to_string()).collect()),
            session_max_age_days: env::var("SESSION_MAX_AGE_DAYS")
                .unwrap_or_else(|_| "30".into())
                .parse()?,
            production: env::var("APP_ENV").map(|v| v == "production").unwrap_or(false),
        })
    }

    pub fn is_reserved_slug(&self, slug: &str) -> bool {
        self.reserved_slugs.iter().any(|s| s == slug)
    }
}

fn required(key: &str) -> anyhow::Result<String> {
    env::var(key).map_err(|_| anyhow::anyhow!("Missing required env var: {}", key))
}
