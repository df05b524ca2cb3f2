use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    pub base_url: String,
    pub uploads_base_url: String,
    pub placeholder_cover_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub from_address: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub catalog: CatalogConfig,
    pub smtp: SmtpConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "komikin".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "komikin-users".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24 * 7),
        };
        let catalog = CatalogConfig {
            base_url: std::env::var("MANGADEX_BASE_URL")
                .unwrap_or_else(|_| "https://api.mangadex.org".into()),
            uploads_base_url: std::env::var("MANGADEX_UPLOADS_URL")
                .unwrap_or_else(|_| "https://uploads.mangadex.org".into()),
            placeholder_cover_url: std::env::var("PLACEHOLDER_COVER_URL")
                .unwrap_or_else(|_| "https://placehold.co/256x362/222/fff?text=No+Cover".into()),
        };
        let smtp = SmtpConfig {
            host: std::env::var("SMTP_HOST").unwrap_or_else(|_| "localhost".into()),
            port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(1025),
            from_address: std::env::var("SMTP_FROM")
                .unwrap_or_else(|_| "no-reply@komikin.app".into()),
        };
        Ok(Self {
            database_url,
            jwt,
            catalog,
            smtp,
        })
    }
}
