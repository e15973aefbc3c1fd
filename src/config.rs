/*!
 * Configuration
 * Everything the service reads from the environment, gathered in one place
 */
use std::path::PathBuf;
use std::str::FromStr;

use bcrypt::{hash, DEFAULT_COST};

use crate::db::DbConfig;

pub const DEFAULT_JWT_SECRET: &str = "default-jwt-secret-change-in-production";
const DEFAULT_ADMIN_EMAIL: &str = "admin@example.com";
const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("JWT_SECRET must be set to a secure, unique value in production")]
    InsecureJwtSecret,

    #[error("ADMIN_PASSWORD_HASH or ADMIN_PASSWORD must be set in production without a database")]
    DefaultAdminPassword,

    #[error("failed to hash admin password: {0}")]
    PasswordHash(#[from] bcrypt::BcryptError),
}

/// The single administrator used when no database is configured.
#[derive(Debug, Clone)]
pub struct AdminAccountConfig {
    pub uid: String,
    pub email: String,
    pub password_hash: String,
    pub display_name: Option<String>,
    pub role: String,
    /// Set when neither ADMIN_PASSWORD_HASH nor ADMIN_PASSWORD was provided
    pub uses_default_password: bool,
}

#[derive(Debug, Clone)]
pub struct MediaConfig {
    /// Unsigned multipart upload endpoint of the image host
    pub upload_endpoint: String,
    pub upload_preset: String,
    /// URLs containing this marker live on the image host, not in object storage
    pub hosted_marker: String,
    pub storage_root: PathBuf,
    pub storage_public_prefix: String,
    pub max_upload_bytes: usize,
    pub max_image_bytes: usize,
    pub max_dimension: u32,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            upload_endpoint: "https://api.cloudinary.com/v1_1/demo/image/upload".to_string(),
            upload_preset: "unsigned_preset".to_string(),
            hosted_marker: "cloudinary.com".to_string(),
            storage_root: PathBuf::from("uploads"),
            storage_public_prefix: "/uploads/".to_string(),
            max_upload_bytes: 10 * 1024 * 1024,
            max_image_bytes: 1024 * 1024,
            max_dimension: 1920,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub admin: AdminAccountConfig,
    pub media: MediaConfig,
    /// Character budget of list-view previews
    pub preview_chars: usize,
    pub allowed_origins: Vec<String>,
    pub max_body_bytes: usize,
    pub database: Option<DbConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            host: "127.0.0.1".to_string(),
            port: 3001,
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            admin: AdminAccountConfig {
                uid: "admin-user-id".to_string(),
                email: DEFAULT_ADMIN_EMAIL.to_string(),
                password_hash: String::new(),
                display_name: None,
                role: "admin".to_string(),
                uses_default_password: true,
            },
            media: MediaConfig::default(),
            preview_chars: 150,
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
            max_body_bytes: 12 * 1024 * 1024,
            database: None,
        }
    }
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Splits a comma-separated origin list, dropping blanks.
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl AppConfig {
    /// Reads the configuration from the process environment.
    /// The admin password is hashed here when only a plain value is provided.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = AppConfig::default();

        let (password_hash, uses_default_password) =
            if let Ok(hash) = std::env::var("ADMIN_PASSWORD_HASH") {
                (hash, false)
            } else if let Ok(plain) = std::env::var("ADMIN_PASSWORD") {
                (hash(&plain, DEFAULT_COST)?, false)
            } else {
                (hash(DEFAULT_ADMIN_PASSWORD, DEFAULT_COST)?, true)
            };

        let allowed_origins = std::env::var("ALLOWED_ORIGINS")
            .ok()
            .map(|s| parse_origins(&s))
            .filter(|o| !o.is_empty())
            .or_else(|| std::env::var("FRONTEND_ORIGIN").ok().map(|o| vec![o]))
            .unwrap_or(defaults.allowed_origins);

        let media_defaults = MediaConfig::default();
        let media = MediaConfig {
            upload_endpoint: env_string("IMAGE_UPLOAD_URL", &media_defaults.upload_endpoint),
            upload_preset: env_string("IMAGE_UPLOAD_PRESET", &media_defaults.upload_preset),
            hosted_marker: env_string("IMAGE_HOST_MARKER", &media_defaults.hosted_marker),
            storage_root: std::env::var("STORAGE_ROOT")
                .map(PathBuf::from)
                .unwrap_or(media_defaults.storage_root),
            storage_public_prefix: env_string(
                "STORAGE_PUBLIC_PREFIX",
                &media_defaults.storage_public_prefix,
            ),
            max_upload_bytes: env_parse("MAX_UPLOAD_BYTES", media_defaults.max_upload_bytes),
            max_image_bytes: env_parse("MAX_IMAGE_BYTES", media_defaults.max_image_bytes),
            max_dimension: env_parse("MAX_IMAGE_DIMENSION", media_defaults.max_dimension),
        };

        Ok(Self {
            environment: env_string("ENVIRONMENT", &defaults.environment),
            host: env_string("HOST", &defaults.host),
            port: env_parse("PORT", defaults.port),
            jwt_secret: env_string("JWT_SECRET", DEFAULT_JWT_SECRET),
            admin: AdminAccountConfig {
                uid: env_string("ADMIN_UID", &defaults.admin.uid),
                email: env_string("ADMIN_EMAIL", DEFAULT_ADMIN_EMAIL),
                password_hash,
                display_name: std::env::var("ADMIN_DISPLAY_NAME").ok(),
                role: env_string("ADMIN_ROLE", &defaults.admin.role),
                uses_default_password,
            },
            media,
            preview_chars: env_parse("PREVIEW_CHARS", defaults.preview_chars),
            allowed_origins,
            max_body_bytes: env_parse("MAX_BODY_BYTES", defaults.max_body_bytes),
            database: std::env::var("DATABASE_URL")
                .ok()
                .map(|_| DbConfig::default()),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Refuses insecure production settings and warns about weak ones.
    /// The static admin account only signs in when no database is configured,
    /// so its default password is refused only in that case.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.is_production() {
            return Ok(());
        }
        if self.jwt_secret.is_empty() || self.jwt_secret == DEFAULT_JWT_SECRET {
            return Err(ConfigError::InsecureJwtSecret);
        }
        if self.admin.email == DEFAULT_ADMIN_EMAIL {
            tracing::warn!(
                "SECURITY: ADMIN_EMAIL is using an insecure default. \
                 Set ADMIN_EMAIL to a real address."
            );
        }
        if self.admin.uses_default_password {
            if self.database.is_none() {
                return Err(ConfigError::DefaultAdminPassword);
            }
            tracing::warn!(
                "SECURITY: Neither ADMIN_PASSWORD_HASH nor ADMIN_PASSWORD is set; \
                 the unused static admin account keeps its default password."
            );
        }
        Ok(())
    }
}
