//! Application configuration loaded from environment variables.
//!
//! The token signing secret is read once at startup and handed to the
//! token codec; there is no other place the secret comes from.

use std::env;

/// Default lifetime of a password-reset OTP.
pub const DEFAULT_RESET_TOKEN_TTL_MINUTES: i64 = 10;

/// Longest accepted OTP lifetime (one day).
pub const MAX_RESET_TOKEN_TTL_MINUTES: i64 = 24 * 60;

/// Which document store backs the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// In-process store; data is lost on restart.
    Memory,
    /// Google Cloud Firestore.
    Firestore,
}

impl std::str::FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "firestore" => Ok(StoreBackend::Firestore),
            _ => Err(ConfigError::Invalid("STORE_BACKEND")),
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// Server port
    pub port: u16,
    /// Document store selection
    pub store_backend: StoreBackend,
    /// GCP project ID (required for the Firestore backend)
    pub gcp_project_id: Option<String>,
    /// Emails that receive the admin role on login (lowercased)
    pub admin_emails: Vec<String>,
    /// Password-reset OTP lifetime
    pub reset_token_ttl_minutes: i64,

    // --- Secrets ---
    /// Symmetric key for session tokens (raw bytes)
    pub jwt_secret: Vec<u8>,
}

impl Config {
    /// Fixed configuration for tests.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            port: 8080,
            store_backend: StoreBackend::Memory,
            gcp_project_id: None,
            admin_emails: vec!["admin@example.com".to_string()],
            reset_token_ttl_minutes: DEFAULT_RESET_TOKEN_TTL_MINUTES,
            jwt_secret: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Fails if `JWT_SECRET_KEY` is missing or blank; a server without a
    /// secret would accept nothing, so it must not start.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let jwt_secret = env::var("JWT_SECRET_KEY")
            .map_err(|_| ConfigError::Missing("JWT_SECRET_KEY"))?
            .trim()
            .to_string();
        if jwt_secret.is_empty() {
            return Err(ConfigError::Missing("JWT_SECRET_KEY"));
        }

        let store_backend = match env::var("STORE_BACKEND") {
            Ok(v) => v.parse()?,
            Err(_) => StoreBackend::Memory,
        };

        let gcp_project_id = env::var("GCP_PROJECT_ID")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        if store_backend == StoreBackend::Firestore && gcp_project_id.is_none() {
            return Err(ConfigError::Missing("GCP_PROJECT_ID"));
        }

        let reset_token_ttl_minutes = match env::var("RESET_TOKEN_TTL_MINUTES") {
            Ok(v) => v
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|m| (1..=MAX_RESET_TOKEN_TTL_MINUTES).contains(m))
                .ok_or(ConfigError::Invalid("RESET_TOKEN_TTL_MINUTES"))?,
            Err(_) => DEFAULT_RESET_TOKEN_TTL_MINUTES,
        };

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            store_backend,
            gcp_project_id,
            admin_emails: parse_admin_emails(&env::var("ADMIN_EMAILS").unwrap_or_default()),
            reset_token_ttl_minutes,
            jwt_secret: jwt_secret.into_bytes(),
        })
    }

    /// Whether `email` is configured as an administrator.
    pub fn is_admin_email(&self, email: &str) -> bool {
        let email = email.trim().to_lowercase();
        self.admin_emails.iter().any(|a| *a == email)
    }
}

fn parse_admin_emails(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    // Env vars are process-wide; keep every env mutation in one test.
    #[test]
    fn test_config_from_env() {
        env::remove_var("JWT_SECRET_KEY");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::Missing("JWT_SECRET_KEY"))
        ));

        env::set_var("JWT_SECRET_KEY", "   ");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::Missing("JWT_SECRET_KEY"))
        ));

        env::set_var("JWT_SECRET_KEY", "test_jwt_key_32_bytes_minimum!!");
        env::set_var("ADMIN_EMAILS", " Root@Example.com, ,ops@example.com");
        env::remove_var("STORE_BACKEND");
        env::remove_var("RESET_TOKEN_TTL_MINUTES");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.jwt_secret, b"test_jwt_key_32_bytes_minimum!!");
        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert_eq!(config.reset_token_ttl_minutes, 10);
        assert_eq!(config.admin_emails, vec!["root@example.com", "ops@example.com"]);
        assert!(config.is_admin_email("ROOT@example.com"));

        for bad in ["0", "-5", "1441", "9223372036854775807", "ten"] {
            env::set_var("RESET_TOKEN_TTL_MINUTES", bad);
            assert!(
                matches!(
                    Config::from_env(),
                    Err(ConfigError::Invalid("RESET_TOKEN_TTL_MINUTES"))
                ),
                "{}",
                bad
            );
        }
        env::set_var("RESET_TOKEN_TTL_MINUTES", "1440");
        assert_eq!(Config::from_env().unwrap().reset_token_ttl_minutes, 1440);
        env::remove_var("RESET_TOKEN_TTL_MINUTES");

        env::set_var("STORE_BACKEND", "firestore");
        env::remove_var("GCP_PROJECT_ID");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::Missing("GCP_PROJECT_ID"))
        ));
        env::remove_var("STORE_BACKEND");
        env::remove_var("ADMIN_EMAILS");
    }

    #[test]
    fn test_store_backend_parse() {
        assert_eq!("Memory".parse::<StoreBackend>().unwrap(), StoreBackend::Memory);
        assert_eq!(
            "firestore".parse::<StoreBackend>().unwrap(),
            StoreBackend::Firestore
        );
        assert!("postgres".parse::<StoreBackend>().is_err());
    }
}
