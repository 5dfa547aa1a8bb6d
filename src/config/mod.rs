use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub storage: StorageConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub email: EmailConfig,
    pub ai: AiConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub seed_demo: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub bcrypt_cost: u32,
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub enabled: bool,
    /// Form-relay base URL; the recipient address is appended as a path segment.
    pub endpoint: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    pub api_base: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub max_attempts: u32,
    pub retry_base_delay_ms: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Storage overrides
        if let Ok(v) = env::var("STORAGE_BACKEND") {
            match v.to_lowercase().as_str() {
                "memory" => self.storage.backend = StorageBackend::Memory,
                "postgres" | "pg" => self.storage.backend = StorageBackend::Postgres,
                other => tracing::warn!("Unknown STORAGE_BACKEND '{}', keeping default", other),
            }
        }
        if let Ok(v) = env::var("LAWHELP_SEED_DEMO") {
            self.storage.seed_demo = v.parse().unwrap_or(self.storage.seed_demo);
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_ACQUIRE_TIMEOUT_SECS") {
            self.database.acquire_timeout_secs = v.parse().unwrap_or(self.database.acquire_timeout_secs);
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Ok(v) = env::var("SECURITY_BCRYPT_COST") {
            self.security.bcrypt_cost = v.parse().unwrap_or(self.security.bcrypt_cost);
        }
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }

        // Email overrides
        if let Ok(v) = env::var("EMAIL_ENABLED") {
            self.email.enabled = v.parse().unwrap_or(self.email.enabled);
        }
        if let Ok(v) = env::var("EMAIL_ENDPOINT") {
            self.email.endpoint = v;
        }
        if let Ok(v) = env::var("EMAIL_TIMEOUT_SECS") {
            self.email.timeout_secs = v.parse().unwrap_or(self.email.timeout_secs);
        }

        // AI overrides
        if let Ok(v) = env::var("AI_API_BASE") {
            self.ai.api_base = v;
        }
        if let Ok(v) = env::var("OPENAI_API_KEY") {
            self.ai.api_key = v;
        }
        if let Ok(v) = env::var("AI_MODEL") {
            self.ai.model = v;
        }
        if let Ok(v) = env::var("AI_TEMPERATURE") {
            self.ai.temperature = v.parse().unwrap_or(self.ai.temperature);
        }
        if let Ok(v) = env::var("AI_MAX_TOKENS") {
            self.ai.max_tokens = v.parse().unwrap_or(self.ai.max_tokens);
        }
        if let Ok(v) = env::var("AI_MAX_ATTEMPTS") {
            self.ai.max_attempts = v.parse().unwrap_or(self.ai.max_attempts);
        }
        if let Ok(v) = env::var("AI_RETRY_BASE_DELAY_MS") {
            self.ai.retry_base_delay_ms = v.parse().unwrap_or(self.ai.retry_base_delay_ms);
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            storage: StorageConfig {
                backend: StorageBackend::Memory,
                seed_demo: false,
            },
            database: DatabaseConfig {
                max_connections: 10,
                acquire_timeout_secs: 30,
            },
            security: SecurityConfig {
                jwt_secret: "dev-only-secret-change-me".to_string(),
                jwt_expiry_hours: 24 * 7, // 1 week
                bcrypt_cost: 10,
                enable_cors: true,
                cors_origins: vec![
                    "http://localhost:3000".to_string(),
                    "http://localhost:5173".to_string(),
                ],
            },
            email: EmailConfig {
                enabled: false,
                endpoint: "https://formsubmit.co/ajax".to_string(),
                timeout_secs: 15,
            },
            ai: AiConfig {
                api_base: "https://api.openai.com/v1".to_string(),
                api_key: String::new(),
                model: "gpt-4o".to_string(),
                temperature: 0.3,
                max_tokens: 1500,
                max_attempts: 3,
                retry_base_delay_ms: 500,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            storage: StorageConfig {
                backend: StorageBackend::Postgres,
                seed_demo: true,
            },
            database: DatabaseConfig {
                max_connections: 20,
                acquire_timeout_secs: 10,
            },
            security: SecurityConfig {
                jwt_secret: String::new(), // must come from JWT_SECRET
                jwt_expiry_hours: 24,
                bcrypt_cost: 12,
                enable_cors: true,
                cors_origins: vec!["https://staging.lawhelp.cm".to_string()],
            },
            email: EmailConfig {
                enabled: true,
                endpoint: "https://formsubmit.co/ajax".to_string(),
                timeout_secs: 15,
            },
            ai: AiConfig {
                api_base: "https://api.openai.com/v1".to_string(),
                api_key: String::new(),
                model: "gpt-4o".to_string(),
                temperature: 0.3,
                max_tokens: 1500,
                max_attempts: 3,
                retry_base_delay_ms: 500,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            storage: StorageConfig {
                backend: StorageBackend::Postgres,
                seed_demo: false,
            },
            database: DatabaseConfig {
                max_connections: 50,
                acquire_timeout_secs: 5,
            },
            security: SecurityConfig {
                jwt_secret: String::new(), // must come from JWT_SECRET
                jwt_expiry_hours: 24 * 7,
                bcrypt_cost: 12,
                enable_cors: true,
                cors_origins: vec!["https://app.lawhelp.cm".to_string()],
            },
            email: EmailConfig {
                enabled: true,
                endpoint: "https://formsubmit.co/ajax".to_string(),
                timeout_secs: 15,
            },
            ai: AiConfig {
                api_base: "https://api.openai.com/v1".to_string(),
                api_key: String::new(),
                model: "gpt-4o".to_string(),
                temperature: 0.3,
                max_tokens: 1500,
                max_attempts: 3,
                retry_base_delay_ms: 500,
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}
