use serde::Deserialize;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub environment: Environment,
    pub log_format: LogFormat,
    // Storage
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub public_base_url: String,
    pub audio_storage_dir: PathBuf,
    pub voice_profile_dir: PathBuf,
    // Translation provider
    pub translation_api_url: String,
    pub translation_timeout_secs: u64,
    pub translation_cache_enabled: bool,
    // Synthesis provider
    pub xtts_server_url: Option<String>,
    pub xtts_timeout_secs: u64,
    pub placeholder_audio_enabled: bool,
    pub reference_download_timeout_secs: u64,
    // Pipeline
    pub chunk_max_chars: usize,
    pub default_target_language: String,
    // Admission control (0 = unbounded)
    pub max_concurrent_messages: usize,
    pub translation_max_concurrency: usize,
    pub synthesis_max_concurrency: usize,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();

        let port: u16 = env::var("PORT")
            .unwrap_or_else(|_| "5001".to_string())
            .parse()?;

        let store_backend = match env::var("STORE_BACKEND")
            .unwrap_or_else(|_| "postgres".to_string())
            .to_lowercase()
            .as_str()
        {
            "memory" => StoreBackend::Memory,
            _ => StoreBackend::Postgres,
        };

        let database_url = env::var("DATABASE_URL").ok();
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            return Err("DATABASE_URL is required when STORE_BACKEND=postgres".into());
        }

        let config = Config {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port,
            environment: env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string())
                .parse::<String>()
                .map(|s| match s.as_str() {
                    "production" => Environment::Production,
                    _ => Environment::Development,
                })?,
            log_format: env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .parse::<String>()
                .map(|s| match s.as_str() {
                    "json" => LogFormat::Json,
                    _ => LogFormat::Pretty,
                })?,
            store_backend,
            database_url,
            public_base_url: env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| format!("http://localhost:{}", port)),
            audio_storage_dir: env::var("AUDIO_STORAGE_DIR")
                .unwrap_or_else(|_| "uploads/audio/chunks".to_string())
                .into(),
            voice_profile_dir: env::var("VOICE_PROFILE_DIR")
                .unwrap_or_else(|_| "uploads".to_string())
                .into(),
            translation_api_url: env::var("TRANSLATION_API_URL")
                .unwrap_or_else(|_| "https://translate.googleapis.com".to_string()),
            translation_timeout_secs: env::var("TRANSLATION_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()?,
            translation_cache_enabled: parse_flag("TRANSLATION_CACHE_ENABLED"),
            xtts_server_url: env::var("XTTS_SERVER_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            xtts_timeout_secs: env::var("XTTS_TIMEOUT_SECS")
                .unwrap_or_else(|_| "120".to_string())
                .parse()?,
            placeholder_audio_enabled: parse_flag("PLACEHOLDER_AUDIO_ENABLED"),
            reference_download_timeout_secs: env::var("REFERENCE_DOWNLOAD_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()?,
            chunk_max_chars: env::var("CHUNK_MAX_CHARS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()?,
            default_target_language: env::var("DEFAULT_TARGET_LANGUAGE")
                .unwrap_or_else(|_| "en".to_string()),
            max_concurrent_messages: env::var("MAX_CONCURRENT_MESSAGES")
                .unwrap_or_else(|_| "0".to_string())
                .parse()?,
            translation_max_concurrency: env::var("TRANSLATION_MAX_CONCURRENCY")
                .unwrap_or_else(|_| "0".to_string())
                .parse()?,
            synthesis_max_concurrency: env::var("SYNTHESIS_MAX_CONCURRENCY")
                .unwrap_or_else(|_| "0".to_string())
                .parse()?,
        };

        if config.chunk_max_chars == 0 {
            return Err("CHUNK_MAX_CHARS must be a positive integer".into());
        }

        Ok(config)
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }
}

fn parse_flag(name: &str) -> bool {
    env::var(name)
        .map(|s| s.to_lowercase() == "true")
        .unwrap_or(false)
}
