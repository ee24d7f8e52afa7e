//! Configuration module
//!
//! Environment-driven configuration for the API, the face pipeline, and the
//! task queue. Values are read once at startup via [`Config::from_env`] and
//! validated before anything else is initialized.

use std::env;

// Common constants
const MAX_CONNECTIONS: u32 = 10;
const CONNECTION_TIMEOUT_SECS: u64 = 30;

/// Base configuration shared by every component
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub environment: String,
}

/// Gallery service configuration
#[derive(Clone, Debug)]
pub struct GalleryConfig {
    pub base: BaseConfig,
    pub database_url: String,
    // Storage configuration
    pub storage_path: String,
    pub public_base_url: String,
    // Upload constraints
    pub max_file_size_bytes: usize,
    pub allowed_extensions: Vec<String>,
    pub allowed_content_types: Vec<String>,
    // Face pipeline configuration
    pub face_embedding_dim: usize,
    pub face_models_dir: String,
    pub face_auto_download_models: bool,
    pub face_detection_confidence: f32,
    pub face_nms_iou: f32,
    pub face_max_concurrent_extractions: usize,
    pub face_extraction_timeout_seconds: u64,
    pub default_search_max_distance: f32,
    // Task queue configuration
    pub task_queue_max_workers: usize,
    pub task_queue_poll_interval_ms: u64,
    pub task_queue_default_timeout_seconds: i32,
    pub task_queue_max_retries: i32,
    /// Interval in seconds between runs of the stale task reaper. 0 = disabled.
    pub task_queue_stale_task_reap_interval_secs: u64,
    /// Grace period in seconds added to task timeout before reaping stale running tasks.
    pub task_queue_stale_task_grace_period_secs: i64,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<GalleryConfig>);

impl Config {
    fn inner(&self) -> &GalleryConfig {
        &self.0
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.inner().base.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = GalleryConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.inner().validate()
    }

    // Convenience getters for common fields
    pub fn server_port(&self) -> u16 {
        self.inner().base.server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.inner().base.cors_origins
    }

    pub fn db_max_connections(&self) -> u32 {
        self.inner().base.db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.inner().base.db_timeout_seconds
    }

    pub fn environment(&self) -> &str {
        &self.inner().base.environment
    }

    pub fn database_url(&self) -> &str {
        &self.inner().database_url
    }

    pub fn storage_path(&self) -> &str {
        &self.inner().storage_path
    }

    pub fn public_base_url(&self) -> &str {
        &self.inner().public_base_url
    }

    pub fn max_file_size_bytes(&self) -> usize {
        self.inner().max_file_size_bytes
    }

    pub fn allowed_extensions(&self) -> &[String] {
        &self.inner().allowed_extensions
    }

    pub fn allowed_content_types(&self) -> &[String] {
        &self.inner().allowed_content_types
    }

    pub fn face_embedding_dim(&self) -> usize {
        self.inner().face_embedding_dim
    }

    pub fn face_models_dir(&self) -> &str {
        &self.inner().face_models_dir
    }

    pub fn face_auto_download_models(&self) -> bool {
        self.inner().face_auto_download_models
    }

    pub fn face_detection_confidence(&self) -> f32 {
        self.inner().face_detection_confidence
    }

    pub fn face_nms_iou(&self) -> f32 {
        self.inner().face_nms_iou
    }

    pub fn face_max_concurrent_extractions(&self) -> usize {
        self.inner().face_max_concurrent_extractions
    }

    pub fn face_extraction_timeout_seconds(&self) -> u64 {
        self.inner().face_extraction_timeout_seconds
    }

    pub fn default_search_max_distance(&self) -> f32 {
        self.inner().default_search_max_distance
    }

    pub fn task_queue_max_workers(&self) -> usize {
        self.inner().task_queue_max_workers
    }

    pub fn task_queue_poll_interval_ms(&self) -> u64 {
        self.inner().task_queue_poll_interval_ms
    }

    pub fn task_queue_default_timeout_seconds(&self) -> i32 {
        self.inner().task_queue_default_timeout_seconds
    }

    pub fn task_queue_max_retries(&self) -> i32 {
        self.inner().task_queue_max_retries
    }

    pub fn task_queue_stale_task_reap_interval_secs(&self) -> u64 {
        self.inner().task_queue_stale_task_reap_interval_secs
    }

    pub fn task_queue_stale_task_grace_period_secs(&self) -> i64 {
        self.inner().task_queue_stale_task_grace_period_secs
    }
}

impl GalleryConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        const MAX_FILE_SIZE_BYTES: usize = 25 * 1024 * 1024;
        const FACE_EMBEDDING_DIM: usize = 512;
        const FACE_DETECTION_CONFIDENCE: f32 = 0.5;
        const FACE_NMS_IOU: f32 = 0.4;
        const FACE_MAX_CONCURRENT_EXTRACTIONS: usize = 2;
        const FACE_EXTRACTION_TIMEOUT_SECS: u64 = 60;
        const DEFAULT_SEARCH_MAX_DISTANCE: f32 = 0.6;
        const TASK_QUEUE_MAX_WORKERS: usize = 4;
        const TASK_QUEUE_POLL_INTERVAL_MS: u64 = 1000;
        const TASK_QUEUE_DEFAULT_TIMEOUT_SECS: i32 = 3600;
        const TASK_QUEUE_MAX_RETRIES: i32 = 0;
        const STALE_TASK_REAP_INTERVAL_SECS: u64 = 300;
        const STALE_TASK_GRACE_PERIOD_SECS: i64 = 300;

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
        let is_production =
            environment.to_lowercase() == "production" || environment.to_lowercase() == "prod";
        if is_production && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        let allowed_extensions = env::var("ALLOWED_EXTENSIONS")
            .unwrap_or_else(|_| "jpg,jpeg,png,webp".to_string())
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .collect();

        let allowed_content_types = env::var("ALLOWED_CONTENT_TYPES")
            .unwrap_or_else(|_| "image/jpeg,image/png,image/webp".to_string())
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .collect();

        let base = BaseConfig {
            server_port: env::var("PORT")
                .or_else(|_| env::var("SERVER_PORT"))
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            cors_origins,
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: env::var("DB_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| CONNECTION_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            environment,
        };

        let config = GalleryConfig {
            base,
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            storage_path: env::var("STORAGE_PATH")
                .unwrap_or_else(|_| "./data/storage".to_string()),
            public_base_url: env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            max_file_size_bytes: env::var("MAX_FILE_SIZE_BYTES")
                .unwrap_or_else(|_| MAX_FILE_SIZE_BYTES.to_string())
                .parse()
                .unwrap_or(MAX_FILE_SIZE_BYTES),
            allowed_extensions,
            allowed_content_types,
            face_embedding_dim: env::var("FACE_EMBEDDING_DIM")
                .unwrap_or_else(|_| FACE_EMBEDDING_DIM.to_string())
                .parse()
                .unwrap_or(FACE_EMBEDDING_DIM),
            face_models_dir: env::var("FACE_MODELS_DIR")
                .unwrap_or_else(|_| "./data/models".to_string()),
            face_auto_download_models: env::var("FACE_AUTO_DOWNLOAD_MODELS")
                .unwrap_or_else(|_| "true".to_string())
                .to_lowercase()
                .parse()
                .unwrap_or(true),
            face_detection_confidence: env::var("FACE_DETECTION_CONFIDENCE")
                .unwrap_or_else(|_| FACE_DETECTION_CONFIDENCE.to_string())
                .parse()
                .unwrap_or(FACE_DETECTION_CONFIDENCE),
            face_nms_iou: env::var("FACE_NMS_IOU")
                .unwrap_or_else(|_| FACE_NMS_IOU.to_string())
                .parse()
                .unwrap_or(FACE_NMS_IOU),
            face_max_concurrent_extractions: env::var("FACE_MAX_CONCURRENT_EXTRACTIONS")
                .unwrap_or_else(|_| FACE_MAX_CONCURRENT_EXTRACTIONS.to_string())
                .parse()
                .unwrap_or(FACE_MAX_CONCURRENT_EXTRACTIONS),
            face_extraction_timeout_seconds: env::var("FACE_EXTRACTION_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| FACE_EXTRACTION_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(FACE_EXTRACTION_TIMEOUT_SECS),
            default_search_max_distance: env::var("DEFAULT_SEARCH_MAX_DISTANCE")
                .unwrap_or_else(|_| DEFAULT_SEARCH_MAX_DISTANCE.to_string())
                .parse()
                .unwrap_or(DEFAULT_SEARCH_MAX_DISTANCE),
            task_queue_max_workers: env::var("TASK_QUEUE_MAX_WORKERS")
                .unwrap_or_else(|_| TASK_QUEUE_MAX_WORKERS.to_string())
                .parse()
                .unwrap_or(TASK_QUEUE_MAX_WORKERS),
            task_queue_poll_interval_ms: env::var("TASK_QUEUE_POLL_INTERVAL_MS")
                .unwrap_or_else(|_| TASK_QUEUE_POLL_INTERVAL_MS.to_string())
                .parse()
                .unwrap_or(TASK_QUEUE_POLL_INTERVAL_MS),
            task_queue_default_timeout_seconds: env::var("TASK_QUEUE_DEFAULT_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| TASK_QUEUE_DEFAULT_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(TASK_QUEUE_DEFAULT_TIMEOUT_SECS),
            task_queue_max_retries: env::var("TASK_QUEUE_MAX_RETRIES")
                .unwrap_or_else(|_| TASK_QUEUE_MAX_RETRIES.to_string())
                .parse()
                .unwrap_or(TASK_QUEUE_MAX_RETRIES),
            task_queue_stale_task_reap_interval_secs: env::var("STALE_TASK_REAP_INTERVAL_SECS")
                .unwrap_or_else(|_| STALE_TASK_REAP_INTERVAL_SECS.to_string())
                .parse()
                .unwrap_or(STALE_TASK_REAP_INTERVAL_SECS),
            task_queue_stale_task_grace_period_secs: env::var("STALE_TASK_GRACE_PERIOD_SECS")
                .unwrap_or_else(|_| STALE_TASK_GRACE_PERIOD_SECS.to_string())
                .parse()
                .unwrap_or(STALE_TASK_GRACE_PERIOD_SECS),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !self.database_url.starts_with("postgresql://")
            && !self.database_url.starts_with("postgres://")
        {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be a valid PostgreSQL connection string"
            ));
        }

        // The vector column dimension is baked into the schema; only the
        // dimensions shipped by supported face models are accepted.
        if ![128, 256, 512, 1024].contains(&self.face_embedding_dim) {
            return Err(anyhow::anyhow!(
                "FACE_EMBEDDING_DIM must be one of 128, 256, 512, 1024 (got {})",
                self.face_embedding_dim
            ));
        }

        if self.face_max_concurrent_extractions == 0 {
            return Err(anyhow::anyhow!(
                "FACE_MAX_CONCURRENT_EXTRACTIONS must be at least 1"
            ));
        }

        if self.face_extraction_timeout_seconds == 0 {
            return Err(anyhow::anyhow!(
                "FACE_EXTRACTION_TIMEOUT_SECONDS must be at least 1"
            ));
        }

        if !(0.0..=1.0).contains(&self.face_detection_confidence) {
            return Err(anyhow::anyhow!(
                "FACE_DETECTION_CONFIDENCE must be between 0.0 and 1.0"
            ));
        }

        if !(0.0..=1.0).contains(&self.face_nms_iou) {
            return Err(anyhow::anyhow!("FACE_NMS_IOU must be between 0.0 and 1.0"));
        }

        if !(0.0..=2.0).contains(&self.default_search_max_distance)
            || self.default_search_max_distance == 0.0
        {
            return Err(anyhow::anyhow!(
                "DEFAULT_SEARCH_MAX_DISTANCE must be in (0.0, 2.0]"
            ));
        }

        if self.task_queue_max_workers == 0 {
            return Err(anyhow::anyhow!("TASK_QUEUE_MAX_WORKERS must be at least 1"));
        }

        if self.max_file_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_FILE_SIZE_BYTES must be at least 1"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> GalleryConfig {
        GalleryConfig {
            base: BaseConfig {
                server_port: 3000,
                cors_origins: vec!["*".to_string()],
                db_max_connections: 10,
                db_timeout_seconds: 30,
                environment: "test".to_string(),
            },
            database_url: "postgresql://localhost/gala".to_string(),
            storage_path: "./data/storage".to_string(),
            public_base_url: "http://localhost:3000".to_string(),
            max_file_size_bytes: 25 * 1024 * 1024,
            allowed_extensions: vec!["jpg".to_string(), "png".to_string()],
            allowed_content_types: vec!["image/jpeg".to_string()],
            face_embedding_dim: 512,
            face_models_dir: "./data/models".to_string(),
            face_auto_download_models: true,
            face_detection_confidence: 0.5,
            face_nms_iou: 0.4,
            face_max_concurrent_extractions: 2,
            face_extraction_timeout_seconds: 60,
            default_search_max_distance: 0.6,
            task_queue_max_workers: 4,
            task_queue_poll_interval_ms: 1000,
            task_queue_default_timeout_seconds: 3600,
            task_queue_max_retries: 0,
            task_queue_stale_task_reap_interval_secs: 300,
            task_queue_stale_task_grace_period_secs: 300,
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(test_config().validate().is_ok());
    }

    #[test]
    fn test_rejects_non_postgres_url() {
        let mut config = test_config();
        config.database_url = "mysql://localhost/gala".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_unsupported_embedding_dim() {
        let mut config = test_config();
        config.face_embedding_dim = 300;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("FACE_EMBEDDING_DIM"));
    }

    #[test]
    fn test_rejects_zero_workers() {
        let mut config = test_config();
        config.task_queue_max_workers = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_out_of_range_search_distance() {
        let mut config = test_config();
        config.default_search_max_distance = 2.5;
        assert!(config.validate().is_err());
        config.default_search_max_distance = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_postgres_scheme_alias_accepted() {
        let mut config = test_config();
        config.database_url = "postgres://localhost/gala".to_string();
        assert!(config.validate().is_ok());
    }
}
