use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    /// Process-local store; data is lost on restart.
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" => Ok(StorageBackend::Postgres),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(format!("unknown storage backend: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Option<String>,
    pub app_url: String,
    pub jwt_secret: String,
    pub port: u16,
    pub storage_backend: StorageBackend,
    pub allowed_origins: Vec<String>,
    // Jobs and search
    pub job_ttl_hours: i64,
    pub max_search_radius_m: f64,
    pub expiry_sweep_secs: u64,
    pub profile_cache_ttl_secs: u64,
    // External collaborators
    pub geocoder_url: String,
    pub geocode_timeout_secs: u64,
    pub notify_webhook_url: Option<String>,
    pub notify_timeout_secs: u64,
}

impl Config {
    pub fn init() -> Config {
        let jwt_secret = std::env::var("JWT_SECRET_KEY").expect("JWT_SECRET_KEY must be set");
        let app_url = std::env::var("APP_URL").expect("APP_URL must be set");

        let storage_backend = env_or("STORAGE_BACKEND", StorageBackend::Postgres);
        let database_url = std::env::var("DATABASE_URL").ok();
        if storage_backend == StorageBackend::Postgres && database_url.is_none() {
            panic!("DATABASE_URL must be set when STORAGE_BACKEND=postgres");
        }

        let allowed_origins = std::env::var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173,http://localhost:8000".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        Config {
            database_url,
            app_url,
            jwt_secret,
            port: env_or("PORT", 8000),
            storage_backend,
            allowed_origins,
            job_ttl_hours: env_or("JOB_TTL_HOURS", 168),
            max_search_radius_m: env_or("MAX_SEARCH_RADIUS_M", 500_000.0),
            expiry_sweep_secs: env_or("EXPIRY_SWEEP_SECS", 300),
            profile_cache_ttl_secs: env_or("PROFILE_CACHE_TTL_SECS", 60),
            geocoder_url: std::env::var("GEOCODER_URL")
                .unwrap_or_else(|_| "https://nominatim.openstreetmap.org/search".to_string()),
            geocode_timeout_secs: env_or("GEOCODE_TIMEOUT_SECS", 5),
            notify_webhook_url: std::env::var("NOTIFY_WEBHOOK_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            notify_timeout_secs: env_or("NOTIFY_TIMEOUT_SECS", 10),
        }
    }
}

/// Parsed value of `key`, or `default` when unset. A value that does not
/// parse is a startup error.
fn env_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|e| panic!("{} has an invalid value {:?}: {}", key, raw, e)),
        Err(_) => default,
    }
}

#[cfg(test)]
impl Config {
    pub fn for_tests() -> Config {
        Config {
            database_url: None,
            app_url: "http://localhost:3000".to_string(),
            jwt_secret: "test-secret".to_string(),
            port: 0,
            storage_backend: StorageBackend::Memory,
            allowed_origins: vec![],
            job_ttl_hours: 168,
            max_search_radius_m: 500_000.0,
            expiry_sweep_secs: 300,
            profile_cache_ttl_secs: 60,
            geocoder_url: "http://127.0.0.1:9/search".to_string(),
            geocode_timeout_secs: 1,
            notify_webhook_url: None,
            notify_timeout_secs: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_backend_parsing() {
        assert_eq!("memory".parse::<StorageBackend>(), Ok(StorageBackend::Memory));
        assert_eq!(" Postgres ".parse::<StorageBackend>(), Ok(StorageBackend::Postgres));
        assert!("redis".parse::<StorageBackend>().is_err());
    }
}
