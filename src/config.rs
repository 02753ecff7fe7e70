use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub minio: Option<MinioConfig>,
    pub jwt: JwtConfig,
    pub upload: UploadConfig,
    pub archive: ArchiveConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    /// Public origin of the web app, used for share links and mock storage URLs.
    pub app_url: String,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// `None` switches the service to the in-memory mock store.
    pub url: Option<String>,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MinioConfig {
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    pub bucket: String,
    pub public_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub max_file_bytes: usize,
    pub max_request_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct ArchiveConfig {
    pub fetch_concurrency: usize,
    pub fetch_timeout: Duration,
}

fn parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(default)
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    pub fn load() -> Self {
        dotenvy::dotenv().ok();

        let minio = non_empty("MINIO_ENDPOINT").map(|endpoint| MinioConfig {
            endpoint,
            access_key: env::var("MINIO_ACCESS_KEY").unwrap_or_else(|_| "minioadmin".to_string()),
            secret_key: env::var("MINIO_SECRET_KEY").unwrap_or_else(|_| "minioadmin".to_string()),
            region: env::var("MINIO_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            bucket: env::var("MINIO_BUCKET").unwrap_or_else(|_| "stickers".to_string()),
            public_url: non_empty("MINIO_PUBLIC_URL"),
        });

        Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parsed("SERVER_PORT", 8080),
                environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
                app_url: env::var("APP_URL")
                    .map(|u| u.trim_end_matches('/').to_string())
                    .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            },
            database: DatabaseConfig {
                url: non_empty("DATABASE_URL"),
                max_connections: parsed("DB_MAX_CONNS", 10),
            },
            redis: RedisConfig {
                url: non_empty("REDIS_URL"),
            },
            minio,
            jwt: JwtConfig {
                secret: env::var("JWT_SECRET")
                    .unwrap_or_else(|_| "super-secret-jwt-key-change-in-production".to_string()),
                issuer: non_empty("JWT_ISSUER"),
            },
            upload: UploadConfig {
                max_file_bytes: parsed("UPLOAD_MAX_FILE_BYTES", 2 * 1024 * 1024),
                max_request_bytes: parsed("UPLOAD_MAX_REQUEST_BYTES", 25 * 1024 * 1024),
            },
            archive: ArchiveConfig {
                fetch_concurrency: parsed("ARCHIVE_FETCH_CONCURRENCY", 8usize).max(1),
                fetch_timeout: Duration::from_secs(parsed("FETCH_TIMEOUT_SECS", 30)),
            },
        }
    }

    /// True when no database is configured and the service runs on mock data.
    pub fn is_mock(&self) -> bool {
        self.database.url.is_none()
    }

    /// Configuration used by tests: mock store, memory objects, fixed secret.
    #[cfg(test)]
    pub fn for_tests() -> Self {
        Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                environment: "test".to_string(),
                app_url: "http://stickers.test".to_string(),
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 1,
            },
            redis: RedisConfig { url: None },
            minio: None,
            jwt: JwtConfig {
                secret: "test-secret".to_string(),
                issuer: None,
            },
            upload: UploadConfig {
                max_file_bytes: 2 * 1024 * 1024,
                max_request_bytes: 25 * 1024 * 1024,
            },
            archive: ArchiveConfig {
                fetch_concurrency: 4,
                fetch_timeout: Duration::from_secs(5),
            },
        }
    }
}
