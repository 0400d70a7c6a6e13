use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub purge: PurgeConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Apply the bundled schema on server startup.
    #[serde(default)]
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PurgeConfig {
    /// Run every purge step inside a single transaction.
    #[serde(default = "default_atomic")]
    pub atomic: bool,
    /// Count what would be deleted without writing anything.
    #[serde(default)]
    pub dry_run: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_max_connections() -> u32 {
    10
}

fn default_atomic() -> bool {
    true
}

impl Config {
    /// Load configuration from `.env` and the process environment.
    ///
    /// Nested keys use `__` as separator (`DATABASE__MAX_CONNECTIONS`). A plain
    /// `DATABASE_URL` takes precedence over `DATABASE__URL` so the tools can
    /// share the connection string with the rest of the application.
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self::builder()?
            .add_source(config::Environment::default().separator("__"))
            .set_override_option("database.url", std::env::var("DATABASE_URL").ok())?
            .build()?;

        Ok(config.try_deserialize()?)
    }

    fn builder() -> anyhow::Result<config::ConfigBuilder<config::builder::DefaultState>> {
        Ok(config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("database.url", "postgres://localhost/video_app")?
            .set_default("database.max_connections", 10)?
            .set_default("database.run_migrations", false)?
            .set_default("purge.atomic", true)?
            .set_default("purge.dry_run", false)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::{File, FileFormat};

    fn load_from(toml: &str) -> Config {
        Config::builder()
            .unwrap()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = load_from("");

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.url, "postgres://localhost/video_app");
        assert_eq!(config.database.max_connections, 10);
        assert!(!config.database.run_migrations);
        assert!(config.purge.atomic);
        assert!(!config.purge.dry_run);
    }

    #[test]
    fn test_overrides() {
        let config = load_from(
            r#"
            [database]
            url = "postgres://db.internal/videos"
            max_connections = 2

            [purge]
            atomic = false
            dry_run = true
            "#,
        );

        assert_eq!(config.database.url, "postgres://db.internal/videos");
        assert_eq!(config.database.max_connections, 2);
        assert!(!config.purge.atomic);
        assert!(config.purge.dry_run);
    }
}
