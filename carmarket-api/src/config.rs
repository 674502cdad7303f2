use serde::Deserialize;

use carmarket_store::AggregatePolicy;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    /// Persistent holders fall back to process memory when unset.
    #[serde(default)]
    pub redis_url: Option<String>,
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    #[serde(default = "default_access_ttl")]
    pub jwt_access_ttl: i64,
    #[serde(default)]
    pub aggregate_policy: AggregatePolicy,
    #[serde(default = "default_seed_demo_data")]
    pub seed_demo_data: bool,
    #[serde(default = "default_admin_email")]
    pub admin_email: String,
    #[serde(default = "default_admin_password")]
    pub admin_password: String,
}

fn default_port() -> u16 { 3000 }
fn default_jwt_secret() -> String { "development-secret-change-in-production".into() }
fn default_access_ttl() -> i64 { 3600 }
fn default_seed_demo_data() -> bool { true }
fn default_admin_email() -> String { "admin@carmarket.local".into() }
fn default_admin_password() -> String { "Admin1234".into() }

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            redis_url: None,
            jwt_secret: default_jwt_secret(),
            jwt_access_ttl: default_access_ttl(),
            aggregate_policy: AggregatePolicy::default(),
            seed_demo_data: default_seed_demo_data(),
            admin_email: default_admin_email(),
            admin_password: default_admin_password(),
        }
    }
}

impl AppConfig {
    /// Read `CARMARKET__*` variables, after loading `.env` if present.
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let config = config::Config::builder()
            .add_source(
                config::Environment::with_prefix("CARMARKET")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Ok(config.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_source_yields_defaults() {
        let config: AppConfig = config::Config::builder()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(config.port, 3000);
        assert!(config.redis_url.is_none());
        assert_eq!(config.aggregate_policy, AggregatePolicy::RecomputeOnWrite);
        assert!(config.seed_demo_data);
    }

    #[test]
    fn policy_reads_snake_case() {
        let config: AppConfig = config::Config::builder()
            .set_override("aggregate_policy", "explicit")
            .unwrap()
            .set_override("seed_demo_data", false)
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(config.aggregate_policy, AggregatePolicy::Explicit);
        assert!(!config.seed_demo_data);
    }
}
