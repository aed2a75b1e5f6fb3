use serde::Deserialize;

pub const BACKEND_MEMORY: &str = "memory";
pub const BACKEND_SURREAL: &str = "surreal";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app_env: String,
    pub port: u16,
    pub log_level: String,
    pub data_backend: String,
    pub surreal_endpoint: String,
    pub surreal_ns: String,
    pub surreal_db: String,
    pub surreal_user: String,
    pub surreal_pass: String,
    pub jwt_secret: String,
    pub fee_job_interval_ms: u64,
    pub fee_job_run_on_start: bool,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();
        let cfg = config::Config::builder()
            .set_default("app_env", "development")?
            .set_default("port", 3000)?
            .set_default("log_level", "info")?
            .set_default("data_backend", BACKEND_MEMORY)?
            .set_default("surreal_endpoint", "ws://127.0.0.1:8000")?
            .set_default("surreal_ns", "tutorhub")?
            .set_default("surreal_db", "main")?
            .set_default("surreal_user", "root")?
            .set_default("surreal_pass", "root")?
            .set_default("jwt_secret", "dev-secret")?
            .set_default("fee_job_interval_ms", 86_400_000)?
            .set_default("fee_job_run_on_start", true)?
            .add_source(config::Environment::default().separator("__"))
            .build()?;
        cfg.try_deserialize()
    }

    pub fn is_production(&self) -> bool {
        self.app_env.eq_ignore_ascii_case("production")
    }

    pub fn is_test(&self) -> bool {
        self.app_env.eq_ignore_ascii_case("test")
    }

    pub fn uses_surreal(&self) -> bool {
        self.data_backend.eq_ignore_ascii_case(BACKEND_SURREAL)
    }

    /// Defaults suitable for unit tests: memory backend, fixed secret.
    pub fn for_tests() -> Self {
        Self {
            app_env: "test".to_string(),
            port: 0,
            log_level: "warn".to_string(),
            data_backend: BACKEND_MEMORY.to_string(),
            surreal_endpoint: "ws://127.0.0.1:8000".to_string(),
            surreal_ns: "tutorhub".to_string(),
            surreal_db: "test".to_string(),
            surreal_user: "root".to_string(),
            surreal_pass: "root".to_string(),
            jwt_secret: "test-secret".to_string(),
            fee_job_interval_ms: 1_000,
            fee_job_run_on_start: false,
        }
    }
}
