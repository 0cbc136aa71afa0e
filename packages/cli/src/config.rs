/// Server configuration loaded from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub cors_origin: String,
}

impl Config {
    pub fn from_env() -> Self {
        let port = std::env::var("FORGEBOX_PORT")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(4100);

        let cors_origin = std::env::var("FORGEBOX_CORS_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        Self { port, cors_origin }
    }
}
