use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub frontend_url: String,

    pub session_ttl_secs: i64,
    /// Sessions older than this get a fresh token on the next request
    /// that presents them.
    pub session_rotate_after_secs: i64,
    pub session_cookie_name: String,
    pub cookie_secure: bool,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()
                .expect("PORT must be a number"),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".into()),

            session_ttl_secs: env::var("SESSION_TTL_SECS")
                .unwrap_or_else(|_| "604800".into()) // 7 days
                .parse()
                .expect("SESSION_TTL_SECS must be a number"),
            session_rotate_after_secs: env::var("SESSION_ROTATE_AFTER_SECS")
                .unwrap_or_else(|_| "86400".into()) // 1 day
                .parse()
                .expect("SESSION_ROTATE_AFTER_SECS must be a number"),
            session_cookie_name: env::var("SESSION_COOKIE_NAME")
                .unwrap_or_else(|_| "ml_session".into()),
            cookie_secure: env::var("COOKIE_SECURE")
                .unwrap_or_else(|_| "true".into())
                .parse()
                .unwrap_or(true),
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
