use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub redis_url: String,
    pub doctor_service_url: String,
    pub remote_timeout_secs: u64,
    pub cache_timeout_secs: u64,
    pub cache_ttl_secs: u64,
    pub server_port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            redis_url: "redis://localhost:6379".to_string(),
            doctor_service_url: "http://localhost:8081".to_string(),
            remote_timeout_secs: 5,
            cache_timeout_secs: 5,
            cache_ttl_secs: 300,
            server_port: 3000,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| {
                    warn!("REDIS_URL not set, using default");
                    defaults.redis_url.clone()
                }),
            doctor_service_url: env::var("DOCTOR_SERVICE_URL")
                .unwrap_or_else(|_| {
                    warn!("DOCTOR_SERVICE_URL not set, using default");
                    defaults.doctor_service_url.clone()
                }),
            remote_timeout_secs: parse_or("REMOTE_TIMEOUT_SECS", defaults.remote_timeout_secs),
            cache_timeout_secs: parse_or("CACHE_TIMEOUT_SECS", defaults.cache_timeout_secs),
            cache_ttl_secs: parse_or("APPOINTMENT_CACHE_TTL_SECS", defaults.cache_ttl_secs),
            server_port: parse_or("PORT", defaults.server_port),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty() && !self.supabase_anon_key.is_empty()
    }

    /// Upper bound for a single call to the doctor service.
    pub fn remote_timeout(&self) -> Duration {
        Duration::from_secs(self.remote_timeout_secs)
    }

    pub fn cache_timeout(&self) -> Duration {
        Duration::from_secs(self.cache_timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

fn parse_or<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value {:?}, using default {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_booking_contract() {
        let config = AppConfig::default();
        assert_eq!(config.remote_timeout(), Duration::from_secs(5));
        assert_eq!(config.cache_timeout(), Duration::from_secs(5));
        assert_eq!(config.cache_ttl(), Duration::from_secs(300));
        assert!(!config.is_configured());
    }

    #[test]
    fn invalid_numbers_fall_back() {
        env::set_var("SHARED_CONFIG_TEST_TIMEOUT", "not-a-number");
        assert_eq!(parse_or("SHARED_CONFIG_TEST_TIMEOUT", 7u64), 7);
        env::set_var("SHARED_CONFIG_TEST_TIMEOUT", " 12 ");
        assert_eq!(parse_or("SHARED_CONFIG_TEST_TIMEOUT", 7u64), 12);
        env::remove_var("SHARED_CONFIG_TEST_TIMEOUT");
    }
}
