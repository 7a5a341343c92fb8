use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

/// 单个限流档位
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimitConfig {
    pub rps: f64,
    pub burst: u32,
    pub ttl: Duration,
}

#[derive(Debug, Clone)]
pub struct OAuthClientConfig {
    pub client_id: String,
    pub secret: String,
    pub redirect_url: String,
}

impl OAuthClientConfig {
    pub fn is_configured(&self) -> bool {
        !self.client_id.is_empty() && !self.secret.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub app_url: String,
    pub frontend_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub http_timeout: Duration,
    pub cors_allowed_origins: Vec<String>,
    pub cors_max_age: Duration,

    pub database_url: String,
    pub database_max_connections: u32,
    pub redis_url: String,
    pub nats_url: String,
    pub mail_request_timeout: Duration,

    pub jwt_signing_key: String,
    pub jwt_access_token_ttl: Duration,
    pub jwt_refresh_token_ttl: Duration,

    pub password_salt: String,
    pub note_password_salt: String,
    pub min_password_length: usize,
    pub reserved_slugs: Vec<String>,
    pub logout_on_password_change: bool,

    pub cache_users_ttl: Duration,
    pub cache_note_ttl: Duration,

    pub verification_token_ttl: Duration,
    pub reset_password_token_ttl: Duration,
    pub change_email_token_ttl: Duration,

    pub google: OAuthClientConfig,
    pub github: OAuthClientConfig,

    pub rate_limit: RateLimitConfig,
    pub slow_rate_limit: RateLimitConfig,

    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let redis_url = {
            let addr = var_or("REDIS_ADDR", "127.0.0.1:6379");
            let password = var_or("REDIS_PASSWORD", "");
            let db: u32 = parse_or("REDIS_DB", 0)?;
            if password.is_empty() {
                format!("redis://{addr}/{db}")
            } else {
                format!("redis://:{password}@{addr}/{db}")
            }
        };

        Ok(Config {
            app_url: var_or("APP_URL", "http://localhost:8080"),
            frontend_url: var_or("FRONTEND_URL", "http://localhost:3000"),
            server_host: var_or("SERVER_HOST", "0.0.0.0"),
            server_port: parse_or("SERVER_PORT", 8080)?,
            http_timeout: duration_or("HTTP_TIMEOUT", Duration::from_secs(10))?,
            cors_allowed_origins: list_or("CORS_ALLOWED_ORIGINS", ""),
            cors_max_age: duration_or("CORS_MAX_AGE", Duration::from_secs(300))?,

            database_url: required("POSTGRES_DSN")?,
            database_max_connections: parse_or("POSTGRES_MAX_CONNECTIONS", 10)?,
            redis_url,
            nats_url: var_or("NATS_URL", "nats://127.0.0.1:4222"),
            mail_request_timeout: duration_or("MAIL_REQUEST_TIMEOUT", Duration::from_secs(5))?,

            jwt_signing_key: required("JWT_SIGNING_KEY")?,
            jwt_access_token_ttl: duration_or("JWT_ACCESS_TOKEN_TTL", Duration::from_secs(15 * 60))?,
            jwt_refresh_token_ttl: duration_or(
                "JWT_REFRESH_TOKEN_TTL",
                Duration::from_secs(24 * 3600),
            )?,

            password_salt: var_or("PASSWORD_SALT", ""),
            note_password_salt: var_or("NOTE_PASSWORD_SALT", ""),
            min_password_length: parse_or("MIN_PASSWORD_LENGTH", 6)?,
            reserved_slugs: list_or("RESERVED_SLUGS", "read,unread"),
            logout_on_password_change: parse_or("LOGOUT_ON_PASSWORD_CHANGE", false)?,

            cache_users_ttl: duration_or("CACHE_USERS_TTL", Duration::from_secs(3600))?,
            cache_note_ttl: duration_or("CACHE_NOTE_TTL", Duration::from_secs(3600))?,

            verification_token_ttl: duration_or(
                "VERIFICATION_TOKEN_TTL",
                Duration::from_secs(24 * 3600),
            )?,
            reset_password_token_ttl: duration_or(
                "RESET_PASSWORD_TOKEN_TTL",
                Duration::from_secs(3600),
            )?,
            change_email_token_ttl: duration_or(
                "CHANGE_EMAIL_TOKEN_TTL",
                Duration::from_secs(24 * 3600),
            )?,

            google: OAuthClientConfig {
                client_id: var_or("GOOGLE_CLIENT_ID", ""),
                secret: var_or("GOOGLE_SECRET", ""),
                redirect_url: var_or("GOOGLE_REDIRECT_URL", ""),
            },
            github: OAuthClientConfig {
                client_id: var_or("GITHUB_CLIENT_ID", ""),
                secret: var_or("GITHUB_SECRET", ""),
                redirect_url: var_or("GITHUB_REDIRECT_URL", ""),
            },

            rate_limit: RateLimitConfig {
                rps: parse_or("RATELIMITER_RPS", 100.0)?,
                burst: parse_or("RATELIMITER_BURST", 10)?,
                ttl: duration_or("RATELIMITER_TTL", Duration::from_secs(60))?,
            },
            slow_rate_limit: RateLimitConfig {
                rps: parse_or("SLOW_RATELIMITER_RPS", 2.0)?,
                burst: parse_or("SLOW_RATELIMITER_BURST", 2)?,
                ttl: duration_or("SLOW_RATELIMITER_TTL", Duration::from_secs(60))?,
            },

            log_format: log_format()?,
        })
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

/// 邮件 worker 的配置，与 API 服务分开加载
#[derive(Debug, Clone)]
pub struct MailerConfig {
    pub nats_url: String,
    pub app_url: String,
    pub frontend_url: String,
    pub mailgun_from: String,
    pub mailgun_domain: String,
    pub mailgun_api_key: String,
    pub mailgun_base_url: String,
    pub send_timeout: Duration,
    pub log_format: LogFormat,
}

impl MailerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        Ok(MailerConfig {
            nats_url: var_or("NATS_URL", "nats://127.0.0.1:4222"),
            app_url: var_or("APP_URL", "http://localhost:8080"),
            frontend_url: var_or("FRONTEND_URL", "http://localhost:3000"),
            mailgun_from: required("MAILGUN_FROM")?,
            mailgun_domain: required("MAILGUN_DOMAIN")?,
            mailgun_api_key: required("MAILGUN_API_KEY")?,
            mailgun_base_url: var_or("MAILGUN_BASE_URL", "https://api.mailgun.net/v3"),
            send_timeout: duration_or("MAIL_SEND_TIMEOUT", Duration::from_secs(10))?,
            log_format: log_format()?,
        })
    }
}

fn log_format() -> Result<LogFormat, ConfigError> {
    match var_or("LOG_FORMAT", "text").trim().to_ascii_lowercase().as_str() {
        "json" => Ok(LogFormat::Json),
        "text" | "" => Ok(LogFormat::Text),
        other => Err(ConfigError::Invalid("LOG_FORMAT", other.to_string())),
    }
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(key)),
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(key, raw)),
        _ => Ok(default),
    }
}

fn duration_or(key: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => {
            parse_duration(&raw).ok_or(ConfigError::Invalid(key, raw))
        }
        _ => Ok(default),
    }
}

fn list_or(key: &str, default: &str) -> Vec<String> {
    var_or(key, default)
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// 解析 `90s`、`15m`、`24h`、`7d` 形式的时长，纯数字按秒处理
pub fn parse_duration(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    let (digits, unit) = match raw.find(|c: char| !c.is_ascii_digit()) {
        Some(idx) => raw.split_at(idx),
        None => (raw, "s"),
    };
    let value: u64 = digits.parse().ok()?;
    let secs = match unit {
        "s" => value,
        "m" => value.checked_mul(60)?,
        "h" => value.checked_mul(3600)?,
        "d" => value.checked_mul(86_400)?,
        _ => return None,
    };
    Some(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_duration_suffixes() {
        assert_eq!(parse_duration("30"), Some(Duration::from_secs(30)));
        assert_eq!(parse_duration("45s"), Some(Duration::from_secs(45)));
        assert_eq!(parse_duration("15m"), Some(Duration::from_secs(900)));
        assert_eq!(parse_duration(" 24h "), Some(Duration::from_secs(86_400)));
        assert_eq!(parse_duration("2d"), Some(Duration::from_secs(172_800)));
    }

    #[test]
    fn rejects_malformed_durations() {
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("m"), None);
        assert_eq!(parse_duration("10w"), None);
        assert_eq!(parse_duration("1.5h"), None);
    }
}
