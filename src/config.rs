// config.rs
use std::{fmt::Debug, ops::RangeInclusive, str::FromStr};

/// Upper bound on how far a counter offer may push a negotiation's deadline.
pub const MAX_NEGOTIATION_EXPIRY_DAYS: i64 = 365;

const DEFAULT_NEGOTIATION_EXPIRY_DAYS: i64 = 7;
const DEFAULT_JOB_INTERVAL_SECS: u64 = 3600;
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub port: u16,
    /// Every counter offer pushes the deadline this many days forward.
    pub negotiation_expiry_days: i64,
    pub job_interval_secs: u64,
    pub allowed_origins: Vec<String>,
}

impl Config {
    pub fn init() -> Config {
        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let jwt_secret = std::env::var("JWT_SECRET_KEY").expect("JWT_SECRET_KEY must be set");

        let port = env_or("PORT", 8000);
        let negotiation_expiry_days = env_in_range(
            "NEGOTIATION_EXPIRY_DAYS",
            DEFAULT_NEGOTIATION_EXPIRY_DAYS,
            1..=MAX_NEGOTIATION_EXPIRY_DAYS,
        );
        let job_interval_secs = env_in_range(
            "JOB_INTERVAL_SECS",
            DEFAULT_JOB_INTERVAL_SECS,
            1..=u64::MAX,
        );

        let allowed_origins = std::env::var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        Config {
            database_url,
            jwt_secret,
            port,
            negotiation_expiry_days,
            job_interval_secs,
            allowed_origins,
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.parse::<T>().unwrap_or_else(|_| {
            tracing::warn!("{} has an invalid value {:?}, using the default", key, raw);
            default
        }),
        Err(_) => default,
    }
}

fn env_in_range<T>(key: &str, default: T, range: RangeInclusive<T>) -> T
where
    T: FromStr + PartialOrd + Debug,
{
    parse_in_range(key, std::env::var(key).ok().as_deref(), default, range)
}

fn parse_in_range<T>(key: &str, raw: Option<&str>, default: T, range: RangeInclusive<T>) -> T
where
    T: FromStr + PartialOrd + Debug,
{
    let Some(raw) = raw else {
        return default;
    };

    match raw.trim().parse::<T>() {
        Ok(value) if range.contains(&value) => value,
        Ok(value) => {
            tracing::warn!(
                "{} must be within {:?}..={:?}, got {:?}; using the default {:?}",
                key,
                range.start(),
                range.end(),
                value,
                default
            );
            default
        }
        Err(_) => {
            tracing::warn!("{} has an invalid value {:?}, using the default", key, raw);
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_job_interval_falls_back_to_default() {
        assert_eq!(
            parse_in_range("JOB_INTERVAL_SECS", Some("0"), DEFAULT_JOB_INTERVAL_SECS, 1..=u64::MAX),
            DEFAULT_JOB_INTERVAL_SECS
        );
        assert_eq!(
            parse_in_range("JOB_INTERVAL_SECS", Some("30"), DEFAULT_JOB_INTERVAL_SECS, 1..=u64::MAX),
            30
        );
    }

    #[test]
    fn expiry_days_outside_bounds_fall_back_to_default() {
        let parse = |raw| {
            parse_in_range(
                "NEGOTIATION_EXPIRY_DAYS",
                raw,
                DEFAULT_NEGOTIATION_EXPIRY_DAYS,
                1..=MAX_NEGOTIATION_EXPIRY_DAYS,
            )
        };

        assert_eq!(parse(Some("0")), DEFAULT_NEGOTIATION_EXPIRY_DAYS);
        assert_eq!(parse(Some("-1")), DEFAULT_NEGOTIATION_EXPIRY_DAYS);
        assert_eq!(parse(Some("100000000")), DEFAULT_NEGOTIATION_EXPIRY_DAYS);
        assert_eq!(parse(Some("seven")), DEFAULT_NEGOTIATION_EXPIRY_DAYS);
        assert_eq!(parse(None), DEFAULT_NEGOTIATION_EXPIRY_DAYS);
        assert_eq!(parse(Some(" 14 ")), 14);
        assert_eq!(parse(Some("365")), MAX_NEGOTIATION_EXPIRY_DAYS);
    }
}
