use std::env;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, Utc};
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_url: String,
    pub api_key: String,
    pub jwt_secret: String,
    pub clinic_utc_offset_minutes: i32,
    pub booking_window_days: i64,
    pub max_availability_range_days: i64,
    pub request_timeout_secs: u64,
    pub redis_url: Option<String>,
    pub guest_intent_ttl_secs: u64,
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            api_key: String::new(),
            jwt_secret: String::new(),
            clinic_utc_offset_minutes: 0,
            booking_window_days: 30,
            max_availability_range_days: 90,
            request_timeout_secs: 15,
            redis_url: None,
            guest_intent_ttl_secs: 3600,
            port: 3000,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let config = Self {
            api_url: env::var("CLINIC_API_URL")
                .unwrap_or_else(|_| {
                    warn!("CLINIC_API_URL not set, using empty value");
                    String::new()
                }),
            api_key: env::var("CLINIC_API_KEY")
                .unwrap_or_else(|_| {
                    warn!("CLINIC_API_KEY not set, using empty value");
                    String::new()
                }),
            jwt_secret: env::var("CLINIC_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("CLINIC_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            clinic_utc_offset_minutes: parse_or("CLINIC_UTC_OFFSET_MINUTES", defaults.clinic_utc_offset_minutes),
            booking_window_days: parse_or("BOOKING_WINDOW_DAYS", defaults.booking_window_days),
            max_availability_range_days: parse_or("MAX_AVAILABILITY_RANGE_DAYS", defaults.max_availability_range_days),
            request_timeout_secs: parse_or("REQUEST_TIMEOUT_SECS", defaults.request_timeout_secs),
            redis_url: env::var("REDIS_URL").ok().filter(|url| !url.is_empty()),
            guest_intent_ttl_secs: parse_or("GUEST_INTENT_TTL_SECS", defaults.guest_intent_ttl_secs),
            port: parse_or("PORT", defaults.port),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.api_url.is_empty()
            && !self.api_key.is_empty()
            && !self.jwt_secret.is_empty()
    }

    /// Fixed offset of the clinic's wall clock. Out-of-range values fall back to UTC.
    pub fn clinic_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.clinic_utc_offset_minutes * 60)
            .unwrap_or_else(|| {
                warn!("CLINIC_UTC_OFFSET_MINUTES out of range ({}), using UTC", self.clinic_utc_offset_minutes);
                Utc.fix()
            })
    }

    /// Today's calendar date on the clinic's wall clock.
    pub fn clinic_today(&self) -> NaiveDate {
        self.clinic_now().date_naive()
    }

    pub fn clinic_now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.clinic_offset())
    }

    /// Interprets a wall-clock date and time as clinic-local.
    pub fn clinic_local(&self, at: NaiveDateTime) -> DateTime<FixedOffset> {
        let offset = self.clinic_offset();
        at.and_local_timezone(offset)
            .single()
            .unwrap_or_else(|| at.and_utc().with_timezone(&offset))
    }
}

fn parse_or<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using default {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}
