//! Client configuration parsed from environment variables.
//!
//! Variables (all optional):
//! - `ENTERTAINARR_BASE_URL`: origin of the remote service, default `http://127.0.0.1:3000`
//! - `ENTERTAINARR_LOGIN_SCREEN`: default `/login`
//! - `ENTERTAINARR_HOME_SCREEN`: default `/`
//! - `ENTERTAINARR_REVALIDATE_ON_FOCUS`: default `true`
//! - `ENTERTAINARR_REVALIDATE_ON_RECONNECT`: default `true`
//! - `ENTERTAINARR_REQUEST_TIMEOUT_SECS`: default 30
//! - `ENTERTAINARR_CONNECT_TIMEOUT_SECS`: default 10

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::time::Duration;

use crate::error::ConfigError;
use crate::guard::gate::ScreenId;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:3000";
pub const DEFAULT_LOGIN_SCREEN: &str = "/login";
pub const DEFAULT_HOME_SCREEN: &str = "/";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl HttpTimeouts {
    #[must_use]
    pub fn request(&self) -> Duration {
        Duration::from_secs(self.request_secs)
    }

    #[must_use]
    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub login_screen: ScreenId,
    pub home_screen: ScreenId,
    pub revalidate_on_focus: bool,
    pub revalidate_on_reconnect: bool,
    pub timeouts: HttpTimeouts,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            login_screen: ScreenId::new(DEFAULT_LOGIN_SCREEN),
            home_screen: ScreenId::new(DEFAULT_HOME_SCREEN),
            revalidate_on_focus: true,
            revalidate_on_reconnect: true,
            timeouts: HttpTimeouts::default(),
        }
    }
}

impl ClientConfig {
    /// Build config from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a boolean flag is not recognized or the base URL is blank.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if a boolean flag is not recognized or the base URL is blank.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup("ENTERTAINARR_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());
        let base_url = base_url.trim().trim_end_matches('/').to_owned();
        if base_url.is_empty() {
            return Err(ConfigError::Empty { key: "ENTERTAINARR_BASE_URL" });
        }

        let login_screen = screen_or(&lookup, "ENTERTAINARR_LOGIN_SCREEN", DEFAULT_LOGIN_SCREEN);
        let home_screen = screen_or(&lookup, "ENTERTAINARR_HOME_SCREEN", DEFAULT_HOME_SCREEN);

        let revalidate_on_focus = flag_or(&lookup, "ENTERTAINARR_REVALIDATE_ON_FOCUS", true)?;
        let revalidate_on_reconnect = flag_or(&lookup, "ENTERTAINARR_REVALIDATE_ON_RECONNECT", true)?;

        let timeouts = HttpTimeouts {
            request_secs: env_parse(&lookup, "ENTERTAINARR_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: env_parse(&lookup, "ENTERTAINARR_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
        };

        Ok(Self { base_url, login_screen, home_screen, revalidate_on_focus, revalidate_on_reconnect, timeouts })
    }

    /// Absolute URL for an API path such as `/api/users/me`.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

pub(crate) fn env_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn flag_or<F>(lookup: &F, key: &'static str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => env_bool(&raw).ok_or(ConfigError::InvalidValue { key, value: raw }),
    }
}

fn screen_or<F>(lookup: &F, key: &str, default: &str) -> ScreenId
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|raw| !raw.trim().is_empty())
        .map_or_else(|| ScreenId::new(default), ScreenId::new)
}

fn env_parse<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + Copy,
{
    lookup(key)
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}
