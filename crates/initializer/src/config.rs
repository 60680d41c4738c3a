//! Controller configuration.
//!
//! Loaded once at startup from environment variables and handed to the
//! reconciler and provisioners by value; nothing here is global.

use crate::error::ControllerError;
use std::env;
use std::time::Duration;

/// Default loop cadence
pub const DEFAULT_RECONCILE_INTERVAL: Duration = Duration::from_secs(2);

/// Default deadline for a single cluster API call
pub const DEFAULT_API_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings shared by every initializer controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitializerConfig {
    /// Identity matched against the head of each object's pending list
    pub initializer_name: String,

    /// Namespace to watch; `None` watches all namespaces
    pub namespace: Option<String>,

    /// Delay between reconciliation cycles
    pub reconcile_interval: Duration,

    /// Deadline applied to each cluster API call
    pub api_timeout: Duration,

    /// Annotation that opts an object into provisioning
    pub annotation: String,

    /// When set, objects without `annotation: "true"` are released without provisioning
    pub require_annotation: bool,
}

impl InitializerConfig {
    /// Configuration with defaults for everything but identity and annotation.
    pub fn new(initializer_name: impl Into<String>, annotation: impl Into<String>) -> Self {
        Self {
            initializer_name: initializer_name.into(),
            namespace: None,
            reconcile_interval: DEFAULT_RECONCILE_INTERVAL,
            api_timeout: DEFAULT_API_TIMEOUT,
            annotation: annotation.into(),
            require_annotation: false,
        }
    }

    /// Loads configuration from the process environment.
    ///
    /// Recognised variables: `INITIALIZER_NAME`, `WATCH_NAMESPACE`,
    /// `RECONCILE_INTERVAL_SECS`, `API_TIMEOUT_SECS`,
    /// `INITIALIZER_ANNOTATION`, `REQUIRE_ANNOTATION`.
    pub fn from_env(default_name: &str, default_annotation: &str) -> Result<Self, ControllerError> {
        Self::from_lookup(default_name, default_annotation, |key| env::var(key).ok())
    }

    /// Loads configuration through `lookup`, which maps a variable name to its value.
    pub fn from_lookup<F>(
        default_name: &str,
        default_annotation: &str,
        lookup: F,
    ) -> Result<Self, ControllerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let initializer_name = lookup("INITIALIZER_NAME").unwrap_or_else(|| default_name.to_string());
        if initializer_name.trim().is_empty() {
            return Err(ControllerError::InvalidConfig(
                "INITIALIZER_NAME must not be empty".to_string(),
            ));
        }

        let mut config = Self::new(
            initializer_name,
            lookup("INITIALIZER_ANNOTATION").unwrap_or_else(|| default_annotation.to_string()),
        );
        config.namespace = lookup("WATCH_NAMESPACE").filter(|ns| !ns.is_empty());

        if let Some(value) = lookup("RECONCILE_INTERVAL_SECS") {
            config.reconcile_interval = parse_secs("RECONCILE_INTERVAL_SECS", &value)?;
        }
        if let Some(value) = lookup("API_TIMEOUT_SECS") {
            config.api_timeout = parse_secs("API_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = lookup("REQUIRE_ANNOTATION") {
            config.require_annotation = parse_bool("REQUIRE_ANNOTATION", &value)?;
        }

        Ok(config)
    }
}

/// Parses a positive number of seconds.
pub fn parse_secs(key: &str, value: &str) -> Result<Duration, ControllerError> {
    match value.trim().parse::<u64>() {
        Ok(0) => Err(ControllerError::InvalidConfig(format!(
            "{} must be greater than zero",
            key
        ))),
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(_) => Err(ControllerError::InvalidConfig(format!(
            "{} must be a whole number of seconds, got '{}'",
            key, value
        ))),
    }
}

/// Parses `true`/`false` (also `1`/`0`, `yes`/`no`).
pub fn parse_bool(key: &str, value: &str) -> Result<bool, ControllerError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ControllerError::InvalidConfig(format!(
            "{} must be a boolean, got '{}'",
            key, value
        ))),
    }
}
