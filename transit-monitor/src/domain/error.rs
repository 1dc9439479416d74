//! Configuration validation errors.
//!
//! Raised while turning user-supplied settings into domain values. These are
//! setup-time failures and never occur during polling.

/// Invalid or missing configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// Latitude outside [-90, 90] or not finite
    #[error("latitude {0} is outside [-90, 90]")]
    Latitude(f64),

    /// Longitude outside [-180, 180] or not finite
    #[error("longitude {0} is outside [-180, 180]")]
    Longitude(f64),

    /// Radius outside [100, 20000] meters
    #[error("search radius {0}m is outside [100, 20000]")]
    Radius(u32),

    /// A required setting is absent
    #[error("missing required setting {0}")]
    Missing(&'static str),

    /// A setting could not be parsed
    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}
