//! Error types for tile addressing, fetching and compositing.

use thiserror::Error;

/// Result type alias using JmaError.
pub type JmaResult<T> = Result<T, JmaError>;

/// Primary error type for composite requests.
///
/// Every variant is terminal for the request that produced it: nothing is
/// retried internally and no partial image is returned.
#[derive(Debug, Error)]
pub enum JmaError {
    // === Request Errors ===
    #[error("Invalid coordinate (lat: {lat}, lon: {lon}): latitude must be within ±85.0511287798 and longitude within [-180, 180)")]
    InvalidCoordinate { lat: f64, lon: f64 },

    #[error("Invalid zoom level {0}: supported range is 0..=18")]
    InvalidZoom(u8),

    #[error("Invalid tile {zoom}/{x}/{y}: x and y must be less than 2^zoom")]
    InvalidTile { zoom: u8, x: u32, y: u32 },

    #[error("Invalid tile path '{0}': expected z/x/y")]
    InvalidTilePath(String),

    #[error("Invalid output size {width}x{height}: both dimensions must be non-zero")]
    InvalidRect { width: u32, height: u32 },

    #[error("Unsupported duration of {minutes} minutes: forecasting is supported from -12h (exclusive) to 15h (exclusive) only")]
    UnsupportedDuration { minutes: i64 },

    #[error("Invalid time specification: {0}")]
    InvalidTime(String),

    // === Compositing Errors ===
    #[error("Layer sizes differ: base {base:?}, weather {weather:?}, border {border:?}")]
    SizeMismatch {
        base: (u32, u32),
        weather: (u32, u32),
        border: (u32, u32),
    },

    // === Collaborator Errors ===
    #[error("Failed to fetch {url}: {message}")]
    TransportFailure { url: String, message: String },

    #[error("Failed to decode tile {url}: {message}")]
    DecodeFailure { url: String, message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl JmaError {
    /// Stable label for log fields and exit reporting.
    pub fn kind(&self) -> &'static str {
        match self {
            JmaError::InvalidCoordinate { .. } => "invalid_coordinate",
            JmaError::InvalidZoom(_) => "invalid_zoom",
            JmaError::InvalidTile { .. } => "invalid_tile",
            JmaError::InvalidTilePath(_) => "invalid_tile_path",
            JmaError::InvalidRect { .. } => "invalid_rect",
            JmaError::UnsupportedDuration { .. } => "unsupported_duration",
            JmaError::InvalidTime(_) => "invalid_time",
            JmaError::SizeMismatch { .. } => "size_mismatch",
            JmaError::TransportFailure { .. } => "transport_failure",
            JmaError::DecodeFailure { .. } => "decode_failure",
            JmaError::Internal(_) => "internal",
        }
    }

    /// True for errors caused by the request itself rather than a collaborator.
    pub fn is_invalid_request(&self) -> bool {
        matches!(
            self,
            JmaError::InvalidCoordinate { .. }
                | JmaError::InvalidZoom(_)
                | JmaError::InvalidTile { .. }
                | JmaError::InvalidTilePath(_)
                | JmaError::InvalidRect { .. }
                | JmaError::UnsupportedDuration { .. }
                | JmaError::InvalidTime(_)
        )
    }

    pub fn transport(url: impl Into<String>, message: impl std::fmt::Display) -> Self {
        JmaError::TransportFailure {
            url: url.into(),
            message: message.to_string(),
        }
    }

    pub fn decode(url: impl Into<String>, message: impl std::fmt::Display) -> Self {
        JmaError::DecodeFailure {
            url: url.into(),
            message: message.to_string(),
        }
    }
}
