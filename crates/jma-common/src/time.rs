//! Time handling for JMA radar tiles.
//!
//! Radar frames come in two families: the high-resolution nowcast
//! (`nowc/hrpns`, published every 5 minutes, 3 hours back to 1 hour ahead)
//! and the rainfall forecast (`rasrf`, hourly, 12 hours back to 15 hours
//! ahead). A requested offset from "now" selects the family and the frame.

use chrono::{DateTime, Duration, DurationRound, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::tile::Tile;
use crate::{JmaError, JmaResult};

const JMATILE_DATA_URL: &str = "https://www.jma.go.jp/bosai/jmatile/data";

/// Compact UTC timestamp used in JMA tile paths.
const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Radar product family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherProduct {
    /// High-resolution precipitation nowcast, 5-minute frames
    Nowcast,
    /// Rainfall analysis/forecast, hourly frames
    RainfallForecast,
}

impl WeatherProduct {
    /// Pick the family serving `duration` (negative looks back, positive
    /// looks ahead).
    pub fn for_duration(duration: Duration) -> JmaResult<Self> {
        if Duration::hours(-3) < duration && duration < Duration::hours(1) {
            Ok(WeatherProduct::Nowcast)
        } else if Duration::hours(-12) < duration && duration < Duration::hours(15) {
            Ok(WeatherProduct::RainfallForecast)
        } else {
            Err(JmaError::UnsupportedDuration {
                minutes: duration.num_minutes(),
            })
        }
    }

    /// Spacing between published frames.
    pub fn grid_unit(&self) -> Duration {
        match self {
            WeatherProduct::Nowcast => Duration::minutes(5),
            WeatherProduct::RainfallForecast => Duration::hours(1),
        }
    }

    fn dataset(&self) -> &'static str {
        match self {
            WeatherProduct::Nowcast => "nowc",
            WeatherProduct::RainfallForecast => "rasrf",
        }
    }

    fn element(&self) -> &'static str {
        match self {
            WeatherProduct::Nowcast => "hrpns",
            WeatherProduct::RainfallForecast => "rasrf",
        }
    }
}

/// The radar frame requested for one composite.
///
/// `base` is the latest published frame not after "now"; `end` is the valid
/// time. For lookbacks and the current frame both are the valid time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WeatherFrame {
    pub product: WeatherProduct,
    pub base: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl WeatherFrame {
    pub fn select(now: DateTime<Utc>, duration: Duration) -> JmaResult<Self> {
        let product = WeatherProduct::for_duration(duration)?;
        let (base, end) = align_to_grid(now, product.grid_unit(), duration)?;

        let base = if duration <= Duration::zero() { end } else { base };
        Ok(Self { product, base, end })
    }

    /// True when the frame is a single valid time rather than a forecast range.
    pub fn is_single(&self) -> bool {
        self.base == self.end
    }

    pub fn base_stamp(&self) -> String {
        format_timestamp(&self.base)
    }

    pub fn end_stamp(&self) -> String {
        format_timestamp(&self.end)
    }

    /// Tile URL of this frame. Weather tiles are always PNG.
    pub fn tile_url(&self, tile: &Tile) -> JmaResult<String> {
        tile.validate()?;
        Ok(format!(
            "{}/{}/{}/none/{}/surf/{}/{}/{}/{}.png",
            JMATILE_DATA_URL,
            self.product.dataset(),
            self.base_stamp(),
            self.end_stamp(),
            self.product.element(),
            tile.zoom,
            tile.x,
            tile.y
        ))
    }
}

/// Round `now` to the nearest multiple of `unit` (halfway rounds up), step
/// back one unit if that lands after `now`, then offset by `duration`.
///
/// Returns `(base, base + duration)` with `base <= now`.
pub fn align_to_grid(
    now: DateTime<Utc>,
    unit: Duration,
    duration: Duration,
) -> JmaResult<(DateTime<Utc>, DateTime<Utc>)> {
    let rounded = now
        .duration_round(unit)
        .map_err(|e| JmaError::InvalidTime(format!("cannot round {} to {}: {}", now, unit, e)))?;

    let base = if rounded <= now {
        rounded
    } else {
        rounded
            .checked_sub_signed(unit)
            .ok_or_else(|| JmaError::InvalidTime(format!("{} out of range", rounded)))?
    };

    let end = base
        .checked_add_signed(duration)
        .ok_or_else(|| JmaError::InvalidTime(format!("{} + {} out of range", base, duration)))?;

    Ok((base, end))
}

/// Render as `YYYYMMDDHHMMSS` in UTC.
pub fn format_timestamp(time: &DateTime<Utc>) -> String {
    time.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse an ISO 8601 instant; naive inputs are taken as UTC.
pub fn parse_instant(s: &str) -> JmaResult<DateTime<Utc>> {
    // Full datetime with offset
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Ok(Utc.from_utc_datetime(&ndt));
    }

    // The compact form used in tile paths
    if let Ok(ndt) = NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT) {
        return Ok(Utc.from_utc_datetime(&ndt));
    }

    Err(JmaError::InvalidTime(format!("unrecognised instant '{}'", s)))
}
