//! Layer compositing.
//!
//! The base map is desaturated so the radar colours stand out, then the
//! radar layer and the border mask are drawn over it with source-over
//! alpha blending.

use std::fmt;
use std::str::FromStr;

use image::{imageops, DynamicImage, RgbaImage};
use serde::{Deserialize, Serialize};

use jma_common::{JmaError, JmaResult};

/// Adjustments applied to the base map after grayscale conversion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaseLayerStyle {
    /// Added to every channel; negative darkens
    pub brightness: i32,
    /// Contrast change in percent; negative flattens
    pub contrast: f32,
    /// Gaussian blur sigma; 0 disables blurring
    pub blur_sigma: f32,
}

impl Default for BaseLayerStyle {
    /// Plain grayscale.
    fn default() -> Self {
        Self {
            brightness: 0,
            contrast: 0.0,
            blur_sigma: 0.0,
        }
    }
}

impl BaseLayerStyle {
    /// Dimmed, flattened and slightly blurred base map that recedes behind
    /// the radar layer.
    pub fn receded() -> Self {
        Self {
            brightness: -16,
            contrast: -20.0,
            blur_sigma: 0.5,
        }
    }

    pub fn is_plain(&self) -> bool {
        *self == Self::default()
    }
}

impl FromStr for BaseLayerStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plain" | "grayscale" => Ok(Self::default()),
            "receded" => Ok(Self::receded()),
            other => Err(format!(
                "unknown base layer style '{}', expected 'plain' or 'receded'",
                other
            )),
        }
    }
}

impl fmt::Display for BaseLayerStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_plain() {
            write!(f, "plain")
        } else if *self == Self::receded() {
            write!(f, "receded")
        } else {
            write!(
                f,
                "brightness={} contrast={} blur={}",
                self.brightness, self.contrast, self.blur_sigma
            )
        }
    }
}

/// Convert the base map to grayscale and apply `style`.
pub fn recede_base(base: &RgbaImage, style: &BaseLayerStyle) -> RgbaImage {
    let mut image = DynamicImage::ImageRgba8(base.clone()).grayscale();
    if style.brightness != 0 {
        image = image.brighten(style.brightness);
    }
    if style.contrast != 0.0 {
        image = image.adjust_contrast(style.contrast);
    }
    if style.blur_sigma > 0.0 {
        image = image.blur(style.blur_sigma);
    }
    image.to_rgba8()
}

/// Stack weather and borders over the receded base map.
///
/// All three layers must share one size; the check runs before any pixel
/// is touched.
pub fn composite(
    base: &RgbaImage,
    weather: &RgbaImage,
    border: &RgbaImage,
    style: &BaseLayerStyle,
) -> JmaResult<RgbaImage> {
    let sizes = (base.dimensions(), weather.dimensions(), border.dimensions());
    if sizes.0 != sizes.1 || sizes.0 != sizes.2 {
        return Err(JmaError::SizeMismatch {
            base: sizes.0,
            weather: sizes.1,
            border: sizes.2,
        });
    }

    let mut output = recede_base(base, style);
    imageops::overlay(&mut output, weather, 0, 0);
    imageops::overlay(&mut output, border, 0, 0);
    Ok(output)
}
