//! Shared test utilities for the JMA tile compositor workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Reference instants and coordinates
//! - Synthetic PNG tile generators
//! - An in-memory `TileFetcher` that records what was requested
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{reference_now, MockTileFetcher};
//! ```

pub mod fixtures;
pub mod generators;
pub mod mock;

// Re-export commonly used items at the crate root
pub use fixtures::*;
pub use generators::*;
pub use mock::*;

/// Assert two numbers differ by at most `tolerance`.
///
/// ```ignore
/// use test_utils::assert_approx_eq;
///
/// assert_approx_eq!(coord.lat, back.lat, 1e-10);
/// assert_approx_eq!(coord.lon, back.lon, 1e-10, "zoom {}", zoom);
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $tolerance:expr) => {
        $crate::assert_approx_eq!($left, $right, $tolerance, "values")
    };
    ($left:expr, $right:expr, $tolerance:expr, $($context:tt)+) => {{
        let (left, right, tolerance) = ($left as f64, $right as f64, $tolerance as f64);
        let diff = (left - right).abs();
        if !(diff <= tolerance) {
            panic!(
                "{}: {} and {} differ by {:e}, tolerance {:e}",
                format!($($context)+),
                left,
                right,
                diff,
                tolerance
            );
        }
    }};
}

/// Assert an image has exactly the given dimensions.
///
/// ```ignore
/// use test_utils::assert_dimensions;
///
/// assert_dimensions!(image, 600, 800);
/// ```
#[macro_export]
macro_rules! assert_dimensions {
    ($image:expr, $width:expr, $height:expr) => {{
        let (w, h) = $image.dimensions();
        if (w, h) != ($width as u32, $height as u32) {
            panic!(
                "image is {}x{}, expected {}x{}",
                w, h, $width, $height
            );
        }
    }};
}
