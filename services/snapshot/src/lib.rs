//! JMA radar snapshot tool.
//!
//! Renders a composite of the GSI base map, the JMA radar frame for a
//! requested offset and the border mask, centred on a point, to a PNG file.

pub mod cli;
pub mod sources;

pub use cli::{failure_kind, run, Args, Outcome};
pub use sources::{HttpFetcherConfig, HttpTileFetcher};
