//! Radar composites from JMA map tiles.
//!
//! A composite is three tile layers (GSI base map, JMA radar frame and the
//! administrative border mask) stitched around a point and stacked into a
//! single RGBA image of the requested size.

pub mod canvas;
pub mod composer;
pub mod composite;
pub mod config;

pub use canvas::{CanvasAssembler, GridCell, TileGrid};
pub use composer::{CenterPoint, CompositePlan, TileComposer, TileRequest};
pub use composite::{composite, recede_base, BaseLayerStyle};
pub use config::ComposerConfig;
