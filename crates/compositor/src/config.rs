//! Composer configuration.

use jma_common::TileLayer;

use crate::composite::BaseLayerStyle;

/// Sources and limits used when building composites.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposerConfig {
    /// GSI base map style (`pale`, `std`, `blank`, ...)
    pub base_style: String,
    pub base_extension: String,
    pub border_extension: String,
    /// Upper bound on in-flight tile requests per layer
    pub max_concurrent_fetches: usize,
    pub base_layer: BaseLayerStyle,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            base_style: "pale".to_string(),
            base_extension: "png".to_string(),
            border_extension: "png".to_string(),
            max_concurrent_fetches: 8,
            base_layer: BaseLayerStyle::default(),
        }
    }
}

impl ComposerConfig {
    /// Load configuration from environment variables, falling back to the
    /// defaults for anything unset or unparseable.
    ///
    /// - `JMA_BASE_STYLE`
    /// - `JMA_TILE_EXTENSION` (base map and border mask)
    /// - `JMA_MAX_CONCURRENT_FETCHES`
    /// - `JMA_BASE_LAYER` (`plain` or `receded`)
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Same as `from_env` with an arbitrary variable lookup.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let base_style = lookup("JMA_BASE_STYLE")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(defaults.base_style);

        let extension = lookup("JMA_TILE_EXTENSION").filter(|s| !s.trim().is_empty());

        let max_concurrent_fetches = lookup("JMA_MAX_CONCURRENT_FETCHES")
            .and_then(|s| s.parse().ok())
            .filter(|&n: &usize| n > 0)
            .unwrap_or(defaults.max_concurrent_fetches);

        let base_layer = lookup("JMA_BASE_LAYER")
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.base_layer);

        Self {
            base_style,
            base_extension: extension.clone().unwrap_or(defaults.base_extension),
            border_extension: extension.unwrap_or(defaults.border_extension),
            max_concurrent_fetches,
            base_layer,
        }
    }

    pub fn base_layer_source(&self) -> TileLayer {
        TileLayer::Base {
            style: self.base_style.clone(),
            extension: self.base_extension.clone(),
        }
    }

    pub fn border_layer(&self) -> TileLayer {
        TileLayer::Border {
            extension: self.border_extension.clone(),
        }
    }
}
