use crate::core::graph::neighbor::NeighborSearch;
use crate::core::models::system::FeatureSelector;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Hidden widths supported by the correction network.
pub const HIDDEN_WIDTHS: [usize; 6] = [32, 48, 64, 96, 128, 192];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for '{key}': {reason}")]
    InvalidValue { key: &'static str, reason: String },
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
}

/// Hyperparameters of the solvation models.
///
/// Lengths are in nm. Deserialized from TOML with kebab-case keys; every key is optional and
/// falls back to the value of [`ModelConfig::default`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields, default)]
pub struct ModelConfig {
    /// Radius of the graph used for the GB integral and pair energies.
    pub long_cutoff: f64,
    /// Radius of the graph used by the correction network.
    pub short_cutoff: f64,
    /// Maximum incoming edges per atom on both graphs.
    pub max_neighbors: usize,
    pub hidden: usize,
    /// Bound of the Born radius correction: corrected radii stay within
    /// `[fraction, 2 - fraction]` times the GB radius.
    pub fraction: f64,
    pub num_kernels: usize,
    pub rbf_min_range: f64,
    pub rbf_alpha: f64,
    pub lambda_hidden: usize,
    pub solute_dielectric: f64,
    pub solvent_dielectric: f64,
    pub neighbor_search: NeighborSearch,
    pub feature_selector: FeatureSelector,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            long_cutoff: 1.0,
            short_cutoff: 0.4,
            max_neighbors: 32,
            hidden: 128,
            fraction: 0.5,
            num_kernels: 32,
            rbf_min_range: 0.1,
            rbf_alpha: 2.0,
            lambda_hidden: 16,
            solute_dielectric: 1.0,
            solvent_dielectric: 78.5,
            neighbor_search: NeighborSearch::Auto,
            feature_selector: FeatureSelector::GbParameters,
        }
    }
}

fn invalid(key: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key,
        reason: reason.into(),
    }
}

fn require_positive(key: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(key, format!("must be a positive number, got {value}")))
    }
}

fn require_nonzero(key: &'static str, value: usize) -> Result<(), ConfigError> {
    if value == 0 {
        Err(invalid(key, "must be at least 1"))
    } else {
        Ok(())
    }
}

impl ModelConfig {
    pub fn builder() -> ModelConfigBuilder {
        ModelConfigBuilder::new()
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        debug!("Loading model configuration from file: {:?}", path);
        let path_str = path.to_string_lossy().to_string();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path_str.clone(),
            source: e,
        })?;
        Self::parse(&content, &path_str)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Self::parse(content, "<string>")
    }

    fn parse(content: &str, path: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Toml {
            path: path.to_string(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        require_positive("long-cutoff", self.long_cutoff)?;
        require_positive("short-cutoff", self.short_cutoff)?;
        require_nonzero("max-neighbors", self.max_neighbors)?;
        if !HIDDEN_WIDTHS.contains(&self.hidden) {
            return Err(invalid(
                "hidden",
                format!("must be one of {HIDDEN_WIDTHS:?}, got {}", self.hidden),
            ));
        }
        if !(self.fraction > 0.0 && self.fraction <= 1.0) {
            return Err(invalid(
                "fraction",
                format!("must lie in (0, 1], got {}", self.fraction),
            ));
        }
        require_nonzero("num-kernels", self.num_kernels)?;
        if !(self.rbf_min_range >= 0.0 && self.rbf_min_range < self.short_cutoff) {
            return Err(invalid(
                "rbf-min-range",
                format!(
                    "must lie in [0, short-cutoff), got {} with short-cutoff {}",
                    self.rbf_min_range, self.short_cutoff
                ),
            ));
        }
        require_positive("rbf-alpha", self.rbf_alpha)?;
        require_nonzero("lambda-hidden", self.lambda_hidden)?;
        require_positive("solute-dielectric", self.solute_dielectric)?;
        require_positive("solvent-dielectric", self.solvent_dielectric)?;
        Ok(())
    }
}

#[derive(Default)]
pub struct ModelConfigBuilder {
    long_cutoff: Option<f64>,
    short_cutoff: Option<f64>,
    max_neighbors: Option<usize>,
    hidden: Option<usize>,
    fraction: Option<f64>,
    num_kernels: Option<usize>,
    rbf_min_range: Option<f64>,
    rbf_alpha: Option<f64>,
    lambda_hidden: Option<usize>,
    solute_dielectric: Option<f64>,
    solvent_dielectric: Option<f64>,
    neighbor_search: Option<NeighborSearch>,
    feature_selector: Option<FeatureSelector>,
}

impl ModelConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn long_cutoff(mut self, cutoff: f64) -> Self {
        self.long_cutoff = Some(cutoff);
        self
    }
    pub fn short_cutoff(mut self, cutoff: f64) -> Self {
        self.short_cutoff = Some(cutoff);
        self
    }
    pub fn max_neighbors(mut self, n: usize) -> Self {
        self.max_neighbors = Some(n);
        self
    }
    pub fn hidden(mut self, width: usize) -> Self {
        self.hidden = Some(width);
        self
    }
    pub fn fraction(mut self, fraction: f64) -> Self {
        self.fraction = Some(fraction);
        self
    }
    pub fn num_kernels(mut self, n: usize) -> Self {
        self.num_kernels = Some(n);
        self
    }
    pub fn rbf_min_range(mut self, range: f64) -> Self {
        self.rbf_min_range = Some(range);
        self
    }
    pub fn rbf_alpha(mut self, alpha: f64) -> Self {
        self.rbf_alpha = Some(alpha);
        self
    }
    pub fn lambda_hidden(mut self, width: usize) -> Self {
        self.lambda_hidden = Some(width);
        self
    }
    pub fn solute_dielectric(mut self, dielectric: f64) -> Self {
        self.solute_dielectric = Some(dielectric);
        self
    }
    pub fn solvent_dielectric(mut self, dielectric: f64) -> Self {
        self.solvent_dielectric = Some(dielectric);
        self
    }
    pub fn neighbor_search(mut self, search: NeighborSearch) -> Self {
        self.neighbor_search = Some(search);
        self
    }
    pub fn feature_selector(mut self, selector: FeatureSelector) -> Self {
        self.feature_selector = Some(selector);
        self
    }

    pub fn build(self) -> Result<ModelConfig, ConfigError> {
        let defaults = ModelConfig::default();
        let config = ModelConfig {
            long_cutoff: self.long_cutoff.unwrap_or(defaults.long_cutoff),
            short_cutoff: self.short_cutoff.unwrap_or(defaults.short_cutoff),
            max_neighbors: self.max_neighbors.unwrap_or(defaults.max_neighbors),
            hidden: self.hidden.unwrap_or(defaults.hidden),
            fraction: self.fraction.unwrap_or(defaults.fraction),
            num_kernels: self.num_kernels.unwrap_or(defaults.num_kernels),
            rbf_min_range: self.rbf_min_range.unwrap_or(defaults.rbf_min_range),
            rbf_alpha: self.rbf_alpha.unwrap_or(defaults.rbf_alpha),
            lambda_hidden: self.lambda_hidden.unwrap_or(defaults.lambda_hidden),
            solute_dielectric: self.solute_dielectric.unwrap_or(defaults.solute_dielectric),
            solvent_dielectric: self
                .solvent_dielectric
                .unwrap_or(defaults.solvent_dielectric),
            neighbor_search: self.neighbor_search.unwrap_or(defaults.neighbor_search),
            feature_selector: self.feature_selector.unwrap_or(defaults.feature_selector),
        };
        config.validate()?;
        Ok(config)
    }
}
