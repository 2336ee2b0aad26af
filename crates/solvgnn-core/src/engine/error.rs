use thiserror::Error;

use super::config::ConfigError;
use crate::core::forcefield::params::ParamLoadError;
use crate::core::models::system::InputError;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Invalid input: {source}")]
    Input {
        #[from]
        source: InputError,
    },

    #[error("Invalid configuration: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Failed to load GB parameters: {source}")]
    Params {
        #[from]
        source: ParamLoadError,
    },

    #[error("Tensor operation failed: {source}")]
    Tensor {
        #[from]
        source: candle_core::Error,
    },

    #[error("Failed to read weights from '{path}': {source}")]
    Weights {
        path: String,
        source: std::io::Error,
    },
}
