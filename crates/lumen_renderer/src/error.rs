//! Error types for scene construction, configuration and rendering.
//!
//! Nothing in here is raised while tracing: numeric edge cases inside the
//! intersection kernels degrade to "no hit" instead.

use thiserror::Error;

/// Errors raised while building shapes.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ShapeError {
    #[error("no spherical harmonic for l={l}, m={m} (supported: 0 <= l <= 4, -l <= m <= l)")]
    UnsupportedHarmonic { l: i32, m: i32 },

    #[error("transform matrix is singular (determinant {determinant:e})")]
    SingularTransform { determinant: f64 },

    #[error("tessellation step must be positive, got {0}")]
    InvalidStep(f64),
}

/// Rejected configuration values.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("image size must be non-zero, got {width}x{height}")]
    EmptyImage { width: u32, height: u32 },

    #[error("{name} must be at least 1")]
    ZeroCount { name: &'static str },

    #[error("{name} must be positive, got {value}")]
    NonPositive { name: &'static str, value: f64 },

    #[error("{name} must be in (0, 1], got {value}")]
    OutOfUnitRange { name: &'static str, value: f64 },
}

/// Errors that stop a render before it starts.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Helpers shared by the `validate` methods.
pub(crate) fn require_count(name: &'static str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::ZeroCount { name });
    }
    Ok(())
}

pub(crate) fn require_positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_nan() || value <= 0.0 {
        return Err(ConfigError::NonPositive { name, value });
    }
    Ok(())
}

pub(crate) fn require_unit(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_nan() || value <= 0.0 || value > 1.0 {
        return Err(ConfigError::OutOfUnitRange { name, value });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_helpers() {
        assert!(require_count("workers", 1).is_ok());
        assert_eq!(
            require_count("workers", 0),
            Err(ConfigError::ZeroCount { name: "workers" })
        );
        assert!(require_positive("threshold", f64::NAN).is_err());
        assert!(require_unit("split_ratio", 1.0).is_ok());
        assert!(require_unit("split_ratio", 0.0).is_err());
    }

    #[test]
    fn test_error_messages() {
        let err = ShapeError::UnsupportedHarmonic { l: 5, m: 0 };
        assert!(err.to_string().contains("l=5"));

        let err: RenderError = ConfigError::EmptyImage { width: 0, height: 4 }.into();
        assert!(err.to_string().contains("0x4"));
    }
}
