//! Error types for the link budget calculator
//!
//! Configuration problems are collected into one error so the caller sees
//! every out-of-range field at once. Computation errors name the pipeline
//! stage that produced a non-finite number. Missing sky maps, zero
//! libration rates and a Moon below the horizon are not errors: the
//! engines fall back silently.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LinkBudgetError {
    /// One or more parameters outside their accepted range
    #[error("{}", .0.join(" "))]
    InvalidConfiguration(Vec<String>),

    /// A stage produced NaN or infinity
    #[error("Calculation error: {stage} produced a non-finite {quantity}")]
    Computation {
        stage: &'static str,
        quantity: &'static str,
    },

    #[error("Invalid parameter file: {0}")]
    Config(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Sky map error: {0}")]
    SkyMap(#[from] moonbounce_skymap::SkyMapError),
}

pub type LinkBudgetResult<T> = Result<T, LinkBudgetError>;

/// Fail with `Computation` unless `value` is finite
pub(crate) fn ensure_finite(
    stage: &'static str,
    quantity: &'static str,
    value: f64,
) -> LinkBudgetResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(LinkBudgetError::Computation { stage, quantity })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_message_joins_clauses() {
        let err = LinkBudgetError::InvalidConfiguration(vec![
            "Invalid frequency: 0 MHz.".to_string(),
            "Invalid bandwidth: -1 Hz.".to_string(),
        ]);
        assert_eq!(err.to_string(), "Invalid frequency: 0 MHz. Invalid bandwidth: -1 Hz.");
    }

    #[test]
    fn test_ensure_finite() {
        assert_eq!(ensure_finite("noise", "power", 1.5).unwrap(), 1.5);
        let err = ensure_finite("noise", "power", f64::NAN).unwrap_err();
        assert_eq!(err.to_string(), "Calculation error: noise produced a non-finite power");
        assert!(ensure_finite("snr", "margin", f64::INFINITY).is_err());
    }
}
