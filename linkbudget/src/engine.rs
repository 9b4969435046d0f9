//! Link budget orchestrator
//!
//! [`LinkBudget`] validates the parameters, then runs geometry, path loss,
//! polarization, noise and SNR in that order. Errors never escape
//! [`LinkBudget::calculate`]: a bad configuration or a non-finite
//! intermediate value becomes a result with `calculation_success == false`
//! and a message.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use moonbounce_skymap::SkyMap;

use crate::error::{ensure_finite, LinkBudgetResult};
use crate::geometry::GeometryEngine;
use crate::noise::{NoiseEngine, NoiseInputs};
use crate::params::{DataSourceConfig, LinkBudgetParameters};
use crate::path_loss::{PathLossEngine, ScatteringModel};
use crate::polarization::{PolarizationModel, SpatialPolarization};
use crate::results::LinkBudgetResults;
use crate::snr::{FadingMargin, SnrEngine, TransmitChain};

/// Where the orchestrator is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalculationState {
    /// No successful calculation for the current parameters yet
    Unvalidated,
    /// The current parameters produced a result
    Computed,
}

/// EME link budget calculator
pub struct LinkBudget {
    params: LinkBudgetParameters,
    geometry: GeometryEngine,
    path_loss: PathLossEngine,
    noise: NoiseEngine,
    snr: SnrEngine,
    polarization: Box<dyn PolarizationModel>,
    state: CalculationState,
    last_results: Option<LinkBudgetResults>,
}

impl std::fmt::Debug for LinkBudget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkBudget")
            .field("params", &self.params)
            .field("noise", &self.noise)
            .field("polarization", &self.polarization.name())
            .field("state", &self.state)
            .finish()
    }
}

/// Load the configured sky map, falling back to none on any failure
fn configured_sky_map(config: &DataSourceConfig) -> Option<Arc<SkyMap>> {
    if !config.use_sky_noise_map {
        return None;
    }

    let Some(path) = &config.sky_noise_map_path else {
        tracing::warn!("Sky noise map enabled but no path configured, using analytic sky model");
        return None;
    };

    match SkyMap::open(path) {
        Ok(map) => Some(Arc::new(map)),
        Err(e) => {
            tracing::warn!(
                "Failed to load sky map {}: {}. Using analytic sky model",
                path.display(),
                e
            );
            None
        }
    }
}

impl LinkBudget {
    /// Create a calculator, loading the sky map if the parameters ask for one
    pub fn new(params: LinkBudgetParameters) -> Self {
        let noise = match configured_sky_map(&params.data_sources) {
            Some(map) => NoiseEngine::with_sky_map(map),
            None => NoiseEngine::new(),
        };

        Self {
            params,
            geometry: GeometryEngine::new(),
            path_loss: PathLossEngine::new(),
            noise,
            snr: SnrEngine::new(),
            polarization: Box::new(SpatialPolarization),
            state: CalculationState::Unvalidated,
            last_results: None,
        }
    }

    /// Use an already loaded sky map, possibly shared with other calculators
    pub fn with_sky_map(mut self, sky_map: Arc<SkyMap>) -> Self {
        self.noise.set_sky_map(Some(sky_map));
        self
    }

    /// Load a sky map from `path` and use it from now on
    pub fn load_sky_map(&mut self, path: impl AsRef<Path>) -> LinkBudgetResult<()> {
        let map = SkyMap::open(path)?;
        self.noise.set_sky_map(Some(Arc::new(map)));
        Ok(())
    }

    /// Replace the polarization service
    pub fn with_polarization(mut self, polarization: Box<dyn PolarizationModel>) -> Self {
        self.polarization = polarization;
        self
    }

    /// Replace the parameters; the next result must be recomputed
    pub fn set_parameters(&mut self, params: LinkBudgetParameters) {
        if params.data_sources != self.params.data_sources {
            self.noise.set_sky_map(configured_sky_map(&params.data_sources));
        }
        self.params = params;
        self.state = CalculationState::Unvalidated;
    }

    pub fn parameters(&self) -> &LinkBudgetParameters {
        &self.params
    }

    pub fn state(&self) -> CalculationState {
        self.state
    }

    /// Result of the most recent `calculate()`, successful or not
    pub fn last_results(&self) -> Option<&LinkBudgetResults> {
        self.last_results.as_ref()
    }

    pub fn validate_parameters(&self) -> LinkBudgetResult<()> {
        self.params.validate()
    }

    /// Run the full link budget
    pub fn calculate(&mut self) -> LinkBudgetResults {
        let results = match self.validate_parameters().and_then(|_| self.run_pipeline()) {
            Ok(results) => {
                self.state = CalculationState::Computed;
                tracing::info!(
                    "Link margin {:.2} dB at {} MHz: {}",
                    results.snr.link_margin_db,
                    results.frequency_mhz,
                    if results.snr.link_viable { "viable" } else { "not viable" }
                );
                results
            }
            Err(e) => {
                self.state = CalculationState::Unvalidated;
                tracing::warn!("Link budget calculation failed: {}", e);
                LinkBudgetResults::failure(e.to_string())
            }
        };

        self.last_results = Some(results.clone());
        results
    }

    fn run_pipeline(&self) -> LinkBudgetResult<LinkBudgetResults> {
        let p = &self.params;

        let geometry = self.geometry.calculate(
            &p.tx_site,
            &p.rx_site,
            &p.moon_ephemeris,
            &p.observation_time,
            p.frequency_mhz,
        );
        ensure_finite("geometry", "TX elevation", geometry.moon_elevation_tx_deg)?;
        ensure_finite("geometry", "RX elevation", geometry.moon_elevation_rx_deg)?;

        let path_loss = self.path_loss.calculate(
            p.frequency_mhz,
            geometry.distance_tx_km,
            geometry.distance_rx_km,
            geometry.moon_elevation_tx_deg,
            geometry.moon_elevation_rx_deg,
            p.include_atmospheric_loss,
            ScatteringModel::from_toggle(p.use_hagfors_model),
        );
        ensure_finite("path loss", "total path loss", path_loss.total_path_loss_db)?;

        let polarization = self.polarization.calculate(p, &geometry);
        ensure_finite("polarization", "polarization loss", polarization.polarization_loss_db)?;

        let noise = self.noise.calculate(&NoiseInputs {
            frequency_mhz: p.frequency_mhz,
            bandwidth_hz: p.bandwidth_hz,
            rx_gain_dbi: p.rx_gain_dbi,
            feedline_loss_db: p.rx_feedline_loss_db,
            noise_figure_db: p.rx_noise_figure_db,
            elevation_deg: geometry.moon_elevation_rx_deg,
            moon_ra_deg: geometry.moon_ra_deg,
            moon_dec_deg: geometry.moon_dec_deg,
            physical_temp_k: p.physical_temp_k,
            include_ground_spillover: p.include_ground_spillover,
        });
        ensure_finite("noise", "system temperature", noise.system_noise_temp_k)?;
        ensure_finite("noise", "noise power", noise.noise_power_dbm)?;

        let fading_margin = match p.reliability_percent {
            Some(reliability) => FadingMargin::recommended(p.frequency_mhz, reliability),
            None => FadingMargin::margin(p.frequency_mhz),
        };

        let chain = TransmitChain {
            tx_power_dbm: p.tx_power_dbm,
            tx_gain_dbi: p.tx_gain_dbi,
            rx_gain_dbi: p.rx_gain_dbi,
            tx_feedline_loss_db: p.tx_feedline_loss_db,
            rx_feedline_loss_db: p.rx_feedline_loss_db,
        };
        let snr = self.snr.calculate(
            &chain,
            &path_loss,
            &polarization,
            &noise,
            p.required_snr_db,
            fading_margin,
        );
        ensure_finite("SNR", "link margin", snr.link_margin_db)?;

        Ok(LinkBudgetResults {
            total_loss_db: path_loss.total_path_loss_db + polarization.polarization_loss_db,
            geometry,
            path_loss,
            polarization,
            noise,
            snr,
            calculation_success: true,
            error_message: String::new(),
            calculation_time: Utc::now(),
            frequency_mhz: p.frequency_mhz,
        })
    }
}
