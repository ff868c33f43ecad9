//! Flat, immutable run configuration.
//!
//! One named numeric parameter or switch per tunable behavior, constructed
//! once and passed by shared reference to every component. Validation runs
//! before the driver is built; a rejected configuration never executes a
//! frame.
//!
//! Defaults reproduce a plausible Atlantic hurricane setup on a 2000 km ×
//! 2000 km × 20 km domain.

use crate::error::ConfigError;
use crate::solver::advection::InterpolationOrder;
use crate::solver::coriolis::CoriolisParameter;

/// Compute backend, resolved once at startup. Both backends execute the
/// identical algorithm; results differ only by floating-point reduction
/// order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// Single-threaded reference path.
    #[default]
    Serial,
    /// Rayon-parallel path (requires the `parallel` cargo feature; falls
    /// back to serial execution without it).
    Parallel,
}

/// Which convective adjustment scheme to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConvectionScheme {
    /// Betts-Miller relaxed adjustment toward a sub-saturated reference.
    #[default]
    BettsMiller,
    /// Legacy instantaneous saturation adjustment: condense all excess over
    /// q_sat in a single step.
    Instantaneous,
}

/// Frozen set of numeric parameters and enable flags for every physics
/// module and governor.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Integration ----------------------------------------------------
    /// Timestep (s).
    pub dt: f64,
    /// Frame budget: the run terminates after this many frames.
    pub target_frames: usize,
    /// Compute backend, resolved once at startup.
    pub backend: Backend,

    // --- Spectral / advection -------------------------------------------
    /// Apply the two-thirds dealiasing mask to velocity after advection.
    pub dealias: bool,
    /// Semi-Lagrangian interpolation order.
    pub advection_order: InterpolationOrder,
    /// Clamp advected values to the departure neighborhood min/max.
    pub monotonic_advection: bool,

    // --- Turbulence ------------------------------------------------------
    /// Enable Smagorinsky diffusion.
    pub turbulence_enabled: bool,
    /// Smagorinsky constant Cs.
    pub smagorinsky_cs: f64,
    /// Resolution boost factor for unresolved subgrid motion.
    pub resolution_boost: f64,

    // --- Rotation --------------------------------------------------------
    /// Coriolis parameter: f-plane or beta-plane.
    pub coriolis: CoriolisParameter,

    // --- Thermodynamics --------------------------------------------------
    /// Surface reference potential temperature θ₀(0) (K).
    pub theta_surface: f64,
    /// Potential-temperature lapse rate Γ_θ (K/m).
    pub gamma_theta: f64,
    /// Pressure scale height (m).
    pub scale_height: f64,
    /// Surface reference specific humidity (kg/kg).
    pub base_humidity: f64,
    /// Moisture reference scale height (m).
    pub q_scale_height: f64,
    /// Reduce stratification toward `moist_floor` in near-saturated air.
    pub moist_stratification: bool,
    /// Floor of the moist stratification factor (0 = moist-neutral eyewall).
    pub moist_floor: f64,
    /// Apply the moist reduction only in updrafts (w > 0).
    pub updraft_only_moist: bool,
    /// Soft cap on buoyancy acceleration (m/s²); tanh-saturated, instrumented.
    pub buoyancy_cap: f64,
    /// Enable Newtonian radiative relaxation of θ′.
    pub radiative_cooling: bool,
    /// Base radiative timescale τ_rad (s).
    pub tau_rad: f64,
    /// Scale τ continuously down to `tau_rad_min` with local wind speed.
    pub dynamic_cooling: bool,
    /// Minimum radiative timescale (s).
    pub tau_rad_min: f64,
    /// Wind speed scale (m/s) of the dynamic-τ decay.
    pub cooling_wind_scale: f64,
    /// Soft θ′ bound (K): smooth tanh clamp, instrumented.
    pub theta_soft_bound: f64,
    /// Hard θ′ bound (K): clip, instrumented.
    pub theta_hard_bound: f64,
    /// Remove the per-level horizontal mean of θ′ every frame.
    pub mean_removal: bool,

    // --- Convection ------------------------------------------------------
    /// Selected adjustment scheme.
    pub convection_scheme: ConvectionScheme,
    /// Betts-Miller relaxation timescale τ_BM (s).
    pub tau_bm: f64,
    /// Reference relative humidity of the BM target profile.
    pub bm_reference_rh: f64,
    /// Cloud trigger: active where q > cloud_threshold · q_sat.
    pub bm_cloud_threshold: f64,
    /// Height (m) below which the BM taper weight is zero.
    pub bm_taper_start_m: f64,
    /// Height (m) above which the BM taper weight is one.
    pub bm_taper_full_m: f64,
    /// Taper power (1 = linear ramp).
    pub bm_taper_power: f64,
    /// Precipitation efficiency η ∈ (0, 1]: fraction of latent heat retained.
    pub precip_efficiency: f64,

    // --- Surface fluxes --------------------------------------------------
    /// Enable surface fluxes.
    pub surface_fluxes_enabled: bool,
    /// Ocean drag coefficient C_d.
    pub drag_coefficient: f64,
    /// Land drag coefficient (blended in by land fraction).
    pub drag_coefficient_land: f64,
    /// Heat/moisture exchange coefficient C_k.
    pub exchange_coefficient: f64,
    /// Sea surface temperature (°C).
    pub sea_surface_temp_c: f64,
    /// Depth (m) over which surface fluxes are distributed.
    pub flux_depth_m: f64,
    /// Enable WISHE exchange-coefficient amplification.
    pub wishe_enabled: bool,
    /// Maximum WISHE boost multiplier.
    pub wishe_boost_max: f64,
    /// Wind speed (m/s) where the boost ramp begins.
    pub wishe_wind_min: f64,
    /// Wind speed (m/s) where the boost reaches its maximum.
    pub wishe_wind_max: f64,
    /// Enable the proportional flux throttle.
    pub flux_throttle_enabled: bool,
    /// Peak surface heating rate (K/min) above which fluxes are throttled.
    pub flux_throttle_threshold: f64,
    /// Lower bound of the throttle factor.
    pub flux_throttle_floor: f64,

    // --- Sponge ----------------------------------------------------------
    /// Enable the lateral sponge band.
    pub sponge_enabled: bool,
    /// Lateral band width as a fraction of the horizontal domain (per edge).
    pub sponge_band_fraction: f64,
    /// Lateral fractional decay per step at the domain edge.
    pub sponge_strength: f64,
    /// Enable the vertical (top) sponge.
    pub vertical_sponge_enabled: bool,
    /// Vertical band as a fraction of the column depth.
    pub vertical_sponge_fraction: f64,
    /// Vertical fractional decay per step at the model top.
    pub vertical_sponge_strength: f64,

    // --- Governors -------------------------------------------------------
    /// Velocity-magnitude clamp.
    pub velocity_governor_enabled: bool,
    /// Progressive damping begins above this wind speed (m/s).
    pub wind_damping_threshold: f64,
    /// Hard cap on wind speed (m/s).
    pub wind_hard_cap: f64,
    /// Updraft soft clamp (tanh).
    pub updraft_governor_enabled: bool,
    /// Updraft soft limit (m/s).
    pub max_updraft: f64,
    /// θ′ hard clamp governor.
    pub thermal_governor_enabled: bool,
    /// θ′ hard clamp magnitude (K), applied symmetrically.
    pub max_temp_anomaly: f64,
    /// Moisture floor governor.
    pub moisture_floor_enabled: bool,
    /// Minimum specific humidity (kg/kg), capped per level by the reference
    /// moisture profile.
    pub moisture_floor: f64,
    /// Proportional θ′ throttle governor.
    pub proportional_throttle_enabled: bool,
    /// Throttle soft limit (K): identity below.
    pub theta_soft_limit: f64,
    /// Throttle hard limit (K): asymptotic ceiling.
    pub theta_hard_limit: f64,
    /// Clamp fraction above which a governor logs a saturation warning.
    pub governor_saturation_warn: f64,

    // --- Steering --------------------------------------------------------
    /// Inject environmental steering into the velocity field.
    pub steering_injection: bool,
    /// Refresh cadence in frames.
    pub steering_refresh_frames: usize,
    /// Multiplier applied to the steering vector.
    pub steering_multiplier: f64,
    /// Sample field steering over an annulus excluding the vortex core.
    pub annular_steering: bool,
    /// Inner annulus radius (m).
    pub annular_inner_m: f64,
    /// Outer annulus radius (m).
    pub annular_outer_m: f64,
    /// Legacy synthetic drift fallback when beta-plane rotation is disabled.
    pub legacy_drift_enabled: bool,
    /// Base synthetic drift speed (m/s).
    pub legacy_drift_speed: f64,
    /// Fractional speed increase per degree of latitude above the low band.
    pub legacy_drift_lat_scale: f64,
    /// Drift heading (degrees CCW from east) at and below `legacy_lat_low`.
    pub legacy_drift_angle_low: f64,
    /// Drift heading (degrees CCW from east) at and above `legacy_lat_high`.
    pub legacy_drift_angle_high: f64,
    /// Latitude of the low interpolation band (°N).
    pub legacy_lat_low: f64,
    /// Latitude of the high interpolation band (°N).
    pub legacy_lat_high: f64,
    /// Storm latitude (°N) used by the legacy fallback.
    pub storm_latitude: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dt: 60.0,
            target_frames: 1440,
            backend: Backend::Serial,

            dealias: true,
            advection_order: InterpolationOrder::Cubic,
            monotonic_advection: true,

            turbulence_enabled: true,
            smagorinsky_cs: 0.17,
            resolution_boost: 150.0,

            coriolis: CoriolisParameter::f_plane_at_latitude(15.0),

            theta_surface: 300.0,
            gamma_theta: 4.0e-3,
            scale_height: 8500.0,
            base_humidity: 0.018,
            q_scale_height: 2500.0,
            moist_stratification: true,
            moist_floor: 0.1,
            updraft_only_moist: false,
            buoyancy_cap: 0.5,
            radiative_cooling: true,
            tau_rad: 86_400.0,
            dynamic_cooling: false,
            tau_rad_min: 3600.0,
            cooling_wind_scale: 40.0,
            theta_soft_bound: 30.0,
            theta_hard_bound: 50.0,
            mean_removal: true,

            convection_scheme: ConvectionScheme::BettsMiller,
            tau_bm: 900.0,
            bm_reference_rh: 0.90,
            bm_cloud_threshold: 0.85,
            bm_taper_start_m: 200.0,
            bm_taper_full_m: 2200.0,
            bm_taper_power: 1.0,
            precip_efficiency: 0.25,

            surface_fluxes_enabled: true,
            drag_coefficient: 1.5e-3,
            drag_coefficient_land: 5.0e-3,
            exchange_coefficient: 1.2e-3,
            sea_surface_temp_c: 28.5,
            flux_depth_m: 100.0,
            wishe_enabled: true,
            wishe_boost_max: 1.4,
            wishe_wind_min: 15.0,
            wishe_wind_max: 40.0,
            flux_throttle_enabled: true,
            flux_throttle_threshold: 5.0,
            flux_throttle_floor: 0.1,

            sponge_enabled: true,
            sponge_band_fraction: 0.15,
            sponge_strength: 0.003,
            vertical_sponge_enabled: true,
            vertical_sponge_fraction: 0.2,
            vertical_sponge_strength: 0.05,

            velocity_governor_enabled: true,
            wind_damping_threshold: 85.0,
            wind_hard_cap: 95.0,
            updraft_governor_enabled: true,
            max_updraft: 50.0,
            thermal_governor_enabled: true,
            max_temp_anomaly: 50.0,
            moisture_floor_enabled: true,
            moisture_floor: 1.0e-4,
            proportional_throttle_enabled: true,
            theta_soft_limit: 60.0,
            theta_hard_limit: 100.0,
            governor_saturation_warn: 0.2,

            steering_injection: false,
            steering_refresh_frames: 60,
            steering_multiplier: 1.0,
            annular_steering: false,
            annular_inner_m: 200_000.0,
            annular_outer_m: 600_000.0,
            legacy_drift_enabled: false,
            legacy_drift_speed: 2.5,
            legacy_drift_lat_scale: 0.05,
            legacy_drift_angle_low: 135.0,
            legacy_drift_angle_high: 120.0,
            legacy_lat_low: 15.0,
            legacy_lat_high: 30.0,
            storm_latitude: 15.0,
        }
    }
}

impl Config {
    /// Validate the parameter set. Called by the driver constructor; a
    /// configuration that fails here never runs a frame.
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
            if value > 0.0 {
                Ok(())
            } else {
                Err(ConfigError::NonPositive { name, value })
            }
        }
        fn ordered(
            lower: &'static str,
            lower_value: f64,
            upper: &'static str,
            upper_value: f64,
        ) -> Result<(), ConfigError> {
            if lower_value < upper_value {
                Ok(())
            } else {
                Err(ConfigError::InvertedLimits {
                    lower,
                    lower_value,
                    upper,
                    upper_value,
                })
            }
        }
        fn fraction(name: &'static str, value: f64, max: f64) -> Result<(), ConfigError> {
            if value > 0.0 && value <= max {
                Ok(())
            } else {
                Err(ConfigError::OutOfRange {
                    name,
                    value,
                    min: 0.0,
                    max,
                })
            }
        }

        positive("dt", self.dt)?;
        positive("smagorinsky_cs", self.smagorinsky_cs)?;
        positive("resolution_boost", self.resolution_boost)?;
        positive("scale_height", self.scale_height)?;
        positive("q_scale_height", self.q_scale_height)?;
        positive("tau_bm", self.tau_bm)?;
        positive("flux_depth_m", self.flux_depth_m)?;

        fraction("precip_efficiency", self.precip_efficiency, 1.0)?;
        fraction("bm_reference_rh", self.bm_reference_rh, 1.0)?;

        if self.radiative_cooling {
            positive("tau_rad", self.tau_rad)?;
            if self.dynamic_cooling {
                positive("tau_rad_min", self.tau_rad_min)?;
                positive("cooling_wind_scale", self.cooling_wind_scale)?;
                ordered("tau_rad_min", self.tau_rad_min, "tau_rad", self.tau_rad)?;
            }
        }

        ordered(
            "bm_taper_start_m",
            self.bm_taper_start_m,
            "bm_taper_full_m",
            self.bm_taper_full_m,
        )?;
        ordered(
            "wishe_wind_min",
            self.wishe_wind_min,
            "wishe_wind_max",
            self.wishe_wind_max,
        )?;
        if self.wishe_enabled && self.wishe_boost_max < 1.0 {
            return Err(ConfigError::OutOfRange {
                name: "wishe_boost_max",
                value: self.wishe_boost_max,
                min: 1.0,
                max: f64::INFINITY,
            });
        }

        ordered(
            "theta_soft_bound",
            self.theta_soft_bound,
            "theta_hard_bound",
            self.theta_hard_bound,
        )?;
        ordered(
            "theta_soft_limit",
            self.theta_soft_limit,
            "theta_hard_limit",
            self.theta_hard_limit,
        )?;
        ordered(
            "wind_damping_threshold",
            self.wind_damping_threshold,
            "wind_hard_cap",
            self.wind_hard_cap,
        )?;

        if self.sponge_enabled {
            fraction("sponge_band_fraction", self.sponge_band_fraction, 0.5)?;
            fraction("sponge_strength", self.sponge_strength, 1.0)?;
        }
        if self.vertical_sponge_enabled {
            fraction(
                "vertical_sponge_fraction",
                self.vertical_sponge_fraction,
                1.0,
            )?;
            fraction(
                "vertical_sponge_strength",
                self.vertical_sponge_strength,
                1.0,
            )?;
        }

        if self.moisture_floor_enabled && self.moisture_floor < 0.0 {
            return Err(ConfigError::OutOfRange {
                name: "moisture_floor",
                value: self.moisture_floor,
                min: 0.0,
                max: 1.0,
            });
        }

        if self.steering_injection && self.steering_refresh_frames == 0 {
            return Err(ConfigError::NonPositive {
                name: "steering_refresh_frames",
                value: 0.0,
            });
        }
        if self.annular_steering {
            ordered(
                "annular_inner_m",
                self.annular_inner_m,
                "annular_outer_m",
                self.annular_outer_m,
            )?;
        }
        if self.legacy_drift_enabled {
            ordered(
                "legacy_lat_low",
                self.legacy_lat_low,
                "legacy_lat_high",
                self.legacy_lat_high,
            )?;
        }

        Ok(())
    }
}
