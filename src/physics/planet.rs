use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Atmosphere density profile
// ---------------------------------------------------------------------------

/// How air density varies with altitude.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum AtmosphereModel {
    /// Surface density at every altitude.
    #[default]
    Uniform,
    /// rho(h) = rho0 * exp(-h / H)
    Exponential { scale_height: f64 },
}

// ---------------------------------------------------------------------------
// Planet: gravity and atmosphere lookup
// ---------------------------------------------------------------------------

/// Planetary environment. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Planet {
    pub name: String,
    pub surface_gravity: f64,   // m/s^2
    pub air_density: f64,       // kg/m^3 at the surface
    pub mass: f64,              // kg
    pub radius: f64,            // m
    #[serde(default)]
    pub atmosphere: AtmosphereModel,
    #[serde(default)]
    pub recommended_altitude: Option<f64>, // m
    #[serde(default)]
    pub recommended_velocity: Option<f64>, // m/s, vertical (negative = down)
}

impl Planet {
    pub fn new(
        name: impl Into<String>,
        surface_gravity: f64,
        air_density: f64,
        mass: f64,
        radius: f64,
    ) -> Self {
        Self {
            name: name.into(),
            surface_gravity,
            air_density,
            mass,
            radius,
            atmosphere: AtmosphereModel::Uniform,
            recommended_altitude: None,
            recommended_velocity: None,
        }
    }

    pub fn with_atmosphere(mut self, atmosphere: AtmosphereModel) -> Self {
        self.atmosphere = atmosphere;
        self
    }

    /// Suggested entry conditions for a descent on this body.
    pub fn with_recommended_entry(mut self, altitude: f64, velocity: f64) -> Self {
        self.recommended_altitude = Some(altitude);
        self.recommended_velocity = Some(velocity);
        self
    }

    /// Inverse-square gravity: g(h) = g0 * (R / (R + h))^2.
    /// Negative heights clamp to the surface.
    pub fn gravity_at_height(&self, height: f64) -> f64 {
        let h = height.max(0.0);
        self.surface_gravity * (self.radius / (self.radius + h)).powi(2)
    }

    /// Air density at the given height, kg/m^3.
    pub fn density_at_height(&self, height: f64) -> f64 {
        let h = height.max(0.0);
        match self.atmosphere {
            AtmosphereModel::Uniform => self.air_density,
            AtmosphereModel::Exponential { scale_height } if scale_height > 0.0 => {
                self.air_density * (-h / scale_height).exp()
            }
            AtmosphereModel::Exponential { .. } => self.air_density,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if !(self.surface_gravity >= 0.0 && self.surface_gravity.is_finite()) {
            return Err(ConfigError::invalid("surface_gravity", "must be finite and >= 0"));
        }
        if !(self.radius > 0.0 && self.radius.is_finite()) {
            return Err(ConfigError::invalid("radius", "must be finite and > 0"));
        }
        if !(self.air_density >= 0.0) {
            return Err(ConfigError::invalid("air_density", "must be >= 0"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Planet catalog
// ---------------------------------------------------------------------------

pub mod presets {
    use super::*;

    pub fn earth() -> Planet {
        Planet::new("Earth", 9.81, 1.225, 5.972e24, 6.371e6)
            .with_recommended_entry(1000.0, -100.0)
    }

    pub fn mars() -> Planet {
        Planet::new("Mars", 3.71, 0.02, 6.417e23, 3.3895e6)
            .with_recommended_entry(1000.0, -100.0)
    }

    pub fn moon() -> Planet {
        Planet::new("Moon", 1.62, 0.0, 7.342e22, 1.737e6)
            .with_recommended_entry(1000.0, -20.0)
    }

    /// Names accepted by [`by_name`].
    pub fn names() -> [&'static str; 3] {
        ["Earth", "Mars", "Moon"]
    }

    /// Case-insensitive lookup.
    pub fn by_name(name: &str) -> Result<Planet, ConfigError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "earth" => Ok(earth()),
            "mars" => Ok(mars()),
            "moon" => Ok(moon()),
            _ => Err(ConfigError::UnknownPlanet(name.to_string())),
        }
    }
}
