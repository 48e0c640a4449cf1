use std::f64::consts::TAU;
use std::fmt;
use std::str::FromStr;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use super::engine::Engine;
use super::lander::{Lander, LanderBuilder};
use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Vehicle catalog
// ---------------------------------------------------------------------------

/// Closed set of vehicle layouts. Engine layouts are data, built here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleKind {
    MoonLander,
    Falcon9Booster,
    StarshipPayload,
}

impl VehicleKind {
    pub const ALL: [VehicleKind; 3] = [
        VehicleKind::MoonLander,
        VehicleKind::Falcon9Booster,
        VehicleKind::StarshipPayload,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            VehicleKind::MoonLander => "Moon Lander",
            VehicleKind::Falcon9Booster => "Falcon 9 Booster",
            VehicleKind::StarshipPayload => "Starship Payload Bay",
        }
    }

    /// Planets this vehicle is intended for.
    pub fn compatible_planets(self) -> &'static [&'static str] {
        match self {
            VehicleKind::MoonLander => &["Moon"],
            VehicleKind::Falcon9Booster => &["Mars", "Earth"],
            VehicleKind::StarshipPayload => &["Earth", "Mars", "Moon"],
        }
    }

    pub fn is_compatible_with(self, planet: &str) -> bool {
        self.compatible_planets()
            .iter()
            .any(|p| p.eq_ignore_ascii_case(planet.trim()))
    }

    /// Vehicles intended for the given planet.
    pub fn compatible_with(planet: &str) -> Vec<VehicleKind> {
        Self::ALL
            .into_iter()
            .filter(|v| v.is_compatible_with(planet))
            .collect()
    }

    pub fn build(self) -> Result<Lander, ConfigError> {
        match self {
            VehicleKind::MoonLander => moon_lander(),
            VehicleKind::Falcon9Booster => falcon9_booster(),
            VehicleKind::StarshipPayload => starship_payload(),
        }
    }
}

impl fmt::Display for VehicleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for VehicleKind {
    type Err = ConfigError;

    /// Accepts snake_case keys or display names, case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "moonlander" => Ok(VehicleKind::MoonLander),
            "falcon9booster" | "falcon9" => Ok(VehicleKind::Falcon9Booster),
            "starshippayload" | "starshippayloadbay" => Ok(VehicleKind::StarshipPayload),
            _ => Err(ConfigError::UnknownVehicle(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Layout builders
// ---------------------------------------------------------------------------

/// Apollo Lunar Module descent stage approximation: one throttleable engine.
pub fn moon_lander() -> Result<Lander, ConfigError> {
    let (w, h, d) = (8.2, 4.2, 6.4);
    LanderBuilder::new(VehicleKind::MoonLander.display_name())
        .dry_mass(15_103.0 - 8_200.0)
        .max_fuel_mass(8_200.0)
        .drag_coefficient(0.8)
        .dimensions(w, h, d)
        .engine(
            Engine::new(45_000.0, Vector3::new(0.0, -h / 2.0, 0.0), Vector3::y())
                .with_specific_impulse(311.0)
                .with_engine_type("DPS"),
        )
        .build()
}

/// Falcon 9 first stage: centre engine plus a ring of eight at the base.
pub fn falcon9_booster() -> Result<Lander, ConfigError> {
    let (w, h, d) = (3.7, 70.0, 3.7);
    let radius = (w / 2.0 * 0.9_f64).min(1.8);
    let y = -h / 2.0;

    let merlin = |pos: Vector3<f64>| {
        Engine::new(845_000.0, pos, Vector3::y())
            .with_specific_impulse(282.0)
            .with_engine_type("Merlin 1D")
    };
    let ring = (0..8).map(|i| {
        let theta = TAU * i as f64 / 8.0;
        merlin(Vector3::new(radius * theta.cos(), y, radius * theta.sin()))
    });

    LanderBuilder::new(VehicleKind::Falcon9Booster.display_name())
        .dry_mass(25_600.0)
        .max_fuel_mass(395_700.0)
        .drag_coefficient(0.75)
        .dimensions(w, h, d)
        .engine(merlin(Vector3::new(0.0, y, 0.0)))
        .engines(ring)
        .build()
}

/// Unpowered payload section: no propellant and no engines.
pub fn starship_payload() -> Result<Lander, ConfigError> {
    LanderBuilder::new(VehicleKind::StarshipPayload.display_name())
        .dry_mass(12_000.0)
        .max_fuel_mass(0.0)
        .drag_coefficient(0.5)
        .dimensions(9.0, 13.0, 9.0)
        .build()
}
