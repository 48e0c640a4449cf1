use nalgebra::Vector3;

use super::engine::Engine;
use crate::dynamics::state::KinematicState;
use crate::error::ConfigError;
use crate::sim::telemetry::TelemetryExtras;

pub const DEFAULT_SPECIFIC_IMPULSE: f64 = 300.0; // s, used by engines without their own Isp

// ---------------------------------------------------------------------------
// Lander: cuboid body, propellant, engine set, kinematic state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Lander {
    pub name: String,
    pub dry_mass: f64,               // kg
    pub max_fuel_mass: f64,          // kg
    fuel_mass: f64,                  // kg, 0..=max_fuel_mass
    pub drag_coefficient: f64,
    pub dimensions: Vector3<f64>,    // m, [width, height, depth]
    pub specific_impulse: f64,       // s, vehicle default
    pub engines: Vec<Engine>,
    pub state: KinematicState,
    fuel_consumption_rate: f64,      // kg/s over the last step
}

impl Lander {
    /// Total mass; never stored, always dry + fuel.
    pub fn mass(&self) -> f64 {
        self.dry_mass + self.fuel_mass
    }

    pub fn fuel_mass(&self) -> f64 {
        self.fuel_mass
    }

    pub fn fuel_consumption_rate(&self) -> f64 {
        self.fuel_consumption_rate
    }

    pub fn fuel_fraction(&self) -> f64 {
        if self.max_fuel_mass > 0.0 {
            self.fuel_mass / self.max_fuel_mass
        } else {
            0.0
        }
    }

    /// Diagonal inertia of a solid cuboid at current mass, kg*m^2.
    pub fn inertia(&self) -> Vector3<f64> {
        let (w, h, d) = (self.dimensions.x, self.dimensions.y, self.dimensions.z);
        self.mass() / 12.0 * Vector3::new(h * h + d * d, w * w + d * d, w * w + h * h)
    }

    /// Burn up to `amount` kg over `dt`. Returns the mass actually consumed
    /// and records the resulting consumption rate.
    pub fn consume_fuel(&mut self, amount: f64, dt: f64) -> f64 {
        let consumed = self.fuel_mass.min(amount.max(0.0));
        self.fuel_mass -= consumed;
        self.fuel_consumption_rate = if dt > 0.0 { consumed / dt } else { 0.0 };
        consumed
    }

    pub(crate) fn clear_consumption_rate(&mut self) {
        self.fuel_consumption_rate = 0.0;
    }

    pub fn reset_fuel(&mut self) {
        self.fuel_mass = self.max_fuel_mass;
        self.fuel_consumption_rate = 0.0;
    }

    /// Sets fuel directly, clamped to [0, max_fuel_mass].
    pub fn set_fuel_mass(&mut self, fuel: f64) {
        self.fuel_mass = fuel.clamp(0.0, self.max_fuel_mass);
    }

    pub fn active_engine_count(&self) -> usize {
        self.engines.iter().filter(|e| e.enabled()).count()
    }

    /// Sum of enabled engines' max thrust, N.
    pub fn max_total_thrust(&self) -> f64 {
        self.engines.iter().map(Engine::available_thrust).sum()
    }

    pub fn current_total_thrust(&self) -> f64 {
        self.engines.iter().map(Engine::current_thrust).sum()
    }

    /// Out-of-range indices are ignored.
    pub fn set_engine_enabled(&mut self, index: usize, enabled: bool) {
        if let Some(engine) = self.engines.get_mut(index) {
            engine.set_enabled(enabled);
        }
    }

    pub fn fail_engine(&mut self, index: usize) {
        self.set_engine_enabled(index, false);
    }

    pub fn repair_engine(&mut self, index: usize) {
        self.set_engine_enabled(index, true);
    }

    /// Isp for an engine, falling back to the vehicle default.
    pub fn engine_isp(&self, index: usize) -> f64 {
        self.engines
            .get(index)
            .and_then(|e| e.specific_impulse)
            .unwrap_or(self.specific_impulse)
    }

    /// Mass, fuel and per-engine figures for display collaborators.
    pub fn telemetry_extras(&self) -> TelemetryExtras {
        TelemetryExtras {
            total_mass: self.mass(),
            dry_mass: self.dry_mass,
            fuel_mass: self.fuel_mass,
            max_fuel_mass: self.max_fuel_mass,
            fuel_consumption_rate: self.fuel_consumption_rate,
            fuel_percentage: self.fuel_fraction() * 100.0,
            engine_thrust: self.engines.iter().map(Engine::current_thrust).collect(),
            engine_enabled: self.engines.iter().map(Engine::enabled).collect(),
            engine_max_thrust: self.engines.iter().map(|e| e.max_thrust).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Lander builder
// ---------------------------------------------------------------------------

pub struct LanderBuilder {
    name: String,
    dry_mass: f64,
    max_fuel_mass: f64,
    drag_coefficient: f64,
    dimensions: Vector3<f64>,
    specific_impulse: f64,
    engines: Vec<Engine>,
}

impl LanderBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dry_mass: 1000.0,
            max_fuel_mass: 500.0,
            drag_coefficient: 0.8,
            dimensions: Vector3::new(2.0, 2.0, 4.0),
            specific_impulse: DEFAULT_SPECIFIC_IMPULSE,
            engines: vec![],
        }
    }

    pub fn dry_mass(mut self, v: f64) -> Self {
        self.dry_mass = v;
        self
    }

    pub fn max_fuel_mass(mut self, v: f64) -> Self {
        self.max_fuel_mass = v;
        self
    }

    pub fn drag_coefficient(mut self, v: f64) -> Self {
        self.drag_coefficient = v;
        self
    }

    pub fn dimensions(mut self, w: f64, h: f64, d: f64) -> Self {
        self.dimensions = Vector3::new(w, h, d);
        self
    }

    pub fn specific_impulse(mut self, v: f64) -> Self {
        self.specific_impulse = v;
        self
    }

    pub fn engine(mut self, e: Engine) -> Self {
        self.engines.push(e);
        self
    }

    pub fn engines(mut self, es: impl IntoIterator<Item = Engine>) -> Self {
        self.engines.extend(es);
        self
    }

    /// Starts with a full tank, level, at 1000 m.
    pub fn build(self) -> Result<Lander, ConfigError> {
        if !(self.dry_mass > 0.0 && self.dry_mass.is_finite()) {
            return Err(ConfigError::invalid("dry_mass", "must be finite and > 0"));
        }
        if !(self.max_fuel_mass >= 0.0 && self.max_fuel_mass.is_finite()) {
            return Err(ConfigError::invalid("max_fuel_mass", "must be finite and >= 0"));
        }
        if self.dimensions.iter().any(|d| !(*d > 0.0)) {
            return Err(ConfigError::invalid("dimensions", "all sides must be > 0"));
        }
        if !(self.specific_impulse > 0.0) {
            return Err(ConfigError::invalid("specific_impulse", "must be > 0"));
        }
        if let Some(e) = self.engines.iter().find(|e| e.specific_impulse.is_some_and(|isp| !(isp > 0.0))) {
            return Err(ConfigError::invalid(
                "engine specific_impulse",
                format!("{:?} must be > 0", e.specific_impulse),
            ));
        }

        Ok(Lander {
            name: self.name,
            dry_mass: self.dry_mass,
            max_fuel_mass: self.max_fuel_mass,
            fuel_mass: self.max_fuel_mass,
            drag_coefficient: self.drag_coefficient,
            dimensions: self.dimensions,
            specific_impulse: self.specific_impulse,
            engines: self.engines,
            state: KinematicState::default(),
            fuel_consumption_rate: 0.0,
        })
    }
}
