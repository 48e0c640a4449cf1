use nalgebra::Vector3;
use tracing::{debug, info, warn};

use super::event::{FlightPhase, LandingOutcome, Touchdown};
use super::telemetry::Telemetry;
use crate::config::{InactivePolicy, SimConfig};
use crate::dynamics::rigid_body;
use crate::dynamics::state::KinematicState;
use crate::emergency::EmergencyScenarioHandler;
use crate::error::{ConfigError, SimError};
use crate::gnc::{build_controller, Controller};
use crate::physics::Planet;
use crate::propulsion::{fuel, ThrustAllocator};
use crate::vehicle::{Engine, Lander};

/// Upper bound on the number of steps a single `run` may take.
const MAX_RUN_STEPS: f64 = 1.0e7;

// ---------------------------------------------------------------------------
// Simulator: owns the vehicle, guidance, allocator and failure injection
// ---------------------------------------------------------------------------

/// One descent run.
///
/// Each `step(dt)`:
///   1. Advances the emergency clock
///   2. Gets the desired acceleration from the controller (or the manual
///      thrust), converts it to force `m (a + g)` along the thrust direction
///      and allocates it over the engines
///   3. Routes every engine throttle through the emergency handler
///   4. Limits thrust by the remaining propellant
///   5. Integrates the rigid body under the total delivered thrust
///
/// The run is `Landed` once altitude reaches zero; later steps return the
/// touchdown snapshot unchanged.
pub struct Simulator {
    planet: Planet,
    lander: Lander,
    config: SimConfig,
    controller: Option<Box<dyn Controller>>,
    allocator: Option<ThrustAllocator>,
    emergency: EmergencyScenarioHandler,
    manual_thrust: f64,
    time: f64,
    phase: FlightPhase,
    last: Option<Telemetry>,
    touchdown: Option<Touchdown>,
}

impl Simulator {
    pub fn new(planet: Planet, mut lander: Lander, config: SimConfig) -> Result<Self, ConfigError> {
        planet.validate()?;
        config.validate()?;

        let controller = config.controller.as_ref().map(build_controller).transpose()?;
        let allocator = if lander.engines.is_empty() {
            None
        } else {
            Some(ThrustAllocator::new(&lander.engines)?)
        };
        let emergency = EmergencyScenarioHandler::new(config.emergency, &mut lander.engines)?;
        lander.state = KinematicState::at_altitude(config.initial_altitude, config.initial_velocity);

        info!(
            planet = %planet.name,
            vehicle = %lander.name,
            engines = lander.engines.len(),
            controller = controller.as_ref().map_or("manual", |c| c.name()),
            "simulator ready"
        );

        Ok(Self {
            planet,
            lander,
            config,
            controller,
            allocator,
            emergency,
            manual_thrust: 0.0,
            time: 0.0,
            phase: FlightPhase::Fresh,
            last: None,
            touchdown: None,
        })
    }

    // --- Accessors ---

    pub fn planet(&self) -> &Planet {
        &self.planet
    }

    pub fn lander(&self) -> &Lander {
        &self.lander
    }

    /// Direct vehicle access, e.g. to fail or repair engines mid-run.
    pub fn lander_mut(&mut self) -> &mut Lander {
        &mut self.lander
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn phase(&self) -> FlightPhase {
        self.phase
    }

    pub fn controller_name(&self) -> Option<&str> {
        self.controller.as_ref().map(|c| c.name())
    }

    pub fn emergency(&self) -> &EmergencyScenarioHandler {
        &self.emergency
    }

    pub fn touchdown(&self) -> Option<&Touchdown> {
        self.touchdown.as_ref()
    }

    pub fn outcome(&self) -> Option<LandingOutcome> {
        self.touchdown.as_ref().map(|t| t.outcome)
    }

    /// Total thrust used when no controller is bound. Clamped at step time
    /// to the enabled engines' capacity and split equally among them.
    pub fn set_manual_thrust(&mut self, thrust: f64) {
        self.manual_thrust = if thrust.is_finite() { thrust.max(0.0) } else { 0.0 };
    }

    // --- Stepping ---

    pub fn step(&mut self, dt: f64) -> Result<Telemetry, SimError> {
        if !(dt > 0.0 && dt.is_finite()) {
            return Err(SimError::InvalidTimeStep(dt));
        }
        if self.phase == FlightPhase::Landed {
            if let Some(last) = &self.last {
                return Ok(last.clone());
            }
        }
        self.phase = FlightPhase::Running;
        self.emergency.advance(dt);

        let g = self.planet.gravity_at_height(self.lander.state.altitude());
        let (desired, desired_accel) = self.desired_thrusts(g, dt);

        for (i, engine) in self.lander.engines.iter_mut().enumerate() {
            let wanted = engine.throttle_for(desired.get(i).copied().unwrap_or(0.0));
            let throttle = self.emergency.modify_throttle_command(i, wanted);
            engine.set_throttle(throttle);
        }
        self.emergency.apply_step_effects(&mut self.lander.engines);

        let commanded: Vec<f64> = self.lander.engines.iter().map(Engine::current_thrust).collect();
        let delivered = fuel::consume_fuel_for_thrusts(&mut self.lander, &commanded, dt);
        let total: f64 = delivered.iter().sum();
        if total < commanded.iter().sum::<f64>() {
            debug!(commanded = commanded.iter().sum::<f64>(), delivered = total, "thrust limited by propellant");
        }

        rigid_body::step(
            &mut self.lander,
            &self.planet,
            &self.config.thrust_direction,
            total,
            dt,
            &self.config.wind,
        );
        self.time += dt;

        if self.lander.state.altitude() <= 0.0 {
            self.land();
        }

        let snapshot = self.snapshot(total, desired_accel);
        self.last = Some(snapshot.clone());
        Ok(snapshot)
    }

    /// Step with `dt` until touchdown or `max_time`; returns every snapshot.
    /// A `dt` needing more than `MAX_RUN_STEPS` steps to reach `max_time` is
    /// rejected like a non-positive one.
    pub fn run(&mut self, dt: f64) -> Result<Vec<Telemetry>, SimError> {
        if !(dt > 0.0 && dt.is_finite()) {
            return Err(SimError::InvalidTimeStep(dt));
        }
        let steps = ((self.config.max_time - self.time) / dt).ceil().max(0.0);
        if !(steps <= MAX_RUN_STEPS) {
            return Err(SimError::InvalidTimeStep(dt));
        }
        let mut trajectory = Vec::with_capacity((steps as usize).min(200_000) + 1);
        while self.phase != FlightPhase::Landed && self.time < self.config.max_time - 1e-9 {
            trajectory.push(self.step(dt)?);
        }
        Ok(trajectory)
    }

    /// Back to a fresh state at `initial_altitude` with the configured
    /// initial velocity: full tank, throttles cut, controller and emergency
    /// handler reset. A non-finite altitude falls back to the configured one.
    pub fn reset(&mut self, initial_altitude: f64) {
        let initial_altitude = if initial_altitude.is_finite() {
            initial_altitude
        } else {
            warn!(requested = initial_altitude, fallback = self.config.initial_altitude, "non-finite reset altitude");
            self.config.initial_altitude
        };
        self.lander.state = KinematicState::at_altitude(initial_altitude, self.config.initial_velocity);
        self.lander.reset_fuel();
        for engine in &mut self.lander.engines {
            engine.set_throttle(0.0);
        }
        if let Some(controller) = self.controller.as_mut() {
            controller.reset();
        }
        self.emergency.reset(&mut self.lander.engines);
        self.time = 0.0;
        self.phase = FlightPhase::Fresh;
        self.last = None;
        self.touchdown = None;
        info!(altitude = initial_altitude, "simulator reset");
    }

    /// Per-engine thrust requests and the guidance output, if any. Coasting
    /// above the activation altitude reports no guidance output.
    fn desired_thrusts(&mut self, g: f64, dt: f64) -> (Vec<f64>, Option<f64>) {
        let n = self.lander.engines.len();
        let Some(allocator) = &self.allocator else {
            return (vec![0.0; n], None);
        };

        let Some(controller) = self.controller.as_mut() else {
            return (manual_split(&self.lander.engines, self.manual_thrust), None);
        };

        let state = &self.lander.state;
        let commanded = controller.update(state.vertical_velocity(), dt, state.altitude());
        let active = self
            .config
            .controller
            .as_ref()
            .and_then(|c| c.activation_altitude())
            .map_or(true, |h| state.altitude() <= h);

        let accel = match (active, self.config.inactive_policy) {
            (true, _) => commanded,
            (false, InactivePolicy::HoldVelocity) => 0.0,
            (false, InactivePolicy::Coast) => return (vec![0.0; n], None),
        };

        let magnitude = (self.lander.mass() * (accel + g)).max(0.0);
        let force = self.config.thrust_direction.normalize() * magnitude;
        let thrusts = allocator.allocate(&self.lander.engines, &force, &Vector3::zeros());
        (thrusts, Some(accel))
    }

    fn land(&mut self) {
        self.phase = FlightPhase::Landed;
        let td = Touchdown::new(
            self.time,
            self.lander.state.velocity,
            self.lander.fuel_mass(),
            self.config.crash_speed,
        );
        info!(
            time = td.time,
            speed = td.speed,
            fuel = td.fuel_remaining,
            outcome = %td.outcome,
            "touchdown"
        );
        self.touchdown = Some(td);
    }

    fn snapshot(&self, thrust: f64, desired_acceleration: Option<f64>) -> Telemetry {
        let s = &self.lander.state;
        Telemetry {
            time: self.time,
            position: s.position,
            velocity: s.velocity,
            orientation: s.orientation,
            angular_velocity: s.angular_velocity,
            thrust,
            desired_acceleration,
            phase: self.phase,
            extras: self.lander.telemetry_extras(),
        }
    }
}

/// Equal split of `total` over enabled engines, capped at their capacity.
fn manual_split(engines: &[Engine], total: f64) -> Vec<f64> {
    let active = engines.iter().filter(|e| e.enabled()).count();
    if active == 0 {
        return vec![0.0; engines.len()];
    }
    let capacity: f64 = engines.iter().map(Engine::available_thrust).sum();
    let each = total.min(capacity) / active as f64;
    engines
        .iter()
        .map(|e| if e.enabled() { each.min(e.max_thrust) } else { 0.0 })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
