use tracing::debug;

use crate::dynamics::state::G0;
use crate::vehicle::Lander;

// ---------------------------------------------------------------------------
// Fuel manager: propellant limits on commanded thrust
// ---------------------------------------------------------------------------

/// Propellant mass flow (kg/s) for the given per-engine thrusts.
/// Only positive thrusts contribute.
pub fn mass_flow_rate(lander: &Lander, thrusts: &[f64]) -> f64 {
    thrusts
        .iter()
        .enumerate()
        .filter(|(_, t)| **t > 0.0)
        .map(|(i, t)| t / (lander.engine_isp(i) * G0))
        .sum()
}

/// Burn the propellant needed to deliver `thrusts` for `dt` and return the
/// thrusts actually delivered.
///
/// With an empty tank every throttle is cut and all thrusts are zero. When
/// the tank holds less than is needed, every thrust and throttle is scaled by
/// `fuel / needed` and the tank is emptied. The lander's consumption rate
/// always reflects what was actually burned this step.
pub fn consume_fuel_for_thrusts(lander: &mut Lander, thrusts: &[f64], dt: f64) -> Vec<f64> {
    lander.clear_consumption_rate();

    let flow = mass_flow_rate(lander, thrusts);
    if flow <= 0.0 {
        return thrusts.to_vec();
    }

    let fuel = lander.fuel_mass();
    if fuel <= 0.0 {
        for engine in &mut lander.engines {
            engine.set_throttle(0.0);
        }
        return vec![0.0; thrusts.len()];
    }

    let needed = flow * dt;
    if needed > fuel {
        let scale = fuel / needed;
        debug!(needed, fuel, scale, "propellant short, scaling thrust");
        for engine in &mut lander.engines {
            let throttle = engine.throttle();
            engine.set_throttle(throttle * scale);
        }
        lander.consume_fuel(fuel, dt);
        return thrusts.iter().map(|t| t * scale).collect();
    }

    lander.consume_fuel(needed, dt);
    thrusts.to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vehicle::{Engine, LanderBuilder};
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    fn lander(fuel: f64) -> Lander {
        let mut l = LanderBuilder::new("Tank")
            .dry_mass(1000.0)
            .max_fuel_mass(100.0)
            .engine(Engine::new(10_000.0, Vector3::new(-1.0, -1.0, 0.0), Vector3::y()))
            .engine(Engine::new(10_000.0, Vector3::new(1.0, -1.0, 0.0), Vector3::y()).with_specific_impulse(200.0))
            .build()
            .unwrap();
        l.set_fuel_mass(fuel);
        l
    }

    #[test]
    fn mass_flow_uses_engine_isp_with_fallback() {
        let l = lander(100.0);
        let flow = mass_flow_rate(&l, &[3000.0, 2000.0]);
        assert_relative_eq!(flow, 3000.0 / (300.0 * G0) + 2000.0 / (200.0 * G0), epsilon = 1e-12);
        assert_relative_eq!(mass_flow_rate(&l, &[-5.0, 0.0]), 0.0);
    }

    #[test]
    fn ample_fuel_passes_thrust_through() {
        let mut l = lander(100.0);
        let thrusts = [3000.0, 2000.0];
        let expected = mass_flow_rate(&l, &thrusts) * 0.1;
        let out = consume_fuel_for_thrusts(&mut l, &thrusts, 0.1);
        assert_eq!(out, thrusts.to_vec());
        assert_relative_eq!(l.fuel_mass(), 100.0 - expected, epsilon = 1e-12);
        assert_relative_eq!(l.fuel_consumption_rate(), expected / 0.1, epsilon = 1e-9);
    }

    #[test]
    fn short_tank_scales_thrust_and_throttle() {
        let mut l = lander(0.01);
        l.engines[0].set_throttle(0.5);
        l.engines[1].set_throttle(0.5);
        let thrusts = [5000.0, 5000.0];
        let needed = mass_flow_rate(&l, &thrusts) * 1.0;
        let scale = 0.01 / needed;

        let out = consume_fuel_for_thrusts(&mut l, &thrusts, 1.0);
        assert_relative_eq!(out[0], 5000.0 * scale, epsilon = 1e-9);
        assert_relative_eq!(l.engines[1].throttle(), 0.5 * scale, epsilon = 1e-12);
        assert_relative_eq!(l.fuel_mass(), 0.0);
        assert_relative_eq!(l.fuel_consumption_rate(), 0.01, epsilon = 1e-12);
    }

    #[test]
    fn empty_tank_cuts_every_engine() {
        let mut l = lander(0.0);
        l.engines[0].set_throttle(1.0);
        let out = consume_fuel_for_thrusts(&mut l, &[10_000.0, 4000.0], 0.1);
        assert_eq!(out, vec![0.0, 0.0]);
        assert!(l.engines.iter().all(|e| e.current_thrust() == 0.0));
        assert_relative_eq!(l.fuel_consumption_rate(), 0.0);
    }

    #[test]
    fn zero_demand_burns_nothing() {
        let mut l = lander(50.0);
        l.consume_fuel(1.0, 0.1);
        let out = consume_fuel_for_thrusts(&mut l, &[0.0, 0.0], 0.1);
        assert_eq!(out, vec![0.0, 0.0]);
        assert_relative_eq!(l.fuel_mass(), 49.0);
        assert_relative_eq!(l.fuel_consumption_rate(), 0.0);
    }
}
