//! Emergency scenarios: engine failures, a stuck engine and actuator lag.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ConfigError;
use crate::vehicle::Engine;

/// Age tolerance (s) when deciding whether a lagged command has matured.
const LAG_AGE_TOL: f64 = 1e-9;
/// Commands older than `delay + HISTORY_MARGIN` are dropped.
const HISTORY_MARGIN: f64 = 1.0;

/// Scenario selection: `type = "none" | "engine_failure" | "engine_stuck" |
/// "response_lag"` with its `params`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "params", rename_all = "snake_case")]
pub enum EmergencyScenario {
    #[default]
    #[serde(rename = "none")]
    Nominal,
    /// The first `count` engines are disabled for the whole run.
    EngineFailure {
        #[serde(default = "default_count")]
        count: usize,
    },
    /// Engine 0 is held enabled at a fixed throttle.
    EngineStuck {
        #[serde(default = "default_throttle")]
        throttle: f64,
    },
    /// Throttle commands take effect `delay` seconds after they are issued.
    ResponseLag {
        #[serde(default)]
        delay: f64,
    },
}

fn default_count() -> usize {
    1
}

fn default_throttle() -> f64 {
    1.0
}

impl EmergencyScenario {
    pub fn type_name(&self) -> &'static str {
        match self {
            EmergencyScenario::Nominal => "none",
            EmergencyScenario::EngineFailure { .. } => "engine_failure",
            EmergencyScenario::EngineStuck { .. } => "engine_stuck",
            EmergencyScenario::ResponseLag { .. } => "response_lag",
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            EmergencyScenario::EngineStuck { throttle } if !(0.0..=1.0).contains(&throttle) => {
                Err(ConfigError::InvalidScenario(format!(
                    "engine_stuck throttle must be in [0, 1], got {throttle}"
                )))
            }
            EmergencyScenario::ResponseLag { delay } if !(delay >= 0.0 && delay.is_finite()) => {
                Err(ConfigError::InvalidScenario(format!(
                    "response_lag delay must be finite and >= 0, got {delay}"
                )))
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Display for EmergencyScenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmergencyScenario::Nominal => write!(f, "none"),
            EmergencyScenario::EngineFailure { count } => write!(f, "engine_failure(count={count})"),
            EmergencyScenario::EngineStuck { throttle } => write!(f, "engine_stuck(throttle={throttle})"),
            EmergencyScenario::ResponseLag { delay } => write!(f, "response_lag(delay={delay}s)"),
        }
    }
}

// ---------------------------------------------------------------------------
// Named presets
// ---------------------------------------------------------------------------

pub const CATALOG: [(&str, EmergencyScenario); 7] = [
    ("None", EmergencyScenario::Nominal),
    ("One Engine Failure", EmergencyScenario::EngineFailure { count: 1 }),
    ("Two Engine Failure", EmergencyScenario::EngineFailure { count: 2 }),
    ("One Engine Stuck at 100%", EmergencyScenario::EngineStuck { throttle: 1.0 }),
    ("Response Lag: Mild (0.2s)", EmergencyScenario::ResponseLag { delay: 0.2 }),
    ("Response Lag: Medium (0.5s)", EmergencyScenario::ResponseLag { delay: 0.5 }),
    ("Response Lag: Severe (1.0s)", EmergencyScenario::ResponseLag { delay: 1.0 }),
];

pub fn scenario_names() -> impl Iterator<Item = &'static str> {
    CATALOG.iter().map(|(name, _)| *name)
}

/// Case-insensitive preset lookup.
pub fn scenario_by_name(name: &str) -> Option<EmergencyScenario> {
    CATALOG
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name.trim()))
        .map(|(_, s)| *s)
}

// ---------------------------------------------------------------------------
// Handler
// ---------------------------------------------------------------------------

/// Applies one scenario to an engine set over a run.
///
/// The handler keeps its own clock, advanced by the simulator at the start
/// of every step. Under response lag it delays only commanded throttle;
/// measured state is never buffered.
#[derive(Debug, Clone)]
pub struct EmergencyScenarioHandler {
    scenario: EmergencyScenario,
    time: f64,
    history: Vec<VecDeque<(f64, f64)>>,
}

impl EmergencyScenarioHandler {
    /// Validates the scenario and applies its initial setup to `engines`.
    pub fn new(scenario: EmergencyScenario, engines: &mut [Engine]) -> Result<Self, ConfigError> {
        scenario.validate()?;
        let handler = Self {
            scenario,
            time: 0.0,
            history: vec![VecDeque::new(); engines.len()],
        };
        handler.apply_initial(engines);
        info!(scenario = %scenario, engines = engines.len(), "emergency scenario armed");
        Ok(handler)
    }

    pub fn scenario(&self) -> EmergencyScenario {
        self.scenario
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn advance(&mut self, dt: f64) {
        self.time += dt;
    }

    /// Throttle the engine actually receives for `desired`.
    ///
    /// Under response lag the command is queued with the current time and the
    /// newest command at least `delay` old is returned, or 0 if none is.
    pub fn modify_throttle_command(&mut self, engine_index: usize, desired: f64) -> f64 {
        let delay = match self.scenario {
            EmergencyScenario::ResponseLag { delay } if delay > 0.0 => delay,
            _ => return desired,
        };
        if engine_index >= self.history.len() {
            self.history.resize(engine_index + 1, VecDeque::new());
        }
        let now = self.time;
        let queue = &mut self.history[engine_index];
        queue.push_back((now, desired));

        let cutoff = now - delay - HISTORY_MARGIN;
        while queue.front().is_some_and(|(t, _)| *t < cutoff) {
            queue.pop_front();
        }

        queue
            .iter()
            .rev()
            .find(|(t, _)| now - t >= delay - LAG_AGE_TOL)
            .map_or(0.0, |(_, throttle)| *throttle)
    }

    /// Per-step overrides, applied after commanded throttles are set.
    pub fn apply_step_effects(&self, engines: &mut [Engine]) {
        if let EmergencyScenario::EngineStuck { throttle } = self.scenario {
            if let Some(engine) = engines.first_mut() {
                engine.set_enabled(true);
                engine.set_throttle(throttle);
            }
        }
    }

    /// Clear clock and history, re-enable every engine, then re-apply the
    /// scenario's initial setup.
    pub fn reset(&mut self, engines: &mut [Engine]) {
        self.time = 0.0;
        self.history = vec![VecDeque::new(); engines.len()];
        for engine in engines.iter_mut() {
            engine.set_enabled(true);
        }
        self.apply_initial(engines);
    }

    fn apply_initial(&self, engines: &mut [Engine]) {
        if let EmergencyScenario::EngineFailure { count } = self.scenario {
            for engine in engines.iter_mut().take(count) {
                engine.set_enabled(false);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vehicle::presets;
    use nalgebra::Vector3;

    fn engines(n: usize) -> Vec<Engine> {
        (0..n)
            .map(|i| Engine::new(1000.0, Vector3::new(i as f64, -1.0, 0.0), Vector3::y()))
            .collect()
    }

    #[test]
    fn engine_failure_survives_reset() {
        let mut lander = presets::falcon9_booster().unwrap();
        let mut handler =
            EmergencyScenarioHandler::new(EmergencyScenario::EngineFailure { count: 1 }, &mut lander.engines).unwrap();
        assert_eq!(lander.active_engine_count(), 8);
        assert!(!lander.engines[0].enabled());

        lander.repair_engine(0);
        handler.reset(&mut lander.engines);
        assert_eq!(lander.active_engine_count(), 8);
        assert!(!lander.engines[0].enabled());
    }

    #[test]
    fn failure_count_larger_than_engine_set() {
        let mut es = engines(2);
        EmergencyScenarioHandler::new(EmergencyScenario::EngineFailure { count: 5 }, &mut es).unwrap();
        assert!(es.iter().all(|e| !e.enabled()));
    }

    #[test]
    fn stuck_engine_overrides_command() {
        let mut es = engines(2);
        let handler =
            EmergencyScenarioHandler::new(EmergencyScenario::EngineStuck { throttle: 0.7 }, &mut es).unwrap();
        es[0].set_enabled(false);
        es[1].set_throttle(0.2);
        handler.apply_step_effects(&mut es);
        assert!(es[0].enabled());
        assert_eq!(es[0].throttle(), 0.7);
        assert_eq!(es[1].throttle(), 0.2);
    }

    #[test]
    fn response_lag_holds_back_commands() {
        let mut es = engines(1);
        let mut handler =
            EmergencyScenarioHandler::new(EmergencyScenario::ResponseLag { delay: 0.5 }, &mut es).unwrap();

        let mut outputs = Vec::new();
        for step in 0..10 {
            handler.advance(0.1);
            let cmd = if step < 3 { 1.0 } else { 0.25 };
            outputs.push(handler.modify_throttle_command(0, cmd));
        }
        // first command issued at t=0.1 matures at t=0.6 (step 5)
        assert_eq!(&outputs[..5], &[0.0; 5]);
        assert_eq!(&outputs[5..8], &[1.0, 1.0, 1.0]);
        assert_eq!(&outputs[8..], &[0.25, 0.25]);
    }

    #[test]
    fn response_lag_prunes_old_history() {
        let mut es = engines(1);
        let mut handler =
            EmergencyScenarioHandler::new(EmergencyScenario::ResponseLag { delay: 0.2 }, &mut es).unwrap();
        for _ in 0..1000 {
            handler.advance(0.1);
            handler.modify_throttle_command(0, 0.5);
        }
        assert!(handler.history[0].len() <= 14, "history len {}", handler.history[0].len());
    }

    #[test]
    fn nominal_is_pass_through() {
        let mut es = engines(3);
        let mut handler = EmergencyScenarioHandler::new(EmergencyScenario::Nominal, &mut es).unwrap();
        handler.advance(0.1);
        assert_eq!(handler.modify_throttle_command(2, 0.42), 0.42);
        assert!(es.iter().all(Engine::enabled));
    }

    #[test]
    fn malformed_params_rejected() {
        let mut es = engines(1);
        for bad in [
            EmergencyScenario::EngineStuck { throttle: 1.5 },
            EmergencyScenario::ResponseLag { delay: -0.1 },
            EmergencyScenario::ResponseLag { delay: f64::NAN },
        ] {
            assert!(matches!(
                EmergencyScenarioHandler::new(bad, &mut es),
                Err(ConfigError::InvalidScenario(_))
            ));
        }
    }

    #[test]
    fn catalog_lookup() {
        assert_eq!(scenario_names().count(), 7);
        assert_eq!(
            scenario_by_name("response lag: severe (1.0s)"),
            Some(EmergencyScenario::ResponseLag { delay: 1.0 })
        );
        assert_eq!(scenario_by_name("meteor strike"), None);
    }

    #[test]
    fn adjacently_tagged_json() {
        let s: EmergencyScenario =
            serde_json::from_str(r#"{"type":"engine_failure","params":{"count":2}}"#).unwrap();
        assert_eq!(s, EmergencyScenario::EngineFailure { count: 2 });
        let none: EmergencyScenario = serde_json::from_str(r#"{"type":"none"}"#).unwrap();
        assert_eq!(none, EmergencyScenario::Nominal);
        assert!(serde_json::from_str::<EmergencyScenario>(r#"{"type":"alien_abduction"}"#).is_err());
    }
}
