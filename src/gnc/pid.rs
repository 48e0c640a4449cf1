use super::config::{check_limits, PidConfig};
use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// PID Controller (vertical velocity -> desired acceleration)
// ---------------------------------------------------------------------------

/// Single-axis PID with optional output clamp and anti-windup.
///
/// When the output saturates and `ki != 0`, the integral increment from that
/// update is backed out. With output limits set, the integral magnitude is
/// also bounded by `(hi - lo) / (2 |ki|)`.
#[derive(Debug, Clone)]
pub struct Pid {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    pub setpoint: f64,
    output_limits: Option<(f64, f64)>,
    integral: f64,
    prev_error: f64,
}

impl Pid {
    pub fn new(kp: f64, ki: f64, kd: f64) -> Self {
        Self {
            kp,
            ki,
            kd,
            setpoint: 0.0,
            output_limits: None,
            integral: 0.0,
            prev_error: 0.0,
        }
    }

    pub fn with_setpoint(mut self, setpoint: f64) -> Self {
        self.setpoint = setpoint;
        self
    }

    pub fn with_output_limits(mut self, lo: f64, hi: f64) -> Self {
        self.output_limits = Some((lo, hi));
        self
    }

    pub fn from_config(cfg: &PidConfig) -> Result<Self, ConfigError> {
        if [cfg.kp, cfg.ki, cfg.kd, cfg.setpoint].iter().any(|v| !v.is_finite()) {
            return Err(ConfigError::invalid("pid gains", "kp, ki, kd and setpoint must be finite"));
        }
        let mut pid = Pid::new(cfg.kp, cfg.ki, cfg.kd).with_setpoint(cfg.setpoint);
        if let Some((lo, hi)) = cfg.output_limits {
            check_limits((lo, hi))?;
            pid = pid.with_output_limits(lo, hi);
        }
        Ok(pid)
    }

    pub fn integral(&self) -> f64 {
        self.integral
    }

    pub fn output_limits(&self) -> Option<(f64, f64)> {
        self.output_limits
    }

    pub fn update(&mut self, measurement: f64, dt: f64) -> f64 {
        let error = self.setpoint - measurement;
        let prev_integral = self.integral;

        self.integral += error * dt;
        if let Some((lo, hi)) = self.output_limits {
            if self.ki != 0.0 {
                let bound = (hi - lo) / (2.0 * self.ki.abs());
                self.integral = self.integral.clamp(-bound, bound);
            }
        }

        let derivative = if dt > 0.0 { (error - self.prev_error) / dt } else { 0.0 };
        self.prev_error = error;

        let raw = self.kp * error + self.ki * self.integral + self.kd * derivative;
        match self.output_limits {
            Some((lo, hi)) => {
                let out = raw.clamp(lo, hi);
                // Anti-windup: drop this update's integral growth while saturated
                if out != raw && self.ki != 0.0 {
                    self.integral = prev_integral;
                }
                out
            }
            None => raw,
        }
    }

    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.prev_error = 0.0;
    }
}

impl super::Controller for Pid {
    fn update(&mut self, vertical_velocity: f64, dt: f64, _altitude: f64) -> f64 {
        Pid::update(self, vertical_velocity, dt)
    }

    fn reset(&mut self) {
        Pid::reset(self);
    }

    fn name(&self) -> &str {
        "PID"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pid_proportional() {
        let mut pid = Pid::new(2.0, 0.0, 0.0).with_setpoint(-2.0);
        let out = pid.update(-5.0, 0.1);
        assert!((out - 6.0).abs() < 1e-12, "P-only: 2 * (-2 - -5) = 6");
    }

    #[test]
    fn pid_derivative_on_error_change() {
        let mut pid = Pid::new(0.0, 0.0, 1.0);
        pid.update(0.0, 0.1);
        let out = pid.update(-1.0, 0.1);
        assert!((out - 10.0).abs() < 1e-9, "D term: (1 - 0) / 0.1 = 10, got {out}");
    }

    #[test]
    fn pid_integral_accumulates_without_limits() {
        let mut pid = Pid::new(0.0, 1.0, 0.0).with_setpoint(1.0);
        for _ in 0..10 {
            pid.update(0.0, 0.1);
        }
        assert!((pid.integral() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn pid_integral_bounded_by_limit_span() {
        let mut pid = Pid::new(0.0, 2.0, 0.0).with_setpoint(1.0).with_output_limits(-3.0, 5.0);
        for _ in 0..1000 {
            pid.update(0.0, 0.1);
        }
        assert!(pid.integral() <= 8.0 / 4.0 + 1e-12, "integral {}", pid.integral());
    }

    #[test]
    fn pid_anti_windup_under_sustained_saturation() {
        let mut pid = Pid::new(10.0, 1.0, 0.0).with_output_limits(-1.0, 1.0);
        for _ in 0..500 {
            let out = pid.update(-50.0, 0.1);
            assert_eq!(out, 1.0);
        }
        assert_eq!(pid.integral(), 0.0, "saturated updates must not wind up");

        // once the error vanishes the output does not stay pinned
        let out = pid.update(0.0, 0.1);
        assert!(out.abs() < 1.0, "output {out} should leave saturation");
    }

    #[test]
    fn pid_reset() {
        let mut pid = Pid::new(1.0, 1.0, 1.0);
        pid.update(5.0, 0.1);
        pid.reset();
        assert_eq!(pid.integral(), 0.0);
        let out = pid.update(0.0, 0.1);
        assert_eq!(out, 0.0);
    }

    #[test]
    fn pid_from_config_rejects_inverted_limits() {
        let cfg = PidConfig { output_limits: Some((1.0, -1.0)), ..PidConfig::default() };
        assert!(Pid::from_config(&cfg).is_err());
    }
}
