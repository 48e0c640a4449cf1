use nalgebra::Vector3;

// ---------------------------------------------------------------------------
// Engine: fixed mount, fixed direction, throttleable
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Engine {
    pub max_thrust: f64,                // N
    pub position: Vector3<f64>,         // m, mount relative to CoM (body frame)
    direction: Vector3<f64>,            // unit thrust direction (body frame)
    pub specific_impulse: Option<f64>,  // s
    pub engine_type: Option<String>,
    enabled: bool,
    throttle: f64,                      // 0..1
}

impl Engine {
    /// Direction is normalized; a zero direction defaults to body +Y.
    pub fn new(max_thrust: f64, position: Vector3<f64>, direction: Vector3<f64>) -> Self {
        let norm = direction.norm();
        let direction = if norm > 0.0 { direction / norm } else { Vector3::y() };
        Self {
            max_thrust: max_thrust.max(0.0),
            position,
            direction,
            specific_impulse: None,
            engine_type: None,
            enabled: true,
            throttle: 0.0,
        }
    }

    pub fn with_specific_impulse(mut self, isp: f64) -> Self {
        self.specific_impulse = Some(isp);
        self
    }

    pub fn with_engine_type(mut self, tag: impl Into<String>) -> Self {
        self.engine_type = Some(tag.into());
        self
    }

    pub fn direction(&self) -> &Vector3<f64> {
        &self.direction
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Disabling an engine also cuts its throttle.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.throttle = 0.0;
        }
    }

    pub fn throttle(&self) -> f64 {
        self.throttle
    }

    /// Clamped to [0, 1]; NaN reads as 0.
    pub fn set_throttle(&mut self, throttle: f64) {
        self.throttle = if throttle.is_nan() { 0.0 } else { throttle.clamp(0.0, 1.0) };
    }

    /// Throttle that would produce `thrust` newtons, or 0 for a zero-capacity engine.
    pub fn throttle_for(&self, thrust: f64) -> f64 {
        if self.max_thrust > 0.0 {
            thrust / self.max_thrust
        } else {
            0.0
        }
    }

    pub fn current_thrust(&self) -> f64 {
        if self.enabled {
            self.max_thrust * self.throttle
        } else {
            0.0
        }
    }

    /// Capacity available to the allocator: max thrust if enabled, else 0.
    pub fn available_thrust(&self) -> f64 {
        if self.enabled {
            self.max_thrust
        } else {
            0.0
        }
    }

    /// Moment arm column for the allocator: r x d.
    pub fn moment_arm(&self) -> Vector3<f64> {
        self.position.cross(&self.direction)
    }
}
