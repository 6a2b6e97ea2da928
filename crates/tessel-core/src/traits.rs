//! Traits the physics collaborator implements for its payload types.
//!
//! The decomposition layer never looks inside a cell and only touches a
//! particle's position and velocity. Everything else (fields, charge,
//! mass, interpolation state) stays opaque.

/// A grid cell value.
///
/// Cells are deep-copyable value objects. Ghost cells are refreshed with
/// [`copy_from`](Cell::copy_from), never replaced, so a reader holding a
/// reference into the grid always sees a complete cell.
pub trait Cell: Clone + Send + 'static {
    /// Overwrite every value of `self` with the values of `other`.
    fn copy_from(&mut self, other: &Self) {
        self.clone_from(other);
    }
}

/// A simulated particle.
pub trait Particle: Clone + Send + 'static {
    /// Current position in the owning partition's frame.
    fn position(&self) -> (f64, f64);

    /// Shift the particle by `(dx, dy)`.
    ///
    /// Every stored position (current and previous, if the integrator
    /// keeps one) moves together, so that a frame change is invisible to
    /// the integrator.
    fn translate(&mut self, dx: f64, dy: f64);

    /// Current velocity.
    fn velocity(&self) -> (f64, f64);

    /// Replace the velocity.
    fn set_velocity(&mut self, vx: f64, vy: f64);
}
