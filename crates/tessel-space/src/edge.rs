//! Global boundary conditions.

use std::fmt;

use tessel_core::{Direction, Particle, RealBox};

use crate::region::BoundaryRegion;

/// What happens at the edge of the global simulation area.
///
/// This controls both the topology (whether partitions on opposite
/// edges are neighbors) and the treatment of particles that cross an
/// edge with no neighbor behind it.
///
/// # Examples
///
/// ```
/// use tessel_core::{Direction, Particle, RealBox};
/// use tessel_space::BoundaryType;
///
/// #[derive(Clone)]
/// struct P { x: f64, vx: f64 }
///
/// impl Particle for P {
///     fn position(&self) -> (f64, f64) { (self.x, 0.5) }
///     fn translate(&mut self, dx: f64, _dy: f64) { self.x += dx; }
///     fn velocity(&self) -> (f64, f64) { (self.vx, 0.0) }
///     fn set_velocity(&mut self, vx: f64, _vy: f64) { self.vx = vx; }
/// }
///
/// let area = RealBox::new(0.0, 10.0, 0.0, 1.0);
///
/// // Periodic: a particle leaving through x = 10 re-enters at x = 0.
/// let mut p = P { x: 10.5, vx: 1.0 };
/// BoundaryType::Periodic.apply_wall(&mut p, Direction::MAX_CENTER, &area);
/// assert_eq!(p.x, 0.5);
///
/// // Hardwall: the velocity is reflected, the position is untouched.
/// let mut p = P { x: 10.5, vx: 1.0 };
/// BoundaryType::Hardwall.apply_wall(&mut p, Direction::MAX_CENTER, &area);
/// assert_eq!((p.x, p.vx), (10.5, -1.0));
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BoundaryType {
    /// The simulation wraps around: opposite edges are adjacent.
    #[default]
    Periodic,
    /// The simulation is enclosed by reflecting walls.
    Hardwall,
}

impl BoundaryType {
    /// Apply the physical boundary to a particle that crossed the edge of
    /// `area` on the side given by `sign`.
    ///
    /// Periodic translates the particle by one area size against `sign`.
    /// Hardwall points each crossed velocity component back inside.
    pub fn apply_wall<P: Particle>(self, particle: &mut P, sign: Direction, area: &RealBox) {
        match self {
            Self::Periodic => particle.translate(
                -(sign.dx as f64) * area.xsize(),
                -(sign.dy as f64) * area.ysize(),
            ),
            Self::Hardwall => {
                let (mut vx, mut vy) = particle.velocity();
                match sign.dx {
                    -1 => vx = vx.abs(),
                    1 => vx = -vx.abs(),
                    _ => {}
                }
                match sign.dy {
                    -1 => vy = vy.abs(),
                    1 => vy = -vy.abs(),
                    _ => {}
                }
                particle.set_velocity(vx, vy);
            }
        }
    }

    /// Classify the particle against `area` and apply the wall if it lies
    /// outside. Particles inside `area` are left untouched.
    pub fn apply<P: Particle>(self, particle: &mut P, area: &RealBox) {
        let (x, y) = particle.position();
        let region = BoundaryRegion::classify(area, x, y);
        if region != BoundaryRegion::CENTER {
            self.apply_wall(particle, region.sign(), area);
        }
    }
}

impl fmt::Display for BoundaryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Periodic => write!(f, "periodic"),
            Self::Hardwall => write!(f, "hardwall"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Dot {
        x: f64,
        y: f64,
        px: f64,
        py: f64,
        vx: f64,
        vy: f64,
    }

    impl Particle for Dot {
        fn position(&self) -> (f64, f64) {
            (self.x, self.y)
        }
        fn translate(&mut self, dx: f64, dy: f64) {
            self.x += dx;
            self.y += dy;
            self.px += dx;
            self.py += dy;
        }
        fn velocity(&self) -> (f64, f64) {
            (self.vx, self.vy)
        }
        fn set_velocity(&mut self, vx: f64, vy: f64) {
            self.vx = vx;
            self.vy = vy;
        }
    }

    fn dot(x: f64, y: f64, vx: f64, vy: f64) -> Dot {
        Dot {
            x,
            y,
            px: x - vx,
            py: y - vy,
            vx,
            vy,
        }
    }

    const AREA: RealBox = RealBox::new(0.0, 8.0, 0.0, 4.0);

    #[test]
    fn periodic_corner_moves_both_axes_and_previous_position() {
        let mut p = dot(-0.25, 4.5, -0.5, 0.5);
        BoundaryType::Periodic.apply(&mut p, &AREA);
        assert_eq!((p.x, p.y), (7.75, 0.5));
        assert_eq!((p.px, p.py), (8.25, 0.0));
        assert_eq!((p.vx, p.vy), (-0.5, 0.5));
    }

    #[test]
    fn hardwall_reflects_only_crossed_axis() {
        let mut p = dot(-0.25, 2.0, -0.5, 0.3);
        BoundaryType::Hardwall.apply(&mut p, &AREA);
        assert_eq!((p.vx, p.vy), (0.5, 0.3));
        assert_eq!(p.x, -0.25);
    }

    #[test]
    fn hardwall_keeps_already_inward_velocity() {
        let mut p = dot(8.1, 4.2, -0.5, -0.3);
        BoundaryType::Hardwall.apply(&mut p, &AREA);
        assert_eq!((p.vx, p.vy), (-0.5, -0.3));
    }

    #[test]
    fn inside_particle_is_untouched() {
        let mut p = dot(1.0, 1.0, 0.5, 0.5);
        let before = p.clone();
        BoundaryType::Hardwall.apply(&mut p, &AREA);
        BoundaryType::Periodic.apply(&mut p, &AREA);
        assert_eq!(p, before);
    }
}
