//! Reference physics and fixtures for Tessel development.
//!
//! Provides a toy electrostatic particle-in-cell model ([`ToyPhysics`])
//! that runs both on a whole grid and distributed through a
//! [`Node`](tessel_engine::Node), plus seeded fixtures and runners for
//! comparing the two.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::io::{Read, Write};

use tessel_core::{Cell, Particle};
use tessel_wire::codec::{read_f64_le, read_u32_le, write_f64_le, write_u32_le};
use tessel_wire::{Wire, WireError};

pub mod fixtures;
pub mod physics;

pub use fixtures::{assert_states_close, run_distributed, run_monolithic, DistributedRun};
pub use physics::ToyPhysics;

/// A grid cell of the toy model: charge density and a 2D field.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ToyCell {
    pub rho: f64,
    pub ex: f64,
    pub ey: f64,
}

impl Cell for ToyCell {}

impl Wire for ToyCell {
    fn encode(&self, w: &mut dyn Write) -> Result<(), WireError> {
        write_f64_le(w, self.rho)?;
        write_f64_le(w, self.ex)?;
        write_f64_le(w, self.ey)
    }

    fn decode(r: &mut dyn Read) -> Result<Self, WireError> {
        Ok(Self {
            rho: read_f64_le(r)?,
            ex: read_f64_le(r)?,
            ey: read_f64_le(r)?,
        })
    }
}

/// A charged particle of the toy model.
///
/// `(px, py)` is the position before the last push. `(ex, ey)` is the
/// field last gathered at the particle.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ToyParticle {
    pub id: u32,
    pub x: f64,
    pub y: f64,
    pub px: f64,
    pub py: f64,
    pub vx: f64,
    pub vy: f64,
    pub q: f64,
    pub m: f64,
    pub ex: f64,
    pub ey: f64,
}

impl Particle for ToyParticle {
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

impl Wire for ToyParticle {
    fn encode(&self, w: &mut dyn Write) -> Result<(), WireError> {
        write_u32_le(w, self.id)?;
        for v in [
            self.x, self.y, self.px, self.py, self.vx, self.vy, self.q, self.m, self.ex, self.ey,
        ] {
            write_f64_le(w, v)?;
        }
        Ok(())
    }

    fn decode(r: &mut dyn Read) -> Result<Self, WireError> {
        Ok(Self {
            id: read_u32_le(r)?,
            x: read_f64_le(r)?,
            y: read_f64_le(r)?,
            px: read_f64_le(r)?,
            py: read_f64_le(r)?,
            vx: read_f64_le(r)?,
            vy: read_f64_le(r)?,
            q: read_f64_le(r)?,
            m: read_f64_le(r)?,
            ex: read_f64_le(r)?,
            ey: read_f64_le(r)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessel_wire::{decode_frame, encode_frame};

    #[test]
    fn translate_moves_both_positions() {
        let mut p = ToyParticle {
            x: 1.0,
            y: 2.0,
            px: 0.5,
            py: 1.5,
            ..ToyParticle::default()
        };
        p.translate(10.0, -1.0);
        assert_eq!((p.x, p.y, p.px, p.py), (11.0, 1.0, 10.5, 0.5));
    }

    #[test]
    fn particle_survives_a_frame() {
        let p = ToyParticle {
            id: 42,
            x: 0.25,
            vy: -3.5,
            q: -1.0,
            m: 2.0,
            ..ToyParticle::default()
        };
        let back: ToyParticle = decode_frame(&encode_frame(&p).unwrap()).unwrap();
        assert_eq!(back, p);
    }
}
