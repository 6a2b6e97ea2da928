//! A toy electrostatic particle-in-cell model.
//!
//! One step is:
//!
//! 1. push: `v += q/m * E * dt`, then `x += v * dt`, then the boundary;
//! 2. deposit charge with cloud-in-cell weights onto owned cells;
//! 3. a Jacobi update of the field on owned cells, reading the four
//!    edge neighbors;
//! 4. gather the field back onto every particle.
//!
//! The same kernels back the whole-grid run ([`ToyPhysics::step_global`])
//! and the distributed one ([`Physics::step`]), so the two agree up to
//! rounding.

use std::f64::consts::TAU;

use tessel_core::{CellGrid, CellIndex, RealBox};
use tessel_engine::{GlobalState, GridSettings, LocalState, Physics};
use tessel_exchange::{
    interpolate_to_grid, interpolate_to_particles, Disposition, ExchangeError, SharedDataManager,
};
use tessel_space::BoundaryType;

use crate::fixtures::seeded_particles;
use crate::{ToyCell, ToyParticle};

/// The toy model and its parameters.
#[derive(Clone, Debug)]
pub struct ToyPhysics {
    /// Grid size and cell dimensions.
    pub grid: GridSettings,
    /// Time step.
    pub dt: f64,
    /// Curl coupling in the field update.
    pub curl: f64,
    /// Charge coupling in the field update.
    pub coupling: f64,
    /// Number of particles placed by the initial state.
    pub particles: usize,
    /// Upper bound on each initial velocity component.
    pub max_speed: f64,
    /// Seed of the particle generator.
    pub seed: u64,
}

impl Default for ToyPhysics {
    fn default() -> Self {
        Self {
            grid: GridSettings {
                nx: 32,
                ny: 32,
                cell_width: 1.0,
                cell_height: 0.5,
            },
            dt: 0.05,
            curl: 0.5,
            coupling: 0.05,
            particles: 400,
            max_speed: 1.0,
            seed: 7,
        }
    }
}

// ── Kernels ─────────────────────────────────────────────────────

/// Accelerate and move one particle, remembering where it was.
pub fn push(p: &mut ToyParticle, dt: f64) {
    let qm = p.q / p.m;
    p.vx += qm * p.ex * dt;
    p.vy += qm * p.ey * dt;
    p.px = p.x;
    p.py = p.y;
    p.x += p.vx * dt;
    p.y += p.vy * dt;
}

/// The four cloud-in-cell stencil points of `p` with their weights.
fn stencil(p: &ToyParticle, cw: f64, ch: f64) -> [(i32, i32, f64); 4] {
    let (gx, gy) = (p.x / cw, p.y / ch);
    let (fi, fj) = (gx.floor(), gy.floor());
    let (i, j) = (fi as i32, fj as i32);
    let (fx, fy) = (gx - fi, gy - fj);
    [
        (i, j, (1.0 - fx) * (1.0 - fy)),
        (i + 1, j, fx * (1.0 - fy)),
        (i, j + 1, (1.0 - fx) * fy),
        (i + 1, j + 1, fx * fy),
    ]
}

/// Deposit the charge of `p` onto the owned cells of `grid`.
///
/// With `wrap`, stencil points are wrapped into the grid first; without
/// it, points outside the owned cells are dropped.
pub fn deposit(p: &ToyParticle, grid: &mut CellGrid<ToyCell>, wrap: bool) {
    let (cw, ch) = (grid.cell_width(), grid.cell_height());
    let (nx, ny) = (grid.nx(), grid.ny());
    let density = p.q / (cw * ch);
    for (mut x, mut y, w) in stencil(p, cw, ch) {
        if wrap {
            x = x.rem_euclid(nx);
            y = y.rem_euclid(ny);
        }
        if x < 0 || y < 0 || x >= nx || y >= ny {
            continue;
        }
        if let Some(cell) = grid.get_mut(x, y) {
            cell.rho += density * w;
        }
    }
}

/// Interpolate the field of `grid` onto `p`.
pub fn gather(p: &mut ToyParticle, grid: &CellGrid<ToyCell>) {
    let (cw, ch) = (grid.cell_width(), grid.cell_height());
    let (mut ex, mut ey) = (0.0, 0.0);
    for (x, y, w) in stencil(p, cw, ch) {
        if let Some(cell) = grid.get(x, y) {
            ex += w * cell.ex;
            ey += w * cell.ey;
        }
    }
    p.ex = ex;
    p.ey = ey;
}

/// Zero the charge density everywhere, margin included.
pub fn clear_charge(grid: &mut CellGrid<ToyCell>) {
    for (_, cell) in grid.iter_mut() {
        cell.rho = 0.0;
    }
}

/// One Jacobi update of the field on the owned cells.
///
/// Reads the margin but never writes it.
pub fn solve(grid: &mut CellGrid<ToyCell>, dt: f64, curl: f64, coupling: f64) {
    let at = |g: &CellGrid<ToyCell>, x: i32, y: i32| g.get(x, y).copied().unwrap_or_default();
    let owned = grid.owned_box();
    let next: Vec<(i32, i32, f64, f64)> = owned
        .cells()
        .map(|CellIndex { x, y }| {
            let here = at(grid, x, y);
            let dey = at(grid, x, y + 1).ey - at(grid, x, y - 1).ey;
            let dex = at(grid, x + 1, y).ex - at(grid, x - 1, y).ex;
            (
                x,
                y,
                here.ex + dt * (curl * dey - coupling * here.rho),
                here.ey + dt * (-curl * dex - coupling * here.rho),
            )
        })
        .collect();
    for (x, y, ex, ey) in next {
        if let Some(cell) = grid.get_mut(x, y) {
            cell.ex = ex;
            cell.ey = ey;
        }
    }
}

/// Overwrite every margin cell with its periodic image.
pub fn wrap_margin(grid: &mut CellGrid<ToyCell>) {
    let (nx, ny) = (grid.nx(), grid.ny());
    let owned = grid.owned_box();
    let margin: Vec<CellIndex> = grid
        .storage_box()
        .cells()
        .filter(|c| !owned.contains(c.x, c.y))
        .collect();
    for idx in margin {
        let image = grid.get(idx.x.rem_euclid(nx), idx.y.rem_euclid(ny)).copied();
        if let (Some(image), Some(cell)) = (image, grid.get_mut(idx.x, idx.y)) {
            *cell = image;
        }
    }
}

/// The initial field, defined on the margin too so hardwall margins
/// carry fixed boundary values.
pub fn initial_field(grid: &GridSettings, x: i32, y: i32) -> ToyCell {
    let (u, v) = (x as f64 / grid.nx as f64, y as f64 / grid.ny as f64);
    ToyCell {
        rho: 0.0,
        ex: 0.2 * (TAU * u).sin() * (TAU * v).cos(),
        ey: -0.1 * (TAU * v).sin() + 0.05 * (TAU * u).cos(),
    }
}

// ── Whole-grid run ──────────────────────────────────────────────

impl ToyPhysics {
    fn global_area(&self) -> RealBox {
        RealBox::new(
            0.0,
            self.grid.nx as f64 * self.grid.cell_width,
            0.0,
            self.grid.ny as f64 * self.grid.cell_height,
        )
    }

    /// Deposit, solve and gather on the whole grid.
    fn field_cycle(&self, state: &mut GlobalState<ToyCell, ToyParticle>, boundary: BoundaryType) {
        let periodic = boundary == BoundaryType::Periodic;
        clear_charge(&mut state.grid);
        for p in &state.particles {
            deposit(p, &mut state.grid, periodic);
        }
        solve(&mut state.grid, self.dt, self.curl, self.coupling);
        if periodic {
            wrap_margin(&mut state.grid);
        }
        for p in &mut state.particles {
            gather(p, &state.grid);
        }
    }

    /// Advance a whole-grid state by one step.
    pub fn step_global(
        &self,
        state: &mut GlobalState<ToyCell, ToyParticle>,
        boundary: BoundaryType,
    ) {
        let area = self.global_area();
        for p in &mut state.particles {
            push(p, self.dt);
            boundary.apply(p, &area);
        }
        self.field_cycle(state, boundary);
    }
}

impl Physics for ToyPhysics {
    type Cell = ToyCell;
    type Particle = ToyParticle;

    fn settings(&self) -> GridSettings {
        self.grid
    }

    fn initial_state(&mut self) -> GlobalState<ToyCell, ToyParticle> {
        let g = self.grid;
        let mut grid = CellGrid::new(g.nx, g.ny, g.cell_width, g.cell_height, ToyCell::default())
            .expect("toy grid settings are positive");
        for (idx, cell) in grid.iter_mut() {
            *cell = initial_field(&g, idx.x, idx.y);
        }
        GlobalState {
            grid,
            particles: seeded_particles(&g, self.particles, self.max_speed, self.seed),
        }
    }

    fn prepare(&mut self, state: &mut GlobalState<ToyCell, ToyParticle>, boundary: BoundaryType) {
        if boundary == BoundaryType::Periodic {
            wrap_margin(&mut state.grid);
        }
        self.field_cycle(state, boundary);
    }

    fn step(
        &mut self,
        state: &mut LocalState<ToyCell, ToyParticle>,
        exchange: &mut SharedDataManager<ToyCell, ToyParticle>,
    ) -> Result<(), ExchangeError> {
        let gates = exchange.particle_gates();
        state.particles.retain_mut(|p| {
            push(p, self.dt);
            gates.apply(p) == Disposition::Stay
        });

        clear_charge(&mut state.grid);
        interpolate_to_grid(exchange, &mut state.particles, &mut state.grid, |p, g| {
            deposit(p, g, false)
        })?;

        solve(&mut state.grid, self.dt, self.curl, self.coupling);

        let sim = exchange.sim_area();
        let zone = RealBox::new(
            0.0,
            sim.xmax - self.grid.cell_width,
            0.0,
            sim.ymax - self.grid.cell_height,
        );
        interpolate_to_particles(exchange, &mut state.particles, &mut state.grid, &zone, gather)
    }
}
