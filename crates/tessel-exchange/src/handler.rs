//! Per-message-kind handlers and the frame dispatcher.
//!
//! A receiving endpoint implements the capabilities for the message
//! kinds it accepts; [`dispatch`] decodes a frame and routes it by tag.

use tessel_core::CellIndex;
use tessel_wire::{decode_frame, PeerMessage, Wire};

use crate::error::ExchangeError;

/// Accepts a neighbor's border-cell index map.
pub trait IndexMapHandler {
    /// Bind the local ghost slots named by `indexes`, in order.
    fn on_index_map(&self, indexes: Vec<CellIndex>) -> Result<(), ExchangeError>;
}

/// Accepts a batch of a neighbor's border-cell values.
pub trait CellBatchHandler<C> {
    /// Buffer `cells` for the bound ghost slots, in the same order.
    fn on_cells(&self, cells: Vec<C>) -> Result<(), ExchangeError>;
}

/// Accepts a neighbor's particle batches.
pub trait ParticleBatchHandler<P> {
    /// Particles that crossed into this worker's partition.
    fn on_arriving(&self, particles: Vec<P>) -> Result<(), ExchangeError>;

    /// Copies of the neighbor's particles within interpolation range.
    fn on_ghosts(&self, particles: Vec<P>) -> Result<(), ExchangeError>;
}

/// Decode one frame and hand its payload to the matching capability.
pub fn dispatch<C, P, H>(frame: &[u8], handler: &H) -> Result<(), ExchangeError>
where
    C: Wire,
    P: Wire,
    H: IndexMapHandler + CellBatchHandler<C> + ParticleBatchHandler<P>,
{
    match decode_frame::<PeerMessage<C, P>>(frame)? {
        PeerMessage::IndexMap(indexes) => handler.on_index_map(indexes),
        PeerMessage::Cells(cells) => handler.on_cells(cells),
        PeerMessage::Leaving(particles) => handler.on_arriving(particles),
        PeerMessage::Border(particles) => handler.on_ghosts(particles),
    }
}
