//! Tagged messages exchanged between workers and with the leader.

use std::io::{Read, Write};

use tessel_core::{CellIndex, IntBox, WorkerId};

use crate::codec::{read_u8, write_u8, Wire};
use crate::error::WireError;

/// Tag of [`PeerMessage::IndexMap`].
pub const TAG_INDEX_MAP: u8 = 1;
/// Tag of [`PeerMessage::Cells`].
pub const TAG_CELLS: u8 = 2;
/// Tag of [`PeerMessage::Leaving`].
pub const TAG_LEAVING: u8 = 3;
/// Tag of [`PeerMessage::Border`].
pub const TAG_BORDER: u8 = 4;

// ── PeerMessage ─────────────────────────────────────────────────

/// A message on the channel from one worker to a neighbor.
#[derive(Clone, Debug, PartialEq)]
pub enum PeerMessage<C, P> {
    /// Sent once at setup: for every border cell the sender will export,
    /// in export order, the index in the receiver's frame where it lands.
    IndexMap(Vec<CellIndex>),
    /// Current values of the sender's border cells, in index-map order.
    Cells(Vec<C>),
    /// Particles that crossed into the receiver's partition, already
    /// translated into the receiver's frame.
    Leaving(Vec<P>),
    /// Copies of the sender's particles within interpolation range of
    /// the receiver, translated into the receiver's frame.
    Border(Vec<P>),
}

impl<C, P> PeerMessage<C, P> {
    /// The variant's tag byte.
    pub fn tag(&self) -> u8 {
        match self {
            Self::IndexMap(_) => TAG_INDEX_MAP,
            Self::Cells(_) => TAG_CELLS,
            Self::Leaving(_) => TAG_LEAVING,
            Self::Border(_) => TAG_BORDER,
        }
    }
}

impl<C: Wire, P: Wire> Wire for PeerMessage<C, P> {
    fn encode(&self, w: &mut dyn Write) -> Result<(), WireError> {
        write_u8(w, self.tag())?;
        match self {
            Self::IndexMap(indexes) => indexes.encode(w),
            Self::Cells(cells) => cells.encode(w),
            Self::Leaving(particles) | Self::Border(particles) => particles.encode(w),
        }
    }

    fn decode(r: &mut dyn Read) -> Result<Self, WireError> {
        match read_u8(r)? {
            TAG_INDEX_MAP => Ok(Self::IndexMap(Vec::decode(r)?)),
            TAG_CELLS => Ok(Self::Cells(Vec::decode(r)?)),
            TAG_LEAVING => Ok(Self::Leaving(Vec::decode(r)?)),
            TAG_BORDER => Ok(Self::Border(Vec::decode(r)?)),
            tag => Err(WireError::UnknownTag { tag }),
        }
    }
}

// ── Problem ─────────────────────────────────────────────────────

/// One worker's slice of the initial problem, sent by the leader.
///
/// Particles and cells are already in the receiving worker's local
/// frame. `cells` covers the worker's partition grown by the ghost
/// margin, in x-major order.
#[derive(Clone, Debug, PartialEq)]
pub struct Problem<C, P> {
    /// The full partition table, indexed by worker.
    pub partitions: Vec<IntBox>,
    /// Particles owned by the worker.
    pub particles: Vec<P>,
    /// The worker's cell block, margin included.
    pub cells: Vec<C>,
}

impl<C: Wire, P: Wire> Wire for Problem<C, P> {
    fn encode(&self, w: &mut dyn Write) -> Result<(), WireError> {
        self.partitions.encode(w)?;
        self.particles.encode(w)?;
        self.cells.encode(w)
    }

    fn decode(r: &mut dyn Read) -> Result<Self, WireError> {
        Ok(Self {
            partitions: Vec::decode(r)?,
            particles: Vec::decode(r)?,
            cells: Vec::decode(r)?,
        })
    }
}

// ── Results ─────────────────────────────────────────────────────

/// One worker's final state, sent back to the leader.
///
/// Replies can arrive in any order, so each carries its sender. The
/// cell block covers the partition plus the margin on every side where
/// the partition touches the global edge.
#[derive(Clone, Debug, PartialEq)]
pub struct Results<C, P> {
    /// The sending worker.
    pub worker: WorkerId,
    /// Particles owned by the worker, in its local frame.
    pub particles: Vec<P>,
    /// The worker's final cell block, x-major.
    pub cells: Vec<C>,
}

impl<C: Wire, P: Wire> Wire for Results<C, P> {
    fn encode(&self, w: &mut dyn Write) -> Result<(), WireError> {
        self.worker.encode(w)?;
        self.particles.encode(w)?;
        self.cells.encode(w)
    }

    fn decode(r: &mut dyn Read) -> Result<Self, WireError> {
        Ok(Self {
            worker: WorkerId::decode(r)?,
            particles: Vec::decode(r)?,
            cells: Vec::decode(r)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{decode_frame, encode_frame, read_f64_le, write_f64_le};
    use proptest::prelude::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Charge(f64);

    impl Wire for Charge {
        fn encode(&self, w: &mut dyn Write) -> Result<(), WireError> {
            write_f64_le(w, self.0)
        }
        fn decode(r: &mut dyn Read) -> Result<Self, WireError> {
            Ok(Charge(read_f64_le(r)?))
        }
    }

    type Msg = PeerMessage<Charge, Charge>;

    #[test]
    fn peer_message_keeps_variant() {
        let msgs: Vec<Msg> = vec![
            PeerMessage::IndexMap(vec![CellIndex::new(16, -1)]),
            PeerMessage::Cells(vec![Charge(1.5), Charge(-2.0)]),
            PeerMessage::Leaving(vec![]),
            PeerMessage::Border(vec![Charge(0.25)]),
        ];
        for m in msgs {
            let frame = encode_frame(&m).unwrap();
            assert_eq!(frame[0], m.tag());
            assert_eq!(decode_frame::<Msg>(&frame).unwrap(), m);
        }
    }

    #[test]
    fn unknown_tag_is_reported() {
        let err = decode_frame::<Msg>(&[9, 0, 0, 0, 0]).unwrap_err();
        assert!(matches!(err, WireError::UnknownTag { tag: 9 }));
    }

    #[test]
    fn results_carry_sender() {
        let r = Results {
            worker: WorkerId(5),
            particles: vec![Charge(3.0)],
            cells: vec![Charge(1.0); 4],
        };
        let back: Results<Charge, Charge> = decode_frame(&encode_frame(&r).unwrap()).unwrap();
        assert_eq!(back, r);
    }

    proptest! {
        #[test]
        fn problem_survives_any_payload(
            xs in proptest::collection::vec(-1e6f64..1e6, 0..40),
            n in 1usize..6,
        ) {
            let p = Problem {
                partitions: (0..n as i32).map(|i| IntBox::new(i, i, 0, 3)).collect(),
                particles: xs.iter().copied().map(Charge).collect(),
                cells: xs.iter().rev().copied().map(Charge).collect(),
            };
            let back: Problem<Charge, Charge> = decode_frame(&encode_frame(&p).unwrap()).unwrap();
            prop_assert_eq!(back, p);
        }
    }
}
