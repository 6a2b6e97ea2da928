//! In-process transport on crossbeam channels.
//!
//! A [`LocalCluster`] is a group of a fixed size that threads join one
//! at a time. Every `(destination, port)` pair maps to one unbounded
//! channel, created by whichever side touches it first, so frames sent
//! before the receiver registers its handler are queued, not lost.
//!
//! Any member may [`abort`](LocalCluster::abort) the group. Every
//! attached handler then receives [`TransportError::Aborted`] once and
//! its delivery thread exits, and pending or later joins fail.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{select, unbounded, Receiver, Sender};
use tessel_core::{CountingBarrier, WorkerId};

use crate::error::TransportError;
use crate::transport::{
    FrameHandler, Membership, PortKind, ReceivePort, Rendezvous, SendPort, Transport,
};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Mailbox {
    tx: Sender<Vec<u8>>,
    rx: Receiver<Vec<u8>>,
    attached: bool,
}

impl Mailbox {
    fn new() -> Self {
        let (tx, rx) = unbounded();
        Self {
            tx,
            rx,
            attached: false,
        }
    }
}

struct Hub {
    members: usize,
    joined: Mutex<usize>,
    assembled: CountingBarrier,
    mailboxes: Mutex<HashMap<(WorkerId, PortKind), Mailbox>>,
    // Dropped on abort; the disconnect wakes every delivery thread.
    abort_tx: Mutex<Option<Sender<()>>>,
    abort_rx: Receiver<()>,
}

impl Hub {
    fn is_aborted(&self) -> bool {
        lock(&self.abort_tx).is_none()
    }
}

// ── LocalCluster ────────────────────────────────────────────────

/// An in-process group of `members` workers.
///
/// Cloning yields another handle to the same group; each thread that
/// plays a worker calls [`join`](LocalCluster::join) once.
#[derive(Clone)]
pub struct LocalCluster {
    hub: Arc<Hub>,
}

impl LocalCluster {
    /// Create an empty group expecting `members` workers.
    pub fn new(members: usize) -> Self {
        let (abort_tx, abort_rx) = crossbeam_channel::bounded(0);
        Self {
            hub: Arc::new(Hub {
                members,
                joined: Mutex::new(0),
                assembled: CountingBarrier::new(members),
                mailboxes: Mutex::new(HashMap::new()),
                abort_tx: Mutex::new(Some(abort_tx)),
                abort_rx,
            }),
        }
    }

    /// Expected group size.
    pub fn members(&self) -> usize {
        self.hub.members
    }

    /// Join the group and block until every member has joined.
    ///
    /// IDs are handed out in join order starting at 0; the leader is
    /// worker 0. Fails with [`TransportError::Aborted`] if the group is
    /// aborted before or while waiting.
    pub fn join(&self) -> Result<Membership, TransportError> {
        if self.hub.is_aborted() {
            return Err(TransportError::Aborted);
        }
        let worker = {
            let mut joined = lock(&self.hub.joined);
            if *joined >= self.hub.members {
                return Err(TransportError::GroupFull {
                    members: self.hub.members,
                });
            }
            let id = WorkerId(*joined as u32);
            *joined += 1;
            id
        };
        self.hub.assembled.increment();
        self.hub.assembled.wait();
        if self.hub.is_aborted() {
            return Err(TransportError::Aborted);
        }
        log::debug!("worker {worker} joined a group of {}", self.hub.members);
        Ok(Membership {
            worker,
            leader: WorkerId(0),
            transport: Arc::new(LocalTransport {
                hub: Arc::clone(&self.hub),
                worker,
            }),
        })
    }

    /// Drop every queued frame and channel of the group.
    ///
    /// Delivery threads still attached see their channel disconnect and
    /// exit. Call once every member has closed its ports.
    pub fn terminate(&self) {
        let dropped = {
            let mut boxes = lock(&self.hub.mailboxes);
            let n = boxes.len();
            boxes.clear();
            n
        };
        log::debug!("terminated group, {dropped} channels dropped");
    }

    /// Abort the group after a member failed.
    ///
    /// Idempotent. Attached handlers receive [`TransportError::Aborted`],
    /// members blocked in [`join`](LocalCluster::join) are released with
    /// the same error.
    pub fn abort(&self) {
        if lock(&self.hub.abort_tx).take().is_none() {
            return;
        }
        for _ in 0..self.hub.assembled.target() {
            self.hub.assembled.increment();
        }
        log::warn!("group of {} aborted", self.hub.members);
    }
}

impl Rendezvous for LocalCluster {
    fn join(&self) -> Result<Membership, TransportError> {
        LocalCluster::join(self)
    }

    fn terminate(&self) {
        LocalCluster::terminate(self)
    }

    fn abort(&self) {
        LocalCluster::abort(self)
    }
}

// ── LocalTransport ──────────────────────────────────────────────

struct LocalTransport {
    hub: Arc<Hub>,
    worker: WorkerId,
}

impl LocalTransport {
    fn check_peer(&self, peer: WorkerId) -> Result<(), TransportError> {
        if peer.index() < self.hub.members {
            Ok(())
        } else {
            Err(TransportError::UnknownPeer {
                peer,
                members: self.hub.members,
            })
        }
    }
}

impl Transport for LocalTransport {
    fn worker(&self) -> WorkerId {
        self.worker
    }

    fn members(&self) -> usize {
        self.hub.members
    }

    fn leader(&self) -> WorkerId {
        WorkerId(0)
    }

    fn receive(
        &self,
        port: PortKind,
        mut handler: FrameHandler,
    ) -> Result<Box<dyn ReceivePort>, TransportError> {
        if let PortKind::Exchange { from } = port {
            self.check_peer(from)?;
        }
        let frames = {
            let mut boxes = lock(&self.hub.mailboxes);
            let mailbox = boxes
                .entry((self.worker, port))
                .or_insert_with(Mailbox::new);
            if mailbox.attached {
                return Err(TransportError::AlreadyReceiving { port });
            }
            mailbox.attached = true;
            mailbox.rx.clone()
        };

        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(0);
        let aborted = self.hub.abort_rx.clone();
        let thread = thread::Builder::new()
            .name(format!("tessel-recv-{}-{port}", self.worker))
            .spawn(move || loop {
                select! {
                    recv(frames) -> frame => match frame {
                        Ok(frame) => handler(Ok(frame)),
                        Err(_) => break,
                    },
                    recv(shutdown_rx) -> _ => {
                        while let Ok(frame) = frames.try_recv() {
                            handler(Ok(frame));
                        }
                        break;
                    }
                    recv(aborted) -> _ => {
                        handler(Err(TransportError::Aborted));
                        break;
                    }
                }
            })
            .map_err(|e| TransportError::ThreadSpawnFailed {
                reason: e.to_string(),
            })?;

        Ok(Box::new(LocalReceivePort {
            shutdown: Some(shutdown_tx),
            thread: Some(thread),
        }))
    }

    fn connect(&self, to: WorkerId, port: PortKind) -> Result<Box<dyn SendPort>, TransportError> {
        self.check_peer(to)?;
        let tx = lock(&self.hub.mailboxes)
            .entry((to, port))
            .or_insert_with(Mailbox::new)
            .tx
            .clone();
        Ok(Box::new(LocalSendPort {
            tx: Some(tx),
            to,
            port,
        }))
    }
}

// ── Ports ───────────────────────────────────────────────────────

struct LocalSendPort {
    tx: Option<Sender<Vec<u8>>>,
    to: WorkerId,
    port: PortKind,
}

impl SendPort for LocalSendPort {
    fn send(&self, frame: Vec<u8>) -> Result<(), TransportError> {
        let closed = || TransportError::Closed {
            peer: self.to,
            port: self.port,
        };
        self.tx
            .as_ref()
            .ok_or_else(closed)?
            .send(frame)
            .map_err(|_| closed())
    }

    fn close(&mut self) {
        self.tx.take();
    }
}

struct LocalReceivePort {
    shutdown: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl ReceivePort for LocalReceivePort {
    fn close(&mut self) {
        // Disconnecting the shutdown channel wakes the select.
        self.shutdown.take();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("delivery thread panicked");
            }
        }
    }
}

impl Drop for LocalReceivePort {
    fn drop(&mut self) {
        self.close();
    }
}
