//! Loopback — in-process [`MessageChannel`] for simulation and tests.
//!
//! Datagrams are queued straight into the receiver's inbox. Sends to an
//! endpoint that is missing, closed or behind a downed link are dropped
//! silently, like UDP. Handles built with [`LoopbackChannel::recording`] also
//! keep every send so tests can inspect traffic.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tracing::trace;

use super::channel::{ChannelError, Endpoint, MessageChannel};
use crate::nbt::DroneId;

/// One datagram as it left the sender.
#[derive(Debug, Clone, PartialEq)]
pub struct SentRecord {
    pub from: DroneId,
    /// `None` for broadcasts.
    pub to: Option<DroneId>,
    pub payload: Bytes,
}

#[derive(Default)]
struct Slot {
    endpoint: Option<Endpoint>,
    inbox: Vec<Bytes>,
    closed: bool,
    close_calls: usize,
}

#[derive(Default)]
struct Inner {
    slots: HashMap<DroneId, Slot>,
    /// `None` unless recording was requested.
    sent: Option<Vec<SentRecord>>,
    down: HashSet<(DroneId, DroneId)>,
    broadcast_hops: usize,
}

impl Inner {
    fn sender_ready(&self, from: DroneId) -> Result<(), ChannelError> {
        match self.slots.get(&from) {
            Some(slot) if slot.closed => Err(ChannelError::Closed(from)),
            Some(slot) if slot.endpoint.is_some() => Ok(()),
            _ => Err(ChannelError::NotOpen(from)),
        }
    }

    fn record(&mut self, from: DroneId, to: Option<DroneId>, payload: &Bytes) {
        if let Some(sent) = self.sent.as_mut() {
            sent.push(SentRecord { from, to, payload: payload.clone() });
        }
    }

    fn enqueue(&mut self, from: DroneId, to: DroneId, payload: Bytes) {
        if self.down.contains(&(from, to)) {
            trace!(%from, %to, "link down, datagram dropped");
            return;
        }
        match self.slots.get_mut(&to) {
            Some(slot) if slot.endpoint.is_some() && !slot.closed => slot.inbox.push(payload),
            _ => trace!(%from, %to, "no listener, datagram dropped"),
        }
    }
}

/// Cheaply cloneable handle; clones share the same medium.
#[derive(Clone)]
pub struct LoopbackChannel {
    inner: Arc<Mutex<Inner>>,
}

impl LoopbackChannel {
    /// Broadcasts reach vehicles at most one index away. Nothing is recorded.
    pub fn new() -> Self {
        Self::with_broadcast_hops(1)
    }

    /// Like [`LoopbackChannel::new`], but every send is kept for [`LoopbackChannel::sent`].
    pub fn recording() -> Self {
        let ch = Self::new();
        ch.inner.lock().sent = Some(Vec::new());
        ch
    }

    pub fn with_broadcast_hops(hops: usize) -> Self {
        let inner = Inner { broadcast_hops: hops, ..Default::default() };
        Self { inner: Arc::new(Mutex::new(inner)) }
    }

    /// Drop every datagram from `from` to `to` until [`LoopbackChannel::restore_link`].
    pub fn cut_link(&self, from: DroneId, to: DroneId) {
        self.inner.lock().down.insert((from, to));
    }

    pub fn restore_link(&self, from: DroneId, to: DroneId) {
        self.inner.lock().down.remove(&(from, to));
    }

    /// Place a raw datagram in `to`'s inbox, bypassing any sender.
    pub fn inject(&self, to: DroneId, payload: Bytes) {
        if let Some(slot) = self.inner.lock().slots.get_mut(&to) {
            slot.inbox.push(payload);
        }
    }

    /// Every datagram sent so far, in send order. Always empty unless the
    /// handle was built with [`LoopbackChannel::recording`].
    pub fn sent(&self) -> Vec<SentRecord> {
        self.inner.lock().sent.clone().unwrap_or_default()
    }

    pub fn clear_sent(&self) {
        if let Some(sent) = self.inner.lock().sent.as_mut() {
            sent.clear();
        }
    }

    pub fn endpoint(&self, id: DroneId) -> Option<Endpoint> {
        self.inner.lock().slots.get(&id).and_then(|s| s.endpoint.clone())
    }

    pub fn is_open(&self, id: DroneId) -> bool {
        self.inner
            .lock()
            .slots
            .get(&id)
            .is_some_and(|s| s.endpoint.is_some() && !s.closed)
    }

    /// How many times `close` was called for `id`, successful or not.
    pub fn close_calls(&self, id: DroneId) -> usize {
        self.inner.lock().slots.get(&id).map_or(0, |s| s.close_calls)
    }
}

impl Default for LoopbackChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageChannel for LoopbackChannel {
    fn open(&self, endpoint: &Endpoint) -> Result<(), ChannelError> {
        let mut inner = self.inner.lock();
        let slot = inner.slots.entry(endpoint.id).or_default();
        if slot.endpoint.is_some() && !slot.closed {
            return Err(ChannelError::AlreadyOpen(endpoint.id));
        }
        slot.endpoint = Some(endpoint.clone());
        slot.closed = false;
        slot.inbox.clear();
        Ok(())
    }

    fn send_unicast(&self, from: DroneId, to: DroneId, payload: Bytes) -> Result<(), ChannelError> {
        let mut inner = self.inner.lock();
        inner.sender_ready(from)?;
        inner.record(from, Some(to), &payload);
        inner.enqueue(from, to, payload);
        Ok(())
    }

    fn send_broadcast(&self, from: DroneId, payload: Bytes) -> Result<(), ChannelError> {
        let mut inner = self.inner.lock();
        inner.sender_ready(from)?;
        inner.record(from, None, &payload);
        let hops = inner.broadcast_hops;
        let mut targets: Vec<DroneId> = inner
            .slots
            .keys()
            .copied()
            .filter(|id| *id != from && id.0.abs_diff(from.0) <= hops)
            .collect();
        targets.sort();
        for to in targets {
            inner.enqueue(from, to, payload.clone());
        }
        Ok(())
    }

    fn receive(&self, id: DroneId) -> Result<Vec<Bytes>, ChannelError> {
        let mut inner = self.inner.lock();
        match inner.slots.get_mut(&id) {
            Some(slot) if slot.closed => Err(ChannelError::Closed(id)),
            Some(slot) if slot.endpoint.is_some() => Ok(std::mem::take(&mut slot.inbox)),
            _ => Err(ChannelError::NotOpen(id)),
        }
    }

    fn close(&self, id: DroneId) -> Result<(), ChannelError> {
        let mut inner = self.inner.lock();
        let Some(slot) = inner.slots.get_mut(&id) else {
            return Err(ChannelError::NotOpen(id));
        };
        slot.close_calls += 1;
        if slot.closed {
            return Err(ChannelError::Closed(id));
        }
        slot.closed = true;
        slot.inbox.clear();
        Ok(())
    }
}
