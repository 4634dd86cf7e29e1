//! Cooperative ticks and per-node update coalescing.
//!
//! [`FrameQueue`] is the host's "next frame" mechanism: callbacks requested now
//! run on the next [`tick`](FrameQueue::tick). A tick only runs the frames that
//! were requested before it started; anything requested while it runs waits
//! for the following tick, and a frame cancelled mid-tick does not run.
//!
//! [`UpdateScheduler`] debounces to the trailing edge: each call cancels the
//! previously scheduled frame, so only the last request before a tick fires.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// Handle to a requested frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameId(u64);

/// A deferred callback receiving the tick context.
pub type FrameCallback<Cx> = Box<dyn FnOnce(&mut Cx)>;

/// Ordered queue of deferred callbacks.
pub struct FrameQueue<Cx: 'static> {
    frames: BTreeMap<FrameId, FrameCallback<Cx>>,
    next_id: u64,
}

impl<Cx: 'static> FrameQueue<Cx> {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self {
            frames: BTreeMap::new(),
            next_id: 0,
        }
    }

    /// Defer `callback` to the next tick.
    pub fn request(&mut self, callback: impl FnOnce(&mut Cx) + 'static) -> FrameId {
        self.next_id += 1;
        let id = FrameId(self.next_id);
        self.frames.insert(id, Box::new(callback));
        id
    }

    /// Cancel a pending frame. Returns `true` if it had not run yet.
    pub fn cancel(&mut self, id: FrameId) -> bool {
        self.frames.remove(&id).is_some()
    }

    /// Whether `id` is still waiting to run.
    pub fn contains(&self, id: FrameId) -> bool {
        self.frames.contains_key(&id)
    }

    /// Number of pending frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// The newest pending frame: everything up to it belongs to the next tick.
    pub fn boundary(&self) -> Option<FrameId> {
        self.frames.keys().next_back().copied()
    }

    /// Take the oldest pending frame requested at or before `boundary`.
    pub fn pop_due(&mut self, boundary: FrameId) -> Option<FrameCallback<Cx>> {
        let (&id, _) = self.frames.first_key_value()?;
        if id > boundary {
            return None;
        }
        self.frames.remove(&id)
    }

    /// Run one tick against a context that does not own this queue.
    ///
    /// Returns the number of callbacks that ran.
    pub fn tick(&mut self, cx: &mut Cx) -> usize {
        let Some(boundary) = self.boundary() else {
            return 0;
        };
        let mut ran = 0;
        while let Some(callback) = self.pop_due(boundary) {
            callback(cx);
            ran += 1;
        }
        ran
    }
}

impl<Cx: 'static> Default for FrameQueue<Cx> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Cx: 'static> fmt::Debug for FrameQueue<Cx> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameQueue")
            .field("pending", &self.frames.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Per-node debouncer: at most one pending update frame at a time.
#[derive(Debug, Default)]
pub struct UpdateScheduler {
    pending: Rc<Cell<Option<FrameId>>>,
}

impl UpdateScheduler {
    /// Create an idle scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace any pending update with `callback`, deferred to the next tick.
    pub fn schedule_update<Cx: 'static>(
        &self,
        frames: &mut FrameQueue<Cx>,
        callback: impl FnOnce(&mut Cx) + 'static,
    ) -> FrameId {
        if let Some(previous) = self.pending.take() {
            frames.cancel(previous);
        }
        let pending = Rc::clone(&self.pending);
        let id = frames.request(move |cx| {
            pending.set(None);
            callback(cx);
        });
        self.pending.set(Some(id));
        id
    }

    /// Cancel the pending update, if any.
    pub fn cancel<Cx: 'static>(&self, frames: &mut FrameQueue<Cx>) -> bool {
        self.pending
            .take()
            .is_some_and(|previous| frames.cancel(previous))
    }

    /// Whether an update is waiting for the next tick.
    pub fn is_pending(&self) -> bool {
        self.pending.get().is_some()
    }
}
