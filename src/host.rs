//! What a view needs from the windowing system hosting it.

use std::cell::{Cell, RefCell};
use std::time::{Duration, Instant};

/// Repaint scheduling offered by the host.
pub trait Invalidator {
    /// Requests a repaint as soon as possible.
    fn invalidate(&self);

    /// Requests a repaint after `delay`. Fire-and-forget: requests are never
    /// cancelled.
    fn post_invalidate_delayed(&self, delay: Duration);
}

/// A pending repaint request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Repaint {
    pub due: Instant,
}

/// Headless [`Invalidator`] that queues requests against a clock the caller
/// controls. Concurrent requests collapse into the earliest one, the way a
/// windowing system coalesces invalidations.
#[derive(Debug)]
pub struct FrameScheduler {
    clock: Cell<Instant>,
    pending: RefCell<Option<Repaint>>,
    requests: Cell<usize>,
}

impl FrameScheduler {
    pub fn new(start: Instant) -> Self {
        Self {
            clock: Cell::new(start),
            pending: RefCell::new(None),
            requests: Cell::new(0),
        }
    }

    pub fn now(&self) -> Instant {
        self.clock.get()
    }

    /// Takes the next pending repaint and moves the clock to its due time.
    /// `None` when nothing is scheduled.
    pub fn next_frame(&self) -> Option<Instant> {
        let repaint = self.pending.borrow_mut().take()?;
        let now = self.clock.get().max(repaint.due);
        self.clock.set(now);
        Some(now)
    }

    pub fn pending(&self) -> Option<Repaint> {
        *self.pending.borrow()
    }

    /// Total repaint requests received, coalesced or not.
    pub fn requests(&self) -> usize {
        self.requests.get()
    }

    fn schedule(&self, due: Instant) {
        self.requests.set(self.requests.get() + 1);
        let mut pending = self.pending.borrow_mut();
        match pending.as_mut() {
            Some(existing) if existing.due <= due => {}
            _ => *pending = Some(Repaint { due }),
        }
    }
}

impl Invalidator for FrameScheduler {
    fn invalidate(&self) {
        self.schedule(self.now());
    }

    fn post_invalidate_delayed(&self, delay: Duration) {
        self.schedule(self.now() + delay);
    }
}

/// How a parent constrains one axis of a child's size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasureMode {
    /// No constraint; the child picks its size.
    Unspecified,
    /// The child must be exactly this size.
    Exactly,
    /// The child may be at most this size.
    AtMost,
}

/// One axis of a layout constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeasureSpec {
    pub mode: MeasureMode,
    pub size: i32,
}

impl MeasureSpec {
    pub const UNSPECIFIED: MeasureSpec = MeasureSpec {
        mode: MeasureMode::Unspecified,
        size: 0,
    };

    pub fn exactly(size: i32) -> Self {
        Self {
            mode: MeasureMode::Exactly,
            size,
        }
    }

    pub fn at_most(size: i32) -> Self {
        Self {
            mode: MeasureMode::AtMost,
            size,
        }
    }

    /// Reconciles a desired size with this constraint.
    pub fn resolve_size(self, desired: i32) -> i32 {
        match self.mode {
            MeasureMode::Unspecified => desired,
            MeasureMode::Exactly => self.size,
            MeasureMode::AtMost => desired.min(self.size),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_size() {
        assert_eq!(MeasureSpec::UNSPECIFIED.resolve_size(240), 240);
        assert_eq!(MeasureSpec::exactly(50).resolve_size(240), 50);
        assert_eq!(MeasureSpec::exactly(500).resolve_size(240), 500);
        assert_eq!(MeasureSpec::at_most(100).resolve_size(240), 100);
        assert_eq!(MeasureSpec::at_most(300).resolve_size(240), 240);
    }

    #[test]
    fn test_scheduler_coalesces_to_earliest() {
        let start = Instant::now();
        let scheduler = FrameScheduler::new(start);

        scheduler.post_invalidate_delayed(Duration::from_millis(16));
        scheduler.invalidate();
        scheduler.post_invalidate_delayed(Duration::from_millis(32));
        assert_eq!(scheduler.requests(), 3);
        assert_eq!(scheduler.pending(), Some(Repaint { due: start }));

        assert_eq!(scheduler.next_frame(), Some(start));
        assert_eq!(scheduler.next_frame(), None);
    }

    #[test]
    fn test_scheduler_advances_clock() {
        let start = Instant::now();
        let scheduler = FrameScheduler::new(start);
        scheduler.post_invalidate_delayed(Duration::from_millis(16));

        let frame = scheduler.next_frame().unwrap();
        assert_eq!(frame, start + Duration::from_millis(16));
        assert_eq!(scheduler.now(), frame);
    }
}
