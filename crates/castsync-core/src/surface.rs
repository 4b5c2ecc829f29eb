// ── Presentation surface visibility ──
//
// Hiding is deferred by a short delay; any show request that lands before
// the deadline cancels the hide. The owner loop polls `hide_deadline()` and
// calls `complete_pending_hide()` when the timer fires.

use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug)]
pub struct Surface {
    visible: bool,
    pending_hide: Option<Instant>,
}

impl Default for Surface {
    fn default() -> Self {
        Self {
            visible: true,
            pending_hide: None,
        }
    }
}

impl Surface {
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn hide_deadline(&self) -> Option<Instant> {
        self.pending_hide
    }

    /// Show immediately, cancelling any pending hide. Returns whether
    /// visibility changed.
    pub fn show(&mut self) -> bool {
        self.pending_hide = None;
        let changed = !self.visible;
        self.visible = true;
        changed
    }

    /// Schedule a hide `delay` after `now`. An earlier pending deadline wins.
    pub fn schedule_hide(&mut self, now: Instant, delay: Duration) {
        if !self.visible {
            return;
        }
        let deadline = now + delay;
        self.pending_hide = Some(match self.pending_hide {
            Some(existing) if existing <= deadline => existing,
            _ => deadline,
        });
    }

    /// Hide right away. Returns whether visibility changed.
    pub fn hide(&mut self) -> bool {
        self.pending_hide = None;
        let changed = self.visible;
        self.visible = false;
        changed
    }

    /// Apply a pending hide whose deadline has passed.
    pub fn complete_pending_hide(&mut self, now: Instant) -> bool {
        match self.pending_hide {
            Some(deadline) if deadline <= now => self.hide(),
            _ => false,
        }
    }

    /// Hide if visible, otherwise show. Returns the new visibility.
    pub fn toggle(&mut self) -> bool {
        if self.visible {
            self.hide();
        } else {
            self.show();
        }
        self.visible
    }
}
