/// Keeps only the latest value pushed between two animation frames.
///
/// Pointer moves arrive faster than the page repaints; the host pushes every
/// move here, schedules a frame when `push` asks for one, and hands the
/// coalesced value to the session when the frame fires.
#[derive(Debug)]
pub struct FrameCoalescer<T> {
    pending: Option<T>,
    scheduled: bool,
}

impl<T> Default for FrameCoalescer<T> {
    fn default() -> Self {
        Self {
            pending: None,
            scheduled: false,
        }
    }
}

impl<T> FrameCoalescer<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value`, replacing any earlier one. Returns `true` when the
    /// caller has to request a new frame.
    pub fn push(&mut self, value: T) -> bool {
        self.pending = Some(value);
        if self.scheduled {
            false
        } else {
            self.scheduled = true;
            true
        }
    }

    /// Called from the frame callback.
    pub fn take(&mut self) -> Option<T> {
        self.scheduled = false;
        self.pending.take()
    }

    /// Drains the pending value ahead of the frame, e.g. right before a
    /// pointer release. The already scheduled frame then finds nothing.
    pub fn flush(&mut self) -> Option<T> {
        self.pending.take()
    }

    pub fn is_scheduled(&self) -> bool {
        self.scheduled
    }

    pub fn reset(&mut self) {
        self.pending = None;
        self.scheduled = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_latest_value_survives() {
        let mut frames = FrameCoalescer::new();
        assert!(frames.push(1));
        assert!(!frames.push(2));
        assert!(!frames.push(3));
        assert_eq!(frames.take(), Some(3));
        assert_eq!(frames.take(), None);
        assert!(frames.push(4));
    }

    #[test]
    fn flush_leaves_scheduled_frame_empty() {
        let mut frames = FrameCoalescer::new();
        frames.push("move");
        assert_eq!(frames.flush(), Some("move"));
        assert!(frames.is_scheduled());
        assert!(!frames.push("next"));
        assert_eq!(frames.take(), Some("next"));
        assert!(!frames.is_scheduled());
    }
}
