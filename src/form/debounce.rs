use std::time::{Duration, Instant};

/// Deferred, coalesced trigger: scheduling again pushes the deadline out,
/// cancelling drops it.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    pub fn schedule(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Consumes the pending trigger if its deadline has passed.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rescheduling_coalesces() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(400));
        debouncer.schedule(start);
        debouncer.schedule(start + Duration::from_millis(300));
        assert!(!debouncer.fire(start + Duration::from_millis(500)));
        assert!(debouncer.fire(start + Duration::from_millis(700)));
        assert!(!debouncer.is_pending());
        assert!(!debouncer.fire(start + Duration::from_millis(900)));
    }

    #[test]
    fn cancel_drops_pending_run() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(400));
        debouncer.schedule(start);
        debouncer.cancel();
        assert!(!debouncer.fire(start + Duration::from_secs(1)));
    }
}
