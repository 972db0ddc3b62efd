//! Rate limiting of progress updates.
//!
//! [`Throttle`] is a plain state machine over caller-supplied instants: the
//! first value always goes through, values arriving inside the interval are
//! held (the latest replaces older ones), and [`Throttle::flush`] releases
//! the held value. It needs no timer, so it works under any runtime.

use std::time::{Duration, Instant};

use crate::context::ProgressSender;

/// Leading- and trailing-edge throttle.
#[derive(Debug)]
pub struct Throttle<T> {
    interval: Duration,
    last_delivered: Option<Instant>,
    pending: Option<T>,
}

impl<T> Throttle<T> {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_delivered: None,
            pending: None,
        }
    }

    /// Offer a value at `now`. Returns it when it should be delivered
    /// immediately; otherwise keeps it as the pending trailing value.
    pub fn offer(&mut self, now: Instant, value: T) -> Option<T> {
        match self.last_delivered {
            Some(last) if now.saturating_duration_since(last) < self.interval => {
                self.pending = Some(value);
                None
            }
            _ => {
                self.last_delivered = Some(now);
                self.pending = None;
                Some(value)
            }
        }
    }

    /// Release the held value, if any.
    pub fn flush(&mut self, now: Instant) -> Option<T> {
        let value = self.pending.take();
        if value.is_some() {
            self.last_delivered = Some(now);
        }
        value
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }
}

/// A [`ProgressSender`] behind a [`Throttle`].
pub struct ThrottledProgress<'a> {
    sender: &'a ProgressSender,
    throttle: Throttle<(f32, String)>,
}

impl<'a> ThrottledProgress<'a> {
    pub fn new(sender: &'a ProgressSender, interval: Duration) -> Self {
        Self {
            sender,
            throttle: Throttle::new(interval),
        }
    }

    pub fn report(&mut self, progress: f32, message: &str) {
        if let Some((pct, msg)) = self
            .throttle
            .offer(Instant::now(), (progress, message.to_string()))
        {
            self.sender.send(pct, &msg);
        }
    }

    /// Deliver the held update, if any.
    pub fn flush(&mut self) {
        if let Some((pct, msg)) = self.throttle.flush(Instant::now()) {
            self.sender.send(pct, &msg);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn first_value_is_delivered() {
        let mut throttle = Throttle::new(Duration::from_secs(60));
        assert_eq!(throttle.offer(Instant::now(), 1), Some(1));
    }

    #[test]
    fn values_inside_window_are_held_latest_wins() {
        let start = Instant::now();
        let mut throttle = Throttle::new(Duration::from_millis(100));
        assert_eq!(throttle.offer(start, 1), Some(1));
        assert_eq!(throttle.offer(start + Duration::from_millis(10), 2), None);
        assert_eq!(throttle.offer(start + Duration::from_millis(20), 3), None);
        assert!(throttle.has_pending());
        assert_eq!(throttle.flush(start + Duration::from_millis(30)), Some(3));
        assert_eq!(throttle.flush(start + Duration::from_millis(40)), None);
    }

    #[test]
    fn values_after_window_go_through() {
        let start = Instant::now();
        let mut throttle = Throttle::new(Duration::from_millis(100));
        assert_eq!(throttle.offer(start, 1), Some(1));
        assert_eq!(throttle.offer(start + Duration::from_millis(50), 2), None);
        assert_eq!(throttle.offer(start + Duration::from_millis(150), 3), Some(3));
        assert!(!throttle.has_pending());
    }

    #[test]
    fn flush_restarts_window() {
        let start = Instant::now();
        let mut throttle = Throttle::new(Duration::from_millis(100));
        throttle.offer(start, 1);
        throttle.offer(start + Duration::from_millis(10), 2);
        assert_eq!(throttle.flush(start + Duration::from_millis(90)), Some(2));
        assert_eq!(throttle.offer(start + Duration::from_millis(150), 3), None);
    }

    #[test]
    fn zero_interval_delivers_everything() {
        let now = Instant::now();
        let mut throttle = Throttle::new(Duration::ZERO);
        assert_eq!(throttle.offer(now, 1), Some(1));
        assert_eq!(throttle.offer(now, 2), Some(2));
    }

    #[test]
    fn throttled_progress_keeps_first_and_last() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let sender = ProgressSender::new(move |pct, msg| {
            sink.lock().unwrap().push((pct, msg.to_string()));
        });

        let mut progress = ThrottledProgress::new(&sender, Duration::from_secs(3600));
        progress.report(0.0, "start");
        progress.report(40.0, "middle");
        progress.report(100.0, "end");
        progress.flush();

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            [(0.0, "start".to_string()), (100.0, "end".to_string())]
        );
    }
}
