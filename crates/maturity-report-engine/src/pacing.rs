//! Courtesy delays after remote calls. There is no retry or backoff; these
//! pauses are the only concession to the store's rate limits.

use std::cell::RefCell;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delays {
    /// After every apply or read
    pub request: Duration,
    /// After applying a batch that inserted images, while the store fetches them
    pub image: Duration,
}

impl Default for Delays {
    fn default() -> Self {
        Self {
            request: Duration::from_secs(1),
            image: Duration::from_secs(5),
        }
    }
}

pub trait Pacer {
    fn pause(&self, delay: Duration);
}

/// Blocks the calling thread
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadPacer;

impl Pacer for ThreadPacer {
    fn pause(&self, delay: Duration) {
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
    }
}

/// Never waits; for offline runs and tests
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPacer;

impl Pacer for NoPacer {
    fn pause(&self, _delay: Duration) {}
}

/// Remembers every requested pause instead of waiting
#[derive(Debug, Default)]
pub struct RecordingPacer {
    pauses: RefCell<Vec<Duration>>,
}

impl RecordingPacer {
    pub fn pauses(&self) -> Vec<Duration> {
        self.pauses.borrow().clone()
    }
}

impl Pacer for RecordingPacer {
    fn pause(&self, delay: Duration) {
        self.pauses.borrow_mut().push(delay);
    }
}

impl<P: Pacer + ?Sized> Pacer for &P {
    fn pause(&self, delay: Duration) {
        (**self).pause(delay);
    }
}
