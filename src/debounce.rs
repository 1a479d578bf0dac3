//! Debounce and dedupe for the raw input stream.
//!
//! [`Debouncer`] is the clock-agnostic core; [`debounced`] wires it onto a
//! tokio channel.
use crate::consts::MAX_DEBOUNCE;

use serde::Serialize;
use tokio::{
    sync::mpsc::{self, UnboundedReceiver},
    time::{Duration, Instant},
};

/// Raw input text stamped with the token-store revision it was typed
/// against. Two fragments only dedupe when both parts match, so retyping
/// the same text after a commit still reaches the suggestion engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fragment {
    pub revision: u64,
    pub text: String,
}

#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    pending: Option<(Fragment, Instant)>,
    last: Option<Fragment>,
}

impl Debouncer {
    /// `delay` is clamped to [`MAX_DEBOUNCE`].
    pub fn new(delay: Duration) -> Self {
        Self {
            delay: delay.min(MAX_DEBOUNCE),
            pending: None,
            last: None,
        }
    }

    /// Replaces the pending fragment and restarts the quiet period.
    pub fn push(&mut self, fragment: Fragment, now: Instant) {
        self.pending = Some((fragment, now));
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending
            .as_ref()
            .map(|(_, at)| at.checked_add(self.delay).unwrap_or(*at))
    }

    /// Releases the pending fragment once the quiet period has elapsed,
    /// unless it repeats the previously released one.
    pub fn poll(&mut self, now: Instant) -> Option<Fragment> {
        let deadline = self.deadline()?;
        if now < deadline {
            return None;
        }
        self.release()
    }

    /// Releases the pending fragment regardless of the clock.
    pub fn flush(&mut self) -> Option<Fragment> {
        self.release()
    }

    fn release(&mut self) -> Option<Fragment> {
        let (fragment, _) = self.pending.take()?;
        if self.last.as_ref() == Some(&fragment) {
            return None;
        }
        self.last = Some(fragment.clone());
        Some(fragment)
    }
}

/// Spawns a task forwarding fragments from `input` once input pauses for
/// `delay`. Must be called inside a tokio runtime.
pub fn debounced(
    mut input: UnboundedReceiver<Fragment>,
    delay: Duration,
) -> UnboundedReceiver<Fragment> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let mut debouncer = Debouncer::new(delay);
        loop {
            let Some(deadline) = debouncer.deadline() else {
                match input.recv().await {
                    Some(fragment) => debouncer.push(fragment, Instant::now()),
                    None => break,
                }
                continue;
            };
            tokio::select! {
                received = input.recv() => match received {
                    Some(fragment) => debouncer.push(fragment, Instant::now()),
                    None => {
                        if let Some(fragment) = debouncer.flush() {
                            let _ = tx.send(fragment);
                        }
                        break;
                    }
                },
                _ = tokio::time::sleep_until(deadline) => {
                    if let Some(fragment) = debouncer.poll(Instant::now()) {
                        if tx.send(fragment).is_err() {
                            break;
                        }
                    }
                }
            }
        }
    });
    rx
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragment(revision: u64, text: &str) -> Fragment {
        Fragment {
            revision,
            text: text.to_string(),
        }
    }

    const DELAY: Duration = Duration::from_millis(300);

    #[test]
    fn waits_for_quiet_period() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(DELAY);
        debouncer.push(fragment(0, "a"), start);
        debouncer.push(fragment(0, "ab"), start + Duration::from_millis(200));
        assert_eq!(debouncer.poll(start + Duration::from_millis(400)), None);
        assert_eq!(
            debouncer.poll(start + Duration::from_millis(500)),
            Some(fragment(0, "ab"))
        );
        assert_eq!(debouncer.poll(start + Duration::from_secs(5)), None);
    }

    #[test]
    fn repeated_fragment_is_dropped() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(DELAY);
        debouncer.push(fragment(0, "ab"), start);
        assert!(debouncer.flush().is_some());
        debouncer.push(fragment(0, "ab"), start);
        assert_eq!(debouncer.poll(start + DELAY), None);
        assert_eq!(debouncer.deadline(), None);
    }

    #[test]
    fn same_text_after_revision_change_passes() {
        let mut debouncer = Debouncer::new(DELAY);
        debouncer.push(fragment(0, "a"), Instant::now());
        assert!(debouncer.flush().is_some());
        debouncer.push(fragment(1, "a"), Instant::now());
        assert_eq!(debouncer.flush(), Some(fragment(1, "a")));
    }

    #[test]
    fn oversized_delay_does_not_overflow() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::MAX);
        debouncer.push(fragment(0, "a"), start);
        assert_eq!(debouncer.deadline(), Some(start + MAX_DEBOUNCE));
        assert_eq!(debouncer.poll(start + MAX_DEBOUNCE), Some(fragment(0, "a")));
    }

    #[tokio::test(start_paused = true)]
    async fn pipeline_emits_latest_after_pause() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut out = debounced(rx, DELAY);
        tx.send(fragment(0, "s")).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        tx.send(fragment(0, "st")).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        tx.send(fragment(0, "sta")).unwrap();
        assert_eq!(out.recv().await, Some(fragment(0, "sta")));

        tx.send(fragment(0, "sta")).unwrap();
        tx.send(fragment(0, "stat")).unwrap();
        assert_eq!(out.recv().await, Some(fragment(0, "stat")));

        drop(tx);
        assert_eq!(out.recv().await, None);
    }
}
