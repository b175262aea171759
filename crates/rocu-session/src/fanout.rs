use tracing::debug;

use crate::link::LinkError;
use crate::state::SessionState;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanoutReport {
    pub delivered: usize,
    /// Observers whose queue was full; they miss this update but stay subscribed.
    pub skipped: usize,
    /// Observers removed because their connection is gone.
    pub pruned: usize,
}

/// Best-effort, at-most-once delivery of `payload` to every observer.
///
/// Delivery runs over a snapshot of the observer set; observers that turned
/// out to be closed are removed in one pass after the sweep.
pub fn broadcast(session: &SessionState, payload: &str) -> FanoutReport {
    let observers = session.observers_snapshot();
    if observers.is_empty() {
        return FanoutReport::default();
    }

    let mut report = FanoutReport::default();
    let mut dead = Vec::new();
    for obs in &observers {
        match obs.try_send(payload.to_owned()) {
            Ok(()) => report.delivered += 1,
            Err(LinkError::Full) => {
                debug!(observer = obs.id(), "observer lagging, update skipped");
                report.skipped += 1;
            }
            Err(e) => {
                debug!(observer = obs.id(), error = %e, "observer send failed");
                dead.push(obs.id());
            }
        }
    }

    if !dead.is_empty() {
        session.prune_observers(&dead);
        report.pruned = dead.len();
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::LinkHandle;

    #[test]
    fn empty_observer_set_is_noop() {
        let s = SessionState::default();
        assert_eq!(broadcast(&s, "{}"), FanoutReport::default());
    }

    #[tokio::test]
    async fn dead_observer_pruned_others_still_served() {
        let s = SessionState::default();
        let (a, mut ra) = LinkHandle::channel(4);
        let (b, rb) = LinkHandle::channel(4);
        let (c, mut rc) = LinkHandle::channel(4);
        s.add_observer(a);
        s.add_observer(b);
        s.add_observer(c);
        drop(rb);

        let r = broadcast(&s, "hello");
        assert_eq!(r.delivered, 2);
        assert_eq!(r.pruned, 1);
        assert_eq!(s.observer_count(), 2);
        assert_eq!(ra.recv().await.as_deref(), Some("hello"));
        assert_eq!(rc.recv().await.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn full_observer_is_skipped_not_pruned() {
        let s = SessionState::default();
        let (a, mut ra) = LinkHandle::channel(1);
        s.add_observer(a);
        assert_eq!(broadcast(&s, "one").delivered, 1);
        let r = broadcast(&s, "two");
        assert_eq!(r.skipped, 1);
        assert_eq!(s.observer_count(), 1);
        assert_eq!(ra.recv().await.as_deref(), Some("one"));
    }
}
