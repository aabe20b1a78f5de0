//! Status transition classification.

use crate::models::{service::Service, status::Status};

/// Notification event derived from one status transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionEvent {
    Dead,
    Resurrected,
    Down,
    Slow,
    Recovered,
}

impl TransitionEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionEvent::Dead => "dead",
            TransitionEvent::Resurrected => "resurrected",
            TransitionEvent::Down => "down",
            TransitionEvent::Slow => "slow",
            TransitionEvent::Recovered => "recovered",
        }
    }
}

/// One detected status change for a service within a run.
#[derive(Debug, Clone)]
pub struct Transition {
    pub service: Service,
    pub previous: Status,
    pub new: Status,
}

impl Transition {
    pub fn event(&self) -> TransitionEvent {
        classify(self.previous, self.new)
    }
}

/// Map a `(previous, new)` pair to exactly one event. Priority order:
/// entering dead, leaving dead, going down, going slow, otherwise recovery.
pub fn classify(previous: Status, new: Status) -> TransitionEvent {
    if new == Status::Dead {
        TransitionEvent::Dead
    } else if previous == Status::Dead {
        TransitionEvent::Resurrected
    } else if new == Status::Down {
        TransitionEvent::Down
    } else if new == Status::Slow {
        TransitionEvent::Slow
    } else {
        TransitionEvent::Recovered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_table() {
        assert_eq!(classify(Status::Down, Status::Up), TransitionEvent::Recovered);
        assert_eq!(classify(Status::Slow, Status::Up), TransitionEvent::Recovered);
        assert_eq!(classify(Status::Up, Status::Down), TransitionEvent::Down);
        assert_eq!(classify(Status::Slow, Status::Down), TransitionEvent::Down);
        assert_eq!(classify(Status::Up, Status::Slow), TransitionEvent::Slow);
        assert_eq!(classify(Status::Up, Status::Dead), TransitionEvent::Dead);
        assert_eq!(classify(Status::Down, Status::Dead), TransitionEvent::Dead);
        assert_eq!(classify(Status::Dead, Status::Up), TransitionEvent::Resurrected);
        // Leaving dead outranks the new status, even when the service comes
        // back in a degraded state.
        assert_eq!(classify(Status::Dead, Status::Down), TransitionEvent::Resurrected);
        assert_eq!(classify(Status::Dead, Status::Slow), TransitionEvent::Resurrected);
    }

    #[test]
    fn entering_dead_wins_over_everything() {
        for previous in [Status::Unknown, Status::Up, Status::Slow, Status::Down] {
            assert_eq!(classify(previous, Status::Dead), TransitionEvent::Dead);
        }
    }

    #[test]
    fn classification_is_total_and_idempotent() {
        let all = [Status::Unknown, Status::Up, Status::Slow, Status::Down, Status::Dead];
        for previous in all {
            for new in all {
                if previous == new {
                    continue;
                }
                let first = classify(previous, new);
                assert_eq!(classify(previous, new), first);
            }
        }
    }
}
