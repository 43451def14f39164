//! Change and validation notifications for problem sets.
//!
//! # Responsibility
//! - Let observers subscribe to a set and receive its events over a channel.
//! - Carry structured date-ordering failures for UI display.
//!
//! # Invariants
//! - Every live subscriber receives every emitted event, in emit order.
//! - Subscribers whose receiver was dropped are pruned on the next emit.
//! - Cloning a set never clones its subscribers.

use crate::model::problem_set::DateField;
use serde::Serialize;
use std::sync::mpsc::{self, Receiver, Sender};

/// Event emitted by a `ProblemSet`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetEvent {
    /// A problem was added to the set's list.
    ProblemsChanged { set_id: String, problem_count: usize },
    /// Validation found two dates out of order.
    DateError(DateErrorEvent),
}

/// Category tag carried by error events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SetErrorKind {
    DateError,
}

/// Structured date-ordering failure.
///
/// `date1` is the date found to be after `date2`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateErrorEvent {
    #[serde(rename = "type")]
    pub kind: SetErrorKind,
    pub set_id: String,
    pub date1: &'static str,
    pub date2: &'static str,
}

impl DateErrorEvent {
    pub fn new(set_id: impl Into<String>, first: DateField, second: DateField) -> Self {
        Self {
            kind: SetErrorKind::DateError,
            set_id: set_id.into(),
            date1: first.label(),
            date2: second.label(),
        }
    }
}

/// Subscriber list for one set.
#[derive(Debug, Default)]
pub struct SetEvents {
    subscribers: Vec<Sender<SetEvent>>,
}

impl SetEvents {
    /// Registers a new subscriber and returns its receiving end.
    pub fn subscribe(&mut self) -> Receiver<SetEvent> {
        let (sender, receiver) = mpsc::channel();
        self.subscribers.push(sender);
        receiver
    }

    /// Delivers `event` to all live subscribers.
    pub fn emit(&mut self, event: SetEvent) {
        self.subscribers
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl Clone for SetEvents {
    fn clone(&self) -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::{DateErrorEvent, SetEvent, SetEvents};
    use crate::model::problem_set::DateField;

    #[test]
    fn emit_reaches_every_subscriber() {
        let mut events = SetEvents::default();
        let first = events.subscribe();
        let second = events.subscribe();

        let event = SetEvent::ProblemsChanged {
            set_id: "hw1".to_string(),
            problem_count: 1,
        };
        events.emit(event.clone());

        assert_eq!(first.try_recv().unwrap(), event);
        assert_eq!(second.try_recv().unwrap(), event);
    }

    #[test]
    fn dropped_receivers_are_pruned() {
        let mut events = SetEvents::default();
        let kept = events.subscribe();
        drop(events.subscribe());

        events.emit(SetEvent::DateError(DateErrorEvent::new(
            "hw1",
            DateField::Open,
            DateField::Due,
        )));

        assert_eq!(events.subscriber_count(), 1);
        assert!(kept.try_recv().is_ok());
    }

    #[test]
    fn clone_starts_without_subscribers() {
        let mut events = SetEvents::default();
        let _receiver = events.subscribe();
        assert_eq!(events.clone().subscriber_count(), 0);
    }

    #[test]
    fn date_error_serializes_with_type_tag() {
        let event = DateErrorEvent::new("hw1", DateField::Open, DateField::Due);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "date_error");
        assert_eq!(json["set_id"], "hw1");
        assert_eq!(json["date1"], "open date");
        assert_eq!(json["date2"], "due date");
    }
}
