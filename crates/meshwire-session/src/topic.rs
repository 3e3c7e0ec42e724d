//! Topic-based fan-out of radio events to subscribers.

use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::str::FromStr;
use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;
use tracing::{debug, error};

use crate::error::SessionError;
use crate::message::{MeshPacket, NodeInfo};

/// A named stream of events subscribers can attach to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Topic {
    /// Node database entries.
    NodeEvents,
    /// Packets heard on the mesh.
    Packets,
}

impl Topic {
    /// Every topic, in declaration order.
    pub const ALL: [Topic; 2] = [Topic::NodeEvents, Topic::Packets];

    /// Stable topic name.
    pub fn as_str(self) -> &'static str {
        match self {
            Topic::NodeEvents => "node-events",
            Topic::Packets => "packets",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Topic {
    type Err = SessionError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Topic::ALL
            .into_iter()
            .find(|topic| topic.as_str() == name)
            .ok_or_else(|| SessionError::UnknownTopic(name.to_string()))
    }
}

/// An event delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "kebab-case")]
pub enum Event {
    Node(NodeInfo),
    Packet(MeshPacket),
}

impl Event {
    /// The topic this event is published on.
    pub fn topic(&self) -> Topic {
        match self {
            Event::Node(_) => Topic::NodeEvents,
            Event::Packet(_) => Topic::Packets,
        }
    }
}

/// Subscriber callback. Runs on the dispatcher thread and must not block.
pub type Subscriber = Arc<dyn Fn(&Event) + Send + Sync>;

/// Registry of subscribers per topic.
///
/// Subscribers are only ever appended. Publishing snapshots the list first, so
/// a callback may subscribe further callbacks without deadlocking; those see
/// the next event, not the current one.
#[derive(Default)]
pub struct TopicRegistry {
    subscribers: RwLock<HashMap<Topic, Vec<Subscriber>>>,
}

impl TopicRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `subscriber` to `topic`.
    pub fn subscribe<F>(&self, topic: Topic, subscriber: F)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let mut map = self
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        map.entry(topic).or_default().push(Arc::new(subscriber));
        debug!(%topic, "subscriber added");
    }

    /// Subscribe by topic name. An unknown name is logged and ignored.
    pub fn subscribe_named<F>(&self, name: &str, subscriber: F)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        match name.parse::<Topic>() {
            Ok(topic) => self.subscribe(topic, subscriber),
            Err(err) => error!(topic = name, "{err}"),
        }
    }

    /// Deliver `event` to every subscriber of its topic, in registration order.
    ///
    /// Returns the number of subscribers that ran to completion. A panicking
    /// subscriber is logged and skipped.
    pub fn publish(&self, event: &Event) -> usize {
        let topic = event.topic();
        let snapshot: Vec<Subscriber> = {
            let map = self
                .subscribers
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            map.get(&topic).cloned().unwrap_or_default()
        };

        let mut delivered = 0;
        for (index, subscriber) in snapshot.iter().enumerate() {
            match catch_unwind(AssertUnwindSafe(|| subscriber(event))) {
                Ok(()) => delivered += 1,
                Err(_) => error!(%topic, index, "subscriber panicked"),
            }
        }
        delivered
    }

    /// Number of subscribers on `topic`.
    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&topic)
            .map_or(0, Vec::len)
    }
}

impl fmt::Debug for TopicRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let map = self
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let counts: HashMap<Topic, usize> = map.iter().map(|(t, s)| (*t, s.len())).collect();
        f.debug_struct("TopicRegistry")
            .field("subscribers", &counts)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    fn node(num: u32) -> Event {
        Event::Node(NodeInfo {
            num,
            ..NodeInfo::default()
        })
    }

    #[test]
    fn topic_names_parse() {
        assert_eq!("node-events".parse::<Topic>().unwrap(), Topic::NodeEvents);
        assert_eq!("packets".parse::<Topic>().unwrap(), Topic::Packets);
        for topic in Topic::ALL {
            assert_eq!(topic.to_string().parse::<Topic>().unwrap(), topic);
        }
    }

    #[test]
    fn unknown_topic_name_is_an_error() {
        let err = "TOPIC_WEATHER".parse::<Topic>().unwrap_err();
        assert!(matches!(err, SessionError::UnknownTopic(ref name) if name == "TOPIC_WEATHER"));
    }

    #[test]
    fn subscribers_run_in_registration_order() {
        let registry = TopicRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        for tag in ["a", "b", "c"] {
            let log = Arc::clone(&log);
            registry.subscribe(Topic::NodeEvents, move |_| log.lock().unwrap().push(tag));
        }

        assert_eq!(registry.publish(&node(1)), 3);
        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn events_only_reach_their_topic() {
        let registry = TopicRegistry::new();
        let hits = Arc::new(Mutex::new(Vec::new()));
        {
            let hits = Arc::clone(&hits);
            registry.subscribe(Topic::Packets, move |event| {
                hits.lock().unwrap().push(event.topic())
            });
        }

        assert_eq!(registry.publish(&node(1)), 0);
        assert_eq!(
            registry.publish(&Event::Packet(MeshPacket::default())),
            1
        );
        assert_eq!(*hits.lock().unwrap(), vec![Topic::Packets]);
    }

    #[test]
    fn subscribe_named_ignores_unknown_topics() {
        let registry = TopicRegistry::new();
        registry.subscribe_named("nope", |_| {});
        registry.subscribe_named("node-events", |_| {});
        assert_eq!(registry.subscriber_count(Topic::NodeEvents), 1);
        assert_eq!(registry.subscriber_count(Topic::Packets), 0);
    }

    #[test]
    fn panicking_subscriber_does_not_stop_delivery() {
        let registry = TopicRegistry::new();
        let reached = Arc::new(Mutex::new(false));
        registry.subscribe(Topic::NodeEvents, |_| panic!("subscriber bug"));
        {
            let reached = Arc::clone(&reached);
            registry.subscribe(Topic::NodeEvents, move |_| *reached.lock().unwrap() = true);
        }

        assert_eq!(registry.publish(&node(7)), 1);
        assert!(*reached.lock().unwrap());
    }

    #[test]
    fn subscribing_from_a_callback_does_not_deadlock() {
        let registry = Arc::new(TopicRegistry::new());
        {
            let inner = Arc::clone(&registry);
            registry.subscribe(Topic::NodeEvents, move |_| {
                inner.subscribe(Topic::NodeEvents, |_| {});
            });
        }

        assert_eq!(registry.publish(&node(1)), 1);
        assert_eq!(registry.subscriber_count(Topic::NodeEvents), 2);
    }

    #[test]
    fn event_serializes_with_kind_tag() {
        let json = serde_json::to_value(node(5)).unwrap();
        assert_eq!(json["kind"], "node");
        assert_eq!(json["data"]["num"], 5);
    }
}
