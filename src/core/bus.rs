//! Topic-based publish/subscribe bus.
//!
//! Every topic carries two listener lists: resolve continuations and reject
//! continuations. Listeners are persistent; each publish invokes every
//! listener attached to the topic at that moment, in attachment order.
//! A reject on a topic without reject listeners is forwarded to the
//! bus's failure sink topic so failures are never silently dropped.
//!
//! Delivery is synchronous and depth-first: a listener may publish again
//! and that nested publish completes before the outer one moves on to its
//! next listener. The bus never holds a borrow of its own state while a
//! listener runs, so listeners may also subscribe or publish freely.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use tracing::{debug, warn};

/// A continuation attached to a topic.
pub type Listener<T> = Rc<dyn Fn(&T)>;

struct TopicListeners<T> {
    resolve: Vec<Listener<T>>,
    reject: Vec<Listener<T>>,
}

impl<T> Default for TopicListeners<T> {
    fn default() -> Self {
        Self {
            resolve: Vec::new(),
            reject: Vec::new(),
        }
    }
}

struct BusState<T> {
    topics: HashMap<String, TopicListeners<T>>,
    failure_sink: Option<String>,
}

/// Publish/subscribe channel keyed by topic name.
///
/// Cloning yields another handle to the same bus.
pub struct EventBus<T> {
    state: Rc<RefCell<BusState<T>>>,
}

impl<T> Clone for EventBus<T> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
        }
    }
}

impl<T: 'static> EventBus<T> {
    /// Create a bus. Rejects nobody listens for are re-published as
    /// resolves on `failure_sink`.
    pub fn new(failure_sink: Option<String>) -> Self {
        Self {
            state: Rc::new(RefCell::new(BusState {
                topics: HashMap::new(),
                failure_sink,
            })),
        }
    }

    /// Get a subscription handle for `topic`.
    pub fn subscribe(&self, topic: impl Into<String>) -> Subscription<T> {
        Subscription {
            topic: topic.into(),
            bus: Rc::downgrade(&self.state),
        }
    }

    /// Invoke every resolve continuation on `topic`.
    pub fn publish(&self, topic: &str, value: &T) {
        let listeners = self.snapshot(topic, |l| &l.resolve);
        debug!("publish {} ({} listeners)", topic, listeners.len());
        for listener in listeners {
            listener(value);
        }
    }

    /// Invoke every reject continuation on `topic`, or route the value to
    /// the failure sink when there are none.
    pub fn publish_failure(&self, topic: &str, value: &T) {
        let listeners = self.snapshot(topic, |l| &l.reject);
        if !listeners.is_empty() {
            debug!("reject {} ({} listeners)", topic, listeners.len());
            for listener in listeners {
                listener(value);
            }
            return;
        }

        let sink = self.state.borrow().failure_sink.clone();
        match sink {
            Some(sink) if sink != topic => self.publish(&sink, value),
            _ => warn!("unhandled failure on {}", topic),
        }
    }

    /// Number of resolve and reject listeners on `topic`.
    pub fn listener_count(&self, topic: &str) -> (usize, usize) {
        let state = self.state.borrow();
        state
            .topics
            .get(topic)
            .map(|l| (l.resolve.len(), l.reject.len()))
            .unwrap_or((0, 0))
    }

    fn snapshot(
        &self,
        topic: &str,
        pick: impl Fn(&TopicListeners<T>) -> &Vec<Listener<T>>,
    ) -> Vec<Listener<T>> {
        let state = self.state.borrow();
        state
            .topics
            .get(topic)
            .map(|l| pick(l).clone())
            .unwrap_or_default()
    }
}

/// Handle for attaching continuations to one topic.
///
/// Holds only a weak reference; attaching to a dropped bus is a no-op.
pub struct Subscription<T> {
    topic: String,
    bus: Weak<RefCell<BusState<T>>>,
}

impl<T> Clone for Subscription<T> {
    fn clone(&self) -> Self {
        Self {
            topic: self.topic.clone(),
            bus: Weak::clone(&self.bus),
        }
    }
}

impl<T: 'static> Subscription<T> {
    /// Attach a continuation run on every publish to this topic.
    pub fn on_resolve(&self, f: impl Fn(&T) + 'static) -> &Self {
        self.attach(Rc::new(f), false);
        self
    }

    /// Attach a continuation run on every failure published to this topic.
    pub fn on_reject(&self, f: impl Fn(&T) + 'static) -> &Self {
        self.attach(Rc::new(f), true);
        self
    }

    fn attach(&self, listener: Listener<T>, reject: bool) {
        let Some(state) = self.bus.upgrade() else {
            warn!("subscription to {} outlived its bus", self.topic);
            return;
        };
        let mut state = state.borrow_mut();
        let entry = state.topics.entry(self.topic.clone()).or_default();
        if reject {
            entry.reject.push(listener);
        } else {
            entry.resolve.push(listener);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Rc<RefCell<Vec<String>>>, impl Fn(&str) -> Box<dyn Fn(&String)>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let log2 = Rc::clone(&log);
        let make = move |tag: &str| -> Box<dyn Fn(&String)> {
            let log = Rc::clone(&log2);
            let tag = tag.to_string();
            Box::new(move |v: &String| log.borrow_mut().push(format!("{}:{}", tag, v)))
        };
        (log, make)
    }

    #[test]
    fn test_listeners_fire_in_order_on_every_publish() {
        let bus: EventBus<String> = EventBus::new(None);
        let (log, make) = recorder();
        let sub = bus.subscribe("t");
        let a = make("a");
        let b = make("b");
        sub.on_resolve(move |v| a(v)).on_resolve(move |v| b(v));

        bus.publish("t", &"1".to_string());
        bus.publish("t", &"2".to_string());

        assert_eq!(*log.borrow(), vec!["a:1", "b:1", "a:2", "b:2"]);
    }

    #[test]
    fn test_reject_uses_reject_listeners() {
        let bus: EventBus<String> = EventBus::new(Some("sink".into()));
        let (log, make) = recorder();
        let ok = make("ok");
        let err = make("err");
        let sink = make("sink");
        bus.subscribe("t").on_resolve(move |v| ok(v)).on_reject(move |v| err(v));
        bus.subscribe("sink").on_resolve(move |v| sink(v));

        bus.publish_failure("t", &"x".to_string());

        assert_eq!(*log.borrow(), vec!["err:x"]);
    }

    #[test]
    fn test_reject_without_listener_goes_to_sink() {
        let bus: EventBus<String> = EventBus::new(Some("sink".into()));
        let (log, make) = recorder();
        let sink = make("sink");
        bus.subscribe("sink").on_resolve(move |v| sink(v));

        bus.publish_failure("nobody", &"lost".to_string());

        assert_eq!(*log.borrow(), vec!["sink:lost"]);
    }

    #[test]
    fn test_nested_publish_is_depth_first() {
        let bus: EventBus<String> = EventBus::new(None);
        let (log, make) = recorder();
        let inner = bus.clone();
        let first = make("first");
        let second = make("second");
        let nested = make("nested");
        bus.subscribe("outer").on_resolve(move |v| {
            first(v);
            inner.publish("inner", &format!("{}!", v));
        });
        bus.subscribe("outer").on_resolve(move |v| second(v));
        bus.subscribe("inner").on_resolve(move |v| nested(v));

        bus.publish("outer", &"go".to_string());

        assert_eq!(*log.borrow(), vec!["first:go", "nested:go!", "second:go"]);
    }

    #[test]
    fn test_subscribe_during_publish_applies_next_time() {
        let bus: EventBus<String> = EventBus::new(None);
        let count = Rc::new(RefCell::new(0));
        let handle = bus.clone();
        let c = Rc::clone(&count);
        bus.subscribe("t").on_resolve(move |_| {
            let c = Rc::clone(&c);
            handle.subscribe("t").on_resolve(move |_| *c.borrow_mut() += 1);
        });

        bus.publish("t", &String::new());
        assert_eq!(*count.borrow(), 0);
        assert_eq!(bus.listener_count("t"), (2, 0));
    }
}
