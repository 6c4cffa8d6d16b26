use super::{Document, NodeId};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tracing::debug;

pub type EventHandler = Rc<dyn Fn(&Rc<Event>)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

pub(super) struct Listener {
    id: ListenerId,
    event_type: String,
    handler: EventHandler,
    once: bool,
}

/// A dispatched event. Flags are interior-mutable so handlers can stop
/// propagation or cancel through a shared reference.
#[derive(Debug)]
pub struct Event {
    event_type: String,
    key: Option<String>,
    target: Cell<Option<NodeId>>,
    current_target: Cell<Option<NodeId>>,
    propagation_stopped: Cell<bool>,
    default_prevented: Cell<bool>,
    detail: RefCell<Option<serde_json::Value>>,
}

impl Event {
    pub fn new(event_type: impl Into<String>) -> Rc<Self> {
        Rc::new(Self::build(event_type.into(), None))
    }

    /// A keyboard event carrying `key` (`"Enter"`, `"Escape"`, `"a"`, ...)
    pub fn key(event_type: impl Into<String>, key: impl Into<String>) -> Rc<Self> {
        Rc::new(Self::build(event_type.into(), Some(key.into())))
    }

    fn build(event_type: String, key: Option<String>) -> Self {
        Self {
            event_type,
            key,
            target: Cell::new(None),
            current_target: Cell::new(None),
            propagation_stopped: Cell::new(false),
            default_prevented: Cell::new(false),
            detail: RefCell::new(None),
        }
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn key_name(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn target(&self) -> Option<NodeId> {
        self.target.get()
    }

    pub fn current_target(&self) -> Option<NodeId> {
        self.current_target.get()
    }

    pub fn stop_propagation(&self) {
        self.propagation_stopped.set(true);
    }

    pub fn prevent_default(&self) {
        self.default_prevented.set(true);
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented.get()
    }

    pub fn set_detail(&self, detail: serde_json::Value) {
        *self.detail.borrow_mut() = Some(detail);
    }

    pub fn detail(&self) -> Option<serde_json::Value> {
        self.detail.borrow().clone()
    }
}

impl Document {
    pub fn add_event_listener(
        &self,
        node: NodeId,
        event_type: &str,
        handler: EventHandler,
        once: bool,
    ) -> ListenerId {
        let id = ListenerId(self.next_listener.get());
        self.next_listener.set(id.0 + 1);
        self.listeners
            .borrow_mut()
            .entry(node)
            .or_default()
            .push(Listener {
                id,
                event_type: event_type.to_string(),
                handler,
                once,
            });
        id
    }

    pub fn remove_event_listener(&self, node: NodeId, id: ListenerId) {
        if let Some(listeners) = self.listeners.borrow_mut().get_mut(&node) {
            listeners.retain(|listener| listener.id != id);
        }
    }

    pub fn listener_count(&self, node: NodeId) -> usize {
        self.listeners
            .borrow()
            .get(&node)
            .map_or(0, |listeners| listeners.len())
    }

    /// Deliver `event` to `target` and then to each ancestor until
    /// propagation is stopped. Returns `false` when a handler cancelled it.
    pub fn dispatch_event(&self, target: NodeId, event: &Rc<Event>) -> bool {
        event.target.set(Some(target));
        debug!(event = %event.event_type, node = target.index(), "Dispatching event");

        let mut current = Some(target);
        while let Some(node) = current {
            event.current_target.set(Some(node));

            let handlers: Vec<EventHandler> = {
                let mut listeners = self.listeners.borrow_mut();
                match listeners.get_mut(&node) {
                    Some(list) => {
                        let matching = list
                            .iter()
                            .filter(|l| l.event_type == event.event_type)
                            .map(|l| l.handler.clone())
                            .collect();
                        list.retain(|l| !(l.once && l.event_type == event.event_type));
                        matching
                    }
                    None => Vec::new(),
                }
            };
            for handler in handlers {
                handler(event);
            }

            if event.propagation_stopped.get() {
                break;
            }
            current = self.parent(node);
        }

        event.current_target.set(None);
        !event.default_prevented.get()
    }
}
