use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::io::BufRead;
use std::rc::Rc;
use std::sync::mpsc::{channel, Receiver};
use std::thread;

use crate::marquee::activation::ActivationEvent;
use crate::marquee::session::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeMode {
    #[default]
    Always,
    Never,
    Bypass,
}

/// A live graph node as the host describes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeHandle {
    pub id: NodeId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub mode: NodeMode,
}

impl NodeHandle {
    pub fn new(id: NodeId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            mode: NodeMode::Always,
        }
    }
}

/// Lookup of live nodes by id, provided by the host.
pub trait NodeRegistry {
    fn resolve(&self, id: &NodeId) -> Option<NodeHandle>;
}

impl<R: NodeRegistry> NodeRegistry for Rc<RefCell<R>> {
    fn resolve(&self, id: &NodeId) -> Option<NodeHandle> {
        self.borrow().resolve(id)
    }
}

/// In-memory node registry kept up to date from host messages.
#[derive(Debug, Default)]
pub struct NodeDirectory {
    nodes: BTreeMap<NodeId, NodeHandle>,
}

impl NodeDirectory {
    pub fn insert(&mut self, node: NodeHandle) -> Option<NodeHandle> {
        self.nodes.insert(node.id.clone(), node)
    }

    pub fn remove(&mut self, id: &NodeId) -> Option<NodeHandle> {
        let key = self.resolve(id)?.id;
        self.nodes.remove(&key)
    }

    pub fn set_mode(&mut self, id: &NodeId, mode: NodeMode) -> bool {
        let Some(key) = self.resolve(id).map(|n| n.id) else {
            return false;
        };
        match self.nodes.get_mut(&key) {
            Some(node) => {
                node.mode = mode;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl NodeRegistry for NodeDirectory {
    /// Numeric ids are compared by value first so `"07"` finds node `7`;
    /// anything else falls back to exact string comparison.
    fn resolve(&self, id: &NodeId) -> Option<NodeHandle> {
        if let Some(numeric) = id.as_numeric() {
            if let Some(node) = self
                .nodes
                .values()
                .find(|n| n.id.as_numeric() == Some(numeric))
            {
                return Some(node.clone());
            }
        }
        self.nodes.get(id).cloned()
    }
}

/// Messages the host pushes to the overlay process, one JSON object each.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum HostMessage {
    #[serde(rename = "flow_assistor_marquee_show")]
    MarqueeShow(ActivationEvent),
    NodeAdded(NodeHandle),
    NodeRemoved { node_id: NodeId },
    Executed { node_id: NodeId },
    Configured { node_id: NodeId },
    ModeChanged { node_id: NodeId, mode: NodeMode },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HostEventKind {
    MarqueeShow,
    NodeAdded,
    NodeRemoved,
    Executed,
    Configured,
    ModeChanged,
}

impl HostMessage {
    pub fn parse(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }

    pub fn kind(&self) -> HostEventKind {
        match self {
            Self::MarqueeShow(_) => HostEventKind::MarqueeShow,
            Self::NodeAdded(_) => HostEventKind::NodeAdded,
            Self::NodeRemoved { .. } => HostEventKind::NodeRemoved,
            Self::Executed { .. } => HostEventKind::Executed,
            Self::Configured { .. } => HostEventKind::Configured,
            Self::ModeChanged { .. } => HostEventKind::ModeChanged,
        }
    }
}

type Handler = Box<dyn FnMut(&HostMessage)>;

/// Dispatches host messages to every handler registered for their kind,
/// in registration order.
#[derive(Default)]
pub struct EventBus {
    handlers: BTreeMap<HostEventKind, Vec<Handler>>,
}

impl EventBus {
    pub fn subscribe(&mut self, kind: HostEventKind, handler: impl FnMut(&HostMessage) + 'static) {
        self.handlers
            .entry(kind)
            .or_default()
            .push(Box::new(handler));
    }

    /// Returns how many handlers saw the message.
    pub fn dispatch(&mut self, message: &HostMessage) -> usize {
        let Some(handlers) = self.handlers.get_mut(&message.kind()) else {
            return 0;
        };
        for handler in handlers.iter_mut() {
            handler(message);
        }
        handlers.len()
    }
}

/// Read host messages line by line on a background thread.
///
/// Blank lines are skipped and malformed lines are logged and skipped. The
/// channel closes when the reader reaches end of input.
pub fn spawn_message_reader<R>(
    reader: R,
    notify: impl Fn() + Send + 'static,
) -> Receiver<HostMessage>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = channel();
    let spawned = thread::Builder::new()
        .name("host-messages".into())
        .spawn(move || {
            for line in reader.lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(err) => {
                        tracing::error!(error = %err, "failed to read host message");
                        break;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }
                match HostMessage::parse(&line) {
                    Ok(message) => {
                        if tx.send(message).is_err() {
                            break;
                        }
                        notify();
                    }
                    Err(err) => tracing::warn!(error = %err, "ignoring malformed host message"),
                }
            }
            tracing::debug!("host message stream closed");
        });
    if let Err(err) = spawned {
        tracing::error!(error = %err, "failed to spawn host message reader");
    }
    rx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_ids_resolve_by_value() {
        let mut dir = NodeDirectory::default();
        dir.insert(NodeHandle::new(NodeId::from(7), "Marquee"));
        dir.insert(NodeHandle::new(NodeId::from("12:4"), "Grouped"));

        assert_eq!(dir.resolve(&NodeId::from("07")).unwrap().title, "Marquee");
        assert_eq!(dir.resolve(&NodeId::from("12:4")).unwrap().title, "Grouped");
        assert!(dir.resolve(&NodeId::from(8)).is_none());

        assert!(dir.set_mode(&NodeId::from(7), NodeMode::Bypass));
        assert_eq!(dir.resolve(&NodeId::from(7)).unwrap().mode, NodeMode::Bypass);
        assert!(dir.remove(&NodeId::from("7")).is_some());
        assert_eq!(dir.len(), 1);
    }

    #[test]
    fn host_messages_parse_from_envelopes() {
        let msg = HostMessage::parse(
            r#"{"type":"flow_assistor_marquee_show","data":{"node_id":5,"filename":"a.png","max_resolution":1024,"original_size":true,"token":"abc"}}"#,
        )
        .unwrap();
        assert_eq!(msg.kind(), HostEventKind::MarqueeShow);

        let msg = HostMessage::parse(r#"{"type":"node_added","data":{"id":5,"title":"Marquee"}}"#)
            .unwrap();
        assert_eq!(
            msg,
            HostMessage::NodeAdded(NodeHandle::new(NodeId::from(5), "Marquee"))
        );

        let msg =
            HostMessage::parse(r#"{"type":"mode_changed","data":{"node_id":"5","mode":"bypass"}}"#)
                .unwrap();
        assert_eq!(msg.kind(), HostEventKind::ModeChanged);

        assert!(HostMessage::parse(r#"{"type":"unknown","data":{}}"#).is_err());
    }

    #[test]
    fn every_subscriber_sees_its_kind() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut bus = EventBus::default();
        for tag in ["first", "second"] {
            let seen = seen.clone();
            bus.subscribe(HostEventKind::Executed, move |msg| {
                if let HostMessage::Executed { node_id } = msg {
                    seen.borrow_mut().push(format!("{tag}:{node_id}"));
                }
            });
        }

        let delivered = bus.dispatch(&HostMessage::Executed {
            node_id: NodeId::from(3),
        });
        assert_eq!(delivered, 2);
        assert_eq!(*seen.borrow(), vec!["first:3", "second:3"]);

        let ignored = bus.dispatch(&HostMessage::Configured {
            node_id: NodeId::from(3),
        });
        assert_eq!(ignored, 0);
    }

    #[test]
    fn reader_skips_blank_and_malformed_lines() {
        let input = "\n{not json}\n{\"type\":\"node_removed\",\"data\":{\"node_id\":4}}\n";
        let rx = spawn_message_reader(std::io::Cursor::new(input.to_string()), || {});
        let messages: Vec<HostMessage> = rx.iter().collect();
        assert_eq!(
            messages,
            vec![HostMessage::NodeRemoved {
                node_id: NodeId::from(4)
            }]
        );
    }
}
