use eframe::egui;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::mpsc::{Receiver, TryRecvError};

use crate::host::{EventBus, HostEventKind, HostMessage, NodeDirectory};
use crate::marquee::activation::ActivationListener;
use crate::marquee::overlay::MarqueeOverlay;
use crate::marquee::service::MarqueeService;
use crate::settings::Settings;

/// Top-level window: keeps the node directory in sync with the host and
/// shows a marquee overlay whenever a node asks for one.
pub struct MarqueeApp {
    overlay: MarqueeOverlay,
    activation: ActivationListener<Rc<RefCell<NodeDirectory>>>,
    nodes: Rc<RefCell<NodeDirectory>>,
    bus: EventBus,
    messages: Receiver<HostMessage>,
    host_connected: bool,
}

impl MarqueeApp {
    pub fn new(settings: &Settings, service: MarqueeService, messages: Receiver<HostMessage>) -> Self {
        let nodes = Rc::new(RefCell::new(NodeDirectory::default()));
        let mut bus = EventBus::default();

        let dir = nodes.clone();
        bus.subscribe(HostEventKind::NodeAdded, move |msg| {
            if let HostMessage::NodeAdded(node) = msg {
                tracing::debug!(node = %node.id, title = %node.title, "node added");
                dir.borrow_mut().insert(node.clone());
            }
        });
        let dir = nodes.clone();
        bus.subscribe(HostEventKind::NodeRemoved, move |msg| {
            if let HostMessage::NodeRemoved { node_id } = msg {
                if dir.borrow_mut().remove(node_id).is_none() {
                    tracing::debug!(node = %node_id, "removal of unknown node ignored");
                }
            }
        });
        let dir = nodes.clone();
        bus.subscribe(HostEventKind::ModeChanged, move |msg| {
            if let HostMessage::ModeChanged { node_id, mode } = msg {
                dir.borrow_mut().set_mode(node_id, *mode);
            }
        });
        bus.subscribe(HostEventKind::Executed, |msg| {
            if let HostMessage::Executed { node_id } = msg {
                tracing::debug!(node = %node_id, "node executed");
            }
        });
        bus.subscribe(HostEventKind::Configured, |msg| {
            if let HostMessage::Configured { node_id } = msg {
                tracing::debug!(node = %node_id, "node configured");
            }
        });

        Self {
            overlay: MarqueeOverlay::new(service, settings.layout()),
            activation: ActivationListener::new(nodes.clone(), settings.force_multiple_of_8),
            nodes,
            bus,
            messages,
            host_connected: true,
        }
    }

    pub fn overlay(&self) -> &MarqueeOverlay {
        &self.overlay
    }

    pub fn node_count(&self) -> usize {
        self.nodes.borrow().len()
    }

    pub fn handle_message(&mut self, message: HostMessage) {
        self.bus.dispatch(&message);
        if let HostMessage::MarqueeShow(event) = message {
            // Unknown nodes are already logged by the listener.
            let _ = self.activation.handle(event, &mut self.overlay);
        }
    }

    fn poll_host(&mut self) {
        loop {
            match self.messages.try_recv() {
                Ok(message) => self.handle_message(message),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if self.host_connected {
                        tracing::info!("host message stream ended");
                        self.host_connected = false;
                    }
                    break;
                }
            }
        }
    }

    pub fn ui(&mut self, ctx: &egui::Context) {
        self.poll_host();

        egui::CentralPanel::default().show(ctx, |ui| {
            if self.overlay.is_idle() {
                ui.centered_and_justified(|ui| {
                    let text = if self.host_connected {
                        format!("Waiting for a marquee node ({} nodes known)", self.node_count())
                    } else {
                        "Host disconnected".to_string()
                    };
                    ui.weak(text);
                });
            }
        });
        self.overlay.ui(ctx);
    }
}

impl eframe::App for MarqueeApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.ui(ctx);
    }
}
