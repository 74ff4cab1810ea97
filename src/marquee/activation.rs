use serde::Deserialize;

use crate::error::MarqueeError;
use crate::host::NodeRegistry;
use crate::marquee::session::{string_or_number, ImageRef, MarqueeMode, NodeId, Session};

/// Host event type announcing a paused marquee node.
pub const MARQUEE_SHOW_EVENT: &str = "flow_assistor_marquee_show";

fn default_max_resolution() -> u32 {
    1024
}

/// Payload of a marquee activation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ActivationEvent {
    pub node_id: NodeId,
    pub filename: String,
    #[serde(default = "default_max_resolution")]
    pub max_resolution: u32,
    #[serde(default)]
    pub original_size: bool,
    #[serde(deserialize_with = "string_or_number")]
    pub token: String,
}

/// Whatever shows the overlay for a resolved activation.
pub trait MarqueePresenter {
    fn open_session(&mut self, session: Session, image: ImageRef, mode: MarqueeMode);
}

/// Turns activation events into sessions on a presenter.
pub struct ActivationListener<R> {
    registry: R,
    force_multiple_of_8: bool,
}

impl<R: NodeRegistry> ActivationListener<R> {
    pub fn new(registry: R, force_multiple_of_8: bool) -> Self {
        Self {
            registry,
            force_multiple_of_8,
        }
    }

    /// Resolve the event's node and open a session for it.
    ///
    /// Activations for nodes the host does not know are dropped; they are
    /// never retried.
    pub fn handle(
        &self,
        event: ActivationEvent,
        presenter: &mut dyn MarqueePresenter,
    ) -> Result<Session, MarqueeError> {
        let Some(node) = self.registry.resolve(&event.node_id) else {
            tracing::warn!(node = %event.node_id, "marquee activation for unknown node dropped");
            return Err(MarqueeError::ActivationUnresolvable {
                node_id: event.node_id.to_string(),
            });
        };

        let session = Session::new(event.node_id, event.token);
        let mode = MarqueeMode {
            original_size: event.original_size,
            max_resolution: event.max_resolution,
            force_multiple_of_8: self.force_multiple_of_8,
        };
        tracing::info!(
            node = %session.node_id(),
            title = %node.title,
            filename = %event.filename,
            "opening marquee session"
        );
        presenter.open_session(session.clone(), ImageRef::temp(event.filename), mode);
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{NodeDirectory, NodeHandle};

    #[derive(Default)]
    struct RecordingPresenter {
        opened: Vec<(Session, ImageRef, MarqueeMode)>,
    }

    impl MarqueePresenter for RecordingPresenter {
        fn open_session(&mut self, session: Session, image: ImageRef, mode: MarqueeMode) {
            self.opened.push((session, image, mode));
        }
    }

    fn event(json: serde_json::Value) -> ActivationEvent {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn resolved_activation_opens_session() {
        let mut dir = NodeDirectory::default();
        dir.insert(NodeHandle::new(NodeId::from(8), "Visual Marquee"));
        let listener = ActivationListener::new(dir, true);
        let mut presenter = RecordingPresenter::default();

        let session = listener
            .handle(
                event(serde_json::json!({
                    "node_id": 8,
                    "filename": "marquee_preview_8.png",
                    "max_resolution": 2048,
                    "original_size": false,
                    "token": "f00d"
                })),
                &mut presenter,
            )
            .unwrap();

        assert_eq!(session, Session::new(NodeId::from(8), "f00d"));
        let (opened, image, mode) = &presenter.opened[0];
        assert_eq!(opened, &session);
        assert_eq!(image, &ImageRef::temp("marquee_preview_8.png"));
        assert_eq!(image.kind, "temp");
        assert_eq!(mode.max_resolution, 2048);
        assert!(!mode.original_size);
    }

    #[test]
    fn unknown_node_is_dropped() {
        let listener = ActivationListener::new(NodeDirectory::default(), true);
        let mut presenter = RecordingPresenter::default();
        let err = listener
            .handle(
                event(serde_json::json!({
                    "node_id": "99",
                    "filename": "x.png",
                    "token": "t"
                })),
                &mut presenter,
            )
            .unwrap_err();
        assert_eq!(
            err,
            MarqueeError::ActivationUnresolvable {
                node_id: "99".into()
            }
        );
        assert!(presenter.opened.is_empty());
    }

    #[test]
    fn missing_optional_fields_use_defaults() {
        let ev = event(serde_json::json!({
            "node_id": "3",
            "filename": "x.png",
            "token": 12345
        }));
        assert_eq!(ev.max_resolution, 1024);
        assert!(!ev.original_size);
        assert_eq!(ev.token, "12345");
    }
}
