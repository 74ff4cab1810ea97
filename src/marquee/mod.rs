//! Region-selection overlay shown while a graph node waits for a crop.

pub mod activation;
pub mod controller;
pub mod coords;
pub mod input;
pub mod messages;
pub mod model;
pub mod overlay;
pub mod protocol;
pub mod registry;
pub mod service;
pub mod session;
pub mod state;

pub use activation::{ActivationEvent, ActivationListener, MarqueePresenter, MARQUEE_SHOW_EVENT};
pub use controller::{Completion, MarqueeController};
pub use coords::{CoordinateMapper, DisplayBounds, DisplayConfig};
pub use messages::{Decision, DecisionAction, DecisionPayload};
pub use model::{Corner, CropRect, ImageSize, SelectionBox, SelectionModel};
pub use overlay::{MarqueeOverlay, OverlayLayout};
pub use protocol::{Endpoints, HttpTransport, ReqwestTransport, ResumeClient};
pub use registry::OverlayRegistry;
pub use service::MarqueeService;
pub use session::{ImageRef, MarqueeMode, NodeId, Session, SurfaceId};
pub use state::SessionPhase;
