use serde::{Deserialize, Serialize};

use crate::error::MarqueeError;
use crate::marquee::model::{CropRect, SelectionBox};
use crate::marquee::session::{Session, SurfaceId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionAction {
    Submit,
    Cancel,
}

/// The user's final answer for a paused execution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    Submit(SelectionBox),
    Cancel,
}

impl Decision {
    pub fn action(&self) -> DecisionAction {
        match self {
            Decision::Submit(_) => DecisionAction::Submit,
            Decision::Cancel => DecisionAction::Cancel,
        }
    }

    pub fn payload(&self, session: &Session) -> DecisionPayload {
        DecisionPayload {
            node_id: session.node_id().to_string(),
            token: session.token().to_string(),
            action: self.action(),
            crop_data: match self {
                Decision::Submit(rect) => Some(rect.rounded()),
                Decision::Cancel => None,
            },
        }
    }
}

/// JSON body posted to the resume endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionPayload {
    pub node_id: String,
    pub token: String,
    pub action: DecisionAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crop_data: Option<CropRect>,
}

/// Identifies one activation of a surface. Results carrying an older
/// generation belong to a replaced session and are dropped.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SurfaceTicket {
    pub surface: SurfaceId,
    pub generation: u64,
}

/// A decision the overlay wants sent, produced when the user confirms or exits.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionRequest {
    pub session: Session,
    pub decision: Decision,
}

/// Decoded preview pixels, RGBA8.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WorkerToOverlay {
    ImageLoaded {
        ticket: SurfaceTicket,
        image: PreviewImage,
    },
    ImageFailed {
        ticket: SurfaceTicket,
        error: MarqueeError,
    },
    DecisionFinished {
        ticket: SurfaceTicket,
        action: DecisionAction,
        result: Result<(), MarqueeError>,
    },
}

impl WorkerToOverlay {
    pub fn ticket(&self) -> &SurfaceTicket {
        match self {
            Self::ImageLoaded { ticket, .. }
            | Self::ImageFailed { ticket, .. }
            | Self::DecisionFinished { ticket, .. } => ticket,
        }
    }
}
