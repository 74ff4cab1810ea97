use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::marquee::model::CropRect;

/// Storage kind the server writes marquee previews to.
pub const TEMP_STORAGE: &str = "temp";

const SURFACE_PREFIX: &str = "marquee_editor_";

/// Graph node identifier as announced by the host.
///
/// The host sends ids either as JSON strings or numbers; both are normalised
/// to their string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric value of the id when the host uses integer ids.
    pub fn as_numeric(&self) -> Option<i64> {
        self.0.parse().ok()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<i64> for NodeId {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        string_or_number(deserializer).map(NodeId::new)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    Text(String),
    Signed(i64),
    Unsigned(u64),
    Float(f64),
}

/// Accept a JSON string or number and keep its textual form.
pub(crate) fn string_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<String, D::Error> {
    Ok(match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::Text(s) => s,
        StringOrNumber::Signed(n) => n.to_string(),
        StringOrNumber::Unsigned(n) => n.to_string(),
        StringOrNumber::Float(n) => n.to_string(),
    })
}

/// Stable identifier of the overlay surface shown for one node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(String);

impl SurfaceId {
    pub fn for_node(node_id: &NodeId) -> Self {
        Self(format!("{SURFACE_PREFIX}{node_id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One paused execution waiting for a decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    node_id: NodeId,
    token: String,
}

impl Session {
    pub fn new(node_id: NodeId, token: impl Into<String>) -> Self {
        Self {
            node_id,
            token: token.into(),
        }
    }

    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn surface_id(&self) -> SurfaceId {
        SurfaceId::for_node(&self.node_id)
    }
}

/// Location of the preview image on the server's file endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub filename: String,
    pub kind: String,
    pub subfolder: String,
}

impl ImageRef {
    pub fn temp(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            kind: TEMP_STORAGE.into(),
            subfolder: String::new(),
        }
    }
}

/// How the server will turn the submitted rectangle into its output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarqueeMode {
    pub original_size: bool,
    pub max_resolution: u32,
    pub force_multiple_of_8: bool,
}

impl MarqueeMode {
    pub fn describe(&self) -> String {
        if self.original_size {
            "Mode: Original size (outputs exact selection)".into()
        } else {
            format!(
                "Mode: Upscale to max_resolution ({}px)",
                self.max_resolution
            )
        }
    }

    /// Size of the image the server will produce for `crop`.
    pub fn output_size(&self, crop: &CropRect) -> (i64, i64) {
        let w = crop.w.max(1);
        let h = crop.h.max(1);
        if self.original_size || self.max_resolution == 0 {
            return (w, h);
        }
        let scale = self.max_resolution as f64 / w.max(h) as f64;
        let mut out_w = ((w as f64 * scale).round() as i64).max(1);
        let mut out_h = ((h as f64 * scale).round() as i64).max(1);
        if self.force_multiple_of_8 {
            out_w = ((out_w / 8) * 8).max(8);
            out_h = ((out_h / 8) * 8).max(8);
        }
        (out_w, out_h)
    }
}
