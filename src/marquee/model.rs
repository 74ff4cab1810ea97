use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Side of the initial selection square when the image is large enough.
pub const DEFAULT_INITIAL_SIDE: f32 = 512.0;

/// Smallest width or height a selection may have, in source pixels.
const MIN_SIDE: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Corner {
    Nw,
    Ne,
    Sw,
    Se,
}

impl Corner {
    pub const ALL: [Corner; 4] = [Corner::Nw, Corner::Ne, Corner::Sw, Corner::Se];

    pub fn as_str(self) -> &'static str {
        match self {
            Corner::Nw => "nw",
            Corner::Ne => "ne",
            Corner::Sw => "sw",
            Corner::Se => "se",
        }
    }

    fn west(self) -> bool {
        matches!(self, Corner::Nw | Corner::Sw)
    }

    fn north(self) -> bool {
        matches!(self, Corner::Nw | Corner::Ne)
    }
}

impl fmt::Display for Corner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Corner {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nw" => Ok(Corner::Nw),
            "ne" => Ok(Corner::Ne),
            "sw" => Ok(Corner::Sw),
            "se" => Ok(Corner::Se),
            other => Err(format!("unknown corner '{other}'")),
        }
    }
}

/// Natural size of the source image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageSize {
    pub width: f32,
    pub height: f32,
}

impl ImageSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1) as f32,
            height: height.max(1) as f32,
        }
    }
}

/// Selection rectangle in source-image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SelectionBox {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl SelectionBox {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    pub fn contains(&self, (px, py): (f32, f32)) -> bool {
        px >= self.x && px <= self.right() && py >= self.y && py <= self.bottom()
    }

    /// Integer rectangle as submitted to the server. Each field is rounded
    /// on its own, half away from zero.
    pub fn rounded(&self) -> CropRect {
        CropRect {
            x: self.x.round() as i64,
            y: self.y.round() as i64,
            w: self.w.round() as i64,
            h: self.h.round() as i64,
        }
    }
}

/// Integer crop rectangle sent with a submit decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRect {
    pub x: i64,
    pub y: i64,
    pub w: i64,
    pub h: i64,
}

/// Selection box bound to an image, keeping the box inside it at all times.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionModel {
    rect: SelectionBox,
    image: ImageSize,
}

impl SelectionModel {
    /// Centred square of side `min(512, width, height)`.
    pub fn create(image_width: u32, image_height: u32) -> Self {
        Self::with_initial_side(image_width, image_height, DEFAULT_INITIAL_SIDE)
    }

    pub fn with_initial_side(image_width: u32, image_height: u32, side: f32) -> Self {
        let image = ImageSize::new(image_width, image_height);
        let side = side.max(MIN_SIDE).min(image.width).min(image.height);
        let mut model = Self {
            rect: SelectionBox {
                x: ((image.width - side) / 2.0).floor(),
                y: ((image.height - side) / 2.0).floor(),
                w: side,
                h: side,
            },
            image,
        };
        model.clamp();
        model
    }

    pub fn rect(&self) -> SelectionBox {
        self.rect
    }

    pub fn image(&self) -> ImageSize {
        self.image
    }

    /// Replace the rectangle, then clamp it.
    pub fn set_rect(&mut self, rect: SelectionBox) {
        self.rect = rect;
        self.clamp();
    }

    pub fn translate(&mut self, dx: f32, dy: f32) {
        self.rect.x += dx;
        self.rect.y += dy;
        self.clamp();
    }

    /// Move the edges named by `corner` by the given real-space deltas.
    ///
    /// The opposite edges stay where they are; a moving edge stops at the
    /// image border and never crosses within 1px of its opposite edge.
    pub fn resize_from_corner(&mut self, corner: Corner, dx: f32, dy: f32) {
        let SelectionBox { x, y, w, h } = self.rect;
        let (mut left, mut right) = (x, x + w);
        let (mut top, mut bottom) = (y, y + h);

        if corner.west() {
            left = (left + dx).min(right - MIN_SIDE).max(0.0);
        } else {
            right = (right + dx).max(left + MIN_SIDE).min(self.image.width);
        }
        if corner.north() {
            top = (top + dy).min(bottom - MIN_SIDE).max(0.0);
        } else {
            bottom = (bottom + dy).max(top + MIN_SIDE).min(self.image.height);
        }

        self.rect = SelectionBox {
            x: left,
            y: top,
            w: right - left,
            h: bottom - top,
        };
        self.clamp();
    }

    /// Put the centre of the box at `(cx, cy)`, keeping its size.
    pub fn center_on(&mut self, cx: f32, cy: f32) {
        self.rect.x = cx - self.rect.w / 2.0;
        self.rect.y = cy - self.rect.h / 2.0;
        self.clamp();
    }

    /// Enforce the box invariants: size first, then position.
    pub fn clamp(&mut self) {
        let r = &mut self.rect;
        if !r.w.is_finite() || r.w < MIN_SIDE {
            r.w = MIN_SIDE;
        }
        if !r.h.is_finite() || r.h < MIN_SIDE {
            r.h = MIN_SIDE;
        }
        r.w = r.w.min(self.image.width);
        r.h = r.h.min(self.image.height);

        if !r.x.is_finite() {
            r.x = 0.0;
        }
        if !r.y.is_finite() {
            r.y = 0.0;
        }
        r.x = r.x.max(0.0).min(self.image.width - r.w);
        r.y = r.y.max(0.0).min(self.image.height - r.h);
    }

    /// `x ≥ 0`, `y ≥ 0`, `w ≥ 1`, `h ≥ 1` and the box lies inside the image.
    pub fn holds_invariants(&self) -> bool {
        let r = self.rect;
        r.w >= MIN_SIDE
            && r.h >= MIN_SIDE
            && r.x >= 0.0
            && r.y >= 0.0
            && r.right() <= self.image.width
            && r.bottom() <= self.image.height
    }
}
