use crate::error::MarqueeError;

/// Maps between source-image pixels and on-screen pixels for one scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateMapper {
    scale: f32,
}

impl CoordinateMapper {
    pub fn new(scale: f32) -> Self {
        debug_assert!(scale > 0.0, "scale must be positive");
        Self { scale }
    }

    pub fn scale(self) -> f32 {
        self.scale
    }

    pub fn to_display(self, real: f32) -> f32 {
        real * self.scale
    }

    pub fn to_real(self, display: f32) -> f32 {
        display / self.scale
    }

    pub fn point_to_display(self, (x, y): (f32, f32)) -> (f32, f32) {
        (self.to_display(x), self.to_display(y))
    }

    pub fn point_to_real(self, (x, y): (f32, f32)) -> (f32, f32) {
        (self.to_real(x), self.to_real(y))
    }
}

/// Largest area the preview may occupy on screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayBounds {
    pub max_width: f32,
    pub max_height: f32,
}

impl DisplayBounds {
    /// Bounds derived from the viewport: a fraction of it, capped per axis.
    pub fn from_viewport(
        viewport: (f32, f32),
        fraction: f32,
        cap_width: f32,
        cap_height: f32,
    ) -> Self {
        Self {
            max_width: (viewport.0 * fraction).min(cap_width).max(1.0),
            max_height: (viewport.1 * fraction).min(cap_height).max(1.0),
        }
    }
}

/// Scale and on-screen size of a loaded preview. Computed once per image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayConfig {
    pub scale: f32,
    pub display_width: f32,
    pub display_height: f32,
    pub natural_width: u32,
    pub natural_height: u32,
}

impl DisplayConfig {
    /// Fit an image of the given natural size into `bounds`, never upscaling.
    pub fn fit(
        natural_width: u32,
        natural_height: u32,
        bounds: DisplayBounds,
    ) -> Result<Self, MarqueeError> {
        if natural_width == 0 || natural_height == 0 {
            return Err(MarqueeError::InvalidImage(format!(
                "image has no pixels ({natural_width}x{natural_height})"
            )));
        }
        let w = natural_width as f32;
        let h = natural_height as f32;
        let scale = (bounds.max_width / w).min(bounds.max_height / h).min(1.0);
        Ok(Self {
            scale,
            display_width: w * scale,
            display_height: h * scale,
            natural_width,
            natural_height,
        })
    }

    pub fn mapper(&self) -> CoordinateMapper {
        CoordinateMapper::new(self.scale)
    }
}
