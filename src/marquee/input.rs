use crate::marquee::coords::CoordinateMapper;
use crate::marquee::model::{Corner, SelectionBox, SelectionModel};

/// Edge length of the square resize handles, in display pixels.
pub const HANDLE_SIZE: f32 = 12.0;

/// What a pointer-down landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerTarget {
    Handle(Corner),
    Body,
    Image,
    Outside,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interaction {
    Idle,
    Dragging,
    Resizing(Corner),
}

impl Interaction {
    pub fn is_active(self) -> bool {
        !matches!(self, Interaction::Idle)
    }
}

/// Listener the overlay keeps on the whole window rather than on the box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlobalListener {
    KeyDown,
    PointerMove,
    PointerUp,
}

/// Listeners a pointer interaction holds while it is active.
pub const INTERACTION_LISTENERS: [GlobalListener; 2] =
    [GlobalListener::PointerMove, GlobalListener::PointerUp];

/// Display-space rectangle of a handle centred on `corner` of `rect`.
pub fn handle_rect(rect: SelectionBox, corner: Corner) -> SelectionBox {
    let half = HANDLE_SIZE / 2.0;
    let cx = match corner {
        Corner::Nw | Corner::Sw => rect.x,
        Corner::Ne | Corner::Se => rect.right(),
    };
    let cy = match corner {
        Corner::Nw | Corner::Ne => rect.y,
        Corner::Sw | Corner::Se => rect.bottom(),
    };
    SelectionBox::new(cx - half, cy - half, HANDLE_SIZE, HANDLE_SIZE)
}

/// Classify a display-space point against the rendered box and image.
///
/// Handles are drawn above the body, so they win where they overlap it.
pub fn hit_test(display_box: SelectionBox, image: (f32, f32), point: (f32, f32)) -> PointerTarget {
    for corner in Corner::ALL {
        if handle_rect(display_box, corner).contains(point) {
            return PointerTarget::Handle(corner);
        }
    }
    if display_box.contains(point) {
        return PointerTarget::Body;
    }
    let (px, py) = point;
    if px >= 0.0 && py >= 0.0 && px <= image.0 && py <= image.1 {
        PointerTarget::Image
    } else {
        PointerTarget::Outside
    }
}

/// Pointer-driven editing of a [`SelectionModel`].
///
/// Positions are display pixels relative to the image's top-left corner.
/// Moves are applied to the box as it was when the interaction started, so
/// long drags do not accumulate rounding drift.
#[derive(Debug, Clone, PartialEq)]
pub struct MarqueeInputState {
    model: SelectionModel,
    mapper: CoordinateMapper,
    interaction: Interaction,
    start_pointer: (f32, f32),
    start_box: SelectionBox,
}

impl MarqueeInputState {
    pub fn new(model: SelectionModel, mapper: CoordinateMapper) -> Self {
        let start_box = model.rect();
        Self {
            model,
            mapper,
            interaction: Interaction::Idle,
            start_pointer: (0.0, 0.0),
            start_box,
        }
    }

    pub fn model(&self) -> &SelectionModel {
        &self.model
    }

    pub fn mapper(&self) -> CoordinateMapper {
        self.mapper
    }

    pub fn interaction(&self) -> Interaction {
        self.interaction
    }

    /// The selection box in display pixels.
    pub fn display_box(&self) -> SelectionBox {
        let r = self.model.rect();
        let m = self.mapper;
        SelectionBox::new(
            m.to_display(r.x),
            m.to_display(r.y),
            m.to_display(r.w),
            m.to_display(r.h),
        )
    }

    pub fn hit_test(&self, point: (f32, f32)) -> PointerTarget {
        let image = self.model.image();
        let extent = (
            self.mapper.to_display(image.width),
            self.mapper.to_display(image.height),
        );
        hit_test(self.display_box(), extent, point)
    }

    /// Returns `true` when the box changed or an interaction started.
    pub fn handle_pointer_down(&mut self, point: (f32, f32)) -> bool {
        if self.interaction.is_active() {
            // A down without the matching up means the release was missed.
            self.handle_pointer_up();
        }
        let target = self.hit_test(point);
        self.start_pointer = point;
        self.start_box = self.model.rect();

        match target {
            PointerTarget::Handle(corner) => {
                self.interaction = Interaction::Resizing(corner);
                tracing::debug!(corner = %corner, "marquee resize started");
                true
            }
            PointerTarget::Body => {
                self.interaction = Interaction::Dragging;
                tracing::debug!("marquee drag started");
                true
            }
            PointerTarget::Image => {
                let (cx, cy) = self.mapper.point_to_real(point);
                self.model.center_on(cx, cy);
                self.model.rect() != self.start_box
            }
            PointerTarget::Outside => false,
        }
    }

    pub fn handle_pointer_move(&mut self, point: (f32, f32)) -> bool {
        let dx = self.mapper.to_real(point.0 - self.start_pointer.0);
        let dy = self.mapper.to_real(point.1 - self.start_pointer.1);
        let before = self.model.rect();

        match self.interaction {
            Interaction::Idle => return false,
            Interaction::Dragging => {
                self.model.set_rect(self.start_box);
                self.model.translate(dx, dy);
            }
            Interaction::Resizing(corner) => {
                self.model.set_rect(self.start_box);
                self.model.resize_from_corner(corner, dx, dy);
            }
        }
        self.model.rect() != before
    }

    /// Ends any interaction. Returns `true` when one was active.
    pub fn handle_pointer_up(&mut self) -> bool {
        let was_active = self.interaction.is_active();
        if was_active {
            tracing::debug!(rect = ?self.model.rect(), "marquee interaction finished");
        }
        self.interaction = Interaction::Idle;
        was_active
    }

    /// Global listeners this interaction currently needs.
    pub fn held_listeners(&self) -> &'static [GlobalListener] {
        if self.interaction.is_active() {
            &INTERACTION_LISTENERS
        } else {
            &[]
        }
    }

    pub fn status_text(&self) -> String {
        let crop = self.model.rect().rounded();
        format!("Selection: {}x{}", crop.w, crop.h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(rect: SelectionBox, image: (u32, u32), scale: f32) -> MarqueeInputState {
        let mut model = SelectionModel::create(image.0, image.1);
        model.set_rect(rect);
        MarqueeInputState::new(model, CoordinateMapper::new(scale))
    }

    #[test]
    fn body_press_drags_with_scaled_deltas() {
        let mut state = input(SelectionBox::new(100.0, 100.0, 200.0, 200.0), (2000, 2000), 0.5);
        // Box occupies display (50,50)-(150,150).
        assert!(state.handle_pointer_down((100.0, 100.0)));
        assert_eq!(state.interaction(), Interaction::Dragging);
        assert_eq!(state.held_listeners(), &INTERACTION_LISTENERS);

        state.handle_pointer_move((110.0, 105.0));
        assert_eq!(state.model().rect(), SelectionBox::new(120.0, 110.0, 200.0, 200.0));
        state.handle_pointer_move((130.0, 100.0));
        assert_eq!(state.model().rect(), SelectionBox::new(160.0, 100.0, 200.0, 200.0));

        assert!(state.handle_pointer_up());
        assert_eq!(state.interaction(), Interaction::Idle);
        assert!(state.held_listeners().is_empty());
    }

    #[test]
    fn handle_press_resizes_from_that_corner() {
        let mut state = input(SelectionBox::new(10.0, 10.0, 100.0, 100.0), (1000, 1000), 1.0);
        assert!(state.handle_pointer_down((111.0, 108.0)));
        assert_eq!(state.interaction(), Interaction::Resizing(Corner::Se));

        state.handle_pointer_move((161.0, 128.0));
        assert_eq!(state.model().rect(), SelectionBox::new(10.0, 10.0, 150.0, 120.0));
    }

    #[test]
    fn handles_win_over_body_near_corners() {
        let state = input(SelectionBox::new(100.0, 100.0, 100.0, 100.0), (1000, 1000), 1.0);
        assert_eq!(state.hit_test((103.0, 103.0)), PointerTarget::Handle(Corner::Nw));
        assert_eq!(state.hit_test((197.0, 103.0)), PointerTarget::Handle(Corner::Ne));
        assert_eq!(state.hit_test((95.0, 205.0)), PointerTarget::Handle(Corner::Sw));
        assert_eq!(state.hit_test((150.0, 150.0)), PointerTarget::Body);
        assert_eq!(state.hit_test((500.0, 500.0)), PointerTarget::Image);
        assert_eq!(state.hit_test((-20.0, 500.0)), PointerTarget::Outside);
    }

    #[test]
    fn click_outside_box_recentres_and_stays_idle() {
        let mut state = input(SelectionBox::new(0.0, 0.0, 80.0, 80.0), (1000, 1000), 0.5);
        assert!(state.handle_pointer_down((200.0, 150.0)));
        assert_eq!(state.interaction(), Interaction::Idle);
        assert_eq!(state.model().rect(), SelectionBox::new(360.0, 260.0, 80.0, 80.0));
        assert!(!state.handle_pointer_move((300.0, 300.0)));
        assert!(!state.handle_pointer_up());
    }

    #[test]
    fn moves_are_relative_to_interaction_start() {
        let mut state = input(SelectionBox::new(100.0, 100.0, 100.0, 100.0), (1000, 1000), 0.3);
        let start = (45.0, 45.0);
        assert!(state.handle_pointer_down(start));
        for i in 1..=500 {
            let t = i as f32 * 0.1;
            state.handle_pointer_move((start.0 + t, start.1 + t));
        }
        state.handle_pointer_move((start.0 + 3.0, start.1 + 3.0));
        let rect = state.model().rect();
        assert!((rect.x - 110.0).abs() < 1e-3, "{rect:?}");
        assert!((rect.y - 110.0).abs() < 1e-3, "{rect:?}");
    }

    #[test]
    fn dragging_past_the_edge_clamps() {
        let mut state = input(SelectionBox::new(10.0, 10.0, 100.0, 100.0), (400, 300), 1.0);
        state.handle_pointer_down((60.0, 60.0));
        state.handle_pointer_move((-5000.0, 9000.0));
        assert_eq!(state.model().rect(), SelectionBox::new(0.0, 200.0, 100.0, 100.0));
        assert!(state.model().holds_invariants());
    }

    #[test]
    fn missed_release_is_recovered_on_next_press() {
        let mut state = input(SelectionBox::new(100.0, 100.0, 100.0, 100.0), (1000, 1000), 1.0);
        state.handle_pointer_down((150.0, 150.0));
        assert_eq!(state.interaction(), Interaction::Dragging);
        state.handle_pointer_down((800.0, 800.0));
        assert_eq!(state.interaction(), Interaction::Idle);
        assert_eq!(state.model().rect(), SelectionBox::new(750.0, 750.0, 100.0, 100.0));
    }

    #[test]
    fn status_reports_rounded_selection() {
        let state = input(SelectionBox::new(0.0, 0.0, 99.5, 50.4), (1000, 1000), 1.0);
        assert_eq!(state.status_text(), "Selection: 100x50");
    }
}
