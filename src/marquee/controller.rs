use crate::error::MarqueeError;
use crate::marquee::coords::{DisplayBounds, DisplayConfig};
use crate::marquee::input::{GlobalListener, Interaction, MarqueeInputState, PointerTarget};
use crate::marquee::messages::{Decision, DecisionAction, DecisionRequest};
use crate::marquee::model::{SelectionBox, SelectionModel, DEFAULT_INITIAL_SIDE};
use crate::marquee::session::{ImageRef, MarqueeMode, Session};
use crate::marquee::state::{can_transition, ListenerSet, SessionPhase};

pub const STATUS_SELECT_AREA: &str = "Select Area";
pub const CONFIRM_LABEL: &str = "CONFIRM & RESUME";
pub const CONFIRM_BUSY_LABEL: &str = "Resuming...";
pub const CONFIRM_ERROR_LABEL: &str = "Error (Check Console)";
pub const EXIT_LABEL: &str = "✕";
pub const EXIT_BUSY_LABEL: &str = "...";

/// What the overlay should do after a decision request finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The session is over; the surface can be released.
    Closed,
    /// The request failed and the user may try again.
    Retry,
}

#[derive(Debug, Clone, PartialEq)]
struct LoadedImage {
    config: DisplayConfig,
    input: MarqueeInputState,
}

/// Everything one overlay surface shows, independent of how it is drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct MarqueeController {
    session: Session,
    image_ref: ImageRef,
    mode: MarqueeMode,
    initial_side: f32,
    phase: SessionPhase,
    listeners: ListenerSet,
    loaded: Option<LoadedImage>,
    status: String,
    confirm_label: &'static str,
    exit_label: &'static str,
    last_error: Option<String>,
}

impl MarqueeController {
    pub fn new(session: Session, image_ref: ImageRef, mode: MarqueeMode) -> Self {
        let mut listeners = ListenerSet::default();
        listeners.attach(GlobalListener::KeyDown);
        Self {
            session,
            image_ref,
            mode,
            initial_side: DEFAULT_INITIAL_SIDE,
            phase: SessionPhase::Loading,
            listeners,
            loaded: None,
            status: STATUS_SELECT_AREA.into(),
            confirm_label: CONFIRM_LABEL,
            exit_label: EXIT_LABEL,
            last_error: None,
        }
    }

    pub fn with_initial_side(mut self, side: f32) -> Self {
        self.initial_side = side;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn image_ref(&self) -> &ImageRef {
        &self.image_ref
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn listeners(&self) -> &ListenerSet {
        &self.listeners
    }

    pub fn status_text(&self) -> &str {
        &self.status
    }

    pub fn mode_text(&self) -> String {
        self.mode.describe()
    }

    pub fn output_text(&self) -> Option<String> {
        let crop = self.selection()?.rounded();
        let (w, h) = self.mode.output_size(&crop);
        Some(format!("Output: {w}x{h}"))
    }

    pub fn confirm_label(&self) -> &'static str {
        self.confirm_label
    }

    pub fn exit_label(&self) -> &'static str {
        self.exit_label
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Both action controls are disabled while a request is outstanding.
    pub fn controls_enabled(&self) -> bool {
        !self.phase.is_in_flight() && !self.phase.is_closed()
    }

    pub fn can_submit(&self) -> bool {
        self.phase == SessionPhase::Ready
    }

    pub fn is_closed(&self) -> bool {
        self.phase.is_closed()
    }

    pub fn display_config(&self) -> Option<DisplayConfig> {
        self.loaded.as_ref().map(|l| l.config)
    }

    pub fn selection(&self) -> Option<SelectionBox> {
        self.loaded.as_ref().map(|l| l.input.model().rect())
    }

    pub fn display_box(&self) -> Option<SelectionBox> {
        self.loaded.as_ref().map(|l| l.input.display_box())
    }

    pub fn interaction(&self) -> Interaction {
        self.loaded
            .as_ref()
            .map(|l| l.input.interaction())
            .unwrap_or(Interaction::Idle)
    }

    pub fn hit_test(&self, point: (f32, f32)) -> PointerTarget {
        self.loaded
            .as_ref()
            .map(|l| l.input.hit_test(point))
            .unwrap_or(PointerTarget::Outside)
    }

    fn transition(&mut self, to: SessionPhase) -> bool {
        if can_transition(self.phase, to) {
            self.phase = to;
            true
        } else {
            tracing::debug!(from = ?self.phase, to = ?to, node = %self.session.node_id(), "ignored marquee phase change");
            false
        }
    }

    /// The preview finished loading; size it for `bounds` and place the box.
    pub fn image_loaded(
        &mut self,
        width: u32,
        height: u32,
        bounds: DisplayBounds,
    ) -> Result<(), MarqueeError> {
        if self.phase != SessionPhase::Loading {
            return Ok(());
        }
        let config = match DisplayConfig::fit(width, height, bounds) {
            Ok(config) => config,
            Err(err) => {
                self.image_failed(&err);
                return Err(err);
            }
        };
        let model = SelectionModel::with_initial_side(width, height, self.initial_side);
        let input = MarqueeInputState::new(model, config.mapper());
        self.status = input.status_text();
        self.loaded = Some(LoadedImage { config, input });
        self.transition(SessionPhase::Ready);
        tracing::debug!(
            node = %self.session.node_id(),
            width,
            height,
            scale = config.scale,
            "marquee preview ready"
        );
        Ok(())
    }

    pub fn image_failed(&mut self, err: &MarqueeError) {
        if self.transition(SessionPhase::LoadFailed) {
            tracing::error!(node = %self.session.node_id(), error = %err, "marquee preview failed to load");
            self.status = format!("Failed to load preview: {err}");
            self.last_error = Some(err.to_string());
        }
    }

    fn sync_pointer_listeners(&mut self) {
        self.listeners.detach(GlobalListener::PointerMove);
        self.listeners.detach(GlobalListener::PointerUp);
        if let Some(loaded) = &self.loaded {
            for listener in loaded.input.held_listeners() {
                self.listeners.attach(*listener);
            }
        }
    }

    fn refresh_status(&mut self) {
        if let Some(loaded) = &self.loaded {
            self.status = loaded.input.status_text();
        }
    }

    pub fn pointer_down(&mut self, point: (f32, f32)) -> bool {
        if self.is_closed() {
            return false;
        }
        let Some(loaded) = self.loaded.as_mut() else {
            return false;
        };
        let changed = loaded.input.handle_pointer_down(point);
        self.sync_pointer_listeners();
        self.refresh_status();
        changed
    }

    pub fn pointer_move(&mut self, point: (f32, f32)) -> bool {
        if !self.listeners.contains(GlobalListener::PointerMove) {
            return false;
        }
        let Some(loaded) = self.loaded.as_mut() else {
            return false;
        };
        let changed = loaded.input.handle_pointer_move(point);
        if changed {
            self.refresh_status();
        }
        changed
    }

    pub fn pointer_up(&mut self) -> bool {
        if !self.listeners.contains(GlobalListener::PointerUp) {
            return false;
        }
        let ended = self
            .loaded
            .as_mut()
            .map(|loaded| loaded.input.handle_pointer_up())
            .unwrap_or(false);
        self.sync_pointer_listeners();
        self.refresh_status();
        ended
    }

    /// Escape routes through cancel while the key listener is attached.
    pub fn escape_pressed(&mut self) -> Option<DecisionRequest> {
        if !self.listeners.contains(GlobalListener::KeyDown) {
            return None;
        }
        self.request_cancel()
    }

    /// Start a submit. `None` when a request is already outstanding or the
    /// preview is not ready.
    pub fn request_submit(&mut self) -> Option<DecisionRequest> {
        let rect = self.selection()?;
        if !self.can_submit() || !self.transition(SessionPhase::Submitting) {
            return None;
        }
        self.confirm_label = CONFIRM_BUSY_LABEL;
        self.last_error = None;
        tracing::info!(node = %self.session.node_id(), crop = ?rect.rounded(), "submitting marquee selection");
        Some(DecisionRequest {
            session: self.session.clone(),
            decision: Decision::Submit(rect),
        })
    }

    pub fn request_cancel(&mut self) -> Option<DecisionRequest> {
        if !self.controls_enabled() || !self.transition(SessionPhase::Cancelling) {
            return None;
        }
        self.exit_label = EXIT_BUSY_LABEL;
        tracing::info!(node = %self.session.node_id(), "cancelling marquee session");
        Some(DecisionRequest {
            session: self.session.clone(),
            decision: Decision::Cancel,
        })
    }

    /// Apply the outcome of a decision request.
    ///
    /// A cancel always closes the session, even when the request failed. A
    /// failed submit re-enables the controls and keeps everything else.
    pub fn complete(
        &mut self,
        action: DecisionAction,
        result: Result<(), MarqueeError>,
    ) -> Completion {
        match (action, result) {
            (DecisionAction::Cancel, result) => {
                if let Err(err) = result {
                    tracing::warn!(node = %self.session.node_id(), error = %err, "marquee cancel failed");
                    self.last_error = Some(err.to_string());
                }
                self.teardown();
                Completion::Closed
            }
            (DecisionAction::Submit, Ok(())) => {
                tracing::info!(node = %self.session.node_id(), "marquee selection accepted");
                self.teardown();
                Completion::Closed
            }
            (DecisionAction::Submit, Err(err)) => {
                tracing::error!(
                    node = %self.session.node_id(),
                    error = %err,
                    retryable = err.is_retryable(),
                    "marquee submit failed"
                );
                if self.phase == SessionPhase::Submitting {
                    self.transition(SessionPhase::Ready);
                }
                self.confirm_label = CONFIRM_ERROR_LABEL;
                self.exit_label = EXIT_LABEL;
                self.last_error = Some(err.to_string());
                Completion::Retry
            }
        }
    }

    /// Detach every window-level listener and close the session.
    pub fn teardown(&mut self) {
        if let Some(loaded) = self.loaded.as_mut() {
            loaded.input.handle_pointer_up();
        }
        self.listeners.detach_all();
        if !self.is_closed() {
            self.transition(SessionPhase::Closed);
        }
    }
}
