use eframe::egui::{
    self, Align, Align2, Color32, CursorIcon, Layout, Pos2, Rect, RichText, Sense, Stroke,
    TextureHandle, TextureOptions, Vec2,
};
use std::collections::HashMap;

use crate::marquee::activation::MarqueePresenter;
use crate::marquee::controller::MarqueeController;
use crate::marquee::coords::DisplayBounds;
use crate::marquee::input::{handle_rect, Interaction, PointerTarget, HANDLE_SIZE};
use crate::marquee::messages::{DecisionRequest, SurfaceTicket, WorkerToOverlay};
use crate::marquee::model::{Corner, DEFAULT_INITIAL_SIDE};
use crate::marquee::registry::OverlayRegistry;
use crate::marquee::service::MarqueeService;
use crate::marquee::session::{ImageRef, MarqueeMode, Session, SurfaceId};
use crate::marquee::state::SessionPhase;

const PANEL_FILL: Color32 = Color32::from_rgb(0x22, 0x22, 0x22);
const CANVAS_FILL: Color32 = Color32::from_rgb(0x11, 0x11, 0x11);
const STATUS_COLOR: Color32 = Color32::from_rgb(0x4c, 0xaf, 0x50);
const MODE_COLOR: Color32 = Color32::from_rgb(0xbb, 0xbb, 0xbb);
const ERROR_COLOR: Color32 = Color32::from_rgb(0xe5, 0x73, 0x73);
const CONFIRM_FILL: Color32 = Color32::from_rgb(0x21, 0x96, 0xf3);
const BOX_STROKE: Color32 = Color32::from_rgb(0x00, 0xff, 0x00);
const BOX_FILL: Color32 = Color32::from_rgba_premultiplied(0x00, 0x26, 0x00, 0x26);
const EXIT_HINT: &str = "Exit (cancels and stops the workflow)";

/// Sizing rules for the preview and the initial selection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayLayout {
    pub viewport_fraction: f32,
    pub max_display_width: f32,
    pub max_display_height: f32,
    pub initial_side: f32,
}

impl Default for OverlayLayout {
    fn default() -> Self {
        Self {
            viewport_fraction: 0.85,
            max_display_width: 1200.0,
            max_display_height: 900.0,
            initial_side: DEFAULT_INITIAL_SIDE,
        }
    }
}

impl OverlayLayout {
    pub fn bounds(&self, viewport: Vec2) -> DisplayBounds {
        DisplayBounds::from_viewport(
            (viewport.x, viewport.y),
            self.viewport_fraction,
            self.max_display_width,
            self.max_display_height,
        )
    }
}

/// Draws every open marquee surface and routes its input.
pub struct MarqueeOverlay {
    registry: OverlayRegistry,
    service: MarqueeService,
    textures: HashMap<SurfaceId, TextureHandle>,
    layout: OverlayLayout,
    outgoing: Vec<(SurfaceTicket, DecisionRequest)>,
}

impl MarqueeOverlay {
    pub fn new(service: MarqueeService, layout: OverlayLayout) -> Self {
        Self {
            registry: OverlayRegistry::new(),
            service,
            textures: HashMap::new(),
            layout,
            outgoing: Vec::new(),
        }
    }

    pub fn registry(&self) -> &OverlayRegistry {
        &self.registry
    }

    pub fn is_idle(&self) -> bool {
        self.registry.is_empty()
    }

    /// Apply worker results. Results for replaced sessions are dropped.
    fn pump(&mut self, ctx: &egui::Context) {
        let bounds = self.layout.bounds(ctx.screen_rect().size());
        for message in self.service.drain() {
            let ticket = message.ticket().clone();
            let Some(controller) = self.registry.current_mut(&ticket) else {
                tracing::debug!(surface = %ticket.surface, "dropping result for replaced marquee session");
                continue;
            };
            match message {
                WorkerToOverlay::ImageLoaded { image, .. } => {
                    if controller
                        .image_loaded(image.width, image.height, bounds)
                        .is_ok()
                    {
                        let pixels = egui::ColorImage::from_rgba_unmultiplied(
                            [image.width as usize, image.height as usize],
                            &image.rgba,
                        );
                        let texture =
                            ctx.load_texture(ticket.surface.as_str(), pixels, TextureOptions::LINEAR);
                        self.textures.insert(ticket.surface.clone(), texture);
                    }
                }
                WorkerToOverlay::ImageFailed { error, .. } => controller.image_failed(&error),
                WorkerToOverlay::DecisionFinished { action, result, .. } => {
                    controller.complete(action, result);
                }
            }
        }
    }

    pub fn ui(&mut self, ctx: &egui::Context) {
        self.pump(ctx);

        let escape = ctx.input(|i| i.key_pressed(egui::Key::Escape));
        for surface in self.registry.surfaces() {
            self.surface_ui(ctx, &surface, escape);
        }

        for (ticket, request) in std::mem::take(&mut self.outgoing) {
            self.service.send_decision(ticket, request);
        }
        for surface in self.registry.closed_surfaces() {
            self.registry.release(&surface);
            self.textures.remove(&surface);
        }
    }

    fn surface_ui(&mut self, ctx: &egui::Context, surface: &SurfaceId, escape: bool) {
        let Some(slot) = self.registry.get_mut(surface) else {
            return;
        };
        let ticket = slot.ticket(surface);
        let controller = &mut slot.controller;
        if controller.is_closed() {
            return;
        }
        let texture = self.textures.get(surface);
        let mut requests = Vec::new();

        if escape {
            requests.extend(controller.escape_pressed());
        }

        egui::Window::new("Visual Marquee")
            .id(egui::Id::new(surface.as_str()))
            .title_bar(false)
            .collapsible(false)
            .resizable(false)
            .anchor(Align2::CENTER_CENTER, Vec2::ZERO)
            .frame(egui::Frame::window(&ctx.style()).fill(PANEL_FILL).rounding(8.0))
            .show(ctx, |ui| {
                toolbar(ui, controller, &mut requests);
                ui.separator();
                canvas(ui, controller, texture);
            });

        self.outgoing
            .extend(requests.into_iter().map(|request| (ticket.clone(), request)));
    }
}

impl MarqueePresenter for MarqueeOverlay {
    fn open_session(&mut self, session: Session, image: ImageRef, mode: MarqueeMode) {
        let controller = MarqueeController::new(session, image.clone(), mode)
            .with_initial_side(self.layout.initial_side);
        let ticket = self.registry.acquire(controller);
        self.textures.remove(&ticket.surface);
        self.service.fetch_image(ticket, image);
    }
}

fn toolbar(ui: &mut egui::Ui, controller: &mut MarqueeController, requests: &mut Vec<DecisionRequest>) {
    ui.horizontal(|ui| {
        ui.vertical(|ui| {
            ui.label(
                RichText::new(controller.status_text())
                    .color(STATUS_COLOR)
                    .strong(),
            );
            ui.label(RichText::new(controller.mode_text()).color(MODE_COLOR).size(12.0));
            if let Some(output) = controller.output_text() {
                ui.label(RichText::new(output).color(MODE_COLOR).size(12.0));
            }
            if let Some(err) = controller.last_error() {
                ui.label(RichText::new(err).color(ERROR_COLOR).size(12.0));
            }
        });
        ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
            let enabled = controller.controls_enabled();
            let exit = ui
                .add_enabled(
                    enabled,
                    egui::Button::new(RichText::new(controller.exit_label()).strong())
                        .min_size(Vec2::splat(32.0)),
                )
                .on_hover_text(EXIT_HINT);
            if exit.clicked() {
                requests.extend(controller.request_cancel());
            }

            let confirm = ui.add_enabled(
                enabled && controller.can_submit(),
                egui::Button::new(
                    RichText::new(controller.confirm_label())
                        .strong()
                        .color(Color32::WHITE),
                )
                .fill(CONFIRM_FILL),
            );
            if confirm.clicked() {
                requests.extend(controller.request_submit());
            }
        });
    });
}

fn resize_cursor(corner: Corner) -> CursorIcon {
    match corner {
        Corner::Nw => CursorIcon::ResizeNorthWest,
        Corner::Ne => CursorIcon::ResizeNorthEast,
        Corner::Sw => CursorIcon::ResizeSouthWest,
        Corner::Se => CursorIcon::ResizeSouthEast,
    }
}

fn canvas(ui: &mut egui::Ui, controller: &mut MarqueeController, texture: Option<&TextureHandle>) {
    let Some(config) = controller.display_config() else {
        if controller.phase() == SessionPhase::LoadFailed {
            ui.colored_label(ERROR_COLOR, controller.status_text());
        } else {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label("Loading preview...");
            });
        }
        return;
    };

    let size = Vec2::new(config.display_width, config.display_height);
    let (response, painter) = ui.allocate_painter(size, Sense::click_and_drag());
    let origin = response.rect.min;
    let local = |p: Pos2| (p.x - origin.x, p.y - origin.y);
    let reach = response.rect.expand(HANDLE_SIZE / 2.0);

    painter.rect_filled(response.rect, 0.0, CANVAS_FILL);
    if let Some(texture) = texture {
        painter.image(
            texture.id(),
            response.rect,
            Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)),
            Color32::WHITE,
        );
    }

    let (pressed, released, pointer) = ui.input(|i| {
        (
            i.pointer.primary_pressed(),
            i.pointer.primary_released(),
            i.pointer.interact_pos(),
        )
    });
    if pressed {
        if let Some(p) = pointer {
            if ui.rect_contains_pointer(reach) {
                controller.pointer_down(local(p));
            }
        }
    }
    if let Some(p) = ui.input(|i| i.pointer.latest_pos()) {
        controller.pointer_move(local(p));
    }
    if released {
        controller.pointer_up();
    }

    if let Some(b) = controller.display_box() {
        let painter = painter.with_clip_rect(ui.clip_rect());
        let rect = Rect::from_min_size(origin + Vec2::new(b.x, b.y), Vec2::new(b.w, b.h));
        painter.rect_filled(rect, 0.0, BOX_FILL);
        painter.rect_stroke(rect, 0.0, Stroke::new(2.0, BOX_STROKE));
        for corner in Corner::ALL {
            let h = handle_rect(b, corner);
            let handle = Rect::from_min_size(origin + Vec2::new(h.x, h.y), Vec2::splat(HANDLE_SIZE));
            painter.rect(handle, 0.0, Color32::WHITE, Stroke::new(1.0, Color32::BLACK));
        }
    }

    let cursor = match controller.interaction() {
        Interaction::Dragging => Some(CursorIcon::Move),
        Interaction::Resizing(corner) => Some(resize_cursor(corner)),
        Interaction::Idle => ui
            .input(|i| i.pointer.hover_pos())
            .filter(|_| ui.rect_contains_pointer(reach))
            .map(|p| match controller.hit_test(local(p)) {
                PointerTarget::Handle(corner) => resize_cursor(corner),
                PointerTarget::Body => CursorIcon::Move,
                PointerTarget::Image | PointerTarget::Outside => CursorIcon::Crosshair,
            }),
    };
    if let Some(cursor) = cursor {
        ui.ctx().set_cursor_icon(cursor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marquee::input::GlobalListener;
    use crate::marquee::protocol::testing::{status, ScriptedTransport};
    use crate::marquee::protocol::{Endpoints, HttpResponse, ResumeClient};
    use crate::marquee::session::NodeId;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut out = Vec::new();
        image::RgbaImage::from_pixel(width, height, image::Rgba([200, 10, 10, 255]))
            .write_to(
                &mut std::io::Cursor::new(&mut out),
                image::ImageOutputFormat::Png,
            )
            .unwrap();
        out
    }

    fn overlay(replies: Vec<Result<HttpResponse, String>>) -> (MarqueeOverlay, Arc<ScriptedTransport>) {
        let transport = ScriptedTransport::with_replies(replies);
        let client = ResumeClient::new(
            transport.clone(),
            Endpoints::new("http://127.0.0.1:8188").unwrap(),
        );
        (
            MarqueeOverlay::new(MarqueeService::new(client), OverlayLayout::default()),
            transport,
        )
    }

    fn frame(ctx: &egui::Context, overlay: &mut MarqueeOverlay, events: Vec<egui::Event>) {
        let input = egui::RawInput {
            screen_rect: Some(Rect::from_min_size(Pos2::ZERO, Vec2::new(1600.0, 1200.0))),
            events,
            ..Default::default()
        };
        let _ = ctx.run(input, |ctx| overlay.ui(ctx));
    }

    fn run_until(
        ctx: &egui::Context,
        overlay: &mut MarqueeOverlay,
        mut done: impl FnMut(&MarqueeOverlay) -> bool,
    ) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !done(overlay) {
            assert!(Instant::now() < deadline, "overlay did not settle");
            std::thread::sleep(Duration::from_millis(5));
            frame(ctx, overlay, Vec::new());
        }
    }

    fn session(token: &str) -> Session {
        Session::new(NodeId::from(21), token)
    }

    fn mode() -> MarqueeMode {
        MarqueeMode {
            original_size: true,
            max_resolution: 1024,
            force_multiple_of_8: true,
        }
    }

    fn controller(overlay: &MarqueeOverlay) -> Option<&MarqueeController> {
        let surface = SurfaceId::for_node(&NodeId::from(21));
        overlay.registry().get(&surface).map(|slot| &slot.controller)
    }

    #[test]
    fn preview_loads_into_a_ready_surface() {
        let ctx = egui::Context::default();
        let (mut overlay, transport) = overlay(vec![Ok(HttpResponse {
            status: 200,
            body: png(640, 480),
        })]);
        overlay.open_session(session("a"), ImageRef::temp("p.png"), mode());

        run_until(&ctx, &mut overlay, |o| {
            controller(o).map(|c| c.phase()) == Some(SessionPhase::Ready)
        });
        let c = controller(&overlay).unwrap();
        assert_eq!(c.display_config().unwrap().scale, 1.0);
        assert_eq!(c.status_text(), "Selection: 480x480");
        assert_eq!(transport.paths(), vec!["/api/view"]);
    }

    #[test]
    fn escape_cancels_and_releases_even_when_offline() {
        let ctx = egui::Context::default();
        let (mut overlay, transport) = overlay(vec![
            Ok(HttpResponse {
                status: 200,
                body: png(64, 64),
            }),
            Err("connection refused".into()),
            Err("connection refused".into()),
        ]);
        overlay.open_session(session("a"), ImageRef::temp("p.png"), mode());
        run_until(&ctx, &mut overlay, |o| {
            controller(o).map(|c| c.phase()) == Some(SessionPhase::Ready)
        });
        assert!(controller(&overlay)
            .unwrap()
            .listeners()
            .contains(GlobalListener::KeyDown));

        frame(
            &ctx,
            &mut overlay,
            vec![egui::Event::Key {
                key: egui::Key::Escape,
                physical_key: None,
                pressed: true,
                repeat: false,
                modifiers: egui::Modifiers::default(),
            }],
        );
        assert_eq!(
            controller(&overlay).map(|c| c.phase()),
            Some(SessionPhase::Cancelling)
        );

        run_until(&ctx, &mut overlay, |o| o.is_idle());
        assert_eq!(
            transport.paths(),
            vec![
                "/api/view",
                "/api/flow_assistor/submit_crop",
                "/flow_assistor/submit_crop"
            ]
        );
    }

    #[test]
    fn stale_results_do_not_touch_a_reused_surface() {
        let ctx = egui::Context::default();
        let (mut overlay, _transport) = overlay(vec![
            status(500, ""),
            Ok(HttpResponse {
                status: 200,
                body: png(32, 32),
            }),
        ]);
        overlay.open_session(session("old"), ImageRef::temp("p.png"), mode());
        // Let the first fetch finish before the surface is reused.
        std::thread::sleep(Duration::from_millis(200));
        overlay.open_session(session("new"), ImageRef::temp("p.png"), mode());

        run_until(&ctx, &mut overlay, |o| {
            controller(o).map(|c| c.phase()) == Some(SessionPhase::Ready)
        });
        let c = controller(&overlay).unwrap();
        assert_eq!(c.session().token(), "new");
        assert!(c.last_error().is_none());
        assert_eq!(overlay.registry().len(), 1);
    }
}
