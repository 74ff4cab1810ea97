use anyhow::Context;
use eframe::egui;
use std::io::BufReader;
use std::sync::Arc;

use flow_marquee::gui::MarqueeApp;
use flow_marquee::host::spawn_message_reader;
use flow_marquee::logging;
use flow_marquee::marquee::{Endpoints, MarqueeService, ReqwestTransport, ResumeClient};
use flow_marquee::settings::Settings;

fn main() -> anyhow::Result<()> {
    let settings_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "settings.json".to_string());
    let settings = Settings::load(&settings_path)
        .with_context(|| format!("failed to load settings from {settings_path}"))?;
    settings.validate()?;
    let _log_guard = logging::init(settings.debug_logging, settings.log_file.as_deref())?;
    tracing::info!(server = %settings.server_url, "starting marquee overlay");

    let transport = ReqwestTransport::new(settings.request_timeout())?;
    let client = ResumeClient::new(Arc::new(transport), Endpoints::new(&settings.server_url)?);

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 1000.0])
            .with_min_inner_size([480.0, 360.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Flow Marquee",
        native_options,
        Box::new(move |cc| {
            let ctx = cc.egui_ctx.clone();
            let mut service = MarqueeService::new(client);
            let repaint = ctx.clone();
            service.set_repaint_hook(move || repaint.request_repaint());
            let messages =
                spawn_message_reader(BufReader::new(std::io::stdin()), move || ctx.request_repaint());
            Box::new(MarqueeApp::new(&settings, service, messages))
        }),
    )
    .map_err(|e| anyhow::anyhow!("failed to run overlay window: {e}"))
}
