use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread;

use crate::marquee::messages::{DecisionRequest, SurfaceTicket, WorkerToOverlay};
use crate::marquee::protocol::ResumeClient;
use crate::marquee::session::ImageRef;

type RepaintHook = Arc<dyn Fn() + Send + Sync>;

/// Runs the blocking network calls of the overlay off the UI thread.
///
/// Each request gets its own short-lived thread; results come back in
/// completion order through [`MarqueeService::drain`].
pub struct MarqueeService {
    client: ResumeClient,
    tx: Sender<WorkerToOverlay>,
    rx: Receiver<WorkerToOverlay>,
    repaint: Option<RepaintHook>,
}

impl MarqueeService {
    pub fn new(client: ResumeClient) -> Self {
        let (tx, rx) = channel();
        Self {
            client,
            tx,
            rx,
            repaint: None,
        }
    }

    /// Called from worker threads after a result was queued.
    pub fn set_repaint_hook(&mut self, hook: impl Fn() + Send + Sync + 'static) {
        self.repaint = Some(Arc::new(hook));
    }

    fn spawn<F>(&self, name: &str, job: F)
    where
        F: FnOnce(&ResumeClient) -> WorkerToOverlay + Send + 'static,
    {
        let client = self.client.clone();
        let tx = self.tx.clone();
        let repaint = self.repaint.clone();
        let spawned = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let message = job(&client);
                if tx.send(message).is_ok() {
                    if let Some(repaint) = repaint {
                        repaint();
                    }
                }
            });
        if let Err(err) = spawned {
            tracing::error!(error = %err, worker = name, "failed to spawn marquee worker");
        }
    }

    pub fn fetch_image(&self, ticket: SurfaceTicket, image: ImageRef) {
        self.spawn("marquee-image", move |client| match client.fetch_image(&image) {
            Ok(image) => WorkerToOverlay::ImageLoaded { ticket, image },
            Err(error) => WorkerToOverlay::ImageFailed { ticket, error },
        });
    }

    pub fn send_decision(&self, ticket: SurfaceTicket, request: DecisionRequest) {
        self.spawn("marquee-decision", move |client| {
            let action = request.decision.action();
            let result = client.submit_decision(&request.session, &request.decision);
            WorkerToOverlay::DecisionFinished {
                ticket,
                action,
                result,
            }
        });
    }

    /// Collect every result that has arrived so far.
    pub fn drain(&self) -> Vec<WorkerToOverlay> {
        let mut out = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(message) => out.push(message),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        out
    }
}
