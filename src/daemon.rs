//! Daemon - the listening service
//!
//! Wires the microphone, the transcriber and the action sink into a
//! session controller and runs it until Ctrl-C.

use tokio::sync::mpsc;

use crate::config::EventsFormat;
use crate::confirm::ConfirmationGate;
use crate::dispatch::{ActionSink, ConsoleSink, WebhookSink};
use crate::events::{EventSink, JsonLinesEvents, TracingEvents};
use crate::intent::IntentParser;
use crate::session::SessionController;
use crate::voice::{AudioCapture, SpeechToText};
use crate::{Config, Error, Result};

/// The Brigade daemon
pub struct Daemon {
    config: Config,
}

impl Daemon {
    /// Create a new daemon instance
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }

    /// Open collaborators and listen until interrupted
    ///
    /// # Errors
    ///
    /// Returns error if a collaborator cannot be initialized; nothing after
    /// startup ends the loop except the interrupt.
    #[allow(clippy::future_not_send)]
    pub async fn run(self) -> Result<()> {
        let config = self.config;

        let api_key = config.stt.api_key.clone().ok_or_else(|| {
            Error::Config(format!(
                "no API key for STT provider {}; set it in the environment or config file",
                config.stt.provider
            ))
        })?;
        let stt = SpeechToText::new(config.stt.provider, api_key, config.stt.model.clone())?;

        let capture = AudioCapture::new(config.listen.sample_rate)?;

        let sink: Box<dyn ActionSink> = match &config.dispatch.webhook_url {
            Some(url) => {
                let sink = WebhookSink::new(url)?;
                tracing::info!(url = %sink.url(), "dispatching to webhook");
                Box::new(sink)
            }
            None => {
                tracing::info!("dispatching to console");
                Box::new(ConsoleSink)
            }
        };

        let events: Box<dyn EventSink> = match config.events {
            EventsFormat::Log => Box::new(TracingEvents),
            EventsFormat::Json => Box::new(JsonLinesEvents::stdout()),
        };

        let mut controller = SessionController::new(capture, stt, sink, config.session_settings())
            .with_parser(IntentParser::new(config.intent.threshold))
            .with_gate(ConfirmationGate::new(config.intent.confirm_threshold))
            .with_events(events);

        // Set up shutdown signal
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = shutdown_tx.send(()).await;
            }
        });

        tracing::info!(
            language = %config.listen.language,
            cooldown_secs = config.intent.cooldown.as_secs_f64(),
            "say \"commande <numéro> lancée\" or \"commande <numéro> prête\", Ctrl-C to quit"
        );

        controller
            .run_until(async move {
                shutdown_rx.recv().await;
            })
            .await;

        tracing::info!("shutdown complete");
        Ok(())
    }
}
