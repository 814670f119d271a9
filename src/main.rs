use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use brigade::voice::{AudioCapture, signal};
use brigade::{Config, ConfirmationGate, Daemon, IntentParser};

/// Brigade - voice commands for the kitchen pass
#[derive(Parser)]
#[command(name = "brigade", version, about)]
struct Cli {
    /// Config file (defaults to ~/.config/brigade/config.toml when present)
    #[arg(short, long, env = "BRIGADE_CONFIG")]
    config: Option<PathBuf>,

    /// Seconds between two dispatched commands (overrides config)
    #[arg(long)]
    cooldown: Option<f64>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Score a transcription against the command phrases
    Parse {
        /// Text as the transcriber would produce it
        text: String,
    },
    /// Classify a confirmation answer
    Confirm {
        /// Text as the transcriber would produce it
        text: String,
    },
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,brigade=info",
        1 => "info,brigade=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e:#}");
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;

    if let Some(secs) = cli.cooldown {
        config.intent.cooldown = Duration::try_from_secs_f64(secs)
            .map_err(|e| anyhow::anyhow!("invalid --cooldown {secs}: {e}"))?;
    }

    if let Some(cmd) = cli.command {
        return match cmd {
            Command::Parse { text } => parse_text(&config, &text),
            Command::Confirm { text } => confirm_text(&config, &text),
            Command::TestMic { duration } => test_mic(&config, duration).await,
        };
    }

    tracing::info!(
        provider = %config.stt.provider,
        model = %config.stt.model,
        "starting brigade"
    );
    tracing::debug!(?config, "loaded configuration");

    Daemon::new(config).run().await?;

    Ok(())
}

/// Print the parser's scoring for a transcription
fn parse_text(config: &Config, text: &str) -> anyhow::Result<()> {
    let report = IntentParser::new(config.intent.threshold).report(text);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Print the confirmation gate's scoring for an answer
fn confirm_text(config: &Config, text: &str) -> anyhow::Result<()> {
    let report = ConfirmationGate::new(config.intent.confirm_threshold).report(text);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Test microphone input
#[allow(clippy::future_not_send)]
async fn test_mic(config: &Config, duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let mut capture = AudioCapture::new(config.listen.sample_rate)?;
    capture.start()?;

    println!("Sample rate: {} Hz", capture.sample_rate());
    println!("Silence floor (peak): {:.4}", config.listen.silence_floor);
    println!("---");

    for i in 0..duration {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let samples = capture.peek_buffer();
        let energy = signal::rms(&samples);
        let peak = signal::peak(&samples);
        let verdict = if signal::is_silent(&samples, config.listen.silence_floor) {
            "silent"
        } else {
            "sound"
        };

        // Visual meter
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = (energy * 100.0).min(50.0) as usize;
        let meter: String = "█".repeat(meter_len) + &" ".repeat(50 - meter_len);

        println!(
            "[{:2}s] RMS: {:.4} | Peak: {:.4} | {verdict:6} | [{meter}]",
            i + 1,
            energy,
            peak,
        );

        // Clear buffer each second
        capture.clear_buffer();
    }

    capture.stop();

    println!("\n---");
    println!("If the meter moved and speech reads \"sound\", the mic is usable.");
    println!("If peak stays under the silence floor, check:");
    println!("  1. Is your mic plugged in?");
    println!("  2. Run: pactl info | grep 'Default Source'");
    println!("  3. Run: arecord -l (to list devices)");
    println!("  4. Try: pavucontrol (to check levels)");

    Ok(())
}
