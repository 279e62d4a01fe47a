use anyhow::Result;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "palaver=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    run()
}

/// Echo demo: microphone -> loopback session -> speakers, for 30 seconds
#[cfg(feature = "audio-io")]
fn run() -> Result<()> {
    use palaver::audio::{AudioInput, AudioOutput};
    use palaver::session::{EchoTransport, SessionConfig, SessionController, SessionEvent};
    use std::time::{Duration, Instant};

    info!("Starting palaver echo session (speak and hear yourself back)");

    let mic = AudioInput::new()?;
    let mut output = AudioOutput::new()?;
    output.start()?;

    let (mut session, handle) = SessionController::new(
        SessionConfig::new("You are a friendly echo."),
        Box::new(EchoTransport::new()),
        Box::new(mic),
        Box::new(output.clock()),
        Box::new(output.sink()),
        output.completions(),
    )?;

    session.start()?;

    let events = handle.event_receiver();
    std::thread::spawn(move || {
        while let Ok(event) = events.recv() {
            match event {
                SessionEvent::Status(status) => info!("{}", status),
                SessionEvent::TranscriptFragment { text, .. } => info!("transcript: {}", text),
                SessionEvent::Error(message) => info!("error: {}", message),
                SessionEvent::Closed => break,
                _ => {}
            }
        }
    });

    let started = Instant::now();
    while session.pump() {
        if started.elapsed() > Duration::from_secs(30) {
            break;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    session.close();

    info!("Session ended");
    Ok(())
}

#[cfg(not(feature = "audio-io"))]
fn run() -> Result<()> {
    info!("The echo demo needs audio devices; rebuild with the audio-io feature");
    Ok(())
}
