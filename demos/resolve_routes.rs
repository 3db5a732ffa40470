//! Route resolution example.
//!
//! Loads an audio policy configuration, prints the route each performance
//! mode resolves to, then runs the playback and remote submix checks against
//! an in-memory audio service.
//!
//! Run with: cargo run --example resolve_routes -- tests/fixtures/audio_policy_configuration.xml
//!
//! Without an argument the standard vendor directories are searched.

use std::time::Duration;

use audio_policy_routing::{
    check_performance_modes, check_remote_submix, AudioPort, DeviceType, EngineConfig,
    InputSource, MockAudioService, PortId, PortRole, RoutingEngine,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for debug output
    tracing_subscriber::fmt::init();

    let builder = RoutingEngine::builder()
        .with_config(EngineConfig {
            device_wait_timeout: Duration::from_secs(2),
            ..Default::default()
        })
        .on_event(|event| tracing::debug!(?event, "routing event"));
    let engine = match std::env::args().nth(1) {
        Some(path) => builder.from_path(path),
        None => builder.locate(),
    }
    .build()?;

    let snapshot = engine.snapshot();
    println!(
        "Configuration {}: {} mix ports, {} routes, {} attached devices",
        snapshot.version(),
        snapshot.mix_ports().len(),
        snapshot.routes().len(),
        snapshot.attached_devices().len()
    );

    for (flag, outcome) in engine.performance_plan() {
        match outcome {
            Ok(decision) => println!("  {decision}"),
            Err(e) => println!("  {flag}: {e}"),
        }
    }
    match engine.resolve_input_route(InputSource::RemoteSubmix) {
        Ok(device) => println!("  {}: {}", InputSource::RemoteSubmix, device.name),
        Err(e) => println!("  {e}"),
    }

    // Route everything the way a well-behaved device would
    let service = MockAudioService::new()
        .with_port(AudioPort::device(PortId(2), PortRole::Sink, DeviceType::OUT_SPEAKER, "Speaker"))
        .with_port(AudioPort::device(
            PortId(20),
            PortRole::Source,
            DeviceType::IN_REMOTE_SUBMIX,
            "Remote Submix In",
        ))
        .with_port(AudioPort::device(
            PortId(21),
            PortRole::Sink,
            DeviceType::OUT_REMOTE_SUBMIX,
            "Remote Submix Out",
        ))
        .route_playback_to(PortId(2))
        .route_capture_to(PortId(20))
        .notify_after(Duration::from_millis(50));

    println!("Playback checks:");
    for (flag, outcome) in check_performance_modes(&engine, &service) {
        match outcome {
            Ok(check) => println!("  {flag}: {}", check.verdict),
            Err(e) if e.is_skip() => println!("  {flag}: skipped ({e})"),
            Err(e) => println!("  {flag}: FAILED ({e})"),
        }
    }

    let service = service.route_playback_to(PortId(21));
    match check_remote_submix(&engine, &service) {
        Ok(check) => println!(
            "Remote submix: capture {}, playback {}",
            check.capture, check.playback
        ),
        Err(e) if e.is_skip() => println!("Remote submix: skipped ({e})"),
        Err(e) => println!("Remote submix: FAILED ({e})"),
    }

    Ok(())
}
