mod config;
mod demo;
mod feed;

use crate::config::Config;
use clap::Parser;
use demo::Demo;
use overlay_core::{
    chat::MAX_MESSAGES, create_backend, BackendKind, ChatMessage, OverlaySession, SessionConfig,
    SimulatedRuntime, SurfaceKind,
};
use std::time::{Duration, Instant};
use tracing_subscriber::{fmt, EnvFilter};

const CHAT_FEED_CAPACITY: usize = 64;
const REPORT_INTERVAL: Duration = Duration::from_secs(5);

fn main() -> anyhow::Result<()> {
    // --- 1. Initialization ---
    let config = Config::parse();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.log_json {
        fmt().with_env_filter(filter).json().init();
    } else {
        fmt().with_env_filter(filter).init();
    }
    tracing::info!(config = ?config, "Overlay host starting with configuration");

    let backend = match create_backend(config.backend.into()) {
        Ok(b) => b,
        Err(e) => {
            tracing::warn!(error = %e, "GPU backend unavailable, falling back to software");
            create_backend(BackendKind::Software)?
        }
    };

    let frame_period = Duration::from_micros(config.frame_period_us);
    let runtime = if config.no_pacing {
        SimulatedRuntime::new()
    } else {
        SimulatedRuntime::new().with_frame_period(frame_period)
    };
    let session_config = SessionConfig {
        hud_distance_m: config.hud_distance,
        frame_period,
        ..Default::default()
    };

    let mut session = OverlaySession::new(session_config, runtime, backend);
    if !session.init() {
        anyhow::bail!("VR runtime failed to initialise");
    }
    if !session.create_default_overlays() {
        tracing::warn!("Some overlays could not be created; continuing with what exists");
    }

    let demo = config.demo.then(|| {
        let rate_hz = 1.0 / frame_period.as_secs_f32().max(1e-3);
        let demo = Demo::new(rate_hz);
        demo.setup(session.runtime_mut());
        demo
    });

    // --- 2. Spawn Chat Feed ---
    let (tx_chat, rx_chat) = crossbeam_channel::bounded::<ChatMessage>(CHAT_FEED_CAPACITY);
    let _feed = feed::spawn_stdin_feed(tx_chat);
    let mut transcript: Vec<ChatMessage> = Vec::new();

    // --- 3. Main Frame Loop ---
    let started = Instant::now();
    let mut last_report = Instant::now();
    let mut submitted = [0u64; 3];
    let mut keys_typed = 0u64;
    let mut frame = 0u64;

    tracing::info!("Starting overlay frame loop...");
    loop {
        if config.frames > 0 && frame >= config.frames {
            break;
        }
        session.wait_for_frame();

        // Drain whatever the feed produced since the last frame.
        let mut changed = false;
        loop {
            match rx_chat.try_recv() {
                Ok(msg) => {
                    transcript.push(msg);
                    changed = true;
                }
                Err(crossbeam_channel::TryRecvError::Empty) => break,
                Err(crossbeam_channel::TryRecvError::Disconnected) => {
                    if config.frames == 0 {
                        tracing::info!("Chat feed ended, stopping");
                        session.shutdown();
                        return Ok(());
                    }
                    break;
                }
            }
        }

        if let Some(demo) = &demo {
            let dash = session.handle(SurfaceKind::Dashboard);
            demo.step(frame, session.runtime_mut(), dash);
        }

        // Mailboxes from the previous frame, before this frame's UI runs.
        if let Some(text) = session.poll_sent_message() {
            tracing::info!(text = %text, "Message sent from overlay");
            transcript.push(ChatMessage::new("you", text));
            changed = true;
        }
        if let Some(state) = session.poll_dashboard_state_change() {
            tracing::info!(show_settings = state.show_settings, tab = state.tab_name(), "Dashboard navigation changed");
        }
        if let Some(settings) = session.poll_settings_change() {
            tracing::info!(settings = ?settings, "Overlay settings applied from dashboard");
        }

        if changed {
            let excess = transcript.len().saturating_sub(MAX_MESSAGES);
            transcript.drain(..excess);
            session.replace_chat_transcript(transcript.clone());
        }

        let report = session.tick();
        submitted[0] += u64::from(report.hud_submitted);
        submitted[1] += u64::from(report.dashboard_submitted);
        submitted[2] += u64::from(report.keyboard_submitted.unwrap_or(false));
        keys_typed += u64::from(report.keys_typed);
        frame += 1;

        if last_report.elapsed() >= REPORT_INTERVAL {
            let pulses = session.runtime().haptics().len();
            session.runtime_mut().clear_haptics();
            tracing::info!(
                frame,
                hud = submitted[0],
                dashboard = submitted[1],
                keyboard = submitted[2],
                keys_typed,
                haptic_pulses = pulses,
                keyboard_visible = session.keyboard_visible(),
                "Overlay status"
            );
            last_report = Instant::now();
        }
    }

    let elapsed = started.elapsed().as_secs_f64();
    tracing::info!(
        frames = frame,
        fps = frame as f64 / elapsed.max(1e-6),
        "Overlay host shutting down."
    );
    session.shutdown();
    Ok(())
}
