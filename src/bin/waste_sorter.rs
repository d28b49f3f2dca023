//! waste-sorter - live waste sorting from a camera feed
//!
//! This binary:
//! 1. Loads configuration (file, environment, command line)
//! 2. Prepares the detector backend and category tables
//! 3. Runs the frame loop on a worker thread (source -> reconciler -> sink)
//! 4. Runs the sidebar render pass on the main thread until Ctrl-C or the frame limit

use anyhow::{anyhow, Result};
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use waste_sorter::ui::{Ui, UiMode};
use waste_sorter::{
    open_source, registry_from_settings, FrameReconciler, LatestFrameSink, ReconcilerSettings,
    SessionState, SessionStats, Sidebar, SorterConfig, StreamSession,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Config file (.toml or .json).
    #[arg(long, env = "WASTE_SORTER_CONFIG")]
    config: Option<PathBuf>,
    /// Frame source: stub://<name> or a V4L2 device path.
    #[arg(long)]
    source: Option<String>,
    /// Detector backend: scripted or tract.
    #[arg(long)]
    backend: Option<String>,
    /// Stop after this many frames (0 = run until Ctrl-C).
    #[arg(long, default_value_t = 0)]
    frames: u64,
    /// Sidebar render interval in milliseconds.
    #[arg(long, default_value_t = 200)]
    render_ms: u64,
    /// Output style: auto, plain or pretty.
    #[arg(long)]
    ui: Option<String>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let ui = Ui::new(UiMode::parse(args.ui.as_deref()), std::io::stdout().is_terminal());

    let cfg = {
        let _stage = ui.stage("load configuration");
        let mut cfg = SorterConfig::load_from(args.config.as_deref())?;
        cfg.override_with(args.source.clone(), args.backend.clone())?;
        cfg
    };
    log::debug!("rtc configuration: {}", cfg.rtc.to_rtc_configuration());

    let detector = {
        let _stage = ui.stage("prepare detector");
        registry_from_settings(&cfg.detector)?.prepare_default()?
    };

    let state = SessionState::new();
    let running = Arc::new(AtomicBool::new(true));
    {
        let running = running.clone();
        ctrlc::set_handler(move || running.store(false, Ordering::SeqCst))
            .map_err(|e| anyhow!("failed to install Ctrl-C handler: {}", e))?;
    }

    let worker = {
        let tables = cfg.shared_category_tables();
        let settings = ReconcilerSettings::from_config(&cfg);
        let stream = cfg.stream.clone();
        let state = state.clone();
        let running = running.clone();
        let frame_limit = args.frames;
        std::thread::Builder::new()
            .name("frames".into())
            .spawn(move || -> Result<SessionStats> {
                let source = open_source(&stream)?;
                let reconciler = FrameReconciler::new(detector, tables, state, settings);
                let sink = LatestFrameSink::new();
                let mut session = StreamSession::new(source, reconciler, Box::new(sink));
                session.start()?;
                let result = run_frames(&mut session, &running, frame_limit);
                session.stop();
                result.map(|()| session.stats())
            })?
    };

    let mut sidebar = Sidebar::new();
    let interval = Duration::from_millis(args.render_ms.max(10));
    while !worker.is_finished() {
        if sidebar.render(&state) {
            ui.print_sidebar(&sidebar);
        }
        std::thread::sleep(interval);
    }
    // The session has stopped; this pass clears the placeholders.
    sidebar.render(&state);
    ui.print_sidebar(&sidebar);

    let stats = worker
        .join()
        .map_err(|_| anyhow!("frame thread panicked"))??;
    log::info!(
        "done: {} frames, {} category updates, {} failed frames",
        stats.frames,
        stats.updates,
        stats.failures
    );
    Ok(())
}

fn run_frames(session: &mut StreamSession, running: &AtomicBool, frame_limit: u64) -> Result<()> {
    while running.load(Ordering::SeqCst) {
        if frame_limit > 0 && session.stats().frames >= frame_limit {
            break;
        }
        session.step()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn args_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn config_path_falls_back_to_environment() {
        std::env::set_var("WASTE_SORTER_CONFIG", "/etc/waste-sorter.toml");
        let args = Args::try_parse_from(["waste-sorter", "--frames", "5"]).unwrap();
        assert_eq!(args.config, Some(PathBuf::from("/etc/waste-sorter.toml")));
        assert_eq!(args.frames, 5);

        let args =
            Args::try_parse_from(["waste-sorter", "--config", "local.json"]).unwrap();
        assert_eq!(args.config, Some(PathBuf::from("local.json")));
        std::env::remove_var("WASTE_SORTER_CONFIG");
    }
}
