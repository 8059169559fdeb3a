// ================================
// src/main.rs - rover driver loop
// ================================
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use sonar_rover::{make_commander, Command, Commander, RoverParams};

fn init_logging(debug_mode: bool) {
    let default_level = if debug_mode { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    // stdout carries the command stream
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

#[cfg(feature = "rpi")]
fn open_platform() -> Result<sonar_rover::hardware::rpi::RpiPlatform> {
    sonar_rover::hardware::rpi::RpiPlatform::open().context("failed to open gpio chip")
}

#[cfg(not(feature = "rpi"))]
fn open_platform() -> Result<sonar_rover::hardware::unavailable::NoGpio> {
    Ok(sonar_rover::hardware::unavailable::NoGpio)
}

fn emit(out: &mut impl Write, cmd: Command) -> io::Result<()> {
    writeln!(out, "{}", cmd)?;
    out.flush()
}

fn drive(
    commander: &mut dyn Commander,
    period: Duration,
    running: &AtomicBool,
) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    while running.load(Ordering::SeqCst) {
        let started = Instant::now();
        let cmd = commander.scan_cmd();
        debug!("tick: {}", cmd);
        emit(&mut out, cmd).context("failed to write command")?;

        if let Some(rest) = period.checked_sub(started.elapsed()) {
            thread::sleep(rest);
        }
    }

    emit(&mut out, Command::Brake).context("failed to write final brake")?;
    Ok(())
}

fn main() -> Result<()> {
    let params = RoverParams::load()?;
    init_logging(params.debug_mode);

    info!("Sonar rover starting with {} commander", params.commander);
    if params.debug_mode {
        debug!("{:#?}", params);
    }

    let mut platform = open_platform()?;
    let mut commander = make_commander(params.commander, &params, &mut platform)?;

    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    ctrlc::set_handler(move || {
        flag.store(false, Ordering::SeqCst);
    })
    .context("failed to install Ctrl-C handler")?;

    drive(
        commander.as_mut(),
        Duration::from_millis(params.control_period_ms),
        &running,
    )?;
    info!("stopped");
    Ok(())
}
