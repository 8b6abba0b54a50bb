// src/main.rs

//! `epd-demo` - drives the emulator the way a program written for a real
//! e-paper panel would: draw a frame, hand the buffer to `display`, sleep,
//! repeat. Ctrl-C closes the display in an orderly way.

use anyhow::Context;
use clap::Parser;
use embedded_graphics::{
    mono_font::MonoTextStyle,
    pixelcolor::Rgb888,
    prelude::*,
    primitives::{Ellipse, Line, PrimitiveStyle},
    text::{Baseline, Text},
};
use epd_emulator::{
    config::{available_models, DEFAULT_CONFIG_DIR},
    draw::draw_on,
    BackendKind, Bounds, EmulatorOptions, Epd, ShapeStyle, DEFAULT_FONT,
};
use log::{error, info, warn};
use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Granularity of the sleep between frames, so Ctrl-C and a closed window
/// are noticed promptly.
const POLL_STEP: Duration = Duration::from_millis(100);

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

extern "C" fn on_sigint(_signal: libc::c_int) {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

#[derive(Parser, Debug)]
#[command(name = "epd-demo", version, about = "Alternate two demo frames on an emulated e-paper display")]
struct Args {
    /// Display model to emulate (a descriptor name such as epd2in13).
    #[arg(long, default_value = "epd2in13")]
    config: String,

    /// Show the display in a desktop window.
    #[arg(long, conflicts_with = "headless")]
    window: bool,

    /// Run without any output (useful with --screenshot).
    #[arg(long)]
    headless: bool,

    /// Use an RGB frame instead of black and white.
    #[arg(long)]
    color: bool,

    /// Seconds between frames, also the refresh period of the backend.
    #[arg(long, default_value_t = 5)]
    interval: u64,

    /// Swap width and height.
    #[arg(long)]
    reverse: bool,

    /// HTTP port (0 picks a free one).
    #[arg(long, default_value_t = 5000)]
    port: u16,

    /// Do not open the page in a browser.
    #[arg(long)]
    no_browser: bool,

    /// Integer window scale (1, 2 or 4).
    #[arg(long, default_value_t = 1)]
    scale: u8,

    /// Write a PNG of every frame to this path.
    #[arg(long)]
    screenshot: Option<PathBuf>,

    /// List the available display models and exit.
    #[arg(long)]
    list: bool,
}

impl Args {
    fn backend(&self) -> BackendKind {
        if self.window {
            BackendKind::Window
        } else if self.headless {
            BackendKind::Headless
        } else {
            BackendKind::Http
        }
    }

    fn options(&self) -> EmulatorOptions {
        EmulatorOptions {
            config_file: self.config.clone(),
            backend: self.backend(),
            use_color: self.color,
            update_interval: Duration::from_secs(self.interval),
            reverse_orientation: self.reverse,
            port: self.port,
            open_browser: !self.no_browser,
            window_scale: self.scale,
            ..EmulatorOptions::default()
        }
    }
}

fn install_sigint_handler() -> anyhow::Result<()> {
    let action = SigAction::new(
        SigHandler::Handler(on_sigint),
        SaFlags::empty(),
        SigSet::empty(),
    );
    // SAFETY: the handler only stores to an atomic.
    unsafe { sigaction(Signal::SIGINT, &action) }.context("Failed to install SIGINT handler")?;
    Ok(())
}

/// Draws frame A (ellipse) or frame B (rectangle) the way hardware driver
/// code does: everything on the canvas first, then one `display` with the
/// frame buffer.
fn draw_demo_frame(epd: &Epd, frame_a: bool) -> anyhow::Result<()> {
    let (width, height) = (epd.width() as i32, epd.height() as i32);
    let border = Bounds::new(1, 1, width - 1, height - 1).to_rectangle()?;
    let inner = Bounds::new(20, 40, width - 20, height - 20).to_rectangle()?;
    let label = if frame_a { "Frame A" } else { "Frame B" };

    let outline = ShapeStyle::outline(0u8).to_primitive_style();
    let ink = PrimitiveStyle::with_stroke(Rgb888::BLACK, 1);
    let text_style = MonoTextStyle::new(DEFAULT_FONT, Rgb888::BLACK);

    epd.with_canvas(|frame| {
        let page = frame.bounding_box();
        draw_on(frame, &page.into_styled(PrimitiveStyle::with_fill(Rgb888::WHITE)));
        draw_on(frame, &border.into_styled(outline));
        draw_on(frame, &Line::new(Point::new(1, 20), Point::new(width - 1, 20)).into_styled(ink));
        draw_on(
            frame,
            &Text::with_baseline("EPD Emulator Demo", Point::new(10, 5), text_style, Baseline::Top),
        );
        if frame_a {
            draw_on(frame, &Ellipse::new(inner.top_left, inner.size).into_styled(outline));
        } else {
            draw_on(frame, &inner.into_styled(outline));
        }
        draw_on(
            frame,
            &Text::with_baseline(label, Point::new(30, height / 2), text_style, Baseline::Top),
        );
    })
    .with_context(|| format!("Failed to draw {}", label))?;

    let buffer = epd.get_frame_buffer()?;
    epd.display(&buffer).context("Failed to display frame")?;
    info!("Displayed {}", label);
    Ok(())
}

/// Sleeps for `duration`, returning early with false if the demo should stop.
fn wait(epd: &Epd, duration: Duration) -> bool {
    let deadline = Instant::now() + duration;
    while Instant::now() < deadline {
        if INTERRUPTED.load(Ordering::SeqCst) {
            info!("Interrupted, shutting down");
            return false;
        }
        if !epd.is_open() {
            info!("Display closed, shutting down");
            return false;
        }
        thread::sleep(POLL_STEP);
    }
    true
}

fn run(epd: &Epd, args: &Args) -> anyhow::Result<()> {
    epd.init()?;
    epd.clear(255u8).context("Failed to clear display")?;

    if let Some(http) = epd.backend().and_then(|b| b.as_http()) {
        info!("Open {} to see the display", http.url());
    }

    let mut frame_a = true;
    loop {
        draw_demo_frame(epd, frame_a)?;
        if let Some(path) = &args.screenshot {
            epd.save_png(path)
                .with_context(|| format!("Failed to write screenshot to {}", path.display()))?;
        }
        frame_a = !frame_a;

        if !wait(epd, Duration::from_secs(args.interval)) {
            return Ok(());
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_micros()
        .init();

    let args = Args::parse();

    if args.list {
        let models = available_models(&DEFAULT_CONFIG_DIR)
            .with_context(|| format!("Failed to list {}", DEFAULT_CONFIG_DIR.display()))?;
        for model in models {
            println!("{}", model);
        }
        return Ok(());
    }

    install_sigint_handler()?;

    let mut epd = Epd::new(args.options())
        .with_context(|| format!("Failed to start emulator for '{}'", args.config))?;

    let outcome = run(&epd, &args);
    if let Err(e) = &outcome {
        error!("Demo failed: {:#}", e);
    }
    if let Err(e) = epd.dev_exit() {
        warn!("Teardown failed: {}", e);
    }
    outcome
}
