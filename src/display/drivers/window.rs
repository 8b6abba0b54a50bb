//! Desktop window driver (minifb).
//!
//! The window lives on its own thread, which owns it for its whole life and
//! takes commands over a channel: `Repaint` re-reads the shared frame and
//! pushes it to the window, `Close` ends the thread. Between commands the
//! thread keeps pumping window events so the window stays responsive.
//! A `RefreshActor` sends `Repaint` every update interval; `publish()` sends
//! one immediately.
//!
//! Platforms that insist on windows living on the main thread (macOS) cannot
//! use this driver; use the HTTP driver there.

use crate::display::driver::{DisplayDriver, DriverConfig};
use crate::display::refresh::RefreshActor;
use crate::error::{EpdError, Result};
use crate::frame::SharedFrame;
use log::*;
use minifb::{Scale, Window, WindowOptions};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// How often window events are pumped while no command arrives.
const EVENT_POLL_INTERVAL: Duration = Duration::from_millis(16);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WindowCommand {
    Repaint,
    Close,
}

pub struct WindowDriver {
    commands: Sender<WindowCommand>,
    open: Arc<AtomicBool>,
    refresh: Option<RefreshActor>,
    thread_handle: Option<JoinHandle<()>>,
}

impl DisplayDriver for WindowDriver {
    fn start(config: &DriverConfig, frame: SharedFrame) -> Result<Self> {
        let (commands, command_rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::sync_channel::<std::result::Result<(), String>>(1);
        let open = Arc::new(AtomicBool::new(false));

        let window_config = config.clone();
        let window_open = Arc::clone(&open);
        let thread_handle = thread::Builder::new()
            .name("epd-window".to_string())
            .spawn(move || {
                let options = WindowOptions {
                    resize: false,
                    scale: match window_config.window_scale {
                        2 => Scale::X2,
                        4 => Scale::X4,
                        _ => Scale::X1,
                    },
                    ..WindowOptions::default()
                };
                let window = match Window::new(
                    &window_config.title,
                    window_config.width as usize,
                    window_config.height as usize,
                    options,
                ) {
                    Ok(window) => window,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e.to_string()));
                        return;
                    }
                };
                window_open.store(true, Ordering::SeqCst);
                let _ = ready_tx.send(Ok(()));

                run_window(window, &window_config, &frame, command_rx);
                window_open.store(false, Ordering::SeqCst);
            })
            .map_err(|source| EpdError::Spawn {
                name: "epd-window",
                source,
            })?;

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(reason)) => {
                let _ = thread_handle.join();
                return Err(EpdError::Window(reason));
            }
            Err(_) => {
                let _ = thread_handle.join();
                return Err(EpdError::Window(
                    "window thread exited during startup".to_string(),
                ));
            }
        }
        info!(
            "WindowDriver: Opened '{}' ({}x{})",
            config.title, config.width, config.height
        );

        let refresh_tx = commands.clone();
        let refresh = RefreshActor::spawn("epd-window-refresh", config.update_interval, move || {
            refresh_tx.send(WindowCommand::Repaint).is_ok()
        })?;

        Ok(Self {
            commands,
            open,
            refresh: Some(refresh),
            thread_handle: Some(thread_handle),
        })
    }

    fn publish(&self) -> Result<()> {
        if !self.is_open() {
            debug!("WindowDriver: Window closed, publish ignored");
            return Ok(());
        }
        if self.commands.send(WindowCommand::Repaint).is_err() {
            debug!("WindowDriver: Window thread gone, publish ignored");
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn shutdown(&mut self) -> Result<()> {
        if let Some(mut refresh) = self.refresh.take() {
            refresh.stop();
        }
        if let Some(handle) = self.thread_handle.take() {
            let _ = self.commands.send(WindowCommand::Close);
            if let Err(e) = handle.join() {
                error!("WindowDriver: Window thread panicked: {:?}", e);
            }
            info!("WindowDriver: Window closed");
        }
        Ok(())
    }
}

impl Drop for WindowDriver {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

/// Window thread body: render, then serve commands until closed.
fn run_window(
    mut window: Window,
    config: &DriverConfig,
    frame: &SharedFrame,
    commands: Receiver<WindowCommand>,
) {
    render(&mut window, config, frame);
    loop {
        match commands.recv_timeout(EVENT_POLL_INTERVAL) {
            Ok(WindowCommand::Repaint) => render(&mut window, config, frame),
            Ok(WindowCommand::Close) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => window.update(),
        }
        if !window.is_open() {
            info!("WindowDriver: Window closed by user");
            break;
        }
    }
}

fn render(window: &mut Window, config: &DriverConfig, frame: &SharedFrame) {
    // Copy the pixels out so the lock is not held while the window presents.
    let buffer = match frame.lock() {
        Ok(frame) => frame.to_0rgb(),
        Err(_) => {
            error!("WindowDriver: Frame lock poisoned, skipping repaint");
            return;
        }
    };
    trace!("WindowDriver: Repaint");
    if let Err(e) =
        window.update_with_buffer(&buffer, config.width as usize, config.height as usize)
    {
        warn!("WindowDriver: Failed to update window: {}", e);
    }
}
