//! HTTP display driver (tiny_http).
//!
//! Serves a page that reloads the frame as a PNG every update interval:
//!
//! - `GET /` - the page
//! - `GET /screen.png` - the cached PNG (query string ignored)
//!
//! The PNG is encoded once at startup, then re-encoded by a `RefreshActor`
//! every update interval and by every `publish()`. Requests never touch the
//! frame itself, only the cached bytes.

use crate::display::driver::{DisplayDriver, DriverConfig};
use crate::display::refresh::RefreshActor;
use crate::error::{EpdError, Result};
use crate::frame::SharedFrame;
use log::*;
use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tiny_http::{Header, Method, Request, Response, Server};

/// Delay before the browser is pointed at the page, so the listener is up.
const BROWSER_LAUNCH_DELAY: Duration = Duration::from_secs(1);

type CachedPng = Arc<RwLock<Vec<u8>>>;

pub struct HttpDriver {
    frame: SharedFrame,
    png: CachedPng,
    server: Arc<Server>,
    local_addr: SocketAddr,
    open: AtomicBool,
    refresh: Option<RefreshActor>,
    listener: Option<JoinHandle<()>>,
}

impl HttpDriver {
    /// Address the listener is bound to (useful with port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// URL of the page.
    pub fn url(&self) -> String {
        format!("http://{}/", self.local_addr)
    }

    /// The PNG currently served at `/screen.png`.
    pub fn cached_png(&self) -> Result<Vec<u8>> {
        Ok(self.png.read()?.clone())
    }
}

impl DisplayDriver for HttpDriver {
    fn start(config: &DriverConfig, frame: SharedFrame) -> Result<Self> {
        let png: CachedPng = Arc::new(RwLock::new(Vec::new()));
        refresh_png(&frame, &png)?;

        let server = Server::http(("127.0.0.1", config.port)).map_err(|e| EpdError::Bind {
            port: config.port,
            reason: e.to_string(),
        })?;
        let local_addr = server.server_addr().to_ip().ok_or_else(|| EpdError::Bind {
            port: config.port,
            reason: "listener is not bound to an IP address".to_string(),
        })?;
        let server = Arc::new(server);

        let page = index_page(&config.title, config.update_interval);
        let listener_server = Arc::clone(&server);
        let listener_png = Arc::clone(&png);
        let listener = thread::Builder::new()
            .name("epd-http".to_string())
            .spawn(move || {
                info!("HttpDriver: Listening on http://{}/", local_addr);
                for request in listener_server.incoming_requests() {
                    handle_request(request, &page, &listener_png);
                }
                debug!("HttpDriver: Listener thread exiting");
            })
            .map_err(|source| EpdError::Spawn {
                name: "epd-http",
                source,
            })?;

        let refresh_frame = Arc::clone(&frame);
        let refresh_cache = Arc::clone(&png);
        let refresh = RefreshActor::spawn("epd-http-refresh", config.update_interval, move || {
            if let Err(e) = refresh_png(&refresh_frame, &refresh_cache) {
                error!("HttpDriver: Periodic re-encode failed: {}", e);
            }
            true
        })?;

        let driver = Self {
            frame,
            png,
            server,
            local_addr,
            open: AtomicBool::new(true),
            refresh: Some(refresh),
            listener: Some(listener),
        };
        if config.open_browser {
            spawn_browser_launch(driver.url());
        }
        Ok(driver)
    }

    fn publish(&self) -> Result<()> {
        if !self.is_open() {
            return Err(EpdError::ShutDown);
        }
        trace!("HttpDriver: Re-encoding frame");
        refresh_png(&self.frame, &self.png)
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn shutdown(&mut self) -> Result<()> {
        self.open.store(false, Ordering::SeqCst);
        if let Some(mut refresh) = self.refresh.take() {
            refresh.stop();
        }
        if let Some(handle) = self.listener.take() {
            self.server.unblock();
            if let Err(e) = handle.join() {
                error!("HttpDriver: Listener thread panicked: {:?}", e);
            }
            info!("HttpDriver: Stopped listening on {}", self.local_addr);
        }
        Ok(())
    }
}

impl Drop for HttpDriver {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

/// Encodes the frame and swaps the result into the cache. The frame lock is
/// held only while encoding.
fn refresh_png(frame: &SharedFrame, png: &CachedPng) -> Result<()> {
    let bytes = frame.lock()?.to_png()?;
    *png.write()? = bytes;
    Ok(())
}

fn handle_request(request: Request, page: &str, png: &CachedPng) {
    let path = request.url().split('?').next().unwrap_or("/").to_string();
    trace!("HttpDriver: {} {}", request.method(), request.url());

    let response = match (request.method(), path.as_str()) {
        (Method::Get, "/") | (Method::Get, "/index.html") => {
            with_content_type(Response::from_string(page), "text/html; charset=utf-8")
        }
        (Method::Get, "/screen.png") => match png.read() {
            Ok(bytes) => with_content_type(Response::from_data(bytes.clone()), "image/png"),
            Err(_) => {
                error!("HttpDriver: PNG cache poisoned");
                Response::from_string("frame unavailable").with_status_code(500)
            }
        },
        _ => Response::from_string("Not Found").with_status_code(404),
    };

    if let Err(e) = request.respond(response) {
        warn!("HttpDriver: Failed to send response for {}: {}", path, e);
    }
}

fn with_content_type(
    mut response: Response<Cursor<Vec<u8>>>,
    content_type: &str,
) -> Response<Cursor<Vec<u8>>> {
    for (name, value) in [("Content-Type", content_type), ("Cache-Control", "no-store")] {
        match Header::from_bytes(name, value) {
            Ok(header) => response.add_header(header),
            Err(()) => warn!("HttpDriver: Invalid header {}: {}", name, value),
        }
    }
    response
}

fn index_page(title: &str, update_interval: Duration) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>
        #screenImage {{
            width: 50%;
            height: auto;
            border: 2px solid #333;
        }}
    </style>
    <script>
        function updateImage() {{
            var image = document.getElementById("screenImage");
            image.src = "screen.png?t=" + new Date().getTime();
        }}

        setInterval(updateImage, {update_ms});
    </script>
</head>
<body onload="updateImage()">
    <img id="screenImage" src="screen.png" alt="EPD Emulator">
</body>
</html>
"#,
        title = title,
        update_ms = update_interval.as_millis()
    )
}

/// Best effort: point the default browser at `url` shortly after startup.
fn spawn_browser_launch(url: String) {
    let spawned = thread::Builder::new()
        .name("epd-browser".to_string())
        .spawn(move || {
            thread::sleep(BROWSER_LAUNCH_DELAY);
            match open::that(&url) {
                Ok(()) => info!("HttpDriver: Opened {} in the default browser", url),
                Err(e) => warn!("HttpDriver: Could not open a browser at {}: {}", url, e),
            }
        });
    if let Err(e) = spawned {
        warn!("HttpDriver: Failed to spawn browser launcher: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::frame::{Frame, PixelMode};
    use std::io::{Read, Write};
    use std::net::TcpStream;
    use std::sync::Mutex;

    fn test_config() -> DriverConfig {
        DriverConfig {
            width: 16,
            height: 8,
            title: "Waveshare 16x8 EPD Emulator".to_string(),
            update_interval: Duration::from_millis(1500),
            port: 0,
            open_browser: false,
            window_scale: 1,
        }
    }

    fn shared_frame() -> SharedFrame {
        Arc::new(Mutex::new(Frame::new(PixelMode::Binary, 16, 8, Color::WHITE)))
    }

    /// Minimal HTTP/1.0 client: returns (status line, headers, body).
    fn get(addr: SocketAddr, path: &str) -> (String, String, Vec<u8>) {
        let mut stream = TcpStream::connect(addr).unwrap();
        write!(stream, "GET {} HTTP/1.0\r\nHost: {}\r\n\r\n", path, addr).unwrap();
        let mut raw = Vec::new();
        stream.read_to_end(&mut raw).unwrap();

        let split = raw
            .windows(4)
            .position(|w| w == b"\r\n\r\n")
            .expect("response has no header terminator");
        let head = String::from_utf8_lossy(&raw[..split]).into_owned();
        let body = raw[split + 4..].to_vec();
        let (status, headers) = head.split_once("\r\n").unwrap_or((head.as_str(), ""));
        (status.to_string(), headers.to_ascii_lowercase(), body)
    }

    #[test_log::test]
    fn serves_the_page_with_the_refresh_interval() {
        let mut driver = HttpDriver::start(&test_config(), shared_frame()).unwrap();
        let (status, headers, body) = get(driver.local_addr(), "/");
        let body = String::from_utf8(body).unwrap();

        assert!(status.contains("200"), "status: {}", status);
        assert!(headers.contains("content-type: text/html"));
        assert!(body.contains(r#"<img id="screenImage" src="screen.png""#));
        assert!(body.contains("setInterval(updateImage, 1500)"));
        driver.shutdown().unwrap();
    }

    #[test_log::test]
    fn serves_the_frame_as_png() {
        let mut driver = HttpDriver::start(&test_config(), shared_frame()).unwrap();
        let (status, headers, body) = get(driver.local_addr(), "/screen.png?t=12345");

        assert!(status.contains("200"), "status: {}", status);
        assert!(headers.contains("content-type: image/png"));
        let decoded = image::load_from_memory(&body).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 8));
        driver.shutdown().unwrap();
    }

    #[test]
    fn unknown_paths_are_not_found() {
        let driver = HttpDriver::start(&test_config(), shared_frame()).unwrap();
        let (status, _, _) = get(driver.local_addr(), "/favicon.ico");
        assert!(status.contains("404"), "status: {}", status);
    }

    #[test]
    fn publish_re_encodes_the_current_frame() {
        let frame = shared_frame();
        let driver = HttpDriver::start(&test_config(), Arc::clone(&frame)).unwrap();
        let before = driver.cached_png().unwrap();

        frame.lock().unwrap().set_pixel(3, 3, Color::BLACK);
        // The periodic refresh is far away; only publish can have updated the cache.
        assert_eq!(driver.cached_png().unwrap(), before);
        driver.publish().unwrap();

        let decoded = image::load_from_memory(&driver.cached_png().unwrap())
            .unwrap()
            .to_luma8();
        assert_eq!(decoded.get_pixel(3, 3)[0], 0);
        assert_eq!(decoded.get_pixel(4, 3)[0], 255);
    }

    #[test]
    fn binding_a_taken_port_fails() {
        let first = HttpDriver::start(&test_config(), shared_frame()).unwrap();
        let config = DriverConfig {
            port: first.local_addr().port(),
            ..test_config()
        };
        let err = HttpDriver::start(&config, shared_frame()).err().expect("second bind succeeded");
        assert!(matches!(err, EpdError::Bind { .. }), "got {:?}", err);
    }

    #[test]
    fn publish_after_shutdown_is_an_error() {
        let mut driver = HttpDriver::start(&test_config(), shared_frame()).unwrap();
        driver.shutdown().unwrap();
        driver.shutdown().unwrap();
        assert!(!driver.is_open());
        assert!(matches!(driver.publish(), Err(EpdError::ShutDown)));
    }
}
