//! HTTP collaborators against loopback servers.
//!
//! These tests verify that:
//! 1. Instructions are POSTed verbatim as the request body
//! 2. Every delivery failure comes back as an error within the timeout
//! 3. Camera snapshots (single JPEG and MJPEG) decode into frames

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use follow_pilot::{
    Dispatcher, FrameSource, HttpDispatcher, HttpDispatcherConfig, HttpSnapshotSource,
    HttpSourceConfig, Instruction, WireFormat,
};

fn read_request(stream: &mut TcpStream) -> String {
    stream
        .set_read_timeout(Some(Duration::from_secs(2)))
        .expect("read timeout");
    let mut request = Vec::new();
    let mut buf = [0u8; 1024];
    loop {
        let n = match stream.read(&mut buf) {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        request.extend_from_slice(&buf[..n]);
        if let Some(pos) = request.windows(4).position(|w| w == b"\r\n\r\n") {
            let headers = String::from_utf8_lossy(&request[..pos]).to_ascii_lowercase();
            let body_len = headers
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if request.len() >= pos + 4 + body_len {
                break;
            }
        }
    }
    String::from_utf8_lossy(&request).into_owned()
}

/// Serve exactly one request with the given status line, headers and body.
fn serve_once(
    status: &'static str,
    content_type: &'static str,
    body: Vec<u8>,
) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback");
    let addr = listener.local_addr().expect("local addr");
    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept");
        let request = read_request(&mut stream);
        let head = format!(
            "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            status,
            content_type,
            body.len()
        );
        let _ = stream.write_all(head.as_bytes());
        let _ = stream.write_all(&body);
        request
    });
    (format!("http://{}/endpoint", addr), handle)
}

fn dispatcher(url: String, timeout: Duration, wire_format: WireFormat) -> HttpDispatcher {
    HttpDispatcher::new(HttpDispatcherConfig {
        url,
        timeout,
        wire_format,
    })
    .expect("dispatcher")
}

fn jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([10, 200, 30]));
    let mut out = std::io::Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Jpeg).expect("encode jpeg");
    out.into_inner()
}

#[test]
fn posts_instruction_verbatim() {
    let (url, server) = serve_once("200 OK", "text/plain", b"ok".to_vec());
    let mut http = dispatcher(url, Duration::from_secs(1), WireFormat::Standard);

    http.dispatch(Instruction::TurnLeft).expect("dispatch");

    let request = server.join().expect("server thread");
    assert!(request.starts_with("POST /endpoint"));
    assert!(request.ends_with("\r\n\r\nturn-left"));
}

#[test]
fn posts_legacy_vocabulary() {
    let (url, server) = serve_once("200 OK", "text/plain", Vec::new());
    let mut http = dispatcher(url, Duration::from_secs(1), WireFormat::Legacy);

    http.dispatch(Instruction::ResetServoActuator).expect("dispatch");

    let request = server.join().expect("server thread");
    assert!(request.ends_with("\r\n\r\nrstservo"));
}

#[test]
fn error_status_is_reported_not_retried() {
    let (url, server) = serve_once("500 Internal Server Error", "text/plain", Vec::new());
    let mut http = dispatcher(url, Duration::from_secs(1), WireFormat::Standard);

    assert!(http.dispatch(Instruction::Stop).is_err());
    server.join().expect("server thread");
}

#[test]
fn refused_connection_fails_fast() {
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback");
        listener.local_addr().expect("local addr")
    };
    let mut http = dispatcher(
        format!("http://{}/command", addr),
        Duration::from_millis(100),
        WireFormat::Standard,
    );

    let started = Instant::now();
    assert!(http.dispatch(Instruction::MoveForward).is_err());
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[test]
fn silent_vehicle_is_abandoned_at_timeout() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback");
    let addr = listener.local_addr().expect("local addr");
    thread::spawn(move || {
        if let Ok((_stream, _)) = listener.accept() {
            thread::sleep(Duration::from_secs(3));
        }
    });
    let mut http = dispatcher(
        format!("http://{}/command", addr),
        Duration::from_millis(100),
        WireFormat::Standard,
    );

    let started = Instant::now();
    assert!(http.dispatch(Instruction::Stop).is_err());
    assert!(started.elapsed() < Duration::from_millis(1500));
}

#[test]
fn camera_snapshot_decodes_to_frame() {
    let (url, server) = serve_once("200 OK", "image/jpeg", jpeg(32, 24));
    let mut source = HttpSnapshotSource::new(HttpSourceConfig {
        url,
        timeout: Duration::from_secs(2),
    })
    .expect("source");

    let frame = source.get_frame().expect("frame");
    assert_eq!((frame.width(), frame.height()), (32, 24));
    assert_eq!(source.stats().frames_captured, 1);
    assert!(source.is_healthy());

    let request = server.join().expect("server thread");
    assert!(request.starts_with("GET /endpoint"));
}

#[test]
fn camera_mjpeg_yields_first_frame() {
    let mut body = b"--frame\r\nContent-Type: image/jpeg\r\n\r\n".to_vec();
    body.extend_from_slice(&jpeg(16, 8));
    body.extend_from_slice(b"\r\n--frame\r\n");
    let (url, server) = serve_once("200 OK", "multipart/x-mixed-replace; boundary=frame", body);
    let mut source = HttpSnapshotSource::new(HttpSourceConfig {
        url,
        timeout: Duration::from_secs(2),
    })
    .expect("source");

    let frame = source.get_frame().expect("frame");
    assert_eq!((frame.width(), frame.height()), (16, 8));
    server.join().expect("server thread");
}

#[test]
fn camera_garbage_is_an_absent_frame() {
    let (url, server) = serve_once("200 OK", "image/jpeg", b"not a jpeg".to_vec());
    let mut source = HttpSnapshotSource::new(HttpSourceConfig {
        url,
        timeout: Duration::from_secs(2),
    })
    .expect("source");

    assert!(source.get_frame().is_none());
    assert_eq!(source.stats().failures, 1);
    server.join().expect("server thread");
}
