// SPDX-License-Identifier: MPL-2.0

//! HTTP transport tests against a local one-shot server

use camera_uploader::backends::camera::{CameraFrame, frame_channel};
use camera_uploader::errors::UploadError;
use camera_uploader::uploader::{
    EncodedImage, EncodingFormat, HttpTransport, TickOutcome, UploadTransport,
};
use camera_uploader::{CaptureUploader, VideoSurface};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// A request as received on the wire
struct RawRequest {
    head: String,
    body: Vec<u8>,
}

impl RawRequest {
    fn request_line(&self) -> &str {
        self.head.lines().next().unwrap_or_default()
    }

    fn header(&self, name: &str) -> Option<String> {
        self.head.lines().skip(1).find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim()
                .eq_ignore_ascii_case(name)
                .then(|| value.trim().to_string())
        })
    }
}

/// Accept one request, answer it with `status` and hand it back
async fn serve_once(status: &'static str) -> (String, JoinHandle<RawRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let server_url = format!("http://{}", listener.local_addr().unwrap());

    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut raw = Vec::new();
        let mut chunk = [0u8; 4096];
        let request = loop {
            let n = socket.read(&mut chunk).await.unwrap();
            assert!(n > 0, "client closed before sending a full request");
            raw.extend_from_slice(&chunk[..n]);

            let Some(split) = raw.windows(4).position(|w| w == b"\r\n\r\n") else {
                continue;
            };
            let mut request = RawRequest {
                head: String::from_utf8_lossy(&raw[..split]).to_string(),
                body: Vec::new(),
            };
            let length: usize = request
                .header("content-length")
                .and_then(|v| v.parse().ok())
                .unwrap_or(0);
            if raw.len() >= split + 4 + length {
                request.body = raw[split + 4..split + 4 + length].to_vec();
                break request;
            }
        };

        let response = format!(
            "HTTP/1.1 {}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
            status
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        let _ = socket.shutdown().await;
        request
    });

    (server_url, server)
}

fn jpeg_bytes(data: Vec<u8>) -> EncodedImage {
    EncodedImage {
        data,
        format: EncodingFormat::Jpeg,
        width: 1,
        height: 1,
    }
}

#[tokio::test]
async fn test_posts_raw_jpeg_to_upload_path() {
    let (server_url, server) = serve_once("200 OK").await;
    let transport = HttpTransport::new(&server_url).unwrap();

    transport.send(jpeg_bytes(vec![1, 2, 3, 4])).await.unwrap();
    let request = server.await.unwrap();

    assert_eq!(request.request_line(), "POST /upload HTTP/1.1");
    assert_eq!(request.header("content-type").as_deref(), Some("image/jpeg"));
    assert_eq!(request.header("content-length").as_deref(), Some("4"));
    assert_eq!(request.body, vec![1, 2, 3, 4]);
}

#[tokio::test]
async fn test_error_status_is_not_a_failure() {
    let (server_url, server) = serve_once("500 Internal Server Error").await;
    let transport = HttpTransport::new(&server_url).unwrap();

    assert!(transport.send(jpeg_bytes(vec![0xff, 0xd8])).await.is_ok());
    assert_eq!(server.await.unwrap().body, vec![0xff, 0xd8]);
}

#[tokio::test]
async fn test_unreachable_server_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let server_url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let transport = HttpTransport::new(&server_url).unwrap();
    let result = transport.send(jpeg_bytes(vec![1])).await;
    assert!(matches!(result, Err(UploadError::Transport(_))));
}

#[tokio::test]
async fn test_tick_uploads_decodable_snapshot() {
    let (server_url, server) = serve_once("204 No Content").await;
    let surface = VideoSurface::new();
    let (tx, rx) = frame_channel();
    surface.set_source(Some(rx));
    tx.send_replace(Some(Arc::new(CameraFrame::from_rgba(
        8,
        6,
        [40, 80, 120, 255].repeat(8 * 6),
    ))));
    let mut uploader = CaptureUploader::with_http(surface, &server_url).unwrap();

    assert_eq!(
        uploader.tick(),
        TickOutcome::Dispatched {
            width: 8,
            height: 6
        }
    );
    let request = server.await.unwrap();
    uploader.tasks().wait_idle().await;

    assert_eq!(request.request_line(), "POST /upload HTTP/1.1");
    let decoded =
        image::load_from_memory_with_format(&request.body, image::ImageFormat::Jpeg).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (8, 6));
    assert_eq!(uploader.stats().snapshot().delivered, 1);
}
