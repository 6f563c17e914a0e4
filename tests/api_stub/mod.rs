#![allow(dead_code)]

use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Canned response for one request.
pub struct StubResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl StubResponse {
    pub fn json(value: serde_json::Value) -> Self {
        Self {
            status: 200,
            content_type: "application/json",
            body: value.to_string().into_bytes(),
        }
    }

    pub fn audio() -> Self {
        Self {
            status: 206,
            content_type: "audio/mpeg",
            body: vec![0xff, 0xfb],
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            content_type: "text/plain",
            body: b"stub error".to_vec(),
        }
    }
}

/// Local HTTP server answering from a routing closure and recording every
/// request path (with query).
pub struct StubServer {
    pub base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl StubServer {
    pub fn spawn<F>(route: F) -> Self
    where
        F: Fn(&str) -> StubResponse + Send + 'static,
    {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start stub server");
        let base_url = format!("http://{}", server.server_addr());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&requests);

        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let handle = thread::spawn(move || {
            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }

                let request = match server.recv_timeout(Duration::from_millis(20)) {
                    Ok(Some(req)) => req,
                    Ok(None) => continue,
                    Err(_) => break,
                };

                let url = request.url().to_string();
                seen.lock().expect("lock request log").push(url.clone());

                let StubResponse {
                    status,
                    content_type,
                    body,
                } = route(&url);
                let header = tiny_http::Header::from_bytes(
                    &b"Content-Type"[..],
                    content_type.as_bytes(),
                )
                .expect("build header");
                let response = tiny_http::Response::from_data(body)
                    .with_status_code(status)
                    .with_header(header);
                let _ = request.respond(response);
            }
        });

        Self {
            base_url,
            requests,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().expect("lock request log").clone()
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Value of `name` in the query string of `url`.
pub fn query_param<'a>(url: &'a str, name: &str) -> Option<&'a str> {
    let (_, query) = url.split_once('?')?;
    query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (key == name).then_some(value)
    })
}

pub fn verse_json(chapter: u32, number: u32) -> serde_json::Value {
    serde_json::json!({
        "id": chapter * 1000 + number,
        "chapter_id": chapter,
        "verse_number": number,
        "verse_key": format!("{chapter}:{number}"),
        "text_uthmani": format!("آية {number}"),
        "translations": [{ "resource_id": 131, "text": format!("Verse <sup foot_note=1>1</sup>`{number}`") }],
        "words": [
            { "position": 1, "text_uthmani": "كلمة", "translation": { "text": "word" } }
        ]
    })
}
