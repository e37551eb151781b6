//! Development server for quicksnatch
//!
//! Serves the static bundle and level JSON, plus a stand-in for the
//! production flag-verification endpoint so the whole loop works locally.
//! Expected answers live in levels/answers.json (level id -> flag); the
//! real backend owns accounts, progress, and rate limiting.

use std::collections::HashMap;
use std::fs;
use std::io::Read;
use std::path::Path;
use tiny_http::{Header, Method, Response, Server};

const DEFAULT_PORT: u16 = 8080;

fn main() {
    let port = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_PORT);

    let addr = format!("0.0.0.0:{}", port);
    let server = match Server::http(&addr) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("failed to start server on {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    println!("quicksnatch dev server on http://localhost:{}", port);

    for mut request in server.incoming_requests() {
        let url_path = request.url().to_string();

        let response = if request.method() == &Method::Post && url_path == "/api/verify" {
            let mut body = String::new();
            let _ = request.as_reader().read_to_string(&mut body);
            verify_stub(&body)
        } else {
            serve_file(&route(&url_path))
        };

        let _ = request.respond(response);
    }
}

/// Map a URL path to a file on disk.
fn route(url_path: &str) -> String {
    match url_path {
        "/" => "web/index.html".to_string(),
        p if p.starts_with("/challenge/") => "web/index.html".to_string(),
        p if p.starts_with("/levels/") => p.trim_start_matches('/').to_string(),
        p => format!("web/{}", p.trim_start_matches('/')),
    }
}

/// Dev-only flag check against levels/answers.json.
fn verify_stub(body: &str) -> Response<std::io::Cursor<Vec<u8>>> {
    #[derive(serde::Deserialize)]
    struct Req {
        level: u32,
        flag: String,
    }

    let answers: HashMap<String, String> = fs::read_to_string("levels/answers.json")
        .ok()
        .and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default();

    let reply = match serde_json::from_str::<Req>(body) {
        Ok(req) => {
            let correct = answers.get(&req.level.to_string()) == Some(&req.flag);
            if correct {
                format!(
                    r#"{{"success":true,"message":"Correct! Moving to next level.","next_level":{}}}"#,
                    req.level + 1
                )
            } else {
                r#"{"success":false,"message":"Incorrect flag. Keep digging."}"#.to_string()
            }
        }
        Err(_) => r#"{"success":false,"message":"Malformed request."}"#.to_string(),
    };

    json_response(reply)
}

fn json_response(body: String) -> Response<std::io::Cursor<Vec<u8>>> {
    let header = match Header::from_bytes("Content-Type", "application/json") {
        Ok(h) => h,
        Err(_) => return Response::from_string(body).with_status_code(200),
    };
    Response::from_string(body).with_header(header)
}

fn serve_file(path: &str) -> Response<std::io::Cursor<Vec<u8>>> {
    let path = Path::new(path);

    match fs::read(path) {
        Ok(contents) => {
            let mime = mime_type(path);
            match Header::from_bytes("Content-Type", mime) {
                Ok(header) => Response::from_data(contents).with_header(header),
                Err(_) => Response::from_data(contents),
            }
        }
        Err(_) => Response::from_string("404 Not Found").with_status_code(404),
    }
}

fn mime_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") => "text/html; charset=utf-8",
        Some("js") => "application/javascript",
        Some("wasm") => "application/wasm",
        Some("css") => "text/css",
        Some("json") => "application/json",
        Some("png") => "image/png",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        _ => "application/octet-stream",
    }
}
