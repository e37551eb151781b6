//! Browser glue
//!
//! Mounts the terminal engine onto the page and bridges its two external
//! interfaces:
//! - level data source: GET /levels/{id}.json (fallback descriptor on any
//!   failure)
//! - flag verification sink: POST /api/verify
//!
//! The renderer is deliberately dumb: it re-renders the engine's line
//! buffer after every consumed key and maps style hints to CSS classes.
//! No escape sequences anywhere.

#![cfg(target_arch = "wasm32")]

use crate::console_log;
use crate::flag::{VerifyRequest, VerifyResponse};
use crate::level::LevelDescriptor;
use crate::shell::StyleHint;
use crate::terminal::Terminal;
use std::cell::RefCell;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{spawn_local, JsFuture};

/// Delay before navigating to the next level, so the player can read the
/// success message.
const NAVIGATE_DELAY_MS: i32 = 1500;

thread_local! {
    static TERMINAL: RefCell<Option<Terminal>> = const { RefCell::new(None) };
}

fn with_term<R>(f: impl FnOnce(&mut Terminal) -> R) -> Option<R> {
    TERMINAL.with(|t| t.borrow_mut().as_mut().map(f))
}

/// Entry point: figure out which level the page shows, load its
/// descriptor, and mount the terminal.
pub fn boot() {
    let level_id = level_id_from_page();
    console_log!("[web] booting terminal for level {}", level_id);

    spawn_local(async move {
        let descriptor = load_level(level_id).await;
        mount(descriptor);
    });
}

/// Level id from the container's data attribute, or from a
/// /challenge/{id} path, defaulting to 1.
fn level_id_from_page() -> u32 {
    let document = match web_sys::window().and_then(|w| w.document()) {
        Some(d) => d,
        None => return 1,
    };

    if let Some(container) = document.get_element_by_id("terminal") {
        if let Some(attr) = container.get_attribute("data-level") {
            if let Ok(id) = attr.parse() {
                return id;
            }
        }
    }

    if let Some(window) = web_sys::window() {
        if let Ok(path) = window.location().pathname() {
            if let Some(rest) = path.strip_prefix("/challenge/") {
                if let Ok(id) = rest.trim_end_matches('/').parse() {
                    return id;
                }
            }
        }
    }

    1
}

/// Fetch and parse the level descriptor. Every failure mode falls back to
/// the minimal descriptor; the terminal always comes up.
async fn load_level(level_id: u32) -> LevelDescriptor {
    let url = format!("/levels/{}.json", level_id);
    match fetch_text("GET", &url, None).await {
        Ok((status, body)) if status == 200 => match LevelDescriptor::parse(&body) {
            Ok(desc) => desc,
            Err(e) => {
                console_log!("[web] level {} parse failed: {}", level_id, e);
                LevelDescriptor::fallback(level_id)
            }
        },
        Ok((status, _)) => {
            console_log!("[web] level {} load failed: HTTP {}", level_id, status);
            LevelDescriptor::fallback(level_id)
        }
        Err(e) => {
            console_log!("[web] level {} load failed: {}", level_id, e);
            LevelDescriptor::fallback(level_id)
        }
    }
}

/// Build the DOM surface and wire up input.
fn mount(descriptor: LevelDescriptor) {
    let document = match web_sys::window().and_then(|w| w.document()) {
        Some(d) => d,
        None => {
            console_log!("[web] no document; cannot mount");
            return;
        }
    };
    let container = match document.get_element_by_id("terminal") {
        Some(c) => c,
        None => {
            console_log!("[web] no #terminal container; cannot mount");
            return;
        }
    };

    container.set_inner_html(
        "<div class=\"terminal-output\"></div>\
         <div class=\"terminal-input-line\">\
           <span class=\"terminal-prompt\"></span>\
           <span class=\"terminal-input\"></span>\
           <span class=\"terminal-cursor\"></span>\
           <span class=\"terminal-input-post\"></span>\
         </div>",
    );

    let mut term = Terminal::new(descriptor);
    term.set_clock_text(String::from(js_sys::Date::new_0().to_string()));
    TERMINAL.with(|t| *t.borrow_mut() = Some(term));

    // Key handling drives the engine; the DOM is render-only
    {
        let closure = Closure::wrap(Box::new(|event: web_sys::KeyboardEvent| {
            on_key(event);
        }) as Box<dyn FnMut(_)>);

        let _ = document
            .add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
        closure.forget(); // Lives for the page lifetime
    }

    render();
}

fn on_key(event: web_sys::KeyboardEvent) {
    // Let browser shortcuts through except the ones the terminal owns
    if event.meta_key() || event.alt_key() {
        return;
    }

    let key = event.key();
    let code = event.code();
    let ctrl = event.ctrl_key();

    let consumed = with_term(|t| t.handle_key(&key, &code, ctrl)).unwrap_or(false);
    if !consumed {
        return;
    }
    event.prevent_default();

    if let Some(req) = with_term(|t| t.take_verify_request()).flatten() {
        spawn_verification(req);
    }
    render();
}

/// One verification round-trip, then feed the verdict back in.
fn spawn_verification(req: VerifyRequest) {
    spawn_local(async move {
        let result = verify(&req).await;
        with_term(|t| t.resolve_submission(result));
        render();
        if let Some(next) = with_term(|t| t.take_navigation()).flatten() {
            schedule_navigation(next);
        }
    });
}

async fn verify(req: &VerifyRequest) -> Result<VerifyResponse, String> {
    let body = serde_json::to_string(req).map_err(|e| e.to_string())?;
    let (status, text) = fetch_text("POST", "/api/verify", Some(body)).await?;
    if status != 200 {
        return Err(format!("HTTP {}", status));
    }
    serde_json::from_str(&text).map_err(|e| format!("bad response: {}", e))
}

/// Navigate to the next level after the user-visible delay.
fn schedule_navigation(next_level: u32) {
    let window = match web_sys::window() {
        Some(w) => w,
        None => return,
    };
    let closure = Closure::wrap(Box::new(move || {
        if let Some(window) = web_sys::window() {
            let _ = window.location().assign(&format!("/challenge/{}", next_level));
        }
    }) as Box<dyn FnMut()>);

    let _ = window.set_timeout_with_callback_and_timeout_and_arguments_0(
        closure.as_ref().unchecked_ref(),
        NAVIGATE_DELAY_MS,
    );
    closure.forget();
}

/// Minimal fetch wrapper: returns (status, body text).
async fn fetch_text(
    method: &str,
    url: &str,
    body: Option<String>,
) -> Result<(u16, String), String> {
    let window = web_sys::window().ok_or("no window object")?;

    let opts = web_sys::RequestInit::new();
    opts.set_method(method);
    opts.set_mode(web_sys::RequestMode::SameOrigin);
    if let Some(body) = body {
        opts.set_body(&JsValue::from_str(&body));
    }

    let request = web_sys::Request::new_with_str_and_init(url, &opts)
        .map_err(|e| format!("request build failed: {:?}", e))?;
    if body_is_json(method) {
        let _ = request.headers().set("Content-Type", "application/json");
    }

    let resp_value = JsFuture::from(window.fetch_with_request(&request))
        .await
        .map_err(|e| format!("fetch failed: {:?}", e))?;
    let resp: web_sys::Response = resp_value
        .dyn_into()
        .map_err(|_| "fetch returned a non-Response".to_string())?;

    let text_promise = resp.text().map_err(|e| format!("body read failed: {:?}", e))?;
    let text_value = JsFuture::from(text_promise)
        .await
        .map_err(|e| format!("body read failed: {:?}", e))?;

    Ok((resp.status(), text_value.as_string().unwrap_or_default()))
}

fn body_is_json(method: &str) -> bool {
    method == "POST"
}

/// Map a style hint to the CSS class the stylesheet knows about.
fn style_class(style: StyleHint) -> &'static str {
    match style {
        StyleHint::Plain => "line",
        StyleHint::Error => "line line-error",
        StyleHint::Success => "line line-success",
        StyleHint::Banner => "line line-banner",
        StyleHint::Input => "line line-input",
        StyleHint::Muted => "line line-muted",
    }
}

/// Re-render the whole surface from the engine's state.
fn render() {
    let document = match web_sys::window().and_then(|w| w.document()) {
        Some(d) => d,
        None => return,
    };
    let Some(container) = document.get_element_by_id("terminal") else {
        return;
    };
    let Some(output) = container.query_selector(".terminal-output").ok().flatten() else {
        return;
    };

    let rendered = with_term(|t| {
        output.set_inner_html("");
        for line in t.lines() {
            if let Ok(div) = document.create_element("div") {
                div.set_class_name(style_class(line.style));
                div.set_text_content(Some(&line.text));
                let _ = output.append_child(&div);
            }
        }

        let (prompt, input, cursor) = t.input_line();
        // The cursor span sits between the text on either side of it, so
        // mid-line edits (ArrowLeft, Home) display where they happen
        let (before, after) = input.split_at(cursor);
        if let Some(el) = container.query_selector(".terminal-prompt").ok().flatten() {
            el.set_text_content(Some(&prompt));
        }
        if let Some(el) = container.query_selector(".terminal-input").ok().flatten() {
            el.set_text_content(Some(before));
        }
        if let Some(el) = container.query_selector(".terminal-input-post").ok().flatten() {
            el.set_text_content(Some(after));
        }
        // Pending submissions dim the input line so the player sees the
        // terminal is waiting on the server
        if let Some(el) = container.query_selector(".terminal-input-line").ok().flatten() {
            el.set_class_name(if t.is_submission_pending() {
                "terminal-input-line pending"
            } else {
                "terminal-input-line"
            });
        }
    });

    if rendered.is_some() {
        if let Some(el) = container.dyn_ref::<web_sys::HtmlElement>() {
            el.set_scroll_top(el.scroll_height());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::wasm_bindgen_test;

    #[wasm_bindgen_test]
    fn test_style_classes_are_distinct() {
        let styles = [
            StyleHint::Plain,
            StyleHint::Error,
            StyleHint::Success,
            StyleHint::Banner,
            StyleHint::Input,
            StyleHint::Muted,
        ];
        let classes: Vec<_> = styles.iter().map(|s| style_class(*s)).collect();
        let mut unique = classes.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(classes.len(), unique.len());
    }
}
