use crate::editor::PromptView;
use crate::error::ShellError;
use crate::host::{Clock, Host};
use std::collections::HashMap;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::{spawn_local, JsFuture};
use web_sys::{window, CustomEvent, CustomEventInit, Document, Element, Storage, UrlSearchParams};

/// Event fired on the document when a script asks for a window. The page
/// decides how to draw it; `detail` carries `title` and `content`.
///
/// Dispatch is queued on the event loop, so listeners run after the command
/// that opened the window has returned and may call back into
/// [`crate::System`].
pub const WINDOW_EVENT: &str = "webtest-window";

fn describe(value: &JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{:?}", value))
}

/// Browser host: renders into a terminal element and keeps state in
/// `localStorage`.
pub struct WebHost {
    document: Document,
    terminal: Element,
    prompt_line: Option<Element>,
    last_view: Option<PromptView>,
    intervals: HashMap<i32, Closure<dyn FnMut()>>,
}

impl WebHost {
    pub fn new(terminal_id: &str) -> Result<Self, ShellError> {
        let document = window()
            .and_then(|w| w.document())
            .ok_or_else(|| ShellError::Config("no document available".into()))?;
        let terminal = document
            .get_element_by_id(terminal_id)
            .ok_or_else(|| ShellError::Config(format!("no element with id '{}'", terminal_id)))?;
        Ok(WebHost {
            document,
            terminal,
            prompt_line: None,
            last_view: None,
            intervals: HashMap::new(),
        })
    }

    /// Value of a query-string parameter on the current page.
    pub fn query_param(&self, name: &str) -> Option<String> {
        let search = window()?.location().search().ok()?;
        UrlSearchParams::new_with_str(&search).ok()?.get(name)
    }

    fn storage(&self) -> Result<Storage, ShellError> {
        window()
            .ok_or_else(|| ShellError::Storage("no window".into()))?
            .local_storage()
            .map_err(|e| ShellError::Storage(describe(&e)))?
            .ok_or_else(|| ShellError::Storage("localStorage missing".into()))
    }

    fn append_div(&self, text: &str, style: Option<&str>) -> Option<Element> {
        let div = self.document.create_element("div").ok()?;
        div.set_text_content(Some(text));
        if let Some(style) = style {
            if let Err(err) = div.set_attribute("style", style) {
                log::debug!("style rejected: {}", describe(&err));
            }
        }
        if let Err(err) = self.terminal.append_child(&div) {
            log::debug!("append failed: {}", describe(&err));
            return None;
        }
        self.terminal.set_scroll_top(self.terminal.scroll_height());
        Some(div)
    }

    fn set_body_style(&self, property: &str, value: &str) {
        if let Some(body) = self.document.body() {
            if let Err(err) = body.style().set_property(property, value) {
                log::debug!("style {} rejected: {}", property, describe(&err));
            }
        }
    }
}

impl Host for WebHost {
    fn write_line(&mut self, text: &str, color: Option<&str>) {
        let style = color.map(|c| format!("color: {}", c));
        self.append_div(text, style.as_deref());
    }

    fn clear(&mut self) {
        self.terminal.set_inner_html("");
        self.prompt_line = None;
        self.last_view = None;
    }

    /// Freeze the current prompt line without its cursor and start a new one.
    fn new_prompt(&mut self) {
        if let (Some(line), Some(view)) = (&self.prompt_line, &self.last_view) {
            let frozen = format!("{}{}{}", view.prompt, view.before, view.after);
            line.set_text_content(Some(&frozen));
        }
        self.prompt_line = self.append_div("", None);
        self.last_view = None;
    }

    fn render_prompt(&mut self, view: &PromptView) {
        if self.prompt_line.is_none() {
            self.prompt_line = self.append_div("", None);
        }
        if let Some(line) = &self.prompt_line {
            line.set_text_content(Some(&view.to_string()));
        }
        self.last_view = Some(view.clone());
    }

    fn open_window(&mut self, title: &str, content: &str) {
        let detail = js_sys::Object::new();
        for (key, value) in [("title", title), ("content", content)] {
            if let Err(err) = js_sys::Reflect::set(&detail, &key.into(), &value.into()) {
                log::debug!("window {} not set: {}", key, describe(&err));
            }
        }
        let init = CustomEventInit::new();
        init.set_detail(&detail);
        let event = match CustomEvent::new_with_event_init_dict(WINDOW_EVENT, &init) {
            Ok(event) => event,
            Err(err) => {
                log::warn!("could not open window '{}': {}", title, describe(&err));
                return;
            }
        };
        let document = self.document.clone();
        let title = title.to_string();
        spawn_local(async move {
            if let Err(err) = document.dispatch_event(&event) {
                log::warn!("could not open window '{}': {}", title, describe(&err));
            }
        });
    }

    fn set_colors(&mut self, background: &str, foreground: &str) {
        self.set_body_style("background-color", background);
        self.set_body_style("color", foreground);
    }

    fn set_wallpaper(&mut self, url: &str) {
        self.set_body_style("background-image", &format!("url('{}')", url));
        self.set_body_style("background-size", "cover");
    }

    fn show_swatch(&mut self, color: &str) {
        let style = format!(
            "display: inline-block; width: 16px; height: 16px; background: {}",
            color
        );
        self.append_div("", Some(&style));
    }

    fn load(&self, key: &str) -> Result<Option<String>, ShellError> {
        self.storage()?
            .get_item(key)
            .map_err(|e| ShellError::Storage(describe(&e)))
    }

    fn save(&mut self, key: &str, value: &str) -> Result<(), ShellError> {
        self.storage()?
            .set_item(key, value)
            .map_err(|e| ShellError::Storage(describe(&e)))
    }

    fn set_interval(&mut self, period_ms: u32, tick: Box<dyn FnMut()>) -> Result<i32, ShellError> {
        let win = window().ok_or_else(|| ShellError::Scheduler("no window".into()))?;
        let closure = Closure::wrap(tick);
        let handle = win
            .set_interval_with_callback_and_timeout_and_arguments_0(
                closure.as_ref().unchecked_ref(),
                period_ms as i32,
            )
            .map_err(|e| ShellError::Scheduler(describe(&e)))?;
        self.intervals.insert(handle, closure);
        Ok(handle)
    }

    fn clear_interval(&mut self, handle: i32) {
        if let Some(win) = window() {
            win.clear_interval_with_handle(handle);
        }
        self.intervals.remove(&handle);
    }

    fn page_url(&self) -> String {
        let Some(location) = window().map(|w| w.location()) else {
            return String::new();
        };
        let origin = location.origin().unwrap_or_default();
        let path = location.pathname().unwrap_or_default();
        format!("{}{}", origin, path)
    }

    fn reload_clean(&mut self) {
        let url = self.page_url();
        if let Some(win) = window() {
            if let Err(err) = win.location().set_href(&url) {
                log::warn!("reload failed: {}", describe(&err));
            }
        }
    }
}

pub struct WebClock;

impl Clock for WebClock {
    fn now_ms(&self) -> f64 {
        js_sys::Date::now()
    }
}

pub async fn read_clipboard() -> Result<String, ShellError> {
    let win = window().ok_or_else(|| ShellError::Clipboard("no window".into()))?;
    let text = JsFuture::from(win.navigator().clipboard().read_text())
        .await
        .map_err(|e| ShellError::Clipboard(describe(&e)))?;
    text.as_string()
        .ok_or_else(|| ShellError::Clipboard("clipboard returned no text".into()))
}
