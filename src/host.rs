//! The seam between the shell engine and whatever displays it.
//!
//! The engine never touches the DOM directly. Everything it needs from the
//! page (output, windows, colors, storage, timers, the page URL) goes through
//! [`Host`]. [`crate::web::WebHost`] is the browser implementation;
//! [`HeadlessHost`] records every call in memory.

use crate::editor::PromptView;
use crate::error::ShellError;
use std::cell::Cell;
use std::collections::BTreeMap;
use std::rc::Rc;

pub trait Host {
    // Output
    fn write_line(&mut self, text: &str, color: Option<&str>);
    fn clear(&mut self);
    fn new_prompt(&mut self);
    fn render_prompt(&mut self, view: &PromptView);
    fn open_window(&mut self, title: &str, content: &str);

    // Theming
    fn set_colors(&mut self, background: &str, foreground: &str);
    fn set_wallpaper(&mut self, url: &str);
    fn show_swatch(&mut self, color: &str);

    // Key-value storage
    fn load(&self, key: &str) -> Result<Option<String>, ShellError>;
    fn save(&mut self, key: &str, value: &str) -> Result<(), ShellError>;

    // Recurring callbacks
    fn set_interval(&mut self, period_ms: u32, tick: Box<dyn FnMut()>) -> Result<i32, ShellError>;
    fn clear_interval(&mut self, handle: i32);

    // Page location
    fn page_url(&self) -> String;
    fn reload_clean(&mut self);
}

pub trait Clock {
    /// Milliseconds since the Unix epoch.
    fn now_ms(&self) -> f64;
}

/// Clock driven by hand, for headless sessions and tests.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<f64>>,
}

impl ManualClock {
    pub fn new(start_ms: f64) -> Self {
        ManualClock {
            now: Rc::new(Cell::new(start_ms)),
        }
    }
    pub fn advance(&self, ms: f64) {
        self.now.set(self.now.get() + ms);
    }
    pub fn set(&self, ms: f64) {
        self.now.set(ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        self.now.get()
    }
}

/// In-memory host. Output, windows and theme changes are recorded; intervals
/// only run when [`HeadlessHost::fire_intervals`] is called.
pub struct HeadlessHost {
    pub lines: Vec<(String, Option<String>)>,
    pub windows: Vec<(String, String)>,
    pub prompts: usize,
    pub last_prompt: Option<String>,
    pub colors: Option<(String, String)>,
    pub wallpaper: Option<String>,
    pub swatches: Vec<String>,
    pub storage: BTreeMap<String, String>,
    pub storage_broken: bool,
    pub url: String,
    pub reloads: usize,
    intervals: BTreeMap<i32, Box<dyn FnMut()>>,
    next_interval: i32,
}

impl Default for HeadlessHost {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessHost {
    pub fn new() -> Self {
        HeadlessHost {
            lines: Vec::new(),
            windows: Vec::new(),
            prompts: 0,
            last_prompt: None,
            colors: None,
            wallpaper: None,
            swatches: Vec::new(),
            storage: BTreeMap::new(),
            storage_broken: false,
            url: "http://localhost/".into(),
            reloads: 0,
            intervals: BTreeMap::new(),
            next_interval: 1,
        }
    }

    /// Text of every line written since the last clear.
    pub fn output(&self) -> Vec<&str> {
        self.lines.iter().map(|(text, _)| text.as_str()).collect()
    }

    pub fn take_output(&mut self) -> Vec<String> {
        self.lines.drain(..).map(|(text, _)| text).collect()
    }

    pub fn fire_intervals(&mut self) {
        for tick in self.intervals.values_mut() {
            tick();
        }
    }

    pub fn active_intervals(&self) -> usize {
        self.intervals.len()
    }
}

impl Host for HeadlessHost {
    fn write_line(&mut self, text: &str, color: Option<&str>) {
        self.lines.push((text.to_string(), color.map(str::to_string)));
    }
    fn clear(&mut self) {
        self.lines.clear();
    }
    fn new_prompt(&mut self) {
        self.prompts += 1;
    }
    fn render_prompt(&mut self, view: &PromptView) {
        self.last_prompt = Some(view.to_string());
    }
    fn open_window(&mut self, title: &str, content: &str) {
        self.windows.push((title.to_string(), content.to_string()));
    }
    fn set_colors(&mut self, background: &str, foreground: &str) {
        self.colors = Some((background.to_string(), foreground.to_string()));
    }
    fn set_wallpaper(&mut self, url: &str) {
        self.wallpaper = Some(url.to_string());
    }
    fn show_swatch(&mut self, color: &str) {
        self.swatches.push(color.to_string());
    }
    fn load(&self, key: &str) -> Result<Option<String>, ShellError> {
        if self.storage_broken {
            return Err(ShellError::Storage("storage disabled".into()));
        }
        Ok(self.storage.get(key).cloned())
    }
    fn save(&mut self, key: &str, value: &str) -> Result<(), ShellError> {
        if self.storage_broken {
            return Err(ShellError::Storage("storage disabled".into()));
        }
        self.storage.insert(key.to_string(), value.to_string());
        Ok(())
    }
    fn set_interval(&mut self, _period_ms: u32, tick: Box<dyn FnMut()>) -> Result<i32, ShellError> {
        let handle = self.next_interval;
        self.next_interval += 1;
        self.intervals.insert(handle, tick);
        Ok(handle)
    }
    fn clear_interval(&mut self, handle: i32) {
        self.intervals.remove(&handle);
    }
    fn page_url(&self) -> String {
        self.url.clone()
    }
    fn reload_clean(&mut self) {
        self.reloads += 1;
    }
}
