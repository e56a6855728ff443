use crate::commands::Registry;
use crate::config::ShellConfig;
use crate::editor::{EditOutcome, History, Key, LineEditor};
use crate::error::ShellError;
use crate::host::{Clock, Host};
use crate::scan::{scan_files, Verdict};
use crate::script::{ScriptInterpreter, ScriptSink};
use crate::store::FileStore;
use crate::theme::{Theme, PALETTE};
use crate::timer::Timer;
use std::rc::Rc;

/// One terminal session: the file store, line editor, history, timer and
/// theme, plus the host they render through.
pub struct Session<H> {
    pub(crate) host: H,
    pub(crate) clock: Rc<dyn Clock>,
    pub(crate) config: ShellConfig,
    pub(crate) store: FileStore,
    pub(crate) theme: Theme,
    pub(crate) timer: Timer,
    pub(crate) registry: Registry<H>,
    editor: LineEditor,
    history: History,
    depth: usize,
}

impl<H: Host> Session<H> {
    /// Build a session, restoring the file store and wallpaper from host
    /// storage. Unreadable storage falls back to the default files.
    pub fn new(host: H, clock: Rc<dyn Clock>, config: ShellConfig) -> Self {
        let store = load_store(&host, &config.fs_key);
        let wallpaper = match host.load(&config.wallpaper_key) {
            Ok(url) => url,
            Err(err) => {
                log::warn!("could not load wallpaper: {}", err);
                None
            }
        };
        Session {
            host,
            clock,
            config,
            store,
            theme: Theme {
                wallpaper,
                ..Theme::default()
            },
            timer: Timer::new(),
            registry: Registry::new(),
            editor: LineEditor::new(),
            history: History::new(),
            depth: 0,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }
    pub fn config(&self) -> &ShellConfig {
        &self.config
    }
    pub fn store(&self) -> &FileStore {
        &self.store
    }
    pub fn store_mut(&mut self) -> &mut FileStore {
        &mut self.store
    }
    pub fn history(&self) -> &History {
        &self.history
    }
    pub fn editor(&self) -> &LineEditor {
        &self.editor
    }
    pub fn theme(&self) -> &Theme {
        &self.theme
    }
    pub fn timer(&self) -> &Timer {
        &self.timer
    }

    /// Startup banner: wallpaper, palette swatches, the signature scan and
    /// the first prompt.
    pub fn boot(&mut self) {
        if let Some(url) = &self.theme.wallpaper {
            self.host.set_wallpaper(url);
        }
        for (_, color) in PALETTE {
            self.host.show_swatch(color);
        }

        self.host.write_line("[ Verifying ] Files...", Some("#00FF00"));
        let reports = scan_files(&self.store);
        for report in &reports {
            self.host.write_line(&report.line(), Some(report.color()));
        }
        let flagged = reports.iter().filter(|r| r.verdict != Verdict::Clean).count();
        log::info!("boot scan: {} files, {} flagged", reports.len(), flagged);

        self.host.write_line(" ", None);
        self.host.write_line(&self.config.title, Some("cyan"));
        self.host.write_line("Type 'help' to begin.", Some("#AAAAFF"));
        self.host.write_line(" ", None);
        self.host.new_prompt();
        self.render_prompt();
    }

    /// Feed one key to the line editor. Enter runs the committed line;
    /// anything else redraws the prompt, even when nothing changed.
    pub fn handle_key(&mut self, key: Key) -> EditOutcome {
        let outcome = self.editor.handle(key, &mut self.history);
        match &outcome {
            EditOutcome::Commit(line) => self.execute(line),
            EditOutcome::Edited | EditOutcome::Ignored => self.render_prompt(),
        }
        outcome
    }

    pub fn render_prompt(&mut self) {
        let view = self.editor.render(&self.config.prompt);
        self.host.render_prompt(&view);
    }

    /// Run one command line. Every line, known or not, is recorded in
    /// history, gets a fresh prompt and triggers a save of the store.
    pub fn execute(&mut self, line: &str) {
        log::debug!("exec: {}", line);
        let parts: Vec<&str> = line.split_whitespace().collect();
        let (command, args) = match parts.split_first() {
            Some((command, args)) => (*command, args),
            None => ("", &[][..]),
        };
        match self.registry.resolve(command, args) {
            Some((leaf, args)) => {
                if let Some(out) = leaf(self, args) {
                    self.host.write_line(&out, None);
                }
            }
            None => self.host.write_line(&format!("Unknown command: {}", line), None),
        }
        self.history.push(line);
        self.host.new_prompt();
        self.render_prompt();
        self.persist();
    }

    /// Write the store to host storage. Failures are logged, never shown.
    pub fn persist(&mut self) {
        let result = self
            .store
            .to_json()
            .and_then(|json| self.host.save(&self.config.fs_key, &json));
        if let Err(err) = result {
            log::warn!("could not persist file store: {}", err);
        }
    }

    /// Replace the whole store with the contents of a snapshot token.
    pub fn import_snapshot(&mut self, token: &str) -> Result<(), ShellError> {
        self.store = FileStore::from_snapshot(token)?;
        log::info!("restored {} files from snapshot", self.store.len());
        self.persist();
        Ok(())
    }

    /// Apply a snapshot carried in the page URL, then reload without it.
    /// A bad token leaves the existing store in place.
    pub fn restore_on_load(&mut self, token: Option<&str>) -> bool {
        let Some(token) = token else {
            return false;
        };
        match self.import_snapshot(token) {
            Ok(()) => {
                self.host.reload_clean();
                true
            }
            Err(err) => {
                log::warn!("ignoring snapshot parameter: {}", err);
                false
            }
        }
    }

    /// Run a batch file: every `,` `;` or newline separated fragment is
    /// executed as its own command line.
    pub(crate) fn run_batch(&mut self, content: &str) -> Result<(), ShellError> {
        if self.depth >= self.config.max_script_depth {
            return Err(ShellError::ScriptDepth(self.config.max_script_depth));
        }
        let lines: Vec<String> = content
            .split([',', ';', '\n'])
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();
        self.depth += 1;
        for line in &lines {
            self.execute(line);
        }
        self.depth -= 1;
        Ok(())
    }

    pub(crate) fn run_script(&mut self, source: &str) -> Result<(), ShellError> {
        ScriptInterpreter::new().run(source, &mut HostSink(&mut self.host))
    }
}

fn load_store<H: Host>(host: &H, key: &str) -> FileStore {
    match host.load(key) {
        Ok(Some(json)) => FileStore::from_json(&json).unwrap_or_else(|err| {
            log::warn!("stored file system unreadable, using defaults: {}", err);
            FileStore::with_defaults()
        }),
        Ok(None) => FileStore::with_defaults(),
        Err(err) => {
            log::warn!("could not load file system: {}", err);
            FileStore::with_defaults()
        }
    }
}

struct HostSink<'a, H>(&'a mut H);

impl<H: Host> ScriptSink for HostSink<'_, H> {
    fn print(&mut self, text: &str) {
        self.0.write_line(text, None);
    }
    fn open_window(&mut self, title: &str, content: &str) {
        self.0.open_window(title, content);
    }
}
