use crate::error::ShellError;
use crate::host::Host;
use crate::shell::Session;
use crate::theme::{parse_color, ColorChoice, DEFAULT_BACKGROUND, DEFAULT_FOREGROUND};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// A command body. Returns the reply line, or `None` for no output.
pub type Leaf<H> = fn(&mut Session<H>, &[&str]) -> Option<String>;

pub enum CommandEntry<H> {
    Leaf(Leaf<H>),
    Group(BTreeMap<&'static str, Leaf<H>>),
}

pub struct Registry<H> {
    entries: BTreeMap<&'static str, CommandEntry<H>>,
}

impl<H: Host> Default for Registry<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: Host> Registry<H> {
    pub fn new() -> Self {
        let mut r = Registry {
            entries: BTreeMap::new(),
        };
        r.leaf("help", cmd_help);
        r.leaf("echo", cmd_echo);
        r.leaf("clear", cmd_clear);
        r.leaf("date", cmd_date);
        r.leaf("wallpaper", cmd_wallpaper);
        r.leaf("color", cmd_color);
        r.leaf("dir", cmd_dir);
        r.leaf("type", cmd_read);
        r.leaf("read", cmd_read);
        r.leaf("delete", cmd_delete);
        r.leaf("open", cmd_open);
        r.leaf("create", cmd_create);
        r.leaf("backup", cmd_backup);

        let mut timer: BTreeMap<&'static str, Leaf<H>> = BTreeMap::new();
        timer.insert("start", cmd_timer_start);
        timer.insert("show", cmd_timer_show);
        timer.insert("stop", cmd_timer_stop);
        timer.insert("reset", cmd_timer_reset);
        r.entries.insert("timer", CommandEntry::Group(timer));
        r
    }

    fn leaf(&mut self, name: &'static str, f: Leaf<H>) {
        self.entries.insert(name, CommandEntry::Leaf(f));
    }

    /// Look up the command, descending into a group when it names one.
    /// Returns the leaf and the arguments it should receive.
    pub fn resolve<'a, 'b>(
        &self,
        command: &str,
        args: &'a [&'b str],
    ) -> Option<(Leaf<H>, &'a [&'b str])> {
        match self.entries.get(command)? {
            CommandEntry::Leaf(f) => Some((*f, args)),
            CommandEntry::Group(leaves) => {
                let (sub, rest) = args.split_first()?;
                leaves.get(*sub).map(|f| (*f, rest))
            }
        }
    }

    /// Every invocable name: flat commands first, then `group sub` pairs.
    pub fn names(&self) -> Vec<String> {
        let mut flat = Vec::new();
        let mut grouped = Vec::new();
        for (name, entry) in &self.entries {
            match entry {
                CommandEntry::Leaf(_) => flat.push(name.to_string()),
                CommandEntry::Group(leaves) => {
                    grouped.extend(leaves.keys().map(|sub| format!("{} {}", name, sub)))
                }
            }
        }
        flat.extend(grouped);
        flat
    }
}

/// Errors become the reply text, except host failures, which only get logged.
fn reply(result: Result<String, ShellError>) -> Option<String> {
    match result {
        Ok(out) => Some(out),
        Err(err) if err.is_transient() => {
            log::warn!("{}", err);
            None
        }
        Err(err) => Some(err.to_string()),
    }
}

fn cmd_help<H: Host>(s: &mut Session<H>, _args: &[&str]) -> Option<String> {
    Some(format!("Commands: {}", s.registry.names().join(", ")))
}

fn cmd_echo<H: Host>(_s: &mut Session<H>, args: &[&str]) -> Option<String> {
    Some(args.join(" "))
}

fn cmd_clear<H: Host>(s: &mut Session<H>, _args: &[&str]) -> Option<String> {
    s.host.clear();
    None
}

pub fn format_date(now_ms: f64) -> String {
    match DateTime::<Utc>::from_timestamp_millis(now_ms as i64) {
        Some(dt) => dt
            .format("%a %b %d %Y %H:%M:%S GMT+0000 (Coordinated Universal Time)")
            .to_string(),
        None => "Invalid Date".into(),
    }
}

fn cmd_date<H: Host>(s: &mut Session<H>, _args: &[&str]) -> Option<String> {
    Some(format_date(s.clock.now_ms()))
}

fn cmd_wallpaper<H: Host>(s: &mut Session<H>, args: &[&str]) -> Option<String> {
    let url = args.join(" ");
    if let Err(err) = s.host.save(&s.config.wallpaper_key, &url) {
        log::warn!("could not store wallpaper: {}", err);
    }
    s.host.set_wallpaper(&url);
    s.theme.wallpaper = Some(url);
    Some("...".into())
}

fn cmd_color<H: Host>(s: &mut Session<H>, args: &[&str]) -> Option<String> {
    let result = parse_color(args.first().copied().unwrap_or("")).map(|choice| match choice {
        ColorChoice::Reset => {
            s.theme.background = DEFAULT_BACKGROUND.into();
            s.theme.foreground = DEFAULT_FOREGROUND.into();
            s.host.set_colors(DEFAULT_BACKGROUND, DEFAULT_FOREGROUND);
            "Color reset to default.".to_string()
        }
        ColorChoice::Pair {
            code,
            background,
            foreground,
        } => {
            s.theme.background = background.into();
            s.theme.foreground = foreground.into();
            s.host.set_colors(background, foreground);
            format!("Color set to {} (BG: {}, FG: {})", code, background, foreground)
        }
    });
    reply(result)
}

fn cmd_timer_start<H: Host>(s: &mut Session<H>, _args: &[&str]) -> Option<String> {
    if let Err(err) = s.timer.start(&mut s.host, &s.clock, s.config.timer_period_ms) {
        log::warn!("timer polling unavailable: {}", err);
    }
    Some("Timer started!".into())
}

fn cmd_timer_show<H: Host>(s: &mut Session<H>, _args: &[&str]) -> Option<String> {
    Some(format!("Timer: {}s", s.timer.elapsed_secs()))
}

fn cmd_timer_stop<H: Host>(s: &mut Session<H>, _args: &[&str]) -> Option<String> {
    let now = s.clock.now_ms();
    s.timer.stop(&mut s.host, now);
    Some("Timer stopped.".into())
}

fn cmd_timer_reset<H: Host>(s: &mut Session<H>, _args: &[&str]) -> Option<String> {
    s.timer.reset(s.clock.now_ms());
    Some("Timer reset.".into())
}

fn cmd_dir<H: Host>(s: &mut Session<H>, _args: &[&str]) -> Option<String> {
    Some(s.store.listing())
}

fn cmd_read<H: Host>(s: &mut Session<H>, args: &[&str]) -> Option<String> {
    let name = args.join(" ");
    reply(s.store.read(&name).map(str::to_string))
}

fn cmd_delete<H: Host>(s: &mut Session<H>, args: &[&str]) -> Option<String> {
    let name = args.join(" ");
    reply(s.store.delete(&name).map(|()| format!("Deleted: {}", name)))
}

fn cmd_open<H: Host>(s: &mut Session<H>, args: &[&str]) -> Option<String> {
    let name = args.join(" ");
    let content = match s.store.read(&name) {
        Ok(content) => content.to_string(),
        Err(err) => return Some(err.to_string()),
    };
    let result = if name.ends_with(".ws") {
        s.run_batch(&content)
    } else if name.ends_with(".js") {
        s.run_script(&content)
    } else {
        Err(ShellError::UnsupportedType(name))
    };
    result.err().map(|err| err.to_string())
}

fn cmd_create<H: Host>(s: &mut Session<H>, args: &[&str]) -> Option<String> {
    let result = match args.split_first() {
        Some((name, words)) if !words.is_empty() => {
            let content = words.join(" ");
            s.store.create(name, &content);
            Ok(format!("File {} created with content: {}", name, content))
        }
        _ => Err(ShellError::InvalidArgument(
            "Error: Please specify a filename and content.".into(),
        )),
    };
    reply(result)
}

fn cmd_backup<H: Host>(s: &mut Session<H>, _args: &[&str]) -> Option<String> {
    let result = s.store.to_snapshot().map(|token| {
        format!(
            "Backup URL:\n{}?{}={}",
            s.host.page_url(),
            s.config.snapshot_param,
            token
        )
    });
    reply(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ShellConfig;
    use crate::host::{HeadlessHost, ManualClock};
    use crate::store::FileStore;
    use std::rc::Rc;

    fn session() -> (Session<HeadlessHost>, ManualClock) {
        let clock = ManualClock::new(0.0);
        let s = Session::new(
            HeadlessHost::new(),
            Rc::new(clock.clone()),
            ShellConfig::default(),
        );
        (s, clock)
    }

    fn run(s: &mut Session<HeadlessHost>, line: &str) -> Vec<String> {
        s.host_mut().take_output();
        s.execute(line);
        s.host_mut().take_output()
    }

    #[test]
    fn group_resolution() {
        let registry: Registry<HeadlessHost> = Registry::new();
        let args = ["start", "extra"];
        let (_, rest) = registry.resolve("timer", &args).unwrap();
        assert_eq!(rest, ["extra"]);
        assert!(registry.resolve("timer", &[]).is_none());
        assert!(registry.resolve("timer", &["lap"]).is_none());
        let (_, rest) = registry.resolve("echo", &args).unwrap();
        assert_eq!(rest.len(), 2);
        assert!(registry.resolve("start", &[]).is_none());
    }

    #[test]
    fn help_lists_everything_once() {
        let (mut s, _) = session();
        let out = run(&mut s, "help");
        let listed: Vec<&str> = out[0]
            .strip_prefix("Commands: ")
            .unwrap()
            .split(", ")
            .collect();
        let expected = [
            "help", "echo", "clear", "date", "wallpaper", "color", "dir", "type", "read",
            "delete", "open", "create", "backup", "timer start", "timer show", "timer stop",
            "timer reset",
        ];
        assert_eq!(listed.len(), expected.len());
        for name in expected {
            assert_eq!(listed.iter().filter(|n| **n == name).count(), 1, "{}", name);
        }
        assert!(!listed.contains(&"timer"));
    }

    #[test]
    fn echo_joins_words() {
        let (mut s, _) = session();
        assert_eq!(run(&mut s, "echo   hello    world"), vec!["hello world"]);
        assert_eq!(run(&mut s, "echo"), vec![""]);
    }

    #[test]
    fn create_then_read() {
        let (mut s, _) = session();
        assert_eq!(
            run(&mut s, "create a.txt hello world"),
            vec!["File a.txt created with content: hello world"]
        );
        assert_eq!(run(&mut s, "read a.txt"), vec!["hello world"]);
        assert_eq!(run(&mut s, "type a.txt"), vec!["hello world"]);
    }

    #[test]
    fn create_needs_name_and_content() {
        let (mut s, _) = session();
        let before = s.store().clone();
        for line in ["create", "create lonely.txt"] {
            assert_eq!(
                run(&mut s, line),
                vec!["Error: Please specify a filename and content."]
            );
        }
        assert_eq!(*s.store(), before);
    }

    #[test]
    fn delete_and_missing_files() {
        let (mut s, _) = session();
        let before = s.store().clone();
        assert_eq!(run(&mut s, "delete missing.txt"), vec!["File not found: missing.txt"]);
        assert_eq!(*s.store(), before);
        assert_eq!(run(&mut s, "read nope"), vec!["File not found: nope"]);
        assert_eq!(run(&mut s, "delete readme.txt"), vec!["Deleted: readme.txt"]);
        assert_eq!(s.store().get("readme.txt"), None);
    }

    #[test]
    fn dir_lists_with_extensions() {
        let (mut s, _) = session();
        let out = run(&mut s, "dir");
        assert_eq!(
            out,
            vec!["[ .js ] calc.js\n[ .js ] editor.js\n[ .js ] example.js\n[ .ws ] example.ws\n[ .txt ] readme.txt"]
        );
    }

    #[test]
    fn color_rules() {
        let (mut s, _) = session();
        assert_eq!(
            run(&mut s, "color 01"),
            vec!["Color set to 01 (BG: #000000, FG: #0000AA)"]
        );
        assert_eq!(
            s.host().colors,
            Some(("#000000".to_string(), "#0000AA".to_string()))
        );

        assert_eq!(
            run(&mut s, "color 00"),
            vec!["Error: Background and foreground colors cannot be the same."]
        );
        assert_eq!(s.theme().foreground, "#0000AA");

        assert_eq!(run(&mut s, "color 0z"), vec!["Invalid color code."]);
        assert_eq!(s.theme().background, "#000000");

        assert_eq!(run(&mut s, "color"), vec!["Color reset to default."]);
        assert_eq!(s.theme().background, "#000");
        assert_eq!(s.theme().foreground, "#FFF");
    }

    #[test]
    fn wallpaper_is_stored_and_applied() {
        let (mut s, _) = session();
        assert_eq!(run(&mut s, "wallpaper http://x/y.png"), vec!["..."]);
        assert_eq!(s.host().wallpaper.as_deref(), Some("http://x/y.png"));
        assert_eq!(
            s.host().storage.get("webTestOS_Wallpaper").map(String::as_str),
            Some("http://x/y.png")
        );
    }

    #[test]
    fn date_formats_clock() {
        assert_eq!(
            format_date(0.0),
            "Thu Jan 01 1970 00:00:00 GMT+0000 (Coordinated Universal Time)"
        );
        let (mut s, clock) = session();
        clock.set(1_700_000_000_000.0);
        assert_eq!(
            run(&mut s, "date"),
            vec!["Tue Nov 14 2023 22:13:20 GMT+0000 (Coordinated Universal Time)"]
        );
    }

    #[test]
    fn timer_commands() {
        let (mut s, clock) = session();
        assert_eq!(run(&mut s, "timer show"), vec!["Timer: 0s"]);
        assert_eq!(run(&mut s, "timer start"), vec!["Timer started!"]);
        clock.advance(1_250.0);
        s.host_mut().fire_intervals();
        assert_eq!(run(&mut s, "timer show"), vec!["Timer: 1.25s"]);
        clock.advance(750.0);
        assert_eq!(run(&mut s, "timer stop"), vec!["Timer stopped."]);
        assert_eq!(s.host().active_intervals(), 0);
        clock.advance(5_000.0);
        assert_eq!(run(&mut s, "timer show"), vec!["Timer: 2s"]);
        assert_eq!(run(&mut s, "timer reset"), vec!["Timer reset."]);
        assert_eq!(run(&mut s, "timer show"), vec!["Timer: 0s"]);
        assert_eq!(run(&mut s, "timer"), vec!["Unknown command: timer"]);
    }

    #[test]
    fn open_dispatches_by_extension() {
        let (mut s, _) = session();
        assert_eq!(run(&mut s, "open example.ws"), vec!["Hello World!"]);
        assert_eq!(run(&mut s, "open example.js"), vec!["Hello from script.js"]);
        assert_eq!(run(&mut s, "open readme.txt"), vec!["Unsupported file type."]);
        assert_eq!(run(&mut s, "open ghost.ws"), vec!["File not found: ghost.ws"]);
    }

    #[test]
    fn open_reports_script_errors() {
        let (mut s, _) = session();
        s.store_mut().create("bad.js", "print('ok'); fetch('http://evil')");
        assert_eq!(
            run(&mut s, "open bad.js"),
            vec!["Error: Forbidden operation: fetch"]
        );
        s.store_mut().create("oops.js", "print('first'); nothing()");
        assert_eq!(
            run(&mut s, "open oops.js"),
            vec!["first", "Error: nothing is not a function"]
        );
        let deep = format!("print({}1)", "-".repeat(200_000));
        s.store_mut().create("deep.js", &deep);
        assert_eq!(
            run(&mut s, "open deep.js"),
            vec!["Error: expression nested too deeply"]
        );
    }

    #[test]
    fn editor_js_opens_a_window() {
        let (mut s, _) = session();
        assert!(run(&mut s, "open editor.js").is_empty());
        assert_eq!(s.host().windows.len(), 1);
        assert_eq!(s.host().windows[0].0, "Text Editor");
    }

    #[test]
    fn backup_link_round_trips() {
        let (mut s, _) = session();
        run(&mut s, "create notes.txt remember the milk");
        let out = run(&mut s, "backup");
        let link = out[0].strip_prefix("Backup URL:\n").unwrap();
        let token = link.strip_prefix("http://localhost/?dir=").unwrap();
        assert!(token.starts_with("%7B%22calc.js%22%3A"));
        assert!(token.contains("%22notes.txt%22%3A%22remember%20the%20milk%22"));
        assert_eq!(FileStore::from_snapshot(token).unwrap(), *s.store());
    }
}
