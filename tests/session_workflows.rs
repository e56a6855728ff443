//! End-to-end shell workflows driven through simulated key presses.

use std::rc::Rc;
use webtest_os::editor::Key;
use webtest_os::{FileStore, HeadlessHost, ManualClock, Session, ShellConfig};

fn session_with(host: HeadlessHost, config: ShellConfig) -> (Session<HeadlessHost>, ManualClock) {
    let clock = ManualClock::new(1_000_000.0);
    let session = Session::new(host, Rc::new(clock.clone()), config);
    (session, clock)
}

fn new_session() -> (Session<HeadlessHost>, ManualClock) {
    session_with(HeadlessHost::new(), ShellConfig::default())
}

/// Type a line the way the page would forward it, then press Enter.
fn type_line(session: &mut Session<HeadlessHost>, line: &str) -> Vec<String> {
    session.host_mut().take_output();
    for c in line.chars() {
        let key = Key::from_dom(&c.to_string(), false).unwrap();
        session.handle_key(key);
    }
    session.handle_key(Key::from_dom("Enter", false).unwrap());
    session.host_mut().take_output()
}

#[test]
fn test_create_read_delete_cycle() {
    let (mut s, _) = new_session();

    assert_eq!(
        type_line(&mut s, "create todo.txt buy milk"),
        vec!["File todo.txt created with content: buy milk"]
    );
    assert_eq!(type_line(&mut s, "type todo.txt"), vec!["buy milk"]);
    assert_eq!(type_line(&mut s, "delete todo.txt"), vec!["Deleted: todo.txt"]);
    assert_eq!(
        type_line(&mut s, "read todo.txt"),
        vec!["File not found: todo.txt"]
    );
    assert_eq!(s.history().len(), 4);
}

#[test]
fn test_editing_keys_before_enter() {
    let (mut s, _) = new_session();
    for c in "eco hi".chars() {
        s.handle_key(Key::Char(c));
    }
    // Move back to fix the typo: "ec|o hi" -> "ech|o hi"
    for _ in 0..4 {
        s.handle_key(Key::Left);
    }
    s.handle_key(Key::Char('h'));
    s.handle_key(Key::End);
    s.handle_key(Key::Backspace);
    s.handle_key(Key::Paste("ey".into()));
    s.handle_key(Key::Enter);

    assert_eq!(s.host().output(), vec!["hey"]);
    assert_eq!(s.history().entries(), ["echo hey"]);
}

#[test]
fn test_history_recall_reruns_command() {
    let (mut s, _) = new_session();
    type_line(&mut s, "echo first");
    type_line(&mut s, "echo second");

    s.host_mut().take_output();
    s.handle_key(Key::Up);
    s.handle_key(Key::Up);
    s.handle_key(Key::Enter);
    assert_eq!(s.host().output(), vec!["first"]);
}

#[test]
fn test_backup_link_restores_in_new_page() {
    let (mut s, _) = new_session();
    type_line(&mut s, "create a.ws echo restored");
    type_line(&mut s, "delete readme.txt");
    let out = type_line(&mut s, "backup");
    let link = out[0].strip_prefix("Backup URL:\n").unwrap();
    let (page, token) = link.split_once("?dir=").unwrap();
    assert_eq!(page, "http://localhost/");

    // A different browser: nothing stored yet.
    let (mut other, _) = new_session();
    assert!(other.restore_on_load(Some(token)));
    assert_eq!(other.store(), s.store());
    assert_eq!(other.host().reloads, 1);

    // After the reload the stored copy is what loads.
    let mut reloaded = HeadlessHost::new();
    reloaded.storage = other.host().storage.clone();
    let (mut after, _) = session_with(reloaded, ShellConfig::default());
    assert_eq!(after.store().get("readme.txt"), None);
    assert_eq!(type_line(&mut after, "open a.ws"), vec!["restored"]);
}

#[test]
fn test_plain_json_link_restores() {
    let (mut s, _) = new_session();
    assert!(s.restore_on_load(Some(r#"{"hello.ws":"echo hi;echo there"}"#)));
    assert_eq!(s.store().len(), 1);
    assert_eq!(type_line(&mut s, "open hello.ws"), vec!["hi", "there"]);
}

#[test]
fn test_timer_follows_the_clock() {
    let (mut s, clock) = new_session();
    type_line(&mut s, "timer start");
    clock.advance(3_500.0);
    s.host_mut().fire_intervals();
    assert_eq!(type_line(&mut s, "timer show"), vec!["Timer: 3.5s"]);

    type_line(&mut s, "timer stop");
    clock.advance(60_000.0);
    s.host_mut().fire_intervals();
    assert_eq!(type_line(&mut s, "timer show"), vec!["Timer: 3.5s"]);

    type_line(&mut s, "timer start");
    type_line(&mut s, "timer start");
    assert_eq!(s.host().active_intervals(), 1);
}

#[test]
fn test_batch_files_can_call_each_other() {
    let (mut s, _) = new_session();
    let mut store = FileStore::empty();
    store.create("inner.ws", "echo two\necho three");
    store.create("outer.ws", "echo one; open inner.ws; echo four");
    store.create("math.js", "let n = 4\nprint('n*n = ' + n * n)");
    *s.store_mut() = store;

    assert_eq!(
        type_line(&mut s, "open outer.ws"),
        vec!["one", "two", "three", "four"]
    );
    assert_eq!(type_line(&mut s, "open math.js"), vec!["n*n = 16"]);
}

#[test]
fn test_config_overrides_apply() {
    let config = ShellConfig::from_json(
        r#"{"prompt": "$ ", "max_script_depth": 2, "fs_key": "alt_fs", "title": "Lab"}"#,
    )
    .unwrap();
    let (mut s, _) = session_with(HeadlessHost::new(), config);

    s.store_mut().create("a.ws", "open b.ws");
    s.store_mut().create("b.ws", "open a.ws");
    assert_eq!(
        type_line(&mut s, "open a.ws"),
        vec!["Error: script nesting exceeds 2 levels"]
    );
    assert!(s.host().storage.contains_key("alt_fs"));
    assert!(!s.host().storage.contains_key("webTestOS_FS"));
    assert!(s.host().last_prompt.as_deref().unwrap().starts_with("$ "));

    s.boot();
    assert!(s.host().output().contains(&"Lab"));
}

#[test]
fn test_clear_then_continue() {
    let (mut s, _) = new_session();
    s.boot();
    assert!(!s.host().lines.is_empty());
    s.handle_key(Key::Paste("clear".into()));
    s.handle_key(Key::Enter);
    assert!(s.host().lines.is_empty());
    assert_eq!(type_line(&mut s, "echo still here"), vec!["still here"]);
}
