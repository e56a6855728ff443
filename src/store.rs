use crate::error::ShellError;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Everything `encodeURIComponent` escapes.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

const DEFAULT_FILES: &[(&str, &str)] = &[
    ("readme.txt", "Welcome to the WebTest OS!"),
    ("example.js", "alert('Hello from script.js');"),
    ("example.ws", "echo Hello World!"),
    (
        "calc.js",
        "let a = 6\nlet b = 7\nprint(a + ' * ' + b + ' = ' + a * b)\nprint('sqrt(2) = ' + Math.sqrt(2))",
    ),
    (
        "editor.js",
        "createWindow('Text Editor', '<textarea style=\"width: 100%; height: 100%; background: #111; color: #fff; border: none; resize: none;\"></textarea>')",
    ),
];

/// Flat name → content file store. Content is opaque here; what a file
/// means is decided by its extension when it is opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileStore {
    files: BTreeMap<String, String>,
}

impl Default for FileStore {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl FileStore {
    pub fn empty() -> Self {
        FileStore {
            files: BTreeMap::new(),
        }
    }

    pub fn with_defaults() -> Self {
        let mut store = Self::empty();
        for (name, content) in DEFAULT_FILES {
            store.create(name, content);
        }
        store
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.files.get(name).map(String::as_str)
    }

    pub fn read(&self, name: &str) -> Result<&str, ShellError> {
        self.get(name)
            .ok_or_else(|| ShellError::NotFound(name.to_string()))
    }

    /// Insert or overwrite
    pub fn create(&mut self, name: &str, content: &str) {
        self.files.insert(name.to_string(), content.to_string());
    }

    pub fn delete(&mut self, name: &str) -> Result<(), ShellError> {
        self.files
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| ShellError::NotFound(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.files.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `[ .ext ] name` for every file, one per line.
    pub fn listing(&self) -> String {
        self.files
            .keys()
            .map(|name| format!("[ .{} ] {}", extension(name), name))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn to_json(&self) -> Result<String, ShellError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, ShellError> {
        Ok(serde_json::from_str(json)?)
    }

    /// The whole store as a query-parameter value: its JSON, URL-escaped.
    pub fn to_snapshot(&self) -> Result<String, ShellError> {
        let json = self.to_json()?;
        Ok(utf8_percent_encode(&json, URI_COMPONENT).to_string())
    }

    /// Decode a snapshot value, escaped or already unescaped by the URL
    /// parser.
    pub fn from_snapshot(token: &str) -> Result<Self, ShellError> {
        let token = token.trim();
        if token.starts_with('{') {
            return Self::from_json(token);
        }
        let json = percent_decode_str(token)
            .decode_utf8()
            .map_err(|e| ShellError::Snapshot(e.to_string()))?;
        Self::from_json(&json)
    }
}

/// Text after the last `.`, or the whole name when there is none.
pub fn extension(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_present() {
        let store = FileStore::with_defaults();
        assert_eq!(store.len(), 5);
        assert_eq!(store.get("readme.txt"), Some("Welcome to the WebTest OS!"));
        assert_eq!(store.get("example.ws"), Some("echo Hello World!"));
    }

    #[test]
    fn create_overwrites() {
        let mut store = FileStore::empty();
        store.create("a.txt", "one");
        store.create("a.txt", "two");
        assert_eq!(store.len(), 1);
        assert_eq!(store.read("a.txt").unwrap(), "two");
    }

    #[test]
    fn delete_missing_leaves_store_alone() {
        let mut store = FileStore::with_defaults();
        let before = store.clone();
        let err = store.delete("missing.txt").unwrap_err();
        assert_eq!(err, ShellError::NotFound("missing.txt".into()));
        assert_eq!(store, before);
    }

    #[test]
    fn listing_tags_extensions() {
        let mut store = FileStore::empty();
        store.create("notes.txt", "x");
        store.create("Makefile", "y");
        store.create("a.tar.gz", "z");
        assert_eq!(
            store.listing(),
            "[ .Makefile ] Makefile\n[ .gz ] a.tar.gz\n[ .txt ] notes.txt"
        );
    }

    #[test]
    fn json_is_a_plain_object() {
        let mut store = FileStore::empty();
        store.create("a.txt", "hi");
        assert_eq!(store.to_json().unwrap(), r#"{"a.txt":"hi"}"#);
    }

    #[test]
    fn snapshot_round_trip() {
        let mut store = FileStore::with_defaults();
        store.create("unicode.txt", "héllo ✔, wörld; \"quoted\"\nnext line & more=1");
        let token = store.to_snapshot().unwrap();
        assert!(token.starts_with("%7B%22"));
        assert!(!token.contains(['{', '"', ' ', '&', '=', '\n']));
        assert_eq!(FileStore::from_snapshot(&token).unwrap(), store);
    }

    #[test]
    fn snapshot_escapes_like_uri_component() {
        let mut store = FileStore::empty();
        store.create("a b.txt", "it's (ok)!");
        assert_eq!(
            store.to_snapshot().unwrap(),
            "%7B%22a%20b.txt%22%3A%22it's%20(ok)!%22%7D"
        );
    }

    #[test]
    fn snapshot_accepts_plain_json() {
        let store = FileStore::from_snapshot(r#"{"x.ws":"echo hi"}"#).unwrap();
        assert_eq!(store.get("x.ws"), Some("echo hi"));
    }

    #[test]
    fn snapshot_rejects_garbage() {
        assert!(matches!(
            FileStore::from_snapshot("!!not a token!!"),
            Err(ShellError::Snapshot(_))
        ));
        assert!(matches!(
            FileStore::from_snapshot("%7B%FF%7D"),
            Err(ShellError::Snapshot(_))
        ));
        assert!(matches!(
            FileStore::from_snapshot("[1,2,3]"),
            Err(ShellError::Snapshot(_))
        ));
        assert!(matches!(
            FileStore::from_snapshot(r#"{"a": 1}"#),
            Err(ShellError::Snapshot(_))
        ));
    }
}
