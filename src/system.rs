use crate::{
    config::{ShellConfig, VERSION},
    editor::Key,
    logger,
    shell::Session,
    web::{read_clipboard, WebClock, WebHost},
};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

/// Page-facing handle. The page forwards key presses here; everything it
/// shows comes back through [`WebHost`].
#[wasm_bindgen]
pub struct System {
    session: Rc<RefCell<Session<WebHost>>>,
}

#[wasm_bindgen]
impl System {
    #[wasm_bindgen(constructor)]
    pub fn new(terminal_id: &str) -> Result<System, JsValue> {
        Self::with_config(terminal_id, "{}")
    }

    /// Like `new`, with a JSON object overriding any [`ShellConfig`] field.
    /// A snapshot in the page URL replaces the stored files and reloads the
    /// page without it.
    #[wasm_bindgen(js_name = withConfig)]
    pub fn with_config(terminal_id: &str, config_json: &str) -> Result<System, JsValue> {
        let config = ShellConfig::from_json(config_json).map_err(|e| e.to_string())?;
        logger::init(config.level());
        let host = WebHost::new(terminal_id).map_err(|e| e.to_string())?;
        let token = host.query_param(&config.snapshot_param);

        let mut session = Session::new(host, Rc::new(WebClock), config);
        session.restore_on_load(token.as_deref());
        log::info!("webtest_os {} ready, {} files", VERSION, session.store().len());
        Ok(System {
            session: Rc::new(RefCell::new(session)),
        })
    }

    #[wasm_bindgen]
    pub fn boot(&self) {
        self.session.borrow_mut().boot();
    }

    /// Returns true when the key was consumed and the page should
    /// suppress its default action.
    #[wasm_bindgen]
    pub fn key_down(&self, key: &str, ctrl: bool) -> bool {
        if Key::is_paste_shortcut(key, ctrl) {
            self.paste_from_clipboard();
            return true;
        }
        let mut session = self.session.borrow_mut();
        match Key::from_dom(key, ctrl) {
            Some(key) => {
                session.handle_key(key);
                true
            }
            None => {
                session.render_prompt();
                false
            }
        }
    }

    #[wasm_bindgen]
    pub fn paste(&self, text: &str) {
        self.session
            .borrow_mut()
            .handle_key(Key::Paste(text.to_string()));
    }

    #[wasm_bindgen]
    pub fn exec(&self, line: &str) {
        self.session.borrow_mut().execute(line.trim());
    }
}

impl System {
    fn paste_from_clipboard(&self) {
        let session = Rc::clone(&self.session);
        spawn_local(async move {
            match read_clipboard().await {
                Ok(text) => {
                    session.borrow_mut().handle_key(Key::Paste(text));
                }
                Err(err) => log::warn!("paste ignored: {}", err),
            }
        });
    }
}
