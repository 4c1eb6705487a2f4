//! lazyload for the browser
//!
//! Compiled to wasm32 and loaded as a module. Loading the module only
//! installs console logging; the page starts the engine with [`init`] or
//! [`init_with_config`]. Either call boots on `DOMContentLoaded`, or
//! immediately if the document has already been parsed, detects the
//! page's capabilities and starts the matching activation strategy over
//! every `img[loading="lazy"]`.
//!
//! [`init`] reads an optional embedded JSON object once the document is
//! ready:
//!
//! ```html
//! <script type="application/json" id="lazyload-config">
//!   { "root_margin": "200px", "fallback_delay_ms": 500 }
//! </script>
//! ```
//!
//! The engine boots at most once per page. A second request made before
//! the document is ready replaces the first; any request after boot is
//! refused.

mod boot;
mod console;
mod dom;
mod observer;
mod timer;

pub use dom::{BrowserPage, DomImage};
pub use observer::{DomProximity, DomSubscription};
pub use timer::WindowScheduler;

use anyhow::{Context, Result};
use boot::{BootGate, ConfigSource, Request};
use lazyload_core::{Activation, Coordinator, LazyConfig, Strategy};
use std::cell::RefCell;
use tracing::{error, info, warn, Level};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

/// Id of the optional embedded configuration element
pub const CONFIG_ELEMENT_ID: &str = "lazyload-config";

thread_local! {
    static GATE: RefCell<BootGate> = RefCell::new(BootGate::new());
    static ACTIVE: RefCell<Option<Activation<BrowserPage>>> = const { RefCell::new(None) };
}

/// Module entry point.
#[wasm_bindgen(start)]
pub fn start() {
    console::install(Level::INFO);
}

/// Boot with the embedded `#lazyload-config`, or defaults without one.
#[wasm_bindgen]
pub fn init() -> Result<(), JsValue> {
    request(ConfigSource::Embedded).map_err(to_js)
}

/// Boot with a JSON configuration supplied by the page.
#[wasm_bindgen]
pub fn init_with_config(json: &str) -> Result<(), JsValue> {
    let config = LazyConfig::from_json(json).map_err(|e| JsValue::from_str(&e.to_string()))?;
    request(ConfigSource::Explicit(config)).map_err(to_js)
}

/// Name of the running strategy, or `undefined` before boot.
#[wasm_bindgen]
pub fn strategy() -> Option<String> {
    ACTIVE.with(|active| {
        active
            .borrow()
            .as_ref()
            .map(|activation| activation.strategy().to_string())
    })
}

/// Number of images still showing their placeholder.
#[wasm_bindgen]
pub fn pending_images() -> u32 {
    ACTIVE.with(|active| {
        active
            .borrow()
            .as_ref()
            .and_then(|activation| activation.candidates())
            .map_or(0, |c| c.pending() as u32)
    })
}

fn to_js(err: anyhow::Error) -> JsValue {
    JsValue::from_str(&format!("{:#}", err))
}

fn request(source: ConfigSource) -> Result<()> {
    let page = BrowserPage::new()?;
    let ready = page.ready_state().as_deref() != Some("loading");

    match GATE.with(|gate| gate.borrow_mut().request(source, ready))? {
        Request::BootNow(source) => boot(&page, source).map(|_| ()),
        Request::Wait => {
            let callback = Closure::once_into_js(on_dom_ready);
            page.document()
                .add_event_listener_with_callback("DOMContentLoaded", callback.unchecked_ref())
                .map_err(|e| anyhow::anyhow!(dom::describe(&e)))
                .context("registering DOMContentLoaded listener")
        }
        Request::Replaced => {
            info!("Replacing pending lazyload configuration");
            Ok(())
        }
    }
}

fn on_dom_ready() {
    let Some(source) = GATE.with(|gate| gate.borrow_mut().on_ready()) else {
        return;
    };
    let result = BrowserPage::new()
        .map_err(anyhow::Error::from)
        .and_then(|page| boot(&page, source));
    if let Err(err) = result {
        error!("lazyload failed to start: {:#}", err);
    }
}

/// Read `#lazyload-config`, defaulting when the page has none.
fn embedded_config(page: &BrowserPage) -> Result<LazyConfig> {
    let Some(element) = page.document().get_element_by_id(CONFIG_ELEMENT_ID) else {
        return Ok(LazyConfig::default());
    };
    let json = element.text_content().unwrap_or_default();
    LazyConfig::from_json(&json).with_context(|| format!("parsing #{}", CONFIG_ELEMENT_ID))
}

fn boot(page: &BrowserPage, source: ConfigSource) -> Result<Strategy> {
    let config = match source {
        ConfigSource::Explicit(config) => config,
        ConfigSource::Embedded => embedded_config(page).unwrap_or_else(|err| {
            warn!("Ignoring embedded configuration: {:#}", err);
            LazyConfig::default()
        }),
    };

    let activation = Coordinator::new(config)?
        .start(page)
        .context("starting activation")?;
    let strategy = activation.strategy();

    // Keeps the observer and timer state alive for the page lifetime.
    ACTIVE.with(|active| *active.borrow_mut() = Some(activation));
    Ok(strategy)
}
