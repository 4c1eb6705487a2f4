//! Browser page environment.

use crate::observer::DomProximity;
use crate::timer::WindowScheduler;
use js_sys::Reflect;
use lazyload_core::{Environment, ImageElement, LazyConfig, LazyError, Platform, ProximityHandler};
use std::fmt;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, Element, Window};

/// An `<img>` element in the live document.
#[derive(Clone)]
pub struct DomImage(pub Element);

impl ImageElement for DomImage {
    fn attribute(&self, name: &str) -> Option<String> {
        self.0.get_attribute(name)
    }

    fn set_attribute(&self, name: &str, value: &str) {
        if let Err(err) = self.0.set_attribute(name, value) {
            tracing::debug!("set {} failed: {}", name, describe(&err));
        }
    }

    fn remove_attribute(&self, name: &str) {
        if let Err(err) = self.0.remove_attribute(name) {
            tracing::debug!("remove {} failed: {}", name, describe(&err));
        }
    }
}

impl PartialEq for DomImage {
    fn eq(&self, other: &Self) -> bool {
        js_sys::Object::is(&self.0, &other.0)
    }
}

impl fmt::Debug for DomImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.get_attribute("data-src").or_else(|| self.0.get_attribute("src")) {
            Some(src) => write!(f, "<img {}>", src),
            None => write!(f, "<img>"),
        }
    }
}

/// The current window and document.
pub struct BrowserPage {
    window: Window,
    document: Document,
    scheduler: WindowScheduler,
}

impl BrowserPage {
    pub fn new() -> Result<Self, LazyError> {
        let window = web_sys::window().ok_or(LazyError::MissingGlobal("window"))?;
        let document = window.document().ok_or(LazyError::MissingGlobal("document"))?;
        let scheduler = WindowScheduler::new(window.clone());
        Ok(Self {
            window,
            document,
            scheduler,
        })
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// `document.readyState`, `None` if unreadable.
    pub fn ready_state(&self) -> Option<String> {
        Reflect::get(&self.document, &JsValue::from_str("readyState"))
            .ok()
            .and_then(|state| state.as_string())
    }
}

impl Platform for BrowserPage {
    /// `'loading' in HTMLImageElement.prototype`
    fn supports_native_lazy_loading(&self) -> bool {
        Reflect::get(&self.window, &JsValue::from_str("HTMLImageElement"))
            .ok()
            .filter(|ctor| ctor.is_function())
            .and_then(|ctor| Reflect::get(&ctor, &JsValue::from_str("prototype")).ok())
            .and_then(|proto| Reflect::has(&proto, &JsValue::from_str("loading")).ok())
            .unwrap_or(false)
    }

    /// `'IntersectionObserver' in window`
    fn supports_viewport_observer(&self) -> bool {
        Reflect::has(&self.window, &JsValue::from_str("IntersectionObserver")).unwrap_or(false)
    }
}

impl Environment for BrowserPage {
    type Element = DomImage;
    type Proximity = DomProximity;
    type Scheduler = WindowScheduler;

    fn candidates(&self, selector: &str) -> Result<Vec<DomImage>, LazyError> {
        let nodes = self
            .document
            .query_selector_all(selector)
            .map_err(|e| LazyError::Query(describe(&e)))?;

        Ok((0..nodes.length())
            .filter_map(|i| nodes.item(i))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .map(DomImage)
            .collect())
    }

    fn proximity_source(
        &self,
        config: &LazyConfig,
        handler: ProximityHandler<DomImage>,
    ) -> Result<DomProximity, LazyError> {
        DomProximity::new(config, handler)
    }

    fn scheduler(&self) -> &WindowScheduler {
        &self.scheduler
    }
}

/// Render a thrown JS value for logs and errors.
pub(crate) fn describe(value: &JsValue) -> String {
    value
        .as_string()
        .or_else(|| {
            value
                .dyn_ref::<js_sys::Error>()
                .map(|e| String::from(e.message()))
        })
        .unwrap_or_else(|| format!("{:?}", value))
}
