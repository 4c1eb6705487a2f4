//! `IntersectionObserver` as a proximity source.

use crate::dom::{describe, DomImage};
use js_sys::Array;
use lazyload_core::{LazyConfig, LazyError, ProximityEntry, ProximityHandler, ProximitySource, Subscription};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{IntersectionObserver, IntersectionObserverEntry, IntersectionObserverInit};

/// One observer shared by every candidate.
pub struct DomProximity {
    observer: IntersectionObserver,
}

impl DomProximity {
    /// Create the observer and route its batches to `handler`.
    ///
    /// The callback lives for the rest of the page.
    pub fn new(config: &LazyConfig, handler: ProximityHandler<DomImage>) -> Result<Self, LazyError> {
        let callback = Closure::<dyn FnMut(Array, IntersectionObserver)>::new(
            move |entries: Array, _observer: IntersectionObserver| {
                let batch: Vec<_> = entries
                    .iter()
                    .filter_map(|value| value.dyn_into::<IntersectionObserverEntry>().ok())
                    .map(|entry| ProximityEntry::new(DomImage(entry.target()), entry.is_intersecting()))
                    .collect();
                handler(batch);
            },
        );

        let options = IntersectionObserverInit::new();
        options.set_root_margin(&config.root_margin);
        options.set_threshold(&JsValue::from_f64(config.threshold));

        let observer = IntersectionObserver::new_with_options(callback.as_ref().unchecked_ref(), &options)
            .map_err(|e| LazyError::Observer(describe(&e)))?;
        callback.forget();

        Ok(Self { observer })
    }
}

impl ProximitySource<DomImage> for DomProximity {
    type Subscription = DomSubscription;

    fn subscribe(&self, element: &DomImage) -> DomSubscription {
        self.observer.observe(&element.0);
        DomSubscription {
            observer: self.observer.clone(),
            element: element.clone(),
        }
    }
}

/// `unobserve` handle for one element.
pub struct DomSubscription {
    observer: IntersectionObserver,
    element: DomImage,
}

impl Subscription for DomSubscription {
    fn cancel(self) {
        self.observer.unobserve(&self.element.0);
    }
}
