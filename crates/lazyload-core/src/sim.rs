//! In-memory page for driving the engine without a browser.
//!
//! [`SimPage`] implements [`Environment`] with switchable capabilities,
//! [`SimProximity`] lets a test deliver proximity batches by hand and
//! [`SimScheduler`] runs timers against a manual clock. Only built for
//! tests and with the `sim` feature.
//!
//! ```rust,ignore
//! use lazyload_core::sim::SimPage;
//! use lazyload_core::{Coordinator, LazyConfig, ImageElement};
//!
//! let page = SimPage::new(false, true);
//! let img = page.add_lazy_image("photo.jpg");
//! let _activation = Coordinator::new(LazyConfig::default())
//!     .unwrap()
//!     .start(&page)
//!     .unwrap();
//!
//! page.proximity().report([(&img, true)]);
//! assert_eq!(img.attribute("src").as_deref(), Some("photo.jpg"));
//! ```

use crate::config::LazyConfig;
use crate::coordinator::{Environment, ProximityHandler};
use crate::detect::Platform;
use crate::element::{ImageElement, SRC};
use crate::error::LazyError;
use crate::fallback::Scheduler;
use crate::watcher::{ProximityEntry, ProximitySource, Subscription};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

/// An element whose attributes live in a shared map.
#[derive(Clone, Default)]
pub struct SimElement {
    attributes: Rc<RefCell<BTreeMap<String, String>>>,
}

impl SimElement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_src(src: &str) -> Self {
        let element = Self::new();
        element.set_attribute(SRC, src);
        element
    }

    /// Copy of every attribute, for before/after comparisons.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.attributes.borrow().clone()
    }
}

impl ImageElement for SimElement {
    fn attribute(&self, name: &str) -> Option<String> {
        self.attributes.borrow().get(name).cloned()
    }

    fn set_attribute(&self, name: &str, value: &str) {
        self.attributes
            .borrow_mut()
            .insert(name.to_string(), value.to_string());
    }

    fn remove_attribute(&self, name: &str) {
        self.attributes.borrow_mut().remove(name);
    }
}

impl PartialEq for SimElement {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.attributes, &other.attributes)
    }
}

impl fmt::Debug for SimElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.attributes.borrow().iter()).finish()
    }
}

#[derive(Default)]
struct ProximityState {
    observed: Vec<SimElement>,
    handler: Option<Rc<dyn Fn(Vec<ProximityEntry<SimElement>>)>>,
    subscriptions: usize,
}

/// Hand-driven proximity source.
#[derive(Clone, Default)]
pub struct SimProximity {
    state: Rc<RefCell<ProximityState>>,
}

impl SimProximity {
    pub fn new() -> Self {
        Self::default()
    }

    fn connect(&self, handler: ProximityHandler<SimElement>) {
        self.state.borrow_mut().handler = Some(Rc::from(handler));
    }

    /// Deliver one batch to the connected handler, in the given order.
    ///
    /// Returns `false` when no handler is connected.
    pub fn report<'a, I>(&self, batch: I) -> bool
    where
        I: IntoIterator<Item = (&'a SimElement, bool)>,
    {
        let Some(handler) = self.state.borrow().handler.clone() else {
            return false;
        };
        let entries: Vec<_> = batch
            .into_iter()
            .map(|(element, intersecting)| ProximityEntry::new(element.clone(), intersecting))
            .collect();
        (*handler)(entries);
        true
    }

    pub fn is_observing(&self, element: &SimElement) -> bool {
        self.state.borrow().observed.contains(element)
    }

    /// Total number of subscribe calls made.
    pub fn subscriptions(&self) -> usize {
        self.state.borrow().subscriptions
    }
}

impl ProximitySource<SimElement> for SimProximity {
    type Subscription = SimSubscription;

    fn subscribe(&self, element: &SimElement) -> SimSubscription {
        let mut state = self.state.borrow_mut();
        state.observed.push(element.clone());
        state.subscriptions += 1;
        SimSubscription {
            state: Rc::clone(&self.state),
            element: element.clone(),
        }
    }
}

/// Observation of one element by a [`SimProximity`].
pub struct SimSubscription {
    state: Rc<RefCell<ProximityState>>,
    element: SimElement,
}

impl Subscription for SimSubscription {
    fn cancel(self) {
        self.state.borrow_mut().observed.retain(|e| *e != self.element);
    }
}

struct PendingTask {
    due: Duration,
    seq: u64,
    task: Box<dyn FnOnce()>,
}

#[derive(Default)]
struct Clock {
    now: Duration,
    next_seq: u64,
    tasks: Vec<PendingTask>,
    refuse: bool,
}

/// Timers driven by [`SimScheduler::advance`].
#[derive(Clone, Default)]
pub struct SimScheduler {
    clock: Rc<RefCell<Clock>>,
}

impl SimScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward, running every task that becomes due in
    /// due-time order.
    pub fn advance(&self, by: Duration) {
        let now = {
            let mut clock = self.clock.borrow_mut();
            clock.now += by;
            clock.now
        };

        loop {
            let next = {
                let mut clock = self.clock.borrow_mut();
                let due = clock
                    .tasks
                    .iter()
                    .enumerate()
                    .filter(|(_, t)| t.due <= now)
                    .min_by_key(|(_, t)| (t.due, t.seq))
                    .map(|(i, _)| i);
                due.map(|i| clock.tasks.remove(i))
            };
            match next {
                Some(pending) => (pending.task)(),
                None => break,
            }
        }
    }

    pub fn now(&self) -> Duration {
        self.clock.borrow().now
    }

    /// Tasks scheduled but not yet run.
    pub fn pending(&self) -> usize {
        self.clock.borrow().tasks.len()
    }
}

impl Scheduler for SimScheduler {
    fn schedule(&self, delay: Duration, task: Box<dyn FnOnce()>) -> Result<(), LazyError> {
        let mut clock = self.clock.borrow_mut();
        if clock.refuse {
            return Err(LazyError::Scheduler("timers disabled".to_string()));
        }
        let seq = clock.next_seq;
        clock.next_seq += 1;
        let due = clock.now + delay;
        clock.tasks.push(PendingTask { due, seq, task });
        Ok(())
    }
}

/// A page with switchable capabilities.
pub struct SimPage {
    native: bool,
    observer: bool,
    refuse_observer: bool,
    elements: RefCell<Vec<SimElement>>,
    proximity: SimProximity,
    scheduler: SimScheduler,
}

impl SimPage {
    pub fn new(native: bool, observer: bool) -> Self {
        Self {
            native,
            observer,
            refuse_observer: false,
            elements: RefCell::new(Vec::new()),
            proximity: SimProximity::new(),
            scheduler: SimScheduler::new(),
        }
    }

    /// Advertise an observer but fail to construct one.
    pub fn refuse_observer(mut self) -> Self {
        self.refuse_observer = true;
        self
    }

    /// Fail every timer request.
    pub fn refuse_timers(self) -> Self {
        self.scheduler.clock.borrow_mut().refuse = true;
        self
    }

    /// Append an `<img loading="lazy" src=...>`.
    pub fn add_lazy_image(&self, src: &str) -> SimElement {
        let element = SimElement::with_src(src);
        element.set_attribute("loading", "lazy");
        self.add_element(element)
    }

    /// Append an arbitrary element.
    pub fn add_element(&self, element: SimElement) -> SimElement {
        self.elements.borrow_mut().push(element.clone());
        element
    }

    pub fn proximity(&self) -> &SimProximity {
        &self.proximity
    }
}

impl Platform for SimPage {
    fn supports_native_lazy_loading(&self) -> bool {
        self.native
    }

    fn supports_viewport_observer(&self) -> bool {
        self.observer
    }
}

impl Environment for SimPage {
    type Element = SimElement;
    type Proximity = SimProximity;
    type Scheduler = SimScheduler;

    fn candidates(&self, selector: &str) -> Result<Vec<SimElement>, LazyError> {
        let query = AttributeSelector::parse(selector)?;
        Ok(self
            .elements
            .borrow()
            .iter()
            .filter(|e| query.matches(e))
            .cloned()
            .collect())
    }

    fn proximity_source(
        &self,
        _config: &LazyConfig,
        handler: ProximityHandler<SimElement>,
    ) -> Result<SimProximity, LazyError> {
        if self.refuse_observer {
            return Err(LazyError::Observer("construction refused".to_string()));
        }
        self.proximity.connect(handler);
        Ok(self.proximity.clone())
    }

    fn scheduler(&self) -> &SimScheduler {
        &self.scheduler
    }
}

/// The subset of CSS the simulated page understands:
/// `tag`, `tag[attr]` and `tag[attr="value"]`. Every element is an image,
/// so the tag part is ignored.
struct AttributeSelector {
    attribute: Option<(String, Option<String>)>,
}

impl AttributeSelector {
    fn parse(selector: &str) -> Result<Self, LazyError> {
        let Some(open) = selector.find('[') else {
            return Ok(Self { attribute: None });
        };
        let inner = selector[open + 1..]
            .strip_suffix(']')
            .ok_or_else(|| LazyError::Query(format!("unsupported selector `{}`", selector)))?;

        let attribute = match inner.split_once('=') {
            Some((name, value)) => {
                let value = value.trim_matches(|c| c == '"' || c == '\'');
                (name.trim().to_string(), Some(value.to_string()))
            }
            None => (inner.trim().to_string(), None),
        };
        Ok(Self {
            attribute: Some(attribute),
        })
    }

    fn matches(&self, element: &SimElement) -> bool {
        match &self.attribute {
            None => true,
            Some((name, None)) => element.attribute(name).is_some(),
            Some((name, Some(value))) => element.attribute(name).as_deref() == Some(value.as_str()),
        }
    }
}
