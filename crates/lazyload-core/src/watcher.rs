//! Viewport Watcher
//!
//! Turns proximity notifications into one activation per element.
//!
//! The environment's observer is modelled as a registration call that
//! yields a cancellable [`Subscription`], plus batches of
//! [`ProximityEntry`] delivered to [`ViewportWatcher::deliver`] whenever
//! scrolling, resizing or layout changes something. Batches may arrive in
//! any order and an element may be reported several times, including
//! before it is actually near the viewport.
//!
//! # Registration lifecycle
//!
//! ```text
//! observe() ──► registered ──(intersecting=true)──► activated + cancelled
//!                   │  ▲
//!                   └──┘ (intersecting=false: ignored)
//! ```
//!
//! Entries for elements that are no longer registered are dropped, which
//! is what guarantees at most one activation.

use crate::element::ImageElement;
use crate::placeholder::activate;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, trace};

/// Handle to one element's observation.
pub trait Subscription {
    /// Stop observing the element.
    fn cancel(self);
}

/// Source of proximity notifications.
pub trait ProximitySource<E> {
    type Subscription: Subscription + 'static;

    /// Start observing `element`.
    fn subscribe(&self, element: &E) -> Self::Subscription;
}

/// One "entered proximity" notification.
#[derive(Debug, Clone, PartialEq)]
pub struct ProximityEntry<E> {
    pub element: E,
    pub intersecting: bool,
}

impl<E> ProximityEntry<E> {
    pub fn new(element: E, intersecting: bool) -> Self {
        Self { element, intersecting }
    }
}

struct Registration<E, S> {
    element: E,
    subscription: S,
}

/// Tracks registered elements and activates them on first intersection.
pub struct ViewportWatcher<E, S> {
    registrations: Vec<Registration<E, S>>,
    activated: usize,
}

impl<E: ImageElement, S: Subscription> ViewportWatcher<E, S> {
    pub fn new() -> Self {
        Self {
            registrations: Vec::new(),
            activated: 0,
        }
    }

    /// Begin observing `element` through `source`.
    ///
    /// Returns `false` if the element is already registered.
    pub fn observe<P>(&mut self, source: &P, element: E) -> bool
    where
        P: ProximitySource<E, Subscription = S> + ?Sized,
    {
        if self.is_registered(&element) {
            return false;
        }
        let subscription = source.subscribe(&element);
        self.register(element, subscription);
        true
    }

    /// Record an observation the caller has already started.
    fn register(&mut self, element: E, subscription: S) {
        self.registrations.push(Registration { element, subscription });
    }

    /// Process one batch of notifications in delivery order.
    ///
    /// Each intersecting entry is matched by identity against the
    /// remaining registrations. Elements have no hashable key (a DOM node
    /// only offers identity comparison), so the lookup is linear in the
    /// number of images still waiting; activated images leave the list,
    /// so the scan shrinks as the page is scrolled.
    ///
    /// Returns the number of elements activated by this batch.
    pub fn deliver<I>(&mut self, entries: I) -> usize
    where
        I: IntoIterator<Item = ProximityEntry<E>>,
    {
        let mut count = 0;
        for entry in entries {
            if !entry.intersecting {
                trace!("Ignoring non-intersecting entry for {:?}", entry.element);
                continue;
            }
            let Some(index) = self.position(&entry.element) else {
                trace!("Ignoring entry for unregistered {:?}", entry.element);
                continue;
            };

            let registration = self.registrations.swap_remove(index);
            activate(&registration.element);
            registration.subscription.cancel();
            self.activated += 1;
            count += 1;
        }

        if count > 0 {
            debug!(
                "Activated {} element(s), {} still observed",
                count,
                self.registrations.len()
            );
        }
        count
    }

    /// Whether `element` is still waiting for proximity.
    pub fn is_registered(&self, element: &E) -> bool {
        self.position(element).is_some()
    }

    /// Number of elements still observed.
    pub fn registered(&self) -> usize {
        self.registrations.len()
    }

    /// Number of elements activated so far.
    pub fn activated(&self) -> usize {
        self.activated
    }

    /// No registrations remain; the watcher costs nothing anymore.
    pub fn is_idle(&self) -> bool {
        self.registrations.is_empty()
    }

    fn position(&self, element: &E) -> Option<usize> {
        self.registrations.iter().position(|r| r.element == *element)
    }
}

impl<E: ImageElement, S: Subscription> Default for ViewportWatcher<E, S> {
    fn default() -> Self {
        Self::new()
    }
}

/// A watcher shared between the coordinator and environment callbacks.
///
/// Single-threaded: the event loop serializes every callback.
pub struct SharedWatcher<E, S> {
    inner: Rc<RefCell<ViewportWatcher<E, S>>>,
}

impl<E: ImageElement, S: Subscription> SharedWatcher<E, S> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(ViewportWatcher::new())),
        }
    }

    /// See [`ViewportWatcher::observe`].
    pub fn observe<P>(&self, source: &P, element: E) -> bool
    where
        P: ProximitySource<E, Subscription = S> + ?Sized,
    {
        // Subscribe outside the borrow in case the source reports at once.
        if self.inner.borrow().is_registered(&element) {
            return false;
        }
        let subscription = source.subscribe(&element);
        self.inner.borrow_mut().register(element, subscription);
        true
    }

    /// See [`ViewportWatcher::deliver`].
    pub fn deliver<I>(&self, entries: I) -> usize
    where
        I: IntoIterator<Item = ProximityEntry<E>>,
    {
        self.inner.borrow_mut().deliver(entries)
    }

    pub fn is_registered(&self, element: &E) -> bool {
        self.inner.borrow().is_registered(element)
    }

    pub fn registered(&self) -> usize {
        self.inner.borrow().registered()
    }

    pub fn activated(&self) -> usize {
        self.inner.borrow().activated()
    }

    pub fn is_idle(&self) -> bool {
        self.inner.borrow().is_idle()
    }
}

impl<E, S> Clone for SharedWatcher<E, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<E: ImageElement, S: Subscription> Default for SharedWatcher<E, S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{DATA_SRC, SRC};
    use crate::placeholder::{swap_placeholder, PLACEHOLDER_DATA_URI};
    use crate::sim::{SimElement, SimProximity, SimSubscription};

    fn swapped(src: &str) -> SimElement {
        let img = SimElement::with_src(src);
        swap_placeholder(&img, PLACEHOLDER_DATA_URI);
        img
    }

    #[test]
    fn test_intersecting_entry_activates_and_unobserves() {
        let source = SimProximity::new();
        let mut watcher = ViewportWatcher::new();
        let img = swapped("photo.jpg");

        assert!(watcher.observe(&source, img.clone()));
        assert!(source.is_observing(&img));

        let count = watcher.deliver([ProximityEntry::new(img.clone(), true)]);

        assert_eq!(count, 1);
        assert_eq!(img.attribute(SRC).as_deref(), Some("photo.jpg"));
        assert_eq!(img.attribute(DATA_SRC), None);
        assert!(!watcher.is_registered(&img));
        assert!(!source.is_observing(&img));
        assert!(watcher.is_idle());
    }

    #[test]
    fn test_non_intersecting_entry_is_ignored() {
        let source = SimProximity::new();
        let mut watcher = ViewportWatcher::new();
        let img = swapped("photo.jpg");
        watcher.observe(&source, img.clone());

        let count = watcher.deliver([ProximityEntry::new(img.clone(), false)]);

        assert_eq!(count, 0);
        assert_eq!(img.attribute(SRC).as_deref(), Some(PLACEHOLDER_DATA_URI));
        assert!(watcher.is_registered(&img));
        assert!(source.is_observing(&img));
    }

    #[test]
    fn test_repeated_entries_activate_once() {
        let source = SimProximity::new();
        let mut watcher = ViewportWatcher::new();
        let img = swapped("photo.jpg");
        watcher.observe(&source, img.clone());

        let count = watcher.deliver([
            ProximityEntry::new(img.clone(), true),
            ProximityEntry::new(img.clone(), true),
        ]);
        assert_eq!(count, 1);

        // Markup changes after activation must survive later events
        img.set_attribute(DATA_SRC, "other.jpg");
        assert_eq!(watcher.deliver([ProximityEntry::new(img.clone(), true)]), 0);
        assert_eq!(img.attribute(SRC).as_deref(), Some("photo.jpg"));
        assert_eq!(watcher.activated(), 1);
    }

    #[test]
    fn test_batches_in_any_order() {
        let source = SimProximity::new();
        let mut watcher: ViewportWatcher<SimElement, SimSubscription> = ViewportWatcher::new();
        let imgs: Vec<_> = ["a.jpg", "b.jpg", "c.jpg"].into_iter().map(swapped).collect();
        for img in &imgs {
            watcher.observe(&source, img.clone());
        }

        watcher.deliver([
            ProximityEntry::new(imgs[2].clone(), true),
            ProximityEntry::new(imgs[0].clone(), false),
        ]);
        assert_eq!(watcher.registered(), 2);

        watcher.deliver([
            ProximityEntry::new(imgs[0].clone(), true),
            ProximityEntry::new(imgs[1].clone(), true),
        ]);
        assert!(watcher.is_idle());
        for (img, src) in imgs.iter().zip(["a.jpg", "b.jpg", "c.jpg"]) {
            assert_eq!(img.attribute(SRC).as_deref(), Some(src));
        }
    }

    #[test]
    fn test_observe_twice_registers_once() {
        let source = SimProximity::new();
        let mut watcher = ViewportWatcher::new();
        let img = swapped("photo.jpg");

        assert!(watcher.observe(&source, img.clone()));
        assert!(!watcher.observe(&source, img.clone()));
        assert_eq!(watcher.registered(), 1);
        assert_eq!(source.subscriptions(), 1);
    }

    #[test]
    fn test_shared_observe_twice_registers_once() {
        let source = SimProximity::new();
        let watcher = SharedWatcher::new();
        let img = swapped("photo.jpg");

        assert!(watcher.observe(&source, img.clone()));
        assert!(!watcher.observe(&source, img.clone()));
        assert_eq!(watcher.registered(), 1);
        assert_eq!(source.subscriptions(), 1);

        assert_eq!(watcher.deliver([ProximityEntry::new(img.clone(), true)]), 1);
        assert!(!source.is_observing(&img));
    }

    #[test]
    fn test_large_batch_activates_each_once() {
        let source = SimProximity::new();
        let mut watcher = ViewportWatcher::new();
        let imgs: Vec<_> = (0..200).map(|i| swapped(&format!("{}.jpg", i))).collect();
        for img in &imgs {
            watcher.observe(&source, img.clone());
        }

        let batch = imgs.iter().rev().map(|img| ProximityEntry::new(img.clone(), true));
        assert_eq!(watcher.deliver(batch), 200);
        assert!(watcher.is_idle());
        assert_eq!(source.subscriptions(), 200);
    }

    #[test]
    fn test_shared_watcher_clones_share_state() {
        let source = SimProximity::new();
        let watcher = SharedWatcher::new();
        let handle = watcher.clone();
        let img = swapped("photo.jpg");
        watcher.observe(&source, img.clone());

        handle.deliver([ProximityEntry::new(img.clone(), true)]);

        assert!(watcher.is_idle());
        assert_eq!(watcher.activated(), 1);
    }
}
