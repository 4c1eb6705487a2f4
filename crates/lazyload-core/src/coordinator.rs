//! Activation Coordinator
//!
//! Selects the strategy once at startup and wires the candidate set to
//! the matching mechanism:
//!
//! ```text
//!            detect()
//!               │
//!    ┌──────────┼──────────────┐
//!    ▼          ▼              ▼
//!  Native    Observer     TimedFallback
//!  (done)   swap + watch   swap + timer
//!               │              ▲
//!               └── observer ──┘
//!                   refused
//! ```
//!
//! When the observer cannot be created the coordinator degrades to the
//! timer, and when the timer cannot be scheduled it activates everything
//! at once. Images are always shown eventually.

use crate::config::LazyConfig;
use crate::detect::{detect, Platform, Strategy};
use crate::element::{CandidateSet, ImageElement};
use crate::error::LazyError;
use crate::fallback::{FallbackTimer, Scheduler};
use crate::placeholder::swap_placeholder;
use crate::watcher::{ProximityEntry, ProximitySource, SharedWatcher};
use tracing::{debug, info, warn};

/// Callback the environment invokes with each batch of proximity entries.
pub type ProximityHandler<E> = Box<dyn Fn(Vec<ProximityEntry<E>>)>;

/// Subscription type of an environment's proximity source.
pub type SubscriptionOf<Env> = <<Env as Environment>::Proximity as ProximitySource<
    <Env as Environment>::Element,
>>::Subscription;

/// Everything the coordinator needs from the page.
pub trait Environment: Platform {
    type Element: ImageElement + 'static;
    type Proximity: ProximitySource<Self::Element>;
    type Scheduler: Scheduler;

    /// Gather the candidate elements, in document order.
    fn candidates(&self, selector: &str) -> Result<Vec<Self::Element>, LazyError>;

    /// Create a proximity source that reports to `handler`.
    fn proximity_source(
        &self,
        config: &LazyConfig,
        handler: ProximityHandler<Self::Element>,
    ) -> Result<Self::Proximity, LazyError>;

    /// Timer facility for the fallback strategy.
    fn scheduler(&self) -> &Self::Scheduler;
}

/// The running mechanism for one page load.
pub enum Activation<Env: Environment> {
    /// The platform handles everything
    Native,
    /// Elements wait for proximity events
    Observing {
        candidates: CandidateSet<Env::Element>,
        watcher: SharedWatcher<Env::Element, SubscriptionOf<Env>>,
        source: Env::Proximity,
    },
    /// Elements wait for the fallback timer
    Deferred { timer: FallbackTimer<Env::Element> },
}

impl<Env: Environment> Activation<Env> {
    /// The strategy actually governing this page load.
    pub fn strategy(&self) -> Strategy {
        match self {
            Self::Native => Strategy::Native,
            Self::Observing { .. } => Strategy::Observer,
            Self::Deferred { .. } => Strategy::TimedFallback,
        }
    }

    /// Candidates handled by the engine; empty for native.
    pub fn candidates(&self) -> Option<&CandidateSet<Env::Element>> {
        match self {
            Self::Native => None,
            Self::Observing { candidates, .. } => Some(candidates),
            Self::Deferred { timer } => Some(timer.candidates()),
        }
    }

    pub fn watcher(&self) -> Option<&SharedWatcher<Env::Element, SubscriptionOf<Env>>> {
        match self {
            Self::Observing { watcher, .. } => Some(watcher),
            _ => None,
        }
    }

    pub fn timer(&self) -> Option<&FallbackTimer<Env::Element>> {
        match self {
            Self::Deferred { timer } => Some(timer),
            _ => None,
        }
    }

    /// Every candidate has been activated (or nothing was deferred).
    pub fn is_settled(&self) -> bool {
        self.candidates().is_none_or(|c| c.pending() == 0)
    }
}

/// Orchestrates detection, swapping, and the chosen activation path.
#[derive(Debug, Clone)]
pub struct Coordinator {
    config: LazyConfig,
}

impl Coordinator {
    pub fn new(config: LazyConfig) -> Result<Self, LazyError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &LazyConfig {
        &self.config
    }

    /// Detect the strategy and start it.
    pub fn start<Env: Environment>(&self, env: &Env) -> Result<Activation<Env>, LazyError> {
        let strategy = detect(env);
        self.start_with(env, strategy)
    }

    /// Start a given strategy. The strategy is never re-evaluated.
    pub fn start_with<Env: Environment>(
        &self,
        env: &Env,
        strategy: Strategy,
    ) -> Result<Activation<Env>, LazyError> {
        info!("Using {} lazy loading", strategy);

        if !strategy.swaps_placeholders() {
            return Ok(Activation::Native);
        }

        let candidates = CandidateSet::new(env.candidates(&self.config.selector)?);
        let deferred = self.swap_all(&candidates);
        debug!("Deferred {} of {} candidate(s)", deferred, candidates.len());

        match strategy {
            Strategy::Observer => self.observe(env, candidates),
            _ => Ok(self.defer(env, candidates)),
        }
    }

    fn swap_all<E: ImageElement>(&self, candidates: &CandidateSet<E>) -> usize {
        candidates
            .iter()
            .filter(|e| !swap_placeholder(*e, &self.config.placeholder).skipped())
            .count()
    }

    fn observe<Env: Environment>(
        &self,
        env: &Env,
        candidates: CandidateSet<Env::Element>,
    ) -> Result<Activation<Env>, LazyError> {
        let watcher: SharedWatcher<Env::Element, SubscriptionOf<Env>> = SharedWatcher::new();
        let handle = watcher.clone();
        let handler: ProximityHandler<Env::Element> = Box::new(move |entries| {
            handle.deliver(entries);
        });

        let source = match env.proximity_source(&self.config, handler) {
            Ok(source) => source,
            Err(err) => {
                warn!("{}; falling back to timed activation", err);
                return Ok(self.defer(env, candidates));
            }
        };

        for element in candidates.iter().filter(|e| e.is_pending()) {
            watcher.observe(&source, element.clone());
        }
        debug!("Observing {} image(s)", watcher.registered());

        Ok(Activation::Observing {
            candidates,
            watcher,
            source,
        })
    }

    fn defer<Env: Environment>(&self, env: &Env, candidates: CandidateSet<Env::Element>) -> Activation<Env> {
        let timer = FallbackTimer::new(candidates, self.config.fallback_delay());
        if let Err(err) = timer.arm(env.scheduler()) {
            warn!("{}; activating all images now", err);
            timer.fire();
        }
        Activation::Deferred { timer }
    }
}
