//! lazyload - Viewport-Driven Image Activation
//!
//! This crate holds the environment-agnostic engine that defers image
//! loading until an image approaches the viewport. The browser binding
//! lives in `lazyload-web`; everything here talks to the page through
//! the traits in [`element`], [`detect`], [`watcher`], [`fallback`] and
//! [`coordinator`].
//!
//! # Strategies
//!
//! | Strategy | Swaps placeholders | Activation trigger |
//! |----------|--------------------|--------------------|
//! | Native | No | The platform's own engine |
//! | Observer | Yes | First intersecting proximity event |
//! | TimedFallback | Yes | Fixed delay, all elements at once |
//!
//! Exactly one strategy governs a page load. It is computed once by
//! [`detect`] and threaded into [`Coordinator::start`].

pub mod config;
pub mod coordinator;
pub mod detect;
pub mod element;
pub mod error;
pub mod fallback;
pub mod placeholder;
#[cfg(any(test, feature = "sim"))]
pub mod sim;
pub mod watcher;

pub use config::{ConfigError, LazyConfig};
pub use coordinator::{Activation, Coordinator, Environment, ProximityHandler};
pub use detect::{detect, Platform, Strategy};
pub use element::{CandidateSet, ImageElement};
pub use error::LazyError;
pub use fallback::{FallbackTimer, Scheduler, TimerState};
pub use placeholder::{activate, swap_placeholder, SwapOutcome, PLACEHOLDER_DATA_URI, PLACEHOLDER_GIF};
pub use watcher::{ProximityEntry, ProximitySource, SharedWatcher, Subscription, ViewportWatcher};
