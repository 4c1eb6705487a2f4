//! Placeholder swapping and activation.
//!
//! The swap records the authored sources into `data-src`/`data-srcset`
//! and shows an inert 1x1 transparent GIF. Activation moves the recorded
//! sources back and removes the auxiliary attributes, which is what makes
//! a second activation a no-op.

use crate::element::{ImageElement, DATA_SRC, DATA_SRCSET, SRC, SRCSET};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use tracing::debug;

/// 1x1 transparent GIF89a.
pub const PLACEHOLDER_GIF: [u8; 42] = [
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00, 0x01, 0x00, 0x80, 0x00,
    0x00, 0x00, 0x00, 0x00, 0xff, 0xff, 0xff, 0x21, 0xf9, 0x04, 0x01, 0x00,
    0x00, 0x00, 0x00, 0x2c, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00,
    0x00, 0x02, 0x01, 0x44, 0x00, 0x3b,
];

/// [`PLACEHOLDER_GIF`] as an inline data URI. Setting this as `src` never
/// triggers a network fetch.
pub const PLACEHOLDER_DATA_URI: &str =
    "data:image/gif;base64,R0lGODlhAQABAIAAAAAAAP///yH5BAEAAAAALAAAAAABAAEAAAIBRAA7";

/// Encode arbitrary image bytes as a base64 data URI.
pub fn data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, BASE64.encode(bytes))
}

/// What [`swap_placeholder`] did to an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SwapOutcome {
    /// `src` was copied into `data-src`
    pub recorded_src: bool,
    /// `srcset` was copied into `data-srcset`
    pub recorded_srcset: bool,
    /// The element holds recorded sources and shows nothing real
    pub deferred: bool,
}

impl SwapOutcome {
    /// Nothing was touched: the element had no source to defer.
    pub fn skipped(&self) -> bool {
        !self.deferred
    }
}

/// Record an element's real sources and show `placeholder` instead.
///
/// Already recorded fields are never overwritten, so calling this twice
/// keeps the original authored values. An element with no source at all
/// (neither visible nor recorded) is left alone. An element that only
/// carries a source-set has it removed but gets no placeholder `src`, so
/// activation restores exactly the authored attributes. Markup that
/// already records `data-src` keeps its authored `src` (typically a
/// low-res preview) until activation.
pub fn swap_placeholder<E: ImageElement>(element: &E, placeholder: &str) -> SwapOutcome {
    let mut outcome = SwapOutcome::default();

    if !element.has_value(DATA_SRC) {
        if let Some(src) = element.attribute(SRC).filter(|s| !s.is_empty() && s.as_str() != placeholder) {
            element.set_attribute(DATA_SRC, &src);
            outcome.recorded_src = true;
        }
    }

    if !element.has_value(DATA_SRCSET) {
        if let Some(srcset) = element.attribute(SRCSET).filter(|s| !s.is_empty()) {
            element.set_attribute(DATA_SRCSET, &srcset);
            outcome.recorded_srcset = true;
        }
    }

    if !element.is_pending() {
        debug!("No source to defer on {:?}", element);
        return outcome;
    }

    // A live srcset would let the browser fetch a real candidate anyway.
    if element.attribute(SRCSET).is_some() {
        element.remove_attribute(SRCSET);
    }
    if outcome.recorded_src || (element.has_value(DATA_SRC) && element.attribute(SRC).is_none()) {
        element.set_attribute(SRC, placeholder);
    }
    outcome.deferred = true;
    outcome
}

/// Restore recorded sources. Returns `true` if anything was restored.
pub fn activate<E: ImageElement>(element: &E) -> bool {
    let mut restored = false;

    if let Some(srcset) = element.attribute(DATA_SRCSET).filter(|s| !s.is_empty()) {
        element.set_attribute(SRCSET, &srcset);
        restored = true;
    }
    element.remove_attribute(DATA_SRCSET);

    if let Some(src) = element.attribute(DATA_SRC).filter(|s| !s.is_empty()) {
        element.set_attribute(SRC, &src);
        restored = true;
    }
    element.remove_attribute(DATA_SRC);

    if restored {
        debug!("Activated {:?}", element);
    }
    restored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimElement;

    #[test]
    fn test_placeholder_bytes_match_data_uri() {
        assert_eq!(data_uri("image/gif", &PLACEHOLDER_GIF), PLACEHOLDER_DATA_URI);
        assert_eq!(&PLACEHOLDER_GIF[..6], b"GIF89a");
    }

    #[test]
    fn test_swap_records_and_hides_sources() {
        let img = SimElement::with_src("photo.jpg");
        img.set_attribute(SRCSET, "photo-2x.jpg 2x");

        let outcome = swap_placeholder(&img, PLACEHOLDER_DATA_URI);

        assert!(outcome.recorded_src);
        assert!(outcome.recorded_srcset);
        assert_eq!(img.attribute(SRC).as_deref(), Some(PLACEHOLDER_DATA_URI));
        assert_eq!(img.attribute(SRCSET), None);
        assert_eq!(img.attribute(DATA_SRC).as_deref(), Some("photo.jpg"));
        assert_eq!(img.attribute(DATA_SRCSET).as_deref(), Some("photo-2x.jpg 2x"));
    }

    #[test]
    fn test_swap_is_idempotent() {
        let img = SimElement::with_src("photo.jpg");

        swap_placeholder(&img, PLACEHOLDER_DATA_URI);
        let second = swap_placeholder(&img, PLACEHOLDER_DATA_URI);

        assert!(!second.recorded_src);
        assert_eq!(img.attribute(DATA_SRC).as_deref(), Some("photo.jpg"));
    }

    #[test]
    fn test_swap_keeps_markup_preview_until_activation() {
        // Markup that already carries data-src with a low-res src
        let img = SimElement::with_src("thumb.jpg");
        img.set_attribute(DATA_SRC, "full.jpg");
        img.set_attribute(SRCSET, "thumb-2x.jpg 2x");

        let outcome = swap_placeholder(&img, PLACEHOLDER_DATA_URI);

        assert!(!outcome.recorded_src);
        assert!(outcome.deferred);
        assert_eq!(img.attribute(SRC).as_deref(), Some("thumb.jpg"));
        assert_eq!(img.attribute(SRCSET), None);
        assert_eq!(img.attribute(DATA_SRC).as_deref(), Some("full.jpg"));

        assert!(activate(&img));
        assert_eq!(img.attribute(SRC).as_deref(), Some("full.jpg"));
    }

    #[test]
    fn test_swap_fills_missing_src_for_markup_recorded_source() {
        let img = SimElement::new();
        img.set_attribute(DATA_SRC, "full.jpg");

        let outcome = swap_placeholder(&img, PLACEHOLDER_DATA_URI);

        assert!(outcome.deferred);
        assert_eq!(img.attribute(SRC).as_deref(), Some(PLACEHOLDER_DATA_URI));
    }

    #[test]
    fn test_swap_skips_element_without_source() {
        let img = SimElement::new();

        let outcome = swap_placeholder(&img, PLACEHOLDER_DATA_URI);

        assert!(outcome.skipped());
        assert_eq!(img.attribute(SRC), None);
    }

    #[test]
    fn test_srcset_only_element_round_trips() {
        let img = SimElement::new();
        img.set_attribute(SRCSET, "a.jpg 1x, b.jpg 2x");
        let authored = img.snapshot();

        let outcome = swap_placeholder(&img, PLACEHOLDER_DATA_URI);
        assert!(outcome.deferred);
        assert_eq!(img.attribute(SRC), None);
        assert_eq!(img.attribute(SRCSET), None);

        activate(&img);
        assert_eq!(img.snapshot(), authored);
    }

    #[test]
    fn test_activate_restores_and_removes_records() {
        let img = SimElement::with_src("photo.jpg");
        img.set_attribute(SRCSET, "photo-2x.jpg 2x");
        swap_placeholder(&img, PLACEHOLDER_DATA_URI);

        assert!(activate(&img));

        assert_eq!(img.attribute(SRC).as_deref(), Some("photo.jpg"));
        assert_eq!(img.attribute(SRCSET).as_deref(), Some("photo-2x.jpg 2x"));
        assert_eq!(img.attribute(DATA_SRC), None);
        assert_eq!(img.attribute(DATA_SRCSET), None);
    }

    #[test]
    fn test_activate_twice_is_noop() {
        let img = SimElement::with_src("photo.jpg");
        swap_placeholder(&img, PLACEHOLDER_DATA_URI);

        assert!(activate(&img));
        let snapshot = img.snapshot();
        assert!(!activate(&img));
        assert_eq!(img.snapshot(), snapshot);
    }
}
