//! Candidate elements and the candidate set.

use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

/// Visible source attribute.
pub const SRC: &str = "src";
/// Visible source-set attribute.
pub const SRCSET: &str = "srcset";
/// Recorded real source, present while the placeholder is shown.
pub const DATA_SRC: &str = "data-src";
/// Recorded real source-set, present while the placeholder is shown.
pub const DATA_SRCSET: &str = "data-srcset";

/// A handle to one image element owned by the page.
///
/// Attribute mutation goes through `&self`, the same way a DOM node is
/// mutated through any reference to it. Cloning yields another handle to
/// the same element and `PartialEq` compares identity, not contents.
pub trait ImageElement: Clone + PartialEq + fmt::Debug {
    /// Read an attribute, `None` when absent.
    fn attribute(&self, name: &str) -> Option<String>;

    /// Set an attribute. Failures are swallowed by the implementation.
    fn set_attribute(&self, name: &str, value: &str);

    /// Remove an attribute. Removing an absent attribute is a no-op.
    fn remove_attribute(&self, name: &str);

    /// Whether the attribute is present and non-empty.
    fn has_value(&self, name: &str) -> bool {
        self.attribute(name).is_some_and(|v| !v.is_empty())
    }

    /// Whether a real source or source-set is still recorded.
    fn is_pending(&self) -> bool {
        self.has_value(DATA_SRC) || self.has_value(DATA_SRCSET)
    }
}

/// The ordered candidate elements gathered once at startup.
///
/// Membership never changes after construction. Clones share storage.
#[derive(Clone)]
pub struct CandidateSet<E> {
    elements: Rc<[E]>,
}

impl<E: ImageElement> CandidateSet<E> {
    /// Freeze a list of candidates.
    pub fn new(elements: Vec<E>) -> Self {
        Self {
            elements: elements.into(),
        }
    }

    /// Number of candidates still holding a recorded source.
    pub fn pending(&self) -> usize {
        self.elements.iter().filter(|e| e.is_pending()).count()
    }
}

impl<E> Deref for CandidateSet<E> {
    type Target = [E];

    fn deref(&self) -> &[E] {
        &self.elements
    }
}

impl<E: fmt::Debug> fmt::Debug for CandidateSet<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.elements.iter()).finish()
    }
}

impl<E: ImageElement> FromIterator<E> for CandidateSet<E> {
    fn from_iter<I: IntoIterator<Item = E>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimElement;

    #[test]
    fn test_candidate_set_preserves_order() {
        let a = SimElement::with_src("a.jpg");
        let b = SimElement::with_src("b.jpg");
        let set: CandidateSet<_> = vec![a.clone(), b.clone()].into_iter().collect();

        assert_eq!(set.len(), 2);
        assert_eq!(set[0], a);
        assert_eq!(set[1], b);
    }

    #[test]
    fn test_pending_counts_recorded_sources() {
        let a = SimElement::new();
        a.set_attribute(DATA_SRC, "a.jpg");
        let b = SimElement::new();
        b.set_attribute(DATA_SRCSET, "b.jpg 1x");
        let c = SimElement::with_src("c.jpg");

        let set = CandidateSet::new(vec![a, b, c]);
        assert_eq!(set.pending(), 2);
    }

    #[test]
    fn test_empty_recorded_source_is_not_pending() {
        let a = SimElement::new();
        a.set_attribute(DATA_SRC, "");
        assert!(!a.is_pending());
    }
}
