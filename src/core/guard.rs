//! Guard predicates for controlling transitions.
//!
//! A guard is a named pure predicate over the subject of a transition
//! (usually a [`Cheque`](crate::model::Cheque)). The name ends up in the
//! error raised when the guard blocks, so callers learn which precondition
//! failed rather than just "not allowed".

use std::fmt;
use std::sync::Arc;

/// Named, pure predicate that determines if a transition can execute.
///
/// # Example
///
/// ```rust
/// use chequeflow::core::Guard;
///
/// let positive = Guard::new("amount is positive", |amount: &i64| *amount > 0);
///
/// assert!(positive.check(&10));
/// assert!(!positive.check(&0));
/// assert_eq!(positive.description(), "amount is positive");
/// ```
pub struct Guard<T> {
    description: String,
    predicate: Arc<dyn Fn(&T) -> bool + Send + Sync>,
}

impl<T> Guard<T> {
    /// Create a guard from a description and a pure predicate.
    ///
    /// The predicate must be deterministic and thread-safe.
    pub fn new<F>(description: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Guard {
            description: description.into(),
            predicate: Arc::new(predicate),
        }
    }

    /// Check if the guard allows the transition for this subject.
    pub fn check(&self, subject: &T) -> bool {
        (self.predicate)(subject)
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl<T> Clone for Guard<T> {
    fn clone(&self) -> Self {
        Self {
            description: self.description.clone(),
            predicate: Arc::clone(&self.predicate),
        }
    }
}

impl<T> fmt::Debug for Guard<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Guard")
            .field("description", &self.description)
            .finish()
    }
}
