//! Retry tokens and the collector tree used to merge backoff requests.
//!
//! A [`RetryToken`] is either "no retry needed" or a deadline. Causes reported
//! against one leg are combined with [`RetryToken::combine_all`] (wait for the
//! latest), while independent parallel legs are combined with
//! [`RetryToken::combine_any`] (retry when the earliest opens).

use std::sync::Arc;

use parking_lot::Mutex;

use crate::clock::{Clock, Timestamp};

/// A request to retry no earlier than some deadline, or no request at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct RetryToken(Option<Timestamp>);

impl RetryToken {
    /// No retry requested.
    pub const NONE: RetryToken = RetryToken(None);

    /// Retry at `deadline`.
    pub fn at(deadline: Timestamp) -> Self {
        RetryToken(Some(deadline))
    }

    /// The deadline, if any.
    pub fn deadline(&self) -> Option<Timestamp> {
        self.0
    }

    /// True if no retry is requested.
    pub fn is_none(&self) -> bool {
        self.0.is_none()
    }

    /// True once the deadline has been reached. [`RetryToken::NONE`] has
    /// always expired.
    pub fn has_expired(&self, clock: &dyn Clock) -> bool {
        match self.0 {
            Some(deadline) => clock.now() >= deadline,
            None => true,
        }
    }

    /// Satisfied once both are: the later deadline. `NONE` is the identity.
    pub fn combine_all(self, other: RetryToken) -> RetryToken {
        match (self.0, other.0) {
            (None, _) => other,
            (_, None) => self,
            (Some(a), Some(b)) => RetryToken(Some(a.max(b))),
        }
    }

    /// Satisfied once either is: the earlier deadline. `NONE` is the identity.
    pub fn combine_any(self, other: RetryToken) -> RetryToken {
        match (self.0, other.0) {
            (None, _) => other,
            (_, None) => self,
            (Some(a), Some(b)) => RetryToken(Some(a.min(b))),
        }
    }
}

#[derive(Debug, Default)]
struct RetryNode {
    own: RetryToken,
    children: Vec<usize>,
}

#[derive(Debug, Default)]
struct RetryTree {
    nodes: Vec<RetryNode>,
}

impl RetryTree {
    fn aggregate(&self, index: usize) -> RetryToken {
        let node = &self.nodes[index];
        node.children
            .iter()
            .fold(node.own, |token, &child| token.combine_any(self.aggregate(child)))
    }
}

/// One leg of a retry tree.
///
/// Reports made through [`RetryCollector::retry_with`] accumulate on this leg
/// with AND semantics. [`RetryCollector::parallel`] opens a nested leg whose
/// aggregate joins this one with OR semantics.
#[derive(Debug, Clone)]
pub struct RetryCollector {
    tree: Arc<Mutex<RetryTree>>,
    node: usize,
}

impl RetryCollector {
    fn root() -> Self {
        let tree = RetryTree {
            nodes: vec![RetryNode::default()],
        };
        Self {
            tree: Arc::new(Mutex::new(tree)),
            node: 0,
        }
    }

    /// Open a new parallel leg beneath this one.
    pub fn parallel(&self) -> RetryCollector {
        let mut tree = self.tree.lock();
        let index = tree.nodes.len();
        tree.nodes.push(RetryNode::default());
        tree.nodes[self.node].children.push(index);
        RetryCollector {
            tree: Arc::clone(&self.tree),
            node: index,
        }
    }

    /// Record a retry cause on this leg.
    pub fn retry_with(&self, token: RetryToken) {
        let mut tree = self.tree.lock();
        let node = &mut tree.nodes[self.node];
        node.own = node.own.combine_all(token);
    }

    /// This leg's own token OR'd with each nested leg's aggregate.
    pub fn aggregate(&self) -> RetryToken {
        self.tree.lock().aggregate(self.node)
    }
}

/// The root of a retry tree.
#[derive(Debug, Clone)]
pub struct RetryGroup {
    root: RetryCollector,
}

impl Default for RetryGroup {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryGroup {
    /// An empty group requesting no retry.
    pub fn new() -> Self {
        Self {
            root: RetryCollector::root(),
        }
    }

    /// The root leg.
    pub fn collector(&self) -> &RetryCollector {
        &self.root
    }

    /// Open a parallel leg at the root.
    pub fn parallel(&self) -> RetryCollector {
        self.root.parallel()
    }

    /// Record a retry cause at the root.
    pub fn retry_with(&self, token: RetryToken) {
        self.root.retry_with(token);
    }

    /// The combined token.
    pub fn token(&self) -> RetryToken {
        self.root.aggregate()
    }

    /// True if any leg asked for a retry.
    pub fn retry_requested(&self) -> bool {
        !self.token().is_none()
    }
}
