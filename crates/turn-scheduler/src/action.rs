//! Action records, their lifecycle, and the vocabulary of action names.

use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

use strum::IntoEnumIterator;

use crate::sync::lock;

/// Identifier type usable as an action name.
///
/// Usually a fieldless enum deriving `strum::EnumIter` and `strum::Display`.
pub trait ActionName:
    Copy + Eq + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static
{
}

impl<T> ActionName for T where
    T: Copy + Eq + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static
{
}

/// Opaque argument value carried by an action.
pub trait ActionArg: Clone + fmt::Debug + Send + Sync + 'static {}

impl<T> ActionArg for T where T: Clone + fmt::Debug + Send + Sync + 'static {}

/// The fixed set of action names a queue or bus accepts.
///
/// Order is preserved for diagnostics.
#[derive(Clone, Debug)]
pub struct Vocabulary<K> {
    names: Vec<K>,
    lookup: HashSet<K>,
}

impl<K: ActionName> Vocabulary<K> {
    pub fn new(names: impl IntoIterator<Item = K>) -> Self {
        let mut lookup = HashSet::new();
        let names = names
            .into_iter()
            .filter(|name| lookup.insert(*name))
            .collect();
        Self { names, lookup }
    }

    /// Every variant of an enum deriving `strum::EnumIter`.
    pub fn all() -> Self
    where
        K: IntoEnumIterator,
    {
        Self::new(K::iter())
    }

    pub fn contains(&self, name: K) -> bool {
        self.lookup.contains(&name)
    }

    pub fn iter(&self) -> impl Iterator<Item = K> + '_ {
        self.names.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Per-queue sequence number of a scheduled action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActionId(pub u64);

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Reason a handler gave for declining to act.
///
/// Rejection is an expected outcome ("cannot afford purchase"), not an error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rejection {
    pub reason: String,
}

impl Rejection {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

/// Where an action is in its life.
///
/// `Planned -> Running -> Resolved | Rejected`, or `Planned -> Discarded` when
/// the action that scheduled it was rejected first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Lifecycle {
    Planned,
    Running,
    Resolved,
    Rejected(Rejection),
    Discarded,
}

impl Lifecycle {
    pub fn is_settled(&self) -> bool {
        matches!(self, Lifecycle::Resolved | Lifecycle::Rejected(_))
    }
}

struct RecordInner<K, A> {
    id: ActionId,
    name: K,
    args: Vec<A>,
    issuer: Option<K>,
    lifecycle: Mutex<Lifecycle>,
}

/// A scheduled action: name, arguments, issuer and lifecycle.
///
/// Clones share the same lifecycle, so a record seen in history, in an event,
/// or through a handle always reports the same state.
pub struct ActionRecord<K, A> {
    inner: Arc<RecordInner<K, A>>,
}

impl<K: ActionName, A: ActionArg> ActionRecord<K, A> {
    pub(crate) fn new(id: ActionId, name: K, args: Vec<A>, issuer: Option<K>) -> Self {
        Self {
            inner: Arc::new(RecordInner {
                id,
                name,
                args,
                issuer,
                lifecycle: Mutex::new(Lifecycle::Planned),
            }),
        }
    }

    pub fn id(&self) -> ActionId {
        self.inner.id
    }

    pub fn name(&self) -> K {
        self.inner.name
    }

    pub fn args(&self) -> &[A] {
        &self.inner.args
    }

    /// Name of the action that scheduled this one; `None` when scheduled externally.
    pub fn issuer(&self) -> Option<K> {
        self.inner.issuer
    }

    pub fn lifecycle(&self) -> Lifecycle {
        lock(&self.inner.lifecycle).clone()
    }

    /// Marks the action as running.
    ///
    /// # Panics
    ///
    /// Panics unless the action is still planned.
    pub(crate) fn start(&self) {
        let mut lifecycle = lock(&self.inner.lifecycle);
        assert!(
            *lifecycle == Lifecycle::Planned,
            "cannot start action {self}: already {:?}",
            *lifecycle
        );
        *lifecycle = Lifecycle::Running;
    }

    /// Records the final outcome of a running action.
    ///
    /// # Panics
    ///
    /// Panics if the action was already resolved or rejected, or never started.
    pub(crate) fn settle(&self, outcome: Lifecycle) {
        debug_assert!(outcome.is_settled());
        let mut lifecycle = lock(&self.inner.lifecycle);
        assert!(
            !lifecycle.is_settled(),
            "action {self} resolved twice: already {:?}",
            *lifecycle
        );
        assert!(
            *lifecycle == Lifecycle::Running,
            "cannot settle action {self}: not running ({:?})",
            *lifecycle
        );
        *lifecycle = outcome;
    }

    pub(crate) fn discard(&self) {
        *lock(&self.inner.lifecycle) = Lifecycle::Discarded;
    }
}

impl<K, A> Clone for ActionRecord<K, A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K: fmt::Display, A> fmt::Display for ActionRecord<K, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.inner.name, self.inner.id)
    }
}

impl<K: fmt::Debug, A: fmt::Debug> fmt::Debug for ActionRecord<K, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionRecord")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("args", &self.inner.args)
            .field("issuer", &self.inner.issuer)
            .finish()
    }
}
