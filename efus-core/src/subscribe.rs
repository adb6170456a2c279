//! Publish/subscribe primitives
//!
//! Every observable object in efus (namespaces, name bindings, component
//! arguments) owns a [`Subscribers`] list and exposes it through the
//! [`Subscribable`] trait. Objects that listen to others keep their
//! registrations in a [`Subscriber`], which removes them again when dropped.
//!
//! Notification is a direct, synchronous call of every registered callback.
//! Callbacks may subscribe or unsubscribe while a notification is running;
//! the list is snapshotted before the first call.

use crate::error::Result;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

/// Callback invoked on every change notification
pub type Callback = Rc<dyn Fn() -> Result<()>>;

/// Handle of one registered callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Subscriber list owned by an observable object
#[derive(Default)]
pub struct Subscribers {
    next_id: Cell<u64>,
    entries: RefCell<Vec<(SubscriptionId, Callback)>>,
}

impl Subscribers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, callback: impl Fn() -> Result<()> + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.entries.borrow_mut().push((id, Rc::new(callback)));
        id
    }

    pub fn remove(&self, id: SubscriptionId) -> bool {
        let mut entries = self.entries.borrow_mut();
        let before = entries.len();
        entries.retain(|(entry, _)| *entry != id);
        entries.len() != before
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Call every callback registered at the time of the call.
    ///
    /// Stops at the first callback error and returns it.
    pub fn notify(&self) -> Result<()> {
        let snapshot: Vec<Callback> = self
            .entries
            .borrow()
            .iter()
            .map(|(_, callback)| callback.clone())
            .collect();
        for callback in snapshot {
            callback()?;
        }
        Ok(())
    }
}

impl fmt::Debug for Subscribers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscribers")
            .field("len", &self.len())
            .finish()
    }
}

/// An object others can subscribe to
pub trait Subscribable {
    fn subscribers(&self) -> &Subscribers;

    fn subscribe(&self, callback: impl Fn() -> Result<()> + 'static) -> SubscriptionId
    where
        Self: Sized,
    {
        self.subscribers().add(callback)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscribers().remove(id)
    }

    /// Notify every subscriber
    fn warn_subscribers(&self) -> Result<()> {
        self.subscribers().notify()
    }
}

/// One registration on a subscribable object.
///
/// The target is held weakly; dropping the subscription unregisters the
/// callback if the target is still alive.
pub struct Subscription {
    target: Weak<dyn Subscribable>,
    id: SubscriptionId,
}

impl Subscription {
    pub fn new<S>(target: &Rc<S>, callback: impl Fn() -> Result<()> + 'static) -> Self
    where
        S: Subscribable + 'static,
    {
        let id = target.subscribers().add(callback);
        let target: Rc<dyn Subscribable> = target.clone();
        Self {
            target: Rc::downgrade(&target),
            id,
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    fn targets<S: Subscribable + 'static>(&self, other: &Rc<S>) -> bool {
        std::ptr::addr_eq(self.target.as_ptr(), Rc::as_ptr(other))
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(target) = self.target.upgrade() {
            target.unsubscribe(self.id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("alive", &(self.target.strong_count() > 0))
            .finish()
    }
}

/// Set of subscriptions held by a listening object
#[derive(Debug, Default)]
pub struct Subscriber {
    subscriptions: RefCell<Vec<Subscription>>,
}

impl Subscriber {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to the specified subscribable object
    pub fn subscribe_to<S>(&self, target: &Rc<S>, callback: impl Fn() -> Result<()> + 'static)
    where
        S: Subscribable + 'static,
    {
        let subscription = Subscription::new(target, callback);
        self.subscriptions.borrow_mut().push(subscription);
    }

    /// Remove every subscription to `target`
    pub fn unsubscribe_from<S>(&self, target: &Rc<S>)
    where
        S: Subscribable + 'static,
    {
        let removed: Vec<Subscription> = {
            let mut subscriptions = self.subscriptions.borrow_mut();
            let (removed, kept) = subscriptions
                .drain(..)
                .partition(|subscription| subscription.targets(target));
            *subscriptions = kept;
            removed
        };
        drop(removed);
    }

    pub fn len(&self) -> usize {
        self.subscriptions.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.borrow().is_empty()
    }
}
