//! Subscription management for reactive views.
//!
//! Provides subscription id tokens and a manager for tracking active
//! subscriptions, generic over the notification payload.

use alloc::rc::Rc;
use alloc::vec::Vec;
use hashbrown::HashMap;

/// Unique identifier for a subscription.
pub type SubscriptionId = u64;

/// A subscription to change notifications.
pub struct Subscription<T> {
    id: SubscriptionId,
    callback: Rc<dyn Fn(&T)>,
    active: bool,
}

impl<T> Subscription<T> {
    /// Creates a new subscription.
    pub fn new<F>(id: SubscriptionId, callback: F) -> Self
    where
        F: Fn(&T) + 'static,
    {
        Self {
            id,
            callback: Rc::new(callback),
            active: true,
        }
    }

    /// Returns the subscription ID.
    #[inline]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Returns whether this subscription is active.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Deactivates this subscription.
    #[inline]
    pub fn deactivate(&mut self) {
        self.active = false;
    }

    /// Notifies this subscription.
    pub fn notify(&self, payload: &T) {
        if self.active {
            (self.callback)(payload);
        }
    }
}

/// Manages subscriptions for one observable view.
pub struct SubscriptionManager<T> {
    subscriptions: HashMap<SubscriptionId, Subscription<T>>,
    next_id: SubscriptionId,
}

impl<T> Default for SubscriptionManager<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SubscriptionManager<T> {
    /// Creates a new subscription manager.
    pub fn new() -> Self {
        Self {
            subscriptions: HashMap::new(),
            next_id: 1,
        }
    }

    /// Subscribes with the given callback, returning the id used to
    /// unsubscribe.
    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: Fn(&T) + 'static,
    {
        let id = self.next_id;
        self.next_id += 1;
        self.subscriptions.insert(id, Subscription::new(id, callback));
        id
    }

    /// Unsubscribes by ID. Returns true if the subscription existed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscriptions.remove(&id).is_some()
    }

    /// Notifies a specific subscription.
    pub fn notify(&self, id: SubscriptionId, payload: &T) {
        if let Some(sub) = self.subscriptions.get(&id) {
            sub.notify(payload);
        }
    }

    /// Notifies all active subscriptions.
    pub fn notify_all(&self, payload: &T) {
        for sub in self.subscriptions.values() {
            sub.notify(payload);
        }
    }

    /// Snapshots the active callbacks so a caller can invoke them after
    /// releasing its own borrow of the manager.
    pub fn callbacks(&self) -> Vec<Rc<dyn Fn(&T)>> {
        self.subscriptions
            .values()
            .filter(|sub| sub.is_active())
            .map(|sub| sub.callback.clone())
            .collect()
    }

    /// Returns the number of subscriptions.
    #[inline]
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    /// Returns true if there are no subscriptions.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Returns all subscription IDs.
    pub fn subscription_ids(&self) -> Vec<SubscriptionId> {
        self.subscriptions.keys().copied().collect()
    }

    /// Clears all subscriptions.
    pub fn clear(&mut self) {
        self.subscriptions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::RefCell;

    #[test]
    fn test_subscription_new() {
        let sub: Subscription<i32> = Subscription::new(1, |_| {});
        assert_eq!(sub.id(), 1);
        assert!(sub.is_active());
    }

    #[test]
    fn test_subscription_deactivate() {
        let mut sub: Subscription<i32> = Subscription::new(1, |_| {});
        sub.deactivate();
        assert!(!sub.is_active());
        let called = Rc::new(RefCell::new(false));
        let called_clone = called.clone();
        let mut sub = Subscription::new(2, move |_: &i32| {
            *called_clone.borrow_mut() = true;
        });
        sub.deactivate();
        sub.notify(&1);
        assert!(!*called.borrow());
    }

    #[test]
    fn test_manager_subscribe_unsubscribe() {
        let mut manager: SubscriptionManager<i32> = SubscriptionManager::new();
        let id1 = manager.subscribe(|_| {});
        let id2 = manager.subscribe(|_| {});
        assert_eq!(id1, 1);
        assert_eq!(id2, 2);
        assert_eq!(manager.len(), 2);

        assert!(manager.unsubscribe(id1));
        assert!(!manager.unsubscribe(id1));
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_manager_notify_all() {
        let mut manager: SubscriptionManager<i32> = SubscriptionManager::new();
        let count = Rc::new(RefCell::new(0));
        let c1 = count.clone();
        let c2 = count.clone();
        manager.subscribe(move |v: &i32| *c1.borrow_mut() += v);
        manager.subscribe(move |v: &i32| *c2.borrow_mut() += v * 10);
        manager.notify_all(&2);
        assert_eq!(*count.borrow(), 22);
    }

    #[test]
    fn test_manager_notify_specific() {
        let mut manager: SubscriptionManager<i32> = SubscriptionManager::new();
        let count = Rc::new(RefCell::new(0));
        let c1 = count.clone();
        let c2 = count.clone();
        let id1 = manager.subscribe(move |_: &i32| *c1.borrow_mut() += 1);
        let _id2 = manager.subscribe(move |_: &i32| *c2.borrow_mut() += 10);
        manager.notify(id1, &0);
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn test_manager_clear() {
        let mut manager: SubscriptionManager<i32> = SubscriptionManager::new();
        manager.subscribe(|_| {});
        manager.subscribe(|_| {});
        assert_eq!(manager.subscription_ids().len(), 2);
        manager.clear();
        assert!(manager.is_empty());
    }
}
