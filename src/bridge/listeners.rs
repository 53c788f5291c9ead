use std::sync::Arc;

/// Shared callback taking a borrowed event value
pub type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Identifies one registration within a registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Ordered callbacks for a recurring event
pub struct ListenerRegistry<T: ?Sized> {
    next_id: u64,
    entries: Vec<(SubscriptionId, Listener<T>)>,
}

impl<T: ?Sized> Default for ListenerRegistry<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }
}

impl<T: ?Sized> ListenerRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, listener: Listener<T>) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.entries.push((id, listener));
        id
    }

    pub fn remove(&mut self, id: SubscriptionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }

    /// Listeners in registration order, detached from the registry so they
    /// can be invoked without holding whatever lock guards it
    pub fn snapshot(&self) -> Vec<Listener<T>> {
        self.entries
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn snapshot_preserves_registration_order() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut registry: ListenerRegistry<str> = ListenerRegistry::new();

        for name in ["first", "second", "third"] {
            let calls = calls.clone();
            registry.add(Arc::new(move |value: &str| {
                calls.lock().unwrap().push(format!("{name}:{value}"));
            }));
        }

        for listener in registry.snapshot() {
            listener("x");
        }

        assert_eq!(
            *calls.lock().unwrap(),
            vec!["first:x", "second:x", "third:x"]
        );
    }

    #[test]
    fn removed_listener_is_not_returned() {
        let mut registry: ListenerRegistry<[String]> = ListenerRegistry::new();
        let first = registry.add(Arc::new(|_: &[String]| {}));
        let second = registry.add(Arc::new(|_: &[String]| {}));

        assert!(registry.remove(first));
        assert!(!registry.remove(first));
        assert_eq!(registry.len(), 1);
        assert!(registry.remove(second));
        assert!(registry.is_empty());
    }
}
