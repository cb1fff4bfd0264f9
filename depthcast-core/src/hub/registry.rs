//! The set of live consumers.
//!
//! Owned by the hub task; never shared across execution contexts.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::hub::consumer::{Consumer, ConsumerId};

/// Consumers keyed by identity, iterated in connection order.
#[derive(Default)]
pub struct ClientRegistry {
    clients: BTreeMap<ConsumerId, Arc<dyn Consumer>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `consumer`. Returns `false` if it was already present.
    pub fn register(&mut self, consumer: Arc<dyn Consumer>) -> bool {
        let id = consumer.id();
        if self.clients.contains_key(&id) {
            return false;
        }
        self.clients.insert(id, consumer);
        true
    }

    /// Remove the consumer with `id`, returning it if present.
    pub fn unregister(&mut self, id: ConsumerId) -> Option<Arc<dyn Consumer>> {
        self.clients.remove(&id)
    }

    pub fn contains(&self, id: ConsumerId) -> bool {
        self.clients.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Consumer>> {
        self.clients.values()
    }

    /// Drop every consumer (used at shutdown).
    pub fn clear(&mut self) {
        self.clients.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DepthcastError;
    use bytes::Bytes;

    struct Stub(ConsumerId);

    impl Consumer for Stub {
        fn id(&self) -> ConsumerId {
            self.0
        }
        fn peer(&self) -> &str {
            "stub"
        }
        fn send(&self, _: Bytes, _: bool) -> Result<(), DepthcastError> {
            Ok(())
        }
    }

    #[test]
    fn register_is_idempotent() {
        let mut reg = ClientRegistry::new();
        let c: Arc<dyn Consumer> = Arc::new(Stub(ConsumerId::from_raw(1)));
        assert!(reg.register(Arc::clone(&c)));
        assert!(!reg.register(c));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn unregister_absent_is_noop() {
        let mut reg = ClientRegistry::new();
        assert!(reg.unregister(ConsumerId::from_raw(42)).is_none());
        assert!(reg.is_empty());
    }

    #[test]
    fn iterates_in_id_order() {
        let mut reg = ClientRegistry::new();
        for raw in [3, 1, 2] {
            reg.register(Arc::new(Stub(ConsumerId::from_raw(raw))));
        }
        let ids: Vec<u64> = reg.iter().map(|c| c.id().get()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        reg.unregister(ConsumerId::from_raw(2));
        assert!(!reg.contains(ConsumerId::from_raw(2)));
        assert_eq!(reg.len(), 2);
    }
}
