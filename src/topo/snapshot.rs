use std::sync::{Arc, PoisonError, RwLock};

use super::Fabric;

/// The most recently published state of a [`Fabric`].
///
/// The sweep driver publishes a copy of its fabric when a sweep completes;
/// readers load an `Arc` to it and keep a consistent view for as long as
/// they hold it, unaffected by later sweeps.
#[derive(Debug)]
pub struct SnapshotCell {
    current: RwLock<Arc<Fabric>>,
}

impl SnapshotCell {
    pub fn new(fabric: Fabric) -> Self {
        Self {
            current: RwLock::new(Arc::new(fabric)),
        }
    }

    /// Replace the published state with a copy of `fabric`.
    pub fn publish(&self, fabric: &Fabric) {
        let next = Arc::new(fabric.clone());
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        log::debug!(
            "ibfabric: publishing snapshot of sweep {} (was {})",
            next.epoch(),
            current.epoch()
        );
        *current = next;
    }

    /// Get the published state.
    pub fn load(&self) -> Arc<Fabric> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::super::fabric::tests::sample;
    use super::*;
    use crate::types::Guid;

    #[test]
    fn readers_keep_their_view() {
        let mut s = sample();
        let cell = SnapshotCell::new(s.fabric.clone());
        let before = cell.load();

        s.fabric.begin_sweep();
        s.fabric.remove_node(Guid(0x30)).unwrap();
        s.fabric.end_sweep();
        cell.publish(&s.fabric);

        assert_eq!(before.epoch(), 0);
        assert!(before.node(Guid(0x30)).is_ok());
        let after = cell.load();
        assert_eq!(after.epoch(), 1);
        assert!(after.node(Guid(0x30)).is_err());
    }

    #[test]
    fn concurrent_readers() {
        let s = sample();
        let cell = Arc::new(SnapshotCell::new(s.fabric));
        let handles = (0..4)
            .map(|_| {
                let cell = cell.clone();
                thread::spawn(move || cell.load().nodes().count())
            })
            .collect::<Vec<_>>();
        for h in handles {
            assert_eq!(h.join().unwrap(), 3);
        }
    }
}
