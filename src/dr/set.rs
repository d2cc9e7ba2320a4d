use serde::{Deserialize, Serialize};

use super::*;

/// How a physical port is reached by directed routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Reachability {
    /// No path has been installed yet.
    Undiscovered,

    /// The path in the given slot is in use.
    Reachable(usize),

    /// Every bound path failed. Only [`DrPathSet::reset`] (re-discovery)
    /// leaves this state.
    Isolated,
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    path: DrPath,
    tries: u32,
}

/// The alternate directed-route paths of one physical port, with retry
/// bookkeeping.
#[derive(Debug, Clone)]
pub struct DrPathSet {
    slots: [Option<Slot>; MAX_BINDING_PORTS],
    active: usize,

    /// Total timeouts recorded over all slots since the last reset.
    num_tried: u32,
    state: Reachability,
}

impl Default for DrPathSet {
    fn default() -> Self {
        Self::new()
    }
}

impl DrPathSet {
    /// Create an empty, undiscovered path set.
    pub fn new() -> Self {
        Self {
            slots: [None; MAX_BINDING_PORTS],
            active: 0,
            num_tried: 0,
            state: Reachability::Undiscovered,
        }
    }

    /// Create a path set reached through `path` in slot 0.
    pub fn with_path(path: DrPath) -> Self {
        let mut set = Self::new();
        set.slots[0] = Some(Slot { path, tries: 0 });
        set.state = Reachability::Reachable(0);
        set
    }

    fn slot(&self, index: usize) -> Result<&Slot, DrPathError> {
        self.slots
            .get(index)
            .ok_or(DrPathError::IndexOutOfRange(index))?
            .as_ref()
            .ok_or(DrPathError::Unset(index))
    }

    /// Get the path in slot `index`.
    pub fn get_path(&self, index: usize) -> Result<&DrPath, DrPathError> {
        self.slot(index).map(|s| &s.path)
    }

    /// Get the number of timeouts recorded on slot `index`.
    pub fn tries(&self, index: usize) -> Result<u32, DrPathError> {
        self.slot(index).map(|s| s.tries)
    }

    /// Install `path` in slot `index`, as found by discovery.
    /// An undiscovered set becomes reachable through it.
    pub fn set_path(&mut self, index: usize, path: DrPath) -> Result<(), DrPathError> {
        let slot = self
            .slots
            .get_mut(index)
            .ok_or(DrPathError::IndexOutOfRange(index))?;
        *slot = Some(Slot { path, tries: 0 });

        if self.state == Reachability::Undiscovered {
            self.active = index;
            self.state = Reachability::Reachable(index);
        }
        Ok(())
    }

    /// Overwrite the path that the next send will use with `hops`, keeping
    /// its binding. Its retry count starts over and the port is reachable
    /// through it. Other slots are left alone.
    pub fn replace_path(&mut self, hops: &[PortNum]) -> Result<(), DrPathError> {
        let bind = self.slots[self.active].map_or(0, |s| s.path.bind());
        let path = DrPath::new(bind, hops)?;
        self.slots[self.active] = Some(Slot { path, tries: 0 });
        self.state = Reachability::Reachable(self.active);
        log::debug!("ibfabric: replaced DR path slot {} with {}", self.active, path);
        Ok(())
    }

    /// Get the slot index of the path in use, if any.
    #[inline]
    pub fn active_index(&self) -> Option<usize> {
        match self.state {
            Reachability::Reachable(i) => Some(i),
            _ => None,
        }
    }

    /// Get the path the next send should use.
    pub fn active_path(&self) -> Result<&DrPath, DrPathError> {
        match self.state {
            Reachability::Isolated => Err(DrPathError::PathExhausted),
            _ => self.get_path(self.active),
        }
    }

    /// Get the reachability state.
    #[inline]
    pub fn state(&self) -> Reachability {
        self.state
    }

    /// Get the total number of timeouts recorded since the last reset.
    #[inline]
    pub fn num_paths_tried(&self) -> u32 {
        self.num_tried
    }

    /// Iterate over the populated slots.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &DrPath)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|s| (i, &s.path)))
    }

    /// Record a timeout on the active path.
    ///
    /// Once the active path has timed out `max_tries` times, move on to the
    /// next populated slot. Returns the slot to use next, or
    /// [`DrPathError::PathExhausted`] when no slot is left, in which case
    /// the port is isolated.
    pub fn record_timeout(&mut self, max_tries: u32) -> Result<usize, DrPathError> {
        if self.state == Reachability::Isolated {
            return Err(DrPathError::PathExhausted);
        }
        self.num_tried += 1;

        if let Some(slot) = self.slots[self.active].as_mut() {
            slot.tries += 1;
            if slot.tries < max_tries {
                return Ok(self.active);
            }
        }

        let next = (self.active + 1..MAX_BINDING_PORTS).find(|&i| self.slots[i].is_some());
        match next {
            Some(i) => {
                log::debug!(
                    "ibfabric: DR path slot {} exceeded {} tries, rotating to slot {}",
                    self.active,
                    max_tries,
                    i
                );
                self.active = i;
                self.state = Reachability::Reachable(i);
                Ok(i)
            }
            None => {
                log::warn!(
                    "ibfabric: all DR paths exhausted after {} tries",
                    self.num_tried
                );
                self.state = Reachability::Isolated;
                Err(DrPathError::PathExhausted)
            }
        }
    }

    /// Record a response received over the active path.
    pub fn record_success(&mut self) {
        if let Some(slot) = self.slots[self.active].as_mut() {
            slot.tries = 0;
            if self.state == Reachability::Undiscovered {
                self.state = Reachability::Reachable(self.active);
            }
        }
    }

    /// Make the first path that passes `is_valid` active, trying the active
    /// slot first and then the following ones in order. Slots before the
    /// active one have already failed and are not revisited until
    /// [`reset`](Self::reset).
    ///
    /// Fails with [`DrPathError::PathExhausted`] and isolates the port when
    /// no populated slot passes.
    pub fn rotate_to_valid<F>(&mut self, mut is_valid: F) -> Result<usize, DrPathError>
    where
        F: FnMut(&DrPath) -> bool,
    {
        if self.state == Reachability::Isolated {
            return Err(DrPathError::PathExhausted);
        }

        for i in self.active..MAX_BINDING_PORTS {
            if let Some(slot) = &self.slots[i] {
                if is_valid(&slot.path) {
                    if i != self.active {
                        log::debug!(
                            "ibfabric: DR path slot {} invalid, rotating to slot {}",
                            self.active,
                            i
                        );
                    }
                    self.active = i;
                    self.state = Reachability::Reachable(i);
                    return Ok(i);
                }
            }
        }

        log::warn!("ibfabric: no DR path passes validation");
        self.state = Reachability::Isolated;
        Err(DrPathError::PathExhausted)
    }

    /// Forget all retry history after re-discovery. The first populated
    /// slot becomes active.
    pub fn reset(&mut self) {
        for slot in self.slots.iter_mut().flatten() {
            slot.tries = 0;
        }
        self.num_tried = 0;
        match self.slots.iter().position(Option::is_some) {
            Some(i) => {
                self.active = i;
                self.state = Reachability::Reachable(i);
            }
            None => {
                self.active = 0;
                self.state = Reachability::Undiscovered;
            }
        }
    }
}
