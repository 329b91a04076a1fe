//! The action registry: insertion-ordered storage, dedup index, and the
//! combined select-and-purge scan.
//!
//! The registry itself is not synchronized. The scheduler owns it behind its
//! single mutex, so every method here runs with that lock held.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{ActionId, ActionSnapshot, ActionState, MaintenanceAction, MaintenanceError};

/// Outcome of one selection scan.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    /// Action claimed by this scan, already moved to `Executing`.
    pub claimed: Option<Arc<MaintenanceAction>>,
    /// Actions removed because they outlived the linger window.
    pub purged: Vec<Arc<MaintenanceAction>>,
}

/// All live actions: pending, executing, and recently finished.
#[derive(Debug, Default)]
pub struct ActionRegistry {
    /// Insertion order, used for both selection and purge.
    actions: Vec<Arc<MaintenanceAction>>,
    /// Hash to the most recently registered action with that hash.
    by_hash: HashMap<u64, Arc<MaintenanceAction>>,
    by_id: HashMap<ActionId, Arc<MaintenanceAction>>,
}

impl ActionRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered actions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// True if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Most recent action registered for `hash`.
    #[must_use]
    pub fn find_by_hash(&self, hash: u64) -> Option<Arc<MaintenanceAction>> {
        self.by_hash.get(&hash).cloned()
    }

    /// Action with `id`, if not yet purged.
    #[must_use]
    pub fn find_by_id(&self, id: ActionId) -> Option<Arc<MaintenanceAction>> {
        self.by_id.get(&id).cloned()
    }

    /// Reject `hash` if an equivalent action is still in flight, or finished
    /// less than `block` before `now`.
    ///
    /// # Errors
    ///
    /// Returns `MaintenanceError::DuplicateAction` naming the blocking action.
    pub fn check_duplicate(
        &self,
        hash: u64,
        now: Instant,
        block: Duration,
    ) -> Result<(), MaintenanceError> {
        let Some(existing) = self.by_hash.get(&hash) else {
            return Ok(());
        };
        if !existing.done() {
            return Err(MaintenanceError::DuplicateAction(format!(
                "action {} with hash {hash:#018x} is still {}",
                existing.id(),
                existing.state()
            )));
        }
        if !existing.finished_before(now, block) {
            return Err(MaintenanceError::DuplicateAction(format!(
                "action {} with hash {hash:#018x} finished inside the block window",
                existing.id()
            )));
        }
        Ok(())
    }

    /// Register `action`. It must already be `Waiting` or `Executing`.
    ///
    /// # Errors
    ///
    /// `MaintenanceError::Internal` on a reused id or a state that would let
    /// the action bypass the state machine.
    pub fn insert(&mut self, action: Arc<MaintenanceAction>) -> Result<(), MaintenanceError> {
        let state = action.state();
        if !matches!(state, ActionState::Waiting | ActionState::Executing) {
            return Err(MaintenanceError::Internal(format!(
                "refusing to register action {} in state {state}",
                action.id()
            )));
        }
        if self.by_id.contains_key(&action.id()) {
            return Err(MaintenanceError::Internal(format!(
                "action id {} already registered",
                action.id()
            )));
        }
        self.by_hash.insert(action.hash(), Arc::clone(&action));
        self.by_id.insert(action.id(), Arc::clone(&action));
        self.actions.push(action);
        Ok(())
    }

    /// One pass in insertion order: claim the first runnable action and purge
    /// every terminal action older than `linger` seen before it.
    pub fn scan(&mut self, now: Instant, linger: Duration) -> ScanOutcome {
        let mut outcome = ScanOutcome::default();
        let mut idx = 0;
        while idx < self.actions.len() {
            let action = &self.actions[idx];
            if action.runnable() {
                action.set_state(ActionState::Executing);
                outcome.claimed = Some(Arc::clone(action));
                break;
            }
            if action.finished_before(now, linger) {
                let removed = self.actions.remove(idx);
                self.unindex(&removed);
                outcome.purged.push(removed);
                continue;
            }
            idx += 1;
        }
        outcome
    }

    fn unindex(&mut self, action: &Arc<MaintenanceAction>) {
        self.by_id.remove(&action.id());
        // A newer action may own the hash slot by now.
        if self
            .by_hash
            .get(&action.hash())
            .is_some_and(|current| current.id() == action.id())
        {
            self.by_hash.remove(&action.hash());
        }
    }

    /// Snapshot of every registered action in insertion order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ActionSnapshot> {
        self.actions.iter().map(|a| a.snapshot()).collect()
    }

    /// Count of registered actions in `state`.
    #[must_use]
    pub fn count_in(&self, state: ActionState) -> usize {
        self.actions.iter().filter(|a| a.state() == state).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ActionDescription, NoopAction};

    fn make_action(id: ActionId, target: &str, state: ActionState) -> Arc<MaintenanceAction> {
        let desc = ActionDescription::from_pairs([("name", "noop"), ("target", target)]).unwrap();
        let action = MaintenanceAction::new(id, desc, Box::new(NoopAction::default()));
        action.set_state(state);
        Arc::new(action)
    }

    fn finish(action: &MaintenanceAction) {
        if action.state() == ActionState::Waiting {
            action.set_state(ActionState::Executing);
        }
        action.set_state(ActionState::Complete);
    }

    #[test]
    fn test_claims_in_insertion_order() {
        let mut registry = ActionRegistry::new();
        registry.insert(make_action(1, "a", ActionState::Waiting)).unwrap();
        registry.insert(make_action(2, "b", ActionState::Waiting)).unwrap();

        let first = registry.scan(Instant::now(), Duration::from_secs(60));
        assert_eq!(first.claimed.unwrap().id(), 1);
        let second = registry.scan(Instant::now(), Duration::from_secs(60));
        assert_eq!(second.claimed.unwrap().id(), 2);
        assert!(registry.scan(Instant::now(), Duration::from_secs(60)).claimed.is_none());
        assert_eq!(registry.count_in(ActionState::Executing), 2);
    }

    #[test]
    fn test_executing_insert_is_never_claimed() {
        let mut registry = ActionRegistry::new();
        registry.insert(make_action(1, "a", ActionState::Executing)).unwrap();
        assert!(registry.scan(Instant::now(), Duration::ZERO).claimed.is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_detection() {
        let mut registry = ActionRegistry::new();
        let action = make_action(1, "a", ActionState::Waiting);
        let hash = action.hash();
        registry.insert(Arc::clone(&action)).unwrap();

        let err = registry.check_duplicate(hash, Instant::now(), Duration::ZERO);
        assert!(matches!(err, Err(MaintenanceError::DuplicateAction(_))));

        finish(&action);
        assert!(registry.check_duplicate(hash, Instant::now(), Duration::ZERO).is_ok());
        let blocked = registry.check_duplicate(hash, Instant::now(), Duration::from_secs(60));
        assert!(matches!(blocked, Err(MaintenanceError::DuplicateAction(_))));
    }

    #[test]
    fn test_purge_respects_linger() {
        let mut registry = ActionRegistry::new();
        let action = make_action(1, "a", ActionState::Executing);
        registry.insert(Arc::clone(&action)).unwrap();
        finish(&action);

        let outcome = registry.scan(Instant::now(), Duration::from_secs(60));
        assert!(outcome.purged.is_empty());
        assert_eq!(registry.len(), 1);

        let later = Instant::now() + Duration::from_secs(61);
        let outcome = registry.scan(later, Duration::from_secs(60));
        assert_eq!(outcome.purged.len(), 1);
        assert!(registry.is_empty());
        assert!(registry.find_by_id(1).is_none());
        assert!(registry.find_by_hash(action.hash()).is_none());
    }

    #[test]
    fn test_purge_keeps_newer_hash_owner() {
        let mut registry = ActionRegistry::new();
        let old = make_action(1, "a", ActionState::Executing);
        registry.insert(Arc::clone(&old)).unwrap();
        finish(&old);
        let newer = make_action(2, "a", ActionState::Executing);
        registry.insert(Arc::clone(&newer)).unwrap();

        let later = Instant::now() + Duration::from_secs(5);
        let outcome = registry.scan(later, Duration::from_secs(1));
        assert_eq!(outcome.purged.len(), 1);
        assert_eq!(registry.find_by_hash(newer.hash()).unwrap().id(), 2);
    }

    #[test]
    fn test_rejects_reused_id_and_created_state() {
        let mut registry = ActionRegistry::new();
        registry.insert(make_action(7, "a", ActionState::Waiting)).unwrap();
        let dup = registry.insert(make_action(7, "b", ActionState::Waiting));
        assert!(matches!(dup, Err(MaintenanceError::Internal(_))));

        let desc = ActionDescription::from_pairs([("name", "noop")]).unwrap();
        let created = Arc::new(MaintenanceAction::new(8, desc, Box::new(NoopAction::default())));
        assert!(registry.insert(created).is_err());
        assert_eq!(registry.len(), 1);
    }
}
