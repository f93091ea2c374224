//! Physics callbacks registered with the world
//!
//! Everything here runs while a step is in flight, possibly on a worker
//! thread. Listeners only log and record: they never touch the scene or the
//! body set. Gameplay reacts to the recorded contacts after the step.

use rapier3d::prelude::*;
use std::sync::Mutex;

/// Phase of a contact between two bodies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactPhase {
    /// Contact started this step
    Added,
    /// Contact still active this step
    Persisted,
    /// Contact ended this step
    Removed,
}

/// Contact captured during a step for post-step dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContactRecord {
    /// Contact phase
    pub phase: ContactPhase,
    /// First body, if its collider still has a parent
    pub body1: Option<RigidBodyHandle>,
    /// Second body, if its collider still has a parent
    pub body2: Option<RigidBodyHandle>,
}

/// Contact add/persist/remove listener
///
/// Records every notification into an internal buffer drained once per step.
#[derive(Debug, Default)]
pub struct ContactListener {
    records: Mutex<Vec<ContactRecord>>,
}

impl ContactListener {
    /// Create an empty listener
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every contact recorded since the last drain
    pub fn drain(&self) -> Vec<ContactRecord> {
        let mut records = self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::take(&mut *records)
    }

    /// Number of contacts waiting to be drained
    pub fn pending(&self) -> usize {
        self.records
            .lock()
            .map_or_else(|poisoned| poisoned.into_inner().len(), |records| records.len())
    }

    fn record(&self, record: ContactRecord) {
        log::trace!("Contact {:?}: {:?} <-> {:?}", record.phase, record.body1, record.body2);
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(record);
    }
}

fn parent_of(colliders: &ColliderSet, handle: ColliderHandle) -> Option<RigidBodyHandle> {
    colliders.get(handle).and_then(Collider::parent)
}

impl EventHandler for ContactListener {
    fn handle_collision_event(
        &self,
        _bodies: &RigidBodySet,
        colliders: &ColliderSet,
        event: CollisionEvent,
        _contact_pair: Option<&ContactPair>,
    ) {
        let phase = if event.started() {
            ContactPhase::Added
        } else {
            ContactPhase::Removed
        };

        self.record(ContactRecord {
            phase,
            body1: parent_of(colliders, event.collider1()),
            body2: parent_of(colliders, event.collider2()),
        });
    }

    fn handle_contact_force_event(
        &self,
        _dt: Real,
        _bodies: &RigidBodySet,
        colliders: &ColliderSet,
        contact_pair: &ContactPair,
        _total_force_magnitude: Real,
    ) {
        self.record(ContactRecord {
            phase: ContactPhase::Persisted,
            body1: parent_of(colliders, contact_pair.collider1),
            body2: parent_of(colliders, contact_pair.collider2),
        });
    }
}

/// Default contact validation hook: accepts every pair
///
/// Only consulted for colliders created with contact validation enabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptAllContacts;

impl PhysicsHooks for AcceptAllContacts {
    fn filter_contact_pair(&self, context: &PairFilterContext) -> Option<SolverFlags> {
        log::trace!(
            "Validating contact {:?} <-> {:?}",
            context.rigid_body1,
            context.rigid_body2
        );
        Some(SolverFlags::COMPUTE_IMPULSES)
    }
}

/// Body activation / deactivation notifications
///
/// Delivered after the step from the island manager's active set.
pub trait ActivationListener: Send {
    /// A body woke up
    fn on_body_activated(&mut self, body: RigidBodyHandle);

    /// A body fell asleep
    fn on_body_deactivated(&mut self, body: RigidBodyHandle);
}

/// Activation listener that only logs
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingActivationListener;

impl ActivationListener for LoggingActivationListener {
    fn on_body_activated(&mut self, body: RigidBodyHandle) {
        log::trace!("Body {:?} activated", body);
    }

    fn on_body_deactivated(&mut self, body: RigidBodyHandle) {
        log::trace!("Body {:?} went to sleep", body);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_empties_buffer() {
        let listener = ContactListener::new();
        listener.record(ContactRecord {
            phase: ContactPhase::Added,
            body1: None,
            body2: None,
        });
        assert_eq!(listener.pending(), 1);

        let drained = listener.drain();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].phase, ContactPhase::Added);
        assert_eq!(listener.pending(), 0);
        assert!(listener.drain().is_empty());
    }
}
