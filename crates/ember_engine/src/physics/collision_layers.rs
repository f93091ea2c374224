//! Collision layer system for filtering collision detection
//!
//! Based on Game Engine Architecture 3rd Edition, Section 13.3.8:
//! "Most games need to filter collisions... This is typically done via
//! collision layers or groups."
//!
//! The engine uses two object layers. Moving objects collide with everything;
//! non-moving objects (terrain, static props) only collide with moving ones,
//! so static geometry never generates pairs against itself.

use rapier3d::geometry::{Group, InteractionGroups};

/// Object layer assigned to every collider at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectLayer {
    /// Static geometry and fixed props
    NonMoving,
    /// Characters, enemies, projectiles
    Moving,
}

impl ObjectLayer {
    /// Every object layer, in bit order
    pub const ALL: [ObjectLayer; 2] = [ObjectLayer::NonMoving, ObjectLayer::Moving];

    /// Membership bit of this layer
    pub fn membership(self) -> Group {
        match self {
            Self::NonMoving => Group::GROUP_1,
            Self::Moving => Group::GROUP_2,
        }
    }

    /// Layers this layer is allowed to collide with
    pub fn filter(self) -> Group {
        match self {
            Self::NonMoving => Self::Moving.membership(),
            Self::Moving => Self::NonMoving.membership() | Self::Moving.membership(),
        }
    }

    /// Interaction groups handed to rapier when building a collider
    pub fn interaction_groups(self) -> InteractionGroups {
        InteractionGroups::new(self.membership(), self.filter())
    }

    /// Check if two layers should collide
    ///
    /// A's layer must be in B's filter AND B's layer must be in A's filter,
    /// which is the same test rapier applies to interaction groups.
    pub fn should_collide(self, other: ObjectLayer) -> bool {
        self.filter().contains(other.membership()) && other.filter().contains(self.membership())
    }
}
