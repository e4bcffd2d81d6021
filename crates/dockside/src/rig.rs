//! Shared reference to the vehicle body.
//!
//! The camera and the light follow the car without being its children, so the
//! chassis is published through a single-slot register instead of the scene
//! hierarchy. Only the vehicle lifecycle writes it; everything else reads.

use bevy::{ecs::system::SystemParam, prelude::*};

use crate::vehicle::Chassis;

/// Single-slot register holding the current chassis, if one is mounted.
#[derive(Resource, Default, Debug)]
pub struct CarRig {
    body: Option<Entity>,
}

impl CarRig {
    /// Register `body` as the current chassis.
    pub fn set(&mut self, body: Entity) {
        if let Some(previous) = self.body.replace(body)
            && previous != body
        {
            tracing::warn!("Chassis {previous} replaced by {body} without unmounting");
        }
    }

    pub fn clear(&mut self) {
        self.body = None;
    }

    /// Clear the register if it still holds `body`. Returns whether it did.
    pub fn clear_if(&mut self, body: Entity) -> bool {
        if self.body == Some(body) {
            self.body = None;
            true
        } else {
            false
        }
    }

    pub fn body(&self) -> Option<Entity> {
        self.body
    }
}

/// Read access to the registered chassis pose.
#[derive(SystemParam)]
pub struct VehiclePose<'w, 's> {
    rig: Res<'w, CarRig>,
    bodies: Query<'w, 's, &'static Transform, With<Chassis>>,
}

impl VehiclePose<'_, '_> {
    pub fn body(&self) -> Option<Entity> {
        self.rig.body()
    }

    /// World position of the registered chassis, if it exists.
    pub fn position(&self) -> Option<Vec3> {
        let body = self.rig.body()?;
        self.bodies
            .get(body)
            .ok()
            .map(|transform| transform.translation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entities(count: usize) -> Vec<Entity> {
        let mut world = World::new();
        (0..count).map(|_| world.spawn_empty().id()).collect()
    }

    #[test]
    fn test_starts_empty() {
        assert_eq!(CarRig::default().body(), None);
    }

    #[test]
    fn test_set_and_clear() {
        let e = entities(1);
        let mut rig = CarRig::default();
        rig.set(e[0]);
        assert_eq!(rig.body(), Some(e[0]));
        rig.clear();
        assert_eq!(rig.body(), None);
    }

    #[test]
    fn test_clear_if_ignores_other_bodies() {
        let e = entities(2);
        let mut rig = CarRig::default();
        rig.set(e[1]);
        assert!(!rig.clear_if(e[0]));
        assert_eq!(rig.body(), Some(e[1]));
        assert!(rig.clear_if(e[1]));
        assert_eq!(rig.body(), None);
    }

    #[test]
    fn test_at_most_one_body() {
        let e = entities(2);
        let mut rig = CarRig::default();
        rig.set(e[0]);
        rig.set(e[1]);
        assert_eq!(rig.body(), Some(e[1]));
    }
}
