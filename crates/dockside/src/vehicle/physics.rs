//! Vehicle physics integration.
//!
//! Runs the controller adapter against avian once per fixed step and copies
//! the resulting wheel kinematics onto the wheel meshes.

use avian3d::prelude::{forces::ForcesItem, *};
use bevy::prelude::*;

use crate::physics::GameLayer;

use super::{
    components::{
        Chassis, DriveControls, LiveTuning, VehicleDriver, VehicleState, Wheel, WheelVisuals,
    },
    controller::{ChassisState, ChassisWorld, RayContact, RaycastVehicleController},
};

/// Avian-backed view of one chassis for the duration of a step.
struct AvianChassis<'a, 'fw, 'fs, 'w, 's> {
    entity: Entity,
    state: ChassisState,
    forces: &'a mut ForcesItem<'fw, 'fs>,
    spatial_query: &'a SpatialQuery<'w, 's>,
}

impl ChassisWorld for AvianChassis<'_, '_, '_, '_, '_> {
    fn chassis(&self) -> ChassisState {
        self.state
    }

    fn cast_suspension_ray(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
    ) -> Option<RayContact> {
        let dir = Dir3::new(direction).ok()?;
        let filter = SpatialQueryFilter::from_mask(GameLayer::Ground)
            .with_excluded_entities([self.entity]);
        let hit = self
            .spatial_query
            .cast_ray(origin, dir, max_distance, true, &filter)?;
        Some(RayContact {
            distance: hit.distance,
            point: origin + direction * hit.distance,
            normal: hit.normal,
        })
    }

    fn apply_impulse_at_point(&mut self, impulse: Vec3, point: Vec3) {
        self.forces.apply_linear_impulse_at_point(impulse, point);
    }
}

/// Install a controller on every chassis whose rigid body exists but has none yet.
pub fn attach_vehicle_controllers(
    tuning: Res<LiveTuning>,
    mut query: Query<(Entity, &mut VehicleDriver), With<RigidBody>>,
) {
    for (entity, mut driver) in &mut query {
        if driver.is_attached() {
            continue;
        }
        driver.attach(RaycastVehicleController::new(), &tuning);
        tracing::info!("Vehicle controller attached to {entity}");
    }
}

/// Write input and tuning into each controller and apply its impulses.
#[allow(clippy::type_complexity)]
pub fn vehicle_pre_step_system(
    time: Res<Time>,
    controls: Res<DriveControls>,
    tuning: Res<LiveTuning>,
    spatial_query: SpatialQuery,
    mut query: Query<
        (
            Entity,
            &mut VehicleDriver,
            &Position,
            &Rotation,
            &ComputedMass,
            &ComputedCenterOfMass,
            Forces,
        ),
        With<Chassis>,
    >,
) {
    let dt = time.delta_secs();
    if dt <= 0.0 {
        return;
    }

    for (entity, mut driver, position, rotation, mass, center_of_mass, mut forces) in &mut query {
        let state = ChassisState {
            position: position.0,
            rotation: rotation.0,
            center_of_mass: position.0 + rotation.0 * center_of_mass.0,
            linear_velocity: forces.linear_velocity(),
            angular_velocity: forces.angular_velocity(),
            mass: mass.value(),
        };
        let mut world = AvianChassis {
            entity,
            state,
            forces: &mut forces,
            spatial_query: &spatial_query,
        };
        driver.pre_step(&controls, &tuning, dt, &mut world);
    }
}

/// Copy controller wheel kinematics onto wheel meshes and refresh vehicle state.
pub fn vehicle_post_step_system(
    tuning: Res<LiveTuning>,
    visuals: Res<WheelVisuals>,
    mut chassis_query: Query<
        (&VehicleDriver, &ComputedMass, &Children, &mut VehicleState),
        With<Chassis>,
    >,
    mut wheel_query: Query<(&Wheel, &mut Transform)>,
) {
    for (driver, mass, children, mut state) in &mut chassis_query {
        let Some(poses) = driver.post_step(&tuning, &visuals) else {
            continue;
        };

        for child in children.iter() {
            let Ok((wheel, mut transform)) = wheel_query.get_mut(child) else {
                continue;
            };
            let Some(pose) = poses.get(wheel.index) else {
                continue;
            };
            transform.translation = pose.translation;
            transform.rotation = pose.rotation;
        }

        if let Some(controller) = driver.controller() {
            let command = driver.last_command();
            state.forward_speed = controller.forward_speed();
            state.grounded_wheels = controller.grounded_wheels();
            state.steering = driver.steering_angle();
            state.engine_force = command.engine_force;
            state.brake = command.brake;
            state.mass = mass.value();
            for (index, wheel) in controller.wheels().iter().enumerate().take(4) {
                state.suspension_lengths[index] = wheel.suspension_length;
                state.suspension_forces[index] = wheel.suspension_force;
            }
        }
    }
}
