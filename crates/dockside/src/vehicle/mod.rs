//! Driveable car with raycast wheel suspension.
//!
//! The chassis is an avian rigid body. Each fixed step the controller adapter
//! turns the drive input into wheel commands before the physics step, and the
//! resulting wheel kinematics are copied onto the wheel meshes after it.

pub mod adapter;
pub mod components;
pub mod controller;
pub mod core;
mod physics;
pub mod telemetry;

use std::f32::consts::FRAC_PI_2;

use avian3d::prelude::*;
use bevy::prelude::*;

pub use components::{
    Chassis, DriveControls, LiveTuning, VehicleDriver, VehicleRespawnRequest, VehicleState,
    Wheel, WheelVisuals,
};

use self::core::{
    DEFAULT_WHEEL_SLOTS, VehicleTuning, WheelKinematics, WheelVisualConfig, wheel_local_pose,
};
use crate::{launch_params::LaunchParams, physics::GameLayer, rig::CarRig};

/// Where the car is placed when spawned.
const SPAWN_POSITION: Vec3 = Vec3::new(0.0, 1.5, 0.0);

/// Plugin for the driveable vehicle.
pub struct VehiclePlugin;

impl Plugin for VehiclePlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<Chassis>()
            .register_type::<Wheel>()
            .init_resource::<CarRig>()
            .init_resource::<LiveTuning>()
            .init_resource::<WheelVisuals>()
            .init_resource::<DriveControls>()
            .init_resource::<VehicleRespawnRequest>()
            .init_resource::<telemetry::TelemetrySink>()
            .add_systems(Startup, spawn_initial_vehicle)
            .add_systems(
                FixedPreUpdate,
                (
                    physics::attach_vehicle_controllers,
                    physics::vehicle_pre_step_system,
                )
                    .chain()
                    .before(PhysicsSystems::Prepare),
            )
            .add_systems(
                FixedPostUpdate,
                (
                    physics::vehicle_post_step_system,
                    telemetry::emit_telemetry_system,
                )
                    .chain()
                    .after(PhysicsSystems::Last),
            )
            .add_systems(Update, process_respawn_request)
            .add_observer(on_chassis_added)
            .add_observer(on_chassis_removed)
            .add_observer(release_controller_on_body_removed);
    }
}

// ============================================================================
// Spawning
// ============================================================================

/// Apply launch overrides to the tuning and spawn the first car.
fn spawn_initial_vehicle(
    mut commands: Commands,
    params: Res<LaunchParams>,
    mut tuning: ResMut<LiveTuning>,
    visuals: Res<WheelVisuals>,
    mut sink: ResMut<telemetry::TelemetrySink>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    if let Some(engine_force) = params.engine_force {
        tuning.engine_force = engine_force;
    }
    tuning.drive_direction = params.drive_direction;

    if let Some(path) = &params.telemetry {
        match telemetry::FileTelemetryOutput::create(path) {
            Ok(output) => {
                sink.0 = Some(Box::new(output));
                tracing::info!("Writing vehicle telemetry to {}", path.display());
            }
            Err(e) => tracing::warn!("Could not open telemetry file {}: {e}", path.display()),
        }
    }

    spawn_vehicle(
        &mut commands,
        &mut meshes,
        &mut materials,
        &tuning,
        &visuals,
        Transform::from_translation(SPAWN_POSITION),
    );
}

/// Spawn a chassis with its four wheel meshes.
pub fn spawn_vehicle(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    tuning: &VehicleTuning,
    visuals: &WheelVisualConfig,
    transform: Transform,
) -> Entity {
    let size = tuning.chassis_half_extents * 2.0;
    let volume = size.x * size.y * size.z;
    let density = tuning.chassis_mass / volume.max(0.001);

    let body_mesh = meshes.add(Cuboid::new(size.x, size.y, size.z));
    let cabin_mesh = meshes.add(Cuboid::new(size.x * 0.5, size.y * 0.8, size.z * 0.9));
    // Cylinder axis along local X so the fixed alignment puts it on the axle.
    let wheel_mesh = meshes.add(
        Mesh::from(Cylinder::new(tuning.wheel_radius, tuning.wheel_width))
            .rotated_by(Quat::from_rotation_z(FRAC_PI_2)),
    );
    let body_material = materials.add(StandardMaterial {
        base_color: Color::srgb(0.78, 0.16, 0.12),
        perceptual_roughness: 0.35,
        metallic: 0.4,
        ..default()
    });
    let cabin_material = materials.add(StandardMaterial {
        base_color: Color::srgb(0.12, 0.14, 0.18),
        perceptual_roughness: 0.1,
        metallic: 0.6,
        ..default()
    });
    let wheel_material = materials.add(StandardMaterial {
        base_color: Color::srgb(0.08, 0.08, 0.08),
        perceptual_roughness: 0.9,
        ..default()
    });

    commands
        .spawn((
            Name::new("Chassis"),
            Chassis {
                name: "Dockside runabout".to_string(),
            },
            RigidBody::Dynamic,
            Collider::cuboid(size.x, size.y, size.z),
            CollisionLayers::new(GameLayer::Vehicle, [GameLayer::Ground, GameLayer::Vehicle]),
            ColliderDensity(density),
            SleepingDisabled,
            Mesh3d(body_mesh),
            MeshMaterial3d(body_material),
            transform,
        ))
        .with_children(|parent| {
            parent.spawn((
                Name::new("Cabin"),
                Mesh3d(cabin_mesh),
                MeshMaterial3d(cabin_material),
                Transform::from_xyz(-size.x * 0.1, size.y * 0.9, 0.0),
            ));

            for (index, slot) in DEFAULT_WHEEL_SLOTS.iter().enumerate() {
                let rest = wheel_local_pose(
                    &WheelKinematics {
                        connection: slot.connection,
                        suspension_length: tuning.suspension_rest_length,
                        ..default()
                    },
                    visuals,
                );
                parent.spawn((
                    Name::new(format!("Wheel {}", slot.id.label())),
                    Wheel { index },
                    Mesh3d(wheel_mesh.clone()),
                    MeshMaterial3d(wheel_material.clone()),
                    Transform::from_translation(rest.translation).with_rotation(rest.rotation),
                ));
            }
        })
        .id()
}

/// Despawn the current car and spawn a fresh one at the start position.
fn process_respawn_request(
    mut commands: Commands,
    mut request: ResMut<VehicleRespawnRequest>,
    chassis_query: Query<Entity, With<Chassis>>,
    tuning: Res<LiveTuning>,
    visuals: Res<WheelVisuals>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    if !request.pending {
        return;
    }
    request.pending = false;

    for entity in &chassis_query {
        commands.entity(entity).despawn();
    }
    spawn_vehicle(
        &mut commands,
        &mut meshes,
        &mut materials,
        &tuning,
        &visuals,
        Transform::from_translation(SPAWN_POSITION),
    );
    tracing::info!("Vehicle respawned");
}

// ============================================================================
// Lifecycle
// ============================================================================

/// Register a newly mounted chassis as the shared vehicle body.
fn on_chassis_added(
    add: On<Add, Chassis>,
    mut rig: ResMut<CarRig>,
    sink: Option<ResMut<telemetry::TelemetrySink>>,
) {
    let entity = add.event_target();
    rig.set(entity);
    if let Some(mut sink) = sink
        && let Some(output) = sink.0.as_deref_mut()
    {
        telemetry::reset_telemetry_to(output);
    }
    tracing::info!("Vehicle mounted: {entity}");
}

/// Clear the shared vehicle body when its chassis unmounts.
fn on_chassis_removed(remove: On<Remove, Chassis>, mut rig: ResMut<CarRig>) {
    let entity = remove.event_target();
    if rig.clear_if(entity) {
        tracing::info!("Vehicle unmounted: {entity}");
    }
}

/// Release the controller when the chassis loses its rigid body.
fn release_controller_on_body_removed(
    remove: On<Remove, RigidBody>,
    mut drivers: Query<&mut VehicleDriver>,
) {
    let entity = remove.event_target();
    if let Ok(mut driver) = drivers.get_mut(entity)
        && driver.detach().is_some()
    {
        tracing::info!("Vehicle controller released from {entity}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vehicle::controller::RaycastVehicleController;

    fn test_app() -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .init_resource::<CarRig>()
            .add_observer(on_chassis_added)
            .add_observer(on_chassis_removed);
        app
    }

    #[test]
    fn test_mount_registers_and_unmount_clears() {
        let mut app = test_app();
        let entity = app.world_mut().spawn(Chassis::default()).id();
        assert_eq!(app.world().resource::<CarRig>().body(), Some(entity));

        app.world_mut().entity_mut(entity).despawn();
        assert_eq!(app.world().resource::<CarRig>().body(), None);
    }

    #[test]
    fn test_unmounting_stale_chassis_keeps_current() {
        let mut app = test_app();
        let first = app.world_mut().spawn(Chassis::default()).id();
        let second = app.world_mut().spawn(Chassis::default()).id();
        assert_eq!(app.world().resource::<CarRig>().body(), Some(second));

        app.world_mut().entity_mut(first).despawn();
        assert_eq!(app.world().resource::<CarRig>().body(), Some(second));
    }

    #[test]
    fn test_repeated_mount_unmount_releases_controllers() {
        let mut app = test_app();
        let tuning = VehicleTuning::default();

        for _ in 0..10 {
            let entity = app.world_mut().spawn(Chassis::default()).id();
            let mut driver = app
                .world_mut()
                .get_mut::<VehicleDriver>(entity)
                .unwrap_or_else(|| panic!("chassis requires a driver"));
            driver.attach(RaycastVehicleController::new(), &tuning);
            assert!(driver.is_attached());
            app.world_mut().entity_mut(entity).despawn();
        }

        let mut drivers = app.world_mut().query::<&VehicleDriver>();
        assert_eq!(drivers.iter(app.world()).count(), 0);
        assert_eq!(app.world().resource::<CarRig>().body(), None);
    }
}
