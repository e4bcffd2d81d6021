//! Orbit camera that follows the car.
//!
//! - `orbit` turns mouse input into damped rotate/pan/zoom around a target.
//! - `follow` keeps that target on the car until the user drags it away.
//! - `occlusion` fades containers that block the view of the car.

pub mod follow;
pub mod occlusion;
pub mod orbit;

use bevy::prelude::*;
use leafwing_input_manager::prelude::ActionState;

pub use follow::{FollowCamera, FollowCameraSettings, FollowMode};
pub use occlusion::{Occluder, OcclusionSettings};
pub use orbit::{OrbitControls, OrbitLimits};

use crate::input::{CameraAction, DriveAction, default_camera_input_map, default_drive_input_map};

/// Initial camera position.
const CAMERA_START: Vec3 = Vec3::new(2.0, 3.0, 5.0);
/// Initial orbit target.
const TARGET_START: Vec3 = Vec3::new(0.0, 0.5, 0.0);

/// Plugin for the orbit and follow camera.
pub struct CameraControllerPlugin;

impl Plugin for CameraControllerPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<FollowCameraSettings>()
            .init_resource::<OcclusionSettings>()
            .add_systems(Startup, spawn_camera)
            .add_systems(
                Update,
                (
                    orbit::orbit_input_system,
                    follow::follow_camera_system,
                    orbit::orbit_update_system,
                    occlusion::occlusion_fade_system,
                )
                    .chain(),
            );
    }
}

fn spawn_camera(mut commands: Commands) {
    commands.spawn((
        Name::new("Camera"),
        Camera3d::default(),
        Projection::Perspective(PerspectiveProjection {
            fov: std::f32::consts::FRAC_PI_4,
            near: 0.1,
            far: 500.0,
            ..default()
        }),
        Transform::from_translation(CAMERA_START).looking_at(TARGET_START, Vec3::Y),
        OrbitControls::new(TARGET_START),
        FollowCamera::new(TARGET_START),
        // Both maps live on the camera; driving has no entity of its own.
        default_camera_input_map(),
        ActionState::<CameraAction>::default(),
        default_drive_input_map(),
        ActionState::<DriveAction>::default(),
    ));

    tracing::info!("Camera ready - drag to orbit, right-drag to pan, WASD to drive");
}
