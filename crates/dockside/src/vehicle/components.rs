//! Vehicle component and resource definitions.

use bevy::prelude::*;

use super::{
    adapter::VehicleControllerAdapter,
    core::{DriveInput, VehicleTuning, WheelVisualConfig},
};

/// Chassis marker. Mounting one registers it with [`crate::rig::CarRig`].
#[derive(Component, Reflect, Default, Clone)]
#[reflect(Component)]
#[require(VehicleDriver, VehicleState)]
pub struct Chassis {
    /// Display name for the vehicle.
    pub name: String,
}

/// Wheel mesh child of a chassis.
#[derive(Component, Reflect, Clone, Copy)]
#[reflect(Component)]
pub struct Wheel {
    /// Controller wheel index.
    pub index: usize,
}

/// Controller adapter owned by a chassis.
///
/// The controller is released when this component is dropped.
#[derive(Component, Debug, Default, Deref, DerefMut)]
pub struct VehicleDriver(pub VehicleControllerAdapter);

/// Runtime state for display and telemetry.
#[derive(Component, Default, Clone, Debug)]
pub struct VehicleState {
    /// Speed along the chassis forward axis (m/s).
    pub forward_speed: f32,
    /// Wheels touching the ground.
    pub grounded_wheels: usize,
    pub steering: f32,
    pub engine_force: f32,
    pub brake: f32,
    /// Suspension length per wheel (m).
    pub suspension_lengths: [f32; 4],
    /// Suspension force per wheel (N).
    pub suspension_forces: [f32; 4],
    pub mass: f32,
}

/// Live-editable tuning, read every physics step.
#[derive(Resource, Default, Clone, Debug, Deref, DerefMut)]
pub struct LiveTuning(pub VehicleTuning);

/// Wheel mesh orientation settings.
#[derive(Resource, Default, Clone, Copy, Debug, Deref, DerefMut)]
pub struct WheelVisuals(pub WheelVisualConfig);

/// Drive input snapshot for the current frame.
#[derive(Resource, Default, Clone, Copy, Debug, Deref, DerefMut)]
pub struct DriveControls(pub DriveInput);

/// Request to despawn the current vehicle and spawn a fresh one.
#[derive(Resource, Default)]
pub struct VehicleRespawnRequest {
    /// Whether a respawn is pending.
    pub pending: bool,
}
