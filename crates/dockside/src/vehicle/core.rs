//! Core vehicle control calculations.
//!
//! Pure functions that can be tested in isolation without Bevy dependencies.
//! Used by both the Bevy physics systems and the drive bench.
//!
//! Chassis-local axes: forward is +X, up is +Y and the wheel axle runs along
//! +Z. Positive steering turns the front wheels towards -Z (to the left).

use std::f32::consts::FRAC_PI_2;

use glam::{Quat, Vec3};

/// Number of wheels on every vehicle.
pub const WHEEL_COUNT: usize = 4;

/// Ratio of engine force used when reversing.
pub const REVERSE_FORCE_RATIO: f32 = 0.5;

/// Chassis-local forward direction.
pub const CHASSIS_FORWARD: Vec3 = Vec3::X;

/// Chassis-local suspension direction (towards the ground).
pub const SUSPENSION_DIRECTION: Vec3 = Vec3::NEG_Y;

/// Chassis-local wheel axle.
pub const WHEEL_AXLE: Vec3 = Vec3::Z;

// ============================================================================
// Wheel rig
// ============================================================================

/// Position of a wheel on the chassis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WheelId {
    FrontLeft,
    FrontRight,
    RearLeft,
    RearRight,
}

impl WheelId {
    /// All wheels, in controller index order.
    pub const ALL: [WheelId; WHEEL_COUNT] = [
        WheelId::FrontLeft,
        WheelId::FrontRight,
        WheelId::RearLeft,
        WheelId::RearRight,
    ];

    /// Short label for tables and telemetry.
    pub fn label(self) -> &'static str {
        match self {
            WheelId::FrontLeft => "FL",
            WheelId::FrontRight => "FR",
            WheelId::RearLeft => "RL",
            WheelId::RearRight => "RR",
        }
    }
}

/// Static per-wheel rig geometry. Immutable for the vehicle's lifetime.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WheelSlot {
    pub id: WheelId,
    /// Suspension hard point relative to the chassis origin.
    pub connection: Vec3,
    /// Whether this wheel receives the steering angle.
    pub steered: bool,
}

/// Default wheel layout for the dockside car.
pub const DEFAULT_WHEEL_SLOTS: [WheelSlot; WHEEL_COUNT] = [
    WheelSlot {
        id: WheelId::FrontLeft,
        connection: Vec3::new(1.25, -0.15, -0.8),
        steered: true,
    },
    WheelSlot {
        id: WheelId::FrontRight,
        connection: Vec3::new(1.25, -0.15, 0.8),
        steered: true,
    },
    WheelSlot {
        id: WheelId::RearLeft,
        connection: Vec3::new(-1.25, -0.15, -0.8),
        steered: false,
    },
    WheelSlot {
        id: WheelId::RearRight,
        connection: Vec3::new(-1.25, -0.15, 0.8),
        steered: false,
    },
];

// ============================================================================
// Tuning
// ============================================================================

/// Sign applied to the engine force, for wheel rigs mounted backwards.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DriveDirection {
    #[default]
    Forward,
    Reverse,
}

impl DriveDirection {
    pub fn sign(self) -> f32 {
        match self {
            DriveDirection::Forward => 1.0,
            DriveDirection::Reverse => -1.0,
        }
    }
}

/// Live-editable vehicle parameters. Every field is read fresh each physics step.
#[derive(Clone, Debug, PartialEq)]
pub struct VehicleTuning {
    /// Engine force per wheel at full throttle (N).
    pub engine_force: f32,
    /// Brake force per wheel (N).
    pub brake_force: f32,
    /// Maximum steering angle (radians).
    pub max_steer: f32,
    /// Steering approach rate (1/s).
    pub steer_speed: f32,
    /// Suspension spring stiffness, per unit of chassis mass.
    pub suspension_stiffness: f32,
    /// Damping while the suspension compresses.
    pub suspension_compression: f32,
    /// Damping while the suspension extends.
    pub suspension_relaxation: f32,
    /// Suspension rest length (m).
    pub suspension_rest_length: f32,
    /// Maximum travel either side of the rest length (m).
    pub max_suspension_travel: f32,
    /// Maximum force one suspension can exert (N).
    pub max_suspension_force: f32,
    /// Wheel radius (m).
    pub wheel_radius: f32,
    /// Wheel width (m). Visual only.
    pub wheel_width: f32,
    /// Longitudinal friction budget, as a multiple of the suspension impulse.
    pub friction_slip: f32,
    /// How much lateral contact velocity is cancelled per step (0-1).
    pub side_friction_stiffness: f32,
    pub drive_direction: DriveDirection,
    /// Chassis mass (kg). Used at spawn.
    pub chassis_mass: f32,
    /// Chassis collider half extents (m). Used at spawn.
    pub chassis_half_extents: Vec3,
}

impl Default for VehicleTuning {
    fn default() -> Self {
        Self {
            engine_force: 1500.0,
            brake_force: 2500.0,
            max_steer: 0.5,
            steer_speed: 6.0,
            suspension_stiffness: 30.0,
            suspension_compression: 2.5,
            suspension_relaxation: 3.5,
            suspension_rest_length: 0.35,
            max_suspension_travel: 0.2,
            max_suspension_force: 6000.0,
            wheel_radius: 0.35,
            wheel_width: 0.25,
            friction_slip: 10.5,
            side_friction_stiffness: 1.0,
            drive_direction: DriveDirection::Forward,
            chassis_mass: 1000.0,
            chassis_half_extents: Vec3::new(1.8, 0.35, 0.85),
        }
    }
}

// ============================================================================
// Drive command
// ============================================================================

/// Directional input snapshot for one physics step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DriveInput {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    pub brake: bool,
}

impl DriveInput {
    /// Whether the driver is asking the vehicle to move.
    pub fn is_driving(&self) -> bool {
        self.forward || self.backward
    }
}

/// Per-wheel commands derived from a [`DriveInput`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DriveCommand {
    /// Signed engine force applied to every wheel.
    pub engine_force: f32,
    /// Steering angle the steered wheels should approach.
    pub target_steer: f32,
    /// Brake applied to every wheel.
    pub brake: f32,
}

/// Translate directional input into wheel commands.
///
/// Forward wins over backward and left wins over right when both are held.
pub fn compute_drive_command(input: &DriveInput, tuning: &VehicleTuning) -> DriveCommand {
    let (throttle, direction) = if input.brake {
        (0.0, 0.0)
    } else if input.forward {
        (tuning.engine_force, 1.0)
    } else if input.backward {
        (tuning.engine_force * REVERSE_FORCE_RATIO, -1.0)
    } else {
        (0.0, 0.0)
    };

    let target_steer = if input.left {
        tuning.max_steer
    } else if input.right {
        -tuning.max_steer
    } else {
        0.0
    };

    DriveCommand {
        engine_force: throttle * direction * tuning.drive_direction.sign(),
        target_steer,
        brake: if input.brake { tuning.brake_force } else { 0.0 },
    }
}

/// Exponential approach factor for a rate over a timestep, in [0, 1].
pub fn approach_factor(rate: f32, dt: f32) -> f32 {
    (1.0 - (-rate * dt).exp()).clamp(0.0, 1.0)
}

/// Smoothed steering angle.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SteeringState {
    pub angle: f32,
}

impl SteeringState {
    /// Move the angle towards `target` without overshooting.
    pub fn advance(&mut self, target: f32, steer_speed: f32, dt: f32) -> f32 {
        self.angle += (target - self.angle) * approach_factor(steer_speed, dt);
        self.angle
    }
}

// ============================================================================
// Wheel visuals
// ============================================================================

/// Local axis the wheel mesh rolls around.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SpinAxis {
    #[default]
    X,
    Y,
    Z,
}

impl SpinAxis {
    pub const ALL: [SpinAxis; 3] = [SpinAxis::X, SpinAxis::Y, SpinAxis::Z];

    pub fn unit(self) -> Vec3 {
        match self {
            SpinAxis::X => Vec3::X,
            SpinAxis::Y => Vec3::Y,
            SpinAxis::Z => Vec3::Z,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SpinAxis::X => "X",
            SpinAxis::Y => "Y",
            SpinAxis::Z => "Z",
        }
    }
}

/// How wheel meshes are oriented relative to the controller's wheel frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WheelVisualConfig {
    /// Fixed rotation from the wheel frame to the mesh frame.
    pub alignment: Quat,
    /// Extra correction for meshes authored in a different orientation.
    pub mesh_correction: Quat,
    pub spin_axis: SpinAxis,
}

impl Default for WheelVisualConfig {
    fn default() -> Self {
        Self {
            alignment: Quat::from_rotation_y(FRAC_PI_2),
            mesh_correction: Quat::IDENTITY,
            spin_axis: SpinAxis::X,
        }
    }
}

/// Wheel state read back from the controller after a physics step.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct WheelKinematics {
    pub connection: Vec3,
    pub suspension_length: f32,
    pub steering: f32,
    pub rotation: f32,
}

/// Chassis-local pose of a wheel mesh.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WheelPose {
    pub translation: Vec3,
    pub rotation: Quat,
}

/// Compute the chassis-local pose of a wheel mesh.
///
/// The rotation composes steering about Y, the fixed alignment, the mesh
/// correction and the spin about the rolling axis, in that order.
pub fn wheel_local_pose(kinematics: &WheelKinematics, visual: &WheelVisualConfig) -> WheelPose {
    let c = kinematics.connection;
    WheelPose {
        translation: Vec3::new(c.x, c.y - kinematics.suspension_length, c.z),
        rotation: Quat::from_rotation_y(kinematics.steering)
            * visual.alignment
            * visual.mesh_correction
            * Quat::from_axis_angle(visual.spin_axis.unit(), kinematics.rotation),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn test_forward_applies_full_engine_force() {
        let tuning = VehicleTuning::default();
        let input = DriveInput {
            forward: true,
            ..Default::default()
        };
        let command = compute_drive_command(&input, &tuning);
        assert_eq!(command.engine_force, tuning.engine_force);
        assert_eq!(command.brake, 0.0);
    }

    #[test]
    fn test_backward_applies_half_force_reversed() {
        let tuning = VehicleTuning::default();
        let input = DriveInput {
            backward: true,
            ..Default::default()
        };
        let command = compute_drive_command(&input, &tuning);
        assert_eq!(command.engine_force, -0.5 * tuning.engine_force);
    }

    #[test]
    fn test_brake_zeroes_throttle() {
        let tuning = VehicleTuning::default();
        for (forward, backward) in [(true, false), (false, true), (true, true)] {
            let input = DriveInput {
                forward,
                backward,
                brake: true,
                ..Default::default()
            };
            let command = compute_drive_command(&input, &tuning);
            assert_eq!(command.engine_force, 0.0);
            assert_eq!(command.brake, tuning.brake_force);
        }
    }

    #[test]
    fn test_reverse_drive_direction_flips_sign() {
        let tuning = VehicleTuning {
            drive_direction: DriveDirection::Reverse,
            ..Default::default()
        };
        let input = DriveInput {
            forward: true,
            ..Default::default()
        };
        assert_eq!(
            compute_drive_command(&input, &tuning).engine_force,
            -tuning.engine_force
        );
    }

    #[test]
    fn test_steer_targets() {
        let tuning = VehicleTuning::default();
        let left = DriveInput {
            left: true,
            ..Default::default()
        };
        let right = DriveInput {
            right: true,
            ..Default::default()
        };
        assert_eq!(
            compute_drive_command(&left, &tuning).target_steer,
            tuning.max_steer
        );
        assert_eq!(
            compute_drive_command(&right, &tuning).target_steer,
            -tuning.max_steer
        );
        assert_eq!(
            compute_drive_command(&DriveInput::default(), &tuning).target_steer,
            0.0
        );
    }

    #[test]
    fn test_steering_converges_without_overshoot() {
        let mut steering = SteeringState::default();
        let target = 0.5;
        let mut previous_distance = (target - steering.angle).abs();
        for _ in 0..60 {
            let angle = steering.advance(target, 6.0, DT);
            let distance = (target - angle).abs();
            assert!(distance < previous_distance);
            assert!(angle <= target);
            previous_distance = distance;
        }
    }

    #[test]
    fn test_steering_degenerate_rates() {
        let mut steering = SteeringState { angle: 0.2 };
        assert_eq!(steering.advance(0.5, 0.0, DT), 0.2);
        assert_eq!(steering.advance(0.5, -3.0, DT), 0.2);
        assert_eq!(steering.advance(0.5, 6.0, 0.0), 0.2);
    }

    #[test]
    fn test_wheel_pose_at_rest() {
        let visual = WheelVisualConfig::default();
        let kinematics = WheelKinematics {
            connection: Vec3::new(1.0, 0.2, -0.8),
            suspension_length: 0.35,
            steering: 0.0,
            rotation: 0.0,
        };
        let pose = wheel_local_pose(&kinematics, &visual);
        assert!(pose.translation.abs_diff_eq(Vec3::new(1.0, -0.15, -0.8), 1e-6));
        assert!(pose.rotation.abs_diff_eq(visual.alignment, 1e-6));
    }

    #[test]
    fn test_wheel_pose_composes_steer_before_spin() {
        let visual = WheelVisualConfig::default();
        let kinematics = WheelKinematics {
            connection: Vec3::ZERO,
            suspension_length: 0.3,
            steering: 0.3,
            rotation: 1.2,
        };
        let pose = wheel_local_pose(&kinematics, &visual);
        let expected = Quat::from_rotation_y(0.3)
            * Quat::from_rotation_y(FRAC_PI_2)
            * Quat::from_rotation_x(1.2);
        assert!(pose.rotation.abs_diff_eq(expected, 1e-6));
    }

    #[test]
    fn test_wheel_pose_honours_spin_axis() {
        let visual = WheelVisualConfig {
            spin_axis: SpinAxis::Z,
            ..Default::default()
        };
        let kinematics = WheelKinematics {
            rotation: 0.7,
            ..Default::default()
        };
        let pose = wheel_local_pose(&kinematics, &visual);
        let expected = visual.alignment * Quat::from_rotation_z(0.7);
        assert!(pose.rotation.abs_diff_eq(expected, 1e-6));
    }
}
