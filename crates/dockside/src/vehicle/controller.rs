//! Raycast wheeled vehicle controller.
//!
//! Avian has no vehicle controller of its own, so suspension and tyre forces
//! are computed here against a [`ChassisWorld`], which supplies the chassis
//! state, ground ray casts and impulse application. The Bevy side implements
//! it on top of avian; tests implement it on a flat plane.

use glam::{Quat, Vec3};

use super::core::{CHASSIS_FORWARD, SUSPENSION_DIRECTION, VehicleTuning};

/// How much of the tyre impulse's height above the centre of mass produces roll.
const ROLL_INFLUENCE: f32 = 0.1;

/// Spin decay per step while a wheel is in the air.
const AIRBORNE_SPIN_DECAY: f32 = 0.99;

/// Below this alignment between contact normal and suspension axis the
/// suspension velocity is ignored.
const MIN_CONTACT_ALIGNMENT: f32 = 0.1;

// ============================================================================
// Collaborator interfaces
// ============================================================================

/// Chassis rigid-body state for one step.
#[derive(Clone, Copy, Debug)]
pub struct ChassisState {
    pub position: Vec3,
    pub rotation: Quat,
    /// World-space centre of mass.
    pub center_of_mass: Vec3,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
    pub mass: f32,
}

impl ChassisState {
    /// Velocity of a world-space point rigidly attached to the chassis.
    pub fn velocity_at(&self, point: Vec3) -> Vec3 {
        self.linear_velocity + self.angular_velocity.cross(point - self.center_of_mass)
    }
}

/// Result of a suspension ray cast.
#[derive(Clone, Copy, Debug)]
pub struct RayContact {
    pub distance: f32,
    pub point: Vec3,
    pub normal: Vec3,
}

/// The physics world as seen by a vehicle controller.
pub trait ChassisWorld {
    fn chassis(&self) -> ChassisState;

    /// Cast a ray that ignores the chassis itself.
    fn cast_suspension_ray(&self, origin: Vec3, direction: Vec3, max_distance: f32)
    -> Option<RayContact>;

    fn apply_impulse_at_point(&mut self, impulse: Vec3, point: Vec3);
}

/// Suspension parameters for one wheel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SuspensionParams {
    pub stiffness: f32,
    pub compression: f32,
    pub relaxation: f32,
    pub rest_length: f32,
    pub max_travel: f32,
    pub max_force: f32,
}

impl SuspensionParams {
    pub fn from_tuning(tuning: &VehicleTuning) -> Self {
        Self {
            stiffness: tuning.suspension_stiffness,
            compression: tuning.suspension_compression,
            relaxation: tuning.suspension_relaxation,
            rest_length: tuning.suspension_rest_length,
            max_travel: tuning.max_suspension_travel,
            max_force: tuning.max_suspension_force,
        }
    }

    fn min_length(&self) -> f32 {
        (self.rest_length - self.max_travel).max(0.0)
    }

    fn max_length(&self) -> f32 {
        self.rest_length + self.max_travel.max(0.0)
    }
}

/// Tyre parameters for one wheel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TyreParams {
    pub radius: f32,
    pub friction_slip: f32,
    pub side_friction_stiffness: f32,
}

impl TyreParams {
    pub fn from_tuning(tuning: &VehicleTuning) -> Self {
        Self {
            radius: tuning.wheel_radius,
            friction_slip: tuning.friction_slip,
            side_friction_stiffness: tuning.side_friction_stiffness,
        }
    }
}

/// A controller that drives a chassis through individual wheels.
///
/// Wheel indices are assigned by [`add_wheel`](Self::add_wheel) in call order.
/// Setters ignore unknown indices; readbacks return `None` for them.
pub trait WheeledVehicleController {
    fn add_wheel(&mut self, connection: Vec3, suspension: SuspensionParams, tyre: TyreParams)
    -> usize;

    fn wheel_count(&self) -> usize;

    fn set_engine_force(&mut self, wheel: usize, force: f32);
    fn set_steering(&mut self, wheel: usize, angle: f32);
    fn set_brake(&mut self, wheel: usize, brake: f32);
    fn set_suspension(&mut self, wheel: usize, suspension: SuspensionParams);
    fn set_tyre(&mut self, wheel: usize, tyre: TyreParams);

    /// Advance the controller by `dt`, applying impulses to the chassis.
    fn update(&mut self, dt: f32, world: &mut dyn ChassisWorld);

    fn connection_point(&self, wheel: usize) -> Option<Vec3>;
    fn suspension_length(&self, wheel: usize) -> Option<f32>;
    fn steering(&self, wheel: usize) -> Option<f32>;
    fn rotation(&self, wheel: usize) -> Option<f32>;
}

// ============================================================================
// Raycast implementation
// ============================================================================

/// One wheel of a [`RaycastVehicleController`].
#[derive(Clone, Debug)]
pub struct RaycastWheel {
    pub connection: Vec3,
    pub suspension: SuspensionParams,
    pub tyre: TyreParams,
    pub engine_force: f32,
    pub brake: f32,
    pub steering: f32,
    /// Accumulated spin angle (radians).
    pub rotation: f32,
    /// Spin rate (rad/s).
    pub spin_velocity: f32,
    pub suspension_length: f32,
    pub suspension_force: f32,
    pub in_contact: bool,
    pub contact_point: Vec3,
}

impl RaycastWheel {
    fn new(connection: Vec3, suspension: SuspensionParams, tyre: TyreParams) -> Self {
        Self {
            connection,
            suspension,
            tyre,
            engine_force: 0.0,
            brake: 0.0,
            steering: 0.0,
            rotation: 0.0,
            spin_velocity: 0.0,
            suspension_length: suspension.rest_length,
            suspension_force: 0.0,
            in_contact: false,
            contact_point: Vec3::ZERO,
        }
    }

    fn lift_off(&mut self, dt: f32) {
        self.in_contact = false;
        self.suspension_length = self.suspension.max_length();
        self.suspension_force = 0.0;
        self.rotation += self.spin_velocity * dt;
        self.spin_velocity *= AIRBORNE_SPIN_DECAY;
    }
}

/// Raycast vehicle controller: each wheel is a spring-damper along a ground ray.
#[derive(Clone, Debug, Default)]
pub struct RaycastVehicleController {
    wheels: Vec<RaycastWheel>,
    /// Chassis speed along its forward axis after the last update (m/s).
    forward_speed: f32,
}

impl RaycastVehicleController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn wheel(&self, wheel: usize) -> Option<&RaycastWheel> {
        self.wheels.get(wheel)
    }

    pub fn wheels(&self) -> &[RaycastWheel] {
        &self.wheels
    }

    pub fn forward_speed(&self) -> f32 {
        self.forward_speed
    }

    /// Number of wheels touching the ground after the last update.
    pub fn grounded_wheels(&self) -> usize {
        self.wheels.iter().filter(|w| w.in_contact).count()
    }
}

impl WheeledVehicleController for RaycastVehicleController {
    fn add_wheel(
        &mut self,
        connection: Vec3,
        suspension: SuspensionParams,
        tyre: TyreParams,
    ) -> usize {
        self.wheels.push(RaycastWheel::new(connection, suspension, tyre));
        self.wheels.len() - 1
    }

    fn wheel_count(&self) -> usize {
        self.wheels.len()
    }

    fn set_engine_force(&mut self, wheel: usize, force: f32) {
        if let Some(w) = self.wheels.get_mut(wheel) {
            w.engine_force = force;
        }
    }

    fn set_steering(&mut self, wheel: usize, angle: f32) {
        if let Some(w) = self.wheels.get_mut(wheel) {
            w.steering = angle;
        }
    }

    fn set_brake(&mut self, wheel: usize, brake: f32) {
        if let Some(w) = self.wheels.get_mut(wheel) {
            w.brake = brake.max(0.0);
        }
    }

    fn set_suspension(&mut self, wheel: usize, suspension: SuspensionParams) {
        if let Some(w) = self.wheels.get_mut(wheel) {
            w.suspension = suspension;
        }
    }

    fn set_tyre(&mut self, wheel: usize, tyre: TyreParams) {
        if let Some(w) = self.wheels.get_mut(wheel) {
            w.tyre = tyre;
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn update(&mut self, dt: f32, world: &mut dyn ChassisWorld) {
        if dt <= 0.0 || self.wheels.is_empty() {
            return;
        }

        let chassis = world.chassis();
        let wheel_mass_share = chassis.mass / self.wheels.len() as f32;
        let up = chassis.rotation * -SUSPENSION_DIRECTION;
        let down = -up;
        let chassis_forward = chassis.rotation * CHASSIS_FORWARD;
        self.forward_speed = chassis.linear_velocity.dot(chassis_forward);

        for wheel in &mut self.wheels {
            let hard_point = chassis.position + chassis.rotation * wheel.connection;
            let ray_length = wheel.suspension.max_length() + wheel.tyre.radius;

            let Some(contact) = world.cast_suspension_ray(hard_point, down, ray_length) else {
                wheel.lift_off(dt);
                continue;
            };

            // Suspension.
            let length = (contact.distance - wheel.tyre.radius)
                .clamp(wheel.suspension.min_length(), wheel.suspension.max_length());
            wheel.suspension_length = length;
            wheel.in_contact = true;
            wheel.contact_point = contact.point;

            let contact_velocity = chassis.velocity_at(contact.point);
            let alignment = contact.normal.dot(up);
            let (suspension_velocity, inv_alignment) = if alignment > MIN_CONTACT_ALIGNMENT {
                (contact.normal.dot(contact_velocity) / alignment, 1.0 / alignment)
            } else {
                (0.0, 1.0 / MIN_CONTACT_ALIGNMENT)
            };

            let spring = wheel.suspension.stiffness
                * (wheel.suspension.rest_length - length)
                * inv_alignment;
            let damping = if suspension_velocity < 0.0 {
                wheel.suspension.compression
            } else {
                wheel.suspension.relaxation
            };
            let force = ((spring - damping * suspension_velocity) * chassis.mass)
                .clamp(0.0, wheel.suspension.max_force.max(0.0));
            wheel.suspension_force = force;

            let suspension_impulse = force * dt;
            world.apply_impulse_at_point(contact.normal * suspension_impulse, contact.point);

            // Tyre frame on the contact plane.
            let steered_forward = Quat::from_axis_angle(up, wheel.steering) * chassis_forward;
            let forward = (steered_forward - contact.normal * steered_forward.dot(contact.normal))
                .normalize_or_zero();
            let side = contact.normal.cross(forward).normalize_or_zero();

            let forward_speed = contact_velocity.dot(forward);
            let lateral_speed = contact_velocity.dot(side);

            let mut longitudinal = wheel.engine_force * dt;
            if wheel.brake > 0.0 {
                let brake_limit = wheel.brake * dt;
                longitudinal += (-forward_speed * wheel_mass_share).clamp(-brake_limit, brake_limit);
            }
            let lateral =
                -lateral_speed * wheel_mass_share * wheel.tyre.side_friction_stiffness.clamp(0.0, 1.0);

            // Friction circle.
            let budget = wheel.tyre.friction_slip.max(0.0) * suspension_impulse;
            let demand = (longitudinal * longitudinal + lateral * lateral).sqrt();
            let scale = if demand > budget && demand > 0.0 {
                budget / demand
            } else {
                1.0
            };

            let tyre_impulse = (forward * longitudinal + side * lateral) * scale;
            if tyre_impulse != Vec3::ZERO {
                // Pull the application point towards the centre of mass height to limit roll.
                let height = (chassis.center_of_mass - contact.point).dot(up);
                let application = contact.point + up * height * (1.0 - ROLL_INFLUENCE);
                world.apply_impulse_at_point(tyre_impulse, application);
            }

            if wheel.tyre.radius > 0.0 {
                wheel.spin_velocity = forward_speed / wheel.tyre.radius;
            }
            wheel.rotation += wheel.spin_velocity * dt;
        }
    }

    fn connection_point(&self, wheel: usize) -> Option<Vec3> {
        self.wheels.get(wheel).map(|w| w.connection)
    }

    fn suspension_length(&self, wheel: usize) -> Option<f32> {
        self.wheels.get(wheel).map(|w| w.suspension_length)
    }

    fn steering(&self, wheel: usize) -> Option<f32> {
        self.wheels.get(wheel).map(|w| w.steering)
    }

    fn rotation(&self, wheel: usize) -> Option<f32> {
        self.wheels.get(wheel).map(|w| w.rotation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vehicle::core::DEFAULT_WHEEL_SLOTS;

    const DT: f32 = 1.0 / 60.0;
    const GRAVITY: f32 = 9.81;

    /// Level chassis above a flat ground plane at y = 0.
    struct FlatGround {
        chassis: ChassisState,
        impulses: Vec<(Vec3, Vec3)>,
    }

    impl FlatGround {
        fn at_height(height: f32) -> Self {
            let position = Vec3::new(0.0, height, 0.0);
            Self {
                chassis: ChassisState {
                    position,
                    rotation: Quat::IDENTITY,
                    center_of_mass: position,
                    linear_velocity: Vec3::ZERO,
                    angular_velocity: Vec3::ZERO,
                    mass: 1000.0,
                },
                impulses: Vec::new(),
            }
        }

        fn total_impulse(&self) -> Vec3 {
            self.impulses.iter().map(|(impulse, _)| *impulse).sum()
        }
    }

    impl ChassisWorld for FlatGround {
        fn chassis(&self) -> ChassisState {
            self.chassis
        }

        fn cast_suspension_ray(
            &self,
            origin: Vec3,
            direction: Vec3,
            max_distance: f32,
        ) -> Option<RayContact> {
            if direction.y >= 0.0 || origin.y < 0.0 {
                return None;
            }
            let distance = origin.y / -direction.y;
            (distance <= max_distance).then(|| RayContact {
                distance,
                point: origin + direction * distance,
                normal: Vec3::Y,
            })
        }

        fn apply_impulse_at_point(&mut self, impulse: Vec3, point: Vec3) {
            self.impulses.push((impulse, point));
        }
    }

    fn controller_with_four_wheels(tuning: &VehicleTuning) -> RaycastVehicleController {
        let mut controller = RaycastVehicleController::new();
        for slot in DEFAULT_WHEEL_SLOTS {
            controller.add_wheel(
                slot.connection,
                SuspensionParams::from_tuning(tuning),
                TyreParams::from_tuning(tuning),
            );
        }
        controller
    }

    /// Chassis height at which the suspension compression holds the chassis up.
    fn equilibrium_height(tuning: &VehicleTuning) -> f32 {
        let compression = GRAVITY / (4.0 * tuning.suspension_stiffness);
        let length = tuning.suspension_rest_length - compression;
        // Hard points sit 0.15 below the chassis origin.
        length + tuning.wheel_radius + 0.15
    }

    #[test]
    fn test_airborne_wheels_extend_fully() {
        let tuning = VehicleTuning::default();
        let mut controller = controller_with_four_wheels(&tuning);
        let mut world = FlatGround::at_height(10.0);
        controller.update(DT, &mut world);

        assert!(world.impulses.is_empty());
        assert_eq!(controller.grounded_wheels(), 0);
        for i in 0..4 {
            assert_eq!(
                controller.suspension_length(i),
                Some(tuning.suspension_rest_length + tuning.max_suspension_travel)
            );
        }
    }

    #[test]
    fn test_suspension_length_clamped_to_travel() {
        let tuning = VehicleTuning::default();
        let mut controller = controller_with_four_wheels(&tuning);
        // Hard points just above the ground: maximally compressed.
        let mut world = FlatGround::at_height(0.2);
        controller.update(DT, &mut world);

        let min = tuning.suspension_rest_length - tuning.max_suspension_travel;
        for i in 0..4 {
            let length = controller.suspension_length(i).unwrap_or_default();
            assert!((length - min).abs() < 1e-5);
            let force = controller.wheel(i).map_or(0.0, |w| w.suspension_force);
            assert!(force <= tuning.max_suspension_force);
        }
    }

    #[test]
    fn test_resting_suspension_balances_gravity() {
        let tuning = VehicleTuning::default();
        let mut controller = controller_with_four_wheels(&tuning);
        let mut world = FlatGround::at_height(equilibrium_height(&tuning));
        controller.update(DT, &mut world);

        assert_eq!(controller.grounded_wheels(), 4);
        let impulse = world.total_impulse();
        let weight_impulse = world.chassis.mass * GRAVITY * DT;
        assert!((impulse.y - weight_impulse).abs() / weight_impulse < 0.01);
        assert!(impulse.x.abs() < 1e-3 && impulse.z.abs() < 1e-3);
    }

    #[test]
    fn test_engine_force_pushes_forward() {
        let tuning = VehicleTuning::default();
        let mut controller = controller_with_four_wheels(&tuning);
        for i in 0..4 {
            controller.set_engine_force(i, tuning.engine_force);
        }
        let mut world = FlatGround::at_height(equilibrium_height(&tuning));
        controller.update(DT, &mut world);

        let impulse = world.total_impulse();
        let expected = 4.0 * tuning.engine_force * DT;
        assert!((impulse.x - expected).abs() < 1e-2);
    }

    #[test]
    fn test_brake_opposes_motion() {
        let tuning = VehicleTuning::default();
        let mut controller = controller_with_four_wheels(&tuning);
        for i in 0..4 {
            controller.set_brake(i, tuning.brake_force);
        }
        let mut world = FlatGround::at_height(equilibrium_height(&tuning));
        world.chassis.linear_velocity = Vec3::new(10.0, 0.0, 0.0);
        controller.update(DT, &mut world);

        assert!(world.total_impulse().x < 0.0);
        assert!((controller.forward_speed() - 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_wheels_spin_with_ground_speed() {
        let tuning = VehicleTuning::default();
        let mut controller = controller_with_four_wheels(&tuning);
        let mut world = FlatGround::at_height(equilibrium_height(&tuning));
        world.chassis.linear_velocity = Vec3::new(7.0, 0.0, 0.0);
        controller.update(DT, &mut world);

        let expected = 7.0 * DT / tuning.wheel_radius;
        for i in 0..4 {
            let rotation = controller.rotation(i).unwrap_or_default();
            assert!((rotation - expected).abs() < 1e-5);
        }
    }

    #[test]
    fn test_unknown_wheel_indices() {
        let mut controller = RaycastVehicleController::new();
        controller.set_engine_force(3, 100.0);
        controller.set_steering(3, 0.2);
        assert_eq!(controller.wheel_count(), 0);
        assert_eq!(controller.suspension_length(3), None);
        assert_eq!(controller.steering(0), None);
        assert_eq!(controller.connection_point(0), None);
    }
}
