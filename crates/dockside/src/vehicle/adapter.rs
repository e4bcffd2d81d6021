//! Bridges driver input and tuning to a wheeled vehicle controller.

use super::{
    controller::{
        ChassisWorld, RaycastVehicleController, SuspensionParams, TyreParams,
        WheeledVehicleController,
    },
    core::{
        DEFAULT_WHEEL_SLOTS, DriveCommand, DriveInput, SteeringState, VehicleTuning, WHEEL_COUNT,
        WheelKinematics, WheelPose, WheelSlot, WheelVisualConfig, compute_drive_command,
        wheel_local_pose,
    },
};

/// Owns a controller for one chassis and drives it once per physics step.
///
/// The controller is absent until the chassis body exists; while absent both
/// steps are no-ops. Dropping the adapter releases the controller.
#[derive(Debug)]
pub struct VehicleControllerAdapter<C = RaycastVehicleController> {
    slots: [WheelSlot; WHEEL_COUNT],
    controller: Option<C>,
    steering: SteeringState,
    last_command: DriveCommand,
}

impl<C: WheeledVehicleController> VehicleControllerAdapter<C> {
    pub fn new(slots: [WheelSlot; WHEEL_COUNT]) -> Self {
        Self {
            slots,
            controller: None,
            steering: SteeringState::default(),
            last_command: DriveCommand::default(),
        }
    }

    /// Install a controller, registering the rig's wheels on it.
    ///
    /// Any previous controller is released first.
    pub fn attach(&mut self, mut controller: C, tuning: &VehicleTuning) {
        let suspension = SuspensionParams::from_tuning(tuning);
        let tyre = TyreParams::from_tuning(tuning);
        for slot in &self.slots {
            controller.add_wheel(slot.connection, suspension, tyre);
        }
        self.controller = Some(controller);
        self.steering = SteeringState::default();
        self.last_command = DriveCommand::default();
    }

    /// Release the controller, returning it to the caller.
    pub fn detach(&mut self) -> Option<C> {
        self.steering = SteeringState::default();
        self.last_command = DriveCommand::default();
        self.controller.take()
    }

    pub fn is_attached(&self) -> bool {
        self.controller.is_some()
    }

    pub fn controller(&self) -> Option<&C> {
        self.controller.as_ref()
    }

    pub fn slots(&self) -> &[WheelSlot; WHEEL_COUNT] {
        &self.slots
    }

    /// Current smoothed steering angle.
    pub fn steering_angle(&self) -> f32 {
        self.steering.angle
    }

    /// Command computed by the last pre-step.
    pub fn last_command(&self) -> DriveCommand {
        self.last_command
    }

    /// Write wheel commands and tuning into the controller and advance it.
    ///
    /// Returns `false` without touching the world when no controller is attached.
    pub fn pre_step(
        &mut self,
        input: &DriveInput,
        tuning: &VehicleTuning,
        dt: f32,
        world: &mut dyn ChassisWorld,
    ) -> bool {
        let Some(controller) = self.controller.as_mut() else {
            return false;
        };

        let command = compute_drive_command(input, tuning);
        let steer = self
            .steering
            .advance(command.target_steer, tuning.steer_speed, dt);
        let suspension = SuspensionParams::from_tuning(tuning);
        let tyre = TyreParams::from_tuning(tuning);

        for (index, slot) in self.slots.iter().enumerate() {
            controller.set_engine_force(index, command.engine_force);
            controller.set_steering(index, if slot.steered { steer } else { 0.0 });
            controller.set_brake(index, command.brake);
            controller.set_suspension(index, suspension);
            controller.set_tyre(index, tyre);
        }

        controller.update(dt, world);
        self.last_command = command;
        true
    }

    /// Read wheel kinematics back and compute chassis-local wheel mesh poses.
    pub fn post_step(
        &self,
        tuning: &VehicleTuning,
        visual: &WheelVisualConfig,
    ) -> Option<[WheelPose; WHEEL_COUNT]> {
        let controller = self.controller.as_ref()?;
        Some(std::array::from_fn(|index| {
            let kinematics = WheelKinematics {
                connection: controller
                    .connection_point(index)
                    .unwrap_or(self.slots[index].connection),
                suspension_length: controller
                    .suspension_length(index)
                    .unwrap_or(tuning.suspension_rest_length),
                steering: controller.steering(index).unwrap_or(0.0),
                rotation: controller.rotation(index).unwrap_or(0.0),
            };
            wheel_local_pose(&kinematics, visual)
        }))
    }
}

impl<C: WheeledVehicleController> Default for VehicleControllerAdapter<C> {
    fn default() -> Self {
        Self::new(DEFAULT_WHEEL_SLOTS)
    }
}
