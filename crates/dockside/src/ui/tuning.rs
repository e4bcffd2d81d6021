//! Vehicle tab for the debug UI.
//!
//! Every slider writes straight into [`LiveTuning`], which the controller
//! adapter reads on the next physics step.

use bevy::{ecs::system::SystemParam, prelude::*};
use bevy_egui::egui;

use crate::vehicle::{
    LiveTuning, WheelVisuals,
    core::{DriveDirection, SpinAxis, VehicleTuning, WheelVisualConfig},
};

/// Resources for the vehicle tab.
#[derive(SystemParam)]
pub(super) struct TuningParams<'w> {
    pub tuning: ResMut<'w, LiveTuning>,
    pub visuals: ResMut<'w, WheelVisuals>,
}

/// Render the vehicle tab content.
pub(super) fn render_tuning_tab(ui: &mut egui::Ui, params: &mut TuningParams) {
    if ui.button("Reset tuning").clicked() {
        **params.tuning = VehicleTuning::default();
        **params.visuals = WheelVisualConfig::default();
    }

    egui::ScrollArea::vertical()
        .max_height(ui.available_height() - 20.0)
        .show(ui, |ui| {
            let tuning = &mut **params.tuning;

            ui.collapsing("Drive", |ui| {
                ui.add(
                    egui::Slider::new(&mut tuning.engine_force, 0.0..=6000.0)
                        .text("Engine force")
                        .suffix(" N"),
                );
                ui.add(
                    egui::Slider::new(&mut tuning.brake_force, 0.0..=10000.0)
                        .text("Brake force")
                        .suffix(" N"),
                );
                ui.horizontal(|ui| {
                    ui.label("Drive direction:");
                    ui.selectable_value(
                        &mut tuning.drive_direction,
                        DriveDirection::Forward,
                        "Forward",
                    );
                    ui.selectable_value(
                        &mut tuning.drive_direction,
                        DriveDirection::Reverse,
                        "Reverse",
                    );
                });
            });

            ui.collapsing("Steering", |ui| {
                ui.add(
                    egui::Slider::new(&mut tuning.max_steer, 0.0..=1.0)
                        .text("Max steer")
                        .suffix(" rad"),
                );
                ui.add(
                    egui::Slider::new(&mut tuning.steer_speed, 0.5..=20.0).text("Steer speed"),
                );
            });

            ui.collapsing("Suspension", |ui| {
                ui.add(
                    egui::Slider::new(&mut tuning.suspension_stiffness, 5.0..=100.0)
                        .text("Stiffness"),
                );
                ui.add(
                    egui::Slider::new(&mut tuning.suspension_compression, 0.0..=10.0)
                        .text("Compression"),
                );
                ui.add(
                    egui::Slider::new(&mut tuning.suspension_relaxation, 0.0..=10.0)
                        .text("Relaxation"),
                );
                ui.add(
                    egui::Slider::new(&mut tuning.suspension_rest_length, 0.1..=1.0)
                        .text("Rest length")
                        .suffix(" m"),
                );
                ui.add(
                    egui::Slider::new(&mut tuning.max_suspension_travel, 0.0..=0.5)
                        .text("Max travel")
                        .suffix(" m"),
                );
                ui.add(
                    egui::Slider::new(&mut tuning.max_suspension_force, 1000.0..=30000.0)
                        .text("Max force")
                        .suffix(" N"),
                );
            });

            ui.collapsing("Tyres", |ui| {
                ui.add(
                    egui::Slider::new(&mut tuning.wheel_radius, 0.1..=1.0)
                        .text("Radius")
                        .suffix(" m"),
                );
                ui.add(
                    egui::Slider::new(&mut tuning.friction_slip, 0.0..=30.0).text("Friction slip"),
                );
                ui.add(
                    egui::Slider::new(&mut tuning.side_friction_stiffness, 0.0..=1.0)
                        .text("Side friction"),
                );
            });

            ui.collapsing("Body (applies on respawn, see Diagnostics)", |ui| {
                ui.add(
                    egui::Slider::new(&mut tuning.chassis_mass, 100.0..=5000.0)
                        .text("Mass")
                        .suffix(" kg"),
                );
                ui.add(
                    egui::Slider::new(&mut tuning.wheel_width, 0.05..=0.6)
                        .text("Wheel width")
                        .suffix(" m"),
                );
                super::vec3_sliders(
                    ui,
                    "Half extents:",
                    &mut tuning.chassis_half_extents,
                    0.1..=5.0,
                );
            });

            ui.collapsing("Wheel visuals", |ui| {
                render_wheel_visuals(ui, &mut params.visuals);
            });
        });
}

/// Spin axis picker and mesh correction angles.
fn render_wheel_visuals(ui: &mut egui::Ui, visuals: &mut WheelVisualConfig) {
    ui.horizontal(|ui| {
        ui.label("Spin axis:");
        for axis in SpinAxis::ALL {
            ui.selectable_value(&mut visuals.spin_axis, axis, axis.label());
        }
    });

    let (yaw, pitch, roll) = visuals.mesh_correction.to_euler(EulerRot::YXZ);
    let mut degrees = Vec3::new(pitch, yaw, roll) * (180.0 / std::f32::consts::PI);
    if super::vec3_sliders(ui, "Mesh correction (deg):", &mut degrees, -180.0..=180.0) {
        let radians = degrees * (std::f32::consts::PI / 180.0);
        visuals.mesh_correction = Quat::from_euler(EulerRot::YXZ, radians.y, radians.x, radians.z);
    }
}
