//! Diagnostics tab for the debug UI.
//!
//! Displays FPS, the physics debug toggle and live vehicle state.

use std::collections::VecDeque;

use bevy::{
    diagnostic::{DiagnosticsStore, FrameTimeDiagnosticsPlugin},
    ecs::system::SystemParam,
    gizmos::config::GizmoConfigStore,
    prelude::*,
};
use bevy_egui::egui;
use egui_extras::{Column, TableBuilder};
use egui_plot::{Line, Plot, PlotPoints};

use crate::{
    physics::{is_physics_debug_enabled, toggle_physics_debug},
    vehicle::{Chassis, DriveControls, VehicleRespawnRequest, VehicleState, core::WheelId},
};

/// Number of samples to keep in vehicle history.
const VEHICLE_HISTORY_SIZE: usize = 120;

/// Historical data for vehicle diagnostics plots.
#[derive(Resource, Default)]
pub struct VehicleHistory {
    /// Forward speed history (m/s).
    speed: VecDeque<f32>,
}

impl VehicleHistory {
    /// Push a new sample, maintaining the history size limit.
    fn push_sample(&mut self, speed: f32) {
        let speed = if speed.is_finite() { speed } else { 0.0 };
        self.speed.push_back(speed);
        if self.speed.len() > VEHICLE_HISTORY_SIZE {
            self.speed.pop_front();
        }
    }

    /// Clear all history.
    fn clear(&mut self) {
        self.speed.clear();
    }
}

/// Resources for the diagnostics tab.
#[derive(SystemParam)]
pub(super) struct DiagnosticsParams<'w, 's> {
    pub diagnostics: Res<'w, DiagnosticsStore>,
    pub config_store: ResMut<'w, GizmoConfigStore>,
    pub vehicle_query: Query<'w, 's, (&'static Chassis, &'static VehicleState)>,
    pub vehicle_history: ResMut<'w, VehicleHistory>,
    pub respawn_request: ResMut<'w, VehicleRespawnRequest>,
    pub controls: Res<'w, DriveControls>,
}

/// Render the diagnostics tab content.
pub(super) fn render_diagnostics_tab(ui: &mut egui::Ui, diag: &mut DiagnosticsParams) {
    let fps = diag
        .diagnostics
        .get(&FrameTimeDiagnosticsPlugin::FPS)
        .and_then(bevy::diagnostic::Diagnostic::smoothed)
        .unwrap_or(0.0);
    ui.label(format!("FPS: {fps:.0}"));

    ui.separator();

    let mut debug_enabled = is_physics_debug_enabled(&diag.config_store);
    if ui
        .checkbox(&mut debug_enabled, "Debug visualization")
        .changed()
    {
        toggle_physics_debug(&mut diag.config_store);
    }

    if let Some((chassis, state)) = diag.vehicle_query.iter().next() {
        diag.vehicle_history.push_sample(state.forward_speed);

        ui.separator();
        ui.horizontal(|ui| {
            ui.heading(format!("Vehicle: {}", chassis.name));
            if ui.button("Respawn").clicked() {
                diag.respawn_request.pending = true;
            }
        });
        render_vehicle_state(ui, state, &diag.controls, &diag.vehicle_history);
    } else {
        diag.vehicle_history.clear();
        ui.label("No vehicle");
    }
}

/// Summary table, speed plot and per-wheel suspension table.
fn render_vehicle_state(
    ui: &mut egui::Ui,
    state: &VehicleState,
    controls: &DriveControls,
    history: &VehicleHistory,
) {
    egui::ScrollArea::vertical()
        .max_height(ui.available_height() - 20.0)
        .show(ui, |ui| {
            TableBuilder::new(ui)
                .id_salt("vehicle_summary")
                .column(Column::exact(80.0))
                .column(Column::exact(160.0))
                .body(|mut body| {
                    let rows = [
                        (
                            "Speed:",
                            format!(
                                "{:.1} m/s ({:.0} km/h)",
                                state.forward_speed,
                                state.forward_speed * 3.6
                            ),
                        ),
                        ("Grounded:", format!("{}/4 wheels", state.grounded_wheels)),
                        ("Mass:", format!("{:.1} kg", state.mass)),
                        ("Steering:", format!("{:+.1}°", state.steering.to_degrees())),
                        ("Engine:", format!("{:.0} N", state.engine_force)),
                        ("Brake:", format!("{:.0} N", state.brake)),
                        ("Input:", input_label(controls)),
                    ];
                    for (label, value) in rows {
                        body.row(18.0, |mut row| {
                            row.col(|ui| {
                                ui.label(label);
                            });
                            row.col(|ui| {
                                ui.label(value);
                            });
                        });
                    }
                });

            ui.separator();

            ui.label("Speed history:");
            let speed_points: PlotPoints = history
                .speed
                .iter()
                .enumerate()
                .map(|(i, &v)| [i as f64, f64::from(v)])
                .collect();
            Plot::new("speed_plot")
                .height(60.0)
                .show_axes(false)
                .allow_drag(false)
                .allow_zoom(false)
                .allow_scroll(false)
                .show(ui, |plot_ui| {
                    plot_ui.line(Line::new("speed", speed_points).color(egui::Color32::LIGHT_BLUE));
                });

            ui.separator();

            ui.label("Suspension:");
            TableBuilder::new(ui)
                .id_salt("vehicle_wheels")
                .column(Column::exact(50.0))
                .column(Column::exact(80.0))
                .column(Column::exact(80.0))
                .header(18.0, |mut header| {
                    for title in ["Wheel", "Length", "Force"] {
                        header.col(|ui| {
                            ui.strong(title);
                        });
                    }
                })
                .body(|mut body| {
                    for (index, id) in WheelId::ALL.iter().enumerate() {
                        body.row(18.0, |mut row| {
                            row.col(|ui| {
                                ui.label(id.label());
                            });
                            row.col(|ui| {
                                ui.label(format!("{:.3} m", state.suspension_lengths[index]));
                            });
                            row.col(|ui| {
                                ui.label(format!("{:.0} N", state.suspension_forces[index]));
                            });
                        });
                    }
                });
        });
}

/// Compact display of the held drive keys.
fn input_label(controls: &DriveControls) -> String {
    let flags = [
        (controls.forward, 'F'),
        (controls.backward, 'B'),
        (controls.left, 'L'),
        (controls.right, 'R'),
        (controls.brake, '_'),
    ];
    let held: String = flags
        .iter()
        .filter(|(active, _)| *active)
        .map(|(_, c)| *c)
        .collect();
    if held.is_empty() {
        "-".to_string()
    } else {
        held
    }
}
