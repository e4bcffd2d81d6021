//! Debug UI for tuning the car, the camera and the scene.
//!
//! Shows vehicle tuning, camera/light settings and diagnostics in one tabbed
//! window, toggled with Q.

mod camera;
mod diagnostics;
mod tuning;

use bevy::{diagnostic::FrameTimeDiagnosticsPlugin, prelude::*};
use bevy_egui::{EguiContexts, EguiPlugin, EguiPrimaryContextPass, egui};
use leafwing_input_manager::prelude::*;

use crate::{input::CameraAction, launch_params::LaunchParams};

pub use diagnostics::VehicleHistory;

/// Resource controlling whether the debug UI is visible.
#[derive(Resource)]
pub struct UiVisible(pub bool);

impl Default for UiVisible {
    fn default() -> Self {
        Self(true)
    }
}

/// Plugin for debug UI overlay.
pub struct DebugUiPlugin;

impl Plugin for DebugUiPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(EguiPlugin::default())
            .add_plugins(FrameTimeDiagnosticsPlugin::default())
            .init_resource::<DebugUiState>()
            .init_resource::<VehicleHistory>()
            .init_resource::<UiVisible>()
            .add_systems(Startup, apply_launch_visibility)
            .add_systems(Update, toggle_ui_visible)
            .add_systems(
                EguiPrimaryContextPass,
                debug_ui_system.run_if(|visible: Res<UiVisible>| visible.0),
            );
    }
}

/// Which tab is currently selected in the debug UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum DebugTab {
    #[default]
    Vehicle,
    Camera,
    Diagnostics,
}

/// State for the debug UI.
#[derive(Resource, Default)]
struct DebugUiState {
    /// Currently selected tab.
    selected_tab: DebugTab,
}

fn apply_launch_visibility(params: Res<LaunchParams>, mut visible: ResMut<UiVisible>) {
    if params.hide_ui {
        visible.0 = false;
    }
}

/// Toggle UI visibility with Q.
fn toggle_ui_visible(
    action_query: Query<&ActionState<CameraAction>>,
    mut visible: ResMut<UiVisible>,
) {
    let Ok(action_state) = action_query.single() else {
        return;
    };

    if action_state.just_pressed(&CameraAction::ToggleUi) {
        visible.0 = !visible.0;
    }
}

/// Render the debug UI overlay.
fn debug_ui_system(
    mut contexts: EguiContexts,
    mut ui_state: ResMut<DebugUiState>,
    mut tuning_params: tuning::TuningParams,
    mut camera_params: camera::CameraParams,
    mut diag_params: diagnostics::DiagnosticsParams,
) -> Result {
    let ctx = contexts.ctx_mut()?;

    egui::Window::new("Dockside")
        .default_pos([10.0, 10.0])
        .default_width(320.0)
        .show(ctx, |ui| {
            // Tab bar.
            ui.horizontal(|ui| {
                for (tab, label) in [
                    (DebugTab::Vehicle, "Vehicle"),
                    (DebugTab::Camera, "Camera & scene"),
                    (DebugTab::Diagnostics, "Diagnostics"),
                ] {
                    if ui
                        .selectable_label(ui_state.selected_tab == tab, label)
                        .clicked()
                    {
                        ui_state.selected_tab = tab;
                    }
                }
            });
            ui.separator();

            match ui_state.selected_tab {
                DebugTab::Vehicle => tuning::render_tuning_tab(ui, &mut tuning_params),
                DebugTab::Camera => camera::render_camera_tab(ui, &mut camera_params),
                DebugTab::Diagnostics => {
                    diagnostics::render_diagnostics_tab(ui, &mut diag_params);
                }
            }
        });

    Ok(())
}

// ============================================================================
// UI helpers
// ============================================================================

/// Render drag values for a Vec3 with configurable range.
///
/// Returns true if any component was changed.
pub fn vec3_sliders(
    ui: &mut egui::Ui,
    label: &str,
    value: &mut Vec3,
    range: std::ops::RangeInclusive<f32>,
) -> bool {
    let mut changed = false;
    ui.label(label);
    ui.horizontal(|ui| {
        for (axis, component) in [("X:", &mut value.x), ("Y:", &mut value.y), ("Z:", &mut value.z)]
        {
            ui.label(axis);
            changed |= ui
                .add(
                    egui::DragValue::new(component)
                        .range(range.clone())
                        .speed(0.1),
                )
                .changed();
        }
    });
    changed
}
