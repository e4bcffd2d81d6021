//! Centralized input action definitions and management.
//!
//! Defines all actions using `leafwing-input-manager` for declarative,
//! rebindable input mapping, keeps keyboard driving disabled while egui has
//! keyboard focus, and publishes the per-frame [`DriveControls`] snapshot.

use bevy::prelude::*;
use bevy_egui::EguiContexts;
use leafwing_input_manager::{plugin::InputManagerSystem, prelude::*};

use crate::vehicle::{DriveControls, core::DriveInput};

// ============================================================================
// Action enums
// ============================================================================

/// Actions for the orbit camera and the UI.
#[derive(Actionlike, PartialEq, Eq, Hash, Clone, Copy, Debug, Reflect)]
pub enum CameraAction {
    /// Orbit around the target while held (left mouse).
    Rotate,
    /// Pan the target while held (right mouse).
    Pan,
    /// Pointer movement driving rotate and pan.
    #[actionlike(DualAxis)]
    Look,
    /// Zoom with mouse scroll.
    #[actionlike(Axis)]
    Zoom,
    /// Toggle UI visibility (Q).
    ToggleUi,
}

/// Actions for driving the car.
#[derive(Actionlike, PartialEq, Eq, Hash, Clone, Copy, Debug, Reflect)]
pub enum DriveAction {
    Forward,
    Backward,
    Left,
    Right,
    Brake,
}

// ============================================================================
// Input maps
// ============================================================================

/// Create the default input map for camera actions.
pub fn default_camera_input_map() -> InputMap<CameraAction> {
    InputMap::default()
        .with(CameraAction::Rotate, MouseButton::Left)
        .with(CameraAction::Pan, MouseButton::Right)
        .with_dual_axis(CameraAction::Look, MouseMove::default())
        .with_axis(CameraAction::Zoom, MouseScrollAxis::Y)
        .with(CameraAction::ToggleUi, KeyCode::KeyQ)
}

/// Create the default input map for driving. Arrow keys mirror WASD.
pub fn default_drive_input_map() -> InputMap<DriveAction> {
    InputMap::default()
        .with(DriveAction::Forward, KeyCode::KeyW)
        .with(DriveAction::Forward, KeyCode::ArrowUp)
        .with(DriveAction::Backward, KeyCode::KeyS)
        .with(DriveAction::Backward, KeyCode::ArrowDown)
        .with(DriveAction::Left, KeyCode::KeyA)
        .with(DriveAction::Left, KeyCode::ArrowLeft)
        .with(DriveAction::Right, KeyCode::KeyD)
        .with(DriveAction::Right, KeyCode::ArrowRight)
        .with(DriveAction::Brake, KeyCode::Space)
}

// ============================================================================
// Plugin
// ============================================================================

/// Plugin that registers input action types, focus management and the drive
/// input snapshot.
pub struct InputPlugin;

impl Plugin for InputPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(InputManagerPlugin::<CameraAction>::default())
            .add_plugins(InputManagerPlugin::<DriveAction>::default())
            .init_resource::<DriveControls>()
            .add_systems(
                PreUpdate,
                (manage_input_focus, capture_drive_input)
                    .chain()
                    .after(InputManagerSystem::Update),
            );
    }
}

// ============================================================================
// Input focus management
// ============================================================================

/// Disable driving while egui wants keyboard input. `ToggleUi` stays enabled.
fn manage_input_focus(
    mut camera_query: Query<&mut ActionState<CameraAction>>,
    mut drive_query: Query<&mut ActionState<DriveAction>>,
    mut contexts: EguiContexts,
) {
    let egui_wants_kb = contexts
        .ctx_mut()
        .ok()
        .is_some_and(|ctx| ctx.wants_keyboard_input());

    for mut action_state in &mut camera_query {
        action_state.enable_action(&CameraAction::ToggleUi);
    }

    for mut action_state in &mut drive_query {
        if egui_wants_kb {
            action_state.disable_all_actions();
        } else {
            action_state.enable_all_actions();
        }
    }
}

/// Build the drive input snapshot from the action state.
pub fn drive_input_from_actions(actions: &ActionState<DriveAction>) -> DriveInput {
    DriveInput {
        forward: actions.pressed(&DriveAction::Forward),
        backward: actions.pressed(&DriveAction::Backward),
        left: actions.pressed(&DriveAction::Left),
        right: actions.pressed(&DriveAction::Right),
        brake: actions.pressed(&DriveAction::Brake),
    }
}

fn capture_drive_input(
    drive_query: Query<&ActionState<DriveAction>>,
    mut controls: ResMut<DriveControls>,
) {
    let input = drive_query
        .iter()
        .next()
        .map(drive_input_from_actions)
        .unwrap_or_default();
    if **controls != input {
        tracing::trace!("Drive input: {input:?}");
    }
    **controls = input;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_pressed_actions() {
        let mut actions = ActionState::<DriveAction>::default();
        actions.press(&DriveAction::Forward);
        actions.press(&DriveAction::Left);

        let input = drive_input_from_actions(&actions);
        assert!(input.forward);
        assert!(input.left);
        assert!(!input.backward);
        assert!(!input.right);
        assert!(!input.brake);
        assert!(input.is_driving());
    }

    #[test]
    fn test_disabled_actions_read_as_released() {
        let mut actions = ActionState::<DriveAction>::default();
        actions.press(&DriveAction::Brake);
        actions.disable_all_actions();
        assert_eq!(drive_input_from_actions(&actions), DriveInput::default());
    }

    #[test]
    fn test_default_maps_bind_every_action() {
        let drive = default_drive_input_map();
        for action in [
            DriveAction::Forward,
            DriveAction::Backward,
            DriveAction::Left,
            DriveAction::Right,
            DriveAction::Brake,
        ] {
            assert!(
                drive.get_buttonlike(&action).is_some(),
                "{action:?} is unbound"
            );
        }

        let camera = default_camera_input_map();
        assert!(camera.get_buttonlike(&CameraAction::Rotate).is_some());
        assert!(camera.get_dual_axislike(&CameraAction::Look).is_some());
        assert!(camera.get_axislike(&CameraAction::Zoom).is_some());
    }
}
