//! Drive a suspension-modelled car around a rainy container yard using Bevy.
//!
//! The library holds every plugin; the `dockside` binary wires them into a
//! windowed app and `drive-bench` runs the vehicle headless.

pub mod camera;
pub mod input;
pub mod launch_params;
pub mod lighting;
pub mod physics;
pub mod rig;
pub mod scenery;
pub mod ui;
pub mod vehicle;
pub mod weather;

use bevy::prelude::*;

/// Plugin for the main application.
pub struct AppPlugin;

impl Plugin for AppPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins((
            physics::PhysicsIntegrationPlugin,
            input::InputPlugin,
            vehicle::VehiclePlugin,
            camera::CameraControllerPlugin,
            lighting::LightingPlugin,
            scenery::SceneryPlugin,
            weather::RainPlugin,
            ui::DebugUiPlugin,
        ));
    }
}
