//! Physics integration using Avian 3D.
//!
//! Standard downward gravity on a flat yard. Collider debug rendering is
//! available but starts disabled unless requested at launch.

use avian3d::debug_render::{PhysicsDebugPlugin, PhysicsGizmos};
use avian3d::prelude::*;
use bevy::color::palettes::css::LIME;
use bevy::gizmos::config::{GizmoConfig, GizmoConfigStore};
use bevy::prelude::*;

use crate::launch_params::LaunchParams;

/// Physics layers for collision filtering.
///
/// Suspension rays only hit `Ground`. Stacked containers sit on `Decor`, which
/// collides with nothing but is still visible to camera occlusion rays.
#[derive(PhysicsLayer, Clone, Copy, Debug, Default)]
pub enum GameLayer {
    /// Floor and ground-level containers.
    #[default]
    Ground,
    /// The chassis.
    Vehicle,
    /// Visual-only scenery.
    Decor,
}

/// Plugin for the rigid-body simulation and its debug view.
pub struct PhysicsIntegrationPlugin;

impl Plugin for PhysicsIntegrationPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(PhysicsPlugins::default())
            // Add debug rendering plugin (disabled by default).
            .add_plugins(PhysicsDebugPlugin)
            .insert_resource(Gravity::default())
            .add_systems(Startup, configure_physics_debug_on_startup);
    }
}

/// Configure physics debug rendering on startup.
fn configure_physics_debug_on_startup(
    mut config_store: ResMut<GizmoConfigStore>,
    params: Option<Res<LaunchParams>>,
) {
    let physics_gizmos = PhysicsGizmos {
        collider_color: Some(LIME.into()),
        ..Default::default()
    };

    // Negative depth bias draws the gizmos over the geometry they outline.
    let gizmo_config = GizmoConfig {
        enabled: params.is_some_and(|params| params.physics_debug),
        depth_bias: -1.0,
        ..Default::default()
    };

    config_store.insert(gizmo_config, physics_gizmos);
}

/// Toggle physics debug visualization.
pub fn toggle_physics_debug(config_store: &mut GizmoConfigStore) {
    let (config, _) = config_store.config_mut::<PhysicsGizmos>();
    config.enabled = !config.enabled;
    tracing::info!("Physics debug visualization: {}", config.enabled);
}

/// Check if physics debug is currently enabled.
pub fn is_physics_debug_enabled(config_store: &GizmoConfigStore) -> bool {
    let (config, _) = config_store.config::<PhysicsGizmos>();
    config.enabled
}
