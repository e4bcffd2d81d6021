//! Static yard scenery: floor and container stacks.

pub mod containers;
pub mod floor;

use bevy::prelude::*;

use crate::launch_params::LaunchParams;

/// Overcast sky behind the yard.
const SKY_COLOR: Color = Color::srgb(0.125, 0.125, 0.14);

/// Plugin for the floor and container yard.
pub struct SceneryPlugin;

impl Plugin for SceneryPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(ClearColor(SKY_COLOR))
            .add_systems(Startup, spawn_scenery);
    }
}

fn spawn_scenery(
    mut commands: Commands,
    params: Res<LaunchParams>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    floor::spawn_floor(&mut commands, &mut meshes, &mut materials, params.seed);
    containers::spawn_containers(&mut commands, &mut meshes, &mut materials, params.seed);
}
