//! Concrete yard floor with a static collider slab underneath.

use avian3d::prelude::*;
use bevy::prelude::*;
use rand::{Rng, SeedableRng, rngs::StdRng};

/// Floor side length (m).
pub const FLOOR_SIZE: f32 = 100.0;
/// Grid cells per side.
pub const FLOOR_SEGMENTS: u32 = 24;
/// Darkest vertex brightness.
pub const MIN_BRIGHTNESS: f32 = 0.92;
/// Collider slab thickness (m). Its top face is at y = 0.
const SLAB_THICKNESS: f32 = 1.0;

/// One grey RGBA colour per vertex with brightness in
/// `[MIN_BRIGHTNESS, 1.0]`, to break up the flat shading.
pub fn vertex_brightness_jitter(count: usize, rng: &mut impl Rng) -> Vec<[f32; 4]> {
    (0..count)
        .map(|_| {
            let brightness = MIN_BRIGHTNESS + rng.random::<f32>() * (1.0 - MIN_BRIGHTNESS);
            [brightness, brightness, brightness, 1.0]
        })
        .collect()
}

pub(super) fn spawn_floor(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    seed: u64,
) {
    let mut mesh = Mesh::from(
        Plane3d::default()
            .mesh()
            .size(FLOOR_SIZE, FLOOR_SIZE)
            .subdivisions(FLOOR_SEGMENTS - 1),
    );
    let mut rng = StdRng::seed_from_u64(seed ^ 0xF100_0F00);
    let colors = vertex_brightness_jitter(mesh.count_vertices(), &mut rng);
    mesh.insert_attribute(Mesh::ATTRIBUTE_COLOR, colors);

    commands.spawn((
        Name::new("Floor"),
        Mesh3d(meshes.add(mesh)),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::srgb_u8(0x88, 0x88, 0x88),
            perceptual_roughness: 0.4,
            metallic: 0.2,
            ..default()
        })),
        Transform::default(),
    ));

    commands.spawn((
        Name::new("Floor collider"),
        RigidBody::Static,
        Collider::cuboid(FLOOR_SIZE, SLAB_THICKNESS, FLOOR_SIZE),
        Transform::from_xyz(0.0, -SLAB_THICKNESS / 2.0, 0.0),
    ));
}
