//! GPU rain: falling streaks plus ring splashes on the floor.
//!
//! Every drop is baked into two static meshes once, with its start position
//! and fall speed stored per vertex. The vertex shader wraps each drop's
//! height over time and grows its splash as the drop nears the floor, so the
//! only per-frame CPU work is updating the material uniform.

use bevy::asset::{RenderAssetUsages, embedded_asset};
use bevy::mesh::{Indices, MeshVertexAttribute, MeshVertexBufferLayoutRef, PrimitiveTopology};
use bevy::pbr::{Material, MaterialPipeline, MaterialPipelineKey, MaterialPlugin};
use bevy::prelude::*;
use bevy::render::render_resource::{
    AsBindGroup, RenderPipelineDescriptor, ShaderType, SpecializedMeshPipelineError, VertexFormat,
};
use bevy::shader::ShaderRef;
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::launch_params::LaunchParams;

/// Per-vertex drop data: start position (xyz) and fall speed (w).
pub const ATTRIBUTE_DROP: MeshVertexAttribute =
    MeshVertexAttribute::new("Vertex_Drop", 0x5241_494E, VertexFormat::Float32x4);

const SHADER_PATH: &str = "embedded://dockside/weather/rain.wgsl";

/// Slowest and fastest drop speed (m/s).
const DROP_SPEED_MIN: f32 = 7.0;
const DROP_SPEED_RANGE: f32 = 10.0;

/// Rain appearance and volume.
#[derive(Resource, Clone, Copy, Debug, PartialEq)]
pub struct RainSettings {
    /// Side of the square the drops fall in, centred on the origin (m).
    pub area: f32,
    /// Height drops fall from (m).
    pub height: f32,
    pub color: Color,
    pub opacity: f32,
    /// Multiplier on every drop's fall speed.
    pub speed: f32,
    pub streak_width: f32,
    pub streak_length: f32,
    /// Largest splash diameter (m).
    pub splash_scale: f32,
    /// Fall distance over which a splash grows and fades (m).
    pub splash_duration: f32,
}

impl Default for RainSettings {
    fn default() -> Self {
        Self {
            area: 70.0,
            height: 30.0,
            color: Color::srgb_u8(0xdb, 0xea, 0xfe),
            opacity: 0.35,
            speed: 1.0,
            streak_width: 0.002,
            streak_length: 0.4,
            splash_scale: 0.1,
            splash_duration: 3.0,
        }
    }
}

/// One rain drop.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RainDrop {
    /// Start position; `y` is the height at time zero.
    pub position: Vec3,
    /// Fall speed (m/s).
    pub speed: f32,
}

/// Scatter `count` drops uniformly over the rain volume.
pub fn scatter_drops(count: usize, settings: &RainSettings, rng: &mut impl Rng) -> Vec<RainDrop> {
    (0..count)
        .map(|_| RainDrop {
            position: Vec3::new(
                (rng.random::<f32>() - 0.5) * settings.area,
                rng.random::<f32>() * settings.height,
                (rng.random::<f32>() - 0.5) * settings.area,
            ),
            speed: DROP_SPEED_MIN + rng.random::<f32>() * DROP_SPEED_RANGE,
        })
        .collect()
}

/// Which half of the effect a mesh draws.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RainLayer {
    Streaks,
    Splashes,
}

impl RainLayer {
    fn shader_kind(self) -> f32 {
        match self {
            RainLayer::Streaks => 0.0,
            RainLayer::Splashes => 1.0,
        }
    }
}

/// Uniform block shared by the rain vertex and fragment shaders.
#[derive(ShaderType, Clone, Copy, Debug, Default, PartialEq)]
pub struct RainUniform {
    /// Linear RGB and opacity.
    pub color: Vec4,
    /// Streak width, streak length, splash scale, splash duration.
    pub shape: Vec4,
    /// Time, fall height, speed multiplier, layer.
    pub motion: Vec4,
}

impl RainUniform {
    pub fn new(settings: &RainSettings, time: f32, layer: RainLayer) -> Self {
        let color = settings.color.to_linear();
        Self {
            color: Vec4::new(color.red, color.green, color.blue, settings.opacity),
            shape: Vec4::new(
                settings.streak_width,
                settings.streak_length,
                settings.splash_scale,
                settings.splash_duration,
            ),
            motion: Vec4::new(time, settings.height, settings.speed, layer.shader_kind()),
        }
    }
}

/// Additive, unlit material for the baked rain meshes.
#[derive(Asset, TypePath, AsBindGroup, Debug, Clone)]
pub struct RainMaterial {
    #[uniform(0)]
    pub params: RainUniform,
}

impl Material for RainMaterial {
    fn vertex_shader() -> ShaderRef {
        SHADER_PATH.into()
    }

    fn fragment_shader() -> ShaderRef {
        SHADER_PATH.into()
    }

    fn alpha_mode(&self) -> AlphaMode {
        AlphaMode::Add
    }

    fn enable_shadows() -> bool {
        false
    }

    fn enable_prepass() -> bool {
        false
    }

    fn specialize(
        _pipeline: &MaterialPipeline,
        descriptor: &mut RenderPipelineDescriptor,
        layout: &MeshVertexBufferLayoutRef,
        _key: MaterialPipelineKey<Self>,
    ) -> Result<(), SpecializedMeshPipelineError> {
        let vertex_layout = layout.0.get_layout(&[
            Mesh::ATTRIBUTE_POSITION.at_shader_location(0),
            Mesh::ATTRIBUTE_UV_0.at_shader_location(1),
            ATTRIBUTE_DROP.at_shader_location(2),
        ])?;
        descriptor.vertex.buffers = vec![vertex_layout];
        // Streaks are crossed quads seen from both sides.
        descriptor.primitive.cull_mode = None;
        Ok(())
    }
}

// ============================================================================
// Mesh baking
// ============================================================================

/// Accumulates drop quads into one mesh.
#[derive(Default)]
struct DropMeshBuilder {
    positions: Vec<[f32; 3]>,
    uvs: Vec<[f32; 2]>,
    drops: Vec<[f32; 4]>,
    indices: Vec<u32>,
}

impl DropMeshBuilder {
    /// Add a quad whose corners are `drop.position + corners[i]`.
    fn quad(&mut self, drop: &RainDrop, corners: [Vec3; 4]) {
        let base = self.positions.len() as u32;
        let data = drop.position.extend(drop.speed).to_array();
        let uvs = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
        for (corner, uv) in corners.into_iter().zip(uvs) {
            self.positions.push((drop.position + corner).to_array());
            self.uvs.push(uv);
            self.drops.push(data);
        }
        self.indices
            .extend([base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    fn build(self) -> Mesh {
        Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::default())
            .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, self.positions)
            .with_inserted_attribute(Mesh::ATTRIBUTE_UV_0, self.uvs)
            .with_inserted_attribute(ATTRIBUTE_DROP, self.drops)
            .with_inserted_indices(Indices::U32(self.indices))
    }
}

/// Two crossed unit quads per drop; the shader scales them to the streak size.
pub fn build_streak_mesh(drops: &[RainDrop]) -> Mesh {
    let mut builder = DropMeshBuilder::default();
    for drop in drops {
        builder.quad(
            drop,
            [
                Vec3::new(-0.5, -0.5, 0.0),
                Vec3::new(0.5, -0.5, 0.0),
                Vec3::new(0.5, 0.5, 0.0),
                Vec3::new(-0.5, 0.5, 0.0),
            ],
        );
        builder.quad(
            drop,
            [
                Vec3::new(0.0, -0.5, -0.5),
                Vec3::new(0.0, -0.5, 0.5),
                Vec3::new(0.0, 0.5, 0.5),
                Vec3::new(0.0, 0.5, -0.5),
            ],
        );
    }
    builder.build()
}

/// One unit floor quad per drop; the shader scales it to the splash size.
pub fn build_splash_mesh(drops: &[RainDrop]) -> Mesh {
    let mut builder = DropMeshBuilder::default();
    for drop in drops {
        builder.quad(
            drop,
            [
                Vec3::new(-0.5, 0.0, 0.5),
                Vec3::new(0.5, 0.0, 0.5),
                Vec3::new(0.5, 0.0, -0.5),
                Vec3::new(-0.5, 0.0, -0.5),
            ],
        );
    }
    builder.build()
}

// ============================================================================
// Plugin
// ============================================================================

/// Materials driven by [`advance_rain`].
#[derive(Resource)]
pub struct RainField {
    streaks: Handle<RainMaterial>,
    splashes: Handle<RainMaterial>,
}

/// Plugin for the rain effect. Spawns nothing when the drop count is zero.
pub struct RainPlugin;

impl Plugin for RainPlugin {
    fn build(&self, app: &mut App) {
        embedded_asset!(app, "rain.wgsl");
        app.add_plugins(MaterialPlugin::<RainMaterial>::default())
            .init_resource::<RainSettings>()
            .add_systems(Startup, spawn_rain)
            .add_systems(Update, advance_rain.run_if(resource_exists::<RainField>));
    }
}

fn spawn_rain(
    mut commands: Commands,
    params: Res<LaunchParams>,
    settings: Res<RainSettings>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<RainMaterial>>,
) {
    let count = params.rain_drops as usize;
    if count == 0 {
        tracing::info!("Rain disabled");
        return;
    }

    let mut rng = StdRng::seed_from_u64(params.seed ^ 0x5241_494E);
    let drops = scatter_drops(count, &settings, &mut rng);

    let streaks = materials.add(RainMaterial {
        params: RainUniform::new(&settings, 0.0, RainLayer::Streaks),
    });
    let splashes = materials.add(RainMaterial {
        params: RainUniform::new(&settings, 0.0, RainLayer::Splashes),
    });

    commands.spawn((
        Name::new("Rain streaks"),
        Mesh3d(meshes.add(build_streak_mesh(&drops))),
        MeshMaterial3d(streaks.clone()),
        Transform::default(),
    ));
    commands.spawn((
        Name::new("Rain splashes"),
        Mesh3d(meshes.add(build_splash_mesh(&drops))),
        MeshMaterial3d(splashes.clone()),
        Transform::default(),
    ));
    commands.insert_resource(RainField { streaks, splashes });

    tracing::info!("Rain: {count} drops");
}

fn advance_rain(
    time: Res<Time>,
    settings: Res<RainSettings>,
    field: Res<RainField>,
    mut materials: ResMut<Assets<RainMaterial>>,
) {
    let elapsed = time.elapsed_secs_wrapped();
    for (handle, layer) in [
        (&field.streaks, RainLayer::Streaks),
        (&field.splashes, RainLayer::Splashes),
    ] {
        if let Some(mut material) = materials.get_mut(handle) {
            material.params = RainUniform::new(&settings, elapsed, layer);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drops(count: usize) -> Vec<RainDrop> {
        let mut rng = StdRng::seed_from_u64(9);
        scatter_drops(count, &RainSettings::default(), &mut rng)
    }

    #[test]
    fn test_drops_stay_inside_volume() {
        let settings = RainSettings::default();
        let half = settings.area / 2.0;
        for drop in drops(2000) {
            assert!(drop.position.x.abs() <= half);
            assert!(drop.position.z.abs() <= half);
            assert!((0.0..=settings.height).contains(&drop.position.y));
            assert!((DROP_SPEED_MIN..=DROP_SPEED_MIN + DROP_SPEED_RANGE).contains(&drop.speed));
        }
    }

    #[test]
    fn test_mesh_sizes() {
        let drops = drops(10);
        let streaks = build_streak_mesh(&drops);
        assert_eq!(streaks.count_vertices(), 10 * 8);
        assert_eq!(streaks.indices().map(Indices::len), Some(10 * 12));

        let splashes = build_splash_mesh(&drops);
        assert_eq!(splashes.count_vertices(), 10 * 4);
        assert!(splashes.attribute(ATTRIBUTE_DROP).is_some());
        assert!(splashes.attribute(Mesh::ATTRIBUTE_UV_0).is_some());
    }

    #[test]
    fn test_uniform_packs_settings() {
        let settings = RainSettings::default();
        let uniform = RainUniform::new(&settings, 2.5, RainLayer::Splashes);
        assert_eq!(uniform.color.w, settings.opacity);
        assert_eq!(uniform.shape, Vec4::new(0.002, 0.4, 0.1, 3.0));
        assert_eq!(uniform.motion, Vec4::new(2.5, 30.0, 1.0, 1.0));
    }
}
