//! Fades scenery that blocks the view of the car.
//!
//! Each frame a ray runs from the camera to the chassis. Every [`Occluder`] it
//! crosses gets its own copy of its material, switched to alpha blending and
//! faded down. Once it stops blocking the view it fades back up and gets its
//! shared material back.

use avian3d::prelude::*;
use bevy::prelude::*;

use super::FollowCamera;
use crate::{physics::GameLayer, rig::VehiclePose};

/// Opacity of a fully faded occluder.
pub const FADE_OPACITY: f32 = 0.12;
/// Rate at which opacity approaches its target (1/s).
pub const FADE_SPEED: f32 = 6.0;
/// Opacity at which a restoring occluder counts as opaque again.
const RESTORED_OPACITY: f32 = 0.99;
/// The ray stops this far short of the car (m).
const RAY_MARGIN: f32 = 0.01;
const MAX_OCCLUDERS: u32 = 32;

/// Marker for meshes that fade when they hide the car.
#[derive(Component, Clone, Copy, Debug, Default)]
pub struct Occluder;

/// Live-editable fade constants.
#[derive(Resource, Clone, Copy, Debug, PartialEq)]
pub struct OcclusionSettings {
    pub fade_opacity: f32,
    pub fade_speed: f32,
}

impl Default for OcclusionSettings {
    fn default() -> Self {
        Self {
            fade_opacity: FADE_OPACITY,
            fade_speed: FADE_SPEED,
        }
    }
}

/// Opacity of one occluder and where it is heading.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FadeState {
    pub opacity: f32,
    pub target: f32,
}

impl Default for FadeState {
    fn default() -> Self {
        Self {
            opacity: 1.0,
            target: 1.0,
        }
    }
}

impl FadeState {
    /// Advance one frame. Returns `true` once the occluder is clear of the
    /// view and opaque again, at which point it should stop being tracked.
    pub fn step(&mut self, occluding: bool, settings: &OcclusionSettings, dt: f32) -> bool {
        self.target = if occluding { settings.fade_opacity } else { 1.0 };
        let factor = (1.0 - (-settings.fade_speed * dt).exp()).clamp(0.0, 1.0);
        self.opacity += (self.target - self.opacity) * factor;

        if !occluding && self.opacity >= RESTORED_OPACITY {
            self.opacity = 1.0;
            return true;
        }
        false
    }
}

/// Fade state of an occluder that is currently using its own material.
#[derive(Component, Debug)]
pub struct OcclusionFade {
    pub state: FadeState,
    /// Shared material to put back once restored.
    original: Handle<StandardMaterial>,
    faded: Handle<StandardMaterial>,
}

/// Copy of `material` that can be drawn see-through.
pub fn faded_material(material: &StandardMaterial, opacity: f32) -> StandardMaterial {
    let mut faded = material.clone();
    faded.alpha_mode = AlphaMode::Blend;
    faded.base_color.set_alpha(opacity);
    faded
}

/// Fade occluders between the camera and the car.
pub(super) fn occlusion_fade_system(
    mut commands: Commands,
    time: Res<Time>,
    settings: Res<OcclusionSettings>,
    vehicle: VehiclePose,
    spatial_query: SpatialQuery,
    cameras: Query<&GlobalTransform, With<FollowCamera>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut occluders: Query<
        (
            Entity,
            &mut MeshMaterial3d<StandardMaterial>,
            Option<&mut OcclusionFade>,
        ),
        With<Occluder>,
    >,
) {
    let mut blocking = Vec::new();
    if let (Some(body), Some(car), Ok(camera)) =
        (vehicle.body(), vehicle.position(), cameras.single())
    {
        let origin = camera.translation();
        let distance = origin.distance(car);
        if let Ok(direction) = Dir3::new(car - origin)
            && distance > RAY_MARGIN
        {
            let filter = SpatialQueryFilter::from_mask([GameLayer::Ground, GameLayer::Decor])
                .with_excluded_entities([body]);
            blocking = spatial_query
                .ray_hits(
                    origin,
                    direction,
                    distance - RAY_MARGIN,
                    MAX_OCCLUDERS,
                    true,
                    &filter,
                )
                .into_iter()
                .map(|hit| hit.entity)
                .collect();
        }
    }

    let dt = time.delta_secs();
    for (entity, mut material, fade) in &mut occluders {
        let occluding = blocking.contains(&entity);
        match fade {
            Some(mut fade) => {
                if fade.state.step(occluding, &settings, dt) {
                    material.0 = fade.original.clone();
                    commands.entity(entity).remove::<OcclusionFade>();
                } else if let Some(faded) = materials.get_mut(&fade.faded) {
                    faded.base_color.set_alpha(fade.state.opacity);
                }
            }
            None if occluding => {
                let Some(shared) = materials.get(&material.0) else {
                    continue;
                };
                let mut state = FadeState::default();
                state.step(true, &settings, dt);
                let faded_mat = faded_material(shared, state.opacity);
                let faded = materials.add(faded_mat);
                commands.entity(entity).insert(OcclusionFade {
                    state,
                    original: std::mem::replace(&mut material.0, faded.clone()),
                    faded,
                });
            }
            None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn test_fades_towards_fade_opacity() {
        let settings = OcclusionSettings::default();
        let mut state = FadeState::default();
        assert!(!state.step(true, &settings, DT));

        let factor = 1.0 - (-FADE_SPEED * DT).exp();
        let expected = 1.0 + (FADE_OPACITY - 1.0) * factor;
        assert!((state.opacity - expected).abs() < 1e-6);
        assert_eq!(state.target, FADE_OPACITY);

        for _ in 0..600 {
            assert!(!state.step(true, &settings, DT));
        }
        assert!((state.opacity - FADE_OPACITY).abs() < 1e-3);
    }

    #[test]
    fn test_restores_and_untracks_once_opaque() {
        let settings = OcclusionSettings::default();
        let mut state = FadeState {
            opacity: FADE_OPACITY,
            target: FADE_OPACITY,
        };

        let mut frames = 0;
        while !state.step(false, &settings, DT) {
            frames += 1;
            assert!(state.opacity < RESTORED_OPACITY);
            assert!(frames < 600, "never restored");
        }
        assert_eq!(state.opacity, 1.0);
        assert_eq!(state.target, 1.0);
        // Roughly ln(0.88 / 0.01) / 6 seconds.
        assert!((40..60).contains(&frames), "restored after {frames} frames");
    }

    #[test]
    fn test_zero_dt_holds_opacity() {
        let settings = OcclusionSettings::default();
        let mut state = FadeState {
            opacity: 0.5,
            target: FADE_OPACITY,
        };
        assert!(!state.step(false, &settings, 0.0));
        assert_eq!(state.opacity, 0.5);
        assert_eq!(state.target, 1.0);
    }

    #[test]
    fn test_faded_material_blends() {
        let shared = StandardMaterial {
            base_color: Color::srgb(0.6, 0.15, 0.11),
            perceptual_roughness: 0.6,
            ..default()
        };
        let faded = faded_material(&shared, 0.4);
        assert!(matches!(faded.alpha_mode, AlphaMode::Blend));
        assert!((faded.base_color.alpha() - 0.4).abs() < 1e-6);
        assert_eq!(faded.perceptual_roughness, 0.6);
        assert!(matches!(shared.alpha_mode, AlphaMode::Opaque));
    }
}
