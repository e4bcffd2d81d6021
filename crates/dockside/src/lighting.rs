//! Sun light that follows the car so its shadows stay in view.

use bevy::{light::light_consts::lux, prelude::*};

use crate::{rig::VehiclePose, vehicle::Chassis};

/// Live-editable light follow settings.
#[derive(Resource, Clone, Copy, Debug, PartialEq)]
pub struct LightFollowConfig {
    /// Light position relative to the car.
    pub offset: Vec3,
    /// Point the light aims at, relative to the car.
    pub target_offset: Vec3,
    /// Fraction of the remaining distance covered per frame.
    pub follow_lerp: f32,
}

impl Default for LightFollowConfig {
    fn default() -> Self {
        Self {
            offset: Vec3::new(-6.0, 8.0, 6.0),
            target_offset: Vec3::ZERO,
            follow_lerp: 0.15,
        }
    }
}

impl LightFollowConfig {
    pub fn factor(&self) -> f32 {
        self.follow_lerp.clamp(0.01, 1.0)
    }

    /// Move `position` and `target` one frame towards their goals. Without a
    /// car the goals are the offsets themselves.
    pub fn step(&self, body: Option<Vec3>, position: &mut Vec3, target: &mut Vec3) {
        let anchor = body.unwrap_or(Vec3::ZERO);
        let factor = self.factor();
        *position = position.lerp(anchor + self.offset, factor);
        *target = target.lerp(anchor + self.target_offset, factor);
    }
}

/// Light whose transform tracks the car.
#[derive(Component, Clone, Copy, Debug, Default)]
pub struct LightFollower {
    /// Current aim point.
    pub target: Vec3,
}

/// Plugin for the following sun and the fill light.
pub struct LightingPlugin;

impl Plugin for LightingPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<LightFollowConfig>()
            .add_systems(Startup, spawn_lights)
            .add_systems(Update, follow_light_system);
    }
}

fn spawn_lights(mut commands: Commands, config: Res<LightFollowConfig>) {
    commands.spawn((
        Name::new("Sun"),
        DirectionalLight {
            color: Color::srgb(0.85, 0.9, 1.0),
            illuminance: lux::AMBIENT_DAYLIGHT * 0.5,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_translation(config.offset).looking_at(config.target_offset, Vec3::Y),
        LightFollower {
            target: config.target_offset,
        },
    ));

    // Unshadowed fill from the opposite side keeps the container faces readable.
    commands.spawn((
        Name::new("Fill light"),
        DirectionalLight {
            color: Color::srgb(0.6, 0.7, 0.85),
            illuminance: lux::AMBIENT_DAYLIGHT * 0.15,
            shadows_enabled: false,
            ..default()
        },
        Transform::from_xyz(6.0, 4.0, -6.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));
}

fn follow_light_system(
    config: Res<LightFollowConfig>,
    vehicle: VehiclePose,
    mut query: Query<(&mut LightFollower, &mut Transform), Without<Chassis>>,
) {
    let body = vehicle.position();
    for (mut follower, mut transform) in &mut query {
        let mut position = transform.translation;
        config.step(body, &mut position, &mut follower.target);
        transform.translation = position;
        if position.distance_squared(follower.target) > f32::EPSILON {
            transform.look_at(follower.target, Vec3::Y);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moves_towards_car_by_factor() {
        let config = LightFollowConfig::default();
        let body = Vec3::new(10.0, 0.0, 0.0);
        let mut position = config.offset;
        let mut target = Vec3::ZERO;
        config.step(Some(body), &mut position, &mut target);

        assert!(position.abs_diff_eq(config.offset + body * 0.15, 1e-5));
        assert!(target.abs_diff_eq(body * 0.15, 1e-5));
    }

    #[test]
    fn test_without_car_settles_on_offsets() {
        let config = LightFollowConfig {
            target_offset: Vec3::new(0.0, 1.0, 0.0),
            ..Default::default()
        };
        let mut position = Vec3::new(50.0, 50.0, 50.0);
        let mut target = Vec3::new(20.0, 0.0, 0.0);
        for _ in 0..500 {
            config.step(None, &mut position, &mut target);
        }
        assert!(position.abs_diff_eq(config.offset, 1e-3));
        assert!(target.abs_diff_eq(config.target_offset, 1e-3));
    }

    #[test]
    fn test_factor_is_clamped() {
        let mut config = LightFollowConfig {
            follow_lerp: 0.0,
            ..Default::default()
        };
        assert_eq!(config.factor(), 0.01);
        config.follow_lerp = 3.0;
        assert_eq!(config.factor(), 1.0);

        // A factor of one snaps in a single step.
        let body = Vec3::new(-4.0, 0.5, 2.0);
        let mut position = Vec3::ZERO;
        let mut target = Vec3::ZERO;
        config.step(Some(body), &mut position, &mut target);
        assert_eq!(position, body + config.offset);
        assert_eq!(target, body);
    }
}
