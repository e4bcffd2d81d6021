//! Vehicle follow behaviour for the orbit camera.
//!
//! While following, the orbit target is smoothed towards the car and the
//! camera is shifted by the same delta, so the user's framing is kept. Dragging
//! the target away while not driving detaches the camera; pressing forward or
//! backward re-attaches it from wherever the user left the target.

use bevy::prelude::*;

use super::orbit::OrbitControls;
use crate::{
    rig::VehiclePose,
    vehicle::{Chassis, DriveControls},
};

/// Rate at which the target approaches the car (1/s).
pub const FOLLOW_SPEED: f32 = 5.0;
/// Lowest allowed camera height (m).
pub const MIN_CAMERA_HEIGHT: f32 = 0.5;
/// Lowest allowed orbit target height (m).
pub const MIN_TARGET_HEIGHT: f32 = 0.3;
/// Target displacement during a drag that detaches the camera (m).
pub const DETACH_THRESHOLD: f32 = 0.15;

/// Live-editable follow constants.
#[derive(Resource, Clone, Copy, Debug, PartialEq)]
pub struct FollowCameraSettings {
    pub follow_speed: f32,
    pub min_camera_height: f32,
    pub min_target_height: f32,
    pub detach_threshold: f32,
}

impl Default for FollowCameraSettings {
    fn default() -> Self {
        Self {
            follow_speed: FOLLOW_SPEED,
            min_camera_height: MIN_CAMERA_HEIGHT,
            min_target_height: MIN_TARGET_HEIGHT,
            detach_threshold: DETACH_THRESHOLD,
        }
    }
}

/// Whether the camera is tracking the car.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FollowMode {
    #[default]
    Following,
    Detached,
}

/// Mode change reported by [`FollowCamera`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FollowTransition {
    Detached,
    Reattached,
}

/// Follow state for a camera with [`OrbitControls`].
#[derive(Component, Clone, Debug, Default)]
pub struct FollowCamera {
    mode: FollowMode,
    smoothed_target: Vec3,
    previous_target: Vec3,
    interacting: bool,
    interaction_start: Vec3,
    drive_input_active: bool,
    /// Chassis the camera last snapped to.
    tracked_body: Option<Entity>,
}

impl FollowCamera {
    pub fn new(target: Vec3) -> Self {
        Self {
            smoothed_target: target,
            previous_target: target,
            ..default()
        }
    }

    pub fn mode(&self) -> FollowMode {
        self.mode
    }

    pub fn smoothed_target(&self) -> Vec3 {
        self.smoothed_target
    }

    pub fn is_interacting(&self) -> bool {
        self.interacting
    }

    /// A manual orbit/pan/zoom interaction started with the target at `target`.
    pub fn begin_interaction(&mut self, target: Vec3) {
        self.interacting = true;
        self.interaction_start = target;
    }

    /// The controls changed during an interaction. Detaches once the target
    /// has moved past the threshold, unless the driver is giving input.
    pub fn interaction_changed(
        &mut self,
        target: Vec3,
        settings: &FollowCameraSettings,
    ) -> Option<FollowTransition> {
        if !self.interacting || self.drive_input_active || self.mode == FollowMode::Detached {
            return None;
        }
        if target.distance(self.interaction_start) > settings.detach_threshold {
            self.mode = FollowMode::Detached;
            return Some(FollowTransition::Detached);
        }
        None
    }

    pub fn end_interaction(&mut self) {
        self.interacting = false;
    }

    /// Jump the target to the car and move the camera by the same delta.
    pub fn snap_to_vehicle(
        &mut self,
        vehicle: Vec3,
        target: &mut Vec3,
        camera: &mut Vec3,
        settings: &FollowCameraSettings,
    ) {
        let snapped = vehicle.with_y(vehicle.y.max(settings.min_target_height));
        *camera += snapped - *target;
        camera.y = camera.y.max(settings.min_camera_height);
        *target = snapped;
        self.smoothed_target = snapped;
        self.previous_target = snapped;
    }

    /// Advance one frame.
    ///
    /// `target` and `camera` are the orbit target and camera position; both
    /// are updated in place.
    pub fn update(
        &mut self,
        dt: f32,
        vehicle: Option<Vec3>,
        drive_input_active: bool,
        target: &mut Vec3,
        camera: &mut Vec3,
        settings: &FollowCameraSettings,
    ) -> Option<FollowTransition> {
        self.drive_input_active = drive_input_active;
        // Pans and zooms since the last frame already moved both points.
        self.previous_target = *target;

        let mut transition = None;
        let mut reattached = false;
        if drive_input_active && self.mode == FollowMode::Detached {
            self.mode = FollowMode::Following;
            self.smoothed_target = *target;
            transition = Some(FollowTransition::Reattached);
            reattached = true;
        }

        match (self.mode, vehicle) {
            (FollowMode::Following, Some(vehicle)) if !reattached => {
                let goal = vehicle.with_y(vehicle.y.max(settings.min_target_height));
                let factor = 1.0 - (-settings.follow_speed * dt).exp();
                self.smoothed_target = self.smoothed_target.lerp(goal, factor.clamp(0.0, 1.0));
                self.smoothed_target.y = self.smoothed_target.y.max(settings.min_target_height);

                *camera += self.smoothed_target - self.previous_target;
                *target = self.smoothed_target;
            }
            _ => {
                target.y = target.y.max(settings.min_target_height);
                self.smoothed_target = *target;
            }
        }

        camera.y = camera.y.max(settings.min_camera_height);
        transition
    }
}

// ============================================================================
// Systems
// ============================================================================

/// Track the registered chassis, snapping on (re)spawn.
pub(super) fn follow_camera_system(
    time: Res<Time>,
    settings: Res<FollowCameraSettings>,
    controls: Res<DriveControls>,
    vehicle: VehiclePose,
    mut query: Query<(&mut FollowCamera, &mut OrbitControls, &mut Transform), Without<Chassis>>,
) {
    let body = vehicle.body();
    let position = vehicle.position();

    for (mut follow, mut orbit, mut transform) in &mut query {
        if body != follow.tracked_body {
            match (body, position) {
                (Some(_), Some(position)) => {
                    follow.snap_to_vehicle(
                        position,
                        &mut orbit.target,
                        &mut transform.translation,
                        &settings,
                    );
                    follow.tracked_body = body;
                    tracing::debug!("Camera snapped to vehicle at {position}");
                }
                (None, _) => follow.tracked_body = None,
                // No transform yet; retry the snap next frame.
                (Some(_), None) => {}
            }
        }

        if let Some(FollowTransition::Reattached) = follow.update(
            time.delta_secs(),
            position,
            controls.is_driving(),
            &mut orbit.target,
            &mut transform.translation,
            &settings,
        ) {
            tracing::info!("Camera re-attached to vehicle");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rig::CarRig;

    const DT: f32 = 1.0 / 60.0;

    fn following_at(vehicle: Vec3, offset: Vec3) -> (FollowCamera, Vec3, Vec3) {
        let settings = FollowCameraSettings::default();
        let mut follow = FollowCamera::new(Vec3::ZERO);
        let mut target = Vec3::ZERO;
        let mut camera = offset;
        follow.snap_to_vehicle(vehicle, &mut target, &mut camera, &settings);
        (follow, target, camera)
    }

    #[test]
    fn test_following_shifts_camera_by_target_delta() {
        let settings = FollowCameraSettings::default();
        let start = Vec3::new(0.0, 1.0, 0.0);
        let (mut follow, mut target, mut camera) = following_at(start, Vec3::new(2.0, 3.0, 5.0));
        let offset_before = camera - target;
        let camera_before = camera;

        let delta = Vec3::new(1.0, 0.0, -0.5);
        follow.update(DT, Some(start + delta), false, &mut target, &mut camera, &settings);

        let factor = 1.0 - (-FOLLOW_SPEED * DT).exp();
        assert!((camera - camera_before).abs_diff_eq(delta * factor, 1e-5));
        assert!((camera - target).abs_diff_eq(offset_before, 1e-5));
        assert_eq!(follow.mode(), FollowMode::Following);
    }

    #[test]
    fn test_pan_while_following_keeps_offset() {
        let settings = FollowCameraSettings::default();
        let vehicle = Vec3::new(0.0, 1.0, 0.0);
        let (mut follow, mut target, mut camera) = following_at(vehicle, Vec3::new(2.0, 3.0, 5.0));
        let offset = camera - target;
        follow.update(DT, Some(vehicle), true, &mut target, &mut camera, &settings);

        // A pan moves target and camera together between frames.
        target += Vec3::X * 0.1;
        camera += Vec3::X * 0.1;
        follow.update(DT, Some(vehicle), true, &mut target, &mut camera, &settings);

        assert!((camera - target).abs_diff_eq(offset, 1e-5));
    }

    #[test]
    fn test_missing_vehicle_holds_target() {
        let settings = FollowCameraSettings::default();
        let (mut follow, mut target, mut camera) =
            following_at(Vec3::new(3.0, 1.0, 3.0), Vec3::new(0.0, 4.0, 8.0));
        let (target_before, camera_before) = (target, camera);
        follow.update(DT, None, false, &mut target, &mut camera, &settings);
        assert_eq!(target, target_before);
        assert_eq!(camera, camera_before);
    }

    #[test]
    fn test_drag_detaches_then_drive_reattaches() {
        let settings = FollowCameraSettings::default();
        let vehicle = Vec3::new(0.0, 1.0, 0.0);
        let (mut follow, mut target, mut camera) = following_at(vehicle, Vec3::new(2.0, 3.0, 5.0));

        follow.begin_interaction(target);
        target += Vec3::new(0.1, 0.0, 0.0);
        assert_eq!(follow.interaction_changed(target, &settings), None);
        target += Vec3::new(0.2, 0.0, 0.0);
        assert_eq!(
            follow.interaction_changed(target, &settings),
            Some(FollowTransition::Detached)
        );
        follow.end_interaction();
        assert_eq!(follow.mode(), FollowMode::Detached);

        // Detached: the car moving away does not pull the target.
        let dragged = target;
        let away = Some(vehicle + Vec3::X * 5.0);
        follow.update(DT, away, false, &mut target, &mut camera, &settings);
        assert_eq!(target, dragged);
        assert_eq!(follow.smoothed_target(), dragged);

        let transition = follow.update(DT, away, true, &mut target, &mut camera, &settings);
        assert_eq!(transition, Some(FollowTransition::Reattached));
        assert_eq!(follow.mode(), FollowMode::Following);
        assert_eq!(follow.smoothed_target(), dragged);
        assert_eq!(target, dragged);
    }

    #[test]
    fn test_no_detach_while_driving() {
        let settings = FollowCameraSettings::default();
        let (mut follow, mut target, mut camera) =
            following_at(Vec3::new(0.0, 1.0, 0.0), Vec3::new(2.0, 3.0, 5.0));
        follow.update(DT, Some(target), true, &mut target, &mut camera, &settings);

        follow.begin_interaction(target);
        assert_eq!(follow.interaction_changed(target + Vec3::X, &settings), None);
        assert_eq!(follow.mode(), FollowMode::Following);
    }

    #[test]
    fn test_no_detach_without_interaction() {
        let settings = FollowCameraSettings::default();
        let mut follow = FollowCamera::new(Vec3::ZERO);
        assert_eq!(follow.interaction_changed(Vec3::X * 10.0, &settings), None);
        assert_eq!(follow.mode(), FollowMode::Following);
    }

    #[test]
    fn test_height_clamps_hold_below_ground() {
        let settings = FollowCameraSettings::default();
        let (mut follow, mut target, mut camera) =
            following_at(Vec3::new(0.0, -3.0, 0.0), Vec3::new(0.0, -2.0, 1.0));
        assert!(target.y >= MIN_TARGET_HEIGHT);
        assert!(camera.y >= MIN_CAMERA_HEIGHT);

        for step in 0..120 {
            #[allow(clippy::cast_precision_loss)]
            let sinking = Vec3::new(0.0, -1.0 - step as f32 * 0.1, 0.0);
            follow.update(DT, Some(sinking), false, &mut target, &mut camera, &settings);
            assert!(target.y >= MIN_TARGET_HEIGHT);
            assert!(camera.y >= MIN_CAMERA_HEIGHT);
            assert!(follow.smoothed_target().y >= MIN_TARGET_HEIGHT);
        }
    }

    #[test]
    fn test_snap_moves_camera_with_target() {
        let settings = FollowCameraSettings::default();
        let mut follow = FollowCamera::new(Vec3::new(0.0, 0.5, 0.0));
        let mut target = Vec3::new(0.0, 0.5, 0.0);
        let mut camera = Vec3::new(2.0, 3.0, 5.0);
        follow.snap_to_vehicle(Vec3::new(10.0, 1.5, -4.0), &mut target, &mut camera, &settings);
        assert_eq!(target, Vec3::new(10.0, 1.5, -4.0));
        assert!(camera.abs_diff_eq(Vec3::new(12.0, 4.0, 1.0), 1e-6));
        assert_eq!(follow.smoothed_target(), target);
    }

    fn camera_app() -> (App, Entity) {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .init_resource::<CarRig>()
            .init_resource::<FollowCameraSettings>()
            .init_resource::<DriveControls>()
            .add_systems(Update, follow_camera_system);
        let camera = app
            .world_mut()
            .spawn((
                FollowCamera::new(Vec3::ZERO),
                OrbitControls::new(Vec3::ZERO),
                Transform::from_xyz(2.0, 3.0, 5.0),
            ))
            .id();
        (app, camera)
    }

    fn mount(app: &mut App, chassis: Entity) {
        app.world_mut().resource_mut::<CarRig>().set(chassis);
        app.update();
    }

    fn camera_pose(app: &App, camera: Entity) -> (Vec3, Vec3) {
        let world = app.world();
        let target = world.get::<OrbitControls>(camera).map(|orbit| orbit.target);
        let position = world.get::<Transform>(camera).map(|t| t.translation);
        (target.unwrap_or(Vec3::NAN), position.unwrap_or(Vec3::NAN))
    }

    #[test]
    fn test_snaps_on_mount_and_chassis_swap() {
        let (mut app, camera) = camera_app();

        let first = app
            .world_mut()
            .spawn((Chassis::default(), Transform::from_xyz(10.0, 1.0, -4.0)))
            .id();
        mount(&mut app, first);
        let (target, position) = camera_pose(&app, camera);
        assert!(target.abs_diff_eq(Vec3::new(10.0, 1.0, -4.0), 1e-5));
        assert!(position.abs_diff_eq(Vec3::new(12.0, 4.0, 1.0), 1e-5));

        let second = app
            .world_mut()
            .spawn((Chassis::default(), Transform::from_xyz(-5.0, 1.0, 6.0)))
            .id();
        mount(&mut app, second);
        let (target, position) = camera_pose(&app, camera);
        assert!(target.abs_diff_eq(Vec3::new(-5.0, 1.0, 6.0), 1e-5));
        assert!(position.abs_diff_eq(Vec3::new(-3.0, 4.0, 11.0), 1e-5));
    }

    #[test]
    fn test_snap_waits_for_chassis_transform() {
        let (mut app, camera) = camera_app();

        let chassis = app.world_mut().spawn(Chassis::default()).id();
        mount(&mut app, chassis);
        let (target, position) = camera_pose(&app, camera);
        assert_eq!(target, Vec3::ZERO);
        assert!(position.abs_diff_eq(Vec3::new(2.0, 3.0, 5.0), 1e-5));

        app.world_mut()
            .entity_mut(chassis)
            .insert(Transform::from_xyz(4.0, 1.0, 4.0));
        app.update();
        let (target, position) = camera_pose(&app, camera);
        assert!(target.abs_diff_eq(Vec3::new(4.0, 1.0, 4.0), 1e-5));
        assert!(position.abs_diff_eq(Vec3::new(6.0, 4.0, 9.0), 1e-5));
    }
}
