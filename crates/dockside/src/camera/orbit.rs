//! Orbit camera controls.
//!
//! Left drag rotates around the target, right drag pans it, the wheel zooms.
//! Input accumulates into deltas that are bled into the camera with damping
//! each frame, so motion eases out after the pointer stops.

use std::f32::consts::{FRAC_PI_4, PI, TAU};

use bevy::{prelude::*, window::PrimaryWindow};
use bevy_egui::EguiContexts;
use leafwing_input_manager::prelude::*;

use super::follow::{FollowCamera, FollowCameraSettings, FollowTransition};
use crate::{input::CameraAction, vehicle::Chassis};

/// Smallest polar angle kept away from the poles.
const POLE_EPSILON: f32 = 1e-6;
/// Squared distance below which the camera is considered not to have moved.
const MOVE_EPSILON: f32 = 1e-8;
/// Zoom scale per scroll line.
const ZOOM_STEP: f32 = 0.95;

/// Damping and clamping applied by [`OrbitControls`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrbitLimits {
    /// Fraction of the pending delta applied per frame.
    pub damping: f32,
    /// Polar angle range measured from straight up (radians).
    pub min_polar: f32,
    pub max_polar: f32,
    /// Camera distance range (m).
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for OrbitLimits {
    fn default() -> Self {
        Self {
            damping: 0.12,
            min_polar: PI / 5.0,
            max_polar: PI / 2.05,
            min_distance: 1.5,
            max_distance: 25.0,
        }
    }
}

/// Which drag is in progress.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrbitDrag {
    Rotate,
    Pan,
}

/// Orbit state for a camera. The camera position lives in its `Transform`.
#[derive(Component, Clone, Debug)]
pub struct OrbitControls {
    /// Point the camera orbits around and looks at.
    pub target: Vec3,
    pub limits: OrbitLimits,
    /// Pending (azimuth, polar) rotation.
    spherical_delta: Vec2,
    pan_offset: Vec3,
    scale: f32,
    drag: Option<OrbitDrag>,
    last_camera: Vec3,
    last_target: Vec3,
}

impl OrbitControls {
    pub fn new(target: Vec3) -> Self {
        Self {
            target,
            limits: OrbitLimits::default(),
            spherical_delta: Vec2::ZERO,
            pan_offset: Vec3::ZERO,
            scale: 1.0,
            drag: None,
            last_camera: Vec3::ZERO,
            last_target: target,
        }
    }

    pub fn drag(&self) -> Option<OrbitDrag> {
        self.drag
    }

    pub fn begin_drag(&mut self, drag: OrbitDrag) {
        self.drag = Some(drag);
    }

    pub fn end_drag(&mut self) {
        self.drag = None;
    }

    /// Queue a rotation for a pointer movement of `delta` pixels.
    ///
    /// A drag across the full viewport height turns a full circle.
    pub fn rotate_by_pixels(&mut self, delta: Vec2, viewport_height: f32) {
        if viewport_height <= 0.0 {
            return;
        }
        self.spherical_delta.x -= TAU * delta.x / viewport_height;
        self.spherical_delta.y -= TAU * delta.y / viewport_height;
    }

    /// Queue a pan so the point under the cursor follows a pointer movement
    /// of `delta` pixels.
    pub fn pan_by_pixels(
        &mut self,
        delta: Vec2,
        viewport_height: f32,
        camera: &Transform,
        fov: f32,
    ) {
        if viewport_height <= 0.0 {
            return;
        }
        let distance = (camera.translation - self.target).length() * (fov * 0.5).tan();
        let right = camera.right().as_vec3();
        let up = camera.up().as_vec3();
        self.pan_offset += -right * (2.0 * delta.x * distance / viewport_height)
            + up * (2.0 * delta.y * distance / viewport_height);
    }

    /// Queue a zoom. Positive lines move the camera closer.
    pub fn zoom_by_lines(&mut self, lines: f32) {
        self.scale *= ZOOM_STEP.powf(lines);
    }

    /// Apply one damped step to `camera`. Returns whether the camera or the
    /// target moved since the previous step.
    pub fn update(&mut self, camera: &mut Vec3) -> bool {
        let offset = *camera - self.target;
        let radius = offset.length();
        let (mut azimuth, mut polar) = if radius > POLE_EPSILON {
            (offset.x.atan2(offset.z), (offset.y / radius).clamp(-1.0, 1.0).acos())
        } else {
            (0.0, self.limits.max_polar)
        };

        let factor = self.limits.damping;
        azimuth += self.spherical_delta.x * factor;
        polar += self.spherical_delta.y * factor;
        polar = polar
            .clamp(self.limits.min_polar, self.limits.max_polar)
            .clamp(POLE_EPSILON, PI - POLE_EPSILON);
        let radius =
            (radius * self.scale).clamp(self.limits.min_distance, self.limits.max_distance);

        self.target += self.pan_offset * factor;

        let ring = polar.sin() * radius;
        *camera = self.target + Vec3::new(ring * azimuth.sin(), polar.cos() * radius, ring * azimuth.cos());

        self.spherical_delta *= 1.0 - factor;
        self.pan_offset *= 1.0 - factor;
        self.scale = 1.0;

        let moved = camera.distance_squared(self.last_camera) > MOVE_EPSILON
            || self.target.distance_squared(self.last_target) > MOVE_EPSILON;
        self.last_camera = *camera;
        self.last_target = self.target;
        moved
    }
}

// ============================================================================
// Systems
// ============================================================================

/// Turn pointer input into orbit deltas and interaction events.
#[allow(clippy::type_complexity)]
pub(super) fn orbit_input_system(
    mut contexts: EguiContexts,
    window: Single<&Window, With<PrimaryWindow>>,
    mut query: Query<(
        &ActionState<CameraAction>,
        &mut OrbitControls,
        &mut FollowCamera,
        &Transform,
        &Projection,
    )>,
) {
    let pointer_over_ui = contexts
        .ctx_mut()
        .ok()
        .is_some_and(|ctx| ctx.is_pointer_over_area());
    let height = window.height();

    for (actions, mut orbit, mut follow, transform, projection) in &mut query {
        if orbit.drag().is_none() && !pointer_over_ui {
            let drag = if actions.just_pressed(&CameraAction::Rotate) {
                Some(OrbitDrag::Rotate)
            } else if actions.just_pressed(&CameraAction::Pan) {
                Some(OrbitDrag::Pan)
            } else {
                None
            };
            if let Some(drag) = drag {
                orbit.begin_drag(drag);
                follow.begin_interaction(orbit.target);
            }
        }

        if let Some(drag) = orbit.drag() {
            let held = match drag {
                OrbitDrag::Rotate => actions.pressed(&CameraAction::Rotate),
                OrbitDrag::Pan => actions.pressed(&CameraAction::Pan),
            };
            if held {
                let delta = actions.axis_pair(&CameraAction::Look);
                match drag {
                    OrbitDrag::Rotate => orbit.rotate_by_pixels(delta, height),
                    OrbitDrag::Pan => {
                        let fov = match projection {
                            Projection::Perspective(perspective) => perspective.fov,
                            _ => FRAC_PI_4,
                        };
                        orbit.pan_by_pixels(delta, height, transform, fov);
                    }
                }
            } else {
                orbit.end_drag();
                follow.end_interaction();
            }
        }

        let scroll = actions.value(&CameraAction::Zoom);
        if scroll != 0.0 && !pointer_over_ui {
            orbit.zoom_by_lines(scroll);
        }
    }
}

/// Apply orbit deltas, report changes to the follow state and aim the camera.
pub(super) fn orbit_update_system(
    settings: Res<FollowCameraSettings>,
    mut query: Query<(&mut OrbitControls, &mut FollowCamera, &mut Transform), Without<Chassis>>,
) {
    for (mut orbit, mut follow, mut transform) in &mut query {
        let moved = orbit.update(&mut transform.translation);
        if moved
            && follow.is_interacting()
            && let Some(FollowTransition::Detached) =
                follow.interaction_changed(orbit.target, &settings)
        {
            tracing::info!("Camera detached from vehicle");
        }

        orbit.target.y = orbit.target.y.max(settings.min_target_height);
        transform.translation.y = transform.translation.y.max(settings.min_camera_height);
        let target = orbit.target;
        transform.look_at(target, Vec3::Y);
    }
}
