//! Camera tab for the debug UI.
//!
//! Shows the follow mode and exposes the follow, occlusion, orbit, light and
//! rain settings.

use bevy::{ecs::system::SystemParam, prelude::*};
use bevy_egui::egui;

use crate::{
    camera::{FollowCamera, FollowCameraSettings, FollowMode, OcclusionSettings, OrbitControls},
    lighting::LightFollowConfig,
    weather::RainSettings,
};

/// Resources for camera display and control.
#[derive(SystemParam)]
pub(super) struct CameraParams<'w, 's> {
    pub settings: ResMut<'w, FollowCameraSettings>,
    pub occlusion: ResMut<'w, OcclusionSettings>,
    pub light: ResMut<'w, LightFollowConfig>,
    pub rain: Option<ResMut<'w, RainSettings>>,
    pub camera_query: Query<'w, 's, (&'static FollowCamera, &'static mut OrbitControls)>,
}

/// Render the camera tab content.
pub(super) fn render_camera_tab(ui: &mut egui::Ui, camera: &mut CameraParams) {
    if let Ok((follow, mut orbit)) = camera.camera_query.single_mut() {
        let mode_str = match follow.mode() {
            FollowMode::Following => "Following vehicle",
            FollowMode::Detached => "Detached (drive to re-attach)",
        };
        ui.label(format!("Mode: {mode_str}"));
        ui.label(format!(
            "Target: ({:.1}, {:.1}, {:.1})",
            orbit.target.x, orbit.target.y, orbit.target.z
        ));

        ui.collapsing("Orbit", |ui| {
            let limits = &mut orbit.limits;
            ui.add(egui::Slider::new(&mut limits.damping, 0.01..=1.0).text("Damping"));
            ui.add(
                egui::Slider::new(&mut limits.min_polar, 0.0..=std::f32::consts::PI)
                    .text("Min polar")
                    .suffix(" rad"),
            );
            ui.add(
                egui::Slider::new(&mut limits.max_polar, 0.0..=std::f32::consts::PI)
                    .text("Max polar")
                    .suffix(" rad"),
            );
            ui.add(
                egui::Slider::new(&mut limits.min_distance, 0.5..=10.0)
                    .text("Min distance")
                    .suffix(" m"),
            );
            ui.add(
                egui::Slider::new(&mut limits.max_distance, 5.0..=100.0)
                    .text("Max distance")
                    .suffix(" m"),
            );
            limits.max_polar = limits.max_polar.max(limits.min_polar);
            limits.max_distance = limits.max_distance.max(limits.min_distance);
        });
    } else {
        ui.label("No camera");
    }

    ui.separator();

    ui.collapsing("Follow", |ui| {
        let settings = &mut *camera.settings;
        ui.add(egui::Slider::new(&mut settings.follow_speed, 0.5..=20.0).text("Follow speed"));
        ui.add(
            egui::Slider::new(&mut settings.min_camera_height, 0.0..=5.0)
                .text("Min camera height")
                .suffix(" m"),
        );
        ui.add(
            egui::Slider::new(&mut settings.min_target_height, 0.0..=3.0)
                .text("Min target height")
                .suffix(" m"),
        );
        ui.add(
            egui::Slider::new(&mut settings.detach_threshold, 0.0..=2.0)
                .text("Detach threshold")
                .suffix(" m"),
        );
    });

    ui.collapsing("Occlusion", |ui| {
        let occlusion = &mut *camera.occlusion;
        ui.add(egui::Slider::new(&mut occlusion.fade_opacity, 0.0..=1.0).text("Fade opacity"));
        ui.add(egui::Slider::new(&mut occlusion.fade_speed, 0.5..=20.0).text("Fade speed"));
    });

    ui.collapsing("Sun light", |ui| {
        let light = &mut *camera.light;
        super::vec3_sliders(ui, "Offset:", &mut light.offset, -30.0..=30.0);
        super::vec3_sliders(ui, "Target offset:", &mut light.target_offset, -10.0..=10.0);
        ui.add(egui::Slider::new(&mut light.follow_lerp, 0.01..=1.0).text("Follow lerp"));
    });

    if let Some(rain) = camera.rain.as_deref_mut() {
        ui.collapsing("Rain", |ui| {
            ui.add(egui::Slider::new(&mut rain.opacity, 0.0..=1.0).text("Opacity"));
            ui.add(egui::Slider::new(&mut rain.speed, 0.0..=3.0).text("Speed"));
            ui.add(
                egui::Slider::new(&mut rain.streak_width, 0.0005..=0.01)
                    .logarithmic(true)
                    .text("Streak width"),
            );
            ui.add(egui::Slider::new(&mut rain.streak_length, 0.05..=2.0).text("Streak length"));
            ui.add(egui::Slider::new(&mut rain.splash_scale, 0.01..=0.5).text("Splash size"));
            ui.add(
                egui::Slider::new(&mut rain.splash_duration, 0.5..=10.0)
                    .text("Splash duration")
                    .suffix(" s"),
            );
        });
    }
}
