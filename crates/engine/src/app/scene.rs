use crate::sim::{Vec2, World};

use super::InputSnapshot;

pub const CAMERA_ZOOM_DEFAULT: f32 = 2.0;
pub const CAMERA_ZOOM_MIN: f32 = 0.5;
pub const CAMERA_ZOOM_MAX: f32 = 8.0;

/// View into the world: `position` is the world point drawn at the viewport
/// center, `zoom` is screen pixels per world pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera2D {
    pub position: Vec2,
    pub zoom: f32,
}

impl Default for Camera2D {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            zoom: CAMERA_ZOOM_DEFAULT,
        }
    }
}

impl Camera2D {
    pub fn effective_zoom(&self) -> f32 {
        clamp_camera_zoom(self.zoom)
    }

    pub fn set_zoom_clamped(&mut self, zoom: f32) {
        self.zoom = clamp_camera_zoom(zoom);
    }
}

fn clamp_camera_zoom(zoom: f32) -> f32 {
    if zoom.is_finite() {
        zoom.clamp(CAMERA_ZOOM_MIN, CAMERA_ZOOM_MAX)
    } else {
        CAMERA_ZOOM_DEFAULT
    }
}

/// Game-side driver hosted by [`crate::run_app`]. The host owns the
/// [`World`]; the scene populates it and feeds it input once per tick, before
/// the world itself steps.
pub trait Scene {
    fn load(&mut self, world: &mut World);
    fn update(&mut self, input: &InputSnapshot, world: &mut World);
    fn unload(&mut self, _world: &mut World) {}
    /// World point the camera should center on.
    fn camera_focus(&self, _world: &World) -> Option<Vec2> {
        None
    }
    fn debug_title(&self, _world: &World) -> Option<String> {
        None
    }
}
