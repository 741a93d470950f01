use crate::app::Camera2D;
use crate::sim::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// World pixels to screen pixels. Both spaces grow downward.
pub fn world_to_screen_px(world: Vec2, camera: &Camera2D, viewport: Viewport) -> (i32, i32) {
    let zoom = camera.effective_zoom();
    let x = (world.x - camera.position.x) * zoom + viewport.width as f32 * 0.5;
    let y = (world.y - camera.position.y) * zoom + viewport.height as f32 * 0.5;
    (x.round() as i32, y.round() as i32)
}

pub fn screen_to_world_px(screen: (f32, f32), camera: &Camera2D, viewport: Viewport) -> Vec2 {
    let zoom = camera.effective_zoom();
    Vec2::new(
        (screen.0 - viewport.width as f32 * 0.5) / zoom + camera.position.x,
        (screen.1 - viewport.height as f32 * 0.5) / zoom + camera.position.y,
    )
}
