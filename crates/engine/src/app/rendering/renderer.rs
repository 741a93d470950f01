use std::sync::Arc;

use pixels::{Error, Pixels, SurfaceTexture};
use winit::window::Window;

use crate::app::Camera2D;
use crate::sim::{ActorView, CollisionGrid, Facing, GridPoint, Vec2, World};

use super::{screen_to_world_px, world_to_screen_px, Viewport};

const CLEAR_COLOR: [u8; 4] = [20, 22, 28, 255];
const FLOOR_COLOR: [u8; 4] = [38, 42, 50, 255];
const WALL_COLOR: [u8; 4] = [96, 102, 118, 255];
const FACING_MARK_COLOR: [u8; 4] = [250, 250, 250, 255];
const HEALTH_BACK_COLOR: [u8; 4] = [60, 20, 20, 255];
const HEALTH_FILL_COLOR: [u8; 4] = [90, 220, 110, 255];
const DEAD_ACTOR_COLOR: [u8; 4] = [70, 70, 70, 255];
const TEAM_COLORS: [[u8; 4]; 4] = [
    [80, 170, 255, 255],
    [240, 90, 80, 255],
    [240, 200, 70, 255],
    [170, 110, 230, 255],
];
const FACING_MARK_HALF_SIZE_PX: i32 = 2;
const HEALTH_BAR_HEIGHT_PX: i32 = 3;
const HEALTH_BAR_GAP_PX: i32 = 3;

/// Debug renderer: tiles as flat cells, actors as team-colored boxes with a
/// facing mark and a health bar.
pub struct Renderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    viewport: Viewport,
}

impl Renderer {
    pub fn new(window: Arc<Window>) -> Result<Self, Error> {
        let size = window.inner_size();
        let pixels = Self::build_pixels(Arc::clone(&window), size.width, size.height)?;
        Ok(Self {
            window,
            pixels,
            viewport: Viewport {
                width: size.width,
                height: size.height,
            },
        })
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels = Self::build_pixels(Arc::clone(&self.window), width, height)?;
        self.viewport = Viewport { width, height };
        Ok(())
    }

    fn build_pixels(
        window: Arc<Window>,
        width: u32,
        height: u32,
    ) -> Result<Pixels<'static>, Error> {
        let surface = SurfaceTexture::new(width, height, window);
        Pixels::new(width, height, surface)
    }

    /// Draws `world` with actors blended `interpolation` of the way from
    /// their previous to their current position.
    pub fn render_world(
        &mut self,
        world: &World,
        camera: &Camera2D,
        interpolation: f32,
    ) -> Result<(), Error> {
        let viewport = self.viewport;
        let frame = self.pixels.frame_mut();
        for pixel in frame.chunks_exact_mut(4) {
            pixel.copy_from_slice(&CLEAR_COLOR);
        }

        if let Some(grid) = world.grid() {
            draw_grid(frame, viewport, grid, camera);
        }
        for view in world.render_views(interpolation) {
            draw_actor(frame, viewport, &view, camera);
        }

        self.pixels.render()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ScreenRectPx {
    left: i32,
    top: i32,
    right: i32,
    bottom: i32,
}

fn draw_grid(frame: &mut [u8], viewport: Viewport, grid: &CollisionGrid, camera: &Camera2D) {
    let Some((first, last)) = visible_cell_range(grid, camera, viewport) else {
        return;
    };
    for row in first.row..=last.row {
        for col in first.col..=last.col {
            let cell = GridPoint::new(col, row);
            let bounds = grid.cell_bounds(cell);
            let rect = screen_rect(
                Vec2::new(bounds.min_x(), bounds.min_y()),
                Vec2::new(bounds.max_x(), bounds.max_y()),
                camera,
                viewport,
            );
            let color = if grid.is_blocking(cell) {
                WALL_COLOR
            } else {
                FLOOR_COLOR
            };
            fill_rect_clipped(frame, viewport, rect, color);
        }
    }
}

/// Cells overlapping the viewport, clamped to the grid.
fn visible_cell_range(
    grid: &CollisionGrid,
    camera: &Camera2D,
    viewport: Viewport,
) -> Option<(GridPoint, GridPoint)> {
    let top_left = grid.world_to_cell(screen_to_world_px((0.0, 0.0), camera, viewport));
    let bottom_right = grid.world_to_cell(screen_to_world_px(
        (viewport.width as f32, viewport.height as f32),
        camera,
        viewport,
    ));
    let max_col = grid.cols() as i32 - 1;
    let max_row = grid.rows() as i32 - 1;
    let first = GridPoint::new(top_left.col.max(0), top_left.row.max(0));
    let last = GridPoint::new(bottom_right.col.min(max_col), bottom_right.row.min(max_row));
    if first.col > last.col || first.row > last.row {
        return None;
    }
    Some((first, last))
}

fn draw_actor(frame: &mut [u8], viewport: Viewport, view: &ActorView, camera: &Camera2D) {
    let rect = screen_rect(
        view.position - view.half_extents,
        view.position + view.half_extents,
        camera,
        viewport,
    );
    let color = if view.health_ratio > 0.0 {
        team_color(view.team)
    } else {
        DEAD_ACTOR_COLOR
    };
    fill_rect_clipped(frame, viewport, rect, color);

    let (cx, cy) = world_to_screen_px(view.position, camera, viewport);
    let (dx, dy) = facing_offset(view.facing);
    let half_w = (rect.right - rect.left) / 2;
    let half_h = (rect.bottom - rect.top) / 2;
    let mark_x = cx + dx * (half_w - FACING_MARK_HALF_SIZE_PX);
    let mark_y = cy + dy * (half_h - FACING_MARK_HALF_SIZE_PX);
    fill_rect_clipped(
        frame,
        viewport,
        rect_around(mark_x, mark_y, FACING_MARK_HALF_SIZE_PX),
        FACING_MARK_COLOR,
    );

    let bar_top = rect.top - HEALTH_BAR_GAP_PX - HEALTH_BAR_HEIGHT_PX;
    let bar = ScreenRectPx {
        left: rect.left,
        top: bar_top,
        right: rect.right,
        bottom: bar_top + HEALTH_BAR_HEIGHT_PX - 1,
    };
    fill_rect_clipped(frame, viewport, bar, HEALTH_BACK_COLOR);
    let filled = health_bar_fill(bar, view.health_ratio);
    if let Some(filled) = filled {
        fill_rect_clipped(frame, viewport, filled, HEALTH_FILL_COLOR);
    }
}

fn screen_rect(min: Vec2, max: Vec2, camera: &Camera2D, viewport: Viewport) -> ScreenRectPx {
    let (left, top) = world_to_screen_px(min, camera, viewport);
    let (right, bottom) = world_to_screen_px(max, camera, viewport);
    ScreenRectPx {
        left,
        top,
        right: right - 1,
        bottom: bottom - 1,
    }
}

fn rect_around(cx: i32, cy: i32, half_size: i32) -> ScreenRectPx {
    ScreenRectPx {
        left: cx - half_size,
        top: cy - half_size,
        right: cx + half_size,
        bottom: cy + half_size,
    }
}

fn health_bar_fill(bar: ScreenRectPx, ratio: f32) -> Option<ScreenRectPx> {
    let width = bar.right - bar.left + 1;
    let filled = (width as f32 * ratio.clamp(0.0, 1.0)).round() as i32;
    (filled > 0).then_some(ScreenRectPx {
        right: bar.left + filled - 1,
        ..bar
    })
}

fn team_color(team: u32) -> [u8; 4] {
    TEAM_COLORS[team as usize % TEAM_COLORS.len()]
}

fn facing_offset(facing: Facing) -> (i32, i32) {
    match facing {
        Facing::Up => (0, -1),
        Facing::Down => (0, 1),
        Facing::Left => (-1, 0),
        Facing::Right => (1, 0),
    }
}

fn fill_rect_clipped(frame: &mut [u8], viewport: Viewport, rect: ScreenRectPx, color: [u8; 4]) {
    let left = rect.left.max(0);
    let top = rect.top.max(0);
    let right = rect.right.min(viewport.width as i32 - 1);
    let bottom = rect.bottom.min(viewport.height as i32 - 1);
    for y in top..=bottom {
        for x in left..=right {
            write_pixel_rgba_clipped(frame, viewport.width as usize, x, y, color);
        }
    }
}

fn write_pixel_rgba_clipped(frame: &mut [u8], width: usize, x: i32, y: i32, color: [u8; 4]) {
    if x < 0 || y < 0 {
        return;
    }
    let x = x as usize;
    let y = y as usize;
    let Some(pixel_offset) = y.checked_mul(width).and_then(|row| row.checked_add(x)) else {
        return;
    };
    let Some(byte_offset) = pixel_offset.checked_mul(4) else {
        return;
    };
    let Some(end) = byte_offset.checked_add(4) else {
        return;
    };
    if end > frame.len() {
        return;
    }
    frame[byte_offset..end].copy_from_slice(&color);
}
