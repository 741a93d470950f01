use std::sync::Arc;
use std::time::{Duration, Instant};

use pixels::Error as PixelsError;
use thiserror::Error;
use tracing::{info, warn};
use winit::dpi::LogicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::WindowBuilder;

use crate::sim::{
    Drawable, FrameRequest, FrameScheduler, SimConfig, SimulationLoop, Steppable, World,
};

use super::input::InputCollector;
use super::metrics::{MetricsAccumulator, WorldSample};
use super::rendering::screen_to_world_px;
use super::{Camera2D, MetricsHandle, Renderer, Scene};

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    pub sim: SimConfig,
    pub camera_zoom: f32,
    pub metrics_log_interval: Duration,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            window_title: "tilesim".to_string(),
            window_width: 1280,
            window_height: 720,
            sim: SimConfig::default(),
            camera_zoom: 2.0,
            metrics_log_interval: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("failed to initialize renderer: {0}")]
    CreateRenderer(#[source] PixelsError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

pub fn run_app(config: LoopConfig, scene: Box<dyn Scene>) -> Result<(), AppError> {
    let metrics_handle = MetricsHandle::default();
    run_app_with_metrics(config, scene, metrics_handle)
}

pub fn run_app_with_metrics(
    config: LoopConfig,
    mut scene: Box<dyn Scene>,
    metrics_handle: MetricsHandle,
) -> Result<(), AppError> {
    let event_loop = EventLoop::new().map_err(AppError::CreateEventLoop)?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(config.window_title.clone())
            .with_inner_size(LogicalSize::new(
                config.window_width as f64,
                config.window_height as f64,
            ))
            .build(&event_loop)
            .map_err(AppError::CreateWindow)?,
    );
    let window_for_loop = Arc::clone(&window);
    let mut renderer = Renderer::new(window).map_err(AppError::CreateRenderer)?;

    event_loop.set_control_flow(ControlFlow::Poll);

    let metrics_log_interval =
        normalize_non_zero_duration(config.metrics_log_interval, Duration::from_secs(1));
    let mut world = World::new(config.sim.clone());
    scene.load(&mut world);
    info!(
        actor_count = world.actor_count(),
        has_grid = world.grid().is_some(),
        "scene_loaded"
    );

    let mut camera = Camera2D::default();
    camera.set_zoom_clamped(config.camera_zoom);
    if let Some(focus) = scene.camera_focus(&world) {
        camera.position = focus;
    }

    info!(
        target_tps = config.sim.target_tps,
        max_steps_per_frame = config.sim.step_bound(),
        min_frame_interval_ms = config.sim.min_frame_interval_ms,
        metrics_log_interval_ms = metrics_log_interval.as_millis() as u64,
        "loop_config"
    );

    let mut sim_loop = SimulationLoop::new(&config.sim, RedrawScheduler::default());
    let mut input_collector = InputCollector::default();
    let mut metrics_accumulator = MetricsAccumulator::new(metrics_log_interval);
    let mut last_applied_title: Option<String> = None;
    let loop_origin = Instant::now();
    let mut last_frame_instant = loop_origin;
    sim_loop.start();

    event_loop
        .run(move |event, window_target| match event {
            Event::WindowEvent { window_id, event } if window_id == window_for_loop.id() => {
                match event {
                    WindowEvent::CloseRequested => {
                        input_collector.mark_quit_requested();
                        info!(reason = "window_close", "shutdown_requested");
                        sim_loop.stop();
                        window_target.exit();
                    }
                    WindowEvent::Resized(new_size) => {
                        if let Err(error) = renderer.resize(new_size.width, new_size.height) {
                            warn!(error = %error, "renderer_resize_failed");
                            window_target.exit();
                        }
                    }
                    WindowEvent::ScaleFactorChanged { .. } => {
                        let size = window_for_loop.inner_size();
                        if let Err(error) = renderer.resize(size.width, size.height) {
                            warn!(error = %error, "renderer_resize_failed");
                            window_target.exit();
                        }
                    }
                    WindowEvent::CursorMoved { position, .. } => {
                        input_collector
                            .set_cursor_position_px(position.x as f32, position.y as f32);
                    }
                    WindowEvent::CursorLeft { .. } => {
                        input_collector.clear_cursor_position();
                    }
                    WindowEvent::MouseInput { state, button, .. } => {
                        input_collector.handle_mouse_input(button, state);
                    }
                    WindowEvent::KeyboardInput { event, .. } => {
                        input_collector.handle_keyboard_input(&event);
                        if input_collector.quit_requested {
                            info!(reason = "escape_key", "shutdown_requested");
                            sim_loop.stop();
                            window_target.exit();
                        }
                    }
                    WindowEvent::RedrawRequested => {
                        let now = Instant::now();
                        let raw_frame_dt = now.saturating_duration_since(last_frame_instant);
                        last_frame_instant = now;

                        let mut frame = HostFrame {
                            scene: scene.as_mut(),
                            world: &mut world,
                            input: &mut input_collector,
                            renderer: &mut renderer,
                            camera: &mut camera,
                            render_error: None,
                        };
                        let report = sim_loop
                            .advance_frame(now.saturating_duration_since(loop_origin), &mut frame);
                        if let Some(error) = frame.render_error.take() {
                            warn!(error = %error, "renderer_draw_failed");
                            sim_loop.stop();
                            window_target.exit();
                            return;
                        }
                        let Some(report) = report else {
                            return;
                        };

                        let next_title = scene.debug_title(&world);
                        if next_title != last_applied_title {
                            window_for_loop
                                .set_title(next_title.as_deref().unwrap_or(&config.window_title));
                            last_applied_title = next_title;
                        }

                        metrics_accumulator.record_frame(raw_frame_dt);
                        metrics_accumulator.record_ticks(report.steps);
                        if report.panicked {
                            metrics_accumulator.record_panic();
                        }
                        let sample = WorldSample {
                            tick: world.tick(),
                            actor_count: world.actor_count(),
                        };
                        if let Some(snapshot) =
                            metrics_accumulator.maybe_snapshot(now, report.fps, sample)
                        {
                            metrics_handle.publish(snapshot);
                            info!(
                                fps = snapshot.fps,
                                tps = snapshot.tps,
                                frame_time_ms = snapshot.frame_time_ms,
                                panic_count = snapshot.panic_count,
                                actor_count = snapshot.actor_count,
                                tick = snapshot.tick,
                                "loop_metrics"
                            );
                        }
                    }
                    _ => {}
                }
            }
            Event::AboutToWait => {
                if sim_loop.scheduler().has_pending() {
                    window_for_loop.request_redraw();
                }
            }
            Event::LoopExiting => {
                scene.unload(&mut world);
                info!(tick = world.tick(), "shutdown");
            }
            _ => {}
        })
        .map_err(AppError::EventLoopRun)
}

/// Frame scheduler backed by winit redraw requests: an outstanding request
/// turns into `request_redraw` the next time the event loop goes idle.
#[derive(Debug, Default)]
pub(crate) struct RedrawScheduler {
    next_id: u64,
    pending: Option<FrameRequest>,
}

impl RedrawScheduler {
    pub(crate) fn has_pending(&self) -> bool {
        self.pending.is_some()
    }
}

impl FrameScheduler for RedrawScheduler {
    fn request_frame(&mut self) -> FrameRequest {
        self.next_id = self.next_id.wrapping_add(1);
        let request = FrameRequest(self.next_id);
        self.pending = Some(request);
        request
    }

    fn cancel_frame(&mut self, request: FrameRequest) {
        if self.pending == Some(request) {
            self.pending = None;
        }
    }
}

/// Everything one host frame touches, borrowed for the duration of
/// `advance_frame`.
struct HostFrame<'a> {
    scene: &'a mut dyn Scene,
    world: &'a mut World,
    input: &'a mut InputCollector,
    renderer: &'a mut Renderer,
    camera: &'a mut Camera2D,
    render_error: Option<PixelsError>,
}

impl Steppable for HostFrame<'_> {
    fn step(&mut self, step: Duration) {
        let viewport = self.renderer.viewport();
        let pointer_world = self
            .input
            .cursor_position_px()
            .map(|cursor| screen_to_world_px(cursor, self.camera, viewport));
        let snapshot = self.input.snapshot_for_tick(pointer_world);
        self.scene.update(&snapshot, self.world);
        self.world.run_tick(step);
    }
}

impl Drawable for HostFrame<'_> {
    fn draw(&mut self, interpolation: f32) {
        if let Some(focus) = self.scene.camera_focus(self.world) {
            self.camera.position = focus;
        }
        if let Err(error) = self
            .renderer
            .render_world(self.world, self.camera, interpolation)
        {
            self.render_error = Some(error);
        }
    }
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}
