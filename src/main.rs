use anyhow::Result;
use hmd_config::{AppConfig, ConfigStore};
use hmd_imu::SensorClient;
use hmd_input::{
    AdjustBinding, AdjustTarget, AdjustmentRouter, GamepadSource, NoController, NoGamepad,
    PositionalController,
};
use hmd_locomotion::{compute_view, ControllerOffset, HeadModelOffset, MoveDirection, MoveSource, Player};
use hmd_render::{render_frame, FrameParams, GridMode, PostProcess, RenderDevice, WgpuRenderDevice};
use hmd_scene::lod::LodController;
use hmd_scene::{Aabb, Scene, SceneSource, SlabRoomSource};
use hmd_stereo::{SnapshotToggle, StereoMode, StereoViewConfig, Viewport};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{DeviceEvent, DeviceId, ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

/// How long a status line stays current.
const MESSAGE_DURATION: Duration = Duration::from_secs(4);
/// Startup advisories (missing devices) linger longer.
const STARTUP_MESSAGE_DURATION: Duration = Duration::from_secs(10);

/// Timed status line. Without on-screen text rendering the line goes to the
/// log, deduplicated while a held key repeats the same message shape.
struct Advisories {
    current: Option<(String, Instant)>,
}

/// Message shape: the text up to its first embedded number, so successive
/// updates of one adjustment ("IPD 64.0 mm", "IPD 64.2 mm") share a shape.
fn message_shape(text: &str) -> &str {
    match text.find(|c: char| c.is_ascii_digit()) {
        Some(index) => &text[..index],
        None => text,
    }
}

impl Advisories {
    fn new() -> Self {
        Self { current: None }
    }

    /// Record a status line; returns whether it was logged (a new shape)
    /// rather than swallowed as a repeat of the current one.
    fn show(&mut self, text: String, duration: Duration) -> bool {
        let changed = self
            .current
            .as_ref()
            .map_or(true, |(current, _)| message_shape(current) != message_shape(&text));
        if changed {
            info!("{text}");
        }
        self.current = Some((text, Instant::now() + duration));
        changed
    }

    fn tick(&mut self, now: Instant) {
        if let Some((_, until)) = &self.current {
            if now >= *until {
                self.current = None;
            }
        }
    }
}

/// Frame counter folded into an FPS reading once per wall-clock second.
struct FpsCounter {
    frames: u32,
    window_start: Instant,
    fps: u32,
}

impl FpsCounter {
    fn new() -> Self {
        Self {
            frames: 0,
            window_start: Instant::now(),
            fps: 60,
        }
    }

    /// Count one frame; returns the new reading at each second boundary.
    fn tick(&mut self, now: Instant) -> Option<u32> {
        self.frames += 1;
        if now.duration_since(self.window_start) >= Duration::from_secs(1) {
            self.fps = self.frames;
            self.frames = 0;
            self.window_start = now;
            Some(self.fps)
        } else {
            None
        }
    }
}

struct AppState {
    render: WgpuRenderDevice,
    view_config: StereoViewConfig,
    scene: Scene,
    collision: Vec<Aabb>,
    ground: Vec<Aabb>,
    scene_source: SlabRoomSource,
    lod: LodController,
    player: Player,
    head_model: HeadModelOffset,
    router: AdjustmentRouter,
    gamepad: Box<dyn GamepadSource>,
    controller: Box<dyn PositionalController>,
    post: PostProcess,
    grid: GridMode,
    fast: bool,
    distortion_color_visible: bool,
    fps: FpsCounter,
    messages: Advisories,
    last_frame: Instant,
}

impl AppState {
    /// Swap in the scene at `path`, fully clearing first. On failure the
    /// previous scene stays and a timed message reports the error.
    fn load_scene(&mut self, path: &std::path::Path) {
        match self.scene_source.load(path) {
            Ok(loaded) => {
                self.scene.replace(loaded.models);
                self.collision = loaded.collision;
                self.ground = loaded.ground;
                info!(path = %path.display(), "scene loaded");
            }
            Err(e) => {
                self.messages
                    .show(format!("Scene load failed: {e}"), MESSAGE_DURATION);
            }
        }
    }
}

struct App {
    config: AppConfig,
    store: ConfigStore,
    sensor: SensorClient,
    window: Option<Arc<Window>>,
    state: Option<AppState>,
}

impl App {
    fn new(config: AppConfig, store: ConfigStore, sensor: SensorClient) -> Self {
        Self {
            config,
            store,
            sensor,
            window: None,
            state: None,
        }
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, event: winit::event::KeyEvent) {
        let Some(state) = self.state.as_mut() else {
            return;
        };
        let PhysicalKey::Code(code) = event.physical_key else {
            return;
        };
        let pressed = event.state == ElementState::Pressed;

        if let Some((direction, source)) = move_key(code) {
            state.player.on_move_key(direction, source, pressed);
            return;
        }
        if let Some(binding) = adjust_binding(code) {
            if pressed {
                state.router.press(binding);
            } else {
                state.router.release(binding);
            }
            return;
        }

        if !pressed || event.repeat {
            return;
        }
        match code {
            KeyCode::Escape => event_loop.exit(),
            KeyCode::KeyR => {
                self.sensor.reset();
                state.messages.show("Sensor yaw recentered".into(), MESSAGE_DURATION);
            }
            KeyCode::KeyT => {
                state.player.reset_position();
                state.messages.show("Position reset".into(), MESSAGE_DURATION);
            }
            KeyCode::Tab => {
                let message = match state.view_config.toggle_saved() {
                    SnapshotToggle::Saved => "View settings saved".to_string(),
                    SnapshotToggle::Restored(_) => format!(
                        "View settings restored (FOV {:.1} deg)",
                        state.view_config.y_fov_degrees()
                    ),
                };
                state.messages.show(message, MESSAGE_DURATION);
            }
            KeyCode::KeyB => {
                // Toggle between the fit point for this panel and no fit.
                let off = state.view_config.distortion_fit_point() != (0.0, 0.0);
                if off {
                    state.view_config.set_distortion_fit_point(0.0, 0.0);
                } else if state.view_config.hmd().is_wide() {
                    state.view_config.set_distortion_fit_point(-1.0, 0.0);
                } else {
                    state.view_config.set_distortion_fit_point(0.0, 1.0);
                }
                state.messages.show(
                    format!("Distortion scale {:.3}", state.view_config.distortion_scale()),
                    MESSAGE_DURATION,
                );
            }
            KeyCode::KeyV => {
                state.distortion_color_visible = !state.distortion_color_visible;
                let color = if state.distortion_color_visible {
                    [0.0, 0.25, 0.5, 1.0]
                } else {
                    [0.0, 0.0, 0.0, 1.0]
                };
                state.render.set_distortion_clear_color(color);
            }
            KeyCode::KeyC => {
                state.scene.toggle_collision_bounds();
            }
            KeyCode::KeyG => {
                state.grid = state.grid.cycled();
                state
                    .messages
                    .show(format!("Grid {:?}", state.grid), MESSAGE_DURATION);
            }
            KeyCode::F1 => {
                state.view_config.set_stereo_mode(StereoMode::None);
                state.post = PostProcess::None;
                state.messages.show("Mono, no post-processing".into(), MESSAGE_DURATION);
            }
            KeyCode::F2 => {
                state.view_config.set_stereo_mode(StereoMode::LeftRight);
                state.post = PostProcess::None;
                state.messages.show("Stereo, no distortion".into(), MESSAGE_DURATION);
            }
            KeyCode::F3 => {
                state.view_config.set_stereo_mode(StereoMode::LeftRight);
                state.post = PostProcess::Distortion;
                state.messages.show("Stereo with distortion".into(), MESSAGE_DURATION);
            }
            KeyCode::KeyN => {
                if let Some(path) = state.lod.raise_level().map(|p| p.to_path_buf()) {
                    state.load_scene(&path);
                    state.messages.show(
                        format!("Detail raised to level {}", state.lod.current_index()),
                        MESSAGE_DURATION,
                    );
                }
            }
            KeyCode::KeyM => {
                if let Some(path) = state.lod.drop_level().map(|p| p.to_path_buf()) {
                    state.load_scene(&path);
                    state.messages.show(
                        format!("Detail dropped to level {}", state.lod.current_index()),
                        MESSAGE_DURATION,
                    );
                }
            }
            _ => {}
        }
    }

    fn tick_frame(&mut self) {
        let Some(state) = self.state.as_mut() else {
            return;
        };
        let now = Instant::now();
        let dt = now
            .duration_since(state.last_frame)
            .as_secs_f32()
            .min(0.1);
        state.last_frame = now;

        // (1) Held-key adjustments.
        if let Some(message) = state
            .router
            .tick(dt, &mut state.view_config, &mut state.player)
        {
            state.messages.show(message, MESSAGE_DURATION);
        }

        // (2) Latest sensor orientation, non-blocking.
        if self.sensor.is_attached() {
            let (yaw, pitch, roll) = self.sensor.orientation().yaw_pitch_roll();
            state.player.apply_sensor(yaw, pitch, roll);
        }

        // (3) Locomotion.
        match state.gamepad.poll() {
            Ok(Some(pad)) => {
                state
                    .player
                    .on_gamepad(pad.left_x, pad.left_y, pad.right_x, pad.right_y);
            }
            Ok(None) => {}
            Err(e) => warn!(?e, "gamepad poll failed"),
        }
        state.player.tick(
            dt,
            &state.collision,
            &state.ground,
            state.fast,
            self.sensor.is_attached(),
        );

        // (4) View composition, once per frame.
        let controller_offset = match state.controller.poll() {
            Ok(Some(delta)) => Some(ControllerOffset::deadzone_filtered(delta.z, delta.x, delta.y)),
            Ok(None) => None,
            Err(e) => {
                warn!(?e, "positional tracker poll failed");
                None
            }
        };
        let view = compute_view(&state.player, &state.head_model, controller_offset);

        // (5)-(6) Eye passes, present, flush.
        let scale = match state.post {
            PostProcess::Distortion => state.view_config.distortion_scale(),
            PostProcess::None => 1.0,
        };
        state.render.set_scene_render_scale(scale);
        let frame = FrameParams {
            scene: &state.scene,
            view,
            post: state.post,
            grid: state.grid,
        };
        if let Err(e) = render_frame(&mut state.render, &state.view_config, &frame) {
            warn!(?e, "frame render failed");
        }

        state.messages.tick(now);
        if let Some(fps) = state.fps.tick(now) {
            tracing::debug!(fps, "frame rate");
        }
        if state.lod.on_frame(state.fps.fps) {
            if let Some(path) = state.lod.drop_level().map(|p| p.to_path_buf()) {
                state.load_scene(&path);
                state.messages.show(
                    format!(
                        "Sustained low frame rate, detail dropped to level {}",
                        state.lod.current_index()
                    ),
                    MESSAGE_DURATION,
                );
            }
        }

        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let (width, height) = self.config.window_size;
        let attrs = Window::default_attributes()
            .with_title("HMD World")
            .with_inner_size(PhysicalSize::new(width, height));
        let window = Arc::new(event_loop.create_window(attrs).expect("Failed to create window"));
        self.window = Some(window.clone());

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
        let surface = instance
            .create_surface(window.clone())
            .expect("Failed to create surface");

        let (device, queue, adapter) = pollster::block_on(async {
            let adapter = instance
                .request_adapter(&wgpu::RequestAdapterOptions {
                    power_preference: wgpu::PowerPreference::HighPerformance,
                    compatible_surface: Some(&surface),
                    force_fallback_adapter: false,
                })
                .await
                .expect("No suitable GPU adapter found");

            info!(name = adapter.get_info().name, "Using GPU");

            let (device, queue) = adapter
                .request_device(
                    &wgpu::DeviceDescriptor {
                        label: Some("hmd_world_device"),
                        required_features: wgpu::Features::empty(),
                        required_limits: wgpu::Limits::default(),
                        memory_hints: Default::default(),
                    },
                    None,
                )
                .await
                .expect("Failed to create device");

            (device, queue, adapter)
        });

        let win_size = window.inner_size();
        let surface_caps = surface.get_capabilities(&adapter);
        let format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .unwrap_or(surface_caps.formats[0]);

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: win_size.width,
            height: win_size.height,
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: wgpu::CompositeAlphaMode::Auto,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        let render = WgpuRenderDevice::new(device, queue, surface, surface_config);
        let view_config = StereoViewConfig::new(
            self.config.hmd.clone(),
            Viewport::new(0, 0, win_size.width, win_size.height),
        );

        let lod = LodController::discover(&self.config.scene_path);
        let mut state = AppState {
            render,
            view_config,
            scene: Scene::default(),
            collision: Vec::new(),
            ground: Vec::new(),
            scene_source: SlabRoomSource,
            lod,
            player: Player::new(),
            head_model: HeadModelOffset::default(),
            router: AdjustmentRouter::new(),
            gamepad: Box::new(NoGamepad),
            controller: Box::new(NoController),
            post: PostProcess::Distortion,
            grid: GridMode::Off,
            fast: false,
            distortion_color_visible: false,
            fps: FpsCounter::new(),
            messages: Advisories::new(),
            last_frame: Instant::now(),
        };

        let initial = state.lod.current().to_path_buf();
        state.load_scene(&initial);

        if !self.sensor.is_attached() {
            state.messages.show(
                "No motion sensor detected; head look falls back to mouse".into(),
                STARTUP_MESSAGE_DURATION,
            );
        }
        state.messages.show(
            format!(
                "FOV {:.1} deg, distortion scale {:.3}",
                state.view_config.y_fov_degrees(),
                state.view_config.distortion_scale()
            ),
            STARTUP_MESSAGE_DURATION,
        );

        self.state = Some(state);
        info!("Application initialized");
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                if let Err(e) = self.store.save(&self.config) {
                    error!(?e, "Failed to save config");
                }
                event_loop.exit();
            }

            WindowEvent::Resized(size) => {
                if size.width > 0 && size.height > 0 {
                    if let Some(state) = &mut self.state {
                        state.render.resize(size.width, size.height);
                        state
                            .view_config
                            .set_full_viewport(Viewport::new(0, 0, size.width, size.height));
                    }
                }
            }

            WindowEvent::ModifiersChanged(modifiers) => {
                let fast = modifiers.state().shift_key();
                if let Some(state) = &mut self.state {
                    state.fast = fast;
                    state.router.set_fast(fast);
                }
            }

            WindowEvent::KeyboardInput { event, .. } => {
                self.handle_key(event_loop, event);
            }

            WindowEvent::RedrawRequested => {
                self.tick_frame();
            }

            _ => {}
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            if let Some(state) = &mut self.state {
                state
                    .player
                    .on_look_delta(dx as f32, dy as f32, self.sensor.is_attached());
            }
        }
    }
}

fn move_key(code: KeyCode) -> Option<(MoveDirection, MoveSource)> {
    match code {
        KeyCode::KeyW => Some((MoveDirection::Forward, MoveSource::Keyboard)),
        KeyCode::KeyS => Some((MoveDirection::Back, MoveSource::Keyboard)),
        KeyCode::KeyA => Some((MoveDirection::Left, MoveSource::Keyboard)),
        KeyCode::KeyD => Some((MoveDirection::Right, MoveSource::Keyboard)),
        KeyCode::ArrowUp => Some((MoveDirection::Forward, MoveSource::Arrows)),
        KeyCode::ArrowDown => Some((MoveDirection::Back, MoveSource::Arrows)),
        KeyCode::ArrowLeft => Some((MoveDirection::Left, MoveSource::Arrows)),
        KeyCode::ArrowRight => Some((MoveDirection::Right, MoveSource::Arrows)),
        _ => None,
    }
}

fn adjust_binding(code: KeyCode) -> Option<AdjustBinding> {
    use AdjustTarget::*;
    Some(match code {
        // Widen the FOV by moving the eye toward the screen.
        KeyCode::BracketLeft => AdjustBinding::down(EyeToScreenDistance),
        KeyCode::BracketRight => AdjustBinding::up(EyeToScreenDistance),
        KeyCode::Insert => AdjustBinding::up(Ipd),
        KeyCode::Delete => AdjustBinding::down(Ipd),
        KeyCode::PageUp => AdjustBinding::up(AspectMultiplier),
        KeyCode::PageDown => AdjustBinding::down(AspectMultiplier),
        KeyCode::Equal => AdjustBinding::up(EyeHeight),
        KeyCode::Minus => AdjustBinding::down(EyeHeight),
        KeyCode::KeyY => AdjustBinding::up(DistortionK(0)),
        KeyCode::KeyH => AdjustBinding::down(DistortionK(0)),
        KeyCode::KeyU => AdjustBinding::up(DistortionK(1)),
        KeyCode::KeyJ => AdjustBinding::down(DistortionK(1)),
        KeyCode::KeyI => AdjustBinding::up(DistortionK(2)),
        KeyCode::KeyK => AdjustBinding::down(DistortionK(2)),
        KeyCode::KeyO => AdjustBinding::up(DistortionK(3)),
        KeyCode::KeyL => AdjustBinding::down(DistortionK(3)),
        _ => return None,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hmd_world=info,hmd_imu=info,hmd_render=info".into()),
        )
        .init();

    info!("HMD World starting");

    let store = ConfigStore::resolve(config_override())?;
    let config = store.load().unwrap_or_else(|e| {
        warn!(?e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    // No sensor driver is bound in this build; the client stays in its
    // degraded no-sensor state and look control falls back to the mouse.
    let sensor = SensorClient::absent();
    if !sensor.is_attached() {
        warn!("no motion sensor attached");
    }

    let event_loop = EventLoop::new()?;
    let mut app = App::new(config, store, sensor);
    event_loop.run_app(&mut app)?;

    Ok(())
}

/// Value of the `--config <path>` command-line flag, if given.
fn config_override() -> Option<std::path::PathBuf> {
    let mut args = std::env::args_os().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next().map(std::path::PathBuf::from);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn held_adjustment_updates_log_once_per_shape() {
        let mut messages = Advisories::new();
        assert!(messages.show("IPD 64.0 mm".into(), MESSAGE_DURATION));
        // Same adjustment, new value: current line updates, no new log.
        assert!(!messages.show("IPD 64.2 mm".into(), MESSAGE_DURATION));
        assert!(!messages.show("IPD 64.5 mm".into(), MESSAGE_DURATION));
        // Switching to a different adjustment logs again.
        assert!(messages.show("Eye height 1.60 m".into(), MESSAGE_DURATION));
    }

    #[test]
    fn expired_message_logs_again_on_reshow() {
        let mut messages = Advisories::new();
        assert!(messages.show("Position reset".into(), MESSAGE_DURATION));
        messages.tick(Instant::now() + MESSAGE_DURATION + Duration::from_secs(1));
        assert!(messages.show("Position reset".into(), MESSAGE_DURATION));
    }

    #[test]
    fn message_shape_splits_before_the_first_number() {
        assert_eq!(message_shape("K1 0.2400"), "K");
        assert_eq!(message_shape("Sensor yaw recentered"), "Sensor yaw recentered");
    }
}
