use std::time::Instant;

use anyhow::{Context, Result};
use engine_core::{Console, Engine, FrameClock, FrameInput, FrameTick, InputSampler, Phase, Schedule};
use glam::Mat4;
use render_gl::device::{BufferMask, GlDevice, TextureTarget};
use render_gl::headless::HeadlessConfig;
use render_gl::texture::{make_checker_texture, GlTexture};
use render_gl::{
    Framebuffer, GlProgram, GlSetup, GpuCaps, HeadlessDisplay, ProgramParm, ProgramParmType, ProgramSource,
    RecordingDevice, SceneMatrices, SceneMatricesBuffer, ShaderEnvironment,
};
use vr_gui::components::{CarouselBrowser, CarouselSwipeHint, GazeTimer, Slider};
use vr_gui::GuiSys;

use crate::config::AppConfig;

pub mod browser_menu;
mod performance_monitor;
pub mod state;

pub use browser_menu::{BrowserMenu, CommandQueue};
pub use performance_monitor::PerformanceMonitor;
use state::InputScript;

const POSTER_COUNT: usize = 6;

const TEXTURED_VS: &str = r#"
in highp vec4 Position;
in highp vec2 TexCoord;
out highp vec2 oTexCoord;
void main()
{
	gl_Position = TransformVertex( Position );
	oTexCoord = TexCoord;
}
"#;

const TEXTURED_FS: &str = r#"
uniform sampler2D Texture0;
uniform lowp vec4 UniformColor;
in highp vec2 oTexCoord;
void main()
{
	gl_FragColor = UniformColor * texture2D( Texture0, oTexCoord );
}
"#;

const UNTEXTURED_VS: &str = r#"
in highp vec4 Position;
void main()
{
	gl_Position = TransformVertex( Position );
}
"#;

const UNTEXTURED_FS: &str = r#"
uniform lowp vec4 UniformColor;
void main()
{
	gl_FragColor = UniformColor;
}
"#;

/// Everything the per-frame systems touch
pub struct ShellState {
    pub config: AppConfig,
    pub dev: RecordingDevice,
    pub caps: GpuCaps,
    pub eye_buffers: Framebuffer,
    pub textured: GlProgram,
    pub untextured: GlProgram,
    pub scene: SceneMatricesBuffer,
    pub posters: Vec<GlTexture>,
    pub gui: GuiSys,
    pub browser: BrowserMenu,
    pub sampler: InputSampler,
    pub script: InputScript,
    pub input: FrameInput,
    pub commands: CommandQueue,
    pub console: Console<ShellState>,
    pub monitor: PerformanceMonitor,
    pub playing: bool,
    /// Seconds into the movie
    pub playhead: f32,
    pub controls_hidden: bool,
    frame_start: Option<Instant>,
    draws: usize,
    last_report: f64,
}

impl ShellState {
    fn new(config: AppConfig) -> Result<Self> {
        let mut dev = RecordingDevice::new(&config.graphics.extensions);
        let caps = GpuCaps::query(&mut dev);
        tracing::info!(?caps, "gpu capabilities");

        let eye_buffers =
            Framebuffer::new(&mut dev, &caps, config.framebuffer_desc()).context("creating eye buffers")?;
        tracing::info!(
            strategy = ?eye_buffers.strategy(),
            length = eye_buffers.swap_chain_length(),
            "eye buffers ready"
        );

        let env = ShaderEnvironment::new(config.graphics.use_multiview);
        let textured = GlProgram::build_or_empty(
            &mut dev,
            &env,
            &ProgramSource::new(TEXTURED_VS, TEXTURED_FS),
            &[
                ProgramParm::new("UniformColor", ProgramParmType::FloatVector4),
                ProgramParm::new("Texture0", ProgramParmType::TextureSampled),
            ],
            config.shader.glsl_version,
            config.shader.abort_on_error,
        );
        let untextured = GlProgram::build_or_empty(
            &mut dev,
            &env,
            &ProgramSource::new(UNTEXTURED_VS, UNTEXTURED_FS),
            &[ProgramParm::new("UniformColor", ProgramParmType::FloatVector4)],
            config.shader.glsl_version,
            config.shader.abort_on_error,
        );
        let scene = SceneMatricesBuffer::new(&mut dev).context("creating scene matrices buffer")?;

        let mut posters = Vec::with_capacity(POSTER_COUNT);
        for i in 0..POSTER_COUNT {
            let texture = make_checker_texture(&mut dev, 64, 64).with_context(|| format!("creating poster {i}"))?;
            posters.push(texture);
        }
        let named: Vec<_> = posters
            .iter()
            .enumerate()
            .map(|(i, t)| (format!("Poster {}", i + 1), t.id))
            .collect();

        let commands = CommandQueue::default();
        let mut gui = GuiSys::new();
        let browser = browser_menu::build(
            &mut gui,
            &named,
            config.gui.fade_time,
            config.gui.menu_distance,
            &commands,
        );

        let mut console = Console::new();
        register_commands(&mut console)?;

        let mut state = Self {
            sampler: InputSampler::new(config.gui.swipe_distance),
            script: InputScript::new(config.gui.menu_distance),
            monitor: PerformanceMonitor::new(config.run.hz),
            config,
            dev,
            caps,
            eye_buffers,
            textured,
            untextured,
            scene,
            posters,
            gui,
            browser,
            input: FrameInput::default(),
            commands,
            console,
            playing: false,
            playhead: 0.0,
            controls_hidden: false,
            frame_start: None,
            draws: 0,
            last_report: 0.0,
        };
        if !state.config.gui.show_swipe_hints {
            cmd_show_hints(&mut state, "0");
        }
        Ok(state)
    }

    /// Run every queued console command
    fn run_commands(&mut self) {
        let queued: Vec<String> = self.commands.borrow_mut().drain(..).collect();
        if queued.is_empty() {
            return;
        }
        let console = std::mem::take(&mut self.console);
        for command in &queued {
            if let Err(err) = console.execute(self, command) {
                tracing::warn!("{err}");
            }
        }
        self.console = console;
    }

    fn set_slider_value(&mut self, value: f32) {
        self.gui
            .manager_mut()
            .with_component::<Slider, _>(self.browser.seek_bar, |slider, mgr| slider.set_value(mgr, value));
    }

    fn update_controls(&mut self) {
        let now = self.input.real_time;
        let mgr = self.gui.manager_mut();
        let Some(timer) = mgr.component::<GazeTimer>(self.browser.controls) else {
            return;
        };
        let hide = !timer.is_focused() && now - timer.last_gaze_time() > browser_menu::CONTROLS_TIMEOUT;
        if hide == self.controls_hidden {
            return;
        }
        self.controls_hidden = hide;
        for handle in [self.browser.seek_bar, self.browser.play_button] {
            if let Some(obj) = mgr.get_mut(handle) {
                obj.set_visible(!hide);
            }
        }
        tracing::debug!(hidden = hide, "playback controls");
    }

    fn focused_name(&self) -> Option<String> {
        let menu = self.gui.menu(self.browser.key)?;
        let focused = menu.focused()?;
        self.gui.manager().get(focused).map(|o| o.name().to_string())
    }

    /// Release every GPU object; returns how many the device still holds
    fn release_gpu(&mut self) -> usize {
        self.eye_buffers.destroy(&mut self.dev);
        self.textured.free(&mut self.dev);
        self.untextured.free(&mut self.dev);
        self.scene.destroy(&mut self.dev);
        for texture in self.posters.drain(..) {
            texture.destroy(&mut self.dev);
        }
        self.dev.live_objects()
    }
}

fn register_commands(console: &mut Console<ShellState>) -> Result<()> {
    console.register("openMenu", cmd_open_menu)?;
    console.register("closeMenu", cmd_close_menu)?;
    console.register("showHints", cmd_show_hints)?;
    console.register("seek", cmd_seek)?;
    console.register("togglePlay", cmd_toggle_play)?;
    console.register("stats", cmd_stats)?;
    console.register("print", engine_core::console::debug_print)?;
    Ok(())
}

fn cmd_open_menu(s: &mut ShellState, parms: &str) {
    s.gui.open_menu(parms.trim());
}

fn cmd_close_menu(s: &mut ShellState, parms: &str) {
    s.gui.close_menu(parms.trim());
}

fn cmd_show_hints(s: &mut ShellState, parms: &str) {
    let show = !matches!(parms.trim(), "0" | "false" | "off");
    let mgr = s.gui.manager_mut();
    for handle in &s.browser.hints {
        if let Some(hint) = mgr.component_mut::<CarouselSwipeHint>(*handle) {
            hint.set_show_hints(show);
        }
    }
    tracing::info!(show, "swipe hints");
}

fn cmd_seek(s: &mut ShellState, parms: &str) {
    match parms.trim().parse::<f32>() {
        Ok(value) => {
            s.playhead = value.clamp(0.0, browser_menu::MOVIE_LENGTH);
            s.set_slider_value(s.playhead);
            tracing::info!(playhead = s.playhead, "seek");
        }
        Err(err) => tracing::warn!("seek: bad position '{parms}': {err}"),
    }
}

fn cmd_toggle_play(s: &mut ShellState, _parms: &str) {
    s.playing = !s.playing;
    tracing::info!(playing = s.playing, playhead = s.playhead, "play state");
}

fn cmd_stats(s: &mut ShellState, _parms: &str) {
    s.monitor.update_stats();
    tracing::info!("\n{}", s.monitor.overlay_text());
}

fn sample_input(s: &mut ShellState, tick: &FrameTick) {
    s.frame_start = Some(Instant::now());
    let raw = s.script.raw_input(tick.frame);
    s.input = s.sampler.sample(&raw, tick);
}

fn dispatch_keys(s: &mut ShellState, _tick: &FrameTick) {
    for key in &s.input.key_events {
        if !s.gui.on_key_event(key) {
            tracing::debug!(?key, "key not consumed by any menu");
        }
    }
}

fn update_gui(s: &mut ShellState, _tick: &FrameTick) {
    s.gui.frame(&s.input);
}

fn update_app(s: &mut ShellState, _tick: &FrameTick) {
    s.run_commands();

    if s.playing {
        s.playhead += s.input.delta_seconds;
        if s.playhead >= browser_menu::MOVIE_LENGTH {
            s.playhead = browser_menu::MOVIE_LENGTH;
            s.playing = false;
        }
        s.set_slider_value(s.playhead);
    }

    s.update_controls();

    if let Some(carousel) = s.gui.manager_mut().component_mut::<CarouselBrowser>(s.browser.carousel) {
        if carousel.select_pressed() {
            tracing::info!(selection = ?carousel.selection(), "poster selected");
            carousel.clear_select_pressed();
        }
    }
}

fn begin_eye_pass(s: &mut ShellState, _tick: &FrameTick) {
    let (w, h) = (s.eye_buffers.width(), s.eye_buffers.height());
    s.eye_buffers.bind(&mut s.dev);
    s.dev.viewport(0, 0, w, h);
    s.dev.scissor(0, 0, w, h);
    s.dev.clear_color([0.0, 0.0, 0.0, 1.0]);
    s.dev.clear(BufferMask::COLOR | BufferMask::DEPTH);

    let projection = Mat4::perspective_rh_gl(90f32.to_radians(), w as f32 / h.max(1) as f32, 0.1, 100.0);
    s.scene
        .update(&mut s.dev, &SceneMatrices::new([Mat4::IDENTITY; 2], [projection; 2]));
}

fn draw_gui(s: &mut ShellState, _tick: &FrameTick) {
    let ShellState {
        dev,
        gui,
        textured,
        untextured,
        scene,
        draws,
        ..
    } = s;
    *draws = 0;
    for surface in gui.draw_list() {
        if surface.color.w <= 0.0 {
            continue;
        }
        let program = if surface.texture.is_some() { &*textured } else { &*untextured };
        if !program.is_valid() {
            continue;
        }
        dev.use_program(program.program());
        scene.bind(dev, program);
        dev.bind_texture(TextureTarget::Texture2D, surface.texture);
        *draws += 1;
    }
    dev.bind_texture(TextureTarget::Texture2D, None);
    dev.use_program(None);
}

fn present(s: &mut ShellState, tick: &FrameTick) {
    s.eye_buffers.resolve(&mut s.dev);
    s.eye_buffers.advance();
    let calls = s.dev.take_calls();
    tracing::trace!(frame = tick.frame, calls = calls.len(), draws = s.draws, "frame submitted");

    let cpu_ms = s
        .frame_start
        .take()
        .map_or(0.0, |start| start.elapsed().as_secs_f32() * 1000.0);
    s.monitor.add_frame(cpu_ms, s.draws);

    if tick.real_time - s.last_report >= 1.0 {
        s.last_report = tick.real_time;
        let open = s.gui.menu(s.browser.key).map_or(0, |m| usize::from(!m.is_closed_or_closing()));
        let focused = s.focused_name();
        s.monitor.update_stats();
        s.monitor.update_gui_stats(open, focused);
        s.monitor.report();
    }
}

fn schedule() -> Schedule<ShellState> {
    let mut schedule = Schedule::new();
    schedule
        .add(Phase::InputSample, sample_input)
        .add(Phase::EventDispatch, dispatch_keys)
        .add(Phase::EventDispatch, update_gui)
        .add(Phase::ComponentUpdate, update_app)
        .add(Phase::SceneRecord, begin_eye_pass)
        .add(Phase::SceneRecord, draw_gui)
        .add(Phase::Present, present);
    schedule
}

/// Headless shell: a GL surface, eye buffers, the browser menu and a
/// scripted headset driving them frame by frame
pub struct App {
    setup: GlSetup<HeadlessDisplay>,
    engine: Engine<ShellState>,
}

impl App {
    pub fn new(config: AppConfig) -> Result<Self> {
        let display = HeadlessDisplay::new(vec![
            HeadlessConfig::rgba(5, 6, 5, 0),
            HeadlessConfig::rgba(8, 8, 8, 8),
        ]);
        let setup = GlSetup::new(display, config.surface_request()).context("creating GL surface")?;

        let clock = FrameClock::new_fixed_hz(config.run.hz, config.run.prediction_frames);
        let mut state = ShellState::new(config)?;
        state.gui.open_menu(browser_menu::MENU_NAME);

        Ok(Self {
            setup,
            engine: Engine::new(clock, state, schedule()),
        })
    }

    /// Run the configured number of frames
    pub fn run(&mut self) {
        let run = &self.engine.state().config.run;
        let (frames, paced) = (run.frames, run.paced);
        tracing::info!(frames, paced, "running");
        if paced {
            self.engine.run_paced(frames);
        } else {
            self.engine.run_frames(frames);
        }
    }

    pub fn tick(&mut self) -> FrameTick {
        self.engine.tick_once()
    }

    /// Queue a console command for the next frame
    pub fn console_command(&self, command: &str) {
        self.engine.state().commands.borrow_mut().push_back(command.to_string());
    }

    pub fn state(&self) -> &ShellState {
        self.engine.state()
    }

    pub fn state_mut(&mut self) -> &mut ShellState {
        self.engine.state_mut()
    }

    /// Tear everything down; returns the number of GPU objects leaked
    pub fn shutdown(self) -> usize {
        let Self { mut setup, engine } = self;
        let mut state = engine.into_state();
        state.monitor.update_stats();
        state.monitor.report();
        let leaked = state.release_gpu();
        if leaked > 0 {
            tracing::error!(leaked, "GPU objects still alive at shutdown");
        }
        setup.shutdown();
        tracing::info!("shutdown complete");
        leaked
    }
}
