//! Terminal viewer for rig3d scenes
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute, queue,
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor},
    terminal::{self, ClearType},
};
use rig3d_core::{
    install_helpers, scenes, HelperDimensions, HelperOptions, Joint, JointAngles, OrbitCamera,
    RobotArm, Scene, SceneError, SceneKind, SegmentFileError, SegmentSpec,
};
use std::io::{self, stdout, Write};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info};

pub mod renderer;

pub use renderer::AsciiRenderer;

const ORBIT_STEP: f32 = 0.1;
const ZOOM_STEP: f32 = 1.1;
const JOINT_STEP: f32 = 5.0;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Terminal I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("Scene setup failed: {0}")]
    Scene(#[from] SceneError),
    #[error(transparent)]
    SegmentFile(#[from] SegmentFileError),
    #[error("Failed to set up logging: {0}")]
    Logging(String),
}

/// Startup settings for [`TerminalApp`]
#[derive(Debug, Clone)]
pub struct AppOptions {
    pub scene: SceneKind,
    /// Extra cylinders added on top of the scene
    pub segments: Vec<SegmentSpec>,
    pub show_helpers: bool,
    pub fps: u32,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            scene: SceneKind::Robot,
            segments: Vec::new(),
            show_helpers: true,
            fps: 30,
        }
    }
}

/// Main application struct for terminal 3D rendering
pub struct TerminalApp {
    kind: SceneKind,
    scene: Scene,
    robot: Option<RobotArm>,
    joints: JointAngles,
    selected: Joint,
    helpers: HelperOptions,
    helper_dimensions: HelperDimensions,
    orbit: OrbitCamera,
    renderer: AsciiRenderer,
    frame_time: Duration,
    running: bool,
    last_frame: Instant,
    frame_count: u32,
    fps: f32,
}

impl TerminalApp {
    pub fn new(options: AppOptions) -> Result<Self, AppError> {
        let (width, height) = terminal::size()?;
        Self::with_size(options, width as usize, height as usize)
    }

    /// Build the app for a fixed viewport, without touching the terminal
    pub fn with_size(options: AppOptions, width: usize, height: usize) -> Result<Self, AppError> {
        let mut scene = Scene::new();
        let robot = match options.scene {
            SceneKind::Robot => Some(scenes::robot_scene(&mut scene)?),
            SceneKind::Cylinders => {
                scenes::cylinder_showcase(&mut scene)?;
                None
            }
        };

        if !options.segments.is_empty() {
            let group = scene.add_node(scene.root(), "segments")?;
            for (i, spec) in options.segments.iter().enumerate() {
                spec.add_to(&mut scene, group, format!("segment.{i}"))?;
            }
        }

        let helpers = if options.show_helpers {
            options.scene.default_helpers()
        } else {
            HelperOptions::none()
        };
        let helper_dimensions = HelperDimensions::default();
        install_helpers(&mut scene, &helpers, &helper_dimensions)?;

        let joints = JointAngles::default();
        if let Some(robot) = &robot {
            robot.pose(&mut scene, &joints)?;
        }

        info!(scene = %options.scene, nodes = scene.len(), "scene ready");
        Ok(Self {
            kind: options.scene,
            scene,
            robot,
            joints,
            selected: Joint::UpperArmY,
            helpers,
            helper_dimensions,
            orbit: options.scene.orbit_camera(),
            renderer: AsciiRenderer::new(width, height),
            frame_time: Duration::from_millis(1000 / u64::from(options.fps.max(1))),
            running: true,
            last_frame: Instant::now(),
            frame_count: 0,
            fps: 0.0,
        })
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn joints(&self) -> &JointAngles {
        &self.joints
    }

    pub fn selected_joint(&self) -> Joint {
        self.selected
    }

    pub fn helpers(&self) -> &HelperOptions {
        &self.helpers
    }

    pub fn orbit(&self) -> &OrbitCamera {
        &self.orbit
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn run(&mut self) -> Result<(), AppError> {
        terminal::enable_raw_mode()?;
        execute!(stdout(), terminal::EnterAlternateScreen, cursor::Hide)?;

        let result = self.main_loop();

        // Cleanup runs even when the loop failed
        let restored = terminal::disable_raw_mode()
            .and_then(|()| execute!(stdout(), terminal::LeaveAlternateScreen, cursor::Show))
            .map_err(AppError::from);

        result.and(restored)
    }

    fn main_loop(&mut self) -> Result<(), AppError> {
        while self.running {
            let frame_start = Instant::now();

            // Handle input
            while event::poll(Duration::from_millis(0))? {
                match event::read()? {
                    Event::Key(KeyEvent {
                        code,
                        kind: KeyEventKind::Press,
                        ..
                    }) => self.handle_key(code)?,
                    Event::Resize(width, height) => {
                        self.renderer.resize(width as usize, height as usize);
                        queue!(stdout(), terminal::Clear(ClearType::All))?;
                    }
                    _ => {}
                }
            }

            // Render
            self.render()?;

            // Frame timing
            self.frame_count += 1;
            let elapsed = frame_start.elapsed();
            if elapsed < self.frame_time {
                std::thread::sleep(self.frame_time - elapsed);
            }

            // Update FPS counter
            let now = Instant::now();
            if (now - self.last_frame).as_secs() >= 1 {
                self.fps = self.frame_count as f32 / (now - self.last_frame).as_secs_f32();
                self.frame_count = 0;
                self.last_frame = now;
            }
        }

        Ok(())
    }

    /// Apply one key press to the app state
    pub fn handle_key(&mut self, code: KeyCode) -> Result<(), AppError> {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.running = false;
            }
            KeyCode::Char('w') | KeyCode::Up => self.orbit.orbit(0.0, ORBIT_STEP),
            KeyCode::Char('s') | KeyCode::Down => self.orbit.orbit(0.0, -ORBIT_STEP),
            KeyCode::Char('a') | KeyCode::Left => self.orbit.orbit(-ORBIT_STEP, 0.0),
            KeyCode::Char('d') | KeyCode::Right => self.orbit.orbit(ORBIT_STEP, 0.0),
            KeyCode::Char('+') | KeyCode::Char('=') => self.orbit.zoom(1.0 / ZOOM_STEP),
            KeyCode::Char('-') => self.orbit.zoom(ZOOM_STEP),
            KeyCode::Tab => {
                self.selected = self.selected.next();
            }
            KeyCode::Char('[') => self.nudge_joint(-JOINT_STEP)?,
            KeyCode::Char(']') => self.nudge_joint(JOINT_STEP)?,
            KeyCode::Char('r') => {
                self.joints = JointAngles::default();
                self.pose()?;
            }
            KeyCode::Char('1') => self.toggle_helper(|h| &mut h.grid_xz)?,
            KeyCode::Char('2') => self.toggle_helper(|h| &mut h.grid_yz)?,
            KeyCode::Char('3') => self.toggle_helper(|h| &mut h.grid_xy)?,
            KeyCode::Char('g') => self.toggle_helper(|h| &mut h.ground)?,
            KeyCode::Char('x') => self.toggle_helper(|h| &mut h.axes)?,
            _ => {}
        }
        Ok(())
    }

    fn nudge_joint(&mut self, delta: f32) -> Result<(), AppError> {
        if self.robot.is_none() {
            return Ok(());
        }
        let value = self.joints.nudge(self.selected, delta);
        debug!(joint = self.selected.label(), value, "joint moved");
        self.pose()
    }

    fn pose(&mut self) -> Result<(), AppError> {
        if let Some(robot) = &self.robot {
            robot.pose(&mut self.scene, &self.joints)?;
        }
        Ok(())
    }

    fn toggle_helper(&mut self, field: impl FnOnce(&mut HelperOptions) -> &mut bool) -> Result<(), AppError> {
        let flag = field(&mut self.helpers);
        *flag = !*flag;
        install_helpers(&mut self.scene, &self.helpers, &self.helper_dimensions)?;
        Ok(())
    }

    /// Draw the current frame into the renderer's buffers
    pub fn render_frame(&mut self) -> &AsciiRenderer {
        let camera = self.orbit.camera(self.renderer.aspect());
        self.renderer.clear();
        self.renderer.render_scene(&self.scene, &camera);
        &self.renderer
    }

    fn render(&mut self) -> io::Result<()> {
        self.render_frame();

        // Output to terminal
        let mut stdout = stdout();
        self.renderer.draw(&mut stdout)?;

        // Draw UI overlay
        queue!(
            stdout,
            cursor::MoveTo(0, 0),
            SetForegroundColor(Color::Yellow),
            Print(format!(
                "rig3d | {} | FPS: {:.1} | WASD/Arrows=Orbit +/-=Zoom Q=Quit",
                self.kind.title(),
                self.fps
            )),
            ResetColor
        )?;
        for (row, line) in self.panel_lines().iter().enumerate() {
            queue!(stdout, cursor::MoveTo(0, row as u16 + 1))?;
            if line.selected {
                queue!(stdout, SetAttribute(Attribute::Reverse))?;
            }
            queue!(
                stdout,
                SetForegroundColor(Color::White),
                Print(&line.text),
                SetAttribute(Attribute::Reset),
                ResetColor
            )?;
        }

        stdout.flush()?;
        Ok(())
    }

    /// Text rows of the control panel
    pub fn panel_lines(&self) -> Vec<PanelLine> {
        let mut lines = Vec::new();
        if self.robot.is_some() {
            lines.push(PanelLine::plain("Arm angles  Tab=Select [/]=Adjust R=Reset"));
            for joint in Joint::ALL {
                lines.push(PanelLine {
                    text: format!("  {:<12} {:>7.1}", joint.label(), self.joints.get(joint)),
                    selected: joint == self.selected,
                });
            }
        }

        let mark = |on: bool| if on { 'x' } else { ' ' };
        lines.push(PanelLine::plain("Grid display"));
        lines.push(PanelLine::plain(format!(
            "  [{}] 1 XZ grid  [{}] 2 YZ grid  [{}] 3 XY grid  [{}] G ground  [{}] X axes",
            mark(self.helpers.grid_xz),
            mark(self.helpers.grid_yz),
            mark(self.helpers.grid_xy),
            mark(self.helpers.ground),
            mark(self.helpers.axes),
        )));
        lines
    }
}

/// One row of the control panel overlay
#[derive(Debug, Clone, PartialEq)]
pub struct PanelLine {
    pub text: String,
    pub selected: bool,
}

impl PanelLine {
    fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            selected: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rig3d_core::{parse_segment_file, AlignError, GeometryError};

    fn robot_app() -> TerminalApp {
        TerminalApp::with_size(AppOptions::default(), 80, 24).unwrap()
    }

    #[test]
    fn test_joint_keys() {
        let mut app = robot_app();
        assert_eq!(app.selected_joint(), Joint::UpperArmY);
        app.handle_key(KeyCode::Tab).unwrap();
        assert_eq!(app.selected_joint(), Joint::UpperArmZ);

        for _ in 0..20 {
            app.handle_key(KeyCode::Char('[')).unwrap();
        }
        assert_eq!(app.joints().upper_arm_z, -45.0);

        app.handle_key(KeyCode::Char('r')).unwrap();
        assert_eq!(*app.joints(), JointAngles::default());
    }

    #[test]
    fn test_joint_keys_move_the_arm() {
        let mut app = robot_app();
        let robot = app.robot.unwrap();
        let before = robot.forearm_tip(app.scene()).unwrap();
        app.handle_key(KeyCode::Char(']')).unwrap();
        let after = robot.forearm_tip(app.scene()).unwrap();
        assert!(nalgebra::distance(&before, &after) > 1.0);
    }

    #[test]
    fn test_helper_toggles() {
        let mut app = robot_app();
        assert!(!app.helpers().grid_xz);
        app.handle_key(KeyCode::Char('1')).unwrap();
        assert!(app.helpers().grid_xz);
        assert!(app.scene().find("grid.xz").is_some());

        app.handle_key(KeyCode::Char('x')).unwrap();
        assert!(app.scene().find("axis.y").is_none());
    }

    #[test]
    fn test_orbit_and_quit() {
        let mut app = robot_app();
        let start = app.orbit().clone();
        app.handle_key(KeyCode::Left).unwrap();
        app.handle_key(KeyCode::Char('-')).unwrap();
        assert_relative_eq!(app.orbit().azimuth, start.azimuth - ORBIT_STEP, epsilon = 1e-5);
        assert_relative_eq!(app.orbit().distance, start.distance * ZOOM_STEP, epsilon = 1e-3);

        assert!(app.is_running());
        app.handle_key(KeyCode::Esc).unwrap();
        assert!(!app.is_running());
    }

    #[test]
    fn test_cylinder_scene_ignores_joint_keys() {
        let options = AppOptions {
            scene: SceneKind::Cylinders,
            ..AppOptions::default()
        };
        let mut app = TerminalApp::with_size(options, 80, 24).unwrap();
        app.handle_key(KeyCode::Char(']')).unwrap();
        assert_eq!(*app.joints(), JointAngles::default());
        assert!(app.helpers().grid_xz);
        assert_eq!(app.panel_lines().len(), 2);
    }

    #[test]
    fn test_segments_from_file_are_added() {
        let segments =
            parse_segment_file("segment #FFFFFF 10 10 (0, 100, 0) (100, 0, 0)\n").unwrap();
        let options = AppOptions {
            segments,
            show_helpers: false,
            ..AppOptions::default()
        };
        let mut app = TerminalApp::with_size(options, 80, 24).unwrap();
        assert!(app.scene().find("segment.0").is_some());
        assert!(app.render_frame().coverage() > 0);
    }

    #[test]
    fn test_degenerate_segment_is_reported() {
        let segments = parse_segment_file("segment #FFFFFF 1 1 (1, 1, 1) (1, 1, 1)").unwrap();
        let options = AppOptions {
            segments,
            ..AppOptions::default()
        };
        let result = TerminalApp::with_size(options, 80, 24);
        assert!(matches!(
            result,
            Err(AppError::Scene(SceneError::Geometry(GeometryError::Align(
                AlignError::DegenerateSegment { .. }
            ))))
        ));
    }

    #[test]
    fn test_oversized_segment_is_reported() {
        let segments =
            parse_segment_file("segment #FFFFFF 1 1 (1, 0, 0) (0, 0, 0) 4000000000").unwrap();
        let options = AppOptions {
            segments,
            ..AppOptions::default()
        };
        let result = TerminalApp::with_size(options, 80, 24);
        assert!(matches!(
            result,
            Err(AppError::Scene(SceneError::Geometry(GeometryError::TooManySegments { .. })))
        ));
    }

    #[test]
    fn test_default_view_shows_ground() {
        let mut app = robot_app();
        let with_helpers = app.render_frame().coverage();
        app.handle_key(KeyCode::Char('g')).unwrap();
        assert!(!app.helpers().ground);
        let without_ground = app.render_frame().coverage();
        assert!(with_helpers > without_ground);
    }

    #[test]
    fn test_panel_highlights_selection() {
        let app = robot_app();
        let selected: Vec<_> = app.panel_lines().into_iter().filter(|l| l.selected).collect();
        assert_eq!(selected.len(), 1);
        assert!(selected[0].text.contains("Upper arm y"));
    }
}
