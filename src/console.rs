//! Headless console device
//!
//! Implements [`Device`] without a window or audio. Queued output is kept as
//! plain data so hosts and tests can inspect each frame, resources are checked
//! against the game directory and records are read and written there.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use crate::device::{Buttons, Color, Device, Sound, SoundMode, Sprite, Text};
use crate::error::{CleshError, ErrorKind, Result};
use crate::records;
use crate::symbols::KEYBOARD;
use crate::value::{field_number, set_field_number, Fields};

pub const DEFAULT_SCREEN: (i32, i32) = (400, 300);

/// Everything presented by one `update`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    pub sprites: Vec<Sprite>,
    pub sounds: Vec<Sound>,
    pub tracks: Vec<Sound>,
    pub texts: Vec<Text>,
}

impl Frame {
    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
            && self.sounds.is_empty()
            && self.tracks.is_empty()
            && self.texts.is_empty()
    }
}

/// The headless console
#[derive(Debug)]
pub struct Console {
    root: PathBuf,
    screen: (i32, i32),
    /// Output queued since the last flush
    pending: Frame,
    last_frame: Frame,
    frames: u64,
    staged: Vec<String>,
    images: BTreeSet<String>,
    sounds: BTreeSet<String>,
    tracks: BTreeSet<String>,
    inputs: BTreeMap<i32, Buttons>,
    paused: Duration,
}

impl Console {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let mut inputs = BTreeMap::new();
        inputs.insert(KEYBOARD, Buttons::default());
        Self {
            root: root.into(),
            screen: DEFAULT_SCREEN,
            pending: Frame::default(),
            last_frame: Frame::default(),
            frames: 0,
            staged: Vec::new(),
            images: BTreeSet::new(),
            sounds: BTreeSet::new(),
            tracks: BTreeSet::new(),
            inputs,
            paused: Duration::ZERO,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Output queued but not yet flushed
    pub fn pending(&self) -> &Frame {
        &self.pending
    }

    pub fn last_frame(&self) -> &Frame {
        &self.last_frame
    }

    /// Number of flushes so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn images(&self) -> &BTreeSet<String> {
        &self.images
    }

    pub fn sounds(&self) -> &BTreeSet<String> {
        &self.sounds
    }

    pub fn tracks(&self) -> &BTreeSet<String> {
        &self.tracks
    }

    /// Total time spent in `timeout`
    pub fn paused(&self) -> Duration {
        self.paused
    }

    /// Add a gamepad slot. Connecting an existing slot is a no-op.
    pub fn connect(&mut self, player: i32) {
        self.inputs.entry(player).or_default();
    }

    pub fn set_buttons(&mut self, player: i32, buttons: Buttons) -> Result<()> {
        let slot = self
            .inputs
            .get_mut(&player)
            .ok_or(ErrorKind::UnknownPlayer(player))?;
        *slot = buttons;
        Ok(())
    }

    fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

impl Device for Console {
    fn screen_size(&self) -> (i32, i32) {
        self.screen
    }

    fn create_screen(&mut self, width: i32, height: i32) -> Result<()> {
        if width <= 0 || height <= 0 {
            return Err(ErrorKind::Device(format!("invalid screen size {}x{}", width, height)).into());
        }
        self.screen = (width, height);
        Ok(())
    }

    fn queue_draw(&mut self, sprite: Sprite) {
        self.pending.sprites.push(sprite);
    }

    fn queue_sound(&mut self, name: &str, mode: SoundMode) {
        self.pending.sounds.push(Sound {
            name: name.to_string(),
            mode,
        });
    }

    fn queue_track(&mut self, name: &str, mode: SoundMode) {
        self.pending.tracks.push(Sound {
            name: name.to_string(),
            mode,
        });
    }

    fn queue_text(&mut self, text: &str, x: i32, y: i32, color: Color) {
        self.pending.texts.push(Text {
            text: text.to_string(),
            x,
            y,
            color,
        });
    }

    fn flush_output(&mut self) -> Result<()> {
        self.last_frame = std::mem::take(&mut self.pending);
        self.frames += 1;
        Ok(())
    }

    fn load_resource(&mut self, path: &str) {
        self.staged.push(path.to_string());
    }

    fn upload_resources(&mut self) -> Result<()> {
        for name in std::mem::take(&mut self.staged) {
            let path = self.path(&name);
            if !path.is_file() {
                return Err(ErrorKind::ResourceNotFound(name).into());
            }
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let extension = path
                .extension()
                .map(|s| s.to_string_lossy().to_lowercase())
                .unwrap_or_default();
            match extension.as_str() {
                "png" => self.images.insert(stem),
                "wav" => self.sounds.insert(stem),
                "mp3" => self.tracks.insert(stem),
                _ => {
                    return Err(ErrorKind::Device(format!("unknown resource type '{}'", name)).into())
                }
            };
        }
        Ok(())
    }

    fn read_input(&self, player: i32) -> Result<Buttons> {
        self.inputs
            .get(&player)
            .copied()
            .ok_or_else(|| ErrorKind::UnknownPlayer(player).into())
    }

    fn detect_collision(&self, sprite: &Fields, other: &Fields, results: &mut Fields) -> Result<()> {
        detect_collision(sprite, other, results)
    }

    fn focus_camera(&self, camera: &mut Fields, sprite: &Fields) -> Result<()> {
        focus_camera(camera, sprite, self.screen)
    }

    fn load_records(&mut self, name: &str) -> Result<Vec<Fields>> {
        let text = fs::read_to_string(self.path(name))
            .map_err(|e| CleshError::new(ErrorKind::Io(format!("{}: {}", name, e))))?;
        records::parse_records(&text)
    }

    fn save_records(&mut self, name: &str, records: &[Fields]) -> Result<()> {
        fs::write(self.path(name), records::write_records(records))
            .map_err(|e| CleshError::new(ErrorKind::Io(format!("{}: {}", name, e))))
    }

    fn pause(&mut self, millis: i32) {
        let duration = Duration::from_millis(millis.max(0) as u64);
        thread::sleep(duration);
        self.paused += duration;
    }
}

const SPRITE_FIELDS: [&str; 9] = [
    "left", "top", "right", "bottom", "cdelta_x", "cdelta_y", "size_x", "size_y", "scale",
];
const OTHER_FIELDS: [&str; 9] = [
    "left", "top", "right", "bottom", "x", "y", "size_x", "size_y", "scale",
];
const RESULT_FIELDS: [&str; 9] = [
    "left", "top", "right", "bottom", "center", "left_corner", "right_corner", "x", "y",
];
const CAMERA_FIELDS: [&str; 13] = [
    "x", "y", "limit_x", "limit_y", "upper_bound", "bkg_x1", "bkg_x2", "bkg_y1", "bkg_y2",
    "x_speed", "y_speed", "x_direction", "y_direction",
];
const FOCUS_FIELDS: [&str; 4] = ["x", "y", "width", "height"];

fn require(fields: &Fields, object: &str, names: &[&str]) -> Result<()> {
    match names.iter().find(|name| !fields.contains_key(**name)) {
        Some(name) => Err(ErrorKind::MissingField(object.to_string(), name.to_string()).into()),
        None => Ok(()),
    }
}

#[derive(Debug, Clone, Copy)]
struct Point {
    x: i32,
    y: i32,
}

#[derive(Debug, Clone, Copy)]
struct HitBox {
    left: i32,
    top: i32,
    right: i32,
    bottom: i32,
}

impl HitBox {
    fn contains(&self, p: Point) -> bool {
        p.x >= self.left && p.x <= self.right && p.y >= self.top && p.y <= self.bottom
    }
}

/// Test which faces of `sprite`'s hit box touch `other`'s.
///
/// Twelve probe points sit on the sprite's box: two per face inset by the
/// `cdelta` percentages, one at each face centre, and the two bottom corners.
/// `results` gets 0/1 flags per face plus the suggested `x`/`y` to move the
/// sprite out of the overlap.
pub fn detect_collision(sprite: &Fields, other: &Fields, results: &mut Fields) -> Result<()> {
    for name in RESULT_FIELDS {
        set_field_number(results, name, 0);
    }
    require(sprite, "sprite", &SPRITE_FIELDS)?;
    require(other, "other sprite", &OTHER_FIELDS)?;

    let s = |name: &str| field_number(sprite, name);
    let o = |name: &str| field_number(other, name);

    let (left, top, right, bottom) = (s("left"), s("top"), s("right"), s("bottom"));
    let width = right.wrapping_sub(left).wrapping_add(1);
    let height = bottom.wrapping_sub(top).wrapping_add(1);
    let delta_x = (width as f64 * (s("cdelta_x") as f64 / 100.0)) as i32;
    let delta_y = (height as f64 * (s("cdelta_y") as f64 / 100.0)) as i32;
    let center_x = left.wrapping_add(width / 2);
    let center_y = top.wrapping_add(height / 2);

    let p = |x, y| Point { x, y };
    let (inner_left, inner_right) = (left.wrapping_add(delta_x), right.wrapping_sub(delta_x));
    let (inner_top, inner_bottom) = (top.wrapping_add(delta_y), bottom.wrapping_sub(delta_y));
    let top_points = [p(inner_left, top), p(inner_right, top)];
    let top_center = p(center_x, top);
    let left_points = [p(left, inner_top), p(left, inner_bottom)];
    let left_center = p(left, center_y);
    let right_points = [p(right, inner_top), p(right, inner_bottom)];
    let right_center = p(right, center_y);
    let bottom_points = [p(inner_left, bottom), p(inner_right, bottom)];
    let bottom_center = p(center_x, bottom);

    let target = HitBox {
        left: o("left"),
        top: o("top"),
        right: o("right"),
        bottom: o("bottom"),
    };
    let hit = |points: &[Point; 2], center: Point| {
        points.iter().any(|pt| target.contains(*pt)) || target.contains(center)
    };
    let flag = |b: bool| b as i32;
    let extent = |fields: &Fields, size: &str, axis: &str| {
        field_number(fields, size)
            .wrapping_mul(field_number(fields, axis))
            .wrapping_mul(field_number(fields, "scale"))
    };

    if hit(&top_points, top_center) {
        set_field_number(results, "top", 1);
        set_field_number(results, "center", flag(target.contains(top_center)));
        set_field_number(results, "y", o("y").wrapping_add(extent(other, "height", "size_y")));
    }
    if hit(&left_points, left_center) {
        set_field_number(results, "left", 1);
        set_field_number(results, "center", flag(target.contains(left_center)));
        set_field_number(results, "x", o("x").wrapping_add(extent(other, "width", "size_x")));
    }
    if hit(&right_points, right_center) {
        set_field_number(results, "right", 1);
        set_field_number(results, "center", flag(target.contains(right_center)));
        set_field_number(results, "x", o("x").wrapping_sub(extent(sprite, "width", "size_x")));
    }
    if hit(&bottom_points, bottom_center) {
        set_field_number(results, "bottom", 1);
        set_field_number(results, "center", flag(target.contains(bottom_center)));
        set_field_number(results, "y", o("y").wrapping_sub(extent(sprite, "height", "size_y")));
        set_field_number(results, "left_corner", flag(target.contains(p(left, bottom))));
        set_field_number(results, "right_corner", flag(target.contains(p(right, bottom))));
    }
    Ok(())
}

/// Keep `sprite` centred by moving `camera` within the level limits.
///
/// While the camera is free to scroll, the backdrop offsets `bkg_x1`/`bkg_y1`
/// move against the travel direction and their partners `bkg_x2`/`bkg_y2`
/// trail one screen behind so the two tiles cover the view.
pub fn focus_camera(camera: &mut Fields, sprite: &Fields, screen: (i32, i32)) -> Result<()> {
    require(camera, "camera", &CAMERA_FIELDS)?;
    require(sprite, "sprite", &FOCUS_FIELDS)?;
    let (screen_w, screen_h) = screen;
    let (x, y) = (field_number(sprite, "x"), field_number(sprite, "y"));
    let (width, height) = (field_number(sprite, "width"), field_number(sprite, "height"));

    let screen_cx = screen_w.wrapping_sub(width) / 2;
    let screen_right = field_number(camera, "limit_x").wrapping_sub(screen_cx);
    let sprite_right = x.wrapping_add(width).wrapping_sub(1);
    if x < screen_cx {
        set_field_number(camera, "x", 0);
    } else if sprite_right > screen_right {
        let limit_x = field_number(camera, "limit_x");
        set_field_number(camera, "x", limit_x.wrapping_sub(screen_w));
    } else if screen_right.wrapping_sub(screen_cx) > width {
        set_field_number(camera, "x", x.wrapping_sub(screen_cx));
        let step = scroll_step(camera, "x_speed", "x_direction");
        let bkg_x1 = field_number(camera, "bkg_x1").wrapping_add(step);
        set_field_number(camera, "bkg_x1", bkg_x1);
        wrap_backdrop(camera, "bkg_x1", "bkg_x2", screen_w);
    }

    let upper_bound = field_number(camera, "upper_bound");
    let screen_cy = screen_h.wrapping_sub(height) / 2;
    let screen_top = upper_bound.wrapping_add(screen_cy);
    let screen_bottom = field_number(camera, "limit_y").wrapping_sub(screen_cy);
    let sprite_bottom = y.wrapping_add(height).wrapping_sub(1);
    let dy = screen_bottom.wrapping_sub(screen_top);
    if y < screen_top {
        set_field_number(camera, "y", upper_bound);
    } else if sprite_bottom > screen_bottom {
        let limit_y = field_number(camera, "limit_y");
        set_field_number(camera, "y", limit_y.wrapping_sub(screen_h));
    } else if dy > screen_h {
        set_field_number(camera, "y", y.wrapping_sub(screen_cy));
        if dy > screen_cy {
            let step = scroll_step(camera, "y_speed", "y_direction");
            let bkg_y1 = field_number(camera, "bkg_y1").wrapping_add(step);
            set_field_number(camera, "bkg_y1", bkg_y1);
        }
        wrap_backdrop(camera, "bkg_y1", "bkg_y2", screen_h);
    }
    Ok(())
}

/// Backdrop travel for one frame, opposite the camera's direction.
fn scroll_step(camera: &Fields, speed: &str, direction: &str) -> i32 {
    field_number(camera, speed).wrapping_mul(field_number(camera, direction).wrapping_neg())
}

fn wrap_backdrop(camera: &mut Fields, first: &str, second: &str, extent: i32) {
    let offset = field_number(camera, first);
    let reverse = extent.wrapping_neg();
    if offset > 0 && offset < extent {
        set_field_number(camera, second, offset.wrapping_sub(extent));
    } else if offset < 0 && offset > reverse {
        set_field_number(camera, second, offset.wrapping_add(extent));
    } else if offset >= extent || offset <= reverse {
        set_field_number(camera, first, 0);
        set_field_number(camera, second, 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn fields(pairs: &[(&str, i32)]) -> Fields {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::Number(*v)))
            .collect()
    }

    #[test]
    fn test_flush_snapshots_frame() {
        let mut console = Console::new(".");
        console.queue_text("hi", 1, 2, Color::new(255, 0, 0));
        assert_eq!(console.pending().texts.len(), 1);
        console.flush_output().unwrap();
        assert_eq!(console.frames(), 1);
        assert_eq!(console.last_frame().texts[0].text, "hi");
        assert!(console.pending().is_empty());
        console.flush_output().unwrap();
        assert!(console.last_frame().is_empty());
    }

    #[test]
    fn test_inputs() {
        let mut console = Console::new(".");
        assert_eq!(console.read_input(KEYBOARD).unwrap(), Buttons::default());
        let err = console.read_input(0).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownPlayer(0));

        console.connect(0);
        let mut buttons = Buttons::default();
        buttons.start = true;
        console.set_buttons(0, buttons).unwrap();
        assert!(console.read_input(0).unwrap().start);
        assert!(console.set_buttons(3, buttons).is_err());
    }

    #[test]
    fn test_missing_resource() {
        let mut console = Console::new(std::env::temp_dir().join("clesh-no-such-game"));
        console.load_resource("hero.png");
        let err = console.upload_resources().unwrap_err();
        assert_eq!(err.kind, ErrorKind::ResourceNotFound("hero.png".into()));
    }

    #[test]
    fn test_bottom_collision() {
        let sprite = fields(&[
            ("left", 0),
            ("top", 0),
            ("right", 9),
            ("bottom", 9),
            ("cdelta_x", 25),
            ("cdelta_y", 25),
            ("height", 10),
            ("size_x", 1),
            ("size_y", 1),
            ("scale", 1),
        ]);
        let other = fields(&[
            ("left", 0),
            ("top", 8),
            ("right", 20),
            ("bottom", 20),
            ("x", 0),
            ("y", 8),
            ("size_x", 1),
            ("size_y", 1),
            ("scale", 1),
        ]);
        let mut results = Fields::new();
        detect_collision(&sprite, &other, &mut results).unwrap();
        assert_eq!(field_number(&results, "bottom"), 1);
        assert_eq!(field_number(&results, "center"), 1);
        assert_eq!(field_number(&results, "top"), 0);
        assert_eq!(field_number(&results, "left"), 0);
        assert_eq!(field_number(&results, "right"), 0);
        assert_eq!(field_number(&results, "left_corner"), 1);
        assert_eq!(field_number(&results, "right_corner"), 1);
        assert_eq!(field_number(&results, "y"), -2);
    }

    #[test]
    fn test_collision_requires_fields() {
        let mut results = Fields::new();
        let err = detect_collision(&Fields::new(), &Fields::new(), &mut results).unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::MissingField("sprite".into(), "left".into())
        );
        assert_eq!(results.len(), 9);
    }

    #[test]
    fn test_focus_scrolls_backdrop() {
        let mut camera = fields(&[
            ("x", 0),
            ("y", 0),
            ("limit_x", 2000),
            ("limit_y", 300),
            ("upper_bound", 0),
            ("bkg_x1", 0),
            ("bkg_x2", 0),
            ("bkg_y1", 0),
            ("bkg_y2", 0),
            ("x_speed", 2),
            ("y_speed", 0),
            ("x_direction", 1),
            ("y_direction", 0),
        ]);
        let sprite = fields(&[("x", 500), ("y", 100), ("width", 20), ("height", 20)]);
        focus_camera(&mut camera, &sprite, (400, 300)).unwrap();
        assert_eq!(field_number(&camera, "x"), 310);
        assert_eq!(field_number(&camera, "bkg_x1"), -2);
        assert_eq!(field_number(&camera, "bkg_x2"), 398);
        assert_eq!(field_number(&camera, "y"), 0);
    }

    #[test]
    fn test_focus_clamps_right_edge() {
        let mut camera = fields(&[
            ("x", 0),
            ("y", 0),
            ("limit_x", 1000),
            ("limit_y", 300),
            ("upper_bound", 0),
            ("bkg_x1", 0),
            ("bkg_x2", 0),
            ("bkg_y1", 0),
            ("bkg_y2", 0),
            ("x_speed", 2),
            ("y_speed", 0),
            ("x_direction", 1),
            ("y_direction", 0),
        ]);
        let sprite = fields(&[("x", 990), ("y", 100), ("width", 20), ("height", 20)]);
        focus_camera(&mut camera, &sprite, (400, 300)).unwrap();
        assert_eq!(field_number(&camera, "x"), 600);
        assert_eq!(field_number(&camera, "bkg_x1"), 0);
    }

    #[test]
    fn test_collision_with_extreme_bounds() {
        let sprite = fields(&[
            ("left", -2147483647),
            ("top", i32::MIN),
            ("right", 2147483647),
            ("bottom", i32::MAX),
            ("cdelta_x", 25),
            ("cdelta_y", 25),
            ("width", i32::MAX),
            ("height", i32::MAX),
            ("size_x", i32::MAX),
            ("size_y", i32::MAX),
            ("scale", i32::MAX),
        ]);
        let other = fields(&[
            ("left", i32::MIN),
            ("top", i32::MIN),
            ("right", i32::MAX),
            ("bottom", i32::MAX),
            ("x", i32::MIN),
            ("y", i32::MAX),
            ("width", i32::MAX),
            ("height", i32::MAX),
            ("size_x", i32::MAX),
            ("size_y", i32::MAX),
            ("scale", i32::MAX),
        ]);
        let mut results = Fields::new();
        detect_collision(&sprite, &other, &mut results).unwrap();
        assert_eq!(results.len(), 9);
    }

    #[test]
    fn test_focus_with_extreme_direction() {
        let mut camera = fields(&[
            ("x", 0),
            ("y", 0),
            ("limit_x", 2000),
            ("limit_y", 300),
            ("upper_bound", 0),
            ("bkg_x1", 0),
            ("bkg_x2", 0),
            ("bkg_y1", 0),
            ("bkg_y2", 0),
            ("x_speed", 2),
            ("y_speed", i32::MAX),
            ("x_direction", i32::MIN),
            ("y_direction", i32::MIN),
        ]);
        let sprite = fields(&[("x", 500), ("y", 100), ("width", 20), ("height", 20)]);
        focus_camera(&mut camera, &sprite, (400, 300)).unwrap();
        assert_eq!(field_number(&camera, "x"), 310);
        // 2 * i32::MIN wraps to 0, so the backdrop stays put
        assert_eq!(field_number(&camera, "bkg_x1"), 0);

        let sprite = fields(&[
            ("x", i32::MAX),
            ("y", i32::MIN),
            ("width", i32::MAX),
            ("height", i32::MAX),
        ]);
        focus_camera(&mut camera, &sprite, (i32::MIN, i32::MAX)).unwrap();
    }
}
