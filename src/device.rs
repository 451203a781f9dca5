//! The device interface the VM drives
//!
//! Everything that touches a screen, speakers, controllers or the file system
//! goes through [`Device`]. The VM only evaluates operands and hands over plain
//! values; the headless [`Console`](crate::console::Console) is the reference
//! implementation.

use std::fmt;

use crate::error::{ErrorKind, Result};
use crate::value::{set_field_number, Fields};

/// How a sound or track is started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundMode {
    Play,
    Loop,
    Stop,
}

impl SoundMode {
    pub fn parse(text: &str) -> Result<SoundMode> {
        match text {
            "play" => Ok(SoundMode::Play),
            "loop" => Ok(SoundMode::Loop),
            "stop" => Ok(SoundMode::Stop),
            _ => Err(ErrorKind::InvalidMode(text.to_string()).into()),
        }
    }
}

impl fmt::Display for SoundMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SoundMode::Play => write!(f, "play"),
            SoundMode::Loop => write!(f, "loop"),
            SoundMode::Stop => write!(f, "stop"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Color {
    pub fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }
}

/// A queued `draw`
#[derive(Debug, Clone, PartialEq)]
pub struct Sprite {
    pub name: String,
    pub x: i32,
    pub y: i32,
    pub scale: i32,
    pub angle: i32,
    pub layer: i32,
    pub flip_x: bool,
    pub flip_y: bool,
}

/// A queued `play` or `music`
#[derive(Debug, Clone, PartialEq)]
pub struct Sound {
    pub name: String,
    pub mode: SoundMode,
}

/// A queued `output`
#[derive(Debug, Clone, PartialEq)]
pub struct Text {
    pub text: String,
    pub x: i32,
    pub y: i32,
    pub color: Color,
}

/// Button state of one player slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Buttons {
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
    pub action: bool,
    pub fire_1: bool,
    pub fire_2: bool,
    pub fire_3: bool,
    pub start: bool,
    pub select: bool,
    pub l_button: bool,
    pub r_button: bool,
}

impl Buttons {
    /// Field names written by `input`, in order
    pub const NAMES: [&'static str; 12] = [
        "left", "right", "up", "down", "action", "fire_1", "fire_2", "fire_3", "start",
        "select", "l_button", "r_button",
    ];

    pub fn flags(&self) -> [bool; 12] {
        [
            self.left,
            self.right,
            self.up,
            self.down,
            self.action,
            self.fire_1,
            self.fire_2,
            self.fire_3,
            self.start,
            self.select,
            self.l_button,
            self.r_button,
        ]
    }

    /// Set a button by its field name. Returns false for unknown names.
    pub fn set(&mut self, name: &str, pressed: bool) -> bool {
        let flag = match name {
            "left" => &mut self.left,
            "right" => &mut self.right,
            "up" => &mut self.up,
            "down" => &mut self.down,
            "action" => &mut self.action,
            "fire_1" => &mut self.fire_1,
            "fire_2" => &mut self.fire_2,
            "fire_3" => &mut self.fire_3,
            "start" => &mut self.start,
            "select" => &mut self.select,
            "l_button" => &mut self.l_button,
            "r_button" => &mut self.r_button,
            _ => return false,
        };
        *flag = pressed;
        true
    }

    /// Store the state as 0/1 fields.
    pub fn write_to(&self, fields: &mut Fields) {
        for (name, pressed) in Self::NAMES.iter().zip(self.flags()) {
            set_field_number(fields, name, pressed as i32);
        }
    }
}

/// Services a running program needs from its host
pub trait Device {
    fn screen_size(&self) -> (i32, i32);

    fn create_screen(&mut self, width: i32, height: i32) -> Result<()>;

    fn queue_draw(&mut self, sprite: Sprite);

    fn queue_sound(&mut self, name: &str, mode: SoundMode);

    fn queue_track(&mut self, name: &str, mode: SoundMode);

    fn queue_text(&mut self, text: &str, x: i32, y: i32, color: Color);

    /// Present everything queued since the last flush.
    fn flush_output(&mut self) -> Result<()>;

    fn load_resource(&mut self, path: &str);

    /// Load every resource staged with [`Device::load_resource`].
    fn upload_resources(&mut self) -> Result<()>;

    /// Current buttons of a player slot; `-1` is the keyboard.
    fn read_input(&self, player: i32) -> Result<Buttons>;

    /// Face hit test of `sprite` against `other`, written into `results`.
    fn detect_collision(&self, sprite: &Fields, other: &Fields, results: &mut Fields)
        -> Result<()>;

    /// Move `camera` to follow `sprite` and scroll the backdrop.
    fn focus_camera(&self, camera: &mut Fields, sprite: &Fields) -> Result<()>;

    /// Read a record file, one field map per record.
    fn load_records(&mut self, name: &str) -> Result<Vec<Fields>>;

    fn save_records(&mut self, name: &str, records: &[Fields]) -> Result<()>;

    fn pause(&mut self, millis: i32);
}
