use crate::display::ButtonMask;
use crate::terminal::MouseMode;

/// Button codes before the +32 wire offset.
const CODE_RELEASE: u8 = 3;
const CODE_DRAG_BASE: u8 = 32;
const CODE_MOTION: u8 = 35;
const CODE_WHEEL_UP: u8 = 64;
const CODE_WHEEL_DOWN: u8 = 65;

/// Highest coordinate encodable in the classic single-byte scheme.
const COORD_MAX: u16 = 222;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Button {
    Left,
    Middle,
    Right,
    WheelUp,
    WheelDown,
}

impl Button {
    fn code(self) -> u8 {
        match self {
            Button::Left => 0,
            Button::Middle => 1,
            Button::Right => 2,
            Button::WheelUp => CODE_WHEEL_UP,
            Button::WheelDown => CODE_WHEEL_DOWN,
        }
    }

    fn is_wheel(self) -> bool {
        matches!(self, Button::WheelUp | Button::WheelDown)
    }

    /// Highest-priority button in the mask: 1, 2, 3, then the wheels.
    fn from_mask(buttons: ButtonMask) -> Option<Button> {
        if buttons.contains(ButtonMask::BUTTON1) {
            Some(Button::Left)
        } else if buttons.contains(ButtonMask::BUTTON2) {
            Some(Button::Middle)
        } else if buttons.contains(ButtonMask::BUTTON3) {
            Some(Button::Right)
        } else if buttons.contains(ButtonMask::WHEEL_UP) {
            Some(Button::WheelUp)
        } else if buttons.contains(ButtonMask::WHEEL_DOWN) {
            Some(Button::WheelDown)
        } else {
            None
        }
    }
}

/// Stateful mouse-event encoder. Tracks the last position and the button
/// held for drag reporting, and renders press/drag/release/motion into the
/// xterm `ESC [ M cb cx cy` wire form for the active reporting mode.
#[derive(Debug, Default)]
pub struct MouseEncoder {
    last_x: u16,
    last_y: u16,
    drag_button: Option<Button>,
}

impl MouseEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one backend mouse event; returns the bytes to send, empty when
    /// the mode suppresses the event.
    pub fn encode(&mut self, mode: MouseMode, x: u16, y: u16, buttons: ButtonMask) -> Vec<u8> {
        let pressed = Button::from_mask(buttons);
        let moved = x != self.last_x || y != self.last_y;

        let out = match pressed {
            None => {
                if let Some(held) = self.drag_button.take() {
                    release(mode, held, x, y)
                } else if moved {
                    motion(mode, x, y)
                } else {
                    Vec::new()
                }
            }
            Some(button) => {
                if self.drag_button != Some(button) {
                    if !button.is_wheel() {
                        self.drag_button = Some(button);
                    }
                    press(mode, button, x, y)
                } else if moved {
                    drag(mode, button, x, y)
                } else {
                    Vec::new()
                }
            }
        };

        self.last_x = x;
        self.last_y = y;
        out
    }
}

fn press(mode: MouseMode, button: Button, x: u16, y: u16) -> Vec<u8> {
    match mode {
        MouseMode::Off => Vec::new(),
        MouseMode::X10 => {
            if button.is_wheel() {
                Vec::new()
            } else {
                wire(button.code(), x, y)
            }
        }
        _ => wire(button.code(), x, y),
    }
}

fn release(mode: MouseMode, _button: Button, x: u16, y: u16) -> Vec<u8> {
    match mode {
        MouseMode::Off | MouseMode::X10 => Vec::new(),
        _ => wire(CODE_RELEASE, x, y),
    }
}

fn drag(mode: MouseMode, button: Button, x: u16, y: u16) -> Vec<u8> {
    match mode {
        MouseMode::BtnEvent | MouseMode::AnyEvent => wire(CODE_DRAG_BASE + button.code(), x, y),
        _ => Vec::new(),
    }
}

fn motion(mode: MouseMode, x: u16, y: u16) -> Vec<u8> {
    match mode {
        MouseMode::AnyEvent => wire(CODE_MOTION, x, y),
        _ => Vec::new(),
    }
}

/// `ESC [ M cb cx cy`: the button field is offset by 32, coordinates by 33
/// (1-based plus the 32 offset).
fn wire(code: u8, x: u16, y: u16) -> Vec<u8> {
    vec![
        0x1B,
        b'[',
        b'M',
        32 + code,
        33 + x.min(COORD_MAX) as u8,
        33 + y.min(COORD_MAX) as u8,
    ]
}
