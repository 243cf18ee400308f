use crate::irq::{Interrupt, Irq};

/// Buttons in KEYINPUT bit order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    A = 0,
    B = 1,
    Select = 2,
    Start = 3,
    Right = 4,
    Left = 5,
    Up = 6,
    Down = 7,
    R = 8,
    L = 9,
}

impl Key {
    pub const ALL: [Key; 10] = [
        Key::A,
        Key::B,
        Key::Select,
        Key::Start,
        Key::Right,
        Key::Left,
        Key::Up,
        Key::Down,
        Key::R,
        Key::L,
    ];

    #[inline]
    pub const fn mask(self) -> u16 {
        1 << self as u16
    }
}

const KEY_MASK: u16 = 0x03FF;
const KEYCNT_IRQ: u16 = 1 << 14;
const KEYCNT_AND: u16 = 1 << 15;

/// Snapshot of which buttons are held, one bit per [`Key`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KeyState(pub u16);

impl KeyState {
    pub fn with(mut self, key: Key, pressed: bool) -> Self {
        if pressed {
            self.0 |= key.mask();
        } else {
            self.0 &= !key.mask();
        }
        self
    }

    pub fn is_pressed(self, key: Key) -> bool {
        self.0 & key.mask() != 0
    }
}

/// KEYINPUT and KEYCNT.
#[derive(Debug, Default)]
pub struct Keypad {
    held: KeyState,
    keycnt: u16,
}

impl Keypad {
    pub fn new() -> Self {
        Self::default()
    }

    /// KEYINPUT: a cleared bit means the button is down.
    pub fn keyinput(&self) -> u16 {
        !self.held.0 & KEY_MASK
    }

    pub fn keycnt(&self) -> u16 {
        self.keycnt
    }

    pub fn write_keycnt(&mut self, val: u16, irq: &mut Irq) {
        self.keycnt = val & 0xC3FF;
        self.check_irq(irq);
    }

    pub fn set_state(&mut self, state: KeyState, irq: &mut Irq) {
        self.held = KeyState(state.0 & KEY_MASK);
        self.check_irq(irq);
    }

    pub fn set_key(&mut self, key: Key, pressed: bool, irq: &mut Irq) {
        let state = self.held.with(key, pressed);
        self.set_state(state, irq);
    }

    pub fn state(&self) -> KeyState {
        self.held
    }

    fn check_irq(&self, irq: &mut Irq) {
        if self.keycnt & KEYCNT_IRQ == 0 {
            return;
        }
        let select = self.keycnt & KEY_MASK;
        let held = self.held.0 & select;
        let fire = if self.keycnt & KEYCNT_AND != 0 {
            select != 0 && held == select
        } else {
            held != 0
        };
        if fire {
            irq.raise(Interrupt::Keypad);
        }
    }
}
