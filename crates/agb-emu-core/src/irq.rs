/// Interrupt sources. The discriminant is the bit in IE/IF.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u16)]
pub enum Interrupt {
    VBlank = 1 << 0,
    HBlank = 1 << 1,
    VCount = 1 << 2,
    Timer0 = 1 << 3,
    Timer1 = 1 << 4,
    Timer2 = 1 << 5,
    Timer3 = 1 << 6,
    Serial = 1 << 7,
    Dma0 = 1 << 8,
    Dma1 = 1 << 9,
    Dma2 = 1 << 10,
    Dma3 = 1 << 11,
    Keypad = 1 << 12,
    GamePak = 1 << 13,
}

impl Interrupt {
    pub const fn timer(n: usize) -> Self {
        match n {
            0 => Self::Timer0,
            1 => Self::Timer1,
            2 => Self::Timer2,
            _ => Self::Timer3,
        }
    }

    pub const fn dma(n: usize) -> Self {
        match n {
            0 => Self::Dma0,
            1 => Self::Dma1,
            2 => Self::Dma2,
            _ => Self::Dma3,
        }
    }

    #[inline]
    pub const fn mask(self) -> u16 {
        self as u16
    }
}

const IRQ_MASK: u16 = 0x3FFF;

/// Interrupt controller: IE, IF, IME and the halt latch.
#[derive(Debug, Default)]
pub struct Irq {
    pub ie: u16,
    pub if_reg: u16,
    pub ime: bool,
    halted: bool,
}

impl Irq {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request `source` by setting its IF bit.
    #[inline]
    pub fn raise(&mut self, source: Interrupt) {
        self.if_reg |= source.mask();
    }

    /// Whether the CPU should take an interrupt right now.
    pub fn pending(&self) -> bool {
        self.ime && self.wake_pending()
    }

    /// An enabled and requested interrupt exists. Halt ends on this condition
    /// even with IME cleared.
    pub fn wake_pending(&self) -> bool {
        self.ie & self.if_reg & IRQ_MASK != 0
    }

    pub fn halt(&mut self) {
        self.halted = true;
    }

    pub fn halted(&self) -> bool {
        self.halted
    }

    /// Leave halt if a wake condition exists. Returns whether the CPU woke.
    pub fn try_wake(&mut self) -> bool {
        if self.halted && self.wake_pending() {
            self.halted = false;
            return true;
        }
        false
    }

    pub fn write_ie(&mut self, val: u16) {
        self.ie = val & IRQ_MASK;
    }

    /// Writing a 1 to an IF bit acknowledges it.
    pub fn acknowledge(&mut self, val: u16) {
        self.if_reg &= !val;
    }

    pub fn write_ime(&mut self, val: u16) {
        self.ime = val & 1 != 0;
    }
}
