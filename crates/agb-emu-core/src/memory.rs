pub const EWRAM_SIZE: usize = 0x4_0000;
pub const IWRAM_SIZE: usize = 0x8000;
/// Largest game pak image the address space can map (32 MiB).
pub const GAMEPAK_MAX: usize = 0x200_0000;

/// Work RAM and the game pak image.
pub struct Memory {
    pub ewram: Box<[u8]>,
    pub iwram: Box<[u8]>,
    pub gamepak: Option<Box<[u8]>>,
}

impl Memory {
    pub fn new() -> Self {
        Self {
            ewram: vec![0; EWRAM_SIZE].into_boxed_slice(),
            iwram: vec![0; IWRAM_SIZE].into_boxed_slice(),
            gamepak: None,
        }
    }

    pub fn load_gamepak(&mut self, mut rom: Vec<u8>) {
        if rom.len() > GAMEPAK_MAX {
            log::warn!(
                "game pak image is {} bytes; truncating to {GAMEPAK_MAX}",
                rom.len()
            );
            rom.truncate(GAMEPAK_MAX);
        }
        self.gamepak = Some(rom.into_boxed_slice());
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn read_le(buf: &[u8], offset: usize, width: usize) -> u32 {
    buf.get(offset..offset + width)
        .map(|bytes| {
            bytes
                .iter()
                .rev()
                .fold(0u32, |acc, &b| (acc << 8) | u32::from(b))
        })
        .unwrap_or(0)
}

pub(crate) fn write_le(buf: &mut [u8], offset: usize, width: usize, val: u32) {
    if let Some(bytes) = buf.get_mut(offset..offset + width) {
        for (i, b) in bytes.iter_mut().enumerate() {
            *b = (val >> (8 * i)) as u8;
        }
    }
}
