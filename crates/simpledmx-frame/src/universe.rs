use crate::error::{FrameError, Result};

/// Largest universe a single `TX_DMX_PACKET` can carry.
pub const MAX_CHANNELS: u16 = 512;

/// The current intensity of every channel in one DMX universe.
///
/// Channels are addressed 1-based (`1..=len`), matching fixture patch sheets.
/// Storage is 0-based; the conversion happens in one place. Channel `0` is
/// never addressable: [`Universe::clear`] treats it as "all channels".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Universe {
    levels: Box<[u8]>,
}

impl Universe {
    /// Create a blacked-out universe of `num_channels` channels.
    pub fn new(num_channels: u16) -> Result<Self> {
        if num_channels == 0 || num_channels > MAX_CHANNELS {
            return Err(FrameError::InvalidChannelCount(num_channels as usize));
        }
        Ok(Self {
            levels: vec![0u8; num_channels as usize].into_boxed_slice(),
        })
    }

    /// Number of channels. Never changes after construction.
    pub fn len(&self) -> u16 {
        // Bounded by MAX_CHANNELS at construction.
        self.levels.len() as u16
    }

    /// Always false; a universe has at least one channel.
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Set a channel level, clamping `val` into `0..=255`.
    ///
    /// On error the universe is left untouched.
    pub fn set_channel(&mut self, chan: u16, val: i32) -> Result<()> {
        let index = self.index(chan)?;
        self.levels[index] = val.clamp(0, 255) as u8;
        Ok(())
    }

    /// Current level of a channel.
    pub fn read_channel(&self, chan: u16) -> Result<u8> {
        let index = self.index(chan)?;
        Ok(self.levels[index])
    }

    /// Zero one channel, or every channel when `chan` is `None` or `Some(0)`.
    pub fn clear(&mut self, chan: Option<u16>) -> Result<()> {
        match chan {
            None | Some(0) => self.levels.fill(0),
            Some(chan) => {
                let index = self.index(chan)?;
                self.levels[index] = 0;
            }
        }
        Ok(())
    }

    /// Channel levels in channel order (channel 1 first).
    pub fn as_bytes(&self) -> &[u8] {
        &self.levels
    }

    fn index(&self, chan: u16) -> Result<usize> {
        if chan == 0 || chan > self.len() {
            return Err(FrameError::ChannelOutOfRange {
                channel: chan,
                max: self.len(),
            });
        }
        Ok(chan as usize - 1)
    }
}

impl Default for Universe {
    fn default() -> Self {
        Self {
            levels: vec![0u8; MAX_CHANNELS as usize].into_boxed_slice(),
        }
    }
}
