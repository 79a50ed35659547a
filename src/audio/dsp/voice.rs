// A single audio channel

use fixed::types::U4F12;
use serde::{
    Serialize,
    Deserialize
};

use super::{
    brr::{BRRDecoder, BlockEvent},
    envelope::{Envelope, EnvelopeStage},
    tables::gaussian,
};
use crate::mem::RAM;

const PITCH_MASK: u16 = 0x3FFF;
const MAX_PITCH_COUNTER: u16 = 0x7FFF;
const GROUP_STEP: u16 = 0x4000;     // Counter value where the next 4 samples are needed.

const KEY_ON_DELAY: u8 = 5;

// Shared state for all voices during a single sample.
pub struct VoiceTick {
    pub counter:    u16,            // Global rate counter
    pub dir:        u16,            // Sample directory base address
    pub noise:      i16,
    pub use_noise:  bool,
    pub pitch_mod:  Option<i16>,    // Output of the previous voice, if modulating.
}

#[derive(Clone, Serialize, Deserialize)]
pub struct Voice {
    left_vol:   i8,
    right_vol:  i8,

    pitch:      u16,

    src_num:    u8, // Index into the sample directory.

    // Read
    envx:       u8,
    outx:       u8,

    unused:     [u8; 3],    // $xA, $xB and $xE

    envelope:   Envelope,
    brr:        BRRDecoder,
    counter:    U4F12,      // Position within the decoded samples.
    kon_delay:  u8,
    output:     i16,
}

impl Voice {
    pub fn new() -> Self {
        Voice {
            left_vol:   0,
            right_vol:  0,

            pitch:      0,

            src_num:    0,

            envx:       0,
            outx:       0,

            unused:     [0; 3],

            envelope:   Envelope::new(),
            brr:        BRRDecoder::new(),
            counter:    U4F12::from_bits(0),
            kon_delay:  0,
            output:     0,
        }
    }

    // Uses a 4-bit address to index registers.
    pub fn read(&self, addr: u8) -> u8 {
        match addr & 0xF {
            0x0 => self.left_vol as u8,
            0x1 => self.right_vol as u8,
            0x2 => lo!(self.pitch),
            0x3 => hi!(self.pitch),
            0x4 => self.src_num,
            0x5 => lo!(self.envelope.adsr()),
            0x6 => hi!(self.envelope.adsr()),
            0x7 => self.envelope.gain(),
            0x8 => self.envx,
            0x9 => self.outx,
            0xA => self.unused[0],
            0xB => self.unused[1],
            0xE => self.unused[2],
            _ => 0,
        }
    }

    pub fn write(&mut self, addr: u8, data: u8) {
        match addr & 0xF {
            0x0 => self.left_vol = data as i8,
            0x1 => self.right_vol = data as i8,
            0x2 => self.pitch = set_lo!(self.pitch, data),
            0x3 => self.pitch = set_hi!(self.pitch, data),
            0x4 => self.src_num = data,
            0x5 => self.envelope.set_adsr_lo(data),
            0x6 => self.envelope.set_adsr_hi(data),
            0x7 => self.envelope.set_gain(data),
            0x8 => self.envx = data,
            0x9 => self.outx = data,
            0xA => self.unused[0] = data,
            0xB => self.unused[1] = data,
            0xE => self.unused[2] = data,
            _ => {},
        }
    }

    pub fn key_on(&mut self) {
        self.kon_delay = KEY_ON_DELAY;
        self.envelope.key_on();
    }

    pub fn key_off(&mut self) {
        self.envelope.key_off();
    }

    pub fn stop(&mut self) {
        self.kon_delay = 0;
        self.envelope.stop();
    }

    pub fn is_valid(&self) -> bool {
        self.kon_delay <= KEY_ON_DELAY &&
        self.counter.to_bits() <= MAX_PITCH_COUNTER &&
        self.envelope.is_valid() &&
        self.brr.is_valid()
    }

    pub fn output(&self) -> i16 {
        self.output
    }

    pub fn envelope_level(&self) -> i16 {
        self.envelope.level()
    }

    pub fn envelope_stage(&self) -> EnvelopeStage {
        self.envelope.stage()
    }

    // Volume applied to the output, for each side.
    pub fn volume(&self) -> [i8; 2] {
        [self.left_vol, self.right_vol]
    }

    // Generate the next output sample. Returns true if the end of the sample was reached.
    pub fn clock(&mut self, ram: &RAM, tick: &VoiceTick) -> bool {
        if self.kon_delay > 0 {
            return self.start_up(ram, tick);
        }

        if self.envelope.is_off() {
            self.output = 0;
            self.update_readback();
            return false;
        }

        let sample = if tick.use_noise {
            tick.noise
        } else {
            let pos = self.counter.to_bits();
            self.interpolate(pos)
        };
        self.output = (((sample as i32) * (self.envelope.level() as i32)) >> 11) as i16 & !1;

        self.envelope.clock(tick.counter);

        let ended = self.advance(ram, tick);
        self.update_readback();
        ended
    }
}

// Internal
impl Voice {
    // Silent for a few samples after key on, while the first samples are decoded.
    fn start_up(&mut self, ram: &RAM, tick: &VoiceTick) -> bool {
        if self.kon_delay == KEY_ON_DELAY {
            let start = ram.read16(self.directory_entry(tick.dir));
            self.brr.restart(start);
            self.counter = U4F12::from_bits(0);
        }
        self.kon_delay -= 1;

        let mut ended = false;
        if (1..=3).contains(&self.kon_delay) {
            ended = self.decode(ram, tick);
        }

        self.envelope.hold();
        self.output = 0;
        self.update_readback();
        ended
    }

    // Step through the sample according to the pitch.
    fn advance(&mut self, ram: &RAM, tick: &VoiceTick) -> bool {
        let pos = self.counter.to_bits();
        let ended = if pos >= GROUP_STEP {
            self.decode(ram, tick)
        } else {
            false
        };

        if self.envelope.is_off() {
            return ended;
        }

        let base_pitch = (self.pitch & PITCH_MASK) as i32;
        let pitch = match tick.pitch_mod {
            Some(prev_out) => base_pitch + ((((prev_out as i32) >> 5) * base_pitch) >> 10),
            None => base_pitch,
        };
        let new_pos = (pos & (GROUP_STEP - 1)) as i32 + pitch;
        self.counter = U4F12::from_bits(clamp!(new_pos, 0, MAX_PITCH_COUNTER as i32) as u16);

        ended
    }

    fn decode(&mut self, ram: &RAM, tick: &VoiceTick) -> bool {
        let loop_addr = ram.read16(self.directory_entry(tick.dir).wrapping_add(2));
        match self.brr.decode_group(ram, loop_addr) {
            BlockEvent::None => false,
            BlockEvent::Looped | BlockEvent::Ended => true,
            BlockEvent::Finished => {
                self.stop();
                false
            },
        }
    }

    fn interpolate(&self, pos: u16) -> i16 {
        let frac = ((pos >> 4) & 0xFF) as u8;
        let n = (pos >> 12) as usize;
        gaussian(frac, self.brr.window(n))
    }

    fn directory_entry(&self, dir: u16) -> u16 {
        dir.wrapping_add((self.src_num as u16) * 4)
    }

    fn update_readback(&mut self) {
        self.envx = (self.envelope.level() >> 4) as u8;
        self.outx = hi!(self.output as u16);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_up_state_checked() {
        let mut voice = Voice::new();
        voice.key_on();
        assert!(voice.is_valid());

        voice.kon_delay = KEY_ON_DELAY + 1;
        assert!(!voice.is_valid());

        let mut voice = Voice::new();
        voice.counter = U4F12::from_bits(MAX_PITCH_COUNTER + 1);
        assert!(!voice.is_valid());
    }
}
