// Digital signal processor

mod brr;
mod echo;
mod envelope;
mod tables;
mod voice;
#[cfg(test)]
mod tests;

use std::collections::VecDeque;

use bitflags::bitflags;
use log::trace;
use dasp::frame::{
    Frame,
    Stereo
};
use serde::{
    Serialize,
    Deserialize
};

pub use envelope::EnvelopeStage;
use echo::Echo;
use tables::{
    COUNTER_RANGE,
    rate_fires
};
use voice::{
    Voice,
    VoiceTick
};

use crate::{
    constants::timing::SAMPLE_CYCLES,
    mem::RAM
};

bitflags! {
    #[derive(Serialize, Deserialize)]
    pub struct DSPFlags: u8 {
        const SOFT_RESET    = bit!(7);
        const MUTE          = bit!(6);
        const ECHO_WRITES   = bit!(5);  // Set to disable writes into the echo buffer.
        const NOISE_FREQ    = bits![4, 3, 2, 1, 0];
    }
}

impl Default for DSPFlags {
    fn default() -> Self {
        DSPFlags::SOFT_RESET | DSPFlags::MUTE | DSPFlags::ECHO_WRITES
    }
}

const NOISE_INIT: u16 = 0x4000;

#[derive(Clone, Serialize, Deserialize)]
pub struct DSP {
    cycle_count:    usize,
    frames:         VecDeque<Stereo<i16>>,

    main_vol_left:  i8,
    main_vol_right: i8,

    flags:          DSPFlags,

    key_on:         u8,
    new_key_on:     u8, // Voices waiting to be keyed on at the next sample.
    key_off:        u8,
    endx:           u8,

    pitch_mod:      u8,
    noise_enable:   u8,
    src_offset:     u8,
    unused:         u8, // $1D

    counter:        u16,
    noise:          u16,
    mute_mask:      u8,

    echo:           Echo,
    voices:         [Voice; 8],
}

impl DSP {
    pub fn new() -> Self {
        DSP {
            cycle_count:    0,
            frames:         VecDeque::new(),

            main_vol_left:  0,
            main_vol_right: 0,

            flags:          DSPFlags::default(),

            key_on:         0,
            new_key_on:     0,
            key_off:        0,
            endx:           0,

            pitch_mod:      0,
            noise_enable:   0,
            src_offset:     0,
            unused:         0,

            counter:        0,
            noise:          NOISE_INIT,
            mute_mask:      0,

            echo:           Echo::new(),
            voices:         [
                Voice::new(),
                Voice::new(),
                Voice::new(),
                Voice::new(),
                Voice::new(),
                Voice::new(),
                Voice::new(),
                Voice::new(),
            ],
        }
    }

    // Generate a new sample every 32 cycles.
    pub fn clock(&mut self, cycles: usize, ram: &mut RAM) {
        self.cycle_count += cycles;
        while self.cycle_count >= SAMPLE_CYCLES {
            self.cycle_count -= SAMPLE_CYCLES;
            let frame = self.generate_frame(ram);
            self.frames.push_back(frame);
        }
    }

    // Oldest generated frame.
    pub fn take_frame(&mut self) -> Option<Stereo<i16>> {
        self.frames.pop_front()
    }

    // Frames generated but not yet taken.
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn read(&self, addr: u8) -> u8 {
        match addr {
            0x0C => self.main_vol_left as u8,
            0x1C => self.main_vol_right as u8,
            0x2C => self.echo.read_vol_left(),
            0x3C => self.echo.read_vol_right(),
            0x4C => self.key_on,
            0x5C => self.key_off,
            0x6C => self.flags.bits(),
            0x7C => self.endx,

            0x0D => self.echo.read_feedback(),
            0x1D => self.unused,
            0x2D => self.pitch_mod,
            0x3D => self.noise_enable,
            0x4D => self.echo.read_enable(),
            0x5D => self.src_offset,
            0x6D => self.echo.read_start_page(),
            0x7D => self.echo.read_delay(),

            _ if lo_nybble!(addr) == 0xF => self.echo.read_fir(hi_nybble!(addr) as usize),

            0x00..=0x7F => self.voices[(addr >> 4) as usize].read(addr),

            _ => 0
        }
    }

    pub fn write(&mut self, addr: u8, data: u8) {
        match addr {
            0x0C => self.main_vol_left = data as i8,
            0x1C => self.main_vol_right = data as i8,
            0x2C => self.echo.write_vol_left(data),
            0x3C => self.echo.write_vol_right(data),
            0x4C => self.set_key_on(data),
            0x5C => self.key_off = data,
            0x6C => self.flags = DSPFlags::from_bits_truncate(data),
            0x7C => self.endx = 0,

            0x0D => self.echo.write_feedback(data),
            0x1D => self.unused = data,
            0x2D => self.pitch_mod = data,
            0x3D => self.noise_enable = data,
            0x4D => self.echo.write_enable(data),
            0x5D => self.src_offset = data,
            0x6D => self.echo.write_start_page(data),
            0x7D => self.echo.write_delay(data),

            _ if lo_nybble!(addr) == 0xF => self.echo.write_fir(hi_nybble!(addr) as usize, data),

            0x00..=0x7F => self.voices[(addr >> 4) as usize].write(addr, data),

            _ => {}
        }
    }

    // Muted voices keep running but are left out of the mix.
    pub fn mute_voices(&mut self, mask: u8) {
        self.mute_mask = mask;
    }

    pub fn clear_echo(&mut self, ram: &mut RAM) {
        self.echo.clear(ram);
    }

    // Checks that a deserialized DSP is in a reachable state.
    pub fn is_valid(&self) -> bool {
        self.cycle_count < SAMPLE_CYCLES &&
        self.counter < COUNTER_RANGE &&
        self.echo.is_valid() &&
        self.voices.iter().all(|v| v.is_valid())
    }

    pub fn voice_envelope(&self, voice: usize) -> (EnvelopeStage, i16) {
        let v = &self.voices[voice & 7];
        (v.envelope_stage(), v.envelope_level())
    }

    #[cfg(test)]
    pub fn voice_output(&self, voice: usize) -> i16 {
        self.voices[voice & 7].output()
    }
}

// Internal
impl DSP {
    fn set_key_on(&mut self, data: u8) {
        trace!("Key on: {:08b}", data);
        self.key_on = data;
        self.new_key_on |= data;
    }

    // Generate a single left-right pair of audio samples.
    fn generate_frame(&mut self, ram: &mut RAM) -> Stereo<i16> {
        self.counter = if self.counter == 0 {COUNTER_RANGE - 1} else {self.counter - 1};
        self.step_noise();
        self.process_keys();

        let mut main = Stereo::<i32>::EQUILIBRIUM;
        let mut echo_in = Stereo::<i32>::EQUILIBRIUM;
        let mut prev_out = 0;
        for v in 0..8 {
            let tick = VoiceTick {
                counter:    self.counter,
                dir:        make16!(self.src_offset, 0),
                noise:      (self.noise << 1) as i16,
                use_noise:  test_bit!(self.noise_enable, v, u8),
                pitch_mod:  if v > 0 && test_bit!(self.pitch_mod, v, u8) {Some(prev_out)} else {None},
            };

            let voice = &mut self.voices[v];
            if voice.clock(ram, &tick) {
                self.endx |= bit!(v);
            }
            prev_out = voice.output();

            if test_bit!(self.mute_mask, v, u8) {
                continue;
            }

            let vol = voice.volume();
            for ch in 0..2 {
                let amp = ((prev_out as i32) * (vol[ch] as i32)) >> 7;
                main[ch] = clamp16!(main[ch] + amp);
                if self.echo.is_enabled(v) {
                    echo_in[ch] = clamp16!(echo_in[ch] + amp);
                }
            }
        }

        let fir = self.echo.filter(ram);
        let echo_out = self.echo.output(fir);
        let main_vol = [self.main_vol_left as i32, self.main_vol_right as i32];

        let frame = if self.flags.contains(DSPFlags::MUTE) {
            Stereo::<i16>::EQUILIBRIUM
        } else {
            let side = |ch: usize| {
                let main_out = (((main[ch] * main_vol[ch]) >> 7) as i16) as i32;
                clamp16!(main_out + echo_out[ch]) as i16
            };
            [side(0), side(1)]
        };

        let echo_writes = !self.flags.contains(DSPFlags::ECHO_WRITES);
        self.echo.write(ram, echo_in, fir, echo_writes);

        frame
    }

    fn step_noise(&mut self) {
        let rate = (self.flags & DSPFlags::NOISE_FREQ).bits();
        if rate_fires(rate, self.counter) {
            let feedback = (self.noise << 13) ^ (self.noise << 14);
            self.noise = (feedback & 0x4000) ^ (self.noise >> 1);
        }
    }

    // Key on is latched from a single write, key off is held while the register is set.
    fn process_keys(&mut self) {
        if self.flags.contains(DSPFlags::SOFT_RESET) {
            for voice in self.voices.iter_mut() {
                voice.stop();
            }
            self.new_key_on = 0;
            return;
        }

        for v in 0..8 {
            if test_bit!(self.key_off, v, u8) {
                self.voices[v].key_off();
            }
            if test_bit!(self.new_key_on, v, u8) {
                self.voices[v].key_on();
                self.endx &= !bit!(v);
            }
        }
        self.new_key_on = 0;
    }
}
