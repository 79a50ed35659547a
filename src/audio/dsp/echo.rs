// Echo: a delay line in RAM fed through an 8-tap FIR filter.

use dasp::frame::{
    Frame,
    Stereo
};
use serde::{
    Serialize,
    Deserialize
};

use crate::mem::RAM;

const ECHO_STEP_SIZE: u16 = 0x800;  // Bytes of buffer per unit of delay.
const FRAME_BYTES: u16 = 4;
const HISTORY_SIZE: usize = 8;

#[derive(Clone, Serialize, Deserialize)]
pub struct Echo {
    // Registers
    vol_left:   i8,
    vol_right:  i8,
    feedback:   i8,
    enable:     u8,
    start_page: u8,
    delay:      u8,
    fir_coefs:  [i8; 8],

    // Internal
    length:     u16,    // Buffer length in bytes, latched at the start of the buffer.
    offset:     u16,
    history:    [Stereo<i16>; HISTORY_SIZE],
    history_pos: usize, // Index of the newest sample.
}

impl Echo {
    pub fn new() -> Self {
        Echo {
            vol_left:   0,
            vol_right:  0,
            feedback:   0,
            enable:     0,
            start_page: 0,
            delay:      0,
            fir_coefs:  [0; 8],

            length:     0,
            offset:     0,
            history:    [Stereo::<i16>::EQUILIBRIUM; HISTORY_SIZE],
            history_pos: 0,
        }
    }

    pub fn read_vol_left(&self) -> u8 { self.vol_left as u8 }
    pub fn read_vol_right(&self) -> u8 { self.vol_right as u8 }
    pub fn read_feedback(&self) -> u8 { self.feedback as u8 }
    pub fn read_enable(&self) -> u8 { self.enable }
    pub fn read_start_page(&self) -> u8 { self.start_page }
    pub fn read_delay(&self) -> u8 { self.delay }

    pub fn write_vol_left(&mut self, data: u8) { self.vol_left = data as i8; }
    pub fn write_vol_right(&mut self, data: u8) { self.vol_right = data as i8; }
    pub fn write_feedback(&mut self, data: u8) { self.feedback = data as i8; }
    pub fn write_enable(&mut self, data: u8) { self.enable = data; }
    pub fn write_start_page(&mut self, data: u8) { self.start_page = data; }
    pub fn write_delay(&mut self, data: u8) { self.delay = data; }

    pub fn read_fir(&self, tap: usize) -> u8 {
        self.fir_coefs[tap & 7] as u8
    }

    pub fn write_fir(&mut self, tap: usize, data: u8) {
        self.fir_coefs[tap & 7] = data as i8;
    }

    pub fn is_enabled(&self, voice: usize) -> bool {
        test_bit!(self.enable, voice, u8)
    }

    // Read the next buffered sample and filter it.
    pub fn filter(&mut self, ram: &RAM) -> Stereo<i32> {
        let addr = self.address();
        self.history_pos = (self.history_pos + 1) % HISTORY_SIZE;
        self.history[self.history_pos] = [
            (ram.read16(addr) as i16) >> 1,
            (ram.read16(addr.wrapping_add(2)) as i16) >> 1,
        ];

        let mut out = Stereo::<i32>::EQUILIBRIUM;
        for ch in 0..2 {
            // Oldest sample uses the first coefficient.
            let tap = |i: usize| {
                let sample = self.history[(self.history_pos + 1 + i) % HISTORY_SIZE][ch] as i32;
                (sample * (self.fir_coefs[i] as i32)) >> 6
            };
            let sum = (0..7).map(&tap).sum::<i32>() as i16 as i32;
            let sum = sum + (tap(7) as i16 as i32);
            out[ch] = clamp16!(sum) & !1;
        }
        out
    }

    // Volume applied to the filtered echo for the final output.
    pub fn output(&self, fir: Stereo<i32>) -> Stereo<i32> {
        [
            (((fir[0] * (self.vol_left as i32)) >> 7) as i16) as i32,
            (((fir[1] * (self.vol_right as i32)) >> 7) as i16) as i32,
        ]
    }

    // Write the new echo input with feedback, then move to the next position.
    // The buffer is plain RAM: the I/O registers and the boot ROM overlay do not apply here.
    pub fn write(&mut self, ram: &mut RAM, input: Stereo<i32>, fir: Stereo<i32>, writes_enabled: bool) {
        if writes_enabled {
            let addr = self.address();
            for ch in 0..2 {
                let feedback = (((fir[ch] * (self.feedback as i32)) >> 7) as i16) as i32;
                let sample = (clamp16!(input[ch] + feedback) & !1) as u16;
                let ch_addr = addr.wrapping_add((ch as u16) * 2);
                ram.write(ch_addr, lo!(sample));
                ram.write(ch_addr.wrapping_add(1), hi!(sample));
            }
        }

        if self.offset == 0 {
            self.length = ((self.delay & 0xF) as u16) * ECHO_STEP_SIZE;
        }
        self.offset += FRAME_BYTES;
        if self.offset >= self.length {
            self.offset = 0;
        }
    }

    pub fn is_valid(&self) -> bool {
        let max_length = 0xF * ECHO_STEP_SIZE;
        self.offset % FRAME_BYTES == 0 &&
        self.offset < max_length &&
        self.length % FRAME_BYTES == 0 &&
        self.length <= max_length &&
        self.history_pos < HISTORY_SIZE
    }

    // Zero the echo region of RAM for the current delay setting.
    pub fn clear(&mut self, ram: &mut RAM) {
        let length = std::cmp::max(((self.delay & 0xF) as u16) * ECHO_STEP_SIZE, FRAME_BYTES);
        let start = make16!(self.start_page, 0);
        for i in 0..length {
            ram.write(start.wrapping_add(i), 0);
        }
        self.history = [Stereo::<i16>::EQUILIBRIUM; HISTORY_SIZE];
        self.offset = 0;
    }

    #[cfg(test)]
    pub fn offset(&self) -> u16 {
        self.offset
    }
}

impl Echo {
    fn address(&self) -> u16 {
        make16!(self.start_page, 0).wrapping_add(self.offset)
    }
}
