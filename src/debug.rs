// For stepping through the SPC-700.

use crate::audio::EnvelopeStage;

// Capture of SPC internal state.
pub struct SPCState {
    // Registers
    pub a:      u8,     // Accumulator
    pub x:      u8,     // X-Index
    pub y:      u8,     // Y-Index
    pub sp:     u8,     // Stack Pointer
    pub pc:     u16,    // Program Counter
    pub ps:     u8,     // Program Status
    pub halted: bool,   // Stopped by SLEEP or STOP
}

impl SPCState {
    pub fn to_string(&self) -> String {
        format!("a: ${:02X} x: ${:02X} y: ${:02X} sp: ${:02X} pc: ${:04X}\n\
                nvpbhizc: {:08b}{}",
                self.a, self.x, self.y, self.sp, self.pc,
                self.ps, if self.halted {" (halted)"} else {""})
    }
}

// Capture of a single DSP voice.
pub struct VoiceState {
    pub stage:  EnvelopeStage,
    pub level:  i16,    // Envelope level
    pub envx:   u8,
    pub outx:   u8,
    pub pitch:  u16,
    pub src:    u8,     // Sample directory index
    pub ended:  bool,   // ENDX bit
}

impl VoiceState {
    pub fn to_string(&self) -> String {
        format!("{:?} ${:03X} envx: ${:02X} outx: ${:02X} pitch: ${:04X} src: ${:02X}{}",
                self.stage, self.level, self.envx, self.outx,
                self.pitch, self.src, if self.ended {" (ended)"} else {""})
    }
}
