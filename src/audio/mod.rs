// APU
// Consists of a host port interface, the SPC-700 8-bit processor, and an 8-channel DSP.

mod dsp;
mod filter;
mod mem;
mod snapshot;
mod spc;

use std::collections::VecDeque;

use dasp::frame::Stereo;
use log::{
    debug,
    info,
    warn
};
use serde::{
    Serialize,
    Deserialize
};

use crate::{
    constants::{
        mem::*,
        timing::{
            MAX_STEP_CYCLES,
            SAMPLE_CYCLES
        }
    },
    error::{
        APUError,
        Result
    }
};

use spc::SPC;
use mem::{
    SPCBus,
    IPL_ROM
};

pub use dsp::EnvelopeStage;
pub use filter::OutputFilter;

// The APU processes SPC instructions and generates audio.
#[derive(Clone, Serialize, Deserialize)]
pub struct APU {
    spc:            SPC<SPCBus>,

    ram_image:      Option<Vec<u8>>,    // Loaded into RAM on hard reset.

    cycle_count:    u64,    // SPC cycles executed.
    target:         u64,    // SPC cycles requested by the host.
    released:       u64,    // Samples moved into the output buffer.
    output:         VecDeque<Stereo<i16>>,
}

impl APU {
    // Construct with the standard boot ROM and empty RAM.
    pub fn new() -> Self {
        APU::build(&IPL_ROM, None)
    }

    // Load boot firmware and initial memory contents, then hard reset.
    // Existing state is kept if either image is rejected.
    pub fn initialize(&mut self, boot_image: Option<&[u8]>, ram_image: Option<&[u8]>) -> Result<()> {
        let boot_rom: &[u8] = match boot_image {
            Some(image) => {
                check_size(image, IPL_ROM_SIZE)?;
                let vector = make16!(image[IPL_ROM_SIZE - 1], image[IPL_ROM_SIZE - 2]);
                if vector < IPL_ROM_START {
                    warn!("Boot image reset vector {:04X} is outside of the boot ROM", vector);
                    return Err(APUError::InvalidImageFormat(format!("reset vector {:04X} is outside of the boot ROM", vector)));
                }
                image
            },
            None => &IPL_ROM[..]
        };
        if let Some(image) = ram_image {
            check_size(image, SPC_RAM_SIZE)?;
        }

        info!("Initializing APU (custom boot image: {}, RAM image: {})", boot_image.is_some(), ram_image.is_some());
        *self = APU::build(boot_rom, ram_image);
        Ok(())
    }

    // Host side of the communication ports.
    pub fn write_port(&mut self, port_num: usize, data: u8) {
        self.spc.mem_mut().write_port(port_num, data);
    }

    pub fn read_port(&self, port_num: usize) -> u8 {
        self.spc.mem().read_port(port_num)
    }

    // Advance by the given number of SPC clocks.
    pub fn run_until(&mut self, clocks: u64) {
        self.target += clocks;
        while self.cycle_count < self.target {
            self.cycle_count += self.spc.step() as u64;
        }
        self.release_samples();
    }

    // Drain up to max_count stereo samples, oldest first.
    // Samples not taken from the iterator remain for the next call.
    pub fn read_samples(&mut self, max_count: usize) -> Samples {
        Samples {
            buffer:     &mut self.output,
            remaining:  max_count,
        }
    }

    // Number of samples ready to be read.
    pub fn samples_available(&self) -> usize {
        self.output.len()
    }

    // Advance and throw away any samples generated.
    pub fn skip(&mut self, clocks: u64) {
        let buffered = self.output.len();
        self.run_until(clocks);
        self.output.truncate(buffered);
    }

    // Soft reset keeps RAM. Hard reset reloads the RAM image.
    pub fn reset(&mut self, soft: bool) {
        debug!("{} reset", if soft {"Soft"} else {"Hard"});

        let bus = self.spc.mem_mut();
        bus.reset();
        if !soft {
            match &self.ram_image {
                Some(image) => bus.ram_mut().fill(image),
                None => bus.ram_mut().fill(&vec![0; SPC_RAM_SIZE]),
            }
        }
        self.spc.reset();

        self.cycle_count = 0;
        self.target = 0;
        self.released = 0;
    }

    // Zero the echo buffer in RAM.
    pub fn clear_echo(&mut self) {
        let (dsp, ram) = self.spc.mem_mut().dsp_and_ram();
        dsp.clear_echo(ram);
    }

    // Muted voices keep running, but are left out of the output.
    pub fn mute_voices(&mut self, mask: u8) {
        self.spc.mem_mut().dsp_mut().mute_voices(mask);
    }

    pub fn save_snapshot(&self) -> Result<Vec<u8>> {
        snapshot::encode(self)
    }

    // State is only replaced if the whole snapshot decodes.
    pub fn load_snapshot(&mut self, data: &[u8]) -> Result<()> {
        let state = snapshot::decode(data).map_err(|e| {
            warn!("Rejected snapshot: {}", e);
            e
        })?;
        *self = state;
        Ok(())
    }

    // Stage and level of a voice's envelope.
    pub fn voice_envelope(&self, voice: usize) -> (EnvelopeStage, i16) {
        self.spc.mem().dsp().voice_envelope(voice)
    }
}

impl Default for APU {
    fn default() -> Self {
        APU::new()
    }
}

// Debug
#[cfg(feature = "debug")]
impl APU {
    // Capture the state of the internal registers.
    pub fn get_state(&self) -> crate::debug::SPCState {
        self.spc.get_state()
    }

    // Read a memory address without side effects.
    pub fn get_mem_at(&self, addr: u16) -> u8 {
        self.spc.mem().peek(addr)
    }

    // Get the instruction at the current PC, with the next 2 bytes for context.
    pub fn get_instr(&self) -> [u8; 3] {
        let pc = self.spc.get_state().pc;
        let bus = self.spc.mem();
        [
            bus.peek(pc),
            bus.peek(pc.wrapping_add(1)),
            bus.peek(pc.wrapping_add(2))
        ]
    }

    pub fn get_dsp_reg(&self, addr: u8) -> u8 {
        self.spc.mem().dsp().read(addr & 0x7F)
    }

    pub fn get_timers(&self) -> [u8; 3] {
        self.spc.mem().timer_outputs()
    }

    pub fn get_voice_state(&self, voice: usize) -> crate::debug::VoiceState {
        let dsp = self.spc.mem().dsp();
        let v = voice & 7;
        let reg = |n: u8| dsp.read(((v as u8) << 4) | n);
        let (stage, level) = dsp.voice_envelope(v);
        crate::debug::VoiceState {
            stage:  stage,
            level:  level,
            envx:   reg(0x8),
            outx:   reg(0x9),
            pitch:  make16!(reg(0x3), reg(0x2)) & 0x3FFF,
            src:    reg(0x4),
            ended:  test_bit!(dsp.read(0x7C), v, u8),
        }
    }

    // Cycles executed, cycles requested and samples released.
    pub fn get_clock(&self) -> (u64, u64, u64) {
        (self.cycle_count, self.target, self.released)
    }

    // Step a single instruction. Samples are released as if the host asked for exactly these cycles.
    pub fn step(&mut self) -> usize {
        let cycles = self.spc.step();
        self.cycle_count += cycles as u64;
        self.target = self.cycle_count;
        self.release_samples();
        cycles
    }
}

// Internal
impl APU {
    fn build(boot_rom: &[u8], ram_image: Option<&[u8]>) -> Self {
        let mut bus = SPCBus::new(boot_rom);
        if let Some(image) = ram_image {
            bus.ram_mut().fill(image);
        }

        APU {
            spc:            SPC::new(bus),

            ram_image:      ram_image.map(|i| i.to_vec()),

            cycle_count:    0,
            target:         0,
            released:       0,
            output:         VecDeque::new(),
        }
    }

    // Move generated samples into the output, up to the requested time.
    fn release_samples(&mut self) {
        let due = self.target / (SAMPLE_CYCLES as u64);
        let dsp = self.spc.mem_mut().dsp_mut();
        while self.released < due {
            match dsp.take_frame() {
                Some(frame) => {
                    self.output.push_back(frame);
                    self.released += 1;
                },
                None => break
            }
        }
    }

    // Check a restored state is usable.
    fn validate(&self) -> Result<()> {
        let bus = self.spc.mem();
        if bus.ram().as_slice().len() != SPC_RAM_SIZE {
            return Err(APUError::IncompatibleSnapshot("RAM size mismatch".to_string()));
        }
        if bus.boot_rom_size() != IPL_ROM_SIZE {
            return Err(APUError::IncompatibleSnapshot("boot ROM size mismatch".to_string()));
        }
        if !bus.timers_valid() {
            return Err(APUError::IncompatibleSnapshot("timer state out of range".to_string()));
        }
        if !bus.dsp().is_valid() {
            return Err(APUError::IncompatibleSnapshot("DSP state out of range".to_string()));
        }

        // Every executed cycle has been given to the DSP, and samples are released up to the target.
        let sample_cycles = SAMPLE_CYCLES as u64;
        let generated = self.released + bus.dsp().frame_count() as u64;
        let clocks_ok = self.cycle_count >= self.target &&
            self.cycle_count - self.target < MAX_STEP_CYCLES as u64 &&
            self.released == self.target / sample_cycles &&
            generated == self.cycle_count / sample_cycles;
        if !clocks_ok {
            return Err(APUError::IncompatibleSnapshot("sample clock mismatch".to_string()));
        }
        Ok(())
    }
}

fn check_size(image: &[u8], expected: usize) -> Result<()> {
    if image.len() != expected {
        warn!("Image is {} bytes, expected {}", image.len(), expected);
        Err(APUError::InvalidImageSize {
            expected:   expected,
            actual:     image.len(),
        })
    } else {
        Ok(())
    }
}

// Lazily drains samples from the output buffer.
pub struct Samples<'a> {
    buffer:     &'a mut VecDeque<Stereo<i16>>,
    remaining:  usize,
}

impl Iterator for Samples<'_> {
    type Item = Stereo<i16>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let frame = self.buffer.pop_front()?;
        self.remaining -= 1;
        Some(frame)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = std::cmp::min(self.remaining, self.buffer.len());
        (len, Some(len))
    }
}
