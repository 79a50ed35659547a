// Memory for the SPC-700.
mod timer;

use bitflags::bitflags;
use log::{
    debug,
    trace
};
use serde::{
    Serialize,
    Deserialize
};

use crate::{
    constants::{
        mem::*,
        timing::*
    },
    mem::RAM
};
use timer::Timer;
use super::dsp::DSP;

// Interface between the processor and everything it can address.
pub trait SPCMem {
    fn read(&mut self, addr: u16) -> u8;
    fn write(&mut self, addr: u16, data: u8);
    // Called after each instruction with the number of cycles it took.
    fn clock(&mut self, cycles: usize);
}

bitflags! {
    #[derive(Serialize, Deserialize)]
    struct SPCControl: u8 {
        const ROM_ENABLE =      bit!(7);
        const CLEAR_PORT_32 =   bit!(5);
        const CLEAR_PORT_10 =   bit!(4);
        const ENABLE_TIMER_2 =  bit!(2);
        const ENABLE_TIMER_1 =  bit!(1);
        const ENABLE_TIMER_0 =  bit!(0);
    }
}

pub const IPL_ROM: [u8; IPL_ROM_SIZE] = [
   0xCD, 0xEF, 0xBD, 0xE8, 0x00, 0xC6, 0x1D, 0xD0,
   0xFC, 0x8F, 0xAA, 0xF4, 0x8F, 0xBB, 0xF5, 0x78,
   0xCC, 0xF4, 0xD0, 0xFB, 0x2F, 0x19, 0xEB, 0xF4,
   0xD0, 0xFC, 0x7E, 0xF4, 0xD0, 0x0B, 0xE4, 0xF5,
   0xCB, 0xF4, 0xD7, 0x00, 0xFC, 0xD0, 0xF3, 0xAB,
   0x01, 0x10, 0xEF, 0x7E, 0xF4, 0x10, 0xEB, 0xBA,
   0xF6, 0xDA, 0x00, 0xBA, 0xF4, 0xC4, 0xF4, 0xDD,
   0x5D, 0xD0, 0xDB, 0x1F, 0x00, 0x00, 0xC0, 0xFF
];

#[derive(Clone, Serialize, Deserialize)]
pub struct SPCBus {
    ram:                RAM,

    boot_rom:           Vec<u8>,

    // Registers
    control:            SPCControl,
    dsp_reg_addr:       u8,
    dsp:                DSP,

    // Port data sent in from the host.
    ports_in:           [u8; 4],

    // Port data sent out to the host.
    ports_out:          [u8; 4],

    timer_0:            Timer,
    timer_1:            Timer,
    timer_2:            Timer,
}

impl SPCBus {
    pub fn new(boot_rom: &[u8]) -> Self {
        SPCBus {
            ram:        RAM::new(SPC_RAM_SIZE),

            boot_rom:   boot_rom.to_vec(),

            control:        SPCControl::ROM_ENABLE | SPCControl::CLEAR_PORT_32 | SPCControl::CLEAR_PORT_10,
            dsp_reg_addr:   0,
            dsp:            DSP::new(),

            ports_in:       [0; 4],
            ports_out:      [0; 4],

            timer_0:        Timer::new(SLOW_TIMER_PERIOD),
            timer_1:        Timer::new(SLOW_TIMER_PERIOD),
            timer_2:        Timer::new(FAST_TIMER_PERIOD),
        }
    }

    // Registers and DSP go back to power-on state. RAM is left alone.
    pub fn reset(&mut self) {
        let ram = std::mem::replace(&mut self.ram, RAM::new(0));
        let boot_rom = std::mem::replace(&mut self.boot_rom, Vec::new());
        *self = SPCBus::new(&boot_rom);
        self.ram = ram;
    }

    pub fn ram(&self) -> &RAM {
        &self.ram
    }

    pub fn ram_mut(&mut self) -> &mut RAM {
        &mut self.ram
    }

    pub fn dsp(&self) -> &DSP {
        &self.dsp
    }

    pub fn dsp_mut(&mut self) -> &mut DSP {
        &mut self.dsp
    }

    // Split borrow for operations that need both.
    pub fn dsp_and_ram(&mut self) -> (&mut DSP, &mut RAM) {
        (&mut self.dsp, &mut self.ram)
    }

    // Host side of the ports.
    pub fn write_port(&mut self, port_num: usize, data: u8) {
        self.ports_in[port_num & 3] = data;
    }

    pub fn read_port(&self, port_num: usize) -> u8 {
        self.ports_out[port_num & 3]
    }

    pub fn boot_rom_size(&self) -> usize {
        self.boot_rom.len()
    }

    pub fn timers_valid(&self) -> bool {
        self.timer_0.is_valid(SLOW_TIMER_PERIOD) &&
        self.timer_1.is_valid(SLOW_TIMER_PERIOD) &&
        self.timer_2.is_valid(FAST_TIMER_PERIOD)
    }

    pub fn timer_outputs(&self) -> [u8; 3] {
        [self.timer_0.peek_counter(), self.timer_1.peek_counter(), self.timer_2.peek_counter()]
    }

    // Read without side effects.
    pub fn peek(&self, addr: u16) -> u8 {
        match addr {
            0xF0..=0xF1 => 0,

            0xF2 => self.dsp_reg_addr,
            0xF3 => self.dsp.read(self.dsp_reg_addr & 0x7F),

            0xF4..=0xF7 => self.ports_in[(addr - 0xF4) as usize],

            0xFA..=0xFC => 0,

            0xFD..=0xFF => self.timer_outputs()[(addr - 0xFD) as usize],

            IPL_ROM_START..=0xFFFF if self.control.contains(SPCControl::ROM_ENABLE) => self.boot_rom[(addr - IPL_ROM_START) as usize],

            _ => self.ram.read(addr)
        }
    }
}

impl SPCMem for SPCBus {
    fn read(&mut self, addr: u16) -> u8 {
        match addr {
            0xFD => self.timer_0.read_counter(),
            0xFE => self.timer_1.read_counter(),
            0xFF => self.timer_2.read_counter(),

            _ => self.peek(addr)
        }
    }

    fn write(&mut self, addr: u16, data: u8) {
        match addr {
            0xF0 => trace!("Write {:X} to test register", data),
            0xF1 => self.set_control(data),

            0xF2 => self.dsp_reg_addr = data,
            0xF3 => if self.dsp_reg_addr < 0x80 {
                self.dsp.write(self.dsp_reg_addr, data);
            },

            0xF4..=0xF7 => self.ports_out[(addr - 0xF4) as usize] = data,

            0xFA => self.timer_0.write_target(data),
            0xFB => self.timer_1.write_target(data),
            0xFC => self.timer_2.write_target(data),

            0xFD..=0xFF => {},

            // Writes to the boot ROM area go through to RAM underneath.
            _ => self.ram.write(addr, data)
        }
    }

    fn clock(&mut self, cycles: usize) {
        self.timer_0.clock(cycles);
        self.timer_1.clock(cycles);
        self.timer_2.clock(cycles);

        self.dsp.clock(cycles, &mut self.ram);
    }
}

impl SPCBus {
    fn set_control(&mut self, data: u8) {
        let control = SPCControl::from_bits_truncate(data);
        debug!("Control: {:02X}", data);

        self.timer_0.set_enabled(control.contains(SPCControl::ENABLE_TIMER_0));
        self.timer_1.set_enabled(control.contains(SPCControl::ENABLE_TIMER_1));
        self.timer_2.set_enabled(control.contains(SPCControl::ENABLE_TIMER_2));

        if control.contains(SPCControl::CLEAR_PORT_10) {
            trace!("Clear input ports 0 and 1");
            self.ports_in[0] = 0;
            self.ports_in[1] = 0;
        }
        if control.contains(SPCControl::CLEAR_PORT_32) {
            trace!("Clear input ports 2 and 3");
            self.ports_in[2] = 0;
            self.ports_in[3] = 0;
        }

        self.control = control;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rom_mapping() {
        let mut bus = SPCBus::new(&IPL_ROM);
        assert_eq!(bus.read(0xFFC0), 0xCD);
        bus.write(0xFFC0, 0x12);
        assert_eq!(bus.read(0xFFC0), 0xCD);

        bus.write(0xF1, 0x00);
        assert_eq!(bus.read(0xFFC0), 0x12);
        bus.write(0xF1, 0x80);
        assert_eq!(bus.read(0xFFC0), 0xCD);
    }

    #[test]
    fn write_only_registers_read_zero() {
        let mut bus = SPCBus::new(&IPL_ROM);
        bus.write(0xF1, 0x07);
        bus.write(0xFA, 0x10);
        bus.write(0xFB, 0x20);
        bus.write(0xFC, 0x30);
        for addr in [0xF0, 0xF1, 0xFA, 0xFB, 0xFC].iter() {
            assert_eq!(bus.read(*addr), 0);
        }
    }

    #[test]
    fn ports() {
        let mut bus = SPCBus::new(&IPL_ROM);
        bus.write_port(0, 0x11);
        bus.write_port(3, 0x44);
        assert_eq!(bus.read(0xF4), 0x11);
        assert_eq!(bus.read(0xF7), 0x44);

        // Writes from the processor go to the other side.
        bus.write(0xF4, 0xAA);
        assert_eq!(bus.read(0xF4), 0x11);
        assert_eq!(bus.read_port(0), 0xAA);

        bus.write(0xF1, 0x30);
        assert_eq!(bus.read(0xF4), 0);
        assert_eq!(bus.read(0xF7), 0);
        assert_eq!(bus.read_port(0), 0xAA);
    }

    #[test]
    fn dsp_registers() {
        let mut bus = SPCBus::new(&IPL_ROM);
        bus.write(0xF2, 0x0C);
        bus.write(0xF3, 0x55);
        assert_eq!(bus.read(0xF3), 0x55);

        // Upper mirror is read-only.
        bus.write(0xF2, 0x8C);
        assert_eq!(bus.read(0xF3), 0x55);
        bus.write(0xF3, 0x66);
        assert_eq!(bus.read(0xF3), 0x55);
        assert_eq!(bus.read(0xF2), 0x8C);
    }

    #[test]
    fn timer_counter_read_clears() {
        let mut bus = SPCBus::new(&IPL_ROM);
        bus.write(0xFA, 2);
        bus.write(0xF1, 0x01);
        bus.clock(SLOW_TIMER_PERIOD * 6);
        assert_eq!(bus.read(0xFD), 3);
        assert_eq!(bus.read(0xFD), 0);
    }

    #[test]
    fn restarting_timer_clears_counter() {
        let mut bus = SPCBus::new(&IPL_ROM);
        bus.write(0xFC, 1);
        bus.write(0xF1, 0x04);
        bus.clock(FAST_TIMER_PERIOD * 5);
        bus.write(0xF1, 0x00);
        bus.write(0xF1, 0x04);
        assert_eq!(bus.read(0xFF), 0);
    }

    #[test]
    fn dsp_clocked_by_bus() {
        let mut bus = SPCBus::new(&IPL_ROM);
        bus.clock(SAMPLE_CYCLES * 4);
        assert_eq!(bus.dsp().frame_count(), 4);
    }

    #[test]
    fn echo_writes_bypass_registers() {
        let mut bus = SPCBus::new(&IPL_ROM);
        for &(reg, val) in [(0x6D, 0xFF), (0x7D, 0x01), (0x6C, 0x00)].iter() {
            bus.write(0xF2, reg);
            bus.write(0xF3, val);
        }
        bus.write_port(0, 0x11);
        bus.write(0xF4, 0xAA);
        bus.ram_mut().write(0x00F4, 0x55);
        bus.ram_mut().write(0xFFC0, 0x55);

        // The buffer runs from $FF00 and wraps past $0000.
        bus.clock(SAMPLE_CYCLES * 200);
        assert_eq!(bus.ram().read(0x00F4), 0);
        assert_eq!(bus.ram().read(0xFFC0), 0);
        assert_eq!(bus.read(0xF4), 0x11);
        assert_eq!(bus.read_port(0), 0xAA);
        assert_eq!(bus.read(0xFFC0), 0xCD);
    }

    #[test]
    fn timer_state_checked() {
        let mut bus = SPCBus::new(&IPL_ROM);
        bus.write(0xF1, 0x07);
        bus.clock(1000);
        assert!(bus.timers_valid());

        bus.timer_2 = Timer::new(SLOW_TIMER_PERIOD);
        assert!(!bus.timers_valid());
    }
}
