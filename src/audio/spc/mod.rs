// SPC-700 Audio processor
mod types;
#[cfg(test)]
mod tests;

use log::{
    debug,
    trace
};
use serde::{
    Serialize,
    Deserialize
};

use types::*;
use super::mem::SPCMem;
use crate::constants::{
    mem::*,
    timing::HALTED_CYCLES
};

#[derive(Clone, Serialize, Deserialize)]
pub struct SPC<M: SPCMem> {
    a:      u8,         // Accumulator
    x:      u8,         // X-Index
    y:      u8,         // Y-Index
    sp:     u8,         // Stack Pointer
    pc:     u16,        // Program Counter

    ps:     PSFlags,    // Program Status Word

    halted: bool,       // Stopped by SLEEP or STOP

    #[serde(skip)]
    cycles: usize,      // Cycles taken by the current instruction

    mem:    M
}

impl<M: SPCMem> SPC<M> {
    pub fn new(mem: M) -> Self {
        let mut spc = SPC {
            a:      0,
            x:      0,
            y:      0,
            sp:     0,
            pc:     0,

            ps:     PSFlags::default(),

            halted: false,
            cycles: 0,

            mem:    mem
        };
        spc.reset();
        spc
    }

    // Clear registers and jump to the reset vector.
    pub fn reset(&mut self) {
        self.a = 0;
        self.x = 0;
        self.y = 0;
        self.sp = 0;
        self.ps = PSFlags::default();
        self.halted = false;

        let lo = self.mem.read(RESET_VECTOR);
        let hi = self.mem.read(RESET_VECTOR.wrapping_add(1));
        self.pc = make16!(hi, lo);
    }

    // Execute a single instruction, then clock the rest of the system. Returns the cycles used.
    pub fn step(&mut self) -> usize {
        let cycles = if self.halted {
            HALTED_CYCLES
        } else {
            self.execute_instruction()
        };
        self.mem.clock(cycles);
        cycles
    }

    #[cfg(test)]
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn mem(&self) -> &M {
        &self.mem
    }

    pub fn mem_mut(&mut self) -> &mut M {
        &mut self.mem
    }
}

#[cfg(feature = "debug")]
impl<M: SPCMem> SPC<M> {
    pub fn get_state(&self) -> crate::debug::SPCState {
        crate::debug::SPCState {
            a:  self.a,
            x:  self.x,
            y:  self.y,
            sp: self.sp,
            pc: self.pc,
            ps: self.ps.bits(),
            halted: self.halted,
        }
    }
}

// Internal
impl<M: SPCMem> SPC<M> {
    fn execute_instruction(&mut self) -> usize {
        use DataMode::*;
        use AddrMode::*;

        let instr = self.fetch();
        self.cycles = CYCLES[instr as usize];

        match instr {
            0x99 => self.adc(Mode(XIndir), Mode(YIndir)),
            0x88 => self.adc(Acc, Imm),
            0x86 => self.adc(Acc, Mode(XIndir)),
            0x97 => self.adc(Acc, Mode(DirPtrY)),
            0x87 => self.adc(Acc, Mode(DirXPtr)),
            0x84 => self.adc(Acc, Mode(Dir)),
            0x94 => self.adc(Acc, Mode(DirX)),
            0x85 => self.adc(Acc, Mode(Abs)),
            0x95 => self.adc(Acc, Mode(AbsX)),
            0x96 => self.adc(Acc, Mode(AbsY)),
            0x89 => self.adc(Mode(Dir), Mode(Dir)),
            0x98 => self.adc(Mode(Dir), Imm),

            0x7A => self.addw(),

            0xB9 => self.sbc(Mode(XIndir), Mode(YIndir)),
            0xA8 => self.sbc(Acc, Imm),
            0xA6 => self.sbc(Acc, Mode(XIndir)),
            0xB7 => self.sbc(Acc, Mode(DirPtrY)),
            0xA7 => self.sbc(Acc, Mode(DirXPtr)),
            0xA4 => self.sbc(Acc, Mode(Dir)),
            0xB4 => self.sbc(Acc, Mode(DirX)),
            0xA5 => self.sbc(Acc, Mode(Abs)),
            0xB5 => self.sbc(Acc, Mode(AbsX)),
            0xB6 => self.sbc(Acc, Mode(AbsY)),
            0xA9 => self.sbc(Mode(Dir), Mode(Dir)),
            0xB8 => self.sbc(Mode(Dir), Imm),

            0x9A => self.subw(),

            0xBC => self.inc(Acc),
            0xAB => self.inc(Mode(Dir)),
            0xBB => self.inc(Mode(DirX)),
            0xAC => self.inc(Mode(Abs)),
            0x3D => self.inc(X),
            0xFC => self.inc(Y),

            0x3A => self.incw(),

            0x9C => self.dec(Acc),
            0x8B => self.dec(Mode(Dir)),
            0x9B => self.dec(Mode(DirX)),
            0x8C => self.dec(Mode(Abs)),
            0x1D => self.dec(X),
            0xDC => self.dec(Y),

            0x1A => self.decw(),

            0x39 => self.and(Mode(XIndir), Mode(YIndir)),
            0x28 => self.and(Acc, Imm),
            0x26 => self.and(Acc, Mode(XIndir)),
            0x37 => self.and(Acc, Mode(DirPtrY)),
            0x27 => self.and(Acc, Mode(DirXPtr)),
            0x24 => self.and(Acc, Mode(Dir)),
            0x34 => self.and(Acc, Mode(DirX)),
            0x25 => self.and(Acc, Mode(Abs)),
            0x35 => self.and(Acc, Mode(AbsX)),
            0x36 => self.and(Acc, Mode(AbsY)),
            0x29 => self.and(Mode(Dir), Mode(Dir)),
            0x38 => self.and(Mode(Dir), Imm),

            0x59 => self.eor(Mode(XIndir), Mode(YIndir)),
            0x48 => self.eor(Acc, Imm),
            0x46 => self.eor(Acc, Mode(XIndir)),
            0x57 => self.eor(Acc, Mode(DirPtrY)),
            0x47 => self.eor(Acc, Mode(DirXPtr)),
            0x44 => self.eor(Acc, Mode(Dir)),
            0x54 => self.eor(Acc, Mode(DirX)),
            0x45 => self.eor(Acc, Mode(Abs)),
            0x55 => self.eor(Acc, Mode(AbsX)),
            0x56 => self.eor(Acc, Mode(AbsY)),
            0x49 => self.eor(Mode(Dir), Mode(Dir)),
            0x58 => self.eor(Mode(Dir), Imm),

            0x19 => self.or(Mode(XIndir), Mode(YIndir)),
            0x08 => self.or(Acc, Imm),
            0x06 => self.or(Acc, Mode(XIndir)),
            0x17 => self.or(Acc, Mode(DirPtrY)),
            0x07 => self.or(Acc, Mode(DirXPtr)),
            0x04 => self.or(Acc, Mode(Dir)),
            0x14 => self.or(Acc, Mode(DirX)),
            0x05 => self.or(Acc, Mode(Abs)),
            0x15 => self.or(Acc, Mode(AbsX)),
            0x16 => self.or(Acc, Mode(AbsY)),
            0x09 => self.or(Mode(Dir), Mode(Dir)),
            0x18 => self.or(Mode(Dir), Imm),

            0x1C => self.asl(Acc),
            0x0B => self.asl(Mode(Dir)),
            0x1B => self.asl(Mode(DirX)),
            0x0C => self.asl(Mode(Abs)),

            0x5C => self.lsr(Acc),
            0x4B => self.lsr(Mode(Dir)),
            0x5B => self.lsr(Mode(DirX)),
            0x4C => self.lsr(Mode(Abs)),

            0x3C => self.rol(Acc),
            0x2B => self.rol(Mode(Dir)),
            0x3B => self.rol(Mode(DirX)),
            0x2C => self.rol(Mode(Abs)),

            0x7C => self.ror(Acc),
            0x6B => self.ror(Mode(Dir)),
            0x7B => self.ror(Mode(DirX)),
            0x6C => self.ror(Mode(Abs)),

            0x9F => self.xcn(),
            0xCF => self.mul(),
            0x9E => self.div(),
            0xDF => self.daa(),
            0xBE => self.das(),

            0x79 => self.cmp(Mode(XIndir), Mode(YIndir)),
            0x68 => self.cmp(Acc, Imm),
            0x66 => self.cmp(Acc, Mode(XIndir)),
            0x77 => self.cmp(Acc, Mode(DirPtrY)),
            0x67 => self.cmp(Acc, Mode(DirXPtr)),
            0x64 => self.cmp(Acc, Mode(Dir)),
            0x74 => self.cmp(Acc, Mode(DirX)),
            0x65 => self.cmp(Acc, Mode(Abs)),
            0x75 => self.cmp(Acc, Mode(AbsX)),
            0x76 => self.cmp(Acc, Mode(AbsY)),
            0x69 => self.cmp(Mode(Dir), Mode(Dir)),
            0x78 => self.cmp(Mode(Dir), Imm),

            0xC8 => self.cmp(X, Imm),
            0x3E => self.cmp(X, Mode(Dir)),
            0x1E => self.cmp(X, Mode(Abs)),

            0xAD => self.cmp(Y, Imm),
            0x7E => self.cmp(Y, Mode(Dir)),
            0x5E => self.cmp(Y, Mode(Abs)),

            0x5A => self.cmpw(),

            // Loads
            0xE8 => self.mov(Acc, Imm),
            0xE6 => self.mov(Acc, Mode(XIndir)),
            0xE4 => self.mov(Acc, Mode(Dir)),
            0xF4 => self.mov(Acc, Mode(DirX)),
            0xE5 => self.mov(Acc, Mode(Abs)),
            0xF5 => self.mov(Acc, Mode(AbsX)),
            0xF6 => self.mov(Acc, Mode(AbsY)),
            0xE7 => self.mov(Acc, Mode(DirXPtr)),
            0xF7 => self.mov(Acc, Mode(DirPtrY)),
            0xBF => self.mov_a_x_inc(),

            0xCD => self.mov(X, Imm),
            0xF8 => self.mov(X, Mode(Dir)),
            0xF9 => self.mov(X, Mode(DirY)),
            0xE9 => self.mov(X, Mode(Abs)),

            0x8D => self.mov(Y, Imm),
            0xEB => self.mov(Y, Mode(Dir)),
            0xFB => self.mov(Y, Mode(DirX)),
            0xEC => self.mov(Y, Mode(Abs)),

            // Register transfers
            0x7D => self.mov(Acc, X),
            0xDD => self.mov(Acc, Y),
            0x5D => self.mov(X, Acc),
            0xFD => self.mov(Y, Acc),
            0x9D => self.mov_x_sp(),
            0xBD => self.mov_sp_x(),

            // Stores
            0xC6 => self.store(XIndir, Acc),
            0xC4 => self.store(Dir, Acc),
            0xD4 => self.store(DirX, Acc),
            0xC5 => self.store(Abs, Acc),
            0xD5 => self.store(AbsX, Acc),
            0xD6 => self.store(AbsY, Acc),
            0xC7 => self.store(DirXPtr, Acc),
            0xD7 => self.store(DirPtrY, Acc),
            0xAF => self.mov_x_inc_a(),

            0xD8 => self.store(Dir, X),
            0xD9 => self.store(DirY, X),
            0xC9 => self.store(Abs, X),

            0xCB => self.store(Dir, Y),
            0xDB => self.store(DirX, Y),
            0xCC => self.store(Abs, Y),

            0x8F => self.mov_dir_imm(),
            0xFA => self.mov_dir_dir(),

            0xBA => self.movw_ya_d(),
            0xDA => self.movw_d_ya(),

            // Flags
            0x80 => self.set_flag(PSFlags::C),  // SETC
            0x40 => self.set_flag(PSFlags::P),  // SETP
            0xA0 => self.set_flag(PSFlags::I),  // EI

            0x60 => self.clear_flag(PSFlags::C),    // CLRC
            0x20 => self.clear_flag(PSFlags::P),    // CLRP
            0xE0 => self.clear_flag(PSFlags::V | PSFlags::H),   // CLRV
            0xC0 => self.clear_flag(PSFlags::I),    // DI

            0xED => self.notc(),

            // Bits
            0x02 | 0x22 | 0x42 | 0x62 | 0x82 | 0xA2 | 0xC2 | 0xE2 => self.set1(instr >> 5, true),
            0x12 | 0x32 | 0x52 | 0x72 | 0x92 | 0xB2 | 0xD2 | 0xF2 => self.set1(instr >> 5, false),
            0x0E => self.tset1(),
            0x4E => self.tclr1(),

            0x4A => self.and1(false),
            0x6A => self.and1(true),
            0x0A => self.or1(false),
            0x2A => self.or1(true),
            0x8A => self.eor1(),
            0xEA => self.not1(),
            0xAA => self.mov1_c_m(),
            0xCA => self.mov1_m_c(),

            // Branches
            0x2F => self.bra(),
            0x10 => self.branch(!self.ps.contains(PSFlags::N)),    // BPL
            0x30 => self.branch(self.ps.contains(PSFlags::N)),     // BMI
            0x50 => self.branch(!self.ps.contains(PSFlags::V)),    // BVC
            0x70 => self.branch(self.ps.contains(PSFlags::V)),     // BVS
            0x90 => self.branch(!self.ps.contains(PSFlags::C)),    // BCC
            0xB0 => self.branch(self.ps.contains(PSFlags::C)),     // BCS
            0xD0 => self.branch(!self.ps.contains(PSFlags::Z)),    // BNE
            0xF0 => self.branch(self.ps.contains(PSFlags::Z)),     // BEQ

            0x03 | 0x23 | 0x43 | 0x63 | 0x83 | 0xA3 | 0xC3 | 0xE3 => self.bbs(instr >> 5, true),
            0x13 | 0x33 | 0x53 | 0x73 | 0x93 | 0xB3 | 0xD3 | 0xF3 => self.bbs(instr >> 5, false),

            0x2E => self.cbne(Dir),
            0xDE => self.cbne(DirX),
            0x6E => self.dbnz_dir(),
            0xFE => self.dbnz_y(),

            // Jumps
            0x5F => self.jmp(),
            0x1F => self.jmp_x_ptr(),
            0x3F => self.call(),
            0x4F => self.pcall(),
            0x01 | 0x11 | 0x21 | 0x31 | 0x41 | 0x51 | 0x61 | 0x71 |
            0x81 | 0x91 | 0xA1 | 0xB1 | 0xC1 | 0xD1 | 0xE1 | 0xF1 => self.tcall(instr >> 4),
            0x0F => self.brk(),
            0x6F => self.ret(),
            0x7F => self.reti(),

            // Stack
            0x2D => self.push(self.a),
            0x4D => self.push(self.x),
            0x6D => self.push(self.y),
            0x0D => self.push(self.ps.bits()),
            0xAE => self.a = self.pop(),
            0xCE => self.x = self.pop(),
            0xEE => self.y = self.pop(),
            0x8E => {
                let ps = self.pop();
                self.ps = PSFlags::from_bits_truncate(ps);
            },

            0x00 => self.nop(),
            0xEF | 0xFF => self.halt(instr),
        }

        self.cycles
    }

    fn fetch(&mut self) -> u8 {
        let data = self.read_data(self.pc);
        self.pc = self.pc.wrapping_add(1);
        data
    }
}

// Instructions: Arithmetic and logic
impl<M: SPCMem> SPC<M> {
    // op1 = op1 + op2 + C
    fn adc(&mut self, op1_mode: DataMode, op2_mode: DataMode) {
        let op2 = self.read_op(op2_mode);
        let (op1, op1_addr) = self.read_op_and_addr(op1_mode);

        let result = self.add_carry(op1, op2);

        self.write_op(op1_addr, result);
    }

    // op1 = op1 - op2 - !C
    fn sbc(&mut self, op1_mode: DataMode, op2_mode: DataMode) {
        let op2 = self.read_op(op2_mode);
        let (op1, op1_addr) = self.read_op_and_addr(op1_mode);

        let result = self.add_carry(op1, !op2);

        self.write_op(op1_addr, result);
    }

    // YA = YA + (d)
    fn addw(&mut self) {
        let (op, _) = self.read_op_16();

        self.ps.remove(PSFlags::C);
        self.a = self.add_carry(self.a, lo!(op));
        self.y = self.add_carry(self.y, hi!(op));
        self.ps.set(PSFlags::Z, self.a == 0 && self.y == 0);
    }

    // YA = YA - (d)
    fn subw(&mut self) {
        let (op, _) = self.read_op_16();

        self.ps.insert(PSFlags::C);
        self.a = self.add_carry(self.a, !lo!(op));
        self.y = self.add_carry(self.y, !hi!(op));
        self.ps.set(PSFlags::Z, self.a == 0 && self.y == 0);
    }

    fn inc(&mut self, op_mode: DataMode) {
        let (op, write_mode) = self.read_op_and_addr(op_mode);

        let result = op.wrapping_add(1);
        self.set_nz(result);

        self.write_op(write_mode, result);
    }

    fn dec(&mut self, op_mode: DataMode) {
        let (op, write_mode) = self.read_op_and_addr(op_mode);

        let result = op.wrapping_sub(1);
        self.set_nz(result);

        self.write_op(write_mode, result);
    }

    fn incw(&mut self) {
        let (op, op_addr) = self.read_op_16();

        let result = op.wrapping_add(1);
        self.set_nz16(result);

        self.write_op_16(op_addr, result);
    }

    fn decw(&mut self) {
        let (op, op_addr) = self.read_op_16();

        let result = op.wrapping_sub(1);
        self.set_nz16(result);

        self.write_op_16(op_addr, result);
    }

    fn and(&mut self, op1_mode: DataMode, op2_mode: DataMode) {
        let op2 = self.read_op(op2_mode);
        let (op1, write_mode) = self.read_op_and_addr(op1_mode);

        let result = op1 & op2;
        self.set_nz(result);

        self.write_op(write_mode, result);
    }

    fn eor(&mut self, op1_mode: DataMode, op2_mode: DataMode) {
        let op2 = self.read_op(op2_mode);
        let (op1, write_mode) = self.read_op_and_addr(op1_mode);

        let result = op1 ^ op2;
        self.set_nz(result);

        self.write_op(write_mode, result);
    }

    fn or(&mut self, op1_mode: DataMode, op2_mode: DataMode) {
        let op2 = self.read_op(op2_mode);
        let (op1, write_mode) = self.read_op_and_addr(op1_mode);

        let result = op1 | op2;
        self.set_nz(result);

        self.write_op(write_mode, result);
    }

    fn asl(&mut self, op_mode: DataMode) {
        let (op, write_mode) = self.read_op_and_addr(op_mode);
        let result = op << 1;

        self.set_nz(result);
        self.ps.set(PSFlags::C, test_bit!(op, 7, u8));

        self.write_op(write_mode, result);
    }

    fn lsr(&mut self, op_mode: DataMode) {
        let (op, write_mode) = self.read_op_and_addr(op_mode);
        let result = op >> 1;

        self.set_nz(result);
        self.ps.set(PSFlags::C, test_bit!(op, 0, u8));

        self.write_op(write_mode, result);
    }

    fn rol(&mut self, op_mode: DataMode) {
        let (op, write_mode) = self.read_op_and_addr(op_mode);
        let result = (op << 1) | self.carry();

        self.set_nz(result);
        self.ps.set(PSFlags::C, test_bit!(op, 7, u8));

        self.write_op(write_mode, result);
    }

    fn ror(&mut self, op_mode: DataMode) {
        let (op, write_mode) = self.read_op_and_addr(op_mode);
        let carry = self.carry() << 7;
        let result = (op >> 1) | carry;

        self.set_nz(result);
        self.ps.set(PSFlags::C, test_bit!(op, 0, u8));

        self.write_op(write_mode, result);
    }

    // Swap nybbles of A.
    fn xcn(&mut self) {
        self.a = (self.a >> 4) | (self.a << 4);
        self.set_nz(self.a);
    }

    // YA = Y * A
    fn mul(&mut self) {
        let result = (self.y as u16) * (self.a as u16);
        self.a = lo!(result);
        self.y = hi!(result);
        self.set_nz(self.y);
    }

    // A = YA / X, Y = YA % X
    // Quotients that don't fit in 9 bits give the same odd results as the hardware.
    fn div(&mut self) {
        let ya = make16!(self.y, self.a) as u32;
        let x = self.x as u32;

        self.ps.set(PSFlags::V, self.y >= self.x);
        self.ps.set(PSFlags::H, (self.y & 0xF) >= (self.x & 0xF));

        if (self.y as u32) < (x << 1) {
            self.a = (ya / x) as u8;
            self.y = (ya % x) as u8;
        } else {
            let rem = ya - (x << 9);
            let div = 256 - x;
            self.a = (255 - rem / div) as u8;
            self.y = (x + rem % div) as u8;
        }

        self.set_nz(self.a);
    }

    // Decimal adjust after addition.
    fn daa(&mut self) {
        if self.ps.contains(PSFlags::C) || self.a > 0x99 {
            self.a = self.a.wrapping_add(0x60);
            self.ps.insert(PSFlags::C);
        }
        if self.ps.contains(PSFlags::H) || (self.a & 0xF) > 0x9 {
            self.a = self.a.wrapping_add(0x06);
        }
        self.set_nz(self.a);
    }

    // Decimal adjust after subtraction.
    fn das(&mut self) {
        if !self.ps.contains(PSFlags::C) || self.a > 0x99 {
            self.a = self.a.wrapping_sub(0x60);
            self.ps.remove(PSFlags::C);
        }
        if !self.ps.contains(PSFlags::H) || (self.a & 0xF) > 0x9 {
            self.a = self.a.wrapping_sub(0x06);
        }
        self.set_nz(self.a);
    }

    fn cmp(&mut self, op1_mode: DataMode, op2_mode: DataMode) {
        let op2 = self.read_op(op2_mode);
        let op1 = self.read_op(op1_mode);
        let result = op1.wrapping_sub(op2);

        self.set_nz(result);
        self.ps.set(PSFlags::C, op1 >= op2);
    }

    fn cmpw(&mut self) {
        let ya = make16!(self.y, self.a);
        let (op, _) = self.read_op_16();

        let result = ya.wrapping_sub(op);

        self.set_nz16(result);
        self.ps.set(PSFlags::C, ya >= op);
    }
}

// Instructions: Data movement
impl<M: SPCMem> SPC<M> {
    // Load into register.
    fn mov(&mut self, dst: DataMode, src: DataMode) {
        let data = self.read_op(src);
        self.set_nz(data);
        self.write_op(dst, data);
    }

    // Store register to memory. The destination is read first.
    fn store(&mut self, dst: AddrMode, src: DataMode) {
        let data = self.read_op(src);
        let addr = self.get_op_addr(dst);
        self.read_data(addr);
        self.write_data(addr, data);
    }

    // MOV A,(X)+
    fn mov_a_x_inc(&mut self) {
        let addr = self.direct_page(self.x);
        self.a = self.read_data(addr);
        self.x = self.x.wrapping_add(1);
        self.set_nz(self.a);
    }

    // MOV (X)+,A
    fn mov_x_inc_a(&mut self) {
        let addr = self.direct_page(self.x);
        self.write_data(addr, self.a);
        self.x = self.x.wrapping_add(1);
    }

    fn mov_x_sp(&mut self) {
        self.x = self.sp;
        self.set_nz(self.x);
    }

    fn mov_sp_x(&mut self) {
        self.sp = self.x;
    }

    // MOV d,#i
    fn mov_dir_imm(&mut self) {
        let data = self.fetch();
        let addr = self.direct();
        self.read_data(addr);
        self.write_data(addr, data);
    }

    // MOV dd,ds
    fn mov_dir_dir(&mut self) {
        let src = self.direct();
        let data = self.read_data(src);
        let dst = self.direct();
        self.write_data(dst, data);
    }

    // MOVW YA,d
    fn movw_ya_d(&mut self) {
        let (data, _) = self.read_op_16();
        self.a = lo!(data);
        self.y = hi!(data);
        self.set_nz16(data);
    }

    // MOVW d,YA
    fn movw_d_ya(&mut self) {
        let addr_lo = self.fetch();
        self.read_data(self.direct_page(addr_lo));
        self.write_op_16(addr_lo, make16!(self.y, self.a));
    }
}

// Instructions: Flags and bits
impl<M: SPCMem> SPC<M> {
    fn set_flag(&mut self, flag: PSFlags) {
        self.ps.insert(flag);
    }

    fn clear_flag(&mut self, flag: PSFlags) {
        self.ps.remove(flag);
    }

    // C = !C
    fn notc(&mut self) {
        self.ps.toggle(PSFlags::C);
    }

    // Set or clear a bit in direct page.
    fn set1(&mut self, bit: u8, set: bool) {
        let addr = self.direct();
        let data = self.read_data(addr);
        let result = if set {data | bit!(bit)} else {data & !bit!(bit)};
        self.write_data(addr, result);
    }

    // Set bits in memory using A as a mask. Flags are from A - data.
    fn tset1(&mut self) {
        let addr = self.absolute();
        let data = self.read_data(addr);
        self.set_nz(self.a.wrapping_sub(data));
        self.write_data(addr, data | self.a);
    }

    fn tclr1(&mut self) {
        let addr = self.absolute();
        let data = self.read_data(addr);
        self.set_nz(self.a.wrapping_sub(data));
        self.write_data(addr, data & !self.a);
    }

    // C = C & m.b / C = C & !m.b
    fn and1(&mut self, not: bool) {
        let bit = self.read_bit();
        let op = bit != not;
        self.ps.set(PSFlags::C, self.ps.contains(PSFlags::C) && op);
    }

    // C = C | m.b / C = C | !m.b
    fn or1(&mut self, not: bool) {
        let bit = self.read_bit();
        let op = bit != not;
        self.ps.set(PSFlags::C, self.ps.contains(PSFlags::C) || op);
    }

    // C = C ^ m.b
    fn eor1(&mut self) {
        let bit = self.read_bit();
        self.ps.set(PSFlags::C, self.ps.contains(PSFlags::C) != bit);
    }

    // m.b = !m.b
    fn not1(&mut self) {
        let (addr, bit) = self.absolute_bit();
        let data = self.read_data(addr);
        self.write_data(addr, data ^ bit!(bit));
    }

    // C = m.b
    fn mov1_c_m(&mut self) {
        let bit = self.read_bit();
        self.ps.set(PSFlags::C, bit);
    }

    // m.b = C
    fn mov1_m_c(&mut self) {
        let (addr, bit) = self.absolute_bit();
        let data = self.read_data(addr);
        let result = if self.ps.contains(PSFlags::C) {data | bit!(bit)} else {data & !bit!(bit)};
        self.write_data(addr, result);
    }
}

// Instructions: Branches and jumps
impl<M: SPCMem> SPC<M> {
    fn bra(&mut self) {
        let offset = self.fetch();
        self.pc = self.relative(offset);
    }

    fn branch(&mut self, cond: bool) {
        let offset = self.fetch();
        self.branch_if(cond, offset);
    }

    // Branch if bit in direct page is set (or clear).
    fn bbs(&mut self, bit: u8, set: bool) {
        let addr = self.direct();
        let data = self.read_data(addr);
        let offset = self.fetch();
        self.branch_if(test_bit!(data, bit, u8) == set, offset);
    }

    // Branch if A != memory.
    fn cbne(&mut self, mode: AddrMode) {
        let addr = self.get_op_addr(mode);
        let data = self.read_data(addr);
        let offset = self.fetch();
        self.branch_if(self.a != data, offset);
    }

    fn dbnz_dir(&mut self) {
        let addr = self.direct();
        let data = self.read_data(addr).wrapping_sub(1);
        self.write_data(addr, data);
        let offset = self.fetch();
        self.branch_if(data != 0, offset);
    }

    fn dbnz_y(&mut self) {
        self.y = self.y.wrapping_sub(1);
        let offset = self.fetch();
        self.branch_if(self.y != 0, offset);
    }

    fn jmp(&mut self) {
        self.pc = self.absolute();
    }

    // JMP [!a+X]
    fn jmp_x_ptr(&mut self) {
        let addr = self.absolute().wrapping_add(self.x as u16);
        self.pc = self.read_16(addr);
    }

    fn call(&mut self) {
        let addr = self.absolute();
        self.push_pc();
        self.pc = addr;
    }

    // Call into the top page.
    fn pcall(&mut self) {
        let addr_lo = self.fetch();
        self.push_pc();
        self.pc = U_PAGE | (addr_lo as u16);
    }

    // Call through the vector table.
    fn tcall(&mut self, n: u8) {
        self.push_pc();
        let vector = TCALL_TABLE.wrapping_sub((n as u16) * 2);
        self.pc = self.read_16(vector);
    }

    fn brk(&mut self) {
        self.push_pc();
        self.push(self.ps.bits());
        self.ps.insert(PSFlags::B);
        self.ps.remove(PSFlags::I);
        self.pc = self.read_16(TCALL_TABLE);
    }

    fn ret(&mut self) {
        let lo = self.pop();
        let hi = self.pop();
        self.pc = make16!(hi, lo);
    }

    fn reti(&mut self) {
        let ps = self.pop();
        self.ps = PSFlags::from_bits_truncate(ps);
        self.ret();
    }
}

// Instructions: misc
impl<M: SPCMem> SPC<M> {
    fn nop(&mut self) {}

    // Stop until reset.
    fn halt(&mut self, instr: u8) {
        debug!("SPC halted by {:02X} at {:04X}", instr, self.pc.wrapping_sub(1));
        self.halted = true;
    }

    fn push(&mut self, data: u8) {
        self.write_data(STACK_PAGE | (self.sp as u16), data);
        self.sp = self.sp.wrapping_sub(1);
    }

    fn pop(&mut self) -> u8 {
        self.sp = self.sp.wrapping_add(1);
        self.read_data(STACK_PAGE | (self.sp as u16))
    }

    fn push_pc(&mut self) {
        self.push(hi!(self.pc));
        self.push(lo!(self.pc));
    }
}

// Misc helper functions
impl<M: SPCMem> SPC<M> {
    #[inline]
    fn carry(&self) -> u8 {
        (self.ps & PSFlags::C).bits()
    }

    #[inline]
    fn set_nz(&mut self, result: u8) {
        self.ps.set(PSFlags::N, test_bit!(result, 7, u8));
        self.ps.set(PSFlags::Z, result == 0);
    }

    #[inline]
    fn set_nz16(&mut self, result: u16) {
        self.ps.set(PSFlags::N, test_bit!(result, 15));
        self.ps.set(PSFlags::Z, result == 0);
    }

    // Add with carry in and out, setting all arithmetic flags.
    fn add_carry(&mut self, op1: u8, op2: u8) -> u8 {
        let full = (op1 as u16) + (op2 as u16) + (self.carry() as u16);
        let result = lo!(full);

        self.ps.set(PSFlags::V, (!(op1 ^ op2) & (op1 ^ result) & 0x80) != 0);
        self.ps.set(PSFlags::H, ((op1 ^ op2 ^ result) & 0x10) != 0);
        self.ps.set(PSFlags::C, full > 0xFF);
        self.set_nz(result);

        result
    }

    fn relative(&self, offset: u8) -> u16 {
        self.pc.wrapping_add((offset as i8) as u16)
    }

    fn branch_if(&mut self, cond: bool, offset: u8) {
        if cond {
            self.pc = self.relative(offset);
            self.cycles += BRANCH_TAKEN;
        }
    }

    fn read_bit(&mut self) -> bool {
        let (addr, bit) = self.absolute_bit();
        let data = self.read_data(addr);
        test_bit!(data, bit, u8)
    }
}

// Internal data functions
impl<M: SPCMem> SPC<M> {
    // Read data from bus.
    fn read_data(&mut self, addr: u16) -> u8 {
        let data = self.mem.read(addr);
        trace!("Read {:02X} from {:04X}", data, addr);
        data
    }

    // Write data to bus.
    fn write_data(&mut self, addr: u16, data: u8) {
        trace!("Write {:02X} to {:04X}", data, addr);
        self.mem.write(addr, data);
    }

    fn read_16(&mut self, addr: u16) -> u16 {
        let lo = self.read_data(addr);
        let hi = self.read_data(addr.wrapping_add(1));
        make16!(hi, lo)
    }

    // Get an operand using the specified data mode.
    fn read_op(&mut self, data_mode: DataMode) -> u8 {
        use DataMode::*;

        match data_mode {
            Imm => self.fetch(),
            Acc => self.a,
            X => self.x,
            Y => self.y,
            Mode(m) => {
                let addr = self.get_op_addr(m);
                self.read_data(addr)
            },
            Known(a) => self.read_data(a)
        }
    }

    // Get an operand using the specified data mode and return the address if an addressing mode was used.
    fn read_op_and_addr(&mut self, data_mode: DataMode) -> (u8, DataMode) {
        use DataMode::*;

        match data_mode {
            Mode(m) => {
                let addr = self.get_op_addr(m);
                (self.read_data(addr), Known(addr))
            },
            Imm => (self.fetch(), Imm),
            Acc => (self.a, Acc),
            X => (self.x, X),
            Y => (self.y, Y),
            Known(a) => (self.read_data(a), Known(a)),
        }
    }

    // Write an operand's data back.
    fn write_op(&mut self, data_mode: DataMode, data: u8) {
        use DataMode::*;

        match data_mode {
            Imm => {},  // Immediate data is never written back.
            Acc => self.a = data,
            X => self.x = data,
            Y => self.y = data,
            Mode(m) => {
                let addr = self.get_op_addr(m);
                self.write_data(addr, data);
            },
            Known(a) => self.write_data(a, data)
        }
    }

    // Get 16-bit operand and address for 16-bit operations. Uses direct addressing.
    fn read_op_16(&mut self) -> (u16, u8) {
        let op_addr_lo = self.fetch();

        let op_lo = self.read_data(self.direct_page(op_addr_lo));
        let op_hi = self.read_data(self.direct_page(op_addr_lo.wrapping_add(1)));

        (make16!(op_hi, op_lo), op_addr_lo)
    }

    fn write_op_16(&mut self, addr_lo: u8, data: u16) {
        self.write_data(self.direct_page(addr_lo), lo!(data));
        self.write_data(self.direct_page(addr_lo.wrapping_add(1)), hi!(data));
    }

    // Get address of operand for addressing mode.
    fn get_op_addr(&mut self, addr_mode: AddrMode) -> u16 {
        use AddrMode::*;

        match addr_mode {
            XIndir  => self.direct_page(self.x),
            YIndir  => self.direct_page(self.y),

            Dir     => self.direct(),
            DirX    => self.direct_x(),
            DirY    => self.direct_y(),
            DirPtrY => self.direct_ptr_y(),
            DirXPtr => self.direct_x_ptr(),

            Abs     => self.absolute(),
            AbsX    => self.absolute().wrapping_add(self.x as u16),
            AbsY    => self.absolute().wrapping_add(self.y as u16),
        }
    }
}

// Addressing modes
impl<M: SPCMem> SPC<M> {
    // Make 16-bit address using direct page as high byte
    fn direct_page(&self, addr_lo: u8) -> u16 {
        let addr_hi = if self.ps.contains(PSFlags::P) {1} else {0};

        make16!(addr_hi, addr_lo)
    }

    // dp
    fn direct(&mut self) -> u16 {
        let addr_lo = self.fetch();

        self.direct_page(addr_lo)
    }

    // dp+X
    fn direct_x(&mut self) -> u16 {
        let addr_lo = self.fetch().wrapping_add(self.x);

        self.direct_page(addr_lo)
    }

    // dp+Y
    fn direct_y(&mut self) -> u16 {
        let addr_lo = self.fetch().wrapping_add(self.y);

        self.direct_page(addr_lo)
    }

    // !abs
    fn absolute(&mut self) -> u16 {
        let addr_lo = self.fetch();
        let addr_hi = self.fetch();

        make16!(addr_hi, addr_lo)
    }

    // [dp+X]
    fn direct_x_ptr(&mut self) -> u16 {
        let ptr_addr = self.fetch().wrapping_add(self.x);

        let ptr_lo = self.read_data(self.direct_page(ptr_addr));
        let ptr_hi = self.read_data(self.direct_page(ptr_addr.wrapping_add(1)));

        make16!(ptr_hi, ptr_lo)
    }

    // [dp]+Y
    fn direct_ptr_y(&mut self) -> u16 {
        let ptr_addr = self.fetch();

        let ptr_lo = self.read_data(self.direct_page(ptr_addr));
        let ptr_hi = self.read_data(self.direct_page(ptr_addr.wrapping_add(1)));

        make16!(ptr_hi, ptr_lo).wrapping_add(self.y as u16)
    }

    // m.b
    fn absolute_bit(&mut self) -> (u16, u8) {
        let abs = self.absolute();

        let addr = abs & 0x1FFF;
        let bit = (abs >> 13) as u8;

        (addr, bit)
    }
}
