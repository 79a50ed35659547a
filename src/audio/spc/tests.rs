use super::*;

const PROGRAM_START: u16 = 0x0200;

pub struct TestSPCMem {
    ram:    Vec<u8>,
    reads:  Vec<u16>,
    cycles: usize,
}

impl TestSPCMem {
    fn new(program: &[u8]) -> Self {
        let mut ram = vec![0; 1024 * 64];
        let start = PROGRAM_START as usize;
        ram[start..(start + program.len())].copy_from_slice(program);
        ram[RESET_VECTOR as usize] = lo!(PROGRAM_START);
        ram[RESET_VECTOR as usize + 1] = hi!(PROGRAM_START);

        Self {
            ram:    ram,
            reads:  Vec::new(),
            cycles: 0,
        }
    }
}

impl SPCMem for TestSPCMem {
    fn read(&mut self, addr: u16) -> u8 {
        self.reads.push(addr);
        self.ram[addr as usize]
    }
    fn write(&mut self, addr: u16, data: u8) {
        self.ram[addr as usize] = data;
    }
    fn clock(&mut self, cycles: usize) {
        self.cycles += cycles;
    }
}

fn spc_with(program: &[u8]) -> SPC<TestSPCMem> {
    SPC::new(TestSPCMem::new(program))
}

// Step n instructions, returning the cycles of the last one.
fn run(spc: &mut SPC<TestSPCMem>, n: usize) -> usize {
    (0..n).map(|_| spc.step()).last().unwrap_or(0)
}

#[test]
fn reset_reads_vector() {
    let spc = spc_with(&[]);
    assert_eq!(spc.pc, PROGRAM_START);
}

#[test]
fn adc_overflow() {
    // MOV A,#$7F; CLRC; ADC A,#$01
    let mut spc = spc_with(&[0xE8, 0x7F, 0x60, 0x88, 0x01]);
    run(&mut spc, 3);
    assert_eq!(spc.a, 0x80);
    assert!(spc.ps.contains(PSFlags::V | PSFlags::H | PSFlags::N));
    assert!(!spc.ps.intersects(PSFlags::C | PSFlags::Z));
}

#[test]
fn adc_carry() {
    // MOV A,#$FF; SETC; ADC A,#$00
    let mut spc = spc_with(&[0xE8, 0xFF, 0x80, 0x88, 0x00]);
    run(&mut spc, 3);
    assert_eq!(spc.a, 0x00);
    assert!(spc.ps.contains(PSFlags::C | PSFlags::Z | PSFlags::H));
    assert!(!spc.ps.contains(PSFlags::V));
}

#[test]
fn sbc_borrow() {
    // MOV A,#$00; SETC; SBC A,#$01
    let mut spc = spc_with(&[0xE8, 0x00, 0x80, 0xA8, 0x01]);
    run(&mut spc, 3);
    assert_eq!(spc.a, 0xFF);
    assert!(spc.ps.contains(PSFlags::N));
    assert!(!spc.ps.contains(PSFlags::C));
}

#[test]
fn adc_memory_operand_order() {
    // MOV $10,#$05; MOV $11,#$03; CLRC; ADC $10,$11
    let mut spc = spc_with(&[0x8F, 0x05, 0x10, 0x8F, 0x03, 0x11, 0x60, 0x89, 0x11, 0x10]);
    run(&mut spc, 4);
    assert_eq!(spc.mem().ram[0x10], 0x08);
    assert_eq!(spc.mem().ram[0x11], 0x03);
}

#[test]
fn addw() {
    // MOV A,#$FF; MOV Y,#$0F; ADDW YA,$10
    let mut spc = spc_with(&[0xE8, 0xFF, 0x8D, 0x0F, 0x7A, 0x10]);
    spc.mem_mut().ram[0x10] = 0x34;
    spc.mem_mut().ram[0x11] = 0x12;
    let cycles = run(&mut spc, 3);
    assert_eq!(make16!(spc.y, spc.a), 0x2233);
    assert!(spc.ps.contains(PSFlags::H));
    assert!(!spc.ps.intersects(PSFlags::C | PSFlags::Z | PSFlags::V));
    assert_eq!(cycles, 5);
}

#[test]
fn subw_to_zero() {
    // MOV A,#$34; MOV Y,#$12; SUBW YA,$10
    let mut spc = spc_with(&[0xE8, 0x34, 0x8D, 0x12, 0x9A, 0x10]);
    spc.mem_mut().ram[0x10] = 0x34;
    spc.mem_mut().ram[0x11] = 0x12;
    run(&mut spc, 3);
    assert_eq!(make16!(spc.y, spc.a), 0);
    assert!(spc.ps.contains(PSFlags::Z | PSFlags::C));
}

#[test]
fn cmpw() {
    // MOV A,#$00; MOV Y,#$10; CMPW YA,$10
    let mut spc = spc_with(&[0xE8, 0x00, 0x8D, 0x10, 0x5A, 0x10]);
    spc.mem_mut().ram[0x10] = 0x01;
    spc.mem_mut().ram[0x11] = 0x10;
    run(&mut spc, 3);
    assert!(!spc.ps.contains(PSFlags::C));
    assert!(spc.ps.contains(PSFlags::N));
    assert_eq!(make16!(spc.y, spc.a), 0x1000);
}

#[test]
fn mul() {
    // MOV A,#$34; MOV Y,#$12; MUL YA
    let mut spc = spc_with(&[0xE8, 0x34, 0x8D, 0x12, 0xCF]);
    let cycles = run(&mut spc, 3);
    assert_eq!(spc.a, 0xA8);
    assert_eq!(spc.y, 0x03);
    assert_eq!(cycles, 9);
}

#[test]
fn div() {
    // MOV A,#$23; MOV Y,#$01; MOV X,#$10; DIV YA,X
    let mut spc = spc_with(&[0xE8, 0x23, 0x8D, 0x01, 0xCD, 0x10, 0x9E]);
    let cycles = run(&mut spc, 4);
    assert_eq!(spc.a, 0x12);
    assert_eq!(spc.y, 0x03);
    assert!(!spc.ps.contains(PSFlags::V));
    assert_eq!(cycles, 12);
}

#[test]
fn div_overflow() {
    // MOV A,#$FF; MOV Y,#$FF; MOV X,#$01; DIV YA,X
    let mut spc = spc_with(&[0xE8, 0xFF, 0x8D, 0xFF, 0xCD, 0x01, 0x9E]);
    run(&mut spc, 4);
    assert_eq!(spc.a, 0x01);
    assert_eq!(spc.y, 0xFE);
    assert!(spc.ps.contains(PSFlags::V));
}

#[test]
fn daa() {
    // MOV A,#$15; CLRC; ADC A,#$27; DAA A
    let mut spc = spc_with(&[0xE8, 0x15, 0x60, 0x88, 0x27, 0xDF]);
    run(&mut spc, 4);
    assert_eq!(spc.a, 0x42);
    assert!(!spc.ps.contains(PSFlags::C));
}

#[test]
fn das() {
    // MOV A,#$42; SETC; SBC A,#$15; DAS A
    let mut spc = spc_with(&[0xE8, 0x42, 0x80, 0xA8, 0x15, 0xBE]);
    run(&mut spc, 4);
    assert_eq!(spc.a, 0x27);
    assert!(spc.ps.contains(PSFlags::C));
}

#[test]
fn xcn() {
    // MOV A,#$A5; XCN A
    let mut spc = spc_with(&[0xE8, 0xA5, 0x9F]);
    run(&mut spc, 2);
    assert_eq!(spc.a, 0x5A);
}

#[test]
fn branch_cycles() {
    // MOV A,#$00; BNE +2; BEQ +0; BRA -2
    let mut spc = spc_with(&[0xE8, 0x00, 0xD0, 0x02, 0xF0, 0x00, 0x2F, 0xFE]);
    run(&mut spc, 1);
    assert_eq!(run(&mut spc, 1), 2);
    assert_eq!(spc.pc, 0x0204);
    assert_eq!(run(&mut spc, 1), 4);
    assert_eq!(spc.pc, 0x0206);
    assert_eq!(run(&mut spc, 1), 4);
    assert_eq!(spc.pc, 0x0206);
}

#[test]
fn dbnz_loop() {
    // MOV Y,#$03; DBNZ Y,-2
    let mut spc = spc_with(&[0x8D, 0x03, 0xFE, 0xFE]);
    run(&mut spc, 1);
    assert_eq!(run(&mut spc, 1), 6);
    assert_eq!(run(&mut spc, 1), 6);
    assert_eq!(run(&mut spc, 1), 4);
    assert_eq!(spc.y, 0);
    assert_eq!(spc.pc, 0x0204);
}

#[test]
fn cbne() {
    // MOV A,#$05; CBNE $10,+4
    let mut spc = spc_with(&[0xE8, 0x05, 0x2E, 0x10, 0x04]);
    spc.mem_mut().ram[0x10] = 0x05;
    run(&mut spc, 1);
    assert_eq!(run(&mut spc, 1), 5);
    assert_eq!(spc.pc, 0x0205);
}

#[test]
fn bit_ops() {
    // SET1 $10.3; CLR1 $10.0; BBS $10.3,+2; NOP; NOP; BBC $10.3,+2
    let mut spc = spc_with(&[0x62, 0x10, 0x12, 0x10, 0x63, 0x10, 0x02, 0x00, 0x00, 0x73, 0x10, 0x02]);
    spc.mem_mut().ram[0x10] = 0x01;
    run(&mut spc, 2);
    assert_eq!(spc.mem().ram[0x10], 0x08);
    assert_eq!(run(&mut spc, 1), 7);
    assert_eq!(spc.pc, 0x0209);
    assert_eq!(run(&mut spc, 1), 5);
}

#[test]
fn absolute_bit_ops() {
    // SETC; MOV1 $1234.5,C; NOT1 $1234.0; MOV1 C,$1234.0
    let mut spc = spc_with(&[0x80, 0xCA, 0x34, 0xB2, 0xEA, 0x34, 0x12, 0xAA, 0x34, 0x12]);
    run(&mut spc, 4);
    assert_eq!(spc.mem().ram[0x1234], 0x21);
    assert!(spc.ps.contains(PSFlags::C));
}

#[test]
fn tset1_tclr1() {
    // MOV A,#$0F; TSET1 !$0300; TCLR1 !$0301
    let mut spc = spc_with(&[0xE8, 0x0F, 0x0E, 0x00, 0x03, 0x4E, 0x01, 0x03]);
    spc.mem_mut().ram[0x0300] = 0x30;
    spc.mem_mut().ram[0x0301] = 0xFF;
    run(&mut spc, 3);
    assert_eq!(spc.mem().ram[0x0300], 0x3F);
    assert_eq!(spc.mem().ram[0x0301], 0xF0);
}

#[test]
fn call_and_return() {
    // MOV X,#$EF; MOV SP,X; CALL $0300 ... RET
    let mut spc = spc_with(&[0xCD, 0xEF, 0xBD, 0x3F, 0x00, 0x03]);
    spc.mem_mut().ram[0x0300] = 0x6F;
    run(&mut spc, 2);
    assert_eq!(run(&mut spc, 1), 8);
    assert_eq!(spc.pc, 0x0300);
    assert_eq!(spc.sp, 0xED);
    assert_eq!(spc.mem().ram[0x01EF], 0x02);
    assert_eq!(spc.mem().ram[0x01EE], 0x06);
    run(&mut spc, 1);
    assert_eq!(spc.pc, 0x0206);
    assert_eq!(spc.sp, 0xEF);
}

#[test]
fn tcall_vector() {
    // TCALL 1
    let mut spc = spc_with(&[0x11]);
    spc.mem_mut().ram[0xFFDC] = 0x00;
    spc.mem_mut().ram[0xFFDD] = 0x04;
    run(&mut spc, 1);
    assert_eq!(spc.pc, 0x0400);
}

#[test]
fn pcall() {
    let mut spc = spc_with(&[0x4F, 0x20]);
    run(&mut spc, 1);
    assert_eq!(spc.pc, 0xFF20);
}

#[test]
fn brk_and_reti() {
    // SETC; BRK ... RETI
    let mut spc = spc_with(&[0x80, 0x0F]);
    spc.sp = 0xEF;
    spc.mem_mut().ram[0xFFDE] = 0x00;
    spc.mem_mut().ram[0xFFDF] = 0x05;
    spc.mem_mut().ram[0x0500] = 0x7F;
    run(&mut spc, 2);
    assert_eq!(spc.pc, 0x0500);
    assert!(spc.ps.contains(PSFlags::B));
    run(&mut spc, 1);
    assert_eq!(spc.pc, 0x0202);
    assert!(!spc.ps.contains(PSFlags::B));
    assert!(spc.ps.contains(PSFlags::C));
}

#[test]
fn push_pop() {
    // MOV A,#$42; PUSH A; MOV A,#$00; POP X
    let mut spc = spc_with(&[0xE8, 0x42, 0x2D, 0xE8, 0x00, 0xCE]);
    spc.sp = 0xEF;
    run(&mut spc, 4);
    assert_eq!(spc.x, 0x42);
    assert_eq!(spc.sp, 0xEF);
}

#[test]
fn mov_sp_flags() {
    // MOV X,#$00; MOV SP,X; MOV X,#$01; MOV X,SP
    let mut spc = spc_with(&[0xCD, 0x00, 0xBD, 0xCD, 0x01, 0x9D]);
    run(&mut spc, 4);
    assert_eq!(spc.x, 0);
    assert!(spc.ps.contains(PSFlags::Z));
}

#[test]
fn store_reads_destination_first() {
    // MOV $20,A
    let mut spc = spc_with(&[0xC4, 0x20]);
    run(&mut spc, 1);
    assert!(spc.mem().reads.contains(&0x0020));
}

#[test]
fn store_x_inc_skips_read() {
    // MOV X,#$30; MOV (X)+,A
    let mut spc = spc_with(&[0xCD, 0x30, 0xAF]);
    run(&mut spc, 2);
    assert!(!spc.mem().reads.contains(&0x0030));
    assert_eq!(spc.x, 0x31);
}

#[test]
fn mov_dir_dir_skips_read() {
    // MOV $21,$20
    let mut spc = spc_with(&[0xFA, 0x20, 0x21]);
    spc.mem_mut().ram[0x20] = 0x99;
    run(&mut spc, 1);
    assert!(!spc.mem().reads.contains(&0x0021));
    assert_eq!(spc.mem().ram[0x21], 0x99);
}

#[test]
fn direct_page_wraps() {
    // MOV X,#$01; MOV A,$FF+X
    let mut spc = spc_with(&[0xCD, 0x01, 0xF4, 0xFF]);
    spc.mem_mut().ram[0x0000] = 0x77;
    spc.mem_mut().ram[0x0100] = 0x11;
    run(&mut spc, 2);
    assert_eq!(spc.a, 0x77);
}

#[test]
fn word_read_wraps_in_page() {
    // MOVW YA,$FF
    let mut spc = spc_with(&[0xBA, 0xFF]);
    spc.mem_mut().ram[0x00FF] = 0x34;
    spc.mem_mut().ram[0x0000] = 0x12;
    run(&mut spc, 1);
    assert_eq!(make16!(spc.y, spc.a), 0x1234);
}

#[test]
fn direct_page_one() {
    // SETP; MOV A,$10
    let mut spc = spc_with(&[0x40, 0xE4, 0x10]);
    spc.mem_mut().ram[0x0110] = 0x55;
    run(&mut spc, 2);
    assert_eq!(spc.a, 0x55);
}

#[test]
fn sleep_halts() {
    // SLEEP
    let mut spc = spc_with(&[0xEF]);
    assert_eq!(run(&mut spc, 1), 3);
    assert!(spc.is_halted());
    let pc = spc.pc;
    assert_eq!(run(&mut spc, 1), HALTED_CYCLES);
    assert_eq!(spc.pc, pc);

    spc.reset();
    assert!(!spc.is_halted());
}

#[test]
fn clocks_memory_per_instruction() {
    // NOP; MOV A,#$01; MOV $10,A
    let mut spc = spc_with(&[0x00, 0xE8, 0x01, 0xC4, 0x10]);
    let total = (0..3).map(|_| spc.step()).sum::<usize>();
    assert_eq!(total, 2 + 2 + 4);
    assert_eq!(spc.mem().cycles, total);
}
