// Various constants

// Clock rates
pub mod timing {
    pub const SPC_CLOCK_RATE: usize     = 1_024_000;    // SPC-700 clocks per second.
    pub const DSP_SAMPLE_RATE: usize    = 32_000;       // Stereo samples per second.
    pub const SAMPLE_CYCLES: usize      = SPC_CLOCK_RATE / DSP_SAMPLE_RATE;  // 32

    pub const SLOW_TIMER_PERIOD: usize  = 128;          // Timers 0 and 1: 8kHz.
    pub const FAST_TIMER_PERIOD: usize  = 16;           // Timer 2: 64kHz.

    pub const HALTED_CYCLES: usize      = 2;            // Clocks consumed per step while stopped.
    pub const MAX_STEP_CYCLES: usize    = 12;           // Longest instruction (DIV).
}

// Memory layout
pub mod mem {
    pub const SPC_RAM_SIZE: usize   = 1024 * 64;    // 64KB of RAM.
    pub const IPL_ROM_SIZE: usize   = 64;

    pub const IPL_ROM_START: u16    = 0xFFC0;
    pub const RESET_VECTOR: u16     = 0xFFFE;
    pub const STACK_PAGE: u16       = 0x0100;
    pub const U_PAGE: u16           = 0xFF00;       // Page used for pcall.
    pub const TCALL_TABLE: u16      = 0xFFDE;       // Vector for tcall 0; tcall n is 2n bytes below.
}
