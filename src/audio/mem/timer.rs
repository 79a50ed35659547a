// Timers for SPC-700.

use serde::{
    Serialize,
    Deserialize
};

#[derive(Clone, Serialize, Deserialize)]
pub struct Timer {
    target:     u8,     // Timer modulo set by SPC. 0 is treated as 256.
    stage:      u8,     // Internal timer
    output:     u8,     // 4-bit counter visible to the SPC

    enabled:        bool,
    period:         usize,  // Number of cycles needed to inc internal timer
    cycle_count:    usize,  // Current cycles since last inc
}

impl Timer {
    pub fn new(period: usize) -> Self {
        Timer {
            target:     0,
            stage:      0,
            output:     0,

            enabled:        false,
            period:         period,
            cycle_count:    0,
        }
    }

    pub fn clock(&mut self, cycles: usize) {
        if !self.enabled {
            return;
        }

        self.cycle_count += cycles;

        while self.cycle_count >= self.period {
            self.cycle_count -= self.period;

            self.stage = self.stage.wrapping_add(1);
            if self.stage == self.target {
                self.stage = 0;
                self.output = (self.output + 1) & 0xF;
            }
        }
    }

    // Enabling a stopped timer restarts its counters.
    pub fn set_enabled(&mut self, enable: bool) {
        if enable && !self.enabled {
            self.stage = 0;
            self.output = 0;
        }
        self.enabled = enable;
    }

    pub fn write_target(&mut self, data: u8) {
        self.target = data;
    }

    // Reading the counter clears it.
    pub fn read_counter(&mut self) -> u8 {
        let ret = self.output;
        self.output = 0;
        ret
    }

    pub fn peek_counter(&self) -> u8 {
        self.output
    }

    // Checks that a deserialized timer has the expected period and is in a reachable state.
    pub fn is_valid(&self, period: usize) -> bool {
        self.period == period &&
        self.cycle_count < self.period &&
        self.output <= 0xF
    }
}
