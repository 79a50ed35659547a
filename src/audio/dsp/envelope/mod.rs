// Envelope which alters the gain of the samples.
mod adsr;
mod gain;

use serde::{
    Serialize,
    Deserialize
};

pub use adsr::ADSRSettings;
pub use gain::{
    GainSettings,
    GainMode
};
use super::tables::rate_fires;

pub const MAX_LEVEL: i16 = 0x7FF;
const RELEASE_STEP: i32 = 8;
const LINEAR_STEP: i32 = 0x20;
const FAST_ATTACK_STEP: i32 = 0x400;
const BENT_STEP: i32 = 8;
const BENT_MAX: u32 = 0x600;   // Point at which bent line switches from fast to slow increase.

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnvelopeStage {
    Attack,
    Decay,
    Sustain,
    Release,
    Off,    // Released to silence: the voice no longer advances.
}

#[derive(Clone, Serialize, Deserialize)]
pub struct Envelope {
    adsr:   ADSRSettings,
    gain:   GainSettings,

    stage:  EnvelopeStage,
    level:  i16,
    hidden: i32,    // Last calculated level before clamping.
}

impl Envelope {
    pub fn new() -> Self {
        Envelope {
            adsr:   ADSRSettings::default(),
            gain:   GainSettings::default(),

            stage:  EnvelopeStage::Off,
            level:  0,
            hidden: 0,
        }
    }

    pub fn level(&self) -> i16 {
        self.level
    }

    pub fn stage(&self) -> EnvelopeStage {
        self.stage
    }

    pub fn is_valid(&self) -> bool {
        (0..=MAX_LEVEL).contains(&self.level)
    }

    pub fn is_off(&self) -> bool {
        self.stage == EnvelopeStage::Off
    }

    pub fn adsr(&self) -> u16 {
        self.adsr.bits()
    }

    pub fn set_adsr_lo(&mut self, data: u8) {
        self.adsr = ADSRSettings::from_bits_truncate(set_lo!(self.adsr.bits(), data));
    }

    pub fn set_adsr_hi(&mut self, data: u8) {
        self.adsr = ADSRSettings::from_bits_truncate(set_hi!(self.adsr.bits(), data));
    }

    pub fn gain(&self) -> u8 {
        self.gain.bits()
    }

    pub fn set_gain(&mut self, data: u8) {
        self.gain = GainSettings::from_bits_truncate(data);
    }

    pub fn key_on(&mut self) {
        self.stage = EnvelopeStage::Attack;
        self.level = 0;
        self.hidden = 0;
    }

    pub fn key_off(&mut self) {
        if self.stage != EnvelopeStage::Off {
            self.stage = EnvelopeStage::Release;
        }
    }

    // Silence immediately.
    pub fn stop(&mut self) {
        self.stage = EnvelopeStage::Off;
        self.level = 0;
    }

    // Held at zero while the voice starts up.
    pub fn hold(&mut self) {
        self.level = 0;
    }

    // Advance one sample. The counter decides which rates step this sample.
    pub fn clock(&mut self, counter: u16) {
        match self.stage {
            EnvelopeStage::Off => return,
            EnvelopeStage::Release => {
                self.level = std::cmp::max(self.level as i32 - RELEASE_STEP, 0) as i16;
                if self.level == 0 {
                    self.stage = EnvelopeStage::Off;
                }
                return;
            },
            _ => {}
        }

        let mut env = self.level as i32;
        let (rate, sustain_level) = if self.adsr.enabled() {
            let rate = match self.stage {
                EnvelopeStage::Attack => {
                    let rate = self.adsr.attack_rate();
                    env += if rate < 31 {LINEAR_STEP} else {FAST_ATTACK_STEP};
                    rate
                },
                EnvelopeStage::Decay => {
                    env = exp_decrease(env);
                    self.adsr.decay_rate()
                },
                _ => {
                    env = exp_decrease(env);
                    self.adsr.sustain_rate()
                },
            };
            (rate, self.adsr.sustain_level())
        } else {
            match self.gain.mode() {
                GainMode::Direct(param) => env = (param as i32) * 0x10,
                GainMode::LinearDecrease => env -= LINEAR_STEP,
                GainMode::ExpDecrease => env = exp_decrease(env),
                GainMode::LinearIncrease => env += LINEAR_STEP,
                GainMode::BentIncrease => env += if (self.hidden as u32) >= BENT_MAX {BENT_STEP} else {LINEAR_STEP},
            }
            (self.gain.rate(), self.gain.sustain_level())
        };

        if self.stage == EnvelopeStage::Decay && (env >> 8) as u8 == sustain_level {
            self.stage = EnvelopeStage::Sustain;
        }

        self.hidden = env;

        if env < 0 || env > MAX_LEVEL as i32 {
            env = if env < 0 {0} else {MAX_LEVEL as i32};
            if self.stage == EnvelopeStage::Attack {
                self.stage = EnvelopeStage::Decay;
            }
        }

        if rate_fires(rate, counter) {
            self.level = env as i16;
        }
    }
}

fn exp_decrease(env: i32) -> i32 {
    let env = env - 1;
    env - (env >> 8)
}
