// Gain envelope setup.
use bitflags::bitflags;
use serde::{
    Serialize,
    Deserialize
};

bitflags! {
    #[derive(Default, Serialize, Deserialize)]
    pub struct GainSettings: u8 {
        const CUSTOM        = bit!(7);
        const DIRECT_PARAM  = bits![6, 5, 4, 3, 2, 1, 0];
        const GAIN_MODE     = bits![6, 5];
        const GAIN_RATE     = bits![4, 3, 2, 1, 0];
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GainMode {
    Direct(u8),
    LinearDecrease,
    ExpDecrease,
    LinearIncrease,
    BentIncrease,
}

impl GainSettings {
    pub fn mode(&self) -> GainMode {
        const LINEAR_DECREASE: u8   = 0 << 5;
        const EXP_DECREASE: u8      = 1 << 5;
        const LINEAR_INCREASE: u8   = 2 << 5;

        if !self.contains(GainSettings::CUSTOM) {
            GainMode::Direct((*self & GainSettings::DIRECT_PARAM).bits())
        } else {
            match (*self & GainSettings::GAIN_MODE).bits() {
                LINEAR_DECREASE => GainMode::LinearDecrease,
                EXP_DECREASE    => GainMode::ExpDecrease,
                LINEAR_INCREASE => GainMode::LinearIncrease,
                _               => GainMode::BentIncrease,
            }
        }
    }

    // Counter rate. Direct gain applies immediately.
    pub fn rate(&self) -> u8 {
        match self.mode() {
            GainMode::Direct(_) => 31,
            _ => (*self & GainSettings::GAIN_RATE).bits()
        }
    }

    // Top 3 bits, compared against the level to end an ADSR decay while GAIN is active.
    pub fn sustain_level(&self) -> u8 {
        self.bits() >> 5
    }
}
