// ADSR envelope setup.
use bitflags::bitflags;
use serde::{
    Serialize,
    Deserialize
};

bitflags! {
    // Low byte is register $x5, high byte is register $x6.
    #[derive(Default, Serialize, Deserialize)]
    pub struct ADSRSettings: u16 {
        const SUSTAIN_LEVEL = bits16![15, 14, 13];
        const SUSTAIN_RATE  = bits16![12, 11, 10, 9, 8];
        const ENABLE        = bit!(7, u16);
        const DECAY         = bits16![6, 5, 4];
        const ATTACK        = bits16![3, 2, 1, 0];
    }
}

impl ADSRSettings {
    pub fn enabled(&self) -> bool {
        self.contains(ADSRSettings::ENABLE)
    }

    // Counter rate for the attack stage. Rate 31 steps every sample.
    pub fn attack_rate(&self) -> u8 {
        let attack = (*self & ADSRSettings::ATTACK).bits() as u8;
        attack * 2 + 1
    }

    pub fn decay_rate(&self) -> u8 {
        let decay = ((*self & ADSRSettings::DECAY).bits() >> 4) as u8;
        0x10 + decay * 2
    }

    pub fn sustain_rate(&self) -> u8 {
        ((*self & ADSRSettings::SUSTAIN_RATE).bits() >> 8) as u8
    }

    // Top 3 bits of the envelope level that end the decay stage.
    pub fn sustain_level(&self) -> u8 {
        ((*self & ADSRSettings::SUSTAIN_LEVEL).bits() >> 13) as u8
    }
}
