#[macro_use]
mod common;
mod constants;

mod audio;
mod error;
mod mem;

#[cfg(feature = "debug")]
pub mod debug;

pub use audio::{
    APU,
    EnvelopeStage,
    OutputFilter,
    Samples
};
pub use constants::timing::{
    SPC_CLOCK_RATE,
    DSP_SAMPLE_RATE
};
pub use dasp::frame::Stereo;
pub use error::{
    APUError,
    Result
};
