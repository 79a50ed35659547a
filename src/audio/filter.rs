// Output filter
// Approximates the low-pass and DC-blocking response of the console's analog output stage.
// Runs on the host side of read_samples and is not part of the saved state.

use dasp::frame::Stereo;

const GAIN_BITS: i32 = 8;

#[derive(Clone, Copy, Default)]
struct FilterChannel {
    prev:       i32,    // Previous input, for the low-pass.
    prev_lp:    i32,    // Previous low-pass output, for the high-pass.
    sum:        i32,    // Integrator.
}

impl FilterChannel {
    fn process(&mut self, input: i16, gain: i32, bass: u32) -> i16 {
        let input = input as i32;

        // Two point FIR with coefficients 0.25 and 0.75.
        let low_pass = input + self.prev;
        self.prev = input * 3;

        // Leaky integrator.
        let delta = low_pass - self.prev_lp;
        self.prev_lp = low_pass;
        let out = self.sum >> (GAIN_BITS + 2);
        self.sum = self.sum.wrapping_add(delta.wrapping_mul(gain)).wrapping_sub(self.sum >> bass);

        clamp16!(out) as i16
    }
}

#[derive(Clone)]
pub struct OutputFilter {
    gain:       i32,
    bass:       u32,
    channels:   [FilterChannel; 2],
}

impl OutputFilter {
    pub const GAIN_UNIT: i32 = 1 << GAIN_BITS;

    pub const BASS_NONE: u32 = 0;
    pub const BASS_NORM: u32 = 8;
    pub const BASS_MAX: u32 = 31;

    pub fn new() -> Self {
        OutputFilter {
            gain:       OutputFilter::GAIN_UNIT,
            bass:       OutputFilter::BASS_NORM,
            channels:   [FilterChannel::default(); 2],
        }
    }

    pub fn set_gain(&mut self, gain: i32) {
        self.gain = gain;
    }

    // Lower values remove more bass.
    pub fn set_bass(&mut self, bass: u32) {
        self.bass = std::cmp::min(bass, OutputFilter::BASS_MAX);
    }

    pub fn clear(&mut self) {
        self.channels = [FilterChannel::default(); 2];
    }

    pub fn process(&mut self, frame: Stereo<i16>) -> Stereo<i16> {
        [
            self.channels[0].process(frame[0], self.gain, self.bass),
            self.channels[1].process(frame[1], self.gain, self.bass)
        ]
    }

    pub fn process_buffer(&mut self, buffer: &mut [Stereo<i16>]) {
        for frame in buffer.iter_mut() {
            *frame = self.process(*frame);
        }
    }
}

impl Default for OutputFilter {
    fn default() -> Self {
        OutputFilter::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence() {
        let mut filter = OutputFilter::new();
        let mut buffer = vec![[0, 0]; 64];
        filter.process_buffer(&mut buffer);
        assert!(buffer.iter().all(|f| *f == [0, 0]));
    }

    #[test]
    fn dc_passes_with_full_bass() {
        let mut filter = OutputFilter::new();
        filter.set_bass(OutputFilter::BASS_MAX);
        assert_eq!(filter.process([1000, -1000]), [0, 0]);
        assert_eq!(filter.process([1000, -1000]), [250, -250]);
        for _ in 0..16 {
            assert_eq!(filter.process([1000, -1000]), [1000, -1000]);
        }
    }

    #[test]
    fn dc_blocked() {
        let mut filter = OutputFilter::new();
        let mut out = [0, 0];
        for _ in 0..8000 {
            out = filter.process([1000, 1000]);
        }
        assert_eq!(out, [0, 0]);
    }

    #[test]
    fn output_clamps() {
        let mut filter = OutputFilter::new();
        filter.set_bass(OutputFilter::BASS_MAX);
        filter.set_gain(OutputFilter::GAIN_UNIT * 4);
        let mut out = [0, 0];
        for _ in 0..4 {
            out = filter.process([20000, -20000]);
        }
        assert_eq!(out, [i16::MAX, i16::MIN]);
    }

    #[test]
    fn clear_resets_history() {
        let mut filter = OutputFilter::new();
        filter.set_bass(OutputFilter::BASS_MAX);
        for _ in 0..4 {
            filter.process([1000, 1000]);
        }
        filter.clear();
        assert_eq!(filter.process([0, 0]), [0, 0]);
    }
}
