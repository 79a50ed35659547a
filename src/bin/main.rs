mod avg;
mod debug;

use spc7::*;

// Length of audio to render when not debugging.
const RUN_SECONDS: usize = 5;

// Host updates per second.
const FRAMES_PER_SECOND: u64 = 60;
const FRAME_CLOCKS: u64 = SPC_CLOCK_RATE as u64 / FRAMES_PER_SECOND;

fn main() {
    let ram_path = std::env::args().nth(1).expect("Expected RAM image path as first argument!");
    let boot_path = std::env::args().nth(2).filter(|p| p != "-");

    let debug_mode = std::env::args().nth(3).is_some();

    let ram_image = std::fs::read(&ram_path).expect("Couldn't open RAM image");
    let boot_image = boot_path.map(|p| std::fs::read(&p).expect("Couldn't open boot image"));

    let mut apu = APU::new();
    if let Err(e) = apu.initialize(boot_image.as_ref().map(|b| b.as_slice()), Some(ram_image.as_slice())) {
        eprintln!("Couldn't initialize: {}", e);
        std::process::exit(1);
    }

    if debug_mode {
        debug::debug_mode(&mut apu);
    } else {
        let mut filter = OutputFilter::new();
        let mut averager = avg::Averager::new(FRAMES_PER_SECOND as usize);

        for second in 0..RUN_SECONDS {
            for _ in 0..FRAMES_PER_SECOND {
                apu.run_until(FRAME_CLOCKS);
                let mut samples = apu.read_samples(DSP_SAMPLE_RATE).collect::<Vec<_>>();
                filter.process_buffer(&mut samples);

                let peak = samples.iter()
                    .map(|s| std::cmp::max((s[0] as i32).abs(), (s[1] as i32).abs()) as usize)
                    .max()
                    .unwrap_or(0);
                averager.add(peak);
            }
            println!("{}s: average peak {}", second + 1, averager.get_avg());
        }
    }
}
