use super::*;

const DIR_PAGE: u8 = 0x02;
const SAMPLE_ADDR: u16 = 0x0300;

// One BRR block of constant samples, with the given header flags.
fn setup(end_flags: u8) -> (DSP, RAM) {
    let mut ram = RAM::new(0x10000);
    ram.write(0x0200, lo!(SAMPLE_ADDR));
    ram.write(0x0201, hi!(SAMPLE_ADDR));
    ram.write(0x0202, lo!(SAMPLE_ADDR));
    ram.write(0x0203, hi!(SAMPLE_ADDR));
    ram.write(SAMPLE_ADDR, 0xC0 | end_flags);
    for i in 1..9 {
        ram.write(SAMPLE_ADDR + i, 0x33);
    }

    let mut dsp = DSP::new();
    dsp.write(0x6C, 0x20);
    dsp.write(0x5D, DIR_PAGE);
    dsp.write(0x0C, 0x7F);
    dsp.write(0x1C, 0x7F);
    dsp.write(0x00, 0x7F);
    dsp.write(0x01, 0x7F);
    dsp.write(0x02, 0x00);
    dsp.write(0x03, 0x10);
    dsp.write(0x07, 0x7F);
    (dsp, ram)
}

fn tick(dsp: &mut DSP, ram: &mut RAM) -> Stereo<i16> {
    dsp.clock(SAMPLE_CYCLES, ram);
    dsp.take_frame().expect("one frame per 32 cycles")
}

#[test]
fn frame_every_32_cycles() {
    let (mut dsp, mut ram) = setup(0x03);
    dsp.clock(31, &mut ram);
    assert_eq!(dsp.frame_count(), 0);
    dsp.clock(1, &mut ram);
    assert_eq!(dsp.frame_count(), 1);
    dsp.clock(64, &mut ram);
    assert_eq!(dsp.frame_count(), 3);
}

#[test]
fn key_on_delay() {
    let (mut dsp, mut ram) = setup(0x03);
    dsp.write(0x4C, 0x01);

    for _ in 0..5 {
        assert_eq!(tick(&mut dsp, &mut ram), [0, 0]);
    }
    let sound = (0..3).map(|_| tick(&mut dsp, &mut ram)).any(|f| f[0] != 0);
    assert!(sound);
    assert!(dsp.read(0x08) > 0);
    assert!(dsp.read(0x09) > 0);
}

#[test]
fn looping_sample_keeps_playing() {
    let (mut dsp, mut ram) = setup(0x03);
    dsp.write(0x4C, 0x01);
    for _ in 0..100 {
        tick(&mut dsp, &mut ram);
    }
    assert_eq!(dsp.read(0x7C) & 1, 1);
    assert_ne!(tick(&mut dsp, &mut ram)[0], 0);
}

#[test]
fn end_without_loop_silences() {
    let (mut dsp, mut ram) = setup(0x01);
    dsp.write(0x4C, 0x01);
    for _ in 0..30 {
        tick(&mut dsp, &mut ram);
    }
    assert_eq!(dsp.read(0x7C) & 1, 1);
    assert_eq!(dsp.voice_envelope(0), (EnvelopeStage::Off, 0));
    for _ in 0..100 {
        assert_eq!(tick(&mut dsp, &mut ram), [0, 0]);
    }

    // Writing ENDX clears it.
    dsp.write(0x7C, 0xFF);
    assert_eq!(dsp.read(0x7C), 0);
}

#[test]
fn end_without_loop_plays_whole_block() {
    let (mut dsp, mut ram) = setup(0x01);
    let data = [0x12, 0x34, 0x56, 0x77, 0x65, 0x43, 0x21, 0x12];
    ram.write(SAMPLE_ADDR, 0xB1);
    for (i, d) in data.iter().enumerate() {
        ram.write(SAMPLE_ADDR + 1 + i as u16, *d);
    }
    dsp.write(0x4C, 0x01);

    let expected = [
        0, 0, 0, 0, 0, 0,
        6004, 8006, 10007, 12009, 13645, 13641, 12001, 10001,
        8001, 5998, 3998, 2360, 2364, 2909, 722,
        0, 0, 0, 0, 0, 0, 0, 0, 0,
    ];
    for (i, out) in expected.iter().enumerate() {
        assert_eq!(tick(&mut dsp, &mut ram), [*out, *out], "sample {}", i);

        // ENDX goes up when the end block is decoded, the voice stops once it has been played.
        assert_eq!(dsp.read(0x7C) & 1, if i >= 9 {1} else {0}, "sample {}", i);
        let (stage, _) = dsp.voice_envelope(0);
        assert_eq!(stage == EnvelopeStage::Off, i >= 21, "sample {}", i);
    }
}

#[test]
fn out_of_range_state_is_invalid() {
    let (mut dsp, mut ram) = setup(0x03);
    dsp.write(0x4C, 0x01);
    for _ in 0..10 {
        tick(&mut dsp, &mut ram);
    }
    assert!(dsp.is_valid());

    dsp.cycle_count = SAMPLE_CYCLES;
    assert!(!dsp.is_valid());
    dsp.cycle_count = 0;
    dsp.counter = COUNTER_RANGE;
    assert!(!dsp.is_valid());
}

#[test]
fn key_on_clears_endx() {
    let (mut dsp, mut ram) = setup(0x01);
    dsp.write(0x4C, 0x01);
    for _ in 0..20 {
        tick(&mut dsp, &mut ram);
    }
    assert_eq!(dsp.read(0x7C) & 1, 1);
    dsp.write(0x4C, 0x01);
    tick(&mut dsp, &mut ram);
    assert_eq!(dsp.read(0x7C) & 1, 0);
}

#[test]
fn key_off_releases_next_sample() {
    let (mut dsp, mut ram) = setup(0x03);
    dsp.write(0x4C, 0x01);
    for _ in 0..10 {
        tick(&mut dsp, &mut ram);
    }
    let (_, level) = dsp.voice_envelope(0);
    assert_eq!(level, 0x7F0);

    dsp.write(0x5C, 0x01);
    tick(&mut dsp, &mut ram);
    assert_eq!(dsp.voice_envelope(0), (EnvelopeStage::Release, 0x7E8));
}

#[test]
fn muted_voice_keeps_running() {
    let (mut dsp, mut ram) = setup(0x03);
    dsp.mute_voices(0x01);
    dsp.write(0x4C, 0x01);
    for _ in 0..20 {
        assert_eq!(tick(&mut dsp, &mut ram), [0, 0]);
    }
    assert_ne!(dsp.voice_output(0), 0);
}

#[test]
fn mute_flag_silences_output() {
    let (mut dsp, mut ram) = setup(0x03);
    dsp.write(0x6C, 0x60);
    dsp.write(0x4C, 0x01);
    for _ in 0..20 {
        assert_eq!(tick(&mut dsp, &mut ram), [0, 0]);
    }
    assert_ne!(dsp.voice_output(0), 0);
}

#[test]
fn soft_reset_stops_voices() {
    let (mut dsp, mut ram) = setup(0x03);
    dsp.write(0x4C, 0x01);
    for _ in 0..10 {
        tick(&mut dsp, &mut ram);
    }
    dsp.write(0x6C, 0xA0);
    tick(&mut dsp, &mut ram);
    assert_eq!(dsp.voice_envelope(0), (EnvelopeStage::Off, 0));
    assert_eq!(tick(&mut dsp, &mut ram), [0, 0]);
}

#[test]
fn volume_is_signed() {
    let (mut dsp, mut ram) = setup(0x03);
    dsp.write(0x01, 0x81);
    dsp.write(0x4C, 0x01);
    for _ in 0..10 {
        tick(&mut dsp, &mut ram);
    }
    let frame = tick(&mut dsp, &mut ram);
    assert!(frame[0] > 0);
    assert!(frame[1] < 0);
}

#[test]
fn noise_replaces_sample() {
    let (mut dsp, mut ram) = setup(0x03);
    dsp.write(0x6C, 0x3F);
    dsp.write(0x3D, 0x01);
    dsp.write(0x4C, 0x01);
    for _ in 0..10 {
        tick(&mut dsp, &mut ram);
    }
    let outputs = (0..16).map(|_| tick(&mut dsp, &mut ram)[0]).collect::<Vec<_>>();
    assert!(outputs.windows(2).any(|w| w[0] != w[1]));
}

#[test]
fn register_readback() {
    let mut dsp = DSP::new();
    assert_eq!(dsp.read(0x6C), 0xE0);

    for &addr in [0x10u8, 0x23, 0x35, 0x46, 0x57, 0x7A, 0x0D, 0x2D, 0x5D, 0x6D, 0x7D, 0x3F, 0x4C, 0x5C].iter() {
        dsp.write(addr, addr ^ 0x5A);
        assert_eq!(dsp.read(addr), addr ^ 0x5A, "register {:02X}", addr);
    }
}

#[test]
fn echo_feeds_into_ram() {
    let (mut dsp, mut ram) = setup(0x03);
    dsp.write(0x6C, 0x00);
    dsp.write(0x4D, 0x01);
    dsp.write(0x6D, 0x80);
    dsp.write(0x7D, 0x00);
    dsp.write(0x4C, 0x01);
    for _ in 0..10 {
        tick(&mut dsp, &mut ram);
    }
    assert_ne!(ram.read16(0x8000), 0);
}
