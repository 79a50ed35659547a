// Decoding the bit rate reduction format.

use bitflags::bitflags;
use serde::{
    Serialize,
    Deserialize
};

use crate::mem::RAM;

bitflags! {
    pub struct BRRHead: u8 {
        const RANGE     = bits![7, 6, 5, 4];
        const FILTER    = bits![3, 2];
        const LOOP      = bit!(1);
        const END       = bit!(0);
    }
}

impl BRRHead {
    fn shift(&self) -> u8 {
        (*self & BRRHead::RANGE).bits() >> 4
    }

    fn filter(&self) -> u8 {
        (*self & BRRHead::FILTER).bits() >> 2
    }

    pub fn end(&self) -> bool {
        self.contains(BRRHead::END)
    }

    pub fn do_loop(&self) -> bool {
        self.contains(BRRHead::LOOP)
    }
}

pub const BRR_BLOCK_SIZE: u16 = 9;
const BUFFER_SIZE: usize = 12;
const GROUP_SIZE: usize = 4;
// Groups still buffered when an end block is decoded, plus the group that finishes playback.
const TAIL_GROUPS: u8 = (BUFFER_SIZE / GROUP_SIZE) as u8;

// What happened when a group of samples was decoded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockEvent {
    None,       // Still inside a block, or moved on to the next block.
    Looped,     // Finished an end block with the loop flag set.
    Ended,      // Finished an end block without the loop flag. Buffered samples are still to be played.
    Finished,   // The last buffered sample after an end has been played.
}

// Streams BRR blocks out of RAM into a ring of 12 decoded samples (3 groups of 4).
#[derive(Clone, Serialize, Deserialize)]
pub struct BRRDecoder {
    block_addr: u16,    // Address of the current block header
    offset:     u16,    // Offset of the next pair of data bytes inside the block

    buffer:     [i16; BUFFER_SIZE],
    pos:        usize,  // Next group to overwrite, which is also the oldest group.
    tail:       u8,     // Counts down after an end block without loop.
}

impl BRRDecoder {
    pub fn new() -> Self {
        BRRDecoder {
            block_addr: 0,
            offset:     1,

            buffer:     [0; BUFFER_SIZE],
            pos:        0,
            tail:       0,
        }
    }

    pub fn restart(&mut self, start_addr: u16) {
        self.block_addr = start_addr;
        self.offset = 1;
        self.pos = 0;
        self.tail = 0;
    }

    // Checks that a deserialized decoder is in a reachable state.
    pub fn is_valid(&self) -> bool {
        self.pos < BUFFER_SIZE &&
        self.pos % GROUP_SIZE == 0 &&
        self.offset % 2 == 1 &&
        self.offset < BRR_BLOCK_SIZE &&
        self.tail <= TAIL_GROUPS
    }

    #[cfg(test)]
    pub fn block_addr(&self) -> u16 {
        self.block_addr
    }

    // The four samples used for interpolating at integer position n (counting from the oldest).
    pub fn window(&self, n: usize) -> [i16; 4] {
        [self.read(n), self.read(n + 1), self.read(n + 2), self.read(n + 3)]
    }

    // Decode the next 4 samples. The loop address is only used if the block ends.
    // After an end without loop, silence is pushed until the final group has been played.
    pub fn decode_group(&mut self, ram: &RAM, loop_addr: u16) -> BlockEvent {
        if self.tail > 0 {
            self.tail -= 1;
            if self.tail == 0 {
                return BlockEvent::Finished;
            }
            for i in 0..GROUP_SIZE {
                self.buffer[(self.pos + i) % BUFFER_SIZE] = 0;
            }
            self.pos = (self.pos + GROUP_SIZE) % BUFFER_SIZE;
            return BlockEvent::None;
        }

        let head = BRRHead::from_bits_truncate(ram.read(self.block_addr));
        let data_addr = self.block_addr.wrapping_add(self.offset);
        let data = [ram.read(data_addr), ram.read(data_addr.wrapping_add(1))];

        let nybbles = [hi_nybble!(data[0]), lo_nybble!(data[0]), hi_nybble!(data[1]), lo_nybble!(data[1])];
        for (i, n) in nybbles.iter().enumerate() {
            let at = self.pos + i;
            let last1 = self.buffer[(at + BUFFER_SIZE - 1) % BUFFER_SIZE] as i32;
            let last2 = self.buffer[(at + BUFFER_SIZE - 2) % BUFFER_SIZE] as i32;
            self.buffer[at % BUFFER_SIZE] = decompress_sample(head, *n, last1, last2);
        }
        self.pos = (self.pos + GROUP_SIZE) % BUFFER_SIZE;

        self.offset += 2;
        if self.offset < BRR_BLOCK_SIZE {
            return BlockEvent::None;
        }

        self.offset = 1;
        if !head.end() {
            self.block_addr = self.block_addr.wrapping_add(BRR_BLOCK_SIZE);
            BlockEvent::None
        } else {
            self.block_addr = loop_addr;
            if head.do_loop() {
                BlockEvent::Looped
            } else {
                self.tail = TAIL_GROUPS;
                BlockEvent::Ended
            }
        }
    }
}

impl BRRDecoder {
    fn read(&self, n: usize) -> i16 {
        self.buffer[(self.pos + n) % BUFFER_SIZE]
    }
}

// Decompress a single 4-bit value.
// Samples are kept doubled (15 bits of precision with the low bit clear).
fn decompress_sample(head: BRRHead, encoded: u8, last1: i32, last2: i32) -> i16 {
    // Sign extend the nybble.
    let nybble = ((encoded << 4) as i8 >> 4) as i32;

    let shift = head.shift();
    let mut s = if shift <= 12 {
        (nybble << shift) >> 1
    } else if nybble < 0 {
        -0x800
    } else {
        0
    };

    let last2 = last2 >> 1;
    match head.filter() {
        0 => {},
        1 => {
            s += last1 >> 1;
            s += (-last1) >> 5;
        },
        2 => {
            s += last1 - last2;
            s += last2 >> 4;
            s += (last1 * -3) >> 6;
        },
        _ => {
            s += last1 - last2;
            s += (last1 * -13) >> 7;
            s += (last2 * 3) >> 4;
        },
    }

    (clamp16!(s) << 1) as i16
}
