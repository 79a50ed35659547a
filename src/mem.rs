// Memory

use serde::{
    Serialize,
    Deserialize
};

// Random access memory.
#[derive(Clone, Serialize, Deserialize)]
pub struct RAM {
    data: Vec<u8>
}

impl RAM {
    pub fn new(size: usize) -> Self {
        RAM {
            data: vec![0; size]
        }
    }

    pub fn read(&self, addr: u16) -> u8 {
        self.data[addr as usize]
    }

    pub fn write(&mut self, addr: u16, data: u8) {
        self.data[addr as usize] = data;
    }

    // Read a little-endian 16-bit value. The high byte wraps around the address space.
    pub fn read16(&self, addr: u16) -> u16 {
        make16!(self.read(addr.wrapping_add(1)), self.read(addr))
    }

    pub fn fill(&mut self, image: &[u8]) {
        self.data.copy_from_slice(image);
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }
}
