// Save states.
// A fixed header is followed by the full APU state, all encoded with bincode.

use serde::{
    Serialize,
    Deserialize
};

use crate::error::{
    APUError,
    Result
};
use super::APU;

const MAGIC: [u8; 4] = *b"SPC7";
const VERSION: u16 = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
struct SnapshotHeader {
    magic:      [u8; 4],
    version:    u16,
}

impl SnapshotHeader {
    fn current() -> Self {
        SnapshotHeader {
            magic:      MAGIC,
            version:    VERSION,
        }
    }

    fn check(&self) -> Result<()> {
        if self.magic != MAGIC {
            Err(APUError::IncompatibleSnapshot("not an APU snapshot".to_string()))
        } else if self.version != VERSION {
            Err(APUError::IncompatibleSnapshot(format!("version {}, expected {}", self.version, VERSION)))
        } else {
            Ok(())
        }
    }
}

pub fn encode(apu: &APU) -> Result<Vec<u8>> {
    bincode::serialize(&(SnapshotHeader::current(), apu))
        .map_err(|e| APUError::SnapshotEncode(e.to_string()))
}

// Header is checked before attempting the body.
pub fn decode(data: &[u8]) -> Result<APU> {
    let header: SnapshotHeader = bincode::deserialize(data)
        .map_err(|e| APUError::IncompatibleSnapshot(e.to_string()))?;
    header.check()?;

    let (_, apu): (SnapshotHeader, APU) = bincode::deserialize(data)
        .map_err(|e| APUError::IncompatibleSnapshot(e.to_string()))?;
    apu.validate()?;
    Ok(apu)
}
