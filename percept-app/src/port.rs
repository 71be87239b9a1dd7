use anyhow::Result;
use percept_core::SyncPort;

/// Raw-address parallel port output for external timestamp correlation.
///
/// Linux writes through `/dev/port`, which requires root or CAP_SYS_RAWIO;
/// other platforms report the backend as unsupported at startup rather than
/// mid-run.
#[cfg(target_os = "linux")]
pub struct ParallelPort {
    device: std::fs::File,
    address: u16,
}

#[cfg(target_os = "linux")]
impl ParallelPort {
    pub fn open(address: u16) -> Result<Self> {
        use anyhow::Context;

        let device = std::fs::OpenOptions::new()
            .write(true)
            .open("/dev/port")
            .context("cannot open /dev/port for synchronization output")?;
        Ok(Self { device, address })
    }
}

#[cfg(target_os = "linux")]
impl SyncPort for ParallelPort {
    fn pulse(&mut self, code: u8) -> Result<()> {
        use std::io::{Seek, SeekFrom, Write};

        self.device.seek(SeekFrom::Start(self.address as u64))?;
        self.device.write_all(&[code])?;
        Ok(())
    }
}

#[cfg(not(target_os = "linux"))]
pub struct ParallelPort;

#[cfg(not(target_os = "linux"))]
impl ParallelPort {
    pub fn open(_address: u16) -> Result<Self> {
        anyhow::bail!("synchronization port output is only supported on Linux")
    }
}

#[cfg(not(target_os = "linux"))]
impl SyncPort for ParallelPort {
    fn pulse(&mut self, _code: u8) -> Result<()> {
        Ok(())
    }
}
