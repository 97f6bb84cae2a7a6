// Copyright 2023 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::time::Duration;

use crate::error::Error;
use crate::error::Result;

/// Oldest decimal-packed sg driver version whose major version exposes the
/// synchronous `SG_IO` interface.
pub(crate) const SG_DRIVER_VERSION_MIN: i32 = 30000;

/// Direction of a command's data phase, as seen by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransferDirection {
    None,
    FromDevice,
    ToDevice,
}

/// A command's data phase, fusing the direction with the buffer it moves
/// through. `FromDevice` buffers are written by the hardware, `ToDevice`
/// bytes are sent as-is; neither is resized by the transport.
pub enum Transfer<'a> {
    /// No data phase. Not exercised by [`ScsiPassthrough::read`] or
    /// [`ScsiPassthrough::write`].
    None,
    ToDevice(&'a [u8]),
    FromDevice(&'a mut [u8]),
}

impl Transfer<'_> {
    pub fn direction(&self) -> TransferDirection {
        match self {
            Transfer::None => TransferDirection::None,
            Transfer::ToDevice(_) => TransferDirection::ToDevice,
            Transfer::FromDevice(_) => TransferDirection::FromDevice,
        }
    }

    /// Byte count moved by this transfer.
    pub fn len(&self) -> usize {
        match self {
            Transfer::None => 0,
            Transfer::ToDevice(data) => data.len(),
            Transfer::FromDevice(buf) => buf.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Common surface of a SCSI passthrough device. Implemented by the
/// platform's [`crate::ScsiDevice`] and by [`crate::FakeScsiDevice`] for
/// tests.
///
/// CDBs and buffers are opaque to the transport and passed through
/// unmodified. Taking `&mut self` keeps a handle to at most one in-flight
/// command; distinct devices are fully independent.
pub trait ScsiPassthrough {
    /// Sends one CDB and performs the attached data phase, blocking the
    /// calling thread until the native call returns or `timeout` elapses.
    /// Timeout enforcement belongs to the OS primitive; the transport only
    /// converts and forwards the value. Exactly one attempt is made.
    ///
    /// A failed command does not invalidate the device; only
    /// [`ScsiPassthrough::close`] ends its validity.
    fn execute(&mut self, cdb: &[u8], xfer: Transfer, timeout: Duration) -> Result<()>;

    /// Sends `cdb` and reads back exactly `amount` bytes from the device.
    fn read(&mut self, cdb: &[u8], amount: usize, timeout: Duration) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; amount];
        self.execute(cdb, Transfer::FromDevice(&mut buf), timeout)?;
        Ok(buf)
    }

    /// Sends `cdb` along with `data`.
    fn write(&mut self, cdb: &[u8], data: &[u8], timeout: Duration) -> Result<()> {
        self.execute(cdb, Transfer::ToDevice(data), timeout)
    }

    /// Releases the device handle, surfacing the OS result. Consuming the
    /// device makes use-after-close and double-close unrepresentable;
    /// dropping the device releases the handle too, discarding the result.
    fn close(self) -> Result<()>
    where
        Self: Sized;
}

/// Gate applied after opening an sg device node: versions older than 3.0.0
/// lack the synchronous interface this transport is built on.
pub(crate) fn check_driver_version(version: i32) -> Result<()> {
    if version < SG_DRIVER_VERSION_MIN {
        return Err(Error::UnsupportedDriver(version));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_direction_and_len() {
        let mut buf = [0u8; 16];
        assert_eq!(Transfer::None.direction(), TransferDirection::None);
        assert_eq!(Transfer::None.len(), 0);
        assert!(Transfer::None.is_empty());

        let to_dev = Transfer::ToDevice(&[1, 2, 3]);
        assert_eq!(to_dev.direction(), TransferDirection::ToDevice);
        assert_eq!(to_dev.len(), 3);

        let from_dev = Transfer::FromDevice(&mut buf);
        assert_eq!(from_dev.direction(), TransferDirection::FromDevice);
        assert_eq!(from_dev.len(), 16);
    }

    #[test]
    fn version_gate_boundary() {
        assert!(matches!(
            check_driver_version(29999),
            Err(Error::UnsupportedDriver(29999))
        ));
        assert!(check_driver_version(30000).is_ok());
        assert!(check_driver_version(30536).is_ok());
    }
}
