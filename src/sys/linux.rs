// Copyright 2023 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Passthrough backend over the Linux SCSI Generic (sg) driver's
//! synchronous `SG_IO` ioctl.

use std::fs::File;
use std::fs::OpenOptions;
use std::os::raw::c_int;
use std::os::raw::c_void;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use std::os::unix::io::IntoRawFd;
use std::os::unix::io::RawFd;
use std::path::Path;
use std::ptr;
use std::time::Duration;

use log::debug;
use scsi_sys::sg_io_hdr;
use scsi_sys::IoctlNr;
use scsi_sys::SENSE_BUFFER_LENGTH;
use scsi_sys::SG_DXFER_FROM_DEV;
use scsi_sys::SG_DXFER_NONE;
use scsi_sys::SG_DXFER_TO_DEV;
use scsi_sys::SG_GET_VERSION_NUM;
use scsi_sys::SG_INFO_OK;
use scsi_sys::SG_INFO_OK_MASK;
use scsi_sys::SG_INTERFACE_ID_ORIG;
use scsi_sys::SG_IO;

use crate::descriptor::AsRawDescriptor;
use crate::descriptor::IntoRawDescriptor;
use crate::descriptor::SafeDescriptor;
use crate::device::check_driver_version;
use crate::device::ScsiPassthrough;
use crate::device::Transfer;
use crate::errno::Error as SysError;
use crate::error::Error;
use crate::error::Result;
use crate::status::StatusOutcome;

pub type RawDescriptor = RawFd;

impl Drop for SafeDescriptor {
    fn drop(&mut self) {
        // SAFETY: safe because we own the fd.
        let _ = unsafe { libc::close(self.descriptor) };
    }
}

impl AsRawFd for SafeDescriptor {
    fn as_raw_fd(&self) -> RawFd {
        self.as_raw_descriptor()
    }
}

impl IntoRawDescriptor for File {
    fn into_raw_descriptor(self) -> RawDescriptor {
        self.into_raw_fd()
    }
}

/// Run an ioctl with a mutable reference.
///
/// # Safety
/// The caller is responsible for determining the safety of the particular
/// ioctl.
unsafe fn ioctl_with_mut_ref<T>(
    descriptor: &dyn AsRawDescriptor,
    nr: IoctlNr,
    arg: &mut T,
) -> c_int {
    libc::ioctl(
        descriptor.as_raw_descriptor(),
        nr,
        arg as *mut T as *mut c_void,
    )
}

/// A SCSI device reached through an sg device node (e.g. `/dev/sg0`).
pub struct ScsiDevice {
    descriptor: SafeDescriptor,
}

impl ScsiDevice {
    /// Opens the device node read-write and verifies the sg driver is
    /// recent enough. `O_NONBLOCK` governs the open itself; `SG_IO` still
    /// blocks for up to each command's timeout.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<ScsiDevice> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(path.as_ref())
            .map_err(|e| Error::Open(e.into()))?;
        let device = ScsiDevice {
            descriptor: SafeDescriptor::from(file),
        };
        check_driver_version(device.driver_version()?)?;
        Ok(device)
    }

    /// Queries the driver's decimal-packed version number, e.g. 30536 for
    /// 3.5.36.
    fn driver_version(&self) -> Result<i32> {
        let mut version: c_int = 0;
        // SAFETY: SG_GET_VERSION_NUM writes a single int through the
        // provided pointer and the descriptor outlives the call.
        let ret = unsafe { ioctl_with_mut_ref(&self.descriptor, SG_GET_VERSION_NUM, &mut version) };
        if ret < 0 {
            return Err(Error::Open(SysError::last()));
        }
        Ok(version)
    }
}

fn encode(
    cdb: &[u8],
    xfer: &mut Transfer,
    sense: &mut [u8; SENSE_BUFFER_LENGTH],
    timeout: Duration,
) -> sg_io_hdr {
    assert!(
        cdb.len() <= u8::MAX as usize,
        "cdb of {} bytes does not fit the sg header length field",
        cdb.len()
    );
    let (dxfer_direction, dxferp, dxfer_len) = match xfer {
        Transfer::None => (SG_DXFER_NONE, ptr::null_mut(), 0),
        Transfer::ToDevice(data) => (
            SG_DXFER_TO_DEV,
            data.as_ptr() as *mut c_void,
            data.len() as u32,
        ),
        Transfer::FromDevice(buf) => (
            SG_DXFER_FROM_DEV,
            buf.as_mut_ptr() as *mut c_void,
            buf.len() as u32,
        ),
    };
    sg_io_hdr {
        interface_id: SG_INTERFACE_ID_ORIG,
        dxfer_direction,
        cmd_len: cdb.len() as u8,
        mx_sb_len: SENSE_BUFFER_LENGTH as u8,
        dxfer_len,
        dxferp,
        cmdp: cdb.as_ptr(),
        sbp: sense.as_mut_ptr(),
        timeout: timeout.as_millis().try_into().unwrap_or(u32::MAX),
        ..Default::default()
    }
}

fn decode(hdr: &sg_io_hdr, sense: &[u8; SENSE_BUFFER_LENGTH]) -> StatusOutcome {
    if hdr.resid != 0 {
        // Short-transfer signaling is not part of the public contract.
        debug!("dropping sg transfer residual of {} bytes", hdr.resid);
    }
    let sense_len = usize::from(hdr.sb_len_wr).min(sense.len());
    StatusOutcome {
        scsi_status: hdr.status,
        host_status: hdr.host_status,
        driver_status: hdr.driver_status,
        abnormal: hdr.info & SG_INFO_OK_MASK != SG_INFO_OK,
        sense: sense[..sense_len].to_vec(),
    }
}

impl ScsiPassthrough for ScsiDevice {
    fn execute(&mut self, cdb: &[u8], mut xfer: Transfer, timeout: Duration) -> Result<()> {
        let mut sense = [0u8; SENSE_BUFFER_LENGTH];
        let mut hdr = encode(cdb, &mut xfer, &mut sense, timeout);
        // SAFETY: the header points only at cdb, sense and the transfer
        // buffer, all of which outlive the ioctl, and the driver writes at
        // most the lengths encoded alongside each pointer.
        let ret = unsafe { ioctl_with_mut_ref(&self.descriptor, SG_IO, &mut hdr) };
        if ret < 0 {
            return Err(Error::Transport(SysError::last()));
        }
        decode(&hdr, &sense).into_result()
    }

    fn close(self) -> Result<()> {
        let fd = self.descriptor.into_raw_descriptor();
        // SAFETY: we own the fd and forfeit it regardless of the result.
        if unsafe { libc::close(fd) } < 0 {
            return Err(Error::Close(SysError::last()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_from_device() {
        let cdb = [0x12, 0x00, 0x00, 0x00, 0xff, 0x00];
        let mut buf = vec![0u8; 255];
        let dxferp = buf.as_mut_ptr() as *mut c_void;
        let mut sense = [0u8; SENSE_BUFFER_LENGTH];
        let sbp = sense.as_mut_ptr();
        let mut xfer = Transfer::FromDevice(&mut buf);
        let hdr = encode(&cdb, &mut xfer, &mut sense, Duration::from_millis(5000));

        assert_eq!(hdr.interface_id, SG_INTERFACE_ID_ORIG);
        assert_eq!(hdr.dxfer_direction, SG_DXFER_FROM_DEV);
        assert_eq!(hdr.cmd_len, 6);
        assert_eq!(hdr.cmdp, cdb.as_ptr());
        assert_eq!(hdr.dxfer_len, 255);
        assert_eq!(hdr.dxferp, dxferp);
        assert_eq!(hdr.mx_sb_len, SENSE_BUFFER_LENGTH as u8);
        assert_eq!(hdr.sbp, sbp);
        assert_eq!(hdr.timeout, 5000);
        assert_eq!(hdr.iovec_count, 0);
        assert_eq!(hdr.flags, 0);
    }

    #[test]
    fn encode_to_device() {
        let cdb = [0x2a, 0, 0, 0, 0, 0, 0, 0, 1, 0];
        let data = [0xa5u8; 512];
        let mut sense = [0u8; SENSE_BUFFER_LENGTH];
        let mut xfer = Transfer::ToDevice(&data);
        let hdr = encode(&cdb, &mut xfer, &mut sense, Duration::from_secs(1));

        assert_eq!(hdr.dxfer_direction, SG_DXFER_TO_DEV);
        assert_eq!(hdr.cmd_len, 10);
        assert_eq!(hdr.dxfer_len, 512);
        assert_eq!(hdr.dxferp, data.as_ptr() as *mut c_void);
        assert_eq!(hdr.timeout, 1000);
    }

    #[test]
    fn encode_no_transfer() {
        let cdb = [0x00, 0, 0, 0, 0, 0];
        let mut sense = [0u8; SENSE_BUFFER_LENGTH];
        let hdr = encode(&cdb, &mut Transfer::None, &mut sense, Duration::ZERO);

        assert_eq!(hdr.dxfer_direction, SG_DXFER_NONE);
        assert_eq!(hdr.dxfer_len, 0);
        assert!(hdr.dxferp.is_null());
        assert_eq!(hdr.timeout, 0);
    }

    #[test]
    fn encode_saturates_oversized_timeout() {
        let cdb = [0u8; 6];
        let mut sense = [0u8; SENSE_BUFFER_LENGTH];
        let hdr = encode(
            &cdb,
            &mut Transfer::None,
            &mut sense,
            Duration::from_secs(u64::MAX),
        );
        assert_eq!(hdr.timeout, u32::MAX);
    }

    #[test]
    fn decode_clean_completion() {
        let sense = [0u8; SENSE_BUFFER_LENGTH];
        let hdr = sg_io_hdr::default();
        let outcome = decode(&hdr, &sense);
        assert!(!outcome.abnormal);
        assert!(outcome.sense.is_empty());
        assert!(outcome.into_result().is_ok());
    }

    #[test]
    fn decode_check_condition_with_sense() {
        let mut sense = [0u8; SENSE_BUFFER_LENGTH];
        sense[0] = 0x70;
        sense[2] = 0x03;
        let hdr = sg_io_hdr {
            status: 0x02,
            sb_len_wr: 3,
            info: scsi_sys::SG_INFO_CHECK,
            ..Default::default()
        };
        let outcome = decode(&hdr, &sense);
        assert!(outcome.abnormal);
        assert_eq!(outcome.scsi_status, 0x02);
        assert_eq!(outcome.sense, vec![0x70, 0x00, 0x03]);
    }

    #[test]
    fn round_trip_inquiry_shaped_command() {
        // Encode an INQUIRY-shaped request, then decode the driver writing
        // 255 bytes back cleanly.
        let cdb = [0x12, 0x00, 0x00, 0x00, 0xff, 0x00];
        let mut buf = vec![0u8; 255];
        let mut sense = [0u8; SENSE_BUFFER_LENGTH];
        let mut xfer = Transfer::FromDevice(&mut buf);
        let mut hdr = encode(&cdb, &mut xfer, &mut sense, Duration::from_millis(5000));

        // What the driver would do on success.
        // SAFETY: dxferp points at the 255-byte buffer encoded above.
        unsafe { ptr::write_bytes(hdr.dxferp as *mut u8, 0x5a, hdr.dxfer_len as usize) };
        hdr.resid = 0;
        hdr.duration = 3;

        let outcome = decode(&hdr, &sense);
        assert!(outcome.into_result().is_ok());
        drop(xfer);
        assert_eq!(buf.len(), 255);
        assert!(buf.iter().all(|&b| b == 0x5a));
    }

    #[test]
    fn open_rejects_regular_files() {
        // A regular file accepts O_NONBLOCK open but not sg ioctls.
        let file = tempfile::NamedTempFile::new().unwrap();
        match ScsiDevice::open(file.path()) {
            Err(Error::Open(_)) => (),
            Err(other) => panic!("unexpected error: {other:?}"),
            Ok(_) => panic!("regular file opened as an sg device"),
        }
    }

    #[test]
    fn open_missing_device_fails() {
        match ScsiDevice::open("/dev/does-not-exist-scsi") {
            Err(Error::Open(_)) => (),
            Err(other) => panic!("unexpected error: {other:?}"),
            Ok(_) => panic!("open of a missing device node succeeded"),
        }
    }
}
