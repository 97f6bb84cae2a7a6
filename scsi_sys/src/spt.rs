// Copyright 2023 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Windows SCSI pass-through interface, as defined in `<ntddscsi.h>`. The
//! winapi crate does not cover this header, so the structures and control
//! codes are mirrored here.

use winapi::shared::minwindef::DWORD;
use winapi::shared::ntdef::PVOID;
use winapi::shared::ntdef::UCHAR;
use winapi::shared::ntdef::ULONG;
use winapi::shared::ntdef::USHORT;

use crate::SENSE_BUFFER_LENGTH;

/// Maximum CDB length expressible in `SCSI_PASS_THROUGH_DIRECT::Cdb`.
pub const SPT_CDB_LENGTH: usize = 16;

pub const METHOD_BUFFERED: DWORD = 0;
pub const FILE_READ_ACCESS: DWORD = 0x0001;
pub const FILE_WRITE_ACCESS: DWORD = 0x0002;
pub const IOCTL_SCSI_BASE: DWORD = 0x0000_0004;

/// `CTL_CODE` from `<winioctl.h>`.
pub const fn ctl_code(device_type: DWORD, function: DWORD, method: DWORD, access: DWORD) -> DWORD {
    (device_type << 16) | (access << 14) | (function << 2) | method
}

pub const IOCTL_SCSI_PASS_THROUGH: DWORD = ctl_code(
    IOCTL_SCSI_BASE,
    0x0401,
    METHOD_BUFFERED,
    FILE_READ_ACCESS | FILE_WRITE_ACCESS,
);
pub const IOCTL_SCSI_PASS_THROUGH_DIRECT: DWORD = ctl_code(
    IOCTL_SCSI_BASE,
    0x0405,
    METHOD_BUFFERED,
    FILE_READ_ACCESS | FILE_WRITE_ACCESS,
);

// Transfer directions for `SCSI_PASS_THROUGH_DIRECT::DataIn`.
pub const SCSI_IOCTL_DATA_OUT: UCHAR = 0;
pub const SCSI_IOCTL_DATA_IN: UCHAR = 1;
pub const SCSI_IOCTL_DATA_UNSPECIFIED: UCHAR = 2;

/// Control block of `IOCTL_SCSI_PASS_THROUGH_DIRECT`. The port driver reads
/// the CDB from the embedded `Cdb` array and transfers data directly to or
/// from the buffer pointed to by `DataBuffer`.
#[repr(C)]
#[derive(Debug)]
pub struct SCSI_PASS_THROUGH_DIRECT {
    /// Size of this structure, excluding any region appended after `Cdb`.
    pub Length: USHORT,
    /// SCSI status byte reported by the device on completion.
    pub ScsiStatus: UCHAR,
    pub PathId: UCHAR,
    pub TargetId: UCHAR,
    pub Lun: UCHAR,
    /// Length of the command in `Cdb`.
    pub CdbLength: UCHAR,
    /// Capacity of the sense region at `SenseInfoOffset`.
    pub SenseInfoLength: UCHAR,
    /// One of the `SCSI_IOCTL_DATA_*` codes.
    pub DataIn: UCHAR,
    pub DataTransferLength: ULONG,
    /// Timeout in whole seconds.
    pub TimeOutValue: ULONG,
    pub DataBuffer: PVOID,
    /// Byte offset of the sense region from the start of this structure.
    pub SenseInfoOffset: ULONG,
    pub Cdb: [UCHAR; SPT_CDB_LENGTH],
}

impl Default for SCSI_PASS_THROUGH_DIRECT {
    fn default() -> Self {
        // SAFETY: all-zero bytes, including a null DataBuffer, are a valid
        // representation of this struct.
        unsafe { std::mem::zeroed() }
    }
}

/// `SCSI_PASS_THROUGH_DIRECT` with the sense region appended, so that a
/// single allocation carries both. `SenseInfoOffset` must be set to the
/// offset of `SenseBuf`.
#[repr(C)]
#[derive(Debug, Default)]
pub struct SCSI_PASS_THROUGH_DIRECT_WITH_SENSE {
    pub Spt: SCSI_PASS_THROUGH_DIRECT,
    pub SenseBuf: [UCHAR; SENSE_BUFFER_LENGTH],
}
