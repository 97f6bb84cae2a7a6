// Copyright 2023 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Linux SCSI Generic (sg) driver v3 interface, as defined in `<scsi/sg.h>`.

use std::os::raw::c_int;
use std::os::raw::c_uchar;
use std::os::raw::c_uint;
#[cfg(not(any(target_os = "android", target_env = "musl")))]
use std::os::raw::c_ulong;
use std::os::raw::c_ushort;
use std::os::raw::c_void;

#[cfg(any(target_os = "android", target_env = "musl"))]
pub type IoctlNr = c_int;
#[cfg(not(any(target_os = "android", target_env = "musl")))]
pub type IoctlNr = c_ulong;

/// `interface_id` tag for the original sg v3 header ('S').
pub const SG_INTERFACE_ID_ORIG: c_int = b'S' as c_int;

// Data transfer directions for `sg_io_hdr::dxfer_direction`.
pub const SG_DXFER_NONE: c_int = -1;
pub const SG_DXFER_TO_DEV: c_int = -2;
pub const SG_DXFER_FROM_DEV: c_int = -3;
pub const SG_DXFER_TO_FROM_DEV: c_int = -4;

/// Returns the driver version as a decimal-packed integer, e.g. 30536 for
/// version 3.5.36.
pub const SG_GET_VERSION_NUM: IoctlNr = 0x2282;
/// Issues one command synchronously, blocking until completion or timeout.
pub const SG_IO: IoctlNr = 0x2285;

// `sg_io_hdr::info` bits.
pub const SG_INFO_OK_MASK: c_uint = 0x1;
pub const SG_INFO_OK: c_uint = 0x0;
pub const SG_INFO_CHECK: c_uint = 0x1;

/// Control block of the sg v3 synchronous interface. Fields marked `[i]` are
/// written by userspace before the `SG_IO` ioctl, fields marked `[o]` are
/// written back by the driver on completion.
#[repr(C)]
#[derive(Debug)]
pub struct sg_io_hdr {
    /// `[i]` always `SG_INTERFACE_ID_ORIG`.
    pub interface_id: c_int,
    /// `[i]` one of the `SG_DXFER_*` codes.
    pub dxfer_direction: c_int,
    /// `[i]` length of the command pointed to by `cmdp`.
    pub cmd_len: c_uchar,
    /// `[i]` capacity of the sense buffer pointed to by `sbp`.
    pub mx_sb_len: c_uchar,
    /// `[i]` 0 means no scatter gather.
    pub iovec_count: c_ushort,
    /// `[i]` byte count of the data transfer.
    pub dxfer_len: c_uint,
    /// `[i]` data transfer memory, read or written per `dxfer_direction`.
    pub dxferp: *mut c_void,
    /// `[i]` command to perform; read-only to the driver.
    pub cmdp: *const c_uchar,
    /// `[i]` sense buffer memory.
    pub sbp: *mut c_uchar,
    /// `[i]` timeout in milliseconds; `u32::MAX` means no timeout.
    pub timeout: c_uint,
    /// `[i]` `SG_FLAG_*` bits, 0 for default behavior.
    pub flags: c_uint,
    /// `[i->o]` unused internally.
    pub pack_id: c_int,
    /// `[i->o]` unused internally.
    pub usr_ptr: *mut c_void,
    /// `[o]` raw SCSI status byte.
    pub status: c_uchar,
    /// `[o]` shifted, masked copy of `status`.
    pub masked_status: c_uchar,
    /// `[o]` messaging level data.
    pub msg_status: c_uchar,
    /// `[o]` bytes actually written to `sbp`.
    pub sb_len_wr: c_uchar,
    /// `[o]` errors from the host adapter (`DID_*`).
    pub host_status: c_ushort,
    /// `[o]` errors from the software driver (`DRIVER_*`).
    pub driver_status: c_ushort,
    /// `[o]` `dxfer_len` minus the bytes actually transferred.
    pub resid: c_int,
    /// `[o]` time taken by the command, in milliseconds.
    pub duration: c_uint,
    /// `[o]` auxiliary information; `SG_INFO_*` bits.
    pub info: c_uint,
}

impl Default for sg_io_hdr {
    fn default() -> Self {
        // SAFETY: all-zero bytes, including null pointers, are a valid
        // representation of this struct.
        unsafe { std::mem::zeroed() }
    }
}
