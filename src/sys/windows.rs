// Copyright 2023 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Passthrough backend over `DeviceIoControl` with
//! `IOCTL_SCSI_PASS_THROUGH_DIRECT`.

use std::fs::File;
use std::fs::OpenOptions;
use std::mem;
use std::os::windows::fs::OpenOptionsExt;
use std::os::windows::io::AsRawHandle;
use std::os::windows::io::IntoRawHandle;
use std::os::windows::io::RawHandle;
use std::path::Path;
use std::ptr;
use std::time::Duration;

use scsi_sys::IOCTL_SCSI_PASS_THROUGH_DIRECT;
use scsi_sys::SCSI_IOCTL_DATA_IN;
use scsi_sys::SCSI_IOCTL_DATA_OUT;
use scsi_sys::SCSI_IOCTL_DATA_UNSPECIFIED;
use scsi_sys::SCSI_PASS_THROUGH_DIRECT;
use scsi_sys::SCSI_PASS_THROUGH_DIRECT_WITH_SENSE;
use scsi_sys::SENSE_BUFFER_LENGTH;
use scsi_sys::SPT_CDB_LENGTH;
use winapi::shared::minwindef::DWORD;
use winapi::shared::minwindef::LPVOID;
use winapi::shared::ntdef::HANDLE;
use winapi::shared::ntdef::PVOID;
use winapi::shared::ntdef::UCHAR;
use winapi::shared::ntdef::ULONG;
use winapi::shared::ntdef::USHORT;
use winapi::um::handleapi::CloseHandle;
use winapi::um::ioapiset::DeviceIoControl;
use winapi::um::sysinfoapi::GetVersionExW;
use winapi::um::winnt::FILE_SHARE_READ;
use winapi::um::winnt::FILE_SHARE_WRITE;
use winapi::um::winnt::OSVERSIONINFOW;

use crate::descriptor::AsRawDescriptor;
use crate::descriptor::IntoRawDescriptor;
use crate::descriptor::SafeDescriptor;
use crate::device::ScsiPassthrough;
use crate::device::Transfer;
use crate::errno::Error as SysError;
use crate::error::Error;
use crate::error::Result;
use crate::status::ScsiStatus;
use crate::status::StatusOutcome;

pub type RawDescriptor = RawHandle;

/// Oldest Windows major version this backend has been validated against.
const WINDOWS_VERSION_MIN: DWORD = 10;

impl Drop for SafeDescriptor {
    fn drop(&mut self) {
        // SAFETY: safe because we own the handle.
        unsafe { CloseHandle(self.descriptor as HANDLE) };
    }
}

impl AsRawHandle for SafeDescriptor {
    fn as_raw_handle(&self) -> RawHandle {
        self.as_raw_descriptor()
    }
}

// SAFETY: on Windows, RawHandles are represented by raw pointers but are
// opaque to userspace and cannot be dereferenced by rust code, and are
// therefore safe to send between threads.
unsafe impl Send for SafeDescriptor {}

impl IntoRawDescriptor for File {
    fn into_raw_descriptor(self) -> RawDescriptor {
        self.into_raw_handle()
    }
}

/// Rejects Windows versions this backend has not been validated against,
/// before any handle is created.
fn check_platform_version() -> Result<()> {
    // SAFETY: all-zero bytes are a valid OSVERSIONINFOW.
    let mut info: OSVERSIONINFOW = unsafe { mem::zeroed() };
    info.dwOSVersionInfoSize = mem::size_of::<OSVERSIONINFOW>() as DWORD;
    // SAFETY: info is a properly initialized OSVERSIONINFOW and the call
    // writes nothing beyond it.
    let ret = unsafe { GetVersionExW(&mut info) };
    if ret == 0 || info.dwMajorVersion < WINDOWS_VERSION_MIN {
        return Err(Error::UnsupportedPlatform);
    }
    Ok(())
}

/// A SCSI device reached through a pass-through capable device path (e.g.
/// `\\.\PhysicalDrive0`).
pub struct ScsiDevice {
    descriptor: SafeDescriptor,
}

impl ScsiDevice {
    /// Opens the device for read-write, shared access, after probing the
    /// platform version.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<ScsiDevice> {
        check_platform_version()?;
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .share_mode(FILE_SHARE_READ | FILE_SHARE_WRITE)
            .open(path.as_ref())
            .map_err(|e| Error::Open(e.into()))?;
        Ok(ScsiDevice {
            descriptor: SafeDescriptor::from(file),
        })
    }
}

fn encode(
    cdb: &[u8],
    xfer: &mut Transfer,
    timeout: Duration,
) -> SCSI_PASS_THROUGH_DIRECT_WITH_SENSE {
    assert!(
        cdb.len() <= SPT_CDB_LENGTH,
        "cdb of {} bytes does not fit the pass-through cdb field",
        cdb.len()
    );
    let (data_in, data_buffer, data_transfer_length) = match xfer {
        Transfer::None => (SCSI_IOCTL_DATA_UNSPECIFIED, ptr::null_mut(), 0),
        Transfer::ToDevice(data) => (
            SCSI_IOCTL_DATA_OUT,
            data.as_ptr() as PVOID,
            data.len() as ULONG,
        ),
        Transfer::FromDevice(buf) => (
            SCSI_IOCTL_DATA_IN,
            buf.as_mut_ptr() as PVOID,
            buf.len() as ULONG,
        ),
    };
    let mut cdb_field = [0u8; SPT_CDB_LENGTH];
    cdb_field[..cdb.len()].copy_from_slice(cdb);
    SCSI_PASS_THROUGH_DIRECT_WITH_SENSE {
        Spt: SCSI_PASS_THROUGH_DIRECT {
            // Header size excludes the trailing sense region.
            Length: mem::size_of::<SCSI_PASS_THROUGH_DIRECT>() as USHORT,
            CdbLength: cdb.len() as UCHAR,
            SenseInfoLength: SENSE_BUFFER_LENGTH as UCHAR,
            DataIn: data_in,
            DataTransferLength: data_transfer_length,
            // TimeOutValue is in whole seconds; round up so a sub-second
            // timeout does not encode as zero.
            TimeOutValue: timeout.as_millis().div_ceil(1000).try_into().unwrap_or(ULONG::MAX),
            DataBuffer: data_buffer,
            SenseInfoOffset: mem::offset_of!(SCSI_PASS_THROUGH_DIRECT_WITH_SENSE, SenseBuf)
                as ULONG,
            Cdb: cdb_field,
            ..Default::default()
        },
        SenseBuf: [0; SENSE_BUFFER_LENGTH],
    }
}

fn decode(block: &SCSI_PASS_THROUGH_DIRECT_WITH_SENSE) -> StatusOutcome {
    let scsi_status = block.Spt.ScsiStatus;
    // This interface carries no info flag and no driver or host layer; the
    // device's status byte is the whole story.
    let abnormal = scsi_status != ScsiStatus::Good as u8;
    let sense = if abnormal {
        block.SenseBuf.to_vec()
    } else {
        Vec::new()
    };
    StatusOutcome {
        scsi_status,
        host_status: 0,
        driver_status: 0,
        abnormal,
        sense,
    }
}

impl ScsiPassthrough for ScsiDevice {
    fn execute(&mut self, cdb: &[u8], mut xfer: Transfer, timeout: Duration) -> Result<()> {
        let mut block = encode(cdb, &mut xfer, timeout);
        let size = mem::size_of::<SCSI_PASS_THROUGH_DIRECT_WITH_SENSE>() as DWORD;
        let mut bytes_returned: DWORD = 0;
        // SAFETY: the control block and the buffers it points at outlive the
        // call, and the port driver writes at most the lengths encoded in
        // the block.
        let ret = unsafe {
            DeviceIoControl(
                self.descriptor.as_raw_descriptor() as HANDLE,
                IOCTL_SCSI_PASS_THROUGH_DIRECT,
                &mut block as *mut _ as LPVOID,
                size,
                &mut block as *mut _ as LPVOID,
                size,
                &mut bytes_returned,
                ptr::null_mut(),
            )
        };
        if ret == 0 {
            return Err(Error::Transport(SysError::last()));
        }
        decode(&block).into_result()
    }

    fn close(self) -> Result<()> {
        let handle = self.descriptor.into_raw_descriptor();
        // SAFETY: we own the handle and forfeit it regardless of the result.
        if unsafe { CloseHandle(handle as HANDLE) } == 0 {
            return Err(Error::Close(SysError::last()));
        }
        Ok(())
    }
}
