/* ╔═════════════════════════════════════════════════════════════════════════╗
   ║ Module: sys_vmem                                                        ║
   ╟─────────────────────────────────────────────────────────────────────────╢
   ║ Descr.: All system calls related to virtual memory management.          ║
   ╚═════════════════════════════════════════════════════════════════════════╝
*/
use log::{debug, warn};
use syscall::return_vals::{Errno, SyscallResult};
use x86_64::VirtAddr;

use crate::memory::heap::OutOfRange;
use crate::memory::{page_range, MapError};
use crate::process::process::Process;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SbrkError {
    /// The heap would shrink below its start.
    InvalidArgument,
    /// The heap would reach into the stack guard gap, or no pages are left to back it.
    InsufficientAddressSpace,
    /// Another thread of the process exited while the call was in flight.
    ProcessExited,
}

impl From<OutOfRange> for SbrkError {
    fn from(err: OutOfRange) -> Self {
        match err {
            OutOfRange::BelowHeapLow => SbrkError::InvalidArgument,
            OutOfRange::AboveCeiling => SbrkError::InsufficientAddressSpace,
        }
    }
}

impl From<SbrkError> for Errno {
    fn from(err: SbrkError) -> Self {
        match err {
            SbrkError::InvalidArgument => Errno::EINVAL,
            SbrkError::InsufficientAddressSpace => Errno::ENOMEM,
            SbrkError::ProcessExited => Errno::ESRCH,
        }
    }
}

///
/// Description: \
///    Move the heap boundary of `process` by `delta` bytes. Pages newly
///    covered by the heap are mapped, pages given back are unmapped. Both
///    happen while the address space lock is held, so concurrent calls of
///    the same process are applied one after another.
///
/// Return: \
///    The previous heap boundary
///
pub fn sbrk(process: &Process, delta: isize) -> Result<VirtAddr, SbrkError> {
    let mut address_space = process.address_space().lock();
    if address_space.is_terminated() {
        return Err(SbrkError::ProcessExited);
    }

    let old_break = address_space.try_adjust(delta)?;
    let new_break = address_space.current_heap_boundary();

    if new_break > old_break {
        match process.page_mapper().map_pages(page_range(old_break, new_break)) {
            Ok(()) => {}
            Err(MapError::OutOfFrames) => {
                address_space.reset_boundary(old_break);
                return Err(SbrkError::InsufficientAddressSpace);
            }
            // Pages above the boundary must never be mapped
            Err(MapError::AlreadyMapped) => panic!("Process [{}]: Heap pages [{:?} - {:?}] are already mapped!", process.id(), old_break, new_break),
        }
    } else if new_break < old_break {
        process.page_mapper().unmap_pages(page_range(new_break, old_break));
    }

    Ok(old_break)
}

pub fn sys_vm_sbrk(process: &Process, increment: isize) -> SyscallResult {
    debug!("Process [{}]: sbrk({})", process.id(), increment);

    match sbrk(process, increment) {
        Ok(old_break) => Ok(old_break.as_u64() as usize),
        Err(err) => {
            warn!("Process [{}]: sbrk({}) failed ({:?})", process.id(), increment, err);
            Err(err.into())
        }
    }
}

pub fn sys_vm_heap_boundary(process: &Process) -> SyscallResult {
    debug!("Process [{}]: heap boundary", process.id());

    match process.try_heap_boundary() {
        Some(heap_boundary) => Ok(heap_boundary.as_u64() as usize),
        None => Err(Errno::ESRCH),
    }
}
