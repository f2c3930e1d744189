#![cfg_attr(not(test), no_std)]

use core::ptr;

use syscall::errno::ErrnoSlot;
use syscall::return_vals::Errno;
use syscall::{syscall, SyscallGate, SystemCall};

pub const PAGE_SIZE: usize = 0x1000;

/// Returned by [`vm_sbrk`] when the kernel refused to move the break.
/// A valid break is never null, since user text starts above the first page.
pub const SBRK_FAILED: *mut u8 = ptr::null_mut();

/// Region handed out by [`grow_heap`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct HeapGrowth {
    pub start: usize,
    pub size: usize,
}

/// Move the program break by `increment` bytes and return the previous break.
pub fn sbrk<G: SyscallGate + ?Sized>(gate: &G, errno: &ErrnoSlot, increment: isize) -> Result<usize, Errno> {
    syscall(gate, errno, SystemCall::VmSbrk, &[increment as usize])
}

///
/// Description: \
///    C style sbrk. Returns the previous break on success. On failure
///    [`SBRK_FAILED`] is returned and `errno` holds the error number.
///
pub fn vm_sbrk<G: SyscallGate + ?Sized>(gate: &G, errno: &ErrnoSlot, increment: isize) -> *mut u8 {
    match sbrk(gate, errno, increment) {
        Ok(old_break) => old_break as *mut u8,
        Err(_) => SBRK_FAILED,
    }
}

/// Current program break, without moving it.
pub fn heap_boundary<G: SyscallGate + ?Sized>(gate: &G, errno: &ErrnoSlot) -> Result<usize, Errno> {
    syscall(gate, errno, SystemCall::VmHeapBoundary, &[])
}

///
/// Description: \
///    Grow the heap by `wanted` bytes, falling back to smaller requests
///    while the kernel reports `ENOMEM`. Requests are page granular and
///    never drop below `minimum`. `EINVAL` and other errors end the attempt.
///
/// Return: \
///    Start and size of the new region
///
pub fn grow_heap<G: SyscallGate + ?Sized>(gate: &G, errno: &ErrnoSlot, wanted: usize, minimum: usize) -> Result<HeapGrowth, Errno> {
    let max_request = isize::MAX as usize & !(PAGE_SIZE - 1);
    let minimum = page_align_up(minimum.max(1)).min(max_request);
    let mut request = page_align_up(wanted).clamp(minimum, max_request);

    loop {
        match sbrk(gate, errno, request as isize) {
            Ok(start) => return Ok(HeapGrowth { start, size: request }),
            Err(Errno::ENOMEM) if request / 2 >= minimum => request = page_align_up(request / 2),
            Err(err) => return Err(err),
        }
    }
}

fn page_align_up(size: usize) -> usize {
    match size.checked_add(PAGE_SIZE - 1) {
        Some(size) => size & !(PAGE_SIZE - 1),
        None => usize::MAX & !(PAGE_SIZE - 1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::vec::Vec;

    /// Minimal stand-in for the kernel side of `VmSbrk`.
    struct BreakGate {
        brk: Cell<usize>,
        low: usize,
        ceiling: usize,
        requests: RefCell<Vec<isize>>,
    }

    impl BreakGate {
        fn new(brk: usize, ceiling: usize) -> Self {
            Self { brk: Cell::new(brk), low: brk, ceiling, requests: RefCell::new(Vec::new()) }
        }
    }

    impl SyscallGate for BreakGate {
        fn invoke(&self, call: SystemCall, args: &[usize]) -> isize {
            match call {
                SystemCall::VmHeapBoundary => self.brk.get() as isize,
                SystemCall::VmSbrk => {
                    let delta = args[0] as isize;
                    self.requests.borrow_mut().push(delta);
                    let old = self.brk.get();
                    let candidate = page_align_up((old as isize + delta) as usize);
                    if candidate < self.low {
                        Errno::EINVAL.into()
                    } else if candidate > self.ceiling {
                        Errno::ENOMEM.into()
                    } else {
                        self.brk.set(candidate);
                        old as isize
                    }
                }
                _ => Errno::ENOSYS.into(),
            }
        }
    }

    #[test]
    fn vm_sbrk_returns_previous_break() {
        let gate = BreakGate::new(0x404000, 0x500000);
        let errno = ErrnoSlot::new();

        assert_eq!(vm_sbrk(&gate, &errno, 0x1000), 0x404000 as *mut u8);
        assert_eq!(heap_boundary(&gate, &errno), Ok(0x405000));
        assert_eq!(errno.get(), 0);
    }

    #[test]
    fn vm_sbrk_failure_yields_sentinel_and_errno() {
        let gate = BreakGate::new(0x405000, 0x500000);
        let errno = ErrnoSlot::new();

        assert_eq!(vm_sbrk(&gate, &errno, -0x2000), SBRK_FAILED);
        assert_eq!(errno.get(), Errno::EINVAL.code());

        assert_eq!(vm_sbrk(&gate, &errno, 0x1000_0000), SBRK_FAILED);
        assert_eq!(errno.get(), Errno::ENOMEM.code());
    }

    #[test]
    fn zero_increment_leaves_errno_clear() {
        let gate = BreakGate::new(0x404000, 0x500000);
        let errno = ErrnoSlot::new();
        errno.record(-12).unwrap_err();

        assert_eq!(sbrk(&gate, &errno, 0), Ok(0x404000));
        assert_eq!(errno.get(), 0);
    }

    #[test]
    fn grow_heap_falls_back_to_smaller_requests() {
        let gate = BreakGate::new(0x404000, 0x404000 + 0x3000);
        let errno = ErrnoSlot::new();

        let growth = grow_heap(&gate, &errno, 0x10000, PAGE_SIZE).unwrap();
        assert_eq!(growth, HeapGrowth { start: 0x404000, size: 0x2000 });
        assert_eq!(*gate.requests.borrow(), [0x10000, 0x8000, 0x4000, 0x2000]);
        assert_eq!(errno.get(), 0);
    }

    #[test]
    fn grow_heap_gives_up_below_minimum() {
        let gate = BreakGate::new(0x404000, 0x404000 + 0x1000);
        let errno = ErrnoSlot::new();

        assert_eq!(grow_heap(&gate, &errno, 0x8000, 0x4000), Err(Errno::ENOMEM));
        assert_eq!(*gate.requests.borrow(), [0x8000, 0x4000]);
        assert_eq!(errno.get(), Errno::ENOMEM.code());
        assert_eq!(gate.brk.get(), 0x404000);
    }

    #[test]
    fn grow_heap_rounds_partial_pages() {
        let gate = BreakGate::new(0x404000, 0x500000);
        let errno = ErrnoSlot::new();

        let growth = grow_heap(&gate, &errno, 10, 0).unwrap();
        assert_eq!(growth.size, PAGE_SIZE);
        assert_eq!(gate.brk.get(), 0x405000);
    }
}
