/* ╔═════════════════════════════════════════════════════════════════════════╗
   ║ Module: lib                                                             ║
   ╟─────────────────────────────────────────────────────────────────────────╢
   ║ Descr.: Syscall interface shared by kernel and user mode. Call numbers, ║
   ║         the gate abstraction and the raw trap stubs.                    ║
   ╚═════════════════════════════════════════════════════════════════════════╝
*/
#![cfg_attr(not(test), no_std)]

pub mod errno;
pub mod return_vals;

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::errno::ErrnoSlot;
use crate::return_vals::SyscallResult;

#[derive(Debug, Copy, Clone, Eq, PartialEq, IntoPrimitive, TryFromPrimitive)]
#[repr(usize)]
pub enum SystemCall {
    ProcessId = 0,
    ProcessExit,
    VmSbrk,
    VmHeapBoundary,
}

pub const NUM_SYSCALLS: usize = SystemCall::VmHeapBoundary as usize + 1;

/// Maximum number of argument registers a system call may use.
pub const MAX_SYSCALL_ARGS: usize = 3;

/// Something that can carry a system call into the kernel and hand back
/// the raw signed return word.
///
/// In user mode this is the `syscall` instruction ([`Trap`]), inside the
/// kernel it may be a direct call into the dispatcher.
pub trait SyscallGate {
    fn invoke(&self, call: SystemCall, args: &[usize]) -> isize;
}

///
/// Description: \
///    Issue `call` through `gate` and decode the returned word. The errno
///    slot of the calling execution context is updated before returning,
///    so it is valid until the next system call on the same context.
///
pub fn syscall<G: SyscallGate + ?Sized>(gate: &G, errno: &ErrnoSlot, call: SystemCall, args: &[usize]) -> SyscallResult {
    assert!(args.len() <= MAX_SYSCALL_ARGS, "System call [{:?}] with too many arguments!", call);
    let ret_code = gate.invoke(call, args);
    errno.record(ret_code)
}

/// Gate for user mode, entering the kernel via `syscall`.
#[cfg(all(feature = "userspace", target_arch = "x86_64"))]
pub struct Trap;

#[cfg(all(feature = "userspace", target_arch = "x86_64"))]
impl SyscallGate for Trap {
    fn invoke(&self, call: SystemCall, args: &[usize]) -> isize {
        let ret = match *args {
            [] => syscall0(call),
            [arg1] => syscall1(call, arg1),
            [arg1, arg2] => syscall2(call, arg1, arg2),
            [arg1, arg2, arg3] => syscall3(call, arg1, arg2, arg3),
            _ => panic!("System call [{:?}] with too many arguments!", call),
        };

        ret as isize
    }
}

#[cfg(all(feature = "userspace", target_arch = "x86_64"))]
#[inline(always)]
fn syscall0(call: SystemCall) -> usize {
    let ret: usize;

    unsafe {
        core::arch::asm!(
        "syscall",
        inlateout("rax") call as usize => ret,
        out("rcx") _,
        out("r11") _,
        options(preserves_flags, nostack)
        );
    }

    ret
}

#[cfg(all(feature = "userspace", target_arch = "x86_64"))]
#[inline(always)]
fn syscall1(call: SystemCall, arg1: usize) -> usize {
    let ret: usize;

    unsafe {
        core::arch::asm!(
        "syscall",
        inlateout("rax") call as usize => ret,
        in("rdi") arg1,
        out("rcx") _,
        out("r11") _,
        options(preserves_flags, nostack)
        );
    }

    ret
}

#[cfg(all(feature = "userspace", target_arch = "x86_64"))]
#[inline(always)]
fn syscall2(call: SystemCall, arg1: usize, arg2: usize) -> usize {
    let ret: usize;

    unsafe {
        core::arch::asm!(
        "syscall",
        inlateout("rax") call as usize => ret,
        in("rdi") arg1,
        in("rsi") arg2,
        out("rcx") _,
        out("r11") _,
        options(preserves_flags, nostack)
        );
    }

    ret
}

#[cfg(all(feature = "userspace", target_arch = "x86_64"))]
#[inline(always)]
fn syscall3(call: SystemCall, arg1: usize, arg2: usize, arg3: usize) -> usize {
    let ret: usize;

    unsafe {
        core::arch::asm!(
        "syscall",
        inlateout("rax") call as usize => ret,
        in("rdi") arg1,
        in("rsi") arg2,
        in("rdx") arg3,
        out("rcx") _,
        out("r11") _,
        options(preserves_flags, nostack)
        );
    }

    ret
}
