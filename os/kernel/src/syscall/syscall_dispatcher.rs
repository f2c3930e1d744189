/* ╔═════════════════════════════════════════════════════════════════════════╗
   ║ Module: syscall_dispatcher                                              ║
   ╟─────────────────────────────────────────────────────────────────────────╢
   ║ Descr.: Dispatcher for system calls. Decodes the call number, resolves  ║
   ║         the calling process and encodes the typed result of the         ║
   ║         handler into the word returned in rax.                          ║
   ╚═════════════════════════════════════════════════════════════════════════╝
*/
use core::mem::{offset_of, size_of};
use log::warn;
use syscall::return_vals::{convert_syscall_result_to_ret_code, Errno, SyscallResult};
use syscall::{SyscallGate, SystemCall, MAX_SYSCALL_ARGS, NUM_SYSCALLS};

use crate::process::process::Process;
use crate::process::process_manager::ProcessManager;
use crate::syscall::sys_concurrent::{sys_process_exit, sys_process_id};
use crate::syscall::sys_vmem::{sys_vm_heap_boundary, sys_vm_sbrk};

/// Registers of the calling thread, saved by the syscall entry code.
/// `rax` holds the call number on entry and the return word on exit.
#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct SyscallFrame {
    pub rax: usize,
    pub rdi: usize,
    pub rsi: usize,
    pub rdx: usize,
}

// Layout of the frame for the entry code
pub const SYSCALL_FRAME_RAX_OFFSET: usize = offset_of!(SyscallFrame, rax);
pub const SYSCALL_FRAME_RDI_OFFSET: usize = offset_of!(SyscallFrame, rdi);
pub const SYSCALL_FRAME_RSI_OFFSET: usize = offset_of!(SyscallFrame, rsi);
pub const SYSCALL_FRAME_RDX_OFFSET: usize = offset_of!(SyscallFrame, rdx);
pub const SYSCALL_FRAME_SIZE: usize = size_of::<SyscallFrame>();

type SyscallHandler = fn(&ProcessManager, &Process, &[usize; MAX_SYSCALL_ARGS]) -> SyscallResult;

pub static SYSCALL_TABLE: SyscallTable = SyscallTable::new();

pub struct SyscallTable {
    handle: [SyscallHandler; NUM_SYSCALLS],
}

impl SyscallTable {
    /// Entries are ordered by `SystemCall` number.
    pub const fn new() -> Self {
        SyscallTable {
            handle: [
                handle_process_id,
                handle_process_exit,
                handle_vm_sbrk,
                handle_vm_heap_boundary,
            ],
        }
    }

    fn handler(&self, call: SystemCall) -> SyscallHandler {
        self.handle[usize::from(call)]
    }
}

fn handle_process_id(_: &ProcessManager, process: &Process, _: &[usize; MAX_SYSCALL_ARGS]) -> SyscallResult {
    sys_process_id(process)
}

fn handle_process_exit(process_manager: &ProcessManager, process: &Process, _: &[usize; MAX_SYSCALL_ARGS]) -> SyscallResult {
    sys_process_exit(process_manager, process)
}

fn handle_vm_sbrk(_: &ProcessManager, process: &Process, args: &[usize; MAX_SYSCALL_ARGS]) -> SyscallResult {
    sys_vm_sbrk(process, args[0] as isize)
}

fn handle_vm_heap_boundary(_: &ProcessManager, process: &Process, _: &[usize; MAX_SYSCALL_ARGS]) -> SyscallResult {
    sys_vm_heap_boundary(process)
}

///
/// Description: \
///    Execute system call `number` on behalf of process `process_id`.
///    Missing arguments are zero, like unused registers.
///
/// Return: \
///    The encoded result: the payload, or the negated error number
///
pub fn dispatch(process_manager: &ProcessManager, process_id: usize, number: usize, args: &[usize]) -> isize {
    convert_syscall_result_to_ret_code(handle(process_manager, process_id, number, args))
}

fn handle(process_manager: &ProcessManager, process_id: usize, number: usize, args: &[usize]) -> SyscallResult {
    let call = SystemCall::try_from(number).map_err(|_| {
        warn!("Process [{}]: Invalid system call [{}]", process_id, number);
        Errno::ENOSYS
    })?;

    if args.len() > MAX_SYSCALL_ARGS {
        return Err(Errno::EINVAL);
    }
    let mut regs = [0; MAX_SYSCALL_ARGS];
    regs[..args.len()].copy_from_slice(args);

    let process = process_manager.process(process_id).ok_or(Errno::ESRCH)?;
    SYSCALL_TABLE.handler(call)(process_manager, &process, &regs)
}

/// Dispatch the call saved in `frame` and store the result in `frame.rax`.
pub fn dispatch_frame(process_manager: &ProcessManager, process_id: usize, frame: &mut SyscallFrame) {
    let ret_code = dispatch(process_manager, process_id, frame.rax, &[frame.rdi, frame.rsi, frame.rdx]);
    frame.rax = ret_code as usize;
}

/// Gate for code running inside the kernel on behalf of a process.
/// Calls go directly into the dispatcher instead of trapping.
pub struct KernelGate<'a> {
    process_manager: &'a ProcessManager,
    process_id: usize,
}

impl<'a> KernelGate<'a> {
    pub fn new(process_manager: &'a ProcessManager, process_id: usize) -> Self {
        Self { process_manager, process_id }
    }
}

impl SyscallGate for KernelGate<'_> {
    fn invoke(&self, call: SystemCall, args: &[usize]) -> isize {
        dispatch(self.process_manager, self.process_id, call.into(), args)
    }
}
