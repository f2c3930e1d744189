/* ╔═════════════════════════════════════════════════════════════════════════╗
   ║ Module: sys_concurrent                                                  ║
   ╟─────────────────────────────────────────────────────────────────────────╢
   ║ Descr.: System calls related to processes.                              ║
   ╚═════════════════════════════════════════════════════════════════════════╝
*/
use syscall::return_vals::{Errno, SyscallResult};

use crate::process::process::Process;
use crate::process::process_manager::ProcessManager;

pub fn sys_process_id(process: &Process) -> SyscallResult {
    Ok(process.id())
}

pub fn sys_process_exit(process_manager: &ProcessManager, process: &Process) -> SyscallResult {
    match process_manager.exit(process.id()) {
        Some(_) => Ok(0),
        // Another thread of the process exited first
        None => Err(Errno::ESRCH),
    }
}
