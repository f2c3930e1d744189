/* ╔═════════════════════════════════════════════════════════════════════════╗
   ║ Module: errno                                                           ║
   ╟─────────────────────────────────────────────────────────────────────────╢
   ║ Descr.: Error slot of one execution context. Written when a syscall     ║
   ║         returns, valid until the next syscall on the same context.      ║
   ╚═════════════════════════════════════════════════════════════════════════╝
*/

use core::sync::atomic::{AtomicUsize, Ordering};

use crate::return_vals::{convert_ret_code_to_syscall_result, Errno, SyscallResult};

/// Errno storage owned by a single execution context (thread).
///
/// Threads of one process must not share a slot: another thread's syscall
/// would overwrite the value before it is read.
#[derive(Debug, Default)]
pub struct ErrnoSlot {
    code: AtomicUsize,
}

impl ErrnoSlot {
    pub const fn new() -> Self {
        Self { code: AtomicUsize::new(0) }
    }

    ///
    /// Description: \
    ///    Decode the raw return word of a syscall and update the slot:
    ///    a negative word stores its magnitude, anything else clears it.
    ///
    pub fn record(&self, ret_code: isize) -> SyscallResult {
        let code = if ret_code < 0 { ret_code.unsigned_abs() } else { 0 };
        self.code.store(code, Ordering::Relaxed);

        convert_ret_code_to_syscall_result(ret_code)
    }

    /// Raw error number of the last syscall, `0` after a success.
    pub fn get(&self) -> usize {
        self.code.load(Ordering::Relaxed)
    }

    pub fn errno(&self) -> Option<Errno> {
        match self.get() {
            0 => None,
            code => Some(Errno::from((code as isize).wrapping_neg())),
        }
    }

    pub fn clear(&self) {
        self.code.store(0, Ordering::Relaxed);
    }
}
