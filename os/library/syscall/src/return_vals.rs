/* ╔═════════════════════════════════════════════════════════════════════════╗
   ║ Module: return_vals                                                     ║
   ╟─────────────────────────────────────────────────────────────────────────╢
   ║ Descr.: Consts and types for syscall return values. A syscall returns   ║
   ║         one signed word: >= 0 is the payload, < 0 the negated errno.    ║
   ╚═════════════════════════════════════════════════════════════════════════╝
*/

use num_enum::{FromPrimitive, IntoPrimitive};

#[derive(Debug, Copy, Clone, Eq, PartialEq, IntoPrimitive, FromPrimitive)]
#[repr(isize)]
pub enum Errno {
    #[num_enum(default)]
    EUNKN = -4095,   // Unknown error
    EPERM = -1,      // Operation not permitted
    ENOENT = -2,     // No such file or directory
    ESRCH = -3,      // No such process
    ENOMEM = -12,    // Out of memory / address space
    EFAULT = -14,    // Bad address
    EBUSY = -16,     // Resource busy
    EINVAL = -22,    // Invalid argument
    ENOSYS = -38,    // Function not implemented
}

impl Errno {
    /// Positive error number, as stored in an errno slot.
    pub fn code(self) -> usize {
        isize::from(self).unsigned_abs()
    }
}

pub type SyscallResult = Result<usize, Errno>;

pub fn convert_ret_code_to_syscall_result(ret_code: isize) -> SyscallResult {
    if ret_code < 0 {
        Err(Errno::from(ret_code))
    } else {
        Ok(ret_code as usize)
    }
}

///
/// Description: \
///    Encode a syscall result as the single word returned to user mode.
///    A payload that does not fit into a non-negative `isize` would be
///    indistinguishable from an error and indicates a kernel bug.
///
pub fn convert_syscall_result_to_ret_code(syscall_result: SyscallResult) -> isize {
    match syscall_result {
        Ok(payload) => match isize::try_from(payload) {
            Ok(ret_code) => ret_code,
            Err(_) => panic!("Syscall payload [0x{:x}] cannot be encoded as a non-negative return code!", payload),
        },
        Err(errno) => errno.into(),
    }
}
