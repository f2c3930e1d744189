/* ╔═════════════════════════════════════════════════════════════════════════╗
   ║ Module: lib                                                             ║
   ╟─────────────────────────────────────────────────────────────────────────╢
   ║ Descr.: Kernel side of process address space management: user layout,  ║
   ║         heap boundaries, the process table and the syscall dispatcher.  ║
   ╚═════════════════════════════════════════════════════════════════════════╝
*/
#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod consts;
pub mod log;
pub mod memory;
pub mod process;
pub mod syscall;
pub mod user_layout;

use ::log::{info, SetLoggerError};

use crate::log::Logger;
use crate::memory::layout::USER_LAYOUT;
use crate::process::process_manager::ProcessManager;
use crate::syscall::syscall_dispatcher::{dispatch_frame, SyscallFrame};

pub mod built_info {
    // The file has been placed there by the build script.
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

static LOGGER: Logger = Logger::new();
static PROCESS_MANAGER: ProcessManager = ProcessManager::new();

pub fn logger() -> &'static Logger {
    &LOGGER
}

pub fn process_manager() -> &'static ProcessManager {
    &PROCESS_MANAGER
}

/// Install the kernel logger. Output streams can be registered before or after.
pub fn init() -> Result<(), SetLoggerError> {
    logger().init()?;
    info!(
        "Welcome to {} v{} ({} build)",
        built_info::PKG_NAME,
        built_info::PKG_VERSION,
        built_info::PROFILE
    );
    info!(
        "User space: text top [0x{:x}], stack bottom [0x{:x}], limit [0x{:x}]",
        USER_LAYOUT.text_top(),
        USER_LAYOUT.stack_bottom(),
        USER_LAYOUT.vaddr_limit()
    );

    Ok(())
}

/// Called by the syscall entry code with the saved registers of the calling thread.
pub fn syscall_handler(process_id: usize, frame: &mut SyscallFrame) {
    dispatch_frame(process_manager(), process_id, frame);
}
