/* ╔═════════════════════════════════════════════════════════════════════════╗
   ║ Module: process manager                                                 ║
   ╟─────────────────────────────────────────────────────────────────────────╢
   ║ Descr.: Functions related to process management. Owns the table of all  ║
   ║         active processes.                                               ║
   ╚═════════════════════════════════════════════════════════════════════════╝
*/
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::AtomicUsize;
use core::sync::atomic::Ordering::Relaxed;
use log::info;
use spin::RwLock;

use crate::memory::heap::ProcessAddressSpace;
use crate::memory::layout::USER_LAYOUT;
use crate::memory::PageMapper;
use crate::process::process::Process;

pub struct ProcessManager {
    active_processes: RwLock<Vec<Arc<Process>>>,
    next_process_id: AtomicUsize,
}

impl ProcessManager {
    pub const fn new() -> Self {
        Self {
            active_processes: RwLock::new(Vec::new()),
            next_process_id: AtomicUsize::new(1),
        }
    }

    /// Create a new process with the default user layout
    pub fn create_process(&self, page_mapper: Arc<dyn PageMapper>) -> Arc<Process> {
        self.create_process_with(ProcessAddressSpace::new(USER_LAYOUT), page_mapper)
    }

    /// Create a new process with a custom layout or guard gap
    pub fn create_process_with(&self, address_space: ProcessAddressSpace, page_mapper: Arc<dyn PageMapper>) -> Arc<Process> {
        let id = self.next_process_id.fetch_add(1, Relaxed);
        let process = Arc::new(Process::new(id, address_space, page_mapper));
        self.active_processes.write().push(Arc::clone(&process));

        info!("Process [{}]: created", id);
        process
    }

    /// Get a process by its id
    pub fn process(&self, process_id: usize) -> Option<Arc<Process>> {
        self.active_processes.read().iter().find(|process| process.id() == process_id).map(Arc::clone)
    }

    /// Return the ids of all active processes
    pub fn active_process_ids(&self) -> Vec<usize> {
        self.active_processes.read().iter().map(|process| process.id()).collect()
    }

    /// Exit a process by its id. Its heap pages are released and it is
    /// removed from the process table. Returns `None` for an unknown id.
    pub fn exit(&self, process_id: usize) -> Option<Arc<Process>> {
        let process = {
            let mut processes = self.active_processes.write();
            let index = processes.iter().position(|process| process.id() == process_id)?;
            processes.swap_remove(index)
        };

        process.terminate();
        info!("Process [{}]: exited", process_id);

        Some(process)
    }
}
