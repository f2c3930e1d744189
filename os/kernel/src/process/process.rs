/* ╔═════════════════════════════════════════════════════════════════════════╗
   ║ Module: process                                                         ║
   ╟─────────────────────────────────────────────────────────────────────────╢
   ║ Descr.: Process control block. Owns the heap bookkeeping of the         ║
   ║         process and the page mapper of its page tables.                 ║
   ╚═════════════════════════════════════════════════════════════════════════╝
*/
use alloc::sync::Arc;
use log::info;
use spin::Mutex;
use x86_64::VirtAddr;

use crate::memory::heap::ProcessAddressSpace;
use crate::memory::PageMapper;

pub struct Process {
    id: usize,
    address_space: Mutex<ProcessAddressSpace>,
    page_mapper: Arc<dyn PageMapper>,
}

impl Process {
    pub(super) fn new(id: usize, address_space: ProcessAddressSpace, page_mapper: Arc<dyn PageMapper>) -> Self {
        Self { id, address_space: Mutex::new(address_space), page_mapper }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Heap bookkeeping. The lock must only be held for a boundary update
    /// and the matching page table update.
    pub fn address_space(&self) -> &Mutex<ProcessAddressSpace> {
        &self.address_space
    }

    pub fn page_mapper(&self) -> &dyn PageMapper {
        self.page_mapper.as_ref()
    }

    /// Called by the loader once all segments are mapped.
    pub fn initialize_heap(&self, highest_loaded_segment_end: VirtAddr) -> VirtAddr {
        let heap_start = self.address_space.lock().initialize(highest_loaded_segment_end);
        info!("Process [{}]: Heap starts at [0x{:x}]", self.id, heap_start.as_u64());

        heap_start
    }

    pub fn heap_boundary(&self) -> VirtAddr {
        self.address_space.lock().current_heap_boundary()
    }

    /// Like `heap_boundary`, but `None` once the process has exited.
    /// Syscalls use this, since a sibling thread may exit concurrently.
    pub fn try_heap_boundary(&self) -> Option<VirtAddr> {
        let address_space = self.address_space.lock();
        if address_space.is_terminated() {
            return None;
        }

        Some(address_space.current_heap_boundary())
    }

    /// Release the heap and make the address space unusable.
    pub(super) fn terminate(&self) {
        let mut address_space = self.address_space.lock();
        if let Some(pages) = address_space.terminate() {
            if !pages.is_empty() {
                self.page_mapper.unmap_pages(pages);
            }
        }
    }
}
