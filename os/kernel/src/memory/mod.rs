pub mod heap;
pub mod layout;

use x86_64::structures::paging::page::PageRange;
use x86_64::structures::paging::Page;
use x86_64::VirtAddr;

pub const PAGE_SIZE: usize = 0x1000;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MapError {
    OutOfFrames,
    AlreadyMapped,
}

/// Page table operations of one address space, as needed to back the heap.
///
/// `map_pages` is all or nothing: if it fails, none of the given pages
/// are left mapped. Both operations must be short, since they are called
/// while the address space lock is held.
pub trait PageMapper: Send + Sync {
    /// Allocate frames for `pages` and map them writable and user accessible.
    fn map_pages(&self, pages: PageRange) -> Result<(), MapError>;

    /// Unmap `pages` and release their frames.
    fn unmap_pages(&self, pages: PageRange);
}

/// Range of pages covering `[start, end)`. Both addresses must be page aligned.
pub fn page_range(start: VirtAddr, end: VirtAddr) -> PageRange {
    assert!(start.is_aligned(PAGE_SIZE as u64) && end.is_aligned(PAGE_SIZE as u64), "Page range [{:?} - {:?}] is not page aligned!", start, end);
    Page::range(Page::containing_address(start), Page::containing_address(end))
}

/// Round `addr` up to the next page boundary, `None` on overflow.
pub fn page_align_up(addr: u64) -> Option<u64> {
    let mask = PAGE_SIZE as u64 - 1;
    addr.checked_add(mask).map(|addr| addr & !mask)
}
