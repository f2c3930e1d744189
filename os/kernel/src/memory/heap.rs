/* ╔═════════════════════════════════════════════════════════════════════════╗
   ║ Module: heap                                                            ║
   ╟─────────────────────────────────────────────────────────────────────────╢
   ║ Descr.: Heap boundary (program break) of a process address space.       ║
   ║         The heap is one contiguous region starting at the page after    ║
   ║         the loaded segments and growing towards the stack.              ║
   ╚═════════════════════════════════════════════════════════════════════════╝
*/
use x86_64::structures::paging::page::PageRange;
use x86_64::VirtAddr;

use crate::consts::HEAP_GUARD_GAP;
use crate::memory::layout::AddressSpaceLayout;
use crate::memory::{page_align_up, page_range, PAGE_SIZE};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OutOfRange {
    /// Candidate boundary below the start of the heap.
    BelowHeapLow,
    /// Candidate boundary inside the stack guard gap or beyond user space.
    AboveCeiling,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum HeapState {
    Uninitialized,
    Active { original_break: VirtAddr, current_break: VirtAddr },
    Terminated,
}

/// Heap bookkeeping of one process. Owned by the process control block,
/// which serializes all access through its lock.
#[derive(Debug)]
pub struct ProcessAddressSpace {
    layout: AddressSpaceLayout,
    guard_gap: u64,
    state: HeapState,
}

impl ProcessAddressSpace {
    pub const fn new(layout: AddressSpaceLayout) -> Self {
        Self::with_guard_gap(layout, HEAP_GUARD_GAP)
    }

    pub const fn with_guard_gap(layout: AddressSpaceLayout, guard_gap: u64) -> Self {
        Self { layout, guard_gap, state: HeapState::Uninitialized }
    }

    pub fn layout(&self) -> &AddressSpaceLayout {
        &self.layout
    }

    pub fn guard_gap(&self) -> u64 {
        self.guard_gap
    }

    pub fn heap_ceiling(&self) -> u64 {
        self.layout.heap_ceiling(self.guard_gap)
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, HeapState::Active { .. })
    }

    pub fn is_terminated(&self) -> bool {
        self.state == HeapState::Terminated
    }

    ///
    /// Description: \
    ///    Seed the heap boundary from the end of the highest loaded segment.
    ///    The boundary starts at the next page boundary and the heap may
    ///    never shrink below it. Must be called exactly once.
    ///
    /// Parameters: `highest_loaded_segment_end` end of the highest segment, as reported by the loader
    ///
    /// Return: \
    ///    The initial heap boundary
    ///
    pub fn initialize(&mut self, highest_loaded_segment_end: VirtAddr) -> VirtAddr {
        match self.state {
            HeapState::Uninitialized => {}
            HeapState::Active { .. } => panic!("ProcessAddressSpace: Heap boundary is already initialized!"),
            HeapState::Terminated => panic!("ProcessAddressSpace: Trying to initialize a terminated address space!"),
        }

        let end = highest_loaded_segment_end.as_u64();
        assert!(self.layout.is_user_address(highest_loaded_segment_end), "ProcessAddressSpace: Loaded segments end outside of user space [0x{:x}]!", end);

        let seed = match page_align_up(end) {
            Some(seed) if seed <= self.heap_ceiling() => VirtAddr::new(seed),
            _ => panic!("ProcessAddressSpace: Loaded segments [0x{:x}] collide with the stack guard gap!", end),
        };

        self.state = HeapState::Active { original_break: seed, current_break: seed };
        self.check_invariants();

        seed
    }

    /// Current heap boundary. Panics if the heap is not active.
    pub fn current_heap_boundary(&self) -> VirtAddr {
        self.active_bounds().1
    }

    /// Lowest address the heap boundary may take (the initial boundary).
    pub fn heap_low(&self) -> VirtAddr {
        self.active_bounds().0
    }

    pub fn original_break(&self) -> VirtAddr {
        self.heap_low()
    }

    ///
    /// Description: \
    ///    Move the heap boundary by `delta` bytes. The candidate boundary is
    ///    rounded up to the next page boundary and must stay within
    ///    `[heap_low, heap_ceiling]`. On failure nothing is changed.
    ///
    /// Return: \
    ///    The boundary before the adjustment
    ///
    pub fn try_adjust(&mut self, delta: isize) -> Result<VirtAddr, OutOfRange> {
        self.check_invariants();
        let (heap_low, current_break) = self.active_bounds();
        if delta == 0 {
            return Ok(current_break);
        }

        let overflow_side = if delta > 0 { OutOfRange::AboveCeiling } else { OutOfRange::BelowHeapLow };
        let candidate = current_break
            .as_u64()
            .checked_add_signed(delta as i64)
            .and_then(page_align_up)
            .ok_or(overflow_side)?;

        if candidate < heap_low.as_u64() {
            return Err(OutOfRange::BelowHeapLow);
        }
        if candidate > self.heap_ceiling() {
            return Err(OutOfRange::AboveCeiling);
        }

        self.set_break(VirtAddr::new(candidate));
        Ok(current_break)
    }

    /// Put the boundary back to a value returned by `try_adjust`,
    /// if the pages for the adjustment could not be provided.
    pub(crate) fn reset_boundary(&mut self, previous_break: VirtAddr) {
        self.active_bounds();
        self.set_break(previous_break);
    }

    /// Pages between the start of the heap and the current boundary.
    pub fn heap_pages(&self) -> PageRange {
        let (heap_low, current_break) = self.active_bounds();
        page_range(heap_low, current_break)
    }

    ///
    /// Description: \
    ///    Final transition of the address space. Afterwards every other
    ///    operation panics.
    ///
    /// Return: \
    ///    Pages still backing the heap, which the caller has to release
    ///    (`None` if the heap was never initialized)
    ///
    pub fn terminate(&mut self) -> Option<PageRange> {
        let pages = match self.state {
            HeapState::Uninitialized => None,
            HeapState::Active { .. } => Some(self.heap_pages()),
            HeapState::Terminated => panic!("ProcessAddressSpace: Address space is already terminated!"),
        };

        self.state = HeapState::Terminated;
        pages
    }

    fn active_bounds(&self) -> (VirtAddr, VirtAddr) {
        match self.state {
            HeapState::Active { original_break, current_break } => (original_break, current_break),
            HeapState::Uninitialized => panic!("ProcessAddressSpace: Heap boundary is not initialized!"),
            HeapState::Terminated => panic!("ProcessAddressSpace: Trying to use a terminated address space!"),
        }
    }

    fn set_break(&mut self, new_break: VirtAddr) {
        if let HeapState::Active { current_break, .. } = &mut self.state {
            *current_break = new_break;
        }

        self.check_invariants();
    }

    /// A boundary outside its legal range means corrupted kernel state.
    fn check_invariants(&self) {
        if let HeapState::Active { original_break, current_break } = self.state {
            assert!(current_break.is_aligned(PAGE_SIZE as u64), "ProcessAddressSpace: Heap boundary [{:?}] is not page aligned!", current_break);
            assert!(
                current_break >= original_break && current_break.as_u64() <= self.heap_ceiling(),
                "ProcessAddressSpace: Heap boundary [{:?}] outside of [{:?} - 0x{:x}]!",
                current_break,
                original_break,
                self.heap_ceiling()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::layout::USER_LAYOUT;

    fn active_space(seed: u64) -> ProcessAddressSpace {
        let mut space = ProcessAddressSpace::new(USER_LAYOUT);
        space.initialize(VirtAddr::new(seed));
        space
    }

    #[test]
    fn initialize_rounds_seed_up() {
        let mut space = ProcessAddressSpace::new(USER_LAYOUT);
        assert_eq!(space.initialize(VirtAddr::new(0x403a10)), VirtAddr::new(0x404000));
        assert_eq!(space.heap_low(), VirtAddr::new(0x404000));
        assert_eq!(space.original_break(), VirtAddr::new(0x404000));
        assert_eq!(space.current_heap_boundary(), VirtAddr::new(0x404000));
        assert!(space.heap_pages().is_empty());
    }

    #[test]
    fn initialize_keeps_aligned_seed() {
        let space = active_space(0x404000);
        assert_eq!(space.current_heap_boundary(), VirtAddr::new(0x404000));
    }

    #[test]
    #[should_panic]
    fn initialize_twice_panics() {
        let mut space = active_space(0x404000);
        space.initialize(VirtAddr::new(0x500000));
    }

    #[test]
    #[should_panic]
    fn seed_outside_user_space_panics() {
        ProcessAddressSpace::new(USER_LAYOUT).initialize(VirtAddr::new(0x1000));
    }

    #[test]
    #[should_panic]
    fn seed_inside_guard_gap_panics() {
        ProcessAddressSpace::new(USER_LAYOUT).initialize(VirtAddr::new(0x3ffffffff001));
    }

    #[test]
    #[should_panic]
    fn boundary_before_initialize_panics() {
        ProcessAddressSpace::new(USER_LAYOUT).current_heap_boundary();
    }

    #[test]
    fn grow_by_one_page() {
        let mut space = active_space(0x404000);
        assert_eq!(space.try_adjust(0x1000), Ok(VirtAddr::new(0x404000)));
        assert_eq!(space.current_heap_boundary(), VirtAddr::new(0x405000));
        assert_eq!(space.heap_pages().count(), 1);
    }

    #[test]
    fn positive_delta_returns_old_boundary_and_rounds() {
        for delta in [1isize, 0x10, 0xfff, 0x1000, 0x1001, 0x12345, 0x100000] {
            let mut space = active_space(0x404000);
            let expected = page_align_up(0x404000 + delta as u64).unwrap();

            assert_eq!(space.try_adjust(delta), Ok(VirtAddr::new(0x404000)));
            assert_eq!(space.current_heap_boundary().as_u64(), expected);
        }
    }

    #[test]
    fn zero_delta_is_noop() {
        let mut space = active_space(0x404000);
        space.try_adjust(0x3000).unwrap();

        assert_eq!(space.try_adjust(0), Ok(VirtAddr::new(0x407000)));
        assert_eq!(space.current_heap_boundary(), VirtAddr::new(0x407000));
    }

    #[test]
    fn small_deltas_converge_on_page_boundaries() {
        let mut space = active_space(0x404000);

        assert_eq!(space.try_adjust(0x10), Ok(VirtAddr::new(0x404000)));
        assert_eq!(space.try_adjust(0x10), Ok(VirtAddr::new(0x405000)));
        assert_eq!(space.current_heap_boundary(), VirtAddr::new(0x406000));

        // A partial page shrink rounds back up to the current boundary
        assert_eq!(space.try_adjust(-0x800), Ok(VirtAddr::new(0x406000)));
        assert_eq!(space.current_heap_boundary(), VirtAddr::new(0x406000));
    }

    #[test]
    fn shrink_below_heap_low_fails() {
        let mut space = active_space(0x404000);
        space.try_adjust(0x1000).unwrap();

        assert_eq!(space.try_adjust(-0x2000), Err(OutOfRange::BelowHeapLow));
        assert_eq!(space.current_heap_boundary(), VirtAddr::new(0x405000));
    }

    #[test]
    fn shrink_back_to_heap_low_succeeds() {
        let mut space = active_space(0x404000);
        space.try_adjust(0x2000).unwrap();

        assert_eq!(space.try_adjust(-0x2000), Ok(VirtAddr::new(0x406000)));
        assert_eq!(space.current_heap_boundary(), space.heap_low());
    }

    #[test]
    fn growth_into_guard_gap_fails() {
        let mut space = active_space(0x3ffffffe0000);
        let ceiling = USER_LAYOUT.stack_bottom() - HEAP_GUARD_GAP;
        assert_eq!(space.heap_ceiling(), ceiling);

        let room = (ceiling - 0x3ffffffe0000) as isize;
        assert_eq!(space.try_adjust(room + 1), Err(OutOfRange::AboveCeiling));
        assert_eq!(space.current_heap_boundary(), VirtAddr::new(0x3ffffffe0000));

        assert_eq!(space.try_adjust(room), Ok(VirtAddr::new(0x3ffffffe0000)));
        assert_eq!(space.current_heap_boundary().as_u64(), ceiling);
        assert_eq!(space.try_adjust(1), Err(OutOfRange::AboveCeiling));
    }

    #[test]
    fn overflow_is_classified_by_direction() {
        let mut space = active_space(0x404000);

        assert_eq!(space.try_adjust(isize::MAX), Err(OutOfRange::AboveCeiling));
        assert_eq!(space.try_adjust(isize::MIN), Err(OutOfRange::BelowHeapLow));
        assert_eq!(space.current_heap_boundary(), VirtAddr::new(0x404000));
    }

    #[test]
    fn grow_then_shrink_restores_boundary() {
        let mut space = active_space(0x404000);
        space.try_adjust(0x5000).unwrap();

        for pages in [1isize, 2, 16, 256] {
            let before = space.current_heap_boundary();
            space.try_adjust(pages * PAGE_SIZE as isize).unwrap();
            space.try_adjust(-pages * PAGE_SIZE as isize).unwrap();
            assert_eq!(space.current_heap_boundary(), before);
        }
    }

    #[test]
    fn custom_guard_gap_lowers_ceiling() {
        let mut space = ProcessAddressSpace::with_guard_gap(USER_LAYOUT, 0x100000);
        space.initialize(VirtAddr::new(0x3fffffe00000));
        assert_eq!(space.guard_gap(), 0x100000);

        assert_eq!(space.try_adjust(0x100000), Ok(VirtAddr::new(0x3fffffe00000)));
        assert_eq!(space.try_adjust(0x1000), Err(OutOfRange::AboveCeiling));
    }

    #[test]
    fn reset_boundary_restores_previous_value() {
        let mut space = active_space(0x404000);
        let previous = space.try_adjust(0x4000).unwrap();

        space.reset_boundary(previous);
        assert_eq!(space.current_heap_boundary(), VirtAddr::new(0x404000));
    }

    #[test]
    fn terminate_returns_heap_pages() {
        let mut space = active_space(0x404000);
        space.try_adjust(0x3000).unwrap();

        let pages = space.terminate().unwrap();
        assert_eq!(pages.start.start_address(), VirtAddr::new(0x404000));
        assert_eq!(pages.end.start_address(), VirtAddr::new(0x407000));
        assert!(space.is_terminated());
        assert!(!space.is_active());
    }

    #[test]
    fn terminate_uninitialized_has_no_pages() {
        let mut space = ProcessAddressSpace::new(USER_LAYOUT);
        assert_eq!(space.terminate(), None);
    }

    #[test]
    #[should_panic]
    fn adjust_after_terminate_panics() {
        let mut space = active_space(0x404000);
        space.terminate();
        let _ = space.try_adjust(0x1000);
    }

    #[test]
    #[should_panic]
    fn corrupted_boundary_is_fatal() {
        let mut space = active_space(0x404000);
        space.state = HeapState::Active { original_break: VirtAddr::new(0x404000), current_break: VirtAddr::new(0x403000) };
        let _ = space.try_adjust(0);
    }
}
