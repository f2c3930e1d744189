/* ╔═════════════════════════════════════════════════════════════════════════╗
   ║ Module: layout                                                          ║
   ╟─────────────────────────────────────────────────────────────────────────╢
   ║ Descr.: Fixed map of the user part of a virtual address space.          ║
   ║         Addresses are kept as plain u64, since the exclusive upper      ║
   ║         bound is not a canonical address.                               ║
   ╚═════════════════════════════════════════════════════════════════════════╝
*/
use x86_64::VirtAddr;

use crate::consts::{USER_STACK_BOTTOM, USER_TEXT_TOP, USER_VADDR_LIMIT};

/// Highest exclusive bound user space may use (lower canonical half).
const CANONICAL_LOWER_HALF_END: u64 = 0x800000000000;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AddressSpaceLayout {
    text_top: u64,
    stack_bottom: u64,
    vaddr_limit: u64,
}

/// Layout shared by all user processes.
pub const USER_LAYOUT: AddressSpaceLayout = AddressSpaceLayout::new(USER_TEXT_TOP, USER_STACK_BOTTOM, USER_VADDR_LIMIT);

impl AddressSpaceLayout {
    /// Panics if `text_top < stack_bottom <= vaddr_limit` does not hold.
    /// In a const context, such as [`USER_LAYOUT`], this fails the build.
    pub const fn new(text_top: u64, stack_bottom: u64, vaddr_limit: u64) -> Self {
        assert!(text_top < stack_bottom, "AddressSpaceLayout: Text top must lie below the stack!");
        assert!(stack_bottom <= vaddr_limit, "AddressSpaceLayout: Stack must lie below the address limit!");
        assert!(vaddr_limit <= CANONICAL_LOWER_HALF_END, "AddressSpaceLayout: User space must fit into the lower canonical half!");

        Self { text_top, stack_bottom, vaddr_limit }
    }

    pub const fn text_top(&self) -> u64 {
        self.text_top
    }

    pub const fn stack_bottom(&self) -> u64 {
        self.stack_bottom
    }

    pub const fn vaddr_limit(&self) -> u64 {
        self.vaddr_limit
    }

    /// True iff `text_top <= addr < vaddr_limit`.
    pub fn is_user_address(&self, addr: VirtAddr) -> bool {
        let addr = addr.as_u64();
        addr >= self.text_top && addr < self.vaddr_limit
    }

    ///
    /// Description: \
    ///    Highest address the heap boundary may reach when `guard_gap`
    ///    bytes have to stay unmapped below the stack. The result always
    ///    lies below `vaddr_limit`.
    ///
    pub fn heap_ceiling(&self, guard_gap: u64) -> u64 {
        self.stack_bottom.saturating_sub(guard_gap).min(self.vaddr_limit - 1)
    }
}
