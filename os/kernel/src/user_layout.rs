// User space layout, part of the process ABI.
// This file is also included by build.rs to generate `user_layout.h`,
// so it must only contain plain constants.

// Start of user text. Everything below is never mapped for user space.
pub const USER_TEXT_TOP: u64 = 0x400000;

// Lowest address of the main user stack.
pub const USER_STACK_BOTTOM: u64 = 0x400000000000;

// Exclusive upper bound of user space (end of the lower canonical half).
pub const USER_VADDR_LIMIT: u64 = 0x800000000000;

// Unmapped distance kept between the heap boundary and the stack.
pub const HEAP_GUARD_GAP: u64 = 0x1000;
