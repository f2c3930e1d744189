pub use crate::user_layout::{HEAP_GUARD_GAP, USER_STACK_BOTTOM, USER_TEXT_TOP, USER_VADDR_LIMIT};

// Generated by build.rs from `user_layout.rs`, for C code and user space runtimes
pub const USER_LAYOUT_HEADER: &str = include_str!(concat!(env!("OUT_DIR"), "/user_layout.h"));
