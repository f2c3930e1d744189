pub mod sys_concurrent;
pub mod sys_vmem;
pub mod syscall_dispatcher;
