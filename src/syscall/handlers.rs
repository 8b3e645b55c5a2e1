/*
 * System Call Handlers
 *
 * This module implements the actual syscall handler functions that are
 * dispatched from the syscall entry point.
 *
 * Each handler:
 * - Validates arguments from userspace (pointers, file descriptors, etc.)
 * - Performs the requested operation
 * - Returns result or error code (negative for errors)
 *
 * Security considerations:
 * - All userspace pointers MUST be validated before dereferencing
 * - File descriptors must be checked for validity
 * - Integer overflows must be prevented
 * - Resources must be properly cleaned up on error paths
 */

use super::numbers::*;
use crate::scheduler::{self, Priority, ProcessId, ThreadId, ThreadManager, error::SchedError};

/// Validate a user pointer
///
/// Checks that a pointer from userspace is:
/// - Not NULL
/// - Within userspace address range (< 0x0000_8000_0000_0000)
/// - Does not overflow when adding count
///
/// Returns Ok(()) if valid, Err(error_code) otherwise.
fn validate_user_ptr<T>(ptr: *const T, count: usize) -> Result<(), isize> {
    let addr = ptr as usize;

    // Check for NULL pointer
    if addr == 0 {
        return Err(-EFAULT);
    }

    // Check if address is in kernel space (high half)
    if addr >= 0x0000_8000_0000_0000 {
        return Err(-EFAULT);
    }

    // Check for overflow when computing end address
    if addr.checked_add(count * core::mem::size_of::<T>()).is_none() {
        return Err(-EFAULT);
    }

    Ok(())
}

// Syscall handlers will be implemented in Phase 5
// For now, they all return ENOSYS (not implemented)

pub fn sys_read(_fd: i32, _buf: *mut u8, _count: usize) -> isize {
    -ENOSYS
}

pub fn sys_write(_fd: i32, _buf: *const u8, _count: usize) -> isize {
    -ENOSYS
}

pub fn sys_close(_fd: i32) -> isize {
    -ENOSYS
}

pub fn sys_fstat(_fd: i32, _statbuf: *mut u8) -> isize {
    -ENOSYS
}

pub fn sys_lseek(_fd: i32, _offset: i64, _whence: i32) -> isize {
    -ENOSYS
}

pub fn sys_isatty(_fd: i32) -> isize {
    -ENOSYS
}

pub fn sys_brk(_addr: *mut u8) -> isize {
    -ENOSYS
}

pub fn sys_exit(status: i32) -> ! {
    ThreadManager::exit(status)
}

pub fn sys_yield() -> isize {
    scheduler::yield_now();
    0
}

/// Map a scheduler-core error onto the negative errno this ABI returns.
fn sched_errno(err: SchedError) -> isize {
    let code = match err {
        SchedError::NoMemory => ENOMEM,
        SchedError::InvalidArgs => EINVAL,
        SchedError::InvalidHandle => EBADF,
        SchedError::NotFound => EINVAL,
        SchedError::NoMoreHandles => EINVAL,
        SchedError::TaskProcDeleted => EINVAL,
        SchedError::VmBadUserMemory => EFAULT,
        SchedError::SemDeleted => EINVAL,
    };
    -code
}

pub fn sys_setpriority(tid: usize, priority: i32) -> isize {
    if ThreadManager::set_priority(ThreadId(tid), Priority(priority)) {
        0
    } else {
        -EINVAL
    }
}

pub fn sys_getpriority(tid: usize) -> isize {
    match scheduler::thread_snapshot(ThreadId(tid)) {
        Some((_, priority, _)) => priority.0 as isize,
        None => -EINVAL,
    }
}

pub fn sys_setpgid(pid: usize, pgid: usize) -> isize {
    match scheduler::groups::setpgid(ProcessId::new(pid), pgid) {
        Ok(()) => 0,
        Err(e) => sched_errno(e),
    }
}

pub fn sys_getpgid(pid: usize) -> isize {
    match scheduler::groups::getpgid(ProcessId::new(pid)) {
        Ok(pgid) => pgid as isize,
        Err(e) => sched_errno(e),
    }
}

pub fn sys_setsid(pid: usize) -> isize {
    match scheduler::groups::setsid(ProcessId::new(pid)) {
        Ok(sid) => sid as isize,
        Err(e) => sched_errno(e),
    }
}
