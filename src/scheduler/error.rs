/*
 * Scheduler Error Kinds
 *
 * A typed replacement for the ad hoc `Result<_, &'static str>` idiom used by
 * ProcessManager/AddressSpace elsewhere in this crate. The scheduler core's
 * error set is large enough, and crosses enough module boundaries, to
 * benefit from exhaustive matches at call sites instead of string compares.
 *
 * `unwrap()`/`expect()` and `panic!` remain reserved for conditions the
 * design treats as genuinely fatal (corrupted run queue, empty death-stack
 * pool, missing idle thread) - those are broken invariants, not runtime
 * errors, and are not represented here.
 */

use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedError {
    /// Allocation failed (thread/process table, stack, heap).
    NoMemory,
    /// A caller-supplied argument was out of range or otherwise invalid.
    InvalidArgs,
    /// A tid/pid/port/sem handle does not name a live object.
    InvalidHandle,
    /// Lookup failed (process group, session, thread, process).
    NotFound,
    /// An enumeration cookie has been exhausted.
    NoMoreHandles,
    /// The owning process is in DEATH and accepts no new threads.
    TaskProcDeleted,
    /// A user-supplied pointer/region was rejected by the VM collaborator.
    VmBadUserMemory,
    /// The semaphore backing this wait was deleted out from under the waiter.
    SemDeleted,
}

impl fmt::Display for SchedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            SchedError::NoMemory => "out of memory",
            SchedError::InvalidArgs => "invalid arguments",
            SchedError::InvalidHandle => "invalid handle",
            SchedError::NotFound => "not found",
            SchedError::NoMoreHandles => "no more handles",
            SchedError::TaskProcDeleted => "process is being deleted",
            SchedError::VmBadUserMemory => "bad user memory",
            SchedError::SemDeleted => "semaphore deleted",
        };
        write!(f, "{}", msg)
    }
}

impl SchedError {
    /// Normalize a SEM_DELETED observed on an expected join-on-exit path to
    /// success, per SPEC_FULL.md's error-handling design: a joiner racing a
    /// target's `thread_exit` sees its return-code semaphore deleted as part
    /// of normal teardown, not as a failure.
    pub fn normalize_join(self) -> Result<(), SchedError> {
        match self {
            SchedError::SemDeleted => Ok(()),
            other => Err(other),
        }
    }
}
