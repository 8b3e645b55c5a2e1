/*
 * Preemptive Priority Scheduler
 *
 * This module is the public API layer and interrupt-handler home for the
 * CLUU scheduler. The scheduler itself is split policy/mechanism:
 *
 * - MECHANISM (scheduler.rs, thread.rs, process.rs, sched_core.rs,
 *   context.rs): owns the actual data (threads, processes, priority-bucketed
 *   run queues), the naked-asm register save/restore, and everything a
 *   policy is not allowed to touch directly.
 * - POLICY (traits.rs, events.rs, policies/): a pluggable `dyn Scheduler`
 *   that only sees the world through `KernelSchedCtx`. The default policy,
 *   PriorityRtPolicy, is a thin wrapper around the mechanism's own bucket
 *   scan - see policies/priority_rt.rs for why it keeps no state of its own.
 *
 * Everything else here (process groups/sessions, signals, semaphores,
 * blocking I/O waits, the death-stack teardown protocol, Mach-style IPC
 * ports) builds on top of that core and is organized one concern per file.
 *
 * THREAD LIFECYCLE:
 * =================
 *
 *           Birth -> Ready <-> Running
 *                       ^          |
 *                       |          v
 *                  Suspended   Waiting
 *                       |          |
 *                       +----------+
 *                            |
 *                            v
 *                     FreeOnResched (reaped by cleanup_terminated_threads)
 *
 * CONTEXT SWITCHING:
 * ==================
 *
 * Both the 100Hz PIT tick and a thread's own INT 0x81 yield land in the same
 * naked-asm handler shape: push all GP registers, call into Rust with the
 * resulting InterruptContext*, splice in whatever context the dispatcher
 * picked, pop, iretq. The Rust side (schedule_from_interrupt) only decides
 * *which* context to resume; it never touches the stack itself.
 *
 * BOOT MODE:
 * ==========
 *
 * Before every Critical process has signaled readiness, the dispatcher
 * restricts itself to Critical-process threads (plus PID 0, which owns the
 * idle thread) so that boot-time services can't be starved out by a
 * prematurely-scheduled user thread. See SchedulerMode and scheduler.rs's
 * scan_bucket.
 */

use core::{
    arch::naked_asm,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};

use alloc::string::String;
use spin::Mutex;

pub mod context;
pub mod death_stack;
pub mod error;
pub mod events;
pub mod groups;
pub mod io_wait;
pub mod ipc;
pub mod policies;
pub mod process;
pub mod sched_core;
pub mod scheduler;
pub mod scheduler_manager;
pub mod sem;
pub mod signals;
pub mod thread;
pub mod traits;
pub mod types;

pub use context::SchedContext;
pub use io_wait::{IoChannel, wait_for_io, wake_io_waiters};
pub use process::{Process, ProcessId, ProcessManager, ProcessState};
pub use scheduler::{InterruptContext, InterruptFrame};
pub use scheduler_manager::SchedulerManager;
pub use sched_core::SchedulerCore;
pub use policies::PriorityRtPolicy;
pub use thread::{SignalState, Thread, ThreadId, ThreadManager, ThreadState};
pub use traits::{KernelSchedCtx, Scheduler};
pub use types::{BlockReason, CpuId, DispatchDecision, Priority, SchedClass, TimeSliceTicks};

/// Shared memory is owned by the memory subsystem, not the scheduler, but
/// vfs/mod.rs reaches it through `scheduler::shmem` for historical reasons -
/// the server it's spawning (spawn_server) is itself scheduler state.
pub use crate::shmem as shmem;

/// A process's scheduling classification.
///
/// Drives the default priority a process's threads are created at
/// (`ProcessType::priority`) and, during SchedulerMode::Boot, which
/// processes the dispatcher will consider at all (see
/// `scheduler::Scheduler::scan_bucket`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessType {
    /// Boot-critical kernel service (vfs server, etc). Runs at the top of
    /// the regular priority range and is the only class eligible while the
    /// scheduler is still in Boot mode.
    Critical,
    /// Ordinary kernel service, above user priority but not boot-gating.
    System,
    /// Userspace process - the default for anything spawned after boot.
    User,
    /// Hard real-time workload, scheduled out of the strict-FIFO RT buckets.
    RealTime,
}

impl ProcessType {
    pub fn priority(self) -> Priority {
        match self {
            ProcessType::Critical => Priority::CRITICAL,
            ProcessType::System => Priority::SYSTEM,
            ProcessType::User => Priority::NORMAL,
            ProcessType::RealTime => Priority::MIN_RT,
        }
    }
}

/// Whether a process has finished `register_critical_process`/
/// `signal_process_ready` handshaking yet. Only meaningful for Critical
/// processes; everything else starts and stays Ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessInitState {
    Initializing,
    Ready,
}

/// Boot-time gating state for the whole scheduler.
///
/// `Boot` tracks how many Critical processes have been registered versus
/// how many have signaled ready; once the counts match, the scheduler flips
/// to `Normal` and the dispatcher stops restricting itself to Critical
/// threads. See `scheduler::Scheduler::register_critical_process` /
/// `signal_process_ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerMode {
    Boot { critical_count: usize, ready_count: usize },
    Normal,
}

/// A component of the kernel that needs a one-time, ordering-sensitive boot
/// step. Currently only SchedulerManager implements this; kept as a trait
/// rather than a bare function so main.rs's boot sequence reads the same way
/// for every subsystem that grows one.
pub trait KernelComponent {
    fn init();
}

/// The mechanism's actual thread/process/run-queue state.
static SCHEDULER: Mutex<Option<scheduler::Scheduler>> = Mutex::new(None);

/// The pluggable policy plus its per-CPU bookkeeping.
static SCHEDULER_CORE: Mutex<Option<SchedulerCore>> = Mutex::new(None);

/// Currently running thread (atomic for IRQ-safe reads without a lock).
static CURRENT_THREAD_ID: AtomicUsize = AtomicUsize::new(0);

/// Set once SchedulerManager::enable() has spawned the idle thread; before
/// that, yield_now()/the timer handler are no-ops.
static SCHEDULER_ENABLED: AtomicBool = AtomicBool::new(false);

/// Run a closure with read access to the mechanism's scheduler state.
///
/// Panics if called before `SchedulerManager::init()`.
pub(crate) fn with_scheduler<F, R>(f: F) -> R
where
    F: FnOnce(&scheduler::Scheduler) -> R,
{
    x86_64::instructions::interrupts::without_interrupts(|| {
        let guard = SCHEDULER.lock();
        let scheduler = guard.as_ref().expect("scheduler not initialized");
        f(scheduler)
    })
}

/// Run a closure with mutable access to the mechanism's scheduler state.
///
/// Panics if called before `SchedulerManager::init()`.
pub(crate) fn with_scheduler_mut<F, R>(f: F) -> R
where
    F: FnOnce(&mut scheduler::Scheduler) -> R,
{
    x86_64::instructions::interrupts::without_interrupts(|| {
        let mut guard = SCHEDULER.lock();
        let scheduler = guard.as_mut().expect("scheduler not initialized");
        f(scheduler)
    })
}

/// Run a closure with mutable access to both the scheduler state and the
/// policy core at once - needed any time a caller has to report an event to
/// the policy (which requires a `SchedContext` borrowing `scheduler`) while
/// also holding `core` to call the event method on.
///
/// Panics if called before `SchedulerManager::init()`.
pub(crate) fn with_scheduler_and_core<F, R>(f: F) -> R
where
    F: FnOnce(&mut scheduler::Scheduler, &mut SchedulerCore) -> R,
{
    x86_64::instructions::interrupts::without_interrupts(|| {
        let mut sched_guard = SCHEDULER.lock();
        let mut core_guard = SCHEDULER_CORE.lock();
        let scheduler = sched_guard.as_mut().expect("scheduler not initialized");
        let core = core_guard.as_mut().expect("scheduler core not initialized");
        f(scheduler, core)
    })
}

/// Look up a thread's name without pulling in the whole Thread.
pub(crate) fn get_thread_name(tid: ThreadId) -> Option<String> {
    with_scheduler(|scheduler| {
        scheduler
            .threads
            .iter()
            .find(|t| t.id == tid)
            .map(|t| t.name.clone())
    })
}

/// How many live threads currently carry this id. Always 0 or 1 unless an
/// invariant has broken; exposed for the scheduler_core tests rather than
/// any production caller.
pub(crate) fn thread_id_occurrences(tid: ThreadId) -> usize {
    with_scheduler(|scheduler| scheduler.threads.iter().filter(|t| t.id == tid).count())
}

/// A thread's current state and priority bucket, plus how many ready-queue
/// buckets it is enqueued in (should be 0 or 1). Used by the scheduler_core
/// tests and by `sys_getpriority`.
pub(crate) fn thread_snapshot(tid: ThreadId) -> Option<(ThreadState, Priority, usize)> {
    with_scheduler(|scheduler| {
        let thread = scheduler.threads.iter().find(|t| t.id == tid)?;
        let bucket_hits = scheduler
            .ready_queues
            .iter()
            .filter(|q| q.contains(&tid))
            .count();
        Some((thread.state, thread.priority, bucket_hits))
    })
}

// ============================================================================
// LEGACY-STYLE FREE-FUNCTION WRAPPERS
// ============================================================================
//
// sem.rs, io_wait.rs and ipc.rs were all written against a flat
// current_thread_id()/block_current_thread()/wake_thread()/yield_now() API
// rather than the ZST managers - keeping these as thin wrappers means those
// collaborators don't need to know SchedulerManager/ThreadManager exist.

/// Currently running thread.
pub fn current_thread_id() -> ThreadId {
    ThreadId(CURRENT_THREAD_ID.load(Ordering::SeqCst))
}

/// Block the current thread until something wakes it with `wake_thread`.
pub fn block_current_thread() {
    SchedulerManager::block_current();
}

/// Wake a thread that is blocked in `block_current_thread`.
pub fn wake_thread(thread_id: ThreadId) {
    SchedulerManager::wake(thread_id);
}

/// Voluntarily give up the remainder of the current time slice.
pub fn yield_now() {
    SchedulerManager::yield_now();
}

/// Whether the scheduler has been enabled (idle thread spawned, dispatcher
/// live). Used by the log buffer to decide whether it's safe to flush
/// synchronously or must defer to the next context switch.
pub fn is_scheduler_enabled() -> bool {
    SchedulerManager::is_enabled()
}

/// Process ID of the currently running thread.
pub fn current_process_id() -> Option<ProcessId> {
    ProcessManager::current_id()
}

/// Access the current thread's owning process (mutable). Used by the page
/// fault handler to grow the heap on a legitimate fault.
pub fn with_current_process_mut<F, R>(f: F) -> Option<R>
where
    F: FnOnce(&mut Process) -> R,
{
    ProcessManager::with_current_mut(f)
}

/// Access the current thread's owning process (read-only).
pub fn with_current_process<F, R>(f: F) -> Option<R>
where
    F: FnOnce(&Process) -> R,
{
    ProcessManager::with_current(f)
}

/// Create a new kernel process (its own FD table and resource bookkeeping,
/// still running in the kernel address space).
pub fn spawn_kernel_process(name: &str, process_type: ProcessType) -> ProcessId {
    ProcessManager::spawn_kernel(name, process_type)
}

/// Access an arbitrary process by ID (mutable). Used by the ELF loader to
/// load a binary into a freshly-created process's address space.
pub fn with_process_mut<F, R>(process_id: ProcessId, f: F) -> Option<R>
where
    F: FnOnce(&mut Process) -> R,
{
    ProcessManager::with_mut(process_id, f)
}

/// Create a thread inside a specific (already-created) process.
pub fn spawn_thread_in_process(entry_point: fn(), name: &str, process_id: ProcessId) -> ThreadId {
    ThreadManager::spawn_in_process(entry_point, name, process_id)
}

/// Per-thread CPU usage snapshot, as reported by `ps`/debug tooling.
#[derive(Debug, Clone)]
pub struct ThreadStats {
    pub id: ThreadId,
    pub name: String,
    pub state: ThreadState,
    pub cpu_time_ms: u64,
    pub cpu_percent: u64,
}

/// Snapshot CPU usage for every thread currently known to the scheduler.
pub fn get_thread_stats() -> alloc::vec::Vec<ThreadStats> {
    ThreadManager::stats()
}

/// The idle thread. Owned by the kernel process (PID 0); runs whenever
/// nothing else is runnable and simply halts between interrupts.
fn idle_thread_main() {
    loop {
        x86_64::instructions::hlt();
    }
}

// ============================================================================
// INTERRUPT HANDLERS
// ============================================================================
//
// Both handlers push the same fifteen general-purpose registers in the same
// order, hand the resulting InterruptContext* to schedule_from_interrupt,
// and splice in whatever context it returns before iretq. The only
// difference is the timer handler also sends EOI to the PIC; the software
// INT 0x81 yield does not need one, since it isn't an IRQ.

/// Handler for the voluntary-yield software interrupt (INT 0x81).
#[unsafe(naked)]
pub unsafe extern "C" fn yield_interrupt_handler() {
    naked_asm!(
        "push rax",
        "push rbx",
        "push rcx",
        "push rdx",
        "push rsi",
        "push rdi",
        "push rbp",
        "push r8",
        "push r9",
        "push r10",
        "push r11",
        "push r12",
        "push r13",
        "push r14",
        "push r15",
        "mov rdi, rsp",
        "call {schedule_fn}",
        "mov rsp, rax",
        "pop r15",
        "pop r14",
        "pop r13",
        "pop r12",
        "pop r11",
        "pop r10",
        "pop r9",
        "pop r8",
        "pop rbp",
        "pop rdi",
        "pop rsi",
        "pop rdx",
        "pop rcx",
        "pop rbx",
        "pop rax",
        "iretq",
        schedule_fn = sym schedule_from_interrupt,
    );
}

/// Handler for the 100Hz PIT timer interrupt (IRQ0). Identical to the yield
/// handler except it must acknowledge the interrupt at the master PIC
/// before returning, or the PIC will never raise IRQ0 again.
#[unsafe(naked)]
pub unsafe extern "C" fn preemptive_timer_interrupt_handler() {
    naked_asm!(
        "push rax",
        "push rbx",
        "push rcx",
        "push rdx",
        "push rsi",
        "push rdi",
        "push rbp",
        "push r8",
        "push r9",
        "push r10",
        "push r11",
        "push r12",
        "push r13",
        "push r14",
        "push r15",
        "mov rdi, rsp",
        "call {schedule_fn}",
        "mov rsp, rax",
        "push rax",
        "mov al, 0x20",
        "out 0x20, al",
        "pop rax",
        "pop r15",
        "pop r14",
        "pop r13",
        "pop r12",
        "pop r11",
        "pop r10",
        "pop r9",
        "pop r8",
        "pop rbp",
        "pop rdi",
        "pop rsi",
        "pop rdx",
        "pop rcx",
        "pop rbx",
        "pop rax",
        "iretq",
        schedule_fn = sym schedule_from_interrupt,
    );
}

/// The Rust half of every context switch.
///
/// Called with interrupts effectively disabled (we're inside an interrupt
/// gate) and a pointer to the outgoing thread's just-saved register state.
/// Returns a pointer to the InterruptContext the caller should restore -
/// either the thread that was picked to run next, or `current_ctx_ptr`
/// unchanged if nothing should switch.
#[unsafe(no_mangle)]
pub extern "C" fn schedule_from_interrupt(
    current_ctx_ptr: *const InterruptContext,
) -> *const InterruptContext {
    if !SCHEDULER_ENABLED.load(Ordering::SeqCst) {
        return current_ctx_ptr;
    }

    crate::utils::system::timer::on_timer_interrupt();

    let current_id = ThreadId(CURRENT_THREAD_ID.load(Ordering::SeqCst));
    let current_time = crate::utils::system::timer::uptime_ms();

    // Save the outgoing thread's context, report the tick to the policy and
    // ask it for a decision, then reap anything its exit turned into a
    // zombie - all under the same lock scope cleanup_terminated_threads
    // itself needs. The ZombieEvents it returns are handled below, once the
    // locks are released, since groups::/signals:: re-take SCHEDULER.
    let (next_id, zombie_events) = {
        let mut sched_guard = SCHEDULER.lock();
        let mut core_guard = SCHEDULER_CORE.lock();
        let (Some(scheduler), Some(core)) = (sched_guard.as_mut(), core_guard.as_mut()) else {
            return current_ctx_ptr;
        };

        if current_id.0 != 0 {
            if let Some(thread) = scheduler.threads.iter_mut().find(|t| t.id == current_id) {
                thread.interrupt_context = unsafe { *current_ctx_ptr };
                if thread.last_scheduled_time > 0 {
                    thread.cpu_time_ms = thread
                        .cpu_time_ms
                        .saturating_add(current_time.saturating_sub(thread.last_scheduled_time));
                }
            }
            // A thread still Running simply used up its slice - put it back
            // on its bucket. Threads that blocked/slept/exited this tick
            // already moved themselves to Waiting/Suspended/FreeOnResched
            // and make_ready is a no-op for them.
            scheduler.make_ready(current_id);
        }

        let mut ctx = SchedContext::with_core(scheduler, core, CpuId::BSP);
        core.on_tick(&mut ctx, CpuId::BSP);
        let next = core.reschedule(&mut ctx, CpuId::BSP);

        let (_, zombies) = scheduler.cleanup_terminated_threads(current_id, false);

        (next, zombies)
    };

    for zombie in zombie_events {
        groups::check_orphan_after_departure(zombie.pgid, zombie.sid);
        groups::leave_all(zombie.process_id, zombie.pgid, zombie.sid);
        for child in &zombie.reparented_children {
            groups::recheck_after_reparent(*child);
        }
        if let Some(parent) = zombie.parent {
            if let Some(main_thread) = ProcessManager::with_mut(parent, |p| p.main_thread).flatten() {
                signals::send_signal(main_thread, signals::SIGCHLD, signals::SignalFlags::NO_RESCHED);
            }
        }
    }

    let Some(next_id) = next_id else {
        return current_ctx_ptr;
    };

    if next_id == current_id && current_id.0 != 0 {
        return current_ctx_ptr;
    }

    let next_ctx_ptr = with_scheduler_mut(|scheduler| {
        scheduler.get_thread_mut(next_id).map(|next_thread| {
            next_thread.state = ThreadState::Running;
            next_thread.last_scheduled_time = current_time;
            &next_thread.interrupt_context as *const InterruptContext
        })
    });

    let next_ctx_ptr = match next_ctx_ptr {
        Some(ptr) => ptr,
        None => return current_ctx_ptr,
    };

    CURRENT_THREAD_ID.store(next_id.0, Ordering::SeqCst);

    // Apply any pending STOP/CONT/KILLTHR to the thread we're about to
    // resume. A pending SIGKILLTHR never returns - it tail-calls
    // ThreadManager::exit() and yields again, so this handler's caller
    // (the CPU, via iretq) never sees next_ctx_ptr in that case.
    signals::handle_signals();

    next_ctx_ptr
}
