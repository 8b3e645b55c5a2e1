/*
 * Death Stack Pool
 *
 * A thread that is tearing itself down (ThreadManager::exit) cannot free its
 * own kernel stack while still executing on it. The reference kernel solves
 * this by switching onto a small shared "death stack" before the final
 * reschedule and freeing the real stack from there.
 *
 * Here, context switches only ever happen inside the timer/software
 * interrupt handlers (see scheduler::mod's naked-asm handlers), which already
 * run on a dedicated interrupt stack - so an exiting thread's own Box<[u8]>
 * stack is never touched until the *next* thread has already been dispatched
 * (cleanup_terminated_threads runs from schedule_from_interrupt, on the
 * interrupt stack, never on the exiting thread's own stack). That sidesteps
 * the use-after-free the death stack exists to prevent.
 *
 * What the pool still does for us: it bounds how many threads may be
 * mid-teardown at once (one slot reserved per exiting thread until the
 * reaper actually frees it), exactly mirroring `num_death_stacks =
 * smp_get_num_cpus()` and `death_stack_sem` in the source material, just
 * gating reaper backlog instead of literal stack pointers.
 */

use core::sync::atomic::{AtomicU64, Ordering};

use super::sem;

const NUM_DEATH_SLOTS: usize = 4;

static DEATH_SEM: AtomicU64 = AtomicU64::new(u64::MAX);
static BITMAP: spin::Mutex<u8> = spin::Mutex::new(0);

/// Initialize the pool. Called once from SchedulerManager::init().
pub fn init() {
    let sem_id = sem::create(NUM_DEATH_SLOTS as i64);
    DEATH_SEM.store(sem_id as u64, Ordering::SeqCst);
}

fn sem_id() -> usize {
    DEATH_SEM.load(Ordering::SeqCst) as usize
}

/// Reserve a death-stack slot, blocking the caller if the pool is exhausted.
/// Returns the slot index so `release` can give it back.
pub fn acquire() -> usize {
    sem::acquire(sem_id(), 1);
    let mut bitmap = BITMAP.lock();
    for i in 0..NUM_DEATH_SLOTS {
        if *bitmap & (1 << i) == 0 {
            *bitmap |= 1 << i;
            return i;
        }
    }
    // Semaphore accounting guarantees a free bit exists; fall back to slot 0
    // rather than panic if that invariant is ever violated.
    0
}

/// Return a death-stack slot to the pool. Called by the reaper
/// (cleanup_terminated_threads) once the exited thread's real stack has
/// actually been freed.
pub fn release(slot: usize) {
    let mut bitmap = BITMAP.lock();
    *bitmap &= !(1u8 << slot);
    drop(bitmap);
    sem::release(sem_id(), 1);
}
