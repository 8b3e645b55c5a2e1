/*
 * Counting Semaphores
 *
 * A minimal counting-semaphore collaborator for the scheduler core. Not a
 * full VM-backed IPC primitive (no userspace handle table, no named
 * semaphores) - just enough of `sem_create`/`acquire_etc`/`release_etc` to
 * back return-code waits (thread_wait_on_thread) and the death-stack pool's
 * concurrency gate.
 *
 * Modeled on io_wait.rs's global table + WaitQueue pattern, generalized from
 * I/O channels to semaphore ids with an integer count.
 */

use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicUsize, Ordering};
use spin::Mutex;

use super::ThreadId;

struct Semaphore {
    count: i64,
    waiting: Vec<ThreadId>,
}

static SEMAPHORES: Mutex<BTreeMap<usize, Semaphore>> = Mutex::new(BTreeMap::new());
static NEXT_SEM_ID: AtomicUsize = AtomicUsize::new(1);

/// Create a semaphore with an initial count. Returns its id.
pub fn create(initial_count: i64) -> usize {
    let id = NEXT_SEM_ID.fetch_add(1, Ordering::SeqCst);
    SEMAPHORES.lock().insert(id, Semaphore { count: initial_count, waiting: Vec::new() });
    id
}

/// Destroy a semaphore, waking any waiters (they observe a missing semaphore
/// as SEM_DELETED at the call site).
pub fn delete(id: usize) {
    if let Some(sem) = SEMAPHORES.lock().remove(&id) {
        for tid in sem.waiting {
            super::wake_thread(tid);
        }
    }
}

/// Acquire `count` units, blocking the calling thread until available.
pub fn acquire(id: usize, count: i64) {
    loop {
        let should_block = {
            let mut sems = SEMAPHORES.lock();
            match sems.get_mut(&id) {
                Some(sem) if sem.count >= count => {
                    sem.count -= count;
                    false
                }
                Some(sem) => {
                    sem.waiting.push(super::current_thread_id());
                    true
                }
                None => return,
            }
        };

        if !should_block {
            return;
        }

        super::block_current_thread();
        super::yield_now();
    }
}

/// Release `count` units, waking waiters that can now proceed.
pub fn release(id: usize, count: i64) {
    let to_wake: Vec<ThreadId> = {
        let mut sems = SEMAPHORES.lock();
        match sems.get_mut(&id) {
            Some(sem) => {
                sem.count += count;
                core::mem::take(&mut sem.waiting)
            }
            None => return,
        }
    };
    for tid in to_wake {
        super::wake_thread(tid);
    }
}
