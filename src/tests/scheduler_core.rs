/*
 * Scheduler Core Tests
 *
 * Exercises the run-queue/dispatch mechanism and the thread lifecycle
 * (spawn, priority change, signal-driven suspend/resume) from kernel mode
 * against a live booted scheduler. These assume SchedulerManager::init()
 * has already run; they are not a hosted unit-test harness (no_std has
 * none), so they follow the same pass/fail-by-return-value shape as the
 * rest of this module.
 */

use crate::scheduler::{
    self, Priority, ProcessType, ThreadId, ThreadManager, ThreadState,
    signals::{self, SignalFlags, SIGCONT, SIGSTOP},
};

fn noop_thread_main() {
    loop {
        scheduler::yield_now();
    }
}

/// No tid appears twice in the live thread table.
pub fn test_no_duplicate_thread_ids() -> bool {
    log::info!("TEST: thread table has no duplicate ids");

    let a = ThreadManager::spawn(noop_thread_main, "dup_check_a");
    let b = ThreadManager::spawn(noop_thread_main, "dup_check_b");

    let ok = scheduler::thread_id_occurrences(a) == 1
        && scheduler::thread_id_occurrences(b) == 1
        && a != b;
    if ok {
        log::info!("  PASS: {:?} and {:?} each appear exactly once", a, b);
    } else {
        log::error!("  FAIL: duplicate or colliding thread ids ({:?}, {:?})", a, b);
    }
    ok
}

/// A freshly spawned thread starts life Ready, in exactly one priority
/// bucket (its own).
pub fn test_new_thread_is_ready_in_one_bucket() -> bool {
    log::info!("TEST: new thread starts Ready in a single priority bucket");

    let tid = ThreadManager::spawn(noop_thread_main, "ready_check");
    let snapshot = scheduler::thread_snapshot(tid);

    let ok = matches!(snapshot, Some((ThreadState::Ready, _, 1)));
    if ok {
        log::info!("  PASS: {:?} is Ready and queued in exactly one bucket", tid);
    } else {
        log::error!("  FAIL: {:?} snapshot={:?}", tid, snapshot);
    }
    ok
}

/// SIGSTOP pulls a Ready thread out of every run-queue bucket; SIGCONT
/// puts it back in exactly one (its own).
pub fn test_sigstop_removes_from_ready_queue() -> bool {
    log::info!("TEST: SIGSTOP empties the run queue, SIGCONT restores it");

    let tid = ThreadManager::spawn(noop_thread_main, "stop_cont_check");

    signals::send_signal(tid, SIGSTOP, SignalFlags::empty());
    let stopped = scheduler::thread_snapshot(tid);
    let stopped_ok = matches!(stopped, Some((ThreadState::Suspended, _, 0)));

    signals::send_signal(tid, SIGCONT, SignalFlags::empty());
    let resumed = scheduler::thread_snapshot(tid);
    let resumed_ok = matches!(resumed, Some((ThreadState::Ready, _, 1)));

    let ok = stopped_ok && resumed_ok;
    if ok {
        log::info!("  PASS: {:?} left and rejoined its bucket across STOP/CONT", tid);
    } else {
        log::error!(
            "  FAIL: {:?} after STOP={:?} after CONT={:?}",
            tid, stopped, resumed
        );
    }
    ok
}

/// Priority class constants are ordered the way the dispatcher assumes:
/// idle < normal user < system < boot-critical < real-time.
pub fn test_priority_ordering() -> bool {
    log::info!("TEST: ProcessType priority classes are strictly ordered");

    let ok = Priority::MIN < ProcessType::User.priority()
        && ProcessType::User.priority() < ProcessType::System.priority()
        && ProcessType::System.priority() < ProcessType::Critical.priority()
        && ProcessType::Critical.priority() < Priority::MIN_RT;

    if ok {
        log::info!("  PASS: idle < user < system < critical < realtime");
    } else {
        log::error!("  FAIL: priority class ordering violated");
    }
    ok
}

/// A thread moved to a new priority bucket via `ThreadManager::set_priority`
/// is found in that bucket, and only that bucket.
pub fn test_priority_change_moves_bucket() -> bool {
    log::info!("TEST: changing priority moves the thread to its new bucket");

    let tid = ThreadManager::spawn(noop_thread_main, "priority_move_check");
    let target = Priority::SYSTEM;

    let changed = ThreadManager::set_priority(tid, target);
    let snapshot = scheduler::thread_snapshot(tid);

    let ok = changed && matches!(snapshot, Some((_, p, 1)) if p == target);
    if ok {
        log::info!("  PASS: {:?} now at priority {:?}, one bucket", tid, target);
    } else {
        log::error!("  FAIL: changed={} {:?} snapshot={:?}", changed, tid, snapshot);
    }
    ok
}

/// A process's thread-list length always matches the number of threads
/// actually spawned into it.
pub fn test_process_thread_count_matches_list() -> bool {
    log::info!("TEST: process.threads.len() matches spawned thread count");

    let pid = scheduler::spawn_kernel_process("count_check", ProcessType::System);
    let t1 = scheduler::spawn_thread_in_process(noop_thread_main, "count_check_t1", pid);
    let t2 = scheduler::spawn_thread_in_process(noop_thread_main, "count_check_t2", pid);

    let ok = scheduler::with_process_mut(pid, |p| {
        p.threads.len() == 2 && p.threads.contains(&t1) && p.threads.contains(&t2)
    })
    .unwrap_or(false);

    if ok {
        log::info!("  PASS: process {:?} lists both spawned threads", pid);
    } else {
        log::error!("  FAIL: process {:?} thread list mismatch", pid);
    }
    ok
}

/// Run every test in this file and report a (passed, failed) tally, in the
/// same style as the rest of this module's suites.
pub fn run_all_scheduler_core_tests() -> (usize, usize) {
    let mut passed = 0;
    let mut failed = 0;

    let results = [
        test_no_duplicate_thread_ids(),
        test_new_thread_is_ready_in_one_bucket(),
        test_sigstop_removes_from_ready_queue(),
        test_priority_ordering(),
        test_priority_change_moves_bucket(),
        test_process_thread_count_matches_list(),
    ];

    for r in results {
        if r {
            passed += 1;
        } else {
            failed += 1;
        }
    }

    log::info!("scheduler_core tests: {} passed, {} failed", passed, failed);
    (passed, failed)
}
