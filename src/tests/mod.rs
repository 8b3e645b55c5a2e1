/*
 * Scheduler Test Suite
 *
 * Plain functions that exercise the scheduler core and process-group
 * machinery against a live booted kernel. There is no hosted test harness
 * in a no_std binary, so each test returns a bool (or is gathered into a
 * (passed, failed) tally by its suite's `run_all_*` entry point) rather than
 * using `#[test]`; a failed assertion logs and returns false instead of
 * panicking, so one bad test doesn't take the rest of the suite down with
 * it.
 */

pub mod process_groups;
pub mod scheduler_core;

/// Run every test suite in this module and report the combined tally.
pub fn run_all() -> (usize, usize) {
    let (mut passed, mut failed) = scheduler_core::run_all_scheduler_core_tests();
    let (p2, f2) = process_groups::run_all_process_group_tests();
    passed += p2;
    failed += f2;

    log::info!("scheduler test suite: {} passed, {} failed", passed, failed);
    (passed, failed)
}
