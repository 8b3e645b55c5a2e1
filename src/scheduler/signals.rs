/*
 * Signals (scheduling interaction)
 *
 * Only the scheduling-visible surface lives here: a per-thread pending
 * bitmask, a blocked mask, and the three effects the dispatcher path must
 * honor - STOP, CONT, KILLTHR. Real signal handler dispatch into userspace
 * is out of scope; everything else is recorded in the pending mask for a
 * future handler layer to consume.
 *
 * `handle_signals` is the kernel-exit hook: called after a syscall returns
 * and at the tail of the naked-asm interrupt handlers (see mod.rs), it
 * applies STOP/CONT/KILLTHR to the current thread and reports whether the
 * dispatcher should be invoked.
 */

use super::{ThreadId, ThreadState};

pub type Signal = u32;

pub const SIGHUP: Signal = 1;
pub const SIGKILLTHR: Signal = 2;
pub const SIGSTOP: Signal = 3;
pub const SIGCONT: Signal = 4;
pub const SIGCHLD: Signal = 5;

bitflags::bitflags! {
    /// Flags accepted by `send_signal`, mirroring the semaphore collaborator's
    /// NO_RESCHED convention (SPEC_FULL.md section 4.2/5): group/session
    /// broadcasts deliver to every member without an intermediate
    /// reschedule, then request one reschedule after the whole enumeration
    /// completes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SignalFlags: u32 {
        const NO_RESCHED = 1 << 0;
    }
}

fn bit(sig: Signal) -> u32 {
    1u32 << (sig & 31)
}

/// Record `sig` as pending on `tid` and apply any scheduling-visible effect.
///
/// Returns `true` if the caller should invoke the dispatcher (skipped when
/// `NO_RESCHED` is set, matching the process-group/session broadcast paths
/// that issue a single reschedule after the whole enumeration completes).
pub fn send_signal(tid: ThreadId, sig: Signal, flags: SignalFlags) -> bool {
    let mut should_resched = false;

    super::with_scheduler_mut(|scheduler| {
        let Some(thread) = scheduler.threads.iter_mut().find(|t| t.id == tid) else {
            return;
        };

        if thread.signals.blocked & bit(sig) != 0 && sig != SIGKILLTHR {
            return;
        }

        thread.signals.pending |= bit(sig);

        match sig {
            SIGSTOP => {
                if matches!(thread.state, ThreadState::Ready | ThreadState::Running) {
                    thread.state = ThreadState::Suspended;
                    should_resched = true;
                }
            }
            SIGCONT => {
                if thread.state == ThreadState::Suspended {
                    thread.state = ThreadState::Ready;
                    should_resched = true;
                }
            }
            SIGKILLTHR => {
                // Staged here; ThreadManager::exit() performs the actual
                // teardown when the target reaches its next kernel boundary.
                should_resched = true;
            }
            _ => {}
        }
    });

    if flags.contains(SignalFlags::NO_RESCHED) {
        should_resched = false;
    }

    if should_resched {
        match sig {
            SIGCONT => {
                super::with_scheduler_mut(|scheduler| {
                    if let Some(thread) = scheduler.threads.iter().find(|t| t.id == tid) {
                        if thread.state == ThreadState::Ready {
                            let bucket = thread.priority.as_usize();
                            if !scheduler.ready_queues[bucket].contains(&tid) {
                                scheduler.ready_queues[bucket].push_back(tid);
                            }
                        }
                    }
                });
            }
            SIGSTOP => {
                super::with_scheduler_mut(|scheduler| scheduler.remove_from_ready(tid));
            }
            _ => {}
        }
    }

    should_resched
}

/// Check whether `sig` is pending and not blocked on `tid`.
pub fn is_pending(tid: ThreadId, sig: Signal) -> bool {
    super::with_scheduler(|scheduler| {
        scheduler
            .threads
            .iter()
            .find(|t| t.id == tid)
            .map(|t| t.signals.pending & bit(sig) != 0 && t.signals.blocked & bit(sig) == 0)
            .unwrap_or(false)
    })
}

/// Kernel-exit hook. Honors a pending KILLTHR by tearing down the calling
/// thread (never returns in that case); otherwise clears STOP/CONT from the
/// pending mask (already applied to `state` by `send_signal`) and reports
/// whether a reschedule was requested.
pub fn handle_signals() -> bool {
    let tid = super::ThreadManager::current_id();
    if tid.0 == 0 {
        return false;
    }

    let killed = is_pending(tid, SIGKILLTHR);
    if killed {
        super::with_scheduler_mut(|scheduler| {
            if let Some(thread) = scheduler.threads.iter_mut().find(|t| t.id == tid) {
                thread.signals.pending &= !bit(SIGKILLTHR);
            }
        });
        super::ThreadManager::exit(-(SIGKILLTHR as i32));
    }

    let mut resched = false;
    super::with_scheduler_mut(|scheduler| {
        if let Some(thread) = scheduler.threads.iter_mut().find(|t| t.id == tid) {
            if thread.signals.pending & (bit(SIGSTOP) | bit(SIGCONT)) != 0 {
                thread.signals.pending &= !(bit(SIGSTOP) | bit(SIGCONT));
                resched = true;
            }
        }
    });
    resched
}
