/*
 * Priority/Real-Time Scheduling Policy
 *
 * This is the default policy for CLUU: 64 priority buckets, scanned
 * highest-first. Real-time buckets (32-63) are strict FIFO and are never
 * skipped. Regular buckets (1-31) are subject to a probabilistic
 * anti-starvation skip so that a steady stream of high-priority work cannot
 * starve everything below it forever; bucket 0 is the guaranteed fallback
 * and is never skipped.
 *
 * This policy keeps no ready-queue state of its own - the bucketed queues
 * live on the mechanism side (scheduler::Scheduler)
 * because thread_created/thread_woke/thread_exited already need to touch
 * them there to keep Thread.state consistent. The policy's pick_next just
 * asks the mechanism, via KernelSchedCtx::dispatch_next, to run its scan.
 */

use super::super::{
    SchedulerMode, ThreadId,
    events::SchedEvent,
    traits::{KernelSchedCtx, Scheduler},
    types::{CpuId, DispatchDecision, TimeSliceTicks},
};

/// Priority-bucketed, real-time-aware scheduling policy.
pub struct PriorityRtPolicy {
    mode: SchedulerMode,
}

impl PriorityRtPolicy {
    pub fn new() -> Self {
        Self {
            mode: SchedulerMode::Boot {
                critical_count: 0,
                ready_count: 0,
            },
        }
    }
}

impl Scheduler for PriorityRtPolicy {
    fn on_event(&mut self, _ctx: &mut dyn KernelSchedCtx, event: SchedEvent) {
        // Ready-queue membership is maintained by the mechanism itself
        // (Scheduler::create_thread/make_ready/remove_from_ready/set_thread_priority),
        // since it already owns the bucket arrays. This policy only tracks
        // the state it needs for its own dispatch decisions: the current mode.
        if let SchedEvent::ModeChanged { new_mode, .. } = event {
            self.mode = new_mode;
        }
    }

    fn pick_next(&mut self, ctx: &mut dyn KernelSchedCtx, _cpu: CpuId) -> DispatchDecision {
        match ctx.dispatch_next() {
            Some(tid) => {
                let slice = if ctx
                    .thread_priority(tid)
                    .map(|p| p.is_realtime())
                    .unwrap_or(false)
                {
                    TimeSliceTicks::LONG
                } else {
                    TimeSliceTicks::DEFAULT
                };
                DispatchDecision::run_thread(tid, slice)
            }
            None => DispatchDecision::idle(),
        }
    }

    fn on_switched(
        &mut self,
        _ctx: &mut dyn KernelSchedCtx,
        _cpu: CpuId,
        _prev: Option<ThreadId>,
        _next: Option<ThreadId>,
    ) {
        // Run-queue bookkeeping (re-enqueue of `prev`, removal of `next`
        // from its bucket) happens in the mechanism's get_next_thread/
        // scan_bucket, not here.
    }

    fn name(&self) -> &'static str {
        "Priority-RT"
    }
}

impl Default for PriorityRtPolicy {
    fn default() -> Self {
        Self::new()
    }
}
