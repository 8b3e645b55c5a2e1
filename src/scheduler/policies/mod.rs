/*
 * Scheduling Policies Module
 *
 * This module contains different scheduling policy implementations.
 * Each policy implements the Scheduler trait and can be plugged into
 * the SchedulerCore at boot time.
 *
 * Available policies:
 * - PriorityRt: 64-bucket priority scheduler with a real-time range (default)
 * - (Future) Mlfq: Multi-level feedback queue
 * - (Future) Cfs: Completely Fair Scheduler (like Linux)
 */

pub mod priority_rt;

pub use priority_rt::PriorityRtPolicy;
