/*
 * Debugging and Logging Utilities
 *
 * This module contains utilities for debugging and logging,
 * providing structured logging and debug output capabilities.
 */

pub mod irq_log;
pub mod log_buffer;
pub mod logger;
pub mod ring_buffer;

/// Initialize debug infrastructure (COM2 port and buffered log ring)
pub fn init_debug_infrastructure() {
    // Initialize COM2 port for debug/logging output
    crate::drivers::serial::init_debug_port();
    log_buffer::init();
}
