/*
 * Kernel Components
 *
 * Higher-level subsystems built on top of the driver and I/O layers.
 */

pub mod tty;
