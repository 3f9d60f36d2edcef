/*
 * Hardware Abstraction Layer (HAL)
 *
 * Provides the primitives the PE loader is built on:
 * - Register I/O (32-bit and 8-bit device accesses)
 * - Byte-order conversion
 * - Console log backend
 */

#![cfg_attr(not(test), no_std)]
extern crate alloc;

pub mod console;
pub mod endian;
pub mod io;

pub use console::{ConsoleSink, init_console};
pub use io::{Mmio, RegisterIo};
