//! CPU emulation for the LC-3.
//!
//! This module implements the complete LC-3 architecture:
//! - 65536 sixteen-bit memory cells
//! - 10 registers: R0-R7 (general purpose), PC, COND
//! - 16-opcode instruction set with PC-relative, indirect, and
//!   base+offset addressing

pub mod memory;
pub mod registers;
pub mod decode;
pub mod execute;

pub use memory::Memory;
pub use registers::{CondFlag, Reg, Registers};
pub use decode::{Instruction, Opcode};
pub use execute::{Cpu, CpuError, CpuState};
