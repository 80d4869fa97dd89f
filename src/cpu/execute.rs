//! CPU execution engine for the LC-3.
//!
//! Implements the fetch-decode-execute cycle and all instruction behaviors.
//!
//! The PC is incremented at fetch time, before the instruction executes:
//! PC-relative operands are relative to the *following* instruction, and
//! JSR links the incremented PC into R7. [`Cpu::execute`] therefore assumes
//! the PC has already advanced past the word it is given.

use crate::cpu::{Memory, Registers};
use crate::cpu::decode::{self, Instruction, Opcode, Src2};
use crate::cpu::memory::MemoryError;
use crate::cpu::registers::Reg;
use crate::trap::{Control, TrapError, TrapHandler};
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// CPU execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpuState {
    /// CPU is running normally.
    Running,
    /// CPU has halted (trap service signalled halt).
    Halted,
    /// CPU faulted; no further instruction executes.
    Error,
}

/// The LC-3 CPU.
///
/// Owns the architectural state exclusively, so multiple machines can
/// coexist and be tested in isolation. The trap handler is the hook for
/// service routines (console I/O, halt); see [`crate::trap`].
#[derive(Clone)]
pub struct Cpu<T> {
    /// CPU registers.
    pub regs: Registers,
    /// Main memory.
    pub mem: Memory,
    /// Current execution state.
    pub state: CpuState,
    /// Instruction count (for profiling and step limits).
    pub cycles: u64,
    /// Trap service handler.
    traps: T,
    /// Last executed instruction (for debugging).
    last_instr: Option<Instruction>,
}

impl<T: TrapHandler> Cpu<T> {
    /// Create a new CPU with zeroed state and the given trap handler.
    pub fn new(traps: T) -> Self {
        Self {
            regs: Registers::new(),
            mem: Memory::new(),
            state: CpuState::Running,
            cycles: 0,
            traps,
            last_instr: None,
        }
    }

    /// Reset the CPU to initial state.
    pub fn reset(&mut self) {
        self.regs.reset();
        self.mem.clear();
        self.state = CpuState::Running;
        self.cycles = 0;
        self.last_instr = None;
    }

    /// Load a program image and point the PC at its origin.
    pub fn load_image(&mut self, origin: u16, words: &[u16]) -> Result<(), MemoryError> {
        self.mem.load_image(origin, words)?;
        self.regs.jump(origin);
        Ok(())
    }

    /// Fetch and execute a single instruction.
    ///
    /// Returns the instruction that was executed, or the fault that
    /// stopped the machine.
    pub fn step(&mut self) -> Result<Instruction, CpuError> {
        if self.state != CpuState::Running {
            return Err(CpuError::NotRunning(self.state));
        }

        // Fetch, then advance the PC past the instruction word
        let word = self.mem.read(self.regs.pc());
        self.regs.advance_pc();

        let instr = self.execute(word)?;

        self.cycles += 1;
        self.last_instr = Some(instr);

        Ok(instr)
    }

    /// Run until the CPU leaves the running state.
    ///
    /// Returns the number of instructions executed. A program that never
    /// halts never returns; see [`Cpu::run_limited`].
    pub fn run(&mut self) -> Result<u64, CpuError> {
        let start_cycles = self.cycles;

        while self.state == CpuState::Running {
            self.step()?;
        }

        Ok(self.cycles - start_cycles)
    }

    /// Run for at most `max_cycles` instructions.
    pub fn run_limited(&mut self, max_cycles: u64) -> Result<u64, CpuError> {
        let start_cycles = self.cycles;
        let limit = self.cycles + max_cycles;

        while self.state == CpuState::Running && self.cycles < limit {
            self.step()?;
        }

        Ok(self.cycles - start_cycles)
    }

    /// Decode and execute one instruction word.
    ///
    /// The PC must already point past the word (as [`Cpu::step`] arranges);
    /// harnesses stepping the machine by hand set it up the same way.
    /// On a fault the CPU moves to the error state with no register or
    /// memory cell mutated by the faulting instruction.
    pub fn execute(&mut self, word: u16) -> Result<Instruction, CpuError> {
        let instr = decode::decode(word);

        if let Err(fault) = self.apply(instr) {
            self.state = CpuState::Error;
            return Err(fault);
        }

        Ok(instr)
    }

    /// Apply a decoded instruction to the architectural state.
    fn apply(&mut self, instr: Instruction) -> Result<(), CpuError> {
        match instr {
            Instruction::Br { mask, offset } => {
                if mask & self.regs.cond() != 0 {
                    let target = self.regs.pc().wrapping_add(offset);
                    self.regs.jump(target);
                }
            }

            Instruction::Add { dr, sr1, src2 } => {
                let result = self.regs.read(sr1).wrapping_add(self.read_src2(src2));
                self.regs.write(dr, result);
                self.regs.set_cond_from(dr);
            }

            Instruction::And { dr, sr1, src2 } => {
                let result = self.regs.read(sr1) & self.read_src2(src2);
                self.regs.write(dr, result);
                self.regs.set_cond_from(dr);
            }

            Instruction::Not { dr, sr } => {
                let result = !self.regs.read(sr);
                self.regs.write(dr, result);
                self.regs.set_cond_from(dr);
            }

            Instruction::Ld { dr, offset } => {
                let addr = self.regs.pc().wrapping_add(offset);
                let value = self.mem.read(addr);
                self.regs.write(dr, value);
                self.regs.set_cond_from(dr);
            }

            Instruction::Ldi { dr, offset } => {
                let addr = self.regs.pc().wrapping_add(offset);
                let value = self.mem.read(self.mem.read(addr));
                self.regs.write(dr, value);
                self.regs.set_cond_from(dr);
            }

            Instruction::Ldr { dr, base, offset } => {
                let addr = self.regs.read(base).wrapping_add(offset);
                let value = self.mem.read(addr);
                self.regs.write(dr, value);
                self.regs.set_cond_from(dr);
            }

            Instruction::Lea { dr, offset } => {
                let addr = self.regs.pc().wrapping_add(offset);
                self.regs.write(dr, addr);
                self.regs.set_cond_from(dr);
            }

            Instruction::St { sr, offset } => {
                let addr = self.regs.pc().wrapping_add(offset);
                self.mem.write(addr, self.regs.read(sr));
            }

            Instruction::Sti { sr, offset } => {
                let addr = self.regs.pc().wrapping_add(offset);
                let target = self.mem.read(addr);
                self.mem.write(target, self.regs.read(sr));
            }

            Instruction::Str { sr, base, offset } => {
                let addr = self.regs.read(base).wrapping_add(offset);
                self.mem.write(addr, self.regs.read(sr));
            }

            Instruction::Jmp { base } => {
                let target = self.regs.read(base);
                self.regs.jump(target);
            }

            Instruction::Jsr { offset } => {
                let ret = self.regs.pc();
                self.regs.write(Reg::R7, ret);
                self.regs.jump(ret.wrapping_add(offset));
            }

            Instruction::Jsrr { base } => {
                // Read the base first: R7 may itself be the base register
                let target = self.regs.read(base);
                self.regs.write(Reg::R7, self.regs.pc());
                self.regs.jump(target);
            }

            Instruction::Rti => return Err(CpuError::Unimplemented(Opcode::Rti)),

            Instruction::Reserved => return Err(CpuError::Unimplemented(Opcode::Res)),

            Instruction::Trap { vector } => {
                let control = self.traps.handle(vector, &mut self.regs, &mut self.mem)?;
                if control == Control::Halt {
                    self.state = CpuState::Halted;
                }
            }
        }

        Ok(())
    }

    /// Resolve the second source operand of ADD/AND.
    fn read_src2(&self, src2: Src2) -> u16 {
        match src2 {
            Src2::Reg(r) => self.regs.read(r),
            Src2::Imm(imm) => imm,
        }
    }

    /// Get the last executed instruction.
    pub fn last_instruction(&self) -> Option<Instruction> {
        self.last_instr
    }

    /// Check if the CPU has halted.
    pub fn is_halted(&self) -> bool {
        self.state == CpuState::Halted
    }

    /// Check if the CPU is running.
    pub fn is_running(&self) -> bool {
        self.state == CpuState::Running
    }
}

impl<T> std::fmt::Debug for Cpu<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cpu")
            .field("state", &self.state)
            .field("cycles", &self.cycles)
            .field("regs", &self.regs)
            .finish()
    }
}

/// Errors that can occur during CPU execution.
#[derive(Debug, Clone, Error)]
pub enum CpuError {
    #[error("CPU not running: {0:?}")]
    NotRunning(CpuState),

    #[error("{0:?} has no user-mode semantics")]
    Unimplemented(Opcode),

    #[error("trap service error: {0}")]
    Trap(#[from] TrapError),

    #[error("memory error: {0}")]
    Memory(#[from] MemoryError),
}
