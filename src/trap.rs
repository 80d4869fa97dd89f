//! Trap service routines.
//!
//! The CPU does not define what trap vectors do; it routes every TRAP
//! instruction to a [`TrapHandler`] with full access to registers and
//! memory. [`ConsoleTraps`] implements the standard LC-3 vectors over any
//! reader/writer pair, and closures with the right signature can serve as
//! ad-hoc handlers in test harnesses.
//!
//! Trap routines never touch COND.

use crate::cpu::registers::{Reg, Registers};
use crate::cpu::Memory;
use std::io::{self, Read, Write};
use thiserror::Error;

/// Read a single character into R0.
pub const GETC: u8 = 0x20;
/// Write the character in R0.
pub const OUT: u8 = 0x21;
/// Write the zero-terminated string at mem[R0], one character per word.
pub const PUTS: u8 = 0x22;
/// Prompt for a character, echo it, and store it in R0.
pub const IN: u8 = 0x23;
/// Write the zero-terminated packed string at mem[R0], two characters per word.
pub const PUTSP: u8 = 0x24;
/// Halt the machine.
pub const HALT: u8 = 0x25;

/// What the machine should do after a trap service returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    /// Resume execution at the current PC.
    Continue,
    /// Stop the machine.
    Halt,
}

/// Errors raised by trap service routines.
#[derive(Debug, Clone, Error)]
pub enum TrapError {
    #[error("unknown trap vector x{0:02X}")]
    UnknownVector(u8),

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<io::Error> for TrapError {
    fn from(err: io::Error) -> Self {
        TrapError::Io(err.to_string())
    }
}

/// The service-routine hook invoked for every TRAP instruction.
pub trait TrapHandler {
    /// Service the given 8-bit trap vector.
    fn handle(
        &mut self,
        vector: u8,
        regs: &mut Registers,
        mem: &mut Memory,
    ) -> Result<Control, TrapError>;
}

impl<F> TrapHandler for F
where
    F: FnMut(u8, &mut Registers, &mut Memory) -> Result<Control, TrapError>,
{
    fn handle(
        &mut self,
        vector: u8,
        regs: &mut Registers,
        mem: &mut Memory,
    ) -> Result<Control, TrapError> {
        self(vector, regs, mem)
    }
}

/// A handler that ignores every vector and never halts.
///
/// Useful for harnesses that exercise pure ISA programs.
#[derive(Debug, Clone, Copy, Default)]
pub struct NopTraps;

impl TrapHandler for NopTraps {
    fn handle(&mut self, _: u8, _: &mut Registers, _: &mut Memory) -> Result<Control, TrapError> {
        Ok(Control::Continue)
    }
}

/// The standard LC-3 console trap services over a reader/writer pair.
#[derive(Debug, Clone)]
pub struct ConsoleTraps<R, W> {
    input: R,
    output: W,
}

impl ConsoleTraps<io::Stdin, io::Stdout> {
    /// Console traps wired to the process's stdin/stdout.
    pub fn stdio() -> Self {
        Self::new(io::stdin(), io::stdout())
    }
}

impl<R: Read, W: Write> ConsoleTraps<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn read_char(&mut self) -> Result<u16, TrapError> {
        let mut buf = [0u8; 1];
        self.input.read_exact(&mut buf)?;
        Ok(buf[0] as u16)
    }

    fn put_char(&mut self, c: u16) -> Result<(), TrapError> {
        self.output.write_all(&[c as u8])?;
        Ok(())
    }
}

impl<R: Read, W: Write> TrapHandler for ConsoleTraps<R, W> {
    fn handle(
        &mut self,
        vector: u8,
        regs: &mut Registers,
        mem: &mut Memory,
    ) -> Result<Control, TrapError> {
        match vector {
            GETC => {
                let c = self.read_char()?;
                regs.write(Reg::R0, c);
            }

            OUT => {
                self.put_char(regs.read(Reg::R0))?;
                self.output.flush()?;
            }

            PUTS => {
                let mut addr = regs.read(Reg::R0);
                loop {
                    let word = mem.read(addr);
                    if word == 0 {
                        break;
                    }
                    self.put_char(word)?;
                    addr = addr.wrapping_add(1);
                }
                self.output.flush()?;
            }

            IN => {
                self.output.write_all(b"Enter a character: ")?;
                self.output.flush()?;
                let c = self.read_char()?;
                self.put_char(c)?;
                self.output.flush()?;
                regs.write(Reg::R0, c);
            }

            PUTSP => {
                // Two characters per word, low byte first; a zero byte or
                // a zero word ends the string
                let mut addr = regs.read(Reg::R0);
                loop {
                    let word = mem.read(addr);
                    let low = word & 0xFF;
                    if low == 0 {
                        break;
                    }
                    self.put_char(low)?;
                    let high = word >> 8;
                    if high == 0 {
                        break;
                    }
                    self.put_char(high)?;
                    addr = addr.wrapping_add(1);
                }
                self.output.flush()?;
            }

            HALT => {
                self.output.write_all(b"HALT\n")?;
                self.output.flush()?;
                return Ok(Control::Halt);
            }

            v => return Err(TrapError::UnknownVector(v)),
        }

        Ok(Control::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn console(input: &[u8]) -> ConsoleTraps<Cursor<Vec<u8>>, Vec<u8>> {
        ConsoleTraps::new(Cursor::new(input.to_vec()), Vec::new())
    }

    #[test]
    fn test_getc_reads_without_echo() {
        let mut traps = console(b"A");
        let mut regs = Registers::new();
        let mut mem = Memory::new();

        let control = traps.handle(GETC, &mut regs, &mut mem).unwrap();

        assert_eq!(control, Control::Continue);
        assert_eq!(regs.read(Reg::R0), b'A' as u16);
        assert!(traps.output.is_empty());
    }

    #[test]
    fn test_out_writes_low_byte() {
        let mut traps = console(b"");
        let mut regs = Registers::new();
        let mut mem = Memory::new();
        regs.write(Reg::R0, 0xFF00 | b'x' as u16);

        traps.handle(OUT, &mut regs, &mut mem).unwrap();

        assert_eq!(traps.output, b"x");
    }

    #[test]
    fn test_puts() {
        let mut traps = console(b"");
        let mut regs = Registers::new();
        let mut mem = Memory::new();

        for (i, c) in "Hello".bytes().enumerate() {
            mem.write(0x4000 + i as u16, c as u16);
        }
        regs.write(Reg::R0, 0x4000);

        traps.handle(PUTS, &mut regs, &mut mem).unwrap();

        assert_eq!(traps.output, b"Hello");
    }

    #[test]
    fn test_in_prompts_and_echoes() {
        let mut traps = console(b"q");
        let mut regs = Registers::new();
        let mut mem = Memory::new();

        traps.handle(IN, &mut regs, &mut mem).unwrap();

        assert_eq!(traps.output, b"Enter a character: q");
        assert_eq!(regs.read(Reg::R0), b'q' as u16);
    }

    #[test]
    fn test_putsp_packed_string() {
        let mut traps = console(b"");
        let mut regs = Registers::new();
        let mut mem = Memory::new();

        // "Hi!" packed two characters per word, zero high byte ends it
        mem.write(0x4000, (b'i' as u16) << 8 | b'H' as u16);
        mem.write(0x4001, b'!' as u16);
        regs.write(Reg::R0, 0x4000);

        traps.handle(PUTSP, &mut regs, &mut mem).unwrap();

        assert_eq!(traps.output, b"Hi!");
    }

    #[test]
    fn test_halt() {
        let mut traps = console(b"");
        let mut regs = Registers::new();
        let mut mem = Memory::new();

        let control = traps.handle(HALT, &mut regs, &mut mem).unwrap();

        assert_eq!(control, Control::Halt);
        assert_eq!(traps.output, b"HALT\n");
    }

    #[test]
    fn test_unknown_vector() {
        let mut traps = console(b"");
        let mut regs = Registers::new();
        let mut mem = Memory::new();

        let err = traps.handle(0x7F, &mut regs, &mut mem).unwrap_err();
        assert!(matches!(err, TrapError::UnknownVector(0x7F)));
    }

    #[test]
    fn test_traps_leave_cond_alone() {
        let mut traps = console(b"A");
        let mut regs = Registers::new();
        let mut mem = Memory::new();
        regs.write(Reg::R1, 1);
        regs.set_cond_from(Reg::R1);

        traps.handle(GETC, &mut regs, &mut mem).unwrap();

        assert_eq!(regs.cond(), crate::cpu::registers::CondFlag::Pos.bits());
    }
}
