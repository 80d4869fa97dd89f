//! LC-3 CPU registers.
//!
//! The LC-3 has 10 registers:
//! - R0-R7: 16-bit general-purpose registers
//! - PC: 16-bit program counter
//! - COND: condition-flags register, holding exactly one of P/Z/N

use serde::{Serialize, Deserialize};

/// Register identifiers.
///
/// Operand fields name only R0-R7; PC and COND are reached by the
/// execution engine and by trap routines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Reg {
    R0 = 0,
    R1 = 1,
    R2 = 2,
    R3 = 3,
    R4 = 4,
    R5 = 5,
    R6 = 6,
    R7 = 7,
    /// Program counter.
    Pc = 8,
    /// Condition flags.
    Cond = 9,
}

impl Reg {
    /// All register identifiers in order: R0-R7, PC, COND.
    pub const ALL: [Reg; 10] = [
        Reg::R0, Reg::R1, Reg::R2, Reg::R3, Reg::R4, Reg::R5, Reg::R6, Reg::R7,
        Reg::Pc, Reg::Cond,
    ];

    /// Create a general-purpose register from a 3-bit operand field.
    ///
    /// Only the low 3 bits are considered, so every field value maps to
    /// a valid register.
    #[inline]
    pub fn gp(bits: u16) -> Self {
        match bits & 0x7 {
            0 => Reg::R0,
            1 => Reg::R1,
            2 => Reg::R2,
            3 => Reg::R3,
            4 => Reg::R4,
            5 => Reg::R5,
            6 => Reg::R6,
            7 => Reg::R7,
            _ => unreachable!(),
        }
    }
}

impl std::fmt::Display for Reg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Reg::Pc => write!(f, "PC"),
            Reg::Cond => write!(f, "COND"),
            gp => write!(f, "R{}", *gp as u8),
        }
    }
}

/// Condition flags.
///
/// COND holds exactly one of these after any flag-setting instruction.
/// BR tests its 3-bit mask against the stored bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u16)]
pub enum CondFlag {
    /// Positive (non-zero, bit 15 clear).
    Pos = 1 << 0,
    /// Zero.
    Zro = 1 << 1,
    /// Negative (bit 15 set).
    Neg = 1 << 2,
}

impl CondFlag {
    /// Classify a register value: zero, negative (bit 15 set), or positive.
    #[inline]
    pub fn of(value: u16) -> Self {
        if value == 0 {
            CondFlag::Zro
        } else if value >> 15 == 1 {
            CondFlag::Neg
        } else {
            CondFlag::Pos
        }
    }

    /// The flag's bit within COND.
    #[inline]
    pub const fn bits(self) -> u16 {
        self as u16
    }
}

/// The LC-3 register file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    gp: [u16; 8],
    pc: u16,
    cond: u16,
}

impl Registers {
    /// Create a new register file with all values zeroed.
    ///
    /// The loader is expected to set PC to the program's entry address.
    pub fn new() -> Self {
        Self {
            gp: [0; 8],
            pc: 0,
            cond: 0,
        }
    }

    /// Reset all registers to zero.
    pub fn reset(&mut self) {
        self.gp = [0; 8];
        self.pc = 0;
        self.cond = 0;
    }

    /// Read a register.
    #[inline]
    pub fn read(&self, reg: Reg) -> u16 {
        match reg {
            Reg::Pc => self.pc,
            Reg::Cond => self.cond,
            gp => self.gp[gp as usize],
        }
    }

    /// Write a register.
    #[inline]
    pub fn write(&mut self, reg: Reg, value: u16) {
        match reg {
            Reg::Pc => self.pc = value,
            Reg::Cond => self.cond = value,
            gp => self.gp[gp as usize] = value,
        }
    }

    /// The current program counter.
    #[inline]
    pub fn pc(&self) -> u16 {
        self.pc
    }

    /// The raw condition-flag bits.
    #[inline]
    pub fn cond(&self) -> u16 {
        self.cond
    }

    /// Increment the program counter by 1, wrapping at the 16-bit boundary.
    /// Returns the old value.
    pub fn advance_pc(&mut self) -> u16 {
        let old = self.pc;
        self.pc = self.pc.wrapping_add(1);
        old
    }

    /// Set the program counter to an absolute address.
    #[inline]
    pub fn jump(&mut self, addr: u16) {
        self.pc = addr;
    }

    /// Set COND from a register's current value.
    pub fn set_cond_from(&mut self, reg: Reg) {
        self.cond = CondFlag::of(self.read(reg)).bits();
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_read_write_roundtrip() {
        let mut regs = Registers::new();

        for reg in Reg::ALL {
            regs.write(reg, 0xBEEF);
            assert_eq!(regs.read(reg), 0xBEEF);
        }
    }

    #[test]
    fn test_gp_field_mapping() {
        assert_eq!(Reg::gp(0), Reg::R0);
        assert_eq!(Reg::gp(7), Reg::R7);
        // Only the low 3 bits of a field are significant
        assert_eq!(Reg::gp(0b1010), Reg::R2);
    }

    #[test]
    fn test_cond_classification() {
        assert_eq!(CondFlag::of(0), CondFlag::Zro);
        assert_eq!(CondFlag::of(1), CondFlag::Pos);
        assert_eq!(CondFlag::of(0x7FFF), CondFlag::Pos);
        assert_eq!(CondFlag::of(0x8000), CondFlag::Neg);
        assert_eq!(CondFlag::of(0xFFFF), CondFlag::Neg);
    }

    #[test]
    fn test_set_cond_from() {
        let mut regs = Registers::new();

        regs.write(Reg::R3, 0xFFFE);
        regs.set_cond_from(Reg::R3);
        assert_eq!(regs.cond(), CondFlag::Neg.bits());

        regs.write(Reg::R3, 0);
        regs.set_cond_from(Reg::R3);
        assert_eq!(regs.cond(), CondFlag::Zro.bits());

        regs.write(Reg::R3, 42);
        regs.set_cond_from(Reg::R3);
        assert_eq!(regs.cond(), CondFlag::Pos.bits());
    }

    #[test]
    fn test_advance_pc() {
        let mut regs = Registers::new();
        regs.jump(0x3000);

        let old = regs.advance_pc();
        assert_eq!(old, 0x3000);
        assert_eq!(regs.pc(), 0x3001);
    }

    #[test]
    fn test_advance_pc_wraps() {
        let mut regs = Registers::new();
        regs.jump(0xFFFF);

        regs.advance_pc();
        assert_eq!(regs.pc(), 0x0000);
    }

    proptest! {
        #[test]
        fn prop_write_read_identity(idx in 0usize..10, value: u16) {
            let mut regs = Registers::new();
            let reg = Reg::ALL[idx];
            regs.write(reg, value);
            prop_assert_eq!(regs.read(reg), value);
        }
    }
}
