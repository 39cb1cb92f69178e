//! Crash record parsed out of one gdb transcript.
use std::fmt;

use serde::{Deserialize, Serialize};

/// One stack frame.
#[derive(Serialize, Deserialize, Default, Clone, Debug, PartialEq, Eq)]
pub struct StackEntry {
    /// Function name, may contain spaces (`operator new(unsigned long)`).
    #[serde(rename = "Symbol")]
    pub symbol: String,
    /// Frame address.
    #[serde(rename = "Address")]
    pub address: u64,
    /// Path to the binary module containing the frame.
    #[serde(rename = "Module")]
    pub module: String,
}

/// Register value at the time of fault.
#[derive(Serialize, Deserialize, Default, Clone, Debug, PartialEq, Eq)]
pub struct Register {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Value")]
    pub value: u64,
}

/// Disassembled instruction.
#[derive(Serialize, Deserialize, Default, Clone, Debug, PartialEq, Eq)]
pub struct Instruction {
    #[serde(rename = "Address")]
    pub address: u64,
    /// Mnemonic and operands.
    #[serde(rename = "Text")]
    pub text: String,
}

/// Represents everything gdb and the exploitable extension reported about a crash.
#[derive(Serialize, Deserialize, Default, Clone, Debug, PartialEq, Eq)]
pub struct CrashRecord {
    /// Frame blamed for the fault by the classifier.
    #[serde(rename = "FaultingFrame")]
    pub faulting_frame: StackEntry,
    /// Innermost frame first.
    #[serde(rename = "Stack")]
    #[serde(default)]
    pub stack: Vec<StackEntry>,
    /// Registers in gdb print order.
    #[serde(rename = "Registers")]
    #[serde(default)]
    pub registers: Vec<Register>,
    /// Instruction at the program counter, if gdb marked one.
    #[serde(rename = "FaultingInstruction")]
    #[serde(default)]
    pub faulting_instruction: Option<Instruction>,
    /// Nearby code in increasing address order, faulting instruction included.
    #[serde(rename = "Disassembly")]
    #[serde(default)]
    pub disassembly: Vec<Instruction>,
    /// Crash signature.
    #[serde(rename = "Hash")]
    pub hash: String,
    /// Exploitability bucket.
    #[serde(rename = "Classification")]
    pub classification: String,
    /// Description, short description and explanation lines as printed.
    #[serde(rename = "Extra")]
    #[serde(default)]
    pub extra: Vec<String>,
}

impl fmt::Display for StackEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} at {:#x} in {}", self.symbol, self.address, self.module)
    }
}

impl fmt::Display for CrashRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut report = String::new();
        report += &format!("Classification: {}\n", self.classification);
        report += &format!("Hash: {}\n", self.hash);
        report += &format!("Faulting frame: {}\n", self.faulting_frame);
        for line in &self.extra {
            report += &format!("{line}\n");
        }

        if !self.stack.is_empty() {
            report += "\n===Stacktrace===\n";
            for (i, entry) in self.stack.iter().enumerate() {
                report += &format!("#{i:<3} {entry}\n");
            }
        }

        if !self.registers.is_empty() {
            report += "\n===Registers===\n";
            for register in &self.registers {
                report += &format!("{:<15}{:#x}\n", register.name, register.value);
            }
        }

        if !self.disassembly.is_empty() {
            report += "\n===Disassembly===\n";
            for insn in &self.disassembly {
                let marker = match self.faulting_instruction {
                    Some(ref fault) if fault.address == insn.address => "=>",
                    _ => "  ",
                };
                report += &format!("{marker} {:#018x}: {}\n", insn.address, insn.text);
            }
        }

        write!(f, "{}", report.trim_end())
    }
}
