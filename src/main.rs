//! LC-3 Emulator - CLI Entry Point
//!
//! Commands:
//! - `lc3-emu run <program.obj>` - Run an object image until it halts
//! - `lc3-emu disasm <program.obj>` - Disassemble an object image

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "lc3-emu")]
#[command(version = "0.1.0")]
#[command(about = "An emulator of the LC-3 16-bit teaching architecture")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program until it halts
    Run {
        /// Path to the object image to execute
        program: String,
        /// Maximum number of instructions to run (default: 1000000)
        #[arg(short, long, default_value = "1000000")]
        max_cycles: u64,
        /// Show each instruction as it executes
        #[arg(short, long)]
        trace: bool,
        /// Write registers and memory as JSON after the run
        #[arg(long)]
        dump_state: Option<String>,
    },
    /// Disassemble an object image to readable text
    Disasm {
        /// Path to the object image
        program: String,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { program, max_cycles, trace, dump_state } => {
            run_program(&program, max_cycles, trace, dump_state.as_deref());
        }
        Commands::Disasm { program } => {
            disassemble_file(&program);
        }
    }
}

fn run_program(path: &str, max_cycles: u64, trace: bool, dump_state: Option<&str>) {
    use lc3::{load_obj, ConsoleTraps, Cpu, Reg};

    let obj = match load_obj(path) {
        Ok(obj) => obj,
        Err(e) => {
            eprintln!("❌ Failed to load image: {}", e);
            std::process::exit(1);
        }
    };

    if obj.is_empty() {
        eprintln!("❌ No instructions to execute");
        std::process::exit(1);
    }

    println!("📂 Loaded {} words at x{:04X}", obj.len(), obj.origin);

    let mut cpu = Cpu::new(ConsoleTraps::stdio());
    if let Err(e) = cpu.load_image(obj.origin, &obj.words) {
        eprintln!("❌ Failed to load program: {}", e);
        std::process::exit(1);
    }

    println!();

    // Run with optional trace
    while cpu.is_running() && cpu.cycles < max_cycles {
        let pc = cpu.regs.pc();

        match cpu.step() {
            Ok(instr) => {
                if trace {
                    println!("x{:04X}: {}", pc, instr);
                }
            }
            Err(e) => {
                eprintln!("❌ CPU error at PC=x{:04X}: {}", pc, e);
                std::process::exit(1);
            }
        }
    }

    println!();
    println!("━━━ Result ━━━");
    println!("Cycles: {}", cpu.cycles);
    println!("State: {:?}", cpu.state);
    for i in 0..8 {
        let reg = Reg::gp(i);
        println!("{}: x{:04X}", reg, cpu.regs.read(reg));
    }
    println!("PC: x{:04X}", cpu.regs.pc());
    println!("COND: {:03b}", cpu.regs.cond());

    if cpu.cycles >= max_cycles && cpu.is_running() {
        println!();
        println!("⚠️  Reached max cycles limit ({}). Use --max-cycles to increase.", max_cycles);
    }

    if let Some(out_path) = dump_state {
        if let Err(e) = dump_machine_state(&cpu, out_path) {
            eprintln!("❌ Failed to dump state: {}", e);
            std::process::exit(1);
        }
        println!("✓ State written to {}", out_path);
    }
}

fn dump_machine_state<T>(cpu: &lc3::Cpu<T>, path: &str) -> Result<(), String> {
    use lc3::{Memory, Registers};

    #[derive(serde::Serialize)]
    struct StateDump<'a> {
        registers: &'a Registers,
        memory: &'a Memory,
    }

    let dump = StateDump {
        registers: &cpu.regs,
        memory: &cpu.mem,
    };

    let json = serde_json::to_string_pretty(&dump).map_err(|e| e.to_string())?;
    std::fs::write(path, json).map_err(|e| e.to_string())
}

fn disassemble_file(path: &str) {
    use lc3::cpu::decode::decode;
    use lc3::load_obj;

    let obj = match load_obj(path) {
        Ok(obj) => obj,
        Err(e) => {
            eprintln!("❌ Failed to load image: {}", e);
            std::process::exit(1);
        }
    };

    println!("; {} words, origin x{:04X}", obj.len(), obj.origin);
    println!();

    for (i, &word) in obj.words.iter().enumerate() {
        let addr = obj.origin.wrapping_add(i as u16);
        println!("x{:04X}: {}  ; x{:04X}", addr, decode(word), word);
    }
}
