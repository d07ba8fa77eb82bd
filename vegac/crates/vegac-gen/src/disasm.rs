//! Human-readable artifact dump.
//!
//! Header summary comments, then one line per instruction: a four-digit
//! hexadecimal instruction-pointer prefix, the mnemonic, and operands.

use std::io::{self, Write};

use crate::artifact::{Artifact, MAGIC, VERSION};
use crate::opcode::Opcode;
use crate::pool::string_at;

/// Write the textual disassembly of `artifact` to `w`.
pub fn disassemble(artifact: &Artifact, w: &mut impl Write) -> io::Result<()> {
    writeln!(w, "; magic 0x{:08x}  version {}", MAGIC, VERSION)?;
    writeln!(w, "; constants: {} bytes", artifact.pool.len())?;
    writeln!(w, "; code: {} bytes", artifact.code.len())?;
    writeln!(
        w,
        "; functions: {}  agents: {}",
        artifact.functions.len(),
        artifact.agents.len()
    )?;

    for func in &artifact.functions {
        writeln!(
            w,
            "; fn {} params={} locals={} offset=0x{:04x} length={}",
            string_at(&artifact.pool, func.name_idx).unwrap_or("?"),
            func.param_count,
            func.local_count,
            func.code_offset,
            func.code_length
        )?;
    }
    for agent in &artifact.agents {
        writeln!(
            w,
            "; agent {} model={} tools={} temperature={}",
            string_at(&artifact.pool, agent.name_idx).unwrap_or("?"),
            string_at(&artifact.pool, agent.model_idx).unwrap_or("?"),
            agent.tool_count,
            agent.temperature_x100 as f64 / 100.0
        )?;
    }

    let code = &artifact.code;
    let mut ip = 0usize;
    while ip < code.len() {
        let byte = code[ip];
        let Some(op) = Opcode::from_byte(byte) else {
            writeln!(w, "{:04x}  ??? 0x{:02x}", ip, byte)?;
            ip += 1;
            continue;
        };

        write!(w, "{:04x}  {}", ip, op.mnemonic())?;
        let operands = &code[ip + 1..];
        match op {
            Opcode::PushConst
            | Opcode::LoadGlobal
            | Opcode::StoreGlobal
            | Opcode::CallNative
            | Opcode::CallMethod
            | Opcode::SpawnAgent
            | Opcode::SpawnAsync
            | Opcode::GetField
            | Opcode::ArrayNew => {
                let idx = read_u16(operands);
                write!(w, " {}", idx)?;
                if op == Opcode::CallMethod {
                    write!(w, " {}", operands[2])?;
                }
            }
            Opcode::PushInt => {
                write!(w, " {}", read_i32(operands))?;
            }
            Opcode::LoadLocal | Opcode::StoreLocal | Opcode::Call => {
                write!(w, " {}", operands[0])?;
            }
            Opcode::Jump | Opcode::JumpIf | Opcode::JumpIfNot => {
                write!(w, " {}", read_u16(operands) as i16)?;
            }
            Opcode::SpawnSupervised => {
                let name = read_u16(operands);
                let strategy = operands[2];
                let max_restarts = read_u32(&operands[3..]);
                let window = read_u32(&operands[7..]);
                write!(w, " {} {} {} {}", name, strategy, max_restarts, window)?;
            }
            _ => {}
        }
        writeln!(w)?;

        ip += 1 + op.operand_size();
    }

    Ok(())
}

fn read_u16(bytes: &[u8]) -> u16 {
    u16::from_le_bytes([bytes[0], bytes[1]])
}

fn read_u32(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

fn read_i32(bytes: &[u8]) -> i32 {
    i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}
