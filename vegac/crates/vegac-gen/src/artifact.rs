//! The `.vgb` artifact: binary layout, writer, and reader.
//!
//! Layout, all integers little-endian:
//!
//! 1. Header: magic (u32), version (u32), flags (u32), constant-pool
//!    size (u32), code size (u32).
//! 2. `func_count` (u16), `agent_count` (u16).
//! 3. Function records: `{name_idx: u16, param_count: u16,
//!    local_count: u16, code_offset: u32, code_length: u32}`.
//! 4. Agent records: `{name_idx: u16, model_idx: u16, system_idx: u16,
//!    tool_count: u16, temperature_x100: u16}`.
//! 5. Constant pool bytes.
//! 6. Code bytes.
//!
//! [`Artifact::from_bytes`] composed with [`Artifact::to_bytes`] is
//! byte-identity for any well-formed artifact.

use crate::error::{EmitError, Result};

/// Artifact magic: the bytes `VEGA` once written little-endian.
pub const MAGIC: u32 = 0x4147_4556;

/// Artifact format version.
pub const VERSION: u32 = 1;

/// A function table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuncRecord {
    pub name_idx: u16,
    pub param_count: u16,
    pub local_count: u16,
    pub code_offset: u32,
    pub code_length: u32,
}

/// An agent table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentRecord {
    pub name_idx: u16,
    pub model_idx: u16,
    pub system_idx: u16,
    pub tool_count: u16,
    pub temperature_x100: u16,
}

/// A complete bytecode artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub flags: u32,
    pub functions: Vec<FuncRecord>,
    pub agents: Vec<AgentRecord>,
    pub pool: Vec<u8>,
    pub code: Vec<u8>,
}

impl Artifact {
    /// Serialize to the on-disk layout.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(
            20 + 4 + self.functions.len() * 14 + self.agents.len() * 10 + self.pool.len()
                + self.code.len(),
        );

        out.extend_from_slice(&MAGIC.to_le_bytes());
        out.extend_from_slice(&VERSION.to_le_bytes());
        out.extend_from_slice(&self.flags.to_le_bytes());
        out.extend_from_slice(&(self.pool.len() as u32).to_le_bytes());
        out.extend_from_slice(&(self.code.len() as u32).to_le_bytes());

        out.extend_from_slice(&(self.functions.len() as u16).to_le_bytes());
        out.extend_from_slice(&(self.agents.len() as u16).to_le_bytes());

        for func in &self.functions {
            out.extend_from_slice(&func.name_idx.to_le_bytes());
            out.extend_from_slice(&func.param_count.to_le_bytes());
            out.extend_from_slice(&func.local_count.to_le_bytes());
            out.extend_from_slice(&func.code_offset.to_le_bytes());
            out.extend_from_slice(&func.code_length.to_le_bytes());
        }
        for agent in &self.agents {
            out.extend_from_slice(&agent.name_idx.to_le_bytes());
            out.extend_from_slice(&agent.model_idx.to_le_bytes());
            out.extend_from_slice(&agent.system_idx.to_le_bytes());
            out.extend_from_slice(&agent.tool_count.to_le_bytes());
            out.extend_from_slice(&agent.temperature_x100.to_le_bytes());
        }

        out.extend_from_slice(&self.pool);
        out.extend_from_slice(&self.code);
        out
    }

    /// Parse an artifact from its on-disk layout.
    pub fn from_bytes(bytes: &[u8]) -> Result<Artifact> {
        let mut reader = Reader::new(bytes);

        let magic = reader.u32()?;
        if magic != MAGIC {
            return Err(EmitError::Malformed(format!(
                "bad magic 0x{:08x}",
                magic
            )));
        }
        let version = reader.u32()?;
        if version != VERSION {
            return Err(EmitError::Malformed(format!(
                "unsupported version {}",
                version
            )));
        }
        let flags = reader.u32()?;
        let pool_size = reader.u32()? as usize;
        let code_size = reader.u32()? as usize;

        let func_count = reader.u16()? as usize;
        let agent_count = reader.u16()? as usize;

        let mut functions = Vec::with_capacity(func_count);
        for _ in 0..func_count {
            functions.push(FuncRecord {
                name_idx: reader.u16()?,
                param_count: reader.u16()?,
                local_count: reader.u16()?,
                code_offset: reader.u32()?,
                code_length: reader.u32()?,
            });
        }
        let mut agents = Vec::with_capacity(agent_count);
        for _ in 0..agent_count {
            agents.push(AgentRecord {
                name_idx: reader.u16()?,
                model_idx: reader.u16()?,
                system_idx: reader.u16()?,
                tool_count: reader.u16()?,
                temperature_x100: reader.u16()?,
            });
        }

        let pool = reader.bytes(pool_size)?.to_vec();
        let code = reader.bytes(code_size)?.to_vec();
        if !reader.is_empty() {
            return Err(EmitError::Malformed("trailing bytes".into()));
        }

        for func in &functions {
            let end = func.code_offset as usize + func.code_length as usize;
            if end > code.len() {
                return Err(EmitError::Malformed(format!(
                    "function record past code end ({} > {})",
                    end,
                    code.len()
                )));
            }
        }

        Ok(Artifact {
            flags,
            functions,
            agents,
            pool,
            code,
        })
    }
}

/// Little-endian byte reader with truncation checks.
struct Reader<'a> {
    bytes: &'a [u8],
    at: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, at: 0 }
    }

    fn bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let slice = self
            .bytes
            .get(self.at..self.at + len)
            .ok_or_else(|| EmitError::Malformed("truncated artifact".into()))?;
        self.at += len;
        Ok(slice)
    }

    fn u16(&mut self) -> Result<u16> {
        let b = self.bytes(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32> {
        let b = self.bytes(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn is_empty(&self) -> bool {
        self.at == self.bytes.len()
    }
}
