use crate::{
    error::{Error, Result},
    ir::{operand_id, Ir},
    translator::Translator,
};
use rspirv::{
    dr::Operand,
    spirv::{AddressingModel, Capability, ExecutionMode, ExecutionModel, MemoryModel, Op},
};

impl Translator {
    /// Accepts the OpenCL-profile capability set; Float16/Float64 turn into
    /// the matching extension pragmas.
    pub(crate) fn translate_capabilities(&mut self, ir: &Ir) -> Result<()> {
        for inst in &ir.module().capabilities {
            let cap = match inst.operands.first() {
                Some(Operand::Capability(cap)) => *cap,
                _ => return Err(Error::UnsupportedOpcode(inst.class.opcode)),
            };
            match cap {
                Capability::Addresses
                | Capability::Linkage
                | Capability::Kernel
                | Capability::Int8
                | Capability::Int16
                | Capability::Int64
                | Capability::Vector16
                | Capability::ImageBasic
                | Capability::LiteralSampler
                | Capability::Float16Buffer => {}
                Capability::Float16 => {
                    self.src
                        .line("#pragma OPENCL EXTENSION cl_khr_fp16 : enable");
                }
                Capability::Float64 => {
                    self.src
                        .line("#pragma OPENCL EXTENSION cl_khr_fp64 : enable");
                }
                other => return Err(Error::UnsupportedCapability(other)),
            }
        }
        return Ok(());
    }

    pub(crate) fn translate_extensions(&mut self, ir: &Ir) -> Result<()> {
        for inst in &ir.module().extensions {
            let ext = match inst.operands.first() {
                Some(Operand::LiteralString(ext)) => ext,
                _ => return Err(Error::UnsupportedOpcode(inst.class.opcode)),
            };
            if ext != "SPV_KHR_no_integer_wrap_decoration" {
                return Err(Error::UnsupportedExtension(ext.clone()));
            }
        }
        return Ok(());
    }

    pub(crate) fn translate_ext_inst_imports(&mut self, ir: &Ir) -> Result<()> {
        for inst in &ir.module().ext_inst_imports {
            let name = match inst.operands.first() {
                Some(Operand::LiteralString(name)) => name,
                _ => return Err(Error::UnsupportedOpcode(inst.class.opcode)),
            };
            if name != "OpenCL.std" {
                return Err(Error::UnsupportedExtInstSet(name.clone()));
            }
        }
        return Ok(());
    }

    /// Only (Physical32 | Physical64, OpenCL) modules translate.
    pub(crate) fn translate_memory_model(&mut self, ir: &Ir) -> Result<()> {
        let inst = ir
            .module()
            .memory_model
            .as_ref()
            .ok_or_else(|| Error::msg("module has no memory model"))?;

        let (addressing, memory) = match (&inst.operands[0], &inst.operands[1]) {
            (Operand::AddressingModel(addressing), Operand::MemoryModel(memory)) => {
                (*addressing, *memory)
            }
            _ => return Err(Error::UnsupportedOpcode(inst.class.opcode)),
        };

        let physical = matches!(
            addressing,
            AddressingModel::Physical32 | AddressingModel::Physical64
        );
        if !physical || memory != MemoryModel::OpenCL {
            return Err(Error::UnsupportedMemoryModel { addressing, memory });
        }
        return Ok(());
    }

    /// Records the kernel name per entry-point function id.
    pub(crate) fn translate_entry_points(&mut self, ir: &Ir) -> Result<()> {
        for inst in &ir.module().entry_points {
            let model = match inst.operands[0] {
                Operand::ExecutionModel(model) => model,
                _ => return Err(Error::UnsupportedOpcode(inst.class.opcode)),
            };
            if model != ExecutionModel::Kernel {
                return Err(Error::UnsupportedExecutionModel(model));
            }

            let func = operand_id(&inst.operands[1])
                .ok_or_else(|| Error::msg("malformed entry point"))?;
            let name = match &inst.operands[2] {
                Operand::LiteralString(name) => name.clone(),
                _ => return Err(Error::msg("malformed entry point")),
            };
            self.entry_points.insert(func, name);
        }
        return Ok(());
    }

    pub(crate) fn translate_execution_modes(&mut self, ir: &Ir) -> Result<()> {
        for inst in &ir.module().execution_modes {
            let ep = operand_id(&inst.operands[0])
                .ok_or_else(|| Error::msg("malformed execution mode"))?;
            let mode = match inst.operands[1] {
                Operand::ExecutionMode(mode) => mode,
                _ => return Err(Error::UnsupportedOpcode(inst.class.opcode)),
            };
            match mode {
                ExecutionMode::LocalSize => {
                    let dims = [&inst.operands[2], &inst.operands[3], &inst.operands[4]]
                        .map(|op| match op {
                            Operand::LiteralInt32(x) => Some(*x),
                            _ => None,
                        });
                    let (Some(x), Some(y), Some(z)) = (dims[0], dims[1], dims[2]) else {
                        return Err(Error::msg("malformed LocalSize execution mode"));
                    };
                    self.local_sizes.insert(ep, (x, y, z));
                }
                ExecutionMode::ContractionOff => {
                    self.contraction_off.insert(ep);
                }
                other => return Err(Error::UnsupportedExecutionMode(other)),
            }
        }
        return Ok(());
    }

    /// Accepts `OpSource`/`OpString` silently and turns `OpName` strings
    /// into sanitised symbols (`.` becomes `_`, reserved words and
    /// duplicates go through the identifier fixup).
    pub(crate) fn translate_debug(&mut self, ir: &Ir) -> Result<()> {
        for inst in &ir.module().debug_string_source {
            match inst.class.opcode {
                Op::Source | Op::String => {}
                other => return Err(Error::UnsupportedOpcode(other)),
            }
        }

        for inst in &ir.module().debug_names {
            match inst.class.opcode {
                Op::Name => {
                    let id = operand_id(&inst.operands[0])
                        .ok_or_else(|| Error::msg("malformed OpName"))?;
                    let name = match &inst.operands[1] {
                        Operand::LiteralString(name) => name.replace('.', "_"),
                        _ => return Err(Error::msg("malformed OpName")),
                    };
                    let name = self.make_valid_identifier(&name);
                    self.names.insert(id, name);
                }
                other => return Err(Error::UnsupportedOpcode(other)),
            }
        }

        if let Some(inst) = ir.module().debug_module_processed.first() {
            return Err(Error::UnsupportedOpcode(inst.class.opcode));
        }
        return Ok(());
    }
}
