use crate::{
    error::{Error, Result},
    ir::{operand_id, Ir},
    translator::Translator,
};
use rspirv::{
    dr::{Instruction, Operand},
    spirv::{BuiltIn, Decoration, FunctionParameterAttribute, LinkageType, Op},
};

impl Translator {
    /// Walks the annotations section and fills the per-id metadata tables.
    /// `OpGroupDecorate` re-applies everything recorded against the group id
    /// to each target.
    pub(crate) fn translate_annotations(&mut self, ir: &Ir) -> Result<()> {
        for inst in &ir.module().annotations {
            match inst.class.opcode {
                Op::Decorate => self.translate_decoration(inst)?,
                Op::DecorationGroup => {}
                Op::GroupDecorate => {
                    let group = operand_id(&inst.operands[0])
                        .ok_or_else(|| Error::msg("malformed OpGroupDecorate"))?;
                    let restrict = self.restricts.contains(&group);
                    let volatile = self.volatiles.contains(&group);
                    let packed = self.packed.contains(&group);
                    let nowrite = self.nowrite_params.contains(&group);
                    let saturated = self.saturated.contains(&group);
                    let rounding = self.rounding_modes.get(&group).copied();
                    let alignment = self.alignments.get(&group).copied();

                    for target in inst.operands[1..].iter().filter_map(operand_id) {
                        if restrict {
                            self.restricts.insert(target);
                        }
                        if volatile {
                            self.volatiles.insert(target);
                        }
                        if packed {
                            self.packed.insert(target);
                        }
                        if nowrite {
                            self.nowrite_params.insert(target);
                        }
                        if saturated {
                            self.saturated.insert(target);
                        }
                        if let Some(mode) = rounding {
                            self.rounding_modes.insert(target, mode);
                        }
                        if let Some(align) = alignment {
                            self.alignments.insert(target, align);
                        }
                    }
                }
                other => return Err(Error::UnsupportedOpcode(other)),
            }
        }
        return Ok(());
    }

    fn translate_decoration(&mut self, inst: &Instruction) -> Result<()> {
        let target =
            operand_id(&inst.operands[0]).ok_or_else(|| Error::msg("malformed OpDecorate"))?;
        let decoration = match inst.operands[1] {
            Operand::Decoration(decoration) => decoration,
            _ => return Err(Error::msg("malformed OpDecorate")),
        };

        match decoration {
            Decoration::FuncParamAttr => match inst.operands[2] {
                Operand::FunctionParameterAttribute(FunctionParameterAttribute::NoCapture) => {}
                Operand::FunctionParameterAttribute(FunctionParameterAttribute::NoWrite) => {
                    self.nowrite_params.insert(target);
                }
                _ => return Err(Error::UnsupportedDecoration(decoration)),
            },
            Decoration::BuiltIn => match inst.operands[2] {
                Operand::BuiltIn(
                    builtin @ (BuiltIn::GlobalInvocationId
                    | BuiltIn::GlobalSize
                    | BuiltIn::GlobalOffset
                    | BuiltIn::WorkgroupId
                    | BuiltIn::WorkgroupSize
                    | BuiltIn::LocalInvocationId
                    | BuiltIn::NumWorkgroups
                    | BuiltIn::WorkDim),
                ) => {
                    self.builtin_vars.insert(target, builtin);
                }
                Operand::BuiltIn(other) => return Err(Error::UnsupportedBuiltIn(other)),
                _ => return Err(Error::msg("malformed BuiltIn decoration")),
            },
            // Always correct to ignore: these do not change the emitted
            // source for a conforming OpenCL C compiler.
            Decoration::Constant
            | Decoration::Aliased
            | Decoration::Coherent
            | Decoration::NonReadable
            | Decoration::NonWritable
            | Decoration::NoSignedWrap
            | Decoration::NoUnsignedWrap
            | Decoration::FPFastMathMode => {}
            Decoration::Restrict => {
                self.restricts.insert(target);
            }
            Decoration::Volatile => {
                self.volatiles.insert(target);
            }
            Decoration::CPacked => {
                self.packed.insert(target);
            }
            Decoration::Alignment => match inst.operands[2] {
                Operand::LiteralInt32(align) => {
                    self.alignments.insert(target, align);
                }
                _ => return Err(Error::msg("malformed Alignment decoration")),
            },
            Decoration::LinkageAttributes => {
                let name = match &inst.operands[2] {
                    Operand::LiteralString(name) => name.clone(),
                    _ => return Err(Error::msg("malformed LinkageAttributes decoration")),
                };
                match inst.operands[3] {
                    Operand::LinkageType(LinkageType::Export) => {
                        self.exports.insert(target, name);
                    }
                    Operand::LinkageType(LinkageType::Import) => {
                        self.imports.insert(target, name);
                    }
                    _ => return Err(Error::msg("malformed LinkageAttributes decoration")),
                }
            }
            Decoration::FPRoundingMode => match inst.operands[2] {
                Operand::FPRoundingMode(mode) => {
                    self.rounding_modes.insert(target, mode);
                }
                _ => return Err(Error::msg("malformed FPRoundingMode decoration")),
            },
            Decoration::SaturatedConversion => {
                self.saturated.insert(target);
            }
            other => return Err(Error::UnsupportedDecoration(other)),
        }
        return Ok(());
    }
}
