use crate::{
    error::{Error, Result},
    ir::{operand_id, operand_word, Ir, TypeView},
    translator::{rounding_suffix, Translator},
};
use rspirv::{
    dr::{Instruction, Operand},
    spirv::{BuiltIn, Dim, MemorySemantics, Op, Scope, Word},
};
use std::fmt::Write;

fn binop_operator(opcode: Op) -> Option<&'static str> {
    let operator = match opcode {
        Op::FMul | Op::IMul | Op::VectorTimesScalar => "*",
        Op::FDiv | Op::UDiv => "/",
        Op::FAdd | Op::IAdd => "+",
        Op::FSub | Op::ISub => "-",
        Op::UMod => "%",
        Op::ULessThan | Op::FOrdLessThan | Op::FUnordLessThan => "<",
        Op::ULessThanEqual | Op::FOrdLessThanEqual | Op::FUnordLessThanEqual => "<=",
        Op::UGreaterThan | Op::FOrdGreaterThan | Op::FUnordGreaterThan => ">",
        Op::UGreaterThanEqual | Op::FOrdGreaterThanEqual | Op::FUnordGreaterThanEqual => ">=",
        Op::LogicalEqual | Op::IEqual | Op::FOrdEqual | Op::FUnordEqual => "==",
        Op::LogicalNotEqual | Op::INotEqual | Op::FOrdNotEqual | Op::FUnordNotEqual => "!=",
        Op::BitwiseOr => "|",
        Op::BitwiseXor => "^",
        Op::BitwiseAnd => "&",
        Op::LogicalOr => "||",
        Op::LogicalAnd => "&&",
        Op::ShiftLeftLogical => "<<",
        Op::ShiftRightLogical => ">>",
        _ => return None,
    };
    return Some(operator);
}

fn binop_operator_signed(opcode: Op) -> Option<&'static str> {
    let operator = match opcode {
        Op::SDiv => "/",
        Op::SRem => "%",
        Op::ShiftRightArithmetic => ">>",
        Op::SLessThan => "<",
        Op::SLessThanEqual => "<=",
        Op::SGreaterThan => ">",
        Op::SGreaterThanEqual => ">=",
        _ => return None,
    };
    return Some(operator);
}

impl Translator {
    /// Translates one instruction into at most one statement's worth of
    /// text (without the trailing `;`). Control-flow structure, phi nodes and
    /// table-only instructions yield `None`.
    pub(crate) fn translate_instruction(
        &mut self,
        ir: &Ir,
        inst: &Instruction,
    ) -> Result<Option<String>> {
        let opcode = inst.class.opcode;
        let rtype = inst.result_type;
        let result = inst.result_id;

        let id = |index: usize| -> Result<Word> {
            inst.operands
                .get(index)
                .and_then(operand_id)
                .ok_or_else(|| Error::msg(format!("malformed operand in {opcode:?}")))
        };
        let require = |x: Option<Word>| -> Result<Word> {
            x.ok_or_else(|| Error::msg(format!("missing result in {opcode:?}")))
        };

        let mut boolean_result: Option<String> = None;

        let sval = match opcode {
            Op::Undef => self.null_constant(ir, require(rtype)?)?,

            // TODO OpUnreachable could trap once a target idiom is chosen.
            Op::Unreachable | Op::LifetimeStart | Op::LifetimeStop => return Ok(None),
            Op::LoopMerge | Op::SelectionMerge => return Ok(None),
            // phi registers are declared at function entry and assigned on
            // each incoming edge.
            Op::Phi => return Ok(None),

            Op::Return => return Ok(Some(String::from("return"))),
            Op::ReturnValue => return Ok(Some(format!("return {}", self.var_for(id(0)?)))),

            Op::FunctionCall => {
                let callee = id(0)?;
                let args = inst.operands[1..]
                    .iter()
                    .filter_map(operand_id)
                    .map(|arg| self.var_for(arg))
                    .collect::<Vec<_>>()
                    .join(", ");
                let call = format!("{}({args})", self.var_for(callee));
                if ir.type_view(require(rtype)?)? == TypeView::Void {
                    return Ok(Some(call));
                }
                call
            }

            Op::CopyObject => self.var_for(id(0)?),

            Op::Variable => {
                let result = require(result)?;
                let rtype = require(rtype)?;
                let TypeView::Pointer { pointee, .. } = ir.type_view(rtype)? else {
                    return Err(Error::msg(format!("variable %{result} has no pointer type")));
                };
                let storagename =
                    self.make_valid_identifier(&format!("{}_storage", self.var_for(result)));
                let mut text = self.src_mem_object_decl(ir, pointee, result, &storagename)?;
                if let Some(init) = inst.operands.get(1).and_then(operand_id) {
                    let _ = write!(text, " = {}", self.var_for(init));
                }
                let _ = write!(
                    text,
                    "; {} {} = &{storagename}",
                    self.src_type(rtype)?,
                    self.var_for(result)
                );
                return Ok(Some(text));
            }

            Op::Load => {
                let ptr = id(0)?;
                if let Some(builtin) = self.builtin_vars.get(&ptr).copied() {
                    self.builtin_vals.insert(require(result)?, builtin);
                    return Ok(None);
                }
                format!("*{}", self.var_for(ptr))
            }

            Op::Store => {
                return Ok(Some(format!(
                    "*{} = {}",
                    self.var_for(id(0)?),
                    self.var_for(id(1)?)
                )))
            }

            Op::ConvertPtrToU | Op::ConvertUToPtr => self.src_cast_id(require(rtype)?, id(0)?)?,

            Op::InBoundsPtrAccessChain => {
                let base = id(0)?;
                let elem = id(1)?;
                let mut chain = format!("&{}[{}]", self.var_for(base), self.var_for(elem));
                let TypeView::Pointer { pointee, .. } = ir.type_view_of_val(base)? else {
                    return Err(Error::msg(format!("access chain base %{base} is not a pointer")));
                };
                let mut cty = pointee;
                for op in &inst.operands[2..] {
                    let index = operand_id(op)
                        .ok_or_else(|| Error::msg("malformed access chain index"))?;
                    chain = self.src_access_chain(ir, &chain, cty, index)?;
                    cty = match ir.type_view(cty)? {
                        TypeView::Array { elem, .. } => elem,
                        TypeView::Struct { members } => {
                            let member = ir
                                .constant_value(index)
                                .ok_or(Error::UnsupportedChainIndex(index))?;
                            *members
                                .get(member as usize)
                                .ok_or(Error::UnsupportedChainIndex(index))?
                        }
                        _ => return Err(Error::UnsupportedChainIndex(index)),
                    };
                }
                chain
            }

            Op::SampledImage => {
                let image = id(0)?;
                let sampler = id(1)?;
                self.sampled_images
                    .insert(require(result)?, (image, sampler));
                return Ok(None);
            }

            Op::ImageSampleExplicitLod => {
                let sampled = id(0)?;
                let coord = id(1)?;
                let rtype = require(rtype)?;
                let (image, sampler) = self
                    .sampled_images
                    .get(&sampled)
                    .copied()
                    .ok_or_else(|| Error::msg(format!("%{sampled} is not a sampled image")))?;

                let is_float = self.is_float_shaped(ir, rtype)?;
                let is_float_coord =
                    self.is_float_shaped(ir, ir.type_id_of(coord)?)?;

                let coord_expr = if is_float_coord {
                    self.var_for(coord)
                } else {
                    format!("as_int2({})", self.var_for(coord))
                };
                let call = format!(
                    "read_image{}({}, {}, {coord_expr})",
                    if is_float { "f" } else { "i" },
                    self.var_for(image),
                    self.var_for(sampler)
                );
                if is_float {
                    call
                } else {
                    self.src_as(rtype, &call)?
                }
            }

            Op::ImageQuerySizeLod => {
                let image = id(0)?;
                let rtype = require(rtype)?;
                let TypeView::Image { dim, .. } = ir.type_view_of_val(image)? else {
                    return Err(Error::msg(format!("%{image} is not an image")));
                };
                let name = self.var_for(image);
                let mut query = format!(
                    "(({})(get_image_width({name})",
                    self.src_type(rtype)?
                );
                if dim == Dim::Dim2D || dim == Dim::Dim3D {
                    let _ = write!(query, ", get_image_height({name})");
                }
                if dim == Dim::Dim3D {
                    let _ = write!(query, ", get_image_depth({name})");
                }
                query.push_str("))");
                query
            }

            Op::AtomicIIncrement => self.src_call("atomic_inc", &[id(0)?]),
            Op::AtomicIDecrement => self.src_call("atomic_dec", &[id(0)?]),

            // Memory scope and semantics operands are not honoured: the
            // translation targets the scope-free atomic_* family.
            Op::AtomicAnd
            | Op::AtomicExchange
            | Op::AtomicIAdd
            | Op::AtomicISub
            | Op::AtomicOr
            | Op::AtomicSMax
            | Op::AtomicSMin
            | Op::AtomicUMax
            | Op::AtomicUMin
            | Op::AtomicXor => {
                let function = match opcode {
                    Op::AtomicAnd => "atomic_and",
                    Op::AtomicExchange => "atomic_xchg",
                    Op::AtomicIAdd => "atomic_add",
                    Op::AtomicISub => "atomic_sub",
                    Op::AtomicOr => "atomic_or",
                    Op::AtomicSMax | Op::AtomicUMax => "atomic_max",
                    Op::AtomicSMin | Op::AtomicUMin => "atomic_min",
                    Op::AtomicXor => "atomic_xor",
                    _ => unreachable!(),
                };
                self.src_call(function, &[id(0)?, id(3)?])
            }

            Op::AtomicCompareExchange => self.src_call("atomic_cmpxchg", &[id(0)?, id(5)?, id(4)?]),

            Op::CompositeExtract => {
                let composite = id(0)?;
                let index = operand_word(&inst.operands[1])
                    .ok_or_else(|| Error::msg("malformed OpCompositeExtract"))?;
                if inst.operands.len() > 2 {
                    return Err(Error::UnsupportedOpcode(opcode));
                }
                if self.builtin_vals.contains_key(&composite) {
                    self.builtin_vector_extract(composite, &index.to_string())?
                } else {
                    match ir.type_view_of_val(composite)? {
                        TypeView::Vector { .. } => self.src_vec_comp(composite, index),
                        _ => return Err(Error::UnsupportedOpcode(opcode)),
                    }
                }
            }

            Op::CompositeInsert => {
                let object = id(0)?;
                let composite = id(1)?;
                let index = operand_word(&inst.operands[2])
                    .ok_or_else(|| Error::msg("malformed OpCompositeInsert"))?;
                if inst.operands.len() > 3 {
                    return Err(Error::UnsupportedOpcode(opcode));
                }
                let result = require(result)?;
                let rtype = require(rtype)?;
                match ir.type_view(rtype)? {
                    TypeView::Vector { .. } => {}
                    _ => return Err(Error::UnsupportedOpcode(opcode)),
                }
                return Ok(Some(format!(
                    "{} {} = {}; {} = {}",
                    self.src_type(rtype)?,
                    self.var_for(result),
                    self.var_for(composite),
                    self.src_vec_comp(result, index),
                    self.var_for(object)
                )));
            }

            Op::CompositeConstruct => {
                let members = inst
                    .operands
                    .iter()
                    .filter_map(operand_id)
                    .map(|member| self.var_for(member))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{{{members}}}")
            }

            Op::VectorExtractDynamic => {
                let vec = id(0)?;
                let index = id(1)?;
                if self.builtin_vals.contains_key(&vec) {
                    self.builtin_vector_extract(vec, &self.var_for(index))?
                } else {
                    format!(
                        "(({}*)&{})[{}]",
                        self.src_type(require(rtype)?)?,
                        self.var_for(vec),
                        self.var_for(index)
                    )
                }
            }

            Op::VectorInsertDynamic => {
                let vec = id(0)?;
                let component = id(1)?;
                let index = id(2)?;
                let result = require(result)?;
                format!(
                    "{}; (({}*)&{})[{}] = {}",
                    self.var_for(vec),
                    self.src_type(ir.type_id_of(component)?)?,
                    self.var_for(result),
                    self.var_for(index),
                    self.var_for(component)
                )
            }

            Op::VectorShuffle => {
                let v1 = id(0)?;
                let v2 = id(1)?;
                let TypeView::Vector { count: n1, .. } = ir.type_view_of_val(v1)? else {
                    return Err(Error::msg(format!("%{v1} is not a vector")));
                };
                let mut lanes = Vec::with_capacity(inst.operands.len() - 2);
                for op in &inst.operands[2..] {
                    let lane = operand_word(op)
                        .ok_or_else(|| Error::msg("malformed OpVectorShuffle"))?;
                    if lane == 0xFFFF_FFFF {
                        lanes.push(String::from("0"));
                    } else if lane >= n1 {
                        lanes.push(self.src_vec_comp(v2, lane - n1));
                    } else {
                        lanes.push(self.src_vec_comp(v1, lane));
                    }
                }
                format!(
                    "(({})({}))",
                    self.src_type(require(rtype)?)?,
                    lanes.join(", ")
                )
            }

            Op::SDiv | Op::SRem | Op::ShiftRightArithmetic => {
                let signed = self.translate_binop_signed(ir, inst)?;
                self.src_as(require(rtype)?, &signed)?
            }

            Op::VectorTimesScalar
            | Op::ShiftLeftLogical
            | Op::ShiftRightLogical
            | Op::FAdd
            | Op::FSub
            | Op::FDiv
            | Op::FMul
            | Op::ISub
            | Op::IAdd
            | Op::IMul
            | Op::UDiv
            | Op::UMod
            | Op::BitwiseOr
            | Op::BitwiseXor
            | Op::BitwiseAnd => self.translate_binop(inst)?,

            Op::FMod | Op::FRem => self.src_call("fmod", &[id(0)?, id(1)?]),

            Op::SNegate | Op::FNegate => format!("-{}", self.var_for(id(0)?)),
            Op::LogicalNot => format!("!{}", self.var_for(id(0)?)),
            Op::Not => format!("~{}", self.var_for(id(0)?)),

            Op::LessOrGreater => {
                boolean_result = Some(self.src_type_boolean_for_val(ir, id(0)?)?);
                self.src_call("islessgreater", &[id(0)?, id(1)?])
            }

            Op::FOrdEqual
            | Op::FOrdNotEqual
            | Op::FOrdLessThan
            | Op::FOrdGreaterThan
            | Op::FOrdLessThanEqual
            | Op::FOrdGreaterThanEqual
            | Op::FUnordEqual
            | Op::FUnordNotEqual
            | Op::FUnordLessThan
            | Op::FUnordGreaterThan
            | Op::FUnordLessThanEqual
            | Op::FUnordGreaterThanEqual
            | Op::LogicalOr
            | Op::LogicalAnd
            | Op::ULessThan
            | Op::ULessThanEqual
            | Op::UGreaterThan
            | Op::UGreaterThanEqual
            | Op::LogicalEqual
            | Op::LogicalNotEqual
            | Op::IEqual
            | Op::INotEqual => {
                boolean_result = Some(self.src_type_boolean_for_val(ir, id(0)?)?);
                self.translate_binop(inst)?
            }

            Op::SLessThan | Op::SLessThanEqual | Op::SGreaterThan | Op::SGreaterThanEqual => {
                boolean_result = Some(self.src_type_boolean_for_val(ir, id(0)?)?);
                self.translate_binop_signed(ir, inst)?
            }

            Op::Any => self.src_call("any", &[id(0)?]),
            Op::All => self.src_call("all", &[id(0)?]),
            Op::IsNan => self.src_call("isnan", &[id(0)?]),
            Op::IsInf => self.src_call("isinf", &[id(0)?]),
            Op::IsFinite => self.src_call("isfinite", &[id(0)?]),
            Op::IsNormal => self.src_call("isnormal", &[id(0)?]),
            Op::SignBitSet => self.src_call("signbit", &[id(0)?]),
            Op::BitCount => self.src_call("popcount", &[id(0)?]),
            Op::Ordered => self.src_call("isordered", &[id(0)?, id(1)?]),
            Op::Unordered => self.src_call("isunordered", &[id(0)?, id(1)?]),
            Op::Dot => self.src_call("dot", &[id(0)?, id(1)?]),

            Op::ConvertFToU | Op::ConvertFToS => {
                let op = id(0)?;
                let result = require(result)?;
                let rtype = require(rtype)?;
                let saturated = self.saturated.contains(&result);

                let mut conversion = String::from("convert_");
                if opcode == Op::ConvertFToU {
                    conversion.push_str(self.src_type(rtype)?);
                } else {
                    conversion.push_str(self.src_type_signed(rtype)?);
                }
                if saturated {
                    conversion.push_str("_sat");
                }
                // Float-to-integer conversions truncate unless decorated.
                let mode = self
                    .rounding_modes
                    .get(&result)
                    .map(|mode| rounding_suffix(*mode))
                    .unwrap_or("rtz");
                let _ = write!(conversion, "_{mode}({})", self.var_for(op));

                // SPIR-V requires NaN to saturate to 0; OpenCL C only
                // recommends it (section 6.2.3).
                if saturated {
                    conversion = format!("{} ? 0 : {conversion}", self.src_call("isnan", &[op]));
                }
                conversion
            }

            Op::ConvertUToF | Op::ConvertSToF => {
                let op = id(0)?;
                let result = require(result)?;
                let rtype = require(rtype)?;

                let mut conversion = format!("convert_{}", self.src_type(rtype)?);
                if self.saturated.contains(&result) {
                    conversion.push_str("_sat");
                }
                if let Some(mode) = self.rounding_modes.get(&result) {
                    let _ = write!(conversion, "_{}", rounding_suffix(*mode));
                }
                let _ = write!(conversion, "({})", self.var_for(op));
                conversion
            }

            Op::SatConvertSToU => {
                let rtype = require(rtype)?;
                let call = format!(
                    "convert_{}_sat({})",
                    self.src_type_signed(rtype)?,
                    self.var_for(id(0)?)
                );
                self.src_as(rtype, &call)?
            }

            Op::SatConvertUToS => {
                let rtype = require(rtype)?;
                format!(
                    "convert_{}_sat({})",
                    self.src_type(rtype)?,
                    self.src_as_signed(ir, id(0)?)?
                )
            }

            Op::Bitcast => {
                let val = id(0)?;
                let rtype = require(rtype)?;
                let pointer_involved =
                    matches!(ir.type_view(rtype)?, TypeView::Pointer { .. })
                        || matches!(ir.type_view_of_val(val)?, TypeView::Pointer { .. });
                if pointer_involved {
                    self.src_cast_id(rtype, val)?
                } else {
                    self.src_as_id(rtype, val)?
                }
            }

            Op::SConvert => self.src_convert_signed(ir, id(0)?, require(rtype)?)?,
            Op::FConvert | Op::UConvert => self.src_convert(id(0)?, require(rtype)?)?,

            Op::Select => format!(
                "{} ? {} : {}",
                self.var_for(id(0)?),
                self.var_for(id(1)?),
                self.var_for(id(2)?)
            ),

            Op::Branch => return Ok(Some(format!("goto {}", self.var_for(id(0)?)))),

            Op::BranchConditional => {
                return Ok(Some(format!(
                    "if ({}) {{ goto {};}} else {{ goto {};}}",
                    self.var_for(id(0)?),
                    self.var_for(id(1)?),
                    self.var_for(id(2)?)
                )))
            }

            Op::Switch => {
                let selector = id(0)?;
                let default = id(1)?;
                let mut text = format!(
                    "switch ({}){{default: goto {};",
                    self.var_for(selector),
                    self.var_for(default)
                );
                for pair in inst.operands[2..].chunks(2) {
                    let value = match pair[0] {
                        Operand::LiteralInt32(x) => x as u64,
                        Operand::LiteralInt64(x) => x,
                        _ => return Err(Error::msg("malformed OpSwitch literal")),
                    };
                    let target = operand_id(&pair[1])
                        .ok_or_else(|| Error::msg("malformed OpSwitch target"))?;
                    let _ = write!(text, "case {value}: goto {};", self.var_for(target));
                }
                text.push('}');
                return Ok(Some(text));
            }

            Op::ControlBarrier => return self.translate_control_barrier(ir, inst).map(Some),

            Op::GroupAsyncCopy => {
                let execution = id(0)?;
                if ir.constant_value(execution) != Some(Scope::Workgroup as u64) {
                    return Err(Error::UnsupportedBarrier(execution));
                }
                let (dst, src, num_elems, stride, event) =
                    (id(1)?, id(2)?, id(3)?, id(4)?, id(5)?);
                if ir.constant_value(stride) == Some(1) {
                    self.src_call("async_work_group_copy", &[dst, src, num_elems, event])
                } else {
                    self.src_call(
                        "async_work_group_strided_copy",
                        &[dst, src, num_elems, stride, event],
                    )
                }
            }

            Op::GroupWaitEvents => {
                let execution = id(0)?;
                if ir.constant_value(execution) != Some(Scope::Workgroup as u64) {
                    return Err(Error::UnsupportedBarrier(execution));
                }
                return Ok(Some(self.src_call("wait_group_events", &[id(1)?, id(2)?])));
            }

            Op::ExtInst => return self.translate_ext_inst(ir, inst),

            other => return Err(Error::UnsupportedOpcode(other)),
        };

        let result = require(result)?;
        if let Some(shadow) = boolean_result {
            self.boolean_src_types.insert(result, shadow);
        }
        let decl = self.src_var_decl_for(ir, result)?;
        return Ok(Some(format!("{decl} = {sval}")));
    }

    fn translate_binop(&self, inst: &Instruction) -> Result<String> {
        let operator = binop_operator(inst.class.opcode)
            .ok_or(Error::UnsupportedOpcode(inst.class.opcode))?;
        let v1 = operand_id(&inst.operands[0])
            .ok_or_else(|| Error::msg("malformed binary operand"))?;
        let v2 = operand_id(&inst.operands[1])
            .ok_or_else(|| Error::msg("malformed binary operand"))?;
        return Ok(format!(
            "{} {operator} {}",
            self.var_for(v1),
            self.var_for(v2)
        ));
    }

    /// Operands reinterpret as signed; callers wrap the result back into
    /// the canonical unsigned type where the result is integer-typed.
    fn translate_binop_signed(&self, ir: &Ir, inst: &Instruction) -> Result<String> {
        let operator = binop_operator_signed(inst.class.opcode)
            .ok_or(Error::UnsupportedOpcode(inst.class.opcode))?;
        let v1 = operand_id(&inst.operands[0])
            .ok_or_else(|| Error::msg("malformed binary operand"))?;
        let v2 = operand_id(&inst.operands[1])
            .ok_or_else(|| Error::msg("malformed binary operand"))?;
        return Ok(format!(
            "{} {operator} {}",
            self.src_as_signed(ir, v1)?,
            self.src_as_signed(ir, v2)?
        ));
    }

    fn translate_control_barrier(&self, ir: &Ir, inst: &Instruction) -> Result<String> {
        let execution = operand_id(&inst.operands[0])
            .ok_or_else(|| Error::msg("malformed OpControlBarrier"))?;
        let memory = operand_id(&inst.operands[1])
            .ok_or_else(|| Error::msg("malformed OpControlBarrier"))?;
        let semantics = operand_id(&inst.operands[2])
            .ok_or_else(|| Error::msg("malformed OpControlBarrier"))?;

        if ir.constant_value(execution) != Some(Scope::Workgroup as u64) {
            return Err(Error::UnsupportedBarrier(execution));
        }

        let flags = match ir.constant_value(memory) {
            Some(scope) if scope == Scope::Workgroup as u64 => "CLK_LOCAL_MEM_FENCE",
            Some(scope) if scope == Scope::Device as u64 => "CLK_GLOBAL_MEM_FENCE",
            _ => return Err(Error::UnsupportedBarrier(memory)),
        };

        let seq_cst = MemorySemantics::SEQUENTIALLY_CONSISTENT.bits() as u64;
        let local = seq_cst | MemorySemantics::WORKGROUP_MEMORY.bits() as u64;
        let global = seq_cst | MemorySemantics::CROSS_WORKGROUP_MEMORY.bits() as u64;
        match ir.constant_value(semantics) {
            Some(mask) if mask == local || mask == global => {}
            _ => return Err(Error::UnsupportedBarrier(semantics)),
        }

        return Ok(self.src_call_str("barrier", flags));
    }

    /// A `CompositeExtract`/`VectorExtractDynamic` on a loaded built-in
    /// becomes the corresponding work-item query call.
    fn builtin_vector_extract(&self, id: Word, index: &str) -> Result<String> {
        let function = match self.builtin_vals[&id] {
            BuiltIn::GlobalInvocationId => "get_global_id",
            BuiltIn::GlobalOffset => "get_global_offset",
            BuiltIn::GlobalSize => "get_global_size",
            BuiltIn::WorkgroupId => "get_group_id",
            BuiltIn::WorkgroupSize => "get_local_size",
            BuiltIn::LocalInvocationId => "get_local_id",
            BuiltIn::NumWorkgroups => "get_num_groups",
            other => return Err(Error::UnsupportedBuiltIn(other)),
        };
        return Ok(self.src_call_str(function, index));
    }

    /// Element-wise float check: a scalar float or a vector of floats.
    fn is_float_shaped(&self, ir: &Ir, tyid: Word) -> Result<bool> {
        let shaped = match ir.type_view(tyid)? {
            TypeView::Float { .. } => true,
            TypeView::Vector { elem, .. } => {
                matches!(ir.type_view(elem)?, TypeView::Float { .. })
            }
            _ => false,
        };
        return Ok(shaped);
    }

    /// One step of an access chain through an aggregate pointee.
    pub(crate) fn src_access_chain(
        &self,
        ir: &Ir,
        base: &str,
        tyid: Word,
        index: Word,
    ) -> Result<String> {
        let wrapped = format!("({base})");
        return match ir.type_view(tyid)? {
            TypeView::Struct { .. } => {
                let member = ir
                    .constant_value(index)
                    .ok_or(Error::UnsupportedChainIndex(index))?;
                Ok(format!("&({wrapped}->m{member})"))
            }
            TypeView::Array { .. } => Ok(format!("&({wrapped}[{}])", self.var_for(index))),
            _ => Err(Error::UnsupportedChainIndex(index)),
        };
    }
}
