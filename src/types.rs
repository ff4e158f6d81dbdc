use crate::{
    error::{Error, Result},
    ir::{operand_id, Ir, TypeView},
    translator::Translator,
};
use half::f16;
use rspirv::{
    dr::{Instruction, Operand},
    spirv::{AccessQualifier, Dim, Op, SamplerAddressingMode, SamplerFilterMode, StorageClass, Word},
};
use std::fmt::Write;

impl Translator {
    /// Walks the types/constants/globals section: fills the dual type-name
    /// tables, renders constant literals, declares structs and samplers, and
    /// stashes Workgroup-storage declarations for per-kernel re-emission.
    pub(crate) fn translate_types_values(&mut self, ir: &Ir) -> Result<()> {
        for inst in &ir.module().types_global_values {
            let opcode = inst.class.opcode;
            match opcode {
                Op::TypeInt
                | Op::TypeVector
                | Op::TypePointer
                | Op::TypeVoid
                | Op::TypeBool
                | Op::TypeFunction
                | Op::TypeFloat
                | Op::TypeStruct
                | Op::TypeArray
                | Op::TypeOpaque
                | Op::TypeImage
                | Op::TypeSampler
                | Op::TypeSampledImage
                | Op::TypeEvent => self.translate_type(ir, inst)?,
                Op::Constant => self.translate_constant(ir, inst)?,
                Op::Undef | Op::ConstantNull => {
                    let result = inst.result_id.ok_or_else(|| Error::msg("missing result"))?;
                    let rtype = inst
                        .result_type
                        .ok_or_else(|| Error::msg("missing result type"))?;
                    let null = self.null_constant(ir, rtype)?;
                    self.literals.insert(result, null);
                }
                Op::ConstantTrue => {
                    let result = inst.result_id.ok_or_else(|| Error::msg("missing result"))?;
                    self.literals.insert(result, String::from("true"));
                }
                Op::ConstantFalse => {
                    let result = inst.result_id.ok_or_else(|| Error::msg("missing result"))?;
                    self.literals.insert(result, String::from("false"));
                }
                Op::ConstantSampler => self.translate_constant_sampler(inst)?,
                Op::ConstantComposite => self.translate_constant_composite(ir, inst)?,
                Op::Variable => self.translate_global_variable(ir, inst)?,
                other => return Err(Error::UnsupportedOpcode(other)),
            }
        }
        return Ok(());
    }

    fn translate_type(&mut self, ir: &Ir, inst: &Instruction) -> Result<()> {
        let result = inst.result_id.ok_or_else(|| Error::msg("missing result"))?;
        let mut typestr = String::new();
        let mut signedtypestr = String::new();

        match inst.class.opcode {
            Op::TypePointer => {
                let storage = match inst.operands[0] {
                    Operand::StorageClass(storage) => storage,
                    _ => return Err(Error::msg("malformed OpTypePointer")),
                };
                let pointee = operand_id(&inst.operands[1])
                    .ok_or_else(|| Error::msg("malformed OpTypePointer"))?;
                if self.types_signed.contains_key(&pointee) {
                    signedtypestr = self.src_pointer_type(ir, storage, pointee, true)?;
                }
                typestr = self.src_pointer_type(ir, storage, pointee, false)?;
            }
            Op::TypeInt => {
                let (unsigned, signed) = match ir.type_view(result)? {
                    TypeView::Int { width: 8 } => ("uchar", "char"),
                    TypeView::Int { width: 16 } => ("ushort", "short"),
                    TypeView::Int { width: 32 } => ("uint", "int"),
                    TypeView::Int { width: 64 } => ("ulong", "long"),
                    _ => {
                        return Err(Error::msg(format!(
                            "unsupported integer width at type id %{result}"
                        )))
                    }
                };
                typestr.push_str(unsigned);
                signedtypestr.push_str(signed);
            }
            Op::TypeFloat => {
                let spelling = match ir.type_view(result)? {
                    TypeView::Float { width: 16 } => "half",
                    TypeView::Float { width: 32 } => "float",
                    TypeView::Float { width: 64 } => "double",
                    _ => {
                        return Err(Error::msg(format!(
                            "unsupported float width at type id %{result}"
                        )))
                    }
                };
                typestr.push_str(spelling);
            }
            Op::TypeVector => {
                let TypeView::Vector { elem, count } = ir.type_view(result)? else {
                    return Err(Error::msg("malformed OpTypeVector"));
                };
                typestr = format!("{}{count}", self.src_type(elem)?);
                if let Some(signed_elem) = self.types_signed.get(&elem) {
                    signedtypestr = format!("{signed_elem}{count}");
                }
            }
            Op::TypeStruct => {
                let TypeView::Struct { members } = ir.type_view(result)? else {
                    return Err(Error::msg("malformed OpTypeStruct"));
                };
                let mut decl = format!("struct {} {{\n", self.var_for(result));
                for (index, member) in members.iter().enumerate() {
                    let field = self.src_var_decl(ir, *member, &format!("m{index}"), None)?;
                    let _ = writeln!(decl, "  {field};");
                }
                decl.push('}');
                if self.packed.contains(&result) {
                    decl.push_str(" __attribute__((packed))");
                }
                decl.push(';');
                self.src.line(&decl);

                typestr = format!("struct {}", self.var_for(result));
            }
            // Arrays are spelled at each use site (pointee or declaration)
            // with a literal length.
            Op::TypeArray => {}
            Op::TypeImage => {
                let TypeView::Image {
                    dim,
                    depth,
                    arrayed,
                    ms,
                    sampled,
                    access,
                } = ir.type_view(result)?
                else {
                    return Err(Error::msg("malformed OpTypeImage"));
                };

                if depth != 0 || arrayed != 0 || ms != 0 || sampled != 0 {
                    return Err(Error::UnsupportedImageShape(result));
                }

                let qual = match access {
                    AccessQualifier::ReadOnly => "read_only",
                    AccessQualifier::WriteOnly => "write_only",
                    AccessQualifier::ReadWrite => "read_write",
                };
                let image = match dim {
                    Dim::Dim1D => "image1d_t",
                    Dim::Dim2D => "image2d_t",
                    Dim::Dim3D => "image3d_t",
                    _ => return Err(Error::UnsupportedImageShape(result)),
                };
                typestr = format!("{qual} {image}");
            }
            Op::TypeSampledImage => {}
            Op::TypeSampler => typestr.push_str("sampler_t"),
            Op::TypeOpaque => {
                let TypeView::Opaque { name } = ir.type_view(result)? else {
                    return Err(Error::msg("malformed OpTypeOpaque"));
                };
                typestr = format!("struct {name}");
                self.src.line(&format!("{typestr};"));
            }
            Op::TypeBool => typestr.push_str("bool"),
            Op::TypeVoid => typestr.push_str("void"),
            Op::TypeFunction => {}
            Op::TypeEvent => typestr.push_str("event_t"),
            other => return Err(Error::UnsupportedOpcode(other)),
        }

        self.types.insert(result, typestr);
        if !signedtypestr.is_empty() {
            self.types_signed.insert(result, signedtypestr);
        }
        return Ok(());
    }

    fn translate_constant(&mut self, ir: &Ir, inst: &Instruction) -> Result<()> {
        let result = inst.result_id.ok_or_else(|| Error::msg("missing result"))?;
        let rtype = inst
            .result_type
            .ok_or_else(|| Error::msg("missing result type"))?;

        let literal = match ir.type_view(rtype)? {
            TypeView::Int { width } => {
                let value = match (width, inst.operands.first()) {
                    (8 | 16 | 32, Some(Operand::LiteralInt32(x))) => *x as u64,
                    (64, Some(Operand::LiteralInt64(x))) => *x,
                    _ => return Err(Error::MalformedConstant(result)),
                };
                self.src_cast(rtype, &value.to_string())?
            }
            TypeView::Float { width } => {
                match (width, inst.operands.first()) {
                    // The parser hands 16-bit literals through as raw bits.
                    (16, Some(Operand::LiteralInt32(bits))) => {
                        float_literal(f16::from_bits(*bits as u16).to_f64(), 11, "h")
                    }
                    (16, Some(Operand::LiteralFloat32(x))) => {
                        float_literal(f16::from_bits(x.to_bits() as u16).to_f64(), 11, "h")
                    }
                    (32, Some(Operand::LiteralFloat32(x))) => float_literal(*x as f64, 24, "f"),
                    (64, Some(Operand::LiteralFloat64(x))) => float_literal(*x, 53, ""),
                    _ => return Err(Error::MalformedConstant(result)),
                }
            }
            _ => return Err(Error::MalformedConstant(result)),
        };

        self.literals.insert(result, literal);
        return Ok(());
    }

    fn translate_constant_sampler(&mut self, inst: &Instruction) -> Result<()> {
        let result = inst.result_id.ok_or_else(|| Error::msg("missing result"))?;

        let addressing = match inst.operands[0] {
            Operand::SamplerAddressingMode(SamplerAddressingMode::ClampToEdge) => {
                "CLK_ADDRESS_CLAMP_TO_EDGE"
            }
            Operand::SamplerAddressingMode(SamplerAddressingMode::Clamp) => "CLK_ADDRESS_CLAMP",
            Operand::SamplerAddressingMode(SamplerAddressingMode::Repeat) => "CLK_ADDRESS_REPEAT",
            Operand::SamplerAddressingMode(SamplerAddressingMode::RepeatMirrored) => {
                "CLK_ADDRESS_MIRRORED_REPEAT"
            }
            Operand::SamplerAddressingMode(SamplerAddressingMode::None) => "CLK_ADDRESS_NONE",
            _ => return Err(Error::MalformedConstant(result)),
        };
        let normalised = match inst.operands[1] {
            Operand::LiteralInt32(0) => "CLK_NORMALIZED_COORDS_FALSE",
            Operand::LiteralInt32(_) => "CLK_NORMALIZED_COORDS_TRUE",
            _ => return Err(Error::MalformedConstant(result)),
        };
        let filter = match inst.operands[2] {
            Operand::SamplerFilterMode(SamplerFilterMode::Nearest) => "CLK_FILTER_NEAREST",
            Operand::SamplerFilterMode(SamplerFilterMode::Linear) => "CLK_FILTER_LINEAR",
            _ => return Err(Error::MalformedConstant(result)),
        };

        let line = format!(
            "constant sampler_t {} = {addressing} | {normalised} | {filter};",
            self.var_for(result)
        );
        self.src.line(&line);
        return Ok(());
    }

    fn translate_constant_composite(&mut self, ir: &Ir, inst: &Instruction) -> Result<()> {
        let result = inst.result_id.ok_or_else(|| Error::msg("missing result"))?;
        let rtype = inst
            .result_type
            .ok_or_else(|| Error::msg("missing result type"))?;

        let constituents = inst
            .operands
            .iter()
            .filter_map(operand_id)
            .map(|cid| self.var_for(cid))
            .collect::<Vec<_>>()
            .join(", ");

        let literal = match ir.type_view(rtype)? {
            TypeView::Vector { .. } => {
                format!("(({})({constituents}))", self.src_type(rtype)?)
            }
            TypeView::Struct { .. } => {
                format!("(({}){{{constituents}}})", self.src_type(rtype)?)
            }
            TypeView::Array { .. } => format!("{{{constituents}}}"),
            _ => return Err(Error::MalformedConstant(result)),
        };

        self.literals.insert(result, literal);
        return Ok(());
    }

    /// Workgroup-storage globals are stashed for per-kernel emission;
    /// UniformConstant globals are declared at file scope. Anything else at
    /// module scope is rejected.
    fn translate_global_variable(&mut self, ir: &Ir, inst: &Instruction) -> Result<()> {
        let result = inst.result_id.ok_or_else(|| Error::msg("missing result"))?;
        if self.builtin_vars.contains_key(&result) {
            return Ok(());
        }

        let rtype = inst
            .result_type
            .ok_or_else(|| Error::msg("missing result type"))?;
        let TypeView::Pointer { pointee, .. } = ir.type_view(rtype)? else {
            return Err(Error::msg(format!(
                "module-scope variable %{result} is not of pointer type"
            )));
        };

        let storage = match inst.operands[0] {
            Operand::StorageClass(storage) => storage,
            _ => return Err(Error::msg("malformed OpVariable")),
        };

        match storage {
            StorageClass::Workgroup => {
                let decl = format!("local {}", self.src_mem_object_decl_for(ir, pointee, result)?);
                self.local_var_decls.insert(result, decl);
            }
            StorageClass::UniformConstant => {
                let mut decl =
                    format!("constant {}", self.src_mem_object_decl_for(ir, pointee, result)?);
                if let Some(init) = inst.operands.get(1).and_then(operand_id) {
                    let _ = write!(decl, " = {}", self.var_for(init));
                }
                decl.push(';');
                self.src.line(&decl);
            }
            other => return Err(Error::UnsupportedGlobalStorage(other)),
        }
        return Ok(());
    }

    /// Null constant expression per type kind.
    pub(crate) fn null_constant(&self, ir: &Ir, tyid: Word) -> Result<String> {
        let null = match ir.type_view(tyid)? {
            TypeView::Int { .. } => self.src_cast(tyid, "0")?,
            TypeView::Float { .. } => String::from("0.0"),
            TypeView::Array { .. } | TypeView::Struct { .. } => String::from("{0}"),
            TypeView::Bool => String::from("false"),
            TypeView::Vector { .. } => format!("(({})(0))", self.src_type(tyid)?),
            TypeView::Event => String::from("0"),
            _ => {
                return Err(Error::msg(format!(
                    "no null constant for type id %{tyid}"
                )))
            }
        };
        return Ok(null);
    }
}

/// Fixed-point rendering with width-appropriate precision; infinities and
/// NaNs use the OpenCL C macro spellings.
fn float_literal(value: f64, precision: usize, suffix: &str) -> String {
    if value.is_infinite() {
        let sign = if value.is_sign_negative() { "-" } else { "" };
        return format!("{sign}INFINITY");
    }
    if value.is_nan() {
        return String::from("NAN");
    }
    return format!("{value:.precision$}{suffix}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_literals_render_fixed_point() {
        assert_eq!(float_literal(1.0, 24, "f"), "1.000000000000000000000000f");
        assert_eq!(float_literal(-0.5, 24, "f"), "-0.500000000000000000000000f");
        assert_eq!(
            float_literal(f16::from_f32(1.5).to_f64(), 11, "h"),
            "1.50000000000h"
        );
    }

    #[test]
    fn special_values_use_macros() {
        assert_eq!(float_literal(f64::INFINITY, 24, "f"), "INFINITY");
        assert_eq!(float_literal(f64::NEG_INFINITY, 24, "f"), "-INFINITY");
        assert_eq!(float_literal(f64::NAN, 53, ""), "NAN");
    }

    #[test]
    fn half_bits_decode_through_ieee754() {
        // 0x3C00 is 1.0 in IEEE-754 binary16.
        assert_eq!(f16::from_bits(0x3C00).to_f64(), 1.0);
        assert_eq!(float_literal(f16::from_bits(0x3C00).to_f64(), 11, "h"), "1.00000000000h");
    }
}
