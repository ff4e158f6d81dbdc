use crate::{
    error::{Error, Result},
    ir::{operand_id, operand_word, Ir, TypeView},
    translator::Translator,
};
use once_cell::sync::Lazy;
use rspirv::dr::Instruction;
use spirv::CLOp;
use std::collections::HashMap;

/// An OpenCL.std instruction with a direct OpenCL C spelling. `signed`
/// marks entries whose operands (and result, for non-unary arities) must be
/// bridged through signed reinterpretations.
#[derive(Debug, Clone, Copy)]
struct ExtOp {
    name: &'static str,
    signed: bool,
}

const fn ext(name: &'static str, signed: bool) -> ExtOp {
    ExtOp { name, signed }
}

static EXT_UNARY: Lazy<HashMap<u32, &'static str>> = Lazy::new(|| {
    HashMap::from([
        (CLOp::u_abs as u32, "abs"),
        (CLOp::acos as u32, "acos"),
        (CLOp::acosh as u32, "acosh"),
        (CLOp::acospi as u32, "acospi"),
        (CLOp::asin as u32, "asin"),
        (CLOp::asinh as u32, "asinh"),
        (CLOp::asinpi as u32, "asinpi"),
        (CLOp::atan as u32, "atan"),
        (CLOp::atanh as u32, "atanh"),
        (CLOp::atanpi as u32, "atanpi"),
        (CLOp::cbrt as u32, "cbrt"),
        (CLOp::ceil as u32, "ceil"),
        (CLOp::clz as u32, "clz"),
        (CLOp::cos as u32, "cos"),
        (CLOp::cosh as u32, "cosh"),
        (CLOp::cospi as u32, "cospi"),
        (CLOp::degrees as u32, "degrees"),
        (CLOp::exp as u32, "exp"),
        (CLOp::exp2 as u32, "exp2"),
        (CLOp::exp10 as u32, "exp10"),
        (CLOp::expm1 as u32, "expm1"),
        (CLOp::fabs as u32, "fabs"),
        (CLOp::fast_length as u32, "fast_length"),
        (CLOp::fast_normalize as u32, "fast_normalize"),
        (CLOp::floor as u32, "floor"),
        (CLOp::half_cos as u32, "half_cos"),
        (CLOp::half_exp as u32, "half_exp"),
        (CLOp::half_exp2 as u32, "half_exp2"),
        (CLOp::half_exp10 as u32, "half_exp10"),
        (CLOp::half_log as u32, "half_log"),
        (CLOp::half_log2 as u32, "half_log2"),
        (CLOp::half_log10 as u32, "half_log10"),
        (CLOp::half_recip as u32, "half_recip"),
        (CLOp::half_rsqrt as u32, "half_rsqrt"),
        (CLOp::half_sin as u32, "half_sin"),
        (CLOp::half_sqrt as u32, "half_sqrt"),
        (CLOp::half_tan as u32, "half_tan"),
        (CLOp::ilogb as u32, "ilogb"),
        (CLOp::length as u32, "length"),
        (CLOp::lgamma as u32, "lgamma"),
        (CLOp::log as u32, "log"),
        (CLOp::log2 as u32, "log2"),
        (CLOp::log10 as u32, "log10"),
        (CLOp::log1p as u32, "log1p"),
        (CLOp::logb as u32, "logb"),
        (CLOp::nan as u32, "nan"),
        (CLOp::normalize as u32, "normalize"),
        (CLOp::radians as u32, "radians"),
        (CLOp::rint as u32, "rint"),
        (CLOp::round as u32, "round"),
        (CLOp::rsqrt as u32, "rsqrt"),
        (CLOp::sign as u32, "sign"),
        (CLOp::sin as u32, "sin"),
        (CLOp::sinh as u32, "sinh"),
        (CLOp::sinpi as u32, "sinpi"),
        (CLOp::sqrt as u32, "sqrt"),
        (CLOp::tan as u32, "tan"),
        (CLOp::tanh as u32, "tanh"),
        (CLOp::tanpi as u32, "tanpi"),
        (CLOp::trunc as u32, "trunc"),
    ])
});

static EXT_BINARY: Lazy<HashMap<u32, ExtOp>> = Lazy::new(|| {
    HashMap::from([
        (CLOp::u_abs_diff as u32, ext("abs_diff", false)),
        (CLOp::s_hadd as u32, ext("hadd", true)),
        (CLOp::u_hadd as u32, ext("hadd", false)),
        (CLOp::s_mul_hi as u32, ext("mul_hi", true)),
        (CLOp::u_mul_hi as u32, ext("mul_hi", false)),
        (CLOp::s_rhadd as u32, ext("rhadd", true)),
        (CLOp::u_rhadd as u32, ext("rhadd", false)),
        (CLOp::rotate as u32, ext("rotate", false)),
        (CLOp::s_add_sat as u32, ext("add_sat", true)),
        (CLOp::u_add_sat as u32, ext("add_sat", false)),
        (CLOp::s_sub_sat as u32, ext("sub_sat", true)),
        (CLOp::u_sub_sat as u32, ext("sub_sat", false)),
        (CLOp::s_mul24 as u32, ext("mul24", true)),
        (CLOp::u_mul24 as u32, ext("mul24", false)),
        (CLOp::shuffle as u32, ext("shuffle", false)),
        (CLOp::atan2 as u32, ext("atan2", false)),
        (CLOp::atan2pi as u32, ext("atan2pi", false)),
        (CLOp::copysign as u32, ext("copysign", false)),
        (CLOp::fdim as u32, ext("fdim", false)),
        (CLOp::fmax as u32, ext("fmax", false)),
        (CLOp::fmin as u32, ext("fmin", false)),
        (CLOp::fmod as u32, ext("fmod", false)),
        (CLOp::hypot as u32, ext("hypot", false)),
        (CLOp::ldexp as u32, ext("ldexp", false)),
        (CLOp::maxmag as u32, ext("maxmag", false)),
        (CLOp::minmag as u32, ext("minmag", false)),
        (CLOp::modf as u32, ext("modf", false)),
        (CLOp::nextafter as u32, ext("nextafter", false)),
        (CLOp::pow as u32, ext("pow", false)),
        (CLOp::pown as u32, ext("pown", false)),
        (CLOp::powr as u32, ext("powr", false)),
        (CLOp::remainder as u32, ext("remainder", false)),
        (CLOp::rootn as u32, ext("rootn", false)),
        (CLOp::sincos as u32, ext("sincos", false)),
        (CLOp::fract as u32, ext("fract", false)),
        (CLOp::half_divide as u32, ext("half_divide", false)),
        (CLOp::half_powr as u32, ext("half_powr", false)),
        (CLOp::cross as u32, ext("cross", false)),
        (CLOp::distance as u32, ext("distance", false)),
        (CLOp::fast_distance as u32, ext("fast_distance", false)),
        (CLOp::step as u32, ext("step", false)),
        (CLOp::s_upsample as u32, ext("upsample", true)),
        (CLOp::u_upsample as u32, ext("upsample", false)),
        (CLOp::s_max as u32, ext("max", true)),
        (CLOp::u_max as u32, ext("max", false)),
        (CLOp::s_min as u32, ext("min", true)),
        (CLOp::u_min as u32, ext("min", false)),
        (CLOp::vload_half as u32, ext("vload_half", false)),
    ])
});

static EXT_TERNARY: Lazy<HashMap<u32, ExtOp>> = Lazy::new(|| {
    HashMap::from([
        (CLOp::bitselect as u32, ext("bitselect", false)),
        (CLOp::fclamp as u32, ext("clamp", false)),
        (CLOp::s_clamp as u32, ext("clamp", true)),
        (CLOp::u_clamp as u32, ext("clamp", false)),
        (CLOp::fma as u32, ext("fma", false)),
        (CLOp::mad as u32, ext("mad", false)),
        (CLOp::mix as u32, ext("mix", false)),
        (CLOp::s_mad24 as u32, ext("mad24", true)),
        (CLOp::u_mad24 as u32, ext("mad24", false)),
        (CLOp::s_mad_hi as u32, ext("mad_hi", true)),
        (CLOp::u_mad_hi as u32, ext("mad_hi", false)),
        (CLOp::s_mad_sat as u32, ext("mad_sat", true)),
        (CLOp::u_mad_sat as u32, ext("mad_sat", false)),
        (CLOp::select as u32, ext("select", false)),
        (CLOp::shuffle2 as u32, ext("shuffle2", false)),
        (CLOp::smoothstep as u32, ext("smoothstep", false)),
    ])
});

const VLOADN: u32 = CLOp::vloadn as u32;
const VLOAD_HALFN: u32 = CLOp::vload_halfn as u32;
const VLOADA_HALFN: u32 = CLOp::vloada_halfn as u32;
const VSTOREN: u32 = CLOp::vstoren as u32;
const VSTORE_HALF: u32 = CLOp::vstore_half as u32;
const VSTORE_HALF_R: u32 = CLOp::vstore_half_r as u32;
const VSTORE_HALFN: u32 = CLOp::vstore_halfn as u32;
const VSTOREA_HALFN: u32 = CLOp::vstorea_halfn as u32;
const VSTOREA_HALFN_R: u32 = CLOp::vstorea_halfn_r as u32;
const S_ABS: u32 = CLOp::s_abs as u32;
const S_ABS_DIFF: u32 = CLOp::s_abs_diff as u32;
const FREXP: u32 = CLOp::frexp as u32;
const LGAMMA_R: u32 = CLOp::lgamma_r as u32;
const REMQUO: u32 = CLOp::remquo as u32;
const PRINTF: u32 = CLOp::printf as u32;

fn rounding_suffix_from_word(mode: u32) -> Result<&'static str> {
    return match mode {
        0 => Ok("rte"),
        1 => Ok("rtz"),
        2 => Ok("rtp"),
        3 => Ok("rtn"),
        _ => Err(Error::msg(format!("unknown rounding mode literal {mode}"))),
    };
}

impl Translator {
    /// Dispatches one `OpExtInst` of the OpenCL.std set. Returns the full
    /// statement text (assignment included when the instruction produces a
    /// value) or an `UnsupportedExtInst` failure.
    pub(crate) fn translate_ext_inst(
        &mut self,
        ir: &Ir,
        inst: &Instruction,
    ) -> Result<Option<String>> {
        let result = inst.result_id;
        let rtype = inst
            .result_type
            .ok_or_else(|| Error::msg("OpExtInst without result type"))?;
        let ext = operand_word(&inst.operands[1])
            .ok_or_else(|| Error::msg("malformed OpExtInst"))?;

        let arg = |index: usize| -> Result<u32> {
            inst.operands
                .get(2 + index)
                .and_then(operand_id)
                .ok_or_else(|| Error::msg("malformed OpExtInst operand"))
        };

        let mut assign_result = true;
        let sval;

        if let Some(name) = EXT_UNARY.get(&ext) {
            sval = self.src_call(name, &[arg(0)?]);
        } else if let Some(op) = EXT_BINARY.get(&ext) {
            let (x, y) = (arg(0)?, arg(1)?);
            if op.signed {
                sval = self.src_as(rtype, &self.src_call_signed(ir, op.name, &[x, y])?)?;
            } else {
                sval = self.src_call(op.name, &[x, y]);
            }
        } else if let Some(op) = EXT_TERNARY.get(&ext) {
            let (a, b, c) = (arg(0)?, arg(1)?, arg(2)?);
            if op.signed {
                sval = self.src_as(rtype, &self.src_call_signed(ir, op.name, &[a, b, c])?)?;
            } else {
                sval = self.src_call(op.name, &[a, b, c]);
            }
        } else {
            match ext {
                VLOADN => {
                    let n = operand_word(&inst.operands[4])
                        .ok_or_else(|| Error::msg("malformed vloadn"))?;
                    sval = self.src_call(&format!("vload{n}"), &[arg(0)?, arg(1)?]);
                }
                VLOAD_HALFN => {
                    let n = operand_word(&inst.operands[4])
                        .ok_or_else(|| Error::msg("malformed vload_halfn"))?;
                    sval = self.src_call(&format!("vload_half{n}"), &[arg(0)?, arg(1)?]);
                }
                VLOADA_HALFN => {
                    let n = operand_word(&inst.operands[4])
                        .ok_or_else(|| Error::msg("malformed vloada_halfn"))?;
                    sval = self.src_call(&format!("vloada_half{n}"), &[arg(0)?, arg(1)?]);
                }
                VSTOREN => {
                    assign_result = false;
                    let data = arg(0)?;
                    let n = self.vector_count_of(ir, data)?;
                    sval = self.src_call(&format!("vstore{n}"), &[data, arg(1)?, arg(2)?]);
                }
                VSTORE_HALF => {
                    assign_result = false;
                    sval = self.src_call("vstore_half", &[arg(0)?, arg(1)?, arg(2)?]);
                }
                VSTORE_HALF_R => {
                    assign_result = false;
                    let mode = operand_word(&inst.operands[5])
                        .ok_or_else(|| Error::msg("malformed vstore_half_r"))?;
                    let suffix = rounding_suffix_from_word(mode)?;
                    sval = self.src_call(
                        &format!("vstore_half_{suffix}"),
                        &[arg(0)?, arg(1)?, arg(2)?],
                    );
                }
                VSTORE_HALFN => {
                    assign_result = false;
                    let data = arg(0)?;
                    let n = self.vector_count_of(ir, data)?;
                    sval = self.src_call(&format!("vstore_half{n}"), &[data, arg(1)?, arg(2)?]);
                }
                VSTOREA_HALFN => {
                    assign_result = false;
                    let data = arg(0)?;
                    let n = self.vector_count_of(ir, data)?;
                    sval = self.src_call(&format!("vstorea_half{n}"), &[data, arg(1)?, arg(2)?]);
                }
                VSTOREA_HALFN_R => {
                    assign_result = false;
                    let data = arg(0)?;
                    let n = self.vector_count_of(ir, data)?;
                    let mode = operand_word(&inst.operands[5])
                        .ok_or_else(|| Error::msg("malformed vstorea_halfn_r"))?;
                    let suffix = rounding_suffix_from_word(mode)?;
                    sval = self.src_call(
                        &format!("vstorea_half{n}_{suffix}"),
                        &[data, arg(1)?, arg(2)?],
                    );
                }
                S_ABS => {
                    sval = self.src_call_signed(ir, "abs", &[arg(0)?])?;
                }
                S_ABS_DIFF => {
                    sval = self.src_call_signed(ir, "abs_diff", &[arg(0)?, arg(1)?])?;
                }
                FREXP => {
                    let (x, exp) = (arg(0)?, arg(1)?);
                    let exp_cast = self.src_cast_signed(ir.type_id_of(exp)?, exp)?;
                    sval = self.src_call_str("frexp", &format!("{}, {exp_cast}", self.var_for(x)));
                }
                LGAMMA_R => {
                    let (x, signp) = (arg(0)?, arg(1)?);
                    let signp_cast = self.src_cast_signed(ir.type_id_of(signp)?, signp)?;
                    sval =
                        self.src_call_str("lgamma_r", &format!("{}, {signp_cast}", self.var_for(x)));
                }
                REMQUO => {
                    let (x, y, quo) = (arg(0)?, arg(1)?, arg(2)?);
                    let quo_cast = self.src_cast_signed(ir.type_id_of(quo)?, quo)?;
                    sval = self.src_call_str(
                        "remquo",
                        &format!("{}, {}, {quo_cast}", self.var_for(x), self.var_for(y)),
                    );
                }
                PRINTF => {
                    let args = inst.operands[2..]
                        .iter()
                        .filter_map(operand_id)
                        .map(|id| self.var_for(id))
                        .collect::<Vec<_>>()
                        .join(", ");
                    sval = self.src_call_str("printf", &args);
                }
                other => return Err(Error::UnsupportedExtInst(other)),
            }
        }

        if let (Some(result), true) = (result, assign_result) {
            let decl = self.src_var_decl_for(ir, result)?;
            return Ok(Some(format!("{decl} = {sval}")));
        }
        return Ok(Some(sval));
    }

    fn vector_count_of(&self, ir: &Ir, val: u32) -> Result<u32> {
        match ir.type_view_of_val(val)? {
            TypeView::Vector { count, .. } => Ok(count),
            _ => Err(Error::msg(format!("value %{val} is not a vector"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_entries_bridge_through_reinterprets() {
        assert!(EXT_TERNARY[&(CLOp::s_clamp as u32)].signed);
        assert_eq!(EXT_TERNARY[&(CLOp::s_clamp as u32)].name, "clamp");
        assert!(!EXT_TERNARY[&(CLOp::u_clamp as u32)].signed);
        assert!(EXT_BINARY[&(CLOp::s_max as u32)].signed);
        assert!(!EXT_BINARY[&(CLOp::fmin as u32)].signed);
    }

    #[test]
    fn sign_agnostic_abs_goes_through_the_unsigned_table() {
        assert_eq!(EXT_UNARY[&(CLOp::u_abs as u32)], "abs");
        assert!(!EXT_UNARY.contains_key(&(CLOp::s_abs as u32)));
    }
}
