use crate::{
    error::{Error, Result},
    ir::{Ir, TypeView},
    sink::SourceSink,
    version::TargetEnv,
};
use rspirv::spirv::{BuiltIn, FPRoundingMode, StorageClass, Word};
use std::collections::{HashMap, HashSet};
use tracing::{error, warn};

/// One-shot SPIR-V → OpenCL C translator.
///
/// A single instance can translate any number of modules sequentially; all
/// per-id tables are wiped at each `translate_*` entry. Instances are not
/// shared between threads; embedders running concurrent translations keep
/// one translator per call.
pub struct Translator {
    target_env: TargetEnv,
    pub(crate) src: SourceSink,
    /// Sanitised OpName strings.
    pub(crate) names: HashMap<Word, String>,
    /// Canonical (unsigned) source spelling per type id.
    pub(crate) types: HashMap<Word, String>,
    /// Signed mirror, present when the base type admits one.
    pub(crate) types_signed: HashMap<Word, String>,
    /// Pre-rendered constant expressions.
    pub(crate) literals: HashMap<Word, String>,
    pub(crate) entry_points: HashMap<Word, String>,
    pub(crate) local_sizes: HashMap<Word, (u32, u32, u32)>,
    pub(crate) contraction_off: HashSet<Word>,
    pub(crate) builtin_vars: HashMap<Word, BuiltIn>,
    /// Built-in kinds propagated through `OpLoad` of a built-in variable.
    pub(crate) builtin_vals: HashMap<Word, BuiltIn>,
    pub(crate) rounding_modes: HashMap<Word, FPRoundingMode>,
    pub(crate) saturated: HashSet<Word>,
    pub(crate) exports: HashMap<Word, String>,
    pub(crate) imports: HashMap<Word, String>,
    pub(crate) restricts: HashSet<Word>,
    pub(crate) volatiles: HashSet<Word>,
    pub(crate) packed: HashSet<Word>,
    pub(crate) nowrite_params: HashSet<Word>,
    pub(crate) alignments: HashMap<Word, u32>,
    pub(crate) sampled_images: HashMap<Word, (Word, Word)>,
    /// Integer type standing in for a SPIR-V bool value.
    pub(crate) boolean_src_types: HashMap<Word, String>,
    /// Declaration text of Workgroup-storage globals, re-emitted inside
    /// every kernel whose call tree reaches them.
    pub(crate) local_var_decls: HashMap<Word, String>,
    /// phi result ids of the function currently being emitted.
    pub(crate) phi_vals: Vec<Word>,
    /// (phi, incoming value) pairs per predecessor block label id.
    pub(crate) phi_assigns: HashMap<Word, Vec<(Word, Word)>>,
}

impl Default for Translator {
    fn default() -> Self {
        Self::new(TargetEnv::default())
    }
}

impl Translator {
    pub fn new(target_env: TargetEnv) -> Self {
        return Self {
            target_env,
            src: SourceSink::new(),
            names: HashMap::new(),
            types: HashMap::new(),
            types_signed: HashMap::new(),
            literals: HashMap::new(),
            entry_points: HashMap::new(),
            local_sizes: HashMap::new(),
            contraction_off: HashSet::new(),
            builtin_vars: HashMap::new(),
            builtin_vals: HashMap::new(),
            rounding_modes: HashMap::new(),
            saturated: HashSet::new(),
            exports: HashMap::new(),
            imports: HashMap::new(),
            restricts: HashSet::new(),
            volatiles: HashSet::new(),
            packed: HashSet::new(),
            nowrite_params: HashSet::new(),
            alignments: HashMap::new(),
            sampled_images: HashMap::new(),
            boolean_src_types: HashMap::new(),
            local_var_decls: HashMap::new(),
            phi_vals: Vec::new(),
            phi_assigns: HashMap::new(),
        };
    }

    pub fn target_env(&self) -> TargetEnv {
        self.target_env
    }

    /// Translates a binary SPIR-V word stream to OpenCL C source.
    pub fn translate_words(&mut self, words: &[u32]) -> Result<String> {
        let result = Ir::from_words(words, self.target_env)
            .and_then(|ir| self.translate_module(&ir));
        if let Err(ref err) = result {
            error!("translation failed: {err}");
        }
        return result;
    }

    /// Translates textual SPIR-V assembly to OpenCL C source.
    pub fn translate_assembly(&mut self, assembly: &str) -> Result<String> {
        let result = Ir::from_assembly(assembly, self.target_env)
            .and_then(|ir| self.translate_module(&ir));
        if let Err(ref err) = result {
            error!("translation failed: {err}");
        }
        return result;
    }

    fn translate_module(&mut self, ir: &Ir) -> Result<String> {
        self.reset();

        self.translate_capabilities(ir)?;
        self.translate_extensions(ir)?;
        self.translate_ext_inst_imports(ir)?;
        self.translate_memory_model(ir)?;
        self.translate_entry_points(ir)?;
        self.translate_execution_modes(ir)?;
        self.translate_debug(ir)?;
        self.translate_annotations(ir)?;
        self.translate_types_values(ir)?;

        for func in &ir.module().functions {
            self.translate_function(ir, func)?;
        }

        return Ok(self.src.take());
    }

    fn reset(&mut self) {
        self.src.clear();
        self.names.clear();
        self.types.clear();
        self.types_signed.clear();
        self.literals.clear();
        self.entry_points.clear();
        self.local_sizes.clear();
        self.contraction_off.clear();
        self.builtin_vars.clear();
        self.builtin_vals.clear();
        self.rounding_modes.clear();
        self.saturated.clear();
        self.exports.clear();
        self.imports.clear();
        self.restricts.clear();
        self.volatiles.clear();
        self.packed.clear();
        self.nowrite_params.clear();
        self.alignments.clear();
        self.sampled_images.clear();
        self.boolean_src_types.clear();
        self.local_var_decls.clear();
        self.phi_vals.clear();
        self.phi_assigns.clear();
    }

    /// The source symbol an id resolves to: literal, linkage name, debug
    /// name, `get_work_dim()` for that built-in, or the canonical `v<id>`.
    pub(crate) fn var_for(&self, id: Word) -> String {
        if let Some(literal) = self.literals.get(&id) {
            return literal.clone();
        }
        if let Some(name) = self.exports.get(&id) {
            return name.clone();
        }
        if let Some(name) = self.imports.get(&id) {
            return name.clone();
        }
        if let Some(name) = self.names.get(&id) {
            return name.clone();
        }
        if let Some(builtin) = self.builtin_vals.get(&id) {
            match builtin {
                BuiltIn::WorkDim => return String::from("get_work_dim()"),
                other => warn!("built-in {other:?} used as a plain value"),
            }
        }
        return format!("v{id}");
    }

    pub(crate) fn src_type(&self, tyid: Word) -> Result<&str> {
        self.types
            .get(&tyid)
            .map(String::as_str)
            .ok_or_else(|| Error::unknown_type(tyid))
    }

    pub(crate) fn src_type_signed(&self, tyid: Word) -> Result<&str> {
        self.types_signed
            .get(&tyid)
            .map(String::as_str)
            .ok_or_else(|| Error::unknown_signed_type(tyid))
    }

    /// Emitted type of a value: its boolean shadow type when stamped, the
    /// canonical type spelling otherwise.
    pub(crate) fn src_type_for_value(&self, ir: &Ir, val: Word) -> Result<String> {
        if let Some(shadow) = self.boolean_src_types.get(&val) {
            return Ok(shadow.clone());
        }
        return Ok(self.src_type(ir.type_id_of(val)?)?.to_owned());
    }

    pub(crate) fn src_vec_comp(&self, val: Word, comp: u32) -> String {
        format!("{}.s{comp:x}", self.var_for(val))
    }

    pub(crate) fn src_as(&self, tyid: Word, expr: &str) -> Result<String> {
        Ok(format!("as_{}({expr})", self.src_type(tyid)?))
    }

    pub(crate) fn src_as_id(&self, tyid: Word, val: Word) -> Result<String> {
        self.src_as(tyid, &self.var_for(val))
    }

    pub(crate) fn src_as_signed(&self, ir: &Ir, val: Word) -> Result<String> {
        let tyid = ir.type_id_of(val)?;
        return Ok(format!(
            "as_{}({})",
            self.src_type_signed(tyid)?,
            self.var_for(val)
        ));
    }

    pub(crate) fn src_cast(&self, tyid: Word, expr: &str) -> Result<String> {
        Ok(format!("(({}){expr})", self.src_type(tyid)?))
    }

    pub(crate) fn src_cast_id(&self, tyid: Word, val: Word) -> Result<String> {
        self.src_cast(tyid, &self.var_for(val))
    }

    pub(crate) fn src_cast_signed(&self, tyid: Word, val: Word) -> Result<String> {
        Ok(format!(
            "(({}){})",
            self.src_type_signed(tyid)?,
            self.var_for(val)
        ))
    }

    pub(crate) fn src_convert(&self, val: Word, tyid: Word) -> Result<String> {
        Ok(format!(
            "convert_{}({})",
            self.src_type(tyid)?,
            self.var_for(val)
        ))
    }

    pub(crate) fn src_convert_signed(&self, ir: &Ir, val: Word, tyid: Word) -> Result<String> {
        Ok(format!(
            "convert_{}({})",
            self.src_type_signed(tyid)?,
            self.src_as_signed(ir, val)?
        ))
    }

    pub(crate) fn src_call(&self, name: &str, args: &[Word]) -> String {
        let args = args
            .iter()
            .map(|arg| self.var_for(*arg))
            .collect::<Vec<_>>()
            .join(", ");
        return format!("{name}({args})");
    }

    pub(crate) fn src_call_str(&self, name: &str, args: &str) -> String {
        format!("{name}({args})")
    }

    pub(crate) fn src_call_signed(&self, ir: &Ir, name: &str, args: &[Word]) -> Result<String> {
        let args = args
            .iter()
            .map(|arg| self.src_as_signed(ir, *arg))
            .collect::<Result<Vec<_>>>()?
            .join(", ");
        return Ok(format!("{name}({args})"));
    }

    /// `<type> <name>` declaration text, array-aware. When `val` is given the
    /// type spelling honours the value's boolean shadow type.
    pub(crate) fn src_var_decl(
        &self,
        ir: &Ir,
        tyid: Word,
        name: &str,
        val: Option<Word>,
    ) -> Result<String> {
        if let TypeView::Array { elem, length } = ir.type_view(tyid)? {
            let count = ir
                .constant_value(length)
                .ok_or(Error::MalformedConstant(length))?;
            return Ok(format!("{} {name}[{count}]", self.src_type(elem)?));
        }
        let ty = match val {
            Some(val) => self.src_type_for_value(ir, val)?,
            None => self.src_type(tyid)?.to_owned(),
        };
        return Ok(format!("{ty} {name}"));
    }

    pub(crate) fn src_var_decl_for(&self, ir: &Ir, val: Word) -> Result<String> {
        let tyid = ir.type_id_of(val)?;
        return self.src_var_decl(ir, tyid, &self.var_for(val), Some(val));
    }

    /// Memory-object declaration form: type, restrict/volatile/alignment
    /// qualifiers, name, and the literal array length when applicable.
    pub(crate) fn src_mem_object_decl(
        &self,
        ir: &Ir,
        tyid: Word,
        val: Word,
        name: &str,
    ) -> Result<String> {
        let view = ir.type_view(tyid)?;
        let mut decl = match view {
            TypeView::Array { elem, .. } => self.src_type(elem)?.to_owned(),
            _ => self.src_type(tyid)?.to_owned(),
        };
        if self.restricts.contains(&val) {
            decl.push_str(" restrict");
        }
        if self.volatiles.contains(&val) {
            decl.push_str(" volatile");
        }
        if let Some(align) = self.alignments.get(&val) {
            decl.push_str(&format!(" __attribute__((aligned({align})))"));
        }
        decl.push(' ');
        decl.push_str(name);
        if matches!(view, TypeView::Array { .. }) {
            decl.push_str(&format!("[{}]", ir.array_length(tyid)?));
        }
        return Ok(decl);
    }

    pub(crate) fn src_mem_object_decl_for(&self, ir: &Ir, tyid: Word, val: Word) -> Result<String> {
        self.src_mem_object_decl(ir, tyid, val, &self.var_for(val))
    }

    /// Source spelling of a pointer type: pointee (or array element), then
    /// the address-space qualifier of the storage class, then `*`.
    pub(crate) fn src_pointer_type(
        &self,
        ir: &Ir,
        storage: StorageClass,
        tyid: Word,
        signed: bool,
    ) -> Result<String> {
        let mut typestr = match ir.type_view(tyid)? {
            TypeView::Array { elem, .. } => self.src_type(elem)?.to_owned(),
            _ if signed => self.src_type_signed(tyid)?.to_owned(),
            _ => self.src_type(tyid)?.to_owned(),
        };
        typestr.push(' ');
        match storage {
            StorageClass::CrossWorkgroup => typestr.push_str("global"),
            StorageClass::UniformConstant => typestr.push_str("constant"),
            StorageClass::Workgroup => typestr.push_str("local"),
            StorageClass::Input | StorageClass::Function => {}
            other => return Err(Error::UnsupportedPointerStorage(other)),
        }
        typestr.push('*');
        return Ok(typestr);
    }

    /// Integer stand-in type for a boolean produced from `val`'s operands:
    /// lane width follows the operand type, scalar booleans are `int`.
    pub(crate) fn src_type_boolean_for_val(&self, ir: &Ir, val: Word) -> Result<String> {
        if let Some(shadow) = self.boolean_src_types.get(&val) {
            return Ok(shadow.clone());
        }

        let view = ir.type_view_of_val(val)?;
        let TypeView::Vector { elem, count } = view else {
            return Ok(String::from("int"));
        };

        let base = match ir.type_view(elem)? {
            TypeView::Int { width: 8 } => "char",
            TypeView::Int { width: 16 } => "short",
            TypeView::Int { width: 32 } => "int",
            TypeView::Int { width: 64 } => "long",
            TypeView::Float { width: 16 } => "short",
            TypeView::Float { width: 32 } => "int",
            TypeView::Float { width: 64 } => "long",
            _ => {
                return Err(Error::msg(format!(
                    "no boolean stand-in type for value %{val}"
                )))
            }
        };
        return Ok(format!("{base}{count}"));
    }
}

/// Suffix spelling of an FP rounding mode in `convert_*`/`vstore_half_*`.
pub(crate) fn rounding_suffix(mode: FPRoundingMode) -> &'static str {
    match mode {
        FPRoundingMode::RTE => "rte",
        FPRoundingMode::RTZ => "rtz",
        FPRoundingMode::RTP => "rtp",
        FPRoundingMode::RTN => "rtn",
    }
}
