use crate::{
    error::{Error, Result},
    version::TargetEnv,
};
use rspirv::{
    dr::{self, Operand},
    spirv::{AccessQualifier, Dim, Op, StorageClass, Word},
};
use spirv_tools::assembler::{self, Assembler};
use spirv_tools::val::{self, Validator};
use std::collections::HashMap;

/// A validated, in-memory SPIR-V module plus the per-id lookups the
/// translation passes need. This is the only component that talks to the
/// external validator.
pub struct Ir {
    module: dr::Module,
    defs: HashMap<Word, dr::Instruction>,
}

/// Sum-typed view over a type declaration, resolved from the raw
/// instruction at query time.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeView {
    Void,
    Bool,
    Int {
        width: u32,
    },
    Float {
        width: u32,
    },
    Vector {
        elem: Word,
        count: u32,
    },
    Pointer {
        storage: StorageClass,
        pointee: Word,
    },
    Array {
        elem: Word,
        length: Word,
    },
    Struct {
        members: Vec<Word>,
    },
    Image {
        dim: Dim,
        depth: u32,
        arrayed: u32,
        ms: u32,
        sampled: u32,
        access: AccessQualifier,
    },
    SampledImage {
        image: Word,
    },
    Sampler,
    Event,
    Opaque {
        name: String,
    },
    Function,
}

impl Ir {
    /// Parses and validates a raw word stream. The validator runs on the
    /// words exactly as received; rejection surfaces as [`Error::InvalidModule`].
    pub fn from_words(words: &[u32], env: TargetEnv) -> Result<Self> {
        let validator = val::create(Some(env.into()));
        validator
            .validate(words, None)
            .map_err(|err| Error::InvalidModule(err.to_string()))?;

        let mut loader = dr::Loader::new();
        rspirv::binary::parse_words(words, &mut loader)
            .map_err(|err| Error::InvalidModule(err.to_string()))?;
        let module = loader.module();

        let defs = index_defs(&module);
        return Ok(Self { module, defs });
    }

    /// Assembles textual SPIR-V assembly to binary, then goes through the
    /// same validation gate as word input.
    pub fn from_assembly(text: &str, env: TargetEnv) -> Result<Self> {
        let assembler = assembler::create(Some(env.into()));
        let binary = assembler
            .assemble(text, assembler::AssemblerOptions::default())
            .map_err(|err| Error::InvalidModule(err.to_string()))?;
        return Self::from_words(&binary_words(binary), env);
    }

    pub fn module(&self) -> &dr::Module {
        &self.module
    }

    /// The defining instruction of `id`, if any.
    pub fn def(&self, id: Word) -> Option<&dr::Instruction> {
        self.defs.get(&id)
    }

    pub fn def_opcode(&self, id: Word) -> Option<Op> {
        self.def(id).map(|inst| inst.class.opcode)
    }

    /// The type id of a value id.
    pub fn type_id_of(&self, val: Word) -> Result<Word> {
        self.def(val)
            .and_then(|inst| inst.result_type)
            .ok_or_else(|| Error::unknown_id(val))
    }

    pub fn type_view_of_val(&self, val: Word) -> Result<TypeView> {
        self.type_view(self.type_id_of(val)?)
    }

    /// Resolves a type id into its [`TypeView`].
    pub fn type_view(&self, tyid: Word) -> Result<TypeView> {
        let inst = self.def(tyid).ok_or_else(|| Error::unknown_id(tyid))?;
        let view = match inst.class.opcode {
            Op::TypeVoid => TypeView::Void,
            Op::TypeBool => TypeView::Bool,
            Op::TypeInt => TypeView::Int {
                width: operand_word(&inst.operands[0]).ok_or(Error::MalformedConstant(tyid))?,
            },
            Op::TypeFloat => TypeView::Float {
                width: operand_word(&inst.operands[0]).ok_or(Error::MalformedConstant(tyid))?,
            },
            Op::TypeVector => TypeView::Vector {
                elem: operand_id(&inst.operands[0]).ok_or_else(|| Error::unknown_id(tyid))?,
                count: operand_word(&inst.operands[1]).ok_or(Error::MalformedConstant(tyid))?,
            },
            Op::TypePointer => TypeView::Pointer {
                storage: match inst.operands[0] {
                    Operand::StorageClass(sc) => sc,
                    _ => return Err(Error::unknown_id(tyid)),
                },
                pointee: operand_id(&inst.operands[1]).ok_or_else(|| Error::unknown_id(tyid))?,
            },
            Op::TypeArray => TypeView::Array {
                elem: operand_id(&inst.operands[0]).ok_or_else(|| Error::unknown_id(tyid))?,
                length: operand_id(&inst.operands[1]).ok_or_else(|| Error::unknown_id(tyid))?,
            },
            Op::TypeStruct => TypeView::Struct {
                members: inst.operands.iter().filter_map(operand_id).collect(),
            },
            Op::TypeImage => TypeView::Image {
                dim: match inst.operands[1] {
                    Operand::Dim(dim) => dim,
                    _ => return Err(Error::UnsupportedImageShape(tyid)),
                },
                depth: operand_word(&inst.operands[2]).unwrap_or(0),
                arrayed: operand_word(&inst.operands[3]).unwrap_or(0),
                ms: operand_word(&inst.operands[4]).unwrap_or(0),
                sampled: operand_word(&inst.operands[5]).unwrap_or(0),
                access: match inst.operands.get(7) {
                    Some(Operand::AccessQualifier(qual)) => *qual,
                    _ => AccessQualifier::ReadOnly,
                },
            },
            Op::TypeSampledImage => TypeView::SampledImage {
                image: operand_id(&inst.operands[0]).ok_or_else(|| Error::unknown_id(tyid))?,
            },
            Op::TypeSampler => TypeView::Sampler,
            Op::TypeEvent => TypeView::Event,
            Op::TypeOpaque => TypeView::Opaque {
                name: match &inst.operands[0] {
                    Operand::LiteralString(name) => name.clone(),
                    _ => return Err(Error::unknown_id(tyid)),
                },
            },
            Op::TypeFunction => TypeView::Function,
            other => return Err(Error::UnsupportedOpcode(other)),
        };
        return Ok(view);
    }

    /// Zero-extended value of an integer constant id, when `id` names one.
    pub fn constant_value(&self, id: Word) -> Option<u64> {
        let inst = self.def(id)?;
        match inst.class.opcode {
            Op::Constant => match inst.operands.first()? {
                Operand::LiteralInt32(x) => Some(*x as u64),
                Operand::LiteralInt64(x) => Some(*x),
                _ => None,
            },
            Op::ConstantNull | Op::ConstantFalse => Some(0),
            Op::ConstantTrue => Some(1),
            _ => None,
        }
    }

    /// Element count of an array type, through its length-constant id.
    pub fn array_length(&self, array_tyid: Word) -> Result<u64> {
        match self.type_view(array_tyid)? {
            TypeView::Array { length, .. } => self
                .constant_value(length)
                .ok_or(Error::MalformedConstant(length)),
            _ => Err(Error::unknown_type(array_tyid)),
        }
    }

    /// Looks a function up by its `OpFunction` result id.
    pub fn function(&self, id: Word) -> Option<&dr::Function> {
        self.module
            .functions
            .iter()
            .find(|func| func.def.as_ref().and_then(|def| def.result_id) == Some(id))
    }
}

/// The id carried by an operand, for the operand kinds that reference one.
pub fn operand_id(op: &Operand) -> Option<Word> {
    match op {
        Operand::IdRef(id) | Operand::IdScope(id) | Operand::IdMemorySemantics(id) => Some(*id),
        _ => None,
    }
}

/// The raw word of a literal-ish operand. Extended-instruction operands that
/// are literals in the extended grammar arrive as `IdRef` from the parser,
/// so those are accepted here too.
pub fn operand_word(op: &Operand) -> Option<u32> {
    match op {
        Operand::IdRef(x)
        | Operand::LiteralInt32(x)
        | Operand::LiteralExtInstInteger(x)
        | Operand::IdScope(x)
        | Operand::IdMemorySemantics(x) => Some(*x),
        Operand::LiteralInt64(x) => Some(*x as u32),
        _ => None,
    }
}

fn index_defs(module: &dr::Module) -> HashMap<Word, dr::Instruction> {
    let mut defs = HashMap::new();
    let mut record = |inst: &dr::Instruction| {
        if let Some(id) = inst.result_id {
            defs.insert(id, inst.clone());
        }
    };

    for inst in &module.ext_inst_imports {
        record(inst);
    }
    for inst in &module.debug_string_source {
        record(inst);
    }
    for inst in &module.types_global_values {
        record(inst);
    }
    for func in &module.functions {
        if let Some(def) = &func.def {
            record(def);
        }
        for param in &func.parameters {
            record(param);
        }
        for block in &func.blocks {
            if let Some(label) = &block.label {
                record(label);
            }
            for inst in &block.instructions {
                record(inst);
            }
        }
    }

    return defs;
}

fn binary_words(binary: spirv_tools::binary::Binary) -> Vec<u32> {
    use spirv_tools::binary::Binary;

    return match binary {
        Binary::External(words) => AsRef::<[u32]>::as_ref(&words).to_vec(),
        Binary::OwnedU32(words) => words,
        Binary::OwnedU8(bytes) => bytes
            .chunks_exact(4)
            .map(|chunk| u32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect(),
    };
}
