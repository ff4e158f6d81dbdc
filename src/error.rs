use rspirv::spirv::{
    AddressingModel, BuiltIn, Capability, Decoration, ExecutionMode, ExecutionModel, MemoryModel,
    Op, StorageClass, Word,
};
use std::borrow::Cow;

pub type Result<T, E = Error> = ::core::result::Result<T, E>;

#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// The external validator rejected the module.
    #[error("invalid SPIR-V module: {0}")]
    InvalidModule(String),
    #[error("unsupported capability {0:?}")]
    UnsupportedCapability(Capability),
    #[error("unsupported extension '{0}'")]
    UnsupportedExtension(String),
    #[error("unsupported extended instruction set '{0}'")]
    UnsupportedExtInstSet(String),
    #[error("unsupported memory model {addressing:?} {memory:?}")]
    UnsupportedMemoryModel {
        addressing: AddressingModel,
        memory: MemoryModel,
    },
    #[error("unsupported execution model {0:?}")]
    UnsupportedExecutionModel(ExecutionModel),
    #[error("unsupported execution mode {0:?}")]
    UnsupportedExecutionMode(ExecutionMode),
    #[error("unsupported decoration {0:?}")]
    UnsupportedDecoration(Decoration),
    #[error("unsupported built-in {0:?}")]
    UnsupportedBuiltIn(BuiltIn),
    #[error("unsupported storage class {0:?} for a module-scope variable")]
    UnsupportedGlobalStorage(StorageClass),
    #[error("unsupported pointer storage class {0:?}")]
    UnsupportedPointerStorage(StorageClass),
    #[error("unsupported barrier combination at id %{0}")]
    UnsupportedBarrier(Word),
    #[error("unsupported image shape at type id %{0}")]
    UnsupportedImageShape(Word),
    #[error("unsupported access chain index at id %{0}")]
    UnsupportedChainIndex(Word),
    #[error("unsupported OpenCL.std instruction {0}")]
    UnsupportedExtInst(u32),
    #[error("unsupported instruction {0:?}")]
    UnsupportedOpcode(Op),
    #[error("malformed constant at id %{0}")]
    MalformedConstant(Word),
    #[error("{0}")]
    Custom(Cow<'static, str>),
}

impl Error {
    #[inline]
    pub fn msg(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::Custom(msg.into())
    }

    pub fn unknown_id(id: Word) -> Self {
        Self::msg(format!("id %{id} has no definition in this module"))
    }

    pub fn unknown_type(id: Word) -> Self {
        Self::msg(format!("type id %{id} has no source spelling"))
    }

    pub fn unknown_signed_type(id: Word) -> Self {
        Self::msg(format!("type id %{id} has no signed source spelling"))
    }
}
