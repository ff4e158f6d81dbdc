//! A one-shot SPIR-V → OpenCL C source translator.
//!
//! [`Translator`] ingests a validated SPIR-V module targeting the OpenCL
//! execution environment, as a binary word stream or textual assembly,
//! and emits semantically equivalent OpenCL C source for a downstream
//! OpenCL compiler. Unsupported constructs fail the translation rather
//! than being guessed at; no partial output is ever returned.
//!
//! ```no_run
//! use spirv2clc::{Translator, version::TargetEnv};
//!
//! let mut translator = Translator::new(TargetEnv::OpenCL1_2);
//! let _source = translator.translate_words(&[/* SPIR-V words */])?;
//! # Ok::<(), spirv2clc::Error>(())
//! ```

pub mod error;
pub mod ir;
pub mod version;

mod decoration;
mod extinst;
mod function;
mod header;
mod ident;
mod instruction;
mod sink;
mod translator;
mod types;

pub use error::{Error, Result};
pub use translator::Translator;
pub use version::TargetEnv;
