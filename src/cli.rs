use clap::Parser;
use color_eyre::eyre::eyre;
use spirv2clc::{version::TargetEnv, Translator};
use std::{fs, path::PathBuf};

/// Translate a SPIR-V module to OpenCL C source on standard output.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// File to be translated. A binary SPIR-V module unless --asm is given.
    input: PathBuf,

    /// Treat the input as textual SPIR-V assembly
    #[arg(long, default_value_t = false)]
    asm: bool,

    /// Target OpenCL environment (1.2, 2.0, 2.1, 2.2)
    #[arg(long, default_value_t = TargetEnv::OpenCL1_2)]
    target_env: TargetEnv,

    /// Disables logging
    #[arg(long, short, default_value_t = false)]
    quiet: bool,
}

pub fn main() -> color_eyre::Result<()> {
    let _ = color_eyre::install();

    let Cli {
        input,
        asm,
        target_env,
        quiet,
    } = Cli::parse();

    if !quiet {
        let _ = tracing_subscriber::fmt::try_init();
    }

    let mut translator = Translator::new(target_env);
    let source = if asm {
        let text = fs::read_to_string(&input)?;
        translator.translate_assembly(&text)
    } else {
        let bytes = fs::read(&input)?;
        if bytes.len() % 4 != 0 {
            return Err(eyre!(
                "{} is not a SPIR-V binary: length is not a multiple of 4",
                input.display()
            ));
        }
        let words = bytes
            .chunks_exact(4)
            .map(|chunk| u32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect::<Vec<_>>();
        translator.translate_words(&words)
    };

    match source {
        Ok(source) => {
            println!("{source}");
            return Ok(());
        }
        Err(err) => {
            eprintln!("Failed to translate module: {err}");
            std::process::exit(1);
        }
    }
}
