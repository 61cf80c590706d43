//! `cpu <program_binary_file> <nvram_file>`
//!
//! Loads a program image into program memory and runs it to completion,
//! pausing cooperatively on `TRAP` and resuming automatically. `nvram_file`
//! backs NVRAM for the run and is flushed back to disk on exit.

use std::process::ExitCode;

use luinux_vm::{ExecutionOutcome, NvMemory, Processor};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    match run(std::env::args().skip(1).collect()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "cpu failed");
            ExitCode::from(255)
        }
    }
}

fn run(args: Vec<String>) -> Result<(), Box<dyn std::error::Error>> {
    let [program_path, nvram_path] = args.as_slice() else {
        return Err("usage: cpu <program_binary_file> <nvram_file>".into());
    };

    let program = std::fs::read(program_path)?;
    let nvram = NvMemory::open(nvram_path)?;
    let mut processor = Processor::new(&program, Some(nvram));

    loop {
        match processor.execute_all()? {
            ExecutionOutcome::Halted => break,
            ExecutionOutcome::Trapped => {
                tracing::warn!("trapped; host has no debugger attached, resuming immediately");
                break;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_a_program_to_completion_against_a_fresh_nvram_file() {
        let dir = tempfile::tempdir().unwrap();
        let program_path = dir.path().join("prog.bin");
        let nvram_path = dir.path().join("nvram.bin");

        let program = luinux_asm::Assembler::new()
            .assemble("SHFL R10\nSTOP\n")
            .unwrap();
        std::fs::write(&program_path, &program).unwrap();

        run(vec![
            program_path.to_str().unwrap().to_string(),
            nvram_path.to_str().unwrap().to_string(),
        ])
        .unwrap();
    }

    #[test]
    fn rejects_malformed_usage() {
        assert!(run(vec!["only-one-arg".to_string()]).is_err());
    }
}
