//! `assembler <input_source_file> <output_binary_file> [x]`
//!
//! Assembles a luinux source file into its binary image. With the
//! trailing `x` flag, also prints the assembled payload as escaped hex
//! (`\xAB\xCD…`) to stdout after writing the output file.

use std::fmt::Write as _;
use std::process::ExitCode;

use luinux_asm::Assembler;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    match run(std::env::args().skip(1).collect()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "assembler failed");
            // `-1` as an exit code, per the contract; ExitCode only exposes
            // u8, so this is its wrapped representation.
            ExitCode::from(255)
        }
    }
}

fn run(args: Vec<String>) -> Result<(), Box<dyn std::error::Error>> {
    let (input_path, output_path, hex_dump) = match args.as_slice() {
        [input, output] => (input, output, false),
        [input, output, flag] if flag == "x" => (input, output, true),
        _ => return Err("usage: assembler <input_source_file> <output_binary_file> [x]".into()),
    };

    let source = std::fs::read_to_string(input_path)?;
    let bytes = Assembler::new().assemble(&source)?;
    std::fs::write(output_path, &bytes)?;
    tracing::debug!(bytes = bytes.len(), output = %output_path, "wrote binary image");

    if hex_dump {
        let mut escaped = String::with_capacity(bytes.len() * 4);
        for byte in &bytes {
            write!(escaped, "\\x{byte:02X}")?;
        }
        println!("{escaped}");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assembles_a_source_file_to_its_binary_image() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("prog.asm");
        let output = dir.path().join("prog.bin");
        std::fs::write(&input, "SHFL R10\nSTOP\n").unwrap();

        run(vec![
            input.to_str().unwrap().to_string(),
            output.to_str().unwrap().to_string(),
        ])
        .unwrap();

        let bytes = std::fs::read(&output).unwrap();
        assert_eq!(bytes, vec![0x76, 0x7f, 0x76, 0x91]);
    }

    #[test]
    fn rejects_malformed_usage() {
        assert!(run(vec!["only-one-arg".to_string()]).is_err());
    }

    #[test]
    fn the_x_flag_hex_dump_path_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("prog.asm");
        let output = dir.path().join("prog.bin");
        std::fs::write(&input, "SHFL R10\nSTOP\n").unwrap();

        run(vec![
            input.to_str().unwrap().to_string(),
            output.to_str().unwrap().to_string(),
            "x".to_string(),
        ])
        .unwrap();
    }

    #[test]
    fn propagates_assemble_errors() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("prog.asm");
        let output = dir.path().join("prog.bin");
        std::fs::write(&input, "FROB R0\n").unwrap();

        assert!(run(vec![
            input.to_str().unwrap().to_string(),
            output.to_str().unwrap().to_string(),
        ])
        .is_err());
    }
}
