//! Signature verification delegated to an external program.

use std::io::{self, ErrorKind, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};

use assembler_core::{SignatureVerifier, VerifyError};

/// Runs `program` once per candidate with the raw transaction hex on stdin.
///
/// Exit status 0 accepts the transaction; any other status rejects it.
#[derive(Debug, Clone)]
pub struct CommandVerifier {
    program: PathBuf,
}

impl CommandVerifier {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        CommandVerifier {
            program: program.into(),
        }
    }
}

impl SignatureVerifier for CommandVerifier {
    fn verify(&self, raw_tx_hex: &str) -> Result<bool, VerifyError> {
        let mut child = Command::new(&self.program)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .spawn()
            .map_err(|e| VerifyError(format!("spawning {}: {e}", self.program.display())))?;

        if let Some(stdin) = child.stdin.take() {
            if let Err(e) = write_input(stdin, raw_tx_hex) {
                // Reap the child before reporting
                let _ = child.wait();
                return Err(VerifyError(format!(
                    "writing to {}: {e}",
                    self.program.display()
                )));
            }
        }

        let status = child
            .wait()
            .map_err(|e| VerifyError(format!("waiting for {}: {e}", self.program.display())))?;

        match status.code() {
            Some(code) => Ok(code == 0),
            None => Err(VerifyError(format!("{} terminated by signal", self.program.display()))),
        }
    }
}

/// Write the transaction hex, then close the pipe by dropping `stdin`.
///
/// A verifier may exit without reading its input, so a broken pipe is not an
/// error; its exit status still decides.
fn write_input(mut stdin: impl Write, raw_tx_hex: &str) -> io::Result<()> {
    match writeln!(stdin, "{raw_tx_hex}") {
        Err(e) if e.kind() == ErrorKind::BrokenPipe => Ok(()),
        result => result,
    }
}
