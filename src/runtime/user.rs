//! User interaction operations (numbered choice prompts).

use anyhow::{Result, bail};

use super::RealRuntime;

use std::io::{self, BufRead, Write};

/// Core, testable implementation that reads from any BufRead and writes to any Write.
/// Options are listed from 1; the returned index is zero-based.
pub(crate) fn choose_with_io<R: BufRead, W: Write>(
    prompt: &str,
    options: &[String],
    input: &mut R,
    output: &mut W,
) -> Result<usize> {
    writeln!(output, "{}", prompt)?;
    for (i, option) in options.iter().enumerate() {
        writeln!(output, "  {}) {}", i + 1, option)?;
    }
    write!(output, "Enter a number [1-{}]: ", options.len())?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    let answer = line.trim();

    match answer.parse::<usize>() {
        Ok(n) if (1..=options.len()).contains(&n) => Ok(n - 1),
        _ => bail!("'{}' is not one of the listed numbers", answer),
    }
}

impl RealRuntime {
    pub(crate) fn choose_impl(&self, prompt: &str, options: &[String]) -> Result<usize> {
        let stdin = io::stdin();
        let mut stdout = io::stdout();
        let mut stdin_lock = stdin.lock();
        choose_with_io(prompt, options, &mut stdin_lock, &mut stdout)
    }
}
