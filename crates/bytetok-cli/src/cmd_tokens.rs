/// Implementation of `bytetok tokens`.
///
/// Reads delimiter-terminated strings until the input ends and prints
/// each on its own line. With `--count`, prints only how many there were.
///
/// ```text
/// $ printf 'a,b,,c' | bytetok tokens -d ,
/// a
/// b
///
/// ```
///
/// `c` has no trailing delimiter, so it never forms a token.
use std::io::{self, Write as _};

use anyhow::Result;
use bytetok_reader::{ReadError, StreamReader};

use crate::TokensArgs;
use crate::input::{Input, reader_config};

/// Run the `bytetok tokens` command.
///
/// # Errors
///
/// Returns an error if the input cannot be read or stdout is closed.
pub async fn run(args: &TokensArgs) -> Result<()> {
    let input = Input::open(&args.input).await?;
    let count = {
        let reader = StreamReader::with_config(&input.source, &reader_config(&args.input))?;
        let mut out = io::stdout().lock();
        let mut count: u64 = 0;

        loop {
            match reader.read_string().await {
                Ok(token) => {
                    count += 1;
                    if !args.count {
                        writeln!(out, "{token}")?;
                    }
                }
                Err(ReadError::Eof) => break,
                Err(e) => return Err(e.into()),
            }
        }
        out.flush()?;
        count
    };

    input.finish().await?;
    if args.count {
        println!("{count}");
    }
    Ok(())
}
