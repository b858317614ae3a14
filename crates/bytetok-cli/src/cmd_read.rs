/// Implementation of `bytetok read`.
///
/// Runs a typed read plan (see [`crate::plan`]) against the input and
/// prints one `step<TAB>value` line per read, or a JSON array with
/// `--json`.
///
/// ```text
/// $ printf 'GET 3 abc' | bytetok read -d ' ' --plan str,int,fixed:3
/// str	"GET"
/// int	3
/// fixed:3	"abc"
/// ```
///
/// With `--repeat`, the plan restarts after its last step. End of input
/// right before the first step of a round ends the run successfully; end
/// of input anywhere else is an error, as is any invalid number.
/// Readings collected before a failure are still printed.
use anyhow::Result;
use bytetok_reader::{ReadError, StreamReader};
use bytetok_source::ChunkedSource;

use crate::ReadArgs;
use crate::input::{Input, reader_config};
use crate::plan::{Reading, Step, execute, parse_plan, render_text};

/// Run the `bytetok read` command.
///
/// # Errors
///
/// Returns an error if the plan is invalid, the input cannot be read, or
/// any step fails.
pub async fn run(args: &ReadArgs) -> Result<()> {
    let plan = parse_plan(&args.plan)?;
    let input = Input::open(&args.input).await?;

    let mut readings = Vec::new();
    let outcome = {
        let reader = StreamReader::with_config(&input.source, &reader_config(&args.input))?;
        run_plan(&reader, &plan, args.repeat, &mut readings).await
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&readings)?);
    } else {
        print!("{}", render_text(&readings));
    }

    outcome?;
    if args.repeat {
        input.finish().await?;
    } else {
        input.close().await?;
    }
    Ok(())
}

async fn run_plan(
    reader: &StreamReader<'_, ChunkedSource>,
    plan: &[Step],
    repeat: bool,
    readings: &mut Vec<Reading>,
) -> Result<()> {
    let mut round: usize = 0;
    loop {
        for (index, &step) in plan.iter().enumerate() {
            match execute(reader, step).await {
                Ok(value) => readings.push(Reading {
                    step: step.to_string(),
                    value,
                }),
                Err(ReadError::Eof) if repeat && index == 0 => return Ok(()),
                Err(e) => {
                    let at = format!("step {} ({step}) of round {}", index + 1, round + 1);
                    return Err(anyhow::Error::new(e).context(at));
                }
            }
        }
        if !repeat {
            return Ok(());
        }
        round += 1;
        tracing::debug!(round, "plan round complete");
    }
}
