/// Typed read plans for `bytetok read`.
///
/// A plan is a comma-separated list of steps, each mapping onto one
/// `StreamReader` operation:
///
/// ```text
/// ┌──────────┬──────────────────────┬───────────────────────────────┐
/// │ Step     │ Reader call          │ Output                        │
/// ├──────────┼──────────────────────┼───────────────────────────────┤
/// │ byte     │ read_byte()          │ the byte as a number          │
/// │ str      │ read_string()        │ text                          │
/// │ int      │ read_int()           │ non-negative integer          │
/// │ float    │ read_float()         │ non-negative float            │
/// │ fixed:N  │ read_fixed_string(N) │ text                          │
/// └──────────┴──────────────────────┴───────────────────────────────┘
/// ```
use std::fmt;
use std::str::FromStr;

use anyhow::{Result, anyhow, bail};
use bytetok_reader::{ReadError, StreamReader};
use bytetok_source::ByteSource;
use serde::{Serialize, Serializer};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    Byte,
    Str,
    Int,
    Float,
    Fixed(usize),
}

impl FromStr for Step {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "byte" => Ok(Self::Byte),
            "str" => Ok(Self::Str),
            "int" => Ok(Self::Int),
            "float" => Ok(Self::Float),
            other => {
                let Some(len) = other.strip_prefix("fixed:") else {
                    bail!("unknown read step {other:?} (expected byte, str, int, float or fixed:N)");
                };
                let len = len
                    .parse()
                    .map_err(|_| anyhow!("invalid length in {other:?}"))?;
                Ok(Self::Fixed(len))
            }
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Byte => f.write_str("byte"),
            Self::Str => f.write_str("str"),
            Self::Int => f.write_str("int"),
            Self::Float => f.write_str("float"),
            Self::Fixed(len) => write!(f, "fixed:{len}"),
        }
    }
}

/// Parse a comma-separated plan.
///
/// # Errors
///
/// Returns an error for an empty plan or any unknown step.
pub fn parse_plan(plan: &str) -> Result<Vec<Step>> {
    let steps = plan
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(str::parse)
        .collect::<Result<Vec<Step>>>()?;
    if steps.is_empty() {
        bail!("read plan is empty");
    }
    Ok(steps)
}

/// The value produced by one step.
///
/// Serializes as the bare value. JSON has no infinity, so a float token
/// such as `Infinity` is written as the string `"Infinity"` rather than
/// `null`.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Byte(u8),
    Text(String),
    Int(u64),
    Float(f64),
}

fn non_finite_name(x: f64) -> &'static str {
    if x.is_nan() {
        "NaN"
    } else if x.is_sign_negative() {
        "-Infinity"
    } else {
        "Infinity"
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Byte(b) => serializer.serialize_u8(*b),
            Self::Text(s) => serializer.serialize_str(s),
            Self::Int(n) => serializer.serialize_u64(*n),
            Self::Float(x) if x.is_finite() => serializer.serialize_f64(*x),
            Self::Float(x) => serializer.serialize_str(non_finite_name(*x)),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Byte(b) => write!(f, "{b}"),
            Self::Text(s) => write!(f, "{s:?}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(x) if x.is_finite() => write!(f, "{x}"),
            Self::Float(x) => f.write_str(non_finite_name(*x)),
        }
    }
}

/// One executed step and its result.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Reading {
    pub step: String,
    pub value: Value,
}

/// Execute a single step against `reader`.
///
/// # Errors
///
/// Propagates the reader's error unchanged.
pub async fn execute<S: ByteSource + ?Sized>(
    reader: &StreamReader<'_, S>,
    step: Step,
) -> Result<Value, ReadError> {
    Ok(match step {
        Step::Byte => Value::Byte(reader.read_byte().await?),
        Step::Str => Value::Text(reader.read_string().await?),
        Step::Int => Value::Int(reader.read_int().await?),
        Step::Float => Value::Float(reader.read_float().await?),
        Step::Fixed(len) => Value::Text(reader.read_fixed_string(len).await?),
    })
}

/// Render readings as `step<TAB>value` lines.
pub fn render_text(readings: &[Reading]) -> String {
    let mut out = String::new();
    for reading in readings {
        out.push_str(&reading.step);
        out.push('\t');
        out.push_str(&reading.value.to_string());
        out.push('\n');
    }
    out
}
