use serde::{Deserialize, Serialize};

/// Configuration for a [`StreamReader`](crate::StreamReader).
///
/// ```text
/// ┌───────────────┬───────────────────────────────────────────────────┐
/// │ Field         │ Purpose                                           │
/// ├───────────────┼───────────────────────────────────────────────────┤
/// │ delimiter     │ Terminates string/number tokens. Must be ASCII.   │
/// │ eof_policy    │ What a zero-length wake means (see EofPolicy)     │
/// │ max_token_len │ Optional cap on delimited token length, in bytes  │
/// └───────────────┴───────────────────────────────────────────────────┘
/// ```
///
/// Deserializes from any serde format; missing fields take their defaults.
///
/// ```rust
/// use bytetok_reader::{EofPolicy, ReaderConfig};
///
/// let config: ReaderConfig =
///     serde_json::from_str(r#"{ "delimiter": " ", "eof_policy": "recheck" }"#).unwrap();
/// assert_eq!(config.delimiter, ' ');
/// assert_eq!(config.eof_policy, EofPolicy::Recheck);
/// assert!(config.validate().is_empty());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Token terminator. Only its single UTF-8 byte is compared.
    pub delimiter: char,

    /// How to interpret a readability event that reports zero bytes.
    pub eof_policy: EofPolicy,

    /// Upper bound on the bytes `read_string` accumulates before giving
    /// up. `None` means unbounded.
    pub max_token_len: Option<usize>,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            delimiter: '\n',
            eof_policy: EofPolicy::default(),
            max_token_len: None,
        }
    }
}

impl ReaderConfig {
    /// Check the configuration, returning one message per problem.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if !self.delimiter.is_ascii() {
            errors.push(format!(
                "delimiter {:?} is not a single-byte (ASCII) character",
                self.delimiter
            ));
        }
        if self.max_token_len == Some(0) {
            errors.push("max_token_len must be greater than zero".to_string());
        }
        errors
    }

    /// The delimiter as the byte compared against the stream.
    ///
    /// Only meaningful once [`validate`](Self::validate) passed.
    #[allow(clippy::cast_possible_truncation)]
    #[must_use]
    pub fn delimiter_byte(&self) -> u8 {
        self.delimiter as u32 as u8
    }
}

/// Interpretation of a readability event that arrives while a read is
/// waiting but the source reports zero buffered bytes.
///
/// A source fires such an event once it has ended and drained, but a
/// spurious wake looks identical from the reader's side: bytes may have
/// been pushed between the event firing and the reader resuming.
///
/// ```text
/// ┌───────────┬──────────────────────────────────────────────────────┐
/// │ Policy    │ Behaviour on a zero-length wake                      │
/// ├───────────┼──────────────────────────────────────────────────────┤
/// │ Immediate │ End of stream, no further checks (default)           │
/// │ Recheck   │ Query the buffered length once more; only report     │
/// │           │ end of stream if it is still zero                    │
/// └───────────┴──────────────────────────────────────────────────────┘
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EofPolicy {
    #[default]
    Immediate,
    Recheck,
}
