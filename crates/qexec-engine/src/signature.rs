//! Stored-procedure signature parsing
//!
//! A signature names the procedure and lists one mode marker per argument:
//!
//! ```text
//! add_tax(>, >, <)
//! ```
//!
//! `>` is IN, `<` is OUT and `=` is INOUT. Markers are separated by a comma
//! and optional whitespace. The parenthesized group may be omitted or empty,
//! both of which declare a procedure without arguments.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::ConfigurationError;
use crate::param::ParamMode;

static SIGNATURE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z_][A-Za-z0-9@$#_]*)(?:\(([<>=](?:,\s*[<>=])*)?\))?$")
        .expect("valid regex")
});

/// Callable name and argument modes extracted from a signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub name: String,
    pub modes: Vec<ParamMode>,
}

impl Signature {
    /// Number of argument slots in the signature
    pub fn arity(&self) -> usize {
        self.modes.len()
    }
}

/// Parse `text` as the signature of the descriptor called `descriptor_name`.
///
/// The descriptor name is only used for the error report.
pub fn parse_signature(
    descriptor_name: &str,
    text: &str,
) -> Result<Signature, ConfigurationError> {
    let invalid = || ConfigurationError::InvalidSignature {
        name: descriptor_name.to_string(),
        signature: text.to_string(),
    };

    let captures = SIGNATURE_REGEX.captures(text).ok_or_else(invalid)?;
    let name = captures[1].to_string();
    let modes = match captures.get(2) {
        Some(group) => group
            .as_str()
            .chars()
            .filter_map(ParamMode::from_marker)
            .collect(),
        None => Vec::new(),
    };

    tracing::trace!(descriptor = %descriptor_name, procedure = %name, arity = modes.len(), "parsed signature");
    Ok(Signature { name, modes })
}

#[cfg(test)]
mod tests;
