//! Matching signature modes, declared types and supplied values

use qexec_core::{SqlType, Value};

use crate::error::{ArgumentError, ConfigurationError, Result};
use crate::param::{Param, ParamMode};

/// Build the bound parameters for one stored-procedure invocation.
///
/// `modes` and `declared_types` must have the same length. At least one value
/// is required per declared type; values beyond the declared count form a
/// variadic tail that repeats the mode and type of the last declared argument.
pub fn reconcile(
    descriptor_name: &str,
    modes: &[ParamMode],
    declared_types: &[SqlType],
    supplied: &[Value],
) -> Result<Vec<Param>> {
    let declared = declared_types.len();
    let actual = supplied.len();

    if modes.len() != declared {
        return Err(ConfigurationError::SignatureArityMismatch {
            name: descriptor_name.to_string(),
            declared_types: declared_types.to_vec(),
            signature_count: modes.len(),
            declared_count: declared,
        }
        .into());
    }

    let Some(last) = declared.checked_sub(1) else {
        if actual > 0 {
            return Err(ArgumentError::UnexpectedArguments {
                name: descriptor_name.to_string(),
            }
            .into());
        }
        return Ok(Vec::new());
    };

    if actual < declared {
        return Err(ArgumentError::InsufficientArguments {
            name: descriptor_name.to_string(),
            declared_types: declared_types.to_vec(),
            minimum: declared,
            actual,
        }
        .into());
    }

    let params = supplied
        .iter()
        .enumerate()
        .map(|(i, value)| {
            let slot = i.min(last);
            Param::new(modes[slot], declared_types[slot], value.clone())
        })
        .collect::<Vec<_>>();

    if actual > declared {
        tracing::trace!(
            descriptor = %descriptor_name,
            declared,
            variadic = actual - declared,
            "extended last declared argument over variadic tail"
        );
    }
    Ok(params)
}
