//! Running a prepared statement for a requested result shape

use qexec_core::{Connection, Cursor, Statement};

use crate::error::{EngineError, Result};
use crate::package::ResultPackage;
use crate::shape::{QueryOutcome, ResultShape};

/// Execute `statement` and produce the outcome for `shape`.
///
/// The connection and statement are consumed. For [`ResultShape::Package`] they
/// travel, together with the cursor, inside the returned [`ResultPackage`];
/// for every other shape they are released before this returns, whether or not
/// execution succeeded. A failure while releasing never replaces the result.
#[tracing::instrument(level = "debug", skip(connection, statement), fields(driver = connection.driver_name()))]
pub fn execute_statement(
    shape: ResultShape,
    connection: Box<dyn Connection>,
    statement: Box<dyn Statement>,
) -> Result<QueryOutcome> {
    let mut package = ResultPackage::new(connection, statement);

    let result = match shape {
        ResultShape::Update => run_update(&mut package),
        ResultShape::Package => match open_cursor(&mut package) {
            Ok(()) => {
                tracing::debug!("returning open result package");
                return Ok(QueryOutcome::Package(package));
            }
            Err(e) => Err(e),
        },
        ResultShape::Integer | ResultShape::Text | ResultShape::Typed(_) => {
            open_cursor(&mut package).and_then(|()| read_first_row(shape, &mut package))
        }
    };

    package.close();

    match &result {
        Ok(outcome) => tracing::debug!(?outcome, "statement executed"),
        Err(e) => tracing::debug!(error = %e, "statement failed"),
    }
    result
}

fn run_update(package: &mut ResultPackage) -> Result<QueryOutcome> {
    let statement = statement_of(package)?;
    let count = statement.execute_update().map_err(EngineError::Execution)?;
    Ok(QueryOutcome::RowCount(count))
}

fn open_cursor(package: &mut ResultPackage) -> Result<()> {
    let statement = statement_of(package)?;
    let cursor = statement.execute_query().map_err(EngineError::Execution)?;
    package.cursor = Some(cursor);
    Ok(())
}

fn statement_of(package: &mut ResultPackage) -> Result<&mut dyn Statement> {
    match package.statement.as_deref_mut() {
        Some(statement) => Ok(statement),
        None => Err(EngineError::InvalidState("statement already released".into())),
    }
}

/// Read column 0 of the first row, or the shape's empty value when there is
/// no row. SQL NULL reads as `None` for the text and typed shapes.
fn read_first_row(shape: ResultShape, package: &mut ResultPackage) -> Result<QueryOutcome> {
    let cursor: &mut dyn Cursor = package.cursor_mut()?;
    let has_row = cursor.next().map_err(EngineError::Execution)?;

    let outcome = match shape {
        ResultShape::Integer => QueryOutcome::Integer(if has_row {
            cursor.get_i64(0).map_err(EngineError::Execution)?
        } else {
            -1
        }),
        ResultShape::Text => QueryOutcome::Text(if has_row {
            cursor.get_string(0).map_err(EngineError::Execution)?
        } else {
            None
        }),
        ResultShape::Typed(sql_type) => QueryOutcome::Typed(if has_row {
            let value = cursor.get_typed(0, sql_type).map_err(EngineError::Execution)?;
            (!value.is_null()).then_some(value)
        } else {
            None
        }),
        ResultShape::Update | ResultShape::Package => {
            return Err(EngineError::InvalidState(format!(
                "result shape {} does not read a single value",
                shape
            )));
        }
    };
    Ok(outcome)
}
