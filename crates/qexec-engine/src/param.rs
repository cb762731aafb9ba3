//! Bound parameters for stored-procedure calls

use std::fmt;

use qexec_core::{Result, SqlType, Statement, Value};

/// Direction of a stored-procedure argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamMode {
    /// Value passed to the procedure (`>`)
    In,
    /// Value produced by the procedure (`<`)
    Out,
    /// Value passed in and replaced by the procedure (`=`)
    InOut,
}

impl ParamMode {
    /// Mode for a signature marker character
    pub fn from_marker(marker: char) -> Option<Self> {
        match marker {
            '>' => Some(Self::In),
            '<' => Some(Self::Out),
            '=' => Some(Self::InOut),
            _ => None,
        }
    }

    /// Signature marker character for this mode
    pub fn marker(self) -> char {
        match self {
            Self::In => '>',
            Self::Out => '<',
            Self::InOut => '=',
        }
    }

    pub fn is_input(self) -> bool {
        matches!(self, Self::In | Self::InOut)
    }

    pub fn is_output(self) -> bool {
        matches!(self, Self::Out | Self::InOut)
    }
}

impl fmt::Display for ParamMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::In => "IN",
            Self::Out => "OUT",
            Self::InOut => "INOUT",
        })
    }
}

/// Something that can attach itself to a position of a callable statement
pub trait BindParameter {
    /// Bind at the 0-based placeholder position `index`
    fn bind_to(&self, statement: &mut dyn Statement, index: usize) -> Result<()>;
}

/// A stored-procedure argument: mode, declared SQL type and value
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub mode: ParamMode,
    pub sql_type: SqlType,
    pub value: Value,
}

impl Param {
    pub fn new(mode: ParamMode, sql_type: SqlType, value: impl Into<Value>) -> Self {
        Self {
            mode,
            sql_type,
            value: value.into(),
        }
    }

    /// IN argument
    pub fn input(sql_type: SqlType, value: impl Into<Value>) -> Self {
        Self::new(ParamMode::In, sql_type, value)
    }

    /// OUT argument; the value is produced by the procedure
    pub fn output(sql_type: SqlType) -> Self {
        Self::new(ParamMode::Out, sql_type, Value::Null)
    }

    /// INOUT argument
    pub fn in_out(sql_type: SqlType, value: impl Into<Value>) -> Self {
        Self::new(ParamMode::InOut, sql_type, value)
    }
}

impl BindParameter for Param {
    fn bind_to(&self, statement: &mut dyn Statement, index: usize) -> Result<()> {
        if self.mode.is_input() {
            let value = self.value.coerce(self.sql_type)?;
            statement.set_value(index, &value)?;
        }
        if self.mode.is_output() {
            statement.register_out_parameter(index, self.sql_type)?;
        }
        Ok(())
    }
}

/// Plain values bind as untyped IN arguments
impl BindParameter for Value {
    fn bind_to(&self, statement: &mut dyn Statement, index: usize) -> Result<()> {
        statement.set_value(index, self)
    }
}

impl<T: BindParameter + ?Sized> BindParameter for &T {
    fn bind_to(&self, statement: &mut dyn Statement, index: usize) -> Result<()> {
        (**self).bind_to(statement, index)
    }
}
