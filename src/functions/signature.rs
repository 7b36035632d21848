use std::fmt;

use super::{ExprValue, FunctionError};

/// Group under which the functions are registered
pub const FUNCTION_GROUP: &str = "Spectral Libraries";

/// Default of an optional parameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DefaultValue {
    Bool(bool),
    Text(&'static str),
    /// The geometry of the row being evaluated (`@geometry`)
    CurrentGeometry,
    /// Null
    Null,
}

impl DefaultValue {
    /// Argument value the default stands for
    pub fn to_value(&self) -> ExprValue {
        match self {
            DefaultValue::Bool(b) => ExprValue::Bool(*b),
            DefaultValue::Text(s) => ExprValue::Text(s.to_string()),
            DefaultValue::CurrentGeometry | DefaultValue::Null => ExprValue::Null,
        }
    }
}

impl fmt::Display for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Bool(b) => write!(f, "{b}"),
            DefaultValue::Text(s) => write!(f, "'{s}'"),
            DefaultValue::CurrentGeometry => write!(f, "@geometry"),
            DefaultValue::Null => write!(f, "NULL"),
        }
    }
}

/// One parameter of a function signature
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Parameter {
    /// Name used in help texts and error messages
    pub name: &'static str,
    /// Whether the argument may be left out
    pub optional: bool,
    /// Value bound when the argument is left out
    pub default: Option<DefaultValue>,
}

impl Parameter {
    pub const fn required(name: &'static str) -> Self {
        Self {
            name,
            optional: false,
            default: None,
        }
    }

    pub const fn optional(name: &'static str, default: DefaultValue) -> Self {
        Self {
            name,
            optional: true,
            default: Some(default),
        }
    }
}

/// Kind of value a function returns on success
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnKind {
    /// A profile in the requested encoding, or an array of them
    Profile,
    /// A map of profiles and metadata
    Map,
    /// Raw band values: a list of numbers, or a list of lists per cell
    Array,
}

/// Fixed registration signature of an expression function
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FunctionSignature {
    /// Function name as called in expressions
    pub name: &'static str,
    /// Group shown in function browsers, [`FUNCTION_GROUP`] for built-ins
    pub group: &'static str,
    /// Parameters in call order
    pub parameters: &'static [Parameter],
    /// Kind of the successful result
    pub returns: ReturnKind,
    /// True if the function reads the row geometry
    pub uses_geometry: bool,
}

impl FunctionSignature {
    /// Match `args` against the parameters, filling in defaults.
    ///
    /// Returns one value per parameter.
    pub fn bind(&self, args: &[ExprValue]) -> Result<Vec<ExprValue>, FunctionError> {
        if args.len() > self.parameters.len() {
            return Err(FunctionError::TooManyArguments {
                function: self.name,
                expected: self.parameters.len(),
                actual: args.len(),
            });
        }
        self.parameters
            .iter()
            .enumerate()
            .map(|(i, p)| match (args.get(i), &p.default) {
                (Some(value), _) => Ok(value.clone()),
                (None, Some(default)) => Ok(default.to_value()),
                (None, None) if p.optional => Ok(ExprValue::Null),
                (None, None) => Err(FunctionError::MissingArgument {
                    function: self.name,
                    parameter: p.name,
                }),
            })
            .collect()
    }
}

impl fmt::Display for FunctionSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, p) in self.parameters.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match &p.default {
                Some(default) => write!(f, "{}={}", p.name, default)?,
                None if p.optional => write!(f, "[{}]", p.name)?,
                None => write!(f, "{}", p.name)?,
            }
        }
        write!(f, ")")
    }
}
