//! Constructors for the intrinsics that the sequencing layer needs: device
//! transfers, delays, macro triggers and tracing.
//!
//! Other intrinsics (math, string and checksum helpers) are invoked with
//! `Stmt::call` or `Expr::call` directly.
use ebmacro_problems::Problem;

use crate::common::{Literal, Operand, Tag};
use crate::core::{check_identifier, DataType, TypeClass};
use crate::diagnostic::{Diagnostic, Label};
use crate::expression::check_value;
use crate::statement::Stmt;

pub const GET_DATA: &str = "GetData";
pub const GET_DATA_EX: &str = "GetDataEx";
pub const SET_DATA: &str = "SetData";
pub const SET_DATA_EX: &str = "SetDataEx";
pub const GET_ERROR: &str = "GetError";
pub const DELAY: &str = "DELAY";
pub const ASYNC_TRIG_MACRO: &str = "ASYNC_TRIG_MACRO";
pub const SYNC_TRIG_MACRO: &str = "SYNC_TRIG_MACRO";
pub const TRACE: &str = "TRACE";

/// Reads `count` elements from the tag into the buffer.
pub fn get_data(
    buffer: impl Into<Operand>,
    tag: &Tag,
    count: impl Into<Operand>,
) -> Result<Stmt, Diagnostic> {
    transfer(GET_DATA, buffer.into(), tag, count.into())
}

/// Like `get_data` but does not wait for the device to respond.
pub fn get_data_ex(
    buffer: impl Into<Operand>,
    tag: &Tag,
    count: impl Into<Operand>,
) -> Result<Stmt, Diagnostic> {
    transfer(GET_DATA_EX, buffer.into(), tag, count.into())
}

/// Writes `count` elements from the buffer to the tag.
pub fn set_data(
    buffer: impl Into<Operand>,
    tag: &Tag,
    count: impl Into<Operand>,
) -> Result<Stmt, Diagnostic> {
    transfer(SET_DATA, buffer.into(), tag, count.into())
}

/// Like `set_data` but does not wait for the device to respond.
pub fn set_data_ex(
    buffer: impl Into<Operand>,
    tag: &Tag,
    count: impl Into<Operand>,
) -> Result<Stmt, Diagnostic> {
    transfer(SET_DATA_EX, buffer.into(), tag, count.into())
}

/// Stores the result code of the last `GetDataEx`/`SetDataEx` in the
/// destination.
pub fn get_error(destination: impl Into<Operand>) -> Result<Stmt, Diagnostic> {
    let destination = destination.into();
    let data_type = check_buffer(&destination)?;
    if data_type.class() != TypeClass::Integer {
        return Err(Diagnostic::problem(
            Problem::TypeMismatch,
            Label::element(destination.describe(), "Error code destination must be an integer"),
        ));
    }
    Stmt::call(GET_ERROR, vec![destination])
}

/// Pauses the macro for the number of milliseconds.
pub fn delay(milliseconds: impl Into<Operand>) -> Result<Stmt, Diagnostic> {
    let milliseconds = milliseconds.into();
    require_integer(&milliseconds, DELAY)?;
    Stmt::call(DELAY, vec![milliseconds])
}

/// Starts the named macro and continues without waiting for it.
pub fn async_trig_macro(name: &str) -> Result<Stmt, Diagnostic> {
    check_identifier(name)?;
    Stmt::call(ASYNC_TRIG_MACRO, vec![Operand::Literal(Literal::from(name))])
}

/// Runs the named macro to completion before continuing.
pub fn sync_trig_macro(name: &str) -> Result<Stmt, Diagnostic> {
    check_identifier(name)?;
    Stmt::call(SYNC_TRIG_MACRO, vec![Operand::Literal(Literal::from(name))])
}

/// Writes a formatted message to the runtime trace log.
pub fn trace(format: &str, args: Vec<Operand>) -> Result<Stmt, Diagnostic> {
    for arg in &args {
        check_value(arg, TRACE)?;
    }
    let mut all = vec![Operand::Literal(Literal::from(format))];
    all.extend(args);
    Stmt::call(TRACE, all)
}

pub fn info(format: &str, args: Vec<Operand>) -> Result<Stmt, Diagnostic> {
    trace(&format!("INFO: {}", format), args)
}

pub fn warn(format: &str, args: Vec<Operand>) -> Result<Stmt, Diagnostic> {
    trace(&format!("WARN: {}", format), args)
}

pub fn error(format: &str, args: Vec<Operand>) -> Result<Stmt, Diagnostic> {
    trace(&format!("ERROR: {}", format), args)
}

/// Builds a device transfer `NAME(buffer, "device", REG, N, count)`.
///
/// A whole array buffer becomes its first element. A literal count must
/// fit in the buffer: scalars hold one element and arrays hold their length
/// minus the starting index.
fn transfer(name: &str, buffer: Operand, tag: &Tag, count: Operand) -> Result<Stmt, Diagnostic> {
    check_buffer(&buffer)?;
    require_integer(&count, name)?;

    let (buffer, capacity) = match buffer {
        Operand::Variable(var) => match var.length() {
            Some(length) => (Operand::from(var.at(0)?), length as i64),
            None => (Operand::Variable(var), 1),
        },
        Operand::Element(elem) => {
            let length = elem.array().length().unwrap_or(1) as i64;
            let capacity = match elem.index().as_int() {
                Some(start) => length - start,
                None => length,
            };
            (Operand::Element(elem), capacity)
        }
        other => (other, 1),
    };

    if let Some(n) = count.as_int() {
        let scalar = matches!(buffer, Operand::Variable(_));
        if scalar && n != 1 {
            return Err(Diagnostic::problem(
                Problem::NonArrayTransfer,
                Label::element(buffer.describe(), "Only arrays can transfer several elements"),
            )
            .with_context("tag", tag.name())
            .with_context("count", n));
        }
        if n < 1 || n > capacity {
            return Err(Diagnostic::problem(
                Problem::IndexOutOfRange,
                Label::element(buffer.describe(), "Transfer count does not fit in the buffer"),
            )
            .with_context("tag", tag.name())
            .with_context("count", n)
            .with_context("capacity", capacity));
        }
    }

    Stmt::call(name, vec![buffer, Operand::from(tag), count])
}

/// Checks that the operand is a variable or element that can receive data
/// and returns its element type.
fn check_buffer(buffer: &Operand) -> Result<DataType, Diagnostic> {
    match buffer {
        Operand::Variable(var) => Ok(var.data_type()),
        Operand::Element(elem) => Ok(elem.data_type()),
        Operand::Tag(tag) => Err(Diagnostic::problem(
            Problem::TagOperand,
            Label::element(tag.name(), "Buffer must be a variable"),
        )),
        _ => Err(Diagnostic::problem(
            Problem::TypeMismatch,
            Label::element(buffer.describe(), "Buffer must be a variable"),
        )),
    }
}

fn require_integer(operand: &Operand, context: &str) -> Result<(), Diagnostic> {
    let data_type = check_value(operand, context)?;
    if data_type.class() != TypeClass::Integer {
        return Err(Diagnostic::problem(
            Problem::TypeMismatch,
            Label::element(operand.describe(), "Value must be an integer"),
        )
        .with_context("in", context));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Variable;
    use crate::core::{DataType, TagType};

    fn level() -> Tag {
        Tag::new("level", "Local HMI", "LW, 100", TagType::S16).unwrap()
    }

    #[test]
    fn get_data_when_scalar_and_count_two_then_non_array_transfer() {
        let var = Variable::new("value", DataType::Short).unwrap();
        let err = get_data(&var, &level(), 2).unwrap_err();
        assert!(err.is(Problem::NonArrayTransfer));
    }

    #[test]
    fn get_data_when_count_exceeds_array_then_index_out_of_range() {
        let var = Variable::array("values", DataType::Short, 4).unwrap();
        assert!(get_data(&var, &level(), 4).is_ok());
        let err = get_data(&var, &level(), 5).unwrap_err();
        assert!(err.is(Problem::IndexOutOfRange));
    }

    #[test]
    fn get_data_when_element_start_then_capacity_from_start() {
        let var = Variable::array("values", DataType::Short, 4).unwrap();
        let start = var.at(2).unwrap();
        assert!(get_data(&start, &level(), 2).is_ok());
        assert!(get_data(&start, &level(), 3)
            .unwrap_err()
            .is(Problem::IndexOutOfRange));
    }

    #[test]
    fn get_data_when_whole_array_then_uses_first_element() {
        let var = Variable::array("values", DataType::Short, 4).unwrap();
        let stmt = get_data(&var, &level(), 4).unwrap();
        match stmt {
            Stmt::Call(call) => {
                assert_eq!(call.name(), GET_DATA);
                assert!(matches!(call.args()[0], Operand::Element(_)));
                assert!(matches!(call.args()[1], Operand::Tag(_)));
            }
            _ => panic!("expected call"),
        }
    }

    #[test]
    fn set_data_when_resources_then_contains_tag_and_variable() {
        let var = Variable::new("value", DataType::Short).unwrap();
        let stmt = set_data(&var, &level(), 1).unwrap();
        assert!(stmt.resources().contains_tag(&level()));
        assert!(stmt.resources().contains_variable(&var));
    }

    #[test]
    fn delay_when_float_then_type_mismatch() {
        assert!(delay(0.5).unwrap_err().is(Problem::TypeMismatch));
    }

    #[test]
    fn async_trig_macro_when_invalid_name_then_invalid_identifier() {
        assert!(async_trig_macro("bad name")
            .unwrap_err()
            .is(Problem::InvalidIdentifier));
    }

    #[test]
    fn trace_when_newline_in_format_then_invalid_literal() {
        let err = trace("a\nb", vec![]).unwrap_err();
        assert!(err.is(Problem::InvalidLiteral));
        assert!(info("ready", vec![]).is_ok());
    }
}
