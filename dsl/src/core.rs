//! Element types and naming rules shared by every part of the model.

use core::fmt;

use ebmacro_problems::Problem;
use lazy_static::lazy_static;
use regex::Regex;

use crate::diagnostic::{Diagnostic, Label};

lazy_static! {
    static ref IDENTIFIER: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
}

/// Words that the macro language reserves. Compared case-insensitively.
const RESERVED: &[&str] = &[
    "and",
    "bitand",
    "bitnot",
    "bitor",
    "bitxor",
    "bool",
    "break",
    "case",
    "char",
    "continue",
    "double",
    "down",
    "else",
    "end",
    "false",
    "float",
    "for",
    "if",
    "int",
    "macro_command",
    "mod",
    "next",
    "not",
    "or",
    "return",
    "select",
    "short",
    "step",
    "sub",
    "then",
    "to",
    "true",
    "unsigned",
    "wend",
    "while",
    "xor",
];

/// Checks that the name can be used for a variable, macro or intrinsic.
pub fn check_identifier(name: &str) -> Result<(), Diagnostic> {
    if !IDENTIFIER.is_match(name) {
        return Err(Diagnostic::problem(
            Problem::InvalidIdentifier,
            Label::element(name, "Name must start with a letter or underscore"),
        ));
    }
    let lower = name.to_ascii_lowercase();
    if RESERVED.contains(&lower.as_str()) {
        return Err(Diagnostic::problem(
            Problem::InvalidIdentifier,
            Label::element(name, "Name is a reserved word"),
        ));
    }
    Ok(())
}

/// The coarse category of a value. Operator type checking works on classes
/// rather than on individual widths.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TypeClass {
    Boolean,
    Integer,
    Float,
    /// String literals. Only valid as intrinsic arguments.
    Text,
}

impl TypeClass {
    pub fn is_numeric(&self) -> bool {
        matches!(self, TypeClass::Integer | TypeClass::Float)
    }
}

impl fmt::Display for TypeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TypeClass::Boolean => "boolean",
            TypeClass::Integer => "integer",
            TypeClass::Float => "float",
            TypeClass::Text => "text",
        };
        f.write_str(name)
    }
}

/// Element data type of a macro variable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DataType {
    Bool,
    Char,
    UnsignedChar,
    Short,
    UnsignedShort,
    Int,
    UnsignedInt,
    Float,
    Double,
}

impl DataType {
    pub fn class(&self) -> TypeClass {
        match self {
            DataType::Bool => TypeClass::Boolean,
            DataType::Float | DataType::Double => TypeClass::Float,
            _ => TypeClass::Integer,
        }
    }

    /// The keyword used in a declaration.
    pub fn keyword(&self) -> &'static str {
        match self {
            DataType::Bool => "bool",
            DataType::Char => "char",
            DataType::UnsignedChar => "unsigned char",
            DataType::Short => "short",
            DataType::UnsignedShort => "unsigned short",
            DataType::Int => "int",
            DataType::UnsignedInt => "unsigned int",
            DataType::Float => "float",
            DataType::Double => "double",
        }
    }

    /// Storage width in bits.
    pub fn bits(&self) -> u8 {
        match self {
            DataType::Bool => 1,
            DataType::Char | DataType::UnsignedChar => 8,
            DataType::Short | DataType::UnsignedShort => 16,
            DataType::Int | DataType::UnsignedInt | DataType::Float => 32,
            DataType::Double => 64,
        }
    }

    /// Returns true if a value of the class can be stored in this type.
    ///
    /// Boolean storage takes booleans and integers (nonzero is true).
    /// Numeric storage takes any numeric value.
    pub fn accepts(&self, class: TypeClass) -> bool {
        match self.class() {
            TypeClass::Boolean => matches!(class, TypeClass::Boolean | TypeClass::Integer),
            TypeClass::Integer | TypeClass::Float => class.is_numeric(),
            TypeClass::Text => false,
        }
    }

    pub fn is_signed(&self) -> bool {
        !matches!(
            self,
            DataType::Bool | DataType::UnsignedChar | DataType::UnsignedShort | DataType::UnsignedInt
        )
    }

    /// The type of an arithmetic result that combines the two types.
    ///
    /// Any float operand promotes the result to float (double if either side
    /// is double). Integers widen to the wider of the two; at equal widths
    /// the left side wins.
    pub fn promote(self, other: DataType) -> DataType {
        match (self.class(), other.class()) {
            (TypeClass::Float, _) | (_, TypeClass::Float) => {
                if self == DataType::Double || other == DataType::Double {
                    DataType::Double
                } else {
                    DataType::Float
                }
            }
            _ => {
                if other.bits() > self.bits() {
                    other
                } else {
                    self
                }
            }
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Format of a device memory cell as named in the tag list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TagType {
    Bit,
    Undesignated,
    Bcd16,
    Bcd32,
    U16,
    S16,
    U32,
    S32,
    U64,
    S64,
    F32,
    F64,
}

impl TagType {
    /// The type label used in tag list files.
    pub fn label(&self) -> &'static str {
        match self {
            TagType::Bit => "",
            TagType::Undesignated => "Undesignated",
            TagType::Bcd16 => "16-bit BCD",
            TagType::Bcd32 => "32-bit BCD",
            TagType::U16 => "16-bit Unsigned",
            TagType::S16 => "16-bit Signed",
            TagType::U32 => "32-bit Unsigned",
            TagType::S32 => "32-bit Signed",
            TagType::U64 => "64-bit Unsigned",
            TagType::S64 => "64-bit Signed",
            TagType::F32 => "32-bit Float",
            TagType::F64 => "64-bit Float",
        }
    }

    pub fn class(&self) -> TypeClass {
        self.data_type().class()
    }

    /// The variable type that holds one element of this format.
    pub fn data_type(&self) -> DataType {
        match self {
            TagType::Bit => DataType::Bool,
            TagType::Undesignated | TagType::S16 => DataType::Short,
            TagType::Bcd16 | TagType::U16 => DataType::UnsignedShort,
            TagType::Bcd32 | TagType::U32 | TagType::U64 => DataType::UnsignedInt,
            TagType::S32 | TagType::S64 => DataType::Int,
            TagType::F32 => DataType::Float,
            TagType::F64 => DataType::Double,
        }
    }
}

impl TryFrom<&str> for TagType {
    type Error = &'static str;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim() {
            "" => Ok(TagType::Bit),
            "Undesignated" => Ok(TagType::Undesignated),
            "16-bit BCD" => Ok(TagType::Bcd16),
            "32-bit BCD" => Ok(TagType::Bcd32),
            "16-bit Unsigned" => Ok(TagType::U16),
            "16-bit Signed" => Ok(TagType::S16),
            "32-bit Unsigned" => Ok(TagType::U32),
            "32-bit Signed" => Ok(TagType::S32),
            "64-bit Unsigned" => Ok(TagType::U64),
            "64-bit Signed" => Ok(TagType::S64),
            "32-bit Float" => Ok(TagType::F32),
            "64-bit Float" => Ok(TagType::F64),
            _ => Err("Unrecognized tag type label"),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("motor_on")]
    #[case("_step")]
    #[case("Tank2")]
    fn check_identifier_when_valid_then_ok(#[case] name: &str) {
        assert!(check_identifier(name).is_ok());
    }

    #[rstest]
    #[case("")]
    #[case("2tank")]
    #[case("has space")]
    #[case("Select")]
    #[case("end")]
    #[case("step")]
    fn check_identifier_when_invalid_then_err(#[case] name: &str) {
        let err = check_identifier(name).unwrap_err();
        assert!(err.is(Problem::InvalidIdentifier));
    }

    #[rstest]
    #[case(DataType::Short, DataType::Int, DataType::Int)]
    #[case(DataType::Int, DataType::Short, DataType::Int)]
    #[case(DataType::Short, DataType::UnsignedShort, DataType::Short)]
    #[case(DataType::Int, DataType::Float, DataType::Float)]
    #[case(DataType::Float, DataType::Double, DataType::Double)]
    #[case(DataType::Char, DataType::Double, DataType::Double)]
    fn promote_when_combined_then_expected(
        #[case] left: DataType,
        #[case] right: DataType,
        #[case] expected: DataType,
    ) {
        assert_eq!(left.promote(right), expected);
    }

    #[test]
    fn tag_type_when_label_round_trips_then_same_type() {
        let all = [
            TagType::Bit,
            TagType::Undesignated,
            TagType::Bcd16,
            TagType::Bcd32,
            TagType::U16,
            TagType::S16,
            TagType::U32,
            TagType::S32,
            TagType::U64,
            TagType::S64,
            TagType::F32,
            TagType::F64,
        ];
        for tag_type in all {
            assert_eq!(TagType::try_from(tag_type.label()), Ok(tag_type));
        }
    }

    #[test]
    fn tag_type_when_unknown_label_then_err() {
        assert!(TagType::try_from("128-bit Quantum").is_err());
    }
}
