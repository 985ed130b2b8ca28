//! Values that can appear as operands: literals, variables, array elements,
//! device tags and computed expressions.
use core::fmt;
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use ebmacro_problems::Problem;
use lazy_static::lazy_static;
use regex::Regex;

use crate::core::{check_identifier, DataType, TagType, TypeClass};
use crate::diagnostic::{Diagnostic, Label};
use crate::expression::{check_value, Expr};
use crate::intrinsic;
use crate::resources::ResourceSet;
use crate::statement::Stmt;

lazy_static! {
    static ref TAG_ADDRESS: Regex =
        Regex::new(r"^\s*([A-Za-z0-9_#$]+)\s*,\s*([0-9]+)\s*$").unwrap();
}

/// A constant value.
#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Literal {
    pub fn class(&self) -> TypeClass {
        match self {
            Literal::Bool(_) => TypeClass::Boolean,
            Literal::Int(_) => TypeClass::Integer,
            Literal::Float(_) => TypeClass::Float,
            Literal::Str(_) => TypeClass::Text,
        }
    }

    /// The element type of the literal. Strings have none.
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Literal::Bool(_) => Some(DataType::Bool),
            Literal::Int(_) => Some(DataType::Int),
            Literal::Float(_) => Some(DataType::Float),
            Literal::Str(_) => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Literal::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Checks that the literal has a spelling in macro text. Floats must be
    /// finite and strings must fit on one line.
    pub fn check(&self) -> Result<(), Diagnostic> {
        match self {
            Literal::Float(v) if !v.is_finite() => Err(Diagnostic::problem(
                Problem::InvalidLiteral,
                Label::element(self.to_string(), "Float value must be finite"),
            )),
            Literal::Str(v) if v.chars().any(char::is_control) => Err(Diagnostic::problem(
                Problem::InvalidLiteral,
                Label::element(
                    v.escape_debug().to_string(),
                    "String contains a control character",
                ),
            )),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Bool(true) => f.write_str("true"),
            Literal::Bool(false) => f.write_str("false"),
            Literal::Int(v) => write!(f, "{}", v),
            // Debug formatting always keeps a decimal point or exponent.
            Literal::Float(v) => write!(f, "{:?}", v),
            Literal::Str(v) => write!(f, "\"{}\"", v.replace('"', "\\\"")),
        }
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Literal::Bool(value)
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Literal::Int(value)
    }
}

impl From<i32> for Literal {
    fn from(value: i32) -> Self {
        Literal::Int(value.into())
    }
}

impl From<u32> for Literal {
    fn from(value: u32) -> Self {
        Literal::Int(value.into())
    }
}

impl From<usize> for Literal {
    fn from(value: usize) -> Self {
        Literal::Int(value as i64)
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Literal::Float(value)
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::Str(value.to_string())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Literal::Str(value)
    }
}

/// A macro variable: scalar or array.
///
/// The identity of a variable is its name. Two values with the same name
/// are the same variable even if the declarations differ; the code
/// generator reports such conflicts.
#[derive(Clone, Debug)]
pub struct Variable {
    name: String,
    data_type: DataType,
    initial: Option<Literal>,
    length: Option<usize>,
}

impl Variable {
    /// Creates a scalar variable without an initial value.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Result<Self, Diagnostic> {
        let name = name.into();
        check_identifier(&name)?;
        Ok(Self {
            name,
            data_type,
            initial: None,
            length: None,
        })
    }

    /// Creates an array variable with `length` elements.
    pub fn array(
        name: impl Into<String>,
        data_type: DataType,
        length: usize,
    ) -> Result<Self, Diagnostic> {
        let name = name.into();
        check_identifier(&name)?;
        if length == 0 {
            return Err(Diagnostic::problem(
                Problem::IndexOutOfRange,
                Label::element(name, "Array must have at least one element"),
            ));
        }
        Ok(Self {
            name,
            data_type,
            initial: None,
            length: Some(length),
        })
    }

    /// Creates a boolean variable with the initial value.
    pub fn flag(name: impl Into<String>, initial: bool) -> Result<Self, Diagnostic> {
        Variable::new(name, DataType::Bool)?.with_initial(initial)
    }

    /// Sets the value the variable has at the start of each invocation.
    pub fn with_initial(mut self, value: impl Into<Literal>) -> Result<Self, Diagnostic> {
        let value = value.into();
        value.check()?;
        if self.is_array() {
            return Err(Diagnostic::problem(
                Problem::ArrayAssignment,
                Label::element(&self.name, "Array variables cannot have an initial value"),
            ));
        }
        if !self.data_type.accepts(value.class()) {
            return Err(Diagnostic::problem(
                Problem::TypeMismatch,
                Label::element(&self.name, "Initial value does not match the variable type"),
            )
            .with_context("type", self.data_type)
            .with_context("value", &value));
        }
        self.initial = Some(value);
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn initial(&self) -> Option<&Literal> {
        self.initial.as_ref()
    }

    pub fn length(&self) -> Option<usize> {
        self.length
    }

    pub fn is_array(&self) -> bool {
        self.length.is_some()
    }

    /// Returns true if both values declare the variable identically.
    pub fn same_declaration(&self, other: &Variable) -> bool {
        self.name == other.name
            && self.data_type == other.data_type
            && self.initial == other.initial
            && self.length == other.length
    }

    /// References one element of an array variable.
    pub fn at(&self, index: impl Into<Operand>) -> Result<Element, Diagnostic> {
        let index = index.into();
        let length = self.length.ok_or_else(|| {
            Diagnostic::problem(
                Problem::NotAnArray,
                Label::element(&self.name, "Only arrays can be indexed"),
            )
        })?;
        let index_type = check_value(&index, "index")?;
        if index_type.class() != TypeClass::Integer {
            return Err(Diagnostic::problem(
                Problem::TypeMismatch,
                Label::element(&self.name, "Array index must be an integer"),
            )
            .with_context("index", index_type.class()));
        }
        if let Some(value) = index.as_int() {
            if value < 0 || value as usize >= length {
                return Err(Diagnostic::problem(
                    Problem::IndexOutOfRange,
                    Label::element(&self.name, "Index is outside of the array"),
                )
                .with_context("index", value)
                .with_context("length", length));
            }
        }
        Ok(Element {
            array: self.clone(),
            index: Box::new(index),
        })
    }

    /// Assigns the value to this variable.
    pub fn set(&self, value: impl Into<Operand>) -> Result<Stmt, Diagnostic> {
        Stmt::evaluate(self, value)
    }
}

impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Variable {}

impl Hash for Variable {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl PartialOrd for Variable {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Variable {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name.cmp(&other.name)
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// One element of an array variable, `array[index]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Element {
    array: Variable,
    index: Box<Operand>,
}

impl Element {
    pub fn array(&self) -> &Variable {
        &self.array
    }

    pub fn index(&self) -> &Operand {
        &self.index
    }

    pub fn data_type(&self) -> DataType {
        self.array.data_type()
    }

    /// Assigns the value to this element.
    pub fn set(&self, value: impl Into<Operand>) -> Result<Stmt, Diagnostic> {
        Stmt::evaluate(self.clone(), value)
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[...]", self.array.name())
    }
}

/// A device address made of a register class and a numeric offset, such as
/// `LW, 10`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TagAddress {
    register: String,
    offset: u64,
}

impl TagAddress {
    pub fn new(register: impl Into<String>, offset: u64) -> Self {
        Self {
            register: register.into(),
            offset,
        }
    }

    pub fn register(&self) -> &str {
        &self.register
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }
}

impl TryFrom<&str> for TagAddress {
    type Error = &'static str;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let cap = TAG_ADDRESS
            .captures(value)
            .ok_or("Address must be a register and a numeric offset")?;
        let offset = cap[2]
            .parse::<u64>()
            .map_err(|_| "Address offset is too large")?;
        Ok(TagAddress::new(&cap[1], offset))
    }
}

impl fmt::Display for TagAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.register, self.offset)
    }
}

/// A device memory cell that persists across macro invocations.
///
/// The identity of a tag is its device and address; the name is only a
/// label. Two tags with different names at the same address compare equal.
#[derive(Clone, Debug)]
pub struct Tag {
    name: String,
    device: String,
    address: TagAddress,
    tag_type: TagType,
}

impl Tag {
    /// Creates a tag from an address such as `"LW, 10"`.
    pub fn new(
        name: impl Into<String>,
        device: impl Into<String>,
        address: &str,
        tag_type: TagType,
    ) -> Result<Self, Diagnostic> {
        let name = name.into();
        let device = device.into();
        if name.trim().is_empty() {
            return Err(Diagnostic::problem(
                Problem::InvalidIdentifier,
                Label::element(&device, "Tag name must not be empty"),
            ));
        }
        if device.trim().is_empty() || device.contains('"') {
            return Err(Diagnostic::problem(
                Problem::InvalidTagAddress,
                Label::element(&name, "Device name must be non-empty and unquoted"),
            ));
        }
        let address = TagAddress::try_from(address).map_err(|msg| {
            Diagnostic::problem(Problem::InvalidTagAddress, Label::element(&name, msg))
                .with_context("address", address)
        })?;
        Ok(Self {
            name,
            device,
            address,
            tag_type,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn address(&self) -> &TagAddress {
        &self.address
    }

    pub fn tag_type(&self) -> TagType {
        self.tag_type
    }

    /// Reads one element from the device into the destination.
    pub fn read(&self, destination: impl Into<Operand>) -> Result<Stmt, Diagnostic> {
        intrinsic::get_data(destination, self, 1)
    }

    /// Reads `count` consecutive elements into an array destination.
    pub fn read_count(
        &self,
        destination: impl Into<Operand>,
        count: impl Into<Operand>,
    ) -> Result<Stmt, Diagnostic> {
        intrinsic::get_data(destination, self, count)
    }

    /// Writes one element from the source to the device.
    pub fn write(&self, source: impl Into<Operand>) -> Result<Stmt, Diagnostic> {
        intrinsic::set_data(source, self, 1)
    }

    /// Writes `count` consecutive elements from an array source.
    pub fn write_count(
        &self,
        source: impl Into<Operand>,
        count: impl Into<Operand>,
    ) -> Result<Stmt, Diagnostic> {
        intrinsic::set_data(source, self, count)
    }
}

impl PartialEq for Tag {
    fn eq(&self, other: &Self) -> bool {
        self.device == other.device && self.address == other.address
    }
}

impl Eq for Tag {}

impl Hash for Tag {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.device.hash(state);
        self.address.hash(state);
    }
}

impl PartialOrd for Tag {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Tag {
    fn cmp(&self, other: &Self) -> Ordering {
        self.device
            .cmp(&other.device)
            .then_with(|| self.address.cmp(&other.address))
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}: {})", self.name, self.device, self.address)
    }
}

/// Anything that can be an operand of an expression or an argument of an
/// intrinsic.
#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    Literal(Literal),
    Variable(Variable),
    Element(Element),
    Tag(Tag),
    Expr(Box<Expr>),
}

impl Operand {
    pub fn class(&self) -> TypeClass {
        match self {
            Operand::Literal(lit) => lit.class(),
            Operand::Variable(var) => var.data_type().class(),
            Operand::Element(elem) => elem.data_type().class(),
            Operand::Tag(tag) => tag.tag_type().class(),
            Operand::Expr(expr) => expr.data_type().class(),
        }
    }

    /// The element type, if the operand has one. String literals do not.
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Operand::Literal(lit) => lit.data_type(),
            Operand::Variable(var) => Some(var.data_type()),
            Operand::Element(elem) => Some(elem.data_type()),
            Operand::Tag(tag) => Some(tag.tag_type().data_type()),
            Operand::Expr(expr) => Some(expr.data_type()),
        }
    }

    pub fn resources(&self) -> ResourceSet {
        match self {
            Operand::Literal(_) => ResourceSet::new(),
            Operand::Variable(var) => {
                let mut set = ResourceSet::new();
                set.insert_variable(var);
                set
            }
            Operand::Element(elem) => {
                let mut set = elem.index().resources();
                set.insert_variable(elem.array());
                set
            }
            Operand::Tag(tag) => {
                let mut set = ResourceSet::new();
                set.insert_tag(tag);
                set
            }
            Operand::Expr(expr) => expr.resources().clone(),
        }
    }

    /// The value if this is an integer literal.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Operand::Literal(lit) => lit.as_int(),
            _ => None,
        }
    }

    /// A short description used in diagnostics.
    pub fn describe(&self) -> String {
        match self {
            Operand::Literal(lit) => lit.to_string(),
            Operand::Variable(var) => var.to_string(),
            Operand::Element(elem) => elem.to_string(),
            Operand::Tag(tag) => tag.name().to_string(),
            Operand::Expr(_) => String::from("<expression>"),
        }
    }
}

impl From<Literal> for Operand {
    fn from(value: Literal) -> Self {
        Operand::Literal(value)
    }
}

impl From<Variable> for Operand {
    fn from(value: Variable) -> Self {
        Operand::Variable(value)
    }
}

impl From<&Variable> for Operand {
    fn from(value: &Variable) -> Self {
        Operand::Variable(value.clone())
    }
}

impl From<Element> for Operand {
    fn from(value: Element) -> Self {
        Operand::Element(value)
    }
}

impl From<&Element> for Operand {
    fn from(value: &Element) -> Self {
        Operand::Element(value.clone())
    }
}

impl From<Tag> for Operand {
    fn from(value: Tag) -> Self {
        Operand::Tag(value)
    }
}

impl From<&Tag> for Operand {
    fn from(value: &Tag) -> Self {
        Operand::Tag(value.clone())
    }
}

impl From<Expr> for Operand {
    fn from(value: Expr) -> Self {
        Operand::Expr(Box::new(value))
    }
}

impl From<bool> for Operand {
    fn from(value: bool) -> Self {
        Operand::Literal(value.into())
    }
}

impl From<i64> for Operand {
    fn from(value: i64) -> Self {
        Operand::Literal(value.into())
    }
}

impl From<i32> for Operand {
    fn from(value: i32) -> Self {
        Operand::Literal(value.into())
    }
}

impl From<u32> for Operand {
    fn from(value: u32) -> Self {
        Operand::Literal(value.into())
    }
}

impl From<usize> for Operand {
    fn from(value: usize) -> Self {
        Operand::Literal(value.into())
    }
}

impl From<f64> for Operand {
    fn from(value: f64) -> Self {
        Operand::Literal(value.into())
    }
}

impl From<&str> for Operand {
    fn from(value: &str) -> Self {
        Operand::Literal(value.into())
    }
}
