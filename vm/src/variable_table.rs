use std::collections::HashMap;

use ebmacro_dsl::common::Variable;
use ebmacro_dsl::core::DataType;

use crate::error::Trap;
use crate::value::Value;

enum Cell {
    Scalar(DataType, Value),
    Array(DataType, Vec<Value>),
}

/// Local variables of one macro invocation.
///
/// Locals do not survive the invocation: each run starts from the
/// declared initial values.
pub(crate) struct VariableTable {
    cells: HashMap<String, Cell>,
}

impl VariableTable {
    pub fn new(declarations: &[Variable]) -> Result<Self, Trap> {
        let mut cells = HashMap::new();
        for var in declarations {
            let data_type = var.data_type();
            let cell = match var.length() {
                Some(length) => Cell::Array(data_type, vec![Value::zero(data_type); length]),
                None => {
                    let value = match var.initial() {
                        Some(initial) => Value::from_literal(initial)?.coerce(data_type),
                        None => Value::zero(data_type),
                    };
                    Cell::Scalar(data_type, value)
                }
            };
            cells.insert(var.name().to_string(), cell);
        }
        Ok(Self { cells })
    }

    pub fn load(&self, name: &str) -> Result<Value, Trap> {
        match self.cells.get(name) {
            Some(Cell::Scalar(_, value)) => Ok(*value),
            Some(Cell::Array(..)) => Err(Trap::InvalidArgument("array used as a value")),
            None => Err(Trap::UndeclaredVariable(name.to_string())),
        }
    }

    pub fn store(&mut self, name: &str, value: Value) -> Result<(), Trap> {
        match self.cells.get_mut(name) {
            Some(Cell::Scalar(data_type, cell)) => {
                *cell = value.coerce(*data_type);
                Ok(())
            }
            Some(Cell::Array(..)) => Err(Trap::InvalidArgument("array used as a destination")),
            None => Err(Trap::UndeclaredVariable(name.to_string())),
        }
    }

    pub fn load_element(&self, name: &str, index: i64) -> Result<Value, Trap> {
        match self.cells.get(name) {
            Some(Cell::Array(_, values)) => usize::try_from(index)
                .ok()
                .and_then(|i| values.get(i).copied())
                .ok_or_else(|| Trap::IndexOutOfRange {
                    array: name.to_string(),
                    index,
                }),
            Some(Cell::Scalar(..)) => Err(Trap::InvalidArgument("scalar indexed")),
            None => Err(Trap::UndeclaredVariable(name.to_string())),
        }
    }

    pub fn store_element(&mut self, name: &str, index: i64, value: Value) -> Result<(), Trap> {
        match self.cells.get_mut(name) {
            Some(Cell::Array(data_type, values)) => {
                let data_type = *data_type;
                let cell = usize::try_from(index)
                    .ok()
                    .and_then(|i| values.get_mut(i))
                    .ok_or_else(|| Trap::IndexOutOfRange {
                        array: name.to_string(),
                        index,
                    })?;
                *cell = value.coerce(data_type);
                Ok(())
            }
            Some(Cell::Scalar(..)) => Err(Trap::InvalidArgument("scalar indexed")),
            None => Err(Trap::UndeclaredVariable(name.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_when_initial_value_then_loaded() {
        let step = Variable::new("step_index", DataType::Short)
            .unwrap()
            .with_initial(3)
            .unwrap();
        let table = VariableTable::new(&[step]).unwrap();
        assert_eq!(table.load("step_index").unwrap(), Value::Int(3));
    }

    #[test]
    fn store_element_when_past_end_then_index_out_of_range() {
        let buffer = Variable::array("buffer", DataType::Short, 2).unwrap();
        let mut table = VariableTable::new(&[buffer]).unwrap();

        assert!(table.store_element("buffer", 1, Value::Int(1)).is_ok());
        assert_eq!(
            table.store_element("buffer", 2, Value::Int(1)),
            Err(Trap::IndexOutOfRange {
                array: String::from("buffer"),
                index: 2
            })
        );
    }

    #[test]
    fn load_when_undeclared_then_trap() {
        let table = VariableTable::new(&[]).unwrap();
        assert_eq!(
            table.load("missing"),
            Err(Trap::UndeclaredVariable(String::from("missing")))
        );
    }
}
