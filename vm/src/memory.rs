use std::collections::HashMap;

use ebmacro_dsl::common::Tag;

use crate::value::Value;

/// Simulated device memory shared by every macro the interpreter runs.
///
/// Cells are addressed by device, register class and offset. A multi
/// element transfer touches consecutive offsets. Cells that were never
/// written read as zero of the tag's type.
#[derive(Clone, Debug, Default)]
pub struct DeviceMemory {
    cells: HashMap<(String, String, u64), Value>,
}

impl DeviceMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the cell `element` positions after the tag's address.
    pub fn read(&self, tag: &Tag, element: u64) -> Value {
        let data_type = tag.tag_type().data_type();
        self.cells
            .get(&Self::key(tag, element))
            .map(|v| v.coerce(data_type))
            .unwrap_or_else(|| Value::zero(data_type))
    }

    /// Writes the cell `element` positions after the tag's address.
    pub fn write(&mut self, tag: &Tag, element: u64, value: Value) {
        let data_type = tag.tag_type().data_type();
        self.cells
            .insert(Self::key(tag, element), value.coerce(data_type));
    }

    pub fn get(&self, tag: &Tag) -> Value {
        self.read(tag, 0)
    }

    pub fn set(&mut self, tag: &Tag, value: impl Into<Value>) {
        self.write(tag, 0, value.into());
    }

    fn key(tag: &Tag, element: u64) -> (String, String, u64) {
        let address = tag.address();
        (
            tag.device().to_string(),
            address.register().to_string(),
            address.offset() + element,
        )
    }
}
