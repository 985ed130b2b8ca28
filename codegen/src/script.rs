//! Baked macro text and the options that control it.
use std::fmt;

use serde::{Deserialize, Serialize};

/// Options for rendering macro text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BakeOptions {
    /// Spaces per nesting level.
    pub indent: usize,
    /// Emit the macro description as a leading comment.
    pub describe: bool,
}

impl Default for BakeOptions {
    fn default() -> Self {
        Self {
            indent: 4,
            describe: true,
        }
    }
}

/// The text of one macro as it is pasted into the EasyBuilder project.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BakedMacro {
    pub name: String,
    pub description: String,
    pub text: String,
}

/// The result of baking a macro: the macro itself followed by every
/// companion macro it spawned.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Script {
    pub macros: Vec<BakedMacro>,
}

impl Script {
    /// The macro that was baked. Companions follow it.
    pub fn main(&self) -> Option<&BakedMacro> {
        self.macros.first()
    }

    pub fn get(&self, name: &str) -> Option<&BakedMacro> {
        self.macros.iter().find(|m| m.name == name)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, baked) in self.macros.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            writeln!(f, "// ---- {} ----", baked.name)?;
            f.write_str(&baked.text)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script() -> Script {
        Script {
            macros: vec![
                BakedMacro {
                    name: String::from("pump"),
                    description: String::from("Pump sequence"),
                    text: String::from("macro_command main()\nend macro_command\n"),
                },
                BakedMacro {
                    name: String::from("pump_loop"),
                    description: String::new(),
                    text: String::from("macro_command main()\nend macro_command\n"),
                },
            ],
        }
    }

    #[test]
    fn to_json_when_script_then_deserializes_to_same() {
        let script = script();
        let json = script.to_json().unwrap();
        let parsed: Script = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, script);
    }

    #[test]
    fn get_when_companion_name_then_found() {
        let script = script();
        assert_eq!(script.main().map(|m| m.name.as_str()), Some("pump"));
        assert!(script.get("pump_loop").is_some());
        assert!(script.get("other").is_none());
    }

    #[test]
    fn display_when_two_macros_then_headers_separate() {
        let text = script().to_string();
        assert!(text.starts_with("// ---- pump ----\n"));
        assert!(text.contains("\n\n// ---- pump_loop ----\n"));
    }
}
