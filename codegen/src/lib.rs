//! Lowers statement trees into EasyBuilder macro text.
//!
//! The entry point is [`Macro`]: open it, write statements, close it and
//! bake it into a [`Script`].

mod declarations;
pub mod macros;
mod renderer;
pub mod script;

pub use declarations::declaration;
pub use macros::{Macro, MacroState};
pub use renderer::operand_text;
pub use script::{BakeOptions, BakedMacro, Script};
