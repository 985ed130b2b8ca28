//! Output writer for macro statements. The writer transforms a statement
//! tree into EasyBuilder macro text.

use ebmacro_dsl::common::*;
use ebmacro_dsl::diagnostic::Diagnostic;
use ebmacro_dsl::expression::*;
use ebmacro_dsl::statement::*;
use ebmacro_dsl::visitor::Visitor;
use paste::paste;

/// Defines a macro for creating a comma separated list of items where
/// each item in the list is created by visiting the item.
macro_rules! visit_comma_separated {
    ($self:ident, $iter:expr, $struct_name:ident) => {
        paste! {
            {
                let mut it = $iter.peekable();
                while let Some(item) = it.next() {
                    $self.[<visit_ $struct_name:snake>](item)?;
                    if it.peek().is_some() {
                        $self.write(", ");
                    }
                }
            }
        }
    };
}

/// Renders the statements into lines, one line per leaf, comment or
/// structural keyword. Nested bodies are indented by `width` spaces per
/// level.
pub fn apply(stmts: &[Stmt], width: usize) -> Result<Vec<String>, Diagnostic> {
    let mut visitor = MacroRenderer::new(width);
    visitor.walk(stmts).map(|_| visitor.lines)
}

/// Renders a single operand as it appears inside a statement.
pub fn operand_text(operand: &Operand) -> Result<String, Diagnostic> {
    let mut visitor = MacroRenderer::new(0);
    visitor.visit_operand(operand)?;
    Ok(visitor.current)
}

struct MacroRenderer {
    lines: Vec<String>,
    current: String,
    indents: usize,
    width: usize,
}

impl MacroRenderer {
    fn new(width: usize) -> Self {
        Self {
            lines: vec![],
            current: String::new(),
            indents: 0,
            width,
        }
    }

    fn write(&mut self, val: &str) {
        self.current.push_str(val);
    }

    fn newline(&mut self) {
        let line = std::mem::take(&mut self.current);
        if line.is_empty() {
            self.lines.push(line);
        } else {
            self.lines
                .push(format!("{}{}", " ".repeat(self.indents * self.width), line));
        }
    }

    fn indent(&mut self) {
        self.indents += 1;
    }

    fn outdent(&mut self) {
        self.indents -= 1;
    }

    /// Writes an operand of an operator, in parentheses when it is itself
    /// an operator expression.
    fn write_term(&mut self, operand: &Operand) -> Result<(), Diagnostic> {
        let nested = match operand {
            Operand::Expr(expr) => !matches!(expr.as_ref(), Expr::Call(_)),
            Operand::Literal(Literal::Int(v)) => *v < 0,
            Operand::Literal(Literal::Float(v)) => v.is_sign_negative(),
            _ => false,
        };
        if nested {
            self.write("(");
            self.visit_operand(operand)?;
            self.write(")");
        } else {
            self.visit_operand(operand)?;
        }
        Ok(())
    }
}

impl Visitor<Diagnostic> for MacroRenderer {
    type Value = ();

    fn visit_if_chain(&mut self, node: &IfChain) -> Result<Self::Value, Diagnostic> {
        for (i, branch) in node.branches().iter().enumerate() {
            match &branch.condition {
                Some(condition) => {
                    self.write(if i == 0 { "if " } else { "else if " });
                    self.visit_operand(condition)?;
                    self.write(" then");
                }
                None => self.write("else"),
            }
            self.newline();
            self.indent();
            self.visit_block(&branch.body)?;
            self.outdent();
        }
        self.write("end if");
        self.newline();
        Ok(())
    }

    fn visit_switch(&mut self, node: &Switch) -> Result<Self::Value, Diagnostic> {
        self.write("select case ");
        self.visit_operand(node.selector())?;
        self.newline();
        self.indent();
        for case in node.cases() {
            match case.label {
                Some(label) => self.write(&format!("case {}", label)),
                None => self.write("case else"),
            }
            self.newline();
            self.indent();
            self.visit_block(&case.body)?;
            self.write("break");
            self.newline();
            self.outdent();
        }
        self.outdent();
        self.write("end select");
        self.newline();
        Ok(())
    }

    fn visit_comment(&mut self, node: &Comment) -> Result<Self::Value, Diagnostic> {
        let lines: Vec<&str> = if node.text.is_empty() {
            vec![""]
        } else {
            node.text.lines().collect()
        };
        for line in lines {
            if line.is_empty() {
                self.write("//");
            } else {
                self.write("// ");
                self.write(line);
            }
            self.newline();
        }
        Ok(())
    }

    fn visit_empty(&mut self) -> Result<Self::Value, Diagnostic> {
        self.newline();
        Ok(())
    }

    fn visit_call(&mut self, node: &Call) -> Result<Self::Value, Diagnostic> {
        self.write(node.name());
        self.write("(");
        visit_comma_separated!(self, node.args().iter(), Operand);
        self.write(")");
        self.newline();
        Ok(())
    }

    fn visit_evaluate(&mut self, node: &Evaluate) -> Result<Self::Value, Diagnostic> {
        self.visit_operand(node.destination())?;
        self.write(" = ");
        self.visit_operand(node.value())?;
        self.newline();
        Ok(())
    }

    fn visit_binary_expr(&mut self, node: &BinaryExpr) -> Result<Self::Value, Diagnostic> {
        self.write_term(node.left())?;
        self.write(" ");
        self.write(node.op().symbol());
        self.write(" ");
        self.write_term(node.right())
    }

    fn visit_unary_expr(&mut self, node: &UnaryExpr) -> Result<Self::Value, Diagnostic> {
        self.write(node.op().symbol());
        if node.op() != UnaryOp::Neg {
            self.write(" ");
        }
        self.write_term(node.term())
    }

    fn visit_call_expr(&mut self, node: &CallExpr) -> Result<Self::Value, Diagnostic> {
        self.write(node.name());
        self.write("(");
        visit_comma_separated!(self, node.args().iter(), Operand);
        self.write(")");
        Ok(())
    }

    fn visit_variable(&mut self, node: &Variable) -> Result<Self::Value, Diagnostic> {
        self.write(node.name());
        Ok(())
    }

    fn visit_element(&mut self, node: &Element) -> Result<Self::Value, Diagnostic> {
        self.write(node.array().name());
        self.write("[");
        self.visit_operand(node.index())?;
        self.write("]");
        Ok(())
    }

    fn visit_tag(&mut self, node: &Tag) -> Result<Self::Value, Diagnostic> {
        let address = node.address();
        self.write(&format!(
            "\"{}\", {}, {}",
            node.device(),
            address.register(),
            address.offset()
        ));
        Ok(())
    }

    fn visit_literal(&mut self, node: &Literal) -> Result<Self::Value, Diagnostic> {
        self.write(&node.to_string());
        Ok(())
    }
}
