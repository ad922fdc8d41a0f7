//! FILENAME: parser/src/ast.rs
//! PURPOSE: Defines the Abstract Syntax Tree (AST) for column expressions.
//! CONTEXT: After the Lexer tokenizes an expression string, the Parser converts
//! those tokens into this tree structure. The engine's evaluator then walks
//! this tree once per table row.
//!
//! SUPPORTED EXPRESSIONS:
//! - Numeric literals: 2, 1.1, 1e3
//! - Column references: sales_amount, `unit price`
//! - Binary operations: +, -, *, /
//! - Unary operations: - (negation)

/// Represents a parsed column expression.
#[derive(Debug, PartialEq, Clone)]
pub enum Expression {
    /// A numeric literal.
    Number(f64),

    /// A reference to a column of the row being evaluated.
    Column(String),

    /// A binary operation: left op right (e.g., sales_amount / quantity).
    BinaryOp {
        left: Box<Expression>,
        op: BinaryOperator,
        right: Box<Expression>,
    },

    /// A unary operation: op operand (e.g., -discount).
    UnaryOp {
        op: UnaryOperator,
        operand: Box<Expression>,
    },
}

impl Expression {
    /// Builds `left op right` where both sides are column references.
    pub fn column_op(left: impl Into<String>, op: BinaryOperator, right: impl Into<String>) -> Self {
        Expression::BinaryOp {
            left: Box::new(Expression::Column(left.into())),
            op,
            right: Box::new(Expression::Column(right.into())),
        }
    }

    /// Returns every column name referenced by the expression, in first-seen order
    /// and without duplicates.
    pub fn columns(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_columns(&mut names);
        names
    }

    fn collect_columns<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Expression::Number(_) => {}
            Expression::Column(name) => {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
            Expression::BinaryOp { left, right, .. } => {
                left.collect_columns(names);
                right.collect_columns(names);
            }
            Expression::UnaryOp { operand, .. } => operand.collect_columns(names),
        }
    }
}

/// Binary arithmetic operators.
/// Listed in order of precedence groups (additive is lowest).
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum BinaryOperator {
    Add,      // +
    Subtract, // -
    Multiply, // *
    Divide,   // /
}

/// Unary operators.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum UnaryOperator {
    Negate, // -
}

impl std::fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BinaryOperator::Add => write!(f, "+"),
            BinaryOperator::Subtract => write!(f, "-"),
            BinaryOperator::Multiply => write!(f, "*"),
            BinaryOperator::Divide => write!(f, "/"),
        }
    }
}

impl std::fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnaryOperator::Negate => write!(f, "-"),
        }
    }
}

/// Renders the expression fully parenthesized.
impl std::fmt::Display for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expression::Number(n) => write!(f, "{}", n),
            Expression::Column(name) => {
                if is_bare_identifier(name) {
                    write!(f, "{}", name)
                } else {
                    write!(f, "`{}`", name.replace('`', "``"))
                }
            }
            Expression::BinaryOp { left, op, right } => write!(f, "({} {} {})", left, op, right),
            Expression::UnaryOp { op, operand } => write!(f, "{}{}", op, operand),
        }
    }
}

fn is_bare_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {
            chars.all(|ch| ch.is_alphabetic() || ch == '_' || ch.is_ascii_digit())
        }
        _ => false,
    }
}
