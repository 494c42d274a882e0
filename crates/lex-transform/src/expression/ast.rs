//! Syntax tree for the whitelisted expression language.

use super::ExpressionError;

/// A parsed expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Literal value.
    Literal(Literal),
    /// Reference to a dataset column by exact name.
    Column(String),
    /// Unary operation.
    Unary { op: UnaryOp, operand: Box<Expr> },
    /// Binary operation.
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Membership test against a literal list.
    InList {
        operand: Box<Expr>,
        list: Vec<Expr>,
        negated: bool,
    },
    /// Call to a whitelisted function.
    Call { function: Function, args: Vec<Expr> },
}

impl Expr {
    /// Names of every column referenced by this expression, in first-use order.
    pub fn columns(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Literal(_) => {}
            Expr::Column(name) => {
                if !out.contains(&name.as_str()) {
                    out.push(name);
                }
            }
            Expr::Unary { operand, .. } => operand.collect_columns(out),
            Expr::Binary { left, right, .. } => {
                left.collect_columns(out);
                right.collect_columns(out);
            }
            Expr::InList { operand, list, .. } => {
                operand.collect_columns(out);
                for item in list {
                    item.collect_columns(out);
                }
            }
            Expr::Call { args, .. } => {
                for arg in args {
                    arg.collect_columns(out);
                }
            }
        }
    }
}

/// Literal values.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Pow => "**",
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::And => "and",
            Self::Or => "or",
        }
    }
}

/// The complete set of functions callable from an expression.
///
/// There is no other way to reach behaviour from inside an expression: names
/// not listed here fail to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Abs,
    Sqrt,
    Log,
    Log10,
    Exp,
    Round,
    Floor,
    Ceil,
    Min,
    Max,
    Pow,
    Len,
    Lower,
    Upper,
    IsNull,
    NotNull,
    Coalesce,
    Year,
    Month,
    Day,
    Weekday,
    Hour,
    Date,
    Now,
    Today,
    DaysBetween,
}

/// Accepted argument counts.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Arity {
    Exact(usize),
    Range(usize, usize),
    AtLeast(usize),
}

impl Arity {
    fn accepts(&self, n: usize) -> bool {
        match *self {
            Arity::Exact(k) => n == k,
            Arity::Range(lo, hi) => (lo..=hi).contains(&n),
            Arity::AtLeast(k) => n >= k,
        }
    }

    fn describe(&self) -> String {
        match *self {
            Arity::Exact(k) => format!("{}", k),
            Arity::Range(lo, hi) => format!("{} to {}", lo, hi),
            Arity::AtLeast(k) => format!("at least {}", k),
        }
    }
}

impl Function {
    /// Resolve a function name (case-insensitive). Aliases cover the spellings
    /// commonly produced for pandas/numpy-flavoured recommendations.
    pub fn from_name(name: &str) -> Option<Self> {
        let f = match name.to_ascii_lowercase().as_str() {
            "abs" => Self::Abs,
            "sqrt" => Self::Sqrt,
            "log" | "ln" => Self::Log,
            "log10" => Self::Log10,
            "exp" => Self::Exp,
            "round" => Self::Round,
            "floor" => Self::Floor,
            "ceil" => Self::Ceil,
            "min" => Self::Min,
            "max" => Self::Max,
            "pow" => Self::Pow,
            "len" | "length" => Self::Len,
            "lower" => Self::Lower,
            "upper" => Self::Upper,
            "is_null" | "isnull" | "isna" => Self::IsNull,
            "not_null" | "notnull" | "notna" => Self::NotNull,
            "coalesce" => Self::Coalesce,
            "year" => Self::Year,
            "month" => Self::Month,
            "day" => Self::Day,
            "weekday" | "dayofweek" => Self::Weekday,
            "hour" => Self::Hour,
            "date" | "to_datetime" => Self::Date,
            "now" => Self::Now,
            "today" => Self::Today,
            "days_between" => Self::DaysBetween,
            _ => return None,
        };
        Some(f)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Abs => "abs",
            Self::Sqrt => "sqrt",
            Self::Log => "log",
            Self::Log10 => "log10",
            Self::Exp => "exp",
            Self::Round => "round",
            Self::Floor => "floor",
            Self::Ceil => "ceil",
            Self::Min => "min",
            Self::Max => "max",
            Self::Pow => "pow",
            Self::Len => "len",
            Self::Lower => "lower",
            Self::Upper => "upper",
            Self::IsNull => "is_null",
            Self::NotNull => "not_null",
            Self::Coalesce => "coalesce",
            Self::Year => "year",
            Self::Month => "month",
            Self::Day => "day",
            Self::Weekday => "weekday",
            Self::Hour => "hour",
            Self::Date => "date",
            Self::Now => "now",
            Self::Today => "today",
            Self::DaysBetween => "days_between",
        }
    }

    pub(crate) fn arity(&self) -> Arity {
        match self {
            Self::Round => Arity::Range(1, 2),
            Self::Min | Self::Max | Self::Coalesce => Arity::AtLeast(1),
            Self::Pow | Self::DaysBetween => Arity::Exact(2),
            Self::Now | Self::Today => Arity::Exact(0),
            _ => Arity::Exact(1),
        }
    }

    /// Fail unless `n` arguments are acceptable.
    pub(crate) fn check_arity(&self, n: usize) -> Result<(), ExpressionError> {
        let arity = self.arity();
        if arity.accepts(n) {
            Ok(())
        } else {
            Err(ExpressionError::Arity {
                function: self.name().to_string(),
                expected: arity.describe(),
                found: n,
            })
        }
    }
}
