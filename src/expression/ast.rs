//! Query expression AST
//!
//! Expressions are lambda bodies over a single implicit parameter: the
//! document being queried. `field("Address.City")` is the member chain
//! `e.Address.City`; `field("Id").eq("")` is `e.Id == ""`.

use super::literal::Literal;

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl CompareOp {
    /// Returns the aggregation operator name
    pub fn operator(&self) -> &'static str {
        match self {
            CompareOp::Eq => "$eq",
            CompareOp::Ne => "$ne",
            CompareOp::Lt => "$lt",
            CompareOp::Lte => "$lte",
            CompareOp::Gt => "$gt",
            CompareOp::Gte => "$gte",
        }
    }

    /// Returns the operator that holds with operands swapped (`5 < x` is `x > 5`)
    pub fn mirrored(&self) -> Self {
        match self {
            CompareOp::Eq => CompareOp::Eq,
            CompareOp::Ne => CompareOp::Ne,
            CompareOp::Lt => CompareOp::Gt,
            CompareOp::Lte => CompareOp::Gte,
            CompareOp::Gt => CompareOp::Lt,
            CompareOp::Gte => CompareOp::Lte,
        }
    }
}

/// Boolean connectives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

impl LogicalOp {
    /// Returns the aggregation operator name
    pub fn operator(&self) -> &'static str {
        match self {
            LogicalOp::And => "$and",
            LogicalOp::Or => "$or",
        }
    }
}

/// A query sub-expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// The lambda parameter (the queried document)
    Parameter,
    /// Member access on `target`
    Member { target: Box<Expr>, name: String },
    /// Literal or captured value
    Constant(Literal),
    Compare {
        op: CompareOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Not(Box<Expr>),
    /// Object construction; member order is preserved
    New(Vec<(String, Expr)>),
    /// Method call on `target`
    Call {
        method: String,
        target: Box<Expr>,
        args: Vec<Expr>,
    },
}

/// Builds the member chain `e.a.b.c` from the dotted path `"a.b.c"`
pub fn field(path: &str) -> Expr {
    path.split('.')
        .fold(Expr::Parameter, |target, name| target.member(name))
}

/// Builds a constant expression
pub fn lit(value: impl Into<Literal>) -> Expr {
    Expr::Constant(value.into())
}

/// Builds an object construction from `(member, expression)` pairs
pub fn new_object<I, K>(members: I) -> Expr
where
    I: IntoIterator<Item = (K, Expr)>,
    K: Into<String>,
{
    Expr::New(
        members
            .into_iter()
            .map(|(name, expr)| (name.into(), expr))
            .collect(),
    )
}

impl Expr {
    /// Member access on this expression
    pub fn member(self, name: impl Into<String>) -> Self {
        Expr::Member {
            target: Box::new(self),
            name: name.into(),
        }
    }

    fn compare(self, op: CompareOp, other: impl Into<Expr>) -> Self {
        Expr::Compare {
            op,
            left: Box::new(self),
            right: Box::new(other.into()),
        }
    }

    pub fn eq(self, other: impl Into<Expr>) -> Self {
        self.compare(CompareOp::Eq, other)
    }

    pub fn ne(self, other: impl Into<Expr>) -> Self {
        self.compare(CompareOp::Ne, other)
    }

    pub fn lt(self, other: impl Into<Expr>) -> Self {
        self.compare(CompareOp::Lt, other)
    }

    pub fn lte(self, other: impl Into<Expr>) -> Self {
        self.compare(CompareOp::Lte, other)
    }

    pub fn gt(self, other: impl Into<Expr>) -> Self {
        self.compare(CompareOp::Gt, other)
    }

    pub fn gte(self, other: impl Into<Expr>) -> Self {
        self.compare(CompareOp::Gte, other)
    }

    /// `self && other`
    pub fn and(self, other: Expr) -> Self {
        Expr::Logical {
            op: LogicalOp::And,
            left: Box::new(self),
            right: Box::new(other),
        }
    }

    /// `self || other`
    pub fn or(self, other: Expr) -> Self {
        Expr::Logical {
            op: LogicalOp::Or,
            left: Box::new(self),
            right: Box::new(other),
        }
    }

    /// `!self`
    pub fn not(self) -> Self {
        Expr::Not(Box::new(self))
    }

    /// `self.method(args...)`
    pub fn call(self, method: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Call {
            method: method.into(),
            target: Box::new(self),
            args,
        }
    }

    /// `self.contains(item)`
    pub fn contains(self, item: Expr) -> Self {
        self.call("contains", vec![item])
    }

    /// Returns the member names from the parameter to this access, root first.
    ///
    /// Returns None if the chain is not rooted at the parameter.
    pub fn member_chain(&self) -> Option<Vec<&str>> {
        let mut names = Vec::new();
        let mut current = self;
        loop {
            match current {
                Expr::Member { target, name } => {
                    names.push(name.as_str());
                    current = target;
                }
                Expr::Parameter if !names.is_empty() => {
                    names.reverse();
                    return Some(names);
                }
                _ => return None,
            }
        }
    }

    /// Short description of the expression kind for error messages
    pub fn describe(&self) -> String {
        match self {
            Expr::Parameter => "parameter".to_string(),
            Expr::Member { name, .. } => format!("member access `{}`", name),
            Expr::Constant(lit) => format!("{} constant", lit.type_name()),
            Expr::Compare { op, .. } => format!("comparison `{}`", op.operator()),
            Expr::Logical { op, .. } => format!("connective `{}`", op.operator()),
            Expr::Not(_) => "negation".to_string(),
            Expr::New(_) => "object construction".to_string(),
            Expr::Call { method, .. } => format!("method call `{}`", method),
        }
    }
}

macro_rules! expr_from_literal {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Expr {
                fn from(value: $ty) -> Self {
                    Expr::Constant(Literal::from(value))
                }
            }
        )*
    };
}

expr_from_literal!(
    bool,
    i32,
    i64,
    u32,
    u64,
    usize,
    f64,
    &str,
    String,
    chrono::DateTime<chrono::Utc>,
    uuid::Uuid,
);

impl From<Literal> for Expr {
    fn from(value: Literal) -> Self {
        Expr::Constant(value)
    }
}
