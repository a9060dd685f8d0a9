//! Query operation chain
//!
//! Each appended operation allocates a new immutable node pointing at its
//! input. Nodes are shared through `Arc`, so derived queries reuse their
//! common prefix and can be compiled from several threads at once.

use std::fmt;
use std::sync::Arc;

use crate::expression::Expr;

/// Kind tag of a query operation, used as the translator registry key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Where,
    Select,
    OrderBy,
    OrderByDescending,
    Skip,
    Take,
}

impl OperationKind {
    /// Every operation kind
    pub const ALL: [OperationKind; 6] = [
        OperationKind::Where,
        OperationKind::Select,
        OperationKind::OrderBy,
        OperationKind::OrderByDescending,
        OperationKind::Skip,
        OperationKind::Take,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Where => "Where",
            OperationKind::Select => "Select",
            OperationKind::OrderBy => "OrderBy",
            OperationKind::OrderByDescending => "OrderByDescending",
            OperationKind::Skip => "Skip",
            OperationKind::Take => "Take",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single declarative query operation
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOperation {
    Where { predicate: Expr },
    Select { projection: Expr },
    OrderBy { key: Expr },
    OrderByDescending { key: Expr },
    Skip { count: Expr },
    Take { count: Expr },
}

impl QueryOperation {
    pub fn kind(&self) -> OperationKind {
        match self {
            QueryOperation::Where { .. } => OperationKind::Where,
            QueryOperation::Select { .. } => OperationKind::Select,
            QueryOperation::OrderBy { .. } => OperationKind::OrderBy,
            QueryOperation::OrderByDescending { .. } => OperationKind::OrderByDescending,
            QueryOperation::Skip { .. } => OperationKind::Skip,
            QueryOperation::Take { .. } => OperationKind::Take,
        }
    }
}

/// One link in the operation chain
#[derive(Debug)]
pub struct QueryNode {
    input: Option<Arc<QueryNode>>,
    operation: QueryOperation,
    depth: usize,
}

impl QueryNode {
    /// Creates a node appending `operation` after `input`
    pub fn new(input: Option<Arc<QueryNode>>, operation: QueryOperation) -> Self {
        let depth = input.as_ref().map_or(1, |node| node.depth + 1);
        Self {
            input,
            operation,
            depth,
        }
    }

    pub fn operation(&self) -> &QueryOperation {
        &self.operation
    }

    pub fn input(&self) -> Option<&Arc<QueryNode>> {
        self.input.as_ref()
    }

    /// Number of operations from the root to this node, inclusive
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Returns the operations from the root to this node, root first
    pub fn chain(&self) -> Vec<&QueryOperation> {
        let mut operations = Vec::with_capacity(self.depth);
        let mut current = Some(self);
        while let Some(node) = current {
            operations.push(&node.operation);
            current = node.input.as_deref();
        }
        operations.reverse();
        operations
    }
}
