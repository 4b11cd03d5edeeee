use std::fmt;

use crate::model::ticket::{Status, TicketType};

/// Comparison operator used by numeric filter atoms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Lt,
    Gt,
    Le,
    Ge,
}

impl CmpOp {
    pub fn apply(self, lhs: i64, rhs: i64) -> bool {
        match self {
            CmpOp::Eq => lhs == rhs,
            CmpOp::Lt => lhs < rhs,
            CmpOp::Gt => lhs > rhs,
            CmpOp::Le => lhs <= rhs,
            CmpOp::Ge => lhs >= rhs,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CmpOp::Eq => "=",
            CmpOp::Lt => "<",
            CmpOp::Gt => ">",
            CmpOp::Le => "<=",
            CmpOp::Ge => ">=",
        }
    }
}

/// A compiled lane filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterExpr {
    Status(Status),
    Tag(String),
    Type(TicketType),
    Priority(CmpOp, i64),
    Points(CmpOp, i64),
    Assignee(String),
    /// Whole days since `created_at`
    AgeDays(CmpOp, i64),
    /// `updated_at` no older than this many days
    UpdatedWithinDays(i64),
    /// Assigned to the current VCS user
    Me,
    True,
    And(Vec<FilterExpr>),
    Or(Vec<FilterExpr>),
    Not(Box<FilterExpr>),
}

impl Default for FilterExpr {
    fn default() -> Self {
        FilterExpr::True
    }
}

impl fmt::Display for FilterExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterExpr::Status(s) => write!(f, "status={}", s),
            FilterExpr::Tag(t) => write!(f, "tag={}", t),
            FilterExpr::Type(t) => write!(f, "type={}", t),
            FilterExpr::Priority(op, n) => write!(f, "priority{}{}", op.as_str(), n),
            FilterExpr::Points(op, n) => write!(f, "points{}{}", op.as_str(), n),
            FilterExpr::Assignee(a) => write!(f, "assignee={}", a),
            FilterExpr::AgeDays(op, n) => write!(f, "age{}{}d", op.as_str(), n),
            FilterExpr::UpdatedWithinDays(n) => write!(f, "updated<={}d", n),
            FilterExpr::Me => f.write_str("me"),
            FilterExpr::True => Ok(()),
            FilterExpr::And(items) => write_joined(f, items, " and "),
            FilterExpr::Or(items) => write_joined(f, items, " or "),
            FilterExpr::Not(inner) => write!(f, "not ({})", inner),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, items: &[FilterExpr], sep: &str) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "({})", item)?;
    }
    Ok(())
}
