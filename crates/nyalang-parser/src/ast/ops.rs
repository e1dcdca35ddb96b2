//! Operators, their precedence, and the host operator-method names they map to.

use crate::lexer::TokenKind;
use std::fmt;

/// Binary operators, lowest precedence first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    /// `??` (right associative)
    Coalesce,
    /// `|`
    BitOr,
    /// `^`
    BitXor,
    /// `&`
    BitAnd,
    /// `<<`
    Shl,
    /// `>>`
    Shr,
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Rem,
}

impl BinaryOp {
    /// Left and right binding power for the Pratt loop.
    pub fn binding_power(self) -> (u8, u8) {
        use BinaryOp::*;
        match self {
            Coalesce => (2, 1),
            BitOr => (3, 4),
            BitXor => (5, 6),
            BitAnd => (7, 8),
            Shl | Shr => (9, 10),
            Add | Sub => (11, 12),
            Mul | Div | Rem => (13, 14),
        }
    }

    pub fn from_token(token: TokenKind) -> Option<Self> {
        use TokenKind::*;
        Some(match token {
            QuestionQuestion => BinaryOp::Coalesce,
            Pipe => BinaryOp::BitOr,
            Caret => BinaryOp::BitXor,
            Amp => BinaryOp::BitAnd,
            LessLess => BinaryOp::Shl,
            GreaterGreater => BinaryOp::Shr,
            Plus => BinaryOp::Add,
            Minus => BinaryOp::Sub,
            Star => BinaryOp::Mul,
            Slash => BinaryOp::Div,
            Percent => BinaryOp::Rem,
            _ => return None,
        })
    }

    /// Name of the operator method a type may define for this operator.
    ///
    /// `??` is not overloadable and has no method name.
    pub fn method_name(self) -> Option<&'static str> {
        use BinaryOp::*;
        Some(match self {
            Coalesce => return None,
            BitOr => "op_BitwiseOr",
            BitXor => "op_ExclusiveOr",
            BitAnd => "op_BitwiseAnd",
            Shl => "op_LeftShift",
            Shr => "op_RightShift",
            Add => "op_Addition",
            Sub => "op_Subtraction",
            Mul => "op_Multiply",
            Div => "op_Division",
            Rem => "op_Modulus",
        })
    }

    pub fn as_str(self) -> &'static str {
        use BinaryOp::*;
        match self {
            Coalesce => "??",
            BitOr => "|",
            BitXor => "^",
            BitAnd => "&",
            Shl => "<<",
            Shr => ">>",
            Add => "+",
            Sub => "-",
            Mul => "*",
            Div => "/",
            Rem => "%",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Prefix operators. Only negation exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
}

impl UnaryOp {
    pub fn binding_power() -> u8 {
        15
    }

    pub fn method_name(self) -> &'static str {
        "op_UnaryNegation"
    }
}

/// Assignment operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssignOp {
    /// `=`
    Assign,
    /// `op=`, applying the wrapped binary operator.
    Compound(BinaryOp),
    /// `?=`, storing only when the current value is null.
    Coalesce,
}

impl AssignOp {
    pub fn from_token(token: TokenKind) -> Option<Self> {
        use TokenKind::*;
        Some(match token {
            Equal => AssignOp::Assign,
            QuestionEqual => AssignOp::Coalesce,
            PlusEqual => AssignOp::Compound(BinaryOp::Add),
            MinusEqual => AssignOp::Compound(BinaryOp::Sub),
            StarEqual => AssignOp::Compound(BinaryOp::Mul),
            SlashEqual => AssignOp::Compound(BinaryOp::Div),
            PercentEqual => AssignOp::Compound(BinaryOp::Rem),
            AmpEqual => AssignOp::Compound(BinaryOp::BitAnd),
            PipeEqual => AssignOp::Compound(BinaryOp::BitOr),
            CaretEqual => AssignOp::Compound(BinaryOp::BitXor),
            LessLessEqual => AssignOp::Compound(BinaryOp::Shl),
            GreaterGreaterEqual => AssignOp::Compound(BinaryOp::Shr),
            _ => return None,
        })
    }
}

impl fmt::Display for AssignOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssignOp::Assign => f.write_str("="),
            AssignOp::Compound(op) => write!(f, "{op}="),
            AssignOp::Coalesce => f.write_str("?="),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precedence_ordering() {
        let (add, _) = BinaryOp::Add.binding_power();
        let (mul, _) = BinaryOp::Mul.binding_power();
        let (shl, _) = BinaryOp::Shl.binding_power();
        let (coalesce, _) = BinaryOp::Coalesce.binding_power();
        assert!(coalesce < shl && shl < add && add < mul);
        assert!(mul < UnaryOp::binding_power());
    }

    #[test]
    fn coalesce_is_right_associative() {
        let (l, r) = BinaryOp::Coalesce.binding_power();
        assert!(r < l);
        let (l, r) = BinaryOp::Sub.binding_power();
        assert!(l < r);
    }

    #[test]
    fn operator_method_names() {
        assert_eq!(BinaryOp::Add.method_name(), Some("op_Addition"));
        assert_eq!(BinaryOp::Shr.method_name(), Some("op_RightShift"));
        assert_eq!(BinaryOp::Coalesce.method_name(), None);
    }

    #[test]
    fn compound_assignment_from_token() {
        assert_eq!(
            AssignOp::from_token(TokenKind::LessLessEqual),
            Some(AssignOp::Compound(BinaryOp::Shl))
        );
        assert_eq!(AssignOp::from_token(TokenKind::QuestionEqual), Some(AssignOp::Coalesce));
        assert_eq!(AssignOp::from_token(TokenKind::QuestionQuestion), None);
        assert_eq!(AssignOp::Compound(BinaryOp::Rem).to_string(), "%=");
    }
}
