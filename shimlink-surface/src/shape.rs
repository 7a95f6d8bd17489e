// Export shapes: the coarse kind of value a module exports

use serde::Serialize;
use std::fmt;

/// What static analysis could tell about an exported binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ExportShape {
    /// Function or arrow function; `arity` is `None` when rest parameters
    /// or conflicting overloads hide it
    Callable { arity: Option<usize> },
    Class,
    /// String, number, boolean or null literal
    Constant,
    /// Type-only export (interface, type alias), erased at bundle time
    Type,
    Unknown,
}

impl ExportShape {
    pub fn callable(arity: usize) -> Self {
        ExportShape::Callable { arity: Some(arity) }
    }

    pub fn is_type_only(&self) -> bool {
        matches!(self, ExportShape::Type)
    }

    /// Whether `shim` can stand in for a binding of shape `self`.
    ///
    /// `Unknown` on either side is accepted: a shape we could not see
    /// cannot be held against the shim.
    pub fn is_compatible_with(&self, shim: &ExportShape) -> bool {
        use ExportShape::*;

        match (self, shim) {
            (Unknown, _) | (_, Unknown) => true,
            (Type, Type) => true,
            (Type, _) | (_, Type) => false,
            (Constant, Constant) => true,
            (Constant, _) | (_, Constant) => false,
            (Callable { arity: Some(a) }, Callable { arity: Some(b) }) => a == b,
            (Callable { .. }, Callable { .. }) => true,
            // React components are commonly classes on one side and
            // functions on the other.
            (Callable { .. }, Class) | (Class, Callable { .. }) | (Class, Class) => true,
        }
    }

    /// Merge two declarations of the same exported name (TS overloads,
    /// declaration merging)
    pub fn merge(self, other: ExportShape) -> ExportShape {
        use ExportShape::*;

        match (self, other) {
            (Type, runtime) | (runtime, Type) => runtime,
            (Callable { arity: a }, Callable { arity: b }) if a != b => Callable { arity: None },
            (first, _) => first,
        }
    }
}

impl fmt::Display for ExportShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportShape::Callable { arity: Some(n) } => {
                write!(f, "function taking {} argument{}", n, if *n == 1 { "" } else { "s" })
            }
            ExportShape::Callable { arity: None } => write!(f, "function"),
            ExportShape::Class => write!(f, "class"),
            ExportShape::Constant => write!(f, "constant"),
            ExportShape::Type => write!(f, "type"),
            ExportShape::Unknown => write!(f, "value"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_is_compatible_with_everything() {
        let shapes = [
            ExportShape::callable(2),
            ExportShape::Class,
            ExportShape::Constant,
            ExportShape::Type,
            ExportShape::Unknown,
        ];
        for shape in shapes {
            assert!(ExportShape::Unknown.is_compatible_with(&shape));
            assert!(shape.is_compatible_with(&ExportShape::Unknown));
        }
    }

    #[test]
    fn test_arity_mismatch() {
        assert!(!ExportShape::callable(1).is_compatible_with(&ExportShape::callable(2)));
        assert!(ExportShape::callable(1).is_compatible_with(&ExportShape::callable(1)));
        assert!(ExportShape::Callable { arity: None }.is_compatible_with(&ExportShape::callable(3)));
    }

    #[test]
    fn test_type_cannot_stand_in_for_value() {
        assert!(!ExportShape::Class.is_compatible_with(&ExportShape::Type));
        assert!(!ExportShape::Type.is_compatible_with(&ExportShape::Constant));
        assert!(!ExportShape::Constant.is_compatible_with(&ExportShape::callable(0)));
    }

    #[test]
    fn test_merge_overloads() {
        let merged = ExportShape::callable(1).merge(ExportShape::callable(2));
        assert_eq!(merged, ExportShape::Callable { arity: None });
        assert_eq!(ExportShape::Type.merge(ExportShape::Class), ExportShape::Class);
    }
}
