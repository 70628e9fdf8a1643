//! Grammar node payloads and the closed set of grammar constructs.

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Distance recorded for nodes that cannot (yet) reach an all-terminal
/// derivation. Large but far from `u32::MAX` so sums stay representable.
pub const UNREACHABLE: u32 = 100_000_000;

/// The grammar construct a node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrammarType {
    /// A named rule; its single child is the rule body.
    Production,
    /// Alternation (`a | b`).
    Or,
    /// Sequence (`a b`).
    Catenate,
    /// Bracketed optional part (`[ a ]`).
    Optional,
    /// Zero-or-more repetition (`{ a }`).
    Rep,
    /// One-or-more repetition (`a+`).
    Plus,
    /// Exception (`a - b`).
    Ext,
    /// Grouping (`( a )`).
    Sub,
    /// Reference to another production by name.
    Id,
    /// Literal text or a quoted regex template.
    Terminal,
    /// Choice among alternatives resolved like `Or`.
    Choice,
}

impl GrammarType {
    /// Every grammar type, in flag order.
    pub const ALL: [GrammarType; 11] = [
        GrammarType::Production,
        GrammarType::Or,
        GrammarType::Catenate,
        GrammarType::Optional,
        GrammarType::Rep,
        GrammarType::Plus,
        GrammarType::Ext,
        GrammarType::Sub,
        GrammarType::Id,
        GrammarType::Terminal,
        GrammarType::Choice,
    ];

    /// Dense index of this type, matching its position in [`GrammarType::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// The singleton set containing this type.
    pub fn mask(self) -> TypeSet {
        match self {
            GrammarType::Production => TypeSet::PRODUCTION,
            GrammarType::Or => TypeSet::OR,
            GrammarType::Catenate => TypeSet::CATENATE,
            GrammarType::Optional => TypeSet::OPTIONAL,
            GrammarType::Rep => TypeSet::REP,
            GrammarType::Plus => TypeSet::PLUS,
            GrammarType::Ext => TypeSet::EXT,
            GrammarType::Sub => TypeSet::SUB,
            GrammarType::Id => TypeSet::ID,
            GrammarType::Terminal => TypeSet::TERMINAL,
            GrammarType::Choice => TypeSet::CHOICE,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GrammarType::Production => "GrammarProduction",
            GrammarType::Or => "GrammarOR",
            GrammarType::Catenate => "GrammarCatenate",
            GrammarType::Optional => "GrammarOptional",
            GrammarType::Rep => "GrammarREP",
            GrammarType::Plus => "GrammarPLUS",
            GrammarType::Ext => "GrammarEXT",
            GrammarType::Sub => "GrammarSUB",
            GrammarType::Id => "GrammarID",
            GrammarType::Terminal => "GrammarTerminal",
            GrammarType::Choice => "GrammarChoice",
        }
    }
}

impl fmt::Display for GrammarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

bitflags! {
    /// A set of grammar types a handler is willing to process.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TypeSet: u16 {
        const PRODUCTION = 1 << 0;
        const OR = 1 << 1;
        const CATENATE = 1 << 2;
        const OPTIONAL = 1 << 3;
        const REP = 1 << 4;
        const PLUS = 1 << 5;
        const EXT = 1 << 6;
        const SUB = 1 << 7;
        const ID = 1 << 8;
        const TERMINAL = 1 << 9;
        const CHOICE = 1 << 10;
    }
}

impl TypeSet {
    /// Matches every grammar type. Used by observers that must see each
    /// dispatch.
    pub const ALL_TYPES: TypeSet = TypeSet::all();

    /// Whether a node of type `ty` belongs to this set.
    pub fn accepts(self, ty: GrammarType) -> bool {
        self.intersects(ty.mask())
    }
}

impl From<GrammarType> for TypeSet {
    fn from(ty: GrammarType) -> Self {
        ty.mask()
    }
}

/// Payload of a grammar vertex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// The construct this node represents.
    #[serde(rename = "type")]
    pub kind: GrammarType,
    /// Terminal text, or the production name an `Id` refers to.
    pub content: String,
    /// Minimum expansion steps to an all-terminal derivation.
    pub distance: u32,
}

impl Node {
    pub fn new(kind: GrammarType, content: impl Into<String>) -> Self {
        let distance = if kind == GrammarType::Terminal { 0 } else { UNREACHABLE };
        Self {
            kind,
            content: content.into(),
            distance,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.kind == GrammarType::Terminal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_masks_are_distinct() {
        let mut seen = TypeSet::empty();
        for ty in GrammarType::ALL {
            assert!(!seen.intersects(ty.mask()), "{} overlaps", ty);
            seen |= ty.mask();
        }
        assert_eq!(seen, TypeSet::ALL_TYPES);
    }

    #[test]
    fn test_index_matches_all_order() {
        for (i, ty) in GrammarType::ALL.iter().enumerate() {
            assert_eq!(ty.index(), i);
        }
    }

    #[test]
    fn test_accepts() {
        let cat = TypeSet::PRODUCTION | TypeSet::CATENATE;
        assert!(cat.accepts(GrammarType::Catenate));
        assert!(cat.accepts(GrammarType::Production));
        assert!(!cat.accepts(GrammarType::Or));
        assert!(TypeSet::ALL_TYPES.accepts(GrammarType::Choice));
    }

    #[test]
    fn test_new_node_distance() {
        assert_eq!(Node::new(GrammarType::Terminal, "'a'").distance, 0);
        assert_eq!(Node::new(GrammarType::Or, "").distance, UNREACHABLE);
    }
}
