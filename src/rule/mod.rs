//! rule — правила схемы, которые хранит стор.
//!
//! SchemaRule — закрытый набор видов (enum). Новый вид = новый вариант + пара
//! encode/decode в codec.rs; остальной стор видит только байты.

pub mod codec;

use serde::Serialize;

pub use codec::{decode_rule, encode_rule, INDEX_RULE_HEADER_LEN};

/// Дискриминатор вида правила (байт kind в payload).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    IndexRule,
}

impl Kind {
    pub const INDEX_RULE_ID: u8 = 1;

    #[inline]
    pub fn id(self) -> u8 {
        match self {
            Kind::IndexRule => Self::INDEX_RULE_ID,
        }
    }

    pub fn from_id(id: u8) -> Option<Kind> {
        match id {
            Self::INDEX_RULE_ID => Some(Kind::IndexRule),
            _ => None,
        }
    }
}

/// Индекс по (label, property key).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct IndexRule {
    pub id: u64,
    pub label_id: i32,
    pub property_key: String,
}

impl IndexRule {
    pub fn new(id: u64, label_id: i32, property_key: impl Into<String>) -> Self {
        Self {
            id,
            label_id,
            property_key: property_key.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SchemaRule {
    Index(IndexRule),
}

impl SchemaRule {
    /// id головного блока цепочки.
    pub fn id(&self) -> u64 {
        match self {
            SchemaRule::Index(r) => r.id,
        }
    }

    pub fn kind(&self) -> Kind {
        match self {
            SchemaRule::Index(_) => Kind::IndexRule,
        }
    }

    pub fn label_id(&self) -> i32 {
        match self {
            SchemaRule::Index(r) => r.label_id,
        }
    }

    /// Тот же rule с другим id (id не входит в payload).
    pub fn with_id(self, id: u64) -> Self {
        match self {
            SchemaRule::Index(r) => SchemaRule::Index(IndexRule { id, ..r }),
        }
    }
}

impl From<IndexRule> for SchemaRule {
    fn from(r: IndexRule) -> Self {
        SchemaRule::Index(r)
    }
}
