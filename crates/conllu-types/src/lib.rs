//! Shared types that mirror the CoNLL-U and CoNLL-U Plus data model.
//!
//! A [`Sentence`] is a list of [`Token`]s plus ordered [`Metadata`] taken
//! from the `# key = value` comment lines. Tokens are schema-on-read: each
//! one is an ordered mapping from column name to [`Field`], so CoNLL-U Plus
//! files with arbitrary extra columns need no special casing.
//!
//! `FEATS` and `MISC` hold [`FeatMap`]s (insertion-ordered key/value maps),
//! every other column holds optional text. `None` is the `_` placeholder;
//! an empty string on a non-standard column is the `*` placeholder.
//!
//! ```rust
//! use conllu_types::{Field, NodeId, Token, STD_COLUMNS};
//!
//! let mut token = Token::blank(&STD_COLUMNS);
//! token.set_text("ID", Some("1".into()));
//! token.set_text("FORM", Some("Мама".into()));
//! assert_eq!(token.form(), Some("Мама"));
//! assert!(matches!(token.get("FEATS"), Some(Field::Map(m)) if m.is_empty()));
//! assert_eq!(NodeId::parse("2-3").unwrap(), NodeId::Range { start: 2, end: 3 });
//! ```

mod id;
mod map;
mod token;

pub use id::{IdError, NodeId};
pub use map::OrderedMap;
pub use token::{Field, Token};

/// Feature-style key/value column (`FEATS`, `MISC`).
pub type FeatMap = OrderedMap<String>;

/// Sentence-level comments: `# key` (value `None`) or `# key = value`.
pub type Metadata = OrderedMap<Option<String>>;

pub const ID: &str = "ID";
pub const FORM: &str = "FORM";
pub const LEMMA: &str = "LEMMA";
pub const UPOS: &str = "UPOS";
pub const XPOS: &str = "XPOS";
pub const FEATS: &str = "FEATS";
pub const HEAD: &str = "HEAD";
pub const DEPREL: &str = "DEPREL";
pub const DEPS: &str = "DEPS";
pub const MISC: &str = "MISC";

/// The ten CoNLL-U columns in canonical order.
pub const STD_COLUMNS: [&str; 10] = [
    ID, FORM, LEMMA, UPOS, XPOS, FEATS, HEAD, DEPREL, DEPS, MISC,
];

/// Metadata key that declares a CoNLL-U Plus column set.
pub const GLOBAL_COLUMNS: &str = "global.columns";
pub const SENT_ID: &str = "sent_id";
pub const TEXT: &str = "text";

/// `true` for the ten standard CoNLL-U column names.
pub fn is_std_column(column: &str) -> bool {
    STD_COLUMNS.contains(&column)
}

/// `true` for columns whose values are key/value maps.
pub fn is_map_column(column: &str) -> bool {
    column == FEATS || column == MISC
}

/// The standard columns as owned strings.
pub fn std_columns() -> Vec<String> {
    STD_COLUMNS.iter().map(|c| c.to_string()).collect()
}

/// One sentence: tokens in surface order plus its metadata.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Sentence {
    pub tokens: Vec<Token>,
    pub meta: Metadata,
}

impl Sentence {
    pub fn new(tokens: Vec<Token>, meta: Metadata) -> Self {
        Self { tokens, meta }
    }

    /// Sentence with tokens and no metadata.
    pub fn from_tokens(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            meta: Metadata::new(),
        }
    }

    pub fn sent_id(&self) -> Option<&str> {
        self.meta.get(SENT_ID).and_then(|v| v.as_deref())
    }

    pub fn text(&self) -> Option<&str> {
        self.meta.get(TEXT).and_then(|v| v.as_deref())
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty() && self.meta.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_classes() {
        assert!(is_std_column("DEPREL"));
        assert!(!is_std_column("NE"));
        assert!(is_map_column("MISC"));
        assert!(!is_map_column("FORM"));
        assert_eq!(std_columns().len(), 10);
    }

    #[test]
    fn sentence_accessors() {
        let mut meta = Metadata::new();
        meta.insert(SENT_ID, Some("7".to_string()));
        meta.insert("newdoc", None);
        let sentence = Sentence::new(Vec::new(), meta);
        assert_eq!(sentence.sent_id(), Some("7"));
        assert_eq!(sentence.text(), None);
        assert!(!sentence.is_empty());
        assert!(Sentence::default().is_empty());
    }
}
