use crate::{FEATS, FORM, FeatMap, HEAD, ID, LEMMA, MISC, OrderedMap, UPOS, is_map_column};

/// Value of one token column.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Field {
    /// Plain column; `None` is the `_` placeholder.
    Text(Option<String>),
    /// `FEATS`/`MISC` style column.
    Map(FeatMap),
}

impl Field {
    pub fn none() -> Self {
        Field::Text(None)
    }

    pub fn text(value: impl Into<String>) -> Self {
        Field::Text(Some(value.into()))
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Field::Text(v) => v.as_deref(),
            Field::Map(_) => None,
        }
    }

    pub fn as_map(&self) -> Option<&FeatMap> {
        match self {
            Field::Map(m) => Some(m),
            Field::Text(_) => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut FeatMap> {
        match self {
            Field::Map(m) => Some(m),
            Field::Text(_) => None,
        }
    }

    /// `Text(None)`.
    pub fn is_null(&self) -> bool {
        matches!(self, Field::Text(None))
    }

    /// Carries actual content: non-empty text or a non-empty map.
    pub fn is_filled(&self) -> bool {
        match self {
            Field::Text(v) => v.as_deref().is_some_and(|s| !s.is_empty()),
            Field::Map(m) => !m.is_empty(),
        }
    }
}

/// A token: column name to [`Field`], in column order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Token {
    fields: OrderedMap<Field>,
}

impl Token {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token with every column unset: maps empty, text `None`.
    pub fn blank<S: AsRef<str>>(columns: &[S]) -> Self {
        let fields = columns
            .iter()
            .map(|c| {
                let c = c.as_ref();
                let field = if is_map_column(c) {
                    Field::Map(FeatMap::new())
                } else {
                    Field::none()
                };
                (c, field)
            })
            .collect();
        Self { fields }
    }

    /// Stand-in token (`ID = 0.1`) for a sentence that has no tokens.
    pub fn placeholder<S: AsRef<str>>(columns: &[S]) -> Self {
        let mut token = Self::blank(columns);
        if token.contains(ID) {
            token.set_text(ID, Some("0.1".to_string()));
        }
        token
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn contains(&self, column: &str) -> bool {
        self.fields.contains_key(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.fields.iter()
    }

    pub fn get(&self, column: &str) -> Option<&Field> {
        self.fields.get(column)
    }

    pub fn get_mut(&mut self, column: &str) -> Option<&mut Field> {
        self.fields.get_mut(column)
    }

    pub fn set(&mut self, column: impl Into<String>, field: Field) {
        self.fields.insert(column, field);
    }

    pub fn text(&self, column: &str) -> Option<&str> {
        self.get(column).and_then(Field::as_text)
    }

    pub fn set_text(&mut self, column: impl Into<String>, value: Option<String>) {
        self.fields.insert(column, Field::Text(value));
    }

    pub fn map(&self, column: &str) -> Option<&FeatMap> {
        self.get(column).and_then(Field::as_map)
    }

    pub fn map_mut(&mut self, column: &str) -> Option<&mut FeatMap> {
        self.get_mut(column).and_then(Field::as_map_mut)
    }

    pub fn id(&self) -> Option<&str> {
        self.text(ID)
    }

    pub fn form(&self) -> Option<&str> {
        self.text(FORM)
    }

    pub fn lemma(&self) -> Option<&str> {
        self.text(LEMMA)
    }

    pub fn upos(&self) -> Option<&str> {
        self.text(UPOS)
    }

    pub fn head(&self) -> Option<&str> {
        self.text(HEAD)
    }

    pub fn feats(&self) -> Option<&FeatMap> {
        self.map(FEATS)
    }

    pub fn misc(&self) -> Option<&FeatMap> {
        self.map(MISC)
    }
}

impl<K: Into<String>> FromIterator<(K, Field)> for Token {
    fn from_iter<I: IntoIterator<Item = (K, Field)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}
