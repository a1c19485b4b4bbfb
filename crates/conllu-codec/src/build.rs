use conllu_types::{FORM, ID, MISC, Sentence, Token};

use crate::error::Result;
use crate::fix::{FixOptions, Fixer};

const SOFT_HYPHEN: char = '\u{AD}';

/// Tokens for a list of word forms, numbered from 1.
///
/// A soft hyphen splits a word into several tokens sharing its number;
/// every piece but the last gets `SpaceAfter=No`. Ids are provisional
/// until the sentence goes through [`fix`](crate::fix()).
pub fn from_sentence<I, W, C>(words: I, columns: &[C]) -> Vec<Token>
where
    I: IntoIterator<Item = W>,
    W: AsRef<str>,
    C: AsRef<str>,
{
    let has_misc = columns.iter().any(|column| column.as_ref() == MISC);
    let mut tokens = Vec::new();
    for (i, word) in words.into_iter().enumerate() {
        let id = (i + 1).to_string();
        let mut rest = word.as_ref();
        while !rest.is_empty() {
            let (piece, tail) = rest.split_once(SOFT_HYPHEN).unwrap_or((rest, ""));
            let mut token = Token::blank(columns);
            if token.contains(ID) {
                token.set_text(ID, Some(id.clone()));
            }
            if token.contains(FORM) {
                token.set_text(FORM, Some(piece.to_string()));
            }
            if !tail.is_empty() && has_misc {
                if let Some(misc) = token.map_mut(MISC) {
                    misc.insert("SpaceAfter", "No".to_string());
                }
            }
            tokens.push(token);
            rest = tail;
        }
    }
    tokens
}

/// Tokenized sentences converted and normalized lazily.
pub fn from_sentences<I, S, W>(
    sentences: I,
    options: FixOptions,
    columns: Vec<String>,
) -> Fixer<impl Iterator<Item = Result<Sentence>>>
where
    I: IntoIterator<Item = S>,
    S: IntoIterator<Item = W>,
    W: AsRef<str>,
{
    let placeholder_columns = columns.clone();
    let tokens = sentences
        .into_iter()
        .map(move |words| Ok(Sentence::from_tokens(from_sentence(words, columns.as_slice()))));
    Fixer::with_columns(tokens, options, placeholder_columns)
}
