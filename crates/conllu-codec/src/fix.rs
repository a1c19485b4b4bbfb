use std::collections::HashMap;

use conllu_types::{
    FORM, HEAD, ID, LEMMA, MISC, NodeId, SENT_ID, Sentence, TEXT, Token, std_columns,
};
use tracing::debug;

use crate::error::{CodecError, Result};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FixOptions {
    /// Explode word forms containing whitespace into multiword tokens.
    pub split_multi: bool,
    /// Drop tokens without alphanumerics, lowercase forms and lemmas.
    pub adjust_for_speech: bool,
}

/// Iterator adapter that renumbers token ids and fills in `sent_id` and
/// `text` metadata.
pub struct Fixer<I> {
    inner: I,
    options: FixOptions,
    columns: Vec<String>,
    sent_no: usize,
}

pub fn fix<I>(sentences: I, options: FixOptions) -> Fixer<I::IntoIter>
where
    I: IntoIterator<Item = Result<Sentence>>,
{
    Fixer::new(sentences.into_iter(), options)
}

struct Span {
    index: usize,
    old_id: String,
    closing: String,
}

impl<I> Fixer<I> {
    pub fn new(inner: I, options: FixOptions) -> Self {
        Self::with_columns(inner, options, std_columns())
    }

    /// `columns` shape the placeholder token until a real token is seen.
    pub fn with_columns(inner: I, options: FixOptions, columns: Vec<String>) -> Self {
        Self {
            inner,
            options,
            columns,
            sent_no: 0,
        }
    }

    fn fix_sentence(&mut self, sentence: Sentence) -> Result<Sentence> {
        let Sentence {
            tokens: source,
            mut meta,
        } = sentence;

        let mut tokens: Vec<Token> = Vec::with_capacity(source.len());
        let mut renamed: HashMap<String, String> = HashMap::new();
        let mut id_: u32 = 0;
        let mut sub_id: u32 = 0;
        let mut span: Option<Span> = None;

        for mut token in source {
            if self.options.adjust_for_speech && !adjust_for_speech(&mut token) {
                continue;
            }
            if !token.contains(ID) || !token.contains(FORM) {
                tokens.push(token);
                continue;
            }
            let old_id = token.id().unwrap_or("_").to_string();
            let node = NodeId::parse(&old_id)?;
            let mut generated = Vec::new();

            let new_id = if let NodeId::Empty { .. } = node {
                sub_id += 1;
                format!("{id_}.{sub_id}")
            } else if let Some(open) = span.as_ref() {
                id_ += 1;
                sub_id = 0;
                if old_id == open.closing {
                    let head = &mut tokens[open.index];
                    let full = format!("{}-{id_}", head.id().unwrap_or_default());
                    renamed.insert(open.old_id.clone(), full.clone());
                    head.set_text(ID, Some(full));
                    span = None;
                }
                id_.to_string()
            } else if token.form().is_some_and(|f| !f.is_empty()) {
                id_ += 1;
                sub_id = 0;
                let start = id_;
                if let NodeId::Range { end, .. } = node {
                    span = Some(Span {
                        index: tokens.len(),
                        old_id: old_id.clone(),
                        closing: end.to_string(),
                    });
                    id_ -= 1;
                    start.to_string()
                } else if self.options.split_multi {
                    generated = split_multiword(&token, &mut id_)?;
                    if generated.is_empty() {
                        start.to_string()
                    } else {
                        format!("{start}-{id_}")
                    }
                } else {
                    start.to_string()
                }
            } else {
                sub_id += 1;
                format!("{id_}.{sub_id}")
            };

            if new_id != old_id {
                renamed.insert(old_id, new_id.clone());
            }
            token.set_text(ID, Some(new_id));
            tokens.push(token);
            tokens.append(&mut generated);
        }

        if !renamed.is_empty() {
            for token in &mut tokens {
                let target = token.head().and_then(|head| renamed.get(head)).cloned();
                if let Some(target) = target {
                    token.set_text(HEAD, Some(target));
                }
            }
        }

        match tokens.last() {
            Some(last) => self.columns = last.columns().map(str::to_string).collect(),
            None => tokens.push(Token::placeholder(self.columns.as_slice())),
        }

        if !meta.contains_key(SENT_ID) {
            meta.insert_front(SENT_ID, Some((self.sent_no + 1).to_string()));
        }
        if !meta.contains_key(TEXT) {
            meta.insert(TEXT, Some(restore_text(&tokens)));
        }
        Ok(Sentence::new(tokens, meta))
    }
}

impl<I: Iterator<Item = Result<Sentence>>> Iterator for Fixer<I> {
    type Item = Result<Sentence>;

    fn next(&mut self) -> Option<Self::Item> {
        let fixed = match self.inner.next()? {
            Ok(sentence) => self.fix_sentence(sentence),
            Err(err) => Err(err),
        };
        self.sent_no += 1;
        if self.sent_no % 10_000 == 0 {
            debug!("{} sentences fixed", self.sent_no);
        }
        Some(fixed)
    }
}

/// Returns `false` when the token should be dropped.
fn adjust_for_speech(token: &mut Token) -> bool {
    let Some(form) = token.form() else {
        return true;
    };
    if !form.chars().any(char::is_alphanumeric) {
        return false;
    }
    let form = form.to_lowercase();
    let lemma = token
        .lemma()
        .filter(|lemma| !lemma.is_empty())
        .map(str::to_lowercase);
    token.set_text(FORM, Some(form));
    if lemma.is_some() {
        token.set_text(LEMMA, lemma);
    }
    true
}

/// One token per whitespace-separated piece of `FORM`, numbered from the
/// current `id_`. `id_` is left on the last generated id.
fn split_multiword(token: &Token, id_: &mut u32) -> Result<Vec<Token>> {
    let Some(form) = token.form() else {
        return Ok(Vec::new());
    };
    let pieces: Vec<&str> = form.split_whitespace().collect();
    if pieces.len() < 2 {
        return Ok(Vec::new());
    }
    let tagged = token
        .iter()
        .any(|(column, field)| ![ID, FORM, MISC].contains(&column) && field.is_filled());
    if tagged {
        return Err(CodecError::Precondition(format!(
            "token {:?} is already annotated: split_multi must run before any tagging",
            form
        )));
    }

    let columns: Vec<&str> = token.columns().collect();
    let start = *id_;
    let mut generated = Vec::with_capacity(pieces.len());
    for (offset, piece) in pieces.into_iter().enumerate() {
        *id_ = start + offset as u32;
        let mut part = Token::blank(columns.as_slice());
        part.set_text(ID, Some(id_.to_string()));
        part.set_text(FORM, Some(piece.to_string()));
        generated.push(part);
    }
    Ok(generated)
}

/// Surface text of a renumbered sentence.
pub fn restore_text(tokens: &[Token]) -> String {
    let mut text = String::new();
    let mut space_before = false;
    let mut ignore_upto: Option<&str> = None;
    for token in tokens {
        let mut id = token.id().unwrap_or_default();
        if let Some(upto) = ignore_upto {
            if id == upto {
                ignore_upto = None;
            }
        } else if !id.contains('.') {
            if let Some((_, end)) = id.split_once('-') {
                id = end;
                ignore_upto = Some(end);
            }
            if !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()) {
                if space_before {
                    text.push(' ');
                }
                text.push_str(token.form().unwrap_or_default());
            }
        }
        space_before = token
            .misc()
            .and_then(|misc| misc.get("SpaceAfter"))
            .is_none_or(|value| value != "No");
    }
    text
}
