use std::borrow::Cow;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use conllu_types::{
    Field, GLOBAL_COLUMNS, Metadata, STD_COLUMNS, Sentence, Token, is_std_column,
};
use tracing::info;

use crate::error::Result;

/// Streaming CoNLL-U serializer.
///
/// The column set is fixed by the first sentence that carries tokens: its
/// `global.columns` metadata if any, otherwise the keys of its first token
/// (standard columns first, extras sorted). Extra columns trigger a single
/// synthetic `# global.columns` line.
pub struct ConlluWriter<W> {
    out: W,
    columns: Option<Vec<String>>,
    sentences: usize,
}

impl<W: Write> ConlluWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            columns: None,
            sentences: 0,
        }
    }

    pub fn columns(&self) -> Option<&[String]> {
        self.columns.as_deref()
    }

    pub fn write_sentence(&mut self, sentence: &Sentence) -> io::Result<()> {
        let mut pending = Vec::new();
        for (key, value) in sentence.meta.iter() {
            if self.columns.is_none() && key == GLOBAL_COLUMNS {
                if let Some(list) = value {
                    self.columns = Some(list.split_whitespace().map(str::to_string).collect());
                }
            }
            let line = meta_line(key, value.as_deref());
            if self.columns.is_none() {
                pending.push(line);
            } else {
                writeln!(self.out, "{line}")?;
            }
        }

        if self.columns.is_none() {
            if let Some(first) = sentence.tokens.first() {
                let (columns, has_extra) = infer_columns(first);
                if has_extra {
                    writeln!(self.out, "# {} = {}", GLOBAL_COLUMNS, columns.join(" "))?;
                }
                self.columns = Some(columns);
            }
        }
        for line in pending {
            writeln!(self.out, "{line}")?;
        }

        if let Some(columns) = &self.columns {
            for token in &sentence.tokens {
                let cells: Vec<Cow<'_, str>> = columns
                    .iter()
                    .map(|column| render_cell(column, token.get(column)))
                    .collect();
                writeln!(self.out, "{}", cells.join("\t"))?;
            }
        }
        writeln!(self.out)?;
        self.sentences += 1;
        Ok(())
    }

    /// Write every sentence, stopping at the first error. Returns the number
    /// of sentences written.
    pub fn write_all<I>(&mut self, sentences: I) -> Result<usize>
    where
        I: IntoIterator<Item = Result<Sentence>>,
    {
        let before = self.sentences;
        for sentence in sentences {
            self.write_sentence(&sentence?)?;
        }
        Ok(self.sentences - before)
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Serialize a corpus into a string.
pub fn to_string<I>(sentences: I) -> Result<String>
where
    I: IntoIterator<Item = Result<Sentence>>,
{
    let mut writer = ConlluWriter::new(Vec::new());
    writer.write_all(sentences)?;
    let bytes = writer.into_inner();
    String::from_utf8(bytes)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err).into())
}

/// Write a corpus to `path` as UTF-8. Returns the number of sentences.
pub fn save<I, P>(sentences: I, path: P) -> Result<usize>
where
    I: IntoIterator<Item = Result<Sentence>>,
    P: AsRef<Path>,
{
    let file = File::create(path.as_ref())?;
    let mut writer = ConlluWriter::new(BufWriter::new(file));
    let count = writer.write_all(sentences)?;
    writer.flush()?;
    info!(
        "corpus has been saved: {} sentences to {}",
        count,
        path.as_ref().display()
    );
    Ok(count)
}

fn meta_line(key: &str, value: Option<&str>) -> String {
    match value {
        Some(value) => format!("# {key} = {value}"),
        None => format!("# {key}"),
    }
}

fn infer_columns(token: &Token) -> (Vec<String>, bool) {
    let mut columns: Vec<String> = STD_COLUMNS
        .iter()
        .filter(|column| token.contains(column))
        .map(|column| column.to_string())
        .collect();
    let mut extra: Vec<String> = token
        .columns()
        .filter(|column| !is_std_column(column))
        .map(str::to_string)
        .collect();
    extra.sort();
    let has_extra = !extra.is_empty();
    columns.append(&mut extra);
    (columns, has_extra)
}

fn render_cell<'a>(column: &str, field: Option<&'a Field>) -> Cow<'a, str> {
    match field {
        None | Some(Field::Text(None)) => Cow::Borrowed("_"),
        Some(Field::Text(Some(value))) if value.is_empty() && !is_std_column(column) => {
            Cow::Borrowed("*")
        }
        Some(Field::Text(Some(value))) => Cow::Borrowed(value.as_str()),
        Some(Field::Map(map)) if map.is_empty() => Cow::Borrowed("_"),
        Some(Field::Map(map)) => Cow::Owned(
            map.sorted()
                .into_iter()
                .map(|(key, value)| format!("{key}={value}"))
                .collect::<Vec<_>>()
                .join("|"),
        ),
    }
}

/// Metadata as written, one `# ...` line per entry.
pub fn meta_lines(meta: &Metadata) -> Vec<String> {
    meta.iter()
        .map(|(key, value)| meta_line(key, value.as_deref()))
        .collect()
}
