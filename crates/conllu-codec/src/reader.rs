use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use conllu_types::{
    FeatMap, Field, GLOBAL_COLUMNS, Metadata, Sentence, Token, is_map_column, is_std_column,
    std_columns,
};
use encoding_rs::{Encoding, UTF_8};
use tracing::{debug, info};

use crate::error::{CodecError, Result};

/// Pull parser over CoNLL-U text, yielding one [`Sentence`] per block.
///
/// Columns are resolved by the first line of the stream: a leading
/// `# global.columns = ...` comment declares a CoNLL-U Plus column set,
/// anything else selects the ten standard columns.
pub struct ConlluReader<R> {
    input: R,
    encoding: &'static Encoding,
    columns: Option<Vec<String>>,
    buf: Vec<u8>,
    line_no: usize,
    sentences: usize,
    tokens: usize,
    finished: bool,
}

impl<R: BufRead> ConlluReader<R> {
    /// UTF-8 reader.
    pub fn new(input: R) -> Self {
        Self {
            input,
            encoding: UTF_8,
            columns: None,
            buf: Vec::new(),
            line_no: 0,
            sentences: 0,
            tokens: 0,
            finished: false,
        }
    }

    pub fn with_encoding(input: R, encoding: &'static Encoding) -> Result<Self> {
        if !encoding.is_ascii_compatible() {
            return Err(CodecError::Encoding(encoding.name().to_string()));
        }
        let mut reader = Self::new(input);
        reader.encoding = encoding;
        Ok(reader)
    }

    /// Column set in effect, once the first line has been seen.
    pub fn columns(&self) -> Option<&[String]> {
        self.columns.as_deref()
    }

    /// Line number of the last line read (1-based).
    pub fn line_no(&self) -> usize {
        self.line_no
    }

    fn read_line(&mut self) -> Result<Option<String>> {
        self.buf.clear();
        if self.input.read_until(b'\n', &mut self.buf)? == 0 {
            return Ok(None);
        }
        self.line_no += 1;

        let mut bytes = self.buf.as_slice();
        if self.line_no == 1 {
            let bom = Encoding::for_bom(bytes).filter(|(enc, _)| *enc == self.encoding);
            if let Some((_, len)) = bom {
                bytes = &bytes[len..];
            }
        }
        match self
            .encoding
            .decode_without_bom_handling_and_without_replacement(bytes)
        {
            Some(text) => Ok(Some(text.into_owned())),
            None => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "line {}: input is not valid {}",
                    self.line_no,
                    self.encoding.name()
                ),
            )
            .into()),
        }
    }

    fn read_sentence(&mut self) -> Result<Option<Sentence>> {
        let mut tokens = Vec::new();
        let mut meta = Metadata::new();
        while let Some(raw) = self.read_line()? {
            let line = raw.trim();
            if line.is_empty() {
                if tokens.is_empty() && meta.is_empty() {
                    continue;
                }
                return Ok(Some(self.finish_sentence(tokens, meta)));
            }
            if let Some(body) = line.strip_prefix('#') {
                self.push_meta(body, &mut meta);
            } else {
                tokens.push(self.parse_token(line)?);
            }
        }
        if tokens.is_empty() && meta.is_empty() {
            return Ok(None);
        }
        Ok(Some(self.finish_sentence(tokens, meta)))
    }

    fn finish_sentence(&mut self, mut tokens: Vec<Token>, meta: Metadata) -> Sentence {
        if tokens.is_empty() {
            let columns = self.columns.get_or_insert_with(std_columns);
            tokens.push(Token::placeholder(columns.as_slice()));
        }
        self.sentences += 1;
        self.tokens += tokens.len();
        if self.sentences % 10_000 == 0 {
            debug!("{} sentences read", self.sentences);
        }
        Sentence::new(tokens, meta)
    }

    fn push_meta(&mut self, body: &str, meta: &mut Metadata) {
        let (key, value) = match body.split_once('=') {
            Some((key, value)) => (key.trim(), Some(value.trim().to_string())),
            None => (body.trim(), None),
        };
        if self.columns.is_none() {
            let declared: Vec<String> = match (key, &value) {
                (GLOBAL_COLUMNS, Some(list)) => {
                    list.split_whitespace().map(str::to_string).collect()
                }
                _ => Vec::new(),
            };
            self.columns = Some(if declared.is_empty() {
                std_columns()
            } else {
                declared
            });
        }
        meta.insert(key, value);
    }

    fn parse_token(&mut self, line: &str) -> Result<Token> {
        let line_no = self.line_no;
        let columns = self.columns.get_or_insert_with(std_columns);
        let values: Vec<&str> = line.split('\t').collect();
        if values.len() > columns.len() {
            return Err(CodecError::Format {
                line: line_no,
                column: format!("field #{}", columns.len() + 1),
                value: values[columns.len()..].join("\t"),
            });
        }

        let mut token = Token::new();
        for (column, raw) in columns.iter().zip(values) {
            let field = if is_map_column(column) {
                let map = parse_feats(raw).ok_or_else(|| CodecError::Format {
                    line: line_no,
                    column: column.clone(),
                    value: raw.to_string(),
                })?;
                Field::Map(map)
            } else if raw == "_" {
                Field::none()
            } else if raw == "*" && !is_std_column(column) {
                Field::text("")
            } else {
                Field::text(raw)
            };
            token.set(column.as_str(), field);
        }
        Ok(token)
    }
}

impl ConlluReader<BufReader<File>> {
    /// Open a UTF-8 file. A leading BOM is skipped.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        info!("loading corpus from {}", path.as_ref().display());
        Ok(Self::new(BufReader::new(file)))
    }

    /// Open a file in the encoding named by `label` (WHATWG label, e.g.
    /// `"utf-8"`, `"windows-1251"`, `"koi8-r"`).
    pub fn open_with_encoding<P: AsRef<Path>>(path: P, label: &str) -> Result<Self> {
        let encoding = resolve_encoding(label)?;
        let file = File::open(path.as_ref())?;
        info!(
            "loading corpus from {} ({})",
            path.as_ref().display(),
            encoding.name()
        );
        Self::with_encoding(BufReader::new(file), encoding)
    }
}

impl<R: BufRead> Iterator for ConlluReader<R> {
    type Item = Result<Sentence>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.read_sentence() {
            Ok(Some(sentence)) => Some(Ok(sentence)),
            Ok(None) => {
                self.finished = true;
                info!(
                    "corpus has been loaded: {} sentences, {} tokens",
                    self.sentences, self.tokens
                );
                None
            }
            Err(err) => {
                self.finished = true;
                Some(Err(err))
            }
        }
    }
}

/// Parse CoNLL-U held in memory.
pub fn parse_str(text: &str) -> ConlluReader<&[u8]> {
    ConlluReader::new(text.as_bytes())
}

/// Look up an encoding label; only ASCII-compatible encodings are accepted.
pub fn resolve_encoding(label: &str) -> Result<&'static Encoding> {
    let label = label.trim();
    let encoding = if label.eq_ignore_ascii_case("utf-8-sig") {
        Some(UTF_8)
    } else {
        Encoding::for_label(label.as_bytes())
    };
    match encoding {
        Some(enc) if enc.is_ascii_compatible() => Ok(enc),
        _ => Err(CodecError::Encoding(label.to_string())),
    }
}

fn parse_feats(raw: &str) -> Option<FeatMap> {
    let mut feats = FeatMap::new();
    if raw == "_" || raw.starts_with("_|") {
        return Some(feats);
    }
    for pair in raw.split('|') {
        let (key, value) = pair.split_once('=')?;
        feats.insert(key, value.to_string());
    }
    Some(feats)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_all(text: &str) -> Vec<Sentence> {
        parse_str(text).collect::<Result<_>>().unwrap()
    }

    #[test]
    fn parses_tokens_and_metadata() {
        let text = "# sent_id = 1\n# text = Мама мыла\n# newpar\n\
                    1\tМама\tмама\tNOUN\t_\tCase=Nom|Animacy=Anim\t2\tnsubj\t_\t_\n\
                    2\tмыла\tмыть\tVERB\t_\t_\t0\troot\t_\tSpaceAfter=No\n\n";
        let sentences = read_all(text);
        assert_eq!(sentences.len(), 1);
        let s = &sentences[0];
        assert_eq!(s.sent_id(), Some("1"));
        assert_eq!(s.text(), Some("Мама мыла"));
        assert_eq!(s.meta.get("newpar"), Some(&None));
        let feats = s.tokens[0].feats().unwrap();
        assert_eq!(feats.keys().collect::<Vec<_>>(), vec!["Case", "Animacy"]);
        assert_eq!(s.tokens[1].text("XPOS"), None);
        assert_eq!(s.tokens[1].misc().unwrap().get("SpaceAfter").map(String::as_str), Some("No"));
    }

    #[test]
    fn underscore_prefixed_feats_are_empty() {
        let text = "1\tа\tа\tCCONJ\t_\t_|x=y\t0\troot\t_\t_\n";
        let out = read_all(text);
        let s = &out[0];
        assert!(s.tokens[0].feats().unwrap().is_empty());
    }

    #[test]
    fn trailing_sentence_without_blank_line() {
        let text = "1\tа\n\n\n1\tб\n2\tв";
        let sentences = read_all(text);
        assert_eq!(sentences.len(), 2);
        assert_eq!(sentences[1].tokens.len(), 2);
        assert_eq!(sentences[1].tokens[1].form(), Some("в"));
        assert_eq!(sentences[1].tokens[1].len(), 2);
    }

    #[test]
    fn metadata_only_block_gets_placeholder() {
        let sentences = read_all("# sent_id = a\n\n# sent_id = b");
        assert_eq!(sentences.len(), 2);
        for s in &sentences {
            assert_eq!(s.tokens.len(), 1);
            assert_eq!(s.tokens[0].id(), Some("0.1"));
            assert!(s.tokens[0].feats().unwrap().is_empty());
        }
    }

    #[test]
    fn plus_columns_and_star_placeholder() {
        let text = "# global.columns = ID FORM UPOS NE\n\
                    1\tПетя\tPROPN\tB-PER\n2\tи\tCCONJ\t*\n3\t*\tPUNCT\t_\n\n";
        let mut reader = parse_str(text);
        let s = reader.next().unwrap().unwrap();
        assert_eq!(reader.columns().unwrap(), ["ID", "FORM", "UPOS", "NE"]);
        assert_eq!(s.tokens[1].text("NE"), Some(""));
        assert_eq!(s.tokens[2].form(), Some("*"));
        assert_eq!(s.tokens[2].get("NE"), Some(&Field::none()));
        assert!(s.meta.contains_key(GLOBAL_COLUMNS));
    }

    #[test]
    fn late_global_columns_is_plain_metadata() {
        let text = "# sent_id = 1\n# global.columns = ID FORM\n1\tа\tа\tX\t_\t_\t0\troot\t_\t_\n";
        let mut reader = parse_str(text);
        let s = reader.next().unwrap().unwrap();
        assert_eq!(reader.columns().unwrap().len(), 10);
        assert_eq!(s.tokens[0].lemma(), Some("а"));
        assert_eq!(s.meta.get(GLOBAL_COLUMNS), Some(&Some("ID FORM".to_string())));
    }

    #[test]
    fn malformed_feats_report_position() {
        let text = "1\tа\tа\tX\t_\t_\t0\troot\t_\t_\n\n1\tб\tб\tX\t_\tCase\t0\troot\t_\t_\n";
        let err = parse_str(text).collect::<Result<Vec<_>>>().unwrap_err();
        match err {
            CodecError::Format { line, column, value } => {
                assert_eq!(line, 3);
                assert_eq!(column, "FEATS");
                assert_eq!(value, "Case");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn too_many_fields_is_an_error() {
        let text = "# global.columns = ID FORM\n1\tа\tлишнее\n";
        let err = parse_str(text).next().unwrap().unwrap_err();
        assert!(matches!(err, CodecError::Format { line: 2, .. }));
    }

    #[test]
    fn reader_stops_after_error() {
        let mut reader = parse_str("1\tа\tа\tX\t_\tbad\n\n1\tб\n");
        assert!(reader.next().unwrap().is_err());
        assert!(reader.next().is_none());
    }

    #[test]
    fn legacy_encoding_and_bom() {
        let (bytes, _, _) = encoding_rs::WINDOWS_1251.encode("1\tдом\n");
        let reader = ConlluReader::with_encoding(&bytes[..], encoding_rs::WINDOWS_1251).unwrap();
        let s: Vec<Sentence> = reader.collect::<Result<_>>().unwrap();
        assert_eq!(s[0].tokens[0].form(), Some("дом"));

        let with_bom = "\u{feff}# sent_id = 1\n1\tа\n";
        let s = read_all(with_bom);
        assert_eq!(s[0].sent_id(), Some("1"));
    }

    #[test]
    fn invalid_utf8_names_the_line() {
        let bytes: &[u8] = b"1\ta\n1\t\xff\n";
        let err = ConlluReader::new(bytes).next().unwrap().unwrap_err();
        assert!(err.to_string().contains("line 2"), "{err}");
    }

    #[test]
    fn rejects_ascii_incompatible_encodings() {
        assert!(resolve_encoding("utf-16le").is_err());
        assert!(resolve_encoding("no-such-encoding").is_err());
        assert_eq!(resolve_encoding("utf-8-sig").unwrap(), UTF_8);
        assert_eq!(resolve_encoding("cp1251").unwrap(), encoding_rs::WINDOWS_1251);
    }
}
