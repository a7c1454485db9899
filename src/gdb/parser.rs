//! GDB Machine Interface (MI) Parser
//!
//! Turns raw MI output lines into [`Record`] trees. Every line yields exactly
//! one record: syntax defects inside a value drop the damaged entry, and lines
//! of unknown shape become [`RecordKind::Malformed`].

use crate::gdb::decoder::Decoder;
use crate::gdb::error::{Result, SyntaxError, SyntaxErrorKind};
use crate::gdb::types::*;
use tracing::{debug, trace};

/// Cursor over one line, threaded through the recursive descent
struct Scanner<'a> {
    src: &'a str,
    pos: usize,
    /// Defects recovered from so far
    errors: Vec<SyntaxError>,
}

impl<'a> Scanner<'a> {
    fn new(src: &'a str, pos: usize) -> Self {
        Self {
            src,
            pos,
            errors: Vec::new(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn bump(&mut self) {
        self.pos += 1;
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t')) {
            self.bump();
        }
    }

    fn error(&self, kind: SyntaxErrorKind) -> SyntaxError {
        SyntaxError::new(self.pos, kind)
    }

    /// Error for whatever sits under the cursor when a value was expected
    fn unexpected(&self) -> SyntaxError {
        match self.peek() {
            Some(b) if b.is_ascii() => self.error(SyntaxErrorKind::UnexpectedChar(b as char)),
            _ => self.error(SyntaxErrorKind::ExpectedValue),
        }
    }

    /// Advance while the byte is not one of `stops`
    fn take_until(&mut self, stops: &[u8]) -> &'a str {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if stops.contains(&b) {
                break;
            }
            self.bump();
        }
        &self.src[start..self.pos]
    }
}

/// Bytes that end an unquoted word
const WORD_STOPS: &[u8] = b"=,{}[]\"";
const BARE_VALUE_STOPS: &[u8] = b",{}[]\"";

/// GDB/MI Parser
#[derive(Debug, Clone)]
pub struct MiParser {
    decoder: Decoder,
    prompts: Vec<String>,
}

impl MiParser {
    /// Parser decoding byte escapes as UTF-8
    pub fn new() -> Self {
        Self {
            decoder: Decoder::default(),
            prompts: ParserConfig::default().prompts,
        }
    }

    pub fn with_config(config: &ParserConfig) -> Result<Self> {
        Ok(Self {
            decoder: Decoder::for_label(&config.encoding)?,
            prompts: config.prompts.clone(),
        })
    }

    pub fn with_encoding(label: &str) -> Result<Self> {
        Self::with_config(&ParserConfig {
            encoding: label.to_string(),
            ..ParserConfig::default()
        })
    }

    pub fn decoder(&self) -> &Decoder {
        &self.decoder
    }

    /// Parse a single line of GDB/MI output
    pub fn parse_line(&self, line: &str) -> Record {
        let line = line.trim_end_matches(['\r', '\n']);
        trace!("MI line: {}", line);

        if let Some(prompt) = self.match_prompt(line) {
            return Record::prompt(prompt);
        }

        let bytes = line.as_bytes();
        let digits = bytes.iter().take_while(|b| b.is_ascii_digit()).count();
        let kind = match bytes.get(digits).and_then(|&b| RecordKind::from_marker(b as char)) {
            Some(kind) => kind,
            None => return self.malformed(line),
        };

        if kind.is_stream() {
            // Stream output never carries a token
            if digits > 0 {
                return self.malformed(line);
            }
            return self.parse_stream(kind, line);
        }

        let token = if digits > 0 {
            match line[..digits].parse::<u64>() {
                Ok(token) => Some(token),
                Err(_) => return self.malformed(line),
            }
        } else {
            None
        };

        let class_start = digits + 1;
        let class_end = line[class_start..]
            .find(',')
            .map(|i| class_start + i)
            .unwrap_or(line.len());
        let class = line[class_start..class_end].trim_end();
        if class.is_empty()
            || !class
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        {
            return self.malformed(line);
        }

        let values = if class_end < line.len() {
            let mut scanner = Scanner::new(line, class_end + 1);
            let values = self.parse_entries(&mut scanner, None, class_end);
            for err in &scanner.errors {
                debug!("Recovered from MI syntax error ({}) in: {}", err, line);
            }
            values
        } else {
            MiList::new()
        };

        Record::new(kind, token, class, values)
    }

    /// Parse one standalone MI value (`"..."`, `{...}` or `[...]`).
    ///
    /// Unlike [`MiParser::parse_line`] this is strict: the first defect is
    /// returned with its byte offset.
    pub fn parse_value(&self, text: &str) -> std::result::Result<MiValue, SyntaxError> {
        let mut scanner = Scanner::new(text, 0);
        let value = self.value(&mut scanner)?;
        if let Some(err) = scanner.errors.first().cloned() {
            return Err(err);
        }
        scanner.skip_ws();
        if !scanner.at_end() {
            return Err(scanner.error(SyntaxErrorKind::TrailingInput));
        }
        Ok(value)
    }

    /// Parse comma-separated results (`key=value,...`), skipping damaged entries
    pub fn parse_results(&self, text: &str) -> MiList {
        let mut scanner = Scanner::new(text, 0);
        let values = self.parse_entries(&mut scanner, None, 0);
        for err in &scanner.errors {
            debug!("Recovered from MI syntax error ({}) in: {}", err, text);
        }
        values
    }

    fn match_prompt(&self, line: &str) -> Option<&str> {
        let line = line.trim_end();
        self.prompts.iter().find(|p| *p == line).map(String::as_str)
    }

    fn malformed(&self, line: &str) -> Record {
        debug!("Unrecognized MI line: {}", line);
        Record::malformed(line)
    }

    fn parse_stream(&self, kind: RecordKind, line: &str) -> Record {
        let mut scanner = Scanner::new(line, 1);
        if scanner.peek() != Some(b'"') {
            return self.malformed(line);
        }
        match self.quoted(&mut scanner) {
            Ok(payload) if scanner.at_end() => Record::stream(kind, payload),
            Ok(_) => self.malformed(line),
            Err(err) => {
                debug!("Bad stream record ({}): {}", err, line);
                Record::malformed(line)
            }
        }
    }

    /// Entries up to `close` (or end of line when `close` is `None`)
    fn parse_entries(&self, sc: &mut Scanner<'_>, close: Option<u8>, open_offset: usize) -> MiList {
        let mut list = MiList::new();
        loop {
            sc.skip_ws();
            match sc.peek() {
                None => {
                    match close {
                        Some(b'}') => sc.errors.push(SyntaxError::new(
                            open_offset,
                            SyntaxErrorKind::UnterminatedTuple,
                        )),
                        Some(_) => sc.errors.push(SyntaxError::new(
                            open_offset,
                            SyntaxErrorKind::UnterminatedList,
                        )),
                        None => {}
                    }
                    return list;
                }
                Some(b) if Some(b) == close => {
                    sc.bump();
                    return list;
                }
                Some(b',') => {
                    sc.bump();
                    continue;
                }
                Some(_) => {}
            }

            match self.entry(sc) {
                Ok(item) => list.push(item),
                Err(err) => {
                    sc.errors.push(err);
                    self.recover(sc, close);
                    continue;
                }
            }

            sc.skip_ws();
            match sc.peek() {
                None | Some(b',') => {}
                Some(b) if Some(b) == close => {}
                Some(_) => {
                    let err = sc.unexpected();
                    sc.errors.push(err);
                    self.recover(sc, close);
                }
            }
        }
    }

    /// `key=value` or a positional value
    fn entry(&self, sc: &mut Scanner<'_>) -> std::result::Result<MiItem, SyntaxError> {
        if matches!(sc.peek(), Some(b'"' | b'{' | b'[')) {
            return Ok(MiItem::positional(self.value(sc)?));
        }

        let word = sc.take_until(WORD_STOPS).trim();
        if sc.peek() == Some(b'=') {
            if word.is_empty() {
                return Err(sc.unexpected());
            }
            sc.bump();
            let value = self.value(sc)?;
            Ok(MiItem::named(word, value))
        } else if word.is_empty() {
            Err(sc.unexpected())
        } else {
            Ok(MiItem::positional(MiValue::Const(MiConst::bare(word))))
        }
    }

    fn value(&self, sc: &mut Scanner<'_>) -> std::result::Result<MiValue, SyntaxError> {
        sc.skip_ws();
        match sc.peek() {
            Some(b'"') => Ok(MiValue::Const(self.quoted(sc)?)),
            Some(b'{') => {
                let open = sc.pos;
                sc.bump();
                Ok(MiValue::Tuple(self.parse_entries(sc, Some(b'}'), open)))
            }
            Some(b'[') => {
                let open = sc.pos;
                sc.bump();
                Ok(MiValue::List(self.parse_entries(sc, Some(b']'), open)))
            }
            None | Some(b',' | b'}' | b']') => Err(sc.error(SyntaxErrorKind::ExpectedValue)),
            Some(_) => {
                let word = sc.take_until(BARE_VALUE_STOPS).trim_end();
                Ok(MiValue::Const(MiConst::bare(word)))
            }
        }
    }

    /// Quoted string; the cursor sits on the opening quote
    fn quoted(&self, sc: &mut Scanner<'_>) -> std::result::Result<MiConst, SyntaxError> {
        let open = sc.pos;
        sc.bump();
        let start = sc.pos;
        loop {
            match sc.peek() {
                None => {
                    return Err(SyntaxError::new(open, SyntaxErrorKind::UnterminatedString));
                }
                Some(b'\\') => {
                    sc.bump();
                    if !sc.at_end() {
                        sc.bump();
                    }
                }
                Some(b'"') => {
                    let raw = &sc.src[start..sc.pos];
                    sc.bump();
                    return Ok(MiConst::quoted(raw, self.decoder.decode(raw)));
                }
                Some(_) => sc.bump(),
            }
        }
    }

    /// Skip to the next `,` or `close` at the current nesting level
    fn recover(&self, sc: &mut Scanner<'_>, close: Option<u8>) {
        let mut depth = 0usize;
        while let Some(b) = sc.peek() {
            match b {
                b'"' => {
                    if self.quoted(sc).is_err() {
                        sc.pos = sc.src.len();
                    }
                    continue;
                }
                b'{' | b'[' => depth += 1,
                b'}' | b']' if depth > 0 => depth -= 1,
                b',' if depth == 0 => return,
                _ if depth == 0 && Some(b) == close => return,
                _ => {}
            }
            sc.bump();
        }
    }
}

impl Default for MiParser {
    fn default() -> Self {
        Self::new()
    }
}
