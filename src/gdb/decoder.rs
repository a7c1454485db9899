//! Escape decoding for MI quoted strings
//!
//! GDB prints bytes it considers non-printable as `\NNN` octal escapes. A run
//! of such escapes is one byte sequence in the inferior's charset, so the run
//! is collected first and decoded as a whole through the configured encoding.

use crate::gdb::error::{MiError, Result};
use encoding_rs::{Encoding, UTF_8};

/// Decodes the body of an MI quoted string
#[derive(Debug, Clone, Copy)]
pub struct Decoder {
    encoding: &'static Encoding,
}

impl Decoder {
    /// Decoder for an encoding label such as `utf-8`, `windows-1251` or `cp866`
    pub fn for_label(label: &str) -> Result<Self> {
        Encoding::for_label(label.trim().as_bytes())
            .map(|encoding| Self { encoding })
            .ok_or_else(|| MiError::UnknownEncoding(label.to_string()))
    }

    pub fn encoding_name(&self) -> &'static str {
        self.encoding.name()
    }

    /// Resolve escapes in `raw` (the text between the quotes)
    pub fn decode(&self, raw: &str) -> String {
        let mut out = String::with_capacity(raw.len());
        let mut run: Vec<u8> = Vec::new();
        let mut chars = raw.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '\\' {
                self.flush(&mut run, &mut out);
                out.push(c);
                continue;
            }

            let Some(&next) = chars.peek() else {
                // Lone trailing backslash
                self.flush(&mut run, &mut out);
                out.push('\\');
                break;
            };

            if let Some(first) = next.to_digit(8) {
                chars.next();
                let mut byte = first;
                for _ in 0..2 {
                    match chars.peek().and_then(|d| d.to_digit(8)) {
                        Some(d) if byte * 8 + d <= 0xff => {
                            byte = byte * 8 + d;
                            chars.next();
                        }
                        _ => break,
                    }
                }
                run.push(byte as u8);
                continue;
            }

            self.flush(&mut run, &mut out);
            chars.next();
            match next {
                'n' => out.push('\n'),
                't' => out.push('\t'),
                'r' => out.push('\r'),
                '"' => out.push('"'),
                '\\' => out.push('\\'),
                'a' => out.push('\u{7}'),
                'b' => out.push('\u{8}'),
                'f' => out.push('\u{c}'),
                'v' => out.push('\u{b}'),
                'e' => out.push('\u{1b}'),
                other => {
                    out.push('\\');
                    out.push(other);
                }
            }
        }

        self.flush(&mut run, &mut out);
        out
    }

    fn flush(&self, run: &mut Vec<u8>, out: &mut String) {
        if run.is_empty() {
            return;
        }
        // Unmappable bytes come back as U+FFFD, never as an error
        let (text, _had_errors) = self.encoding.decode_without_bom_handling(&run[..]);
        out.push_str(&text);
        run.clear();
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self { encoding: UTF_8 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_simple_escapes() {
        let decoder = Decoder::default();
        assert_eq!(decoder.decode(r#"a\tb\nc\r\\d\"e"#), "a\tb\nc\r\\d\"e");
    }

    #[test]
    fn test_cyrillic_run_windows_1251() {
        let decoder = Decoder::for_label("windows-1251").unwrap();
        assert_eq!(decoder.decode(r"\314\356\350"), "Мои");
        assert_eq!(decoder.decode(r"Not \314\356\350"), "Not Мои");
    }

    #[test]
    fn test_run_is_decoded_as_a_whole() {
        // UTF-8 bytes of 'М' split over two escapes
        let decoder = Decoder::default();
        assert_eq!(decoder.decode(r"\320\234ир"), "Мир");

        let per_byte: String = [r"\320", r"\234"]
            .iter()
            .map(|b| decoder.decode(b))
            .collect();
        assert_ne!(per_byte, "М");
    }

    #[test]
    fn test_run_boundaries() {
        let decoder = Decoder::for_label("cp1251").unwrap();
        assert_eq!(decoder.decode(r"\314x\356\n\350"), "Мxо\nи");
    }

    #[test]
    fn test_short_octal_escapes() {
        let decoder = Decoder::default();
        assert_eq!(decoder.decode(r"\0"), "\0");
        assert_eq!(decoder.decode(r"\033[0m"), "\u{1b}[0m");
        // \777 exceeds a byte: only \77 is consumed
        assert_eq!(decoder.decode(r"\777"), "?7");
    }

    #[test]
    fn test_unmappable_bytes_are_replaced() {
        let decoder = Decoder::default();
        assert_eq!(decoder.decode(r"a\377b"), "a\u{fffd}b");
    }

    #[test]
    fn test_unknown_escape_and_trailing_backslash() {
        let decoder = Decoder::default();
        assert_eq!(decoder.decode(r"\q"), "\\q");
        assert_eq!(decoder.decode("x\\"), "x\\");
    }

    #[test]
    fn test_unknown_label() {
        assert!(matches!(
            Decoder::for_label("no-such-charset"),
            Err(MiError::UnknownEncoding(_))
        ));
    }
}
