// Lark Lexer
// Length-preserving comment stripping and a flat token stream for the scope engine

/// Lark keywords
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Let,
    Const,
    Type,
    Enum,
    Class,
    Fun,
    Extern,
    Import,
    From,
    As,
    Pub,
    Return,
    If,
    Else,
    While,
    For,
    In,
    Break,
    Continue,
    True,
    False,
    Null,
    SelfKeyword,
}

/// (spelling, keyword, hover doc)
pub static KEYWORDS: &[(&str, Keyword, &str)] = &[
    ("let", Keyword::Let, "Variable declaration"),
    ("const", Keyword::Const, "Constant declaration"),
    ("type", Keyword::Type, "Type alias or struct declaration"),
    ("enum", Keyword::Enum, "Enum declaration"),
    ("class", Keyword::Class, "Class declaration"),
    ("fun", Keyword::Fun, "Function declaration"),
    ("extern", Keyword::Extern, "External function declaration"),
    ("import", Keyword::Import, "Import module"),
    ("from", Keyword::From, "Selective import source"),
    ("as", Keyword::As, "Import alias"),
    ("pub", Keyword::Pub, "Public visibility marker"),
    ("return", Keyword::Return, "Return from function"),
    ("if", Keyword::If, "Conditional statement"),
    ("else", Keyword::Else, "Else branch"),
    ("while", Keyword::While, "While loop"),
    ("for", Keyword::For, "For loop"),
    ("in", Keyword::In, "In keyword for loops"),
    ("break", Keyword::Break, "Break from loop"),
    ("continue", Keyword::Continue, "Continue to next iteration"),
    ("true", Keyword::True, "Boolean true"),
    ("false", Keyword::False, "Boolean false"),
    ("null", Keyword::Null, "Null value"),
    ("self", Keyword::SelfKeyword, "Current instance reference"),
];

impl Keyword {
    pub fn lookup(word: &str) -> Option<Keyword> {
        KEYWORDS
            .iter()
            .find(|(spelling, _, _)| *spelling == word)
            .map(|(_, kw, _)| *kw)
    }

    /// Keywords that introduce a new name
    pub fn is_declaration(&self) -> bool {
        matches!(
            self,
            Keyword::Let
                | Keyword::Const
                | Keyword::Type
                | Keyword::Enum
                | Keyword::Class
                | Keyword::Fun
                | Keyword::Extern
        )
    }
}

pub fn is_keyword(word: &str) -> bool {
    Keyword::lookup(word).is_some()
}

pub fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

pub fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    String,
    Number,
    Keyword(Keyword),
    Identifier,
    /// `->`
    Arrow,
    Punct(char),
}

/// A token with its byte range in the (stripped) source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub start: usize,
    pub end: usize,
}

impl Token<'_> {
    pub fn is_punct(&self, c: char) -> bool {
        self.kind == TokenKind::Punct(c)
    }

    pub fn keyword(&self) -> Option<Keyword> {
        match self.kind {
            TokenKind::Keyword(kw) => Some(kw),
            _ => None,
        }
    }
}

/// Replace `//` and `/* */` comments with spaces, byte for byte.
/// Newlines inside block comments are kept so line numbers survive.
pub fn strip_comments(source: &str) -> String {
    let bytes = source.as_bytes();
    let mut out = bytes.to_vec();
    let mut i = 0;
    let mut in_string: Option<u8> = None;

    while i < bytes.len() {
        let b = bytes[i];

        if let Some(quote) = in_string {
            if b == b'\\' {
                i += 2;
                continue;
            }
            if b == quote || b == b'\n' {
                in_string = None;
            }
            i += 1;
            continue;
        }

        match b {
            b'"' | b'\'' => {
                in_string = Some(b);
                i += 1;
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    out[i] = b' ';
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                out[i] = b' ';
                out[i + 1] = b' ';
                i += 2;
                // Unterminated block comments run to the end
                while i < bytes.len() {
                    if bytes[i] == b'*' && bytes.get(i + 1) == Some(&b'/') {
                        out[i] = b' ';
                        out[i + 1] = b' ';
                        i += 2;
                        break;
                    }
                    if bytes[i] != b'\n' {
                        out[i] = b' ';
                    }
                    i += 1;
                }
            }
            _ => i += 1,
        }
    }

    // Only whole comment byte runs were replaced by ASCII spaces, so this
    // cannot fail; fall back to the lossy form rather than panic.
    String::from_utf8(out).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}

/// Scanner that splits comment-free Lark source into tokens
pub struct Scanner<'a> {
    source: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    tokens: Vec<Token<'a>>,
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            tokens: Vec::new(),
        }
    }

    pub fn scan_tokens(mut self) -> Vec<Token<'a>> {
        while let Some((start, c)) = self.chars.next() {
            self.scan_token(start, c);
        }
        self.tokens
    }

    fn scan_token(&mut self, start: usize, c: char) {
        match c {
            c if c.is_whitespace() => {}
            '"' | '\'' => {
                let end = self.scan_string(c);
                self.add_token(TokenKind::String, start, end);
            }
            '-' if self.match_char('>') => self.add_token(TokenKind::Arrow, start, start + 2),
            c if c.is_ascii_digit() => {
                let end = self.consume_while(start + 1, is_ident_char);
                // A fractional part, but never the first dot of `..`
                let fraction = self.peek_second().is_some_and(|ch| ch.is_ascii_digit());
                let end = if self.peek() == Some('.') && fraction {
                    self.chars.next();
                    self.consume_while(end + 1, is_ident_char)
                } else {
                    end
                };
                self.add_token(TokenKind::Number, start, end);
            }
            c if is_ident_start(c) => {
                let end = self.consume_while(start + c.len_utf8(), is_ident_char);
                let text = &self.source[start..end];
                let kind = match Keyword::lookup(text) {
                    Some(kw) => TokenKind::Keyword(kw),
                    None => TokenKind::Identifier,
                };
                self.add_token(kind, start, end);
            }
            c => self.add_token(TokenKind::Punct(c), start, start + c.len_utf8()),
        }
    }

    /// Consume the rest of a string literal; unterminated strings stop at end of line
    fn scan_string(&mut self, quote: char) -> usize {
        while let Some((i, c)) = self.chars.next() {
            match c {
                '\\' => {
                    self.chars.next();
                }
                '\n' => return i,
                c if c == quote => return i + 1,
                _ => {}
            }
        }
        self.source.len()
    }

    fn consume_while(&mut self, mut end: usize, pred: impl Fn(char) -> bool) -> usize {
        while let Some(&(i, c)) = self.chars.peek() {
            if !pred(c) {
                break;
            }
            end = i + c.len_utf8();
            self.chars.next();
        }
        end
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.chars.next();
            true
        } else {
            false
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn peek_second(&self) -> Option<char> {
        let mut ahead = self.chars.clone();
        ahead.next();
        ahead.next().map(|(_, c)| c)
    }

    fn add_token(&mut self, kind: TokenKind, start: usize, end: usize) {
        self.tokens.push(Token {
            kind,
            text: &self.source[start..end],
            start,
            end,
        });
    }
}

pub fn tokenize(source: &str) -> Vec<Token<'_>> {
    Scanner::new(source).scan_tokens()
}

/// Byte ranges of every whole-word occurrence of `word` in `text`
pub fn find_whole_words<'t>(text: &'t str, word: &'t str) -> impl Iterator<Item = usize> + 't {
    text.match_indices(word).filter_map(move |(i, _)| {
        let before = text[..i].chars().next_back();
        let after = text[i + word.len()..].chars().next();
        let bounded = !before.is_some_and(is_ident_char) && !after.is_some_and(is_ident_char);
        bounded.then_some(i)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_strip_preserves_length() {
        let source = "let a = 1; // trailing\n/* block\n comment */ let b = \"// not a comment\";";
        let stripped = strip_comments(source);
        assert_eq!(stripped.len(), source.len());
        assert_eq!(stripped.lines().count(), source.lines().count());
        assert!(!stripped.contains("trailing"));
        assert!(!stripped.contains("block"));
        assert!(stripped.contains("\"// not a comment\""));
        assert_eq!(stripped.find("let b"), source.find("let b"));
    }

    #[test]
    fn test_strip_unterminated_block() {
        let source = "let a = 1; /* never\nclosed";
        let stripped = strip_comments(source);
        assert_eq!(stripped.trim_end(), "let a = 1;");
        assert_eq!(stripped.len(), source.len());
    }

    #[test]
    fn test_strip_multibyte_comment() {
        let source = "/* héllo */x";
        let stripped = strip_comments(source);
        assert_eq!(stripped.len(), source.len());
        assert!(stripped.ends_with('x'));
    }

    #[test]
    fn test_tokenize_basic() {
        let tokens = tokenize("pub fun add(int a) -> int { return a; }");
        let texts: Vec<&str> = tokens.iter().map(|t| t.text).collect();
        assert_eq!(
            texts,
            vec![
                "pub", "fun", "add", "(", "int", "a", ")", "->", "int", "{", "return", "a", ";", "}"
            ]
        );
        assert_eq!(tokens[0].kind, TokenKind::Keyword(Keyword::Pub));
        assert_eq!(tokens[2].kind, TokenKind::Identifier);
        assert_eq!(tokens[7].kind, TokenKind::Arrow);
        assert_eq!(tokens[10].kind, TokenKind::Keyword(Keyword::Return));
    }

    #[test]
    fn test_tokenize_strings_and_numbers() {
        assert_eq!(
            kinds(r#"x = "a \" b" + 'c' + 3.14 + 0x1F;"#),
            vec![
                TokenKind::Identifier,
                TokenKind::Punct('='),
                TokenKind::String,
                TokenKind::Punct('+'),
                TokenKind::String,
                TokenKind::Punct('+'),
                TokenKind::Number,
                TokenKind::Punct('+'),
                TokenKind::Number,
                TokenKind::Punct(';'),
            ]
        );
    }

    #[test]
    fn test_tokenize_spread_and_ranges() {
        let tokens = tokenize("f(...args); 0..10");
        let texts: Vec<&str> = tokens.iter().map(|t| t.text).collect();
        assert_eq!(texts, vec!["f", "(", ".", ".", ".", "args", ")", ";", "0", ".", ".", "10"]);
    }

    #[test]
    fn test_unterminated_string_stops_at_newline() {
        let tokens = tokenize("let s = \"open\nlet t = 1;");
        assert_eq!(tokens[3].kind, TokenKind::String);
        assert_eq!(tokens[4].text, "let");
    }

    #[test]
    fn test_token_offsets() {
        let source = "  let value = 1;";
        let tokens = tokenize(source);
        assert_eq!(tokens[1].start, 6);
        assert_eq!(&source[tokens[1].start..tokens[1].end], "value");
    }

    #[test]
    fn test_find_whole_words() {
        let text = "sqrt sqrt2 _sqrt sqrt(x) a.sqrt";
        let hits: Vec<usize> = find_whole_words(text, "sqrt").collect();
        assert_eq!(hits, vec![0, 17, 27]);
    }

    #[test]
    fn test_keyword_classes() {
        assert!(Keyword::Fun.is_declaration());
        assert!(Keyword::Extern.is_declaration());
        assert!(!Keyword::Return.is_declaration());
        assert!(is_keyword("return"));
        assert!(!is_keyword("returns"));
    }
}
