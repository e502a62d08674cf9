//! A small S-expression reader for KiCad library files.
//!
//! KiCad symbol (`.kicad_sym`) and footprint (`.kicad_mod`) files are nested
//! parenthesized lists. The reader balances parentheses properly and keeps
//! quoted strings distinct from bare symbols, so callers can walk the tree by
//! head symbol (`symbol`, `pin`, `pad`, `model`, ...) instead of matching text.

use thiserror::Error;

/// An S-expression value
#[derive(Debug, Clone, PartialEq)]
pub enum Sexpr {
    /// A symbol - unquoted identifier or number
    Symbol(String),
    /// A string - quoted text
    String(String),
    /// A list of S-expressions
    List(Vec<Sexpr>),
}

impl Sexpr {
    pub fn symbol(s: impl Into<String>) -> Self {
        Sexpr::Symbol(s.into())
    }

    pub fn string(s: impl Into<String>) -> Self {
        Sexpr::String(s.into())
    }

    pub fn list(items: Vec<Sexpr>) -> Self {
        Sexpr::List(items)
    }

    /// Get the atom value if this is an atom (symbol or string)
    pub fn as_atom(&self) -> Option<&str> {
        match self {
            Sexpr::Symbol(s) | Sexpr::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get the list items if this is a list
    pub fn as_list(&self) -> Option<&[Sexpr]> {
        match self {
            Sexpr::List(items) => Some(items),
            _ => None,
        }
    }

    /// Parse this atom as a number. KiCad writes numbers as bare symbols.
    pub fn as_f64(&self) -> Option<f64> {
        self.as_atom().and_then(|s| s.trim().parse::<f64>().ok())
    }

    /// The head symbol of a list, e.g. `pin` for `(pin passive line ...)`.
    pub fn tag(&self) -> Option<&str> {
        match self.as_list()?.first()? {
            Sexpr::Symbol(s) => Some(s),
            _ => None,
        }
    }

    /// True when this is a list whose head symbol is `name`.
    pub fn is_form(&self, name: &str) -> bool {
        self.tag() == Some(name)
    }

    /// Items following the head of a list. Empty for atoms.
    pub fn args(&self) -> &[Sexpr] {
        match self.as_list() {
            Some([_, rest @ ..]) => rest,
            _ => &[],
        }
    }

    /// The `index`-th argument as an atom.
    pub fn atom_arg(&self, index: usize) -> Option<&str> {
        self.args().get(index).and_then(Sexpr::as_atom)
    }

    /// The `index`-th argument as a number.
    pub fn f64_arg(&self, index: usize) -> Option<f64> {
        self.args().get(index).and_then(Sexpr::as_f64)
    }

    /// First direct child list with the given head symbol.
    pub fn child(&self, name: &str) -> Option<&Sexpr> {
        self.args().iter().find(|item| item.is_form(name))
    }

    /// All direct child lists with the given head symbol, in source order.
    pub fn children<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Sexpr> + 'a {
        self.args().iter().filter(move |item| item.is_form(name))
    }

    /// All descendant lists (excluding `self`) with the given head symbol,
    /// depth-first in source order. Matches are not searched further.
    pub fn descendants(&self, name: &str) -> Vec<&Sexpr> {
        let mut found = Vec::new();
        collect_descendants(self, name, &mut found);
        found
    }
}

fn collect_descendants<'a>(sexpr: &'a Sexpr, name: &str, found: &mut Vec<&'a Sexpr>) {
    for item in sexpr.args() {
        if item.is_form(name) {
            found.push(item);
        } else if item.as_list().is_some() {
            collect_descendants(item, name, found);
        }
    }
}

/// Parser for S-expressions
pub struct Parser<'a> {
    input: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    current_pos: usize,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> Self {
        Parser {
            input,
            chars: input.char_indices().peekable(),
            current_pos: 0,
        }
    }

    /// Parse the next S-expression
    pub fn parse(&mut self) -> Result<Sexpr, ParseError> {
        self.skip_whitespace();
        match self.peek_char() {
            None => Err(ParseError::UnexpectedEof),
            Some('(') => self.parse_list(),
            Some(')') => Err(ParseError::UnbalancedClose(self.current_pos)),
            Some(_) => self.parse_atom(),
        }
    }

    /// Parse every remaining top-level S-expression
    pub fn parse_all(&mut self) -> Result<Vec<Sexpr>, ParseError> {
        let mut results = Vec::new();

        loop {
            self.skip_whitespace();
            if self.is_at_end() {
                break;
            }
            results.push(self.parse()?);
        }

        Ok(results)
    }

    /// Parse one list, keeping the items that completed before the first
    /// error. The error, if any, is returned next to the partial list.
    pub fn parse_recovering(&mut self) -> Result<(Sexpr, Option<ParseError>), ParseError> {
        self.skip_whitespace();
        if self.peek_char() != Some('(') {
            return self.parse().map(|atom| (atom, None));
        }

        let start_pos = self.current_pos;
        self.advance();
        let mut items = Vec::new();

        loop {
            self.skip_whitespace();
            match self.peek_char() {
                None => {
                    return Ok((Sexpr::List(items), Some(ParseError::UnclosedList(start_pos))))
                }
                Some(')') => {
                    self.advance();
                    return Ok((Sexpr::List(items), None));
                }
                Some(_) => match self.parse() {
                    Ok(item) => items.push(item),
                    Err(e) => return Ok((Sexpr::List(items), Some(e))),
                },
            }
        }
    }

    fn parse_list(&mut self) -> Result<Sexpr, ParseError> {
        let start_pos = self.current_pos;
        self.expect('(')?;
        let mut items = Vec::new();

        loop {
            self.skip_whitespace();

            match self.peek_char() {
                None => return Err(ParseError::UnclosedList(start_pos)),
                Some(')') => {
                    self.advance();
                    break;
                }
                Some(_) => items.push(self.parse()?),
            }

            if items.len() % 1000 == 0 {
                log::trace!("Parsed {} items in list at position {start_pos}", items.len());
            }
        }

        Ok(Sexpr::List(items))
    }

    fn parse_atom(&mut self) -> Result<Sexpr, ParseError> {
        if self.peek_char() == Some('"') {
            return self.parse_string();
        }

        let start = self.current_pos;
        while let Some(ch) = self.peek_char() {
            if ch.is_whitespace() || ch == '(' || ch == ')' || ch == '"' {
                break;
            }
            self.advance();
        }

        if self.current_pos == start {
            return Err(ParseError::EmptyAtom(start));
        }

        Ok(Sexpr::Symbol(self.input[start..self.current_pos].to_string()))
    }

    fn parse_string(&mut self) -> Result<Sexpr, ParseError> {
        let start_pos = self.current_pos;
        self.expect('"')?;
        let mut result = String::new();

        loop {
            match self.peek_char() {
                None => return Err(ParseError::UnterminatedString(start_pos)),
                Some('"') => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    let escaped = match self.peek_char() {
                        Some('n') => '\n',
                        Some('r') => '\r',
                        Some('t') => '\t',
                        Some(ch) => ch,
                        None => return Err(ParseError::UnterminatedString(start_pos)),
                    };
                    result.push(escaped);
                    self.advance();
                }
                Some(ch) => {
                    result.push(ch);
                    self.advance();
                }
            }
        }

        Ok(Sexpr::String(result))
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek_char() {
            if ch.is_whitespace() {
                self.advance();
            } else if ch == ';' {
                // Comment until end of line
                while let Some(ch) = self.peek_char() {
                    self.advance();
                    if ch == '\n' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, ch)| *ch)
    }

    fn advance(&mut self) {
        if let Some((pos, ch)) = self.chars.next() {
            self.current_pos = pos + ch.len_utf8();
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), ParseError> {
        match self.peek_char() {
            Some(ch) if ch == expected => {
                self.advance();
                Ok(())
            }
            Some(ch) => Err(ParseError::UnexpectedChar(ch, expected)),
            None => Err(ParseError::UnexpectedEof),
        }
    }

    fn is_at_end(&mut self) -> bool {
        self.chars.peek().is_none()
    }
}

/// Parse the first S-expression in `input`
pub fn parse(input: &str) -> Result<Sexpr, ParseError> {
    log::trace!("Parsing S-expression from {} bytes of input", input.len());
    let result = Parser::new(input).parse();
    if let Err(e) = &result {
        log::trace!("Failed to parse S-expression: {e}");
    }
    result
}

/// Parse every top-level S-expression in `input`
pub fn parse_all(input: &str) -> Result<Vec<Sexpr>, ParseError> {
    let result = Parser::new(input).parse_all();
    match &result {
        Ok(exprs) => log::trace!("Parsed {} top-level S-expressions", exprs.len()),
        Err(e) => log::trace!("Failed to parse S-expressions: {e}"),
    }
    result
}

/// Parse the first S-expression in `input`, salvaging the complete items of
/// an outer list that is cut short by an error.
pub fn parse_recovering(input: &str) -> Result<(Sexpr, Option<ParseError>), ParseError> {
    let result = Parser::new(input).parse_recovering();
    if let Ok((_, Some(e))) = &result {
        log::trace!("Recovered partial S-expression after: {e}");
    }
    result
}

/// Errors that can occur during parsing. Positions are byte offsets.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("Unexpected end of input")]
    UnexpectedEof,
    #[error("Expected '{1}', found '{0}'")]
    UnexpectedChar(char, char),
    #[error("Unclosed list starting at byte {0}")]
    UnclosedList(usize),
    #[error("Unterminated string starting at byte {0}")]
    UnterminatedString(usize),
    #[error("Empty atom at byte {0}")]
    EmptyAtom(usize),
    #[error("Unbalanced ')' at byte {0}")]
    UnbalancedClose(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_atoms() {
        assert_eq!(parse("hello").unwrap(), Sexpr::symbol("hello"));
        assert_eq!(parse("-1.27").unwrap().as_f64(), Some(-1.27));
        assert_eq!(
            parse("\"with\\\"quotes\\\"\"").unwrap(),
            Sexpr::string("with\"quotes\"")
        );
    }

    #[test]
    fn test_pin_numbers_stay_strings() {
        let pin = parse(r#"(pin passive line (at 0 3.81 270) (length 1.27) (name "~" ) (number "1"))"#)
            .unwrap();
        assert_eq!(pin.tag(), Some("pin"));
        assert_eq!(pin.atom_arg(0), Some("passive"));
        assert_eq!(pin.child("number").unwrap().args()[0], Sexpr::string("1"));
        assert_eq!(pin.child("at").unwrap().f64_arg(1), Some(3.81));
    }

    #[test]
    fn test_nested_lists_are_balanced() {
        // A closing paren inside a nested body must not end the outer symbol.
        let input = r#"(kicad_symbol_lib
            (symbol "R" (property "Value" "R")
                (symbol "R_0_1" (rectangle (start -1.016 -2.54) (end 1.016 2.54)))
                (symbol "R_1_1" (pin passive line (at 0 3.81 270) (length 1.27))))
            (symbol "C" (property "Value" "C")))"#;
        let lib = parse(input).unwrap();
        let symbols: Vec<_> = lib.children("symbol").collect();
        assert_eq!(symbols.len(), 2);
        assert_eq!(symbols[0].atom_arg(0), Some("R"));
        assert_eq!(symbols[0].descendants("pin").len(), 1);
        assert_eq!(symbols[1].atom_arg(0), Some("C"));
    }

    #[test]
    fn test_descendants_in_source_order() {
        let tree = parse("(a (pad \"1\") (b (pad \"2\") (pad \"3\")) (pad \"4\"))").unwrap();
        let numbers: Vec<_> = tree
            .descendants("pad")
            .into_iter()
            .filter_map(|p| p.atom_arg(0))
            .collect();
        assert_eq!(numbers, vec!["1", "2", "3", "4"]);
    }

    #[test]
    fn test_comments_are_skipped() {
        let input = "; header\n(test ; inline\n value)";
        assert_eq!(
            parse(input).unwrap(),
            Sexpr::list(vec![Sexpr::symbol("test"), Sexpr::symbol("value")])
        );
    }

    #[test]
    fn test_errors() {
        assert_eq!(parse("(a (b c)"), Err(ParseError::UnclosedList(0)));
        assert_eq!(parse("\"open"), Err(ParseError::UnterminatedString(0)));
        assert_eq!(parse(") a"), Err(ParseError::UnbalancedClose(0)));
        assert_eq!(parse("   "), Err(ParseError::UnexpectedEof));
        assert!(parse_all("(a) (b").is_err());
    }

    #[test]
    fn test_recovering_keeps_complete_items() {
        let (list, error) = parse_recovering(r#"(lib (a 1) (b "2") (c "open)"#).unwrap();
        assert_eq!(list.tag(), Some("lib"));
        assert_eq!(list.args().len(), 2);
        assert_eq!(list.child("b").and_then(|b| b.atom_arg(0)), Some("2"));
        assert_eq!(error, Some(ParseError::UnterminatedString(22)));

        let (list, error) = parse_recovering("(lib (a 1)").unwrap();
        assert_eq!(list.args().len(), 1);
        assert_eq!(error, Some(ParseError::UnclosedList(0)));

        let (list, error) = parse_recovering("(lib (a 1))").unwrap();
        assert_eq!(list, parse("(lib (a 1))").unwrap());
        assert!(error.is_none());

        assert_eq!(parse_recovering("  "), Err(ParseError::UnexpectedEof));
    }

    #[test]
    fn test_utf8_handling() {
        let parsed = parse(r#"(symbol "résistance" "日本語")"#).unwrap();
        assert_eq!(parsed.atom_arg(0), Some("résistance"));
        assert_eq!(parsed.atom_arg(1), Some("日本語"));
    }
}
