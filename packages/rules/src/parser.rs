use crate::error::{ParseError, ParseResult};
use crate::rule::{Keyframe, KeyframesRule, Rule};
use crate::style::Style;
use crate::tokenizer::{tokenize, Token};
use crate::tree::RuleTree;
use std::ops::Range;
use tracing::debug;

/// Parser for CSS stylesheets
///
/// Produces the raw rule list, comments included. Unsupported at-rules
/// (`@import`, `@font-face`, `@supports`, ...) are skipped.
pub struct Parser<'src> {
    source: &'src str,
    tokens: Vec<(Token<'src>, Range<usize>)>,
    pos: usize,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> ParseResult<Self> {
        Ok(Self {
            source,
            tokens: tokenize(source)?,
            pos: 0,
        })
    }

    /// Parse a complete stylesheet
    pub fn parse_stylesheet(&mut self) -> ParseResult<Vec<Rule>> {
        self.parse_rule_list(false)
    }

    /// Parse rules until end of input, or until the closing brace of a block
    /// when `nested` (the brace is left for the caller).
    fn parse_rule_list(&mut self, nested: bool) -> ParseResult<Vec<Rule>> {
        let mut rules = Vec::new();

        loop {
            match self.peek_token() {
                None if nested => return Err(ParseError::unexpected_eof("'}'")),
                None => break,
                Some(Token::RBrace) if nested => break,
                Some(Token::RBrace) => {
                    return Err(ParseError::unexpected_token(
                        self.peek_span(),
                        "a rule",
                        "'}'",
                    ));
                }
                Some(Token::Comment(text)) => {
                    self.advance();
                    rules.push(Rule::comment(text));
                }
                Some(Token::Semicolon) => {
                    self.advance();
                }
                Some(Token::AtKeyword(name)) => {
                    if let Some(rule) = self.parse_at_rule(name)? {
                        rules.push(rule);
                    }
                }
                Some(_) => rules.push(self.parse_plain_rule()?),
            }
        }

        Ok(rules)
    }

    fn parse_plain_rule(&mut self) -> ParseResult<Rule> {
        let prelude = self.parse_block_prelude()?;
        let selector_text = self.join_tokens(prelude.clone(), true);
        if selector_text.is_empty() {
            return Err(ParseError::invalid_syntax(
                self.span_of(prelude),
                "missing selector",
            ));
        }

        let style = self.parse_declarations()?;
        Ok(Rule::plain(selector_text, style))
    }

    fn parse_at_rule(&mut self, name: &'src str) -> ParseResult<Option<Rule>> {
        let at_span = self.peek_span();
        self.advance();
        let lower = name.to_ascii_lowercase();

        if lower == "media" {
            let prelude = self.parse_block_prelude()?;
            let media_text = self.join_tokens(prelude, false);
            if media_text.is_empty() {
                return Err(ParseError::invalid_syntax(at_span, "@media requires a media query"));
            }
            let rules = self.parse_rule_list(true)?;
            self.expect(Token::RBrace)?;
            return Ok(Some(Rule::media(media_text, RuleTree::from_rules(rules))));
        }

        if let Some(prefix) = lower.strip_suffix("keyframes") {
            if prefix.is_empty() || (prefix.len() > 1 && prefix.starts_with('-') && prefix.ends_with('-')) {
                let prelude = self.parse_block_prelude()?;
                let keyframes_name = self.join_tokens(prelude, false);
                if keyframes_name.is_empty() {
                    return Err(ParseError::invalid_syntax(at_span, "@keyframes requires a name"));
                }
                let keyframes = self.parse_keyframes()?;
                self.expect(Token::RBrace)?;
                return Ok(Some(Rule::Keyframes(KeyframesRule {
                    name: keyframes_name,
                    vendor_prefix: name[..prefix.len()].to_string(),
                    keyframes,
                })));
            }
        }

        debug!(at_rule = %name, "Skipping unsupported at-rule");
        self.scan_prelude();
        match self.peek_token() {
            Some(Token::Semicolon) => {
                self.advance();
            }
            Some(Token::LBrace) => self.skip_block()?,
            // A closing brace belongs to the enclosing block
            _ => {}
        }
        Ok(None)
    }

    /// Parse keyframe blocks until the closing brace of the keyframes rule
    fn parse_keyframes(&mut self) -> ParseResult<Vec<Keyframe>> {
        let mut keyframes = Vec::new();

        loop {
            match self.peek_token() {
                None => return Err(ParseError::unexpected_eof("'}'")),
                Some(Token::RBrace) => break,
                Some(Token::Comment(_)) | Some(Token::Semicolon) => {
                    self.advance();
                }
                Some(_) => {
                    let prelude = self.parse_block_prelude()?;
                    let key_text = self.join_tokens(prelude.clone(), true);
                    if key_text.is_empty() {
                        return Err(ParseError::invalid_syntax(
                            self.span_of(prelude),
                            "missing keyframe selector",
                        ));
                    }
                    let style = self.parse_declarations()?;
                    keyframes.push(Keyframe::new(key_text, style));
                }
            }
        }

        Ok(keyframes)
    }

    /// Parse `prop: value;` pairs up to and including the closing brace
    fn parse_declarations(&mut self) -> ParseResult<Style> {
        let mut style = Style::new();

        loop {
            match self.peek_token() {
                None => return Err(ParseError::unexpected_eof("'}'")),
                Some(Token::RBrace) => {
                    self.advance();
                    return Ok(style);
                }
                Some(Token::Semicolon) | Some(Token::Comment(_)) => {
                    self.advance();
                }
                Some(_) => {
                    let (property, value) = self.parse_declaration()?;
                    style.set(property, value);
                }
            }
        }
    }

    fn parse_declaration(&mut self) -> ParseResult<(String, String)> {
        let name_start = self.pos;
        loop {
            match self.peek_token() {
                Some(Token::Colon) => break,
                Some(Token::LBrace) => {
                    return Err(ParseError::invalid_syntax(
                        self.peek_span(),
                        "nested blocks are not supported",
                    ));
                }
                Some(Token::Semicolon) | Some(Token::RBrace) | None => {
                    return Err(ParseError::invalid_syntax(
                        self.span_of(name_start..self.pos),
                        "expected ':' after property name",
                    ));
                }
                Some(_) => {
                    self.advance();
                }
            }
        }
        let property = self.join_tokens(name_start..self.pos, false);
        self.advance(); // ':'

        let value_start = self.pos;
        let mut depth = 0usize;
        loop {
            match self.peek_token() {
                None => return Err(ParseError::unexpected_eof("'}'")),
                Some(Token::LParen) | Some(Token::LBracket) => depth += 1,
                Some(Token::RParen) | Some(Token::RBracket) => depth = depth.saturating_sub(1),
                Some(Token::Semicolon) | Some(Token::RBrace) if depth == 0 => break,
                Some(Token::LBrace) => {
                    return Err(ParseError::invalid_syntax(
                        self.peek_span(),
                        "nested blocks are not supported",
                    ));
                }
                Some(_) => {}
            }
            self.advance();
        }

        let value = self.join_tokens(value_start..self.pos, false);
        if value.is_empty() {
            return Err(ParseError::invalid_syntax(
                self.span_of(name_start..self.pos),
                format!("empty value for property '{}'", property),
            ));
        }

        Ok((property, value))
    }

    /// Scan to the opening brace of a block, consume it, and return the
    /// token range of the prelude before it.
    fn parse_block_prelude(&mut self) -> ParseResult<Range<usize>> {
        let prelude = self.scan_prelude();
        match self.peek() {
            Some((Token::LBrace, _)) => {
                self.advance();
                Ok(prelude)
            }
            Some((token, span)) => Err(ParseError::unexpected_token(
                span.clone(),
                "'{'",
                token.to_string(),
            )),
            None => Err(ParseError::unexpected_eof("'{'")),
        }
    }

    /// Advance to the next `{`, `;` or `}` outside parentheses and brackets
    fn scan_prelude(&mut self) -> Range<usize> {
        let start = self.pos;
        let mut depth = 0usize;
        while let Some(token) = self.peek_token() {
            match token {
                Token::LParen | Token::LBracket => depth += 1,
                Token::RParen | Token::RBracket => depth = depth.saturating_sub(1),
                Token::LBrace | Token::Semicolon | Token::RBrace if depth == 0 => break,
                _ => {}
            }
            self.advance();
        }
        start..self.pos
    }

    /// Skip a `{ ... }` block including nested blocks
    fn skip_block(&mut self) -> ParseResult<()> {
        self.expect(Token::LBrace)?;
        let mut depth = 1usize;
        while depth > 0 {
            match self.peek_token() {
                None => return Err(ParseError::unexpected_eof("'}'")),
                Some(Token::LBrace) => depth += 1,
                Some(Token::RBrace) => depth -= 1,
                Some(_) => {}
            }
            self.advance();
        }
        Ok(())
    }

    /// Rebuild text from a token range, collapsing whitespace and dropping
    /// comments. With `normalize_commas`, list separators become `", "`.
    fn join_tokens(&self, range: Range<usize>, normalize_commas: bool) -> String {
        let mut out = String::new();
        let mut prev_end: Option<usize> = None;
        let mut after_comma = false;

        for (token, span) in &self.tokens[range] {
            if matches!(token, Token::Comment(_)) {
                continue;
            }
            let is_comma = matches!(token, Token::Comma);
            if let Some(end) = prev_end {
                let gap = span.start > end;
                let space = if normalize_commas {
                    after_comma || (gap && !is_comma)
                } else {
                    gap
                };
                if space {
                    out.push(' ');
                }
            }
            out.push_str(&self.source[span.clone()]);
            prev_end = Some(span.end);
            after_comma = is_comma;
        }

        out
    }

    fn peek(&self) -> Option<&(Token<'src>, Range<usize>)> {
        self.tokens.get(self.pos)
    }

    fn peek_token(&self) -> Option<Token<'src>> {
        self.peek().map(|(token, _)| token.clone())
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn expect(&mut self, expected: Token<'src>) -> ParseResult<()> {
        match self.peek() {
            Some((token, _)) if std::mem::discriminant(token) == std::mem::discriminant(&expected) => {
                self.advance();
                Ok(())
            }
            Some((token, span)) => Err(ParseError::unexpected_token(
                span.clone(),
                expected.to_string(),
                token.to_string(),
            )),
            None => Err(ParseError::unexpected_eof(expected.to_string())),
        }
    }

    fn peek_span(&self) -> Range<usize> {
        match self.peek() {
            Some((_, span)) => span.clone(),
            None => self.source.len()..self.source.len(),
        }
    }

    /// Source span covered by a token range
    fn span_of(&self, range: Range<usize>) -> Range<usize> {
        let start = self
            .tokens
            .get(range.start)
            .map(|(_, span)| span.start)
            .unwrap_or(self.source.len());
        let end = range
            .end
            .checked_sub(1)
            .and_then(|last| self.tokens.get(last))
            .map(|(_, span)| span.end)
            .unwrap_or(start);
        start..end.max(start)
    }
}

/// Parse CSS source into its raw rule list (comments included)
pub fn parse(source: &str) -> ParseResult<Vec<Rule>> {
    Parser::new(source)?.parse_stylesheet()
}
