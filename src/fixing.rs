//! Tolerant fixing state machine (C4, spec.md §4.4).
//!
//! A hand-rolled tokenizer over `char`s that accepts malformed JSON:
//! mixed quote styles, unquoted barewords, trailing/missing commas,
//! comments, and triple-quoted dedented strings. Corrections applied
//! while building a value are recorded as [`FixKind`]s and attached via
//! `Value::Fixed`.

use std::collections::BTreeSet;

use crate::value::{Completion, FixKind, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QuoteKind {
    Double,
    Single,
    Backtick,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueContext {
    Top,
    ObjectKey,
    ObjectValue,
    ArrayElement,
}

struct Fixer {
    chars: Vec<char>,
    pos: usize,
    fixes: BTreeSet<FixKind>,
}

/// Runs the fixing state machine over `input`, returning every completed
/// top-level value found (spec.md §4.4 "State-machine outputs"). The
/// strategy layer wraps more than one in an `AnyOf`.
pub fn fix_parse(input: &str) -> Vec<Value> {
    let mut fixer = Fixer {
        chars: input.chars().collect(),
        pos: 0,
        fixes: BTreeSet::new(),
    };

    let mut out = Vec::new();
    loop {
        fixer.skip_ws_and_comments();
        if fixer.eof() {
            break;
        }
        fixer.fixes.clear();
        let value = fixer.parse_value(ValueContext::Top);
        out.push(Value::fixed(value, std::mem::take(&mut fixer.fixes)));
    }
    out
}

impl Fixer {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn peek_non_ws_after(&self, offset: usize) -> Option<char> {
        let mut i = self.pos + offset;
        while let Some(c) = self.chars.get(i) {
            if c.is_whitespace() {
                i += 1;
            } else {
                return Some(*c);
            }
        }
        None
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn eof(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn skip_ws_and_comments(&mut self) {
        loop {
            let mut progressed = false;
            while let Some(c) = self.peek() {
                if c.is_whitespace() {
                    self.pos += 1;
                    progressed = true;
                } else {
                    break;
                }
            }
            if self.peek() == Some('/') && self.peek_at(1) == Some('/') {
                self.pos += 2;
                while let Some(c) = self.advance() {
                    if c == '\n' {
                        break;
                    }
                }
                self.fixes.insert(FixKind::CommentStripped);
                progressed = true;
            } else if self.peek() == Some('/') && self.peek_at(1) == Some('*') {
                self.pos += 2;
                while !self.eof() {
                    if self.peek() == Some('*') && self.peek_at(1) == Some('/') {
                        self.pos += 2;
                        break;
                    }
                    self.pos += 1;
                }
                self.fixes.insert(FixKind::CommentStripped);
                progressed = true;
            }
            if !progressed {
                break;
            }
        }
    }

    fn parse_value(&mut self, ctx: ValueContext) -> Value {
        self.skip_ws_and_comments();
        match self.peek() {
            None => Value::String(String::new(), Completion::Incomplete),
            Some('{') => self.parse_object(),
            Some('[') => self.parse_array(),
            Some('"') => self.parse_quoted(QuoteKind::Double, ctx),
            Some('\'') => self.parse_quoted(QuoteKind::Single, ctx),
            Some('`') => self.parse_quoted(QuoteKind::Backtick, ctx),
            Some(c) if c == '-' || c == '+' || c.is_ascii_digit() => {
                self.parse_number_or_unquoted(ctx)
            }
            Some(_) => self.parse_unquoted(ctx),
        }
    }

    fn parse_object(&mut self) -> Value {
        self.advance();
        let mut entries = Vec::new();
        loop {
            self.skip_ws_and_comments();
            if self.eof() {
                self.fixes.insert(FixKind::MissingClosingBrace);
                return Value::Object(entries, Completion::Incomplete);
            }
            if self.peek() == Some('}') {
                self.advance();
                return Value::Object(entries, Completion::Complete);
            }

            let key = self.parse_key();
            self.skip_ws_and_comments();
            if self.peek() == Some(':') {
                self.advance();
            }
            let value = self.parse_value(ValueContext::ObjectValue);
            entries.push((key, value));

            self.skip_ws_and_comments();
            if self.eof() {
                self.fixes.insert(FixKind::MissingClosingBrace);
                return Value::Object(entries, Completion::Incomplete);
            }
            match self.peek() {
                Some(',') => {
                    self.advance();
                    self.skip_ws_and_comments();
                    if self.peek() == Some('}') {
                        self.fixes.insert(FixKind::TrailingComma);
                        self.advance();
                        return Value::Object(entries, Completion::Complete);
                    }
                }
                Some('}') => {
                    self.advance();
                    return Value::Object(entries, Completion::Complete);
                }
                Some(_) => {
                    self.fixes.insert(FixKind::MissingComma);
                }
                None => unreachable!("eof handled above"),
            }
        }
    }

    fn parse_array(&mut self) -> Value {
        self.advance();
        let mut items = Vec::new();
        loop {
            self.skip_ws_and_comments();
            if self.eof() {
                self.fixes.insert(FixKind::MissingClosingBracket);
                return Value::Array(items, Completion::Incomplete);
            }
            if self.peek() == Some(']') {
                self.advance();
                return Value::Array(items, Completion::Complete);
            }

            let value = self.parse_value(ValueContext::ArrayElement);
            items.push(value);

            self.skip_ws_and_comments();
            if self.eof() {
                self.fixes.insert(FixKind::MissingClosingBracket);
                return Value::Array(items, Completion::Incomplete);
            }
            match self.peek() {
                Some(',') => {
                    self.advance();
                    self.skip_ws_and_comments();
                    if self.peek() == Some(']') {
                        self.fixes.insert(FixKind::TrailingComma);
                        self.advance();
                        return Value::Array(items, Completion::Complete);
                    }
                }
                Some(']') => {
                    self.advance();
                    return Value::Array(items, Completion::Complete);
                }
                Some(_) => {
                    self.fixes.insert(FixKind::MissingComma);
                }
                None => unreachable!("eof handled above"),
            }
        }
    }

    fn parse_key(&mut self) -> String {
        self.skip_ws_and_comments();
        match self.peek() {
            Some('"') => match self.parse_quoted(QuoteKind::Double, ValueContext::ObjectKey) {
                Value::String(s, _) => s,
                _ => unreachable!(),
            },
            Some('\'') => match self.parse_quoted(QuoteKind::Single, ValueContext::ObjectKey) {
                Value::String(s, _) => s,
                _ => unreachable!(),
            },
            Some('`') => match self.parse_quoted(QuoteKind::Backtick, ValueContext::ObjectKey) {
                Value::String(s, _) => s,
                _ => unreachable!(),
            },
            Some(c) if c.is_ascii_digit() || c == '-' || c == '+' => {
                if let Some((number, end)) = self.scan_number() {
                    self.pos = end;
                    self.fixes.insert(FixKind::NumericKey);
                    number.to_string()
                } else {
                    self.fixes.insert(FixKind::UnquotedKey);
                    self.scan_bare_key()
                }
            }
            _ => {
                self.fixes.insert(FixKind::UnquotedKey);
                self.scan_bare_key()
            }
        }
    }

    fn scan_bare_key(&mut self) -> String {
        let mut out = String::new();
        while let Some(c) = self.peek() {
            if c == ':' {
                break;
            }
            out.push(c);
            self.advance();
        }
        out.trim().to_string()
    }

    fn parse_quoted(&mut self, kind: QuoteKind, ctx: ValueContext) -> Value {
        let quote_char = match kind {
            QuoteKind::Double => '"',
            QuoteKind::Single => '\'',
            QuoteKind::Backtick => '`',
        };
        let is_triple = matches!(kind, QuoteKind::Double | QuoteKind::Backtick)
            && self.peek_at(1) == Some(quote_char)
            && self.peek_at(2) == Some(quote_char);

        if kind != QuoteKind::Double {
            self.fixes.insert(FixKind::MixedQuotes);
        }

        if is_triple {
            self.pos += 3;
            let (content, completion) = self.scan_triple(quote_char);
            let dedented = dedent(&content, kind == QuoteKind::Backtick, &mut self.fixes);
            Value::String(dedented, completion)
        } else {
            self.advance();
            let (content, completion) = self.scan_quoted(quote_char, ctx);
            Value::String(content, completion)
        }
    }

    fn scan_quoted(&mut self, quote_char: char, ctx: ValueContext) -> (String, Completion) {
        let mut out = String::new();
        loop {
            match self.peek() {
                None => return (out, Completion::Incomplete),
                Some('\\') => {
                    self.advance();
                    match self.advance() {
                        Some('n') => out.push('\n'),
                        Some('t') => out.push('\t'),
                        Some('r') => out.push('\r'),
                        Some('"') => out.push('"'),
                        Some('\'') => out.push('\''),
                        Some('\\') => out.push('\\'),
                        Some('/') => out.push('/'),
                        Some('u') => {
                            let hex: String = (0..4).filter_map(|_| self.advance()).collect();
                            if let Ok(code) = u32::from_str_radix(&hex, 16) {
                                if let Some(ch) = char::from_u32(code) {
                                    out.push(ch);
                                }
                            }
                        }
                        Some(other) => {
                            out.push('\\');
                            out.push(other);
                        }
                        None => {}
                    }
                }
                Some(c) if c == quote_char => {
                    let next = self.peek_non_ws_after(1);
                    if self.quote_terminates(next, ctx) {
                        self.advance();
                        return (out, Completion::Complete);
                    }
                    self.fixes.insert(FixKind::UnescapedQuoteInString);
                    out.push(c);
                    self.advance();
                }
                Some(c) => {
                    out.push(c);
                    self.advance();
                }
            }
        }
    }

    fn quote_terminates(&self, next: Option<char>, ctx: ValueContext) -> bool {
        match next {
            None => true,
            Some(c) => match ctx {
                ValueContext::Top => true,
                ValueContext::ObjectKey => c == ':',
                ValueContext::ObjectValue => c == ',' || c == '}',
                ValueContext::ArrayElement => c == ',' || c == ']',
            },
        }
    }

    fn scan_triple(&mut self, quote_char: char) -> (String, Completion) {
        let mut out = String::new();
        loop {
            if self.peek() == Some(quote_char)
                && self.peek_at(1) == Some(quote_char)
                && self.peek_at(2) == Some(quote_char)
            {
                self.pos += 3;
                return (out, Completion::Complete);
            }
            match self.advance() {
                Some(c) => out.push(c),
                None => return (out, Completion::Incomplete),
            }
        }
    }

    fn parse_number_or_unquoted(&mut self, ctx: ValueContext) -> Value {
        let start = self.pos;
        if let Some((number, end)) = self.scan_number() {
            let next_is_token_char = self
                .chars
                .get(end)
                .map(|c| c.is_alphanumeric() || *c == '_')
                .unwrap_or(false);
            if !next_is_token_char {
                self.pos = end;
                // spec.md §3.1: a number whose scan ran straight to
                // end-of-input (no delimiter ever seen) was truncated
                // mid-digit as far as this parser can tell — the stream
                // could always have had more digits queued up.
                let completion = if end == self.chars.len() {
                    Completion::Incomplete
                } else {
                    Completion::Complete
                };
                return Value::Number(number, completion);
            }
        }
        self.pos = start;
        self.parse_unquoted(ctx)
    }

    /// Scans a clean JSON-syntax number starting at `self.pos`, without
    /// consuming it, returning the value and the exclusive end position.
    fn scan_number(&self) -> Option<(serde_json::Number, usize)> {
        let chars = &self.chars;
        let mut i = self.pos;
        if matches!(chars.get(i), Some('+') | Some('-')) {
            i += 1;
        }
        let digits_start = i;
        while chars.get(i).map(|c| c.is_ascii_digit()).unwrap_or(false) {
            i += 1;
        }
        if i == digits_start {
            return None;
        }
        let mut end = i;
        if chars.get(end) == Some(&'.') {
            let mut k = end + 1;
            while chars.get(k).map(|c| c.is_ascii_digit()).unwrap_or(false) {
                k += 1;
            }
            if k > end + 1 {
                end = k;
            }
        }
        if matches!(chars.get(end), Some('e') | Some('E')) {
            let mut k = end + 1;
            if matches!(chars.get(k), Some('+') | Some('-')) {
                k += 1;
            }
            let exp_digits_start = k;
            while chars.get(k).map(|c| c.is_ascii_digit()).unwrap_or(false) {
                k += 1;
            }
            if k > exp_digits_start {
                end = k;
            }
        }

        let text: String = chars[self.pos..end].iter().collect();
        let is_float = text.contains('.') || text.contains('e') || text.contains('E');
        let number = if is_float {
            text.parse::<f64>().ok().and_then(serde_json::Number::from_f64)
        } else {
            text.parse::<i64>().ok().map(serde_json::Number::from)
        }?;
        Some((number, end))
    }

    fn parse_unquoted(&mut self, ctx: ValueContext) -> Value {
        let mut out = String::new();
        loop {
            match self.peek() {
                None => return Value::String(out.trim_end().to_string(), Completion::Incomplete),
                Some(c) => {
                    if self.unquoted_terminates(ctx, c) {
                        return Value::String(out.trim_end().to_string(), Completion::Complete);
                    }
                    out.push(c);
                    self.advance();
                }
            }
        }
    }

    fn unquoted_terminates(&self, ctx: ValueContext, c: char) -> bool {
        // spec.md §4.4 item 9: a bareword immediately followed by `{` is
        // always a terminated string, regardless of position.
        if c == '{' {
            return true;
        }
        match ctx {
            ValueContext::Top => c == '[',
            ValueContext::ObjectKey => c == ':',
            ValueContext::ObjectValue => {
                if c == '}' {
                    return true;
                }
                if c == ',' {
                    let after = self.peek_at(1);
                    return after.is_none() || after == Some('\n');
                }
                false
            }
            ValueContext::ArrayElement => c == ',' || c == ']',
        }
    }
}

/// Dedents a triple-quoted string's content (spec.md §4.4 item 1): strips
/// a leading empty line, strips an optional first-line language hint for
/// triple-backtick strings, then removes the minimum common
/// leading-whitespace prefix across non-empty lines.
fn dedent(content: &str, strip_lang_hint: bool, fixes: &mut BTreeSet<FixKind>) -> String {
    let mut lines: Vec<&str> = content.split('\n').collect();

    if lines.len() > 1 && lines[0].trim().is_empty() {
        lines.remove(0);
    }
    if lines.len() > 1 && lines.last().map(|l| l.trim().is_empty()).unwrap_or(false) {
        lines.pop();
    }

    if strip_lang_hint {
        if let Some(first) = lines.first() {
            let looks_like_hint = !first.is_empty()
                && first.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-' || c == '+');
            if looks_like_hint {
                lines.remove(0);
                fixes.insert(FixKind::LanguageHintStripped);
            }
        }
    }

    let min_indent = lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);

    if min_indent > 0 {
        fixes.insert(FixKind::Dedent);
    }

    lines
        .iter()
        .map(|l| if l.len() >= min_indent { &l[min_indent..] } else { l.trim_start() })
        .collect::<Vec<_>>()
        .join("\n")
}
