//! Pattern dialect normalization
//!
//! Patterns are written in PCRE style, while matching is done by the `regex`
//! crate (and `fancy-regex` for backtracking-only constructs). This module
//! rewrites a pattern so both engines see the fixed option set rxls promises:
//!
//! - UTF mode is always on: `(*UTF)` / `(*UTF8)` are accepted and dropped
//! - `(*UCP)` and `\C` are locked out
//! - `\d`, `\w`, `\s`, `\h`, `\v` and POSIX classes stay ASCII/PCRE-defined and
//!   are shielded from case folding with `(?-i:...)`
//! - `\R`, `\Z`, `\N`, `\Q...\E` and `(?#...)` comments work
//! - duplicate group names are allowed; a named back-reference to a
//!   duplicated name tries every group of that name
//! - PCRE bracket-expression literals (`[`, `&`, `~`) and non-quantifier
//!   braces are escaped
//!
//! Anything else passes through untouched and is left to the engine to
//! accept or reject.

use std::collections::{HashMap, HashSet};
use std::fmt;

const ASCII_DIGIT: &str = "0-9";
const ASCII_WORD: &str = "0-9A-Za-z_";
const ASCII_SPACE: &str = r"\t\n\x0B\x0C\r ";
const HORIZONTAL_SPACE: &str = r"\t \xA0\x{1680}\x{180E}\x{2000}-\x{200A}\x{202F}\x{205F}\x{3000}";
const VERTICAL_SPACE: &str = r"\n-\r\x{85}\x{2028}\x{2029}";
const LINE_BREAK: &str = r"(?:\r\n|[\n-\r\x{85}\x{2028}\x{2029}])";
const END_BEFORE_FINAL_NEWLINE: &str = r"(?=\n?\z)";

/// A pattern rejected before it reaches the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialectError {
    pub message: String,
    /// Byte offset into the original pattern
    pub offset: usize,
}

impl DialectError {
    fn new(message: impl Into<String>, offset: usize) -> Self {
        Self {
            message: message.into(),
            offset,
        }
    }
}

impl fmt::Display for DialectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at offset {}", self.message, self.offset)
    }
}

impl std::error::Error for DialectError {}

/// A rewritten pattern plus what the matcher needs to know about it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub pattern: String,
    /// Contains `X*+`, `X++`, `X?+` or `X{n,m}+`
    pub possessive: bool,
    /// Contains a back-reference
    pub backrefs: bool,
    /// Contains an inline flag group that turns caseless matching off
    pub case_sensitive_groups: bool,
}

impl Normalized {
    /// The standard engine reads possessive quantifiers as nested repetition
    pub fn requires_backtracking(&self) -> bool {
        self.possessive
    }

    /// Back-references compare text exactly, so caseless back-references are
    /// matched against a case-folded subject
    pub fn folds_subject(&self) -> bool {
        self.backrefs && !self.case_sensitive_groups
    }
}

/// Rewrite a PCRE-style pattern into syntax both engines accept
pub fn normalize(pattern: &str) -> Result<Normalized, DialectError> {
    let body_start = strip_leading_verbs(pattern)?;
    Normalizer::new(pattern, body_start).run()
}

/// Skip start-of-pattern verbs, returning the offset where the body begins
fn strip_leading_verbs(pattern: &str) -> Result<usize, DialectError> {
    let mut pos = 0;

    while pattern[pos..].starts_with("(*") {
        let rest = &pattern[pos + 2..];
        let Some(end) = rest.find(')') else {
            return Err(DialectError::new("(*VERB) not recognized or malformed", pos));
        };

        match &rest[..end] {
            "UTF" | "UTF8" => {}
            "UCP" => {
                return Err(DialectError::new(
                    "using UCP is disabled by the application",
                    pos,
                ));
            }
            _ => {
                return Err(DialectError::new("(*VERB) not recognized or malformed", pos));
            }
        }

        pos += end + 3;
    }

    Ok(pos)
}

/// An ASCII (or PCRE-fixed) set produced by a shorthand escape or POSIX class
#[derive(Debug, Clone, Copy)]
struct FixedSet {
    members: &'static str,
    negated: bool,
}

impl FixedSet {
    fn new(members: &'static str, negated: bool) -> Self {
        Self { members, negated }
    }

    /// Standalone form, immune to the caseless flag
    fn scoped(self) -> String {
        let caret = if self.negated { "^" } else { "" };
        format!("(?-i:[{}{}])", caret, self.members)
    }
}

enum Escape {
    Set(FixedSet),
    Text(String),
}

/// What the last emitted token was, for spotting quantifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Prev {
    Atom,
    GroupOpen,
    Quantifier,
}

struct Normalizer {
    chars: Vec<(usize, char)>,
    pos: usize,
    out: String,
    prev: Prev,
    group_names: HashSet<String>,
    /// name -> unique names emitted for it so far, in pattern order
    defined: HashMap<String, Vec<String>>,
    possessive: bool,
    backrefs: bool,
    case_sensitive_groups: bool,
}

impl Normalizer {
    fn new(pattern: &str, body_start: usize) -> Self {
        let chars = pattern[body_start..]
            .char_indices()
            .map(|(i, c)| (i + body_start, c))
            .collect();

        Self {
            chars,
            pos: 0,
            out: String::with_capacity(pattern.len()),
            prev: Prev::Atom,
            group_names: HashSet::new(),
            defined: HashMap::new(),
            possessive: false,
            backrefs: false,
            case_sensitive_groups: false,
        }
    }

    fn peek(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).map(|&(_, c)| c)
    }

    fn offset(&self) -> usize {
        self.chars.get(self.pos).map(|&(i, _)| i).unwrap_or_default()
    }

    fn run(mut self) -> Result<Normalized, DialectError> {
        while let Some(c) = self.peek(0) {
            match c {
                '\\' => {
                    match self.escape(false)? {
                        Some(Escape::Set(set)) => self.out.push_str(&set.scoped()),
                        Some(Escape::Text(text)) => self.out.push_str(&text),
                        None => continue,
                    }
                    self.prev = Prev::Atom;
                }
                '[' => {
                    self.class()?;
                    self.prev = Prev::Atom;
                }
                '(' => self.group_open(),
                '*' | '+' | '?' => self.quantifier(c),
                '{' => self.brace(),
                _ => {
                    self.out.push(c);
                    self.pos += 1;
                    self.prev = Prev::Atom;
                }
            }
        }

        Ok(Normalized {
            pattern: self.out,
            possessive: self.possessive,
            backrefs: self.backrefs,
            case_sensitive_groups: self.case_sensitive_groups,
        })
    }

    fn quantifier(&mut self, c: char) {
        self.prev = match self.prev {
            // `(?`: group syntax, not a quantifier
            Prev::GroupOpen => Prev::Atom,
            Prev::Quantifier => {
                if c == '+' {
                    self.possessive = true;
                }
                Prev::Atom
            }
            Prev::Atom => Prev::Quantifier,
        };
        self.out.push(c);
        self.pos += 1;
    }

    /// Copy a `{n}`, `{n,}` or `{n,m}` quantifier; any other brace is a literal
    fn brace(&mut self) {
        let mut body = String::new();
        let mut len = 1;
        while let Some(c) = self.peek(len) {
            if c == '}' {
                break;
            }
            body.push(c);
            len += 1;
        }

        if self.peek(len) == Some('}') && is_repetition(&body) {
            self.out.push('{');
            self.out.push_str(&body);
            self.out.push('}');
            self.pos += len + 1;
            self.prev = Prev::Quantifier;
        } else {
            self.out.push_str("\\{");
            self.pos += 1;
            self.prev = Prev::Atom;
        }
    }

    /// Handle a backslash escape at the cursor. `None` means nothing to emit.
    fn escape(&mut self, in_class: bool) -> Result<Option<Escape>, DialectError> {
        let start = self.offset();
        let Some(next) = self.peek(1) else {
            // Trailing backslash: leave it for the engine to report
            self.pos += 1;
            return Ok(Some(Escape::Text("\\".to_string())));
        };
        self.pos += 2;

        let set = |members, negated| Some(Escape::Set(FixedSet::new(members, negated)));
        let escape = match next {
            'C' => {
                return Err(DialectError::new(
                    "using \\C is disabled by the application",
                    start,
                ));
            }
            'Q' => Some(Escape::Text(self.quoted())),
            // A stray \E is ignored
            'E' => None,
            'd' => set(ASCII_DIGIT, false),
            'D' => set(ASCII_DIGIT, true),
            'w' => set(ASCII_WORD, false),
            'W' => set(ASCII_WORD, true),
            's' => set(ASCII_SPACE, false),
            'S' => set(ASCII_SPACE, true),
            'h' => set(HORIZONTAL_SPACE, false),
            'H' => set(HORIZONTAL_SPACE, true),
            'v' => set(VERTICAL_SPACE, false),
            'V' => set(VERTICAL_SPACE, true),
            'R' if !in_class => Some(Escape::Text(LINE_BREAK.to_string())),
            'Z' if !in_class => Some(Escape::Text(END_BEFORE_FINAL_NEWLINE.to_string())),
            'N' if !in_class && self.peek(0) != Some('{') => Some(Escape::Text(r"[^\n]".to_string())),
            'k' if !in_class => Some(Escape::Text(self.k_reference())),
            'g' if !in_class => Some(Escape::Text(self.g_reference())),
            '1'..='9' if !in_class => {
                self.backrefs = true;
                Some(Escape::Text(format!("\\{}", next)))
            }
            other => {
                let mut text = format!("\\{}", other);
                // Braced arguments belong to the escape, not a quantifier
                if matches!(other, 'x' | 'o' | 'p' | 'P' | 'N') && self.peek(0) == Some('{') {
                    if let Some((body, len)) = self.read_name(1, '}') {
                        text.push('{');
                        text.push_str(&body);
                        text.push('}');
                        self.pos += len;
                    }
                }
                Some(Escape::Text(text))
            }
        };

        Ok(escape)
    }

    /// `\k<name>`, `\k'name'` or `\k{name}`, cursor just past the `k`
    fn k_reference(&mut self) -> String {
        let terminator = match self.peek(0) {
            Some('<') => '>',
            Some('\'') => '\'',
            Some('{') => '}',
            _ => return "\\k".to_string(),
        };

        match self.read_name(1, terminator) {
            Some((name, len)) => {
                self.pos += len;
                self.backref(&name)
            }
            None => "\\k".to_string(),
        }
    }

    /// `\g{name}` is a named reference; numbered and relative forms pass through
    fn g_reference(&mut self) -> String {
        self.backrefs = true;

        if self.peek(0) == Some('{') {
            if let Some((name, len)) = self.read_name(1, '}') {
                let numeric = name.starts_with(|c: char| c.is_ascii_digit() || c == '-' || c == '+');
                if !numeric {
                    self.pos += len;
                    return self.backref(&name);
                }
            }
        }

        "\\g".to_string()
    }

    /// Read a name starting `from` chars ahead, up to `terminator`.
    /// Returns the name and the length consumed including the terminator.
    fn read_name(&self, from: usize, terminator: char) -> Option<(String, usize)> {
        let mut name = String::new();
        let mut len = from;

        loop {
            match self.peek(len) {
                Some(c) if c == terminator => break,
                Some(c) => name.push(c),
                None => return None,
            }
            len += 1;
        }

        Some((name, len + 1))
    }

    /// Reference by name. A duplicated name matches whichever of its groups
    /// defined so far is set; the engine rejects references to later groups.
    fn backref(&mut self, name: &str) -> String {
        self.backrefs = true;

        match self.defined.get(name) {
            Some(all) if all.len() > 1 => {
                let branches: Vec<String> = all.iter().map(|alias| format!("\\k<{}>", alias)).collect();
                format!("(?:{})", branches.join("|"))
            }
            _ => format!("\\k<{}>", name),
        }
    }

    /// `\Q...\E` content as escaped literals
    fn quoted(&mut self) -> String {
        let mut literal = String::new();

        while let Some(c) = self.peek(0) {
            if c == '\\' && self.peek(1) == Some('E') {
                self.pos += 2;
                break;
            }
            literal.push(c);
            self.pos += 1;
        }

        regex::escape(&literal)
    }

    /// Rewrite a bracket expression. Shorthand and POSIX sets are split out so
    /// the caseless flag never folds them.
    fn class(&mut self) -> Result<(), DialectError> {
        self.pos += 1;

        let negated = self.peek(0) == Some('^');
        if negated {
            self.pos += 1;
        }

        let mut items = String::new();
        let mut sets = Vec::new();

        // A leading ] is a literal
        if self.peek(0) == Some(']') {
            items.push_str("\\]");
            self.pos += 1;
        }

        let mut last_was_hyphen = false;
        loop {
            let Some(c) = self.peek(0) else {
                // Unterminated class: the engine reports it
                self.out.push('[');
                if negated {
                    self.out.push('^');
                }
                self.out.push_str(&items);
                return Ok(());
            };

            let hyphen = c == '-';
            match c {
                ']' => {
                    self.pos += 1;
                    break;
                }
                '\\' => match self.escape(true)? {
                    Some(Escape::Set(set)) => sets.push(set),
                    Some(Escape::Text(text)) => items.push_str(&text),
                    None => {}
                },
                '[' if self.peek(1) == Some(':') => match self.posix_class()? {
                    Some(set) => sets.push(set),
                    None => {
                        items.push_str("\\[");
                        self.pos += 1;
                    }
                },
                '[' | '&' | '~' => {
                    items.push('\\');
                    items.push(c);
                    self.pos += 1;
                }
                '-' if last_was_hyphen => {
                    items.push_str("\\-");
                    self.pos += 1;
                }
                _ => {
                    items.push(c);
                    self.pos += 1;
                }
            }
            last_was_hyphen = hyphen && !last_was_hyphen;
        }

        self.emit_class(negated, &items, &sets);
        Ok(())
    }

    fn emit_class(&mut self, negated: bool, items: &str, sets: &[FixedSet]) {
        let items = match items.strip_prefix('^') {
            Some(rest) => format!("\\^{}", rest),
            None => items.to_string(),
        };

        if sets.is_empty() {
            self.out.push('[');
            if negated {
                self.out.push('^');
            }
            self.out.push_str(&items);
            self.out.push(']');
            return;
        }

        let fixed = if negated {
            // Outside every positive set, inside every negated one
            let mut terms = Vec::new();
            let positive: String = sets.iter().filter(|s| !s.negated).map(|s| s.members).collect();
            if !positive.is_empty() {
                terms.push(format!("[^{}]", positive));
            }
            for set in sets.iter().filter(|s| s.negated) {
                terms.push(format!("[{}]", set.members));
            }
            format!("(?-i:[{}])", terms.join("&&"))
        } else {
            let union: String = sets
                .iter()
                .map(|s| {
                    if s.negated {
                        format!("[^{}]", s.members)
                    } else {
                        s.members.to_string()
                    }
                })
                .collect();
            format!("(?-i:[{}])", union)
        };

        if items.is_empty() {
            self.out.push_str(&fixed);
        } else if negated {
            self.out.push_str(&format!("(?:(?![{}]){})", items, fixed));
        } else {
            self.out.push_str(&format!("(?:[{}]|{})", items, fixed));
        }
    }

    /// Parse `[:name:]` / `[:^name:]`. `None` if the brackets never close.
    fn posix_class(&mut self) -> Result<Option<FixedSet>, DialectError> {
        let start = self.offset();
        let rest: String = self.chars[self.pos..].iter().map(|&(_, c)| c).collect();

        let Some(end) = rest.find(":]").filter(|&end| end >= 2) else {
            return Ok(None);
        };

        let (negated, name) = match rest[2..end].strip_prefix('^') {
            Some(name) => (true, name),
            None => (false, &rest[2..end]),
        };
        let Some(members) = posix_members(name) else {
            return Err(DialectError::new(
                format!("unknown POSIX class name '{}'", name),
                start,
            ));
        };

        self.pos += rest[..end + 2].chars().count();
        Ok(Some(FixedSet::new(members, negated)))
    }

    /// Handle `(`: comments, named groups, `(?P=name)`, or a plain group opener
    fn group_open(&mut self) {
        if self.peek(1) == Some('?') {
            match (self.peek(2), self.peek(3)) {
                (Some('#'), _) => {
                    self.skip_comment();
                    return;
                }
                (Some('P'), Some('<')) => {
                    if self.named_group(4, '>') {
                        return;
                    }
                }
                (Some('P'), Some('=')) => {
                    if let Some((name, len)) = self.read_name(4, ')') {
                        self.pos += len;
                        let reference = self.backref(&name);
                        self.out.push_str(&reference);
                        self.prev = Prev::Atom;
                        return;
                    }
                }
                (Some('<'), Some(next)) if next != '=' && next != '!' => {
                    if self.named_group(3, '>') {
                        return;
                    }
                }
                (Some('\''), _) => {
                    if self.named_group(3, '\'') {
                        return;
                    }
                }
                _ => {
                    if self.disables_caseless() {
                        self.case_sensitive_groups = true;
                    }
                }
            }
        }

        self.out.push('(');
        self.pos += 1;
        self.prev = Prev::GroupOpen;
    }

    /// True for flag groups like `(?-i)`, `(?s-i:` or `(?^)`
    fn disables_caseless(&self) -> bool {
        let mut flags = String::new();
        let mut len = 2;

        while let Some(c) = self.peek(len) {
            if c == ')' || c == ':' {
                return flags.starts_with('^')
                    || flags.split_once('-').is_some_and(|(_, off)| off.contains('i'));
            }
            if !(c.is_ascii_alphabetic() || c == '-' || c == '^') {
                return false;
            }
            flags.push(c);
            len += 1;
        }

        false
    }

    fn skip_comment(&mut self) {
        while let Some(c) = self.peek(0) {
            self.pos += 1;
            if c == ')' {
                break;
            }
        }
    }

    /// Emit a named group opener, renaming repeated names so they stay
    /// unique. Returns false if the name is unterminated.
    fn named_group(&mut self, name_start: usize, terminator: char) -> bool {
        let Some((name, len)) = self.read_name(name_start, terminator) else {
            return false;
        };

        let unique = self.unique_group_name(&name);
        self.defined.entry(name).or_default().push(unique.clone());

        self.out.push_str("(?P<");
        self.out.push_str(&unique);
        self.out.push('>');
        self.pos += len;
        self.prev = Prev::GroupOpen;
        true
    }

    fn unique_group_name(&mut self, name: &str) -> String {
        let mut candidate = name.to_string();
        let mut n = 1;

        while self.group_names.contains(&candidate) {
            candidate = format!("{}_dup{}", name, n);
            n += 1;
        }

        self.group_names.insert(candidate.clone());
        candidate
    }
}

fn is_repetition(body: &str) -> bool {
    let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    let (lo, hi) = body.split_once(',').unwrap_or((body, ""));

    !lo.is_empty() && all_digits(lo) && all_digits(hi)
}

fn posix_members(name: &str) -> Option<&'static str> {
    let members = match name {
        "alnum" => "0-9A-Za-z",
        // Caseless matching makes lower and upper both match every ASCII letter
        "alpha" | "lower" | "upper" => "A-Za-z",
        "ascii" => r"\x00-\x7F",
        "blank" => r"\t ",
        "cntrl" => r"\x00-\x1F\x7F",
        "digit" => ASCII_DIGIT,
        "graph" => "!-~",
        "print" => " -~",
        "punct" => r"!-/:-@\[-`{-~",
        "space" => ASCII_SPACE,
        "word" => ASCII_WORD,
        "xdigit" => "0-9A-Fa-f",
        _ => return None,
    };
    Some(members)
}
