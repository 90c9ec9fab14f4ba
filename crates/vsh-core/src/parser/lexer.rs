//! Lexer for command arguments.
//!
//! Handles:
//! - Word tokenization on whitespace
//! - Variable references (`$VAR`, `${VAR}`)
//! - Quote handling (single quotes literal, double quotes with escapes and
//!   variable expansion)

// =============================================================================
// Token Types
// =============================================================================

/// Token types produced by the lexer
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// A word (command name or argument)
    Word(String),
    /// Bare variable reference `$VAR` or `${VAR}`
    Variable(String),
}

/// Result of reading a variable name after `$`
enum VariableRead {
    Name(String),
    /// Just `$` or `${}`
    Empty,
    /// `${...` without closing `}`
    UnclosedBrace(String),
}

/// Variable lookup used inside double quotes.
pub type VarLookup<'a> = &'a dyn Fn(&str) -> Option<String>;

// =============================================================================
// Lexer
// =============================================================================

pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    vars: Option<VarLookup<'a>>,
}

impl<'a> Lexer<'a> {
    /// Lexer that leaves `$VAR` inside double quotes untouched.
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            vars: None,
        }
    }

    /// Lexer that expands `$VAR` inside double quotes through `vars`.
    pub fn with_vars(input: &'a str, vars: VarLookup<'a>) -> Self {
        Self {
            input,
            pos: 0,
            vars: Some(vars),
        }
    }

    pub fn tokenize(self) -> Vec<Token> {
        self.collect()
    }

    fn skip_whitespace(&mut self) {
        while self.pos < self.input.len() {
            let c = self.current_char();
            if !c.is_whitespace() {
                break;
            }
            self.pos += c.len_utf8();
        }
    }

    fn current_char(&self) -> char {
        self.input[self.pos..].chars().next().unwrap_or('\0')
    }

    fn next_token(&mut self) -> Option<Token> {
        match self.current_char() {
            '$' => self.parse_variable(),
            '"' => self.parse_double_quoted(),
            '\'' => self.parse_single_quoted(),
            _ => self.parse_word(),
        }
    }

    fn parse_variable(&mut self) -> Option<Token> {
        self.pos += 1;

        if self.pos >= self.input.len() {
            return Some(Token::Word("$".to_string()));
        }

        match self.read_variable_name() {
            VariableRead::Name(name) => Some(Token::Variable(name)),
            VariableRead::Empty => Some(Token::Word("$".to_string())),
            VariableRead::UnclosedBrace(partial) => Some(Token::Word(format!("${{{}", partial))),
        }
    }

    /// Read a variable name after the `$` has been consumed.
    fn read_variable_name(&mut self) -> VariableRead {
        if self.current_char() == '{' {
            self.pos += 1;
            let start = self.pos;
            while self.pos < self.input.len() {
                let c = self.current_char();
                if c == '}' {
                    let name = self.input[start..self.pos].to_string();
                    self.pos += 1;
                    return if name.is_empty() {
                        VariableRead::Empty
                    } else {
                        VariableRead::Name(name)
                    };
                }
                self.pos += c.len_utf8();
            }
            return VariableRead::UnclosedBrace(self.input[start..].to_string());
        }

        let start = self.pos;
        while self.pos < self.input.len() {
            let c = self.current_char();
            if !c.is_ascii_alphanumeric() && c != '_' {
                break;
            }
            self.pos += c.len_utf8();
        }

        let name = &self.input[start..self.pos];
        if name.is_empty() {
            VariableRead::Empty
        } else {
            VariableRead::Name(name.to_string())
        }
    }

    fn parse_double_quoted(&mut self) -> Option<Token> {
        self.pos += 1;
        let mut result = String::new();

        while self.pos < self.input.len() {
            let c = self.current_char();
            self.pos += c.len_utf8();

            if c == '"' {
                break;
            } else if c == '\\' && self.pos < self.input.len() {
                let escaped = self.current_char();
                self.pos += escaped.len_utf8();
                match escaped {
                    'n' => result.push('\n'),
                    't' => result.push('\t'),
                    _ => result.push(escaped),
                }
            } else if c == '$' && self.pos < self.input.len() {
                let used_braces = self.current_char() == '{';
                match self.read_variable_name() {
                    VariableRead::Name(name) => match self.vars.and_then(|vars| vars(&name)) {
                        Some(value) => result.push_str(&value),
                        None if used_braces => result.push_str(&format!("${{{}}}", name)),
                        None => {
                            result.push('$');
                            result.push_str(&name);
                        }
                    },
                    VariableRead::Empty => result.push('$'),
                    VariableRead::UnclosedBrace(partial) => {
                        result.push_str(&format!("${{{}", partial));
                    }
                }
            } else {
                result.push(c);
            }
        }

        Some(Token::Word(result))
    }

    fn parse_single_quoted(&mut self) -> Option<Token> {
        self.pos += 1;
        let start = self.pos;

        while self.pos < self.input.len() {
            let c = self.current_char();
            if c == '\'' {
                let content = self.input[start..self.pos].to_string();
                self.pos += 1;
                return Some(Token::Word(content));
            }
            self.pos += c.len_utf8();
        }

        // Unclosed quote, keep what we have
        Some(Token::Word(self.input[start..].to_string()))
    }

    fn parse_word(&mut self) -> Option<Token> {
        let start = self.pos;

        while self.pos < self.input.len() {
            let c = self.current_char();
            if c.is_whitespace() || c == '$' || c == '"' || c == '\'' {
                break;
            }
            self.pos += c.len_utf8();
        }

        let word = &self.input[start..self.pos];
        if word.is_empty() {
            None
        } else {
            Some(Token::Word(word.to_string()))
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        self.skip_whitespace();
        if self.pos >= self.input.len() {
            return None;
        }
        self.next_token()
    }
}

// =============================================================================
// Tests
// =============================================================================
