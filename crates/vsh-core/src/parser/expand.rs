//! Variable expansion for lexed tokens.

use super::lexer::{Token, VarLookup};

/// Expand bare `$VAR` tokens into words.
///
/// Unknown variables expand to nothing and the empty word is dropped.
pub fn expand_tokens(tokens: Vec<Token>, vars: VarLookup<'_>) -> Vec<String> {
    tokens
        .into_iter()
        .filter_map(|token| match token {
            Token::Word(w) => Some(w),
            Token::Variable(name) => vars(&name).filter(|v| !v.is_empty()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variable_expansion() {
        let vars = |name: &str| (name == "HOME").then(|| "/root".to_string());
        let tokens = vec![
            Token::Word("cd".to_string()),
            Token::Variable("HOME".to_string()),
            Token::Variable("MISSING".to_string()),
        ];
        assert_eq!(expand_tokens(tokens, &vars), vec!["cd", "/root"]);
    }
}
