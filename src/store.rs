//! Append-mostly token list plus the bracket depth it implies.
use crate::token::{Bracket, Token};

use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TokenStore {
    tokens: Vec<Token>,
    depth: usize,
}

/// Returned when a closing bracket is pushed at depth 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unbalanced;

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn last(&self) -> Option<&Token> {
        self.tokens.last()
    }

    pub fn push(&mut self, token: Token) -> Result<(), Unbalanced> {
        match token {
            Token::Bracket(Bracket::Open) => self.depth += 1,
            Token::Bracket(Bracket::Close) => {
                self.depth = self.depth.checked_sub(1).ok_or(Unbalanced)?;
            }
            _ => {}
        }
        debug!(?token, depth = self.depth, "token appended");
        self.tokens.push(token);
        Ok(())
    }

    /// Pushes every token or none of them.
    pub fn push_all(&mut self, tokens: Vec<Token>) -> Result<(), Unbalanced> {
        let len = self.tokens.len();
        for token in tokens {
            if let Err(err) = self.push(token) {
                self.truncate(len);
                return Err(err);
            }
        }
        Ok(())
    }

    pub fn pop(&mut self) -> Option<Token> {
        let token = self.tokens.pop()?;
        self.unwind(&token);
        debug!(?token, depth = self.depth, "token popped");
        Some(token)
    }

    /// Drops every token at index `len` and beyond in one step.
    pub fn truncate(&mut self, len: usize) {
        if len >= self.tokens.len() {
            return;
        }
        let removed: Vec<Token> = self.tokens.drain(len..).collect();
        for token in removed.iter().rev() {
            self.unwind(token);
        }
        debug!(removed = removed.len(), depth = self.depth, "tokens truncated");
    }

    pub fn clear(&mut self) {
        self.tokens.clear();
        self.depth = 0;
    }

    fn unwind(&mut self, token: &Token) {
        match token {
            Token::Bracket(Bracket::Open) => self.depth = self.depth.saturating_sub(1),
            Token::Bracket(Bracket::Close) => self.depth += 1,
            _ => {}
        }
    }
}
