//! Splitting a script into individual statements.
//!
//! PostgreSQL wraps a multi-statement simple query in an implicit transaction,
//! so scripts that must run outside a transaction are sent one statement at a
//! time. Splitting uses the sqlparser tokenizer, so semicolons inside string
//! literals, quoted identifiers, comments and dollar-quoted bodies are kept.

use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::tokenizer::{Token, Tokenizer};

/// Splits `sql` on top-level semicolons.
///
/// Each statement keeps its original text, including leading comments, and
/// ends with `;` when the source had one. Chunks holding only whitespace and
/// comments are dropped. If the tokenizer rejects the script, it is returned
/// whole so the server reports the error.
#[must_use]
pub fn split_statements(sql: &str) -> Vec<String> {
    let dialect = PostgreSqlDialect {};
    let tokens = match Tokenizer::new(&dialect, sql).with_unescape(false).tokenize() {
        Ok(tokens) => tokens,
        Err(e) => {
            tracing::warn!(error = %e, "Cannot tokenize script, sending it as one statement");
            return vec![sql.to_string()];
        }
    };

    let mut statements = Vec::new();
    let mut current = String::new();
    let mut has_code = false;
    for token in tokens {
        match token {
            Token::SemiColon => {
                current.push(';');
                if has_code {
                    statements.push(current.trim().to_string());
                }
                current.clear();
                has_code = false;
            }
            Token::Whitespace(ws) => current.push_str(&ws.to_string()),
            Token::EOF => {}
            other => {
                has_code = true;
                current.push_str(&other.to_string());
            }
        }
    }
    if has_code {
        statements.push(current.trim().to_string());
    }
    statements
}
