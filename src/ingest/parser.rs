//! Dispatch of unlocked documents to bank-specific parsers

use crate::traits::*;
use crate::types::*;

/// Ordered collection of bank parsers
///
/// The first parser whose `can_parse` accepts the document handles it.
#[derive(Default)]
pub struct ParserRegistry {
    parsers: Vec<Box<dyn BankParser>>,
}

impl ParserRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parser; earlier registrations take precedence
    pub fn register(&mut self, parser: Box<dyn BankParser>) {
        self.parsers.push(parser);
    }

    /// Builder-style registration
    pub fn with_parser(mut self, parser: Box<dyn BankParser>) -> Self {
        self.register(parser);
        self
    }

    /// Names of the registered banks, in lookup order
    pub fn bank_names(&self) -> Vec<&str> {
        self.parsers.iter().map(|p| p.bank_name()).collect()
    }
}

impl StatementParser for ParserRegistry {
    fn parse(&self, unlocked: &[u8]) -> ImportResult<ParsedStatement> {
        let parser = self
            .parsers
            .iter()
            .find(|p| p.can_parse(unlocked))
            .ok_or_else(|| {
                ImportError::Parse("no suitable parser found for this document".to_string())
            })?;

        let candidates = parser.parse(unlocked).map_err(|e| match e {
            ImportError::Parse(reason) => {
                ImportError::Parse(format!("{}: {}", parser.bank_name(), reason))
            }
            other => other,
        })?;

        Ok(ParsedStatement {
            bank_identifier: parser.bank_name().to_string(),
            candidates,
        })
    }
}
