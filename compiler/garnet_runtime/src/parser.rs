//! Parser collaborator for `Runtime::compile`.

use garnet_value::EvalError;

/// Result of parsing one source unit.
#[derive(Clone, Debug, PartialEq)]
pub struct ParseOutput<A> {
    pub ast: A,
    /// Full local-name table after parsing, when the source introduced new
    /// locals.
    pub local_names: Option<Vec<String>>,
}

/// Turns source text into a tree, given the locals already in scope.
pub trait Parser {
    type Ast;

    fn parse(
        &mut self,
        source: &str,
        file: &str,
        line: u32,
        known_locals: &[String],
    ) -> Result<ParseOutput<Self::Ast>, EvalError>;
}
