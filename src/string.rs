use crate::source::Span;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct Ident {
    pub name: IdentName,
    #[serde(default)]
    pub span: Span,
}

impl Ident {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            span: Span::EMPTY,
        }
    }

    pub fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }
}

impl std::fmt::Display for Ident {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

pub type IdentName = Arc<str>;

/// Binary name of a JVM type, e.g. `java.lang.String` or `pkg.Outer$Inner`.
pub type TypeName = Arc<str>;
