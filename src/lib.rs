pub mod builder;
pub mod context;
pub mod evaluator;
pub mod sandbox;
pub mod scenario;
pub mod source;
pub mod string;
pub mod syntax;
pub mod value;
