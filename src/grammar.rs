//! pest grammar shared by the clause compiler and the right-hand side evaluator.

use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "grammar.pest"]
pub(crate) struct PatternGrammar;
