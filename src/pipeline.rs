//! The staged pipeline entry point: source text in, diagnostics out.
//!
//! Each stage hands its diagnostics back as a list — there is no process-wide
//! error flag.  Lexical and syntax diagnostics accumulate; any of them stops
//! the run before resolution.  Static diagnostics accumulate and stop the run
//! before execution.  Runtime errors are fail-fast, so at most one appears.
//! An empty returned list means the program ran to completion.

use std::io::Write;

use log::info;

use crate::error::VesperError;
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::scanner::Scanner;
use crate::token::Token;

/// Run `source` as a Vesper program, writing `print` output to `out`.
pub fn run(source: &[u8], out: &mut dyn Write) -> Vec<VesperError> {
    info!("Pipeline started over {} bytes", source.len());

    let mut diagnostics: Vec<VesperError> = Vec::new();

    // Stage 1: scan.  Lexical errors accumulate while the token list still
    // completes, so the parser always sees a terminated stream.
    let mut tokens: Vec<Token<'_>> = Vec::new();

    for item in Scanner::new(source) {
        match item {
            Ok(token) => tokens.push(token),
            Err(e) => diagnostics.push(e),
        }
    }

    // Stage 2: parse.
    let (statements, parse_diagnostics) = Parser::new(&tokens).parse();
    diagnostics.extend(parse_diagnostics);

    if !diagnostics.is_empty() {
        info!("Pipeline stopped before resolution");
        return diagnostics;
    }

    // Stage 3: resolve.  Any static diagnostic prevents execution.
    let mut interpreter = Interpreter::new(out);

    let resolve_diagnostics = Resolver::new(&mut interpreter).resolve(&statements);
    if !resolve_diagnostics.is_empty() {
        info!("Pipeline stopped before execution");
        return resolve_diagnostics;
    }

    // Stage 4: interpret — fail-fast, at most one runtime diagnostic.
    if let Err(e) = interpreter.interpret(&statements) {
        diagnostics.push(e);
    }

    diagnostics
}
