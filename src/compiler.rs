//! Single-pass recursive-descent compiler.
//!
//! Lowers source text directly into a [`Chunk`]: there is no intermediate
//! AST. The parser pulls tokens one at a time from the [`Scanner`] and emits
//! bytes as it recognizes each production, backpatching jump targets once
//! their destination is known.

use crate::chunk::{Chunk, OpCode};
use crate::error::{Diagnostic, Reporter};
use crate::interner::Interner;
use crate::scanner::Scanner;
use crate::token::{Token, TokenType};
use crate::value::Value;

enum BinOp {
    Multiply,
    Divide,
    Add,
    Subtract,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

struct Compiler<'a> {
    scanner: Scanner<'a>,
    current: Token,
    previous: Token,
    had_error: bool,
    panic_mode: bool,
    interner: Interner,
}

impl<'a> Compiler<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            scanner: Scanner::new(source),
            current: Token::synthetic(TokenType::Eof, 0),
            previous: Token::synthetic(TokenType::Eof, 0),
            had_error: false,
            panic_mode: false,
            interner: Interner::new(),
        }
    }

    fn check(&self, kind: TokenType) -> bool {
        self.current.kind == kind
    }

    fn advance(&mut self, reporter: &mut dyn Reporter) {
        self.previous = self.current.clone();
        loop {
            self.current = self.scanner.scan_token();
            if self.current.kind != TokenType::Error {
                break;
            }
            let message = self.current.lexeme.clone();
            self.error_at_current(&message, reporter);
        }
    }

    fn match_token(&mut self, kind: TokenType, reporter: &mut dyn Reporter) -> bool {
        if !self.check(kind) {
            return false;
        }
        self.advance(reporter);
        true
    }

    fn consume(&mut self, kind: TokenType, message: &str, reporter: &mut dyn Reporter) {
        if self.check(kind) {
            self.advance(reporter);
            return;
        }
        self.error_at_current(message, reporter);
    }

    /// Renders `[line L] Error at <location>: <message>` per the contract in
    /// the language overview, where `<location>` is `end` at EOF, the raw
    /// diagnostic text for a scanner `Error` token, or the quoted lexeme
    /// otherwise.
    fn error_at(&mut self, at_current: bool, message: &str, reporter: &mut dyn Reporter) {
        if self.panic_mode {
            return;
        }
        self.panic_mode = true;
        self.had_error = true;

        let token = if at_current {
            &self.current
        } else {
            &self.previous
        };
        let location = match token.kind {
            TokenType::Eof => "end".to_string(),
            TokenType::Error => token.lexeme.clone(),
            _ => format!("'{}'", token.lexeme),
        };
        let rendered = format!("[line {}] Error at {}: {}", token.line, location, message);
        reporter.report(Diagnostic::new(rendered));
    }

    fn error(&mut self, message: &str, reporter: &mut dyn Reporter) {
        self.error_at(false, message, reporter);
    }

    fn error_at_current(&mut self, message: &str, reporter: &mut dyn Reporter) {
        self.error_at(true, message, reporter);
    }

    fn identifier_constant(
        &mut self,
        name: &Token,
        chunk: &mut Chunk,
        reporter: &mut dyn Reporter,
    ) -> Option<u8> {
        let handle = self.interner.intern(&name.lexeme);
        match chunk.add_constant(Value::Obj(handle)) {
            Ok(index) => Some(index),
            Err(err) => {
                self.error(&err.to_string(), reporter);
                None
            }
        }
    }

    // expr := unary ( binop unary )*
    fn expression(&mut self, chunk: &mut Chunk, reporter: &mut dyn Reporter) {
        self.unary(chunk, reporter);
        loop {
            let op = match self.current.kind {
                TokenType::Star => BinOp::Multiply,
                TokenType::Slash => BinOp::Divide,
                TokenType::Plus => BinOp::Add,
                TokenType::Minus => BinOp::Subtract,
                TokenType::EqualEqual => BinOp::Equal,
                TokenType::BangEqual => BinOp::NotEqual,
                TokenType::Less => BinOp::Less,
                TokenType::LessEqual => BinOp::LessEqual,
                TokenType::Greater => BinOp::Greater,
                TokenType::GreaterEqual => BinOp::GreaterEqual,
                _ => break,
            };
            self.advance(reporter); // consume the operator
            let line = self.previous.line;
            self.unary(chunk, reporter);
            match op {
                BinOp::Multiply => chunk.write_op(OpCode::Multiply, line),
                BinOp::Divide => chunk.write_op(OpCode::Divide, line),
                BinOp::Add => chunk.write_op(OpCode::Add, line),
                BinOp::Subtract => chunk.write_op(OpCode::Subtract, line),
                BinOp::Equal => chunk.write_op(OpCode::Equal, line),
                BinOp::NotEqual => {
                    chunk.write_op(OpCode::Equal, line);
                    chunk.write_op(OpCode::Not, line);
                }
                BinOp::Less => chunk.write_op(OpCode::Less, line),
                BinOp::LessEqual => {
                    chunk.write_op(OpCode::Greater, line);
                    chunk.write_op(OpCode::Not, line);
                }
                BinOp::Greater => chunk.write_op(OpCode::Greater, line),
                BinOp::GreaterEqual => {
                    chunk.write_op(OpCode::Less, line);
                    chunk.write_op(OpCode::Not, line);
                }
            }
        }
    }

    // unary := ( '!' | '-' ) unary | primary
    fn unary(&mut self, chunk: &mut Chunk, reporter: &mut dyn Reporter) {
        if self.check(TokenType::Bang) || self.check(TokenType::Minus) {
            self.advance(reporter);
            let kind = self.previous.kind;
            let line = self.previous.line;
            self.unary(chunk, reporter);
            match kind {
                TokenType::Bang => chunk.write_op(OpCode::Not, line),
                TokenType::Minus => chunk.write_op(OpCode::Negate, line),
                _ => unreachable!(),
            }
            return;
        }
        self.primary(chunk, reporter);
    }

    // primary := NUMBER | 'true' | 'false' | 'nil' | '(' expr ')' | IDENT ( '=' expr )?
    //
    // A leading token is always consumed here, even when it matches nothing
    // below: advancing unconditionally guarantees every call makes forward
    // progress, so a malformed expression can never stall the compiler on a
    // token it never gets past.
    fn primary(&mut self, chunk: &mut Chunk, reporter: &mut dyn Reporter) {
        self.advance(reporter);
        let line = self.previous.line;
        match self.previous.kind {
            TokenType::Number => {
                let value: f64 = self.previous.lexeme.parse().unwrap_or(0.0);
                if let Err(err) = chunk.emit_constant(Value::Number(value), line) {
                    self.error(&err.to_string(), reporter);
                }
            }
            TokenType::True => chunk.write_op(OpCode::True, line),
            TokenType::False => chunk.write_op(OpCode::False, line),
            TokenType::Nil => chunk.write_op(OpCode::Nil, line),
            TokenType::LeftParen => {
                self.expression(chunk, reporter);
                self.consume(TokenType::RightParen, "Expect ')' after expression.", reporter);
            }
            TokenType::Identifier => {
                let name = self.previous.clone();
                if self.match_token(TokenType::Equal, reporter) {
                    self.expression(chunk, reporter);
                    if let Some(index) = self.identifier_constant(&name, chunk, reporter) {
                        chunk.write_op(OpCode::SetGlobal, line);
                        chunk.write_byte(index, line);
                    }
                } else if let Some(index) = self.identifier_constant(&name, chunk, reporter) {
                    chunk.write_op(OpCode::GetGlobal, line);
                    chunk.write_byte(index, line);
                }
            }
            _ => self.error("Expect expression.", reporter),
        }
    }

    fn declaration(&mut self, chunk: &mut Chunk, reporter: &mut dyn Reporter) {
        if self.match_token(TokenType::Var, reporter) {
            self.var_declaration(chunk, reporter);
        } else {
            self.statement(chunk, reporter);
        }
    }

    fn var_declaration(&mut self, chunk: &mut Chunk, reporter: &mut dyn Reporter) {
        self.consume(TokenType::Identifier, "Expect variable name.", reporter);
        let name = self.previous.clone();
        let global = self.identifier_constant(&name, chunk, reporter);

        if self.match_token(TokenType::Equal, reporter) {
            self.expression(chunk, reporter);
        } else {
            chunk.write_op(OpCode::Nil, self.previous.line);
        }
        self.consume(
            TokenType::Semicolon,
            "Expect ';' after variable declaration.",
            reporter,
        );

        let line = self.previous.line;
        if let Some(index) = global {
            chunk.write_op(OpCode::DefineGlobal, line);
            chunk.write_byte(index, line);
        }
    }

    fn statement(&mut self, chunk: &mut Chunk, reporter: &mut dyn Reporter) {
        if self.match_token(TokenType::Print, reporter) {
            self.print_statement(chunk, reporter);
        } else if self.match_token(TokenType::If, reporter) {
            self.if_statement(chunk, reporter);
        } else if self.match_token(TokenType::While, reporter) {
            self.while_statement(chunk, reporter);
        } else if self.match_token(TokenType::LeftBrace, reporter) {
            self.block(chunk, reporter);
        } else {
            self.expression_statement(chunk, reporter);
        }
    }

    fn print_statement(&mut self, chunk: &mut Chunk, reporter: &mut dyn Reporter) {
        self.expression(chunk, reporter);
        self.consume(TokenType::Semicolon, "Expect ';' after value.", reporter);
        chunk.write_op(OpCode::Print, self.previous.line);
    }

    fn expression_statement(&mut self, chunk: &mut Chunk, reporter: &mut dyn Reporter) {
        self.expression(chunk, reporter);
        self.consume(TokenType::Semicolon, "Expect ';' after expression.", reporter);
        chunk.write_op(OpCode::Pop, self.previous.line);
    }

    // Blocks are just `{ declaration* }`; this dialect has no locals, so a
    // block introduces no new scope.
    fn block(&mut self, chunk: &mut Chunk, reporter: &mut dyn Reporter) {
        while !self.check(TokenType::RightBrace) && !self.check(TokenType::Eof) {
            self.declaration(chunk, reporter);
        }
        self.consume(TokenType::RightBrace, "Expect '}' after block.", reporter);
    }

    fn if_statement(&mut self, chunk: &mut Chunk, reporter: &mut dyn Reporter) {
        self.consume(TokenType::LeftParen, "Expect '(' after 'if'.", reporter);
        self.expression(chunk, reporter);
        self.consume(TokenType::RightParen, "Expect ')' after if condition.", reporter);

        let then_jump = chunk.emit_jump(OpCode::JumpIfFalse, self.previous.line);
        chunk.write_op(OpCode::Pop, self.previous.line);
        self.declaration(chunk, reporter);

        let else_jump = chunk.emit_jump(OpCode::Jump, self.previous.line);
        if chunk.patch_jump(then_jump).is_err() {
            self.error("Too much code to jump over.", reporter);
        }
        chunk.write_op(OpCode::Pop, self.previous.line);

        if self.match_token(TokenType::Else, reporter) {
            self.declaration(chunk, reporter);
        }
        if chunk.patch_jump(else_jump).is_err() {
            self.error("Too much code to jump over.", reporter);
        }
    }

    fn while_statement(&mut self, chunk: &mut Chunk, reporter: &mut dyn Reporter) {
        let loop_start = chunk.len();
        self.consume(TokenType::LeftParen, "Expect '(' after 'while'.", reporter);
        self.expression(chunk, reporter);
        self.consume(TokenType::RightParen, "Expect ')' after condition.", reporter);

        let exit_jump = chunk.emit_jump(OpCode::JumpIfFalse, self.previous.line);
        chunk.write_op(OpCode::Pop, self.previous.line);
        self.declaration(chunk, reporter);
        if chunk.emit_loop(loop_start, self.previous.line).is_err() {
            self.error("Too much code to jump over.", reporter);
        }

        if chunk.patch_jump(exit_jump).is_err() {
            self.error("Too much code to jump over.", reporter);
        }
        chunk.write_op(OpCode::Pop, self.previous.line);
    }
}

/// Compiles `source` into `chunk`, returning `true` iff no compile error was
/// raised. Runs to completion regardless of earlier errors, emitting
/// best-effort bytecode the whole way.
pub fn compile(source: &str, chunk: &mut Chunk, reporter: &mut dyn Reporter) -> bool {
    let mut compiler = Compiler::new(source);
    compiler.advance(reporter);
    while !compiler.match_token(TokenType::Eof, reporter) {
        compiler.declaration(chunk, reporter);
    }
    chunk.write_op(OpCode::Return, compiler.previous.line);
    !compiler.had_error
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CollectingReporter;
    use std::convert::TryFrom;
    use std::rc::Rc;

    fn compile_ok(source: &str) -> Chunk {
        let mut chunk = Chunk::new();
        let mut reporter = CollectingReporter::default();
        assert!(compile(source, &mut chunk, &mut reporter), "expected compile to succeed, diagnostics: {:?}", reporter.diagnostics);
        chunk
    }

    #[test]
    fn empty_source_compiles_to_a_single_return() {
        let chunk = compile_ok("");
        assert_eq!(chunk.len(), 1);
        assert_eq!(OpCode::try_from(chunk.byte_at(0)).unwrap(), OpCode::Return);
    }

    #[test]
    fn print_statement_ends_with_pop_free_print_then_return() {
        let chunk = compile_ok("print 1;");
        let ops: Vec<OpCode> = (0..chunk.len())
            .filter_map(|i| OpCode::try_from(chunk.byte_at(i)).ok())
            .collect();
        assert!(ops.contains(&OpCode::Print));
        assert_eq!(*ops.last().unwrap(), OpCode::Return);
    }

    #[test]
    fn unterminated_expression_reports_and_fails() {
        let mut chunk = Chunk::new();
        let mut reporter = CollectingReporter::default();
        let ok = compile("print ;", &mut chunk, &mut reporter);
        assert!(!ok);
        assert!(!reporter.diagnostics.is_empty());
        assert!(reporter.diagnostics[0].message.contains("Expect expression."));
    }

    #[test]
    fn only_the_first_error_is_reported_once_panic_mode_sets_in() {
        let mut chunk = Chunk::new();
        let mut reporter = CollectingReporter::default();
        // two back-to-back malformed statements
        compile("print ; print ;", &mut chunk, &mut reporter);
        assert_eq!(reporter.diagnostics.len(), 1);
    }

    #[test]
    fn repeated_identifier_references_intern_the_same_underlying_name() {
        // each mention of "a" gets its own constant-pool slot, but the
        // Obj(name) each slot holds must be the same Rc allocation, or the
        // VM's content-keyed globals table would still be correct by luck
        // rather than by construction
        let chunk = compile_ok("var a = 1; print a; print a;");
        let mut names = Vec::new();
        let mut i = 0;
        while i < chunk.len() {
            let op = OpCode::try_from(chunk.byte_at(i)).unwrap();
            match op {
                OpCode::DefineGlobal | OpCode::GetGlobal | OpCode::SetGlobal => {
                    let idx = chunk.byte_at(i + 1);
                    if let Value::Obj(name) = chunk.constant_at(idx) {
                        names.push(Rc::clone(name));
                    }
                    i += 2;
                }
                OpCode::Constant => i += 2,
                _ => i += 1,
            }
        }
        assert!(names.len() >= 2);
        assert!(names.windows(2).all(|w| Rc::ptr_eq(&w[0], &w[1])));
    }
}
