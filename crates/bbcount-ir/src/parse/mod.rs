//! Parser for the textual IR.
//!
//! Accepts the LLVM assembly subset the rest of the crate models. Parsing
//! runs in two passes over the token stream: the first reads top-level
//! entities and declares every function, so a body may call a function
//! defined further down; the second fills in the bodies.

mod lexer;

use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::{debug, debug_span};

use crate::function::{Function, FunctionAttrs};
use crate::instr::{BinaryOp, CallSite, CastOp, InstKind, Instruction, IntPredicate};
use crate::module::{GlobalVariable, Linkage, Module, Symbol};
use crate::types::Type;
use crate::value::{BlockId, Constant, FuncId, Operand, ValueDef, ValueId};
use lexer::{Spanned, Token};

const BITCODE_MAGIC: [u8; 4] = [b'B', b'C', 0xC0, 0xDE];
const BITCODE_WRAPPER_MAGIC: [u8; 4] = [0xDE, 0xC0, 0x17, 0x0B];

/// Errors produced while reading a module.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("{line}:{column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },
    #[error("bitcode input is not supported, disassemble it with llvm-dis first")]
    Bitcode,
    #[error("input is not valid UTF-8")]
    NotUtf8,
}

type PResult<T> = std::result::Result<T, ParseError>;

/// Parse a module from raw file contents.
///
/// Bitcode is detected by its magic number and rejected.
pub fn parse_bytes(bytes: &[u8], name: &str) -> PResult<Module> {
    if bytes.starts_with(&BITCODE_MAGIC) || bytes.starts_with(&BITCODE_WRAPPER_MAGIC) {
        return Err(ParseError::Bitcode);
    }
    let source = std::str::from_utf8(bytes).map_err(|_| ParseError::NotUtf8)?;
    parse_module(source, name)
}

/// Parse a module from textual IR.
pub fn parse_module(source: &str, name: &str) -> PResult<Module> {
    let _span = debug_span!("parse", module = name).entered();
    let mut parser = Parser::new(source, name);
    let tokens = lexer::lex(source).map_err(|offset| parser.error_at(offset, "unrecognized input"))?;
    parser.tokens = tokens;
    parser.parse()?;
    debug!(
        functions = parser.module.functions().len(),
        globals = parser.module.globals().len(),
        "parsed module"
    );
    Ok(parser.module)
}

/// Locals used before their definition, with the offset of the first use.
type Pending = FxHashMap<String, usize>;

fn describe(token: &Token) -> String {
    match token {
        Token::GlobalIdent(name) => format!("`@{name}`"),
        Token::LocalIdent(name) => format!("`%{name}`"),
        Token::Label(name) => format!("label `{name}:`"),
        Token::MetadataRef(id) => format!("`!{id}`"),
        Token::MetadataName(name) => format!("`!{name}`"),
        Token::AttrRef => "attribute group".to_string(),
        Token::ComdatRef => "comdat".to_string(),
        Token::Ident(word) => format!("`{word}`"),
        Token::Int(value) => format!("`{value}`"),
        Token::Str(text) => format!("\"{text}\""),
        Token::Equals => "`=`".to_string(),
        Token::Comma => "`,`".to_string(),
        Token::LParen => "`(`".to_string(),
        Token::RParen => "`)`".to_string(),
        Token::LBrace => "`{`".to_string(),
        Token::RBrace => "`}`".to_string(),
        Token::LBracket => "`[`".to_string(),
        Token::RBracket => "`]`".to_string(),
        Token::LAngle => "`<`".to_string(),
        Token::RAngle => "`>`".to_string(),
        Token::Star => "`*`".to_string(),
        Token::Ellipsis => "`...`".to_string(),
        Token::Bang => "`!`".to_string(),
        Token::Pipe => "`|`".to_string(),
    }
}

fn is_constant_keyword(word: &str) -> bool {
    matches!(
        word,
        "true" | "false" | "null" | "undef" | "poison" | "zeroinitializer"
    )
}

struct Parser<'s> {
    source: &'s str,
    tokens: Vec<Spanned>,
    pos: usize,
    line_starts: Vec<usize>,
    module: Module,
    /// Function definitions and the token index just past their `{`.
    bodies: Vec<(FuncId, usize)>,
}

impl<'s> Parser<'s> {
    fn new(source: &'s str, name: &str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self {
            source,
            tokens: Vec::new(),
            pos: 0,
            line_starts,
            module: Module::new(name),
            bodies: Vec::new(),
        }
    }

    // Diagnostics

    fn error_at(&self, offset: usize, message: impl Into<String>) -> ParseError {
        let line = self.line_starts.partition_point(|&start| start <= offset);
        let column = offset - self.line_starts[line - 1] + 1;
        ParseError::Syntax {
            line,
            column,
            message: message.into(),
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        self.error_at(self.offset(), message)
    }

    fn unexpected(&self, what: &str) -> ParseError {
        let found = self
            .peek()
            .map_or_else(|| "end of input".to_string(), describe);
        self.error(format!("expected {what}, found {found}"))
    }

    // Token cursor

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map_or(self.source.len(), |t| t.span.start)
    }

    fn peek(&self) -> Option<&Token> {
        self.peek_at(0)
    }

    fn peek_at(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.pos + n).map(|t| &t.token)
    }

    fn peek_keyword(&self, word: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(w)) if w == word)
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos)?.token.clone();
        self.pos += 1;
        Some(token)
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, word: &str) -> bool {
        if self.peek_keyword(word) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token) -> PResult<()> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.unexpected(&describe(expected)))
        }
    }

    fn expect_keyword(&mut self, word: &str) -> PResult<()> {
        if self.eat_keyword(word) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("`{word}`")))
        }
    }

    fn expect_ident(&mut self, what: &str) -> PResult<String> {
        match self.peek() {
            Some(Token::Ident(word)) => {
                let word = word.clone();
                self.pos += 1;
                Ok(word)
            }
            _ => Err(self.unexpected(what)),
        }
    }

    fn expect_global(&mut self) -> PResult<String> {
        match self.peek() {
            Some(Token::GlobalIdent(name)) => {
                let name = name.clone();
                self.pos += 1;
                Ok(name)
            }
            _ => Err(self.unexpected("a global name")),
        }
    }

    fn expect_local(&mut self) -> PResult<String> {
        match self.peek() {
            Some(Token::LocalIdent(name)) => {
                let name = name.clone();
                self.pos += 1;
                Ok(name)
            }
            _ => Err(self.unexpected("a local name")),
        }
    }

    fn expect_str(&mut self) -> PResult<String> {
        match self.peek() {
            Some(Token::Str(text)) => {
                let text = text.clone();
                self.pos += 1;
                Ok(text)
            }
            _ => Err(self.unexpected("a string")),
        }
    }

    fn expect_u32(&mut self) -> PResult<u32> {
        let offset = self.offset();
        match self.peek() {
            Some(&Token::Int(value)) => {
                self.pos += 1;
                u32::try_from(value).map_err(|_| self.error_at(offset, "integer out of range"))
            }
            _ => Err(self.unexpected("an integer")),
        }
    }

    /// Skip a delimited group, including nested groups of the same kind.
    fn skip_balanced(&mut self, open: &Token, close: &Token) -> PResult<()> {
        let start = self.offset();
        self.expect(open)?;
        let mut depth = 1usize;
        while depth > 0 {
            match self.bump() {
                Some(token) if token == *open => depth += 1,
                Some(token) if token == *close => depth -= 1,
                Some(_) => {}
                None => return Err(self.error_at(start, "unclosed delimiter")),
            }
        }
        Ok(())
    }

    fn line_end(&self, offset: usize) -> usize {
        self.source[offset..]
            .find('\n')
            .map_or(self.source.len(), |i| offset + i)
    }

    /// Skip the remaining tokens on the line containing `offset`.
    fn skip_line(&mut self, offset: usize) {
        let end = self.line_end(offset);
        while self.tokens.get(self.pos).is_some_and(|t| t.span.start < end) {
            self.pos += 1;
        }
    }

    /// Source text spanned by tokens `first..end`.
    fn text_between(&self, first: usize, end: usize) -> String {
        if end <= first {
            return String::new();
        }
        self.source[self.tokens[first].span.start..self.tokens[end - 1].span.end].to_string()
    }

    /// Consume the tokens left on the line containing `offset` and return
    /// their source text, trailing comment excluded.
    fn take_line_tokens(&mut self, offset: usize) -> String {
        let first = self.pos;
        self.skip_line(offset);
        self.text_between(first, self.pos)
    }

    /// Consume the rest of the current line and return its raw text.
    fn take_rest_of_line(&mut self) -> String {
        let start = self.tokens[self.pos - 1].span.end;
        let end = self.line_end(start);
        self.skip_line(start);
        self.source[start..end].trim().to_string()
    }

    // Module level

    fn parse(&mut self) -> PResult<()> {
        while let Some(token) = self.peek().cloned() {
            match token {
                Token::Ident(word) => match word.as_str() {
                    "source_filename" => {
                        self.pos += 1;
                        self.expect(&Token::Equals)?;
                        self.module.source_filename = Some(self.expect_str()?);
                    }
                    "target" => self.parse_target()?,
                    "declare" => self.parse_declaration()?,
                    "define" => self.parse_definition()?,
                    "attributes" => {
                        let offset = self.offset();
                        let group = self.take_line_tokens(offset);
                        self.module.add_attribute_group(group);
                    }
                    _ => return Err(self.error(format!("unexpected `{word}` at top level"))),
                },
                Token::GlobalIdent(_) => self.parse_global()?,
                Token::ComdatRef => {
                    let offset = self.offset();
                    let comdat = self.take_line_tokens(offset);
                    self.module.add_comdat(comdat);
                }
                Token::MetadataRef(id) => {
                    self.pos += 1;
                    self.expect(&Token::Equals)?;
                    let text = self.take_rest_of_line();
                    self.module.add_metadata(id, text);
                }
                Token::MetadataName(name) => {
                    self.pos += 1;
                    self.expect(&Token::Equals)?;
                    let text = self.take_rest_of_line();
                    self.module.add_named_metadata(name, text);
                }
                other => {
                    return Err(self.error(format!(
                        "expected a top-level entity, found {}",
                        describe(&other)
                    )));
                }
            }
        }

        for (id, start) in std::mem::take(&mut self.bodies) {
            self.pos = start;
            self.parse_body(id)?;
        }
        Ok(())
    }

    fn parse_target(&mut self) -> PResult<()> {
        self.pos += 1;
        let offset = self.offset();
        let which = self.expect_ident("`datalayout` or `triple`")?;
        self.expect(&Token::Equals)?;
        let value = self.expect_str()?;
        match which.as_str() {
            "datalayout" => self.module.target_datalayout = Some(value),
            "triple" => self.module.target_triple = Some(value),
            _ => return Err(self.error_at(offset, format!("unknown target property `{which}`"))),
        }
        Ok(())
    }

    fn parse_global(&mut self) -> PResult<()> {
        let offset = self.offset();
        let name = self.expect_global()?;
        self.expect(&Token::Equals)?;

        let mut linkage = Linkage::External;
        let mut qualifiers = Vec::new();
        let is_constant = loop {
            let first = self.pos;
            let word = self.expect_ident("`global` or `constant`")?;
            match word.as_str() {
                "global" => break false,
                "constant" => break true,
                _ => {
                    // thread_local(...), addrspace(...)
                    if self.peek() == Some(&Token::LParen) {
                        self.skip_balanced(&Token::LParen, &Token::RParen)?;
                    }
                    match Linkage::from_keyword(&word) {
                        Some(found) => linkage = found,
                        None => qualifiers.push(self.text_between(first, self.pos)),
                    }
                }
            }
        };

        let ty = self.parse_type()?;
        let mut global = GlobalVariable::new(name, ty).with_linkage(linkage);
        global.is_constant = is_constant;
        global.qualifiers = qualifiers.join(" ");
        if self.at_constant() {
            global.initializer = Some(self.parse_constant(ty)?);
        }
        while self.peek() == Some(&Token::Comma) {
            if matches!(self.peek_at(1), Some(Token::Ident(w)) if w == "align") {
                self.pos += 2;
                global.align = Some(self.expect_u32()?);
            } else {
                // section, comdat and metadata attachments
                self.pos += 1;
                global.attachments = self.take_line_tokens(offset);
                break;
            }
        }

        self.module
            .add_global(global)
            .map_err(|e| self.error_at(offset, e.to_string()))?;
        Ok(())
    }

    fn parse_declaration(&mut self) -> PResult<()> {
        let offset = self.offset();
        self.pos += 1;
        let mut func = self.parse_function_header()?;
        // Trailing attribute groups and metadata.
        if let Some(prev) = self.tokens.get(self.pos - 1) {
            let end = prev.span.end;
            let mut attrs = func.attrs().clone();
            attrs.suffix = self.take_line_tokens(end);
            func.set_attrs(attrs);
        }
        self.module
            .add_function(func)
            .map_err(|e| self.error_at(offset, e.to_string()))?;
        Ok(())
    }

    fn parse_definition(&mut self) -> PResult<()> {
        let offset = self.offset();
        self.pos += 1;
        let mut func = self.parse_function_header()?;

        // Attributes, personality, section, `!dbg` up to the body.
        let suffix_start = self.pos;
        while self.peek() != Some(&Token::LBrace) {
            if self.bump().is_none() {
                return Err(self.error_at(offset, "function definition has no body"));
            }
        }
        let mut attrs = func.attrs().clone();
        attrs.suffix = self.text_between(suffix_start, self.pos);
        func.set_attrs(attrs);
        self.pos += 1;
        let body_start = self.pos;
        let mut depth = 1usize;
        while depth > 0 {
            match self.bump() {
                Some(Token::LBrace) => depth += 1,
                Some(Token::RBrace) => depth -= 1,
                Some(_) => {}
                None => return Err(self.error_at(offset, "unterminated function body")),
            }
        }

        let id = self
            .module
            .add_function(func)
            .map_err(|e| self.error_at(offset, e.to_string()))?;
        self.bodies.push((id, body_start));
        Ok(())
    }

    /// `[linkage] [attrs] <ty> @name(<params>)`
    fn parse_function_header(&mut self) -> PResult<Function> {
        let mut linkage = Linkage::External;
        let mut prefix = Vec::new();
        loop {
            match self.peek() {
                Some(Token::Ident(word)) if Type::from_keyword(word).is_some() => break,
                Some(Token::Ident(word)) => {
                    let found = Linkage::from_keyword(word);
                    let first = self.pos;
                    self.pos += 1;
                    // `align 8`, `cc 10`, `dereferenceable(8)`
                    if matches!(self.peek(), Some(Token::Int(_))) {
                        self.pos += 1;
                    }
                    if self.peek() == Some(&Token::LParen) {
                        self.skip_balanced(&Token::LParen, &Token::RParen)?;
                    }
                    match found {
                        Some(found) => linkage = found,
                        None => prefix.push(self.text_between(first, self.pos)),
                    }
                }
                _ => return Err(self.unexpected("a return type")),
            }
        }
        let ret_ty = self.parse_type()?;
        let name = self.expect_global()?;
        let mut func = Function::new(name, ret_ty);
        func.set_linkage(linkage);
        let mut attrs = FunctionAttrs {
            prefix: prefix.join(" "),
            ..FunctionAttrs::default()
        };

        self.expect(&Token::LParen)?;
        if self.eat(&Token::RParen) {
            func.set_attrs(attrs);
            return Ok(func);
        }
        loop {
            if self.eat(&Token::Ellipsis) {
                func.set_variadic(true);
                self.expect(&Token::RParen)?;
                func.set_attrs(attrs);
                return Ok(func);
            }
            let ty = self.parse_type()?;
            let first = self.pos;
            self.skip_attributes()?;
            attrs.params.push(self.text_between(first, self.pos));
            let offset = self.offset();
            if let Some(Token::LocalIdent(name)) = self.peek() {
                let name = name.clone();
                self.pos += 1;
                if func.value_by_name(&name).is_some() {
                    return Err(self.error_at(offset, format!("duplicate parameter `%{name}`")));
                }
                func.add_param(ty, &name);
            } else {
                func.add_param(ty, "");
            }
            if self.eat(&Token::RParen) {
                func.set_attrs(attrs);
                return Ok(func);
            }
            self.expect(&Token::Comma)?;
        }
    }

    // Types, constants and attributes

    fn parse_type(&mut self) -> PResult<Type> {
        let offset = self.offset();
        let ty = match self.peek() {
            Some(Token::Ident(word)) => match Type::from_keyword(word) {
                Some(ty) => ty,
                None => return Err(self.error(format!("unsupported type `{word}`"))),
            },
            Some(Token::LBracket | Token::LBrace | Token::LAngle) => {
                return Err(self.error("aggregate and vector types are not supported"));
            }
            _ => return Err(self.unexpected("a type")),
        };
        self.pos += 1;
        // Typed pointers (`i8*`) read as opaque pointers.
        let mut ty = ty;
        while self.eat(&Token::Star) {
            if ty.is_void() {
                return Err(self.error_at(offset, "pointer to `void` is not a valid type"));
            }
            ty = Type::Ptr;
        }
        Ok(ty)
    }

    /// Skip parameter and return attributes (`noundef`, `align 8`, `#0`, ...).
    fn skip_attributes(&mut self) -> PResult<()> {
        loop {
            match self.peek() {
                Some(Token::Ident(word))
                    if Type::from_keyword(word).is_none() && !is_constant_keyword(word) =>
                {
                    let is_align = word == "align";
                    self.pos += 1;
                    if is_align && matches!(self.peek(), Some(Token::Int(_))) {
                        self.pos += 1;
                    }
                    if self.peek() == Some(&Token::LParen) {
                        self.skip_balanced(&Token::LParen, &Token::RParen)?;
                    }
                }
                Some(Token::AttrRef) => self.pos += 1,
                _ => return Ok(()),
            }
        }
    }

    fn at_constant(&self) -> bool {
        match self.peek() {
            Some(Token::Int(_)) => true,
            Some(Token::Ident(word)) => is_constant_keyword(word),
            _ => false,
        }
    }

    fn parse_constant(&mut self, ty: Type) -> PResult<Constant> {
        let offset = self.offset();
        let constant = match self.bump() {
            Some(Token::Int(value)) => match ty {
                Type::Int(width) => Constant::int(width, value),
                _ => return Err(self.error_at(offset, format!("integer constant for `{ty}`"))),
            },
            Some(Token::Ident(word)) => match word.as_str() {
                "true" | "false" if ty == Type::I1 => Constant::int(1, i64::from(word == "true")),
                "null" if ty.is_ptr() => Constant::Null,
                "undef" => Constant::Undef,
                "poison" => Constant::Poison,
                "zeroinitializer" => Constant::zero(ty)
                    .ok_or_else(|| self.error_at(offset, "`zeroinitializer` for `void`"))?,
                _ => return Err(self.error_at(offset, format!("invalid constant `{word}` for `{ty}`"))),
            },
            _ => return Err(self.error_at(offset, "expected a constant")),
        };
        Ok(constant)
    }

    // Function bodies

    fn parse_body(&mut self, id: FuncId) -> PResult<()> {
        let placeholder = Function::new(String::new(), Type::Void);
        let mut func = std::mem::replace(self.module.function_mut(id), placeholder);
        let _span = debug_span!("body", function = func.name()).entered();

        // Labels first, so branches may refer to later blocks.
        let starts_with_label = matches!(self.peek(), Some(Token::Label(_)));
        if !starts_with_label {
            func.add_block("");
        }
        let mut index = self.pos;
        while let Some(spanned) = self.tokens.get(index) {
            match &spanned.token {
                Token::RBrace => break,
                Token::Label(name) => {
                    if func.block_by_name(name).is_some() {
                        return Err(self.error_at(spanned.span.start, format!("duplicate label `{name}`")));
                    }
                    func.add_block(name.clone());
                }
                _ => {}
            }
            index += 1;
        }

        let mut pending = Pending::default();
        let mut current = (!starts_with_label).then_some(0usize);
        loop {
            match self.peek() {
                Some(Token::RBrace) => {
                    self.pos += 1;
                    break;
                }
                Some(Token::Label(_)) => {
                    self.pos += 1;
                    current = Some(current.map_or(0, |c| c + 1));
                }
                Some(_) => {
                    let Some(block) = current else {
                        return Err(self.error("instruction outside a block"));
                    };
                    let inst = self.parse_instruction(&mut func, &mut pending)?;
                    func.block_mut(BlockId::new(block)).push(inst);
                }
                None => return Err(self.error("unterminated function body")),
            }
        }

        if let Some((name, &offset)) = pending.iter().min_by_key(|&(_, &offset)| offset) {
            return Err(self.error_at(offset, format!("use of undefined value `%{name}`")));
        }
        *self.module.function_mut(id) = func;
        Ok(())
    }

    fn parse_instruction(&mut self, func: &mut Function, pending: &mut Pending) -> PResult<Instruction> {
        let offset = self.offset();
        let result = match (self.peek(), self.peek_at(1)) {
            (Some(Token::LocalIdent(name)), Some(Token::Equals)) => {
                let name = name.clone();
                self.pos += 2;
                Some(name)
            }
            _ => None,
        };

        let mut opcode = self.expect_ident("an instruction")?;
        if matches!(opcode.as_str(), "tail" | "musttail" | "notail") {
            opcode = self.expect_ident("`call`")?;
        }
        let (mut kind, ty) = self.parse_inst_kind(&opcode, func, pending)?;

        let (align, dbg) = self.parse_trailer()?;
        if let InstKind::Alloca { align: slot, .. }
        | InstKind::Load { align: slot, .. }
        | InstKind::Store { align: slot, .. } = &mut kind
        {
            *slot = align;
        }
        let mut inst = Instruction::new(kind);
        inst.dbg = dbg;

        if let Some(name) = result {
            if ty.is_void() {
                return Err(self.error_at(offset, format!("`{opcode}` does not produce a value")));
            }
            inst.result = Some(self.define_local(func, pending, &name, ty, offset)?);
        }
        Ok(inst)
    }

    /// Parse the operation after the opcode. Returns the kind and result type.
    fn parse_inst_kind(
        &mut self,
        opcode: &str,
        func: &mut Function,
        pending: &mut Pending,
    ) -> PResult<(InstKind, Type)> {
        if let Some(op) = BinaryOp::from_mnemonic(opcode) {
            let (mut nuw, mut nsw) = (false, false);
            loop {
                if self.eat_keyword("nuw") {
                    nuw = true;
                } else if self.eat_keyword("nsw") {
                    nsw = true;
                } else if !(self.eat_keyword("disjoint") || self.eat_keyword("exact")) {
                    break;
                }
            }
            let ty = self.parse_type()?;
            let lhs = self.parse_operand(func, pending, ty)?;
            self.expect(&Token::Comma)?;
            let rhs = self.parse_operand(func, pending, ty)?;
            let kind = InstKind::Binary {
                op,
                ty,
                lhs,
                rhs,
                nuw,
                nsw,
            };
            return Ok((kind, ty));
        }
        if let Some(op) = CastOp::from_mnemonic(opcode) {
            let from = self.parse_type()?;
            let value = self.parse_operand(func, pending, from)?;
            self.expect_keyword("to")?;
            let to = self.parse_type()?;
            return Ok((InstKind::Cast { op, from, value, to }, to));
        }

        match opcode {
            "alloca" => {
                let ty = self.parse_type()?;
                Ok((InstKind::Alloca { ty, align: None }, Type::Ptr))
            }
            "load" => {
                self.eat_keyword("volatile");
                let ty = self.parse_type()?;
                self.expect(&Token::Comma)?;
                self.parse_type()?;
                let ptr = self.parse_operand(func, pending, Type::Ptr)?;
                Ok((InstKind::Load { ty, ptr, align: None }, ty))
            }
            "store" => {
                self.eat_keyword("volatile");
                let ty = self.parse_type()?;
                let value = self.parse_operand(func, pending, ty)?;
                self.expect(&Token::Comma)?;
                self.parse_type()?;
                let ptr = self.parse_operand(func, pending, Type::Ptr)?;
                let kind = InstKind::Store {
                    ty,
                    value,
                    ptr,
                    align: None,
                };
                Ok((kind, Type::Void))
            }
            "icmp" => {
                let word = self.expect_ident("a comparison predicate")?;
                let pred = IntPredicate::from_mnemonic(&word)
                    .ok_or_else(|| self.error(format!("unknown predicate `{word}`")))?;
                let ty = self.parse_type()?;
                let lhs = self.parse_operand(func, pending, ty)?;
                self.expect(&Token::Comma)?;
                let rhs = self.parse_operand(func, pending, ty)?;
                Ok((InstKind::ICmp { pred, ty, lhs, rhs }, Type::I1))
            }
            "phi" => {
                let ty = self.parse_type()?;
                let mut incoming = Vec::new();
                loop {
                    self.expect(&Token::LBracket)?;
                    let value = self.parse_operand(func, pending, ty)?;
                    self.expect(&Token::Comma)?;
                    let block = self.parse_block_ref(func)?;
                    self.expect(&Token::RBracket)?;
                    incoming.push((value, block));
                    if self.peek() == Some(&Token::Comma) && self.peek_at(1) == Some(&Token::LBracket) {
                        self.pos += 1;
                    } else {
                        break;
                    }
                }
                Ok((InstKind::Phi { ty, incoming }, ty))
            }
            "call" => {
                let site = self.parse_call_site(func, pending)?;
                let ty = site.ret_ty;
                Ok((InstKind::Call(site), ty))
            }
            "invoke" => {
                let site = self.parse_call_site(func, pending)?;
                let ty = site.ret_ty;
                self.expect_keyword("to")?;
                let normal = self.parse_label(func)?;
                self.expect_keyword("unwind")?;
                let unwind = self.parse_label(func)?;
                Ok((InstKind::Invoke { site, normal, unwind }, ty))
            }
            "br" => {
                if self.peek_keyword("label") {
                    let dest = self.parse_label(func)?;
                    return Ok((InstKind::Br { dest }, Type::Void));
                }
                let cond_ty = self.parse_type()?;
                let cond = self.parse_operand(func, pending, cond_ty)?;
                self.expect(&Token::Comma)?;
                let then_dest = self.parse_label(func)?;
                self.expect(&Token::Comma)?;
                let else_dest = self.parse_label(func)?;
                let kind = InstKind::CondBr {
                    cond,
                    then_dest,
                    else_dest,
                };
                Ok((kind, Type::Void))
            }
            "ret" => {
                let ty = self.parse_type()?;
                let value = if ty.is_void() {
                    None
                } else {
                    Some(self.parse_operand(func, pending, ty)?)
                };
                Ok((InstKind::Ret { ty, value }, Type::Void))
            }
            "unreachable" => Ok((InstKind::Unreachable, Type::Void)),
            _ => Err(self.error(format!("unsupported instruction `{opcode}`"))),
        }
    }

    /// `[attrs] <ty> [(<param tys>)] <callee>(<args>) [#N]`
    fn parse_call_site(&mut self, func: &mut Function, pending: &mut Pending) -> PResult<CallSite> {
        self.skip_attributes()?;
        let ret_ty = self.parse_type()?;
        if self.peek() == Some(&Token::LParen) {
            // Explicit function type of a variadic or indirect callee.
            self.skip_balanced(&Token::LParen, &Token::RParen)?;
            self.eat(&Token::Star);
        }
        let callee = match self.peek() {
            Some(Token::LocalIdent(_) | Token::GlobalIdent(_)) => self.parse_operand(func, pending, Type::Ptr)?,
            _ => return Err(self.unexpected("a callee")),
        };

        self.expect(&Token::LParen)?;
        let mut args = Vec::new();
        if !self.eat(&Token::RParen) {
            loop {
                let ty = self.parse_type()?;
                self.skip_attributes()?;
                let value = self.parse_operand(func, pending, ty)?;
                args.push((ty, value));
                if self.eat(&Token::RParen) {
                    break;
                }
                self.expect(&Token::Comma)?;
            }
        }
        while self.eat(&Token::AttrRef) {}
        Ok(CallSite { ret_ty, callee, args })
    }

    /// Trailing `, align N` and `, !kind !N` attachments. Returns the
    /// alignment and the `!dbg` node.
    fn parse_trailer(&mut self) -> PResult<(Option<u32>, Option<u32>)> {
        let (mut align, mut dbg) = (None, None);
        while self.peek() == Some(&Token::Comma) {
            match self.peek_at(1) {
                Some(Token::Ident(word)) if word == "align" => {
                    self.pos += 2;
                    align = Some(self.expect_u32()?);
                }
                Some(Token::MetadataName(kind)) => {
                    let is_dbg = kind == "dbg";
                    self.pos += 2;
                    match self.bump() {
                        Some(Token::MetadataRef(node)) => {
                            if is_dbg {
                                dbg = Some(node);
                            }
                        }
                        Some(Token::Bang) if self.peek() == Some(&Token::LBrace) => {
                            self.skip_balanced(&Token::LBrace, &Token::RBrace)?;
                        }
                        _ => return Err(self.error("expected a metadata node")),
                    }
                }
                _ => break,
            }
        }
        Ok((align, dbg))
    }

    fn parse_operand(&mut self, func: &mut Function, pending: &mut Pending, ty: Type) -> PResult<Operand> {
        let offset = self.offset();
        match self.peek().cloned() {
            Some(Token::LocalIdent(name)) => {
                self.pos += 1;
                if let Some(id) = func.value_by_name(&name) {
                    return Ok(Operand::Local(id));
                }
                let id = func
                    .add_named_value(&name, ty, ValueDef::Inst)
                    .map_err(|e| self.error_at(offset, e.to_string()))?;
                pending.insert(name, offset);
                Ok(Operand::Local(id))
            }
            Some(Token::GlobalIdent(name)) => {
                self.pos += 1;
                match self.module.symbol(&name) {
                    Some(Symbol::Global(id)) => Ok(Operand::Global(id)),
                    Some(Symbol::Function(id)) => Ok(Operand::Function(id)),
                    None => Err(self.error_at(offset, format!("use of undefined symbol `@{name}`"))),
                }
            }
            _ if self.at_constant() => self.parse_constant(ty).map(Operand::Const),
            _ => Err(self.unexpected("an operand")),
        }
    }

    /// Bind `%name` to an instruction result, resolving any earlier forward use.
    fn define_local(
        &self,
        func: &mut Function,
        pending: &mut Pending,
        name: &str,
        ty: Type,
        offset: usize,
    ) -> PResult<ValueId> {
        match func.value_by_name(name) {
            Some(id) if pending.remove(name).is_some() => {
                func.set_value_type(id, ty);
                Ok(id)
            }
            Some(_) => Err(self.error_at(offset, format!("redefinition of `%{name}`"))),
            None => func
                .add_named_value(name, ty, ValueDef::Inst)
                .map_err(|e| self.error_at(offset, e.to_string())),
        }
    }

    /// `label %name`
    fn parse_label(&mut self, func: &Function) -> PResult<BlockId> {
        self.expect_keyword("label")?;
        self.parse_block_ref(func)
    }

    /// `%name` naming a block.
    fn parse_block_ref(&mut self, func: &Function) -> PResult<BlockId> {
        let offset = self.offset();
        let name = self.expect_local()?;
        func.block_by_name(&name)
            .ok_or_else(|| self.error_at(offset, format!("use of undefined label `%{name}`")))
    }
}
