//! Textual rendering of IR.
//!
//! The output uses the same syntax the parser accepts, so a printed module
//! can be read back.

use std::fmt::{self, Display, Formatter};

use crate::block::BasicBlock;
use crate::function::Function;
use crate::instr::{CallSite, InstKind, Instruction};
use crate::module::{GlobalVariable, Linkage, Module};
use crate::value::{BlockId, Operand};

/// Sigil-prefixed identifier, quoted when it is not a plain name.
struct Ident<'a>(char, &'a str);

impl Display for Ident<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let Self(sigil, name) = *self;
        if is_plain_ident(name) {
            write!(f, "{sigil}{name}")
        } else {
            write!(f, "{sigil}\"{name}\"")
        }
    }
}

fn is_plain_ident(name: &str) -> bool {
    let named = |c: char| c.is_ascii_alphanumeric() || matches!(c, '-' | '$' | '.' | '_');
    if name.is_empty() {
        return false;
    }
    if name.bytes().all(|b| b.is_ascii_digit()) {
        return true;
    }
    !name.starts_with(|c: char| c.is_ascii_digit()) && name.chars().all(named)
}

/// Rendering of a single instruction, with LLVM's two-space indent.
pub struct DisplayInst<'a> {
    module: &'a Module,
    func: &'a Function,
    inst: &'a Instruction,
}

/// Rendering of a whole function (definition or declaration).
pub struct DisplayFunction<'a> {
    module: &'a Module,
    func: &'a Function,
}

impl Module {
    /// Render one instruction of `func`.
    #[must_use]
    pub const fn display_inst<'a>(&'a self, func: &'a Function, inst: &'a Instruction) -> DisplayInst<'a> {
        DisplayInst {
            module: self,
            func,
            inst,
        }
    }

    /// Render a function.
    #[must_use]
    pub const fn display_function<'a>(&'a self, func: &'a Function) -> DisplayFunction<'a> {
        DisplayFunction { module: self, func }
    }
}

impl DisplayInst<'_> {
    fn operand(&self, f: &mut Formatter<'_>, op: &Operand) -> fmt::Result {
        match op {
            Operand::Local(id) => write!(f, "{}", Ident('%', &self.func.value(*id).name)),
            Operand::Global(id) => write!(f, "{}", Ident('@', &self.module.global(*id).name)),
            Operand::Function(id) => write!(f, "{}", Ident('@', self.module.function(*id).name())),
            Operand::Const(c) => write!(f, "{c}"),
        }
    }

    fn label(&self, f: &mut Formatter<'_>, block: BlockId) -> fmt::Result {
        write!(f, "label {}", Ident('%', self.func.block(block).name()))
    }

    fn call_site(&self, f: &mut Formatter<'_>, site: &CallSite) -> fmt::Result {
        // Variadic callees need the explicit function type.
        match site.called_function().map(|id| self.module.function(id)) {
            Some(callee) if callee.is_variadic() => write!(f, "{} ", callee.signature())?,
            _ => write!(f, "{} ", site.ret_ty)?,
        }
        self.operand(f, &site.callee)?;
        f.write_str("(")?;
        for (i, (ty, arg)) in site.args.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{ty} ")?;
            self.operand(f, arg)?;
        }
        f.write_str(")")
    }
}

fn write_align(f: &mut Formatter<'_>, align: Option<u32>) -> fmt::Result {
    match align {
        Some(align) => write!(f, ", align {align}"),
        None => Ok(()),
    }
}

impl Display for DisplayInst<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("  ")?;
        if let Some(id) = self.inst.result {
            write!(f, "{} = ", Ident('%', &self.func.value(id).name))?;
        }
        match &self.inst.kind {
            InstKind::Alloca { ty, align } => {
                write!(f, "alloca {ty}")?;
                write_align(f, *align)?;
            }
            InstKind::Load { ty, ptr, align } => {
                write!(f, "load {ty}, ptr ")?;
                self.operand(f, ptr)?;
                write_align(f, *align)?;
            }
            InstKind::Store {
                ty,
                value,
                ptr,
                align,
            } => {
                write!(f, "store {ty} ")?;
                self.operand(f, value)?;
                f.write_str(", ptr ")?;
                self.operand(f, ptr)?;
                write_align(f, *align)?;
            }
            InstKind::Binary {
                op,
                ty,
                lhs,
                rhs,
                nuw,
                nsw,
            } => {
                f.write_str(op.mnemonic())?;
                if *nuw {
                    f.write_str(" nuw")?;
                }
                if *nsw {
                    f.write_str(" nsw")?;
                }
                write!(f, " {ty} ")?;
                self.operand(f, lhs)?;
                f.write_str(", ")?;
                self.operand(f, rhs)?;
            }
            InstKind::ICmp { pred, ty, lhs, rhs } => {
                write!(f, "icmp {} {ty} ", pred.mnemonic())?;
                self.operand(f, lhs)?;
                f.write_str(", ")?;
                self.operand(f, rhs)?;
            }
            InstKind::Cast {
                op,
                from,
                value,
                to,
            } => {
                write!(f, "{} {from} ", op.mnemonic())?;
                self.operand(f, value)?;
                write!(f, " to {to}")?;
            }
            InstKind::Phi { ty, incoming } => {
                write!(f, "phi {ty} ")?;
                for (i, (value, block)) in incoming.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    f.write_str("[ ")?;
                    self.operand(f, value)?;
                    write!(f, ", {} ]", Ident('%', self.func.block(*block).name()))?;
                }
            }
            InstKind::Call(site) => {
                f.write_str("call ")?;
                self.call_site(f, site)?;
            }
            InstKind::Invoke {
                site,
                normal,
                unwind,
            } => {
                f.write_str("invoke ")?;
                self.call_site(f, site)?;
                f.write_str(" to ")?;
                self.label(f, *normal)?;
                f.write_str(" unwind ")?;
                self.label(f, *unwind)?;
            }
            InstKind::Br { dest } => {
                f.write_str("br ")?;
                self.label(f, *dest)?;
            }
            InstKind::CondBr {
                cond,
                then_dest,
                else_dest,
            } => {
                f.write_str("br i1 ")?;
                self.operand(f, cond)?;
                f.write_str(", ")?;
                self.label(f, *then_dest)?;
                f.write_str(", ")?;
                self.label(f, *else_dest)?;
            }
            InstKind::Ret { ty, value } => match value {
                Some(value) => {
                    write!(f, "ret {ty} ")?;
                    self.operand(f, value)?;
                }
                None => f.write_str("ret void")?,
            },
            InstKind::Unreachable => f.write_str("unreachable")?,
        }
        if let Some(node) = self.inst.dbg {
            write!(f, ", !dbg !{node}")?;
        }
        Ok(())
    }
}

impl DisplayFunction<'_> {
    fn block(&self, f: &mut Formatter<'_>, block: &BasicBlock, is_entry: bool) -> fmt::Result {
        if !(is_entry && block.name().is_empty()) {
            let label = Ident('%', block.name()).to_string();
            writeln!(f, "{}:", &label[1..])?;
        }
        for inst in block {
            writeln!(f, "{}", self.module.display_inst(self.func, inst))?;
        }
        Ok(())
    }
}

impl Display for DisplayFunction<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let func = self.func;
        let is_decl = func.is_declaration();
        f.write_str(if is_decl { "declare " } else { "define " })?;
        if func.linkage() != Linkage::External {
            write!(f, "{} ", func.linkage().keyword())?;
        }
        let attrs = func.attrs();
        if !attrs.prefix.is_empty() {
            write!(f, "{} ", attrs.prefix)?;
        }
        write!(f, "{} {}(", func.ret_ty(), Ident('@', func.name()))?;
        for (i, &param) in func.params().iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            let value = func.value(param);
            write!(f, "{}", value.ty)?;
            let param_attrs = attrs.param(i);
            if !param_attrs.is_empty() {
                write!(f, " {param_attrs}")?;
            }
            if !is_decl {
                write!(f, " {}", Ident('%', &value.name))?;
            }
        }
        if func.is_variadic() {
            f.write_str(if func.params().is_empty() { "..." } else { ", ..." })?;
        }
        f.write_str(")")?;
        if !attrs.suffix.is_empty() {
            write!(f, " {}", attrs.suffix)?;
        }
        if is_decl {
            return writeln!(f);
        }
        writeln!(f, " {{")?;
        for (i, block) in func.blocks().iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            self.block(f, block, i == 0)?;
        }
        writeln!(f, "}}")
    }
}

impl Display for GlobalVariable {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} = ", Ident('@', &self.name))?;
        if self.linkage != Linkage::External {
            write!(f, "{} ", self.linkage.keyword())?;
        } else if self.initializer.is_none() {
            f.write_str("external ")?;
        }
        if !self.qualifiers.is_empty() {
            write!(f, "{} ", self.qualifiers)?;
        }
        let kind = if self.is_constant { "constant" } else { "global" };
        write!(f, "{kind} {}", self.ty)?;
        if let Some(init) = &self.initializer {
            write!(f, " {init}")?;
        }
        write_align(f, self.align)?;
        if !self.attachments.is_empty() {
            write!(f, ", {}", self.attachments)?;
        }
        Ok(())
    }
}

impl Display for Module {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "; ModuleID = '{}'", self.name())?;
        if let Some(source) = &self.source_filename {
            writeln!(f, "source_filename = \"{source}\"")?;
        }
        if let Some(layout) = &self.target_datalayout {
            writeln!(f, "target datalayout = \"{layout}\"")?;
        }
        if let Some(triple) = &self.target_triple {
            writeln!(f, "target triple = \"{triple}\"")?;
        }
        let mut comdats = self.comdats().peekable();
        if comdats.peek().is_some() {
            writeln!(f)?;
        }
        for comdat in comdats {
            writeln!(f, "{comdat}")?;
        }
        if !self.globals().is_empty() {
            writeln!(f)?;
            for global in self.globals() {
                writeln!(f, "{global}")?;
            }
        }
        for func in self.functions() {
            writeln!(f)?;
            write!(f, "{}", self.display_function(func))?;
        }
        let mut groups = self.attribute_groups().peekable();
        if groups.peek().is_some() {
            writeln!(f)?;
        }
        for group in groups {
            writeln!(f, "{group}")?;
        }
        let mut named = self.named_metadata().peekable();
        let mut numbered = self.metadata().peekable();
        if named.peek().is_some() || numbered.peek().is_some() {
            writeln!(f)?;
        }
        for (name, text) in named {
            writeln!(f, "!{name} = {text}")?;
        }
        for (id, text) in numbered {
            writeln!(f, "!{id} = {text}")?;
        }
        Ok(())
    }
}
