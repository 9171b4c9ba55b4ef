//! Read-only traversal of a module: functions, stack slots and call sites.

use std::fmt::{self, Display, Formatter};

use bbcount_ir::{Function, Instruction, Module};
use rustc_hash::FxHashMap;

/// An instruction together with the context needed to print it.
#[derive(Clone, Copy)]
pub struct InstRef<'m> {
    pub module: &'m Module,
    pub func: &'m Function,
    pub inst: &'m Instruction,
}

impl fmt::Debug for InstRef<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstRef")
            .field("function", &self.func.name())
            .field("opcode", &self.inst.opcode())
            .finish()
    }
}

impl Display for InstRef<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.module.display_inst(self.func, self.inst).fmt(f)
    }
}

/// One line of traversal output.
#[derive(Clone, Copy, Debug)]
pub enum Finding<'m> {
    Function { name: &'m str },
    Block { name: &'m str },
    Alloca(InstRef<'m>),
    Store(InstRef<'m>),
    Load(InstRef<'m>),
    Compare(InstRef<'m>),
    Callee { name: &'m str },
    IndirectCall(InstRef<'m>),
}

impl Display for Finding<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Function { name } => write!(f, "found function {name}"),
            Self::Block { name } => write!(f, "BasicBlock: {name}"),
            Self::Alloca(inst) => write!(f, "found alloca inst: {inst}"),
            Self::Store(inst) => write!(f, "found store inst: {inst}"),
            Self::Load(inst) => write!(f, "found load inst: {inst}"),
            Self::Compare(inst) => write!(f, "found icmp inst: {inst}"),
            Self::Callee { name } => write!(f, "found callee: {name}"),
            Self::IndirectCall(inst) => write!(f, "found indirect callsite: {inst}"),
        }
    }
}

/// What the traversal reports.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReportOptions {
    /// Also report blocks, loads, stores and compares.
    pub detailed: bool,
}

impl ReportOptions {
    #[must_use]
    pub const fn detailed() -> Self {
        Self { detailed: true }
    }
}

/// Walk `module` in order and yield findings lazily.
///
/// Every function is reported, declarations included. Call the function
/// again to restart the walk.
pub fn report<'m>(module: &'m Module, options: ReportOptions) -> impl Iterator<Item = Finding<'m>> + 'm {
    module.functions().iter().flat_map(move |func| {
        let blocks = func.blocks().iter().flat_map(move |block| {
            let marker = options.detailed.then_some(Finding::Block { name: block.name() });
            marker.into_iter().chain(
                block
                    .iter()
                    .filter_map(move |inst| classify(module, func, inst, options.detailed)),
            )
        });
        std::iter::once(Finding::Function { name: func.name() }).chain(blocks)
    })
}

fn classify<'m>(
    module: &'m Module,
    func: &'m Function,
    inst: &'m Instruction,
    detailed: bool,
) -> Option<Finding<'m>> {
    let at = InstRef { module, func, inst };
    if inst.as_alloca().is_some() {
        return Some(Finding::Alloca(at));
    }
    if detailed {
        if inst.is_store() {
            return Some(Finding::Store(at));
        }
        if inst.is_load() {
            return Some(Finding::Load(at));
        }
        if inst.is_compare() {
            return Some(Finding::Compare(at));
        }
    }
    let call = inst.as_call()?;
    Some(match call.called_function() {
        Some(callee) if module.has_function(callee) => Finding::Callee {
            name: module.function(callee).name(),
        },
        _ => Finding::IndirectCall(at),
    })
}

/// Running tally of findings by kind.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReportStats {
    pub functions: usize,
    pub blocks: usize,
    pub allocas: usize,
    pub stores: usize,
    pub loads: usize,
    pub compares: usize,
    pub direct_calls: usize,
    pub indirect_calls: usize,
    callees: FxHashMap<String, usize>,
}

impl ReportStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one finding.
    pub fn record(&mut self, finding: &Finding<'_>) {
        match finding {
            Finding::Function { .. } => self.functions += 1,
            Finding::Block { .. } => self.blocks += 1,
            Finding::Alloca(_) => self.allocas += 1,
            Finding::Store(_) => self.stores += 1,
            Finding::Load(_) => self.loads += 1,
            Finding::Compare(_) => self.compares += 1,
            Finding::Callee { name } => {
                self.direct_calls += 1;
                *self.callees.entry((*name).to_string()).or_default() += 1;
            }
            Finding::IndirectCall(_) => self.indirect_calls += 1,
        }
    }

    /// Number of direct calls to `name`.
    #[must_use]
    pub fn calls_to(&self, name: &str) -> usize {
        self.callees.get(name).copied().unwrap_or(0)
    }

    /// Distinct direct callees seen so far.
    #[must_use]
    pub fn distinct_callees(&self) -> usize {
        self.callees.len()
    }
}

impl<'m> Extend<Finding<'m>> for ReportStats {
    fn extend<I: IntoIterator<Item = Finding<'m>>>(&mut self, iter: I) {
        for finding in iter {
            self.record(&finding);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bbcount_ir::parse_module;

    const SCENARIO: &str = "declare void @foo()

define void @main() {
entry:
  %x = alloca i64
  call void @foo()
  ret void
}
";

    const MIXED: &str = "declare i32 @puts(ptr)

define i32 @main(ptr %fp) {
entry:
  %slot = alloca i32, align 4
  store i32 7, ptr %slot, align 4
  %v = load i32, ptr %slot, align 4
  %c = icmp eq i32 %v, 7
  %r = call i32 @puts(ptr null)
  call void %fp()
  br i1 %c, label %done, label %done

done:
  ret i32 0
}
";

    fn lines(module: &Module, options: ReportOptions) -> Vec<String> {
        report(module, options).map(|f| f.to_string()).collect()
    }

    #[test]
    fn test_scenario_report() {
        let module = parse_module(SCENARIO, "test").unwrap();
        assert_eq!(
            lines(&module, ReportOptions::default()),
            [
                "found function foo",
                "found function main",
                "found alloca inst:   %x = alloca i64",
                "found callee: foo",
            ]
        );
    }

    #[test]
    fn test_alloca_direct_then_indirect_in_order() {
        let module = parse_module(MIXED, "test").unwrap();
        let found = lines(&module, ReportOptions::default());
        assert_eq!(found.len(), 5);
        assert_eq!(found[0], "found function puts");
        assert_eq!(found[1], "found function main");
        assert!(found[2].starts_with("found alloca inst:   %slot = alloca i32"));
        assert_eq!(found[3], "found callee: puts");
        assert_eq!(found[4], "found indirect callsite:   call void %fp()");
    }

    #[test]
    fn test_detailed_adds_blocks_and_memory_ops() {
        let module = parse_module(MIXED, "test").unwrap();
        let found = lines(&module, ReportOptions::detailed());
        let prefixes: Vec<_> = found
            .iter()
            .map(|l| l.split(':').next().unwrap_or_default().to_string())
            .collect();
        assert_eq!(
            prefixes,
            [
                "found function puts",
                "found function main",
                "BasicBlock",
                "found alloca inst",
                "found store inst",
                "found load inst",
                "found icmp inst",
                "found callee",
                "found indirect callsite",
                "BasicBlock",
            ]
        );
        assert_eq!(found[2], "BasicBlock: entry");
        assert_eq!(found[9], "BasicBlock: done");
    }

    #[test]
    fn test_report_without_main() {
        let module = parse_module("declare void @a()\ndeclare void @b()\n", "test").unwrap();
        assert_eq!(
            lines(&module, ReportOptions::default()),
            ["found function a", "found function b"]
        );
    }

    #[test]
    fn test_report_is_lazy_and_restartable() {
        let module = parse_module(SCENARIO, "test").unwrap();
        let mut walk = report(&module, ReportOptions::default());
        assert!(matches!(walk.next(), Some(Finding::Function { name: "foo" })));
        drop(walk);
        assert_eq!(report(&module, ReportOptions::default()).count(), 4);
    }

    #[test]
    fn test_stats_tally() {
        let module = parse_module(MIXED, "test").unwrap();
        let mut stats = ReportStats::new();
        stats.extend(report(&module, ReportOptions::detailed()));
        assert_eq!(stats.functions, 2);
        assert_eq!(stats.blocks, 2);
        assert_eq!(stats.allocas, 1);
        assert_eq!(stats.stores, 1);
        assert_eq!(stats.loads, 1);
        assert_eq!(stats.compares, 1);
        assert_eq!(stats.direct_calls, 1);
        assert_eq!(stats.indirect_calls, 1);
        assert_eq!(stats.calls_to("puts"), 1);
        assert_eq!(stats.calls_to("main"), 0);
        assert_eq!(stats.distinct_callees(), 1);
    }
}
