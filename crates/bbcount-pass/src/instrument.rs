//! Per-block counter updates.

use bbcount_ir::{BlockId, Function, InstBuilder, Operand};
use tracing::trace;

use crate::Result;
use crate::inject::CounterHandle;

/// Name hint for the loaded counter value.
pub const OLD_COUNT_NAME: &str = "old.bb.count";
/// Name hint for the incremented counter value.
pub const NEW_COUNT_NAME: &str = "new.bb.count";

/// Insert `load`, `add 1`, `store` on the counter right before the
/// terminator of `block`.
///
/// Fails if the block has no terminator. Always reports a modification.
pub fn instrument_block(func: &mut Function, block: BlockId, counter: CounterHandle) -> Result<bool> {
    let slot = Operand::Global(counter.global);
    let width = counter.ty.int_width().unwrap_or(64);

    let mut builder = InstBuilder::before_terminator(func, block)?;
    let old = builder.load(counter.ty, slot, OLD_COUNT_NAME)?;
    let new = builder.add(counter.ty, old.into(), Operand::int(width, 1), NEW_COUNT_NAME)?;
    builder.store(counter.ty, new.into(), slot)?;

    trace!(
        function = func.name(),
        block = func.block(block).name(),
        "instrumented block"
    );
    Ok(true)
}

/// Instrument every block of `func`. Declarations are left alone.
pub fn instrument_function(func: &mut Function, counter: CounterHandle) -> Result<bool> {
    let mut modified = false;
    for index in 0..func.block_count() {
        modified |= instrument_block(func, BlockId::new(index), counter)?;
    }
    Ok(modified)
}
