//! Zero-operand control instructions: `NOP`, `STOP`, `TRAP`, `SWM`.

use luinux_asm::Flags;

use super::Processor;
use crate::error::RuntimeError;

pub(super) fn nop(_proc: &mut Processor) -> Result<(), RuntimeError> {
    Ok(())
}

pub(super) fn stop(proc: &mut Processor) -> Result<(), RuntimeError> {
    tracing::debug!("STOP");
    proc.set_halted();
    Ok(())
}

pub(super) fn trap(proc: &mut Processor) -> Result<(), RuntimeError> {
    tracing::warn!("TRAP");
    let mut flags = proc.flags();
    flags.insert(Flags::TRAP);
    proc.set_flags(flags);
    Ok(())
}

/// Toggle which bank (`SRAM`/`NVRAM`) backs data-memory accesses. The
/// bank being swapped in is flushed to and reloaded from disk first, so it
/// reflects the file's current contents.
pub(super) fn swm(proc: &mut Processor) -> Result<(), RuntimeError> {
    let nvram = proc.nvram_mut().ok_or(RuntimeError::NoNVRam)?;
    nvram.flush()?;

    let mut flags = proc.flags();
    flags.toggle(Flags::MEMORY);
    proc.set_flags(flags);
    Ok(())
}
