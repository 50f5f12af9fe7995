//! No-op discipline for runtimes that are not threaded.

use crate::cs::{CriticalSection, CsRequest};
use crate::runtime::ExecContext;
use crate::sync::VciMutex;

/// Every operation is a no-op; enter-or-skip never skips.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SerialCs;

impl CriticalSection for SerialCs {
    #[inline]
    fn enter(&self, _ctx: &mut ExecContext, _req: &CsRequest<'_>, _recursive: bool) {}

    #[inline]
    fn enter_or_skip(&self, _ctx: &mut ExecContext, _req: &CsRequest<'_>) -> bool {
        false
    }

    #[inline]
    fn exit(&self, _ctx: &mut ExecContext, _req: &CsRequest<'_>) {}

    #[inline]
    fn yield_section(&self, _ctx: &mut ExecContext, _req: &CsRequest<'_>) {}

    #[inline]
    fn assert_in_cs(&self, _ctx: &ExecContext, _mutex: &VciMutex) {}
}
