//! Output channel compositor: transition role bookkeeping and the cut/animate decision.

pub(crate) mod output;
pub(crate) mod role;
