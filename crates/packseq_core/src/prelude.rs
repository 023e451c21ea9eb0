//! Prelude module for convenient imports
//!
//! Usage: `use packseq_core::prelude::*;`

// Re-export core library types and functions
pub use crate::batch::Batch;
pub use crate::be_cpu::{CpuCreator, CpuVector};
pub use crate::error::{PackSeqError, PackSeqResult};
pub use crate::grad::{Grad, Var, VarId, VarSet};
pub use crate::present::Present;
pub use crate::reduce::{prune, reduce};
pub use crate::seq::{ConstSeq, Seq, VarSeq};
pub use crate::vector::{Vector, VectorCreator};
