#![no_std]
#[cfg(feature = "std")]
extern crate std;

extern crate alloc;

pub mod batch;
pub mod be_cpu;
pub(crate) mod compat;
pub mod error;
pub mod grad;
pub mod prelude;
pub mod present;
pub mod reduce;
pub mod seq;
pub mod vector;
