mod build;
mod midl;
mod toolchain;
mod vb6;

pub(crate) use build::*;
pub(crate) use midl::*;
pub(crate) use toolchain::*;
pub(crate) use vb6::*;
