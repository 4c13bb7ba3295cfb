#![forbid(unsafe_code)]

pub mod ir;

pub mod debug;
pub mod error;
pub mod intrinsics;
pub mod serialize;
pub mod validate;

pub use debug::*;
pub use error::*;
pub use intrinsics::*;
pub use ir::*;
pub use serialize::*;
pub use validate::*;
