#![allow(clippy::too_many_arguments)]
#![allow(clippy::needless_range_loop)]

pub use zkstark_field as field;

pub mod fri;
pub mod hash;
pub mod iop;
pub mod util;
