//! Document stream writing - cells, records, the frame stack.

pub mod cell;
pub mod image;
pub mod writer;

mod frame_stack;

pub use cell::{Cell, Record};
pub use frame_stack::FrameStack;
pub use writer::{read_records, DsdxWriter};
