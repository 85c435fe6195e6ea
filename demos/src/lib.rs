pub mod stack;

pub use stack::{StackFile, load_stack_file};
