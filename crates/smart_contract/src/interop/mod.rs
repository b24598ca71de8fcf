//! The VM value model seen by native contracts: tagged stack items, the
//! storage codec for them, and the domain-object mapping.

pub mod interoperable;
pub mod stack_item;

pub use interoperable::{Interoperable, InteroperableList};
pub use stack_item::StackItem;
