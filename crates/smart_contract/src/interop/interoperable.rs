use crate::error::{Error, Result};
use crate::interop::stack_item::StackItem;

/// A domain object with a canonical mapping to the VM value model.
///
/// The mapping is structural and order-significant: decoding a value of
/// the wrong shape faults instead of filling in defaults.
pub trait Interoperable: Sized {
    fn from_stack_item(item: &StackItem) -> Result<Self>;
    fn to_stack_item(&self) -> StackItem;
}

/// Extracts the fields of a struct-shaped item, checking the arity.
pub fn struct_fields(item: &StackItem, expected: usize) -> Result<&[StackItem]> {
    match item {
        StackItem::Struct(fields) if fields.len() == expected => Ok(fields),
        StackItem::Struct(fields) => Err(Error::Encoding(format!(
            "struct has {} fields, expected {expected}",
            fields.len()
        ))),
        other => Err(Error::Encoding(format!(
            "expected a struct, got {}",
            other.type_name()
        ))),
    }
}

/// A list persisted as an array of interoperable elements.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InteroperableList<T>(pub Vec<T>);

impl<T: Interoperable> Interoperable for InteroperableList<T> {
    fn from_stack_item(item: &StackItem) -> Result<Self> {
        let items = match item {
            StackItem::Array(items) | StackItem::Struct(items) => items,
            other => {
                return Err(Error::Encoding(format!(
                    "expected an array, got {}",
                    other.type_name()
                )))
            }
        };
        let mut out = Vec::with_capacity(items.len());
        for element in items {
            out.push(T::from_stack_item(element)?);
        }
        Ok(Self(out))
    }

    fn to_stack_item(&self) -> StackItem {
        StackItem::Array(self.0.iter().map(T::to_stack_item).collect())
    }
}

impl<T> std::ops::Deref for InteroperableList<T> {
    type Target = Vec<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> std::ops::DerefMut for InteroperableList<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}
