use std::sync::Arc;

use tracing::trace;

use crate::datatype::DataItem;
use crate::property::TypeDescriptor;

/// A record data item read through the type of the property declaring it.
///
/// Positions are 1-based. A component is absent when the position is
/// outside the declared fields, when the record leaves it empty, or when its
/// kind disagrees with the declared field. A raw item that is not a record,
/// or a type that has no fields, makes every component absent.
#[derive(Clone, Debug)]
pub struct RecordValue {
    descriptor: Arc<TypeDescriptor>,
    components: Option<Vec<Option<DataItem>>>,
}

impl RecordValue {
    pub fn new(item: &DataItem, descriptor: Arc<TypeDescriptor>) -> Self {
        let components = match item.as_record() {
            Some(record) if descriptor.is_multi_component() => Some(
                descriptor
                    .fields()
                    .iter()
                    .enumerate()
                    .map(|(position, field)| {
                        record
                            .component(position)
                            .filter(|component| component.kind() == *field)
                            .cloned()
                    })
                    .collect(),
            ),
            _ => {
                trace!(kind = %item.kind(), type_id = descriptor.id(), "not a well formed record");
                None
            }
        };
        Self {
            descriptor,
            components,
        }
    }
    pub fn type_descriptor(&self) -> &Arc<TypeDescriptor> {
        &self.descriptor
    }
    pub fn is_valid(&self) -> bool {
        self.components.is_some()
    }
    /// One entry per declared field.
    pub fn data_items(&self) -> &[Option<DataItem>] {
        self.components.as_deref().unwrap_or(&[])
    }
    pub fn data_item_by_index(&self, index: usize) -> Option<DataItem> {
        let position = index.checked_sub(1)?;
        self.data_items().get(position).cloned().flatten()
    }
}

/// The component at `index` of a record value, or `None` when there is no
/// such component.
pub fn extract_component(item: &DataItem, descriptor: &Arc<TypeDescriptor>, index: usize) -> Option<DataItem> {
    RecordValue::new(item, Arc::clone(descriptor)).data_item_by_index(index)
}
