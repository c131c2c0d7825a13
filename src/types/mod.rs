//! Element types: tags, descriptors, field tables and boxed values

mod descr;
mod dtype;
pub(crate) mod element;
mod fields;
mod header;
mod native;
mod registry;
mod value;

pub use descr::{ByteOrder, Descr, DescrFlags, Endian};
pub use dtype::{OBJECT_ITEMSIZE, TypeKind, TypeTag};
pub use fields::{Field, Fields, RecordBuilder};
pub use header::{HEADER_SIZE, MAGIC, STATE_VERSION, SUPPORTED_VERSIONS};
pub use native::NativeType;
pub use registry::is_canonical;
pub use value::{CloneDeep, DeepCopy, Item, ItemTag, ObjectRef};
