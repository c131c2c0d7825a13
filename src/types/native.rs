//! Rust element types with a matching builtin tag

use super::dtype::TypeTag;
use half::f16;

/// Plain-old-data Rust type that maps onto one builtin tag in native byte order
pub trait NativeType: bytemuck::Pod + Send + Sync + 'static {
    const TAG: TypeTag;
}

macro_rules! native {
    ($($ty:ty => $tag:ident),* $(,)?) => {
        $(
            impl NativeType for $ty {
                const TAG: TypeTag = TypeTag::$tag;
            }
        )*
    };
}

native! {
    i8 => Int8,
    u8 => UInt8,
    i16 => Int16,
    u16 => UInt16,
    i32 => Int32,
    u32 => UInt32,
    i64 => Int64,
    u64 => UInt64,
    f16 => Float16,
    f32 => Float32,
    f64 => Float64,
}
