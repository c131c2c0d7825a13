//! Header constants of the serialized state format

/// Magic bytes identifying a serialized array state
pub const MAGIC: &[u8; 8] = b"NDSTATE\0";

/// Version written by this crate
pub const STATE_VERSION: u32 = 1;

/// Versions accepted when reading
pub const SUPPORTED_VERSIONS: [u32; 2] = [0, 1];

/// Header size in bytes (magic + version + flags)
pub const HEADER_SIZE: usize = 16;
