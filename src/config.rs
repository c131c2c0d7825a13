//! Run-time limits shared by array construction and the cast engine

/// Hard ceiling on the number of dimensions of an array
pub const MAX_DIMS: usize = 32;

/// Default number of elements converted per scratch chunk
pub const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Tunables for operations that allocate scratch space or validate shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Elements per chunk in buffered casts
    pub buffer_size: usize,
    /// Maximum accepted number of dimensions (never above [`MAX_DIMS`])
    pub max_dims: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            max_dims: MAX_DIMS,
        }
    }
}

impl Config {
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(1);
        self
    }

    pub fn with_max_dims(mut self, max_dims: usize) -> Self {
        self.max_dims = max_dims.min(MAX_DIMS);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_are_clamped() {
        let config = Config::default().with_buffer_size(0).with_max_dims(100);
        assert_eq!(config.buffer_size, 1);
        assert_eq!(config.max_dims, MAX_DIMS);
    }
}
