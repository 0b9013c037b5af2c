// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Buffer descriptors and the mapping state machine.

use crate::easel_bitflags;

easel_bitflags! {
    /// Allowed usages of a buffer.
    ///
    /// The bit values match the WebGPU `GPUBufferUsage` constants.
    pub struct BufferUsages: u32 {
        /// Mappable for reading.
        const MAP_READ = 0x0001;
        /// Mappable for writing.
        const MAP_WRITE = 0x0002;
        /// Source of copies.
        const COPY_SRC = 0x0004;
        /// Destination of copies and queue writes.
        const COPY_DST = 0x0008;
        /// Index buffer.
        const INDEX = 0x0010;
        /// Vertex buffer.
        const VERTEX = 0x0020;
        /// Uniform buffer.
        const UNIFORM = 0x0040;
        /// Storage buffer.
        const STORAGE = 0x0080;
        /// Indirect draw/dispatch arguments.
        const INDIRECT = 0x0100;
        /// Query resolve destination.
        const QUERY_RESOLVE = 0x0200;
    }
}

/// Describes a buffer to create.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BufferDescriptor {
    /// Debug label.
    pub label: Option<String>,
    /// Size in bytes.
    pub size: u64,
    /// Allowed usages; must not be empty.
    pub usage: BufferUsages,
    /// Start in [`MapState::MappedForWrite`] over the whole buffer.
    pub mapped_at_creation: bool,
}

/// Access requested by `map_buffer_async`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapMode {
    /// CPU reads; needs [`BufferUsages::MAP_READ`].
    Read,
    /// CPU writes; needs [`BufferUsages::MAP_WRITE`].
    Write,
}

impl MapMode {
    /// Usage a buffer needs for this mode.
    pub fn required_usage(self) -> BufferUsages {
        match self {
            MapMode::Read => BufferUsages::MAP_READ,
            MapMode::Write => BufferUsages::MAP_WRITE,
        }
    }
}

/// Where a buffer is in its mapping life cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MapState {
    /// Usable by the GPU.
    #[default]
    Unmapped,
    /// `map_buffer_async` issued, not yet resolved.
    Pending,
    /// CPU-readable.
    MappedForRead,
    /// CPU-writable.
    MappedForWrite,
}

impl MapState {
    /// `true` for either mapped state.
    pub fn is_mapped(self) -> bool {
        matches!(self, MapState::MappedForRead | MapState::MappedForWrite)
    }
}

/// Byte range of a live mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappedRange {
    /// Offset of the mapping in the buffer.
    pub offset: u64,
    /// Length of the mapping.
    pub size: u64,
}

impl MappedRange {
    /// `true` when `[offset, offset + size)` lies within the mapping.
    pub fn covers(&self, offset: u64, size: u64) -> bool {
        offset >= self.offset
            && offset
                .checked_add(size)
                .is_some_and(|end| end <= self.offset + self.size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_bits_match_webgpu() {
        assert_eq!(BufferUsages::INDEX.bits(), 0x10);
        assert_eq!(BufferUsages::VERTEX.bits(), 0x20);
        assert_eq!(BufferUsages::QUERY_RESOLVE.bits(), 0x200);
        assert_eq!(BufferUsages::ALL.bits(), 0x3FF);
    }

    #[test]
    fn mapped_range_bounds() {
        let r = MappedRange { offset: 16, size: 32 };
        assert!(r.covers(16, 32));
        assert!(r.covers(20, 4));
        assert!(!r.covers(8, 4));
        assert!(!r.covers(40, 16));
        assert!(!r.covers(16, u64::MAX));
    }
}
