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

//! Sequential vertex layout construction.

use super::enums::VertexStepMode;
use super::state::{VertexAttribute, VertexBufferLayout};
use crate::gfx::api::util::VertexFormat;

/// Builds a [`VertexBufferLayout`] by appending attributes in order.
///
/// Offsets come from the vertex format table; the resulting stride is the
/// sum of all attribute sizes plus any explicit padding.
///
/// ```
/// use easel_core::gfx::{VertexBufferLayoutBuilder, VertexFormat};
///
/// let layout = VertexBufferLayoutBuilder::per_vertex()
///     .attribute(0, VertexFormat::Float32x3)
///     .padding(4)
///     .attribute(3, VertexFormat::Float32x2)
///     .build();
/// assert_eq!(layout.array_stride, 24);
/// assert_eq!(layout.attributes[1].offset, 16);
/// ```
#[derive(Debug, Clone, Default)]
pub struct VertexBufferLayoutBuilder {
    step_mode: VertexStepMode,
    attributes: Vec<VertexAttribute>,
    cursor: u64,
}

impl VertexBufferLayoutBuilder {
    /// Starts a layout with the given step mode.
    pub fn new(step_mode: VertexStepMode) -> Self {
        Self {
            step_mode,
            ..Default::default()
        }
    }

    /// Starts a per-vertex layout.
    pub fn per_vertex() -> Self {
        Self::new(VertexStepMode::Vertex)
    }

    /// Starts a per-instance layout.
    pub fn per_instance() -> Self {
        Self::new(VertexStepMode::Instance)
    }

    /// Appends an attribute at the current offset.
    pub fn attribute(mut self, shader_location: u32, format: VertexFormat) -> Self {
        self.attributes.push(VertexAttribute {
            format,
            offset: self.cursor,
            shader_location,
        });
        self.cursor += u64::from(format.byte_size());
        self
    }

    /// Skips `bytes` bytes.
    pub fn padding(mut self, bytes: u64) -> Self {
        self.cursor += bytes;
        self
    }

    /// Current offset, which becomes the stride.
    pub fn offset(&self) -> u64 {
        self.cursor
    }

    /// Finishes the layout.
    pub fn build(self) -> VertexBufferLayout {
        VertexBufferLayout {
            array_stride: self.cursor,
            step_mode: self.step_mode,
            attributes: self.attributes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stride_is_sum_of_sizes_plus_padding() {
        let formats = [
            VertexFormat::Float32x3,
            VertexFormat::Unorm8x4,
            VertexFormat::Float16x2,
            VertexFormat::Uint32,
        ];
        let mut builder = VertexBufferLayoutBuilder::per_vertex();
        let mut expected = 0;
        for (i, f) in formats.iter().enumerate() {
            builder = builder.attribute(i as u32, *f).padding(i as u64);
            expected += u64::from(f.byte_size()) + i as u64;
        }
        let layout = builder.build();
        assert_eq!(layout.array_stride, expected);
        assert_eq!(layout.attributes_end(), expected - 3);
    }

    #[test]
    fn single_position_attribute() {
        let layout = VertexBufferLayoutBuilder::per_vertex()
            .attribute(0, VertexFormat::Float32x3)
            .build();
        assert_eq!(layout.array_stride, 12);
        assert_eq!(layout.attributes[0].offset, 0);
    }
}
