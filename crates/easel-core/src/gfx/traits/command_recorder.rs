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

//! Command recording traits and the encoder state machine shared by backends.

use crate::gfx::api::{Color, CommandEncoderDescriptor, ComputePassDescriptor, IndexFormat, RenderPassDescriptor};
use crate::gfx::error::{GfxError, GfxResult};
use crate::gfx::handle::{BindGroupId, BufferId, CommandBufferId, ComputePipelineId, RenderPipelineId};
use std::ops::Range;

/// An open render pass.
///
/// Recording methods never fail directly: the first error is stored in the
/// owning encoder, returned by [`end`](Self::end), and makes `finish()` fail.
pub trait GfxRenderPass {
    /// Selects the pipeline for subsequent draws.
    fn set_pipeline(&mut self, pipeline: RenderPipelineId);

    /// Sets (or clears) bind group `index`, with one dynamic offset per
    /// dynamic binding in binding order.
    fn set_bind_group(&mut self, index: u32, group: Option<BindGroupId>, dynamic_offsets: &[u32]);

    /// Binds a vertex buffer range to `slot`.
    fn set_vertex_buffer(&mut self, slot: u32, buffer: BufferId, offset: u64, size: Option<u64>);

    /// Binds the index buffer.
    fn set_index_buffer(&mut self, buffer: BufferId, format: IndexFormat, offset: u64, size: Option<u64>);

    /// Non-indexed draw.
    fn draw(&mut self, vertices: Range<u32>, instances: Range<u32>);

    /// Indexed draw.
    fn draw_indexed(&mut self, indices: Range<u32>, base_vertex: i32, instances: Range<u32>);

    /// Non-indexed draw reading a `DrawIndirectArgs` block from `buffer`.
    fn draw_indirect(&mut self, buffer: BufferId, offset: u64);

    /// Indexed draw reading a `DrawIndexedIndirectArgs` block from `buffer`.
    fn draw_indexed_indirect(&mut self, buffer: BufferId, offset: u64);

    /// Sets the viewport transform.
    fn set_viewport(&mut self, x: f32, y: f32, width: f32, height: f32, min_depth: f32, max_depth: f32);

    /// Sets the scissor rectangle.
    fn set_scissor_rect(&mut self, x: u32, y: u32, width: u32, height: u32);

    /// Sets the blend constant.
    fn set_blend_constant(&mut self, color: Color);

    /// Sets the stencil reference value.
    fn set_stencil_reference(&mut self, reference: u32);

    /// Opens a debug group.
    fn push_debug_group(&mut self, label: &str);

    /// Closes the innermost debug group.
    fn pop_debug_group(&mut self);

    /// Inserts a debug marker.
    fn insert_debug_marker(&mut self, label: &str);

    /// Ends the pass, returning the first error recorded on the encoder.
    fn end(self: Box<Self>) -> GfxResult<()>;
}

/// An open compute pass.
pub trait GfxComputePass {
    /// Selects the pipeline for subsequent dispatches.
    fn set_pipeline(&mut self, pipeline: ComputePipelineId);

    /// Sets (or clears) bind group `index`.
    fn set_bind_group(&mut self, index: u32, group: Option<BindGroupId>, dynamic_offsets: &[u32]);

    /// Dispatches a grid of workgroups.
    fn dispatch_workgroups(&mut self, x: u32, y: u32, z: u32);

    /// Dispatches with a `DispatchIndirectArgs` block read from `buffer`.
    fn dispatch_workgroups_indirect(&mut self, buffer: BufferId, offset: u64);

    /// Opens a debug group.
    fn push_debug_group(&mut self, label: &str);

    /// Closes the innermost debug group.
    fn pop_debug_group(&mut self);

    /// Ends the pass, returning the first error recorded on the encoder.
    fn end(self: Box<Self>) -> GfxResult<()>;
}

/// Records commands into a single-use command buffer.
///
/// Passes borrow the encoder mutably, so at most one pass per encoder is
/// open at a time.
pub trait GfxCommandEncoder {
    /// Opens a render pass.
    fn begin_render_pass<'encoder>(
        &'encoder mut self,
        desc: &RenderPassDescriptor,
    ) -> Box<dyn GfxRenderPass + 'encoder>;

    /// Opens a compute pass.
    fn begin_compute_pass<'encoder>(
        &'encoder mut self,
        desc: &ComputePassDescriptor,
    ) -> Box<dyn GfxComputePass + 'encoder>;

    /// Copies `size` bytes between buffers.
    fn copy_buffer_to_buffer(
        &mut self,
        source: BufferId,
        source_offset: u64,
        destination: BufferId,
        destination_offset: u64,
        size: u64,
    );

    /// Zeroes a buffer range (to the end when `size` is `None`).
    fn clear_buffer(&mut self, buffer: BufferId, offset: u64, size: Option<u64>);

    /// Opens a debug group.
    fn push_debug_group(&mut self, label: &str);

    /// Closes the innermost debug group.
    fn pop_debug_group(&mut self);

    /// Inserts a debug marker.
    fn insert_debug_marker(&mut self, label: &str);

    /// Seals the encoder into a command buffer. The encoder cannot be used
    /// afterwards; a second call is a `validation` error.
    fn finish(&mut self) -> GfxResult<CommandBufferId>;
}

/// Life-cycle position of an encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderStatus {
    /// Accepting commands.
    Open,
    /// A pass is open; encoder-level commands are invalid.
    InPass,
    /// `finish()` was called.
    Finished,
}

/// First-error bookkeeping and status tracking for an encoder.
#[derive(Debug)]
pub struct EncoderState {
    label: Option<String>,
    status: EncoderStatus,
    error: Option<GfxError>,
    debug_depth: u32,
}

impl EncoderState {
    /// Fresh state for an encoder.
    pub fn new(desc: &CommandEncoderDescriptor) -> Self {
        Self {
            label: desc.label.clone(),
            status: EncoderStatus::Open,
            error: None,
            debug_depth: 0,
        }
    }

    /// Encoder label.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Current status.
    pub fn status(&self) -> EncoderStatus {
        self.status
    }

    /// First recorded error.
    pub fn error(&self) -> Option<&GfxError> {
        self.error.as_ref()
    }

    /// Records `error` unless an earlier one is already held.
    pub fn record(&mut self, error: GfxError) {
        if self.error.is_none() {
            log::debug!(
                "Command encoder '{}' invalidated: {error}",
                self.label().unwrap_or("<unlabeled>")
            );
            self.error = Some(error);
        }
    }

    /// Records the error of `result`, if any.
    pub fn record_result(&mut self, result: GfxResult<()>) {
        if let Err(e) = result {
            self.record(e);
        }
    }

    /// `true` when encoder-level commands may be recorded; otherwise records why not.
    pub fn check_open(&mut self, what: &str) -> bool {
        match self.status {
            EncoderStatus::Open => true,
            EncoderStatus::InPass => {
                self.record(GfxError::validation(format!("{what} while a pass is open")));
                false
            }
            EncoderStatus::Finished => {
                self.record(GfxError::validation(format!("{what} on a finished encoder")));
                false
            }
        }
    }

    /// Transitions into a pass; `false` (with an error recorded) when not open.
    pub fn begin_pass(&mut self, what: &str) -> bool {
        if self.check_open(what) {
            self.status = EncoderStatus::InPass;
            true
        } else {
            false
        }
    }

    /// Leaves a pass and returns the encoder's first error, if any.
    pub fn end_pass(&mut self) -> GfxResult<()> {
        if self.status == EncoderStatus::InPass {
            self.status = EncoderStatus::Open;
        }
        match &self.error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    /// Opens a debug group.
    pub fn push_debug_group(&mut self) {
        self.debug_depth += 1;
    }

    /// Closes a debug group, recording an error on underflow.
    pub fn pop_debug_group(&mut self) -> bool {
        if self.debug_depth == 0 {
            self.record(GfxError::validation("pop_debug_group without a matching push"));
            false
        } else {
            self.debug_depth -= 1;
            true
        }
    }

    /// Seals the encoder. Fails on reuse, on an open pass or debug group,
    /// or with the first recorded error.
    pub fn finish(&mut self) -> GfxResult<()> {
        match self.status {
            EncoderStatus::Finished => {
                return Err(GfxError::validation(format!(
                    "command encoder '{}' is already finished",
                    self.label().unwrap_or("<unlabeled>")
                )));
            }
            EncoderStatus::InPass => {
                self.record(GfxError::validation("finish() called while a pass is open"));
            }
            EncoderStatus::Open => {}
        }
        if self.debug_depth != 0 {
            self.record(GfxError::validation(format!(
                "finish() with {} unclosed debug group(s)",
                self.debug_depth
            )));
        }
        self.status = EncoderStatus::Finished;
        match &self.error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::error::ErrorKind;

    #[test]
    fn first_error_wins_and_finish_surfaces_it() {
        let mut state = EncoderState::new(&CommandEncoderDescriptor::default());
        assert!(state.begin_pass("begin_render_pass"));
        state.record(GfxError::unsupported("base_vertex"));
        state.record(GfxError::validation("later"));
        assert_eq!(state.end_pass().unwrap_err().kind(), ErrorKind::Unsupported);
        assert_eq!(state.finish().unwrap_err().kind(), ErrorKind::Unsupported);
    }

    #[test]
    fn finishing_twice_is_rejected() {
        let mut state = EncoderState::new(&CommandEncoderDescriptor {
            label: Some("frame".into()),
        });
        state.finish().unwrap();
        let err = state.finish().unwrap_err();
        assert!(err.message().contains("already finished"));
        assert!(!state.check_open("copy_buffer_to_buffer"));
    }

    #[test]
    fn commands_inside_a_pass_invalidate_the_encoder() {
        let mut state = EncoderState::new(&CommandEncoderDescriptor::default());
        assert!(state.begin_pass("begin_render_pass"));
        assert!(!state.check_open("clear_buffer"));
        assert!(state.end_pass().is_err());
    }

    #[test]
    fn unbalanced_debug_groups_fail_finish() {
        let mut state = EncoderState::new(&CommandEncoderDescriptor::default());
        state.push_debug_group();
        assert!(state.finish().is_err());

        let mut state = EncoderState::new(&CommandEncoderDescriptor::default());
        assert!(!state.pop_debug_group());
        assert!(state.finish().is_err());
    }
}
