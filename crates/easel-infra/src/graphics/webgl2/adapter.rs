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

//! The WebGL2 adapter: capability discovery from GL parameters.

use super::device::WebGl2Device;
use super::gl::consts::*;
use super::gl::GlContext;
use super::MAX_BINDINGS_PER_GROUP;
use async_trait::async_trait;
use easel_core::gfx::api::{
    features, AdapterInfo, BackendKind, Capabilities, DeviceDescriptor, DeviceType, GfxSettings, Limits,
};
use easel_core::gfx::error::{GfxError, GfxResult};
use easel_core::gfx::traits::{GfxAdapter, GfxDevice};
use std::rc::Rc;

/// Largest vertex stride WebGL2 accepts in `vertexAttribPointer`.
const MAX_VERTEX_STRIDE: u32 = 255;

/// An adapter over a WebGL2 (or GLES 3.0) context.
///
/// The context is shared with every device the adapter creates; WebGL2 has a
/// single implicit device per context, so requesting several devices is
/// allowed but they all draw into the same GL state.
#[derive(Debug)]
pub struct WebGl2Adapter {
    gl: Rc<dyn GlContext>,
    info: AdapterInfo,
    capabilities: Capabilities,
    settings: GfxSettings,
}

impl WebGl2Adapter {
    /// Wraps `gl` with default settings.
    pub fn new(gl: Rc<dyn GlContext>) -> GfxResult<Self> {
        Self::with_settings(gl, GfxSettings::default())
    }

    /// Wraps `gl`, querying its limits and extensions once.
    pub fn with_settings(gl: Rc<dyn GlContext>, settings: GfxSettings) -> GfxResult<Self> {
        if gl.is_context_lost() {
            return Err(GfxError::DeviceLost("WebGL2 context is lost".to_owned()));
        }
        let info = AdapterInfo {
            name: gl.get_parameter_string(RENDERER),
            vendor: 0,
            device: 0,
            device_type: DeviceType::Other,
            driver: gl.get_parameter_string(VERSION),
            backend: BackendKind::WebGl2,
        };
        let limits = query_limits(gl.as_ref());
        let features = query_features(gl.as_ref());
        log::info!(
            "WebGL2 adapter '{}' ({}): {} bind groups, {} texture units, features [{}]",
            info.name,
            info.driver,
            limits.max_bind_groups,
            limits.max_sampled_textures_per_shader_stage,
            features.join(", ")
        );
        let capabilities = Capabilities::new(&info, features, limits);
        Ok(Self {
            gl,
            info,
            capabilities,
            settings,
        })
    }

    /// Creates the concrete device, which also exposes the canvas texture.
    pub fn request_webgl2_device(&self, desc: &DeviceDescriptor) -> GfxResult<WebGl2Device> {
        self.capabilities.check_request(desc)?;
        let capabilities = self.capabilities.for_request(desc);
        let device = WebGl2Device::new(self.gl.clone(), self.info.clone(), capabilities, self.settings.clone())?;
        log::info!(
            "Created WebGL2 device '{}' on '{}'",
            desc.label.as_deref().unwrap_or("<unlabeled>"),
            self.info.name
        );
        Ok(device)
    }

    /// Settings handed to created devices.
    pub fn settings(&self) -> &GfxSettings {
        &self.settings
    }
}

fn param(gl: &dyn GlContext, pname: u32) -> u32 {
    gl.get_parameter_i32(pname).max(0) as u32
}

/// Maps GL implementation limits onto the capability model.
///
/// Bind groups are flattened into `MAX_BINDINGS_PER_GROUP` global slots
/// each, so the group count is bounded by both uniform-buffer bindings and
/// combined texture units.
fn query_limits(gl: &dyn GlContext) -> Limits {
    let ubo_bindings = param(gl, MAX_UNIFORM_BUFFER_BINDINGS);
    let combined_units = param(gl, MAX_COMBINED_TEXTURE_IMAGE_UNITS);
    let max_bind_groups = (ubo_bindings / MAX_BINDINGS_PER_GROUP)
        .min(combined_units / MAX_BINDINGS_PER_GROUP)
        .min(4);
    if max_bind_groups < 4 {
        log::warn!(
            "WebGL2 context exposes {ubo_bindings} uniform bindings and {combined_units} texture units; \
             only {max_bind_groups} bind group(s) available"
        );
    }
    let texture_units = param(gl, MAX_TEXTURE_IMAGE_UNITS);
    let attributes = param(gl, MAX_VERTEX_ATTRIBS);
    let block_size = param(gl, MAX_UNIFORM_BLOCK_SIZE);

    Limits {
        max_texture_dimension_1d: param(gl, MAX_TEXTURE_SIZE),
        max_texture_dimension_2d: param(gl, MAX_TEXTURE_SIZE),
        max_texture_dimension_3d: param(gl, MAX_3D_TEXTURE_SIZE),
        max_texture_array_layers: param(gl, MAX_ARRAY_TEXTURE_LAYERS),
        max_bind_groups,
        max_bindings_per_bind_group: MAX_BINDINGS_PER_GROUP,
        max_sampled_textures_per_shader_stage: texture_units,
        max_samplers_per_shader_stage: texture_units,
        max_uniform_buffers_per_shader_stage: param(gl, MAX_VERTEX_UNIFORM_BLOCKS)
            .min(param(gl, MAX_FRAGMENT_UNIFORM_BLOCKS)),
        max_uniform_buffer_binding_size: u64::from(block_size),
        max_vertex_buffers: attributes.min(8),
        max_vertex_attributes: attributes,
        max_vertex_buffer_array_stride: MAX_VERTEX_STRIDE,
        max_color_attachments: param(gl, MAX_COLOR_ATTACHMENTS)
            .min(param(gl, MAX_DRAW_BUFFERS))
            .min(8),
        min_uniform_buffer_offset_alignment: param(gl, UNIFORM_BUFFER_OFFSET_ALIGNMENT).max(1),
        ..Limits::default()
    }
    .without_compute()
}

fn query_features(gl: &dyn GlContext) -> Vec<String> {
    let mut features = vec![features::DEPTH32FLOAT_STENCIL8.to_owned()];
    if gl.supports_extension("OES_texture_float_linear") {
        features.push(features::FLOAT32_FILTERABLE.to_owned());
    }
    if gl.supports_extension("EXT_color_buffer_float") {
        features.push(features::RG11B10UFLOAT_RENDERABLE.to_owned());
    }
    features
}

#[async_trait(?Send)]
impl GfxAdapter for WebGl2Adapter {
    fn info(&self) -> &AdapterInfo {
        &self.info
    }

    fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    async fn request_device(&self, desc: &DeviceDescriptor) -> GfxResult<Box<dyn GfxDevice>> {
        Ok(Box::new(self.request_webgl2_device(desc)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::webgl2::headless::HeadlessGl;
    use easel_core::gfx::error::ErrorKind;

    #[test]
    fn limits_follow_gl_parameters() {
        let gl = Rc::new(HeadlessGl::new().with_parameter(MAX_UNIFORM_BUFFER_BINDINGS, 24));
        let adapter = WebGl2Adapter::new(gl).unwrap();
        let limits = adapter.capabilities().limits;
        assert_eq!(limits.max_bind_groups, 1);
        assert_eq!(limits.max_bindings_per_bind_group, MAX_BINDINGS_PER_GROUP);
        assert_eq!(limits.max_vertex_buffer_array_stride, 255);
        assert_eq!(limits.max_storage_buffers_per_shader_stage, 0);
        assert!(!adapter.capabilities().has_feature(features::COMPUTE));
        assert_eq!(adapter.info().backend, BackendKind::WebGl2);
    }

    #[test]
    fn features_track_extensions() {
        let gl = Rc::new(HeadlessGl::new().without_extension("OES_texture_float_linear"));
        let adapter = WebGl2Adapter::new(gl).unwrap();
        assert!(!adapter.capabilities().has_feature(features::FLOAT32_FILTERABLE));
        assert!(adapter.capabilities().has_feature(features::RG11B10UFLOAT_RENDERABLE));
    }

    #[test]
    fn requesting_compute_is_unsupported() {
        let adapter = WebGl2Adapter::new(Rc::new(HeadlessGl::new())).unwrap();
        let desc = DeviceDescriptor {
            required_features: vec![features::COMPUTE.into()],
            ..Default::default()
        };
        let err = pollster::block_on(adapter.request_device(&desc)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
    }
}
