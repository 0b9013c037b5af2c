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

//! Numeric limits, feature tags and the capability report.

use super::adapter::{AdapterInfo, BackendKind};
use super::DeviceDescriptor;
use crate::gfx::error::{GfxError, GfxResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Well-known feature tags.
pub mod features {
    /// Compute pipelines and passes.
    pub const COMPUTE: &str = "compute";
    /// Storage buffers and textures.
    pub const STORAGE: &str = "storage";
    /// GPU timestamp queries.
    pub const TIMESTAMP_QUERY: &str = "timestamp-query";
    /// BC compressed formats.
    pub const TEXTURE_COMPRESSION_BC: &str = "texture-compression-bc";
    /// `Depth32FloatStencil8`.
    pub const DEPTH32FLOAT_STENCIL8: &str = "depth32float-stencil8";
    /// Unclipped depth.
    pub const DEPTH_CLIP_CONTROL: &str = "depth-clip-control";
    /// Non-zero `first_instance` in indirect draws.
    pub const INDIRECT_FIRST_INSTANCE: &str = "indirect-first-instance";
    /// `f16` in shaders.
    pub const SHADER_F16: &str = "shader-f16";
    /// Filterable 32-bit float textures.
    pub const FLOAT32_FILTERABLE: &str = "float32-filterable";
    /// Renderable `Rg11b10Ufloat`.
    pub const RG11B10UFLOAT_RENDERABLE: &str = "rg11b10ufloat-renderable";
    /// Multisampled render targets.
    pub const MULTISAMPLE: &str = "multisample";
    /// Non-zero `base_vertex` and `first_instance` on direct draws.
    pub const BASE_VERTEX: &str = "base-vertex";
}

/// Numeric device limits. Unsupported capabilities report zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct Limits {
    pub max_texture_dimension_1d: u32,
    pub max_texture_dimension_2d: u32,
    pub max_texture_dimension_3d: u32,
    pub max_texture_array_layers: u32,
    pub max_bind_groups: u32,
    pub max_bindings_per_bind_group: u32,
    pub max_dynamic_uniform_buffers_per_pipeline_layout: u32,
    pub max_sampled_textures_per_shader_stage: u32,
    pub max_samplers_per_shader_stage: u32,
    pub max_storage_buffers_per_shader_stage: u32,
    pub max_uniform_buffers_per_shader_stage: u32,
    pub max_uniform_buffer_binding_size: u64,
    pub max_storage_buffer_binding_size: u64,
    pub max_buffer_size: u64,
    pub max_vertex_buffers: u32,
    pub max_vertex_attributes: u32,
    pub max_vertex_buffer_array_stride: u32,
    pub max_color_attachments: u32,
    pub min_uniform_buffer_offset_alignment: u32,
    pub max_compute_workgroup_storage_size: u32,
    pub max_compute_invocations_per_workgroup: u32,
    pub max_compute_workgroup_size_x: u32,
    pub max_compute_workgroup_size_y: u32,
    pub max_compute_workgroup_size_z: u32,
    pub max_compute_workgroups_per_dimension: u32,
}

impl Default for Limits {
    /// The WebGPU baseline.
    fn default() -> Self {
        Self {
            max_texture_dimension_1d: 8192,
            max_texture_dimension_2d: 8192,
            max_texture_dimension_3d: 2048,
            max_texture_array_layers: 256,
            max_bind_groups: 4,
            max_bindings_per_bind_group: 1000,
            max_dynamic_uniform_buffers_per_pipeline_layout: 8,
            max_sampled_textures_per_shader_stage: 16,
            max_samplers_per_shader_stage: 16,
            max_storage_buffers_per_shader_stage: 8,
            max_uniform_buffers_per_shader_stage: 12,
            max_uniform_buffer_binding_size: 64 << 10,
            max_storage_buffer_binding_size: 128 << 20,
            max_buffer_size: 256 << 20,
            max_vertex_buffers: 8,
            max_vertex_attributes: 16,
            max_vertex_buffer_array_stride: 2048,
            max_color_attachments: 8,
            min_uniform_buffer_offset_alignment: 256,
            max_compute_workgroup_storage_size: 16384,
            max_compute_invocations_per_workgroup: 256,
            max_compute_workgroup_size_x: 256,
            max_compute_workgroup_size_y: 256,
            max_compute_workgroup_size_z: 64,
            max_compute_workgroups_per_dimension: 65535,
        }
    }
}

impl Limits {
    /// Every compute limit zeroed.
    #[must_use]
    pub fn without_compute(self) -> Self {
        Self {
            max_storage_buffers_per_shader_stage: 0,
            max_storage_buffer_binding_size: 0,
            max_compute_workgroup_storage_size: 0,
            max_compute_invocations_per_workgroup: 0,
            max_compute_workgroup_size_x: 0,
            max_compute_workgroup_size_y: 0,
            max_compute_workgroup_size_z: 0,
            max_compute_workgroups_per_dimension: 0,
            ..self
        }
    }

    fn maxima(&self) -> [(&'static str, u64); 24] {
        [
            ("max_texture_dimension_1d", self.max_texture_dimension_1d.into()),
            ("max_texture_dimension_2d", self.max_texture_dimension_2d.into()),
            ("max_texture_dimension_3d", self.max_texture_dimension_3d.into()),
            ("max_texture_array_layers", self.max_texture_array_layers.into()),
            ("max_bind_groups", self.max_bind_groups.into()),
            ("max_bindings_per_bind_group", self.max_bindings_per_bind_group.into()),
            (
                "max_dynamic_uniform_buffers_per_pipeline_layout",
                self.max_dynamic_uniform_buffers_per_pipeline_layout.into(),
            ),
            (
                "max_sampled_textures_per_shader_stage",
                self.max_sampled_textures_per_shader_stage.into(),
            ),
            ("max_samplers_per_shader_stage", self.max_samplers_per_shader_stage.into()),
            (
                "max_storage_buffers_per_shader_stage",
                self.max_storage_buffers_per_shader_stage.into(),
            ),
            (
                "max_uniform_buffers_per_shader_stage",
                self.max_uniform_buffers_per_shader_stage.into(),
            ),
            ("max_uniform_buffer_binding_size", self.max_uniform_buffer_binding_size),
            ("max_storage_buffer_binding_size", self.max_storage_buffer_binding_size),
            ("max_buffer_size", self.max_buffer_size),
            ("max_vertex_buffers", self.max_vertex_buffers.into()),
            ("max_vertex_attributes", self.max_vertex_attributes.into()),
            ("max_vertex_buffer_array_stride", self.max_vertex_buffer_array_stride.into()),
            ("max_color_attachments", self.max_color_attachments.into()),
            (
                "max_compute_workgroup_storage_size",
                self.max_compute_workgroup_storage_size.into(),
            ),
            (
                "max_compute_invocations_per_workgroup",
                self.max_compute_invocations_per_workgroup.into(),
            ),
            ("max_compute_workgroup_size_x", self.max_compute_workgroup_size_x.into()),
            ("max_compute_workgroup_size_y", self.max_compute_workgroup_size_y.into()),
            ("max_compute_workgroup_size_z", self.max_compute_workgroup_size_z.into()),
            (
                "max_compute_workgroups_per_dimension",
                self.max_compute_workgroups_per_dimension.into(),
            ),
        ]
    }

    /// Names of the limits in `required` that `self` does not meet.
    pub fn unmet(&self, required: &Limits) -> Vec<&'static str> {
        let mut unmet: Vec<_> = self
            .maxima()
            .into_iter()
            .zip(required.maxima())
            .filter(|((_, have), (_, want))| want > have)
            .map(|((name, _), _)| name)
            .collect();
        if required.min_uniform_buffer_offset_alignment < self.min_uniform_buffer_offset_alignment {
            unmet.push("min_uniform_buffer_offset_alignment");
        }
        unmet
    }
}

/// Everything a caller may ask of a device: identity, features and limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// Native API.
    pub backend: BackendKind,
    /// Adapter name.
    pub device_name: String,
    /// Opaque feature tags; see [`features`].
    pub features: BTreeSet<String>,
    /// Numeric limits.
    pub limits: Limits,
}

impl Capabilities {
    /// Capabilities of an adapter.
    pub fn new(info: &AdapterInfo, features: impl IntoIterator<Item = String>, limits: Limits) -> Self {
        Self {
            backend: info.backend,
            device_name: info.name.clone(),
            features: features.into_iter().collect(),
            limits,
        }
    }

    /// `true` when `tag` is exposed.
    pub fn has_feature(&self, tag: &str) -> bool {
        self.features.contains(tag)
    }

    /// Fails with `unsupported` when the request asks for more than this offers.
    pub fn check_request(&self, desc: &DeviceDescriptor) -> GfxResult<()> {
        let missing: Vec<&str> = desc
            .required_features
            .iter()
            .map(String::as_str)
            .filter(|f| !self.has_feature(f))
            .collect();
        if !missing.is_empty() {
            return Err(GfxError::unsupported(format!(
                "features not available on {}: {}",
                self.device_name,
                missing.join(", ")
            )));
        }
        if let Some(required) = &desc.required_limits {
            let unmet = self.limits.unmet(required);
            if !unmet.is_empty() {
                return Err(GfxError::unsupported(format!(
                    "limits not available on {}: {}",
                    self.device_name,
                    unmet.join(", ")
                )));
            }
        }
        Ok(())
    }

    /// Capabilities a device created from `desc` reports; requested limits replace the adapter's.
    pub fn for_request(&self, desc: &DeviceDescriptor) -> Capabilities {
        let mut caps = self.clone();
        if let Some(limits) = desc.required_limits {
            caps.limits = limits;
        }
        caps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::api::device::DeviceType;
    use crate::gfx::error::ErrorKind;

    fn caps() -> Capabilities {
        let info = AdapterInfo {
            name: "test".into(),
            vendor: 0,
            device: 0,
            device_type: DeviceType::Cpu,
            driver: String::new(),
            backend: BackendKind::WebGl2,
        };
        Capabilities::new(&info, [features::MULTISAMPLE.to_string()], Limits::default().without_compute())
    }

    #[test]
    fn missing_features_are_unsupported() {
        let desc = DeviceDescriptor {
            required_features: vec![features::COMPUTE.into()],
            ..Default::default()
        };
        let err = caps().check_request(&desc).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
        assert!(err.message().contains("compute"));
    }

    #[test]
    fn excessive_limits_are_unsupported() {
        let mut limits = Limits::default();
        limits.max_bind_groups = 8;
        let desc = DeviceDescriptor {
            required_limits: Some(limits),
            ..Default::default()
        };
        let err = caps().check_request(&desc).unwrap_err();
        assert!(err.message().contains("max_bind_groups"));
        assert!(err.message().contains("max_compute_workgroup_size_x"));
    }

    #[test]
    fn lower_requests_are_accepted() {
        let mut limits = Limits::default().without_compute();
        limits.max_texture_dimension_2d = 2048;
        let desc = DeviceDescriptor {
            required_features: vec![features::MULTISAMPLE.into()],
            required_limits: Some(limits),
            ..Default::default()
        };
        let caps = caps();
        caps.check_request(&desc).unwrap();
        assert_eq!(caps.for_request(&desc).limits.max_texture_dimension_2d, 2048);
    }

    #[test]
    fn capability_report_round_trips_through_json() {
        let caps = caps();
        let json = serde_json::to_string(&caps).unwrap();
        assert!(json.contains("\"backend\":\"WebGl2\""));
        let back: Capabilities = serde_json::from_str(&json).unwrap();
        assert_eq!(back, caps);
    }
}
