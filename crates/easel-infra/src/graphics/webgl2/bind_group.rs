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

//! Bind group emulation.
//!
//! WebGL2 has no bind groups. Every `(group, binding)` pair owns one global
//! slot, `group * MAX_BINDINGS_PER_GROUP + binding`, which doubles as the
//! uniform buffer binding point and the texture unit. Programs are wired to
//! those slots once at link time; setting a bind group then only rebinds
//! buffers, textures and samplers.

use super::device::DeviceState;
use super::gl::consts::*;
use super::gl::GlContext;
use super::resource::gl_size;
use easel_core::gfx::api::*;
use easel_core::gfx::error::{GfxError, GfxResult};
use easel_core::gfx::handle::BindGroupLayoutId;
use easel_core::gfx::validation;

/// Bindings addressable inside one group.
pub const MAX_BINDINGS_PER_GROUP: u32 = 16;

/// Global GL slot of `(group, binding)`.
pub fn global_slot(group: u32, binding: u32) -> u32 {
    group * MAX_BINDINGS_PER_GROUP + binding
}

/// Finds the `(group, binding)` a shader resource name stands for.
///
/// Explicit hints win; otherwise the name must embed `group{G}_binding{B}`.
/// Names emitted by cross-compilers, such as `_group_0_binding_1_fs`, match
/// too.
pub fn resolve_binding(name: &str, hints: &[BindingHint]) -> Option<(u32, u32)> {
    if let Some(hint) = hints.iter().find(|h| h.name == name) {
        return Some((hint.group, hint.binding));
    }
    let name = name.split('.').next_back().unwrap_or(name);
    let lower = name.find("group")?;
    let rest = name[lower + "group".len()..].trim_start_matches('_');
    let (group, rest) = leading_number(rest)?;
    let rest = rest.trim_start_matches('_');
    let rest = rest.strip_prefix("binding")?.trim_start_matches('_');
    let (binding, _) = leading_number(rest)?;
    Some((group, binding))
}

fn leading_number(s: &str) -> Option<(u32, &str)> {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let n = s[..end].parse().ok()?;
    Some((n, &s[end..]))
}

/// Which sampler a texture binding is sampled with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerPair {
    pub group: u32,
    pub texture: u32,
    pub sampler: u32,
}

#[derive(Debug)]
pub(crate) struct GlBindGroupEntry {
    pub label: Option<String>,
    pub layout: BindGroupLayoutId,
    pub layout_desc: BindGroupLayoutDescriptor,
    /// Sorted by binding number.
    pub entries: Vec<BindGroupEntry>,
    pub dynamic_count: usize,
}

fn name(label: &Option<String>) -> &str {
    label.as_deref().unwrap_or("<unlabeled>")
}

fn sample_type_fits(slot: TextureSampleType, view: TextureSampleType, float32_filterable: bool) -> bool {
    match (slot, view) {
        (TextureSampleType::Float { filterable: false }, TextureSampleType::Float { .. }) => true,
        (TextureSampleType::Float { filterable: false }, TextureSampleType::Depth) => true,
        (TextureSampleType::Float { filterable: true }, TextureSampleType::Float { filterable }) => {
            filterable || float32_filterable
        }
        (a, b) => a == b,
    }
}

impl GlBindGroupEntry {
    /// Validates `desc` against its layout and the live resources.
    pub fn create(state: &DeviceState, capabilities: &Capabilities, desc: &BindGroupDescriptor) -> GfxResult<Self> {
        let layout_desc = state.bind_group_layouts.get(desc.layout)?.clone();
        validation::bind_group_shape(&layout_desc, desc)?;
        let group = name(&desc.label);
        let limits = &capabilities.limits;
        let float32_filterable = capabilities.has_feature(features::FLOAT32_FILTERABLE);

        for entry in &desc.entries {
            let Some(slot) = layout_desc.entry(entry.binding) else {
                continue;
            };
            let at = format!("bind group '{group}' binding {}", entry.binding);
            match (slot.ty, entry.resource) {
                (BindingType::Buffer { ty, min_binding_size, .. }, BindingResource::Buffer(binding)) => {
                    if ty != BufferBindingType::Uniform {
                        return Err(GfxError::unsupported(format!("{at}: storage buffers are not available on WebGL2")));
                    }
                    let buffer = state.buffers.get(binding.buffer)?;
                    validation::require_buffer_usage(buffer.desc.usage, BufferUsages::UNIFORM, &at)?;
                    if buffer.desc.usage.contains(BufferUsages::INDEX) {
                        return Err(GfxError::unsupported(format!(
                            "{at}: WebGL2 cannot bind an index buffer as a uniform block"
                        )));
                    }
                    if binding.offset % u64::from(limits.min_uniform_buffer_offset_alignment) != 0 {
                        return Err(GfxError::validation(format!(
                            "{at}: offset {} is not a multiple of {}",
                            binding.offset, limits.min_uniform_buffer_offset_alignment
                        )));
                    }
                    let size = binding.size.unwrap_or_else(|| buffer.size().saturating_sub(binding.offset));
                    if size == 0 {
                        return Err(GfxError::validation(format!("{at}: empty buffer range")));
                    }
                    validation::range_end(buffer.size(), binding.offset, size, &at)?;
                    if size > limits.max_uniform_buffer_binding_size {
                        return Err(GfxError::validation(format!(
                            "{at}: {size} bytes exceed max_uniform_buffer_binding_size"
                        )));
                    }
                    if let Some(min) = min_binding_size {
                        if size < min {
                            return Err(GfxError::validation(format!(
                                "{at}: {size} bytes are below min_binding_size {min}"
                            )));
                        }
                    }
                }
                (
                    BindingType::Texture {
                        sample_type,
                        view_dimension,
                        multisampled,
                    },
                    BindingResource::TextureView(id),
                ) => {
                    let view = state.texture_views.get(id)?;
                    let texture = state.textures.get(view.texture)?;
                    validation::require_texture_usage(texture.desc.usage, TextureUsages::TEXTURE_BINDING, &at)?;
                    if texture.canvas {
                        return Err(GfxError::validation(format!("{at}: the canvas cannot be sampled")));
                    }
                    if multisampled {
                        return Err(GfxError::unsupported(format!("{at}: multisampled bindings are not available")));
                    }
                    if view.view.dimension != view_dimension {
                        return Err(GfxError::validation(format!(
                            "{at}: layout expects a {view_dimension:?} view, got {:?}",
                            view.view.dimension
                        )));
                    }
                    if !view.samples_whole_target(texture) {
                        return Err(GfxError::unsupported(format!(
                            "{at}: WebGL2 samples whole textures, a {:?} view of this texture cannot be bound",
                            view.view.dimension
                        )));
                    }
                    let view_sample = match view.view.aspect {
                        TextureAspect::StencilOnly => {
                            return Err(GfxError::unsupported(format!("{at}: stencil sampling is not available")));
                        }
                        _ => view.view.format.info().sample_type,
                    };
                    if !sample_type_fits(sample_type, view_sample, float32_filterable) {
                        return Err(GfxError::validation(format!(
                            "{at}: layout expects {sample_type:?} samples, {:?} provides {view_sample:?}",
                            view.view.format
                        )));
                    }
                }
                (BindingType::Sampler(kind), BindingResource::Sampler(id)) => {
                    let sampler = state.samplers.get(id)?;
                    let comparison = sampler.desc.compare.is_some();
                    if comparison != (kind == SamplerBindingType::Comparison) {
                        return Err(GfxError::validation(format!(
                            "{at}: layout expects a {kind:?} sampler"
                        )));
                    }
                    let filters = sampler.desc.mag_filter == FilterMode::Linear
                        || sampler.desc.min_filter == FilterMode::Linear
                        || sampler.desc.mipmap_filter == MipmapFilterMode::Linear;
                    if kind == SamplerBindingType::NonFiltering && filters {
                        return Err(GfxError::validation(format!("{at}: non-filtering slot got a filtering sampler")));
                    }
                }
                (BindingType::StorageTexture { .. }, _) => {
                    return Err(GfxError::unsupported(format!("{at}: storage textures are not available on WebGL2")));
                }
                _ => {
                    return Err(GfxError::validation(format!("{at}: resource does not match the layout")));
                }
            }
        }

        let mut entries = desc.entries.clone();
        entries.sort_by_key(|e| e.binding);
        let dynamic_count = layout_desc
            .entries
            .iter()
            .filter(|e| matches!(e.ty, BindingType::Buffer { has_dynamic_offset: true, .. }))
            .count();
        Ok(Self {
            label: desc.label.clone(),
            layout: desc.layout,
            layout_desc,
            entries,
            dynamic_count,
        })
    }

    fn has_dynamic_offset(&self, binding: u32) -> bool {
        matches!(
            self.layout_desc.entry(binding).map(|e| e.ty),
            Some(BindingType::Buffer { has_dynamic_offset: true, .. })
        )
    }

    /// Checks `set_bind_group` dynamic offsets against the bound ranges.
    pub fn check_dynamic_offsets(&self, state: &DeviceState, offsets: &[u32], limits: &Limits) -> GfxResult<()> {
        if offsets.len() != self.dynamic_count {
            return Err(GfxError::validation(format!(
                "bind group '{}': {} dynamic offset(s) given, layout has {}",
                name(&self.label),
                offsets.len(),
                self.dynamic_count
            )));
        }
        let mut next = offsets.iter();
        for entry in &self.entries {
            let BindingResource::Buffer(binding) = entry.resource else {
                continue;
            };
            if !self.has_dynamic_offset(entry.binding) {
                continue;
            }
            let Some(&dynamic) = next.next() else {
                break;
            };
            if dynamic % limits.min_uniform_buffer_offset_alignment != 0 {
                return Err(GfxError::validation(format!(
                    "dynamic offset {dynamic} is not a multiple of {}",
                    limits.min_uniform_buffer_offset_alignment
                )));
            }
            let buffer = state.buffers.get(binding.buffer)?;
            let size = binding.size.unwrap_or_else(|| buffer.size().saturating_sub(binding.offset));
            let fits = binding
                .offset
                .checked_add(u64::from(dynamic))
                .and_then(|start| start.checked_add(size))
                .is_some_and(|end| end <= buffer.size());
            if !fits {
                return Err(GfxError::validation(format!(
                    "dynamic offset {dynamic} moves binding {} past the end of its buffer",
                    entry.binding
                )));
            }
        }
        Ok(())
    }

    fn sampler_for(&self, group: u32, texture: u32, pairs: &[SamplerPair]) -> Option<u32> {
        let is_sampler = |b: u32| {
            self.entries
                .iter()
                .any(|e| e.binding == b && matches!(e.resource, BindingResource::Sampler(_)))
        };
        if let Some(pair) = pairs.iter().find(|p| p.group == group && p.texture == texture) {
            if is_sampler(pair.sampler) {
                return Some(pair.sampler);
            }
        }
        if is_sampler(texture + 1) {
            return Some(texture + 1);
        }
        self.entries.iter().find_map(|e| match e.resource {
            BindingResource::Sampler(_) => Some(e.binding),
            _ => None,
        })
    }

    /// Binds every resource of the group to its global slot.
    pub fn apply(
        &self,
        gl: &dyn GlContext,
        state: &DeviceState,
        group: u32,
        dynamic_offsets: &[u32],
        pairs: &[SamplerPair],
    ) -> GfxResult<()> {
        let mut dynamic = dynamic_offsets.iter();
        for entry in &self.entries {
            let slot = global_slot(group, entry.binding);
            match entry.resource {
                BindingResource::Buffer(binding) => {
                    let buffer = state.buffers.get(binding.buffer)?;
                    buffer.ensure_unmapped("draw")?;
                    let extra = if self.has_dynamic_offset(entry.binding) {
                        u64::from(dynamic.next().copied().unwrap_or(0))
                    } else {
                        0
                    };
                    let size = binding.size.unwrap_or_else(|| buffer.size().saturating_sub(binding.offset));
                    gl.bind_buffer_range(
                        UNIFORM_BUFFER,
                        slot,
                        buffer.name,
                        gl_size(binding.offset + extra, "uniform offset")?,
                        gl_size(size, "uniform size")?,
                    );
                }
                BindingResource::TextureView(id) => {
                    let view = state.texture_views.get(id)?;
                    let texture = state.textures.get(view.texture)?;
                    gl.active_texture(TEXTURE0 + slot);
                    gl.bind_texture(texture.target, texture.name);
                    gl.tex_parameter_i32(texture.target, TEXTURE_BASE_LEVEL, view.view.base_mip_level as i32);
                    gl.tex_parameter_i32(
                        texture.target,
                        TEXTURE_MAX_LEVEL,
                        (view.view.base_mip_level + view.view.mip_level_count - 1) as i32,
                    );
                    let sampler = match self.sampler_for(group, entry.binding, pairs) {
                        Some(b) => match self.entries.iter().find(|e| e.binding == b).map(|e| e.resource) {
                            Some(BindingResource::Sampler(id)) => state.samplers.get(id)?.name,
                            _ => 0,
                        },
                        None => 0,
                    };
                    gl.bind_sampler(slot, sampler);
                }
                BindingResource::Sampler(id) => {
                    state.samplers.get(id)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::webgl2::adapter::WebGl2Adapter;
    use crate::graphics::webgl2::headless::HeadlessGl;
    use easel_core::gfx::error::ErrorKind;
    use easel_core::gfx::traits::GfxAdapter;
    use std::collections::HashSet;
    use std::rc::Rc;

    #[test]
    fn binding_names_follow_the_convention() {
        assert_eq!(resolve_binding("group0_binding1", &[]), Some((0, 1)));
        assert_eq!(resolve_binding("u_group2_binding13", &[]), Some((2, 13)));
        assert_eq!(resolve_binding("_group_1_binding_0_fs", &[]), Some((1, 0)));
        assert_eq!(resolve_binding("Camera.group0_binding3", &[]), Some((0, 3)));
        assert_eq!(resolve_binding("u_color", &[]), None);
        assert_eq!(resolve_binding("group_binding", &[]), None);
    }

    #[test]
    fn hints_override_names() {
        let hints = [BindingHint {
            name: "u_albedo".into(),
            group: 1,
            binding: 4,
            sampler: Some(5),
        }];
        assert_eq!(resolve_binding("u_albedo", &hints), Some((1, 4)));
        assert_eq!(resolve_binding("group0_binding0", &hints), Some((0, 0)));
    }

    #[test]
    fn slots_do_not_overlap_across_groups() {
        let gl = Rc::new(HeadlessGl::new());
        let adapter = WebGl2Adapter::new(gl).unwrap();
        let limits = adapter.capabilities().limits;
        assert!(limits.max_bind_groups >= 1);

        let mut seen = HashSet::new();
        for group in 0..limits.max_bind_groups {
            for binding in 0..MAX_BINDINGS_PER_GROUP {
                let slot = global_slot(group, binding);
                assert!(seen.insert(slot), "group {group} binding {binding} reuses slot {slot}");
            }
        }
        let highest = seen.iter().copied().max().unwrap();
        assert_eq!(highest, limits.max_bind_groups * MAX_BINDINGS_PER_GROUP - 1);

        let layout = BindGroupLayoutDescriptor {
            label: Some("too wide".into()),
            entries: vec![BindGroupLayoutEntry {
                binding: MAX_BINDINGS_PER_GROUP,
                visibility: ShaderStageFlags::FRAGMENT,
                ty: BindingType::Buffer {
                    ty: BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
            }],
        };
        let err = validation::bind_group_layout(&layout, &limits).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn depth_views_fit_unfilterable_float_slots() {
        let unfilterable = TextureSampleType::Float { filterable: false };
        let filterable = TextureSampleType::Float { filterable: true };
        assert!(sample_type_fits(unfilterable, TextureSampleType::Depth, false));
        assert!(sample_type_fits(unfilterable, filterable, false));
        assert!(!sample_type_fits(filterable, unfilterable, false));
        assert!(sample_type_fits(filterable, unfilterable, true));
        assert!(!sample_type_fits(TextureSampleType::Uint, TextureSampleType::Sint, true));
    }
}
