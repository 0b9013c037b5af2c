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

//! Render pipelines as linked programs plus a fixed-function state block.

use super::bind_group::{global_slot, resolve_binding, SamplerPair, MAX_BINDINGS_PER_GROUP};
use super::conversions::{gl_texture_format, IntoGl};
use super::device::DeviceState;
use super::gl::consts::*;
use super::gl::{GlContext, GlName};
use super::program::{compile_stage, GlProgram, ATTRIBUTE_PREFIX};
use easel_core::gfx::api::*;
use easel_core::gfx::error::{GfxError, GfxResult};
use easel_core::gfx::handle::BindGroupLayoutId;
use easel_core::gfx::validation;
use std::collections::BTreeMap;

/// Fragment stage of pipelines that only write depth.
const NULL_FRAGMENT: &str = "#version 300 es\nprecision mediump float;\nvoid main() {}\n";

#[derive(Debug)]
pub(crate) struct GlRenderPipelineEntry {
    pub label: Option<String>,
    pub program: GlProgram,
    pub vertex_buffers: Vec<VertexBufferLayout>,
    pub primitive: PrimitiveState,
    pub depth_stencil: Option<DepthStencilState>,
    pub multisample: MultisampleState,
    pub targets: Vec<Option<ColorTargetState>>,
    /// Layout of group `i` at index `i`.
    pub group_layouts: Vec<(BindGroupLayoutId, BindGroupLayoutDescriptor)>,
    /// Layouts this pipeline derived itself; freed with it.
    pub auto_layouts: Vec<BindGroupLayoutId>,
    pub sampler_pairs: Vec<SamplerPair>,
}

/// A binding the linked program reads.
#[derive(Debug, Clone, Copy)]
struct ShaderBinding {
    group: u32,
    entry: BindGroupLayoutEntry,
}

fn failure(label: &Option<String>, message: impl Into<String>) -> GfxError {
    GfxError::PipelineCreation {
        label: label.clone(),
        message: message.into(),
    }
}

fn sampler_binding_type(utype: u32) -> Option<(TextureSampleType, TextureViewDimension)> {
    let float = TextureSampleType::Float { filterable: true };
    Some(match utype {
        SAMPLER_2D => (float, TextureViewDimension::D2),
        SAMPLER_3D => (float, TextureViewDimension::D3),
        SAMPLER_CUBE => (float, TextureViewDimension::Cube),
        SAMPLER_2D_ARRAY => (float, TextureViewDimension::D2Array),
        SAMPLER_2D_SHADOW => (TextureSampleType::Depth, TextureViewDimension::D2),
        SAMPLER_2D_ARRAY_SHADOW => (TextureSampleType::Depth, TextureViewDimension::D2Array),
        SAMPLER_CUBE_SHADOW => (TextureSampleType::Depth, TextureViewDimension::Cube),
        INT_SAMPLER_2D => (TextureSampleType::Sint, TextureViewDimension::D2),
        INT_SAMPLER_3D => (TextureSampleType::Sint, TextureViewDimension::D3),
        INT_SAMPLER_CUBE => (TextureSampleType::Sint, TextureViewDimension::Cube),
        INT_SAMPLER_2D_ARRAY => (TextureSampleType::Sint, TextureViewDimension::D2Array),
        UNSIGNED_INT_SAMPLER_2D => (TextureSampleType::Uint, TextureViewDimension::D2),
        UNSIGNED_INT_SAMPLER_3D => (TextureSampleType::Uint, TextureViewDimension::D3),
        UNSIGNED_INT_SAMPLER_CUBE => (TextureSampleType::Uint, TextureViewDimension::Cube),
        UNSIGNED_INT_SAMPLER_2D_ARRAY => (TextureSampleType::Uint, TextureViewDimension::D2Array),
        _ => return None,
    })
}

fn is_shadow_sampler(utype: u32) -> bool {
    matches!(utype, SAMPLER_2D_SHADOW | SAMPLER_2D_ARRAY_SHADOW | SAMPLER_CUBE_SHADOW)
}

/// Checks that `slot` of a supplied layout can serve what the shader reads.
fn slot_serves(slot: &BindGroupLayoutEntry, shader: &BindGroupLayoutEntry) -> bool {
    match (slot.ty, shader.ty) {
        (
            BindingType::Buffer {
                ty: BufferBindingType::Uniform,
                min_binding_size,
                ..
            },
            BindingType::Buffer {
                min_binding_size: needed,
                ..
            },
        ) => match (min_binding_size, needed) {
            (Some(have), Some(need)) => have >= need,
            _ => true,
        },
        (
            BindingType::Texture {
                view_dimension: have, ..
            },
            BindingType::Texture {
                view_dimension: need, ..
            },
        ) => have == need,
        (BindingType::Sampler(_), BindingType::Sampler(_)) => true,
        _ => false,
    }
}

/// Resolves the programmable stages to shader objects, compiling on demand.
fn stage_shaders(gl: &dyn GlContext, state: &mut DeviceState, desc: &RenderPipelineDescriptor) -> GfxResult<(GlName, GlName)> {
    let vertex = state
        .shader_modules
        .get_mut(desc.vertex.stage.module)?
        .stage(gl, ShaderStage::Vertex)?;
    let fragment = match &desc.fragment {
        Some(fragment) => state
            .shader_modules
            .get_mut(fragment.stage.module)?
            .stage(gl, ShaderStage::Fragment)?,
        None => match state.null_fragment {
            Some(name) => name,
            None => {
                let name = compile_stage(gl, ShaderStage::Fragment, NULL_FRAGMENT, &[])?.name;
                state.null_fragment = Some(name);
                name
            }
        },
    };
    Ok((vertex, fragment))
}

impl GlRenderPipelineEntry {
    /// Compiles, links and wires a render pipeline.
    ///
    /// Auto layouts are derived from the program interface and inserted into
    /// the device's layout arena.
    pub fn create(
        gl: &dyn GlContext,
        state: &mut DeviceState,
        capabilities: &Capabilities,
        desc: &RenderPipelineDescriptor,
    ) -> GfxResult<Self> {
        let limits = &capabilities.limits;
        validation::render_pipeline(desc, limits)?;
        let label = &desc.label;
        if desc.multisample.count != 1 {
            return Err(GfxError::unsupported("multisampled pipelines are not available on WebGL2"));
        }
        if desc.primitive.unclipped_depth {
            return Err(GfxError::unsupported("unclipped depth is not available on WebGL2"));
        }
        let targets: Vec<Option<ColorTargetState>> =
            desc.fragment.as_ref().map(|f| f.targets.clone()).unwrap_or_default();
        for target in targets.iter().flatten() {
            let renderable = gl_texture_format(target.format).is_some() && target.format.info().renderable;
            if !renderable {
                return Err(GfxError::unsupported(format!(
                    "{:?} is not a WebGL2 render target format",
                    target.format
                )));
            }
        }
        let mut present = targets.iter().flatten();
        if let Some(first) = present.next() {
            if present.any(|t| t.blend != first.blend || t.write_mask != first.write_mask) {
                return Err(GfxError::unsupported(
                    "WebGL2 applies one blend state and write mask to every color target",
                ));
            }
        }
        if let Some(ds) = &desc.depth_stencil {
            if gl_texture_format(ds.format).is_none() {
                return Err(GfxError::unsupported(format!("{:?} is not available on WebGL2", ds.format)));
            }
        }

        let mut hints = state.shader_modules.get(desc.vertex.stage.module)?.desc.binding_hints.clone();
        if let Some(fragment) = &desc.fragment {
            hints.extend(state.shader_modules.get(fragment.stage.module)?.desc.binding_hints.iter().cloned());
        }
        let (vertex, fragment) = stage_shaders(gl, state, desc)?;
        let locations: Vec<u32> = desc
            .vertex
            .buffers
            .iter()
            .flat_map(|b| b.attributes.iter().map(|a| a.shader_location))
            .collect();
        let program = match GlProgram::link(gl, vertex, fragment, &locations) {
            Ok(program) => program,
            Err(e) => {
                let mut modules = vec![desc.vertex.stage.module];
                if let Some(fragment) = &desc.fragment {
                    if fragment.stage.module != desc.vertex.stage.module {
                        modules.push(fragment.stage.module);
                    }
                }
                for id in modules {
                    state.shader_modules.get_mut(id)?.record_link_failure(e.diagnostics());
                }
                return Err(e);
            }
        };

        match Self::wire(gl, state, limits, desc, &program, &hints, &locations) {
            Ok((group_layouts, sampler_pairs)) => {
                log::debug!(
                    "Created render pipeline '{}' with {} bind group layout(s)",
                    label.as_deref().unwrap_or("<unlabeled>"),
                    group_layouts.len()
                );
                let auto_layouts = match desc.layout {
                    PipelineLayoutChoice::Auto => group_layouts.iter().map(|(id, _)| *id).collect(),
                    PipelineLayoutChoice::Explicit(_) => Vec::new(),
                };
                Ok(Self {
                    label: label.clone(),
                    program,
                    vertex_buffers: desc.vertex.buffers.clone(),
                    primitive: desc.primitive,
                    depth_stencil: desc.depth_stencil,
                    multisample: desc.multisample,
                    targets,
                    group_layouts,
                    auto_layouts,
                    sampler_pairs,
                })
            }
            Err(e) => {
                program.delete(gl);
                Err(e)
            }
        }
    }

    /// Binds blocks and samplers to their global slots and settles the layout.
    #[allow(clippy::type_complexity)]
    fn wire(
        gl: &dyn GlContext,
        state: &mut DeviceState,
        limits: &Limits,
        desc: &RenderPipelineDescriptor,
        program: &GlProgram,
        hints: &[BindingHint],
        locations: &[u32],
    ) -> GfxResult<(Vec<(BindGroupLayoutId, BindGroupLayoutDescriptor)>, Vec<SamplerPair>)> {
        let label = &desc.label;
        let interface = program.interface();

        for attribute in &interface.attributes {
            if attribute.name.starts_with("gl_") {
                continue;
            }
            let bound = attribute
                .name
                .strip_prefix(ATTRIBUTE_PREFIX)
                .and_then(|n| n.parse::<u32>().ok())
                .is_some_and(|loc| locations.contains(&loc));
            if !bound {
                return Err(failure(
                    label,
                    format!("vertex input '{}' is not fed by any vertex buffer attribute", attribute.name),
                ));
            }
        }

        let slot_of = |name: &str| -> GfxResult<(u32, u32)> {
            let (group, binding) = resolve_binding(name, hints).ok_or_else(|| {
                failure(
                    label,
                    format!("'{name}' has no binding hint and does not follow the group{{G}}_binding{{B}} convention"),
                )
            })?;
            if group >= limits.max_bind_groups || binding >= MAX_BINDINGS_PER_GROUP {
                return Err(failure(
                    label,
                    format!(
                        "'{name}' maps to group {group} binding {binding}, beyond {} group(s) of {MAX_BINDINGS_PER_GROUP}",
                        limits.max_bind_groups
                    ),
                ));
            }
            Ok((group, binding))
        };

        let mut bindings: Vec<ShaderBinding> = Vec::new();
        for block in &interface.blocks {
            let (group, binding) = slot_of(&block.name)?;
            gl.uniform_block_binding(program.name(), block.index, global_slot(group, binding));
            bindings.push(ShaderBinding {
                group,
                entry: BindGroupLayoutEntry {
                    binding,
                    visibility: ShaderStageFlags::VERTEX_FRAGMENT,
                    ty: BindingType::Buffer {
                        ty: BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: Some(u64::from(block.size)),
                    },
                },
            });
        }

        let mut pairs = Vec::new();
        for uniform in interface.samplers() {
            let (group, binding) = slot_of(&uniform.name)?;
            let (sample_type, view_dimension) = sampler_binding_type(uniform.utype)
                .ok_or_else(|| failure(label, format!("sampler '{}' has an unknown type", uniform.name)))?;
            if let Some(location) = uniform.location {
                gl.use_program(program.name());
                gl.uniform_1_i32(location, global_slot(group, binding) as i32);
            }
            let sampler = hints
                .iter()
                .find(|h| h.name == uniform.name)
                .and_then(|h| h.sampler)
                .unwrap_or(binding + 1);
            pairs.push(SamplerPair {
                group,
                texture: binding,
                sampler,
            });
            bindings.push(ShaderBinding {
                group,
                entry: BindGroupLayoutEntry {
                    binding,
                    visibility: ShaderStageFlags::VERTEX_FRAGMENT,
                    ty: BindingType::Texture {
                        sample_type,
                        view_dimension,
                        multisampled: false,
                    },
                },
            });
            let kind = if is_shadow_sampler(uniform.utype) {
                SamplerBindingType::Comparison
            } else {
                SamplerBindingType::Filtering
            };
            if sampler < MAX_BINDINGS_PER_GROUP {
                bindings.push(ShaderBinding {
                    group,
                    entry: BindGroupLayoutEntry {
                        binding: sampler,
                        visibility: ShaderStageFlags::VERTEX_FRAGMENT,
                        ty: BindingType::Sampler(kind),
                    },
                });
            }
        }
        gl.use_program(0);

        for uniform in interface.plain_uniforms() {
            log::warn!(
                "Pipeline '{}': uniform '{}' lives outside any block and will never be set",
                label.as_deref().unwrap_or("<unlabeled>"),
                uniform.name
            );
        }

        let group_layouts = match desc.layout {
            PipelineLayoutChoice::Explicit(id) => {
                let ids = state.pipeline_layouts.get(id)?.clone();
                let mut layouts = Vec::with_capacity(ids.len());
                for layout in ids {
                    layouts.push((layout, state.bind_group_layouts.get(layout)?.clone()));
                }
                for shader in &bindings {
                    let served = layouts
                        .get(shader.group as usize)
                        .and_then(|(_, l)| l.entry(shader.entry.binding))
                        .is_some_and(|slot| slot_serves(slot, &shader.entry));
                    let optional_sampler = matches!(shader.entry.ty, BindingType::Sampler(_));
                    if !served && !optional_sampler {
                        return Err(failure(
                            label,
                            format!(
                                "group {} binding {} read by the shader is missing from the pipeline layout",
                                shader.group, shader.entry.binding
                            ),
                        ));
                    }
                }
                layouts
            }
            PipelineLayoutChoice::Auto => {
                let derived = derive_layouts(label, &bindings)?;
                let mut layouts = Vec::with_capacity(derived.len());
                for (index, entries) in derived.into_iter().enumerate() {
                    let layout = BindGroupLayoutDescriptor {
                        label: label.as_ref().map(|l| format!("{l} (group {index})")),
                        entries,
                    };
                    validation::bind_group_layout(&layout, limits)?;
                    layouts.push(layout);
                }
                layouts
                    .into_iter()
                    .map(|layout| (state.bind_group_layouts.insert(layout.clone()), layout))
                    .collect()
            }
        };
        Ok((group_layouts, pairs))
    }

    /// Issues the complete fixed-function state of the pipeline.
    pub fn apply(&self, gl: &dyn GlContext, stencil_reference: u32) {
        gl.use_program(self.program.name());

        match self.primitive.cull_mode.into_gl() {
            Some(face) => {
                gl.enable(CULL_FACE);
                gl.cull_face(face);
            }
            None => gl.disable(CULL_FACE),
        }
        gl.front_face(self.primitive.front_face.into_gl());

        match &self.depth_stencil {
            Some(ds) => {
                gl.enable(DEPTH_TEST);
                gl.depth_func(ds.depth_compare.into_gl());
                gl.depth_mask(ds.depth_write_enabled);
                if ds.stencil.is_enabled() {
                    gl.enable(STENCIL_TEST);
                    for (face, state) in [(FRONT, ds.stencil.front), (BACK, ds.stencil.back)] {
                        gl.stencil_func_separate(
                            face,
                            state.compare.into_gl(),
                            stencil_reference as i32,
                            ds.stencil.read_mask,
                        );
                        gl.stencil_op_separate(
                            face,
                            state.fail_op.into_gl(),
                            state.depth_fail_op.into_gl(),
                            state.pass_op.into_gl(),
                        );
                        gl.stencil_mask_separate(face, ds.stencil.write_mask);
                    }
                } else {
                    gl.disable(STENCIL_TEST);
                }
                if ds.bias.is_enabled() {
                    gl.enable(POLYGON_OFFSET_FILL);
                    gl.polygon_offset(ds.bias.slope_scale, ds.bias.constant as f32);
                } else {
                    gl.disable(POLYGON_OFFSET_FILL);
                }
            }
            None => {
                gl.disable(DEPTH_TEST);
                gl.depth_mask(false);
                gl.disable(STENCIL_TEST);
                gl.disable(POLYGON_OFFSET_FILL);
            }
        }

        let first = self.targets.iter().flatten().next();
        match first.and_then(|t| t.blend) {
            Some(blend) => {
                gl.enable(BLEND);
                gl.blend_equation_separate(blend.color.operation.into_gl(), blend.alpha.operation.into_gl());
                gl.blend_func_separate(
                    blend.color.src_factor.into_gl(),
                    blend.color.dst_factor.into_gl(),
                    blend.alpha.src_factor.into_gl(),
                    blend.alpha.dst_factor.into_gl(),
                );
            }
            None => gl.disable(BLEND),
        }
        let mask = first.map(|t| t.write_mask).unwrap_or(ColorWrites::EMPTY);
        gl.color_mask(
            mask.contains(ColorWrites::RED),
            mask.contains(ColorWrites::GREEN),
            mask.contains(ColorWrites::BLUE),
            mask.contains(ColorWrites::ALPHA),
        );

        if self.multisample.alpha_to_coverage_enabled {
            gl.enable(SAMPLE_ALPHA_TO_COVERAGE);
        } else {
            gl.disable(SAMPLE_ALPHA_TO_COVERAGE);
        }
    }

    /// Layout for group `index`.
    pub fn bind_group_layout(&self, index: u32) -> GfxResult<BindGroupLayoutId> {
        self.group_layouts
            .get(index as usize)
            .map(|(id, _)| *id)
            .ok_or_else(|| {
                GfxError::validation(format!(
                    "pipeline '{}' has {} bind group layout(s), index {index} is out of range",
                    self.label.as_deref().unwrap_or("<unlabeled>"),
                    self.group_layouts.len()
                ))
            })
    }

    pub fn delete(&self, gl: &dyn GlContext) {
        self.program.delete(gl);
    }
}

/// Groups shader bindings into dense per-group entry lists.
fn derive_layouts(label: &Option<String>, bindings: &[ShaderBinding]) -> GfxResult<Vec<Vec<BindGroupLayoutEntry>>> {
    let mut groups: BTreeMap<u32, Vec<BindGroupLayoutEntry>> = BTreeMap::new();
    for shader in bindings {
        let entries = groups.entry(shader.group).or_default();
        match entries.iter().find(|e| e.binding == shader.entry.binding) {
            Some(existing) if existing.ty == shader.entry.ty => {}
            Some(existing) => {
                return Err(failure(
                    label,
                    format!(
                        "group {} binding {} is used as both {:?} and {:?}",
                        shader.group,
                        shader.entry.binding,
                        existing.ty.category(),
                        shader.entry.ty.category()
                    ),
                ));
            }
            None => entries.push(shader.entry),
        }
    }
    let count = groups.keys().next_back().map_or(0, |g| g + 1);
    let mut layouts = vec![Vec::new(); count as usize];
    for (group, mut entries) in groups {
        entries.sort_by_key(|e| e.binding);
        layouts[group as usize] = entries;
    }
    Ok(layouts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform(group: u32, binding: u32, size: u64) -> ShaderBinding {
        ShaderBinding {
            group,
            entry: BindGroupLayoutEntry {
                binding,
                visibility: ShaderStageFlags::VERTEX_FRAGMENT,
                ty: BindingType::Buffer {
                    ty: BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: Some(size),
                },
            },
        }
    }

    #[test]
    fn derived_layouts_fill_gaps_and_sort() {
        let layouts = derive_layouts(&None, &[uniform(1, 3, 16), uniform(1, 0, 64), uniform(1, 0, 64)]).unwrap();
        assert_eq!(layouts.len(), 2);
        assert!(layouts[0].is_empty());
        assert_eq!(layouts[1].iter().map(|e| e.binding).collect::<Vec<_>>(), vec![0, 3]);
    }

    #[test]
    fn conflicting_uses_of_a_slot_fail() {
        let sampler = ShaderBinding {
            group: 0,
            entry: BindGroupLayoutEntry {
                binding: 1,
                visibility: ShaderStageFlags::FRAGMENT,
                ty: BindingType::Sampler(SamplerBindingType::Filtering),
            },
        };
        let err = derive_layouts(&Some("p".into()), &[uniform(0, 1, 16), sampler]).unwrap_err();
        assert_eq!(err.kind(), easel_core::gfx::error::ErrorKind::PipelineCreation);
    }

    #[test]
    fn shadow_samplers_derive_depth_slots() {
        assert_eq!(
            sampler_binding_type(SAMPLER_2D_SHADOW),
            Some((TextureSampleType::Depth, TextureViewDimension::D2))
        );
        assert!(is_shadow_sampler(SAMPLER_CUBE_SHADOW));
        assert_eq!(sampler_binding_type(FLOAT_VEC4), None);
    }

    #[test]
    fn smaller_layout_slots_do_not_serve_larger_blocks() {
        let shader = uniform(0, 0, 64).entry;
        let small = uniform(0, 0, 16).entry;
        let open = BindGroupLayoutEntry {
            ty: BindingType::Buffer {
                ty: BufferBindingType::Uniform,
                has_dynamic_offset: true,
                min_binding_size: None,
            },
            ..shader
        };
        assert!(!slot_serves(&small, &shader));
        assert!(slot_serves(&open, &shader));
    }
}
