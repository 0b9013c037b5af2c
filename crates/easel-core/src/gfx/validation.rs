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

//! Descriptor checks shared by every backend.
//!
//! Each function either accepts a descriptor or returns the `validation`
//! error a device must report. Backend-specific restrictions (GL slot counts,
//! format tables) are layered on top by the backends themselves.

use super::api::*;
use super::error::{GfxError, GfxResult};
use std::collections::HashSet;

fn fail<T>(message: String) -> GfxResult<T> {
    Err(GfxError::Validation(message))
}

fn label(label: &Option<String>) -> &str {
    label.as_deref().unwrap_or("<unlabeled>")
}

/// Checks a buffer descriptor against usage rules and `limits`.
pub fn buffer_descriptor(desc: &BufferDescriptor, limits: &Limits) -> GfxResult<()> {
    let usage = desc.usage;
    if usage.is_empty() {
        return fail(format!("buffer '{}' has no usage", label(&desc.label)));
    }
    if usage.contains(BufferUsages::MAP_READ)
        && !(BufferUsages::MAP_READ | BufferUsages::COPY_DST).contains(usage)
    {
        return fail(format!(
            "buffer '{}': MAP_READ may only be combined with COPY_DST, got {:?}",
            label(&desc.label),
            usage
        ));
    }
    if usage.contains(BufferUsages::MAP_WRITE)
        && !(BufferUsages::MAP_WRITE | BufferUsages::COPY_SRC).contains(usage)
    {
        return fail(format!(
            "buffer '{}': MAP_WRITE may only be combined with COPY_SRC, got {:?}",
            label(&desc.label),
            usage
        ));
    }
    if desc.mapped_at_creation && desc.size % 4 != 0 {
        return fail(format!(
            "buffer '{}': mapped_at_creation requires a size multiple of 4, got {}",
            label(&desc.label),
            desc.size
        ));
    }
    if desc.size > limits.max_buffer_size {
        return fail(format!(
            "buffer '{}': size {} exceeds max_buffer_size {}",
            label(&desc.label),
            desc.size,
            limits.max_buffer_size
        ));
    }
    Ok(())
}

/// Fails unless `have` contains `need`.
pub fn require_buffer_usage(have: BufferUsages, need: BufferUsages, what: &str) -> GfxResult<()> {
    if have.contains(need) {
        Ok(())
    } else {
        fail(format!("{what} requires buffer usage {need:?}, buffer has {have:?}"))
    }
}

/// Fails unless `have` contains `need`.
pub fn require_texture_usage(have: TextureUsages, need: TextureUsages, what: &str) -> GfxResult<()> {
    if have.contains(need) {
        Ok(())
    } else {
        fail(format!("{what} requires texture usage {need:?}, texture has {have:?}"))
    }
}

/// Checks that `[offset, offset + size)` lies in a buffer of `buffer_size`
/// bytes and that both ends are 4-byte aligned.
pub fn buffer_range(buffer_size: u64, offset: u64, size: u64, what: &str) -> GfxResult<()> {
    if offset % 4 != 0 || size % 4 != 0 {
        return fail(format!("{what}: offset {offset} and size {size} must be multiples of 4"));
    }
    range_end(buffer_size, offset, size, what).map(|_| ())
}

/// End of `offset..offset + size` when it fits `buffer_size`, without alignment rules.
pub fn range_end(buffer_size: u64, offset: u64, size: u64, what: &str) -> GfxResult<u64> {
    match offset.checked_add(size) {
        Some(end) if end <= buffer_size => Ok(end),
        _ => fail(format!(
            "{what}: range {offset}..{} overruns buffer of {buffer_size} bytes",
            offset.saturating_add(size)
        )),
    }
}

/// Checks a texture descriptor against format traits and `limits`.
pub fn texture_descriptor(desc: &TextureDescriptor, limits: &Limits) -> GfxResult<()> {
    let name = label(&desc.label);
    let size = desc.size;
    if size.width == 0 || size.height == 0 || size.depth_or_array_layers == 0 {
        return fail(format!("texture '{name}': zero-sized extent {size:?}"));
    }
    if desc.usage.is_empty() {
        return fail(format!("texture '{name}' has no usage"));
    }
    let (max_xy, max_z) = match desc.dimension {
        TextureDimension::D1 => (limits.max_texture_dimension_1d, 1),
        TextureDimension::D2 => (limits.max_texture_dimension_2d, limits.max_texture_array_layers),
        TextureDimension::D3 => (limits.max_texture_dimension_3d, limits.max_texture_dimension_3d),
    };
    let max_h = if desc.dimension == TextureDimension::D1 { 1 } else { max_xy };
    if size.width > max_xy || size.height > max_h || size.depth_or_array_layers > max_z {
        return fail(format!(
            "texture '{name}': extent {size:?} exceeds limits for {:?}",
            desc.dimension
        ));
    }
    if desc.mip_level_count == 0 || desc.mip_level_count > size.max_mips(desc.dimension) {
        return fail(format!(
            "texture '{name}': mip_level_count {} is outside 1..={}",
            desc.mip_level_count,
            size.max_mips(desc.dimension)
        ));
    }
    let info = desc.format.info();
    match desc.sample_count {
        1 => {}
        4 => {
            if desc.dimension != TextureDimension::D2
                || desc.mip_level_count != 1
                || size.depth_or_array_layers != 1
                || !desc.usage.contains(TextureUsages::RENDER_ATTACHMENT)
                || desc.usage.contains(TextureUsages::STORAGE_BINDING)
                || !info.renderable
            {
                return fail(format!(
                    "texture '{name}': multisampled textures must be single-mip, single-layer 2D render attachments"
                ));
            }
        }
        n => return fail(format!("texture '{name}': sample_count {n} is not 1 or 4")),
    }
    if desc.usage.contains(TextureUsages::RENDER_ATTACHMENT) {
        if !info.renderable {
            return fail(format!("texture '{name}': {:?} is not renderable", desc.format));
        }
        if desc.dimension == TextureDimension::D1 {
            return fail(format!("texture '{name}': 1D textures cannot be render attachments"));
        }
    }
    if info.compressed() {
        let (bw, bh) = info.block_dimensions;
        if size.width % bw != 0 || size.height % bh != 0 {
            return fail(format!(
                "texture '{name}': compressed extent must be a multiple of the {bw}x{bh} block"
            ));
        }
    }
    for view_format in &desc.view_formats {
        let other = view_format.info();
        if other.block_size != info.block_size || other.aspects != info.aspects {
            return fail(format!(
                "texture '{name}': view format {view_format:?} is incompatible with {:?}",
                desc.format
            ));
        }
    }
    Ok(())
}

/// Resolves a view descriptor against its texture, checking ranges.
pub fn texture_view(texture: &TextureDescriptor, desc: &TextureViewDescriptor) -> GfxResult<ResolvedTextureView> {
    let name = label(&desc.label);
    let layers = match texture.dimension {
        TextureDimension::D3 => 1,
        _ => texture.size.depth_or_array_layers,
    };
    let format = desc.format.unwrap_or(texture.format);
    if format != texture.format && !texture.view_formats.contains(&format) {
        return fail(format!(
            "texture view '{name}': format {format:?} is neither the texture format nor a view format"
        ));
    }
    let dimension = desc
        .dimension
        .unwrap_or_else(|| TextureViewDimension::default_for(texture.dimension, layers));

    if desc.base_mip_level >= texture.mip_level_count {
        return fail(format!(
            "texture view '{name}': base_mip_level {} out of 0..{}",
            desc.base_mip_level, texture.mip_level_count
        ));
    }
    let mip_level_count = desc
        .mip_level_count
        .unwrap_or(texture.mip_level_count - desc.base_mip_level);
    if mip_level_count == 0 || desc.base_mip_level + mip_level_count > texture.mip_level_count {
        return fail(format!(
            "texture view '{name}': mips {}..{} exceed the texture's {}",
            desc.base_mip_level,
            desc.base_mip_level + mip_level_count,
            texture.mip_level_count
        ));
    }
    if desc.base_array_layer >= layers {
        return fail(format!(
            "texture view '{name}': base_array_layer {} out of 0..{layers}",
            desc.base_array_layer
        ));
    }
    let array_layer_count = desc
        .array_layer_count
        .unwrap_or(match dimension {
            TextureViewDimension::D1 | TextureViewDimension::D2 | TextureViewDimension::D3 => 1,
            TextureViewDimension::Cube => 6,
            _ => layers - desc.base_array_layer,
        });
    if array_layer_count == 0 || desc.base_array_layer + array_layer_count > layers {
        return fail(format!(
            "texture view '{name}': layers {}..{} exceed the texture's {layers}",
            desc.base_array_layer,
            desc.base_array_layer + array_layer_count
        ));
    }

    let compatible = match (texture.dimension, dimension) {
        (TextureDimension::D1, TextureViewDimension::D1) => true,
        (TextureDimension::D3, TextureViewDimension::D3) => true,
        (TextureDimension::D2, TextureViewDimension::D2) => array_layer_count == 1,
        (TextureDimension::D2, TextureViewDimension::D2Array) => true,
        (TextureDimension::D2, TextureViewDimension::Cube) => {
            array_layer_count == 6 && texture.size.width == texture.size.height
        }
        (TextureDimension::D2, TextureViewDimension::CubeArray) => {
            array_layer_count % 6 == 0 && texture.size.width == texture.size.height
        }
        _ => false,
    };
    if !compatible {
        return fail(format!(
            "texture view '{name}': {dimension:?} with {array_layer_count} layer(s) cannot view a {:?} texture",
            texture.dimension
        ));
    }
    match desc.aspect {
        TextureAspect::DepthOnly if !format.has_depth() => {
            return fail(format!("texture view '{name}': {format:?} has no depth aspect"));
        }
        TextureAspect::StencilOnly if !format.has_stencil() => {
            return fail(format!("texture view '{name}': {format:?} has no stencil aspect"));
        }
        _ => {}
    }

    Ok(ResolvedTextureView {
        format,
        dimension,
        aspect: desc.aspect,
        base_mip_level: desc.base_mip_level,
        mip_level_count,
        base_array_layer: desc.base_array_layer,
        array_layer_count,
    })
}

/// Checks LOD range and anisotropy.
pub fn sampler_descriptor(desc: &SamplerDescriptor) -> GfxResult<()> {
    let name = label(&desc.label);
    if desc.lod_min_clamp < 0.0 || desc.lod_max_clamp < desc.lod_min_clamp {
        return fail(format!(
            "sampler '{name}': invalid LOD range {}..{}",
            desc.lod_min_clamp, desc.lod_max_clamp
        ));
    }
    if !(1..=16).contains(&desc.anisotropy_clamp) {
        return fail(format!(
            "sampler '{name}': anisotropy_clamp {} outside 1..=16",
            desc.anisotropy_clamp
        ));
    }
    if desc.anisotropy_clamp > 1
        && (desc.mag_filter != FilterMode::Linear
            || desc.min_filter != FilterMode::Linear
            || desc.mipmap_filter != MipmapFilterMode::Linear)
    {
        return fail(format!("sampler '{name}': anisotropic filtering requires linear filters"));
    }
    Ok(())
}

/// Checks binding uniqueness and per-entry rules of a bind group layout.
pub fn bind_group_layout(desc: &BindGroupLayoutDescriptor, limits: &Limits) -> GfxResult<()> {
    let name = label(&desc.label);
    let mut seen = HashSet::new();
    for entry in &desc.entries {
        if !seen.insert(entry.binding) {
            return fail(format!("bind group layout '{name}': binding {} declared twice", entry.binding));
        }
        if entry.binding >= limits.max_bindings_per_bind_group {
            return fail(format!(
                "bind group layout '{name}': binding {} exceeds max_bindings_per_bind_group {}",
                entry.binding, limits.max_bindings_per_bind_group
            ));
        }
        if entry.visibility.is_empty() {
            log::warn!("bind group layout '{name}': binding {} is visible to no stage", entry.binding);
        }
        if let BindingType::Buffer {
            ty: BufferBindingType::Storage { read_only: false },
            ..
        } = entry.ty
        {
            if entry.visibility.contains(ShaderStageFlags::VERTEX) {
                return fail(format!(
                    "bind group layout '{name}': writable storage buffer {} cannot be visible to the vertex stage",
                    entry.binding
                ));
            }
        }
    }
    Ok(())
}

/// Checks that `desc` supplies exactly one resource of the right category for
/// every slot of `layout`. Resource-specific checks are left to the caller.
pub fn bind_group_shape(layout: &BindGroupLayoutDescriptor, desc: &BindGroupDescriptor) -> GfxResult<()> {
    let name = label(&desc.label);
    if layout.entries.len() != desc.entries.len() {
        return fail(format!(
            "bind group '{name}': layout declares {} binding(s), {} supplied",
            layout.entries.len(),
            desc.entries.len()
        ));
    }
    let mut seen = HashSet::new();
    for entry in &desc.entries {
        if !seen.insert(entry.binding) {
            return fail(format!("bind group '{name}': binding {} supplied twice", entry.binding));
        }
        let Some(slot) = layout.entry(entry.binding) else {
            return fail(format!("bind group '{name}': layout has no binding {}", entry.binding));
        };
        let category = slot.ty.category();
        if !entry.resource.fits(category) {
            return fail(format!(
                "bind group '{name}': binding {} expects a {:?} resource, got a {}",
                entry.binding,
                category,
                entry.resource.name()
            ));
        }
    }
    Ok(())
}

/// Checks the group count of a pipeline layout.
pub fn pipeline_layout(desc: &PipelineLayoutDescriptor, limits: &Limits) -> GfxResult<()> {
    if desc.bind_group_layouts.len() as u64 > u64::from(limits.max_bind_groups) {
        return fail(format!(
            "pipeline layout '{}': {} bind groups exceed max_bind_groups {}",
            label(&desc.label),
            desc.bind_group_layouts.len(),
            limits.max_bind_groups
        ));
    }
    Ok(())
}

/// Checks vertex buffer layouts: counts, strides, alignment and locations.
pub fn vertex_buffers(buffers: &[VertexBufferLayout], limits: &Limits) -> GfxResult<()> {
    if buffers.len() as u64 > u64::from(limits.max_vertex_buffers) {
        return fail(format!(
            "{} vertex buffers exceed max_vertex_buffers {}",
            buffers.len(),
            limits.max_vertex_buffers
        ));
    }
    let mut locations = HashSet::new();
    for (slot, layout) in buffers.iter().enumerate() {
        if layout.array_stride > u64::from(limits.max_vertex_buffer_array_stride) {
            return fail(format!(
                "vertex buffer {slot}: stride {} exceeds max_vertex_buffer_array_stride {}",
                layout.array_stride, limits.max_vertex_buffer_array_stride
            ));
        }
        if layout.array_stride % 4 != 0 {
            return fail(format!(
                "vertex buffer {slot}: stride {} is not a multiple of 4",
                layout.array_stride
            ));
        }
        let end = layout.attributes_end();
        if layout.array_stride != 0 && end > layout.array_stride {
            return fail(format!(
                "vertex buffer {slot}: attributes end at byte {end}, past the stride {}",
                layout.array_stride
            ));
        }
        for attribute in &layout.attributes {
            let align = u64::from(attribute.format.byte_size().min(4));
            if attribute.offset % align != 0 {
                return fail(format!(
                    "vertex buffer {slot}: attribute at location {} has offset {} not aligned to {align}",
                    attribute.shader_location, attribute.offset
                ));
            }
            if attribute.shader_location >= limits.max_vertex_attributes {
                return fail(format!(
                    "vertex buffer {slot}: location {} exceeds max_vertex_attributes {}",
                    attribute.shader_location, limits.max_vertex_attributes
                ));
            }
            if !locations.insert(attribute.shader_location) {
                return fail(format!(
                    "vertex buffer {slot}: shader location {} used twice",
                    attribute.shader_location
                ));
            }
        }
    }
    Ok(())
}

/// Checks the fixed-function state of a render pipeline descriptor.
pub fn render_pipeline(desc: &RenderPipelineDescriptor, limits: &Limits) -> GfxResult<()> {
    let name = label(&desc.label);
    vertex_buffers(&desc.vertex.buffers, limits)?;
    if desc.primitive.strip_index_format.is_some() && !desc.primitive.topology.is_strip() {
        return fail(format!(
            "render pipeline '{name}': strip_index_format requires a strip topology"
        ));
    }
    if let Some(ds) = &desc.depth_stencil {
        if !ds.format.is_depth_stencil() {
            return fail(format!("render pipeline '{name}': {:?} is not a depth format", ds.format));
        }
        if ds.stencil.is_enabled() && !ds.format.has_stencil() {
            return fail(format!(
                "render pipeline '{name}': stencil state set but {:?} has no stencil aspect",
                ds.format
            ));
        }
    }
    if let Some(fragment) = &desc.fragment {
        if fragment.targets.len() as u64 > u64::from(limits.max_color_attachments) {
            return fail(format!(
                "render pipeline '{name}': {} targets exceed max_color_attachments {}",
                fragment.targets.len(),
                limits.max_color_attachments
            ));
        }
        for target in fragment.targets.iter().flatten() {
            let info = target.format.info();
            if !info.renderable || !info.aspects.contains(FormatAspects::COLOR) {
                return fail(format!(
                    "render pipeline '{name}': {:?} is not a renderable color format",
                    target.format
                ));
            }
            if target.blend.is_some() && !info.filterable() {
                return fail(format!(
                    "render pipeline '{name}': {:?} does not support blending",
                    target.format
                ));
            }
        }
    } else if desc.depth_stencil.is_none() {
        return fail(format!(
            "render pipeline '{name}': a pipeline without fragment stage needs depth_stencil"
        ));
    }
    match desc.multisample.count {
        1 | 4 => {}
        n => return fail(format!("render pipeline '{name}': sample count {n} is not 1 or 4")),
    }
    Ok(())
}

/// Checks attachment counts of a render pass.
pub fn render_pass_shape(desc: &RenderPassDescriptor, limits: &Limits) -> GfxResult<()> {
    let name = label(&desc.label);
    if desc.color_attachments.len() as u64 > u64::from(limits.max_color_attachments) {
        return fail(format!(
            "render pass '{name}': {} color attachments exceed max_color_attachments {}",
            desc.color_attachments.len(),
            limits.max_color_attachments
        ));
    }
    if desc.color_attachments.iter().all(Option::is_none) && desc.depth_stencil_attachment.is_none() {
        return fail(format!("render pass '{name}' has no attachments"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::error::ErrorKind;
    use crate::gfx::handle::{kind, Arena, DeviceSerial};

    fn texture(size: Extent3D, mips: u32) -> TextureDescriptor {
        TextureDescriptor {
            size,
            mip_level_count: mips,
            usage: TextureUsages::TEXTURE_BINDING,
            ..Default::default()
        }
    }

    #[test]
    fn map_read_only_combines_with_copy_dst() {
        let limits = Limits::default();
        let ok = BufferDescriptor {
            size: 64,
            usage: BufferUsages::MAP_READ | BufferUsages::COPY_DST,
            ..Default::default()
        };
        buffer_descriptor(&ok, &limits).unwrap();
        let bad = BufferDescriptor {
            usage: BufferUsages::MAP_READ | BufferUsages::VERTEX,
            ..ok
        };
        assert_eq!(buffer_descriptor(&bad, &limits).unwrap_err().kind(), ErrorKind::Validation);
    }

    #[test]
    fn buffer_ranges_are_bounded_and_aligned() {
        buffer_range(48, 0, 48, "write").unwrap();
        assert!(buffer_range(48, 4, 48, "write").is_err());
        assert!(buffer_range(48, 2, 4, "write").is_err());
        assert!(buffer_range(48, u64::MAX - 3, 4, "write").is_err());
    }

    #[test]
    fn range_end_never_wraps() {
        assert_eq!(range_end(48, 2, 6, "index").unwrap(), 8);
        assert!(range_end(48, 40, 9, "index").is_err());
        let err = range_end(512, 256, u64::MAX, "uniform").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(range_end(u64::MAX, u64::MAX, 1, "uniform").is_err());
    }

    #[test]
    fn view_ranges_are_checked_against_the_texture() {
        let tex = texture(Extent3D { width: 64, height: 64, depth_or_array_layers: 6 }, 4);
        let all = texture_view(&tex, &TextureViewDescriptor::default()).unwrap();
        assert_eq!(all.dimension, TextureViewDimension::D2Array);
        assert_eq!((all.mip_level_count, all.array_layer_count), (4, 6));

        let cube = texture_view(
            &tex,
            &TextureViewDescriptor {
                dimension: Some(TextureViewDimension::Cube),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(cube.array_layer_count, 6);

        let bad_mips = TextureViewDescriptor {
            base_mip_level: 2,
            mip_level_count: Some(3),
            ..Default::default()
        };
        assert!(texture_view(&tex, &bad_mips).is_err());

        let single = TextureViewDescriptor {
            dimension: Some(TextureViewDimension::D2),
            base_array_layer: 5,
            ..Default::default()
        };
        assert_eq!(texture_view(&tex, &single).unwrap().array_layer_count, 1);
    }

    #[test]
    fn mip_count_cannot_exceed_chain() {
        let limits = Limits::default();
        texture_descriptor(&texture(Extent3D::d2(16, 16), 5), &limits).unwrap();
        assert!(texture_descriptor(&texture(Extent3D::d2(16, 16), 6), &limits).is_err());
    }

    #[test]
    fn kind_mismatch_in_bind_group_is_rejected() {
        let mut samplers: Arena<kind::Sampler, ()> = Arena::new(DeviceSerial::next());
        let mut layouts: Arena<kind::BindGroupLayout, ()> = Arena::new(DeviceSerial::next());
        let layout = BindGroupLayoutDescriptor {
            label: None,
            entries: vec![BindGroupLayoutEntry {
                binding: 0,
                visibility: ShaderStageFlags::FRAGMENT,
                ty: BindingType::Buffer {
                    ty: BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
            }],
        };
        let desc = BindGroupDescriptor {
            label: Some("mismatch".into()),
            layout: layouts.insert(()),
            entries: vec![BindGroupEntry {
                binding: 0,
                resource: BindingResource::Sampler(samplers.insert(())),
            }],
        };
        let err = bind_group_shape(&layout, &desc).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.message().contains("sampler"));
    }

    #[test]
    fn stride_must_cover_attributes() {
        let limits = Limits::default();
        let mut layout = VertexBufferLayoutBuilder::per_vertex()
            .attribute(0, VertexFormat::Float32x3)
            .build();
        vertex_buffers(std::slice::from_ref(&layout), &limits).unwrap();
        layout.array_stride = 8;
        assert!(vertex_buffers(&[layout], &limits).is_err());
    }

    #[test]
    fn pipeline_layout_respects_group_limit() {
        let mut limits = Limits::default();
        limits.max_bind_groups = 1;
        let mut arena: Arena<kind::BindGroupLayout, ()> = Arena::new(DeviceSerial::next());
        let desc = PipelineLayoutDescriptor {
            label: None,
            bind_group_layouts: vec![arena.insert(()), arena.insert(())],
        };
        assert!(pipeline_layout(&desc, &limits).is_err());
    }
}
