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

//! Buffer, texture, view and sampler entries of the WebGL2 device.

use super::conversions::{buffer_usage_hint, gl_texture_format, min_filter, texture_target, GlTextureFormat, IntoGl};
use super::gl::consts::*;
use super::gl::{GlContext, GlName};
use easel_core::gfx::api::*;
use easel_core::gfx::error::{GfxError, GfxResult};
use easel_core::gfx::future::GfxPromise;
use easel_core::gfx::handle::TextureId;
use easel_core::gfx::validation;

fn label(label: &Option<String>) -> &str {
    label.as_deref().unwrap_or("<unlabeled>")
}

/// Converts a byte count for a GL entry point taking `GLintptr`/`GLsizei`.
pub(crate) fn gl_size(value: u64, what: &str) -> GfxResult<i32> {
    i32::try_from(value).map_err(|_| GfxError::unsupported(format!("{what}: {value} exceeds the GL integer range")))
}

/// A live CPU view of a mapped buffer range.
#[derive(Debug)]
pub(crate) struct Mapping {
    pub mode: MapMode,
    pub range: MappedRange,
    pub data: Vec<u8>,
}

/// A `map_buffer_async` call waiting for the next device poll.
#[derive(Debug)]
pub(crate) struct PendingMap {
    pub mode: MapMode,
    pub range: MappedRange,
    pub promise: GfxPromise<GfxResult<()>>,
}

#[derive(Debug)]
pub(crate) struct GlBufferEntry {
    pub name: GlName,
    pub desc: BufferDescriptor,
    pub map_state: MapState,
    pub mapping: Option<Mapping>,
    pub pending: Option<PendingMap>,
}

impl GlBufferEntry {
    /// Creates and allocates a buffer object.
    pub fn create(gl: &dyn GlContext, desc: &BufferDescriptor) -> GfxResult<Self> {
        let size = gl_size(desc.size, "buffer size")?;
        let name = gl
            .create_buffer()
            .map_err(|e| GfxError::internal(format!("createBuffer failed: {e}")))?;
        let target = write_target(desc.usage);
        gl.bind_buffer(target, name);
        gl.buffer_data_size(target, size, buffer_usage_hint(desc.usage));
        gl.bind_buffer(target, 0);

        let (map_state, mapping) = if desc.mapped_at_creation {
            let mapping = Mapping {
                mode: MapMode::Write,
                range: MappedRange {
                    offset: 0,
                    size: desc.size,
                },
                data: vec![0; desc.size as usize],
            };
            (MapState::MappedForWrite, Some(mapping))
        } else {
            (MapState::Unmapped, None)
        };
        Ok(Self {
            name,
            desc: desc.clone(),
            map_state,
            mapping,
            pending: None,
        })
    }

    pub fn size(&self) -> u64 {
        self.desc.size
    }

    /// Target used for uploads. WebGL2 never lets an index buffer be bound
    /// anywhere but `ELEMENT_ARRAY_BUFFER`.
    pub fn write_target(&self) -> u32 {
        write_target(self.desc.usage)
    }

    /// Target used for readbacks.
    pub fn read_target(&self) -> u32 {
        if self.desc.usage.contains(BufferUsages::INDEX) {
            ELEMENT_ARRAY_BUFFER
        } else {
            COPY_READ_BUFFER
        }
    }

    /// Fails unless the buffer is unmapped with no pending map.
    pub fn ensure_unmapped(&self, what: &str) -> GfxResult<()> {
        if self.map_state == MapState::Unmapped {
            Ok(())
        } else {
            Err(GfxError::validation(format!(
                "{what}: buffer '{}' is {:?}",
                label(&self.desc.label),
                self.map_state
            )))
        }
    }

    /// Reads `len` bytes at `offset` back from GL.
    pub fn read_back(&self, gl: &dyn GlContext, offset: u64, len: u64) -> GfxResult<Vec<u8>> {
        let mut data = vec![0; len as usize];
        let target = self.read_target();
        gl.bind_buffer(target, self.name);
        gl.get_buffer_sub_data(target, gl_size(offset, "readback offset")?, &mut data);
        gl.bind_buffer(target, 0);
        Ok(data)
    }

    /// Uploads `data` at `offset`.
    pub fn upload(&self, gl: &dyn GlContext, offset: u64, data: &[u8]) -> GfxResult<()> {
        let target = self.write_target();
        gl.bind_buffer(target, self.name);
        gl.buffer_sub_data(target, gl_size(offset, "upload offset")?, data);
        gl.bind_buffer(target, 0);
        Ok(())
    }

    /// Starts an asynchronous map; the mapping lands on the next poll.
    pub fn begin_map(
        &mut self,
        mode: MapMode,
        offset: u64,
        size: Option<u64>,
        promise: GfxPromise<GfxResult<()>>,
    ) -> Result<(), (GfxError, GfxPromise<GfxResult<()>>)> {
        let checked = (|| {
            if self.map_state != MapState::Unmapped {
                return Err(GfxError::validation(format!(
                    "map_buffer_async: buffer '{}' is already {:?}",
                    label(&self.desc.label),
                    self.map_state
                )));
            }
            validation::require_buffer_usage(self.desc.usage, mode.required_usage(), "map_buffer_async")?;
            let size = size.unwrap_or_else(|| self.size().saturating_sub(offset));
            if offset % 8 != 0 {
                return Err(GfxError::validation(format!(
                    "map_buffer_async: offset {offset} is not a multiple of 8"
                )));
            }
            validation::buffer_range(self.size(), offset, size, "map_buffer_async")?;
            Ok(MappedRange { offset, size })
        })();
        match checked {
            Ok(range) => {
                self.map_state = MapState::Pending;
                self.pending = Some(PendingMap { mode, range, promise });
                Ok(())
            }
            Err(e) => Err((e, promise)),
        }
    }

    /// Resolves a pending map by reading the range back from GL.
    pub fn complete_map(&mut self, gl: &dyn GlContext) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        match self.read_back(gl, pending.range.offset, pending.range.size) {
            Ok(data) => {
                self.map_state = match pending.mode {
                    MapMode::Read => MapState::MappedForRead,
                    MapMode::Write => MapState::MappedForWrite,
                };
                self.mapping = Some(Mapping {
                    mode: pending.mode,
                    range: pending.range,
                    data,
                });
                pending.promise.resolve(Ok(()));
            }
            Err(e) => {
                self.map_state = MapState::Unmapped;
                pending.promise.resolve(Err(e));
            }
        }
    }

    /// Fails a pending map with `reason`.
    pub fn abort_map(&mut self, reason: &str) {
        if let Some(pending) = self.pending.take() {
            log::debug!("Mapping of buffer '{}' aborted: {reason}", label(&self.desc.label));
            pending.promise.resolve(Err(GfxError::validation(reason.to_owned())));
            self.map_state = MapState::Unmapped;
        }
    }

    /// Copies bytes out of the live mapping.
    pub fn mapped_bytes(&self, offset: u64, size: Option<u64>) -> GfxResult<Vec<u8>> {
        let mapping = self.mapping.as_ref().ok_or_else(|| {
            GfxError::validation(format!(
                "get_mapped_range: buffer '{}' is {:?}",
                label(&self.desc.label),
                self.map_state
            ))
        })?;
        let size = size.unwrap_or_else(|| (mapping.range.offset + mapping.range.size).saturating_sub(offset));
        if offset % 8 != 0 || size % 4 != 0 {
            return Err(GfxError::validation(format!(
                "get_mapped_range: offset {offset} must be a multiple of 8 and size {size} of 4"
            )));
        }
        if !mapping.range.covers(offset, size) {
            return Err(GfxError::validation(format!(
                "get_mapped_range: {offset}..{} lies outside the mapped {}..{}",
                offset.saturating_add(size),
                mapping.range.offset,
                mapping.range.offset + mapping.range.size
            )));
        }
        let start = (offset - mapping.range.offset) as usize;
        Ok(mapping.data[start..start + size as usize].to_vec())
    }

    /// Writes bytes into the live write mapping.
    pub fn write_mapped(&mut self, offset: u64, data: &[u8]) -> GfxResult<()> {
        let name = label(&self.desc.label).to_owned();
        let mapping = match self.mapping.as_mut() {
            Some(m) if m.mode == MapMode::Write => m,
            _ => {
                return Err(GfxError::validation(format!(
                    "write_mapped_range: buffer '{name}' is not mapped for writing"
                )));
            }
        };
        if !mapping.range.covers(offset, data.len() as u64) {
            return Err(GfxError::validation(format!(
                "write_mapped_range: {offset}..{} lies outside the mapping",
                offset.saturating_add(data.len() as u64)
            )));
        }
        let start = (offset - mapping.range.offset) as usize;
        mapping.data[start..start + data.len()].copy_from_slice(data);
        Ok(())
    }

    /// Ends the mapping, publishing written bytes.
    pub fn unmap(&mut self, gl: &dyn GlContext) -> GfxResult<()> {
        self.abort_map("mapping aborted by unmap_buffer");
        if let Some(mapping) = self.mapping.take() {
            if mapping.mode == MapMode::Write {
                self.upload(gl, mapping.range.offset, &mapping.data)?;
            }
        }
        self.map_state = MapState::Unmapped;
        Ok(())
    }
}

fn write_target(usage: BufferUsages) -> u32 {
    if usage.contains(BufferUsages::INDEX) {
        ELEMENT_ARRAY_BUFFER
    } else {
        COPY_WRITE_BUFFER
    }
}

#[derive(Debug)]
pub(crate) struct GlTextureEntry {
    /// Texture object; 0 for the canvas's default framebuffer.
    pub name: GlName,
    pub target: u32,
    pub desc: TextureDescriptor,
    pub format: GlTextureFormat,
    pub canvas: bool,
}

impl GlTextureEntry {
    /// Allocates immutable storage for `desc`.
    pub fn create(gl: &dyn GlContext, desc: &TextureDescriptor, limits: &Limits) -> GfxResult<Self> {
        validation::texture_descriptor(desc, limits)?;
        let name_label = label(&desc.label);
        let format = gl_texture_format(desc.format).ok_or_else(|| {
            GfxError::unsupported(format!("texture '{name_label}': {:?} is not available on WebGL2", desc.format))
        })?;
        if desc.sample_count != 1 {
            return Err(GfxError::unsupported(format!(
                "texture '{name_label}': multisampled textures are not available on WebGL2"
            )));
        }
        if desc.usage.contains(TextureUsages::STORAGE_BINDING) {
            return Err(GfxError::unsupported(format!(
                "texture '{name_label}': storage textures are not available on WebGL2"
            )));
        }
        if desc.view_formats.iter().any(|f| *f != desc.format) {
            return Err(GfxError::unsupported(format!(
                "texture '{name_label}': WebGL2 cannot reinterpret texture formats"
            )));
        }
        let target = texture_target(desc);
        let levels = desc.mip_level_count as i32;
        let (w, h, d) = (
            desc.size.width as i32,
            desc.size.height as i32,
            desc.size.depth_or_array_layers as i32,
        );
        let name = gl
            .create_texture()
            .map_err(|e| GfxError::internal(format!("createTexture failed: {e}")))?;
        gl.active_texture(TEXTURE0);
        gl.bind_texture(target, name);
        match target {
            TEXTURE_2D | TEXTURE_CUBE_MAP => gl.tex_storage_2d(target, levels, format.internal, w, h),
            _ => gl.tex_storage_3d(target, levels, format.internal, w, h, d),
        }
        gl.bind_texture(target, 0);
        Ok(Self {
            name,
            target,
            desc: desc.clone(),
            format,
            canvas: false,
        })
    }

    /// Stand-in texture for the drawing buffer of the canvas.
    pub fn canvas(width: u32, height: u32, format: TextureFormat) -> GfxResult<Self> {
        if !matches!(format, TextureFormat::Rgba8Unorm | TextureFormat::Rgba8UnormSrgb) {
            return Err(GfxError::unsupported(format!(
                "canvas format {format:?}: the WebGL2 drawing buffer is RGBA8"
            )));
        }
        let gl_format = gl_texture_format(format)
            .ok_or_else(|| GfxError::internal(format!("no GL format for canvas format {format:?}")))?;
        Ok(Self {
            name: 0,
            target: TEXTURE_2D,
            desc: TextureDescriptor {
                label: Some("canvas".to_owned()),
                size: Extent3D::d2(width, height),
                format,
                usage: TextureUsages::RENDER_ATTACHMENT,
                ..Default::default()
            },
            format: gl_format,
            canvas: true,
        })
    }

    /// GL target for the cube face or plain 2D image at `layer`.
    pub fn image_target(&self, layer: u32) -> u32 {
        if self.target == TEXTURE_CUBE_MAP {
            TEXTURE_CUBE_MAP_POSITIVE_X + layer
        } else {
            self.target
        }
    }

    /// `true` when images live in layers of a 3D-style target.
    pub fn is_layered(&self) -> bool {
        matches!(self.target, TEXTURE_2D_ARRAY | TEXTURE_3D)
    }
}

#[derive(Debug)]
pub(crate) struct GlTextureViewEntry {
    pub texture: TextureId,
    pub view: ResolvedTextureView,
}

impl GlTextureViewEntry {
    /// Resolves a view, rejecting reinterpretations GL cannot express.
    pub fn create(texture_id: TextureId, texture: &GlTextureEntry, desc: &TextureViewDescriptor) -> GfxResult<Self> {
        let view = validation::texture_view(&texture.desc, desc)?;
        let single_image = view.dimension == TextureViewDimension::D2 && view.array_layer_count == 1;
        let native = super::conversions::view_dimension_for_target(texture.target);
        let matches_storage = view.dimension == native
            || (view.dimension == TextureViewDimension::D1 && native == TextureViewDimension::D2);
        if !single_image && !matches_storage {
            return Err(GfxError::unsupported(format!(
                "texture view '{}': {:?} view over a texture stored as {native:?}",
                label(&desc.label),
                view.dimension
            )));
        }
        if texture.canvas && (view.base_mip_level != 0 || view.aspect != TextureAspect::All) {
            return Err(GfxError::validation("canvas views must cover the whole drawing buffer"));
        }
        Ok(Self {
            texture: texture_id,
            view,
        })
    }

    /// `true` when the view can be sampled as its texture's GL target.
    pub fn samples_whole_target(&self, texture: &GlTextureEntry) -> bool {
        let native = super::conversions::view_dimension_for_target(texture.target);
        self.view.dimension == native
            || (self.view.dimension == TextureViewDimension::D1 && native == TextureViewDimension::D2)
    }
}

#[derive(Debug)]
pub(crate) struct GlSamplerEntry {
    pub name: GlName,
    pub desc: SamplerDescriptor,
}

impl GlSamplerEntry {
    /// Creates a sampler object and sets all of its parameters.
    pub fn create(gl: &dyn GlContext, desc: &SamplerDescriptor) -> GfxResult<Self> {
        validation::sampler_descriptor(desc)?;
        let name = gl
            .create_sampler()
            .map_err(|e| GfxError::internal(format!("createSampler failed: {e}")))?;
        gl.sampler_parameter_i32(name, TEXTURE_MIN_FILTER, min_filter(desc.min_filter, desc.mipmap_filter) as i32);
        gl.sampler_parameter_i32(name, TEXTURE_MAG_FILTER, desc.mag_filter.into_gl() as i32);
        gl.sampler_parameter_i32(name, TEXTURE_WRAP_S, desc.address_mode_u.into_gl() as i32);
        gl.sampler_parameter_i32(name, TEXTURE_WRAP_T, desc.address_mode_v.into_gl() as i32);
        gl.sampler_parameter_i32(name, TEXTURE_WRAP_R, desc.address_mode_w.into_gl() as i32);
        gl.sampler_parameter_f32(name, TEXTURE_MIN_LOD, desc.lod_min_clamp);
        gl.sampler_parameter_f32(name, TEXTURE_MAX_LOD, desc.lod_max_clamp);
        if let Some(compare) = desc.compare {
            gl.sampler_parameter_i32(name, TEXTURE_COMPARE_MODE, COMPARE_REF_TO_TEXTURE as i32);
            gl.sampler_parameter_i32(name, TEXTURE_COMPARE_FUNC, compare.into_gl() as i32);
        }
        if desc.anisotropy_clamp > 1 {
            if gl.supports_extension("EXT_texture_filter_anisotropic") {
                gl.sampler_parameter_f32(name, TEXTURE_MAX_ANISOTROPY_EXT, f32::from(desc.anisotropy_clamp));
            } else {
                log::debug!(
                    "sampler '{}': anisotropic filtering unavailable, clamp ignored",
                    label(&desc.label)
                );
            }
        }
        Ok(Self {
            name,
            desc: desc.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::webgl2::headless::HeadlessGl;
    use easel_core::gfx::error::ErrorKind;
    use easel_core::gfx::future::GfxFuture;

    fn readback_buffer(gl: &HeadlessGl) -> GlBufferEntry {
        let desc = BufferDescriptor {
            label: Some("readback".into()),
            size: 16,
            usage: BufferUsages::MAP_READ | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        };
        GlBufferEntry::create(gl, &desc).unwrap()
    }

    #[test]
    fn map_resolves_on_completion_only() {
        let gl = HeadlessGl::new();
        let mut buffer = readback_buffer(&gl);
        buffer.upload(&gl, 0, &[7; 16]).unwrap();

        let (promise, mut future) = GfxFuture::pending();
        buffer.begin_map(MapMode::Read, 0, None, promise).unwrap();
        assert_eq!(buffer.map_state, MapState::Pending);
        assert!(buffer.mapped_bytes(0, None).is_err());

        buffer.complete_map(&gl);
        assert_eq!(future.try_take(), Some(Ok(())));
        assert_eq!(buffer.map_state, MapState::MappedForRead);
        assert_eq!(buffer.mapped_bytes(8, Some(4)).unwrap(), vec![7; 4]);
        assert!(buffer.write_mapped(0, &[1]).is_err());

        buffer.unmap(&gl).unwrap();
        assert_eq!(buffer.map_state, MapState::Unmapped);
    }

    #[test]
    fn unmap_aborts_a_pending_map() {
        let gl = HeadlessGl::new();
        let mut buffer = readback_buffer(&gl);
        let (promise, mut future) = GfxFuture::pending();
        buffer.begin_map(MapMode::Read, 0, Some(8), promise).unwrap();
        buffer.unmap(&gl).unwrap();
        assert_eq!(future.try_take().unwrap().unwrap_err().kind(), ErrorKind::Validation);
    }

    #[test]
    fn write_mode_needs_map_write_usage() {
        let gl = HeadlessGl::new();
        let mut buffer = readback_buffer(&gl);
        let (promise, _future) = GfxFuture::pending();
        let (err, _promise) = buffer.begin_map(MapMode::Write, 0, None, promise).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(buffer.map_state, MapState::Unmapped);
    }

    #[test]
    fn mapped_at_creation_publishes_on_unmap() {
        let gl = HeadlessGl::new();
        let desc = BufferDescriptor {
            label: None,
            size: 8,
            usage: BufferUsages::VERTEX,
            mapped_at_creation: true,
        };
        let mut buffer = GlBufferEntry::create(&gl, &desc).unwrap();
        buffer.write_mapped(4, &[1, 2, 3, 4]).unwrap();
        buffer.unmap(&gl).unwrap();
        assert_eq!(gl.buffer_contents(buffer.name).unwrap(), vec![0, 0, 0, 0, 1, 2, 3, 4]);
    }

    #[test]
    fn cube_textures_accept_single_face_views_only_for_attachments() {
        let gl = HeadlessGl::new();
        let desc = TextureDescriptor {
            size: Extent3D {
                width: 16,
                height: 16,
                depth_or_array_layers: 6,
            },
            usage: TextureUsages::TEXTURE_BINDING | TextureUsages::RENDER_ATTACHMENT,
            ..Default::default()
        };
        let texture = GlTextureEntry::create(&gl, &desc, &Limits::default()).unwrap();
        assert_eq!(texture.target, TEXTURE_CUBE_MAP);

        let mut ids: easel_core::gfx::handle::Arena<easel_core::gfx::handle::kind::Texture, ()> =
            easel_core::gfx::handle::Arena::new(easel_core::gfx::handle::DeviceSerial::next());
        let id = ids.insert(());
        let face = TextureViewDescriptor {
            dimension: Some(TextureViewDimension::D2),
            base_array_layer: 2,
            ..Default::default()
        };
        let view = GlTextureViewEntry::create(id, &texture, &face).unwrap();
        assert!(!view.samples_whole_target(&texture));
        let array = TextureViewDescriptor {
            dimension: Some(TextureViewDimension::D2Array),
            ..Default::default()
        };
        assert_eq!(
            GlTextureViewEntry::create(id, &texture, &array).unwrap_err().kind(),
            ErrorKind::Unsupported
        );
    }

    #[test]
    fn bgra_textures_are_unsupported() {
        let gl = HeadlessGl::new();
        let desc = TextureDescriptor {
            format: TextureFormat::Bgra8Unorm,
            usage: TextureUsages::TEXTURE_BINDING,
            ..Default::default()
        };
        let err = GlTextureEntry::create(&gl, &desc, &Limits::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
    }
}
