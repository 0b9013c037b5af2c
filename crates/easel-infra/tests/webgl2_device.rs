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

//! Integration tests for the WebGL2 backend, run against `HeadlessGl`.
//!
//! These drive the public `Gfx*` traits end to end: resources, queue
//! uploads, buffer mapping, error scopes, encoders and device loss.

use easel_core::gfx::*;
use easel_infra::graphics::webgl2::consts;
use easel_infra::graphics::webgl2::headless::GlCall;
use easel_infra::{HeadlessGl, WebGl2Adapter};
use std::cell::RefCell;
use std::rc::Rc;

const VERTEX_SHADER: &str = "#version 300 es
in vec2 a_loc0;
void main() { gl_Position = vec4(a_loc0, 0.0, 1.0); }
";

const FRAGMENT_SHADER: &str = "#version 300 es
precision mediump float;
out vec4 color;
void main() { color = vec4(1.0, 0.5, 0.0, 1.0); }
";

/// Helper: a device over a fresh headless context.
fn device_on(gl: Rc<HeadlessGl>) -> Box<dyn GfxDevice> {
    let _ = env_logger::builder().is_test(true).try_init();
    let adapter = WebGl2Adapter::new(gl).expect("headless adapter");
    pollster::block_on(adapter.request_device(&DeviceDescriptor::default())).expect("headless device")
}

fn device() -> (Rc<HeadlessGl>, Box<dyn GfxDevice>) {
    let gl = Rc::new(HeadlessGl::new());
    (gl.clone(), device_on(gl))
}

fn buffer(device: &dyn GfxDevice, size: u64, usage: BufferUsages) -> BufferId {
    device
        .create_buffer(&BufferDescriptor {
            label: Some("test buffer".into()),
            size,
            usage,
            mapped_at_creation: false,
        })
        .expect("buffer creation")
}

fn read_back(device: &dyn GfxDevice, id: BufferId) -> Vec<u8> {
    pollster::block_on(device.map_buffer_async(id, MapMode::Read, 0, None)).expect("map");
    let bytes = device.get_mapped_range(id, 0, None).expect("mapped range");
    device.unmap_buffer(id).expect("unmap");
    bytes
}

// ─────────────────────────────────────────────────────────────────────────────
// Buffers
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_written_bytes_come_back_through_a_read_map() {
    let (_gl, device) = device();
    let id = buffer(&*device, 16, BufferUsages::MAP_READ | BufferUsages::COPY_DST);
    device.queue().write_buffer(id, 4, &[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();

    let future = device.map_buffer_async(id, MapMode::Read, 0, None);
    assert_eq!(device.buffer_map_state(id).unwrap(), MapState::Pending);
    pollster::block_on(future).unwrap();
    assert_eq!(device.buffer_map_state(id).unwrap(), MapState::MappedForRead);

    let bytes = device.get_mapped_range(id, 0, None).unwrap();
    assert_eq!(bytes, [0, 0, 0, 0, 1, 2, 3, 4, 5, 6, 7, 8, 0, 0, 0, 0]);
    device.unmap_buffer(id).unwrap();
    assert_eq!(device.buffer_map_state(id).unwrap(), MapState::Unmapped);
}

#[test]
fn test_mapped_at_creation_contents_land_on_unmap() {
    let (_gl, device) = device();
    let id = device
        .create_buffer(&BufferDescriptor {
            label: None,
            size: 8,
            usage: BufferUsages::MAP_READ | BufferUsages::COPY_DST,
            mapped_at_creation: true,
        })
        .unwrap();
    assert_eq!(device.buffer_map_state(id).unwrap(), MapState::MappedForWrite);
    device.write_mapped_range(id, 0, &[9, 9, 9, 9, 7, 7, 7, 7]).unwrap();
    device.unmap_buffer(id).unwrap();
    assert_eq!(read_back(&*device, id), [9, 9, 9, 9, 7, 7, 7, 7]);
}

#[test]
fn test_buffers_in_use_by_a_map_reject_queue_writes() {
    let (_gl, device) = device();
    let id = buffer(&*device, 8, BufferUsages::MAP_READ | BufferUsages::COPY_DST);
    let _pending = device.map_buffer_async(id, MapMode::Read, 0, None);
    let err = device.queue().write_buffer(id, 0, &[0; 4]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn test_unaligned_queue_writes_are_rejected() {
    let (_gl, device) = device();
    let id = buffer(&*device, 16, BufferUsages::COPY_DST | BufferUsages::VERTEX);
    let err = device.queue().write_buffer(id, 2, &[0; 4]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn test_destroyed_ids_go_stale() {
    let (gl, device) = device();
    let before = gl.live_objects();
    let id = buffer(&*device, 16, BufferUsages::VERTEX);
    assert_eq!(gl.live_objects(), before + 1);
    device.destroy_buffer(id).unwrap();
    assert_eq!(gl.live_objects(), before);
    let err = device.buffer_descriptor(id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn test_copies_move_bytes_between_buffers() {
    let (_gl, device) = device();
    let src = buffer(&*device, 8, BufferUsages::COPY_SRC | BufferUsages::COPY_DST);
    let dst = buffer(&*device, 8, BufferUsages::COPY_DST | BufferUsages::MAP_READ);
    device.queue().write_buffer(src, 0, &[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();

    let mut encoder = device.create_command_encoder(&CommandEncoderDescriptor::default()).unwrap();
    encoder.copy_buffer_to_buffer(src, 4, dst, 0, 4);
    let commands = encoder.finish().unwrap();
    drop(encoder);
    device.queue().submit(&[commands]).unwrap();

    assert_eq!(read_back(&*device, dst), [5, 6, 7, 8, 0, 0, 0, 0]);
}

// ─────────────────────────────────────────────────────────────────────────────
// Error scopes
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_validation_scope_captures_the_first_error() {
    let (_gl, device) = device();
    device.push_error_scope(ErrorFilter::Validation);
    let bad = BufferDescriptor {
        label: Some("bad".into()),
        size: 16,
        usage: BufferUsages::MAP_READ | BufferUsages::VERTEX,
        mapped_at_creation: false,
    };
    let returned = device.create_buffer(&bad).unwrap_err();
    let _ = device.create_buffer(&BufferDescriptor { size: 0, ..bad });

    let captured = device.pop_error_scope().unwrap().expect("captured error");
    assert_eq!(captured, returned);
    assert!(device.pop_error_scope().is_err(), "stack is empty again");
}

#[test]
fn test_scopes_only_capture_their_own_filter() {
    let gl = Rc::new(HeadlessGl::new().with_memory_budget(64));
    let device = device_on(gl);
    device.push_error_scope(ErrorFilter::OutOfMemory);
    device.push_error_scope(ErrorFilter::Validation);

    let err = device
        .create_buffer(&BufferDescriptor {
            label: Some("too big".into()),
            size: 1024,
            usage: BufferUsages::VERTEX,
            mapped_at_creation: false,
        })
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OutOfMemory);

    assert_eq!(device.pop_error_scope().unwrap(), None);
    let oom = device.pop_error_scope().unwrap().expect("out-of-memory captured");
    assert_eq!(oom.kind(), ErrorKind::OutOfMemory);
}

#[test]
fn test_uncaptured_errors_reach_the_handler() {
    let (_gl, device) = device();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    device.on_uncaptured_error(Box::new(move |error| sink.borrow_mut().push(error.kind())));

    let id = buffer(&*device, 16, BufferUsages::VERTEX);
    let _ = device.queue().write_buffer(id, 0, &[0; 4]);
    assert_eq!(*seen.borrow(), [ErrorKind::Validation]);
}

#[test]
fn test_native_gl_errors_surface_as_internal() {
    let (gl, device) = device();
    device.push_error_scope(ErrorFilter::Internal);
    gl.inject_error(0x0502);
    let error = device.pop_error_scope().unwrap().expect("drained native error");
    assert_eq!(error.kind(), ErrorKind::Internal);
}

// ─────────────────────────────────────────────────────────────────────────────
// Shaders, pipelines and passes
// ─────────────────────────────────────────────────────────────────────────────

fn glsl_module(device: &dyn GfxDevice) -> GfxResult<ShaderModuleId> {
    device.create_shader_module(&ShaderModuleDescriptor {
        label: Some("triangle".into()),
        sources: vec![
            ShaderSource::Native {
                stage: ShaderStage::Vertex,
                code: VERTEX_SHADER.into(),
            },
            ShaderSource::Native {
                stage: ShaderStage::Fragment,
                code: FRAGMENT_SHADER.into(),
            },
        ],
        ..Default::default()
    })
}

fn triangle_pipeline(device: &dyn GfxDevice, module: ShaderModuleId) -> GfxResult<RenderPipelineId> {
    device.create_render_pipeline(&RenderPipelineDescriptor {
        label: Some("triangle".into()),
        layout: PipelineLayoutChoice::Auto,
        vertex: VertexState {
            stage: ProgrammableStage::new(module),
            buffers: vec![VertexBufferLayoutBuilder::per_vertex()
                .attribute(0, VertexFormat::Float32x2)
                .build()],
        },
        primitive: PrimitiveState::default(),
        depth_stencil: None,
        multisample: MultisampleState::default(),
        fragment: Some(FragmentState {
            stage: ProgrammableStage::new(module),
            targets: vec![Some(ColorTargetState::new(TextureFormat::Rgba8Unorm))],
        }),
    })
}

#[test]
fn test_wgsl_only_modules_are_unsupported() {
    let (_gl, device) = device();
    let err = device
        .create_shader_module(&ShaderModuleDescriptor {
            sources: vec![ShaderSource::Canonical("@vertex fn main() {}".into())],
            ..Default::default()
        })
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unsupported);
}

#[test]
fn test_a_triangle_draws_into_an_offscreen_target() {
    let (gl, device) = device();
    let module = glsl_module(&*device).unwrap();
    let pipeline = triangle_pipeline(&*device, module).unwrap();

    let target = device
        .create_texture(&TextureDescriptor {
            label: Some("target".into()),
            size: Extent3D::d2(4, 4),
            usage: TextureUsages::RENDER_ATTACHMENT,
            ..Default::default()
        })
        .unwrap();
    let view = device.create_texture_view(target, &TextureViewDescriptor::default()).unwrap();

    let vertices: [f32; 6] = [0.0, 0.5, -0.5, -0.5, 0.5, -0.5];
    let vertex_buffer = device
        .create_buffer_init(Some("vertices"), BufferUsages::VERTEX, bytemuck::cast_slice(&vertices))
        .unwrap();

    gl.clear_calls();
    let mut encoder = device.create_command_encoder(&CommandEncoderDescriptor::default()).unwrap();
    {
        let mut pass = encoder.begin_render_pass(&RenderPassDescriptor {
            label: Some("main".into()),
            color_attachments: vec![Some(RenderPassColorAttachment::clear(view, Color::new(0.0, 0.0, 0.0, 1.0)))],
            depth_stencil_attachment: None,
        });
        pass.set_pipeline(pipeline);
        pass.set_vertex_buffer(0, vertex_buffer, 0, None);
        pass.draw(0..3, 0..1);
        pass.end().unwrap();
    }
    let commands = encoder.finish().unwrap();
    drop(encoder);
    device.queue().submit(&[commands]).unwrap();

    let calls = gl.calls();
    assert!(calls.iter().any(|c| matches!(c, GlCall::ClearBufferfv { draw_buffer: 0, .. })));
    assert!(calls
        .iter()
        .any(|c| matches!(c, GlCall::DrawArrays { first: 0, count: 3, instances: 1, .. })));
    assert!(calls.contains(&GlCall::Flush));
}

#[test]
fn test_drawing_past_the_vertex_buffer_invalidates_the_encoder() {
    let (_gl, device) = device();
    let module = glsl_module(&*device).unwrap();
    let pipeline = triangle_pipeline(&*device, module).unwrap();
    let target = device
        .create_texture(&TextureDescriptor {
            size: Extent3D::d2(4, 4),
            usage: TextureUsages::RENDER_ATTACHMENT,
            ..Default::default()
        })
        .unwrap();
    let view = device.create_texture_view(target, &TextureViewDescriptor::default()).unwrap();
    let vertex_buffer = buffer(&*device, 16, BufferUsages::VERTEX);

    let mut encoder = device.create_command_encoder(&CommandEncoderDescriptor::default()).unwrap();
    {
        let mut pass = encoder.begin_render_pass(&RenderPassDescriptor {
            label: None,
            color_attachments: vec![Some(RenderPassColorAttachment::load(view))],
            depth_stencil_attachment: None,
        });
        pass.set_pipeline(pipeline);
        pass.set_vertex_buffer(0, vertex_buffer, 0, None);
        pass.draw(0..3, 0..1);
        assert_eq!(pass.end().unwrap_err().kind(), ErrorKind::Validation);
    }
    assert_eq!(encoder.finish().unwrap_err().kind(), ErrorKind::Validation);
}

#[test]
fn test_dropping_a_pass_without_end_invalidates_the_encoder() {
    let (_gl, device) = device();
    let target = device
        .create_texture(&TextureDescriptor {
            size: Extent3D::d2(2, 2),
            usage: TextureUsages::RENDER_ATTACHMENT,
            ..Default::default()
        })
        .unwrap();
    let view = device.create_texture_view(target, &TextureViewDescriptor::default()).unwrap();

    let mut encoder = device.create_command_encoder(&CommandEncoderDescriptor::default()).unwrap();
    drop(encoder.begin_render_pass(&RenderPassDescriptor {
        label: None,
        color_attachments: vec![Some(RenderPassColorAttachment::load(view))],
        depth_stencil_attachment: None,
    }));
    let err = encoder.finish().unwrap_err();
    assert!(err.message().contains("without end()"), "{err}");
}

#[test]
fn test_command_buffers_finish_and_submit_once() {
    let (_gl, device) = device();
    let mut encoder = device.create_command_encoder(&CommandEncoderDescriptor::default()).unwrap();
    let commands = encoder.finish().unwrap();
    assert_eq!(encoder.finish().unwrap_err().kind(), ErrorKind::Validation);
    drop(encoder);

    device.queue().submit(&[commands]).unwrap();
    assert_eq!(device.queue().submit(&[commands]).unwrap_err().kind(), ErrorKind::Validation);
}

#[test]
fn test_compute_is_unsupported() {
    let (_gl, device) = device();
    let module = glsl_module(&*device).unwrap();
    let err = device
        .create_compute_pipeline(&ComputePipelineDescriptor {
            label: None,
            layout: PipelineLayoutChoice::Auto,
            stage: ProgrammableStage::new(module),
        })
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unsupported);

    let mut encoder = device.create_command_encoder(&CommandEncoderDescriptor::default()).unwrap();
    let pass = encoder.begin_compute_pass(&ComputePassDescriptor::default());
    assert_eq!(pass.end().unwrap_err().kind(), ErrorKind::Unsupported);
}

// ─────────────────────────────────────────────────────────────────────────────
// Device loss
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_destroy_resolves_lost_and_fails_later_calls() {
    let (gl, device) = device();
    let id = buffer(&*device, 16, BufferUsages::MAP_READ | BufferUsages::COPY_DST);
    let pending = device.map_buffer_async(id, MapMode::Read, 0, None);
    let lost = device.lost();

    device.destroy();
    device.destroy();

    let info = pollster::block_on(lost);
    assert_eq!(info.reason, DeviceLostReason::Destroyed);
    assert!(pollster::block_on(pending).is_err(), "pending map is aborted");
    assert_eq!(gl.live_objects(), 0);
    let err = device.create_buffer(&BufferDescriptor::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DeviceLost);
}

#[test]
fn test_a_lost_context_loses_the_device() {
    let (gl, device) = device();
    gl.lose_context();
    let err = device
        .create_buffer(&BufferDescriptor {
            size: 4,
            usage: BufferUsages::VERTEX,
            ..Default::default()
        })
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DeviceLost);
    let info = pollster::block_on(device.lost());
    assert_eq!(info.reason, DeviceLostReason::Unknown);
}

// ─────────────────────────────────────────────────────────────────────────────
// Scenarios
// ─────────────────────────────────────────────────────────────────────────────

const OFFSET_VERTEX_SHADER: &str = "#version 300 es
in vec3 a_loc0;
layout(std140) uniform group0_binding0 {
    vec4 u_offset;
};
void main() { gl_Position = vec4(a_loc0, 1.0) + u_offset; }
";

/// Helper: a 4×4 color target view.
fn target_view(device: &dyn GfxDevice) -> TextureViewId {
    let texture = device
        .create_texture(&TextureDescriptor {
            label: Some("target".into()),
            size: Extent3D::d2(4, 4),
            usage: TextureUsages::RENDER_ATTACHMENT,
            ..Default::default()
        })
        .unwrap();
    device.create_texture_view(texture, &TextureViewDescriptor::default()).unwrap()
}

fn pass_descriptor(view: TextureViewId) -> RenderPassDescriptor {
    RenderPassDescriptor {
        label: None,
        color_attachments: vec![Some(RenderPassColorAttachment::clear(view, Color::new(0.0, 0.0, 0.0, 1.0)))],
        depth_stencil_attachment: None,
    }
}

#[test]
fn test_quad_of_float3_vertices_draws_and_the_encoder_is_single_use() {
    let (gl, device) = device();
    let module = device
        .create_shader_module(&ShaderModuleDescriptor {
            label: Some("quad".into()),
            sources: vec![
                ShaderSource::Native {
                    stage: ShaderStage::Vertex,
                    code: "#version 300 es\nin vec3 a_loc0;\nvoid main() { gl_Position = vec4(a_loc0, 1.0); }\n".into(),
                },
                ShaderSource::Native {
                    stage: ShaderStage::Fragment,
                    code: FRAGMENT_SHADER.into(),
                },
            ],
            ..Default::default()
        })
        .unwrap();
    let layout = VertexBufferLayoutBuilder::per_vertex()
        .attribute(0, VertexFormat::Float32x3)
        .build();
    assert_eq!(layout.array_stride, 12);

    let pipeline = device
        .create_render_pipeline(&RenderPipelineDescriptor {
            label: Some("quad".into()),
            layout: PipelineLayoutChoice::Auto,
            vertex: VertexState {
                stage: ProgrammableStage::new(module),
                buffers: vec![layout],
            },
            primitive: PrimitiveState::default(),
            depth_stencil: None,
            multisample: MultisampleState::default(),
            fragment: Some(FragmentState {
                stage: ProgrammableStage::new(module),
                targets: vec![Some(ColorTargetState::new(TextureFormat::Rgba8Unorm))],
            }),
        })
        .unwrap();

    let quad: [f32; 12] = [-1.0, -1.0, 0.0, 1.0, -1.0, 0.0, -1.0, 1.0, 0.0, 1.0, 1.0, 0.0];
    let vertices = buffer(&*device, 48, BufferUsages::VERTEX | BufferUsages::COPY_DST);
    device.queue().write_buffer(vertices, 0, bytemuck::cast_slice(&quad)).unwrap();
    let view = target_view(&*device);

    gl.clear_calls();
    let mut encoder = device.create_command_encoder(&CommandEncoderDescriptor::default()).unwrap();
    {
        let mut pass = encoder.begin_render_pass(&pass_descriptor(view));
        pass.set_pipeline(pipeline);
        pass.set_vertex_buffer(0, vertices, 0, None);
        pass.draw(0..4, 0..1);
        pass.end().unwrap();
    }
    let commands = encoder.finish().unwrap();
    device.queue().submit(&[commands]).unwrap();

    assert!(gl
        .calls()
        .iter()
        .any(|c| matches!(c, GlCall::DrawArrays { count: 4, instances: 1, .. })));
    assert!(!gl.is_enabled(consts::BLEND), "no blend state disables blending");
    assert!(!gl.is_enabled(consts::DEPTH_TEST), "no depth state disables the depth test");
    assert!(encoder.begin_render_pass(&pass_descriptor(view)).end().is_err());
    assert_eq!(encoder.finish().unwrap_err().kind(), ErrorKind::Validation);
}

#[test]
fn test_pipeline_state_is_applied_before_bind_groups() {
    let (gl, device) = device();
    let module = device
        .create_shader_module(&ShaderModuleDescriptor {
            label: Some("offset".into()),
            sources: vec![
                ShaderSource::Native {
                    stage: ShaderStage::Vertex,
                    code: OFFSET_VERTEX_SHADER.into(),
                },
                ShaderSource::Native {
                    stage: ShaderStage::Fragment,
                    code: FRAGMENT_SHADER.into(),
                },
            ],
            ..Default::default()
        })
        .unwrap();
    let group_layout = device
        .create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("uniforms".into()),
            entries: vec![BindGroupLayoutEntry {
                binding: 0,
                visibility: ShaderStageFlags::VERTEX_FRAGMENT,
                ty: BindingType::Buffer {
                    ty: BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
            }],
        })
        .unwrap();
    let pipeline_layout = device
        .create_pipeline_layout(&PipelineLayoutDescriptor {
            label: None,
            bind_group_layouts: vec![group_layout],
        })
        .unwrap();
    let pipeline = device
        .create_render_pipeline(&RenderPipelineDescriptor {
            label: Some("offset".into()),
            layout: PipelineLayoutChoice::Explicit(pipeline_layout),
            vertex: VertexState {
                stage: ProgrammableStage::new(module),
                buffers: vec![VertexBufferLayoutBuilder::per_vertex()
                    .attribute(0, VertexFormat::Float32x3)
                    .build()],
            },
            primitive: PrimitiveState::default(),
            depth_stencil: None,
            multisample: MultisampleState::default(),
            fragment: Some(FragmentState {
                stage: ProgrammableStage::new(module),
                targets: vec![Some(ColorTargetState::new(TextureFormat::Rgba8Unorm))],
            }),
        })
        .unwrap();

    let uniforms = device
        .create_buffer_init(Some("offset"), BufferUsages::UNIFORM, bytemuck::cast_slice(&[0.25f32; 4]))
        .unwrap();
    let group = device
        .create_bind_group(&BindGroupDescriptor {
            label: None,
            layout: group_layout,
            entries: vec![BindGroupEntry {
                binding: 0,
                resource: BindingResource::Buffer(BufferBinding {
                    buffer: uniforms,
                    offset: 0,
                    size: None,
                }),
            }],
        })
        .unwrap();
    let vertices = buffer(&*device, 36, BufferUsages::VERTEX);
    let view = target_view(&*device);

    gl.clear_calls();
    let mut encoder = device.create_command_encoder(&CommandEncoderDescriptor::default()).unwrap();
    {
        let mut pass = encoder.begin_render_pass(&pass_descriptor(view));
        pass.set_bind_group(0, Some(group), &[]);
        pass.set_pipeline(pipeline);
        pass.set_vertex_buffer(0, vertices, 0, None);
        pass.draw(0..3, 0..1);
        pass.end().unwrap();
    }
    encoder.finish().unwrap();

    let calls = gl.calls();
    let program = calls.iter().rposition(|c| matches!(c, GlCall::UseProgram(_)));
    let block = calls.iter().rposition(|c| matches!(c, GlCall::BindBufferRange { .. }));
    let draw = calls.iter().position(GlCall::is_draw);
    assert!(program.is_some() && block.is_some() && draw.is_some(), "{calls:#?}");
    assert!(program < block, "program bound before group 0");
    assert!(block < draw, "groups bound before the draw");
}

#[test]
fn test_syntax_errors_fail_pipeline_creation_with_diagnostics() {
    let (_gl, device) = device();
    let module = device
        .create_shader_module(&ShaderModuleDescriptor {
            label: Some("broken".into()),
            sources: vec![
                ShaderSource::Native {
                    stage: ShaderStage::Vertex,
                    code: VERTEX_SHADER.into(),
                },
                ShaderSource::Native {
                    stage: ShaderStage::Fragment,
                    code: "#version 300 es\nprecision mediump float;\nout vec4 color;\nvoid main() {\n}\n}\n".into(),
                },
            ],
            ..Default::default()
        })
        .unwrap();

    let err = triangle_pipeline(&*device, module).unwrap_err();
    match &err {
        GfxError::ShaderCompilation { stage, message, .. } => {
            assert_eq!(*stage, Some(ShaderStage::Fragment));
            assert!(!message.is_empty());
        }
        other => panic!("expected a shader compilation error, got {other:?}"),
    }
    let info = device.get_compilation_info(module).unwrap();
    assert!(info
        .iter()
        .any(|m| m.severity == CompilationMessageType::Error && m.stage == Some(ShaderStage::Fragment)));
}

#[test]
fn test_only_one_render_pass_may_be_open() {
    let (_gl, device) = device();
    let view = target_view(&*device);
    let mut first = device.create_command_encoder(&CommandEncoderDescriptor::default()).unwrap();
    let mut second = device.create_command_encoder(&CommandEncoderDescriptor::default()).unwrap();

    let open = first.begin_render_pass(&pass_descriptor(view));
    let rejected = second.begin_render_pass(&pass_descriptor(view));
    assert_eq!(rejected.end().unwrap_err().kind(), ErrorKind::Validation);
    open.end().unwrap();
    assert!(first.finish().is_ok());
    assert!(second.finish().is_err());
}

#[test]
fn test_indirect_draws_read_their_arguments_back() {
    let (gl, device) = device();
    let module = glsl_module(&*device).unwrap();
    let pipeline = triangle_pipeline(&*device, module).unwrap();
    let args = DrawIndirectArgs {
        vertex_count: 3,
        instance_count: 2,
        first_vertex: 0,
        first_instance: 0,
    };
    let indirect = device
        .create_buffer_init(Some("args"), BufferUsages::INDIRECT, bytemuck::bytes_of(&args))
        .unwrap();
    let vertices = buffer(&*device, 24, BufferUsages::VERTEX);
    let view = target_view(&*device);

    gl.clear_calls();
    let mut encoder = device.create_command_encoder(&CommandEncoderDescriptor::default()).unwrap();
    {
        let mut pass = encoder.begin_render_pass(&pass_descriptor(view));
        pass.set_pipeline(pipeline);
        pass.set_vertex_buffer(0, vertices, 0, None);
        pass.draw_indirect(indirect, 0);
        pass.end().unwrap();
    }
    encoder.finish().unwrap();

    let calls = gl.calls();
    assert!(calls.iter().any(|c| matches!(c, GlCall::GetBufferSubData { len: 16, .. })));
    assert!(calls
        .iter()
        .any(|c| matches!(c, GlCall::DrawArrays { count: 3, instances: 2, .. })));
}

#[test]
fn test_canvas_texture_renders_to_the_default_framebuffer() {
    let _ = env_logger::builder().is_test(true).try_init();
    let gl = Rc::new(HeadlessGl::new());
    let adapter = WebGl2Adapter::new(gl.clone()).unwrap();
    let device = adapter.request_webgl2_device(&DeviceDescriptor::default()).unwrap();

    assert_eq!(
        device.create_canvas_texture(4, 4, TextureFormat::Rgba16Float).unwrap_err().kind(),
        ErrorKind::Unsupported
    );
    let canvas = device.create_canvas_texture(4, 4, TextureFormat::Rgba8Unorm).unwrap();
    let view = device.create_texture_view(canvas, &TextureViewDescriptor::default()).unwrap();
    let offscreen = target_view(&device);

    gl.clear_calls();
    let mut encoder = device.create_command_encoder(&CommandEncoderDescriptor::default()).unwrap();
    encoder.begin_render_pass(&pass_descriptor(view)).end().unwrap();
    let shared = encoder.begin_render_pass(&RenderPassDescriptor {
        label: None,
        color_attachments: vec![
            Some(RenderPassColorAttachment::load(view)),
            Some(RenderPassColorAttachment::load(offscreen)),
        ],
        depth_stencil_attachment: None,
    });
    assert_eq!(shared.end().unwrap_err().kind(), ErrorKind::Validation);

    let calls = gl.calls();
    assert!(calls.contains(&GlCall::BindFramebuffer {
        target: consts::FRAMEBUFFER,
        framebuffer: 0
    }));
    assert!(calls.contains(&GlCall::DrawBuffers(vec![consts::BACK])));
}

// ─────────────────────────────────────────────────────────────────────────────
// Range checks
// ─────────────────────────────────────────────────────────────────────────────

fn offset_module(device: &dyn GfxDevice) -> ShaderModuleId {
    device
        .create_shader_module(&ShaderModuleDescriptor {
            label: Some("offset".into()),
            sources: vec![
                ShaderSource::Native {
                    stage: ShaderStage::Vertex,
                    code: OFFSET_VERTEX_SHADER.into(),
                },
                ShaderSource::Native {
                    stage: ShaderStage::Fragment,
                    code: FRAGMENT_SHADER.into(),
                },
            ],
            ..Default::default()
        })
        .unwrap()
}

fn offset_pipeline(device: &dyn GfxDevice, module: ShaderModuleId, layout: PipelineLayoutChoice) -> RenderPipelineId {
    device
        .create_render_pipeline(&RenderPipelineDescriptor {
            label: Some("offset".into()),
            layout,
            vertex: VertexState {
                stage: ProgrammableStage::new(module),
                buffers: vec![VertexBufferLayoutBuilder::per_vertex()
                    .attribute(0, VertexFormat::Float32x3)
                    .build()],
            },
            primitive: PrimitiveState::default(),
            depth_stencil: None,
            multisample: MultisampleState::default(),
            fragment: Some(FragmentState {
                stage: ProgrammableStage::new(module),
                targets: vec![Some(ColorTargetState::new(TextureFormat::Rgba8Unorm))],
            }),
        })
        .unwrap()
}

fn uniform_group(
    device: &dyn GfxDevice,
    layout: BindGroupLayoutId,
    buffer: BufferId,
    offset: u64,
    size: Option<u64>,
) -> GfxResult<BindGroupId> {
    device.create_bind_group(&BindGroupDescriptor {
        label: Some("uniforms".into()),
        layout,
        entries: vec![BindGroupEntry {
            binding: 0,
            resource: BindingResource::Buffer(BufferBinding { buffer, offset, size }),
        }],
    })
}

#[test]
fn test_bind_group_ranges_past_u64_max_are_rejected() {
    let (_gl, device) = device();
    let layout = device
        .create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("uniforms".into()),
            entries: vec![BindGroupLayoutEntry {
                binding: 0,
                visibility: ShaderStageFlags::VERTEX,
                ty: BindingType::Buffer {
                    ty: BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
            }],
        })
        .unwrap();
    let uniforms = buffer(&*device, 512, BufferUsages::UNIFORM);

    let err = uniform_group(&*device, layout, uniforms, 256, Some(u64::MAX)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    uniform_group(&*device, layout, uniforms, 256, Some(256)).unwrap();
}

#[test]
fn test_index_ranges_past_u64_max_invalidate_the_pass() {
    let (_gl, device) = device();
    let indices = buffer(&*device, 64, BufferUsages::INDEX);
    let view = target_view(&*device);

    let mut encoder = device.create_command_encoder(&CommandEncoderDescriptor::default()).unwrap();
    {
        let mut pass = encoder.begin_render_pass(&pass_descriptor(view));
        pass.set_index_buffer(indices, IndexFormat::Uint16, 4, Some(u64::MAX));
        assert_eq!(pass.end().unwrap_err().kind(), ErrorKind::Validation);
    }
    assert_eq!(encoder.finish().unwrap_err().kind(), ErrorKind::Validation);
}

#[test]
fn test_texture_uploads_with_a_huge_offset_are_rejected() {
    let (_gl, device) = device();
    let texture = device
        .create_texture(&TextureDescriptor {
            label: Some("upload".into()),
            size: Extent3D::d2(4, 1),
            usage: TextureUsages::COPY_DST | TextureUsages::TEXTURE_BINDING,
            ..Default::default()
        })
        .unwrap();
    let destination = TexelCopyTextureInfo {
        texture,
        mip_level: 0,
        origin: Origin3D::default(),
        aspect: TextureAspect::All,
    };
    let layout = TexelCopyBufferLayout {
        offset: u64::MAX - 3,
        bytes_per_row: Some(16),
        rows_per_image: None,
    };

    let err = device
        .queue()
        .write_texture(&destination, &[0; 16], &layout, Extent3D::d2(4, 1))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    device
        .queue()
        .write_texture(&destination, &[0; 16], &TexelCopyBufferLayout::default(), Extent3D::d2(4, 1))
        .unwrap();
}

// ─────────────────────────────────────────────────────────────────────────────
// Link diagnostics and auto layouts
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_link_failures_are_reported_by_compilation_info() {
    let (_gl, device) = device();
    let vertex = device
        .create_shader_module(&ShaderModuleDescriptor {
            label: Some("vertex".into()),
            sources: vec![ShaderSource::Native {
                stage: ShaderStage::Vertex,
                code: VERTEX_SHADER.into(),
            }],
            ..Default::default()
        })
        .unwrap();
    let fragment = device
        .create_shader_module(&ShaderModuleDescriptor {
            label: Some("fragment".into()),
            sources: vec![ShaderSource::Native {
                stage: ShaderStage::Fragment,
                code: "#version 300 es
precision mediump float;
in vec2 v_uv;
out vec4 color;
void main() { color = vec4(v_uv, 0.0, 1.0); }
"
                .into(),
            }],
            ..Default::default()
        })
        .unwrap();

    let err = device
        .create_render_pipeline(&RenderPipelineDescriptor {
            label: Some("mismatched".into()),
            layout: PipelineLayoutChoice::Auto,
            vertex: VertexState {
                stage: ProgrammableStage::new(vertex),
                buffers: vec![VertexBufferLayoutBuilder::per_vertex()
                    .attribute(0, VertexFormat::Float32x2)
                    .build()],
            },
            primitive: PrimitiveState::default(),
            depth_stencil: None,
            multisample: MultisampleState::default(),
            fragment: Some(FragmentState {
                stage: ProgrammableStage::new(fragment),
                targets: vec![Some(ColorTargetState::new(TextureFormat::Rgba8Unorm))],
            }),
        })
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ShaderCompilation);

    for module in [vertex, fragment] {
        let info = device.get_compilation_info(module).unwrap();
        assert!(
            info.iter()
                .any(|m| m.severity == CompilationMessageType::Error && m.message.contains("v_uv")),
            "{info:?}"
        );
    }
}

#[test]
fn test_auto_layouts_are_freed_with_their_pipeline() {
    let (_gl, device) = device();
    let module = offset_module(&*device);
    let uniforms = buffer(&*device, 256, BufferUsages::UNIFORM);

    let pipeline = offset_pipeline(&*device, module, PipelineLayoutChoice::Auto);
    let layout = device.get_bind_group_layout(pipeline, 0).unwrap();
    uniform_group(&*device, layout, uniforms, 0, None).unwrap();

    device.destroy_render_pipeline(pipeline).unwrap();
    let err = uniform_group(&*device, layout, uniforms, 0, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn test_explicit_layouts_outlive_their_pipeline() {
    let (_gl, device) = device();
    let module = offset_module(&*device);
    let uniforms = buffer(&*device, 256, BufferUsages::UNIFORM);
    let layout = device
        .create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("uniforms".into()),
            entries: vec![BindGroupLayoutEntry {
                binding: 0,
                visibility: ShaderStageFlags::VERTEX_FRAGMENT,
                ty: BindingType::Buffer {
                    ty: BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
            }],
        })
        .unwrap();
    let pipeline_layout = device
        .create_pipeline_layout(&PipelineLayoutDescriptor {
            label: None,
            bind_group_layouts: vec![layout],
        })
        .unwrap();

    let pipeline = offset_pipeline(&*device, module, PipelineLayoutChoice::Explicit(pipeline_layout));
    device.destroy_render_pipeline(pipeline).unwrap();
    uniform_group(&*device, layout, uniforms, 0, None).unwrap();
}
