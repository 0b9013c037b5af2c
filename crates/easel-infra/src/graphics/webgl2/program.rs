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

//! GLSL ES 3.00 compilation, program linking and interface introspection.
//!
//! Vertex inputs are bound by name before linking: the attribute for shader
//! location `N` must be called `a_loc{N}` (see [`VertexSemantic`] for the
//! conventional assignments). After the first successful link the program's
//! attributes, uniforms and uniform blocks are read back once and cached.

use super::gl::consts::*;
use super::gl::{GlContext, GlName};
use easel_core::gfx::api::{
    CompilationMessage, CompilationMessageType, ShaderModuleDescriptor, ShaderSource, ShaderSourceKind, ShaderStage,
};
use easel_core::gfx::error::{GfxError, GfxResult};
use std::collections::HashMap;

/// Prefix of attribute names bound to shader locations.
pub const ATTRIBUTE_PREFIX: &str = "a_loc";

/// Name the vertex shader must give the input at `location`.
pub fn attribute_name(location: u32) -> String {
    format!("{ATTRIBUTE_PREFIX}{location}")
}

/// Conventional shader locations for common vertex data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
#[allow(missing_docs)]
pub enum VertexSemantic {
    Position = 0,
    Normal = 1,
    Tangent = 2,
    TexCoord0 = 3,
    TexCoord1 = 4,
    Color0 = 5,
    Joints0 = 6,
    Weights0 = 7,
}

impl VertexSemantic {
    /// Shader location of the semantic.
    pub const fn location(self) -> u32 {
        self as u32
    }

    /// Attribute name bound for the semantic.
    pub fn attribute_name(self) -> String {
        attribute_name(self.location())
    }
}

/// Where injected `#define` lines were placed, for mapping driver line
/// numbers back to the caller's source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LineShift {
    after: u32,
    count: u32,
}

impl LineShift {
    /// Line number in the original source for a reported `line`.
    pub fn original(&self, line: u32) -> u32 {
        if line > self.after + self.count {
            line - self.count
        } else {
            line.min(self.after.max(1))
        }
    }
}

/// Inserts `#define NAME VALUE` lines right after the `#version` directive.
pub fn inject_defines(source: &str, defines: &[(String, String)]) -> (String, LineShift) {
    if defines.is_empty() {
        return (source.to_owned(), LineShift::default());
    }
    let block: String = defines
        .iter()
        .map(|(name, value)| format!("#define {name} {value}\n"))
        .collect();
    let count = defines.len() as u32;
    let mut out = String::with_capacity(source.len() + block.len());
    let mut after = 0;
    let mut injected = false;
    for (i, line) in source.split_inclusive('\n').enumerate() {
        out.push_str(line);
        if !injected && line.trim_start().starts_with("#version") {
            if !line.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&block);
            after = i as u32 + 1;
            injected = true;
        }
    }
    if !injected {
        out = block + source;
    }
    (out, LineShift { after, count })
}

fn parse_severity(word: &str) -> Option<CompilationMessageType> {
    match word.to_ascii_lowercase().as_str() {
        "error" => Some(CompilationMessageType::Error),
        "warning" => Some(CompilationMessageType::Warning),
        "info" | "note" => Some(CompilationMessageType::Info),
        _ => None,
    }
}

fn parse_line(line: &str, stage: Option<ShaderStage>, shift: LineShift) -> CompilationMessage {
    let plain = |severity| CompilationMessage {
        message: line.to_owned(),
        severity,
        stage,
        line: None,
        column: None,
    };
    // ANGLE and most drivers: "ERROR: 0:12: 'x' : message".
    if let Some((head, rest)) = line.split_once(": ") {
        if let Some(severity) = parse_severity(head.trim()) {
            let mut parts = rest.splitn(3, ':');
            let file = parts.next().map(str::trim);
            let number = parts.next().and_then(|n| n.trim().parse::<u32>().ok());
            if let (Some(file), Some(number), Some(message)) = (file, number, parts.next()) {
                if file.parse::<u32>().is_ok() {
                    return CompilationMessage {
                        message: message.trim().to_owned(),
                        severity,
                        stage,
                        line: Some(shift.original(number)),
                        column: None,
                    };
                }
            }
            return CompilationMessage {
                message: rest.trim().to_owned(),
                ..plain(severity)
            };
        }
    }
    // Mesa: "0:12(5): error: message".
    if let Some((location, rest)) = line.split_once("): ") {
        if let Some((file_line, column)) = location.split_once('(') {
            let number = file_line.split(':').nth(1).and_then(|n| n.parse::<u32>().ok());
            if let (Some(number), Ok(column), Some((severity, message))) =
                (number, column.parse::<u32>(), rest.split_once(": "))
            {
                if let Some(severity) = parse_severity(severity) {
                    return CompilationMessage {
                        message: message.trim().to_owned(),
                        severity,
                        stage,
                        line: Some(shift.original(number)),
                        column: Some(column),
                    };
                }
            }
        }
    }
    plain(CompilationMessageType::Info)
}

/// Parses a driver info log into structured messages.
pub fn parse_info_log(log: &str, stage: Option<ShaderStage>, shift: LineShift) -> Vec<CompilationMessage> {
    log.lines()
        .map(|l| l.trim_matches('\0').trim())
        .filter(|l| !l.is_empty())
        .map(|l| parse_line(l, stage, shift))
        .collect()
}

fn ensure_error(diagnostics: &mut Vec<CompilationMessage>, stage: Option<ShaderStage>, fallback: &str) {
    if !diagnostics.iter().any(|d| d.severity == CompilationMessageType::Error) {
        diagnostics.push(CompilationMessage {
            message: fallback.to_owned(),
            severity: CompilationMessageType::Error,
            stage,
            line: None,
            column: None,
        });
    }
}

fn first_error(diagnostics: &[CompilationMessage]) -> String {
    diagnostics
        .iter()
        .find(|d| d.severity == CompilationMessageType::Error)
        .map(|d| match d.line {
            Some(line) => format!("line {line}: {}", d.message),
            None => d.message.clone(),
        })
        .unwrap_or_default()
}

/// A compiled shader object with the diagnostics it produced.
#[derive(Debug, Clone)]
pub struct CompiledShader {
    /// GL shader object.
    pub name: GlName,
    /// Warnings and notes from the driver.
    pub diagnostics: Vec<CompilationMessage>,
}

/// Compiles one stage, injecting `defines` after `#version`.
pub fn compile_stage(
    gl: &dyn GlContext,
    stage: ShaderStage,
    source: &str,
    defines: &[(String, String)],
) -> GfxResult<CompiledShader> {
    let shader_type = match stage {
        ShaderStage::Vertex => VERTEX_SHADER,
        ShaderStage::Fragment => FRAGMENT_SHADER,
        ShaderStage::Compute => {
            return Err(GfxError::unsupported("compute shaders are not available on WebGL2"));
        }
    };
    let (source, shift) = inject_defines(source, defines);
    let name = gl
        .create_shader(shader_type)
        .map_err(|e| GfxError::internal(format!("createShader failed: {e}")))?;
    gl.shader_source(name, &source);
    gl.compile_shader(name);
    let log = gl.get_shader_info_log(name);
    let mut diagnostics = parse_info_log(&log, Some(stage), shift);
    if gl.get_shader_compile_status(name) {
        if !diagnostics.is_empty() {
            log::debug!("{stage:?} shader compiled with {} message(s)", diagnostics.len());
        }
        return Ok(CompiledShader { name, diagnostics });
    }
    gl.delete_shader(name);
    ensure_error(&mut diagnostics, Some(stage), "GLSL compilation failed");
    let message = first_error(&diagnostics);
    log::error!("{stage:?} shader failed to compile: {message}");
    Err(GfxError::ShaderCompilation {
        stage: Some(stage),
        message,
        diagnostics,
    })
}

/// An active vertex input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveAttribute {
    /// Name in the shader.
    pub name: String,
    /// Assigned location.
    pub location: Option<u32>,
    /// GL type enum.
    pub utype: u32,
}

/// An active uniform, free or inside a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveUniform {
    /// Name, with any `[0]` array suffix removed.
    pub name: String,
    /// GL type enum.
    pub utype: u32,
    /// Array length.
    pub size: i32,
    /// Location of a free uniform.
    pub location: Option<u32>,
    /// Index of the containing block.
    pub block: Option<u32>,
}

impl ActiveUniform {
    /// `true` for sampler uniforms.
    pub fn is_sampler(&self) -> bool {
        is_sampler_type(self.utype)
    }
}

/// An active std140 uniform block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveBlock {
    /// Block name.
    pub name: String,
    /// Block index.
    pub index: u32,
    /// Data size in bytes.
    pub size: u32,
}

/// Everything introspection reports about a linked program.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramInterface {
    /// Vertex inputs.
    pub attributes: Vec<ActiveAttribute>,
    /// Uniforms.
    pub uniforms: Vec<ActiveUniform>,
    /// Uniform blocks.
    pub blocks: Vec<ActiveBlock>,
}

impl ProgramInterface {
    fn read(gl: &dyn GlContext, program: GlName) -> Self {
        let attributes = (0..gl.get_active_attributes(program))
            .filter_map(|i| gl.get_active_attribute(program, i))
            .map(|info| ActiveAttribute {
                location: gl.get_attrib_location(program, &info.name),
                name: info.name,
                utype: info.utype,
            })
            .collect();
        let uniforms = (0..gl.get_active_uniforms(program))
            .filter_map(|i| gl.get_active_uniform(program, i).map(|info| (i, info)))
            .map(|(i, info)| {
                let block = u32::try_from(gl.get_active_uniform_block_index(program, i)).ok();
                let location = match block {
                    Some(_) => None,
                    None => gl.get_uniform_location(program, &info.name),
                };
                ActiveUniform {
                    name: info.name.trim_end_matches("[0]").to_owned(),
                    utype: info.utype,
                    size: info.size,
                    location,
                    block,
                }
            })
            .collect();
        let blocks = (0..gl.get_active_uniform_blocks(program))
            .map(|index| ActiveBlock {
                name: gl.get_active_uniform_block_name(program, index),
                index,
                size: gl.get_active_uniform_block_size(program, index).max(0) as u32,
            })
            .collect();
        Self {
            attributes,
            uniforms,
            blocks,
        }
    }

    /// Free (non-block) uniforms that are not samplers.
    pub fn plain_uniforms(&self) -> impl Iterator<Item = &ActiveUniform> {
        self.uniforms
            .iter()
            .filter(|u| u.block.is_none() && !u.is_sampler())
    }

    /// Sampler uniforms.
    pub fn samplers(&self) -> impl Iterator<Item = &ActiveUniform> {
        self.uniforms.iter().filter(|u| u.is_sampler())
    }
}

/// A linked GL program and its cached interface.
#[derive(Debug)]
pub struct GlProgram {
    name: GlName,
    interface: ProgramInterface,
}

impl GlProgram {
    /// Links `vertex` and `fragment`, binding `a_loc{N}` for every location
    /// in `attribute_locations`, then introspects the result.
    pub fn link(
        gl: &dyn GlContext,
        vertex: GlName,
        fragment: GlName,
        attribute_locations: &[u32],
    ) -> GfxResult<Self> {
        let name = gl
            .create_program()
            .map_err(|e| GfxError::internal(format!("createProgram failed: {e}")))?;
        gl.attach_shader(name, vertex);
        gl.attach_shader(name, fragment);
        for &location in attribute_locations {
            gl.bind_attrib_location(name, location, &attribute_name(location));
        }
        gl.link_program(name);
        if !gl.get_program_link_status(name) {
            let log = gl.get_program_info_log(name);
            gl.delete_program(name);
            let mut diagnostics = parse_info_log(&log, None, LineShift::default());
            ensure_error(&mut diagnostics, None, "program link failed");
            let message = first_error(&diagnostics);
            log::error!("GL program failed to link: {message}");
            return Err(GfxError::ShaderCompilation {
                stage: None,
                message,
                diagnostics,
            });
        }
        let interface = ProgramInterface::read(gl, name);
        log::debug!(
            "Linked GL program {name}: {} attribute(s), {} uniform(s), {} block(s)",
            interface.attributes.len(),
            interface.uniforms.len(),
            interface.blocks.len()
        );
        Ok(Self { name, interface })
    }

    /// GL program object.
    pub fn name(&self) -> GlName {
        self.name
    }

    /// Interface read after linking.
    pub fn interface(&self) -> &ProgramInterface {
        &self.interface
    }

    /// Deletes the program object.
    pub fn delete(&self, gl: &dyn GlContext) {
        gl.delete_program(self.name);
    }
}

/// A shader module; stages compile on first use and the outcome is kept.
#[derive(Debug)]
pub(crate) struct GlShaderModuleEntry {
    pub desc: ShaderModuleDescriptor,
    compiled: HashMap<ShaderStage, GfxResult<GlName>>,
    diagnostics: Vec<CompilationMessage>,
}

impl GlShaderModuleEntry {
    pub fn new(desc: ShaderModuleDescriptor) -> Self {
        Self {
            desc,
            compiled: HashMap::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Shader object for `stage`, compiling it the first time.
    pub fn stage(&mut self, gl: &dyn GlContext, stage: ShaderStage) -> GfxResult<GlName> {
        if let Some(result) = self.compiled.get(&stage) {
            return result.clone();
        }
        let Some(ShaderSource::Native { code, .. }) = self.desc.select(ShaderSourceKind::Native, stage) else {
            return Err(GfxError::unsupported(format!(
                "shader module '{}' has no GLSL ES source for the {stage:?} stage",
                self.desc.label.as_deref().unwrap_or("<unlabeled>")
            )));
        };
        let result = match compile_stage(gl, stage, code, &self.desc.defines) {
            Ok(compiled) => {
                self.diagnostics.extend(compiled.diagnostics);
                Ok(compiled.name)
            }
            Err(e) => {
                self.diagnostics.extend(e.diagnostics().iter().cloned());
                Err(e)
            }
        };
        self.compiled.insert(stage, result.clone());
        result
    }

    /// Keeps a failed link's log with this module's messages, as errors.
    pub fn record_link_failure(&mut self, diagnostics: &[CompilationMessage]) {
        self.diagnostics.extend(diagnostics.iter().cloned().map(|mut message| {
            message.severity = CompilationMessageType::Error;
            message
        }));
    }

    /// Compiles every stage with native source and returns all diagnostics.
    pub fn compilation_info(&mut self, gl: &dyn GlContext) -> Vec<CompilationMessage> {
        let stages: Vec<ShaderStage> = self
            .desc
            .sources
            .iter()
            .filter_map(|s| match s {
                ShaderSource::Native { stage, .. } => Some(*stage),
                _ => None,
            })
            .collect();
        for stage in stages {
            let _ = self.stage(gl, stage);
        }
        self.diagnostics.clone()
    }

    pub fn delete(&self, gl: &dyn GlContext) {
        for name in self.compiled.values().flatten() {
            gl.delete_shader(*name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::webgl2::headless::{GlCall, HeadlessGl};

    const VS: &str = "#version 300 es
in vec3 a_loc0;
layout(std140) uniform group0_binding0 { mat4 mvp; };
void main() { gl_Position = mvp * vec4(a_loc0, 1.0); }
";
    const FS: &str = "#version 300 es
precision mediump float;
uniform sampler2D group1_binding0;
out vec4 color;
void main() { color = texture(group1_binding0, vec2(0.0)); }
";

    #[test]
    fn defines_follow_the_version_line() {
        let defines = [("SHADOWS".to_owned(), "1".to_owned())];
        let (source, shift) = inject_defines(VS, &defines);
        let lines: Vec<&str> = source.lines().collect();
        assert_eq!(lines[0], "#version 300 es");
        assert_eq!(lines[1], "#define SHADOWS 1");
        assert_eq!(shift.original(4), 3);
    }

    #[test]
    fn driver_logs_become_structured_messages() {
        let log = "ERROR: 0:7: 'vec5' : undeclared identifier\nWARNING: 0:2: 'x' : unused\n0:3(12): error: syntax error\n";
        let messages = parse_info_log(log, Some(ShaderStage::Fragment), LineShift::default());
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].line, Some(7));
        assert_eq!(messages[0].severity, CompilationMessageType::Error);
        assert_eq!(messages[1].severity, CompilationMessageType::Warning);
        assert_eq!((messages[2].line, messages[2].column), (Some(3), Some(12)));
        assert!(messages.iter().all(|m| m.stage == Some(ShaderStage::Fragment)));
    }

    #[test]
    fn syntax_errors_report_the_failing_stage() {
        let gl = HeadlessGl::new();
        let broken = "#version 300 es\nvoid main() { gl_Position = vec4(0.0); }\n}\n";
        let err = compile_stage(&gl, ShaderStage::Fragment, broken, &[]).unwrap_err();
        match err {
            GfxError::ShaderCompilation { stage, diagnostics, .. } => {
                assert_eq!(stage, Some(ShaderStage::Fragment));
                assert!(diagnostics.iter().any(|d| d.line == Some(3)));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn link_binds_locations_and_introspects_once() {
        let gl = HeadlessGl::new();
        let vs = compile_stage(&gl, ShaderStage::Vertex, VS, &[]).unwrap();
        let fs = compile_stage(&gl, ShaderStage::Fragment, FS, &[]).unwrap();
        let program = GlProgram::link(&gl, vs.name, fs.name, &[0]).unwrap();

        let interface = program.interface();
        assert_eq!(interface.attributes[0].location, Some(0));
        assert_eq!(interface.blocks[0].name, "group0_binding0");
        assert_eq!(interface.blocks[0].size, 64);
        assert_eq!(interface.samplers().count(), 1);

        let calls = gl.calls();
        assert!(calls.contains(&GlCall::BindAttribLocation {
            program: program.name(),
            index: 0,
            name: "a_loc0".into(),
        }));
        let reads = calls
            .iter()
            .filter(|c| matches!(c, GlCall::GetActiveUniforms(_)))
            .count();
        assert_eq!(reads, 1);
    }
}
