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

//! Shader module descriptors and compilation diagnostics.

use super::util::ShaderStage;
use crate::gfx::error::{GfxError, GfxResult};
use serde::{Deserialize, Serialize};

/// Which language family a [`ShaderSource`] is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderSourceKind {
    /// WGSL, one text for every stage.
    Canonical,
    /// GLSL ES 3.00, one text per stage.
    Native,
    /// SPIR-V words.
    Bytecode,
}

/// One variant of a shader module's code.
#[derive(Debug, Clone, PartialEq)]
pub enum ShaderSource {
    /// WGSL text.
    Canonical(String),
    /// GLSL ES 3.00 text for a single stage.
    Native {
        /// Stage the text implements.
        stage: ShaderStage,
        /// Source text, starting with `#version 300 es`.
        code: String,
    },
    /// SPIR-V module.
    Bytecode(Vec<u32>),
}

impl ShaderSource {
    /// Language family.
    pub fn kind(&self) -> ShaderSourceKind {
        match self {
            ShaderSource::Canonical(_) => ShaderSourceKind::Canonical,
            ShaderSource::Native { .. } => ShaderSourceKind::Native,
            ShaderSource::Bytecode(_) => ShaderSourceKind::Bytecode,
        }
    }

    /// Stage of a per-stage variant.
    pub fn stage(&self) -> Option<ShaderStage> {
        match self {
            ShaderSource::Native { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// Explicit mapping of a shader resource name to a bind group slot.
///
/// Hints take precedence over the `group{G}_binding{B}` naming convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingHint {
    /// Uniform block or sampler uniform name as written in the shader.
    pub name: String,
    /// Bind group index.
    pub group: u32,
    /// Binding within the group.
    pub binding: u32,
    /// Sampler binding (same group) paired with a texture binding.
    pub sampler: Option<u32>,
}

/// Describes a shader module to create.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShaderModuleDescriptor {
    /// Debug label.
    pub label: Option<String>,
    /// Code variants; at most one per (kind, stage).
    pub sources: Vec<ShaderSource>,
    /// Preprocessor defines injected into native sources.
    pub defines: Vec<(String, String)>,
    /// Explicit resource name mappings.
    pub binding_hints: Vec<BindingHint>,
}

impl ShaderModuleDescriptor {
    /// Rejects empty modules and duplicate (kind, stage) variants.
    pub fn validate(&self) -> GfxResult<()> {
        if self.sources.is_empty() {
            return Err(GfxError::validation("shader module has no sources"));
        }
        for (i, a) in self.sources.iter().enumerate() {
            if let Some(b) = self.sources[i + 1..]
                .iter()
                .find(|b| b.kind() == a.kind() && b.stage() == a.stage())
            {
                return Err(GfxError::validation(format!(
                    "shader module declares two {:?} sources for stage {:?}",
                    b.kind(),
                    b.stage()
                )));
            }
        }
        Ok(())
    }

    /// The variant of `kind` that serves `stage`, if any.
    pub fn select(&self, kind: ShaderSourceKind, stage: ShaderStage) -> Option<&ShaderSource> {
        self.sources
            .iter()
            .find(|s| s.kind() == kind && s.stage().is_none_or(|st| st == stage))
    }

    /// Hint naming `name`, if any.
    pub fn hint(&self, name: &str) -> Option<&BindingHint> {
        self.binding_hints.iter().find(|h| h.name == name)
    }
}

/// Severity of a [`CompilationMessage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompilationMessageType {
    /// Compilation failed.
    Error,
    /// Suspicious code.
    Warning,
    /// Informational note.
    Info,
}

/// One structured diagnostic from compiling or linking a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilationMessage {
    /// Driver text without the location prefix.
    pub message: String,
    /// Severity.
    pub severity: CompilationMessageType,
    /// Stage the message refers to; `None` for link diagnostics.
    pub stage: Option<ShaderStage>,
    /// 1-based line.
    pub line: Option<u32>,
    /// 1-based column.
    pub column: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn native(stage: ShaderStage, code: &str) -> ShaderSource {
        ShaderSource::Native {
            stage,
            code: code.into(),
        }
    }

    #[test]
    fn duplicate_stage_variants_are_rejected() {
        let desc = ShaderModuleDescriptor {
            sources: vec![
                native(ShaderStage::Vertex, "a"),
                native(ShaderStage::Vertex, "b"),
            ],
            ..Default::default()
        };
        assert!(desc.validate().is_err());
        assert!(ShaderModuleDescriptor::default().validate().is_err());
    }

    #[test]
    fn select_picks_stage_specific_or_stageless_variant() {
        let desc = ShaderModuleDescriptor {
            sources: vec![
                ShaderSource::Canonical("@vertex fn vs() {}".into()),
                native(ShaderStage::Fragment, "void main() {}"),
            ],
            ..Default::default()
        };
        desc.validate().unwrap();
        assert!(desc.select(ShaderSourceKind::Canonical, ShaderStage::Vertex).is_some());
        assert!(desc.select(ShaderSourceKind::Native, ShaderStage::Vertex).is_none());
        assert_eq!(
            desc.select(ShaderSourceKind::Native, ShaderStage::Fragment)
                .and_then(ShaderSource::stage),
            Some(ShaderStage::Fragment)
        );
    }
}
