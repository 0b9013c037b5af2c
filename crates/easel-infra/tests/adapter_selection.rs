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

//! Tests for backend selection across both implementations.

use easel_core::gfx::*;
use easel_infra::{select_adapter, HeadlessGl};
use std::rc::Rc;

#[test]
fn test_webgl2_preference_uses_the_supplied_context() {
    let config = AdapterSelectionConfig {
        preferred_backends: vec![BackendKind::WebGl2],
        ..Default::default()
    };
    let gl: Rc<dyn easel_infra::graphics::webgl2::GlContext> = Rc::new(HeadlessGl::new());
    let adapter = pollster::block_on(select_adapter(&config, &GfxSettings::default(), Some(gl)))
        .expect("WebGL2 adapter");
    assert_eq!(adapter.info().backend, BackendKind::WebGl2);
    assert!(!adapter.capabilities().has_feature(features::COMPUTE));
}

#[test]
fn test_webgl2_without_a_context_is_skipped() {
    let config = AdapterSelectionConfig {
        preferred_backends: vec![BackendKind::WebGl2],
        ..Default::default()
    };
    let result = pollster::block_on(select_adapter(&config, &GfxSettings::default(), None));
    assert!(result.is_err(), "nothing else to fall back to");
}

#[test]
fn test_empty_preference_list_fails() {
    let config = AdapterSelectionConfig {
        preferred_backends: Vec::new(),
        ..Default::default()
    };
    assert!(pollster::block_on(select_adapter(&config, &GfxSettings::default(), None)).is_err());
}
