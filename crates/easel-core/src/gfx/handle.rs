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

//! Typed resource ids and the generation-checked arenas that own resources.
//!
//! Every device keeps one [`Arena`] per resource kind. Callers only ever see
//! copyable [`GfxId`]s, which carry the slot key and the serial of the device
//! that issued them, so stale ids and ids from another device are caught on
//! lookup instead of aliasing a live object.

use super::error::{GfxError, GfxResult};
use slotmap::SlotMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU32, Ordering};

slotmap::new_key_type! {
    /// Raw slot key shared by every id type.
    pub struct SlotKey;
}

/// Marker trait naming a resource kind.
pub trait ResourceKind: 'static {
    /// Name used in error messages.
    const NAME: &'static str;
}

macro_rules! resource_kinds {
    ($($(#[$doc:meta])* $marker:ident => $alias:ident, $name:literal;)*) => {
        /// Zero-sized markers distinguishing id types.
        pub mod kind {
            $(
                #[doc = concat!("Marker for ", $name, " ids.")]
                #[derive(Debug)]
                pub enum $marker {}

                impl super::ResourceKind for $marker {
                    const NAME: &'static str = $name;
                }
            )*
        }

        $(
            $(#[$doc])*
            pub type $alias = GfxId<kind::$marker>;
        )*
    };
}

resource_kinds! {
    /// Id of a buffer.
    Buffer => BufferId, "buffer";
    /// Id of a texture.
    Texture => TextureId, "texture";
    /// Id of a texture view.
    TextureView => TextureViewId, "texture view";
    /// Id of a sampler.
    Sampler => SamplerId, "sampler";
    /// Id of a shader module.
    ShaderModule => ShaderModuleId, "shader module";
    /// Id of a bind group layout.
    BindGroupLayout => BindGroupLayoutId, "bind group layout";
    /// Id of a bind group.
    BindGroup => BindGroupId, "bind group";
    /// Id of a pipeline layout.
    PipelineLayout => PipelineLayoutId, "pipeline layout";
    /// Id of a render pipeline.
    RenderPipeline => RenderPipelineId, "render pipeline";
    /// Id of a compute pipeline.
    ComputePipeline => ComputePipelineId, "compute pipeline";
    /// Id of a finished command buffer.
    CommandBuffer => CommandBufferId, "command buffer";
}

/// Serial identifying the device that issued an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceSerial(u32);

impl DeviceSerial {
    /// Allocates a process-unique serial.
    pub fn next() -> Self {
        static NEXT: AtomicU32 = AtomicU32::new(1);
        DeviceSerial(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Copyable handle to a resource owned by a device.
pub struct GfxId<K> {
    key: SlotKey,
    device: DeviceSerial,
    _kind: PhantomData<fn() -> K>,
}

impl<K> Clone for GfxId<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K> Copy for GfxId<K> {}

impl<K> PartialEq for GfxId<K> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.device == other.device
    }
}

impl<K> Eq for GfxId<K> {}

impl<K> Hash for GfxId<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
        self.device.hash(state);
    }
}

impl<K: ResourceKind> fmt::Debug for GfxId<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}Id({:?}@{})", K::NAME.replace(' ', "_"), self.key, self.device.0)
    }
}

impl<K> GfxId<K> {
    /// Serial of the issuing device.
    pub fn device(&self) -> DeviceSerial {
        self.device
    }
}

/// Slot arena owning the entries of one resource kind for one device.
pub struct Arena<K, V> {
    device: DeviceSerial,
    slots: SlotMap<SlotKey, V>,
    _kind: PhantomData<fn() -> K>,
}

impl<K: ResourceKind, V: fmt::Debug> fmt::Debug for Arena<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("kind", &K::NAME)
            .field("len", &self.slots.len())
            .finish()
    }
}

impl<K: ResourceKind, V> Arena<K, V> {
    /// Creates an empty arena bound to `device`.
    pub fn new(device: DeviceSerial) -> Self {
        Self {
            device,
            slots: SlotMap::with_key(),
            _kind: PhantomData,
        }
    }

    /// Inserts a fully built entry.
    pub fn insert(&mut self, value: V) -> GfxId<K> {
        GfxId {
            key: self.slots.insert(value),
            device: self.device,
            _kind: PhantomData,
        }
    }

    fn invalid(&self, id: GfxId<K>) -> GfxError {
        if id.device != self.device {
            GfxError::validation(format!("{} {:?} belongs to another device", K::NAME, id))
        } else {
            GfxError::validation(format!("{} {:?} is invalid or destroyed", K::NAME, id))
        }
    }

    /// Looks an entry up.
    pub fn get(&self, id: GfxId<K>) -> GfxResult<&V> {
        if id.device == self.device {
            if let Some(v) = self.slots.get(id.key) {
                return Ok(v);
            }
        }
        Err(self.invalid(id))
    }

    /// Looks an entry up mutably.
    pub fn get_mut(&mut self, id: GfxId<K>) -> GfxResult<&mut V> {
        if !self.contains(id) {
            return Err(self.invalid(id));
        }
        self.slots
            .get_mut(id.key)
            .ok_or_else(|| GfxError::internal(format!("{} slot vanished", K::NAME)))
    }

    /// `true` when `id` names a live entry of this arena.
    pub fn contains(&self, id: GfxId<K>) -> bool {
        id.device == self.device && self.slots.contains_key(id.key)
    }

    /// Removes an entry, `None` when it was already gone.
    ///
    /// Ids from another device are rejected.
    pub fn remove(&mut self, id: GfxId<K>) -> GfxResult<Option<V>> {
        if id.device != self.device {
            return Err(self.invalid(id));
        }
        Ok(self.slots.remove(id.key))
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// `true` when the arena holds nothing.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.slots.clear();
    }

    /// Iterates live entries.
    pub fn iter(&self) -> impl Iterator<Item = (GfxId<K>, &V)> + '_ {
        let device = self.device;
        self.slots.iter().map(move |(key, v)| {
            (
                GfxId {
                    key,
                    device,
                    _kind: PhantomData,
                },
                v,
            )
        })
    }

    /// Iterates live values mutably.
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> + '_ {
        self.slots.values_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::error::ErrorKind;

    #[test]
    fn stale_ids_are_rejected_after_removal() {
        let mut arena: Arena<kind::Buffer, u32> = Arena::new(DeviceSerial::next());
        let id = arena.insert(5);
        assert_eq!(*arena.get(id).unwrap(), 5);
        assert_eq!(arena.remove(id).unwrap(), Some(5));
        assert_eq!(arena.remove(id).unwrap(), None);

        let reused = arena.insert(6);
        assert_ne!(id, reused);
        let err = arena.get(id).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.message().contains("buffer"));
    }

    #[test]
    fn ids_from_another_device_never_alias() {
        let mut a: Arena<kind::Sampler, &str> = Arena::new(DeviceSerial::next());
        let mut b: Arena<kind::Sampler, &str> = Arena::new(DeviceSerial::next());
        let in_a = a.insert("a");
        let _in_b = b.insert("b");
        let err = b.get(in_a).unwrap_err();
        assert!(err.message().contains("another device"));
        assert!(b.remove(in_a).is_err());
        assert!(!b.contains(in_a));
    }

    #[test]
    fn iteration_yields_usable_ids() {
        let mut arena: Arena<kind::Texture, u8> = Arena::new(DeviceSerial::next());
        arena.insert(1);
        arena.insert(2);
        let ids: Vec<_> = arena.iter().map(|(id, _)| id).collect();
        for id in ids {
            assert!(arena.get(id).is_ok());
        }
        assert_eq!(arena.len(), 2);
    }
}
