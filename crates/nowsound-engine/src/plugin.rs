//! The plugin host is an excluded collaborator (§9 Design Notes): loading
//! and scanning real VST/CLAP binaries is out of scope. What the core
//! needs from it is a registry that hands out opaque, block-processing
//! instances with a known 2-in/2-out stereo contract; this module models
//! that seam with a trait and a trivial pass-through test double, and owns
//! the per-probe effect chain built on top of it (§4.7.1).

use nowsound_core::StereoSample;

use crate::drywet::DryWetMix;
use crate::ids::{PluginId, PluginInstanceIndex, ProgramId};

/// An instantiated effect, 2-in/2-out stereo. Loaded and scanned by a
/// registry this codebase does not implement.
pub trait PluginInstance: Send {
    fn program_id(&self) -> ProgramId;
    fn process_block(&mut self, input: &[StereoSample], output: &mut [StereoSample]);
}

/// Passes audio through unchanged. Stands in for a real plugin host so the
/// effect chain's topology (§4.7.1) can be built and tested without one.
pub struct PassthroughPlugin {
    program_id: ProgramId,
}

impl PassthroughPlugin {
    pub fn new(program_id: ProgramId) -> Self {
        Self { program_id }
    }
}

impl PluginInstance for PassthroughPlugin {
    fn program_id(&self) -> ProgramId {
        self.program_id
    }

    fn process_block(&mut self, input: &[StereoSample], output: &mut [StereoSample]) {
        output.copy_from_slice(input);
    }
}

/// Hands out plugin instances for a `(PluginId, ProgramId)` pair.
pub trait PluginRegistry: Send {
    fn instantiate(&self, plugin_id: PluginId, program_id: ProgramId) -> Box<dyn PluginInstance>;
}

/// The only registry this codebase ships: every plugin is the identity
/// function. A real registry would load a VST/CLAP binary keyed by
/// `plugin_id` and select one of its programs.
pub struct PassthroughRegistry;

impl PluginRegistry for PassthroughRegistry {
    fn instantiate(&self, _plugin_id: PluginId, program_id: ProgramId) -> Box<dyn PluginInstance> {
        Box::new(PassthroughPlugin::new(program_id))
    }
}

struct EffectSlot {
    plugin_id: PluginId,
    instance: Box<dyn PluginInstance>,
    drywet: DryWetMix,
    scratch: Vec<StereoSample>,
}

/// An ordered chain of (plugin instance, dry/wet mixer) pairs, applied in
/// series: `input_node -> [plugin -> drywet] -> ... -> output`. When the
/// chain is empty, the caller's spatial node connects directly to the
/// output measurement node (§4.7.1); `process_block` below falls naturally
/// out of that since an empty chain just copies its input to its output.
#[derive(Default)]
pub struct EffectChain {
    slots: Vec<EffectSlot>,
}

impl EffectChain {
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Appends a new instance at the tail of the chain.
    pub fn add(
        &mut self,
        registry: &dyn PluginRegistry,
        plugin_id: PluginId,
        program_id: ProgramId,
        drywet_0_100: f64,
        block_size: usize,
    ) -> PluginInstanceIndex {
        let instance = registry.instantiate(plugin_id, program_id);
        self.slots.push(EffectSlot {
            plugin_id,
            instance,
            drywet: DryWetMix::new(drywet_0_100),
            scratch: vec![StereoSample::default(); block_size],
        });
        PluginInstanceIndex(self.slots.len() - 1)
    }

    /// Removes the instance at `index`; every later index shifts down by
    /// one (the documented non-stable-index behavior).
    pub fn delete(&mut self, index: PluginInstanceIndex) {
        assert!(index.0 < self.slots.len(), "plugin instance index out of range");
        self.slots.remove(index.0);
    }

    pub fn set_drywet(&mut self, index: PluginInstanceIndex, level_0_100: f64) {
        assert!(index.0 < self.slots.len(), "plugin instance index out of range");
        self.slots[index.0].drywet.set_level(level_0_100);
    }

    pub fn plugin_id_at(&self, index: PluginInstanceIndex) -> PluginId {
        self.slots[index.0].plugin_id
    }

    /// Runs the chain in place: `buffer` holds the spatial node's output on
    /// entry and the chain's output on return.
    pub fn process_block(&mut self, buffer: &mut [StereoSample]) {
        for slot in &mut self.slots {
            slot.scratch.resize(buffer.len(), StereoSample::default());
            slot.instance.process_block(buffer, &mut slot.scratch);
            slot.drywet.mix_block(buffer, &slot.scratch, buffer);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_chain_is_transparent() {
        let mut chain = EffectChain::new();
        let mut buf = vec![StereoSample::new(0.3, -0.2); 4];
        let before = buf.clone();
        chain.process_block(&mut buf);
        assert_eq!(buf, before);
    }

    #[test]
    fn passthrough_plugin_at_full_wet_is_transparent() {
        let registry = PassthroughRegistry;
        let mut chain = EffectChain::new();
        let idx = chain.add(&registry, PluginId::new(1).unwrap(), ProgramId::new(1).unwrap(), 100.0, 4);
        assert_eq!(idx, PluginInstanceIndex(0));
        let mut buf = vec![StereoSample::new(0.3, -0.2); 4];
        let before = buf.clone();
        chain.process_block(&mut buf);
        assert_eq!(buf, before);
    }

    #[test]
    fn deleting_renumbers_later_indices() {
        let registry = PassthroughRegistry;
        let mut chain = EffectChain::new();
        let a = chain.add(&registry, PluginId::new(1).unwrap(), ProgramId::new(1).unwrap(), 50.0, 4);
        let b = chain.add(&registry, PluginId::new(2).unwrap(), ProgramId::new(1).unwrap(), 50.0, 4);
        assert_eq!(chain.plugin_id_at(b), PluginId::new(2).unwrap());
        chain.delete(a);
        assert_eq!(chain.plugin_id_at(PluginInstanceIndex(0)), PluginId::new(2).unwrap());
        assert_eq!(chain.len(), 1);
    }
}
