//! Module registry and factory for patchbay.
//!
//! This crate provides a centralized registry for discovering and
//! instantiating patch modules. It enables dynamic module creation by
//! category tag — the same tag the persistence layer stores in patch
//! documents — and provides metadata for building palette-style user
//! interfaces.
//!
//! # Example
//!
//! ```rust
//! use patchbay_core::{Module, ModuleId, NullEngine, PatchContext};
//! use patchbay_registry::{ModuleGroup, ModuleRegistry};
//!
//! let ctx = PatchContext::new(NullEngine::new());
//! let registry = ModuleRegistry::new();
//!
//! // List all modules
//! for descriptor in registry.all_modules() {
//!     println!("{}: {}", descriptor.category, descriptor.description);
//! }
//!
//! // Create a module by category
//! let osc = registry
//!     .create(&ctx, "oscillator", ModuleId::from("osc-1"), None)
//!     .expect("oscillator is a built-in");
//! assert_eq!(osc.category(), "oscillator");
//!
//! // Filter by group
//! for descriptor in registry.modules_in_group(ModuleGroup::Source) {
//!     println!("source module: {}", descriptor.name);
//! }
//! ```

use patchbay_core::{Module, ModuleId, ModuleOptions, PatchContext};
use patchbay_modules::{
    ClockModule, GainModule, LoggerModule, MessageToSignalModule, OscillatorModule, PlayerModule,
    SpeakerOutputModule,
};

/// Group of patch modules for palette organization and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleGroup {
    /// Signal sources (oscillators, players)
    Source,
    /// Signal processors (gain, filters)
    Processing,
    /// Terminal outputs
    Output,
    /// Discrete control and timing (clocks, bridges)
    Control,
    /// Debugging and utility modules
    Utility,
}

impl ModuleGroup {
    /// Returns a human-readable name for the group.
    pub const fn name(&self) -> &'static str {
        match self {
            ModuleGroup::Source => "Sources",
            ModuleGroup::Processing => "Processing",
            ModuleGroup::Output => "Outputs",
            ModuleGroup::Control => "Control",
            ModuleGroup::Utility => "Utility",
        }
    }
}

/// Describes a module in the registry.
#[derive(Debug, Clone)]
pub struct ModuleDescriptor {
    /// Category tag, the factory key (lowercase, no spaces).
    pub category: &'static str,
    /// Human-readable name.
    pub name: &'static str,
    /// Brief description of the module.
    pub description: &'static str,
    /// Group for palette organization.
    pub group: ModuleGroup,
}

/// Factory function type for creating modules.
type ModuleFactory = fn(&PatchContext, ModuleId, Option<&ModuleOptions>) -> Box<dyn Module>;

/// Internal entry in the registry.
struct RegistryEntry {
    descriptor: ModuleDescriptor,
    factory: ModuleFactory,
}

/// Registry of all available patch modules.
///
/// The registry provides a centralized way to discover and instantiate
/// modules by category. All built-in modules are automatically
/// registered.
pub struct ModuleRegistry {
    entries: Vec<RegistryEntry>,
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleRegistry {
    /// Create a new registry with all built-in modules registered.
    pub fn new() -> Self {
        let mut registry = Self {
            entries: Vec::with_capacity(7),
        };
        registry.register_builtin_modules();
        registry
    }

    /// Register all built-in modules.
    fn register_builtin_modules(&mut self) {
        self.register(
            ModuleDescriptor {
                category: OscillatorModule::CATEGORY,
                name: "Oscillator",
                description: "Free-running oscillator with frequency modulation input",
                group: ModuleGroup::Source,
            },
            |ctx, id, opts| Box::new(OscillatorModule::new(ctx, id, opts)),
        );

        self.register(
            ModuleDescriptor {
                category: GainModule::CATEGORY,
                name: "Gain",
                description: "Amplifier with modulatable gain",
                group: ModuleGroup::Processing,
            },
            |ctx, id, opts| Box::new(GainModule::new(ctx, id, opts)),
        );

        self.register(
            ModuleDescriptor {
                category: SpeakerOutputModule::CATEGORY,
                name: "Speaker Output",
                description: "Terminal output to the engine destination",
                group: ModuleGroup::Output,
            },
            |ctx, id, opts| Box::new(SpeakerOutputModule::new(ctx, id, opts)),
        );

        self.register(
            ModuleDescriptor {
                category: ClockModule::CATEGORY,
                name: "Clock",
                description: "Steady tick source on a bpm grid",
                group: ModuleGroup::Control,
            },
            |ctx, id, opts| Box::new(ClockModule::new(ctx, id, opts)),
        );

        self.register(
            ModuleDescriptor {
                category: LoggerModule::CATEGORY,
                name: "Logger",
                description: "Logs every received message",
                group: ModuleGroup::Utility,
            },
            |ctx, id, opts| Box::new(LoggerModule::new(ctx, id, opts)),
        );

        self.register(
            ModuleDescriptor {
                category: MessageToSignalModule::CATEGORY,
                name: "Message to Signal",
                description: "Turns numeric messages into a stepped control signal",
                group: ModuleGroup::Control,
            },
            |ctx, id, opts| Box::new(MessageToSignalModule::new(ctx, id, opts)),
        );

        self.register(
            ModuleDescriptor {
                category: PlayerModule::CATEGORY,
                name: "Player",
                description: "Sample player triggered over the message bus",
                group: ModuleGroup::Source,
            },
            |ctx, id, opts| Box::new(PlayerModule::new(ctx, id, opts)),
        );
    }

    /// Register a module with the registry.
    fn register(&mut self, descriptor: ModuleDescriptor, factory: ModuleFactory) {
        self.entries.push(RegistryEntry {
            descriptor,
            factory,
        });
    }

    /// Returns descriptors for all registered modules.
    pub fn all_modules(&self) -> Vec<&ModuleDescriptor> {
        self.entries.iter().map(|e| &e.descriptor).collect()
    }

    /// Returns descriptors for modules in a specific group.
    pub fn modules_in_group(&self, group: ModuleGroup) -> Vec<&ModuleDescriptor> {
        self.entries
            .iter()
            .filter(|e| e.descriptor.group == group)
            .map(|e| &e.descriptor)
            .collect()
    }

    /// Get a descriptor by category tag.
    pub fn get(&self, category: &str) -> Option<&ModuleDescriptor> {
        self.entries
            .iter()
            .find(|e| e.descriptor.category == category)
            .map(|e| &e.descriptor)
    }

    /// Create a module instance by category tag.
    ///
    /// Returns `None` if the category is not registered. The options
    /// record, when given, is the same shape the persistence layer
    /// stores; missing keys fall back to the module's defaults.
    pub fn create(
        &self,
        ctx: &PatchContext,
        category: &str,
        id: ModuleId,
        options: Option<&ModuleOptions>,
    ) -> Option<Box<dyn Module>> {
        self.entries
            .iter()
            .find(|e| e.descriptor.category == category)
            .map(|e| (e.factory)(ctx, id, options))
    }

    /// Returns the number of registered modules.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no modules are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
