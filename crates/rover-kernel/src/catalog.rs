//! [`ActionCatalog`] – the immutable action lookup table.
//!
//! Each entry is an [`ActionDescriptor`]: the [`Step`] to run, an optional
//! [`Posture`] the body must be in first, and optional `before`/`after`
//! [`Chain`]s.  The catalog is built once at startup through
//! [`CatalogBuilder`], which rejects any chain pointing at an unknown action.
//! After that it is read-only and freely shared between threads.
//!
//! Names are normalised with [`normalize_name`]: case, surrounding
//! whitespace and the `_`/space distinction are ignored, so `"wag_tail"` and
//! `"Wag Tail"` are the same action.
//!
//! # Example
//!
//! ```
//! use rover_kernel::catalog::{ActionCatalog, ActionDescriptor, Chain, Step};
//!
//! let catalog = ActionCatalog::builder()
//!     .action(ActionDescriptor::new("wag_tail", Step::preset("wag_tail")))
//!     .action(
//!         ActionDescriptor::new("bark", Step::preset("bark"))
//!             .after(Chain::action("wag_tail")),
//!     )
//!     .build()
//!     .unwrap();
//!
//! assert!(catalog.lookup("Bark").is_ok());
//! assert!(catalog.lookup("moonwalk").is_err());
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use rover_hal::Actuator;
use rover_types::{HeadPose, LedMode, LegFrame, Posture, RoverError};

/// Speed used for presets that do not specify one.
pub const DEFAULT_PRESET_SPEED: u8 = 80;
/// Speed of the forward/backward gait.
pub const WALK_SPEED: u8 = 50;
/// Speed of the touch-response head nod.
pub const HEAD_NOD_SPEED: u8 = 80;

/// A user-supplied motion routine.
pub type CustomStep = Arc<dyn Fn(&dyn Actuator) -> Result<(), RoverError> + Send + Sync>;

// ────────────────────────────────────────────────────────────────────────────
// Step
// ────────────────────────────────────────────────────────────────────────────

/// One executable unit of motion against the [`Actuator`].
///
/// A step only *queues* motion; the executor drains the motor bus after each
/// phase.
#[derive(Clone)]
pub enum Step {
    /// Does nothing.  Used by posture actions, whose motion is the posture
    /// transition itself.
    Noop,
    /// A named driver preset.
    Preset { name: String, speed: u8 },
    /// A head trajectory.  The executor adds the current posture's pitch trim.
    Head {
        frames: Vec<HeadPose>,
        speed: u8,
        immediately: bool,
    },
    /// A leg trajectory.
    Legs { frames: Vec<LegFrame>, speed: u8 },
    /// Switch the RGB strip.
    Led { mode: LedMode, color: String },
    /// Run `step` `times` times, sleeping `pause` after each run.
    Repeat {
        step: Box<Step>,
        times: u32,
        pause: Duration,
    },
    /// Run each step in order.
    Sequence(Vec<Step>),
    /// Arbitrary routine.
    Custom(CustomStep),
}

impl Step {
    pub fn preset(name: impl Into<String>) -> Self {
        Self::preset_at(name, DEFAULT_PRESET_SPEED)
    }

    pub fn preset_at(name: impl Into<String>, speed: u8) -> Self {
        Step::Preset {
            name: name.into(),
            speed,
        }
    }

    pub fn custom(f: impl Fn(&dyn Actuator) -> Result<(), RoverError> + Send + Sync + 'static) -> Self {
        Step::Custom(Arc::new(f))
    }

    pub fn is_noop(&self) -> bool {
        matches!(self, Step::Noop)
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Noop => f.write_str("Noop"),
            Step::Preset { name, speed } => f
                .debug_struct("Preset")
                .field("name", name)
                .field("speed", speed)
                .finish(),
            Step::Head { frames, speed, immediately } => f
                .debug_struct("Head")
                .field("frames", &frames.len())
                .field("speed", speed)
                .field("immediately", immediately)
                .finish(),
            Step::Legs { frames, speed } => f
                .debug_struct("Legs")
                .field("frames", &frames.len())
                .field("speed", speed)
                .finish(),
            Step::Led { mode, color } => f
                .debug_struct("Led")
                .field("mode", mode)
                .field("color", color)
                .finish(),
            Step::Repeat { step, times, pause } => f
                .debug_struct("Repeat")
                .field("step", step)
                .field("times", times)
                .field("pause", pause)
                .finish(),
            Step::Sequence(steps) => f.debug_tuple("Sequence").field(steps).finish(),
            Step::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Chain / ActionDescriptor
// ────────────────────────────────────────────────────────────────────────────

/// A `before`/`after` reference: either another catalog action (only its
/// `run` step is used) or an inline step.
#[derive(Debug, Clone)]
pub enum Chain {
    Action(String),
    Inline(Step),
}

impl Chain {
    pub fn action(name: impl Into<String>) -> Self {
        Chain::Action(name.into())
    }
}

/// Behaviour behind one action name.
#[derive(Debug, Clone)]
pub struct ActionDescriptor {
    pub name: String,
    pub run: Step,
    pub required_posture: Option<Posture>,
    pub before: Option<Chain>,
    pub after: Option<Chain>,
}

impl ActionDescriptor {
    pub fn new(name: impl Into<String>, run: Step) -> Self {
        Self {
            name: name.into(),
            run,
            required_posture: None,
            before: None,
            after: None,
        }
    }

    pub fn requires(mut self, posture: Posture) -> Self {
        self.required_posture = Some(posture);
        self
    }

    pub fn before(mut self, chain: Chain) -> Self {
        self.before = Some(chain);
        self
    }

    pub fn after(mut self, chain: Chain) -> Self {
        self.after = Some(chain);
        self
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Catalog
// ────────────────────────────────────────────────────────────────────────────

/// Canonical lookup key for an action name.
pub fn normalize_name(name: &str) -> String {
    name.split(|c: char| c.is_whitespace() || c == '_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Collects descriptors and validates them into an [`ActionCatalog`].
#[derive(Default)]
pub struct CatalogBuilder {
    actions: HashMap<String, Arc<ActionDescriptor>>,
}

impl CatalogBuilder {
    /// Add a descriptor.  A later descriptor with the same normalised name
    /// replaces the earlier one.
    pub fn action(mut self, descriptor: ActionDescriptor) -> Self {
        self.actions
            .insert(normalize_name(&descriptor.name), Arc::new(descriptor));
        self
    }

    /// Freeze the table.
    ///
    /// # Errors
    ///
    /// Returns [`RoverError::UnresolvedChain`] for the first `before`/`after`
    /// chain that names an action missing from the table.
    pub fn build(self) -> Result<ActionCatalog, RoverError> {
        for descriptor in self.actions.values() {
            for chain in [&descriptor.before, &descriptor.after].into_iter().flatten() {
                if let Chain::Action(target) = chain
                    && !self.actions.contains_key(&normalize_name(target))
                {
                    return Err(RoverError::UnresolvedChain {
                        action: descriptor.name.clone(),
                        target: target.clone(),
                    });
                }
            }
        }
        Ok(ActionCatalog {
            actions: self.actions,
        })
    }
}

/// Immutable name → [`ActionDescriptor`] table.
pub struct ActionCatalog {
    actions: HashMap<String, Arc<ActionDescriptor>>,
}

impl ActionCatalog {
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::default()
    }

    /// The robot dog's built-in repertoire.
    ///
    /// `forward` and `backward` require [`Posture::Stand`]; `stand`, `sit`
    /// and `lie` are pure posture actions; everything else is a posture-free
    /// driver preset.  `head nod` is the inline trajectory used when the
    /// robot is petted.
    pub fn standard() -> Result<Self, RoverError> {
        let presets = [
            ("bark", "bark"),
            ("bark harder", "bark_action"),
            ("pant", "pant"),
            ("howling", "howling"),
            ("wag_tail", "wag_tail"),
            ("stretch", "stretch"),
            ("push up", "push_up"),
            ("scratch", "scratch"),
            ("handshake", "hand_shake"),
            ("high five", "high_five"),
            ("lick hand", "lick_hand"),
            ("shake head", "shake_head"),
            ("relax neck", "relax_neck"),
            ("nod", "nod"),
            ("think", "think"),
            ("recall", "recall"),
            ("head down", "head_down"),
            ("fluster", "fluster"),
            ("surprise", "surprise"),
            ("dab", "dab"),
            ("floss", "floss"),
            ("woah", "woah"),
            ("gangnam style", "gangnam_style"),
            ("bottle flip", "bottle_flip"),
            ("pray", "pray"),
            ("butt up", "butt_up"),
        ];

        let mut builder = Self::builder()
            .action(
                ActionDescriptor::new("forward", Step::preset_at("forward", WALK_SPEED))
                    .requires(Posture::Stand),
            )
            .action(
                ActionDescriptor::new("backward", Step::preset_at("backward", WALK_SPEED))
                    .requires(Posture::Stand),
            )
            .action(ActionDescriptor::new("stand", Step::Noop).requires(Posture::Stand))
            .action(ActionDescriptor::new("sit", Step::Noop).requires(Posture::Sit))
            .action(ActionDescriptor::new("lie", Step::Noop).requires(Posture::Lie))
            .action(ActionDescriptor::new(
                "twerk",
                Step::Repeat {
                    step: Box::new(Step::preset("twerk")),
                    times: 5,
                    pause: Duration::from_millis(500),
                },
            ))
            .action(ActionDescriptor::new(
                "head nod",
                Step::Head {
                    frames: head_nod_frames(),
                    speed: HEAD_NOD_SPEED,
                    immediately: false,
                },
            ));

        for (name, preset) in presets {
            builder = builder.action(ActionDescriptor::new(name, Step::preset(preset)));
        }
        builder.build()
    }

    /// Resolve `name` to its descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`RoverError::UnknownAction`] when the name is not in the table.
    pub fn lookup(&self, name: &str) -> Result<Arc<ActionDescriptor>, RoverError> {
        self.actions
            .get(&normalize_name(name))
            .cloned()
            .ok_or_else(|| RoverError::UnknownAction(name.to_string()))
    }

    /// Resolve a chain to the step it stands for.
    pub fn resolve_chain<'a>(&'a self, chain: &'a Chain) -> Result<&'a Step, RoverError> {
        match chain {
            Chain::Inline(step) => Ok(step),
            Chain::Action(target) => self
                .actions
                .get(&normalize_name(target))
                .map(|d| &d.run)
                .ok_or_else(|| RoverError::UnknownAction(target.clone())),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.actions.contains_key(&normalize_name(name))
    }

    /// Action names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.actions.values().map(|d| d.name.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Gentle nodding head trajectory: a sine sweep of roll and pitch.
fn head_nod_frames() -> Vec<HeadPose> {
    (0..20)
        .map(|i| {
            let phase = (i as f32 * 0.314).sin();
            HeadPose::new(0.0, 10.0 * phase, 20.0 * phase + 10.0)
        })
        .collect()
}
