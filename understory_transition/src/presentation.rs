// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Presentation descriptors: how a controller enters and leaves a stack.

use alloc::rc::Rc;

use crate::interactivity::Interactivity;
use crate::timing::AnimationTiming;
use crate::transition::{Cut, Transition};

bitflags::bitflags! {
    /// Options on a [`Presentation`].
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct PresentationOptions: u8 {
        /// Content below stays drawn while this controller is on top
        /// (sheets, popovers, translucent overlays).
        const OVER_CURRENT_CONTEXT = 0b0000_0001;
    }
}

/// Transition, optional interactivity, timing, and options for a controller.
///
/// Immutable and cheap to clone. [`Presentation::default`] is the global
/// default: a [`Cut`] with default timing and no interactivity.
#[derive(Clone)]
pub struct Presentation {
    transition: Rc<dyn Transition>,
    interactivity: Option<Rc<dyn Interactivity>>,
    timing: AnimationTiming,
    options: PresentationOptions,
}

impl core::fmt::Debug for Presentation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Presentation")
            .field("interactive", &self.interactivity.is_some())
            .field("timing", &self.timing)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Default for Presentation {
    fn default() -> Self {
        Self::new(Cut)
    }
}

impl Presentation {
    /// A presentation using `transition` with default timing.
    pub fn new(transition: impl Transition + 'static) -> Self {
        Self::from_rc(Rc::new(transition))
    }

    /// A presentation sharing an existing transition.
    pub fn from_rc(transition: Rc<dyn Transition>) -> Self {
        Self {
            transition,
            interactivity: None,
            timing: AnimationTiming::default(),
            options: PresentationOptions::empty(),
        }
    }

    /// Attach an interactivity strategy.
    #[must_use]
    pub fn with_interactivity(mut self, interactivity: impl Interactivity + 'static) -> Self {
        self.interactivity = Some(Rc::new(interactivity));
        self
    }

    /// Attach a shared interactivity strategy.
    #[must_use]
    pub fn with_shared_interactivity(mut self, interactivity: Rc<dyn Interactivity>) -> Self {
        self.interactivity = Some(interactivity);
        self
    }

    /// Replace the timing.
    #[must_use]
    pub fn with_timing(mut self, timing: AnimationTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Replace the options.
    #[must_use]
    pub fn with_options(mut self, options: PresentationOptions) -> Self {
        self.options = options;
        self
    }

    /// The transition strategy.
    pub fn transition(&self) -> &Rc<dyn Transition> {
        &self.transition
    }

    /// The interactivity strategy, if any.
    pub fn interactivity(&self) -> Option<&Rc<dyn Interactivity>> {
        self.interactivity.as_ref()
    }

    /// Animation timing.
    pub fn timing(&self) -> AnimationTiming {
        self.timing
    }

    /// Options.
    pub fn options(&self) -> PresentationOptions {
        self.options
    }

    /// Returns true if content below stays drawn under this presentation.
    pub fn is_over_current_context(&self) -> bool {
        self.options
            .contains(PresentationOptions::OVER_CURRENT_CONTEXT)
    }
}
