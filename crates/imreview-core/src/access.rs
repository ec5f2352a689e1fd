//! Role resolution: what an actor may do with a manuscript.
//!
//! Every rule that matches contributes capabilities and the result is their
//! union, so a multi-role actor gets the broadest access any one of its roles
//! grants. Admin and editor rules look at role membership, not at the active
//! role.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::actor::{Actor, Role};
use crate::error::{Result, ReviewError};
use crate::manuscript::{Manuscript, ManuscriptStatus};

bitflags! {
    /// Operations an actor may perform on one manuscript.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Capabilities: u32 {
        /// Read the manuscript and its timeline
        const VIEW = 0b00001;
        /// Change status (overrides, explicit recompute)
        const MUTATE_STATUS = 0b00010;
        /// Delete the manuscript and everything attached to it
        const DELETE = 0b00100;
        /// Assign reviewers
        const ASSIGN = 0b01000;
        /// Submit a review
        const REVIEW = 0b10000;
    }
}

impl Serialize for Capabilities {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.bits().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Capabilities {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let bits = u32::deserialize(deserializer)?;
        Capabilities::from_bits(bits).ok_or_else(|| {
            serde::de::Error::custom(format!("invalid capability bits: {}", bits))
        })
    }
}

impl Capabilities {
    /// Editor access: everything but deletion
    pub const EDITORIAL: Capabilities = Capabilities::VIEW
        .union(Capabilities::MUTATE_STATUS)
        .union(Capabilities::ASSIGN);

    /// Admin access
    pub const ADMINISTRATIVE: Capabilities = Capabilities::EDITORIAL.union(Capabilities::DELETE);

    /// Assigned reviewer access while the manuscript is in review
    pub const REVIEWING: Capabilities = Capabilities::VIEW.union(Capabilities::REVIEW);

    #[inline]
    pub fn can_view(&self) -> bool {
        self.contains(Capabilities::VIEW)
    }

    #[inline]
    pub fn can_mutate_status(&self) -> bool {
        self.contains(Capabilities::MUTATE_STATUS)
    }

    #[inline]
    pub fn can_delete(&self) -> bool {
        self.contains(Capabilities::DELETE)
    }

    #[inline]
    pub fn can_assign(&self) -> bool {
        self.contains(Capabilities::ASSIGN)
    }

    #[inline]
    pub fn can_review(&self) -> bool {
        self.contains(Capabilities::REVIEW)
    }

    /// Fail with `Forbidden` unless every capability in `needed` is present
    pub fn require(&self, needed: Capabilities, actor: &Actor, operation: &str) -> Result<()> {
        if self.contains(needed) {
            Ok(())
        } else {
            Err(ReviewError::forbidden(&actor.id, operation))
        }
    }
}

/// Compute the capability set of `actor` on `manuscript`.
///
/// `has_review_assignment` tells whether a review record exists for this
/// actor on this manuscript.
pub fn resolve(actor: &Actor, manuscript: &Manuscript, has_review_assignment: bool) -> Capabilities {
    let mut caps = Capabilities::empty();

    if actor.has_role(Role::Admin) {
        caps |= Capabilities::ADMINISTRATIVE;
    }
    if actor.has_role(Role::Editor) {
        caps |= Capabilities::EDITORIAL;
    }

    if manuscript.is_submitted_by(&actor.id) {
        caps |= Capabilities::VIEW;
    }

    let assigned_copy_editor =
        actor.has_role(Role::CopyEditor) && manuscript.is_copy_editor(&actor.id);

    match manuscript.status {
        ManuscriptStatus::Published => caps |= Capabilities::VIEW,
        // Co-authors without a `submitted_by` match still need visibility in
        // production.
        ManuscriptStatus::InProduction => {
            if assigned_copy_editor || actor.has_role(Role::Author) {
                caps |= Capabilities::VIEW;
            }
        }
        _ => {
            if actor.has_role(Role::Reviewer) && has_review_assignment {
                caps |= Capabilities::REVIEWING;
            }
            if assigned_copy_editor {
                caps |= Capabilities::VIEW;
            }
        }
    }

    caps
}
