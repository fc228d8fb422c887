//! Bump engine: pure functions from a current [`Version`] and a
//! [`Directive`] to the next [`Version`].
//!
//! # Rules
//!
//! `bump_major`, `bump_minor` and `bump_patch` increment their component,
//! zero the lower-order ones and clear any pre-release. `alpha` attaches
//! `-alpha.0` to the incremented version; an integer sets the component to
//! exactly that value and is rejected if lower than the current value.
//!
//! `bump_pre` walks `alpha < beta < rc` forward only. Entering a stage from
//! a release version first opens a new patch slot; switching to a higher
//! stage restarts the counter at 0; repeating the current stage (or a bare
//! increment) bumps the counter.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, instrument};

use super::{Component, Directive, PreKind, Version, VersionError, VersionResult};

/// Which bump operation to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BumpLevel {
    /// Major release (X.0.0).
    Major,
    /// Minor release (x.Y.0).
    Minor,
    /// Patch release (x.y.Z).
    Patch,
    /// Pre-release (x.y.z-TYPE.N).
    Pre,
}

impl fmt::Display for BumpLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Major => write!(f, "major"),
            Self::Minor => write!(f, "minor"),
            Self::Patch => write!(f, "patch"),
            Self::Pre => write!(f, "pre"),
        }
    }
}

impl BumpLevel {
    /// Apply this bump to `current`.
    pub fn apply(self, directive: &Directive, current: &Version) -> VersionResult<Version> {
        match self {
            Self::Major => bump_major(directive, current),
            Self::Minor => bump_minor(directive, current),
            Self::Patch => bump_patch(directive, current),
            Self::Pre => bump_pre(directive, current),
        }
    }
}

/// Next major version.
pub fn bump_major(directive: &Directive, current: &Version) -> VersionResult<Version> {
    bump_component(Component::Major, directive, current)
}

/// Next minor version.
pub fn bump_minor(directive: &Directive, current: &Version) -> VersionResult<Version> {
    bump_component(Component::Minor, directive, current)
}

/// Next patch version.
pub fn bump_patch(directive: &Directive, current: &Version) -> VersionResult<Version> {
    bump_component(Component::Patch, directive, current)
}

/// Next pre-release version.
#[instrument(skip_all, fields(%directive, %current))]
pub fn bump_pre(directive: &Directive, current: &Version) -> VersionResult<Version> {
    let pre = current.pre();
    let next = match (directive, pre) {
        (Directive::Increment, None) => {
            debug!("entering pre-release cycle on a new patch");
            return bump_patch(&Directive::Alpha, current);
        }
        (Directive::Increment, Some(pre)) => current.with_pre(pre.kind, next_counter(pre.value, current)?),
        (Directive::Alpha, _) => return enter_stage(PreKind::Alpha, current),
        (Directive::Beta, _) => return enter_stage(PreKind::Beta, current),
        (Directive::Rc, _) => return enter_stage(PreKind::Rc, current),
        (Directive::Exact(_) | Directive::Other(_), _) => {
            return Err(VersionError::UnsupportedPreRelease(directive.to_string()));
        }
    };
    debug!(%next, "computed pre-release version");
    Ok(next)
}

/// Increment the trailing numeric component: the pre-release counter when
/// one is present, otherwise the patch.
pub fn bump_auto(current: &Version) -> VersionResult<Version> {
    match current.pre() {
        Some(pre) => Ok(current.with_pre(pre.kind, next_counter(pre.value, current)?)),
        None => bump_patch(&Directive::Increment, current),
    }
}

/// Move `current` into (or along) the `requested` pre-release stage.
fn enter_stage(requested: PreKind, current: &Version) -> VersionResult<Version> {
    let Some(pre) = current.pre() else {
        // Only alpha opens a new patch; later stages label the current core.
        return match requested {
            PreKind::Alpha => bump_patch(&Directive::Alpha, current),
            PreKind::Beta | PreKind::Rc => Ok(current.with_pre(requested, 0)),
        };
    };

    if requested < pre.kind {
        return Err(VersionError::PreReleaseDowngrade {
            requested,
            current: pre.kind,
        });
    }

    let value = if requested == pre.kind {
        next_counter(pre.value, current)?
    } else {
        0
    };
    Ok(current.with_pre(requested, value))
}

#[instrument(skip_all, fields(%component, %directive, %current))]
fn bump_component(
    component: Component,
    directive: &Directive,
    current: &Version,
) -> VersionResult<Version> {
    let current_value = current.component(component);

    let target = match directive {
        Directive::Increment | Directive::Alpha => current_value
            .checked_add(1)
            .ok_or_else(|| overflow(component, current))?,
        Directive::Exact(requested) if *requested < current_value => {
            return Err(VersionError::Downgrade {
                component,
                requested: *requested,
                current: current_value,
            });
        }
        Directive::Exact(requested) => *requested,
        Directive::Beta | Directive::Rc | Directive::Other(_) => {
            return Err(VersionError::UnsupportedPreRelease(directive.to_string()));
        }
    };

    let released = match component {
        Component::Major => Version::new(target, 0, 0),
        Component::Minor => Version::new(current.major(), target, 0),
        Component::Patch => Version::new(current.major(), current.minor(), target),
    };

    let next = if *directive == Directive::Alpha {
        released.with_pre(PreKind::Alpha, 0)
    } else {
        released
    };
    debug!(%next, "computed version");
    Ok(next)
}

fn next_counter(value: u64, current: &Version) -> VersionResult<u64> {
    value.checked_add(1).ok_or_else(|| VersionError::Malformed {
        raw: current.raw().to_owned(),
        reason: "pre-release counter overflow".into(),
    })
}

fn overflow(component: Component, current: &Version) -> VersionError {
    VersionError::Malformed {
        raw: current.raw().to_owned(),
        reason: format!("{component} component overflow"),
    }
}
