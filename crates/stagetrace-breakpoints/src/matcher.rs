//! Composable matcher chains.
//!
//! A breakpoint kind's matching logic is a [`MatchChain`]: an ordered list of
//! [`Matcher`] links evaluated front to back. Each link either lets the event
//! through to the next link or rejects it. A chain is itself a matcher, so a
//! kind can extend another kind by prepending its own checks to the other
//! kind's chain.

use std::sync::Arc;

use stagetrace_types::{EventTag, RuntimeEvent};

use crate::breakpoint::Breakpoint;
use crate::error::BreakpointMatchError;

/// Result of one matcher link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Hand the event to the next link.
    Continue,
    /// Stop; the breakpoint does not fire.
    Reject,
}

/// One link in a matcher chain.
pub trait Matcher: Send + Sync {
    /// Inspect `event` against `breakpoint`'s configuration.
    fn check(
        &self,
        breakpoint: &Breakpoint,
        event: &RuntimeEvent,
    ) -> Result<Verdict, BreakpointMatchError>;
}

/// Ordered list of matchers. Fires only if every link continues.
#[derive(Clone, Default)]
pub struct MatchChain {
    links: Vec<Arc<dyn Matcher>>,
}

impl MatchChain {
    /// An empty chain, which matches everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a link.
    #[must_use]
    pub fn then(mut self, matcher: impl Matcher + 'static) -> Self {
        self.links.push(Arc::new(matcher));
        self
    }

    /// Number of links.
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Whether the chain has no links.
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Run the chain, returning whether the breakpoint fires.
    pub fn evaluate(
        &self,
        breakpoint: &Breakpoint,
        event: &RuntimeEvent,
    ) -> Result<bool, BreakpointMatchError> {
        Ok(self.check(breakpoint, event)? == Verdict::Continue)
    }
}

impl Matcher for MatchChain {
    fn check(
        &self,
        breakpoint: &Breakpoint,
        event: &RuntimeEvent,
    ) -> Result<Verdict, BreakpointMatchError> {
        for link in &self.links {
            if link.check(breakpoint, event)? == Verdict::Reject {
                return Ok(Verdict::Reject);
            }
        }
        Ok(Verdict::Continue)
    }
}

impl core::fmt::Debug for MatchChain {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MatchChain")
            .field("links", &self.links.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Built-in links
// ---------------------------------------------------------------------------

/// Fails with [`BreakpointMatchError::UnsupportedEvent`] unless the event
/// has the given shape.
#[derive(Debug, Clone, Copy)]
pub struct RequireEvent(pub EventTag);

impl Matcher for RequireEvent {
    fn check(
        &self,
        breakpoint: &Breakpoint,
        event: &RuntimeEvent,
    ) -> Result<Verdict, BreakpointMatchError> {
        let tag = event.tag();
        if tag == self.0 {
            Ok(Verdict::Continue)
        } else {
            Err(BreakpointMatchError::UnsupportedEvent {
                breakpoint: breakpoint.id(),
                kind: breakpoint.kind().id(),
                tag,
            })
        }
    }
}

/// Continues only if the event targets the breakpoint's configured position.
///
/// A breakpoint with no position configured never matches.
#[derive(Debug, Clone, Copy, Default)]
pub struct PositionFilter;

impl Matcher for PositionFilter {
    fn check(
        &self,
        breakpoint: &Breakpoint,
        event: &RuntimeEvent,
    ) -> Result<Verdict, BreakpointMatchError> {
        Ok(match breakpoint.fields.pos {
            Some(pos) if pos == event.target_pos() => Verdict::Continue,
            _ => Verdict::Reject,
        })
    }
}

/// Continues if the breakpoint has no world configured or the event happens
/// in the configured world.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorldFilter;

impl Matcher for WorldFilter {
    fn check(
        &self,
        breakpoint: &Breakpoint,
        event: &RuntimeEvent,
    ) -> Result<Verdict, BreakpointMatchError> {
        Ok(match breakpoint.fields.world.as_deref() {
            Some(world) if world != event.world() => Verdict::Reject,
            _ => Verdict::Continue,
        })
    }
}

/// Always continues.
#[derive(Debug, Clone, Copy, Default)]
pub struct Always;

impl Matcher for Always {
    fn check(
        &self,
        _breakpoint: &Breakpoint,
        _event: &RuntimeEvent,
    ) -> Result<Verdict, BreakpointMatchError> {
        Ok(Verdict::Continue)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use stagetrace_types::{BlockPos, BlockUpdateEvent, BreakpointId, UpdateCause};

    use super::*;
    use crate::kind::BreakpointKind;
    use crate::kinds::BlockUpdateKind;

    fn update_at(pos: BlockPos, world: &str) -> RuntimeEvent {
        RuntimeEvent::BlockUpdate(BlockUpdateEvent {
            world: world.to_owned(),
            target_pos: pos,
            source_pos: None,
            cause: UpdateCause::Neighbor,
        })
    }

    fn breakpoint() -> Breakpoint {
        Arc::new(BlockUpdateKind::new()).create(BreakpointId(1))
    }

    /// Counts how often it is reached.
    struct Counting(Arc<AtomicUsize>);

    impl Matcher for Counting {
        fn check(&self, _: &Breakpoint, _: &RuntimeEvent) -> Result<Verdict, BreakpointMatchError> {
            self.0.fetch_add(1, Ordering::Relaxed);
            Ok(Verdict::Continue)
        }
    }

    #[test]
    fn empty_chain_matches() {
        let chain = MatchChain::new();
        assert!(chain.is_empty());
        let event = update_at(BlockPos::new(0, 0, 0), "overworld");
        assert_eq!(chain.evaluate(&breakpoint(), &event), Ok(true));
    }

    #[test]
    fn rejection_short_circuits_later_links() {
        let reached = Arc::new(AtomicUsize::new(0));
        let chain = MatchChain::new()
            .then(PositionFilter)
            .then(Counting(Arc::clone(&reached)));

        let mut bp = breakpoint();
        bp.fields.pos = Some(BlockPos::new(1, 2, 3));

        let miss = update_at(BlockPos::new(9, 9, 9), "overworld");
        assert_eq!(chain.evaluate(&bp, &miss), Ok(false));
        assert_eq!(reached.load(Ordering::Relaxed), 0);

        let hit = update_at(BlockPos::new(1, 2, 3), "overworld");
        assert_eq!(chain.evaluate(&bp, &hit), Ok(true));
        assert_eq!(reached.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn position_filter_without_position_never_matches() {
        let bp = breakpoint();
        let event = update_at(BlockPos::new(0, 0, 0), "overworld");
        assert_eq!(PositionFilter.check(&bp, &event), Ok(Verdict::Reject));
    }

    #[test]
    fn world_filter_is_open_when_unset() {
        let mut bp = breakpoint();
        let nether = update_at(BlockPos::new(0, 0, 0), "nether");
        assert_eq!(WorldFilter.check(&bp, &nether), Ok(Verdict::Continue));

        bp.fields.world = Some(String::from("overworld"));
        assert_eq!(WorldFilter.check(&bp, &nether), Ok(Verdict::Reject));
    }

    #[test]
    fn require_event_fails_loudly_and_stops_the_chain() {
        let reached = Arc::new(AtomicUsize::new(0));
        let chain = MatchChain::new()
            .then(RequireEvent(EventTag::BlockChanged))
            .then(Counting(Arc::clone(&reached)));
        let result = chain.evaluate(&breakpoint(), &update_at(BlockPos::new(0, 0, 0), "overworld"));
        assert_eq!(
            result,
            Err(BreakpointMatchError::UnsupportedEvent {
                breakpoint: BreakpointId(1),
                kind: "block_update",
                tag: EventTag::BlockUpdate,
            })
        );
        assert_eq!(reached.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn chains_nest() {
        let inner = MatchChain::new().then(Always).then(WorldFilter);
        let outer = MatchChain::new().then(PositionFilter).then(inner);
        assert_eq!(outer.len(), 2);

        let mut bp = breakpoint();
        bp.fields.pos = Some(BlockPos::new(4, 5, 6));
        bp.fields.world = Some(String::from("end"));

        let wrong_world = update_at(BlockPos::new(4, 5, 6), "overworld");
        assert_eq!(outer.evaluate(&bp, &wrong_world), Ok(false));
        let right = update_at(BlockPos::new(4, 5, 6), "end");
        assert_eq!(outer.evaluate(&bp, &right), Ok(true));
    }
}
