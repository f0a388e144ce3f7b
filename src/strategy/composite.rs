//! Fan-out over multiple cleanup strategies

use crate::config::SweepConfig;
use crate::content::PageContext;
use crate::error::Result;
use crate::strategy::{CleanupLocation, CleanupStrategy};
use crate::warnings::WarningLog;

/// Runs an ordered list of child strategies against each page and
/// concatenates their locations in child order.
///
/// Children added after processing began affect only pages processed
/// afterwards. No cross-child de-duplication: overlapping locations are
/// legal and the rewrite engine handles them.
#[derive(Default)]
pub struct CompositeCleanupStrategy {
    children: Vec<Box<dyn CleanupStrategy>>,
}

impl CompositeCleanupStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, strategy: Box<dyn CleanupStrategy>) -> &mut Self {
        self.children.push(strategy);
        self
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

impl CleanupStrategy for CompositeCleanupStrategy {
    fn compute_locations(
        &self,
        ctx: &PageContext<'_>,
        config: &SweepConfig,
        warnings: &mut WarningLog,
    ) -> Result<Vec<CleanupLocation>> {
        let mut locations = Vec::new();
        for child in &self.children {
            locations.extend(child.compute_locations(ctx, config, warnings)?);
        }
        Ok(locations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::strategy::Region;

    struct FixedStrategy(Vec<Rect>);

    impl CleanupStrategy for FixedStrategy {
        fn compute_locations(
            &self,
            ctx: &PageContext<'_>,
            _config: &SweepConfig,
            _warnings: &mut WarningLog,
        ) -> Result<Vec<CleanupLocation>> {
            Ok(self
                .0
                .iter()
                .map(|r| CleanupLocation::new(ctx.number, Region::Rect(*r)))
                .collect())
        }
    }

    #[test]
    fn test_children_concatenate_in_order() {
        let mut composite = CompositeCleanupStrategy::new();
        composite.add(Box::new(FixedStrategy(vec![
            Rect::new(0.0, 0.0, 1.0, 1.0),
            Rect::new(2.0, 0.0, 3.0, 1.0),
        ])));
        composite.add(Box::new(FixedStrategy(vec![Rect::new(
            5.0, 0.0, 6.0, 1.0,
        )])));

        let doc = lopdf::Document::with_version("1.5");
        let ctx = PageContext {
            doc: &doc,
            number: 1,
            id: (1, 0),
        };
        let mut warnings = WarningLog::new();
        let locations = composite
            .compute_locations(&ctx, &SweepConfig::default(), &mut warnings)
            .unwrap();
        assert_eq!(locations.len(), 3);
        assert_eq!(
            locations[2].region.bounding_rect(),
            Rect::new(5.0, 0.0, 6.0, 1.0)
        );
    }
}
