//! Configuration for the planner and the conflict resolver.

/// Configuration for single-agent path search.
///
/// # Example
///
/// ```
/// use agv_types::PlannerConfig;
///
/// let config = PlannerConfig::default().with_max_expansions(50_000);
/// assert_eq!(config.max_expansions(), 50_000);
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlannerConfig {
    /// Maximum number of node expansions before the search gives up.
    max_expansions: usize,
}

impl PlannerConfig {
    /// Creates a configuration with the default expansion cap (10 000).
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_expansions: 10_000,
        }
    }

    /// Sets the expansion cap.
    #[must_use]
    pub const fn with_max_expansions(mut self, max: usize) -> Self {
        self.max_expansions = max;
        self
    }

    /// Returns the expansion cap.
    #[must_use]
    pub const fn max_expansions(&self) -> usize {
        self.max_expansions
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration for conflict resolution.
///
/// # Example
///
/// ```
/// use agv_types::ResolverConfig;
///
/// let config = ResolverConfig::default()
///     .with_max_depth(10)
///     .with_max_scenarios(512);
/// assert_eq!(config.max_depth(), 10);
/// assert_eq!(config.max_scenarios(), 512);
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResolverConfig {
    /// Maximum recursion depth of the repair loop.
    max_depth: usize,
    /// Hard cap on the number of candidate scenarios enumerated for a
    /// single conflict. Hitting the cap is logged, never silent.
    max_scenarios: usize,
}

impl ResolverConfig {
    /// Creates a configuration with the default bounds
    /// (depth 30, 4096 scenarios per conflict).
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_depth: 30,
            max_scenarios: 4096,
        }
    }

    /// Sets the recursion depth cap.
    #[must_use]
    pub const fn with_max_depth(mut self, max: usize) -> Self {
        self.max_depth = max;
        self
    }

    /// Sets the per-conflict scenario cap.
    #[must_use]
    pub const fn with_max_scenarios(mut self, max: usize) -> Self {
        self.max_scenarios = max;
        self
    }

    /// Returns the recursion depth cap.
    #[must_use]
    pub const fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Returns the per-conflict scenario cap.
    #[must_use]
    pub const fn max_scenarios(&self) -> usize {
        self.max_scenarios
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self::new()
    }
}
