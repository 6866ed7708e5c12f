//! Host search filters.

use farmhost_store::Host;
use regex::Regex;

use crate::error::{ControlError, Result};
use crate::types::HostSearch;

/// A compiled [`HostSearch`].
#[derive(Debug)]
pub struct HostFilter {
    names: Vec<Regex>,
    search: HostSearch,
}

impl HostFilter {
    /// Compile the name patterns of a search.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::InvalidRequest` if a name pattern is not a valid
    /// regular expression.
    pub fn compile(search: &HostSearch) -> Result<Self> {
        let names = search
            .names
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| {
                    ControlError::InvalidRequest(format!("bad host name pattern {pattern:?}: {e}"))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            names,
            search: search.clone(),
        })
    }

    /// Check a host against every criterion.
    #[must_use]
    pub fn matches(&self, host: &Host) -> bool {
        (self.names.is_empty() || self.names.iter().any(|re| re.is_match(&host.name)))
            && (self.search.allocations.is_empty()
                || self.search.allocations.contains(&host.allocation_id))
            && (self.search.states.is_empty() || self.search.states.contains(&host.hardware_state))
    }
}
