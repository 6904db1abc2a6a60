use crate::{
    error::PagerError,
    pager::{FetchOutcome, Pager, debounce::FilterInputDebouncer},
};
use model::{
    events::FiltersPruned,
    pagination::filter::{FilterControl, FilterControlValue, FilterEvent, FilterMap, FilterValue},
};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Result of binding a set of filter controls to a pager.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterActivation {
    /// Value each declared control should display.
    pub controls: Vec<FilterControlValue>,
    /// Attributes dropped because no control or forced filter names them.
    pub pruned: Vec<String>,
    /// The single fetch issued after pruning, if anything was pruned.
    pub outcome: Option<FetchOutcome>,
}

impl Pager {
    /// Binds the declared filter controls: seeds their values from state,
    /// registers exact-match attributes and prunes filters that nothing
    /// declares any more. Fetches once, after all controls, if it pruned.
    pub async fn activate_filter_elements(
        &mut self,
        controls: &[FilterControl],
    ) -> Result<FilterActivation, PagerError> {
        let declared: BTreeSet<&str> = controls.iter().map(|c| c.attribute.as_str()).collect();

        let seeded = controls
            .iter()
            .map(|control| FilterControlValue {
                attribute: control.attribute.clone(),
                kind: control.kind,
                value: self
                    .state
                    .filters
                    .get(&control.attribute)
                    .cloned()
                    .unwrap_or_default(),
            })
            .collect();

        let mut exact_keys = self.state.exact_filter_keys.clone();
        let exact_controls: Vec<String> = controls
            .iter()
            .filter(|c| c.exact)
            .map(|c| c.attribute.clone())
            .collect();
        if !exact_controls.is_empty() {
            exact_keys.get_or_insert_with(BTreeSet::new).extend(exact_controls);
        }

        let mut kept = FilterMap::new();
        let mut pruned = Vec::new();
        for (attr, value) in &self.state.filters {
            if declared.contains(attr.as_str()) || self.state.forced_filters.contains_key(attr) {
                kept.insert(attr.clone(), value.clone());
            } else {
                pruned.push(attr.clone());
            }
        }

        self.store
            .initialize_filters(&mut self.state, kept, exact_keys);

        if pruned.is_empty() {
            return Ok(FilterActivation {
                controls: seeded,
                pruned,
                outcome: None,
            });
        }

        info!(pager_id = %self.state.id, removed = ?pruned, "Pruned undeclared filters");
        if let Some(bus) = &self.bus {
            bus.publish(FiltersPruned {
                pager_id: self.state.id.clone(),
                removed: pruned.clone(),
                timestamp: chrono::Utc::now(),
            })
            .await;
        }

        let outcome = self.fetch().await?;
        Ok(FilterActivation {
            controls: seeded,
            pruned,
            outcome: Some(outcome),
        })
    }

    /// Sets one filter, going back to page 1 and fetching if the effective
    /// value changed. Forced filters cannot be edited.
    pub async fn set_filter(
        &mut self,
        attribute: &str,
        value: FilterValue,
    ) -> Result<FetchOutcome, PagerError> {
        if self.state.forced_filters.contains_key(attribute) {
            return Err(PagerError::invalid(
                "filter",
                attribute,
                "forced filters cannot be changed",
            ));
        }

        let current = self.state.filters.get(attribute);
        let unchanged = match current {
            Some(existing) => *existing == value || (existing.is_empty() && value.is_empty()),
            None => value.is_empty(),
        };
        if unchanged {
            return Ok(FetchOutcome::Unchanged);
        }

        debug!(pager_id = %self.state.id, attribute, value = %value, "Filter changed");
        self.state.filters.insert(attribute.to_string(), value);
        self.state.page = 1;
        self.store.persist(&self.state);
        self.fetch().await
    }

    pub async fn clear_filter(&mut self, attribute: &str) -> Result<FetchOutcome, PagerError> {
        self.set_filter(attribute, FilterValue::Null).await
    }

    pub async fn handle_filter_event(
        &mut self,
        event: FilterEvent,
    ) -> Result<FetchOutcome, PagerError> {
        match event {
            FilterEvent::Commit(attribute, value) => self.set_filter(&attribute, value).await,
            FilterEvent::Escape(attribute) => self.clear_filter(&attribute).await,
        }
    }

    /// Feeds debounced filter input into the pager until the input side
    /// closes. Rejected edits and failed fetches are logged and skipped.
    /// Returns how many events were handled.
    pub async fn drive_filter_input(
        &mut self,
        debouncer: &mut FilterInputDebouncer,
    ) -> usize {
        let mut handled = 0;
        while let Some(event) = debouncer.next().await {
            handled += 1;
            if let Err(e) = self.handle_filter_event(event).await {
                warn!(pager_id = %self.state.id, error = %e, "Filter event not applied");
            }
        }
        handled
    }
}
