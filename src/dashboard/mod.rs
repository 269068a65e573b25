//! Dashboard views and their runtime.
//!
//! Each page of the dashboard (sensors, gateway, transceiver, overview, gps)
//! is an independent [`DashboardView`] with its own reconciler, store and
//! cache entry. The [`Dashboard`] only wires configuration, the shared
//! key-value backend and the HTTP fetcher into new views.

mod view;

pub use view::{DashboardView, REFRESH_INTERVAL, ViewEvent, ViewHandle};

use crate::config::Config;
use crate::error::Result;
use crate::input::poll::Fetcher;
use crate::presentation::PresentationPort;
use crate::reconciler::UpdateReconciler;
use crate::store::{KeyValueStore, PersistenceAdapter};
use std::sync::Arc;

pub struct Dashboard {
    config: Config,
    store: Arc<dyn KeyValueStore>,
    fetcher: Arc<dyn Fetcher>,
}

impl Dashboard {
    pub fn new(config: Config, store: Arc<dyn KeyValueStore>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            config,
            store,
            fetcher,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Build (but do not start) the view named `name`.
    pub fn build_view(&self, name: &str, presenter: Box<dyn PresentationPort>) -> Result<DashboardView> {
        let view_config = self.config.view(name)?.clone();
        view_config.validate()?;
        let reconciler = UpdateReconciler::new(
            &view_config,
            self.config.staleness.evaluator(),
            PersistenceAdapter::new(self.store.clone()),
            presenter,
        );
        Ok(DashboardView::new(view_config, reconciler, self.fetcher.clone()))
    }

    /// Build and start a view, connecting to the broker for push sources.
    pub fn start_view(&self, name: &str, presenter: Box<dyn PresentationPort>) -> Result<ViewHandle> {
        self.build_view(name, presenter)?.start(&self.config.mqtt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ViewKind;
    use crate::error::DashboardError;
    use crate::input::poll::HttpFetcher;
    use crate::presentation::LogPresenter;
    use crate::store::MemoryKeyValueStore;

    fn dashboard() -> Dashboard {
        Dashboard::new(
            Config::default(),
            Arc::new(MemoryKeyValueStore::new()),
            Arc::new(HttpFetcher::new().unwrap()),
        )
    }

    #[test]
    fn test_build_known_view() {
        let view = dashboard()
            .build_view("gateway", Box::new(LogPresenter::new()))
            .unwrap();
        assert_eq!(view.config().kind, ViewKind::Gateway);
    }

    #[test]
    fn test_build_unknown_view() {
        assert!(matches!(
            dashboard().build_view("radar", Box::new(LogPresenter::new())),
            Err(DashboardError::UnknownView(_))
        ));
    }
}
