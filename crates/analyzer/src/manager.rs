use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use nyx_core::{ModelStatus, PageView, Shutdown};
use nyx_store::Catalogue;
use tokio::sync::Mutex;

use crate::model::{TfIdfModel, TopicModel};

const RETRAIN_PERIOD: Duration = Duration::from_secs(24 * 60 * 60);
const DRAIN_POLL: Duration = Duration::from_millis(50);
const WAIT_POLL: Duration = Duration::from_millis(50);
const MODEL_FILE: &str = "model.t2v";

/// The singleton concurrency core. Constructed once per process and
/// shared (via `Arc`) with whatever serves queries — never reconstructed
/// per request.
pub struct ModelManager {
    status: Mutex<ModelStatus>,
    model: Mutex<Option<Arc<TfIdfModel>>>,
    inflight: Mutex<u64>,
    store: Catalogue,
    model_path: PathBuf,
    shutdown: Shutdown,
}

/// `get_pages` can also return the manager's current status in place of
/// results, e.g. while a model is still being built.
pub enum QueryOutcome {
    Pages(Vec<PageView>),
    Status(&'static str),
}

impl ModelManager {
    pub async fn start(store: Catalogue, model_dir: &str, shutdown: Shutdown) -> Arc<Self> {
        let model_path = PathBuf::from(model_dir).join(MODEL_FILE);

        let (status, model) = match TfIdfModel::load(&model_path) {
            Ok(m) => (ModelStatus::Ready, Some(Arc::new(m))),
            Err(e) => {
                tracing::info!(error = %e, "no usable model on disk, starting in setting_up");
                (ModelStatus::SettingUp, None)
            }
        };

        let manager = Arc::new(Self {
            status: Mutex::new(status),
            model: Mutex::new(model),
            inflight: Mutex::new(0),
            store,
            model_path,
            shutdown,
        });

        let run_immediately = status == ModelStatus::SettingUp;
        let manager_clone = manager.clone();
        tokio::spawn(async move { manager_clone.retrain_loop(run_immediately).await });

        manager
    }

    async fn retrain_loop(self: Arc<Self>, mut run_immediately: bool) {
        loop {
            if !run_immediately {
                tokio::select! {
                    _ = tokio::time::sleep(RETRAIN_PERIOD) => {}
                    _ = self.shutdown.stopped() => return,
                }
            }
            run_immediately = false;

            if self.shutdown.is_stopping() {
                return;
            }
            self.train_and_swap().await;
        }
    }

    async fn train_and_swap(&self) {
        let pages = match self.store.list_trainable().await {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(error = %e, "failed to load trainable pages, skipping retrain");
                return;
            }
        };
        let corpus: Vec<(String, String)> = pages
            .into_iter()
            .map(|p| (p.url, p.page_content.unwrap_or_default()))
            .collect();

        let trained = tokio::task::spawn_blocking(move || TfIdfModel::train(&corpus))
            .await
            .unwrap_or(None);

        let Some(mut new_model) = trained else {
            tracing::info!("training produced no model (empty corpus), keeping current model");
            return;
        };

        *self.status.lock().await = ModelStatus::Updating;
        self.drain_inflight().await;

        let path = self.model_path.clone();
        if let Err(e) = new_model.save(&path) {
            tracing::warn!(error = %e, "failed to persist trained model, swapping in memory anyway");
        }
        // Re-index strictly after save: keeps the on-disk file and the
        // served model from ever disagreeing about postings state.
        new_model.index();

        *self.model.lock().await = Some(Arc::new(new_model));
        *self.status.lock().await = ModelStatus::Ready;
        tracing::info!("model swapped, now ready");
    }

    async fn drain_inflight(&self) {
        loop {
            if let Ok(count) = self.inflight.try_lock() {
                if *count == 0 {
                    return;
                }
            }
            tokio::time::sleep(DRAIN_POLL).await;
        }
    }

    /// query path.
    pub async fn get_pages(&self, query: &str, num: usize) -> QueryOutcome {
        let n = num.clamp(1, 1000);

        let model = loop {
            let status = *self.status.lock().await;
            match status {
                ModelStatus::Updating => {
                    tokio::time::sleep(WAIT_POLL).await;
                    continue;
                }
                ModelStatus::SettingUp => return QueryOutcome::Status(status.as_literal()),
                ModelStatus::Ready => {
                    *self.inflight.lock().await += 1;
                    break self.model.lock().await.clone();
                }
            }
        };

        let Some(model) = model else {
            *self.inflight.lock().await -= 1;
            return QueryOutcome::Status(ModelStatus::SettingUp.as_literal());
        };

        let query_owned = query.to_string();
        let urls = tokio::task::spawn_blocking(move || model.query(&query_owned, n))
            .await
            .unwrap_or_default();

        *self.inflight.lock().await -= 1;

        let url_set: std::collections::HashSet<String> = urls.iter().cloned().collect();
        let pages = match self.store.search_by_urls(&url_set).await {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(error = %e, "failed to load page rows for query result");
                return QueryOutcome::Pages(Vec::new());
            }
        };

        let mut by_url: std::collections::HashMap<String, nyx_core::Page> =
            pages.into_iter().map(|p| (p.url.clone(), p)).collect();
        let ordered = urls
            .into_iter()
            .filter_map(|u| by_url.remove(&u))
            .map(|p| p.to_view())
            .collect();

        QueryOutcome::Pages(ordered)
    }
}
