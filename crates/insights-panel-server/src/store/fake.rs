// SPDX-License-Identifier: Apache-2.0

use crate::{SheetStoreBackend, StoreError, WorksheetFetch};
use async_trait::async_trait;
use insights_panel_model::SheetRow;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

pub struct FakeSheetStore {
    pub tables: Mutex<HashMap<String, Vec<SheetRow>>>,
    pub fetch_calls: AtomicU64,
    pub fail_all: AtomicBool,
    pub slow_read: bool,
    pub slow_read_delay: Duration,
}

impl Default for FakeSheetStore {
    fn default() -> Self {
        Self {
            tables: Mutex::new(HashMap::new()),
            fetch_calls: AtomicU64::new(0),
            fail_all: AtomicBool::new(false),
            slow_read: false,
            slow_read_delay: Duration::from_millis(0),
        }
    }
}

#[async_trait]
impl SheetStoreBackend for FakeSheetStore {
    fn backend_tag(&self) -> &'static str {
        "fake"
    }

    async fn fetch_worksheet(&self, title: &str) -> Result<WorksheetFetch, StoreError> {
        self.fetch_calls.fetch_add(1, Ordering::Relaxed);
        if self.slow_read {
            let delay = if self.slow_read_delay.is_zero() {
                Duration::from_millis(200)
            } else {
                self.slow_read_delay
            };
            tokio::time::sleep(delay).await;
        }
        if self.fail_all.load(Ordering::Relaxed) {
            return Err(StoreError("injected store failure".to_string()));
        }
        match self.tables.lock().await.get(title) {
            Some(rows) => Ok(WorksheetFetch::Found(rows.clone())),
            None => Ok(WorksheetFetch::NotFound),
        }
    }
}
