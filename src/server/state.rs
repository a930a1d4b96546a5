use std::sync::Arc;

use crate::bundle::MapBundle;

// Shared, read-only state: the page is rendered once before the server starts
#[derive(Clone)]
pub struct AppState {
    pub page: Arc<String>,
    pub bundle: Arc<MapBundle>,
}

impl AppState {
    pub fn new(page: String, bundle: MapBundle) -> Self {
        Self {
            page: Arc::new(page),
            bundle: Arc::new(bundle),
        }
    }
}
