use std::sync::Arc;

use crate::ocr::OcrEngine;
use crate::preview::PreviewCache;
use crate::settings::Settings;
use crate::store::Store;

pub struct ServerState {
    pub(crate) settings: Settings,
    pub(crate) store: Store,
    pub(crate) previews: PreviewCache,
    pub(crate) ocr: Arc<dyn OcrEngine>,
}

impl ServerState {
    pub fn new(settings: Settings, store: Store, ocr: Arc<dyn OcrEngine>) -> Self {
        let previews = PreviewCache::new(settings.preview_ttl(), settings.preview_capacity);
        Self {
            settings,
            store,
            previews,
            ocr,
        }
    }
}
