//! Navigation sync between the previewed page and the host.

use crate::messages::HistoryUpdate;

/// The page's router, as seen by the overlay.
///
/// The host asks the page to navigate through [`update`](Self::update). The
/// other direction (the page navigated on its own) is reported by the
/// platform calling [`OverlaySession::page_navigated`](crate::session::OverlaySession::page_navigated).
pub trait HistoryAdapter {
    fn update(&self, update: &HistoryUpdate);
}

impl<T: HistoryAdapter + ?Sized> HistoryAdapter for std::rc::Rc<T> {
    fn update(&self, update: &HistoryUpdate) {
        (**self).update(update)
    }
}

impl<T: HistoryAdapter + ?Sized> HistoryAdapter for Box<T> {
    fn update(&self, update: &HistoryUpdate) {
        (**self).update(update)
    }
}

/// Fill in the document title when the update has none.
pub fn with_title(mut update: HistoryUpdate, document_title: &str) -> HistoryUpdate {
    if update.title.as_deref().is_none_or(str::is_empty) {
        update.title = Some(document_title.to_string());
    }
    update
}
