/// Popup components for hostdeck.
///
/// This module aggregates the concrete popups (confirm, form-based dialogs)
/// and re-exports the shared drawing helpers from `components/popup.rs`.
pub mod confirm;
pub mod dialogs;
pub mod form;

pub use crate::components::popup::{
    centered_rect_fixed, draw_popup_frame, inner_rect, render_backdrop,
};
