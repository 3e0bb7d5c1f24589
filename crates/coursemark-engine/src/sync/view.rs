//! Host-view capability for the scroll-sync engine.
//!
//! The engine owns the activation-line and line-mapping logic; everything
//! that touches live elements goes through [`ViewAdapter`], so a headless
//! test double is enough to exercise the whole engine.

/// Vertical extent of an element in the host's pixel space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub top: f64,
    pub bottom: f64,
}

/// A heading element carrying an anchor id inside the tracked preview
/// container. `top` is the offset in document space, stable under scrolling.
#[derive(Debug, Clone, PartialEq)]
pub struct AnchorElement {
    pub id: String,
    pub top: f64,
}

/// Scroll geometry of an internal scrollable panel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelGeometry {
    pub scroll_top: f64,
    pub client_height: f64,
    pub scroll_height: f64,
}

/// Scroll geometry of the whole window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowGeometry {
    pub scroll_y: f64,
    pub viewport_height: f64,
    pub document_height: f64,
}

/// Everything the sync engine needs from the live view.
///
/// Readers return `None`/empty when the element in question is not mounted
/// yet; the engine treats that as transient and skips the operation.
pub trait ViewAdapter {
    /// Heading elements bearing an id inside the tracked preview container.
    /// Order does not matter; the engine sorts by `top`.
    fn heading_anchors(&self) -> Vec<AnchorElement>;

    /// Whether the element with this id lives inside the tracked preview
    /// container, as opposed to a same-id element rendered elsewhere.
    fn anchor_in_preview(&self, id: &str) -> bool;

    /// Smoothly scroll the preview so the element with this id sits at the
    /// top of the container.
    fn scroll_preview_to_anchor(&mut self, id: &str);

    /// Smoothly scroll the editor to a vertical offset.
    fn scroll_editor_to(&mut self, offset: f64);

    /// Measured line height of the editor, available once it is laid out.
    fn measure_editor_line_height(&self) -> Option<f64>;

    /// Bounds of the outline link for this anchor id, if rendered.
    fn outline_link_bounds(&self, id: &str) -> Option<Bounds>;

    /// Visible bounds of the outline panel, if mounted.
    fn outline_panel_bounds(&self) -> Option<Bounds>;

    /// Smoothly scroll the outline panel so this link is centered.
    fn center_outline_link(&mut self, id: &str);
}
