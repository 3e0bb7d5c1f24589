pub mod view;

use crate::outline::{OutlineItem, flatten_outline};
use view::{AnchorElement, PanelGeometry, ViewAdapter, WindowGeometry};

/// Tunables for active-heading resolution. Defaults match the shipped UI.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncOptions {
    /// Activation line offset below a panel's top edge, in pixels.
    pub panel_activation_offset: f64,
    /// Activation line as a fraction of viewport height, in window mode.
    pub window_activation_ratio: f64,
    /// Distance from maximum scroll treated as "at the bottom".
    pub bottom_epsilon: f64,
    /// Slack added to the editor scroll offset before line conversion, so a
    /// heading flush with the top edge still counts as visible.
    pub editor_scroll_slack: f64,
    /// Edge buffer inside which an outline link still counts as visible.
    pub outline_edge_buffer: f64,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            panel_activation_offset: 80.0,
            window_activation_ratio: 0.2,
            bottom_epsilon: 5.0,
            editor_scroll_slack: 5.0,
            outline_edge_buffer: 0.0,
        }
    }
}

/// Keeps the editor, the rendered preview and the outline navigator agreed on
/// the currently active heading.
///
/// State is explicit rather than reactive: hosts route their scroll events to
/// the `handle_*` methods, pump [`ScrollSync::on_frame`] from their scheduler
/// tick, and read [`ScrollSync::active_anchor_id`]. Every handler returns the
/// newly active id when it changed, so push-style hosts can fan the signal
/// out (progress tracking, highlight updates) from the return value alone.
///
/// Missing preconditions (unmounted container, unmeasured line height) make
/// the affected operation a silent no-op; sync degrades, it never fails.
pub struct ScrollSync<V: ViewAdapter> {
    view: V,
    options: SyncOptions,
    active_anchor_id: Option<String>,
    /// In-document heading elements, sorted by document-space top.
    anchors: Vec<AnchorElement>,
    /// (anchor id, source line) pairs in document order, for editor mapping.
    headings_by_line: Vec<(String, usize)>,
    line_height: Option<f64>,
    editing: bool,
    /// Latest unresolved editor scroll offset; replaced, never queued.
    pending_editor_scroll: Option<f64>,
    /// Outline link to reveal once the triggering update has settled.
    pending_outline_reveal: Option<String>,
}

impl<V: ViewAdapter> ScrollSync<V> {
    pub fn new(view: V) -> Self {
        Self::with_options(view, SyncOptions::default())
    }

    pub fn with_options(view: V, options: SyncOptions) -> Self {
        Self {
            view,
            options,
            active_anchor_id: None,
            anchors: Vec::new(),
            headings_by_line: Vec::new(),
            line_height: None,
            editing: false,
            pending_editor_scroll: None,
            pending_outline_reveal: None,
        }
    }

    pub fn active_anchor_id(&self) -> Option<&str> {
        self.active_anchor_id.as_deref()
    }

    pub fn is_editing(&self) -> bool {
        self.editing
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    /// Replace the outline used for editor-line mapping. Call after each
    /// parse pass.
    pub fn set_outline(&mut self, outline: &[OutlineItem]) {
        self.headings_by_line = flatten_outline(outline);
    }

    /// Re-query the heading elements in the preview container. Must be re-run
    /// whenever rendered content changes or the scroll container switches.
    pub fn refresh_anchors(&mut self) {
        let mut anchors = self.view.heading_anchors();
        anchors.sort_by(|a, b| a.top.total_cmp(&b.top));
        self.anchors = anchors;
    }

    /// Scroll event from an internal preview panel.
    ///
    /// The activation line sits a fixed offset below the panel's top edge;
    /// the active heading is the last anchor above it. This rule updates only
    /// on change and never clears an already-active anchor.
    pub fn handle_panel_scroll(&mut self, geometry: PanelGeometry) -> Option<String> {
        if self.editing || self.anchors.is_empty() {
            return None;
        }

        let activation = geometry.scroll_top + self.options.panel_activation_offset;
        let mut candidate = None;
        for anchor in &self.anchors {
            if anchor.top < activation {
                candidate = Some(anchor.id.clone());
            } else {
                break;
            }
        }

        self.set_active(candidate?)
    }

    /// Scroll event when the whole window is the scroll container.
    pub fn handle_window_scroll(&mut self, geometry: WindowGeometry) -> Option<String> {
        if self.editing || self.anchors.is_empty() {
            return None;
        }

        // Within a few pixels of maximum scroll the last anchor wins
        // outright; short trailing sections never cross the activation line.
        let max_visible = geometry.scroll_y + geometry.viewport_height;
        if max_visible >= geometry.document_height - self.options.bottom_epsilon {
            let last = self.anchors.last()?.id.clone();
            return self.set_active(last);
        }

        let activation = geometry.viewport_height * self.options.window_activation_ratio;
        let mut candidate = None;
        let mut found_below = false;
        for (index, anchor) in self.anchors.iter().enumerate() {
            if anchor.top - geometry.scroll_y > activation {
                // First anchor below the line; its predecessor is the one
                // being read. No predecessor means nothing is active yet.
                candidate = index.checked_sub(1).map(|i| self.anchors[i].id.clone());
                found_below = true;
                break;
            }
        }
        if !found_below {
            candidate = self.anchors.last().map(|a| a.id.clone());
        }

        self.set_active(candidate?)
    }

    /// Scroll event from the editor. Resolution is deferred to the next
    /// [`ScrollSync::on_frame`] tick; a newer event cancels and replaces a
    /// pending one, so bursts coalesce to one computation per tick.
    pub fn handle_editor_scroll(&mut self, scroll_top: f64) {
        if !self.editing || self.line_height.is_none() {
            return;
        }
        self.pending_editor_scroll = Some(scroll_top);
    }

    /// Scheduler tick. Performs the outline reveal scheduled by the previous
    /// update (after the triggering change has settled in the view), then
    /// resolves the pending editor scroll, last event wins.
    pub fn on_frame(&mut self) -> Option<String> {
        if let Some(id) = self.pending_outline_reveal.take() {
            self.reveal_outline_link(&id);
        }
        let scroll_top = self.pending_editor_scroll.take()?;
        self.resolve_editor_scroll(scroll_top)
    }

    /// Jump to a heading, typically from an outline link. The anchor becomes
    /// active immediately, without recomputation, so the smooth scroll that
    /// follows cannot race the activation.
    pub fn scroll_to_anchor(&mut self, id: &str) {
        self.set_active(id.to_string());

        if self.editing {
            if let Some(line_height) = self.line_height
                && let Some((_, line)) = self.headings_by_line.iter().find(|(hid, _)| hid == id)
            {
                self.view.scroll_editor_to(*line as f64 * line_height);
            }
        } else if self.view.anchor_in_preview(id) {
            // A same-id element rendered outside the tracked container must
            // not be scrolled to.
            self.view.scroll_preview_to_anchor(id);
        }
    }

    /// Switch between edit and preview modes. Entering edit mode measures the
    /// editor's line height, so hosts must call this after the editor is
    /// visible and laid out; an unmeasurable editor leaves editor sync off
    /// until the next switch.
    pub fn set_editing(&mut self, editing: bool) {
        self.editing = editing;
        if editing {
            self.line_height = self.view.measure_editor_line_height();
            if self.line_height.is_none() {
                log::debug!("editor line height not measurable; editor scroll sync disabled");
            }
        } else {
            self.pending_editor_scroll = None;
        }
    }

    fn resolve_editor_scroll(&mut self, scroll_top: f64) -> Option<String> {
        let line_height = self.line_height?;
        if line_height <= 0.0 {
            return None;
        }

        let top_line =
            ((scroll_top.max(0.0) + self.options.editor_scroll_slack) / line_height).floor() as usize;
        let mut candidate = None;
        for (id, line) in &self.headings_by_line {
            if *line <= top_line {
                candidate = Some(id.clone());
            } else {
                break;
            }
        }

        self.set_active(candidate?)
    }

    /// Record a new active anchor. Returns the id when it actually changed,
    /// suppressing redundant downstream work, and schedules the outline
    /// reveal for the next tick.
    fn set_active(&mut self, id: String) -> Option<String> {
        if self.active_anchor_id.as_deref() == Some(id.as_str()) {
            return None;
        }
        self.active_anchor_id = Some(id.clone());
        self.pending_outline_reveal = Some(id.clone());
        Some(id)
    }

    fn reveal_outline_link(&mut self, id: &str) {
        let (Some(panel), Some(link)) = (
            self.view.outline_panel_bounds(),
            self.view.outline_link_bounds(id),
        ) else {
            return;
        };

        let buffer = self.options.outline_edge_buffer;
        let visible = link.top >= panel.top - buffer && link.bottom <= panel.bottom + buffer;
        if !visible {
            self.view.center_outline_link(id);
        }
    }
}
