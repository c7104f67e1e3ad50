use crate::calendar::{self, Slot};

/// Two-anchor contiguous range selection for picking a session's slots.
///
/// The first click anchors a start; the second fills every slot between the
/// two anchors, both ends included, swapping anchors when the second click
/// lands earlier in the day. A third click restarts from scratch. Blocked
/// slots (held, pending elsewhere, or already past) can never be clicked,
/// and a range that would sweep across one aborts and restarts at the
/// clicked slot instead of silently skipping the obstacle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeSelection {
    selected: Vec<Slot>,
    start: Option<Slot>,
    end: Option<Slot>,
}

impl RangeSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selected slots in catalog order.
    pub fn selected(&self) -> &[Slot] {
        &self.selected
    }

    pub fn markers(&self) -> (Option<Slot>, Option<Slot>) {
        (self.start, self.end)
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn clear(&mut self) {
        self.selected.clear();
        self.start = None;
        self.end = None;
    }

    /// Apply one click. `blocked` reports slots the clicker may not occupy;
    /// clicks on those are ignored outright.
    pub fn click(&mut self, slot: Slot, blocked: impl Fn(Slot) -> bool) {
        if blocked(slot) {
            return;
        }

        match self.selected.len() {
            0 => self.restart(slot),
            1 => {
                let anchor = self.selected[0];
                if slot == anchor {
                    // Re-clicking the sole selected slot deselects it.
                    self.clear();
                    return;
                }
                let (lo, hi) = if slot < anchor {
                    (slot, anchor)
                } else {
                    (anchor, slot)
                };
                let mut fill = calendar::slots_between(lo, hi);
                fill.push(hi);
                if fill.iter().any(|s| blocked(*s)) {
                    // Range would cross someone else's hold; start over here.
                    self.restart(slot);
                    return;
                }
                self.selected = fill;
                self.start = Some(lo);
                self.end = Some(hi);
            }
            // A completed range: any further click begins a new selection.
            _ => self.restart(slot),
        }
    }

    fn restart(&mut self, slot: Slot) {
        self.selected = vec![slot];
        self.start = Some(slot);
        self.end = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(label: &str) -> Slot {
        Slot::parse(label).unwrap()
    }

    fn slots(labels: &[&str]) -> Vec<Slot> {
        labels.iter().map(|l| slot(l)).collect()
    }

    fn open(_: Slot) -> bool {
        false
    }

    #[test]
    fn forward_range_includes_both_anchors() {
        let mut sel = RangeSelection::new();
        sel.click(slot("9:00 AM"), open);
        assert_eq!(sel.selected(), slots(&["9:00 AM"]));
        assert_eq!(sel.markers(), (Some(slot("9:00 AM")), None));

        sel.click(slot("10:00 AM"), open);
        assert_eq!(sel.selected(), slots(&["9:00 AM", "9:30 AM", "10:00 AM"]));
        assert_eq!(
            sel.markers(),
            (Some(slot("9:00 AM")), Some(slot("10:00 AM")))
        );
    }

    #[test]
    fn backward_range_swaps_anchors() {
        let mut sel = RangeSelection::new();
        sel.click(slot("9:00 AM"), open);
        sel.click(slot("8:00 AM"), open);
        assert_eq!(sel.selected(), slots(&["8:00 AM", "8:30 AM", "9:00 AM"]));
        assert_eq!(sel.markers(), (Some(slot("8:00 AM")), Some(slot("9:00 AM"))));
    }

    #[test]
    fn third_click_starts_a_new_selection() {
        let mut sel = RangeSelection::new();
        sel.click(slot("9:00 AM"), open);
        sel.click(slot("10:00 AM"), open);
        sel.click(slot("2:00 PM"), open);
        assert_eq!(sel.selected(), slots(&["2:00 PM"]));
        assert_eq!(sel.markers(), (Some(slot("2:00 PM")), None));
    }

    #[test]
    fn reclicking_sole_slot_clears() {
        let mut sel = RangeSelection::new();
        sel.click(slot("9:00 AM"), open);
        sel.click(slot("9:00 AM"), open);
        assert!(sel.is_empty());
        assert_eq!(sel.markers(), (None, None));
    }

    #[test]
    fn blocked_slot_cannot_be_clicked() {
        let mut sel = RangeSelection::new();
        sel.click(slot("9:00 AM"), |s| s == slot("9:00 AM"));
        assert!(sel.is_empty());
    }

    #[test]
    fn range_across_a_hold_restarts_at_the_click() {
        let busy = slot("9:30 AM");
        let mut sel = RangeSelection::new();
        sel.click(slot("9:00 AM"), |s| s == busy);
        sel.click(slot("10:30 AM"), |s| s == busy);
        // 9:30 is held, so the attempted 9:00–10:30 sweep aborts.
        assert_eq!(sel.selected(), slots(&["10:30 AM"]));
        assert_eq!(sel.markers(), (Some(slot("10:30 AM")), None));
    }
}
