//! Diagnostic checklist: the catalog of known steps and the shared done-set.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Checklist grouping, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    Power,
    Motherboard,
    #[serde(rename = "CPU")]
    Cpu,
    Memory,
    #[serde(rename = "GPU")]
    Gpu,
    Storage,
    Other,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Power,
        Category::Motherboard,
        Category::Cpu,
        Category::Memory,
        Category::Gpu,
        Category::Storage,
        Category::Other,
    ];
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Power => "Power",
            Category::Motherboard => "Motherboard",
            Category::Cpu => "CPU",
            Category::Memory => "Memory",
            Category::Gpu => "GPU",
            Category::Storage => "Storage",
            Category::Other => "Other",
        };
        f.write_str(name)
    }
}

/// A diagnostic step the user may have already performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChecklistStep {
    pub id: &'static str,
    pub text: &'static str,
    pub category: Category,
}

const fn step(category: Category, id: &'static str, text: &'static str) -> ChecklistStep {
    ChecklistStep { id, text, category }
}

/// The canonical step catalog, grouped by category in display order.
pub const CATALOG: &[ChecklistStep] = &[
    step(Category::Power, "ac_outlet_swap", "Test wall outlet with another device"),
    step(Category::Power, "psu_switch_on", "Verify PSU rear switch is ON"),
    step(Category::Power, "psu_test", "Perform PSU paperclip/self-test"),
    step(Category::Power, "psu_known_good", "Try a known-good PSU"),
    step(Category::Power, "mobo_24pin_seated", "Verify 24-pin ATX connector is fully seated"),
    step(Category::Power, "cpu_8pin_seated", "Verify 8-pin EPS CPU power is fully seated"),
    step(Category::Power, "pwr_sw_short", "Bypass case button (short PWR_SW pins)"),
    step(Category::Motherboard, "standoffs_ok", "Verify correct motherboard standoff placement"),
    step(Category::Motherboard, "bench_test", "Breadboard test outside case (CPU + 1 RAM only)"),
    step(Category::Motherboard, "cmos_reset", "Clear CMOS (reset BIOS settings)"),
    step(Category::Motherboard, "bios_flashback", "Update BIOS via Flashback/Q-Flash"),
    step(Category::Cpu, "eps_cables", "Check CPU EPS power cables"),
    step(Category::Cpu, "cpu_reseat", "Reseat CPU and check socket pins"),
    step(Category::Cpu, "cooler_mounted", "Verify CPU cooler is properly mounted"),
    step(Category::Cpu, "cooler_pressure", "Check cooler mounting pressure"),
    step(Category::Cpu, "cpu_compatibility", "Verify CPU/motherboard compatibility"),
    step(Category::Memory, "ram_reseat", "Reseat all RAM sticks"),
    step(Category::Memory, "ram_single_stick", "Try one RAM stick in slot A2"),
    step(Category::Memory, "ram_slot_rotate", "Rotate through RAM sticks and slots"),
    step(Category::Gpu, "gpu_reseat", "Reseat GPU in primary PCIe slot"),
    step(Category::Gpu, "gpu_power", "Verify PCIe power cables"),
    step(Category::Gpu, "gpu_different_slot", "Try GPU in different PCIe slot"),
    step(Category::Gpu, "igpu_test", "Test onboard graphics (if available)"),
    step(Category::Storage, "drives_unplugged", "Disconnect drives to isolate boot device"),
    step(Category::Storage, "bios_boot_order", "Check BIOS boot order"),
    step(Category::Other, "monitor_cable_check", "Verify monitor cable and input source"),
    step(Category::Other, "usb_devices_removed", "Remove all USB devices except keyboard"),
    step(Category::Other, "reset_switch_disconnected", "Disconnect RESET switch header"),
];

/// Look up a catalog step by id.
pub fn find_step(id: &str) -> Option<&'static ChecklistStep> {
    CATALOG.iter().find(|s| s.id == id)
}

/// Catalog steps of one category, in catalog order.
pub fn steps_in(category: Category) -> impl Iterator<Item = &'static ChecklistStep> {
    CATALOG.iter().filter(move |s| s.category == category)
}

/// Checklist collaborator used by the traversal engine.
///
/// The engine only reads the done-set and marks ids done; it never clears.
pub trait Checklist {
    /// Ids currently marked done.
    fn done_ids(&self) -> BTreeSet<String>;

    /// Mark one id done. Marking an already-done id is a no-op.
    fn mark_done(&mut self, id: &str);
}

/// In-memory checklist state shared by the panel and the intake.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChecklistStore {
    done: BTreeSet<String>,
}

impl ChecklistStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_done(&self, id: &str) -> bool {
        self.done.contains(id)
    }

    pub fn len(&self) -> usize {
        self.done.len()
    }

    pub fn is_empty(&self) -> bool {
        self.done.is_empty()
    }

    /// Mark every id done (additive).
    pub fn mark_all<'a>(&mut self, ids: impl IntoIterator<Item = &'a str>) {
        for id in ids {
            self.mark_done(id);
        }
    }

    /// Explicit user toggle from the checklist panel; the only path besides
    /// `reset` that may clear an id.
    pub fn set_done(&mut self, id: &str, done: bool) {
        if done {
            self.mark_done(id);
        } else {
            self.done.remove(id);
        }
    }

    /// Explicit user reset.
    pub fn reset(&mut self) {
        self.done.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.done.iter().map(String::as_str)
    }
}

impl Checklist for ChecklistStore {
    fn done_ids(&self) -> BTreeSet<String> {
        self.done.clone()
    }

    fn mark_done(&mut self, id: &str) {
        if find_step(id).is_none() {
            tracing::debug!("marking id outside the catalog: {}", id);
        }
        self.done.insert(id.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_catalog_then_ids_are_unique_and_every_category_is_populated() {
        let ids: BTreeSet<&str> = CATALOG.iter().map(|s| s.id).collect();
        assert_eq!(ids.len(), CATALOG.len());
        for category in Category::ALL {
            assert!(steps_in(category).next().is_some(), "{category} empty");
        }
    }

    #[test]
    fn given_marked_ids_when_marking_again_then_set_is_unchanged() {
        let mut store = ChecklistStore::new();
        store.mark_all(["cpu_reseat", "ram_reseat"]);
        store.mark_done("cpu_reseat");

        assert_eq!(store.len(), 2);
        assert!(store.is_done("cpu_reseat"));
    }

    #[test]
    fn given_panel_toggle_off_when_setting_then_id_is_cleared() {
        let mut store = ChecklistStore::new();
        store.set_done("gpu_power", true);
        store.set_done("gpu_power", false);

        assert!(store.is_empty());
    }
}
