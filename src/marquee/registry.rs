use std::collections::BTreeMap;

use crate::marquee::controller::MarqueeController;
use crate::marquee::messages::SurfaceTicket;
use crate::marquee::session::SurfaceId;

/// One overlay surface and the session currently shown on it.
#[derive(Debug)]
pub struct OverlaySlot {
    pub generation: u64,
    pub controller: MarqueeController,
}

impl OverlaySlot {
    pub fn ticket(&self, surface: &SurfaceId) -> SurfaceTicket {
        SurfaceTicket {
            surface: surface.clone(),
            generation: self.generation,
        }
    }
}

/// Owns the overlay surfaces, one per node.
///
/// Activating a node that already has a surface reuses it: the previous
/// session is torn down and replaced, so the newest activation wins.
#[derive(Debug, Default)]
pub struct OverlayRegistry {
    slots: BTreeMap<SurfaceId, OverlaySlot>,
    next_generation: u64,
}

impl OverlayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&mut self, controller: MarqueeController) -> SurfaceTicket {
        let surface = controller.session().surface_id();
        self.next_generation += 1;
        let generation = self.next_generation;

        if let Some(slot) = self.slots.get_mut(&surface) {
            tracing::info!(surface = %surface, "reusing marquee surface for new activation");
            slot.controller.teardown();
            slot.controller = controller;
            slot.generation = generation;
        } else {
            tracing::info!(surface = %surface, "creating marquee surface");
            self.slots.insert(
                surface.clone(),
                OverlaySlot {
                    generation,
                    controller,
                },
            );
        }
        SurfaceTicket {
            surface,
            generation,
        }
    }

    /// Drop a surface, detaching whatever its session still held.
    pub fn release(&mut self, surface: &SurfaceId) -> Option<MarqueeController> {
        let mut slot = self.slots.remove(surface)?;
        slot.controller.teardown();
        tracing::debug!(surface = %surface, "released marquee surface");
        Some(slot.controller)
    }

    pub fn get(&self, surface: &SurfaceId) -> Option<&OverlaySlot> {
        self.slots.get(surface)
    }

    pub fn get_mut(&mut self, surface: &SurfaceId) -> Option<&mut OverlaySlot> {
        self.slots.get_mut(surface)
    }

    /// Slot for `ticket` unless the surface has since been reused.
    pub fn current_mut(&mut self, ticket: &SurfaceTicket) -> Option<&mut MarqueeController> {
        self.slots
            .get_mut(&ticket.surface)
            .filter(|slot| slot.generation == ticket.generation)
            .map(|slot| &mut slot.controller)
    }

    pub fn surfaces(&self) -> Vec<SurfaceId> {
        self.slots.keys().cloned().collect()
    }

    pub fn closed_surfaces(&self) -> Vec<SurfaceId> {
        self.slots
            .iter()
            .filter(|(_, slot)| slot.controller.is_closed())
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
