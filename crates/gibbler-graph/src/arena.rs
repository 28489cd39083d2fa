use gibbler_core::HypId;

use crate::hypothesis::Hypothesis;

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    hyp: Option<Hypothesis>,
}

/// Owning store for hypotheses with generation-checked handles.
///
/// Retired slots are recycled; bumping the generation on retirement makes any
/// handle to the previous occupant resolve to `None`.
#[derive(Debug, Clone, Default)]
pub(crate) struct HypArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl HypArena {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            live: 0,
        }
    }

    pub(crate) fn insert(&mut self, hyp: Hypothesis) -> HypId {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.hyp = Some(hyp);
            return HypId::from_parts(index, slot.generation);
        }
        let index = u32::try_from(self.slots.len()).unwrap_or_else(|_| {
            panic!("hypothesis arena exceeded {} slots", u32::MAX);
        });
        self.slots.push(Slot {
            generation: 0,
            hyp: Some(hyp),
        });
        HypId::from_parts(index, 0)
    }

    pub(crate) fn get(&self, id: HypId) -> Option<&Hypothesis> {
        self.slots
            .get(id.index())
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.hyp.as_ref())
    }

    pub(crate) fn get_mut(&mut self, id: HypId) -> Option<&mut Hypothesis> {
        self.slots
            .get_mut(id.index())
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.hyp.as_mut())
    }

    pub(crate) fn retire(&mut self, id: HypId) -> Option<Hypothesis> {
        let slot = self
            .slots
            .get_mut(id.index())
            .filter(|slot| slot.generation == id.generation())?;
        let hyp = slot.hyp.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index() as u32);
        self.live -= 1;
        Some(hyp)
    }

    pub(crate) fn live(&self) -> usize {
        self.live
    }

    pub(crate) fn live_ids(&self) -> impl Iterator<Item = HypId> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.hyp
                .as_ref()
                .map(|_| HypId::from_parts(index as u32, slot.generation))
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use gibbler_core::{words, FeatureVector, Span, TranslationOption};

    use super::*;

    fn hyp(position: usize) -> Hypothesis {
        Hypothesis::new(Arc::new(TranslationOption::new(
            Span::single(position),
            words("w"),
            FeatureVector::new(),
        )))
    }

    #[test]
    fn retired_handles_do_not_resolve_after_reuse() {
        let mut arena = HypArena::with_capacity(2);
        let first = arena.insert(hyp(0));
        assert!(arena.retire(first).is_some());
        let second = arena.insert(hyp(1));

        assert_eq!(first.index(), second.index());
        assert!(arena.get(first).is_none());
        assert_eq!(arena.get(second).map(|h| h.span()), Some(Span::single(1)));
        assert!(arena.retire(first).is_none());
        assert_eq!(arena.live(), 1);
        assert_eq!(arena.live_ids().collect::<Vec<_>>(), vec![second]);
    }
}
