use crate::value::ObjectId;
use std::collections::HashSet;

const INTEGRITY_MSG: &str = "All heap arrays should have the same length.";

/// Generational slot heap. Handles pack `(generation << 32) | index`, so a
/// handle to a collected object never aliases whatever reuses its slot.
#[derive(Debug)]
pub struct Heap<T> {
    data: Vec<T>,
    alive: Vec<bool>,
    generation: Vec<u32>,
}

impl<T> Default for Heap<T> {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            alive: Vec::new(),
            generation: Vec::new(),
        }
    }
}

fn unpack(id: ObjectId) -> (usize, u32) {
    ((id.0 & u64::from(u32::MAX)) as usize, (id.0 >> 32) as u32)
}

fn pack(index: usize, generation: u32) -> ObjectId {
    ObjectId((u64::from(generation) << 32) | index as u64)
}

impl<T> Heap<T> {
    pub fn live_count(&self) -> usize {
        self.alive.iter().filter(|alive| **alive).count()
    }

    pub fn allocate(&mut self, object: T) -> ObjectId {
        self.verify_integrity();

        // Reuse the first dead slot
        match self.alive.iter().position(|alive| !alive) {
            Some(index) => {
                *self.data.get_mut(index).expect(INTEGRITY_MSG) = object;
                *self.alive.get_mut(index).expect(INTEGRITY_MSG) = true;
                let generation = *self.generation.get(index).expect(INTEGRITY_MSG);
                pack(index, generation)
            }
            None => {
                self.data.push(object);
                self.alive.push(true);
                self.generation.push(0);
                pack(self.data.len() - 1, 0)
            }
        }
    }

    fn slot(&self, id: ObjectId) -> Option<usize> {
        let (index, generation) = unpack(id);
        let current = self.generation.get(index)?;
        let alive = self.alive.get(index).expect(INTEGRITY_MSG);
        (*current == generation && *alive).then_some(index)
    }

    pub fn is_alive(&self, id: ObjectId) -> bool {
        self.slot(id).is_some()
    }

    pub fn get(&self, id: ObjectId) -> Option<&T> {
        let index = self.slot(id)?;
        self.data.get(index)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut T> {
        let index = self.slot(id)?;
        self.data.get_mut(index)
    }

    /// Mark and sweep. Everything not reachable from `roots` through `children`
    /// is freed; returns how many objects were freed.
    pub fn collect<F>(&mut self, roots: impl IntoIterator<Item = ObjectId>, children: F) -> usize
    where
        F: Fn(&T) -> Vec<ObjectId>,
    {
        self.verify_integrity();
        let mut marked = HashSet::new();
        let mut pending: Vec<ObjectId> = roots.into_iter().collect();
        while let Some(id) = pending.pop() {
            let Some(index) = self.slot(id) else {
                continue;
            };
            if !marked.insert(index) {
                continue;
            }
            pending.extend(children(&self.data[index]));
        }

        let mut freed = 0;
        for index in 0..self.data.len() {
            if self.alive[index] && !marked.contains(&index) {
                self.alive[index] = false;
                self.generation[index] = self.generation[index].wrapping_add(1);
                freed += 1;
            }
        }
        freed
    }

    fn verify_integrity(&self) {
        debug_assert_eq!(
            self.data.len(),
            self.alive.len(),
            "Data and markers should have same length."
        );
        debug_assert_eq!(
            self.alive.len(),
            self.generation.len(),
            "Data, markers and generation should have same length."
        );
    }
}
