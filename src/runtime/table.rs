//! Table instance for funcref elements. Slots hold store function addresses;
//! an unset slot is explicitly null (`None`), never address zero.

use crate::model::TableType;

#[derive(Debug, Clone)]
pub struct TableInstance {
    elems: Vec<Option<usize>>,
    max: Option<u32>,
}

impl TableInstance {
    pub fn new(ty: &TableType) -> Self {
        Self {
            elems: vec![None; ty.limits.min as usize],
            max: ty.limits.max,
        }
    }

    pub fn size(&self) -> u32 {
        self.elems.len() as u32
    }

    /// Outer None: index out of range. Inner None: uninitialized slot.
    pub fn get(&self, idx: u32) -> Option<Option<usize>> {
        self.elems.get(idx as usize).copied()
    }

    pub fn set(&mut self, idx: u32, val: Option<usize>) -> Result<(), ()> {
        match self.elems.get_mut(idx as usize) {
            Some(slot) => {
                *slot = val;
                Ok(())
            }
            None => Err(()),
        }
    }

    /// Extend the table to hold at least `n` slots. Element segments may
    /// reach past the declared minimum; new slots start null.
    pub fn ensure_size(&mut self, n: u32) {
        if n as usize > self.elems.len() {
            self.elems.resize(n as usize, None);
        }
    }

    /// Grow by delta elements. None when the declared max would be exceeded.
    pub fn grow(&mut self, delta: u32) -> Option<u32> {
        let prev = self.size();
        let new = prev.checked_add(delta)?;
        if let Some(max) = self.max {
            if new > max {
                return None;
            }
        }
        self.elems.resize(new as usize, None);
        Some(prev)
    }
}
