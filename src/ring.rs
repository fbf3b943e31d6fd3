/// Fixed-size circular storage.
///
/// Not synchronized; the owning queue keeps it behind its mutex. `count` is
/// tracked on its own rather than derived from `head` and `tail`, so a full
/// ring and an empty ring are told apart without a spare slot.
#[derive(Debug)]
pub struct Ring<T> {
    slots: Box<[Option<T>]>,
    head: usize,
    tail: usize,
    count: usize,
}

impl<T> Ring<T> {
    pub fn with_capacity(capacity: usize) -> Ring<T> {
        debug_assert!(capacity > 0);
        Ring {
            slots: (0..capacity).map(|_| None).collect(),
            head: 0,
            tail: 0,
            count: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_full(&self) -> bool {
        self.count == self.slots.len()
    }

    pub fn push(&mut self, value: T) -> Result<(), T> {
        if self.is_full() {
            return Err(value);
        }
        debug_assert!(self.slots[self.tail].is_none());
        self.slots[self.tail] = Some(value);
        self.tail = (self.tail + 1) % self.slots.len();
        self.count += 1;
        Ok(())
    }

    pub fn pop(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        // take() leaves None behind so the ring holds no stale reference
        let value = self.slots[self.head].take();
        debug_assert!(value.is_some());
        self.head = (self.head + 1) % self.slots.len();
        self.count -= 1;
        value
    }

    pub fn front(&self) -> Option<&T> {
        if self.is_empty() {
            None
        } else {
            self.slots[self.head].as_ref()
        }
    }
}
