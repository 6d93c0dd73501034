/// Hands out monotonically increasing keys.
///
/// Keys are never recycled: a late reply carrying an old key must never match a
/// newer request.
#[derive(Debug, Clone)]
pub struct KeyGenerator<K: From<u64> + Copy> {
    next: u64,
    phantom: std::marker::PhantomData<K>,
}

impl<K: From<u64> + Copy> KeyGenerator<K> {
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    pub fn starting_at(first: u64) -> Self {
        Self {
            next: first,
            phantom: std::marker::PhantomData,
        }
    }

    pub fn generate(&mut self) -> K {
        let key = K::from(self.next);
        self.next = self.next.wrapping_add(1);
        key
    }

    /// The key the next call to `generate()` will return
    pub fn peek(&self) -> K {
        K::from(self.next)
    }
}

impl<K: From<u64> + Copy> Default for KeyGenerator<K> {
    fn default() -> Self {
        Self::new()
    }
}
