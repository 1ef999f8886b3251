//! Fixed-capacity history windows for the polyphase filters.

/// Sliding window over the most recent filter inputs.
///
/// Position 0 holds the newest entry. [`History::shift`] ages every entry by
/// `n` positions without moving memory, discarding the `n` oldest entries and
/// freeing positions `0..n` for new values.
#[derive(Debug, Clone)]
pub struct History<S> {
    buf: Vec<S>,
    head: usize,
}

impl<S: Copy + Default> History<S> {
    pub fn new(len: usize) -> Self {
        Self {
            buf: vec![S::default(); len],
            head: 0,
        }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[inline(always)]
    fn index(&self, position: usize) -> usize {
        let index = self.head + position;
        if index >= self.buf.len() {
            index - self.buf.len()
        } else {
            index
        }
    }

    #[inline(always)]
    pub fn shift(&mut self, n: usize) {
        let len = self.buf.len();
        self.head = (self.head + len - n % len) % len;
    }

    #[inline(always)]
    pub fn get(&self, position: usize) -> S {
        self.buf[self.index(position)]
    }

    #[inline(always)]
    pub fn set(&mut self, position: usize, value: S) {
        let index = self.index(position);
        self.buf[index] = value;
    }

    pub fn clear(&mut self) {
        self.buf.fill(S::default());
        self.head = 0;
    }
}

#[test]
fn shift_ages_entries() {
    let mut history = History::<i32>::new(6);
    for step in 1..=4 {
        history.shift(2);
        history.set(1, step * 10);
        history.set(0, step * 10 + 1);
    }

    let window: Vec<_> = (0..history.len()).map(|i| history.get(i)).collect();
    assert_eq!(window, [41, 40, 31, 30, 21, 20]);

    history.clear();
    assert!((0..6).all(|i| history.get(i) == 0));
}
