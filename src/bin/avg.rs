// Averager

use std::collections::VecDeque;

pub struct Averager {
    queue:      VecDeque<usize>,
    max_len:    usize
}

impl Averager {
    pub fn new(len: usize) -> Self {
        Averager {
            queue:      VecDeque::with_capacity(len),
            max_len:    len
        }
    }

    pub fn add(&mut self, data: usize) {
        self.queue.push_back(data);

        if self.queue.len() > self.max_len {
            self.queue.pop_front();
        }
    }

    pub fn get_avg(&self) -> usize {
        if self.queue.is_empty() {
            0
        } else {
            self.queue.iter().sum::<usize>() / self.queue.len()
        }
    }
}
