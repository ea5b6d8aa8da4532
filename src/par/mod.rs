use std::str::FromStr;

pub mod par_rayon;
pub mod par_sequential;

/// How independent work items (image rows, lanes) are distributed.
#[derive(PartialEq, Eq, Default, Clone, Copy, Debug)]
#[repr(u32)]
pub enum Scheduler {
    Sequential = 0,
    #[default]
    Rayon = 1,
}

impl FromStr for Scheduler {
    type Err = String;

    #[inline(always)]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "seq" => Ok(Self::Sequential),
            "rayon" => Ok(Self::Rayon),
            _ => Err(format!("Unknown mode: '{s}', valid modes: 'seq', 'rayon'")),
        }
    }
}

impl Scheduler {
    /// Calls `func(index, item)` for every element.
    #[inline(always)]
    pub fn par_map<T, F>(self, data: &mut [T], func: &F)
    where
        T: Send + Sync,
        F: Fn(usize, &mut T) + Send + Sync,
    {
        match self {
            Scheduler::Sequential => par_sequential::par_map(data, func),
            Scheduler::Rayon => par_rayon::par_map(data, func),
        }
    }

    /// Calls `func(chunk_index, chunk)` for consecutive chunks of `chunk_size`
    /// elements. The last chunk may be shorter.
    #[inline(always)]
    pub fn par_chunks_mut<T, F>(self, data: &mut [T], func: &F, chunk_size: usize)
    where
        T: Send + Sync,
        F: Fn(usize, &mut [T]) + Send + Sync,
    {
        let chunk_size = chunk_size.max(1);
        match self {
            Scheduler::Sequential => par_sequential::par_chunks_mut(data, func, chunk_size),
            Scheduler::Rayon => par_rayon::par_chunks_mut(data, func, chunk_size),
        }
    }

    pub fn current_num_threads(self) -> usize {
        match self {
            Scheduler::Sequential => 1,
            Scheduler::Rayon => rayon::current_num_threads(),
        }
    }
}
