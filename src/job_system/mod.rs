pub mod parallel;

pub use parallel::par_map;
