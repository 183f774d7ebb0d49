pub mod hit;
pub mod point;
pub mod sampler;

pub use hit::{Dot, check_for_hit};
pub use point::Point;
pub use sampler::{Branch, Graph, Sampler, SamplerConfig, Window, sample};
