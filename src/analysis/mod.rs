pub mod aggregate;
pub mod classifier;
pub mod features;
pub mod frame_selector;
pub mod normalize;
pub mod smoother;

pub use aggregate::MiAggregator;
pub use classifier::{classify, MotionState};
pub use features::{FeatureComputer, FeatureVec};
pub use frame_selector::build_output_plan;
pub use normalize::Normalizer;
pub use smoother::Smoother;
