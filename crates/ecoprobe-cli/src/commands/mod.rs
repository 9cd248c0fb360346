pub mod analyze;
pub mod completion;
pub mod rules;
pub mod score;
