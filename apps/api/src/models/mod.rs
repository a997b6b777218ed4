pub mod profile;
pub mod scorecard;
